//! Shipment endpoints: create, read, and list.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::{Extension, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::error::ApiError;
use super::middleware::client_scope;
use super::validate::{required, required_positive, required_str};
use super::AppState;
use crate::domain::{
    Address, Coordinates, Dimensions, Package, Person, ServiceType, Shipment, ShipmentStatus,
    StatusHistoryEntry,
};
use crate::services::{Claims, CreateShipmentInput, ListQuery, ShipmentCreated};

// ============================================================================
// Requests
// ============================================================================

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CoordinatesRequest {
    lat: Option<f64>,
    lng: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct AddressRequest {
    address: Option<String>,
    city: Option<String>,
    zip_code: Option<String>,
    coordinates: Option<CoordinatesRequest>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SenderRequest {
    name: Option<String>,
    email: Option<String>,
    phone: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct DimensionsRequest {
    length_cm: Option<f64>,
    width_cm: Option<f64>,
    height_cm: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PackageRequest {
    weight_kg: Option<f64>,
    dimensions: Option<DimensionsRequest>,
    description: Option<String>,
    declared_value: Option<f64>,
    currency: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CreateShipmentRequest {
    sender: Option<SenderRequest>,
    origin: Option<AddressRequest>,
    destination: Option<AddressRequest>,
    package: Option<PackageRequest>,
    service_type: Option<String>,
}

impl CreateShipmentRequest {
    fn validate(self) -> Result<(Person, Address, Address, Package, ServiceType), String> {
        let sender = validate_sender(required(self.sender, "sender")?)?;
        let origin = validate_address(required(self.origin, "origin")?, "origin")?;
        let destination = validate_address(required(self.destination, "destination")?, "destination")?;
        let package = validate_package(required(self.package, "package")?)?;
        let service_type = self
            .service_type
            .as_deref()
            .and_then(ServiceType::parse)
            .ok_or_else(|| {
                "service_type must be one of: same_day, next_day, standard".to_string()
            })?;
        Ok((sender, origin, destination, package, service_type))
    }
}

fn validate_sender(sender: SenderRequest) -> Result<Person, String> {
    let email = required_str(sender.email, "sender.email")?;
    if !email.contains('@') {
        return Err("sender.email must be a valid email".to_string());
    }
    Ok(Person {
        name: required_str(sender.name, "sender.name")?,
        email,
        phone: required_str(sender.phone, "sender.phone")?,
    })
}

fn validate_address(address: AddressRequest, field: &str) -> Result<Address, String> {
    let coordinates = required(address.coordinates, &format!("{field}.coordinates"))?;
    let (Some(lat), Some(lng)) = (coordinates.lat, coordinates.lng) else {
        return Err(format!("{field}.coordinates requires both lat and lng"));
    };
    Ok(Address {
        address: required_str(address.address, &format!("{field}.address"))?,
        city: required_str(address.city, &format!("{field}.city"))?,
        zip_code: required_str(address.zip_code, &format!("{field}.zip_code"))?,
        coordinates: Coordinates { lat, lng },
    })
}

fn validate_package(package: PackageRequest) -> Result<Package, String> {
    let dimensions = required(package.dimensions, "package.dimensions")?;
    Ok(Package {
        weight_kg: required_positive(package.weight_kg, "package.weight_kg")?,
        dimensions: Dimensions {
            length_cm: required_positive(dimensions.length_cm, "package.dimensions.length_cm")?,
            width_cm: required_positive(dimensions.width_cm, "package.dimensions.width_cm")?,
            height_cm: required_positive(dimensions.height_cm, "package.dimensions.height_cm")?,
        },
        description: required_str(package.description, "package.description")?,
        declared_value: required_positive(package.declared_value, "package.declared_value")?,
        currency: required_str(package.currency, "package.currency")?,
    })
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ListParams {
    status: Option<String>,
    service_type: Option<String>,
    search: Option<String>,
    date_from: Option<String>,
    date_to: Option<String>,
    page: Option<u64>,
    limit: Option<u64>,
}

impl ListParams {
    fn validate(self) -> Result<ListQuery, String> {
        let status = match self.status.as_deref() {
            Some(s) => Some(
                ShipmentStatus::parse(s)
                    .ok_or_else(|| format!("unknown status filter: {s}"))?,
            ),
            None => None,
        };
        let service_type = match self.service_type.as_deref() {
            Some(s) => Some(
                ServiceType::parse(s)
                    .ok_or_else(|| format!("unknown service_type filter: {s}"))?,
            ),
            None => None,
        };
        Ok(ListQuery {
            status,
            service_type,
            search: self.search,
            date_from: parse_date(self.date_from, "date_from")?,
            date_to: parse_date(self.date_to, "date_to")?,
            page: self.page,
            limit: self.limit,
        })
    }
}

fn parse_date(value: Option<String>, field: &str) -> Result<Option<DateTime<Utc>>, String> {
    match value {
        Some(raw) => DateTime::parse_from_rfc3339(&raw)
            .map(|dt| Some(dt.with_timezone(&Utc)))
            .map_err(|_| format!("{field} must be an RFC3339 datetime")),
        None => Ok(None),
    }
}

// ============================================================================
// Responses
// ============================================================================

#[derive(Debug, Serialize)]
struct ShipmentLinks {
    #[serde(rename = "self")]
    self_link: String,
    events: String,
}

impl ShipmentLinks {
    fn for_tracking(tracking_number: &str) -> Self {
        Self {
            self_link: format!("/shipments/{tracking_number}"),
            events: format!("/events/{tracking_number}"),
        }
    }
}

#[derive(Debug, Serialize)]
struct CreateShipmentResponse {
    tracking_number: String,
    status: ShipmentStatus,
    created_at: DateTime<Utc>,
    estimated_delivery: DateTime<Utc>,
    #[serde(rename = "_links")]
    links: ShipmentLinks,
}

impl From<ShipmentCreated> for CreateShipmentResponse {
    fn from(r: ShipmentCreated) -> Self {
        Self {
            links: ShipmentLinks::for_tracking(&r.tracking_number),
            tracking_number: r.tracking_number,
            status: r.status,
            created_at: r.created_at,
            estimated_delivery: r.estimated_delivery,
        }
    }
}

#[derive(Debug, Serialize)]
struct GetShipmentResponse {
    tracking_number: String,
    status: ShipmentStatus,
    service_type: ServiceType,
    created_at: DateTime<Utc>,
    estimated_delivery: DateTime<Utc>,
    sender: Person,
    origin: Address,
    destination: Address,
    package: Package,
    status_history: Vec<StatusHistoryEntry>,
    #[serde(rename = "_links")]
    links: ShipmentLinks,
}

impl From<Shipment> for GetShipmentResponse {
    fn from(s: Shipment) -> Self {
        Self {
            links: ShipmentLinks::for_tracking(&s.tracking_number),
            tracking_number: s.tracking_number,
            status: s.status,
            service_type: s.service_type,
            created_at: s.created_at,
            estimated_delivery: s.estimated_delivery,
            sender: s.sender,
            origin: s.origin,
            destination: s.destination,
            package: s.package,
            status_history: s.status_history,
        }
    }
}

/// List items omit the history to keep payloads small.
#[derive(Debug, Serialize)]
struct ShipmentSummaryResponse {
    tracking_number: String,
    status: ShipmentStatus,
    service_type: ServiceType,
    created_at: DateTime<Utc>,
    estimated_delivery: DateTime<Utc>,
    sender: Person,
    origin: Address,
    destination: Address,
    #[serde(rename = "_links")]
    links: ShipmentLinks,
}

impl From<Shipment> for ShipmentSummaryResponse {
    fn from(s: Shipment) -> Self {
        Self {
            links: ShipmentLinks::for_tracking(&s.tracking_number),
            tracking_number: s.tracking_number,
            status: s.status,
            service_type: s.service_type,
            created_at: s.created_at,
            estimated_delivery: s.estimated_delivery,
            sender: s.sender,
            origin: s.origin,
            destination: s.destination,
        }
    }
}

#[derive(Debug, Serialize)]
struct PaginationResponse {
    total: u64,
    page: u64,
    limit: u64,
    total_pages: u64,
}

#[derive(Debug, Serialize)]
struct ListShipmentsResponse {
    data: Vec<ShipmentSummaryResponse>,
    pagination: PaginationResponse,
}

// ============================================================================
// Handlers
// ============================================================================

/// `POST /v1/shipments` — create a shipment in state `created`. Honors the
/// `Idempotency-Key` header for replay-safe creation.
pub async fn create(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    headers: HeaderMap,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let scope = client_scope(&claims)?;
    let client_id = scope
        .map(str::to_string)
        .or_else(|| claims.client_id.clone())
        .unwrap_or_default();

    let idempotency_key = headers
        .get("Idempotency-Key")
        .and_then(|value| value.to_str().ok())
        .filter(|key| !key.is_empty())
        .map(str::to_string);

    let Json(value) = payload.map_err(|_| ApiError::bad_request("invalid payload"))?;
    let request: CreateShipmentRequest =
        serde_json::from_value(value).map_err(|e| ApiError::unprocessable(e.to_string()))?;
    let (sender, origin, destination, package, service_type) =
        request.validate().map_err(ApiError::unprocessable)?;

    let created = state
        .shipments
        .create(CreateShipmentInput {
            sender,
            origin,
            destination,
            package,
            service_type,
            client_id,
            idempotency_key,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(CreateShipmentResponse::from(created)),
    ))
}

/// `GET /v1/shipments/:tracking_number` — full shipment including the
/// ordered status history.
pub async fn get(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(tracking_number): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let scope = client_scope(&claims)?;
    let shipment = state
        .shipments
        .get(&tracking_number, claims.role, scope)
        .await?;
    Ok(Json(GetShipmentResponse::from(shipment)))
}

/// `GET /v1/shipments` — paginated list, newest first.
pub async fn list(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(params): Query<ListParams>,
) -> Result<impl IntoResponse, ApiError> {
    let scope = client_scope(&claims)?;
    let query = params.validate().map_err(ApiError::bad_request)?;

    let page = state.shipments.list(query, claims.role, scope).await?;

    Ok(Json(ListShipmentsResponse {
        data: page.items.into_iter().map(Into::into).collect(),
        pagination: PaginationResponse {
            total: page.total,
            page: page.page,
            limit: page.limit,
            total_pages: page.total_pages,
        },
    }))
}
