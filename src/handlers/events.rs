//! Event ingress: single and batch tracking-event submission.
//!
//! Both endpoints acknowledge with 202 before processing begins; the
//! dispatcher hands the events to the worker owning each tracking number.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::error::ApiError;
use super::validate::required_str;
use super::AppState;
use crate::domain::{Location, ShipmentStatus, TrackingEvent};

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct LocationRequest {
    lat: Option<f64>,
    lng: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct TrackingEventRequest {
    tracking_number: Option<String>,
    status: Option<String>,
    timestamp: Option<String>,
    source: Option<String>,
    location: Option<LocationRequest>,
}

#[derive(Debug, Serialize)]
struct AcceptedResponse {
    message: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    count: Option<usize>,
}

impl TrackingEventRequest {
    /// Structural validation. Produces the domain event or a field-level
    /// message.
    fn validate(self) -> Result<TrackingEvent, String> {
        let tracking_number = required_str(self.tracking_number, "tracking_number")?;

        // `created` is written by shipment creation, never by this
        // pipeline, so it is rejected here along with unknown values.
        let status = self
            .status
            .as_deref()
            .and_then(ShipmentStatus::parse)
            .filter(|status| *status != ShipmentStatus::Created)
            .ok_or_else(|| {
                "status must be one of: picked_up, in_warehouse, in_transit, delivered, cancelled"
                    .to_string()
            })?;

        let timestamp = required_str(self.timestamp, "timestamp")?;
        let timestamp = DateTime::parse_from_rfc3339(&timestamp)
            .map_err(|_| "timestamp must be an RFC3339 datetime".to_string())?
            .with_timezone(&Utc);

        let source = required_str(self.source, "source")?;

        let location = match self.location {
            Some(loc) => Some(validate_location(loc)?),
            None => None,
        };

        Ok(TrackingEvent {
            tracking_number,
            status,
            timestamp,
            source,
            location,
        })
    }
}

fn validate_location(loc: LocationRequest) -> Result<Location, String> {
    let (Some(lat), Some(lng)) = (loc.lat, loc.lng) else {
        return Err("location requires both lat and lng".to_string());
    };
    if !(-90.0..=90.0).contains(&lat) {
        return Err("location.lat must be between -90 and 90".to_string());
    }
    if !(-180.0..=180.0).contains(&lng) {
        return Err("location.lng must be between -180 and 180".to_string());
    }
    Ok(Location { lat, lng })
}

/// `POST /v1/events` — validate and enqueue a single event.
pub async fn receive(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(value) = payload.map_err(|_| ApiError::bad_request("invalid payload"))?;

    let request: TrackingEventRequest =
        serde_json::from_value(value).map_err(|e| ApiError::unprocessable(e.to_string()))?;
    let event = request.validate().map_err(ApiError::unprocessable)?;

    state
        .dispatcher
        .enqueue(event)
        .await
        .map_err(|_| ApiError::service_unavailable("event pipeline unavailable"))?;

    Ok((
        StatusCode::ACCEPTED,
        Json(AcceptedResponse {
            message: "event accepted",
            count: None,
        }),
    ))
}

/// `POST /v1/events/batch` — validate all elements (fail-fast, nothing is
/// enqueued on the first invalid element), then enqueue in input order.
pub async fn receive_batch(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(value) = payload.map_err(|_| ApiError::bad_request("invalid payload"))?;

    let items = value
        .as_array()
        .ok_or_else(|| ApiError::bad_request("batch must be a JSON array"))?;
    if items.is_empty() {
        return Err(ApiError::bad_request("batch cannot be empty"));
    }

    let mut events = Vec::with_capacity(items.len());
    for (i, item) in items.iter().enumerate() {
        let request: TrackingEventRequest = serde_json::from_value(item.clone())
            .map_err(|e| ApiError::unprocessable(format!("event[{i}]: {e}")))?;
        let event = request
            .validate()
            .map_err(|msg| ApiError::unprocessable(format!("event[{i}]: {msg}")))?;
        events.push(event);
    }

    let count = events.len();
    state
        .dispatcher
        .enqueue_batch(events)
        .await
        .map_err(|_| ApiError::service_unavailable("event pipeline unavailable"))?;

    Ok((
        StatusCode::ACCEPTED,
        Json(AcceptedResponse {
            message: "events accepted",
            count: Some(count),
        }),
    ))
}
