//! Field-level request validation helpers.
//!
//! Request DTOs declare every field optional so that deserialization never
//! rejects a payload; validation then produces one human-readable,
//! field-named message per failure (e.g. `tracking_number is required`).

/// Non-empty string requirement.
pub fn required_str(value: Option<String>, field: &str) -> Result<String, String> {
    match value {
        Some(s) if !s.trim().is_empty() => Ok(s),
        _ => Err(format!("{field} is required")),
    }
}

/// Present-and-positive number requirement.
pub fn required_positive(value: Option<f64>, field: &str) -> Result<f64, String> {
    match value {
        Some(n) if n > 0.0 => Ok(n),
        Some(_) => Err(format!("{field} must be greater than 0")),
        None => Err(format!("{field} is required")),
    }
}

/// Presence requirement for nested objects.
pub fn required<T>(value: Option<T>, field: &str) -> Result<T, String> {
    value.ok_or_else(|| format!("{field} is required"))
}
