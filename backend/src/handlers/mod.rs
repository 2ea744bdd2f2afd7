//! HTTP handlers

pub mod health;
pub mod inventory;
pub mod stock_request;

pub use health::*;
pub use inventory::*;
pub use stock_request::*;

use crate::error::{AppError, AppResult};

/// Parse an optional query filter; blank and `all` mean no filter
pub(crate) fn query_choice<T>(
    field: &str,
    raw: Option<&str>,
    parse: impl Fn(&str) -> Option<T>,
) -> AppResult<Option<T>> {
    shared::parse_choice(raw, parse).map_err(|value| AppError::Validation {
        field: field.to_string(),
        message: format!("Invalid {}: {}", field, value),
        message_id: format!("Nilai {} tidak valid: {}", field, value),
    })
}
