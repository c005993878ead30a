//! API handlers module

pub mod chat;
pub mod documents;
pub mod health;
pub mod translate;

use folio_common::errors::{AppError, Result};
use validator::Validate;

/// Run `validator` rules and map failures to a 400 with the offending field
pub(crate) fn validate_request<T: Validate>(request: &T) -> Result<()> {
    request.validate().map_err(|e| AppError::Validation {
        field: e.field_errors().keys().next().map(|k| k.to_string()),
        message: e.to_string(),
    })
}
