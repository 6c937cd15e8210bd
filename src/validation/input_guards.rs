//! Input validation guards for request parameters
//!
//! Every guard trims its input first; the trimmed value is what gets
//! validated and what callers persist.

use thiserror::Error;
use uuid::Uuid;

/// Result type for validation operations
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Validation error types
///
/// Display strings are the messages returned to clients, so they stay short
/// and name the offending field exactly as it appears on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Required parameter is absent or whitespace-only
    #[error("{parameter} is required")]
    Missing { parameter: String },

    /// Parameter is present but not a canonical UUID
    #[error("{parameter} must be a valid UUID")]
    InvalidUuid { parameter: String },

    /// Parameter was explicitly supplied but trims to nothing
    #[error("{parameter} cannot be empty")]
    Empty { parameter: String },

    /// Numeric parameter below zero
    #[error("{parameter} cannot be negative")]
    Negative { parameter: String },

    /// Body could not be decoded
    #[error("invalid JSON payload")]
    MalformedBody,

    /// Path segment could not be percent-decoded
    #[error("invalid path parameter")]
    MalformedPath,

    /// Query string could not be decoded
    #[error("invalid query string")]
    MalformedQuery,

    /// Free-form message for composite checks
    #[error("{message}")]
    Generic { message: String },
}

impl ValidationError {
    pub fn generic(message: impl Into<String>) -> Self {
        ValidationError::Generic {
            message: message.into(),
        }
    }
}

/// Trims `value` and returns it only when something is left.
///
/// ```
/// use warehouse_api::validation::require_trimmed;
///
/// assert_eq!(require_trimmed("StockName", "  Main ").unwrap(), "Main");
/// assert!(require_trimmed("StockName", "   ").is_err());
/// ```
pub fn require_trimmed<'a>(parameter: &str, value: &'a str) -> ValidationResult<&'a str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(ValidationError::Missing {
            parameter: parameter.to_string(),
        })
    } else {
        Ok(trimmed)
    }
}

/// Parses a required identifier parameter (query string or path segment).
///
/// Missing and malformed values are reported separately so the client can
/// tell "forgot it" from "sent garbage".
///
/// ```
/// use warehouse_api::validation::parse_uuid_param;
///
/// let id = uuid::Uuid::new_v4();
/// assert_eq!(parse_uuid_param("stockId", Some(&format!(" {id} "))).unwrap(), id);
/// assert!(parse_uuid_param("stockId", None).is_err());
/// assert!(parse_uuid_param("stockId", Some("not-a-uuid")).is_err());
/// ```
pub fn parse_uuid_param(parameter: &str, value: Option<&str>) -> ValidationResult<Uuid> {
    let raw = value.map(str::trim).unwrap_or_default();
    if raw.is_empty() {
        return Err(ValidationError::Missing {
            parameter: parameter.to_string(),
        });
    }
    parse_uuid(parameter, raw)
}

/// Parses an already-present identifier field, trimming it first.
pub fn parse_uuid(parameter: &str, value: &str) -> ValidationResult<Uuid> {
    Uuid::parse_str(value.trim()).map_err(|_| ValidationError::InvalidUuid {
        parameter: parameter.to_string(),
    })
}

/// Rejects negative quantities; zero is allowed.
pub fn validate_non_negative(parameter: &str, value: i64) -> ValidationResult<i64> {
    if value < 0 {
        Err(ValidationError::Negative {
            parameter: parameter.to_string(),
        })
    } else {
        Ok(value)
    }
}

/// Trims a string that was explicitly supplied in a sparse update and must
/// not end up empty.
pub fn validate_non_empty_update(parameter: &str, value: &str) -> ValidationResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(ValidationError::Empty {
            parameter: parameter.to_string(),
        })
    } else {
        Ok(trimmed.to_string())
    }
}

/// Trims an optional descriptive string; blank means "no value".
pub fn normalize_optional_text(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
