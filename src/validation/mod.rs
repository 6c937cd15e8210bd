//! Request input validation.
//!
//! Guards here run before any store access. Each one trims first and
//! returns the cleaned value, so handlers never persist padding.

pub mod input_guards;

pub use input_guards::{
    ValidationError, ValidationResult, normalize_optional_text, parse_uuid, parse_uuid_param,
    require_trimmed, validate_non_empty_update, validate_non_negative,
};
