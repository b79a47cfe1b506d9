//! Validation for the strings that end up inside an encoded path.
//!
//! A field token is rendered as `name_value`, tokens within a level are joined
//! by `.`, and levels are joined by `/`. Everything here exists so that the
//! rendered path decodes back to exactly the same key:
//!
//! - Names must be non-empty and must not contain `_`, `.` or `/`
//! - Values must be non-empty and must not contain `.` or `/` (a value may
//!   contain `_`, since only the first `_` of a token is the separator)
//! - The root prefix must be a single non-empty path component, other than
//!   `.` or `..`
//! - None of them may contain control characters or `\`

use crate::error::{KeyError, KeyResult};

/// Separator between a field name and its value.
pub const NAME_VALUE_SEPARATOR: char = '_';

/// Separator between the fields of one level.
pub const FIELD_SEPARATOR: char = '.';

/// Separator between levels (and between the prefix and the root level).
pub const LEVEL_SEPARATOR: char = '/';

/// Characters that are forbidden in every path-bound string.
const FORBIDDEN_CHARS: &[char] = &[LEVEL_SEPARATOR, '\\'];

fn invalid_field(name: &str, reason: impl Into<String>) -> KeyError {
    KeyError::InvalidField {
        name: name.to_string(),
        reason: reason.into(),
    }
}

fn check_common(s: &str) -> Result<(), String> {
    if s.is_empty() {
        return Err("must not be empty".into());
    }
    for ch in FORBIDDEN_CHARS {
        if s.contains(*ch) {
            return Err(format!("contains forbidden character: {ch:?}"));
        }
    }
    if let Some(ch) = s.chars().find(|c| c.is_control()) {
        return Err(format!("contains control character: {ch:?}"));
    }
    Ok(())
}

/// Validate a field name, returning `Ok(())` if valid.
///
/// # Examples
///
/// ```
/// use treekv_key::names::validate_field_name;
///
/// assert!(validate_field_name("borrower").is_ok());
/// assert!(validate_field_name("loan_id").is_err());
/// assert!(validate_field_name("").is_err());
/// ```
pub fn validate_field_name(name: &str) -> KeyResult<()> {
    check_common(name).map_err(|reason| invalid_field(name, reason))?;

    if name.contains(NAME_VALUE_SEPARATOR) {
        return Err(invalid_field(name, "name must not contain '_'"));
    }
    if name.contains(FIELD_SEPARATOR) {
        return Err(invalid_field(name, "name must not contain '.'"));
    }
    Ok(())
}

/// Validate a field value. `name` is only used for the error message.
pub fn validate_field_value(name: &str, value: &str) -> KeyResult<()> {
    check_common(value).map_err(|reason| invalid_field(name, format!("value {value:?} {reason}")))?;

    if value.contains(FIELD_SEPARATOR) {
        return Err(invalid_field(
            name,
            format!("value {value:?} must not contain '.'"),
        ));
    }
    Ok(())
}

/// Validate a root prefix.
pub fn validate_prefix(prefix: &str) -> KeyResult<()> {
    check_common(prefix).map_err(|reason| KeyError::InvalidPrefix {
        prefix: prefix.to_string(),
        reason,
    })?;

    if prefix == "." || prefix == ".." {
        return Err(KeyError::InvalidPrefix {
            prefix: prefix.to_string(),
            reason: "must not be a relative path component".into(),
        });
    }
    Ok(())
}
