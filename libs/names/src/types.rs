//! Typed name definitions for all queue engine entities.

use crate::{define_name, NameError};

define_name!(DeploymentName, "Deployment", 5, 50);
define_name!(PodName, "Pod", 5, 20);
define_name!(ConfigurationName, "Configuration", 4, 20);

/// Returns true if `c` may appear in an entity name.
#[must_use]
pub fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_')
}

/// Trims and validates a raw name against the shared rules.
///
/// Used by the generated name types; exposed so callers can validate
/// names for kinds that do not have a dedicated type.
pub fn validate_name(
    kind: &'static str,
    min: usize,
    max: usize,
    raw: &str,
) -> Result<String, NameError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(NameError::Empty { kind });
    }

    if !trimmed.chars().all(is_name_char) {
        return Err(NameError::InvalidCharacter {
            kind,
            value: trimmed.to_string(),
        });
    }

    // Only ASCII is allowed past this point, so byte length == char count.
    let len = trimmed.len();
    if len < min {
        return Err(NameError::TooShort {
            kind,
            value: trimmed.to_string(),
            min,
        });
    }
    if len > max {
        return Err(NameError::TooLong {
            kind,
            value: trimmed.to_string(),
            max,
        });
    }

    Ok(trimmed.to_string())
}
