//! Validation for number group names
//!
//! Group names appear inside space-separated condition text, so they are
//! restricted to visible ASCII: no whitespace, no control characters.

use crate::error::{ConditionError, Result};
use regex::Regex;
use std::sync::OnceLock;

/// Pattern for valid group names (printable ASCII excluding space)
const GROUP_NAME_PATTERN: &str = r"^[!-~]+$";

fn group_name_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(GROUP_NAME_PATTERN).unwrap())
}

/// Validate a number group name
///
/// # Examples
///
/// ```
/// use tomoyo_cond::validation::validate_group_name;
///
/// assert!(validate_group_name("trusted_uids").is_ok());
/// assert!(validate_group_name("two words").is_err());
/// assert!(validate_group_name("").is_err());
/// ```
pub fn validate_group_name(name: &str) -> Result<()> {
    if !group_name_regex().is_match(name) {
        return Err(ConditionError::InvalidGroupName {
            name: name.to_string(),
        });
    }

    // '@' is the reference marker
    if name.starts_with('@') {
        return Err(ConditionError::InvalidGroupName {
            name: name.to_string(),
        });
    }

    Ok(())
}
