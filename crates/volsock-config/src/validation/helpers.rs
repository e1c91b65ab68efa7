//! Shared validation helpers.

/// Push an error if `value` is below `min`.
pub(crate) fn validate_min(errors: &mut Vec<String>, name: &str, value: u64, min: u64) {
    if value < min {
        errors.push(format!("{name} = {value} must be at least {min}"));
    }
}
