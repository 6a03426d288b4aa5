//! Input validators for request parameters.

use crate::error::CoreError;

/// Maximum accepted length for identifier parameters.
pub const MAX_ID_LEN: usize = 256;

/// Validate that a user id is non-empty and within length limits.
pub fn validate_user_id(user_id: &str) -> Result<(), CoreError> {
    validate_id("user-id", user_id)
}

/// Validate that a route id is non-empty and within length limits.
pub fn validate_route_id(route_id: &str) -> Result<(), CoreError> {
    validate_id("route-id", route_id)
}

fn validate_id(field: &str, value: &str) -> Result<(), CoreError> {
    if value.is_empty() {
        return Err(CoreError::Validation(format!("{field} must not be empty")));
    }
    if value.len() > MAX_ID_LEN {
        return Err(CoreError::Validation(format!(
            "{field} exceeds {MAX_ID_LEN} characters"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn accepts_ordinary_ids() {
        assert!(validate_user_id("user345678").is_ok());
        assert!(validate_route_id("routeA000000").is_ok());
    }

    #[test]
    fn rejects_empty_ids() {
        assert_matches!(validate_user_id(""), Err(CoreError::Validation(_)));
        assert_matches!(validate_route_id(""), Err(CoreError::Validation(_)));
    }

    #[test]
    fn rejects_oversized_ids() {
        let long = "x".repeat(MAX_ID_LEN + 1);
        assert_matches!(validate_user_id(&long), Err(CoreError::Validation(_)));
    }
}
