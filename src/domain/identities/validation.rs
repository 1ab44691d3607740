//! Shared validation rules for identifiers.

/// Check that `id` is usable as a logical resource name.
///
/// Rules:
/// - Non-empty and at most `MAX_NAME_LEN` characters
/// - Starts with an ASCII letter
/// - Contains only ASCII alphanumerics, `-`, or `_`
pub fn validate_identifier(id: &str) -> bool {
    let mut chars = id.chars();
    let Some(first) = chars.next() else {
        return false;
    };

    id.len() <= MAX_NAME_LEN
        && first.is_ascii_alphabetic()
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// Upper bound shared with the provider's logical-id limit.
pub const MAX_NAME_LEN: usize = 128;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_identifiers() {
        assert!(validate_identifier("brokerDataTable"));
        assert!(validate_identifier("bro-ker-apiMapping"));
        assert!(validate_identifier("stock_api_role2"));
    }

    #[test]
    fn invalid_identifiers() {
        assert!(!validate_identifier(""));
        assert!(!validate_identifier("1table"));
        assert!(!validate_identifier("-route"));
        assert!(!validate_identifier("api/route"));
        assert!(!validate_identifier("has space"));
        assert!(!validate_identifier("a.b"));
    }

    #[test]
    fn overlong_identifier_is_invalid() {
        let name = "a".repeat(MAX_NAME_LEN + 1);
        assert!(!validate_identifier(&name));
        assert!(validate_identifier(&name[..MAX_NAME_LEN]));
    }
}
