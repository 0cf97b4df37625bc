//! Masking helpers for log output.
//!
//! Emails, keys and tokens are never written to logs in full.

/// Placeholder written instead of a value that is too short to mask.
pub const HIDDEN: &str = "[hidden]";

/// Keep `keep_start` leading and `keep_end` trailing characters.
///
/// Values that would reveal everything (or are empty) become [`HIDDEN`].
pub fn masked_value(value: Option<&str>, keep_start: usize, keep_end: usize) -> String {
    let value = match value {
        Some(v) if !v.is_empty() => v,
        _ => return HIDDEN.to_string(),
    };

    let chars: Vec<char> = value.chars().collect();
    if chars.len() <= keep_start + keep_end {
        return HIDDEN.to_string();
    }

    let start: String = chars[..keep_start].iter().collect();
    let end: String = chars[chars.len() - keep_end..].iter().collect();
    format!("{}…{}", start, end)
}

/// Mask the local part of an email, keeping the domain readable.
pub fn mask_email(email: Option<&str>) -> String {
    let email = match email {
        Some(e) if !e.is_empty() => e,
        _ => return HIDDEN.to_string(),
    };

    match email.split_once('@') {
        Some((user, domain)) if !domain.is_empty() => {
            let domain = domain.split('@').next().unwrap_or(domain);
            format!("{}@{}", masked_value(Some(user), 1, 1), domain)
        }
        _ => masked_value(Some(email), 1, 1),
    }
}

/// Mask a bearer token (show first 8 chars only)
pub fn mask_token(token: &str) -> String {
    if token.chars().count() > 8 {
        let head: String = token.chars().take(8).collect();
        format!("{}...", head)
    } else {
        "***".to_string()
    }
}

/// Identifier for correlating the log lines of one request.
pub fn correlation_id(prefix: &str) -> String {
    format!("{}-{}", prefix, uuid::Uuid::new_v4())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_masked_value() {
        assert_eq!(masked_value(None, 2, 2), HIDDEN);
        assert_eq!(masked_value(Some(""), 2, 2), HIDDEN);
        assert_eq!(masked_value(Some("abcd"), 2, 2), HIDDEN);
        assert_eq!(masked_value(Some("abcde"), 2, 2), "ab…de");
        assert_eq!(masked_value(Some("service-role-key"), 2, 2), "se…ey");
    }

    #[test]
    fn test_masked_value_multibyte() {
        assert_eq!(masked_value(Some("joão"), 1, 1), "j…o");
    }

    #[test]
    fn test_mask_email() {
        assert_eq!(mask_email(None), HIDDEN);
        assert_eq!(mask_email(Some("maria@example.pt")), "m…a@example.pt");
        // Local part too short to mask
        assert_eq!(mask_email(Some("ab@example.pt")), "[hidden]@example.pt");
        // No domain at all
        assert_eq!(mask_email(Some("support")), "s…t");
        assert_eq!(mask_email(Some("support@")), "s…@");
    }

    #[test]
    fn test_mask_token() {
        assert_eq!(mask_token("short"), "***");
        assert_eq!(mask_token("12345678"), "***");
        assert_eq!(mask_token("1234567890abcdef"), "12345678...");
    }

    #[test]
    fn test_correlation_id() {
        let a = correlation_id("login");
        let b = correlation_id("login");
        assert!(a.starts_with("login-"));
        assert_eq!(a.len(), "login-".len() + 36);
        assert_ne!(a, b);
    }
}
