use crate::utils::error::{DeepWikiError, Result};
use url::Url;

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

pub fn validate_url(field_name: &str, url_str: &str) -> Result<()> {
    validate_url_scheme(field_name, url_str, &["http", "https"])
}

pub fn validate_ws_url(field_name: &str, url_str: &str) -> Result<()> {
    validate_url_scheme(field_name, url_str, &["ws", "wss"])
}

fn validate_url_scheme(field_name: &str, url_str: &str, schemes: &[&str]) -> Result<()> {
    if url_str.is_empty() {
        return Err(DeepWikiError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: url_str.to_string(),
            reason: "URL cannot be empty".to_string(),
        });
    }

    match Url::parse(url_str) {
        Ok(url) if schemes.contains(&url.scheme()) => Ok(()),
        Ok(url) => Err(DeepWikiError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: url_str.to_string(),
            reason: format!(
                "Unsupported URL scheme: {} (expected {})",
                url.scheme(),
                schemes.join(" or ")
            ),
        }),
        Err(e) => Err(DeepWikiError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: url_str.to_string(),
            reason: format!("Invalid URL format: {}", e),
        }),
    }
}

pub fn validate_path(field_name: &str, path: &str) -> Result<()> {
    if path.is_empty() {
        return Err(DeepWikiError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: path.to_string(),
            reason: "Path cannot be empty".to_string(),
        });
    }

    if path.contains('\0') {
        return Err(DeepWikiError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: path.to_string(),
            reason: "Path contains null bytes".to_string(),
        });
    }

    Ok(())
}

pub fn validate_positive_number(field_name: &str, value: u64, min_value: u64) -> Result<()> {
    if value < min_value {
        return Err(DeepWikiError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: format!("Value must be at least {}", min_value),
        });
    }
    Ok(())
}

pub fn validate_non_empty_string(field_name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(DeepWikiError::MissingConfigError {
            field: field_name.to_string(),
        });
    }
    Ok(())
}

/// 檢查值是否在允許清單中（不分大小寫），回傳正規化後的小寫值
pub fn validate_choice(field_name: &str, value: &str, allowed: &[&str]) -> Result<String> {
    validate_non_empty_string(field_name, value)?;

    let normalized = value.trim().to_ascii_lowercase();
    if allowed.contains(&normalized.as_str()) {
        Ok(normalized)
    } else {
        Err(DeepWikiError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: format!("Supported values: {}", allowed.join(", ")),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_url() {
        assert!(validate_url("backend.base_url", "https://example.com").is_ok());
        assert!(validate_url("backend.base_url", "http://localhost:8001").is_ok());
        assert!(validate_url("backend.base_url", "").is_err());
        assert!(validate_url("backend.base_url", "invalid-url").is_err());
        assert!(validate_url("backend.base_url", "ws://localhost:8001").is_err());
    }

    #[test]
    fn test_validate_ws_url() {
        assert!(validate_ws_url("backend.ws_url", "ws://localhost:8001/ws/chat").is_ok());
        assert!(validate_ws_url("backend.ws_url", "wss://wiki.example.com/ws/chat").is_ok());
        assert!(validate_ws_url("backend.ws_url", "http://localhost:8001/ws/chat").is_err());
    }

    #[test]
    fn test_validate_positive_number() {
        assert!(validate_positive_number("backend.request_timeout_secs", 30, 1).is_ok());
        assert!(validate_positive_number("backend.request_timeout_secs", 0, 1).is_err());
    }

    #[test]
    fn test_validate_choice_normalizes_case() {
        let value = validate_choice("format", " HTML ", &["zip", "markdown", "html"]).unwrap();
        assert_eq!(value, "html");

        let err = validate_choice("format", "pdf", &["zip", "markdown", "html"]).unwrap_err();
        assert!(err.to_string().contains("zip, markdown, html"));

        assert!(matches!(
            validate_choice("format", "   ", &["zip"]),
            Err(DeepWikiError::MissingConfigError { .. })
        ));
    }

    #[test]
    fn test_validate_path() {
        assert!(validate_path("defaults.output_root", "data").is_ok());
        assert!(validate_path("defaults.output_root", "").is_err());
        assert!(validate_path("defaults.output_root", "da\0ta").is_err());
    }
}
