//! Configuration validation rules.

use super::schema::Config;

/// Validate configuration and return aggregated validation errors.
pub fn validate_config(config: &Config) -> crate::Result<()> {
    let mut errors = Vec::new();

    let base_url = config.server.base_url.trim();
    if base_url.is_empty() {
        errors.push("server.base_url must not be empty".to_string());
    } else if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
        errors.push("server.base_url must start with http:// or https://".to_string());
    }
    if config.storage.dir.trim().is_empty() {
        errors.push("storage.dir must not be empty".to_string());
    }
    if config.ui.narrow_breakpoint == 0 {
        errors.push("ui.narrow_breakpoint must be > 0".to_string());
    }
    if config.ui.cell_width_px == 0 {
        errors.push("ui.cell_width_px must be > 0".to_string());
    }
    if config.ui.max_attachment_bytes == 0 {
        errors.push("ui.max_attachment_bytes must be > 0".to_string());
    }
    if !matches!(config.logging.format.to_lowercase().as_str(), "text" | "json") {
        errors.push("logging.format must be one of: text, json".to_string());
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(crate::Error::Validation(errors.join("; ")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_accepts_defaults() {
        validate_config(&Config::default()).unwrap();
    }

    #[test]
    fn test_validate_rejects_non_http_base_url() {
        let mut config = Config::default();
        config.server.base_url = "ftp://example.com".to_string();

        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("server.base_url"));
    }

    #[test]
    fn test_validate_aggregates_errors() {
        let mut config = Config::default();
        config.ui.narrow_breakpoint = 0;
        config.logging.format = "xml".to_string();

        let err = validate_config(&config).unwrap_err().to_string();
        assert!(err.contains("ui.narrow_breakpoint"));
        assert!(err.contains("logging.format"));
    }
}
