use crate::config::types::{Config, CrawlConfig, MailConfig, OutputConfig, SiteConfig};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawl_config(&config.crawl)?;
    validate_site_config(&config.site)?;
    validate_output_config(&config.output)?;
    if let Some(mail) = &config.mail {
        validate_mail_config(mail)?;
    }
    Ok(())
}

/// Validates crawl configuration
fn validate_crawl_config(config: &CrawlConfig) -> Result<(), ConfigError> {
    if !config.root_category.starts_with("Category:") {
        return Err(ConfigError::Validation(format!(
            "root_category must start with 'Category:', got '{}'",
            config.root_category
        )));
    }

    if config.io_concurrency < 1 || config.io_concurrency > 100 {
        return Err(ConfigError::Validation(format!(
            "io_concurrency must be between 1 and 100, got {}",
            config.io_concurrency
        )));
    }

    if config.retry_attempts < 1 {
        return Err(ConfigError::Validation(format!(
            "retry_attempts must be >= 1, got {}",
            config.retry_attempts
        )));
    }

    if let Some(backoff) = &config.backoff {
        if backoff.multiplier < 1 {
            return Err(ConfigError::Validation(format!(
                "backoff multiplier must be >= 1, got {}",
                backoff.multiplier
            )));
        }
        if backoff.max_ms < backoff.initial_ms {
            return Err(ConfigError::Validation(format!(
                "backoff max-ms ({}) must be >= initial-ms ({})",
                backoff.max_ms, backoff.initial_ms
            )));
        }
    }

    Ok(())
}

/// Validates site endpoint configuration
fn validate_site_config(config: &SiteConfig) -> Result<(), ConfigError> {
    validate_http_url("base-url", &config.base_url)?;
    validate_http_url("export-url", &config.export_url)?;

    if config.export_page_title.is_empty() {
        return Err(ConfigError::Validation(
            "export-page-title cannot be empty".to_string(),
        ));
    }

    if config.request_timeout_secs < 1 {
        return Err(ConfigError::Validation(format!(
            "request-timeout-secs must be >= 1, got {}",
            config.request_timeout_secs
        )));
    }

    Ok(())
}

/// Validates output artifact configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    for (name, path) in [
        ("map-path", &config.map_path),
        ("manifest-path", &config.manifest_path),
        ("backup-path", &config.backup_path),
        ("archive-path", &config.archive_path),
        ("trace-path", &config.trace_path),
    ] {
        if path.is_empty() {
            return Err(ConfigError::Validation(format!("{} cannot be empty", name)));
        }
    }

    if config.buffer_size < 512 {
        return Err(ConfigError::Validation(format!(
            "buffer-size must be >= 512 bytes, got {}",
            config.buffer_size
        )));
    }

    Ok(())
}

/// Validates mail configuration
fn validate_mail_config(config: &MailConfig) -> Result<(), ConfigError> {
    if config.host.is_empty() {
        return Err(ConfigError::Validation(
            "mail host cannot be empty".to_string(),
        ));
    }

    validate_email("from-email", &config.from_email)?;

    if config.receivers.is_empty() {
        return Err(ConfigError::Validation(
            "mail is enabled but no receivers are configured".to_string(),
        ));
    }

    for receiver in &config.receivers {
        validate_email("receiver address", &receiver.address)?;
    }

    Ok(())
}

/// Validates that a string parses as an http(s) URL
fn validate_http_url(name: &str, value: &str) -> Result<(), ConfigError> {
    let url = Url::parse(value)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid {}: {}", name, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "{} must use http or https, got '{}'",
            name, value
        )));
    }

    Ok(())
}

/// Basic email validation
fn validate_email(name: &str, email: &str) -> Result<(), ConfigError> {
    if email.is_empty() {
        return Err(ConfigError::Validation(format!("{} cannot be empty", name)));
    }

    // Basic email format check: must contain @ and have text on both sides
    let parts: Vec<&str> = email.split('@').collect();
    if parts.len() != 2 || parts[0].is_empty() || parts[1].is_empty() {
        return Err(ConfigError::Validation(format!(
            "Invalid {}: '{}'",
            name, email
        )));
    }

    // Domain part should contain at least one dot
    if !parts[1].contains('.') {
        return Err(ConfigError::Validation(format!(
            "Invalid {} domain: '{}'",
            name, email
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::types::{BackoffConfig, ReceiverConfig};

    fn crawl_config() -> CrawlConfig {
        CrawlConfig {
            root_category: "Category:Example".to_string(),
            io_concurrency: 4,
            retry_attempts: 3,
            backoff: None,
            query_creators: true,
            follow_member_categories: true,
            excluded_categories: vec![],
        }
    }

    #[test]
    fn test_validate_crawl_config() {
        assert!(validate_crawl_config(&crawl_config()).is_ok());

        let mut bad_root = crawl_config();
        bad_root.root_category = "Example".to_string();
        assert!(validate_crawl_config(&bad_root).is_err());

        let mut bad_concurrency = crawl_config();
        bad_concurrency.io_concurrency = 0;
        assert!(validate_crawl_config(&bad_concurrency).is_err());

        let mut bad_retries = crawl_config();
        bad_retries.retry_attempts = 0;
        assert!(validate_crawl_config(&bad_retries).is_err());
    }

    #[test]
    fn test_validate_backoff_bounds() {
        let mut config = crawl_config();
        config.backoff = Some(BackoffConfig {
            initial_ms: 1000,
            multiplier: 2,
            max_ms: 8000,
        });
        assert!(validate_crawl_config(&config).is_ok());

        config.backoff = Some(BackoffConfig {
            initial_ms: 8000,
            multiplier: 2,
            max_ms: 1000,
        });
        assert!(validate_crawl_config(&config).is_err());
    }

    #[test]
    fn test_validate_http_url() {
        assert!(validate_http_url("base-url", "https://wiki.example.org").is_ok());
        assert!(validate_http_url("base-url", "http://127.0.0.1:8080").is_ok());

        assert!(validate_http_url("base-url", "").is_err());
        assert!(validate_http_url("base-url", "not a url").is_err());
        assert!(validate_http_url("base-url", "ftp://example.org").is_err());
    }

    #[test]
    fn test_validate_email() {
        assert!(validate_email("address", "user@example.com").is_ok());
        assert!(validate_email("address", "admin@sub.example.com").is_ok());

        assert!(validate_email("address", "").is_err());
        assert!(validate_email("address", "invalid").is_err());
        assert!(validate_email("address", "@example.com").is_err());
        assert!(validate_email("address", "user@").is_err());
        assert!(validate_email("address", "user@domain").is_err());
    }

    #[test]
    fn test_validate_mail_requires_receivers() {
        let mail = MailConfig {
            host: "smtp.example.com".to_string(),
            port: None,
            from_user: "bot".to_string(),
            from_email: "bot@example.com".to_string(),
            auth_code: "secret".to_string(),
            subject: "backup".to_string(),
            receivers: vec![],
        };
        assert!(validate_mail_config(&mail).is_err());

        let mut with_receiver = mail;
        with_receiver.receivers.push(ReceiverConfig {
            address: "ops@example.com".to_string(),
            subject: None,
            send_archive: true,
            send_manifest: false,
            send_trace: true,
        });
        assert!(validate_mail_config(&with_receiver).is_ok());
    }
}
