use crate::config::types::Config;
use crate::config::validation::validate;
use crate::ConfigError;
use sha2::{Digest, Sha256};
use std::path::Path;

/// Format of the timestamp substituted into output path templates
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";

/// Loads and parses a configuration file from the given path
///
/// Output path templates have their `{timestamp}` placeholder replaced with
/// the load time, so every run writes a fresh set of artifacts.
///
/// # Arguments
///
/// * `path` - Path to the TOML configuration file
///
/// # Returns
///
/// * `Ok(Config)` - Successfully loaded and validated configuration
/// * `Err(ConfigError)` - Failed to load, parse, or validate the configuration
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    // Read the configuration file
    let content = std::fs::read_to_string(path)?;

    // Parse TOML
    let mut config: Config = toml::from_str(&content)?;

    // Validate the configuration before touching the templates
    validate(&config)?;

    // Stamp the output paths
    let timestamp = chrono::Local::now().format(TIMESTAMP_FORMAT).to_string();
    stamp_output_paths(&mut config, &timestamp);

    Ok(config)
}

/// Computes a SHA-256 hash of the configuration file content
///
/// Logged at startup so a run can be traced back to the exact configuration
/// that produced it.
///
/// # Arguments
///
/// * `path` - Path to the TOML configuration file
///
/// # Returns
///
/// * `Ok(String)` - Hex-encoded SHA-256 hash of the file content
/// * `Err(ConfigError)` - Failed to read the file
pub fn compute_config_hash(path: &Path) -> Result<String, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    let result = hasher.finalize();
    Ok(hex::encode(result))
}

/// Loads a configuration and returns both the config and its hash
pub fn load_config_with_hash(path: &Path) -> Result<(Config, String), ConfigError> {
    let config = load_config(path)?;
    let hash = compute_config_hash(path)?;
    Ok((config, hash))
}

/// Replaces the `{timestamp}` placeholder in every output path template
fn stamp_output_paths(config: &mut Config, timestamp: &str) {
    let output = &mut config.output;
    for path in [
        &mut output.map_path,
        &mut output.manifest_path,
        &mut output.backup_path,
        &mut output.archive_path,
        &mut output.trace_path,
    ] {
        *path = substitute_timestamp(path, timestamp);
    }
}

/// Replaces the single `{timestamp}` placeholder, if present
fn substitute_timestamp(template: &str, timestamp: &str) -> String {
    template.replace("{timestamp}", timestamp)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_temp_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    fn valid_config_content() -> &'static str {
        r#"
[crawl]
root-category = "Category:Example"
io-concurrency = 4
retry-attempts = 3

[site]
base-url = "https://wiki.example.org"
export-url = "https://mirror.example.org/Special:Export"
export-page-title = "Special:Export"
request-timeout-secs = 30

[output]
map-path = "./out/map-{timestamp}.json"
manifest-path = "./out/manifest-{timestamp}.txt"
backup-path = "./out/backup-{timestamp}.xml"
archive-path = "./out/backup-{timestamp}.zip"
trace-path = "./out/trace-{timestamp}.txt"
buffer-size = 4096
"#
    }

    #[test]
    fn test_load_valid_config() {
        let file = create_temp_config(valid_config_content());
        let config = load_config(file.path()).unwrap();

        assert_eq!(config.crawl.root_category, "Category:Example");
        assert_eq!(config.crawl.io_concurrency, 4);
        assert_eq!(config.crawl.retry_attempts, 3);
        assert!(config.crawl.query_creators);
        assert!(config.crawl.follow_member_categories);
        assert!(config.mail.is_none());
    }

    #[test]
    fn test_timestamp_is_substituted() {
        let file = create_temp_config(valid_config_content());
        let config = load_config(file.path()).unwrap();

        assert!(!config.output.map_path.contains("{timestamp}"));
        assert!(!config.output.archive_path.contains("{timestamp}"));
        assert!(config.output.map_path.starts_with("./out/map-"));
    }

    #[test]
    fn test_substitute_timestamp_without_placeholder() {
        assert_eq!(
            substitute_timestamp("./fixed/path.xml", "2024-01-01_00-00-00"),
            "./fixed/path.xml"
        );
    }

    #[test]
    fn test_load_config_with_invalid_path() {
        let result = load_config(Path::new("/nonexistent/config.toml"));
        assert!(result.is_err());
    }

    #[test]
    fn test_load_config_with_invalid_toml() {
        let config_content = "this is not valid TOML {{{";
        let file = create_temp_config(config_content);
        let result = load_config(file.path());
        assert!(result.is_err());
    }

    #[test]
    fn test_load_config_with_validation_error() {
        let config_content = valid_config_content().replace("io-concurrency = 4", "io-concurrency = 0");
        let file = create_temp_config(&config_content);
        let result = load_config(file.path());
        assert!(result.is_err());
        assert!(matches!(result.unwrap_err(), ConfigError::Validation(_)));
    }

    #[test]
    fn test_compute_config_hash() {
        let config_content = "test content";
        let file = create_temp_config(config_content);

        let hash1 = compute_config_hash(file.path()).unwrap();
        let hash2 = compute_config_hash(file.path()).unwrap();

        // Same content should produce same hash
        assert_eq!(hash1, hash2);
        assert_eq!(hash1.len(), 64); // SHA-256 produces 64 hex characters
    }

    #[test]
    fn test_different_content_different_hash() {
        let file1 = create_temp_config("content 1");
        let file2 = create_temp_config("content 2");

        let hash1 = compute_config_hash(file1.path()).unwrap();
        let hash2 = compute_config_hash(file2.path()).unwrap();

        assert_ne!(hash1, hash2);
    }
}
