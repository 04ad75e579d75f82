//! Wikivault: a wiki category-tree inventory and backup tool
//!
//! This crate crawls a hierarchical wiki category tree, records which
//! category each content page belongs to, downloads a bulk export of the
//! discovered pages from a mirror endpoint, compresses it, and reports the
//! outcome by mail or structured log.

pub mod config;
pub mod crawl;
pub mod page;
pub mod pipeline;

use thiserror::Error;

/// Main error type for wikivault operations
#[derive(Debug, Error)]
pub enum WikivaultError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("HTTP error for {url}: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("HTTP status {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("Parse error in {context}: {message}")]
    Parse { context: String, message: String },

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("Mail transport error: {0}")]
    MailTransport(#[from] lettre::transport::smtp::Error),

    #[error("Invalid mail address: {0}")]
    MailAddress(#[from] lettre::address::AddressError),

    #[error("Failed to build mail message: {0}")]
    MailMessage(#[from] lettre::error::Error),

    #[error("Worker task failed: {0}")]
    TaskJoin(#[from] tokio::task::JoinError),
}

impl WikivaultError {
    /// Returns true if retrying the failed operation could succeed.
    ///
    /// Network faults and HTTP error statuses are retryable; parse errors
    /// and local IO are not.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Http { .. } | Self::Status { .. })
    }
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Result type alias for wikivault operations
pub type Result<T> = std::result::Result<T, WikivaultError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use crawl::{
    CrawlOrchestrator, FrontierStore, QuiescenceDetector, ResultAggregator, RetryPolicy,
};
pub use page::{classify, RefKind};
