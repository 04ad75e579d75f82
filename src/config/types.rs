use serde::Deserialize;

/// Main configuration structure for wikivault
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub crawl: CrawlConfig,
    pub site: SiteConfig,
    pub output: OutputConfig,
    /// Absent table disables mail; the run report goes to the log instead.
    #[serde(default)]
    pub mail: Option<MailConfig>,
}

/// Crawl behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlConfig {
    /// Root category reference the crawl is seeded with (must carry the
    /// "Category:" prefix)
    #[serde(rename = "root-category")]
    pub root_category: String,

    /// Maximum number of concurrent outbound requests
    #[serde(rename = "io-concurrency")]
    pub io_concurrency: u32,

    /// Maximum fetch attempts per node (including the first)
    #[serde(rename = "retry-attempts")]
    pub retry_attempts: u32,

    /// Delay schedule between failed attempts; absent means no delay
    #[serde(default)]
    pub backoff: Option<BackoffConfig>,

    /// Whether content leaves trigger a reverse category lookup
    #[serde(rename = "query-creators", default = "default_true")]
    pub query_creators: bool,

    /// Whether content leaves also expand their own "Category:<name>" page
    #[serde(rename = "follow-member-categories", default = "default_true")]
    pub follow_member_categories: bool,

    /// Category names dropped from reverse-lookup results
    #[serde(rename = "excluded-categories", default)]
    pub excluded_categories: Vec<String>,
}

/// Retry delay schedule
#[derive(Debug, Clone, Deserialize)]
pub struct BackoffConfig {
    /// Delay before the second attempt (milliseconds)
    #[serde(rename = "initial-ms")]
    pub initial_ms: u64,

    /// Factor applied to the delay after each failed attempt
    pub multiplier: u32,

    /// Upper bound on the delay (milliseconds)
    #[serde(rename = "max-ms")]
    pub max_ms: u64,
}

/// Wiki site endpoints
#[derive(Debug, Clone, Deserialize)]
pub struct SiteConfig {
    /// Base URL of the wiki being inventoried
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Bulk export endpoint on the mirror site
    #[serde(rename = "export-url")]
    pub export_url: String,

    /// Value of the "title" form field in the export request
    #[serde(rename = "export-page-title")]
    pub export_page_title: String,

    /// Per-request timeout (seconds)
    #[serde(rename = "request-timeout-secs")]
    pub request_timeout_secs: u64,
}

/// Output artifact configuration
///
/// Every path is a template; a single `{timestamp}` placeholder is replaced
/// with the run's start time at config load.
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Category → member-pages map (JSON)
    #[serde(rename = "map-path")]
    pub map_path: String,

    /// Flattened sorted page list, one title per line
    #[serde(rename = "manifest-path")]
    pub manifest_path: String,

    /// Raw backup stream from the export endpoint
    #[serde(rename = "backup-path")]
    pub backup_path: String,

    /// Single-entry compressed archive of the backup
    #[serde(rename = "archive-path")]
    pub archive_path: String,

    /// Failure trace text, written only on the failure branch
    #[serde(rename = "trace-path")]
    pub trace_path: String,

    /// Copy buffer size for streaming and compression (bytes)
    #[serde(rename = "buffer-size")]
    pub buffer_size: usize,
}

/// Mail transport and report configuration
#[derive(Debug, Clone, Deserialize)]
pub struct MailConfig {
    /// SMTP relay host
    pub host: String,

    /// SMTP port override; the relay default is used when absent
    #[serde(default)]
    pub port: Option<u16>,

    /// SMTP login user
    #[serde(rename = "from-user")]
    pub from_user: String,

    /// Sender address
    #[serde(rename = "from-email")]
    pub from_email: String,

    /// SMTP authorization code / password
    #[serde(rename = "auth-code")]
    pub auth_code: String,

    /// Default report subject; receivers may override
    pub subject: String,

    #[serde(default)]
    pub receivers: Vec<ReceiverConfig>,
}

/// One report receiver with its own attachment selection
#[derive(Debug, Clone, Deserialize)]
pub struct ReceiverConfig {
    /// Receiver address
    pub address: String,

    /// Subject override for this receiver
    #[serde(default)]
    pub subject: Option<String>,

    /// Attach the compressed archive
    #[serde(rename = "send-archive", default)]
    pub send_archive: bool,

    /// Attach the sorted manifest
    #[serde(rename = "send-manifest", default)]
    pub send_manifest: bool,

    /// Attach the failure trace (failure branch only)
    #[serde(rename = "send-trace", default)]
    pub send_trace: bool,
}

fn default_true() -> bool {
    true
}
