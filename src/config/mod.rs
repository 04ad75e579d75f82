//! Configuration module for wikivault
//!
//! This module handles loading, parsing, and validating TOML configuration
//! files, including substituting the `{timestamp}` placeholder in output
//! path templates.
//!
//! # Example
//!
//! ```no_run
//! use wikivault::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("config.toml")).unwrap();
//! println!("Crawl root: {}", config.crawl.root_category);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    BackoffConfig, Config, CrawlConfig, MailConfig, OutputConfig, ReceiverConfig, SiteConfig,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash};
