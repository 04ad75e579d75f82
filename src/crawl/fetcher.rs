//! HTTP access to the wiki and its mirror
//!
//! One `SiteClient` per run wraps the reqwest client, the configured
//! endpoints, and the I/O semaphore that caps concurrent outbound
//! requests. Every fetch holds a permit for the full request, so the cap
//! covers connection and body transfer alike.

use crate::config::SiteConfig;
use crate::page::{self, RefKind};
use crate::{Result, WikivaultError};
use reqwest::{Client, StatusCode};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use url::Url;

/// Builds the HTTP client shared by a run
pub fn build_http_client(timeout_secs: u64) -> std::result::Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(concat!("wikivault/", env!("CARGO_PKG_VERSION")))
        .timeout(Duration::from_secs(timeout_secs))
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// HTTP collaborator for category listings, the membership API, and the
/// bulk export endpoint
pub struct SiteClient {
    client: Client,
    base_url: String,
    export_url: String,
    export_page_title: String,
    io_permits: Arc<Semaphore>,
}

impl SiteClient {
    /// Creates a client for the configured site with the given request cap
    pub fn new(config: &SiteConfig, io_concurrency: u32) -> Result<Self> {
        let client = build_http_client(config.request_timeout_secs)?;
        Ok(Self::from_parts(client, config, io_concurrency))
    }

    /// Assembles a client from an already-built reqwest client
    pub fn from_parts(client: Client, config: &SiteConfig, io_concurrency: u32) -> Self {
        Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            export_url: config.export_url.clone(),
            export_page_title: config.export_page_title.clone(),
            io_permits: Arc::new(Semaphore::new(io_concurrency.max(1) as usize)),
        }
    }

    /// Fetches the raw HTML of a category listing or continuation page
    pub async fn fetch_category_page(&self, reference: &str) -> Result<String> {
        let url = self.listing_url(reference)?;
        let _permit = self.io_permits.acquire().await.expect("semaphore closed");

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| http_error(&url, e))?;
        let status = response.status();
        if !status.is_success() {
            return Err(WikivaultError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        response.text().await.map_err(|e| http_error(&url, e))
    }

    /// Fetches the raw category-membership API response for a page title
    ///
    /// Returns `Ok(None)` for HTTP 404: the page simply has no entry, which
    /// is not a fault worth retrying.
    pub async fn fetch_page_categories(&self, title: &str) -> Result<Option<String>> {
        let mut url = Url::parse(&format!("{}/api.php", self.base_url))
            .map_err(|e| url_error("api.php", e))?;
        url.query_pairs_mut()
            .append_pair("action", "query")
            .append_pair("prop", "categories")
            .append_pair("format", "json")
            .append_pair("titles", title);

        let _permit = self.io_permits.acquire().await.expect("semaphore closed");

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| http_error(&url, e))?;
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(WikivaultError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        let body = response.text().await.map_err(|e| http_error(&url, e))?;
        Ok(Some(body))
    }

    /// Issues the bulk export request for the flattened page list
    ///
    /// The response body is returned unread so the caller can stream it to
    /// disk.
    pub async fn request_export(&self, pages: &str) -> Result<reqwest::Response> {
        let _permit = self.io_permits.acquire().await.expect("semaphore closed");

        let response = self
            .client
            .post(&self.export_url)
            .form(&[
                ("pages", pages),
                ("templates", "1"),
                ("wpDownload", "1"),
                ("wpEditToken", "+\\"),
                ("title", self.export_page_title.as_str()),
            ])
            .send()
            .await
            .map_err(|e| WikivaultError::Http {
                url: self.export_url.clone(),
                source: e,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(WikivaultError::Status {
                url: self.export_url.clone(),
                status: status.as_u16(),
            });
        }
        Ok(response)
    }

    /// Resolves the fetch URL of a category or continuation ref
    ///
    /// `Category:` refs go through `index.php?title=…`; continuation refs
    /// already carry their own `index.php` path and query.
    fn listing_url(&self, reference: &str) -> Result<Url> {
        match page::classify(reference) {
            RefKind::Category => {
                let mut url = Url::parse(&format!("{}/index.php", self.base_url))
                    .map_err(|e| url_error(reference, e))?;
                url.query_pairs_mut().append_pair("title", reference);
                Ok(url)
            }
            _ => Url::parse(&format!("{}/{}", self.base_url, reference))
                .map_err(|e| url_error(reference, e)),
        }
    }
}

fn http_error(url: &Url, source: reqwest::Error) -> WikivaultError {
    WikivaultError::Http {
        url: url.to_string(),
        source,
    }
}

fn url_error(reference: &str, error: url::ParseError) -> WikivaultError {
    WikivaultError::Parse {
        context: format!("url for '{}'", reference),
        message: error.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn site_config(base: &str) -> SiteConfig {
        SiteConfig {
            base_url: base.to_string(),
            export_url: format!("{}/export", base),
            export_page_title: "Special:Export".to_string(),
            request_timeout_secs: 5,
        }
    }

    #[test]
    fn test_build_http_client() {
        assert!(build_http_client(30).is_ok());
    }

    #[test]
    fn test_listing_url_for_category() {
        let client = SiteClient::new(&site_config("https://wiki.example.org/"), 2).unwrap();
        let url = client.listing_url("Category:Works").unwrap();
        assert_eq!(
            url.as_str(),
            "https://wiki.example.org/index.php?title=Category%3AWorks"
        );
    }

    #[test]
    fn test_listing_url_for_continuation() {
        let client = SiteClient::new(&site_config("https://wiki.example.org"), 2).unwrap();
        let url = client
            .listing_url("index.php?title=Category:Works&pagefrom=M")
            .unwrap();
        assert_eq!(url.path(), "/index.php");
        assert!(url.query().unwrap().contains("pagefrom=M"));
    }
}
