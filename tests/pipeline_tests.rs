//! Integration tests for the post-crawl pipeline
//!
//! These tests run the full pipeline against wiremock servers and check
//! the artifacts it leaves behind: the category map, the sorted manifest,
//! the raw backup, the archive, and the failure trace.

use std::collections::{BTreeSet, HashMap};
use std::io::Read;
use std::path::Path;
use wikivault::config::{
    Config, CrawlConfig, MailConfig, OutputConfig, ReceiverConfig, SiteConfig,
};
use wikivault::pipeline::{run_pipeline, ARCHIVE_ENTRY_NAME};
use wiremock::matchers::{method, path as url_path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const EXPORT_BODY: &str = "<mediawiki><page>P1</page><page>Root</page></mediawiki>";

fn listing_html(pages: &[&str]) -> String {
    let mut links = String::new();
    for name in pages {
        links.push_str(&format!(r#"<a href="/{}">{}</a>"#, name, name));
    }
    format!(
        r#"<html><body><div id="mw-pages">{}</div></body></html>"#,
        links
    )
}

fn test_config(server: &MockServer, dir: &Path) -> Config {
    Config {
        crawl: CrawlConfig {
            root_category: "Category:Root".to_string(),
            io_concurrency: 4,
            retry_attempts: 2,
            backoff: None,
            query_creators: false,
            follow_member_categories: false,
            excluded_categories: vec![],
        },
        site: SiteConfig {
            base_url: server.uri(),
            export_url: format!("{}/export", server.uri()),
            export_page_title: "Special:Export".to_string(),
            request_timeout_secs: 5,
        },
        output: OutputConfig {
            map_path: dir.join("map.json").to_string_lossy().into_owned(),
            manifest_path: dir.join("manifest.txt").to_string_lossy().into_owned(),
            backup_path: dir.join("backup.xml").to_string_lossy().into_owned(),
            archive_path: dir.join("backup.zip").to_string_lossy().into_owned(),
            trace_path: dir.join("trace.txt").to_string_lossy().into_owned(),
            buffer_size: 1024,
        },
        mail: None,
    }
}

async fn mount_graph(server: &MockServer) {
    Mock::given(method("GET"))
        .and(url_path("/index.php"))
        .and(query_param("title", "Category:Root"))
        .respond_with(ResponseTemplate::new(200).set_body_string(listing_html(&["P1"])))
        .mount(server)
        .await;
}

async fn mount_export(server: &MockServer) {
    Mock::given(method("POST"))
        .and(url_path("/export"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(EXPORT_BODY.as_bytes().to_vec(), "application/xml"),
        )
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_pipeline_produces_all_artifacts() {
    let server = MockServer::start().await;
    mount_graph(&server).await;
    mount_export(&server).await;

    let dir = tempfile::tempdir().unwrap();
    let config = test_config(&server, dir.path());
    let output = config.output.clone();

    let summary = run_pipeline(config).await.unwrap();
    assert_eq!(summary.recorded_count, 1);
    assert_eq!(summary.backup_bytes, EXPORT_BODY.len() as u64);
    assert!(summary.archive_bytes > 0);
    assert_eq!(summary.mail_failures, 0);

    // Category map artifact
    let map: HashMap<String, BTreeSet<String>> =
        serde_json::from_str(&std::fs::read_to_string(&output.map_path).unwrap()).unwrap();
    assert_eq!(map.len(), 1);
    assert!(map["Root"].contains("P1"));

    // Manifest artifact: sorted union of keys and members
    let manifest = std::fs::read_to_string(&output.manifest_path).unwrap();
    assert_eq!(manifest, "P1\nRoot\n");

    // Raw backup artifact
    let backup = std::fs::read_to_string(&output.backup_path).unwrap();
    assert_eq!(backup, EXPORT_BODY);

    // Single-entry archive artifact
    let mut archive =
        zip::ZipArchive::new(std::fs::File::open(&output.archive_path).unwrap()).unwrap();
    assert_eq!(archive.len(), 1);
    let mut entry = archive.by_index(0).unwrap();
    assert_eq!(entry.name(), ARCHIVE_ENTRY_NAME);
    let mut restored = String::new();
    entry.read_to_string(&mut restored).unwrap();
    assert_eq!(restored, EXPORT_BODY);

    // No failure, no trace artifact
    assert!(!Path::new(&output.trace_path).exists());
}

#[tokio::test]
async fn test_export_request_carries_sorted_page_list() {
    let server = MockServer::start().await;
    mount_graph(&server).await;

    // The form body joins the flattened sorted list with newlines; the
    // encoded newline separates P1 from Root
    Mock::given(method("POST"))
        .and(url_path("/export"))
        .and(wiremock::matchers::body_string_contains("pages=P1%0ARoot"))
        .and(wiremock::matchers::body_string_contains("templates=1"))
        .and(wiremock::matchers::body_string_contains("wpDownload=1"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(EXPORT_BODY.as_bytes().to_vec(), "application/xml"),
        )
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let config = test_config(&server, dir.path());
    run_pipeline(config).await.unwrap();

    server.verify().await;
}

#[tokio::test]
async fn test_export_failure_takes_failure_branch() {
    let server = MockServer::start().await;
    mount_graph(&server).await;
    Mock::given(method("POST"))
        .and(url_path("/export"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let config = test_config(&server, dir.path());
    let output = config.output.clone();

    let result = run_pipeline(config).await;
    assert!(result.is_err());

    // The aggregate artifacts precede the download and survive the failure
    assert!(Path::new(&output.map_path).exists());
    assert!(Path::new(&output.manifest_path).exists());

    // The failure branch leaves a trace artifact naming the cause
    let trace = std::fs::read_to_string(&output.trace_path).unwrap();
    assert!(trace.contains("500"));
}

#[tokio::test]
async fn test_receiver_mail_failures_do_not_fail_the_run() {
    let server = MockServer::start().await;
    mount_graph(&server).await;
    mount_export(&server).await;

    let dir = tempfile::tempdir().unwrap();
    let mut config = test_config(&server, dir.path());
    // Nothing listens on port 1; both deliveries fail, the run does not
    config.mail = Some(MailConfig {
        host: "127.0.0.1".to_string(),
        port: Some(1),
        from_user: "bot".to_string(),
        from_email: "bot@example.com".to_string(),
        auth_code: "secret".to_string(),
        subject: "wiki backup".to_string(),
        receivers: vec![
            ReceiverConfig {
                address: "first@example.com".to_string(),
                subject: None,
                send_archive: true,
                send_manifest: true,
                send_trace: false,
            },
            ReceiverConfig {
                address: "second@example.com".to_string(),
                subject: Some("override".to_string()),
                send_archive: false,
                send_manifest: false,
                send_trace: true,
            },
        ],
    });

    let summary = run_pipeline(config).await.unwrap();
    assert_eq!(summary.mail_failures, 2);
    assert_eq!(summary.recorded_count, 1);
}
