//! Run report composition
//!
//! One report per run, success- or failure-flavored, rendered as the HTML
//! mail body or emitted to the structured log when mail is disabled.

use std::path::Path;

/// Statistics and outcome of one run
#[derive(Debug, Clone)]
pub struct RunReport {
    pub success: bool,
    /// Nodes that reached the visited state
    pub visited_count: usize,
    /// Distinct (category, page) pairs recorded
    pub recorded_count: usize,
    /// Size of the raw backup artifact
    pub backup_bytes: u64,
    /// Size of the compressed archive
    pub archive_bytes: u64,
    /// Free space on the output volume
    pub disk_free_bytes: u64,
    /// Cause of the failure branch, if taken
    pub error: Option<String>,
}

impl RunReport {
    /// Subject prefix distinguishing success from failure
    pub fn subject_prefix(&self) -> &'static str {
        if self.success {
            "[SUCCESS]"
        } else {
            "[FAILURE]"
        }
    }
}

/// Renders the HTML mail body for a report
pub fn render_html(report: &RunReport, title: &str) -> String {
    let mut body = String::new();
    body.push_str(&format!("<h1>{}</h1>", title));
    body.push_str(if report.success {
        "<h3>Backup finished.</h3>"
    } else {
        "<h3>Backup failed.</h3>"
    });
    body.push_str("<hr/>");
    body.push_str(&format!(
        "<div>Visited {} node(s).</div>",
        report.visited_count
    ));
    body.push_str(&format!(
        "<div>Recorded {} page(s).</div>",
        report.recorded_count
    ));
    body.push_str(&format!(
        "<div>Backup file size: {} bytes</div>",
        report.backup_bytes
    ));
    body.push_str(&format!(
        "<div>Compressed size: {} bytes</div>",
        report.archive_bytes
    ));
    body.push_str(&format!(
        "<div>Free disk space: {} bytes</div>",
        report.disk_free_bytes
    ));

    if let Some(error) = &report.error {
        body.push_str("<hr/><div>Reason:</div><div>");
        for line in error.lines() {
            body.push_str(&format!("<div>{}</div>", line));
        }
        body.push_str("</div>");
    }

    body
}

/// Emits the report to the structured log (the mail-disabled path)
pub fn log_report(report: &RunReport) {
    if report.success {
        tracing::info!(
            visited = report.visited_count,
            recorded = report.recorded_count,
            backup_bytes = report.backup_bytes,
            archive_bytes = report.archive_bytes,
            disk_free_bytes = report.disk_free_bytes,
            "Run report: backup finished"
        );
    } else {
        tracing::error!(
            visited = report.visited_count,
            recorded = report.recorded_count,
            backup_bytes = report.backup_bytes,
            archive_bytes = report.archive_bytes,
            disk_free_bytes = report.disk_free_bytes,
            error = report.error.as_deref().unwrap_or("unknown"),
            "Run report: backup failed"
        );
    }
}

/// Size of a file, zero when it cannot be read
pub fn file_size(path: &str) -> u64 {
    std::fs::metadata(path).map(|m| m.len()).unwrap_or(0)
}

/// Free space on the volume holding the given path, zero when unknown
pub fn disk_free_at(path: &str) -> u64 {
    let path = Path::new(path);
    let probe = path.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or(Path::new("."));
    fs2::available_space(probe).unwrap_or(0)
}
