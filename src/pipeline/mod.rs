//! Post-crawl pipeline
//!
//! Sequences the stages that follow the crawl: aggregate the results,
//! download the bulk export, compress it, and send the run report. Any
//! stage failure before notification diverts to a failure branch that
//! writes the trace artifact and still sends a failure-flavored report.

mod archive;
mod export;
mod mail;
mod report;

pub use archive::{compress_backup, compress_file, ARCHIVE_ENTRY_NAME};
pub use report::{render_html, RunReport};

use crate::config::Config;
use crate::crawl::{CrawlOrchestrator, CrawlOutcome, RetryPolicy, SiteClient};
use crate::{Result, WikivaultError};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

/// Pipeline stages, in order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Idle,
    Crawling,
    Aggregated,
    Downloading,
    Compressing,
    Notifying,
    Done,
    Failed,
}

/// Final statistics of a completed run
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub visited_count: usize,
    pub recorded_count: usize,
    pub backup_bytes: u64,
    pub archive_bytes: u64,
    /// Receivers whose report mail could not be delivered
    pub mail_failures: usize,
}

/// Sequences one full run: crawl, aggregate, download, compress, notify
pub struct PipelineCoordinator {
    config: Config,
}

impl PipelineCoordinator {
    /// Creates a coordinator for one run
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Runs the pipeline to its terminal state
    ///
    /// Returns the run summary on success. On a stage failure the trace
    /// artifact is written and the failure report still goes out before
    /// the error is returned; the caller maps it to the process exit code.
    pub async fn run(self) -> Result<RunSummary> {
        let site = Arc::new(SiteClient::new(
            &self.config.site,
            self.config.crawl.io_concurrency,
        )?);

        tracing::info!(
            "Stage {:?} -> {:?}: seeding crawl at '{}'",
            Stage::Idle,
            Stage::Crawling,
            self.config.crawl.root_category
        );
        let orchestrator = CrawlOrchestrator::new(&self.config.crawl, Arc::clone(&site));
        let outcome = orchestrator.run(&self.config.crawl.root_category).await;
        tracing::info!(
            "Stage {:?} -> {:?}: {} node(s) visited, {} page(s) recorded",
            Stage::Crawling,
            Stage::Aggregated,
            outcome.visited_count,
            outcome.recorded_count
        );

        match self.forward_stages(&site, &outcome).await {
            Ok((backup_bytes, archive_bytes)) => {
                let run_report =
                    self.compose_report(true, &outcome, backup_bytes, archive_bytes, None);
                let mail_failures = self.notify(&run_report).await;
                tracing::info!("Stage {:?}: run complete", Stage::Done);
                Ok(RunSummary {
                    visited_count: outcome.visited_count,
                    recorded_count: outcome.recorded_count,
                    backup_bytes,
                    archive_bytes,
                    mail_failures,
                })
            }
            Err(error) => {
                tracing::error!("Pipeline stage failed: {}", error);
                self.write_trace(&error);
                let run_report = self.compose_report(
                    false,
                    &outcome,
                    report::file_size(&self.config.output.backup_path),
                    report::file_size(&self.config.output.archive_path),
                    Some(format!("{}\n{:?}", error, error)),
                );
                self.notify(&run_report).await;
                tracing::error!("Stage {:?}: run failed", Stage::Failed);
                Err(error)
            }
        }
    }

    /// Aggregate artifacts, export download, and compression
    async fn forward_stages(
        &self,
        site: &Arc<SiteClient>,
        outcome: &CrawlOutcome,
    ) -> Result<(u64, u64)> {
        self.write_map_artifact(&outcome.snapshot)?;
        self.write_manifest_artifact(&outcome.flattened)?;

        tracing::info!(
            "Stage {:?} -> {:?}: requesting export of {} page(s)",
            Stage::Aggregated,
            Stage::Downloading,
            outcome.flattened.len()
        );
        let retry = RetryPolicy::from_config(&self.config.crawl);
        let backup_bytes =
            export::download_backup(site, &outcome.flattened, &self.config.output, &retry).await?;

        tracing::info!(
            "Stage {:?} -> {:?}",
            Stage::Downloading,
            Stage::Compressing
        );
        let archive_bytes = archive::compress_backup(&self.config.output).await?;

        Ok((backup_bytes, archive_bytes))
    }

    /// Writes the structured category → members map artifact
    fn write_map_artifact(&self, snapshot: &HashMap<String, BTreeSet<String>>) -> Result<()> {
        let json = serde_json::to_string_pretty(snapshot)?;
        std::fs::write(&self.config.output.map_path, json)?;
        tracing::info!("Category map written to '{}'", self.config.output.map_path);
        Ok(())
    }

    /// Writes the flattened sorted page list artifact
    fn write_manifest_artifact(&self, flattened: &[String]) -> Result<()> {
        let mut text = flattened.join("\n");
        if !text.is_empty() {
            text.push('\n');
        }
        std::fs::write(&self.config.output.manifest_path, text)?;
        tracing::info!(
            "Manifest of {} page(s) written to '{}'",
            flattened.len(),
            self.config.output.manifest_path
        );
        Ok(())
    }

    /// Builds the run report for the notify stage
    fn compose_report(
        &self,
        success: bool,
        outcome: &CrawlOutcome,
        backup_bytes: u64,
        archive_bytes: u64,
        error: Option<String>,
    ) -> RunReport {
        RunReport {
            success,
            visited_count: outcome.visited_count,
            recorded_count: outcome.recorded_count,
            backup_bytes,
            archive_bytes,
            disk_free_bytes: report::disk_free_at(&self.config.output.backup_path),
            error,
        }
    }

    /// Notify stage: mail when configured, structured log otherwise
    ///
    /// Never fails the run; returns the number of undeliverable receivers.
    async fn notify(&self, run_report: &RunReport) -> usize {
        match &self.config.mail {
            Some(mail_config) => {
                tracing::info!("Stage {:?}: sending report mail", Stage::Notifying);
                let receiver_count = mail_config.receivers.len();
                let mail_config = mail_config.clone();
                let run_report = run_report.clone();
                let output = self.config.output.clone();
                match tokio::task::spawn_blocking(move || {
                    mail::send_report(&mail_config, &run_report, &output)
                })
                .await
                {
                    Ok(failures) => {
                        if failures > 0 {
                            tracing::warn!("{} receiver(s) could not be notified", failures);
                        }
                        failures
                    }
                    Err(error) => {
                        tracing::error!("Notify worker failed: {}", error);
                        receiver_count
                    }
                }
            }
            None => {
                tracing::info!("Stage {:?}: mail disabled, logging report", Stage::Notifying);
                report::log_report(run_report);
                0
            }
        }
    }

    /// Writes the failure trace artifact; best effort
    fn write_trace(&self, error: &WikivaultError) {
        let trace = format!("{}\n\n{:?}\n", error, error);
        match std::fs::write(&self.config.output.trace_path, trace) {
            Ok(()) => tracing::info!(
                "Failure trace written to '{}'",
                self.config.output.trace_path
            ),
            Err(io_error) => tracing::error!("Failed to write failure trace: {}", io_error),
        }
    }
}

/// Runs a complete backup operation
///
/// This is the main entry point: crawl the category tree, write the
/// aggregate artifacts, download and compress the export, and notify.
pub async fn run_pipeline(config: Config) -> Result<RunSummary> {
    PipelineCoordinator::new(config).run().await
}
