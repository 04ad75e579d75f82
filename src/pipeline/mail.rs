//! Mail notification
//!
//! Sends one report message per configured receiver over SMTP. A
//! receiver's transport failure is logged and isolated; it never affects
//! the other receivers or the run outcome.

use crate::config::{MailConfig, OutputConfig, ReceiverConfig};
use crate::pipeline::report::{render_html, RunReport};
use crate::{Result, WikivaultError};
use lettre::message::header::ContentType;
use lettre::message::{Attachment, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};

/// Sends the run report to every configured receiver
///
/// Blocking (SMTP); the pipeline calls this on the blocking pool. Returns
/// the number of receivers whose delivery failed.
pub fn send_report(mail: &MailConfig, report: &RunReport, output: &OutputConfig) -> usize {
    let transport = match build_transport(mail) {
        Ok(t) => t,
        Err(error) => {
            tracing::error!("Failed to build mail transport: {}", error);
            return mail.receivers.len();
        }
    };

    let mut failures = 0;
    for receiver in &mail.receivers {
        match send_single(&transport, mail, receiver, report, output) {
            Ok(()) => tracing::info!("Report mail sent to '{}'", receiver.address),
            Err(error) => {
                tracing::error!("Failed to send report mail to '{}': {}", receiver.address, error);
                failures += 1;
            }
        }
    }
    failures
}

/// Builds the SMTP transport for the configured relay
fn build_transport(mail: &MailConfig) -> Result<SmtpTransport> {
    let mut builder = SmtpTransport::relay(&mail.host)?;
    if let Some(port) = mail.port {
        builder = builder.port(port);
    }
    Ok(builder
        .credentials(Credentials::new(
            mail.from_user.clone(),
            mail.auth_code.clone(),
        ))
        .build())
}

/// Composes and sends the report message for one receiver
fn send_single(
    transport: &SmtpTransport,
    mail: &MailConfig,
    receiver: &ReceiverConfig,
    report: &RunReport,
    output: &OutputConfig,
) -> Result<()> {
    let subject_base = receiver.subject.as_deref().unwrap_or(&mail.subject);
    let subject = format!("{} {}", report.subject_prefix(), subject_base);

    let from: Mailbox = mail.from_email.parse()?;
    let to: Mailbox = receiver.address.parse()?;

    let mut multipart = MultiPart::mixed().singlepart(
        SinglePart::builder()
            .header(ContentType::TEXT_HTML)
            .body(render_html(report, subject_base)),
    );
    for part in build_attachments(receiver, report, output)? {
        multipart = multipart.singlepart(part);
    }

    let message = Message::builder()
        .from(from)
        .to(to)
        .subject(subject)
        .multipart(multipart)?;

    transport.send(&message)?;
    Ok(())
}

/// Selects and loads this receiver's attachments
///
/// Flags pick from {archive, manifest, trace}; files that are absent (the
/// trace exists only on the failure branch) are skipped silently.
fn build_attachments(
    receiver: &ReceiverConfig,
    report: &RunReport,
    output: &OutputConfig,
) -> Result<Vec<SinglePart>> {
    let mut parts = Vec::new();

    if receiver.send_archive {
        if let Ok(content) = std::fs::read(&output.archive_path) {
            let content_type = ContentType::parse("application/zip")
                .map_err(|e| WikivaultError::Parse {
                    context: "attachment content type".to_string(),
                    message: e.to_string(),
                })?;
            parts.push(Attachment::new("backup.zip".to_string()).body(content, content_type));
        }
    }

    if receiver.send_manifest {
        if let Ok(content) = std::fs::read_to_string(&output.manifest_path) {
            parts.push(
                Attachment::new("manifest.txt".to_string())
                    .body(content, ContentType::TEXT_PLAIN),
            );
        }
    }

    if receiver.send_trace && !report.success {
        if let Ok(content) = std::fs::read_to_string(&output.trace_path) {
            parts.push(
                Attachment::new("trace.txt".to_string()).body(content, ContentType::TEXT_PLAIN),
            );
        }
    }

    Ok(parts)
}
