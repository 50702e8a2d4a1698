//! Delivering envelopes to a chat
//!
//! Results become text messages, artifacts become uploads, and errors become
//! a short notice. Local artifact files are removed once sent.

use std::path::Path;

use serde_json::Value;

use crate::channels::telegram::chunking::{DEFAULT_LIMIT, chunk_text};
use crate::channels::{ArtifactSource, Target, Transport};
use crate::media;
use crate::plugins::{ArtifactFormat, DirectResult, Envelope};
use crate::Result;

/// Counts of what a delivery sent
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    /// Messages or artifacts the channel accepted
    pub sent: usize,
    /// Artifacts the channel rejected
    pub failed: usize,
}

/// Send an envelope to `target`
///
/// A rejected artifact does not stop the rest of a multi-artifact envelope;
/// each failure is reported to the chat as a notice instead.
///
/// # Errors
///
/// Returns error only if a text message (result, error or failure notice)
/// cannot be sent
pub async fn deliver(
    transport: &dyn Transport,
    target: &Target,
    envelope: &Envelope,
) -> Result<DeliveryReport> {
    match envelope {
        Envelope::Result(value) => Ok(DeliveryReport {
            sent: send_chunked(transport, target, &render_result(value)).await?,
            failed: 0,
        }),
        Envelope::DirectResult(direct) => deliver_artifacts(transport, target, direct).await,
        Envelope::Error(message) => Ok(DeliveryReport {
            sent: send_chunked(transport, target, &error_notice(message)).await?,
            failed: 0,
        }),
    }
}

/// Send text split to the channel limit, returning the message count
async fn send_chunked(
    transport: &dyn Transport,
    target: &Target,
    text: &str,
) -> Result<usize> {
    let chunks = chunk_text(text, DEFAULT_LIMIT);
    for chunk in &chunks {
        transport.send_text(target, chunk).await?;
    }
    Ok(chunks.len())
}

async fn deliver_artifacts(
    transport: &dyn Transport,
    target: &Target,
    direct: &DirectResult,
) -> Result<DeliveryReport> {
    let mut report = DeliveryReport::default();

    for location in direct.value.iter() {
        let source = match direct.format {
            ArtifactFormat::Path => ArtifactSource::Path(Path::new(location)),
            ArtifactFormat::Url => ArtifactSource::Url(location),
        };

        match transport.send_artifact(target, direct.kind, &source).await {
            Ok(()) => {
                report.sent += 1;
                if let ArtifactSource::Path(path) = source {
                    media::discard(path).await;
                }
            }
            Err(e) => {
                report.failed += 1;
                tracing::warn!(
                    channel = transport.name(),
                    kind = direct.kind.as_str(),
                    location,
                    error = %e,
                    "failed to deliver artifact"
                );
                let notice = format!("Failed to send {}: {e}", direct.kind.as_str());
                send_chunked(transport, target, &notice).await?;
            }
        }
    }

    Ok(report)
}

/// Text form of a result value
///
/// Strings are sent as-is; anything else is pretty-printed JSON.
#[must_use]
pub fn render_result(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Null => String::new(),
        other => serde_json::to_string_pretty(other).unwrap_or_else(|_| other.to_string()),
    }
}

/// Notice shown for an error envelope
#[must_use]
pub fn error_notice(message: &str) -> String {
    format!("⚠️ {message}")
}
