//! The plugin boundary: everything a plugin body does ends as an envelope

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;

use futures::FutureExt;

use super::envelope::Envelope;
use crate::{Error, Result};

/// Run a plugin body and settle its outcome into an envelope
///
/// Errors become [`Envelope::Error`] with the error's display text. A panic
/// is caught and reported the same way, so a faulty plugin cannot take the
/// host down.
pub async fn settle<F>(source: &str, operation: &str, body: F) -> Envelope
where
    F: Future<Output = Result<Envelope>> + Send,
{
    match AssertUnwindSafe(body).catch_unwind().await {
        Ok(Ok(envelope)) => {
            if let Envelope::Error(message) = &envelope {
                tracing::info!(source, operation, error = %message, "plugin returned error");
            } else {
                tracing::debug!(source, operation, "plugin call succeeded");
            }
            envelope
        }
        Ok(Err(e)) => {
            tracing::warn!(source, operation, error = %e, "plugin call failed");
            Envelope::from(e)
        }
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            tracing::error!(source, operation, panic = %message, "plugin panicked");
            Envelope::from(Error::Fault(message))
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(ToString::to_string)
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}
