//! Plugin system for Courier
//!
//! A plugin is a named bundle of operations. Each operation is declared by a
//! [`CallSpec`] and, whatever happens inside it, produces exactly one
//! [`Envelope`]. The [`PluginManager`] routes operation names to plugins.

pub mod boundary;
pub mod builtin;
pub mod context;
pub mod envelope;
pub mod loader;
pub mod manifest;
pub mod params;

use async_trait::async_trait;

pub use context::Context;
pub use envelope::{ArtifactFormat, ArtifactKind, ArtifactValue, DirectResult, Envelope};
pub use loader::{InvocationRequest, PluginManager};
pub use manifest::{CallSpec, ParamSpec, ParamType};
pub use params::{ParamValue, Params};

use crate::Result;

/// A stateless bundle of operations
///
/// Implementors write [`Plugin::run`] using `?` freely; callers use
/// [`Plugin::execute`], which never fails.
#[async_trait]
pub trait Plugin: Send + Sync {
    /// Human-readable plugin name, used when attributing results
    fn source_name(&self) -> &str;

    /// Operations this plugin exposes
    fn call_specs(&self) -> &[CallSpec];

    /// Operation body
    ///
    /// Only called with an operation name from [`Plugin::call_specs`].
    ///
    /// # Errors
    ///
    /// Any error is reported to the caller as an error envelope
    async fn run(&self, operation: &str, ctx: &Context, params: Params) -> Result<Envelope>;

    /// Invoke an operation, settling every outcome into an envelope
    async fn execute(&self, operation: &str, ctx: &Context, params: Params) -> Envelope {
        if !self.call_specs().iter().any(|spec| spec.name == operation) {
            tracing::warn!(source = self.source_name(), operation, "operation not declared by plugin");
            return Envelope::unknown_function();
        }

        boundary::settle(
            self.source_name(),
            operation,
            self.run(operation, ctx, params),
        )
        .await
    }
}
