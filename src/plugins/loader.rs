//! Plugin registry and dispatcher

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::Instrument;

use super::builtin;
use super::context::Context;
use super::envelope::Envelope;
use super::manifest::CallSpec;
use super::Plugin;
use crate::config::Config;
use crate::{Error, Result};

/// A request to run one operation
#[derive(Debug, Clone)]
pub struct InvocationRequest {
    /// Operation name
    pub operation: String,
    /// Raw caller arguments
    pub arguments: Map<String, Value>,
    /// Conversation context
    pub context: Context,
}

impl InvocationRequest {
    /// Request with a fresh context
    #[must_use]
    pub fn new(operation: impl Into<String>, arguments: Map<String, Value>) -> Self {
        Self {
            operation: operation.into(),
            arguments,
            context: Context::new(),
        }
    }

    /// Parse arguments from JSON text; empty text means no arguments
    ///
    /// # Errors
    ///
    /// Returns a validation error if the text is not a JSON object
    pub fn from_json(operation: impl Into<String>, arguments: &str) -> Result<Self> {
        let arguments = if arguments.trim().is_empty() {
            Map::new()
        } else {
            match serde_json::from_str(arguments) {
                Ok(Value::Object(map)) => map,
                Ok(_) => {
                    return Err(Error::Validation(
                        "arguments must be a JSON object".to_string(),
                    ));
                }
                Err(e) => return Err(Error::Validation(format!("invalid arguments: {e}"))),
            }
        };
        Ok(Self::new(operation, arguments))
    }

    /// Attach a conversation context
    #[must_use]
    pub fn with_context(mut self, context: Context) -> Self {
        self.context = context;
        self
    }
}

/// Where an operation lives: plugin index and spec index within it
#[derive(Debug, Clone, Copy)]
struct Route {
    plugin: usize,
    spec: usize,
}

/// Routes operation names to loaded plugins
///
/// The routing table is built once and only read afterwards, so a shared
/// manager needs no locking.
#[derive(Default)]
pub struct PluginManager {
    plugins: Vec<Arc<dyn Plugin>>,
    routes: HashMap<String, Route>,
}

impl std::fmt::Debug for PluginManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginManager")
            .field("plugins", &self.plugins.iter().map(|p| p.source_name()).collect::<Vec<_>>())
            .field("operations", &self.routes.len())
            .finish()
    }
}

impl PluginManager {
    /// Create a new empty plugin manager
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the built-in plugins enabled by `config`
    ///
    /// # Errors
    ///
    /// Returns error if a plugin cannot be constructed or two plugins
    /// declare the same operation
    pub fn from_config(config: &Config) -> Result<Self> {
        let mut manager = Self::new();
        for plugin in builtin::load(config)? {
            manager.register(plugin)?;
        }
        tracing::info!(
            plugins = manager.plugins.len(),
            operations = manager.routes.len(),
            "plugins loaded"
        );
        Ok(manager)
    }

    /// Add a plugin and route its operations
    ///
    /// Registration is all or nothing: on a name clash the manager is left
    /// unchanged.
    ///
    /// # Errors
    ///
    /// Returns error if any operation name is already routed, or declared
    /// twice by the plugin itself
    pub fn register(&mut self, plugin: Arc<dyn Plugin>) -> Result<()> {
        let index = self.plugins.len();
        let mut added: HashMap<String, Route> = HashMap::new();

        for (spec_index, spec) in plugin.call_specs().iter().enumerate() {
            let first = if let Some(route) = self.routes.get(&spec.name) {
                Some(self.plugins[route.plugin].source_name().to_string())
            } else if added.contains_key(&spec.name) {
                Some(plugin.source_name().to_string())
            } else {
                None
            };

            if let Some(first) = first {
                return Err(Error::DuplicateOperation {
                    name: spec.name.clone(),
                    first,
                    second: plugin.source_name().to_string(),
                });
            }

            added.insert(
                spec.name.clone(),
                Route {
                    plugin: index,
                    spec: spec_index,
                },
            );
        }

        tracing::debug!(
            source = plugin.source_name(),
            operations = added.len(),
            "registered plugin"
        );
        self.routes.extend(added);
        self.plugins.push(plugin);
        Ok(())
    }

    /// Every call spec, in registration order
    #[must_use]
    pub fn specs(&self) -> Vec<&CallSpec> {
        self.plugins.iter().flat_map(|p| p.call_specs()).collect()
    }

    /// Call spec for an operation
    #[must_use]
    pub fn spec(&self, operation: &str) -> Option<&CallSpec> {
        let route = self.routes.get(operation)?;
        self.plugins[route.plugin].call_specs().get(route.spec)
    }

    /// Source name of the plugin owning an operation
    #[must_use]
    pub fn source_name(&self, operation: &str) -> Option<&str> {
        let route = self.routes.get(operation)?;
        Some(self.plugins[route.plugin].source_name())
    }

    /// Loaded plugins, in registration order
    #[must_use]
    pub fn plugins(&self) -> &[Arc<dyn Plugin>] {
        &self.plugins
    }

    /// Number of loaded plugins
    #[must_use]
    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    /// Whether no plugins are loaded
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    /// Validate and run one request
    pub async fn dispatch(&self, request: InvocationRequest) -> Envelope {
        let InvocationRequest {
            operation,
            arguments,
            context,
        } = request;

        let Some(route) = self.routes.get(&operation).copied() else {
            tracing::warn!(request_id = %context.request_id, operation = %operation, "unknown operation");
            return Envelope::unknown_function();
        };

        let plugin = &self.plugins[route.plugin];
        let span = tracing::info_span!(
            "invoke",
            request_id = %context.request_id,
            operation = %operation,
            source = plugin.source_name(),
        );

        async {
            let params = match plugin.call_specs()[route.spec].validate(&arguments) {
                Ok(params) => params,
                Err(e) => {
                    tracing::info!(error = %e, "rejected arguments");
                    return Envelope::from(e);
                }
            };
            plugin.execute(&operation, &context, params).await
        }
        .instrument(span)
        .await
    }

    /// Run an operation with JSON-text arguments
    pub async fn call(&self, operation: &str, context: Context, arguments: &str) -> Envelope {
        match InvocationRequest::from_json(operation, arguments) {
            Ok(request) => self.dispatch(request.with_context(context)).await,
            Err(e) => Envelope::from(e),
        }
    }
}
