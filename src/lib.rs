//! Courier - plugin host for chat bots
//!
//! Adapts external services (arXiv, Wikipedia, image generators, Telegram,
//! ...) behind one contract: every operation is declared by a call spec and
//! answers with exactly one result envelope, whatever happens inside it.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                     Hosts                            │
//! │        HTTP API   │   CLI   │   chat bot             │
//! └────────────────────┬────────────────────────────────┘
//!                      │ operation + JSON arguments
//! ┌────────────────────▼────────────────────────────────┐
//! │                 PluginManager                        │
//! │   routing  │  validation  │  fault boundary          │
//! └────────────────────┬────────────────────────────────┘
//!                      │ Envelope
//! ┌────────────────────▼────────────────────────────────┐
//! │                  Delivery                            │
//! │   text  │  photo / document upload  │  notices       │
//! └─────────────────────────────────────────────────────┘
//! ```

pub mod api;
pub mod channels;
pub mod config;
pub mod delivery;
pub mod error;
pub mod media;
pub mod plugins;
pub mod tools;

pub use channels::{ArtifactSource, ChatId, Target, TelegramChannel, Transport};
pub use config::Config;
pub use delivery::{DeliveryReport, deliver};
pub use error::{Error, Result};
pub use media::ArtifactStore;
pub use plugins::{
    ArtifactFormat, ArtifactKind, CallSpec, Context, Envelope, InvocationRequest, ParamSpec,
    Params, Plugin, PluginManager,
};
pub use tools::{WebFetchTool, WebResponse};
