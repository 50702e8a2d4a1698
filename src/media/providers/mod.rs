//! Image provider implementations
//!
//! Available providers:
//! - `OpenAI` images API (DALL-E), returns a hosted URL that is downloaded
//! - FLUX, returns base64-encoded image data

mod flux;
mod openai;

pub use flux::FluxImageProvider;
pub use openai::OpenAIImageProvider;
