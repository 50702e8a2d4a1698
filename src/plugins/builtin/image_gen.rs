//! Image generation through DALL-E or FLUX

use async_trait::async_trait;
use reqwest::Client;

use crate::config::ApiKeys;
use crate::media::providers::{FluxImageProvider, OpenAIImageProvider};
use crate::media::{ArtifactStore, ImageConfig, ImageProvider};
use crate::plugins::{
    ArtifactFormat, ArtifactKind, CallSpec, Context, Envelope, ParamSpec, Params, Plugin,
};
use crate::{Error, Result};

const OPENAI_CATEGORY: &str = "openai_images";
const FLUX_CATEGORY: &str = "flux_images";

/// Generates an image from a prompt and stages it for delivery
pub struct ImageGenPlugin {
    client: Client,
    store: ArtifactStore,
    config: ImageConfig,
    keys: ApiKeys,
    specs: Vec<CallSpec>,
}

/// Provider picked for one call, with where and how its output is sent
struct Backend {
    provider: Box<dyn ImageProvider>,
    category: &'static str,
    kind: ArtifactKind,
}

impl ImageGenPlugin {
    /// Create the plugin; keys are checked per call
    #[must_use]
    pub fn new(client: Client, store: ArtifactStore, config: ImageConfig, keys: ApiKeys) -> Self {
        Self {
            client,
            store,
            config,
            keys,
            specs: vec![
                CallSpec::new(
                    "generate_image",
                    "Generate an image based on a text prompt, use_flux parameter is optional, \
                     only set it to true if the user explicitly requests FLUX.",
                )
                .param(
                    "prompt",
                    ParamSpec::string("The text prompt to generate an image from").required(),
                )
                .param(
                    "use_flux",
                    ParamSpec::boolean("Use FLUX instead of DALL-E. Default is false.")
                        .default_value(false),
                ),
            ],
        }
    }

    fn backend(&self, use_flux: bool) -> Result<Backend> {
        if use_flux {
            let key = self
                .keys
                .flux
                .clone()
                .ok_or_else(|| Error::missing_setting("FLUX_API_KEY"))?;
            let base_url = self
                .config
                .flux_base_url
                .as_deref()
                .ok_or_else(|| Error::missing_setting("FLUX_BASE_URL"))?;
            Ok(Backend {
                provider: Box::new(FluxImageProvider::new(
                    self.client.clone(),
                    key,
                    base_url,
                    &self.config,
                )?),
                category: FLUX_CATEGORY,
                kind: ArtifactKind::Document,
            })
        } else {
            let key = self
                .keys
                .openai
                .clone()
                .ok_or_else(|| Error::missing_setting("OPENAI_API_KEY"))?;
            Ok(Backend {
                provider: Box::new(OpenAIImageProvider::new(
                    self.client.clone(),
                    key,
                    &self.config,
                )),
                category: OPENAI_CATEGORY,
                kind: ArtifactKind::Photo,
            })
        }
    }
}

#[async_trait]
impl Plugin for ImageGenPlugin {
    fn source_name(&self) -> &str {
        "ImageGenerator"
    }

    fn call_specs(&self) -> &[CallSpec] {
        &self.specs
    }

    async fn run(&self, _operation: &str, _ctx: &Context, params: Params) -> Result<Envelope> {
        let prompt = params.require_str("prompt")?;
        let backend = self.backend(params.bool_or("use_flux", false))?;

        tracing::info!(provider = backend.provider.name(), "generating image");
        let image = backend.provider.generate(prompt).await?;
        let path = self
            .store
            .save(backend.category, image.extension, &image.data)
            .await?;

        Ok(Envelope::direct(
            backend.kind,
            ArtifactFormat::Path,
            path.to_string_lossy().into_owned(),
        ))
    }
}
