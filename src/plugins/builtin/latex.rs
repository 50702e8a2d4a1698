//! LaTeX expression rendering

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::CONTENT_TYPE;

use crate::media::ArtifactStore;
use crate::plugins::{
    ArtifactFormat, ArtifactKind, CallSpec, Context, Envelope, ParamSpec, Params, Plugin,
};
use crate::{Error, Result};

const CATEGORY: &str = "latex_images";

/// Resolution prefix prepended to every expression
const DPI_PREFIX: &str = r"\dpi{150} ";

/// Renders a LaTeX expression to a PNG through a remote renderer
pub struct LatexPlugin {
    client: Client,
    renderer: String,
    store: ArtifactStore,
    specs: Vec<CallSpec>,
}

impl LatexPlugin {
    /// Create the plugin against a codecogs-compatible renderer root
    #[must_use]
    pub fn new(client: Client, renderer: &str, store: ArtifactStore) -> Self {
        Self {
            client,
            renderer: renderer.trim_end_matches('/').to_string(),
            store,
            specs: vec![
                CallSpec::new(
                    "latex_to_image",
                    "Convert a LaTeX mathematical expression to an image",
                )
                .param(
                    "expression",
                    ParamSpec::string(
                        "The LaTeX expression to convert, without surrounding $ signs",
                    )
                    .required(),
                ),
            ],
        }
    }

    fn render_url(&self, expression: &str) -> String {
        let raw = format!("{DPI_PREFIX}{}", expression.trim());
        let encoded = urlencoding::encode(&raw);
        format!("{}/png.image?{encoded}", self.renderer)
    }

    async fn render(&self, expression: &str) -> Result<Vec<u8>> {
        let response = self.client.get(self.render_url(expression)).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Upstream(format!("renderer returned status {}", status.as_u16())));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        if !content_type.starts_with("image/") {
            return Err(Error::Upstream(format!(
                "renderer returned `{content_type}` instead of an image"
            )));
        }

        let data = response.bytes().await?;
        if data.is_empty() {
            return Err(Error::Upstream("renderer returned an empty image".to_string()));
        }
        Ok(data.to_vec())
    }
}

#[async_trait]
impl Plugin for LatexPlugin {
    fn source_name(&self) -> &str {
        "LatexToImage"
    }

    fn call_specs(&self) -> &[CallSpec] {
        &self.specs
    }

    async fn run(&self, _operation: &str, _ctx: &Context, params: Params) -> Result<Envelope> {
        let expression = params.require_str("expression")?;

        let staged = async {
            let png = self.render(expression).await?;
            self.store.save(CATEGORY, "png", &png).await
        }
        .await;

        match staged {
            Ok(path) => Ok(Envelope::direct(
                ArtifactKind::Photo,
                ArtifactFormat::Path,
                path.to_string_lossy().into_owned(),
            )),
            Err(e) => Err(Error::Upstream(format!(
                "Unable to convert LaTeX expression to image: {e}"
            ))),
        }
    }
}
