use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use common::BrandConfig;

use crate::error::Error;
use crate::llm::{extract_json_from_text, LlmProvider, LlmRequest};
use crate::models::GeneratedImage;

/// Output of one image-generation call
#[derive(Debug, Clone, Default)]
pub struct RenderedImage {
    pub url: Option<String>,
    /// Raw image bytes when the provider returns them inline
    pub bytes: Option<Vec<u8>>,
}

/// Core trait for image-generation providers
#[async_trait::async_trait]
pub trait ImageProvider: Send + Sync {
    fn model(&self) -> &str;

    async fn render(&self, prompt: &str, size: &str, quality: &str) -> Result<RenderedImage>;
}

/// Image provider using the OpenAI-compatible `images/generations` API
pub struct OpenAiImageProvider {
    api_url: String,
    api_key: String,
    model: String,
    timeout: Duration,
    client: reqwest::Client,
}

impl OpenAiImageProvider {
    pub fn new(
        api_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            api_url: api_url.into(),
            api_key: api_key.into(),
            model: model.into(),
            timeout: Duration::from_secs(120),
            client: reqwest::Client::new(),
        }
    }

    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout = Duration::from_secs(timeout_secs);
        self
    }
}

#[derive(Debug, Serialize)]
struct ImageRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    size: &'a str,
    quality: &'a str,
    n: u8,
}

#[derive(Debug, Deserialize)]
struct ImageResponse {
    #[serde(default)]
    data: Vec<ImageData>,
}

#[derive(Debug, Deserialize)]
struct ImageData {
    url: Option<String>,
}

#[async_trait::async_trait]
impl ImageProvider for OpenAiImageProvider {
    fn model(&self) -> &str {
        &self.model
    }

    async fn render(&self, prompt: &str, size: &str, quality: &str) -> Result<RenderedImage> {
        let body = ImageRequest {
            model: &self.model,
            prompt,
            size,
            quality,
            n: 1,
        };

        // the timeout covers the whole exchange, body included
        let exchange = async {
            let response = self
                .client
                .post(&self.api_url)
                .header("Authorization", format!("Bearer {}", self.api_key))
                .json(&body)
                .send()
                .await
                .context("image HTTP request failed")?;

            if !response.status().is_success() {
                let status = response.status();
                let body = response.text().await.unwrap_or_default();
                anyhow::bail!("image API error {}: {}", status, body);
            }

            response
                .json::<ImageResponse>()
                .await
                .context("Failed to parse image response")
        };

        let parsed = tokio::time::timeout(self.timeout, exchange)
            .await
            .context("image request timed out")??;
        let url = parsed
            .data
            .into_iter()
            .find_map(|d| d.url)
            .context("image response has no url")?;

        Ok(RenderedImage {
            url: Some(url),
            bytes: None,
        })
    }
}

// 1x1 transparent PNG
const STUB_PNG: &[u8] = &[
    0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44,
    0x52, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x08, 0x06, 0x00, 0x00, 0x00, 0x1F,
    0x15, 0xC4, 0x89, 0x00, 0x00, 0x00, 0x0A, 0x49, 0x44, 0x41, 0x54, 0x78, 0x9C, 0x63, 0x00,
    0x01, 0x00, 0x00, 0x05, 0x00, 0x01, 0x0D, 0x0A, 0x2D, 0xB4, 0x00, 0x00, 0x00, 0x00, 0x49,
    0x45, 0x4E, 0x44, 0xAE, 0x42, 0x60, 0x82,
];

/// Offline provider for `adapter = "stub"` and tests; returns a blank PNG inline
#[derive(Debug, Clone, Default)]
pub struct StubImageProvider;

#[async_trait::async_trait]
impl ImageProvider for StubImageProvider {
    fn model(&self) -> &str {
        "stub"
    }

    async fn render(&self, prompt: &str, _size: &str, _quality: &str) -> Result<RenderedImage> {
        Ok(RenderedImage {
            url: Some(format!("stub://image/{}", prompt_hash(prompt))),
            bytes: Some(STUB_PNG.to_vec()),
        })
    }
}

/// First 8 hex chars of the prompt's SHA-256
pub fn prompt_hash(prompt: &str) -> String {
    let digest = format!("{:x}", Sha256::digest(prompt.as_bytes()));
    digest[..8].to_string()
}

const ART_DIRECTOR_PROMPT: &str = r#"You are a senior art director. Rewrite image prompts for LinkedIn so they read like high-end editorial photography, not generic AI art.
Aesthetic: sleek, minimal, open composition with negative space, square framing, soft studio lighting with subtle gradients.
Avoid glowing brains, digital networks, floating matrices, literal robots and hacker rooms.
Prefer people in thoughtful poses, minimalist glass offices, frosted glass, clean lines and quality materials.
One or two sentences. No text, logos or labels.

OUTPUT FORMAT (strict JSON):
{"enhanced_prompt": "the rewritten prompt"}"#;

#[derive(Debug, Deserialize)]
struct Enhanced {
    enhanced_prompt: String,
}

/// Turns a post's image prompt into a branded image, optionally saved to disk
pub struct ImageGenerator {
    provider: Arc<dyn ImageProvider>,
    enhancer: Option<Arc<dyn LlmProvider>>,
    brand: BrandConfig,
    size: String,
    quality: String,
    download_timeout: Duration,
    client: reqwest::Client,
}

impl ImageGenerator {
    pub fn new(
        provider: Arc<dyn ImageProvider>,
        brand: BrandConfig,
        size: impl Into<String>,
        quality: impl Into<String>,
    ) -> Self {
        Self {
            provider,
            enhancer: None,
            brand,
            size: size.into(),
            quality: quality.into(),
            download_timeout: Duration::from_secs(120),
            client: reqwest::Client::new(),
        }
    }

    /// Upper bound on fetching a rendered image, body included
    pub fn with_download_timeout(mut self, timeout_secs: u64) -> Self {
        self.download_timeout = Duration::from_secs(timeout_secs);
        self
    }

    /// Rewrite prompts with the text model before rendering
    pub fn with_enhancer(mut self, llm: Arc<dyn LlmProvider>) -> Self {
        self.enhancer = Some(llm);
        self
    }

    pub fn themed_prompt(&self, prompt: &str) -> String {
        let b = &self.brand;
        format!(
            "{}. Use a professional color palette with: \
             Primary color: {} (Lilac), \
             Secondary color: {} (White/Light Grey), \
             Accent color: {} (Orange/Amber), \
             Background color: {} (Charcoal), \
             Text color: {} (for dark backgrounds). \
             Professional, modern, clean design style with these specific brand colors.",
            prompt.trim_end_matches('.'),
            b.primary,
            b.secondary,
            b.accent,
            b.background,
            b.text
        )
    }

    async fn enhance(&self, llm: &dyn LlmProvider, prompt: &str) -> Result<String> {
        let request = LlmRequest::new(format!(
            "Enhance this image prompt for a professional LinkedIn post: {}",
            prompt
        ))
        .with_system(ART_DIRECTOR_PROMPT);

        let response = llm.generate(request).await?;
        let enhanced = match extract_json_from_text(&response.content)
            .and_then(|json| serde_json::from_str::<Enhanced>(&json).ok())
        {
            Some(e) => e.enhanced_prompt,
            None => response.content,
        };

        let enhanced = enhanced.trim();
        if enhanced.is_empty() {
            anyhow::bail!("enhanced prompt is empty");
        }
        Ok(enhanced.to_string())
    }

    async fn download(&self, url: &str) -> Result<Vec<u8>> {
        let exchange = async {
            let response = self
                .client
                .get(url)
                .send()
                .await
                .context("failed to download generated image")?;
            if !response.status().is_success() {
                anyhow::bail!("image download failed with status: {}", response.status());
            }
            let bytes = response.bytes().await.context("failed to read image body")?;
            Ok::<_, anyhow::Error>(bytes.to_vec())
        };

        tokio::time::timeout(self.download_timeout, exchange)
            .await
            .context("image download timed out")?
    }

    pub async fn generate_image(
        &self,
        prompt: &str,
        save_dir: Option<&Path>,
    ) -> crate::Result<GeneratedImage> {
        let base = match &self.enhancer {
            Some(llm) => match self.enhance(llm.as_ref(), prompt).await {
                Ok(p) => p,
                Err(e) => {
                    warn!("generator: prompt enhancement failed, using raw prompt: {:#}", e);
                    prompt.to_string()
                }
            },
            None => prompt.to_string(),
        };
        let themed = self.themed_prompt(&base);

        let rendered = self
            .provider
            .render(&themed, &self.size, &self.quality)
            .await
            .map_err(Error::generation)?;

        let mut image_path = None;
        if let Some(dir) = save_dir {
            let bytes = match rendered.bytes.clone() {
                Some(b) => b,
                None => {
                    let url = rendered
                        .url
                        .as_deref()
                        .ok_or_else(|| Error::Generation("image has neither url nor data".into()))?;
                    self.download(url).await.map_err(Error::generation)?
                }
            };

            tokio::fs::create_dir_all(dir).await?;
            let path = dir.join(format!("post_image_{}.png", prompt_hash(&base)));
            tokio::fs::write(&path, &bytes).await?;
            info!(path = %path.display(), bytes = bytes.len(), "generator: image saved");
            image_path = Some(path.to_string_lossy().to_string());
        }

        let mut generation_metadata = BTreeMap::new();
        generation_metadata.insert("model".to_string(), self.provider.model().to_string());
        generation_metadata.insert("size".to_string(), self.size.clone());
        generation_metadata.insert("quality".to_string(), self.quality.clone());

        Ok(GeneratedImage {
            image_url: rendered.url,
            image_path,
            prompt_used: themed,
            generation_metadata,
        })
    }
}
