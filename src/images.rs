use crate::error::{LlmError, Result};
use crate::llm::OpenAiClient;
use async_trait::async_trait;
use base64::prelude::*;
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use strum::{Display, EnumIter, EnumString};
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, EnumIter)]
pub enum ImageModel {
    #[serde(rename = "dall-e-2")]
    #[strum(serialize = "dall-e-2")]
    DallE2,
    #[serde(rename = "dall-e-3")]
    #[strum(serialize = "dall-e-3")]
    DallE3,
}

impl ImageModel {
    pub fn sizes(&self) -> &'static [&'static str] {
        match self {
            ImageModel::DallE2 => &["256x256", "512x512", "1024x1024"],
            ImageModel::DallE3 => &["1024x1024", "1024x1792", "1792x1024"],
        }
    }

    pub fn max_images(&self) -> u8 {
        match self {
            ImageModel::DallE2 => 4,
            ImageModel::DallE3 => 1,
        }
    }

    /// Quality and style are only understood by dall-e-3
    pub fn supports_quality_and_style(&self) -> bool {
        matches!(self, ImageModel::DallE3)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ImageQuality {
    #[default]
    Standard,
    Hd,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ImageStyle {
    #[default]
    Vivid,
    Natural,
}

/// Parameters of one image generation call
#[derive(Debug, Clone, PartialEq)]
pub struct ImageRequest {
    pub prompt: String,
    pub model: ImageModel,
    pub size: String,
    pub quality: ImageQuality,
    pub style: ImageStyle,
    pub n: u8,
}

impl ImageRequest {
    pub fn new(prompt: impl Into<String>, model: ImageModel) -> Self {
        Self {
            prompt: prompt.into(),
            model,
            size: "1024x1024".to_string(),
            quality: ImageQuality::default(),
            style: ImageStyle::default(),
            n: 1,
        }
    }

    pub fn with_size(mut self, size: impl Into<String>) -> Self {
        self.size = size.into();
        self
    }

    pub fn with_quality(mut self, quality: ImageQuality) -> Self {
        self.quality = quality;
        self
    }

    pub fn with_style(mut self, style: ImageStyle) -> Self {
        self.style = style;
        self
    }

    pub fn with_count(mut self, n: u8) -> Self {
        self.n = n;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.prompt.trim().is_empty() {
            return Err(LlmError::input("Please enter a text prompt"));
        }
        if !self.model.sizes().contains(&self.size.as_str()) {
            return Err(LlmError::input(format!(
                "Size {} is not supported by {} (choose one of {})",
                self.size,
                self.model,
                self.model.sizes().join(", ")
            )));
        }
        if self.n == 0 || self.n > self.model.max_images() {
            return Err(LlmError::input(format!(
                "{} can generate between 1 and {} images per request",
                self.model,
                self.model.max_images()
            )));
        }
        Ok(())
    }

    fn payload(&self) -> ImageGenerationPayload<'_> {
        let (quality, style) = if self.model.supports_quality_and_style() {
            (Some(self.quality), Some(self.style))
        } else {
            (None, None)
        };

        ImageGenerationPayload {
            prompt: &self.prompt,
            model: self.model,
            size: &self.size,
            n: self.n,
            quality,
            style,
        }
    }
}

#[derive(Debug, Serialize)]
struct ImageGenerationPayload<'a> {
    prompt: &'a str,
    model: ImageModel,
    size: &'a str,
    n: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    quality: Option<ImageQuality>,
    #[serde(skip_serializing_if = "Option::is_none")]
    style: Option<ImageStyle>,
}

#[derive(Debug, Deserialize)]
struct ImageGenerationResponse {
    data: Vec<GeneratedImage>,
}

/// Reference to one generated image as returned by the provider
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GeneratedImage {
    pub url: Option<String>,
    pub b64_json: Option<String>,
    pub revised_prompt: Option<String>,
}

/// Image generation plus download of the referenced images
#[async_trait]
pub trait ImageBackend: Send + Sync {
    async fn generate(&self, request: &ImageRequest) -> Result<Vec<GeneratedImage>>;

    async fn fetch(&self, url: &str) -> Result<Vec<u8>>;
}

#[async_trait]
impl ImageBackend for OpenAiClient {
    async fn generate(&self, request: &ImageRequest) -> Result<Vec<GeneratedImage>> {
        request.validate()?;
        debug!(model = %request.model, size = %request.size, n = request.n, "generating images");

        let response: ImageGenerationResponse = self
            .post_json("images/generations", &request.payload())
            .await?;

        if response.data.is_empty() {
            return Err(LlmError::MalformedResponse(
                "image response contained no images".to_string(),
            ));
        }
        Ok(response.data)
    }

    async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        self.get_bytes(url).await
    }
}

/// Bytes of a generated image: inline base64 data, or a download of its URL
pub async fn image_bytes<I: ImageBackend + ?Sized>(
    backend: &I,
    image: &GeneratedImage,
) -> Result<Vec<u8>> {
    if let Some(encoded) = &image.b64_json {
        return BASE64_STANDARD
            .decode(encoded)
            .map_err(|e| LlmError::MalformedResponse(format!("invalid base64 image: {e}")));
    }
    if let Some(url) = &image.url {
        return backend.fetch(url).await;
    }
    Err(LlmError::MalformedResponse(
        "image has neither data nor a URL".to_string(),
    ))
}

/// Timestamp used in generated file names
pub fn file_stamp(at: DateTime<Local>) -> String {
    at.format("%Y%m%d_%H%M%S").to_string()
}

/// Write one image as `generated_image_<stamp>_<index + 1>.png`
pub fn save_image(dir: &Path, bytes: &[u8], stamp: &str, index: usize) -> Result<PathBuf> {
    fs::create_dir_all(dir)?;
    let path = dir.join(format!("generated_image_{stamp}_{}.png", index + 1));
    fs::write(&path, bytes)?;
    info!(path = %path.display(), "saved image");
    Ok(path)
}

/// Generate, download and save every image of one request
pub async fn generate_and_save<I: ImageBackend + ?Sized>(
    backend: &I,
    request: &ImageRequest,
    dir: &Path,
    at: DateTime<Local>,
) -> Result<Vec<PathBuf>> {
    let images = backend.generate(request).await?;
    let downloads = futures::future::try_join_all(
        images.iter().map(|image| image_bytes(backend, image)),
    )
    .await?;

    let stamp = file_stamp(at);
    downloads
        .iter()
        .enumerate()
        .map(|(index, bytes)| save_image(dir, bytes, &stamp, index))
        .collect()
}
