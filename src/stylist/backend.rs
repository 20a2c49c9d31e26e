use anyhow::Result;
use async_trait::async_trait;

use crate::llm::media::{ImageSource, InlineImage};

/// Item image attached to a synthesis request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceImage {
    pub item_name: String,
    pub source: ImageSource,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynthesisRequest {
    pub prompt: String,
    /// The user's base photo; always sent first.
    pub subject: InlineImage,
    pub references: Vec<ReferenceImage>,
}

/// One part of a synthesis response after the provider envelope is removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponsePart {
    Text(String),
    Inline(InlineImage),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SynthesisResponse {
    pub parts: Vec<ResponsePart>,
}

impl SynthesisResponse {
    pub fn from_parts(parts: Vec<ResponsePart>) -> Self {
        Self { parts }
    }
}

/// Picks the image a synthesis response produced: the first inline part with
/// an `image/*` media type and a non-empty payload.
pub fn select_image(response: &SynthesisResponse) -> Option<&InlineImage> {
    response.parts.iter().find_map(|part| match part {
        ResponsePart::Inline(image) if image.is_image() && !image.data.is_empty() => Some(image),
        _ => None,
    })
}

/// Generative capabilities the stylist depends on.
#[async_trait]
pub trait StylistBackend: Send + Sync {
    /// Runs a text-only prompt that must answer with a JSON object; returns the raw text.
    async fn plan_looks(&self, prompt: &str) -> Result<String>;

    async fn synthesize_image(&self, request: &SynthesisRequest) -> Result<SynthesisResponse>;

    /// Runs a vision prompt over one image that must answer with a JSON object.
    async fn analyze_image(&self, prompt: &str, image: &InlineImage) -> Result<String>;
}
