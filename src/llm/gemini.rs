use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::{debug, warn};

use crate::config::CONFIG;
use crate::llm::media::{download_media, ImageSource, InlineImage};
use crate::stylist::{ResponsePart, StylistBackend, SynthesisRequest, SynthesisResponse};
use crate::utils::http::get_http_client;
use crate::utils::timing::log_llm_timing;

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    candidates: Option<Vec<GeminiCandidate>>,
    #[serde(rename = "promptFeedback")]
    prompt_feedback: Option<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    content: Option<GeminiContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiContent {
    parts: Option<Vec<GeminiPart>>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum GeminiPart {
    Text {
        text: String,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: GeminiInlineData,
    },
    Other(serde::de::IgnoredAny),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiInlineData {
    mime_type: String,
    data: String,
}

/// `StylistBackend` over the Gemini `generateContent` REST endpoint.
#[derive(Clone)]
pub struct GeminiBackend {
    client: Client,
    api_key: String,
    api_base: String,
    text_model: String,
    image_model: String,
    safety_profile: String,
    timeout: Duration,
}

impl GeminiBackend {
    pub fn from_config() -> Result<Self> {
        if CONFIG.gemini_api_key.is_empty() {
            return Err(anyhow!("GEMINI_API_KEY is required"));
        }
        Ok(Self {
            client: get_http_client().clone(),
            api_key: CONFIG.gemini_api_key.clone(),
            api_base: CONFIG.gemini_api_base.clone(),
            text_model: CONFIG.gemini_text_model.clone(),
            image_model: CONFIG.gemini_image_model.clone(),
            safety_profile: CONFIG.gemini_safety_settings.clone(),
            timeout: Duration::from_secs(CONFIG.gemini_request_timeout_seconds),
        })
    }

    fn redact_api_key(&self, text: &str) -> String {
        if self.api_key.is_empty() {
            return text.to_string();
        }
        text.replace(&self.api_key, "[redacted]")
    }

    async fn call_gemini_api(
        &self,
        model: &str,
        payload: Value,
        operation: &str,
    ) -> Result<GeminiResponse> {
        let url = format!("{}/models/{}:generateContent", self.api_base, model);

        if tracing::enabled!(tracing::Level::DEBUG) {
            let payload_summary = summarize_gemini_payload(&payload);
            debug!(target: "llm.gemini", model = model, operation = operation, payload = %payload_summary);
        }

        let response = match self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .timeout(self.timeout)
            .json(&payload)
            .send()
            .await
        {
            Ok(response) => response,
            Err(err) => {
                let err_text = self.redact_api_key(&err.to_string());
                warn!(
                    "Gemini request failed to send: {} (timeout={}, connect={}, status={:?})",
                    err_text,
                    err.is_timeout(),
                    err.is_connect(),
                    err.status()
                );
                return Err(anyhow!("Gemini request failed: {}", err_text));
            }
        };

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let (message, body_summary) = summarize_error_body(&body);
            warn!("Gemini API error: status={}, body={}", status, body_summary);
            let detail = message.unwrap_or(body_summary);
            return Err(anyhow!(
                "Gemini request failed with status {}: {}",
                status,
                detail
            ));
        }

        let value = response.json::<GeminiResponse>().await?;
        if tracing::enabled!(tracing::Level::DEBUG) {
            let response_summary = summarize_gemini_response(&value);
            debug!(target: "llm.gemini", model = model, operation = operation, response = %response_summary);
        }
        Ok(value)
    }

    async fn generate_json(&self, operation: &str, parts: Vec<Value>) -> Result<String> {
        let payload = json!({
            "contents": [{ "role": "user", "parts": parts }],
            "generationConfig": { "responseMimeType": "application/json" },
            "safetySettings": build_safety_settings(&self.safety_profile),
        });

        let model = self.text_model.as_str();
        log_llm_timing("gemini", model, operation, None, || async {
            let response = self.call_gemini_api(model, payload, operation).await?;
            let text = extract_text_from_response(response);
            if text.trim().is_empty() {
                return Err(anyhow!("Gemini returned no text (model: {})", model));
            }
            Ok(text)
        })
        .await
    }

    async fn resolve_reference(&self, item_name: &str, source: &ImageSource) -> Option<InlineImage> {
        match source {
            ImageSource::Inline(image) => Some(image.clone()),
            ImageSource::Remote(url) => {
                let Some(bytes) = download_media(url.as_str()).await else {
                    warn!("Skipping reference image for '{}': download failed", item_name);
                    return None;
                };
                let image = InlineImage::from_bytes(&bytes, "image/jpeg");
                if !image.is_image() {
                    warn!(
                        "Skipping reference image for '{}': unsupported mime {}",
                        item_name, image.mime_type
                    );
                    return None;
                }
                Some(image)
            }
        }
    }
}

#[async_trait]
impl StylistBackend for GeminiBackend {
    async fn plan_looks(&self, prompt: &str) -> Result<String> {
        self.generate_json("plan_looks", vec![json!({ "text": prompt })])
            .await
    }

    async fn synthesize_image(&self, request: &SynthesisRequest) -> Result<SynthesisResponse> {
        let mut images = vec![request.subject.clone()];
        for reference in &request.references {
            if let Some(image) = self
                .resolve_reference(&reference.item_name, &reference.source)
                .await
            {
                images.push(image);
            }
        }

        let payload = json!({
            "contents": [{ "role": "user", "parts": build_gemini_parts(&request.prompt, &images) }],
            "generationConfig": { "responseModalities": ["IMAGE"] },
            "safetySettings": build_safety_settings(&self.safety_profile),
        });

        let model = self.image_model.as_str();
        let metadata = json!({ "references": request.references.len(), "images_sent": images.len() });
        log_llm_timing("gemini", model, "synthesize_image", Some(metadata), || async {
            let response = self
                .call_gemini_api(model, payload, "synthesize_image")
                .await?;
            Ok(normalize_response(response))
        })
        .await
    }

    async fn analyze_image(&self, prompt: &str, image: &InlineImage) -> Result<String> {
        let parts = build_gemini_parts(prompt, std::slice::from_ref(image));
        self.generate_json("analyze_image", parts).await
    }
}

fn build_safety_settings(profile: &str) -> Vec<Value> {
    let threshold = match profile {
        "standard" => "BLOCK_MEDIUM_AND_ABOVE",
        "permissive" => "OFF",
        _ => {
            warn!(
                "Unknown GEMINI_SAFETY_SETTINGS value '{}', using permissive defaults.",
                profile
            );
            "OFF"
        }
    };

    vec![
        json!({ "category": "HARM_CATEGORY_HARASSMENT", "threshold": threshold }),
        json!({ "category": "HARM_CATEGORY_HATE_SPEECH", "threshold": threshold }),
        json!({ "category": "HARM_CATEGORY_SEXUALLY_EXPLICIT", "threshold": threshold }),
        json!({ "category": "HARM_CATEGORY_DANGEROUS_CONTENT", "threshold": threshold }),
    ]
}

fn normalize_gemini_mime_type(mime_type: &str) -> String {
    let lowered = mime_type.trim().to_ascii_lowercase();
    match lowered.as_str() {
        "image/jpg" | "image/pjpeg" => "image/jpeg".to_string(),
        "image/x-png" => "image/png".to_string(),
        _ => lowered,
    }
}

/// Text first, then each image in order: subject photo, then item references.
fn build_gemini_parts(prompt: &str, images: &[InlineImage]) -> Vec<Value> {
    let mut parts = vec![json!({ "text": prompt })];
    for image in images {
        parts.push(json!({
            "inlineData": {
                "mimeType": normalize_gemini_mime_type(&image.mime_type),
                "data": image.data
            }
        }));
    }
    parts
}

fn truncate_for_log(value: &str, limit: usize) -> String {
    if value.chars().count() <= limit {
        return value.to_string();
    }
    let truncated: String = value.chars().take(limit).collect();
    format!("{truncated}... (truncated)")
}

fn summarize_gemini_parts(parts: &[Value]) -> Vec<Value> {
    parts
        .iter()
        .map(|part| {
            if let Some(text) = part.get("text").and_then(|value| value.as_str()) {
                json!({ "text": truncate_for_log(text, 200) })
            } else if let Some(inline_data) = part.get("inlineData") {
                let mime_type = inline_data
                    .get("mimeType")
                    .and_then(|value| value.as_str())
                    .unwrap_or("unknown");
                let data_len = inline_data
                    .get("data")
                    .and_then(|value| value.as_str())
                    .map(|value| value.len())
                    .unwrap_or(0);
                json!({ "inlineData": { "mimeType": mime_type, "dataLen": data_len } })
            } else {
                json!({ "unknownPart": true })
            }
        })
        .collect()
}

fn summarize_gemini_payload(payload: &Value) -> Value {
    let mut summary = Map::new();

    if let Some(contents) = payload.get("contents").and_then(|value| value.as_array()) {
        let mut summarized_contents = Vec::new();
        for content in contents {
            let role = content
                .get("role")
                .and_then(|value| value.as_str())
                .unwrap_or("user");
            let parts = content
                .get("parts")
                .and_then(|value| value.as_array())
                .map(|parts| summarize_gemini_parts(parts))
                .unwrap_or_default();
            summarized_contents.push(json!({ "role": role, "parts": parts }));
        }
        summary.insert("contents".to_string(), Value::Array(summarized_contents));
    }

    if let Some(config) = payload.get("generationConfig") {
        summary.insert("generationConfig".to_string(), config.clone());
    }

    if let Some(safety) = payload
        .get("safetySettings")
        .and_then(|value| value.as_array())
    {
        summary.insert("safetySettingsCount".to_string(), json!(safety.len()));
    }

    Value::Object(summary)
}

fn summarize_gemini_response(response: &GeminiResponse) -> Value {
    let mut text_parts = 0usize;
    let mut image_parts = 0usize;
    let mut text_preview = None;
    let mut finish_reasons = Vec::new();

    let candidates = response.candidates.as_deref().unwrap_or(&[]);
    for candidate in candidates {
        if let Some(reason) = &candidate.finish_reason {
            finish_reasons.push(reason.clone());
        }
        let parts = candidate
            .content
            .as_ref()
            .and_then(|content| content.parts.as_deref())
            .unwrap_or(&[]);
        for part in parts {
            match part {
                GeminiPart::Text { text } => {
                    text_parts += 1;
                    if text_preview.is_none() && !text.trim().is_empty() {
                        text_preview = Some(truncate_for_log(text, 200));
                    }
                }
                GeminiPart::InlineData { inline_data } => {
                    if inline_data.mime_type.starts_with("image/") {
                        image_parts += 1;
                    }
                }
                GeminiPart::Other(_) => {}
            }
        }
    }

    json!({
        "candidates": candidates.len(),
        "textParts": text_parts,
        "imageParts": image_parts,
        "textPreview": text_preview,
        "finishReasons": finish_reasons,
        "promptFeedback": response.prompt_feedback,
    })
}

fn summarize_error_body(body: &str) -> (Option<String>, String) {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return (None, "empty response body".to_string());
    }

    if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
        let message = value
            .pointer("/error/message")
            .and_then(|v| v.as_str())
            .map(|v| v.to_string())
            .or_else(|| {
                value
                    .get("message")
                    .and_then(|v| v.as_str())
                    .map(|v| v.to_string())
            });
        return (message, truncate_for_log(&value.to_string(), 2000));
    }

    (None, truncate_for_log(trimmed, 2000))
}

fn response_parts(response: GeminiResponse) -> Vec<GeminiPart> {
    response
        .candidates
        .unwrap_or_default()
        .into_iter()
        .filter_map(|candidate| candidate.content)
        .filter_map(|content| content.parts)
        .flatten()
        .collect()
}

fn extract_text_from_response(response: GeminiResponse) -> String {
    let mut text_parts = Vec::new();
    for part in response_parts(response) {
        if let GeminiPart::Text { text } = part {
            if !text.trim().is_empty() {
                text_parts.push(text);
            }
        }
    }
    text_parts.join("\n")
}

/// Strips the candidate/content envelope, keeping text and inline parts in order.
fn normalize_response(response: GeminiResponse) -> SynthesisResponse {
    let parts = response_parts(response)
        .into_iter()
        .filter_map(|part| match part {
            GeminiPart::Text { text } => Some(ResponsePart::Text(text)),
            GeminiPart::InlineData { inline_data } => Some(ResponsePart::Inline(InlineImage::new(
                normalize_gemini_mime_type(&inline_data.mime_type),
                inline_data.data,
            ))),
            GeminiPart::Other(_) => None,
        })
        .collect();
    SynthesisResponse::from_parts(parts)
}
