use std::fmt;

use base64::{engine::general_purpose, Engine as _};
use reqwest::Client;
use tracing::{error, warn};
use url::Url;

use crate::utils::http::get_http_client;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MediaError {
    #[error("image is not a data URI")]
    NotDataUri,
    #[error("data URI has no media type")]
    MissingMediaType,
    #[error("data URI is not base64 encoded")]
    NotBase64,
    #[error("data URI payload is empty")]
    EmptyPayload,
    #[error("data URI payload is not valid base64")]
    InvalidPayload,
    #[error("unsupported image source: {0}")]
    UnsupportedSource(String),
}

/// Image bytes carried as base64 together with their media type.
#[derive(Clone, PartialEq, Eq)]
pub struct InlineImage {
    pub mime_type: String,
    pub data: String,
}

impl fmt::Debug for InlineImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InlineImage")
            .field("mime_type", &self.mime_type)
            .field("data_len", &self.data.len())
            .finish()
    }
}

impl InlineImage {
    pub fn new(mime_type: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            mime_type: mime_type.into(),
            data: data.into(),
        }
    }

    pub fn from_bytes(bytes: &[u8], fallback_mime: &str) -> Self {
        let mime_type = detect_mime_type(bytes).unwrap_or_else(|| fallback_mime.to_string());
        Self::new(mime_type, general_purpose::STANDARD.encode(bytes))
    }

    /// Parses `data:<media-type>;base64,<payload>`.
    pub fn from_data_uri(value: &str) -> Result<Self, MediaError> {
        let value = value.trim();
        if !value.starts_with("data:") {
            return Err(MediaError::NotDataUri);
        }
        let mime_type = media_type_of(value).ok_or(MediaError::MissingMediaType)?;
        if mime_type.trim().is_empty() {
            return Err(MediaError::MissingMediaType);
        }

        let semicolon = value.find(';').ok_or(MediaError::MissingMediaType)?;
        let payload = value[semicolon + 1..]
            .strip_prefix("base64,")
            .ok_or(MediaError::NotBase64)?;
        if payload.is_empty() {
            return Err(MediaError::EmptyPayload);
        }
        general_purpose::STANDARD
            .decode(payload)
            .map_err(|_| MediaError::InvalidPayload)?;

        Ok(Self::new(mime_type.trim(), payload))
    }

    pub fn to_data_uri(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.data)
    }

    pub fn is_image(&self) -> bool {
        self.mime_type.starts_with("image/")
    }

    pub fn decode(&self) -> Result<Vec<u8>, MediaError> {
        general_purpose::STANDARD
            .decode(&self.data)
            .map_err(|_| MediaError::InvalidPayload)
    }
}

/// The substring between the first `:` and the first `;` of a data URI.
pub fn media_type_of(data_uri: &str) -> Option<&str> {
    let start = data_uri.find(':')? + 1;
    let end = data_uri.find(';')?;
    if end < start {
        return None;
    }
    Some(&data_uri[start..end])
}

/// Where an item image lives: already inline, or behind an http(s) URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSource {
    Inline(InlineImage),
    Remote(Url),
}

impl ImageSource {
    pub fn parse(value: &str) -> Result<Self, MediaError> {
        let trimmed = value.trim();
        if trimmed.starts_with("data:") {
            return InlineImage::from_data_uri(trimmed).map(ImageSource::Inline);
        }

        match Url::parse(trimmed) {
            Ok(url) if url.scheme() == "https" || url.scheme() == "http" => {
                Ok(ImageSource::Remote(url))
            }
            _ => Err(MediaError::UnsupportedSource(truncate_for_log(trimmed, 80))),
        }
    }
}

pub fn detect_mime_type(data: &[u8]) -> Option<String> {
    if data.len() > 12 {
        let ftyp = &data[4..12];
        if ftyp.starts_with(b"ftyp") {
            let brand = &ftyp[4..8];
            if brand == b"heic" || brand == b"heif" || brand == b"hevc" {
                return Some("image/heic".to_string());
            }
        }
    }

    infer::get(data).map(|kind| kind.mime_type().to_string())
}

/// Largest reference image accepted from a remote catalog URL.
pub const MEDIA_DOWNLOAD_MAX_BYTES: usize = 10 * 1024 * 1024;
const MEDIA_DOWNLOAD_ERROR_BODY_LIMIT: usize = 800;

fn truncate_for_log(value: &str, limit: usize) -> String {
    if value.chars().count() <= limit {
        return value.to_string();
    }
    let truncated: String = value.chars().take(limit).collect();
    format!("{truncated}... (truncated)")
}

/// Fetches a reference image once. Failures are logged and yield `None`.
pub async fn download_media(url: &str) -> Option<Vec<u8>> {
    fetch_capped(get_http_client(), url, MEDIA_DOWNLOAD_MAX_BYTES).await
}

async fn fetch_capped(client: &Client, url: &str, max_bytes: usize) -> Option<Vec<u8>> {
    let mut response = match client.get(url).send().await {
        Ok(resp) => resp,
        Err(err) => {
            warn!(
                "Failed to fetch media {url}: {err} (timeout={}, connect={}, status={:?})",
                err.is_timeout(),
                err.is_connect(),
                err.status()
            );
            return None;
        }
    };

    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        warn!(
            "Media download failed for {url} with status {}: {}",
            status,
            truncate_for_log(&body, MEDIA_DOWNLOAD_ERROR_BODY_LIMIT)
        );
        return None;
    }

    if let Some(length) = response.content_length() {
        if length > max_bytes as u64 {
            warn!("Media at {url} is {length} bytes, limit is {max_bytes}");
            return None;
        }
    }

    let mut bytes = Vec::new();
    loop {
        match response.chunk().await {
            Ok(Some(chunk)) => {
                if bytes.len() + chunk.len() > max_bytes {
                    warn!("Media at {url} exceeds the {max_bytes} byte limit");
                    return None;
                }
                bytes.extend_from_slice(&chunk);
            }
            Ok(None) => return Some(bytes),
            Err(err) => {
                error!("Failed to read media bytes {url}: {err}");
                return None;
            }
        }
    }
}
