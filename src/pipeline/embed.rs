//! Image embedding: turn `<img>` sources into self-contained `data:` URIs.
//!
//! The paginated output must render with zero external fetches, so every
//! raster image — local file or remote URL — is inlined as
//! `data:{media-type};base64,{payload}`. Sources that are already `data:`
//! URIs pass through untouched, which makes the operation idempotent and
//! safe to re-run over partially processed documents.
//!
//! A failed embed is never fatal here: the error is returned to the node
//! builder, which keeps the original reference, records a warning, and lets
//! the rest of the document convert normally.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use crate::error::BundleError;

/// Remote sources: absolute `http(s)` URLs plus protocol-relative `//host/…`.
static RE_REMOTE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(https?:)?//").unwrap());

/// Why a single image could not be embedded.
#[derive(Debug, Error)]
pub enum EmbedError {
    #[error("failed to read '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to fetch '{url}': {reason}")]
    Fetch { url: String, reason: String },

    #[error("'{url}' returned HTTP {status}")]
    HttpStatus { url: String, status: u16 },
}

/// Resolves image references to embedded `data:` URIs.
///
/// Owns one HTTP client so concurrent fetches within a document share a
/// connection pool and a single timeout policy.
pub struct ResourceEmbedder {
    client: reqwest::Client,
}

impl ResourceEmbedder {
    /// Create an embedder whose remote fetches time out after `fetch_timeout`.
    pub fn new(fetch_timeout: Duration) -> Result<Self, BundleError> {
        let client = reqwest::Client::builder()
            .timeout(fetch_timeout)
            .build()
            .map_err(|e| BundleError::Internal(format!("HTTP client: {e}")))?;
        Ok(Self { client })
    }

    /// Embed one image reference.
    ///
    /// * Already-embedded (`data:`) references are returned unchanged.
    /// * Remote references are fetched; the media type comes from the
    ///   response `Content-Type` header (generic binary if absent).
    /// * Local references are resolved against `base_dir` when relative and
    ///   read from disk; the media type is inferred from the extension.
    pub async fn embed(&self, src: &str, base_dir: &Path) -> Result<String, EmbedError> {
        if src.starts_with("data:") {
            return Ok(src.to_string());
        }
        if RE_REMOTE.is_match(src) {
            self.fetch_remote(src).await
        } else {
            embed_local(src, base_dir).await
        }
    }

    async fn fetch_remote(&self, src: &str) -> Result<String, EmbedError> {
        // Protocol-relative sources have no scheme to fetch with; assume TLS.
        let url = if src.starts_with("//") {
            format!("https:{src}")
        } else {
            src.to_string()
        };

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| EmbedError::Fetch {
                url: url.clone(),
                reason: e.to_string(),
            })?;

        if !response.status().is_success() {
            return Err(EmbedError::HttpStatus {
                url,
                status: response.status().as_u16(),
            });
        }

        let media_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.split(';').next().unwrap_or(v).trim().to_string())
            .unwrap_or_else(|| "application/octet-stream".to_string());

        let bytes = response.bytes().await.map_err(|e| EmbedError::Fetch {
            url: url.clone(),
            reason: e.to_string(),
        })?;

        debug!("embedded remote image {} ({} bytes)", url, bytes.len());
        Ok(data_uri(&media_type, &bytes))
    }
}

async fn embed_local(src: &str, base_dir: &Path) -> Result<String, EmbedError> {
    // Markdown sources routinely percent-encode spaces in paths.
    let decoded = percent_encoding::percent_decode_str(src)
        .decode_utf8()
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| src.to_string());

    let path = Path::new(&decoded);
    let path = if path.is_absolute() {
        path.to_path_buf()
    } else {
        base_dir.join(path)
    };

    let bytes = tokio::fs::read(&path).await.map_err(|source| EmbedError::Read {
        path: path.clone(),
        source,
    })?;

    let media_type = mime_guess::from_path(&path).first_or_octet_stream();
    debug!(
        "embedded local image {} ({} bytes, {})",
        path.display(),
        bytes.len(),
        media_type
    );
    Ok(data_uri(media_type.essence_str(), &bytes))
}

fn data_uri(media_type: &str, bytes: &[u8]) -> String {
    format!("data:{media_type};base64,{}", STANDARD.encode(bytes))
}
