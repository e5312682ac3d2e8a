//! Gemini `generateContent` backend with Google Search grounding.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, warn};

use super::{ContentGenerator, GenerationRequest, PromptConfig};
use crate::document::{Attestation, GeneratedDocument, Span};
use crate::error::GenerationError;

/// Gemini REST endpoint
pub const GEMINI_API_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Gemini API response
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<Content>,
    /// Kept raw so a malformed block degrades to "no grounding".
    grounding_metadata: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GroundingMetadata {
    #[serde(default)]
    grounding_supports: Vec<GroundingSupport>,
    #[serde(default)]
    grounding_chunks: Vec<GroundingChunk>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GroundingSupport {
    segment: Option<Segment>,
    #[serde(default, alias = "chunkIndices")]
    grounding_chunk_indices: Vec<Value>,
}

/// Offsets stay untyped: non-integer values must be skipped, not rejected.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Segment {
    #[serde(alias = "startOffset")]
    start_index: Option<Value>,
    #[serde(alias = "endOffset")]
    end_index: Option<Value>,
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GroundingChunk {
    web: Option<WebChunk>,
}

#[derive(Debug, Deserialize)]
struct WebChunk {
    uri: Option<String>,
}

/// Gemini API client.
pub struct GeminiClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl GeminiClient {
    /// Create a new client with an API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            base_url: GEMINI_API_BASE_URL.to_string(),
        }
    }

    /// Set a custom base URL (useful for proxies and tests).
    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    fn endpoint(&self, model: &str) -> String {
        format!("{}/models/{}:generateContent", self.base_url, model)
    }

    /// Request body for the REST API.
    fn request_body(request: &GenerationRequest) -> Value {
        let mut body = json!({
            "systemInstruction": { "parts": [{ "text": request.system_instruction }] },
            "contents": [{ "role": "user", "parts": [{ "text": request.user_prompt }] }],
            "generationConfig": { "temperature": request.temperature },
        });
        if request.grounding_enabled {
            body["tools"] = json!([{ "google_search": {} }]);
        }
        body
    }
}

#[async_trait]
impl ContentGenerator for GeminiClient {
    fn name(&self) -> &'static str {
        "gemini"
    }

    async fn generate(&self, config: &PromptConfig) -> Result<GeneratedDocument, GenerationError> {
        let request = GenerationRequest::build(config)?;
        let url = self.endpoint(&request.model);

        debug!(model = %request.model, cutoff = %config.cutoff, "Requesting digest generation");

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&Self::request_body(&request))
            .send()
            .await
            .map_err(|e| GenerationError::Failed(format!("Gemini request failed: {e}")))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| GenerationError::Failed(format!("Failed to read response: {e}")))?;

        if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
            return Err(GenerationError::Failed(format!(
                "Gemini API error ({status}): {body}"
            )));
        }
        if !status.is_success() {
            return Err(GenerationError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        parse_response(&body)
    }
}

/// Extract body text and attestations from a raw `generateContent` response.
pub fn parse_response(raw: &str) -> Result<GeneratedDocument, GenerationError> {
    let response: GenerateContentResponse = serde_json::from_str(raw)
        .map_err(|e| GenerationError::InvalidResponse(format!("Failed to parse response: {e}")))?;

    let Some(candidate) = response.candidates.into_iter().next() else {
        return Err(GenerationError::Failed("response has no candidates".to_string()));
    };

    let body: String = candidate
        .content
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();
    if body.trim().is_empty() {
        return Err(GenerationError::Failed("candidate has no text".to_string()));
    }

    let attestations = match candidate.grounding_metadata {
        None | Some(Value::Null) => Vec::new(),
        Some(raw) => match serde_json::from_value::<GroundingMetadata>(raw) {
            Ok(metadata) => attestations(&metadata),
            Err(e) => {
                warn!(error = %e, "Ignoring malformed grounding metadata");
                Vec::new()
            }
        },
    };

    debug!(
        chars = body.chars().count(),
        attestations = attestations.len(),
        "Parsed generation response"
    );

    Ok(GeneratedDocument::new(body, attestations))
}

fn attestations(metadata: &GroundingMetadata) -> Vec<Attestation> {
    metadata
        .grounding_supports
        .iter()
        .filter_map(|support| {
            let segment = support.segment.as_ref()?;
            let urls = chunk_urls(&support.grounding_chunk_indices, &metadata.grounding_chunks);
            if urls.is_empty() {
                return None;
            }

            let span = segment_span(segment);
            let match_text = segment.text.clone().filter(|t| !t.trim().is_empty());
            if span.is_none() && match_text.is_none() {
                return None;
            }

            Some(Attestation {
                span,
                match_text,
                source_urls: urls,
            })
        })
        .collect()
}

/// The API omits zero-valued fields, so a missing start with a present end
/// means the segment starts at 0.
fn segment_span(segment: &Segment) -> Option<Span> {
    let end = segment.end_index.as_ref()?.as_i64()?;
    let start = match &segment.start_index {
        None | Some(Value::Null) => 0,
        Some(value) => value.as_i64()?,
    };
    Some(Span::new(start, end))
}

fn chunk_urls(indices: &[Value], chunks: &[GroundingChunk]) -> Vec<String> {
    let mut urls: Vec<String> = Vec::new();
    for index in indices {
        let Some(chunk) = index
            .as_u64()
            .and_then(|i| usize::try_from(i).ok())
            .and_then(|i| chunks.get(i))
        else {
            continue;
        };
        let Some(uri) = chunk
            .web
            .as_ref()
            .and_then(|w| w.uri.as_deref())
            .map(str::trim)
            .filter(|u| !u.is_empty())
        else {
            continue;
        };
        if !urls.iter().any(|u| u == uri) {
            urls.push(uri.to_string());
        }
    }
    urls
}
