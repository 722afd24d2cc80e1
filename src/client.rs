//! Captioning client: one JSON-over-HTTP POST per image.
//!
//! The endpoint is an OpenAI-compatible `chat/completions` route served by a
//! local inference host (LM Studio and friends). This module is intentionally
//! thin — prompt text lives in [`crate::prompts`], caption cleanup in
//! [`crate::pipeline::postprocess`] — so the client is nothing but transport:
//! build the request body, send it once, classify what came back.
//!
//! There is deliberately no retry and no backoff. A failed image is recorded
//! in the caption store and becomes the worklist for the next run, which is
//! the resume mechanism the whole tool is built around.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{CaptionFailure, Img2AltError};
use crate::pipeline::encode::EncodedImage;

/// Everything needed to caption one image. Built fresh per image, never
/// persisted.
#[derive(Debug, Clone)]
pub struct CaptionRequest {
    pub image: EncodedImage,
    /// Prompt with the location placeholder already rendered.
    pub prompt: String,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

/// The seam between the orchestrator and the inference endpoint.
///
/// Production code uses [`HttpCaptioner`]; tests inject a scripted
/// implementation through [`crate::config::CaptionConfig::captioner`] to
/// exercise store and resume semantics without a live model.
#[async_trait]
pub trait Captioner: Send + Sync {
    /// Produce the raw caption text for one image.
    ///
    /// Exactly one attempt. Errors are per-image and non-fatal.
    async fn caption(&self, request: &CaptionRequest) -> Result<String, CaptionFailure>;
}

/// [`Captioner`] speaking to an OpenAI-compatible vision endpoint.
pub struct HttpCaptioner {
    client: Client,
    endpoint: String,
    timeout_secs: u64,
}

impl HttpCaptioner {
    /// Build a client for `endpoint` with a per-request timeout.
    pub fn new(endpoint: impl Into<String>, timeout_secs: u64) -> Result<Self, Img2AltError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| Img2AltError::Internal(format!("building HTTP client: {e}")))?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            timeout_secs,
        })
    }

    fn transport_failure(&self, e: reqwest::Error) -> CaptionFailure {
        if e.is_timeout() {
            CaptionFailure::transport(format!("request timed out after {}s", self.timeout_secs))
        } else if e.is_connect() {
            CaptionFailure::transport(format!("cannot reach '{}': {e}", self.endpoint))
        } else {
            CaptionFailure::transport(e.to_string())
        }
    }
}

#[async_trait]
impl Captioner for HttpCaptioner {
    async fn caption(&self, request: &CaptionRequest) -> Result<String, CaptionFailure> {
        let body = ChatRequest {
            model: &request.model,
            messages: vec![Message {
                role: "user",
                content: vec![
                    ContentPart::Text {
                        text: &request.prompt,
                    },
                    ContentPart::ImageUrl {
                        image_url: ImageUrl {
                            url: &request.image.data_url,
                        },
                    },
                ],
            }],
            max_tokens: request.max_tokens,
            temperature: request.temperature,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.transport_failure(e))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(CaptionFailure::api(format!(
                "HTTP {status}: {}",
                snippet(&text)
            )));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| CaptionFailure::api(format!("malformed response body: {e}")))?;
        let choice = parsed
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| CaptionFailure::api("response contained no choices"))?;

        let content = choice.message.content.trim().to_string();
        if content.is_empty() {
            return Err(CaptionFailure::api("model returned an empty caption"));
        }

        debug!(
            "Model {} returned {} chars",
            request.model,
            content.chars().count()
        );
        Ok(content)
    }
}

/// First 200 characters of an error body, newlines flattened.
fn snippet(text: &str) -> String {
    text.chars()
        .take(200)
        .map(|c| if c == '\n' { ' ' } else { c })
        .collect::<String>()
        .trim()
        .to_string()
}

// ── Wire format ──────────────────────────────────────────────────────────────
//
// Typed mirrors of the chat-completions request/response, limited to the
// fields this crate sends and reads. Unknown response fields are ignored.

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<Message<'a>>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'static str,
    content: Vec<ContentPart<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type")]
enum ContentPart<'a> {
    #[serde(rename = "text")]
    Text { text: &'a str },
    #[serde(rename = "image_url")]
    ImageUrl { image_url: ImageUrl<'a> },
}

#[derive(Debug, Serialize)]
struct ImageUrl<'a> {
    url: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: AssistantMessage,
}

#[derive(Debug, Deserialize)]
struct AssistantMessage {
    content: String,
}
