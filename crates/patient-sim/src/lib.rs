//! Simulated patient conversations for practising clinical interviews.
//!
//! `patient-sim` plays a patient whose condition is drawn at random from a
//! disease catalog. A human plays the doctor: every question is scored for
//! empathy and professionalism, answered in character, and appended to a
//! JSON Lines turn log. Text generation goes through the
//! [OpenRouter](https://openrouter.ai/) chat completions API.
//!
//! # Getting started
//!
//! ```ignore
//! use patient_sim::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), SimError> {
//!     let api_key = std::env::var("OPENROUTER_KEY").unwrap();
//!     let client = OpenRouterClient::new(api_key)?;
//!     let gateway = OpenRouterGateway::new(client, DEFAULT_MODEL);
//!
//!     let mut input = LineInput::terminal();
//!     let outcome = ConversationController::new(
//!         &gateway,
//!         ProfileSelector::new(default_catalog()),
//!         TurnLogger::new(DEFAULT_LOG_PATH),
//!     )
//!     .with_event_handler(&LoggingHandler)
//!     .run(&mut input)
//!     .await?;
//!
//!     println!("{} turn(s) with a {} patient", outcome.turns, outcome.disease);
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`profile`] | [`DiseaseContext`](profile::DiseaseContext), catalogs, [`ProfileSelector`](profile::ProfileSelector) |
//! | [`gateway`] | [`GenerationGateway`](gateway::GenerationGateway) trait, OpenRouter and closure-backed gateways |
//! | [`tone`] | [`ToneLabel`](tone::ToneLabel) decoding and [`ToneEvaluator`](tone::ToneEvaluator) |
//! | [`responder`] | Patient prompt construction and [`PatientResponder`](responder::PatientResponder) |
//! | [`turn_log`] | [`TurnRecord`](turn_log::TurnRecord) and the append-only [`TurnLogger`](turn_log::TurnLogger) |
//! | [`input`] | Doctor input sources (terminal, scripted, any line stream) |
//! | [`events`] | [`ConversationEvent`](events::ConversationEvent) and handlers |
//! | [`controller`] | The turn loop state machine |
//! | [`config`] | [`SimConfig`](config::SimConfig) defaults |

pub mod config;
pub mod controller;
pub mod error;
pub mod events;
pub mod gateway;
pub mod input;
pub mod prelude;
pub mod profile;
pub mod responder;
pub mod tone;
pub mod turn_log;

use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, trace};

use crate::error::GenerationError;

// ── Constants ──────────────────────────────────────────────────────

pub const OPENROUTER_URL: &str = "https://openrouter.ai/api/v1/chat/completions";

/// Default model for generation calls.
pub const DEFAULT_MODEL: &str = "anthropic/claude-sonnet-4";

/// Default turn log path, relative to the working directory.
pub const DEFAULT_LOG_PATH: &str = "conversation_log.json";

/// Client-level timeout so a stalled service cannot hang a session forever.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

// ── Request types ──────────────────────────────────────────────────

/// Chat completion request body. Unused optional fields are omitted from
/// serialization.
#[derive(Serialize, Debug, Default)]
pub struct ChatRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    pub messages: Vec<Message>,

    #[serde(skip_serializing_if = "is_zero_u32")]
    pub max_tokens: u32,
    #[serde(skip_serializing_if = "is_zero_f32")]
    pub temperature: f32,
}

fn is_zero_u32(v: &u32) -> bool {
    *v == 0
}
fn is_zero_f32(v: &f32) -> bool {
    *v == 0.0
}

// ── Message types ──────────────────────────────────────────────────

/// Role of a message in the request. Every prompt is sent as a single user
/// turn.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
}

impl std::fmt::Display for MessageRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MessageRole::User => write!(f, "user"),
        }
    }
}

/// A message in the request.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Message {
    pub role: MessageRole,
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }
}

// ── Response types ─────────────────────────────────────────────────

/// Raw API response (internal deserialization target).
#[derive(Deserialize, Debug)]
struct RawChatResponse {
    choices: Option<Vec<RawChoice>>,
    error: Option<ApiErrorResponse>,
    #[serde(default)]
    usage: Option<UsageInfo>,
}

#[derive(Deserialize, Debug)]
struct RawChoice {
    message: RawResponseMessage,
    finish_reason: Option<String>,
}

#[derive(Deserialize, Debug)]
struct RawResponseMessage {
    content: Option<String>,
}

#[derive(Deserialize, Debug)]
struct ApiErrorResponse {
    message: String,
}

/// Clean return type from [`OpenRouterClient::chat`].
#[derive(Debug)]
pub struct ChatCompletion {
    /// Text of every returned choice, in service order.
    pub candidates: Vec<String>,
    pub usage: Option<UsageInfo>,
    pub finish_reason: Option<String>,
}

impl ChatCompletion {
    /// The first candidate, trimmed. Blank text counts as no candidate.
    pub fn first_text(&self) -> Option<&str> {
        self.candidates
            .first()
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
    }
}

/// Token usage statistics.
#[derive(Deserialize, Debug, Clone)]
pub struct UsageInfo {
    pub prompt_tokens: Option<u32>,
    pub completion_tokens: Option<u32>,
    pub total_tokens: Option<u32>,
}

/// Decode a chat completion response body.
///
/// Non-success statuses are classified by [`GenerationError::from_status`];
/// a 200 carrying an `error` object is [`GenerationError::Api`].
pub fn parse_chat_response(status: u16, text: &str) -> Result<ChatCompletion, GenerationError> {
    if !(200..300).contains(&status) {
        return Err(GenerationError::from_status(status, text));
    }

    let parsed: RawChatResponse =
        serde_json::from_str(text).map_err(|e| GenerationError::Malformed(e.to_string()))?;

    if let Some(err) = parsed.error {
        return Err(GenerationError::Api(err.message));
    }

    if let Some(ref usage) = parsed.usage {
        debug!(
            "Token usage: prompt={}, completion={}, total={}",
            usage.prompt_tokens.unwrap_or(0),
            usage.completion_tokens.unwrap_or(0),
            usage.total_tokens.unwrap_or(0),
        );
    }

    let choices = parsed.choices.unwrap_or_default();
    let finish_reason = choices.first().and_then(|c| c.finish_reason.clone());
    // A null content keeps its slot so the first choice stays first.
    let candidates: Vec<String> = choices
        .into_iter()
        .map(|c| c.message.content.unwrap_or_default())
        .collect();

    match candidates.first() {
        Some(text) => debug!(
            "LLM output: {} candidate(s), first is {} chars",
            candidates.len(),
            text.len()
        ),
        None => debug!("LLM output: empty (no choices)"),
    }

    Ok(ChatCompletion {
        candidates,
        usage: parsed.usage,
        finish_reason,
    })
}

// ── Client ─────────────────────────────────────────────────────────

/// Async HTTP client for the OpenRouter chat completions API.
pub struct OpenRouterClient {
    pub(crate) client: reqwest::Client,
    pub(crate) api_key: String,
    pub(crate) referer: String,
    pub(crate) title: String,
}

impl OpenRouterClient {
    /// Create a new client with the given API key and default headers.
    pub fn new(api_key: impl Into<String>) -> Result<Self, GenerationError> {
        Self::with_headers(api_key, "https://github.com/patient-sim", "patient-sim")
    }

    /// Create a new client with custom Referer and X-Title headers.
    pub fn with_headers(
        api_key: impl Into<String>,
        referer: impl Into<String>,
        title: impl Into<String>,
    ) -> Result<Self, GenerationError> {
        let client = reqwest::Client::builder()
            .user_agent("patient-sim/0.1")
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| GenerationError::Transport(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            api_key: api_key.into(),
            referer: referer.into(),
            title: title.into(),
        })
    }

    /// Send a chat completion request.
    pub async fn chat(&self, body: &ChatRequest) -> Result<ChatCompletion, GenerationError> {
        debug!(
            "LLM request: model={}, messages={}, max_tokens={}, temp={}",
            body.model.as_deref().unwrap_or("(none)"),
            body.messages.len(),
            body.max_tokens,
            body.temperature,
        );
        trace!(
            "Request payload size: {} bytes",
            serde_json::to_string(body).map_or(0, |s| s.len())
        );

        let start = Instant::now();

        let resp = self
            .client
            .post(OPENROUTER_URL)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("HTTP-Referer", &self.referer)
            .header("X-Title", &self.title)
            .json(body)
            .send()
            .await
            .map_err(|e| GenerationError::Transport(e.to_string()))?;

        let status = resp.status();
        let text = resp
            .text()
            .await
            .map_err(|e| GenerationError::Transport(format!("failed to read response: {e}")))?;

        debug!(
            "LLM response: HTTP {} in {:.1}s ({} bytes)",
            status,
            start.elapsed().as_secs_f64(),
            text.len()
        );

        parse_chat_response(status.as_u16(), &text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_message_constructor() {
        let user = Message::user("world");
        assert_eq!(user.role, MessageRole::User);
        assert_eq!(user.role.to_string(), "user");
        assert_eq!(user.content, "world");
    }

    #[test]
    fn chat_request_serializes_only_set_fields() {
        let req = ChatRequest {
            model: Some("test-model".into()),
            messages: vec![Message::user("hi")],
            max_tokens: 100,
            temperature: 0.5,
            ..Default::default()
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["model"], "test-model");
        assert_eq!(json["max_tokens"], 100);
        assert_eq!(json.as_object().unwrap().len(), 4);

        let bare = serde_json::to_value(ChatRequest {
            messages: vec![Message::user("hi")],
            ..Default::default()
        })
        .unwrap();
        assert_eq!(bare.as_object().unwrap().len(), 1);
        assert_eq!(json["messages"][0]["role"], "user");
        assert_eq!(json["messages"][0]["content"], "hi");
    }

    #[test]
    fn parse_success_takes_all_candidates() {
        let body = r#"{
            "choices": [
                {"message": {"content": "  I have a headache \n"}, "finish_reason": "stop"},
                {"message": {"content": "second"}, "finish_reason": "stop"}
            ],
            "usage": {"prompt_tokens": 12, "completion_tokens": 5, "total_tokens": 17}
        }"#;
        let completion = parse_chat_response(200, body).unwrap();
        assert_eq!(completion.candidates.len(), 2);
        assert_eq!(completion.first_text(), Some("I have a headache"));
        assert_eq!(completion.finish_reason.as_deref(), Some("stop"));
        assert_eq!(completion.usage.unwrap().total_tokens, Some(17));
    }

    #[test]
    fn parse_zero_choices_has_no_text() {
        let completion = parse_chat_response(200, r#"{"choices": []}"#).unwrap();
        assert!(completion.first_text().is_none());

        let blank = parse_chat_response(200, r#"{"choices": [{"message": {"content": "   "}}]}"#)
            .unwrap();
        assert!(blank.first_text().is_none());
    }

    #[test]
    fn parse_null_first_choice_is_not_skipped() {
        let body = r#"{"choices": [
            {"message": {"content": null}},
            {"message": {"content": "second"}}
        ]}"#;
        let completion = parse_chat_response(200, body).unwrap();
        assert_eq!(completion.candidates.len(), 2);
        assert!(completion.first_text().is_none());
    }

    #[test]
    fn parse_error_payload() {
        let err = parse_chat_response(200, r#"{"error": {"message": "model not found"}}"#)
            .unwrap_err();
        assert!(matches!(err, GenerationError::Api(ref m) if m == "model not found"));
    }

    #[test]
    fn parse_http_failures() {
        assert!(matches!(
            parse_chat_response(401, "no auth"),
            Err(GenerationError::Unauthorized { .. })
        ));
        assert!(matches!(
            parse_chat_response(429, "rate limited"),
            Err(GenerationError::RateLimited(_))
        ));
        assert!(matches!(
            parse_chat_response(500, "oops"),
            Err(GenerationError::Http { status: 500, .. })
        ));
    }

    #[test]
    fn parse_malformed_body() {
        assert!(matches!(
            parse_chat_response(200, "<html>"),
            Err(GenerationError::Malformed(_))
        ));
    }
}
