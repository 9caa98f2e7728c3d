//! The single integration point with the text-generation service.
//!
//! Everything that needs generated text goes through a [`GenerationGateway`].
//! [`OpenRouterGateway`] talks to the real service; [`FnGateway`] wraps a
//! closure for tests and offline runs.

use std::future::Future;
use std::pin::Pin;

use tracing::debug;

use crate::error::GenerationError;
use crate::{ChatCompletion, ChatRequest, Message, OpenRouterClient};

/// Boxed future returned by [`GenerationGateway::generate`].
pub type GenerationFuture<'a> =
    Pin<Box<dyn Future<Output = Result<String, GenerationError>> + Send + 'a>>;

/// Prompt in, trimmed completion text out.
///
/// Implementations return the first candidate with surrounding whitespace
/// removed, and never report an empty string as success: a response without
/// usable text is [`GenerationError::EmptyResponse`]. No retries happen at
/// this layer.
///
/// Uses a boxed future so that the trait is dyn-compatible.
pub trait GenerationGateway: Send + Sync {
    fn generate<'a>(&'a self, prompt: &'a str) -> GenerationFuture<'a>;
}

// ── OpenRouter ─────────────────────────────────────────────────────

/// Gateway backed by [`OpenRouterClient`]. The prompt is sent as a single
/// user message.
pub struct OpenRouterGateway {
    client: OpenRouterClient,
    model: String,
    max_tokens: u32,
    temperature: f32,
}

impl OpenRouterGateway {
    pub fn new(client: OpenRouterClient, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
            max_tokens: 512,
            temperature: 0.7,
        }
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    fn request_for(&self, prompt: &str) -> ChatRequest {
        ChatRequest {
            model: Some(self.model.clone()),
            messages: vec![Message::user(prompt)],
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            ..Default::default()
        }
    }
}

impl GenerationGateway for OpenRouterGateway {
    fn generate<'a>(&'a self, prompt: &'a str) -> GenerationFuture<'a> {
        Box::pin(async move {
            let body = self.request_for(prompt);
            let completion = self.client.chat(&body).await?;
            completion_text(&completion)
        })
    }
}

/// The first candidate's trimmed text, or [`GenerationError::EmptyResponse`].
fn completion_text(completion: &ChatCompletion) -> Result<String, GenerationError> {
    completion
        .first_text()
        .map(str::to_string)
        .ok_or(GenerationError::EmptyResponse)
}

// ── Closure-backed ─────────────────────────────────────────────────

/// A gateway backed by a closure.
///
/// The closure's output goes through the same trimming and empty-text rule
/// as a real service response.
///
/// # Example
///
/// ```
/// use patient_sim::gateway::{FnGateway, GenerationGateway};
///
/// let gateway = FnGateway::new(|prompt: &str| {
///     if prompt.starts_with("Rate the tone") {
///         Ok("acceptable".to_string())
///     } else {
///         Ok(" I have a headache \n".to_string())
///     }
/// });
///
/// let rt = tokio::runtime::Runtime::new().unwrap();
/// let reply = rt
///     .block_on(gateway.generate("Patient has been diagnosed with Migraine."))
///     .unwrap();
/// assert_eq!(reply, "I have a headache");
/// ```
pub struct FnGateway<F>(F)
where
    F: Fn(&str) -> Result<String, GenerationError> + Send + Sync;

impl<F> FnGateway<F>
where
    F: Fn(&str) -> Result<String, GenerationError> + Send + Sync,
{
    pub fn new(f: F) -> Self {
        Self(f)
    }
}

impl<F> GenerationGateway for FnGateway<F>
where
    F: Fn(&str) -> Result<String, GenerationError> + Send + Sync,
{
    fn generate<'a>(&'a self, prompt: &'a str) -> GenerationFuture<'a> {
        let result = (self.0)(prompt).and_then(|text| {
            let trimmed = text.trim();
            if trimmed.is_empty() {
                Err(GenerationError::EmptyResponse)
            } else {
                Ok(trimmed.to_string())
            }
        });
        debug!(
            "FnGateway: {} char prompt -> {}",
            prompt.len(),
            if result.is_ok() { "ok" } else { "error" }
        );
        Box::pin(async move { result })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DEFAULT_MODEL;
    use std::sync::{Arc, Mutex};

    #[test]
    fn request_carries_model_and_single_user_message() {
        let client = OpenRouterClient::new("test-key").unwrap();
        let gateway = OpenRouterGateway::new(client, DEFAULT_MODEL)
            .with_max_tokens(64)
            .with_temperature(0.2);
        let req = gateway.request_for("How are you feeling?");
        assert_eq!(req.model.as_deref(), Some(DEFAULT_MODEL));
        assert_eq!(req.messages.len(), 1);
        assert_eq!(req.messages[0].content, "How are you feeling?");
        assert_eq!(req.max_tokens, 64);
        assert!((req.temperature - 0.2).abs() < f32::EPSILON);
    }

    #[test]
    fn completion_text_takes_first_candidate() {
        let body = r#"{"choices": [
            {"message": {"content": " It aches. \n"}},
            {"message": {"content": "ignored"}}
        ]}"#;
        let completion = crate::parse_chat_response(200, body).unwrap();
        assert_eq!(completion_text(&completion).unwrap(), "It aches.");
    }

    #[test]
    fn completion_without_text_is_empty_response() {
        for body in [
            r#"{"choices": []}"#,
            r#"{}"#,
            r#"{"choices": [{"message": {"content": "  "}}]}"#,
            r#"{"choices": [{"message": {"content": null}}, {"message": {"content": "late"}}]}"#,
        ] {
            let completion = crate::parse_chat_response(200, body).unwrap();
            assert!(
                matches!(completion_text(&completion), Err(GenerationError::EmptyResponse)),
                "{body}"
            );
        }
    }

    #[tokio::test]
    async fn fn_gateway_trims_output() {
        let gateway = FnGateway::new(|_| Ok("  ok \n".to_string()));
        assert_eq!(gateway.generate("anything").await.unwrap(), "ok");
    }

    #[tokio::test]
    async fn fn_gateway_blank_output_is_empty_response() {
        let gateway = FnGateway::new(|_| Ok("   ".to_string()));
        assert!(matches!(
            gateway.generate("anything").await,
            Err(GenerationError::EmptyResponse)
        ));
    }

    #[tokio::test]
    async fn fn_gateway_passes_errors_and_sees_prompt() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let s = seen.clone();
        let gateway = FnGateway::new(move |prompt: &str| {
            s.lock().unwrap().push(prompt.to_string());
            Err(GenerationError::RateLimited("slow down".into()))
        });
        let result = gateway.generate("hello").await;
        assert!(matches!(result, Err(GenerationError::RateLimited(_))));
        assert_eq!(*seen.lock().unwrap(), vec!["hello".to_string()]);
    }
}
