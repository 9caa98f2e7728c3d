//! Tone scoring for doctor questions.
//!
//! The service is asked to classify a question as `acceptable`, `ok` or
//! `not acceptable`. Its free-text answer is decoded by [`ToneLabel::decode`]:
//!
//! 1. trim surrounding whitespace,
//! 2. strip matching surrounding quotes and a trailing period inside or
//!    outside them,
//! 3. compare case-insensitively against the three labels.
//!
//! Anything else is [`ToneLabel::Unrecognized`] carrying the trimmed text.

use std::fmt;

use crate::error::GenerationError;
use crate::gateway::GenerationGateway;

/// Prefix of every tone-scoring prompt.
pub const TONE_PROMPT_PREFIX: &str = "Rate the tone of this question on empathy and professionalism, classify as acceptable, ok, or not acceptable.";

/// Classification of a doctor question's empathy and professionalism.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ToneLabel {
    Acceptable,
    Ok,
    NotAcceptable,
    /// Service output that matched none of the labels, trimmed.
    Unrecognized(String),
}

impl ToneLabel {
    pub fn decode(text: &str) -> Self {
        let trimmed = text.trim();
        let unquoted = strip_quotes(strip_period(trimmed));
        let normalized = strip_period(unquoted);

        if normalized.eq_ignore_ascii_case("acceptable") {
            ToneLabel::Acceptable
        } else if normalized.eq_ignore_ascii_case("ok") {
            ToneLabel::Ok
        } else if normalized.eq_ignore_ascii_case("not acceptable") {
            ToneLabel::NotAcceptable
        } else {
            ToneLabel::Unrecognized(trimmed.to_string())
        }
    }

    /// Canonical label text, or the raw text for unrecognized output.
    pub fn as_str(&self) -> &str {
        match self {
            ToneLabel::Acceptable => "acceptable",
            ToneLabel::Ok => "ok",
            ToneLabel::NotAcceptable => "not acceptable",
            ToneLabel::Unrecognized(raw) => raw,
        }
    }

    /// Whether the doctor should be nudged to rephrase.
    pub fn suggests_rephrasing(&self) -> bool {
        matches!(self, ToneLabel::Ok | ToneLabel::NotAcceptable)
    }

    pub fn is_recognized(&self) -> bool {
        !matches!(self, ToneLabel::Unrecognized(_))
    }
}

impl fmt::Display for ToneLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn strip_period(s: &str) -> &str {
    s.strip_suffix('.').unwrap_or(s).trim()
}

fn strip_quotes(s: &str) -> &str {
    for q in ['"', '\'', '`'] {
        if let Some(inner) = s.strip_prefix(q).and_then(|rest| rest.strip_suffix(q)) {
            return inner.trim();
        }
    }
    s
}

/// Build the tone-scoring prompt for a question.
pub fn build_tone_prompt(question: &str) -> String {
    format!("{TONE_PROMPT_PREFIX} Reply with the label only.\nQuestion: {question}")
}

/// Scores doctor questions through a [`GenerationGateway`].
pub struct ToneEvaluator<'a> {
    gateway: &'a dyn GenerationGateway,
}

impl<'a> ToneEvaluator<'a> {
    pub fn new(gateway: &'a dyn GenerationGateway) -> Self {
        Self { gateway }
    }

    /// One gateway call, no retry.
    pub async fn evaluate(&self, question: &str) -> Result<ToneLabel, GenerationError> {
        let prompt = build_tone_prompt(question);
        let text = self.gateway.generate(&prompt).await?;
        Ok(ToneLabel::decode(&text))
    }
}
