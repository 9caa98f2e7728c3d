//! Events emitted by the [`ConversationController`](crate::controller::ConversationController).
//!
//! The controller itself never prints. Callers implement [`EventHandler`] to
//! render the conversation, collect metrics, or drive a UI.
//!
//! # Choosing an event handler
//!
//! | Handler | Use case |
//! |---------|----------|
//! | [`NoopHandler`] | Tests or headless runs |
//! | [`LoggingHandler`] | Structured logging via `tracing` |
//! | [`FnEventHandler`] | Quick closures for simple callbacks |
//! | [`CompositeEventHandler`] | Compose multiple handlers in order |

use std::path::Path;

use tracing::{debug, info, warn};

use crate::controller::EndReason;
use crate::tone::ToneLabel;

/// Events emitted during a session, in the order they happen within a turn.
#[derive(Debug)]
pub enum ConversationEvent<'a> {
    /// A patient profile was drawn and the session is active.
    SessionStarted { disease: &'a str },
    /// The current question was scored.
    ToneEvaluated { turn: u32, label: &'a ToneLabel },
    /// The service returned a tone label outside the known set.
    UnrecognizedTone { turn: u32, raw: &'a str },
    /// The patient answered the current question.
    PatientReplied { turn: u32, response: &'a str },
    /// The turn record is durable in the log.
    TurnLogged { turn: u32, path: &'a Path },
    /// The question's tone was `ok` or `not acceptable`. Advisory only.
    RephraseSuggested { turn: u32, label: &'a ToneLabel },
    /// The session is over.
    SessionEnded { turns: u32, reason: EndReason },
}

/// Handler for conversation events.
///
/// # Example
///
/// ```ignore
/// struct Printer;
///
/// impl EventHandler for Printer {
///     fn on_event(&self, event: &ConversationEvent<'_>) {
///         if let ConversationEvent::PatientReplied { response, .. } = event {
///             println!("Patient: {response}");
///         }
///     }
/// }
/// ```
pub trait EventHandler: Send + Sync {
    fn on_event(&self, event: &ConversationEvent<'_>) {
        let _ = event;
    }
}

/// A handler that ignores every event.
pub struct NoopHandler;
impl EventHandler for NoopHandler {}

/// An event handler backed by a closure.
pub struct FnEventHandler<F>(F)
where
    F: Fn(&ConversationEvent<'_>) + Send + Sync;

impl<F> FnEventHandler<F>
where
    F: Fn(&ConversationEvent<'_>) + Send + Sync,
{
    pub fn new(f: F) -> Self {
        Self(f)
    }
}

impl<F> EventHandler for FnEventHandler<F>
where
    F: Fn(&ConversationEvent<'_>) + Send + Sync,
{
    fn on_event(&self, event: &ConversationEvent<'_>) {
        (self.0)(event)
    }
}

/// Dispatches every event to each inner handler in registration order.
///
/// ```ignore
/// let handler = CompositeEventHandler::new()
///     .with(LoggingHandler)
///     .with(ConsoleHandler);
/// ```
pub struct CompositeEventHandler {
    handlers: Vec<Box<dyn EventHandler>>,
}

impl CompositeEventHandler {
    pub fn new() -> Self {
        Self {
            handlers: Vec::new(),
        }
    }

    pub fn with(mut self, handler: impl EventHandler + 'static) -> Self {
        self.handlers.push(Box::new(handler));
        self
    }

    /// Conditionally add a handler, keeping the builder chain intact.
    pub fn with_if(self, condition: bool, handler: impl EventHandler + 'static) -> Self {
        if condition { self.with(handler) } else { self }
    }
}

impl Default for CompositeEventHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl EventHandler for CompositeEventHandler {
    fn on_event(&self, event: &ConversationEvent<'_>) {
        for handler in &self.handlers {
            handler.on_event(event);
        }
    }
}

/// Logs every event through `tracing`.
pub struct LoggingHandler;

impl EventHandler for LoggingHandler {
    fn on_event(&self, event: &ConversationEvent<'_>) {
        match event {
            ConversationEvent::SessionStarted { disease } => {
                info!("Session started with disease context: {disease}");
            }
            ConversationEvent::ToneEvaluated { turn, label } => {
                debug!("[turn {turn}] tone: {label}");
            }
            ConversationEvent::UnrecognizedTone { turn, raw } => {
                let preview: String = raw.chars().take(200).collect();
                warn!(
                    "[turn {turn}] tone label not recognized: {preview}{}",
                    if raw.len() > 200 { "..." } else { "" }
                );
            }
            ConversationEvent::PatientReplied { turn, response } => {
                debug!("[turn {turn}] patient reply: {} chars", response.len());
            }
            ConversationEvent::TurnLogged { turn, path } => {
                debug!("[turn {turn}] logged to {}", path.display());
            }
            ConversationEvent::RephraseSuggested { turn, label } => {
                info!("[turn {turn}] rephrasing suggested (tone: {label})");
            }
            ConversationEvent::SessionEnded { turns, reason } => {
                info!("Session ended after {turns} turn(s): {reason}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    fn recorder(tag: &'static str, seen: Arc<Mutex<Vec<String>>>) -> impl EventHandler {
        FnEventHandler::new(move |event: &ConversationEvent<'_>| {
            if let ConversationEvent::SessionStarted { disease } = event {
                seen.lock().unwrap().push(format!("{tag}:{disease}"));
            }
        })
    }

    #[test]
    fn composite_dispatches_to_all_in_order() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let handler = CompositeEventHandler::new()
            .with(recorder("a", seen.clone()))
            .with(NoopHandler)
            .with(recorder("b", seen.clone()));

        handler.on_event(&ConversationEvent::SessionStarted { disease: "Migraine" });

        assert_eq!(*seen.lock().unwrap(), vec!["a:Migraine", "b:Migraine"]);
    }

    #[test]
    fn with_if_skips_when_false() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let handler = CompositeEventHandler::default()
            .with_if(false, recorder("skipped", seen.clone()))
            .with_if(true, recorder("kept", seen.clone()));

        handler.on_event(&ConversationEvent::SessionStarted { disease: "Asthma" });

        assert_eq!(*seen.lock().unwrap(), vec!["kept:Asthma"]);
    }

    #[test]
    fn logging_handler_accepts_every_event() {
        let label = ToneLabel::Ok;
        let path = Path::new("conversation_log.json");
        let events = [
            ConversationEvent::SessionStarted { disease: "Migraine" },
            ConversationEvent::ToneEvaluated { turn: 1, label: &label },
            ConversationEvent::UnrecognizedTone { turn: 1, raw: "fine" },
            ConversationEvent::PatientReplied { turn: 1, response: "ouch" },
            ConversationEvent::TurnLogged { turn: 1, path },
            ConversationEvent::RephraseSuggested { turn: 1, label: &label },
            ConversationEvent::SessionEnded {
                turns: 1,
                reason: EndReason::Terminated,
            },
        ];
        for event in &events {
            LoggingHandler.on_event(event);
        }
    }
}
