//! The turn loop.
//!
//! A [`ConversationController`] moves through three states:
//!
//! ```text
//! NotStarted --start()--> Active --"exit"/"quit", end of input, or error--> Ended
//!                          |  ^
//!                          +--+  one turn per question
//! ```
//!
//! Each turn runs strictly in sequence: tone evaluation, patient reply, log
//! append, then the advisory rephrasing notice. A failure in any of the
//! first three steps ends the session and nothing is logged for that turn.

use std::fmt;

use tracing::debug;

use crate::error::SimError;
use crate::events::{ConversationEvent, EventHandler, NoopHandler};
use crate::gateway::GenerationGateway;
use crate::input::InputSource;
use crate::profile::{DiseaseContext, ProfileSelector};
use crate::responder::PatientResponder;
use crate::tone::ToneEvaluator;
use crate::turn_log::{TurnLogger, TurnRecord};

/// Whether a line asks to end the conversation.
///
/// Matches `exit` or `quit`, case-insensitively, against the whole trimmed
/// line.
pub fn is_termination(line: &str) -> bool {
    let line = line.trim();
    line.eq_ignore_ascii_case("exit") || line.eq_ignore_ascii_case("quit")
}

/// Why a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndReason {
    /// The doctor typed a termination token.
    Terminated,
    /// The input source ran dry.
    InputClosed,
    /// A turn failed; the error was returned to the caller.
    Failed,
}

impl fmt::Display for EndReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EndReason::Terminated => write!(f, "doctor ended the conversation"),
            EndReason::InputClosed => write!(f, "input closed"),
            EndReason::Failed => write!(f, "turn failed"),
        }
    }
}

/// Summary of a finished session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionOutcome {
    pub disease: String,
    /// Completed (logged) turns.
    pub turns: u32,
    pub reason: EndReason,
}

/// The live session: the drawn patient and how many turns completed.
#[derive(Debug)]
pub struct ConversationSession {
    context: DiseaseContext,
    turns: u32,
}

impl ConversationSession {
    pub fn turns(&self) -> u32 {
        self.turns
    }
}

#[derive(Debug)]
pub enum SessionState {
    NotStarted,
    Active(ConversationSession),
    /// Terminal. Only the summary survives; the disease context is dropped.
    Ended(SessionOutcome),
}

/// Result of feeding one line to [`ConversationController::step`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    /// The turn completed and this record was logged.
    Completed(TurnRecord),
    /// Blank line; nothing was sent or logged.
    Skipped,
    /// The line was a termination token; the session is over.
    Ended,
}

/// Runs a simulated doctor–patient conversation.
pub struct ConversationController<'a> {
    tone: ToneEvaluator<'a>,
    responder: PatientResponder<'a>,
    selector: ProfileSelector,
    logger: TurnLogger,
    handler: &'a dyn EventHandler,
    state: SessionState,
}

impl<'a> ConversationController<'a> {
    pub fn new(
        gateway: &'a dyn GenerationGateway,
        selector: ProfileSelector,
        logger: TurnLogger,
    ) -> Self {
        Self {
            tone: ToneEvaluator::new(gateway),
            responder: PatientResponder::new(gateway),
            selector,
            logger,
            handler: &NoopHandler,
            state: SessionState::NotStarted,
        }
    }

    pub fn with_event_handler(mut self, handler: &'a dyn EventHandler) -> Self {
        self.handler = handler;
        self
    }

    /// Steering text added to every patient reply prompt.
    pub fn with_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.responder = self.responder.with_instructions(instructions);
        self
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn is_active(&self) -> bool {
        matches!(self.state, SessionState::Active(_))
    }

    /// The patient's condition while the session is active.
    pub fn context(&self) -> Option<&DiseaseContext> {
        match &self.state {
            SessionState::Active(session) => Some(&session.context),
            _ => None,
        }
    }

    pub fn logger(&self) -> &TurnLogger {
        &self.logger
    }

    /// Draw the patient profile and enter the active state.
    pub fn start(&mut self) -> Result<&DiseaseContext, SimError> {
        match self.state {
            SessionState::NotStarted => {}
            SessionState::Active(_) => {
                return Err(SimError::InvalidState("session already started".into()));
            }
            SessionState::Ended(_) => {
                return Err(SimError::InvalidState("session has ended".into()));
            }
        }

        let context = self.selector.select()?;
        self.handler.on_event(&ConversationEvent::SessionStarted {
            disease: &context.disease,
        });
        self.state = SessionState::Active(ConversationSession { context, turns: 0 });

        self.context()
            .ok_or_else(|| SimError::InvalidState("session failed to start".into()))
    }

    /// Handle one line of doctor input.
    pub async fn step(&mut self, line: &str) -> Result<TurnOutcome, SimError> {
        let SessionState::Active(session) = &self.state else {
            return Err(SimError::InvalidState("no active session".into()));
        };

        if is_termination(line) {
            self.finish(EndReason::Terminated);
            return Ok(TurnOutcome::Ended);
        }

        let question = line.trim();
        if question.is_empty() {
            debug!("Ignoring blank doctor input");
            return Ok(TurnOutcome::Skipped);
        }

        let turn = session.turns + 1;
        let result = self.play_turn(&session.context, question, turn).await;
        match result {
            Ok(record) => {
                if let SessionState::Active(session) = &mut self.state {
                    session.turns = turn;
                }
                Ok(TurnOutcome::Completed(record))
            }
            Err(e) => {
                self.finish(EndReason::Failed);
                Err(e)
            }
        }
    }

    /// Start (if needed) and loop over `input` until the session ends.
    ///
    /// Errors from a turn end the session and are returned as-is; turns
    /// logged before the failure stay in the log.
    pub async fn run(&mut self, input: &mut dyn InputSource) -> Result<SessionOutcome, SimError> {
        if matches!(self.state, SessionState::NotStarted) {
            self.start()?;
        }

        while self.is_active() {
            let line = match input.next_line().await {
                Ok(Some(line)) => line,
                Ok(None) => {
                    self.finish(EndReason::InputClosed);
                    break;
                }
                Err(e) => {
                    self.finish(EndReason::Failed);
                    return Err(SimError::Input(e));
                }
            };
            if self.step(&line).await? == TurnOutcome::Ended {
                break;
            }
        }

        match &self.state {
            SessionState::Ended(outcome) => Ok(outcome.clone()),
            _ => Err(SimError::InvalidState("session did not end".into())),
        }
    }

    async fn play_turn(
        &self,
        context: &DiseaseContext,
        question: &str,
        turn: u32,
    ) -> Result<TurnRecord, SimError> {
        let label = self.tone.evaluate(question).await?;
        self.handler
            .on_event(&ConversationEvent::ToneEvaluated { turn, label: &label });
        if !label.is_recognized() {
            self.handler.on_event(&ConversationEvent::UnrecognizedTone {
                turn,
                raw: label.as_str(),
            });
        }

        let response = self.responder.respond(context, question).await?;
        self.handler.on_event(&ConversationEvent::PatientReplied {
            turn,
            response: &response,
        });

        let record = TurnRecord {
            doctor_question: question.to_string(),
            tone_evaluation: label.to_string(),
            patient_response: response,
            disease: context.disease.clone(),
        };
        self.logger.log(&record)?;
        self.handler.on_event(&ConversationEvent::TurnLogged {
            turn,
            path: self.logger.path(),
        });

        if label.suggests_rephrasing() {
            self.handler
                .on_event(&ConversationEvent::RephraseSuggested { turn, label: &label });
        }

        Ok(record)
    }

    /// Move to `Ended`, dropping the disease context. No-op once ended.
    fn finish(&mut self, reason: EndReason) {
        let previous = std::mem::replace(&mut self.state, SessionState::NotStarted);
        let outcome = match previous {
            SessionState::Active(session) => {
                self.handler.on_event(&ConversationEvent::SessionEnded {
                    turns: session.turns,
                    reason,
                });
                SessionOutcome {
                    disease: session.context.disease,
                    turns: session.turns,
                    reason,
                }
            }
            SessionState::Ended(outcome) => outcome,
            SessionState::NotStarted => SessionOutcome {
                disease: String::new(),
                turns: 0,
                reason,
            },
        };
        self.state = SessionState::Ended(outcome);
    }
}
