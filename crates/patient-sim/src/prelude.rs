//! Convenience re-exports for common `patient-sim` types.
//!
//! ```ignore
//! use patient_sim::prelude::*;
//! ```

// ── Core types ──────────────────────────────────────────────────────
pub use crate::{DEFAULT_LOG_PATH, DEFAULT_MODEL, OpenRouterClient};

// ── Errors ──────────────────────────────────────────────────────────
pub use crate::error::{GenerationError, SimError};

// ── Conversation ────────────────────────────────────────────────────
pub use crate::config::SimConfig;
pub use crate::controller::{
    ConversationController, EndReason, SessionOutcome, SessionState, TurnOutcome, is_termination,
};
pub use crate::events::{
    CompositeEventHandler, ConversationEvent, EventHandler, FnEventHandler, LoggingHandler,
    NoopHandler,
};
pub use crate::gateway::{FnGateway, GenerationGateway, OpenRouterGateway};
pub use crate::input::{InputSource, LineInput, ScriptedInput};
pub use crate::profile::{DiseaseContext, ProfileSelector, default_catalog, load_catalog};
pub use crate::responder::PatientResponder;
pub use crate::tone::{ToneEvaluator, ToneLabel};
pub use crate::turn_log::{TurnLogger, TurnRecord, read_log};
