//! Request orchestration: single-flight submissions per topic.

pub mod core;
pub mod outcome;
pub mod state;

pub use self::core::{CoachBackends, Orchestrator};
pub use outcome::{OrchestratorEvent, RejectReason, SubmitOutcome};
pub use state::{DEFAULT_IMAGE_CAPTION, QuickAction, RequestKind, TopicState, UserInput};
