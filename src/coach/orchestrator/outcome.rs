//! Results and events produced by the orchestrator.

use serde::Serialize;

use crate::coach::core::ids::MessageId;
use crate::coach::core::message::ChatMessage;
use crate::coach::core::nutrition::{FoodEntry, NutritionTotals};
use crate::coach::core::profile::NutritionGoals;
use crate::coach::core::topic::Topic;
use crate::coach::orchestrator::state::{RequestKind, TopicState};

/// Why a submission was ignored.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    /// Blank text or an image without data.
    EmptyInput,
    /// The topic already has a request in flight.
    Busy,
}

/// Result of one submission.
///
/// Failures are reported here, never as errors: the conversation already
/// carries the fallback message when this is `Failed`.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SubmitOutcome {
    /// Nothing happened.
    Rejected {
        /// Reason for the no-op.
        reason: RejectReason,
    },
    /// Food analysis succeeded and the entries were written.
    Logged {
        /// Entries handed to the ledger, in order.
        entries: Vec<FoodEntry>,
        /// Sum over `entries`.
        totals: NutritionTotals,
        /// Id of the summary message.
        message_id: MessageId,
    },
    /// A conversational reply was appended.
    Replied {
        /// Id of the reply message.
        message_id: MessageId,
        /// Goals proposed in the reply, if any. Never applied automatically.
        suggested_goals: Option<NutritionGoals>,
    },
    /// The request failed and the fallback message was appended.
    Failed {
        /// Kind of the failed request.
        request: RequestKind,
        /// Entries written before a ledger failure.
        written: usize,
        /// Id of the fallback message.
        message_id: MessageId,
    },
}

impl SubmitOutcome {
    /// Whether the submission was ignored.
    #[must_use]
    pub const fn is_rejected(&self) -> bool {
        matches!(self, Self::Rejected { .. })
    }
}

/// Change notifications for presentation layers.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OrchestratorEvent {
    /// A topic entered or left `Loading`.
    StateChanged {
        /// Topic concerned.
        topic: Topic,
        /// New state.
        state: TopicState,
    },
    /// A message was appended to a topic.
    MessageAppended {
        /// The appended message.
        message: ChatMessage,
    },
    /// An entry was written to the ledger.
    FoodLogged {
        /// Topic the request came from.
        topic: Topic,
        /// The written entry.
        entry: FoodEntry,
    },
}
