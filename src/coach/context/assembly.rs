//! Request context assembly.

use serde::Serialize;

use crate::coach::context::profile_source::ProfileSource;
use crate::coach::conversation::store::ConversationStore;
use crate::coach::core::message::ChatMessage;
use crate::coach::core::profile::{NutritionGoals, UserProfile};
use crate::coach::core::topic::Topic;

/// Payload sent alongside every gateway request. Lives for one request.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ChatContext {
    /// Profile at the time of the request.
    pub user_profile: UserProfile,
    /// Snapshot of the topic's history, oldest first.
    pub conversation_history: Vec<ChatMessage>,
    /// Goals at the time of the request.
    pub current_goals: NutritionGoals,
}

/// Builds [`ChatContext`] values from the store and the settings collaborator.
#[derive(Clone, Copy, Debug)]
pub struct ContextAssembler {
    history_window: usize,
}

impl ContextAssembler {
    /// Create an assembler forwarding at most `history_window` messages (0 = all).
    #[must_use]
    pub const fn new(history_window: usize) -> Self {
        Self { history_window }
    }

    /// Snapshot the topic and merge the current profile and goals.
    #[must_use]
    pub fn assemble(
        &self,
        store: &ConversationStore,
        topic: &Topic,
        profiles: &dyn ProfileSource,
    ) -> ChatContext {
        ChatContext {
            user_profile: profiles.user_profile(),
            conversation_history: store.recent(topic, self.history_window),
            current_goals: profiles.nutrition_goals(),
        }
    }
}
