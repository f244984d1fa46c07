//! Per-topic request state, request kinds and quick actions.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::coach::core::nutrition::InputMethod;
use crate::coach::core::topic::ConversationMode;
use crate::coach::gateway::analysis_gateway::AnalysisInput;

/// Input a user submits to a topic.
pub type UserInput = AnalysisInput;

/// Caption used for images submitted without one.
pub const DEFAULT_IMAGE_CAPTION: &str = "Meal photo upload";

/// Whether a topic has a request in flight.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TopicState {
    /// Accepting submissions.
    #[default]
    Idle,
    /// A request is in flight; new submissions are rejected.
    Loading,
}

impl TopicState {
    /// Stable string form.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Loading => "loading",
        }
    }
}

/// Which gateway operation a submission resolves to.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RequestKind {
    /// Food analysis whose results are written to the ledger.
    FoodAnalysis {
        /// How the food was described.
        method: InputMethod,
    },
    /// Free-form coaching conversation.
    Coaching,
    /// Meal plan generation.
    MealPlanning,
}

impl RequestKind {
    /// Resolve the request kind of an input submitted to a topic.
    ///
    /// Images always ask for food analysis; text and voice follow the topic.
    #[must_use]
    pub const fn resolve(input: &UserInput, mode: ConversationMode) -> Self {
        let method = input.input_method();
        match (method, mode) {
            (InputMethod::Image, _) | (_, ConversationMode::FoodLogging) => {
                Self::FoodAnalysis { method }
            }
            (_, ConversationMode::Coaching) => Self::Coaching,
            (_, ConversationMode::MealPlanning) => Self::MealPlanning,
        }
    }

    /// Coach message appended when the request fails.
    #[must_use]
    pub const fn fallback_message(self) -> &'static str {
        match self {
            Self::FoodAnalysis {
                method: InputMethod::Image,
            } => {
                "Sorry, I couldn't read the nutritional information from that image. Please try again or provide more details."
            }
            Self::FoodAnalysis { .. } => "Sorry, I couldn't analyze that food. Please try again.",
            Self::Coaching => {
                "Sorry, I'm having trouble processing your request. Please try again."
            }
            Self::MealPlanning => "Sorry, I couldn't generate a meal plan. Please try again.",
        }
    }
}

/// Canned prompts offered as one-tap actions.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuickAction {
    /// Ask for help setting goals.
    SetGoals,
    /// Discuss symptoms.
    Symptoms,
    /// Ask for a meal plan.
    MealPlan,
    /// Ask for a progress review.
    Progress,
    /// Ask for motivation.
    Motivation,
}

impl QuickAction {
    /// Every quick action, in display order.
    pub const ALL: [Self; 5] = [
        Self::SetGoals,
        Self::Symptoms,
        Self::MealPlan,
        Self::Progress,
        Self::Motivation,
    ];

    /// Text submitted on the user's behalf.
    #[must_use]
    pub const fn prompt(self) -> &'static str {
        match self {
            Self::SetGoals => "Help me set my nutrition goals",
            Self::Symptoms => "I want to discuss some symptoms I'm experiencing",
            Self::MealPlan => "Can you create a meal plan for me?",
            Self::Progress => "Can you review my progress and give me feedback?",
            Self::Motivation => "I need some motivation to stay on track",
        }
    }

    /// Stable string form.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SetGoals => "set_goals",
            Self::Symptoms => "symptoms",
            Self::MealPlan => "meal_plan",
            Self::Progress => "progress",
            Self::Motivation => "motivation",
        }
    }
}

impl fmt::Display for QuickAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QuickAction {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|action| action.as_str() == value)
            .ok_or_else(|| value.to_string())
    }
}

/// Text shown as the user's message for an input, trimmed.
///
/// Returns `None` when there is nothing to submit.
#[must_use]
pub fn submitted_text(input: &UserInput) -> Option<String> {
    match input {
        AnalysisInput::Text(text) | AnalysisInput::Voice(text) => {
            let trimmed = text.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        AnalysisInput::Image { data, caption } => {
            if data.is_empty() {
                return None;
            }
            let trimmed = caption.trim();
            Some(if trimmed.is_empty() {
                DEFAULT_IMAGE_CAPTION.to_string()
            } else {
                trimmed.to_string()
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_kind_by_mode() {
        let text = UserInput::Text("oats".into());
        let image = UserInput::Image {
            data: vec![1, 2],
            caption: String::new(),
        };

        assert_eq!(
            RequestKind::resolve(&text, ConversationMode::FoodLogging),
            RequestKind::FoodAnalysis {
                method: InputMethod::Text
            }
        );
        assert_eq!(
            RequestKind::resolve(&text, ConversationMode::Coaching),
            RequestKind::Coaching
        );
        assert_eq!(
            RequestKind::resolve(&image, ConversationMode::MealPlanning),
            RequestKind::FoodAnalysis {
                method: InputMethod::Image
            }
        );
    }

    #[test]
    fn test_fallback_depends_on_method() {
        let voice = RequestKind::FoodAnalysis {
            method: InputMethod::Voice,
        };
        let image = RequestKind::FoodAnalysis {
            method: InputMethod::Image,
        };
        assert_eq!(
            voice.fallback_message(),
            "Sorry, I couldn't analyze that food. Please try again."
        );
        assert!(image.fallback_message().contains("from that image"));
    }

    #[test]
    fn test_quick_action_roundtrip() {
        for action in QuickAction::ALL {
            assert_eq!(action.as_str().parse::<QuickAction>(), Ok(action));
        }
        assert!("dance".parse::<QuickAction>().is_err());
        assert_eq!(QuickAction::MealPlan.prompt(), "Can you create a meal plan for me?");
    }

    #[test]
    fn test_submitted_text() {
        assert_eq!(submitted_text(&UserInput::Text("  \n ".into())), None);
        assert_eq!(
            submitted_text(&UserInput::Voice(" two eggs ".into())).as_deref(),
            Some("two eggs")
        );
        let no_data = UserInput::Image {
            data: Vec::new(),
            caption: "lunch".into(),
        };
        assert_eq!(submitted_text(&no_data), None);
        let no_caption = UserInput::Image {
            data: vec![7],
            caption: " ".into(),
        };
        assert_eq!(
            submitted_text(&no_caption).as_deref(),
            Some(DEFAULT_IMAGE_CAPTION)
        );
    }
}
