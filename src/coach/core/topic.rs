//! Conversation topics.
//!
//! A topic is the isolation boundary for a conversation: it selects the
//! message sequence and the single-flight slot a submission uses. The set of
//! topics is open, but every identifier is validated when it is built.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

/// Errors returned when parsing/validating a [`Topic`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TopicError {
    /// Empty (or whitespace-only) identifier.
    #[error("topic must not be empty")]
    Empty,
    /// Exceeds the maximum accepted length.
    #[error("topic too long: got {got}, max {max}")]
    TooLong {
        /// Maximum allowed length.
        max: usize,
        /// Actual length received.
        got: usize,
    },
    /// Contains a disallowed character.
    #[error("topic contains invalid character {ch:?} at index {index}")]
    InvalidChar {
        /// The invalid character.
        ch: char,
        /// The index where it was found.
        index: usize,
    },
}

/// Identifier of a conversation topic (e.g. `food-logging`, `coaching`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Topic(String);

impl Topic {
    /// Hard ceiling for topic identifiers.
    pub const MAX_LEN: usize = 64;

    /// Topic of the food logging screen.
    pub const FOOD_LOGGING: &'static str = "food-logging";
    /// Topic of the AI coach screen.
    pub const COACHING: &'static str = "coaching";
    /// Topic of the meal planner screen.
    pub const MEAL_PLANNING: &'static str = "meal-planning";

    /// Build a validated `Topic`.
    ///
    /// Rules:
    /// - Non-empty after trimming.
    /// - At most [`Topic::MAX_LEN`] characters.
    /// - Lowercase ASCII letters, digits, `-` and `_` only.
    ///
    /// # Errors
    /// Returns `TopicError` if the input is empty, too long, or contains invalid characters.
    pub fn new(raw: impl AsRef<str>) -> Result<Self, TopicError> {
        let s = raw.as_ref().trim();

        if s.is_empty() {
            return Err(TopicError::Empty);
        }
        if s.len() > Self::MAX_LEN {
            return Err(TopicError::TooLong {
                max: Self::MAX_LEN,
                got: s.len(),
            });
        }

        for (index, ch) in s.chars().enumerate() {
            let ok = ch.is_ascii_lowercase() || ch.is_ascii_digit() || matches!(ch, '-' | '_');
            if !ok {
                return Err(TopicError::InvalidChar { ch, index });
            }
        }

        Ok(Self(s.to_owned()))
    }

    /// The food logging topic.
    #[must_use]
    pub fn food_logging() -> Self {
        Self(Self::FOOD_LOGGING.to_owned())
    }

    /// The coaching topic.
    #[must_use]
    pub fn coaching() -> Self {
        Self(Self::COACHING.to_owned())
    }

    /// The meal planning topic.
    #[must_use]
    pub fn meal_planning() -> Self {
        Self(Self::MEAL_PLANNING.to_owned())
    }

    /// Borrow as `&str`.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Topic {
    type Err = TopicError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for Topic {
    type Error = TopicError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Topic> for String {
    fn from(value: Topic) -> Self {
        value.0
    }
}

impl AsRef<str> for Topic {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

/// How the coach answers submissions on a topic.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversationMode {
    /// Text and voice are analyzed into food entries.
    FoodLogging,
    /// Free-form nutrition coaching replies.
    #[default]
    Coaching,
    /// Meal plan generation from the user's goals.
    MealPlanning,
}

impl ConversationMode {
    /// Stable string form.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::FoodLogging => "food_logging",
            Self::Coaching => "coaching",
            Self::MealPlanning => "meal_planning",
        }
    }
}

impl fmt::Display for ConversationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
