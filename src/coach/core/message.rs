//! Chat message model.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::coach::core::ids::MessageId;
use crate::coach::core::topic::Topic;

/// Author of a chat message.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sender {
    /// The person using the app.
    User,
    /// The nutrition coach.
    Coach,
}

impl Sender {
    /// Stable string form.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Coach => "coach",
        }
    }
}

impl fmt::Display for Sender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Sender {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "user" => Ok(Self::User),
            "coach" => Ok(Self::Coach),
            _ => Err(value.to_string()),
        }
    }
}

/// A single immutable message in a topic's conversation.
///
/// Fields are read through accessors; once built a message never changes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    id: MessageId,
    text: String,
    sender: Sender,
    timestamp: DateTime<Utc>,
    topic: Topic,
}

impl ChatMessage {
    /// Build a message with a fresh id and the current time.
    #[must_use]
    pub fn new(topic: Topic, sender: Sender, text: impl Into<String>) -> Self {
        Self {
            id: MessageId::new(),
            text: text.into(),
            sender,
            timestamp: Utc::now(),
            topic,
        }
    }

    /// Build a user-authored message.
    #[must_use]
    pub fn user(topic: Topic, text: impl Into<String>) -> Self {
        Self::new(topic, Sender::User, text)
    }

    /// Build a coach-authored message.
    #[must_use]
    pub fn coach(topic: Topic, text: impl Into<String>) -> Self {
        Self::new(topic, Sender::Coach, text)
    }

    /// Message identifier.
    #[must_use]
    pub const fn id(&self) -> MessageId {
        self.id
    }

    /// Message body.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Author.
    #[must_use]
    pub const fn sender(&self) -> Sender {
        self.sender
    }

    /// Creation time.
    #[must_use]
    pub const fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Topic the message belongs to.
    #[must_use]
    pub const fn topic(&self) -> &Topic {
        &self.topic
    }

    /// Whether the user wrote this message.
    #[must_use]
    pub fn is_from_user(&self) -> bool {
        self.sender == Sender::User
    }
}
