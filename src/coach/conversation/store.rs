//! In-memory, topic-isolated conversation store.

use std::sync::{Arc, PoisonError, RwLock};

use dashmap::DashMap;

use crate::coach::core::ids::MessageId;
use crate::coach::core::message::ChatMessage;
use crate::coach::core::topic::Topic;

type Sequence = Arc<RwLock<Vec<ChatMessage>>>;

/// Append-only message sequences keyed by topic.
///
/// Writes are crate-private: only the orchestrator appends, everyone else
/// reads snapshots.
///
/// Each topic owns its own lock, so reading one topic never waits on a write
/// to another. Appends on the same topic are serialized by that lock and the
/// resulting order is the order in which `append` returned.
#[derive(Default)]
pub struct ConversationStore {
    topics: DashMap<Topic, Sequence>,
}

impl ConversationStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a message to the end of its topic and return its identifier.
    pub(crate) fn append(&self, message: ChatMessage) -> MessageId {
        let id = message.id();
        let sequence = self.sequence_or_create(message.topic());
        sequence
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(message);
        id
    }

    /// Append a message only if its topic has no history yet.
    ///
    /// The emptiness check and the append happen under the same lock.
    pub(crate) fn append_if_empty(&self, message: ChatMessage) -> Option<MessageId> {
        let id = message.id();
        let sequence = self.sequence_or_create(message.topic());
        let mut guard = sequence.write().unwrap_or_else(PoisonError::into_inner);
        if !guard.is_empty() {
            return None;
        }
        guard.push(message);
        Some(id)
    }

    /// Ordered snapshot of a topic's messages.
    ///
    /// The returned vector is an independent copy.
    #[must_use]
    pub fn messages(&self, topic: &Topic) -> Vec<ChatMessage> {
        self.read(topic, <[ChatMessage]>::to_vec).unwrap_or_default()
    }

    /// Snapshot of the last `limit` messages of a topic, oldest first.
    ///
    /// A `limit` of zero returns the full history.
    #[must_use]
    pub fn recent(&self, topic: &Topic, limit: usize) -> Vec<ChatMessage> {
        self.read(topic, |messages| {
            let start = if limit == 0 {
                0
            } else {
                messages.len().saturating_sub(limit)
            };
            messages[start..].to_vec()
        })
        .unwrap_or_default()
    }

    /// Whether a topic has no messages.
    #[must_use]
    pub fn is_empty(&self, topic: &Topic) -> bool {
        self.len(topic) == 0
    }

    /// Number of messages in a topic.
    #[must_use]
    pub fn len(&self, topic: &Topic) -> usize {
        self.read(topic, <[ChatMessage]>::len).unwrap_or(0)
    }

    /// Most recent message of a topic.
    #[must_use]
    pub fn last(&self, topic: &Topic) -> Option<ChatMessage> {
        self.read(topic, |messages| messages.last().cloned())
            .flatten()
    }

    /// Topics that have received at least one message, sorted.
    #[must_use]
    pub fn topics(&self) -> Vec<Topic> {
        let mut topics: Vec<Topic> = self.topics.iter().map(|e| e.key().clone()).collect();
        topics.sort();
        topics
    }

    fn sequence(&self, topic: &Topic) -> Option<Sequence> {
        self.topics.get(topic).map(|seq| Arc::clone(seq.value()))
    }

    fn read<R>(&self, topic: &Topic, f: impl FnOnce(&[ChatMessage]) -> R) -> Option<R> {
        let sequence = self.sequence(topic)?;
        let guard = sequence.read().unwrap_or_else(PoisonError::into_inner);
        Some(f(&guard))
    }

    fn sequence_or_create(&self, topic: &Topic) -> Sequence {
        if let Some(seq) = self.sequence(topic) {
            return seq;
        }
        Arc::clone(self.topics.entry(topic.clone()).or_default().value())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coach::core::message::Sender;

    #[test]
    fn test_append_preserves_order() {
        let store = ConversationStore::new();
        let topic = Topic::coaching();
        let first = store.append(ChatMessage::user(topic.clone(), "one"));
        let second = store.append(ChatMessage::coach(topic.clone(), "two"));

        let messages = store.messages(&topic);
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].id(), first);
        assert_eq!(messages[1].id(), second);
        assert_eq!(messages[1].sender(), Sender::Coach);
    }

    #[test]
    fn test_topics_are_isolated() {
        let store = ConversationStore::new();
        store.append(ChatMessage::user(Topic::coaching(), "hello coach"));

        assert!(store.is_empty(&Topic::food_logging()));
        assert_eq!(store.len(&Topic::coaching()), 1);
        assert_eq!(store.topics(), vec![Topic::coaching()]);
    }

    #[test]
    fn test_snapshot_is_independent() {
        let store = ConversationStore::new();
        let topic = Topic::food_logging();
        store.append(ChatMessage::user(topic.clone(), "apple"));
        let snapshot = store.messages(&topic);
        store.append(ChatMessage::coach(topic.clone(), "logged"));

        assert_eq!(snapshot.len(), 1);
        assert_eq!(store.len(&topic), 2);
    }

    #[test]
    fn test_append_if_empty_only_once() {
        let store = ConversationStore::new();
        let topic = Topic::coaching();
        let first = store.append_if_empty(ChatMessage::coach(topic.clone(), "hi"));
        let second = store.append_if_empty(ChatMessage::coach(topic.clone(), "hi again"));

        assert!(first.is_some());
        assert!(second.is_none());
        assert_eq!(store.len(&topic), 1);
    }

    #[test]
    fn test_recent_window() {
        let store = ConversationStore::new();
        let topic = Topic::coaching();
        for i in 0..5 {
            store.append(ChatMessage::user(topic.clone(), format!("m{i}")));
        }

        let recent = store.recent(&topic, 2);
        let texts: Vec<&str> = recent.iter().map(ChatMessage::text).collect();
        assert_eq!(texts, vec!["m3", "m4"]);
        assert_eq!(store.recent(&topic, 0).len(), 5);
        assert_eq!(store.last(&topic).map(|m| m.text().to_string()), Some("m4".into()));
    }

    #[test]
    fn test_concurrent_appends_are_all_kept() {
        let store = ConversationStore::new();
        std::thread::scope(|scope| {
            for t in 0..4 {
                let store = &store;
                scope.spawn(move || {
                    for i in 0..50 {
                        store.append(ChatMessage::user(Topic::coaching(), format!("{t}-{i}")));
                        store.append(ChatMessage::user(Topic::food_logging(), format!("{t}-{i}")));
                    }
                });
            }
        });

        assert_eq!(store.len(&Topic::coaching()), 200);
        assert_eq!(store.len(&Topic::food_logging()), 200);

        // Per-thread order survives interleaving.
        let thread_zero: Vec<String> = store
            .messages(&Topic::coaching())
            .iter()
            .filter(|m| m.text().starts_with("0-"))
            .map(|m| m.text().to_string())
            .collect();
        let expected: Vec<String> = (0..50).map(|i| format!("0-{i}")).collect();
        assert_eq!(thread_zero, expected);
    }
}
