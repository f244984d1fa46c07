//! Per-topic conversation history.

pub mod store;

pub use store::ConversationStore;
