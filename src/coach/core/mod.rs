//! Core coach types and identifiers.

pub mod config;
pub mod errors;
pub mod ids;
pub mod message;
pub mod nutrition;
pub mod profile;
pub mod topic;

pub use config::{
    CoachConfig, ConversationConfig, GatewayConfig, LedgerConfig, ProfileConfig, ServerConfig,
};
pub use errors::{CoachError, CoachResult};
pub use ids::{FoodEntryId, MessageId, RequestId, UserId};
pub use message::{ChatMessage, Sender};
pub use nutrition::{FoodEntry, IMAGE_CONFIDENCE, InputMethod, NutritionItem, NutritionTotals};
pub use profile::{
    ActivityLevel, Budget, CookingTime, MealPreferences, NutritionGoals, UserProfile, WeightGoal,
};
pub use topic::{ConversationMode, Topic, TopicError};
