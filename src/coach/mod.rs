//! Conversational core of the nutrition coach.
//!
//! Organized into:
//! - `core`: Configuration, errors, IDs, topics, messages, nutrition and profile types
//! - `conversation`: Topic-isolated, append-only message store
//! - `context`: Settings collaborator and per-request context assembly
//! - `gateway`: Analysis service contract, Ollama implementation and reply parsing
//! - `ledger`: Food ledger contract with in-memory and `SQLite` implementations
//! - `orchestrator`: Single-flight request handling per topic

pub mod context;
pub mod conversation;
pub mod core;
pub mod gateway;
pub mod ledger;
pub mod orchestrator;

pub use self::core::{
    ActivityLevel, Budget, ChatMessage, CoachConfig, CoachError, CoachResult, ConversationConfig,
    ConversationMode, CookingTime, FoodEntry, FoodEntryId, GatewayConfig, IMAGE_CONFIDENCE,
    InputMethod, LedgerConfig, MealPreferences, MessageId, NutritionGoals, NutritionItem,
    NutritionTotals, ProfileConfig, RequestId, Sender, ServerConfig, Topic, TopicError, UserId,
    UserProfile, WeightGoal,
};
pub use context::{ChatContext, ContextAssembler, ProfileSource, StaticProfileSource};
pub use conversation::ConversationStore;
pub use gateway::{
    AnalysisGateway, AnalysisInput, GatewayError, GatewayFuture, GatewayResult, MealPlanRequest,
    OllamaGateway, extract_goals, parse_nutrition_items,
};
pub use ledger::{FoodLedger, InMemoryFoodLedger, LedgerFuture, SqliteFoodLedger};
pub use orchestrator::{
    CoachBackends, DEFAULT_IMAGE_CAPTION, Orchestrator, OrchestratorEvent, QuickAction,
    RejectReason, RequestKind, SubmitOutcome, TopicState, UserInput,
};
