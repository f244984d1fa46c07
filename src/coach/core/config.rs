//! Configuration for the coach subsystem.

use std::collections::HashMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::coach::core::errors::{CoachError, CoachResult};
use crate::coach::core::ids::UserId;
use crate::coach::core::profile::{MealPreferences, NutritionGoals, UserProfile};
use crate::coach::core::topic::{ConversationMode, Topic};

/// Prefix of every environment variable read by [`CoachConfig::from_env`].
pub const ENV_PREFIX: &str = "NUTRI_COACH_";

/// Top-level configuration for the coach.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct CoachConfig {
    /// Owner of logged food entries.
    pub user_id: UserId,
    /// Conversation settings.
    pub conversation: ConversationConfig,
    /// Analysis gateway settings.
    pub gateway: GatewayConfig,
    /// Food ledger settings.
    pub ledger: LedgerConfig,
    /// Profile and goals used until the settings screen changes them.
    pub profile: ProfileConfig,
    /// HTTP server settings.
    pub server: ServerConfig,
}

impl CoachConfig {
    /// Build the default configuration and apply `NUTRI_COACH_*` overrides
    /// from the process environment.
    ///
    /// # Errors
    /// Returns an error if an override cannot be parsed or the result is invalid.
    pub fn from_env() -> CoachResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`CoachConfig::from_env`] with an injectable variable lookup.
    ///
    /// Recognised keys (after the prefix): `USER_ID`, `OLLAMA_URL`, `MODEL`,
    /// `VISION_MODEL`, `TIMEOUT_SECS`, `LEDGER_PATH`, `PORT`, `HISTORY_WINDOW`.
    ///
    /// # Errors
    /// Returns an error if an override cannot be parsed or the result is invalid.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> CoachResult<Self> {
        let var = |name: &str| lookup(&format!("{ENV_PREFIX}{name}"));
        let mut config = Self::default();

        if let Some(raw) = var("USER_ID") {
            config.user_id = raw
                .parse()
                .map_err(|err| CoachError::InvalidConfig(format!("USER_ID: {err}")))?;
        }
        if let Some(url) = var("OLLAMA_URL") {
            config.gateway.base_url = url;
        }
        if let Some(model) = var("MODEL") {
            config.gateway.model = model;
        }
        if let Some(model) = var("VISION_MODEL") {
            config.gateway.vision_model = Some(model);
        }
        if let Some(raw) = var("TIMEOUT_SECS") {
            config.gateway.timeout_secs = parse_number("TIMEOUT_SECS", &raw)?;
        }
        if let Some(path) = var("LEDGER_PATH") {
            config.ledger.sqlite_path = Some(PathBuf::from(path));
        }
        if let Some(raw) = var("PORT") {
            config.server.port = parse_number("PORT", &raw)?;
        }
        if let Some(raw) = var("HISTORY_WINDOW") {
            config.conversation.history_window = parse_number("HISTORY_WINDOW", &raw)?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration invariants.
    ///
    /// # Errors
    /// Returns an error if any values are out of range or invalid.
    pub fn validate(&self) -> CoachResult<()> {
        if self.gateway.model.trim().is_empty() {
            return Err(CoachError::InvalidConfig(
                "gateway.model must not be empty".to_string(),
            ));
        }

        if self.gateway.timeout_secs == 0 {
            return Err(CoachError::InvalidConfig(
                "gateway.timeout_secs must be > 0".to_string(),
            ));
        }

        if !(0.0..=2.0).contains(&self.gateway.temperature) {
            return Err(CoachError::InvalidConfig(
                "gateway.temperature must be in 0.0..=2.0".to_string(),
            ));
        }

        if !self.profile.goals.is_plausible() {
            return Err(CoachError::InvalidConfig(
                "profile.goals must be positive".to_string(),
            ));
        }

        if self.profile.meal_preferences.servings == 0 {
            return Err(CoachError::InvalidConfig(
                "profile.meal_preferences.servings must be > 0".to_string(),
            ));
        }

        Url::parse(&self.gateway.base_url)?;

        Ok(())
    }
}

fn parse_number<T: std::str::FromStr>(name: &str, raw: &str) -> CoachResult<T>
where
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse()
        .map_err(|err| CoachError::InvalidConfig(format!("{name}: {err}")))
}

/// Conversation settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ConversationConfig {
    /// Maximum number of messages forwarded to the gateway (0 = all).
    pub history_window: usize,
    /// Welcome message appended to an empty coaching topic.
    pub greeting: String,
    /// Mode of each known topic; unknown topics are served as coaching.
    pub topics: HashMap<Topic, ConversationMode>,
    /// Capacity of the orchestrator event channel.
    pub event_capacity: usize,
}

impl ConversationConfig {
    /// Mode a topic is served in.
    #[must_use]
    pub fn mode_for(&self, topic: &Topic) -> ConversationMode {
        self.topics.get(topic).copied().unwrap_or_default()
    }
}

impl Default for ConversationConfig {
    fn default() -> Self {
        let topics = HashMap::from([
            (Topic::food_logging(), ConversationMode::FoodLogging),
            (Topic::coaching(), ConversationMode::Coaching),
            (Topic::meal_planning(), ConversationMode::MealPlanning),
        ]);
        Self {
            history_window: 20,
            greeting: "G'day! I'm your AI Nutrition Coach. Ask me anything about your diet!"
                .to_string(),
            topics,
            event_capacity: 256,
        }
    }
}

/// Analysis gateway settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Ollama base URL.
    pub base_url: String,
    /// Completion model for text requests.
    pub model: String,
    /// Optional model for image requests (defaults to `model`).
    pub vision_model: Option<String>,
    /// Temperature for generation.
    pub temperature: f64,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:11434".to_string(),
            model: "ministral-3:8b-instruct-2512-q8_0".to_string(),
            vision_model: None,
            temperature: 0.2,
            timeout_secs: 120,
        }
    }
}

/// Food ledger settings.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// `SQLite` database path; `None` keeps entries in memory.
    pub sqlite_path: Option<PathBuf>,
}

/// Profile, goals and meal preferences.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ProfileConfig {
    /// Body profile.
    pub profile: UserProfile,
    /// Daily targets.
    pub goals: NutritionGoals,
    /// Meal plan preferences.
    pub meal_preferences: MealPreferences,
}

/// HTTP server settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Listen port.
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { port: 3000 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = CoachConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(
            config.conversation.mode_for(&Topic::food_logging()),
            ConversationMode::FoodLogging
        );
        let other = Topic::new("hydration").unwrap_or_else(|_| Topic::coaching());
        assert_eq!(
            config.conversation.mode_for(&other),
            ConversationMode::Coaching
        );
    }

    #[test]
    fn test_env_overrides() {
        let vars = HashMap::from([
            ("NUTRI_COACH_MODEL".to_string(), "llama3.2".to_string()),
            ("NUTRI_COACH_PORT".to_string(), "8088".to_string()),
            ("NUTRI_COACH_LEDGER_PATH".to_string(), "food.sqlite".to_string()),
        ]);
        let config = CoachConfig::from_lookup(|key| vars.get(key).cloned());
        assert!(config.is_ok());
        let config = config.unwrap_or_default();
        assert_eq!(config.gateway.model, "llama3.2");
        assert_eq!(config.server.port, 8088);
        assert_eq!(config.ledger.sqlite_path, Some(PathBuf::from("food.sqlite")));
    }

    #[test]
    fn test_invalid_overrides_rejected() {
        let bad_port = CoachConfig::from_lookup(|key| {
            (key == "NUTRI_COACH_PORT").then(|| "not-a-port".to_string())
        });
        assert!(matches!(bad_port, Err(CoachError::InvalidConfig(_))));

        let bad_url = CoachConfig::from_lookup(|key| {
            (key == "NUTRI_COACH_OLLAMA_URL").then(|| "::nope".to_string())
        });
        assert!(matches!(bad_url, Err(CoachError::Url(_))));
    }
}
