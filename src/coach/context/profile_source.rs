//! Settings collaborator that supplies the current profile and goals.

use std::sync::{PoisonError, RwLock};

use crate::coach::core::config::ProfileConfig;
use crate::coach::core::profile::{MealPreferences, NutritionGoals, UserProfile};

/// Read-only source of the user's profile, goals and meal preferences.
///
/// Queried at request time; callers must not cache the returned values.
pub trait ProfileSource: Send + Sync {
    /// Current body profile.
    fn user_profile(&self) -> UserProfile;
    /// Current daily targets.
    fn nutrition_goals(&self) -> NutritionGoals;
    /// Current meal plan preferences.
    fn meal_preferences(&self) -> MealPreferences;
}

/// Profile source backed by configuration, updatable by the settings screen.
pub struct StaticProfileSource {
    inner: RwLock<ProfileConfig>,
}

impl StaticProfileSource {
    /// Create a source from configured values.
    #[must_use]
    pub const fn new(config: ProfileConfig) -> Self {
        Self {
            inner: RwLock::new(config),
        }
    }

    /// Replace the daily targets.
    pub fn set_goals(&self, goals: NutritionGoals) {
        self.inner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .goals = goals;
    }

    /// Replace the body profile.
    pub fn set_profile(&self, profile: UserProfile) {
        self.inner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .profile = profile;
    }

    fn snapshot(&self) -> ProfileConfig {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Default for StaticProfileSource {
    fn default() -> Self {
        Self::new(ProfileConfig::default())
    }
}

impl ProfileSource for StaticProfileSource {
    fn user_profile(&self) -> UserProfile {
        self.snapshot().profile
    }

    fn nutrition_goals(&self) -> NutritionGoals {
        self.snapshot().goals
    }

    fn meal_preferences(&self) -> MealPreferences {
        self.snapshot().meal_preferences
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_updates_are_visible_to_next_read() {
        let source = StaticProfileSource::default();
        assert!((source.nutrition_goals().calorie_goal - 2000.0).abs() < f64::EPSILON);

        source.set_goals(NutritionGoals {
            calorie_goal: 2400.0,
            ..NutritionGoals::default()
        });
        assert!((source.nutrition_goals().calorie_goal - 2400.0).abs() < f64::EPSILON);
        assert_eq!(source.user_profile().age, 30);
    }
}
