//! User profile, nutrition goals, and meal preferences.
//!
//! These are configuration-like values owned by the settings screen. The
//! orchestrator only reads them when it assembles a request context.

use serde::{Deserialize, Serialize};

/// Self-reported activity level.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityLevel {
    /// Little or no exercise.
    Sedentary,
    /// Light exercise 1-3 days a week.
    LightlyActive,
    /// Moderate exercise 3-5 days a week.
    #[default]
    ModeratelyActive,
    /// Hard exercise 6-7 days a week.
    VeryActive,
    /// Physical job or twice-daily training.
    ExtremelyActive,
}

impl ActivityLevel {
    /// Stable string form.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Sedentary => "sedentary",
            Self::LightlyActive => "lightly_active",
            Self::ModeratelyActive => "moderately_active",
            Self::VeryActive => "very_active",
            Self::ExtremelyActive => "extremely_active",
        }
    }
}

/// Direction of the user's weight goal.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeightGoal {
    /// Lose weight.
    Lose,
    /// Keep current weight.
    #[default]
    Maintain,
    /// Gain weight.
    Gain,
}

impl WeightGoal {
    /// Stable string form.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Lose => "lose",
            Self::Maintain => "maintain",
            Self::Gain => "gain",
        }
    }
}

/// Body and health profile used to personalise coaching.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    /// Age in years.
    pub age: u32,
    /// Weight in kilograms.
    pub weight_kg: f64,
    /// Height in centimetres.
    pub height_cm: f64,
    /// Activity level.
    pub activity_level: ActivityLevel,
    /// Dietary restrictions (vegetarian, gluten free, ...).
    #[serde(default)]
    pub dietary_restrictions: Vec<String>,
    /// Health conditions the coach should take into account.
    #[serde(default)]
    pub health_conditions: Vec<String>,
}

impl Default for UserProfile {
    fn default() -> Self {
        Self {
            age: 30,
            weight_kg: 70.0,
            height_cm: 175.0,
            activity_level: ActivityLevel::ModeratelyActive,
            dietary_restrictions: Vec::new(),
            health_conditions: Vec::new(),
        }
    }
}

/// Daily nutrition targets.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NutritionGoals {
    /// Daily energy target in kcal.
    #[serde(alias = "calorieGoal")]
    pub calorie_goal: f64,
    /// Daily protein target in grams.
    #[serde(alias = "proteinGoal")]
    pub protein_goal: f64,
    /// Daily carbohydrate target in grams.
    #[serde(alias = "carbGoal")]
    pub carb_goal: f64,
    /// Daily fat target in grams.
    #[serde(alias = "fatGoal")]
    pub fat_goal: f64,
    /// Weight direction.
    #[serde(default, alias = "weightGoal")]
    pub weight_goal: WeightGoal,
}

impl Default for NutritionGoals {
    fn default() -> Self {
        Self {
            calorie_goal: 2000.0,
            protein_goal: 150.0,
            carb_goal: 250.0,
            fat_goal: 65.0,
            weight_goal: WeightGoal::Maintain,
        }
    }
}

impl NutritionGoals {
    /// Whether all targets are finite and strictly positive.
    #[must_use]
    pub fn is_plausible(&self) -> bool {
        [
            self.calorie_goal,
            self.protein_goal,
            self.carb_goal,
            self.fat_goal,
        ]
        .into_iter()
        .all(|v| v.is_finite() && v > 0.0)
    }
}

/// Preferred cooking effort for generated meal plans.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CookingTime {
    /// Under 20 minutes.
    Quick,
    /// 20 to 45 minutes.
    #[default]
    Medium,
    /// No limit.
    Long,
}

/// Grocery budget for generated meal plans.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Budget {
    /// Cheapest options.
    Low,
    /// Everyday budget.
    #[default]
    Moderate,
    /// No budget constraint.
    High,
}

/// Preferences forwarded with meal plan requests.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MealPreferences {
    /// Preferred cuisines.
    pub cuisine: Vec<String>,
    /// Cooking effort.
    pub cooking_time: CookingTime,
    /// Number of servings per meal.
    pub servings: u32,
    /// Grocery budget.
    pub budget: Budget,
}

impl Default for MealPreferences {
    fn default() -> Self {
        Self {
            cuisine: vec!["australian".to_string()],
            cooking_time: CookingTime::Medium,
            servings: 2,
            budget: Budget::Moderate,
        }
    }
}
