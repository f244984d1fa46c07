//! Nutrition records: analysis items, persisted food entries, and totals.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::coach::core::ids::{FoodEntryId, UserId};

/// One food recognised by the analysis gateway.
///
/// Transient: consumed immediately to build [`FoodEntry`] records.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct NutritionItem {
    /// Human readable description, e.g. "2 eggs".
    pub description: String,
    /// Energy in kcal.
    pub calories: f64,
    /// Protein in grams.
    pub protein: f64,
    /// Carbohydrates in grams.
    pub carbs: f64,
    /// Fat in grams.
    pub fat: f64,
    /// Sugar in grams.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sugar: Option<f64>,
    /// Fibre in grams.
    #[serde(default, alias = "fiber", skip_serializing_if = "Option::is_none")]
    pub fibre: Option<f64>,
    /// Saturated fat in grams.
    #[serde(
        default,
        alias = "saturatedFat",
        skip_serializing_if = "Option::is_none"
    )]
    pub saturated_fat: Option<f64>,
    /// Sodium in milligrams.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sodium: Option<f64>,
    /// Cholesterol in milligrams.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cholesterol: Option<f64>,
}

impl NutritionItem {
    /// Build an item with the four macro values.
    #[must_use]
    pub fn new(
        description: impl Into<String>,
        calories: f64,
        protein: f64,
        carbs: f64,
        fat: f64,
    ) -> Self {
        Self {
            description: description.into(),
            calories,
            protein,
            carbs,
            fat,
            ..Self::default()
        }
    }

    /// Whether every numeric field is finite and non-negative.
    #[must_use]
    pub fn is_plausible(&self) -> bool {
        let required = [self.calories, self.protein, self.carbs, self.fat];
        let optional = [
            self.sugar,
            self.fibre,
            self.saturated_fat,
            self.sodium,
            self.cholesterol,
        ];
        required
            .into_iter()
            .chain(optional.into_iter().flatten())
            .all(|v| v.is_finite() && v >= 0.0)
    }
}

/// How a food entry was captured.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputMethod {
    /// Typed description.
    Text,
    /// Photo of a meal, label or slip.
    Image,
    /// Speech transcript.
    Voice,
}

impl InputMethod {
    /// Stable string form for storage.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Image => "image",
            Self::Voice => "voice",
        }
    }

    /// Confidence attached to entries derived from this method, if any.
    #[must_use]
    pub const fn default_confidence(self) -> Option<f64> {
        match self {
            Self::Image => Some(IMAGE_CONFIDENCE),
            Self::Text | Self::Voice => None,
        }
    }
}

/// Confidence recorded for entries read from an image.
pub const IMAGE_CONFIDENCE: f64 = 0.8;

impl fmt::Display for InputMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for InputMethod {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "text" => Ok(Self::Text),
            "image" => Ok(Self::Image),
            "voice" => Ok(Self::Voice),
            _ => Err(value.to_string()),
        }
    }
}

/// A food entry handed to the food ledger.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FoodEntry {
    /// Entry identifier.
    pub id: FoodEntryId,
    /// Owner of the entry.
    pub user_id: UserId,
    /// When the food was logged.
    pub timestamp: DateTime<Utc>,
    /// Nutrition values.
    #[serde(flatten)]
    pub nutrition: NutritionItem,
    /// Capture method.
    pub input_method: InputMethod,
    /// Confidence in `[0, 1]` when the capture method is uncertain.
    pub confidence: Option<f64>,
}

impl FoodEntry {
    /// Build an entry from an analysis item.
    ///
    /// The confidence is clamped into `[0, 1]`.
    #[must_use]
    pub fn from_item(
        user_id: UserId,
        timestamp: DateTime<Utc>,
        item: NutritionItem,
        input_method: InputMethod,
        confidence: Option<f64>,
    ) -> Self {
        Self {
            id: FoodEntryId::new(),
            user_id,
            timestamp,
            nutrition: item,
            input_method,
            confidence: confidence.map(|c| c.clamp(0.0, 1.0)),
        }
    }
}

/// Summed nutrition values over a set of entries.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct NutritionTotals {
    /// Number of entries summed.
    pub entries: usize,
    /// Total kcal.
    pub calories: f64,
    /// Total protein grams.
    pub protein: f64,
    /// Total carbohydrate grams.
    pub carbs: f64,
    /// Total fat grams.
    pub fat: f64,
}

impl NutritionTotals {
    /// Sum a list of analysis items.
    #[must_use]
    pub fn from_items<'a>(items: impl IntoIterator<Item = &'a NutritionItem>) -> Self {
        items.into_iter().fold(Self::default(), |mut acc, item| {
            acc.entries += 1;
            acc.calories += item.calories;
            acc.protein += item.protein;
            acc.carbs += item.carbs;
            acc.fat += item.fat;
            acc
        })
    }

    /// Sum a list of ledger entries.
    #[must_use]
    pub fn from_entries<'a>(entries: impl IntoIterator<Item = &'a FoodEntry>) -> Self {
        Self::from_items(entries.into_iter().map(|entry| &entry.nutrition))
    }

    /// Calories as a whole number, truncated like the log confirmation shows them.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn whole_calories(&self) -> i64 {
        self.calories.trunc() as i64
    }
}
