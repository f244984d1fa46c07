//! Analysis gateway contract.

use std::future::Future;
use std::pin::Pin;

use crate::coach::context::assembly::ChatContext;
use crate::coach::core::nutrition::{InputMethod, NutritionItem};
use crate::coach::core::profile::MealPreferences;
use crate::coach::gateway::error::GatewayResult;

/// Boxed future type for gateway operations.
pub type GatewayFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Raw input handed to food analysis.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AnalysisInput {
    /// Typed description of a meal.
    Text(String),
    /// Transcript of a spoken description.
    Voice(String),
    /// Encoded image bytes with a short caption.
    Image {
        /// Encoded image (JPEG/PNG).
        data: Vec<u8>,
        /// Caption describing what the image is.
        caption: String,
    },
}

impl AnalysisInput {
    /// Capture method of this input.
    #[must_use]
    pub const fn input_method(&self) -> InputMethod {
        match self {
            Self::Text(_) => InputMethod::Text,
            Self::Voice(_) => InputMethod::Voice,
            Self::Image { .. } => InputMethod::Image,
        }
    }

    /// Text part of the input (the caption for images).
    #[must_use]
    pub fn text(&self) -> &str {
        match self {
            Self::Text(text) | Self::Voice(text) => text,
            Self::Image { caption, .. } => caption,
        }
    }
}

/// Meal plan request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MealPlanRequest {
    /// The user's goals for the plan, in their own words.
    pub goals: String,
    /// Cuisine, effort and budget preferences.
    pub preferences: MealPreferences,
}

/// External nutrition/AI analysis service.
///
/// One call per submission; implementations must not retry on their own.
pub trait AnalysisGateway: Send + Sync {
    /// Extract nutrition items from a meal description or image.
    ///
    /// # Errors
    /// Returns an error on transport failure or when the reply cannot be parsed.
    fn analyze_food<'a>(
        &'a self,
        input: &'a AnalysisInput,
        context: &'a ChatContext,
    ) -> GatewayFuture<'a, GatewayResult<Vec<NutritionItem>>>;

    /// Get a free-text coaching reply.
    ///
    /// # Errors
    /// Returns an error on transport failure or an empty reply.
    fn send_message<'a>(
        &'a self,
        text: &'a str,
        context: &'a ChatContext,
    ) -> GatewayFuture<'a, GatewayResult<String>>;

    /// Generate a meal plan as free text.
    ///
    /// # Errors
    /// Returns an error on transport failure or an empty reply.
    fn generate_meal_plan<'a>(
        &'a self,
        request: &'a MealPlanRequest,
        context: &'a ChatContext,
    ) -> GatewayFuture<'a, GatewayResult<String>>;
}
