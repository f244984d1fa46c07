//! Prompt builders for the analysis service.

use crate::coach::context::assembly::ChatContext;
use crate::coach::core::profile::{MealPreferences, NutritionGoals, UserProfile};
use crate::coach::gateway::analysis_gateway::{AnalysisInput, MealPlanRequest};

const FOOD_INSTRUCTIONS: &str = "You are a nutrition analysis engine. Identify every food or drink in the input and estimate its nutrition. Reply with strict JSON only: {\"items\": [{\"description\": string, \"calories\": number, \"protein\": number, \"carbs\": number, \"fat\": number, \"sugar\": number?, \"fibre\": number?, \"saturated_fat\": number?, \"sodium\": number?, \"cholesterol\": number?}]}. Grams for macros, milligrams for sodium and cholesterol, kcal for calories. Return {\"items\": []} if no food is present.";

const COACH_INSTRUCTIONS: &str = "You are a friendly, practical AI nutrition coach. Answer in plain language, keep replies short, and base advice on the profile and goals below. If the user asks you to set or change goals, append a fenced ```json block {\"goals\": {\"calorie_goal\": number, \"protein_goal\": number, \"carb_goal\": number, \"fat_goal\": number, \"weight_goal\": \"lose\"|\"maintain\"|\"gain\"}}.";

const MEAL_PLAN_INSTRUCTIONS: &str = "You are a meal planner. Write a one-day meal plan (breakfast, lunch, dinner, snacks) with approximate calories per meal that fits the profile, goals and preferences below.";

/// System prompt for food analysis.
#[must_use]
pub fn food_analysis_system(context: &ChatContext) -> String {
    let mut out = String::with_capacity(FOOD_INSTRUCTIONS.len() + 256);
    out.push_str(FOOD_INSTRUCTIONS);
    out.push('\n');
    render_profile(&mut out, &context.user_profile);
    out
}

/// User turn for food analysis.
#[must_use]
pub fn food_analysis_user(input: &AnalysisInput) -> String {
    match input {
        AnalysisInput::Text(text) | AnalysisInput::Voice(text) => {
            format!("Meal description: {text}")
        }
        AnalysisInput::Image { caption, .. } => format!(
            "Read the attached image ({caption}) and list each food with its nutrition."
        ),
    }
}

/// System prompt for coaching replies.
#[must_use]
pub fn coaching_system(context: &ChatContext) -> String {
    let mut out = String::with_capacity(COACH_INSTRUCTIONS.len() + 512);
    out.push_str(COACH_INSTRUCTIONS);
    out.push('\n');
    render_profile(&mut out, &context.user_profile);
    render_goals(&mut out, &context.current_goals);
    out
}

/// Single prompt for meal plan generation.
#[must_use]
pub fn meal_plan_prompt(request: &MealPlanRequest, context: &ChatContext) -> String {
    let mut out = String::with_capacity(MEAL_PLAN_INSTRUCTIONS.len() + 512);
    out.push_str(MEAL_PLAN_INSTRUCTIONS);
    out.push('\n');
    render_profile(&mut out, &context.user_profile);
    render_goals(&mut out, &context.current_goals);
    render_preferences(&mut out, &request.preferences);
    out.push_str("[USER_GOALS]\n");
    out.push_str(&request.goals);
    out.push('\n');
    out
}

fn render_profile(out: &mut String, profile: &UserProfile) {
    out.push_str("[PROFILE]\n");
    out.push_str(&format!(
        "age: {}, weight_kg: {:.1}, height_cm: {:.1}, activity: {}\n",
        profile.age,
        profile.weight_kg,
        profile.height_cm,
        profile.activity_level.as_str()
    ));
    out.push_str("restrictions: ");
    out.push_str(&join_or_none(&profile.dietary_restrictions));
    out.push_str("\nconditions: ");
    out.push_str(&join_or_none(&profile.health_conditions));
    out.push('\n');
}

fn render_goals(out: &mut String, goals: &NutritionGoals) {
    out.push_str("[GOALS]\n");
    out.push_str(&format!(
        "calories: {:.0} kcal, protein: {:.0} g, carbs: {:.0} g, fat: {:.0} g, weight: {}\n",
        goals.calorie_goal,
        goals.protein_goal,
        goals.carb_goal,
        goals.fat_goal,
        goals.weight_goal.as_str()
    ));
}

fn render_preferences(out: &mut String, preferences: &MealPreferences) {
    out.push_str("[PREFERENCES]\n");
    out.push_str("cuisine: ");
    out.push_str(&join_or_none(&preferences.cuisine));
    out.push_str(&format!(
        ", cooking_time: {:?}, servings: {}, budget: {:?}\n",
        preferences.cooking_time, preferences.servings, preferences.budget
    ));
}

fn join_or_none(values: &[String]) -> String {
    if values.is_empty() {
        "none".to_string()
    } else {
        values.join(", ")
    }
}
