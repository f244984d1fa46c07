//! Turning model output into structured records.
//!
//! Models rarely return bare JSON: replies come wrapped in code fences, with
//! prose around them, or with numbers written as `"140 kcal"`. The parsers
//! here accept those shapes and reject anything that does not contain a
//! usable payload.

use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::coach::core::nutrition::NutritionItem;
use crate::coach::core::profile::NutritionGoals;
use crate::coach::gateway::error::{GatewayError, GatewayResult};

static FENCE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?s)```[A-Za-z]*\s*(.*?)```").ok());

/// Parse nutrition items out of a model reply.
///
/// Accepts a JSON array, an object with an `items` (or `foods`) array, or a
/// single object naming a food and its calories. Every candidate slice of
/// the reply is tried until one yields a usable item. Items without a
/// description or with implausible values are dropped. An empty array is a
/// valid result.
///
/// # Errors
/// Returns `EmptyResponse` for a blank reply and `MalformedResponse` when no
/// candidate holds a usable item or an explicit empty list.
pub fn parse_nutrition_items(raw: &str) -> GatewayResult<Vec<NutritionItem>> {
    if raw.trim().is_empty() {
        return Err(GatewayError::EmptyResponse);
    }

    let mut empty_list = false;
    for candidate in candidates(raw) {
        let Ok(payload) = serde_json::from_str::<ItemsPayload>(candidate) else {
            continue;
        };
        if payload.is_empty() {
            empty_list = true;
            continue;
        }
        let items = usable_items(payload);
        if !items.is_empty() {
            return Ok(items);
        }
        debug!("Nutrition payload held no usable item, trying next candidate");
    }

    if empty_list {
        Ok(Vec::new())
    } else {
        Err(GatewayError::MalformedResponse(
            "no usable nutrition item in reply".to_string(),
        ))
    }
}

fn usable_items(payload: ItemsPayload) -> Vec<NutritionItem> {
    payload
        .into_items()
        .into_iter()
        .filter_map(RawItem::into_item)
        .filter(|item| {
            let keep = item.is_plausible();
            if !keep {
                debug!("Dropping implausible nutrition item {:?}", item.description);
            }
            keep
        })
        .collect()
}

/// Look for a structured goals block in a coaching reply.
///
/// Returns `None` when the reply carries no goals or they are implausible.
#[must_use]
pub fn extract_goals(reply: &str) -> Option<NutritionGoals> {
    candidates(reply).into_iter().find_map(|candidate| {
        let value: Value = serde_json::from_str(candidate).ok()?;
        let object = value.get("goals").cloned().unwrap_or(value);
        let goals: NutritionGoals = serde_json::from_value(object).ok()?;
        goals.is_plausible().then_some(goals)
    })
}

/// Candidate JSON slices, most specific first.
fn candidates(raw: &str) -> Vec<&str> {
    let mut out = Vec::new();

    if let Some(fence) = FENCE.as_ref() {
        out.extend(
            fence
                .captures_iter(raw)
                .filter_map(|caps| caps.get(1))
                .map(|m| m.as_str().trim()),
        );
    }

    let trimmed = raw.trim();
    out.push(trimmed);
    if let Some(slice) = between(trimmed, '[', ']') {
        out.push(slice);
    }
    if let Some(slice) = between(trimmed, '{', '}') {
        out.push(slice);
    }
    out
}

fn between(text: &str, open: char, close: char) -> Option<&str> {
    let start = text.find(open)?;
    let end = text.rfind(close)?;
    (end > start).then(|| &text[start..=end])
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ItemsPayload {
    List(Vec<Value>),
    Wrapped {
        #[serde(alias = "foods")]
        items: Vec<Value>,
    },
    Single(CompleteItem),
}

impl ItemsPayload {
    fn is_empty(&self) -> bool {
        match self {
            Self::List(values) | Self::Wrapped { items: values } => values.is_empty(),
            Self::Single(_) => false,
        }
    }

    fn into_items(self) -> Vec<RawItem> {
        match self {
            Self::List(values) | Self::Wrapped { items: values } => values
                .into_iter()
                .filter_map(|value| serde_json::from_value(value).ok())
                .collect(),
            Self::Single(CompleteItem(item)) => vec![item],
        }
    }
}

/// A bare object only counts as an item when it names a food and its calories.
#[derive(Deserialize)]
#[serde(try_from = "RawItem")]
struct CompleteItem(RawItem);

impl TryFrom<RawItem> for CompleteItem {
    type Error = &'static str;

    fn try_from(item: RawItem) -> Result<Self, Self::Error> {
        if item.description.is_some() && item.calories.is_some() {
            Ok(Self(item))
        } else {
            Err("object is not a nutrition item")
        }
    }
}

#[derive(Deserialize)]
struct RawItem {
    #[serde(alias = "name", alias = "food")]
    description: Option<String>,
    #[serde(alias = "kcal", alias = "energy")]
    calories: Option<Value>,
    protein: Option<Value>,
    #[serde(alias = "carbohydrates")]
    carbs: Option<Value>,
    fat: Option<Value>,
    sugar: Option<Value>,
    #[serde(alias = "fiber")]
    fibre: Option<Value>,
    #[serde(alias = "saturatedFat")]
    saturated_fat: Option<Value>,
    sodium: Option<Value>,
    cholesterol: Option<Value>,
}

impl RawItem {
    fn into_item(self) -> Option<NutritionItem> {
        let description = self.description?.trim().to_string();
        if description.is_empty() {
            return None;
        }
        let calories = number(self.calories.as_ref())?;

        Some(NutritionItem {
            description,
            calories,
            protein: number(self.protein.as_ref()).unwrap_or(0.0),
            carbs: number(self.carbs.as_ref()).unwrap_or(0.0),
            fat: number(self.fat.as_ref()).unwrap_or(0.0),
            sugar: number(self.sugar.as_ref()),
            fibre: number(self.fibre.as_ref()),
            saturated_fat: number(self.saturated_fat.as_ref()),
            sodium: number(self.sodium.as_ref()),
            cholesterol: number(self.cholesterol.as_ref()),
        })
    }
}

/// Read a JSON number or a string such as `"140 kcal"` or `"1,200"`.
fn number(value: Option<&Value>) -> Option<f64> {
    match value? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => leading_number(s),
        _ => None,
    }
}

/// Commas followed by groups of three digits separate thousands (`"1,200"`);
/// any other comma is a decimal point (`"1,05"`).
fn leading_number(text: &str) -> Option<f64> {
    let start = text.find(|c: char| c.is_ascii_digit())?;
    let token: String = text[start..]
        .chars()
        .take_while(|c| c.is_ascii_digit() || matches!(c, '.' | ','))
        .collect();
    let token = token.trim_end_matches(['.', ',']);
    let thousands = token.contains('.') || token.split(',').skip(1).all(|group| group.len() == 3);
    let normalized = if thousands {
        token.replace(',', "")
    } else {
        token.replacen(',', ".", 1)
    };
    normalized.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_array() {
        let raw = r#"[{"description":"2 eggs","calories":140,"protein":12,"carbs":1,"fat":10},
                      {"description":"toast","calories":80,"protein":3,"carbs":15,"fat":1}]"#;
        let items = parse_nutrition_items(raw).unwrap_or_default();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].description, "2 eggs");
        assert!((items[1].calories - 80.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_parse_fenced_wrapped_with_strings() {
        let raw = "Here you go!\n```json\n{\"items\": [{\"name\": \"Flat white\", \"calories\": \"120 kcal\", \"protein\": \"6g\", \"fiber\": 0}]}\n```\nEnjoy.";
        let items = parse_nutrition_items(raw).unwrap_or_default();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].description, "Flat white");
        assert!((items[0].calories - 120.0).abs() < f64::EPSILON);
        assert!((items[0].protein - 6.0).abs() < f64::EPSILON);
        assert_eq!(items[0].fibre, Some(0.0));
    }

    #[test]
    fn test_parse_prose_around_array() {
        let raw = "Sure: [{\"food\":\"banana\",\"kcal\":\"1,05\"}] hope that helps";
        let items = parse_nutrition_items(raw).unwrap_or_default();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].description, "banana");
        assert!((items[0].calories - 1.05).abs() < 1e-9);
    }

    #[test]
    fn test_number_separators() {
        assert_eq!(leading_number("1,200 kcal"), Some(1200.0));
        assert_eq!(leading_number("1,234,567"), Some(1_234_567.0));
        assert_eq!(leading_number("2,5 g"), Some(2.5));
        assert_eq!(leading_number("1,200.5"), Some(1200.5));
        assert_eq!(leading_number("about 14."), Some(14.0));
        assert_eq!(leading_number("none"), None);
    }

    #[test]
    fn test_error_object_is_malformed() {
        assert!(matches!(
            parse_nutrition_items(r#"{"error":"I cannot identify any food"}"#),
            Err(GatewayError::MalformedResponse(_))
        ));
        assert!(matches!(
            parse_nutrition_items(r#"[{"description":"mystery"}]"#),
            Err(GatewayError::MalformedResponse(_))
        ));
    }

    #[test]
    fn test_items_under_unknown_key_are_found() {
        let items = parse_nutrition_items(
            r#"{"result":[{"description":"2 eggs","calories":140}]}"#,
        );
        assert!(matches!(items, Ok(ref v) if v.len() == 1 && v[0].description == "2 eggs"));

        let single = parse_nutrition_items(r#"{"name":"apple","kcal":"95 kcal"}"#);
        assert!(matches!(single, Ok(ref v) if v.len() == 1 && v[0].description == "apple"));

        let wrapped_empty = parse_nutrition_items(r#"{"foods": []}"#);
        assert!(matches!(wrapped_empty, Ok(ref v) if v.is_empty()));
    }

    #[test]
    fn test_empty_array_is_success() {
        let items = parse_nutrition_items("[]");
        assert!(matches!(items, Ok(ref v) if v.is_empty()));
    }

    #[test]
    fn test_drops_unusable_items() {
        let raw = r#"[{"description":"","calories":10},{"description":"x"},{"description":"neg","calories":-5},{"description":"ok","calories":5}]"#;
        let items = parse_nutrition_items(raw).unwrap_or_default();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].description, "ok");
    }

    #[test]
    fn test_malformed_and_empty_replies() {
        assert!(matches!(
            parse_nutrition_items("I could not see any food."),
            Err(GatewayError::MalformedResponse(_))
        ));
        assert!(matches!(
            parse_nutrition_items("   "),
            Err(GatewayError::EmptyResponse)
        ));
    }

    #[test]
    fn test_extract_goals_block() {
        let reply = "Let's aim for this:\n```json\n{\"goals\": {\"calorie_goal\": 2300, \"protein_goal\": 170, \"carb_goal\": 260, \"fat_goal\": 70, \"weight_goal\": \"gain\"}}\n```";
        let goals = extract_goals(reply);
        assert!(goals.is_some());
        assert!(goals.is_some_and(|g| (g.protein_goal - 170.0).abs() < f64::EPSILON));
    }

    #[test]
    fn test_extract_goals_absent() {
        assert!(extract_goals("Eat more vegetables and drink water.").is_none());
        assert!(extract_goals("{\"calorie_goal\": 0, \"protein_goal\": 1, \"carb_goal\": 1, \"fat_goal\": 1}").is_none());
    }
}
