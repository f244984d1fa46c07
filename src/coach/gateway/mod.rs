//! Analysis gateway: contract, Ollama client, and reply parsing.

pub mod analysis_gateway;
pub mod error;
pub mod ollama;
pub mod parse;
pub mod prompt;

pub use analysis_gateway::{AnalysisGateway, AnalysisInput, GatewayFuture, MealPlanRequest};
pub use error::{GatewayError, GatewayResult};
pub use ollama::OllamaGateway;
pub use parse::{extract_goals, parse_nutrition_items};
