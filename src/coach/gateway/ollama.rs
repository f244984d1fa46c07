//! Analysis gateway backed by Ollama's chat API.

use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use crate::coach::context::assembly::ChatContext;
use crate::coach::core::config::GatewayConfig;
use crate::coach::core::message::{ChatMessage, Sender};
use crate::coach::core::nutrition::NutritionItem;
use crate::coach::gateway::analysis_gateway::{
    AnalysisGateway, AnalysisInput, GatewayFuture, MealPlanRequest,
};
use crate::coach::gateway::error::{GatewayError, GatewayResult};
use crate::coach::gateway::parse::parse_nutrition_items;
use crate::coach::gateway::prompt;

/// Gateway talking to `POST {base_url}/api/chat` with `stream: false`.
#[derive(Clone)]
pub struct OllamaGateway {
    client: reqwest::Client,
    chat_url: Url,
    model: String,
    vision_model: String,
    temperature: f64,
}

impl OllamaGateway {
    /// Create a new gateway from config.
    ///
    /// # Errors
    /// Returns an error if the base URL is invalid or the client cannot be built.
    pub fn new(config: &GatewayConfig) -> GatewayResult<Self> {
        let chat_url = chat_endpoint(&config.base_url)?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            chat_url,
            model: config.model.clone(),
            vision_model: config
                .vision_model
                .clone()
                .unwrap_or_else(|| config.model.clone()),
            temperature: config.temperature,
        })
    }

    async fn chat(
        &self,
        model: &str,
        messages: Vec<OllamaMessage>,
        json_output: bool,
    ) -> GatewayResult<String> {
        let body = ChatRequest {
            model,
            messages,
            stream: false,
            format: json_output.then_some("json"),
            options: ChatOptions {
                temperature: self.temperature,
            },
        };

        debug!("Calling analysis service model {model}");
        let response = self
            .client
            .post(self.chat_url.clone())
            .json(&body)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(GatewayError::Status(status.as_u16()));
        }

        let parsed: ChatResponse = response.json().await.map_err(transport_error)?;
        let content = parsed.message.content.trim().to_string();
        if content.is_empty() {
            return Err(GatewayError::EmptyResponse);
        }
        Ok(content)
    }
}

impl AnalysisGateway for OllamaGateway {
    fn analyze_food<'a>(
        &'a self,
        input: &'a AnalysisInput,
        context: &'a ChatContext,
    ) -> GatewayFuture<'a, GatewayResult<Vec<NutritionItem>>> {
        Box::pin(async move {
            let (model, images) = match input {
                AnalysisInput::Image { data, .. } => {
                    if data.is_empty() {
                        return Err(GatewayError::InvalidInput("image is empty".to_string()));
                    }
                    (self.vision_model.as_str(), Some(vec![STANDARD.encode(data)]))
                }
                AnalysisInput::Text(_) | AnalysisInput::Voice(_) => (self.model.as_str(), None),
            };

            let messages = vec![
                OllamaMessage::new("system", prompt::food_analysis_system(context)),
                OllamaMessage {
                    images,
                    ..OllamaMessage::new("user", prompt::food_analysis_user(input))
                },
            ];

            let reply = self.chat(model, messages, true).await?;
            parse_nutrition_items(&reply)
        })
    }

    fn send_message<'a>(
        &'a self,
        text: &'a str,
        context: &'a ChatContext,
    ) -> GatewayFuture<'a, GatewayResult<String>> {
        Box::pin(async move {
            let messages = conversation_messages(
                prompt::coaching_system(context),
                &context.conversation_history,
                text,
            );
            self.chat(&self.model, messages, false).await
        })
    }

    fn generate_meal_plan<'a>(
        &'a self,
        request: &'a MealPlanRequest,
        context: &'a ChatContext,
    ) -> GatewayFuture<'a, GatewayResult<String>> {
        Box::pin(async move {
            let messages = vec![OllamaMessage::new(
                "user",
                prompt::meal_plan_prompt(request, context),
            )];
            self.chat(&self.model, messages, false).await
        })
    }
}

/// Resolve the chat endpoint under a base URL.
fn chat_endpoint(base_url: &str) -> GatewayResult<Url> {
    let mut base = Url::parse(base_url)?;
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    Ok(base.join("api/chat")?)
}

/// Map the history onto chat roles, then add `text` unless the history
/// already ends with it as the user's turn.
fn conversation_messages(
    system: String,
    history: &[ChatMessage],
    text: &str,
) -> Vec<OllamaMessage> {
    let mut messages = Vec::with_capacity(history.len() + 2);
    messages.push(OllamaMessage::new("system", system));
    messages.extend(history.iter().map(|message| {
        let role = match message.sender() {
            Sender::User => "user",
            Sender::Coach => "assistant",
        };
        OllamaMessage::new(role, message.text())
    }));

    let already_last = history
        .last()
        .is_some_and(|last| last.is_from_user() && last.text() == text);
    if !already_last {
        messages.push(OllamaMessage::new("user", text));
    }
    messages
}

fn transport_error(err: reqwest::Error) -> GatewayError {
    if err.is_timeout() {
        GatewayError::Timeout
    } else if err.is_decode() {
        GatewayError::MalformedResponse(err.to_string())
    } else {
        GatewayError::HttpRequest(err)
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<OllamaMessage>,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    format: Option<&'static str>,
    options: ChatOptions,
}

#[derive(Debug, Serialize)]
struct ChatOptions {
    temperature: f64,
}

#[derive(Debug, Serialize)]
struct OllamaMessage {
    role: &'static str,
    content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    images: Option<Vec<String>>,
}

impl OllamaMessage {
    fn new(role: &'static str, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            images: None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    #[serde(default)]
    content: String,
}
