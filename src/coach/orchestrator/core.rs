//! Single-flight request orchestration per topic.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use chrono::Utc;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use futures::FutureExt;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::coach::context::assembly::{ChatContext, ContextAssembler};
use crate::coach::context::profile_source::{ProfileSource, StaticProfileSource};
use crate::coach::conversation::store::ConversationStore;
use crate::coach::core::config::{CoachConfig, ConversationConfig};
use crate::coach::core::errors::{CoachError, CoachResult};
use crate::coach::core::ids::{MessageId, RequestId, UserId};
use crate::coach::core::message::ChatMessage;
use crate::coach::core::nutrition::{FoodEntry, InputMethod, NutritionTotals};
use crate::coach::core::topic::Topic;
use crate::coach::gateway::analysis_gateway::{AnalysisGateway, MealPlanRequest};
use crate::coach::gateway::error::{GatewayError, GatewayResult};
use crate::coach::gateway::ollama::OllamaGateway;
use crate::coach::gateway::parse::extract_goals;
use crate::coach::ledger::food_ledger::{FoodLedger, InMemoryFoodLedger};
use crate::coach::ledger::sqlite_ledger::SqliteFoodLedger;
use crate::coach::orchestrator::outcome::{OrchestratorEvent, RejectReason, SubmitOutcome};
use crate::coach::orchestrator::state::{
    QuickAction, RequestKind, TopicState, UserInput, submitted_text,
};

/// Collaborators the orchestrator talks to.
pub struct CoachBackends {
    /// Nutrition/AI analysis service.
    pub gateway: Arc<dyn AnalysisGateway>,
    /// Persistence for confirmed food entries.
    pub ledger: Arc<dyn FoodLedger>,
    /// Settings collaborator.
    pub profiles: Arc<dyn ProfileSource>,
}

impl CoachBackends {
    /// Build the default backends from config: Ollama gateway, `SQLite`
    /// ledger when a path is set (in-memory otherwise), configured profile.
    ///
    /// # Errors
    /// Returns an error if the gateway or the ledger cannot be initialized.
    pub async fn from_config(config: &CoachConfig) -> CoachResult<Self> {
        let gateway = OllamaGateway::new(&config.gateway)
            .map_err(|err| CoachError::InvalidConfig(format!("gateway: {err}")))?;
        let ledger: Arc<dyn FoodLedger> = match &config.ledger.sqlite_path {
            Some(path) => Arc::new(SqliteFoodLedger::open(path).await?),
            None => Arc::new(InMemoryFoodLedger::new()),
        };

        Ok(Self {
            gateway: Arc::new(gateway),
            ledger,
            profiles: Arc::new(StaticProfileSource::new(config.profile.clone())),
        })
    }
}

/// Routes submissions to the gateway, the ledger and the conversation store.
///
/// At most one request is in flight per topic. The orchestrator owns the
/// conversation store; callers only get read access through it.
pub struct Orchestrator {
    user_id: UserId,
    conversation: ConversationConfig,
    assembler: ContextAssembler,
    store: ConversationStore,
    states: DashMap<Topic, TopicState>,
    gateway: Arc<dyn AnalysisGateway>,
    ledger: Arc<dyn FoodLedger>,
    profiles: Arc<dyn ProfileSource>,
    events: broadcast::Sender<OrchestratorEvent>,
}

impl Orchestrator {
    /// Create an orchestrator over the given backends.
    ///
    /// # Errors
    /// Returns an error if the configuration is invalid.
    pub fn new(config: CoachConfig, backends: CoachBackends) -> CoachResult<Self> {
        config.validate()?;
        let (events, _) = broadcast::channel(config.conversation.event_capacity.max(1));

        Ok(Self {
            user_id: config.user_id,
            assembler: ContextAssembler::new(config.conversation.history_window),
            conversation: config.conversation,
            store: ConversationStore::new(),
            states: DashMap::new(),
            gateway: backends.gateway,
            ledger: backends.ledger,
            profiles: backends.profiles,
            events,
        })
    }

    /// Create an orchestrator with the default backends.
    ///
    /// # Errors
    /// Returns an error if the configuration or a backend is invalid.
    pub async fn from_config(config: CoachConfig) -> CoachResult<Self> {
        let backends = CoachBackends::from_config(&config).await?;
        Self::new(config, backends)
    }

    /// Submit user input to a topic.
    ///
    /// Blank input and submissions to a busy topic are ignored. Otherwise
    /// the user message is appended, one gateway call is made and exactly
    /// one coach message is appended before the topic returns to idle.
    ///
    /// Once the topic is claimed the request runs on its own task, so
    /// dropping the returned future does not abandon it.
    pub async fn submit(self: &Arc<Self>, topic: &Topic, input: UserInput) -> SubmitOutcome {
        let Some(text) = submitted_text(&input) else {
            debug!("Ignoring empty submission on topic {topic}");
            return SubmitOutcome::Rejected {
                reason: RejectReason::EmptyInput,
            };
        };

        let kind = RequestKind::resolve(&input, self.conversation.mode_for(topic));
        let Some(mut loading) = self.claim(topic, kind) else {
            debug!("Topic {topic} is busy, dropping submission");
            return SubmitOutcome::Rejected {
                reason: RejectReason::Busy,
            };
        };

        let request_id = RequestId::new();
        info!("Request {request_id} on topic {topic}: {kind:?}");
        self.append(ChatMessage::user(topic.clone(), text.clone()));

        let input = match input {
            UserInput::Text(_) => UserInput::Text(text),
            UserInput::Voice(_) => UserInput::Voice(text),
            UserInput::Image { data, .. } => UserInput::Image {
                data,
                caption: text,
            },
        };

        let orchestrator = Arc::clone(self);
        let owned_topic = topic.clone();
        let request = tokio::spawn(async move {
            let outcome = orchestrator.dispatch(&owned_topic, kind, &input).await;
            loading.replied();
            outcome
        });

        match request.await {
            Ok(outcome) => {
                debug!("Request {request_id} finished on topic {topic}");
                outcome
            }
            Err(err) => {
                warn!("Request {request_id} on topic {topic} did not finish: {err}");
                SubmitOutcome::Failed {
                    request: kind,
                    written: 0,
                    message_id: self
                        .store
                        .last(topic)
                        .map_or_else(MessageId::new, |message| message.id()),
                }
            }
        }
    }

    async fn dispatch(
        &self,
        topic: &Topic,
        kind: RequestKind,
        input: &UserInput,
    ) -> SubmitOutcome {
        let context = self
            .assembler
            .assemble(&self.store, topic, self.profiles.as_ref());
        match kind {
            RequestKind::FoodAnalysis { method } => {
                self.log_food(topic, kind, method, input, &context).await
            }
            RequestKind::Coaching => self.coach(topic, kind, input.text(), &context).await,
            RequestKind::MealPlanning => {
                self.plan_meals(topic, kind, input.text(), &context).await
            }
        }
    }

    /// Submit typed text.
    pub async fn submit_text(
        self: &Arc<Self>,
        topic: &Topic,
        text: impl Into<String>,
    ) -> SubmitOutcome {
        self.submit(topic, UserInput::Text(text.into())).await
    }

    /// Submit a finished speech transcript.
    pub async fn submit_voice(
        self: &Arc<Self>,
        topic: &Topic,
        transcript: impl Into<String>,
    ) -> SubmitOutcome {
        self.submit(topic, UserInput::Voice(transcript.into())).await
    }

    /// Submit an encoded image for food analysis.
    pub async fn submit_image(
        self: &Arc<Self>,
        topic: &Topic,
        data: Vec<u8>,
        caption: impl Into<String>,
    ) -> SubmitOutcome {
        self.submit(
            topic,
            UserInput::Image {
                data,
                caption: caption.into(),
            },
        )
        .await
    }

    /// Submit the canned prompt of a quick action as user text.
    pub async fn submit_quick_action(
        self: &Arc<Self>,
        topic: &Topic,
        action: QuickAction,
    ) -> SubmitOutcome {
        self.submit_text(topic, action.prompt()).await
    }

    /// Append the welcome message if the topic has no history yet.
    pub fn ensure_greeting(&self, topic: &Topic) -> Option<MessageId> {
        let message = ChatMessage::coach(topic.clone(), self.conversation.greeting.clone());
        let event = OrchestratorEvent::MessageAppended {
            message: message.clone(),
        };
        let id = self.store.append_if_empty(message)?;
        self.emit(event);
        Some(id)
    }

    /// Current state of a topic.
    #[must_use]
    pub fn state(&self, topic: &Topic) -> TopicState {
        self.states.get(topic).map(|s| *s).unwrap_or_default()
    }

    /// Ordered snapshot of a topic's messages.
    #[must_use]
    pub fn messages(&self, topic: &Topic) -> Vec<ChatMessage> {
        self.store.messages(topic)
    }

    /// Whether a topic has no messages.
    #[must_use]
    pub fn is_empty(&self, topic: &Topic) -> bool {
        self.store.is_empty(topic)
    }

    /// Topics with at least one message.
    #[must_use]
    pub fn topics(&self) -> Vec<Topic> {
        self.store.topics()
    }

    /// Read-only view of the conversation store.
    #[must_use]
    pub const fn store(&self) -> &ConversationStore {
        &self.store
    }

    /// Food ledger used for confirmed entries.
    #[must_use]
    pub fn ledger(&self) -> Arc<dyn FoodLedger> {
        Arc::clone(&self.ledger)
    }

    /// Settings collaborator consulted for every request.
    #[must_use]
    pub fn profiles(&self) -> Arc<dyn ProfileSource> {
        Arc::clone(&self.profiles)
    }

    /// Owner of logged entries.
    #[must_use]
    pub const fn user_id(&self) -> UserId {
        self.user_id
    }

    /// Subscribe to state, message and ledger events.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<OrchestratorEvent> {
        self.events.subscribe()
    }

    async fn log_food(
        &self,
        topic: &Topic,
        kind: RequestKind,
        method: InputMethod,
        input: &UserInput,
        context: &ChatContext,
    ) -> SubmitOutcome {
        let analysis = guarded(async { self.gateway.analyze_food(input, context).await }).await;
        let items = match analysis {
            Ok(items) => items,
            Err(err) => {
                warn!(
                    "Food analysis failed on topic {topic}: {err} (transient: {})",
                    err.is_retryable()
                );
                return self.fail(topic, kind, 0);
            }
        };

        let timestamp = Utc::now();
        let confidence = method.default_confidence();
        let mut entries = Vec::with_capacity(items.len());
        for item in items {
            let entry = FoodEntry::from_item(self.user_id, timestamp, item, method, confidence);
            let write = AssertUnwindSafe(async { self.ledger.add(entry.clone()).await })
                .catch_unwind()
                .await;
            match write {
                Ok(Ok(())) => {
                    debug!("Logged food entry {} on topic {topic}", entry.id);
                    self.emit(OrchestratorEvent::FoodLogged {
                        topic: topic.clone(),
                        entry: entry.clone(),
                    });
                    entries.push(entry);
                }
                Ok(Err(err)) => {
                    warn!("Food ledger write failed on topic {topic}: {err}");
                    return self.fail(topic, kind, entries.len());
                }
                Err(_) => {
                    warn!("Food ledger write panicked on topic {topic}");
                    return self.fail(topic, kind, entries.len());
                }
            }
        }

        let totals = NutritionTotals::from_entries(&entries);
        let summary = format!(
            "Added {} food item(s) with {} calories to your log!",
            totals.entries,
            totals.whole_calories()
        );
        info!("Logged {} food item(s) on topic {topic}", totals.entries);
        let message_id = self.append(ChatMessage::coach(topic.clone(), summary));

        SubmitOutcome::Logged {
            entries,
            totals,
            message_id,
        }
    }

    async fn coach(
        &self,
        topic: &Topic,
        kind: RequestKind,
        text: &str,
        context: &ChatContext,
    ) -> SubmitOutcome {
        match guarded(async { self.gateway.send_message(text, context).await }).await {
            Ok(reply) => {
                let suggested_goals = extract_goals(&reply);
                if suggested_goals.is_some() {
                    debug!("Coaching reply on topic {topic} proposes new goals");
                }
                let message_id = self.append(ChatMessage::coach(topic.clone(), reply));
                SubmitOutcome::Replied {
                    message_id,
                    suggested_goals,
                }
            }
            Err(err) => {
                warn!(
                    "Coaching request failed on topic {topic}: {err} (transient: {})",
                    err.is_retryable()
                );
                self.fail(topic, kind, 0)
            }
        }
    }

    async fn plan_meals(
        &self,
        topic: &Topic,
        kind: RequestKind,
        text: &str,
        context: &ChatContext,
    ) -> SubmitOutcome {
        let request = MealPlanRequest {
            goals: text.to_string(),
            preferences: self.profiles.meal_preferences(),
        };
        let generated = guarded(async { self.gateway.generate_meal_plan(&request, context).await });
        match generated.await {
            Ok(plan) => {
                let message_id = self.append(ChatMessage::coach(topic.clone(), plan));
                SubmitOutcome::Replied {
                    message_id,
                    suggested_goals: None,
                }
            }
            Err(err) => {
                warn!(
                    "Meal plan request failed on topic {topic}: {err} (transient: {})",
                    err.is_retryable()
                );
                self.fail(topic, kind, 0)
            }
        }
    }

    fn fail(&self, topic: &Topic, request: RequestKind, written: usize) -> SubmitOutcome {
        let message_id = self.append(ChatMessage::coach(
            topic.clone(),
            request.fallback_message(),
        ));
        SubmitOutcome::Failed {
            request,
            written,
            message_id,
        }
    }

    fn append(&self, message: ChatMessage) -> MessageId {
        let event = OrchestratorEvent::MessageAppended {
            message: message.clone(),
        };
        let id = self.store.append(message);
        self.emit(event);
        id
    }

    /// Atomically move a topic from idle to loading.
    fn claim(self: &Arc<Self>, topic: &Topic, kind: RequestKind) -> Option<LoadingGuard> {
        match self.states.entry(topic.clone()) {
            Entry::Occupied(mut entry) => {
                if *entry.get() == TopicState::Loading {
                    return None;
                }
                entry.insert(TopicState::Loading);
            }
            Entry::Vacant(entry) => {
                entry.insert(TopicState::Loading);
            }
        }
        self.emit(OrchestratorEvent::StateChanged {
            topic: topic.clone(),
            state: TopicState::Loading,
        });

        Some(LoadingGuard {
            orchestrator: Arc::clone(self),
            topic: topic.clone(),
            kind,
            replied: false,
        })
    }

    fn emit(&self, event: OrchestratorEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }
}

/// Returns its topic to idle when dropped, whatever path the request took.
///
/// A request that ends without a coach message gets the fallback for its
/// kind on the way out.
struct LoadingGuard {
    orchestrator: Arc<Orchestrator>,
    topic: Topic,
    kind: RequestKind,
    replied: bool,
}

impl LoadingGuard {
    const fn replied(&mut self) {
        self.replied = true;
    }
}

impl Drop for LoadingGuard {
    fn drop(&mut self) {
        if !self.replied {
            warn!("Request on topic {} ended without a reply", self.topic);
            self.orchestrator.append(ChatMessage::coach(
                self.topic.clone(),
                self.kind.fallback_message(),
            ));
        }
        self.orchestrator
            .states
            .insert(self.topic.clone(), TopicState::Idle);
        self.orchestrator.emit(OrchestratorEvent::StateChanged {
            topic: self.topic.clone(),
            state: TopicState::Idle,
        });
    }
}

/// Await a gateway call, turning a panic into a gateway error.
async fn guarded<T>(call: impl Future<Output = GatewayResult<T>>) -> GatewayResult<T> {
    AssertUnwindSafe(call)
        .catch_unwind()
        .await
        .unwrap_or(Err(GatewayError::Panicked))
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::coach::core::nutrition::NutritionItem;
    use crate::coach::gateway::analysis_gateway::{AnalysisInput, GatewayFuture};

    #[derive(Default)]
    struct ScriptedGateway {
        items: Mutex<Option<Vec<NutritionItem>>>,
        reply: Option<String>,
    }

    impl AnalysisGateway for ScriptedGateway {
        fn analyze_food<'a>(
            &'a self,
            _input: &'a AnalysisInput,
            _context: &'a ChatContext,
        ) -> GatewayFuture<'a, GatewayResult<Vec<NutritionItem>>> {
            let items = self.items.lock().ok().and_then(|mut g| g.take());
            Box::pin(async move { items.ok_or(GatewayError::EmptyResponse) })
        }

        fn send_message<'a>(
            &'a self,
            _text: &'a str,
            _context: &'a ChatContext,
        ) -> GatewayFuture<'a, GatewayResult<String>> {
            let reply = self.reply.clone();
            Box::pin(async move { reply.ok_or(GatewayError::Timeout) })
        }

        fn generate_meal_plan<'a>(
            &'a self,
            _request: &'a MealPlanRequest,
            _context: &'a ChatContext,
        ) -> GatewayFuture<'a, GatewayResult<String>> {
            Box::pin(async { Err(GatewayError::Status(500)) })
        }
    }

    fn orchestrator(gateway: ScriptedGateway) -> Option<Arc<Orchestrator>> {
        Orchestrator::new(
            CoachConfig::default(),
            CoachBackends {
                gateway: Arc::new(gateway),
                ledger: Arc::new(InMemoryFoodLedger::new()),
                profiles: Arc::new(StaticProfileSource::default()),
            },
        )
        .ok()
        .map(Arc::new)
    }

    #[tokio::test]
    async fn test_food_logging_appends_summary() {
        let gateway = ScriptedGateway {
            items: Mutex::new(Some(vec![
                NutritionItem::new("2 eggs", 140.0, 12.0, 1.0, 10.0),
                NutritionItem::new("toast", 80.5, 3.0, 15.0, 1.0),
            ])),
            reply: None,
        };
        let orch = orchestrator(gateway);
        assert!(orch.is_some());
        let Some(orch) = orch else {
            return;
        };
        let topic = Topic::food_logging();

        let outcome = orch.submit_text(&topic, "2 eggs and toast").await;
        assert!(matches!(outcome, SubmitOutcome::Logged { ref entries, .. } if entries.len() == 2));

        let messages = orch.messages(&topic);
        assert_eq!(messages.len(), 2);
        assert_eq!(
            messages[1].text(),
            "Added 2 food item(s) with 220 calories to your log!"
        );
        assert_eq!(orch.state(&topic), TopicState::Idle);
    }

    #[tokio::test]
    async fn test_meal_plan_failure_uses_fallback() {
        let orch = orchestrator(ScriptedGateway::default());
        assert!(orch.is_some());
        let Some(orch) = orch else {
            return;
        };
        let topic = Topic::meal_planning();

        let outcome = orch.submit_text(&topic, "cheap high protein dinners").await;
        assert!(matches!(
            outcome,
            SubmitOutcome::Failed {
                request: RequestKind::MealPlanning,
                ..
            }
        ));
        assert_eq!(
            orch.store().last(&topic).map(|m| m.text().to_string()),
            Some("Sorry, I couldn't generate a meal plan. Please try again.".to_string())
        );
    }

    #[tokio::test]
    async fn test_coaching_reply_carries_goals() {
        let gateway = ScriptedGateway {
            items: Mutex::new(None),
            reply: Some(
                "Try this:\n```json\n{\"goals\":{\"calorie_goal\":1800,\"protein_goal\":140,\"carb_goal\":180,\"fat_goal\":60,\"weight_goal\":\"lose\"}}\n```"
                    .to_string(),
            ),
        };
        let orch = orchestrator(gateway);
        assert!(orch.is_some());
        let Some(orch) = orch else {
            return;
        };

        let outcome = orch
            .submit_quick_action(&Topic::coaching(), QuickAction::SetGoals)
            .await;
        assert!(matches!(
            outcome,
            SubmitOutcome::Replied { suggested_goals: Some(ref goals), .. }
                if (goals.calorie_goal - 1800.0).abs() < f64::EPSILON
        ));
        assert_eq!(
            orch.messages(&Topic::coaching())[0].text(),
            "Help me set my nutrition goals"
        );
    }

    #[tokio::test]
    async fn test_events_follow_request() {
        let orch = orchestrator(ScriptedGateway::default());
        assert!(orch.is_some());
        let Some(orch) = orch else {
            return;
        };
        let mut events = orch.subscribe();
        let topic = Topic::coaching();

        let _ = orch.submit_text(&topic, "hello").await;

        let mut seen = Vec::new();
        while let Ok(event) = events.try_recv() {
            seen.push(event);
        }
        assert!(matches!(
            seen.first(),
            Some(OrchestratorEvent::StateChanged {
                state: TopicState::Loading,
                ..
            })
        ));
        assert!(matches!(
            seen.last(),
            Some(OrchestratorEvent::StateChanged {
                state: TopicState::Idle,
                ..
            })
        ));
        let appended = seen
            .iter()
            .filter(|e| matches!(e, OrchestratorEvent::MessageAppended { .. }))
            .count();
        assert_eq!(appended, 2);
    }

    #[tokio::test]
    async fn test_greeting_only_when_empty() {
        let orch = orchestrator(ScriptedGateway::default());
        assert!(orch.is_some());
        let Some(orch) = orch else {
            return;
        };
        let topic = Topic::coaching();

        assert!(orch.ensure_greeting(&topic).is_some());
        assert!(orch.ensure_greeting(&topic).is_none());
        assert_eq!(orch.messages(&topic).len(), 1);
        assert!(orch.messages(&topic)[0].text().starts_with("G'day!"));
    }

    #[tokio::test]
    async fn test_released_claim_without_reply_appends_fallback() {
        let orch = orchestrator(ScriptedGateway::default());
        assert!(orch.is_some());
        let Some(orch) = orch else {
            return;
        };
        let topic = Topic::food_logging();
        let kind = RequestKind::FoodAnalysis {
            method: InputMethod::Text,
        };

        let loading = orch.claim(&topic, kind);
        assert!(loading.is_some());
        assert_eq!(orch.state(&topic), TopicState::Loading);
        assert!(orch.claim(&topic, kind).is_none());

        drop(loading);
        assert_eq!(orch.state(&topic), TopicState::Idle);
        assert_eq!(
            orch.store().last(&topic).map(|m| m.text().to_string()),
            Some(kind.fallback_message().to_string())
        );
    }
}
