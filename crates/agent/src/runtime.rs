use std::sync::Arc;
use std::time::Duration;

use chrono::Duration as DateDuration;
use thunai_core::audit::{AuditCategory, AuditEvent, AuditOutcome, AuditSink};
use thunai_core::config::AppConfig;
use thunai_core::{
    ApplicationError, CollectionLedger, ConversationState, ConversationStateStore,
    OutboundMessage, RecordStore, ScheduleScope, ScheduleStore, UserContext,
};
use tracing::{info, warn};

use crate::classifier::{
    ClassificationFailure, Intent, IntentClassifier, KeywordIntentClassifier, LlmIntentClassifier,
    RoutingThresholds,
};
use crate::clock::Clock;
use crate::fallback::FallbackResponder;
use crate::guardrails::{GuardrailIntent, GuardrailPolicy};
use crate::llm::{ChatMessage, LlmClient};
use crate::locks::UserLocks;
use crate::resolver::CelebrantResolver;
use crate::text::{collapse_whitespace, words};
use crate::workflow::{audit_context, target_for, ConfirmationWorkflow, WorkflowSettings};

const CASUAL_PROMPT: &str = "You are Thunai, a warm and upbeat workplace culture assistant. \
Reply in one or two friendly sentences. You help teams celebrate colleagues and share \
office plans; mention that when it fits, but never invent facts about people.";

/// Everything the runtime talks to outside its own process.
pub struct AgentPorts {
    pub states: Arc<dyn ConversationStateStore>,
    pub ledger: Arc<dyn CollectionLedger>,
    pub records: Arc<dyn RecordStore>,
    pub schedules: Arc<dyn ScheduleStore>,
    pub audit: Arc<dyn AuditSink>,
    /// `None` runs the keyword classifier and canned replies only.
    pub llm: Option<Arc<dyn LlmClient>>,
    pub clock: Arc<dyn Clock>,
}

#[derive(Clone, Debug)]
pub struct AgentSettings {
    pub workflow: WorkflowSettings,
    pub thresholds: RoutingThresholds,
    pub state_ttl: Duration,
    pub llm_timeout: Duration,
    pub email_domain: String,
    pub admin_user_ids: Vec<String>,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            workflow: WorkflowSettings::default(),
            thresholds: RoutingThresholds::default(),
            state_ttl: Duration::from_secs(30 * 60),
            llm_timeout: Duration::from_secs(30),
            email_domain: "thunai.local".to_owned(),
            admin_user_ids: Vec::new(),
        }
    }
}

impl AgentSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        let conversation = &config.conversation;
        Self {
            workflow: WorkflowSettings {
                max_clarification_attempts: conversation.max_clarification_attempts,
                min_office_days: conversation.min_office_days,
                backend_timeout: Duration::from_secs(config.backend.timeout_secs),
                dashboard_name: config.backend.dashboard_name.clone(),
                collection: config.collection.policy(),
            },
            thresholds: RoutingThresholds {
                routing: conversation.routing_threshold,
                proactive: conversation.proactive_threshold,
            },
            state_ttl: Duration::from_secs(conversation.state_ttl_secs),
            llm_timeout: Duration::from_secs(config.llm.timeout_secs),
            email_domain: config.backend.email_domain.clone(),
            admin_user_ids: conversation.admin_user_ids.clone(),
        }
    }
}

/// Entry point for every inbound chat message.
///
/// Messages from one user are handled one at a time. A user with an outstanding
/// question has their next message read as the answer to it; otherwise the message
/// is classified and routed.
pub struct AgentRuntime {
    workflow: ConfirmationWorkflow,
    states: Arc<dyn ConversationStateStore>,
    classifier: Arc<dyn IntentClassifier>,
    keywords: KeywordIntentClassifier,
    llm: Option<Arc<dyn LlmClient>>,
    fallback: FallbackResponder,
    guardrails: GuardrailPolicy,
    locks: UserLocks,
    audit: Arc<dyn AuditSink>,
    clock: Arc<dyn Clock>,
    settings: AgentSettings,
}

impl AgentRuntime {
    pub fn new(ports: AgentPorts, settings: AgentSettings) -> Self {
        let classifier: Arc<dyn IntentClassifier> = match &ports.llm {
            Some(llm) => Arc::new(LlmIntentClassifier::new(llm.clone(), settings.llm_timeout)),
            None => Arc::new(KeywordIntentClassifier),
        };
        let guardrails = GuardrailPolicy::with_dashboard(settings.workflow.dashboard_name.clone());
        let resolver = CelebrantResolver::new(
            ports.records,
            settings.email_domain.clone(),
            settings.workflow.backend_timeout,
        );
        let workflow = ConfirmationWorkflow::new(
            ports.states.clone(),
            ports.ledger,
            ports.schedules,
            resolver,
            ports.audit.clone(),
            guardrails.clone(),
            ports.clock.clone(),
            settings.workflow.clone(),
        );

        Self {
            workflow,
            states: ports.states,
            classifier,
            keywords: KeywordIntentClassifier,
            llm: ports.llm,
            fallback: FallbackResponder,
            guardrails,
            locks: UserLocks::default(),
            audit: ports.audit,
            clock: ports.clock,
            settings,
        }
    }

    pub fn settings(&self) -> &AgentSettings {
        &self.settings
    }

    /// Handles one inbound message. `None` means the message gets no reply.
    pub async fn handle(
        &self,
        text: &str,
        context: &UserContext,
    ) -> Result<Option<OutboundMessage>, ApplicationError> {
        let text = collapse_whitespace(text);
        if text.is_empty() {
            return Ok(None);
        }

        let _guard = self.locks.acquire(&context.user_id).await;
        let state = self.current_state(context).await?;
        if state.is_none() && !context.addressed_to_bot() {
            return Ok(None);
        }

        info!(
            event_name = "runtime.message_received",
            correlation_id = %context.correlation_id,
            user_id = %context.user_id,
            conversation_id = %context.conversation_id,
            awaiting = state.as_ref().map_or("none", |state| state.awaiting().as_str()),
            "handling inbound message"
        );
        self.audit.emit(
            AuditEvent::from_context(
                &audit_context(context),
                "runtime.message_received",
                AuditCategory::Ingress,
                AuditOutcome::Success,
            )
            .with_metadata("is_group", context.is_group.to_string()),
        );

        match state {
            Some(state) => self.workflow.continue_flow(context, state, &text).await,
            None => self.route(context, &text).await.map(Some),
        }
    }

    /// Proactive schedule prompt for one user. Skipped while another question is
    /// outstanding or when the collection policy says to stop asking.
    pub async fn prompt_schedule(
        &self,
        context: &UserContext,
        scope: ScheduleScope,
    ) -> Result<Option<OutboundMessage>, ApplicationError> {
        let _guard = self.locks.acquire(&context.user_id).await;
        if let Some(state) = self.current_state(context).await? {
            info!(
                event_name = "collection.prompt_deferred",
                correlation_id = %context.correlation_id,
                user_id = %context.user_id,
                awaiting = state.awaiting().as_str(),
                "user already has an outstanding question"
            );
            return Ok(None);
        }
        self.workflow.prompt_schedule(context, scope).await
    }

    /// Loads the user's state, expiring it first if it has gone stale.
    async fn current_state(
        &self,
        context: &UserContext,
    ) -> Result<Option<ConversationState>, ApplicationError> {
        let Some(state) = self.states.get(&context.user_id).await? else {
            return Ok(None);
        };
        if !state.is_stale(self.stale_cutoff()) {
            return Ok(Some(state));
        }

        info!(
            event_name = "runtime.state_expired",
            correlation_id = %context.correlation_id,
            user_id = %context.user_id,
            awaiting = state.awaiting().as_str(),
            "outstanding question expired before the reply arrived"
        );
        self.workflow.expire(context, state).await?;
        Ok(None)
    }

    async fn route(
        &self,
        context: &UserContext,
        text: &str,
    ) -> Result<OutboundMessage, ApplicationError> {
        if let Some(scope) = schedule_trigger(text) {
            let period = target_for(scope, self.clock.today());
            return self.workflow.ask_schedule(context, period).await.map(|message| {
                message.unwrap_or_else(|| OutboundMessage::reply(self.fallback.respond(text)))
            });
        }

        let mut classification = self.classifier.classify(text, context).await;
        let degraded =
            matches!(classification.failure, Some(ClassificationFailure::Unavailable(_)));
        if degraded {
            warn!(
                event_name = "runtime.degraded_classification",
                correlation_id = %context.correlation_id,
                user_id = %context.user_id,
                "language model unavailable, falling back to keyword classification"
            );
            classification = self.keywords.classify_text(text);
        }

        let intent = self.settings.thresholds.route(&classification);
        info!(
            event_name = "runtime.message_classified",
            correlation_id = %context.correlation_id,
            user_id = %context.user_id,
            intent = intent.as_str(),
            classified_as = classification.intent.as_str(),
            confidence = classification.confidence,
            degraded,
            "message routed"
        );
        self.audit.emit(
            AuditEvent::from_context(
                &audit_context(context),
                "runtime.message_classified",
                AuditCategory::Classification,
                AuditOutcome::Success,
            )
            .with_metadata("intent", intent.as_str())
            .with_metadata("confidence", format!("{:.2}", classification.confidence)),
        );

        let hints = &classification.hints;
        let routed = match intent {
            Intent::Moment => self.workflow.start_celebration(context, text, hints).await?,
            Intent::ScheduleResponse => self.workflow.start_schedule(context, text, hints).await?,
            Intent::ScheduleProactiveNeeded => {
                let scope = if words(text).iter().any(|word| word == "tomorrow") {
                    ScheduleScope::Daily
                } else {
                    ScheduleScope::Weekly
                };
                self.workflow.prompt_schedule(context, scope).await?
            }
            Intent::Administrative => Some(self.administrative(context)),
            Intent::Casual => None,
        };

        match routed {
            Some(message) => Ok(message),
            None => Ok(self.casual_reply(context, text, degraded).await),
        }
    }

    fn administrative(&self, context: &UserContext) -> OutboundMessage {
        let user_id = context.user_id.as_str();
        let intent = GuardrailIntent::AdministrativeRequest {
            user_id: user_id.to_owned(),
            is_admin: self.settings.admin_user_ids.iter().any(|admin| admin == user_id),
        };
        let decision = self.guardrails.evaluate(&intent);
        info!(
            event_name = "runtime.guardrail_evaluated",
            correlation_id = %context.correlation_id,
            user_id = %context.user_id,
            action = intent.action_key(),
            decision = ?decision,
            "administrative request evaluated"
        );
        match decision.user_message() {
            Some(message) => OutboundMessage::notice(message),
            None => OutboundMessage::notice(format!(
                "Admin tools live in the {}.",
                self.settings.workflow.dashboard_name
            )),
        }
    }

    async fn casual_reply(
        &self,
        context: &UserContext,
        text: &str,
        degraded: bool,
    ) -> OutboundMessage {
        let llm = match &self.llm {
            Some(llm) if !degraded => llm,
            _ => return OutboundMessage::reply(self.fallback.respond(text)),
        };

        let messages = [ChatMessage::system(CASUAL_PROMPT), ChatMessage::user(text)];
        match tokio::time::timeout(self.settings.llm_timeout, llm.complete(&messages)).await {
            Ok(Ok(reply)) if !reply.trim().is_empty() => OutboundMessage::reply(reply.trim()),
            Ok(Ok(_)) => OutboundMessage::reply(self.fallback.respond(text)),
            Ok(Err(error)) => {
                warn!(
                    event_name = "runtime.casual_reply_failed",
                    correlation_id = %context.correlation_id,
                    error = %error,
                    "using canned reply"
                );
                OutboundMessage::reply(self.fallback.respond(text))
            }
            Err(_) => {
                warn!(
                    event_name = "runtime.casual_reply_timeout",
                    correlation_id = %context.correlation_id,
                    timeout_secs = self.settings.llm_timeout.as_secs(),
                    "using canned reply"
                );
                OutboundMessage::reply(self.fallback.respond(text))
            }
        }
    }

    pub(crate) fn stale_cutoff(&self) -> chrono::DateTime<chrono::Utc> {
        let ttl = DateDuration::from_std(self.settings.state_ttl)
            .unwrap_or_else(|_| DateDuration::days(1));
        self.clock.now() - ttl
    }

    pub(crate) fn states(&self) -> &Arc<dyn ConversationStateStore> {
        &self.states
    }

    pub(crate) fn locks(&self) -> &UserLocks {
        &self.locks
    }

    pub(crate) fn workflow(&self) -> &ConfirmationWorkflow {
        &self.workflow
    }
}

/// A bare "week"/"weekly" or "daily"/"tomorrow" asks the bot to start collection.
fn schedule_trigger(text: &str) -> Option<ScheduleScope> {
    match words(text).as_slice() {
        [word] if word == "week" || word == "weekly" => Some(ScheduleScope::Weekly),
        [word] if word == "daily" || word == "tomorrow" => Some(ScheduleScope::Daily),
        _ => None,
    }
}
