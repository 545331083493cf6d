use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use thunai_core::audit::InMemoryAuditSink;
use thunai_core::{AttemptReason, Awaiting, ConversationStateStore, OutboundMessage, UserContext};
use thunai_db::{InMemoryCollectionLedger, InMemoryConversationStateStore, InMemoryRecordStore};

use crate::clock::FixedClock;
use crate::llm::{ChatMessage, LlmClient};
use crate::runtime::{AgentPorts, AgentRuntime, AgentSettings};

/// Replays canned completions in order and records every prompt it receives.
#[derive(Default)]
pub(crate) struct ScriptedLlm {
    replies: Mutex<VecDeque<String>>,
    failure: Option<String>,
    calls: Mutex<Vec<Vec<ChatMessage>>>,
}

impl ScriptedLlm {
    pub(crate) fn new<'a>(replies: impl IntoIterator<Item = &'a str>) -> Self {
        Self {
            replies: Mutex::new(replies.into_iter().map(str::to_owned).collect()),
            ..Self::default()
        }
    }

    pub(crate) fn failing(message: &str) -> Self {
        Self { failure: Some(message.to_owned()), ..Self::default() }
    }

    pub(crate) fn calls(&self) -> Vec<Vec<ChatMessage>> {
        self.calls.lock().expect("calls lock").clone()
    }
}

#[async_trait]
impl LlmClient for ScriptedLlm {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String> {
        self.calls.lock().expect("calls lock").push(messages.to_vec());
        if let Some(failure) = &self.failure {
            return Err(anyhow!(failure.clone()));
        }
        self.replies
            .lock()
            .expect("replies lock")
            .pop_front()
            .ok_or_else(|| anyhow!("scripted replies exhausted"))
    }
}

/// Never answers within any reasonable timeout.
pub(crate) struct SlowLlm;

#[async_trait]
impl LlmClient for SlowLlm {
    async fn complete(&self, _messages: &[ChatMessage]) -> Result<String> {
        tokio::time::sleep(Duration::from_secs(30)).await;
        Ok(r#"{"intent":"moment","confidence":0.99}"#.to_owned())
    }
}

/// Friday 16 October 2026, 09:00 UTC.
pub(crate) fn friday_morning() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 10, 16, 9, 0, 0).single().expect("valid instant")
}

/// Runtime wired to in-memory stores and a fixed clock.
pub(crate) struct Harness {
    pub(crate) states: Arc<InMemoryConversationStateStore>,
    pub(crate) ledger: Arc<InMemoryCollectionLedger>,
    pub(crate) records: Arc<InMemoryRecordStore>,
    pub(crate) audit: InMemoryAuditSink,
    pub(crate) clock: Arc<FixedClock>,
    pub(crate) runtime: Arc<AgentRuntime>,
}

impl Harness {
    pub(crate) async fn new(users: &[&str]) -> Self {
        Self::with_llm(users, None).await
    }

    pub(crate) async fn with_llm(users: &[&str], llm: Option<Arc<dyn LlmClient>>) -> Self {
        let states = Arc::new(InMemoryConversationStateStore::default());
        let ledger = Arc::new(InMemoryCollectionLedger::default());
        let records = Arc::new(InMemoryRecordStore::with_users(users).await);
        let audit = InMemoryAuditSink::default();
        let clock = Arc::new(FixedClock::new(friday_morning()));
        let settings = AgentSettings {
            llm_timeout: Duration::from_millis(200),
            email_domain: "example.com".to_owned(),
            admin_user_ids: vec!["U-ADMIN".to_owned()],
            ..AgentSettings::default()
        };
        let runtime = AgentRuntime::new(
            AgentPorts {
                states: states.clone(),
                ledger: ledger.clone(),
                records: records.clone(),
                schedules: records.clone(),
                audit: Arc::new(audit.clone()),
                llm,
                clock: clock.clone(),
            },
            settings,
        );
        Self { states, ledger, records, audit, clock, runtime: Arc::new(runtime) }
    }

    pub(crate) async fn say(&self, context: &UserContext, text: &str) -> Option<OutboundMessage> {
        self.runtime.handle(text, context).await.expect("message handled")
    }

    pub(crate) async fn awaiting(&self, context: &UserContext) -> Awaiting {
        self.states
            .get(&context.user_id)
            .await
            .expect("state readable")
            .map_or(Awaiting::None, |state| state.awaiting())
    }

    pub(crate) async fn reasons(&self) -> Vec<AttemptReason> {
        self.ledger.all().await.into_iter().filter_map(|attempt| attempt.reason).collect()
    }
}
