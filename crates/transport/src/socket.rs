use std::{sync::Arc, time::Duration};

use anyhow::Result;
use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::blocks::MessageTemplate;
use crate::events::{ChatEnvelope, EventContext, EventDispatcher, HandlerResult};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("transport failed to connect: {0}")]
    Connect(String),
    #[error("transport read failed: {0}")]
    Receive(String),
    #[error("transport ack failed: {0}")]
    Acknowledge(String),
    #[error("transport send failed: {0}")]
    Send(String),
    #[error("transport disconnect failed: {0}")]
    Disconnect(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self { max_retries: 5, base_delay_ms: 250, max_delay_ms: 5_000 }
    }
}

impl ReconnectPolicy {
    fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.min(16);
        let multiplier = 1_u64 << exponent;
        let delay_ms = self.base_delay_ms.saturating_mul(multiplier).min(self.max_delay_ms);
        Duration::from_millis(delay_ms)
    }
}

#[async_trait]
pub trait SocketTransport: Send + Sync {
    async fn connect(&self) -> Result<(), TransportError>;
    async fn next_envelope(&self) -> Result<Option<ChatEnvelope>, TransportError>;
    async fn acknowledge(&self, envelope_id: &str) -> Result<(), TransportError>;
    async fn send(
        &self,
        channel_id: &str,
        message: &MessageTemplate,
    ) -> Result<(), TransportError>;
    async fn disconnect(&self) -> Result<(), TransportError>;

    fn is_noop(&self) -> bool {
        false
    }
}

#[derive(Default)]
pub struct NoopSocketTransport;

#[async_trait]
impl SocketTransport for NoopSocketTransport {
    async fn connect(&self) -> Result<(), TransportError> {
        Ok(())
    }

    async fn next_envelope(&self) -> Result<Option<ChatEnvelope>, TransportError> {
        Ok(None)
    }

    async fn acknowledge(&self, _envelope_id: &str) -> Result<(), TransportError> {
        Ok(())
    }

    async fn send(
        &self,
        _channel_id: &str,
        _message: &MessageTemplate,
    ) -> Result<(), TransportError> {
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), TransportError> {
        Ok(())
    }

    fn is_noop(&self) -> bool {
        true
    }
}

pub struct SocketModeRunner {
    transport: Arc<dyn SocketTransport>,
    dispatcher: EventDispatcher,
    reconnect_policy: ReconnectPolicy,
}

impl SocketModeRunner {
    pub fn new(
        transport: Arc<dyn SocketTransport>,
        dispatcher: EventDispatcher,
        reconnect_policy: ReconnectPolicy,
    ) -> Self {
        Self { transport, dispatcher, reconnect_policy }
    }

    /// A runner whose transport never yields an event.
    pub fn idle(dispatcher: EventDispatcher) -> Self {
        Self::new(Arc::new(NoopSocketTransport), dispatcher, ReconnectPolicy::default())
    }

    pub fn is_idle(&self) -> bool {
        self.transport.is_noop()
    }

    pub async fn start(&self) -> Result<()> {
        for attempt in 0..=self.reconnect_policy.max_retries {
            match self.connect_and_pump(attempt).await {
                Ok(()) => return Ok(()),
                Err(transport_error) => {
                    warn!(
                        event_name = "ingress.socket.failed",
                        attempt,
                        max_retries = self.reconnect_policy.max_retries,
                        error = %transport_error,
                        "socket transport failed"
                    );

                    if attempt >= self.reconnect_policy.max_retries {
                        warn!(
                            event_name = "ingress.socket.retries_exhausted",
                            max_retries = self.reconnect_policy.max_retries,
                            "socket retries exhausted; continuing process without crash"
                        );
                        return Ok(());
                    }

                    let delay = self.reconnect_policy.backoff(attempt);
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        }

        Ok(())
    }

    async fn connect_and_pump(&self, attempt: u32) -> Result<(), TransportError> {
        info!(event_name = "ingress.socket.connecting", attempt, "opening socket connection");
        self.transport.connect().await?;
        info!(event_name = "ingress.socket.connected", attempt, "socket connected");

        loop {
            let Some(envelope) = self.transport.next_envelope().await? else {
                info!(event_name = "ingress.socket.closed", attempt, "socket stream closed");
                self.transport.disconnect().await?;
                return Ok(());
            };
            let user_id = envelope.event.user_id().unwrap_or("unknown");
            let channel_id = envelope.event.channel_id().unwrap_or("unknown");

            info!(
                event_name = "ingress.message.received",
                envelope_id = %envelope.envelope_id,
                event_type = ?envelope.event.event_type(),
                correlation_id = %envelope.envelope_id,
                user_id,
                conversation_id = channel_id,
                "received chat envelope"
            );

            if let Err(error) = self.transport.acknowledge(&envelope.envelope_id).await {
                warn!(
                    event_name = "ingress.socket.ack_failed",
                    envelope_id = %envelope.envelope_id,
                    correlation_id = %envelope.envelope_id,
                    error = %error,
                    "failed to acknowledge chat envelope"
                );
            } else {
                debug!(
                    event_name = "ingress.socket.ack_sent",
                    envelope_id = %envelope.envelope_id,
                    correlation_id = %envelope.envelope_id,
                    "acknowledged chat envelope"
                );
            }

            let context = EventContext { correlation_id: envelope.envelope_id.clone() };
            match self.dispatcher.dispatch(&envelope, &context).await {
                Ok(HandlerResult::Responded { channel_id, message }) => {
                    self.transport.send(&channel_id, &message).await?;
                    debug!(
                        event_name = "egress.message.sent",
                        correlation_id = %envelope.envelope_id,
                        conversation_id = %channel_id,
                        "reply delivered"
                    );
                }
                Ok(HandlerResult::Processed | HandlerResult::Ignored) => {}
                Err(error) => {
                    warn!(
                        event_name = "ingress.dispatch_failed",
                        envelope_id = %envelope.envelope_id,
                        correlation_id = %envelope.envelope_id,
                        user_id,
                        error = %error,
                        "event dispatch failed; continuing socket loop"
                    );
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Arc;

    use async_trait::async_trait;
    use thunai_core::OutboundMessage;
    use tokio::sync::Mutex;

    use super::{ReconnectPolicy, SocketModeRunner, SocketTransport, TransportError};
    use crate::blocks::MessageTemplate;
    use crate::events::tests::{message, RecordingService};
    use crate::events::{dispatcher_for, ChatEnvelope, ChatEvent, EventDispatcher};

    #[derive(Default)]
    struct ScriptedTransport {
        state: Mutex<ScriptedState>,
    }

    #[derive(Default)]
    struct ScriptedState {
        connect_results: VecDeque<Result<(), TransportError>>,
        envelopes: VecDeque<Result<Option<ChatEnvelope>, TransportError>>,
        connect_attempts: usize,
        acknowledgements: Vec<String>,
        sent: Vec<(String, MessageTemplate)>,
    }

    impl ScriptedTransport {
        fn with_script(
            connect_results: Vec<Result<(), TransportError>>,
            envelopes: Vec<Result<Option<ChatEnvelope>, TransportError>>,
        ) -> Self {
            Self {
                state: Mutex::new(ScriptedState {
                    connect_results: connect_results.into(),
                    envelopes: envelopes.into(),
                    ..ScriptedState::default()
                }),
            }
        }
    }

    #[async_trait]
    impl SocketTransport for ScriptedTransport {
        async fn connect(&self) -> Result<(), TransportError> {
            let mut state = self.state.lock().await;
            state.connect_attempts += 1;
            state.connect_results.pop_front().unwrap_or(Ok(()))
        }

        async fn next_envelope(&self) -> Result<Option<ChatEnvelope>, TransportError> {
            self.state.lock().await.envelopes.pop_front().unwrap_or(Ok(None))
        }

        async fn acknowledge(&self, envelope_id: &str) -> Result<(), TransportError> {
            self.state.lock().await.acknowledgements.push(envelope_id.to_owned());
            Ok(())
        }

        async fn send(
            &self,
            channel_id: &str,
            message: &MessageTemplate,
        ) -> Result<(), TransportError> {
            self.state.lock().await.sent.push((channel_id.to_owned(), message.clone()));
            Ok(())
        }

        async fn disconnect(&self) -> Result<(), TransportError> {
            Ok(())
        }
    }

    fn no_delay(max_retries: u32) -> ReconnectPolicy {
        ReconnectPolicy { max_retries, base_delay_ms: 0, max_delay_ms: 0 }
    }

    #[tokio::test]
    async fn reconnects_after_initial_connect_failure() {
        let transport = Arc::new(ScriptedTransport::with_script(
            vec![Err(TransportError::Connect("network down".to_owned())), Ok(())],
            vec![
                Ok(Some(ChatEnvelope {
                    envelope_id: "env-1".to_owned(),
                    event: ChatEvent::Unsupported { event_type: "test".to_owned() },
                })),
                Ok(None),
            ],
        ));

        let runner =
            SocketModeRunner::new(transport.clone(), EventDispatcher::default(), no_delay(2));
        runner.start().await.expect("runner should not fail");

        let state = transport.state.lock().await;
        assert_eq!(state.connect_attempts, 2);
        assert_eq!(state.acknowledgements, vec!["env-1"]);
        assert!(state.sent.is_empty());
    }

    #[tokio::test]
    async fn exhausts_retries_without_crashing() {
        let transport = Arc::new(ScriptedTransport::with_script(
            vec![
                Err(TransportError::Connect("fail-1".to_owned())),
                Err(TransportError::Connect("fail-2".to_owned())),
                Err(TransportError::Connect("fail-3".to_owned())),
            ],
            vec![],
        ));

        let runner =
            SocketModeRunner::new(transport.clone(), EventDispatcher::default(), no_delay(2));
        runner.start().await.expect("runner should degrade gracefully");

        assert_eq!(transport.state.lock().await.connect_attempts, 3);
    }

    #[tokio::test]
    async fn replies_are_sent_back_to_the_originating_channel() {
        let transport = Arc::new(ScriptedTransport::with_script(
            vec![Ok(())],
            vec![Ok(Some(message("env-1", "hello"))), Ok(None)],
        ));
        let service = RecordingService {
            reply: Some(OutboundMessage::reply("Hi! 👋")),
            ..RecordingService::default()
        };

        let runner = SocketModeRunner::new(transport.clone(), dispatcher_for(service), no_delay(0));
        runner.start().await.expect("runner completes");

        let state = transport.state.lock().await;
        assert_eq!(state.sent.len(), 1);
        assert_eq!(state.sent[0].0, "D1");
        assert_eq!(state.sent[0].1.fallback_text, "Hi! 👋");
    }

    #[test]
    fn backoff_is_capped() {
        let policy = ReconnectPolicy { max_retries: 5, base_delay_ms: 250, max_delay_ms: 1_000 };
        assert_eq!(policy.backoff(0).as_millis(), 250);
        assert_eq!(policy.backoff(1).as_millis(), 500);
        assert_eq!(policy.backoff(4).as_millis(), 1_000);
    }

    #[test]
    fn idle_runner_reports_noop_transport() {
        assert!(SocketModeRunner::idle(EventDispatcher::default()).is_idle());
    }
}
