use async_trait::async_trait;
use thunai_core::{OutboundMessage, UserContext};
use thunai_transport::{EventHandlerError, MessageService};
use tracing::error;

use crate::runtime::AgentRuntime;

/// Runtime failures never reach the chat as errors; the sender gets an apology
/// instead and the failure is logged with its correlation id.
#[async_trait]
impl MessageService for AgentRuntime {
    async fn handle_message(
        &self,
        text: &str,
        ctx: &UserContext,
    ) -> Result<Option<OutboundMessage>, EventHandlerError> {
        match self.handle(text, ctx).await {
            Ok(reply) => Ok(reply),
            Err(failure) => {
                let transient = failure.is_transient();
                let interface = failure.into_interface(ctx.correlation_id.clone());
                error!(
                    event_name = "ingress.handle_failed",
                    correlation_id = %ctx.correlation_id,
                    user_id = %ctx.user_id,
                    transient,
                    error = %interface,
                    "message handling failed"
                );
                Ok(Some(OutboundMessage::apology(interface.user_message())))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use thunai_core::{OutboundKind, UserContext};
    use thunai_transport::events::{ChatEnvelope, ChatEvent, EventContext, MessageEvent};
    use thunai_transport::{dispatcher_for, MessageService};

    use crate::testing::Harness;

    #[tokio::test]
    async fn runtime_answers_through_the_transport_seam() {
        let harness = Harness::new(&["Priya"]).await;
        let reply = harness
            .runtime
            .handle_message("Priya's bday is nov 15th", &UserContext::direct("U1", "D1"))
            .await
            .expect("handled")
            .expect("reply");

        assert_eq!(reply.kind, OutboundKind::Confirmation);
    }

    #[tokio::test]
    async fn dispatcher_routes_chat_events_into_the_runtime() {
        let harness = Harness::new(&["Priya"]).await;
        let dispatcher = dispatcher_for(Arc::clone(&harness.runtime));
        let envelope = ChatEnvelope {
            envelope_id: "env-7".to_owned(),
            event: ChatEvent::Message(MessageEvent {
                channel_id: "C-TEAM".to_owned(),
                user_id: "U2".to_owned(),
                display_name: None,
                text: "anyone up for lunch?".to_owned(),
                is_group: true,
                mentions_bot: false,
            }),
        };

        let result = dispatcher
            .dispatch(&envelope, &EventContext { correlation_id: "env-7".to_owned() })
            .await
            .expect("dispatch");

        assert_eq!(result, thunai_transport::events::HandlerResult::Processed);
    }
}
