use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use thiserror::Error;
use thunai_core::{OutboundMessage, UserContext};
use tokio::sync::Mutex;

use crate::blocks::{render_outbound, MessageTemplate, CONFIRM_NO_ACTION, CONFIRM_YES_ACTION};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChatEnvelope {
    pub envelope_id: String,
    pub event: ChatEvent,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ChatEvent {
    Message(MessageEvent),
    ButtonAction(ButtonActionEvent),
    Unsupported { event_type: String },
}

impl ChatEvent {
    pub fn event_type(&self) -> ChatEventType {
        match self {
            Self::Message(_) => ChatEventType::Message,
            Self::ButtonAction(_) => ChatEventType::ButtonAction,
            Self::Unsupported { .. } => ChatEventType::Unsupported,
        }
    }

    pub fn user_id(&self) -> Option<&str> {
        match self {
            Self::Message(event) => Some(&event.user_id),
            Self::ButtonAction(event) => Some(&event.user_id),
            Self::Unsupported { .. } => None,
        }
    }

    pub fn channel_id(&self) -> Option<&str> {
        match self {
            Self::Message(event) => Some(&event.channel_id),
            Self::ButtonAction(event) => Some(&event.channel_id),
            Self::Unsupported { .. } => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ChatEventType {
    Message,
    ButtonAction,
    Unsupported,
}

/// A text message posted in a direct or group conversation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MessageEvent {
    pub channel_id: String,
    pub user_id: String,
    pub display_name: Option<String>,
    pub text: String,
    pub is_group: bool,
    pub mentions_bot: bool,
}

/// A click on one of the buttons rendered under a confirmation question.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ButtonActionEvent {
    pub channel_id: String,
    pub user_id: String,
    pub action_id: String,
    pub is_group: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EventContext {
    pub correlation_id: String,
}

impl Default for EventContext {
    fn default() -> Self {
        Self { correlation_id: "unknown-correlation-id".to_owned() }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HandlerResult {
    Responded { channel_id: String, message: MessageTemplate },
    Processed,
    Ignored,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EventHandlerError {
    #[error("conversation handler failure: {0}")]
    Conversation(String),
    #[error("unknown button action `{0}`")]
    UnknownAction(String),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DispatchError {
    #[error(transparent)]
    Handler(#[from] EventHandlerError),
}

#[async_trait]
pub trait EventHandler: Send + Sync {
    fn event_type(&self) -> ChatEventType;
    async fn handle(
        &self,
        envelope: &ChatEnvelope,
        ctx: &EventContext,
    ) -> Result<HandlerResult, EventHandlerError>;
}

#[derive(Default)]
pub struct EventDispatcher {
    handlers: HashMap<ChatEventType, Arc<dyn EventHandler>>,
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<H>(&mut self, handler: H)
    where
        H: EventHandler + 'static,
    {
        self.handlers.insert(handler.event_type(), Arc::new(handler));
    }

    pub async fn dispatch(
        &self,
        envelope: &ChatEnvelope,
        ctx: &EventContext,
    ) -> Result<HandlerResult, DispatchError> {
        let Some(handler) = self.handlers.get(&envelope.event.event_type()) else {
            return Ok(HandlerResult::Ignored);
        };

        handler.handle(envelope, ctx).await.map_err(DispatchError::from)
    }

    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }
}

/// The conversation runtime as seen from the transport.
#[async_trait]
pub trait MessageService: Send + Sync {
    async fn handle_message(
        &self,
        text: &str,
        ctx: &UserContext,
    ) -> Result<Option<OutboundMessage>, EventHandlerError>;
}

#[async_trait]
impl<S> MessageService for Arc<S>
where
    S: MessageService + ?Sized,
{
    async fn handle_message(
        &self,
        text: &str,
        ctx: &UserContext,
    ) -> Result<Option<OutboundMessage>, EventHandlerError> {
        (**self).handle_message(text, ctx).await
    }
}

/// Remembers the last thing the bot said in each conversation so the runtime can
/// corroborate names against it.
#[derive(Clone, Default)]
pub struct UtteranceMemory {
    last: Arc<Mutex<HashMap<String, String>>>,
}

impl UtteranceMemory {
    pub async fn last(&self, channel_id: &str) -> Option<String> {
        self.last.lock().await.get(channel_id).cloned()
    }

    pub async fn remember(&self, channel_id: &str, text: &str) {
        self.last.lock().await.insert(channel_id.to_owned(), text.to_owned());
    }
}

pub fn dispatcher_for<S>(service: S) -> EventDispatcher
where
    S: MessageService + Clone + 'static,
{
    let memory = UtteranceMemory::default();
    let mut dispatcher = EventDispatcher::new();
    dispatcher.register(MessageHandler::new(service.clone(), memory.clone()));
    dispatcher.register(ButtonActionHandler::new(service, memory));
    dispatcher
}

pub struct MessageHandler<S> {
    service: S,
    memory: UtteranceMemory,
}

impl<S> MessageHandler<S>
where
    S: MessageService,
{
    pub fn new(service: S, memory: UtteranceMemory) -> Self {
        Self { service, memory }
    }
}

#[async_trait]
impl<S> EventHandler for MessageHandler<S>
where
    S: MessageService + 'static,
{
    fn event_type(&self) -> ChatEventType {
        ChatEventType::Message
    }

    async fn handle(
        &self,
        envelope: &ChatEnvelope,
        ctx: &EventContext,
    ) -> Result<HandlerResult, EventHandlerError> {
        let ChatEvent::Message(event) = &envelope.event else {
            return Ok(HandlerResult::Ignored);
        };

        let mut user = UserContext::direct(event.user_id.as_str(), event.channel_id.as_str())
            .with_correlation_id(ctx.correlation_id.clone());
        if event.is_group {
            user = user.in_group(event.mentions_bot);
        }
        if let Some(name) = &event.display_name {
            user = user.with_display_name(name.clone());
        }
        if let Some(prior) = self.memory.last(&event.channel_id).await {
            user = user.with_prior_utterance(prior);
        }

        let reply = self.service.handle_message(&event.text, &user).await?;
        respond(&self.memory, &event.channel_id, reply).await
    }
}

pub struct ButtonActionHandler<S> {
    service: S,
    memory: UtteranceMemory,
}

impl<S> ButtonActionHandler<S>
where
    S: MessageService,
{
    pub fn new(service: S, memory: UtteranceMemory) -> Self {
        Self { service, memory }
    }
}

#[async_trait]
impl<S> EventHandler for ButtonActionHandler<S>
where
    S: MessageService + 'static,
{
    fn event_type(&self) -> ChatEventType {
        ChatEventType::ButtonAction
    }

    async fn handle(
        &self,
        envelope: &ChatEnvelope,
        ctx: &EventContext,
    ) -> Result<HandlerResult, EventHandlerError> {
        let ChatEvent::ButtonAction(event) = &envelope.event else {
            return Ok(HandlerResult::Ignored);
        };

        // Buttons answer the numbered options printed in the confirmation text.
        let text = match event.action_id.as_str() {
            CONFIRM_YES_ACTION => "1",
            CONFIRM_NO_ACTION => "2",
            other => return Err(EventHandlerError::UnknownAction(other.to_owned())),
        };

        let mut user = UserContext::direct(event.user_id.as_str(), event.channel_id.as_str())
            .with_correlation_id(ctx.correlation_id.clone());
        if event.is_group {
            // Clicking the bot's own button counts as addressing it.
            user = user.in_group(true);
        }

        let reply = self.service.handle_message(text, &user).await?;
        respond(&self.memory, &event.channel_id, reply).await
    }
}

async fn respond(
    memory: &UtteranceMemory,
    channel_id: &str,
    reply: Option<OutboundMessage>,
) -> Result<HandlerResult, EventHandlerError> {
    let Some(reply) = reply else {
        return Ok(HandlerResult::Processed);
    };

    memory.remember(channel_id, &reply.text).await;
    Ok(HandlerResult::Responded {
        channel_id: channel_id.to_owned(),
        message: render_outbound(&reply),
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use thunai_core::{OutboundMessage, UserContext};
    use tokio::sync::Mutex;

    use super::{
        dispatcher_for, ButtonActionEvent, ChatEnvelope, ChatEvent, EventContext,
        EventHandlerError, HandlerResult, MessageEvent, MessageService,
    };
    use crate::blocks::{Block, CONFIRM_NO_ACTION, CONFIRM_YES_ACTION};

    /// Records every call and answers with a scripted reply.
    #[derive(Clone, Default)]
    pub(crate) struct RecordingService {
        pub calls: Arc<Mutex<Vec<(String, UserContext)>>>,
        pub reply: Option<OutboundMessage>,
    }

    #[async_trait]
    impl MessageService for RecordingService {
        async fn handle_message(
            &self,
            text: &str,
            ctx: &UserContext,
        ) -> Result<Option<OutboundMessage>, EventHandlerError> {
            self.calls.lock().await.push((text.to_owned(), ctx.clone()));
            Ok(self.reply.clone())
        }
    }

    pub(crate) fn message(envelope_id: &str, text: &str) -> ChatEnvelope {
        ChatEnvelope {
            envelope_id: envelope_id.to_owned(),
            event: ChatEvent::Message(MessageEvent {
                channel_id: "D1".to_owned(),
                user_id: "U1".to_owned(),
                display_name: Some("Asha".to_owned()),
                text: text.to_owned(),
                is_group: false,
                mentions_bot: false,
            }),
        }
    }

    fn button(action_id: &str) -> ChatEnvelope {
        ChatEnvelope {
            envelope_id: "env-button".to_owned(),
            event: ChatEvent::ButtonAction(ButtonActionEvent {
                channel_id: "D1".to_owned(),
                user_id: "U1".to_owned(),
                action_id: action_id.to_owned(),
                is_group: false,
            }),
        }
    }

    #[tokio::test]
    async fn message_reaches_service_with_sender_context() {
        let service = RecordingService {
            reply: Some(OutboundMessage::reply("Hello there!")),
            ..RecordingService::default()
        };
        let dispatcher = dispatcher_for(service.clone());
        let ctx = EventContext { correlation_id: "req-1".to_owned() };

        let result = dispatcher.dispatch(&message("env-1", "hi"), &ctx).await.expect("dispatch");

        assert!(matches!(
            result,
            HandlerResult::Responded { ref channel_id, .. } if channel_id == "D1"
        ));
        let calls = service.calls.lock().await;
        let (text, user) = &calls[0];
        assert_eq!(text, "hi");
        assert_eq!(user.user_id.as_str(), "U1");
        assert_eq!(user.correlation_id, "req-1");
        assert_eq!(user.display_name.as_deref(), Some("Asha"));
        assert!(user.prior_bot_utterance.is_none());
    }

    #[tokio::test]
    async fn later_messages_carry_the_previous_bot_utterance() {
        let service = RecordingService {
            reply: Some(OutboundMessage::question("Who should we celebrate?")),
            ..RecordingService::default()
        };
        let dispatcher = dispatcher_for(service.clone());
        let ctx = EventContext::default();

        dispatcher.dispatch(&message("env-1", "let's celebrate"), &ctx).await.expect("first");
        dispatcher.dispatch(&message("env-2", "Priya"), &ctx).await.expect("second");

        let calls = service.calls.lock().await;
        assert_eq!(calls[1].1.prior_bot_utterance.as_deref(), Some("Who should we celebrate?"));
    }

    #[tokio::test]
    async fn buttons_map_to_numbered_answers() {
        let service = RecordingService::default();
        let dispatcher = dispatcher_for(service.clone());
        let ctx = EventContext::default();

        let result = dispatcher.dispatch(&button(CONFIRM_YES_ACTION), &ctx).await.expect("yes");
        assert_eq!(result, HandlerResult::Processed);
        dispatcher.dispatch(&button(CONFIRM_NO_ACTION), &ctx).await.expect("no");

        let texts: Vec<String> =
            service.calls.lock().await.iter().map(|(text, _)| text.clone()).collect();
        assert_eq!(texts, vec!["1", "2"]);
    }

    #[tokio::test]
    async fn unknown_buttons_are_rejected() {
        let dispatcher = dispatcher_for(RecordingService::default());
        let error = dispatcher
            .dispatch(&button("thunai.unknown.v1"), &EventContext::default())
            .await
            .expect_err("unknown action");
        assert!(error.to_string().contains("thunai.unknown.v1"));
    }

    #[tokio::test]
    async fn confirmations_render_with_buttons() {
        let service = RecordingService {
            reply: Some(OutboundMessage::confirmation("Save it? (1) Yes (2) No")),
            ..RecordingService::default()
        };
        let dispatcher = dispatcher_for(service);

        let result = dispatcher
            .dispatch(&message("env-1", "Priya's bday is nov 15th"), &EventContext::default())
            .await
            .expect("dispatch");

        let HandlerResult::Responded { message, .. } = result else {
            panic!("expected a response");
        };
        assert!(message.blocks.iter().any(|block| matches!(block, Block::Actions { .. })));
    }

    #[tokio::test]
    async fn unsupported_events_are_ignored() {
        let dispatcher = dispatcher_for(RecordingService::default());
        let envelope = ChatEnvelope {
            envelope_id: "env-x".to_owned(),
            event: ChatEvent::Unsupported { event_type: "reaction_added".to_owned() },
        };
        let result = dispatcher.dispatch(&envelope, &EventContext::default()).await.expect("ok");
        assert_eq!(result, HandlerResult::Ignored);
        assert_eq!(dispatcher_for(RecordingService::default()).handler_count(), 2);
    }
}
