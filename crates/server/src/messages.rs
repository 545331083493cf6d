//! HTTP ingress: chat platforms (or tests) post inbound messages here, and a
//! scheduler posts proactive schedule prompts.

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use serde::{Deserialize, Serialize};
use thunai_agent::AgentRuntime;
use thunai_core::{ScheduleScope, UserContext};
use thunai_transport::events::{
    ButtonActionEvent, ChatEnvelope, ChatEvent, EventContext, HandlerResult, MessageEvent,
};
use thunai_transport::{render_outbound, EventDispatcher, MessageTemplate};
use tracing::warn;
use uuid::Uuid;

#[derive(Clone)]
pub struct MessagesState {
    pub dispatcher: Arc<EventDispatcher>,
    pub runtime: Arc<AgentRuntime>,
}

#[derive(Debug, Deserialize)]
pub struct InboundMessage {
    pub user_id: String,
    pub conversation_id: String,
    #[serde(default)]
    pub text: String,
    /// Set instead of `text` when the user clicked a confirmation button.
    #[serde(default)]
    pub action_id: Option<String>,
    #[serde(default)]
    pub is_group: bool,
    #[serde(default)]
    pub mentions_bot: bool,
    #[serde(default)]
    pub display_name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PromptRequest {
    pub user_id: String,
    pub conversation_id: String,
    #[serde(default = "default_scope")]
    pub scope: ScheduleScope,
}

fn default_scope() -> ScheduleScope {
    ScheduleScope::Weekly
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub correlation_id: String,
    pub message: Option<MessageTemplate>,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub correlation_id: String,
    pub error: String,
}

type ApiResult = Result<Json<MessageResponse>, (StatusCode, Json<ErrorResponse>)>;

pub fn router(state: MessagesState) -> Router {
    Router::new()
        .route("/messages", post(inbound))
        .route("/collection/prompt", post(prompt))
        .with_state(state)
}

pub async fn inbound(
    State(state): State<MessagesState>,
    Json(request): Json<InboundMessage>,
) -> ApiResult {
    let correlation_id = Uuid::new_v4().to_string();
    let event = match request.action_id {
        Some(action_id) => ChatEvent::ButtonAction(ButtonActionEvent {
            channel_id: request.conversation_id,
            user_id: request.user_id,
            action_id,
            is_group: request.is_group,
        }),
        None => ChatEvent::Message(MessageEvent {
            channel_id: request.conversation_id,
            user_id: request.user_id,
            display_name: request.display_name,
            text: request.text,
            is_group: request.is_group,
            mentions_bot: request.mentions_bot,
        }),
    };
    let envelope = ChatEnvelope { envelope_id: correlation_id.clone(), event };
    let context = EventContext { correlation_id: correlation_id.clone() };

    match state.dispatcher.dispatch(&envelope, &context).await {
        Ok(HandlerResult::Responded { message, .. }) => {
            Ok(Json(MessageResponse { correlation_id, message: Some(message) }))
        }
        Ok(HandlerResult::Processed | HandlerResult::Ignored) => {
            Ok(Json(MessageResponse { correlation_id, message: None }))
        }
        Err(error) => {
            warn!(
                event_name = "ingress.http.rejected",
                correlation_id = %correlation_id,
                error = %error,
                "inbound message rejected"
            );
            Err((
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse { correlation_id, error: error.to_string() }),
            ))
        }
    }
}

pub async fn prompt(
    State(state): State<MessagesState>,
    Json(request): Json<PromptRequest>,
) -> ApiResult {
    let correlation_id = Uuid::new_v4().to_string();
    let context = UserContext::direct(request.user_id, request.conversation_id)
        .with_correlation_id(correlation_id.clone());

    match state.runtime.prompt_schedule(&context, request.scope).await {
        Ok(reply) => Ok(Json(MessageResponse {
            correlation_id,
            message: reply.as_ref().map(render_outbound),
        })),
        Err(error) => {
            let status = if error.is_transient() {
                StatusCode::SERVICE_UNAVAILABLE
            } else {
                StatusCode::INTERNAL_SERVER_ERROR
            };
            let interface = error.into_interface(correlation_id.clone());
            Err((status, Json(ErrorResponse { correlation_id, error: interface.to_string() })))
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use serde_json::{json, Value};
    use thunai_agent::{AgentPorts, AgentRuntime, AgentSettings, SystemClock};
    use thunai_core::audit::NoopAuditSink;
    use thunai_db::{InMemoryCollectionLedger, InMemoryConversationStateStore, InMemoryRecordStore};
    use thunai_transport::dispatcher_for;
    use tower::ServiceExt;

    use super::{router, MessagesState};

    async fn app() -> axum::Router {
        let records = Arc::new(InMemoryRecordStore::with_users(&["Priya"]).await);
        let runtime = Arc::new(AgentRuntime::new(
            AgentPorts {
                states: Arc::new(InMemoryConversationStateStore::default()),
                ledger: Arc::new(InMemoryCollectionLedger::default()),
                records: records.clone(),
                schedules: records,
                audit: Arc::new(NoopAuditSink),
                llm: None,
                clock: Arc::new(SystemClock),
            },
            AgentSettings { llm_timeout: Duration::from_millis(100), ..AgentSettings::default() },
        ));
        router(MessagesState { dispatcher: Arc::new(dispatcher_for(runtime.clone())), runtime })
    }

    async fn post(app: &axum::Router, path: &str, body: Value) -> (StatusCode, Value) {
        let response = app
            .clone()
            .oneshot(
                Request::post(path)
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .expect("request"),
            )
            .await
            .expect("response");
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body");
        (status, serde_json::from_slice(&bytes).expect("json"))
    }

    #[tokio::test]
    async fn celebration_is_confirmed_then_saved_over_http() {
        let app = app().await;

        let (status, first) = post(
            &app,
            "/messages",
            json!({"user_id": "U1", "conversation_id": "D1", "text": "Priya's bday is nov 15th"}),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(first["message"]["blocks"][1]["type"], "actions");

        let (_, second) = post(
            &app,
            "/messages",
            json!({"user_id": "U1", "conversation_id": "D1", "action_id": "thunai.confirm.yes.v1"}),
        )
        .await;
        let text = second["message"]["fallback_text"].as_str().expect("reply text");
        assert!(text.starts_with("🎂 Done!"));
    }

    #[tokio::test]
    async fn group_chatter_without_mention_gets_no_reply() {
        let (status, body) = post(
            &app().await,
            "/messages",
            json!({"user_id": "U1", "conversation_id": "C1", "text": "hi all", "is_group": true}),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["message"].is_null());
    }

    #[tokio::test]
    async fn unknown_actions_are_bad_requests() {
        let (status, body) = post(
            &app().await,
            "/messages",
            json!({"user_id": "U1", "conversation_id": "D1", "action_id": "nope"}),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().expect("error").contains("nope"));
    }

    #[tokio::test]
    async fn proactive_prompt_asks_once_per_outstanding_question() {
        let app = app().await;
        let request = json!({"user_id": "U9", "conversation_id": "D9", "scope": "weekly"});

        let (status, first) = post(&app, "/collection/prompt", request.clone()).await;
        assert_eq!(status, StatusCode::OK);
        assert!(first["message"]["fallback_text"].as_str().expect("question").contains("office"));

        let (_, second) = post(&app, "/collection/prompt", request).await;
        assert!(second["message"].is_null());
    }
}
