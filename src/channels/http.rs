//! HTTP transport — `POST /api/messages` takes one activity and answers with
//! the replies of that turn.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{Value, json};
use tower_http::cors::CorsLayer;
use tracing::{error, warn};

use crate::bot::{ConversationController, EventKind, InboundEvent, Participant};
use crate::channels::transcript::{Delivered, Transcript};
use crate::dialogs::Outbound;
use crate::error::ChannelError;

// ── JSON Protocol ───────────────────────────────────────────────────────

/// Conversation reference inside an activity.
#[derive(Debug, Deserialize)]
pub struct ConversationRef {
    pub id: String,
}

/// Inbound activity, a subset of the Bot Framework activity schema.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityPayload {
    #[serde(rename = "type")]
    pub kind: String,
    pub conversation: Option<ConversationRef>,
    #[serde(default)]
    pub from: Option<Participant>,
    #[serde(default)]
    pub recipient: Option<Participant>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub members_added: Vec<Participant>,
}

impl ActivityPayload {
    /// Convert to an inbound event. Activities without a conversation id are rejected.
    pub fn into_event(self) -> Result<InboundEvent, ChannelError> {
        let conversation_id = self
            .conversation
            .map(|c| c.id)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| ChannelError::InvalidMessage("missing conversation.id".to_string()))?;
        let from = self
            .from
            .unwrap_or_else(|| Participant::new("anonymous", ""));

        let kind = match self.kind.as_str() {
            "message" => EventKind::TextMessage {
                text: self.text.unwrap_or_default(),
            },
            "conversationUpdate" if !self.members_added.is_empty() => EventKind::MembersAdded {
                members: self.members_added,
            },
            other => EventKind::Other {
                kind: other.to_string(),
            },
        };

        Ok(InboundEvent {
            conversation_id,
            from,
            recipient_id: self.recipient.map(|r| r.id),
            kind,
        })
    }
}

/// Render a captured reply as an outbound activity.
fn reply_activity(delivered: &Delivered) -> Value {
    let mut activity = json!({
        "id": uuid::Uuid::new_v4().to_string(),
        "type": "message",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "conversation": {"id": delivered.conversation_id},
    });
    match (&delivered.message, activity.as_object_mut()) {
        (Outbound::Text(text), Some(fields)) => {
            fields.insert("text".to_string(), json!(text));
        }
        (Outbound::Structured(Value::Object(payload)), Some(fields)) => {
            fields.extend(payload.clone());
        }
        (Outbound::Structured(payload), Some(fields)) => {
            fields.insert("value".to_string(), payload.clone());
        }
        (_, None) => {}
    }
    activity
}

// ── Routes ──────────────────────────────────────────────────────────────

/// Shared state for the message routes.
#[derive(Clone)]
pub struct HttpState {
    pub controller: Arc<ConversationController>,
}

async fn health() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "service": "gloves-bot"
    }))
}

/// POST /api/messages
///
/// Runs one turn and returns `{"activities": [...]}`. Internal failures get a
/// 500 whose only activity is the generic apology.
async fn post_message(
    State(state): State<HttpState>,
    Json(payload): Json<ActivityPayload>,
) -> Response {
    let event = match payload.into_event() {
        Ok(event) => event,
        Err(e) => {
            warn!(error = %e, "Rejected activity");
            return (StatusCode::BAD_REQUEST, Json(json!({"error": e.to_string()})))
                .into_response();
        }
    };

    let transcript = Transcript::new();
    let outcome = state.controller.handle_turn(&event, &transcript).await;
    let activities: Vec<Value> = transcript.take().await.iter().map(reply_activity).collect();

    match outcome {
        Ok(()) => Json(json!({ "activities": activities })).into_response(),
        Err(e) => {
            error!(conversation_id = %event.conversation_id, error = %e, "Turn failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "internal error", "activities": activities })),
            )
                .into_response()
        }
    }
}

/// Build the bot's HTTP routes.
pub fn message_routes(controller: Arc<ConversationController>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/messages", post(post_message))
        .layer(CorsLayer::permissive())
        .with_state(HttpState { controller })
}
