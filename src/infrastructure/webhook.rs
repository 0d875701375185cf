//! # LINE Webhook
//!
//! HTTP entry point for LINE platform events. Verifies the request
//! signature against the channel secret, then fans each event out to its own
//! task so a slow brokerage call for one user never delays the webhook
//! acknowledgement or other users' events.

use std::sync::Arc;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::Router;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;

use crate::application::router::CommandRouter;
use crate::infrastructure::line::{LineClient, LineService};

type HmacSha256 = Hmac<Sha256>;

pub struct WebhookState {
    pub channel_secret: String,
    pub line: Arc<LineClient>,
    pub router: Arc<CommandRouter>,
}

#[derive(Debug, Deserialize)]
struct WebhookPayload {
    #[serde(default)]
    events: Vec<WebhookEvent>,
}

#[derive(Debug, Deserialize)]
struct WebhookEvent {
    #[serde(rename = "type")]
    kind: String,
    #[serde(rename = "replyToken")]
    reply_token: Option<String>,
    source: Option<EventSource>,
    message: Option<EventMessage>,
    postback: Option<EventPostback>,
}

#[derive(Debug, Deserialize)]
struct EventSource {
    #[serde(rename = "userId")]
    user_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct EventMessage {
    #[serde(rename = "type")]
    kind: String,
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct EventPostback {
    data: String,
}

pub fn app(state: Arc<WebhookState>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/callback", post(callback))
        .with_state(state)
}

async fn healthz() -> &'static str {
    "ok"
}

async fn callback(
    State(state): State<Arc<WebhookState>>,
    headers: HeaderMap,
    body: String,
) -> StatusCode {
    let signature = headers
        .get("x-line-signature")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("");
    if !verify_signature(&state.channel_secret, body.as_bytes(), signature) {
        tracing::warn!("Rejected webhook request with a bad signature");
        return StatusCode::UNAUTHORIZED;
    }

    let payload: WebhookPayload = match serde_json::from_str(&body) {
        Ok(payload) => payload,
        Err(err) => {
            tracing::warn!("Undeserializable webhook body: {}", err);
            return StatusCode::BAD_REQUEST;
        }
    };

    for event in payload.events {
        let state = state.clone();
        tokio::spawn(async move {
            handle_event(state, event).await;
        });
    }
    StatusCode::OK
}

/// LINE signs the raw request body with the channel secret and sends the
/// HMAC-SHA256 digest base64 encoded in `x-line-signature`.
fn verify_signature(channel_secret: &str, body: &[u8], signature: &str) -> bool {
    let Ok(expected) = STANDARD.decode(signature) else {
        return false;
    };
    let Ok(mut mac) = HmacSha256::new_from_slice(channel_secret.as_bytes()) else {
        return false;
    };
    mac.update(body);
    mac.verify_slice(&expected).is_ok()
}

async fn handle_event(state: Arc<WebhookState>, event: WebhookEvent) {
    let Some(user_id) = event.source.as_ref().and_then(|s| s.user_id.clone()) else {
        tracing::debug!("Ignoring event without a user source");
        return;
    };
    let Some(reply_token) = event.reply_token else {
        tracing::debug!("Ignoring event without a reply token");
        return;
    };
    let chat = LineService::new(state.line.clone(), &reply_token);

    match event.kind.as_str() {
        "message" => {
            let Some(message) = event.message else {
                return;
            };
            if message.kind != "text" {
                tracing::debug!("Ignoring non-text message from user='{}'", user_id);
                return;
            }
            let text = message.text.unwrap_or_default();
            state.router.route_text(&chat, &user_id, &text).await;
        }
        "postback" => {
            let Some(postback) = event.postback else {
                return;
            };
            state
                .router
                .route_postback(&chat, &user_id, &postback.data)
                .await;
        }
        other => {
            tracing::debug!("Ignoring event type '{}'", other);
        }
    }
}
