//! Inbound Slack interactions.
//!
//! Slack delivers button presses to the app's Interactivity Request URL as a
//! form-encoded `payload` field holding `block_actions` JSON. Each request is
//! authenticated with the signing secret, applied to the
//! [`ReviewCoordinator`] and acknowledged right away.

pub mod signature;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::Json,
    routing::{get, post},
    Router,
};
use notify::DeliveryId;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info, warn};

use crate::review::{ActionKind, ReviewAction, ReviewCoordinator};
use signature::{verify_slack_signature, SIGNATURE_HEADER, TIMESTAMP_HEADER};

/// Path Slack posts interactions to.
pub const ACTIONS_PATH: &str = "/slack/actions";

/// Interaction payloads are small; anything bigger is not from Slack.
const MAX_BODY_BYTES: usize = 64 * 1024;

/// `block_actions` interaction payload (the fields we use).
#[derive(Debug, Deserialize)]
pub struct InteractionPayload {
    #[serde(rename = "type")]
    pub kind: String,
    pub user: Option<SlackUser>,
    pub channel: Option<SlackChannel>,
    pub container: Option<SlackContainer>,
    pub message: Option<SlackMessage>,
    #[serde(default)]
    pub actions: Vec<SlackAction>,
}

#[derive(Debug, Deserialize)]
pub struct SlackUser {
    pub id: String,
}

#[derive(Debug, Deserialize)]
pub struct SlackChannel {
    pub id: String,
}

#[derive(Debug, Deserialize)]
pub struct SlackContainer {
    pub message_ts: Option<String>,
    pub channel_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SlackMessage {
    pub ts: String,
}

#[derive(Debug, Deserialize)]
pub struct SlackAction {
    pub action_id: String,
}

impl InteractionPayload {
    /// The message the buttons belong to.
    fn message_ref(&self) -> Option<DeliveryId> {
        let channel = self
            .channel
            .as_ref()
            .map(|c| c.id.clone())
            .or_else(|| self.container.as_ref()?.channel_id.clone())?;
        let ts = self
            .container
            .as_ref()
            .and_then(|c| c.message_ts.clone())
            .or_else(|| self.message.as_ref().map(|m| m.ts.clone()))?;
        Some(DeliveryId { channel, ts })
    }

    /// Review actions carried by this payload. Anything that is not a
    /// `block_actions` press on a known button yields nothing.
    #[must_use]
    pub fn review_actions(&self) -> Vec<ReviewAction> {
        if self.kind != "block_actions" {
            return Vec::new();
        }
        let Some(message) = self.message_ref() else {
            return Vec::new();
        };
        let user = self.user.as_ref().map(|u| u.id.clone());

        self.actions
            .iter()
            .filter_map(|a| ActionKind::from_action_id(&a.action_id))
            .map(|kind| ReviewAction {
                kind,
                message: message.clone(),
                user: user.clone(),
            })
            .collect()
    }
}

/// Extract the `payload` field of a form-encoded interaction body.
#[must_use]
pub fn decode_form_payload(body: &[u8]) -> Option<String> {
    url::form_urlencoded::parse(body)
        .find(|(key, _)| key == "payload")
        .map(|(_, value)| value.into_owned())
}

/// Shared listener state.
pub struct ListenerState {
    pub coordinator: Arc<ReviewCoordinator>,
    pub signing_secret: String,
}

/// Build the interaction router.
pub fn build_router(state: Arc<ListenerState>) -> Router {
    Router::new()
        .route(ACTIONS_PATH, post(slack_actions_handler))
        .route("/health", get(health_check))
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Handle a Slack interaction request.
pub async fn slack_actions_handler(
    State(state): State<Arc<ListenerState>>,
    headers: HeaderMap,
    body: Bytes,
) -> StatusCode {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
    };

    let now = chrono::Utc::now().timestamp();
    if !verify_slack_signature(
        &body,
        header(TIMESTAMP_HEADER),
        header(SIGNATURE_HEADER),
        &state.signing_secret,
        now,
    ) {
        warn!("Rejected interaction with invalid or stale signature");
        return StatusCode::UNAUTHORIZED;
    }

    let Some(raw) = decode_form_payload(&body) else {
        warn!("Interaction request has no payload field");
        return StatusCode::BAD_REQUEST;
    };
    let payload: InteractionPayload = match serde_json::from_str(&raw) {
        Ok(payload) => payload,
        Err(e) => {
            error!("Failed to parse interaction payload: {e}");
            return StatusCode::BAD_REQUEST;
        }
    };

    let actions = payload.review_actions();
    if actions.is_empty() {
        debug!(kind = %payload.kind, "Ignoring interaction without review actions");
    }
    for action in &actions {
        let outcome = state.coordinator.apply(action);
        debug!(?outcome, kind = ?action.kind, "Applied review action");
    }

    StatusCode::OK
}

/// Health check endpoint.
async fn health_check() -> Json<Value> {
    Json(json!({ "status": "healthy" }))
}

/// Running interaction server.
///
/// Stops on [`InteractionListener::shutdown`] or when dropped.
pub struct InteractionListener {
    local_addr: SocketAddr,
    shutdown_tx: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl InteractionListener {
    /// Bind `addr` and start serving in the background.
    pub async fn bind(
        addr: SocketAddr,
        coordinator: Arc<ReviewCoordinator>,
        signing_secret: impl Into<String>,
    ) -> std::io::Result<Self> {
        let state = Arc::new(ListenerState {
            coordinator,
            signing_secret: signing_secret.into(),
        });
        let app = build_router(state);

        let listener = tokio::net::TcpListener::bind(addr).await?;
        let local_addr = listener.local_addr()?;
        info!(addr = %local_addr, path = ACTIONS_PATH, "Interaction listener started");

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let task = tokio::spawn(async move {
            let served = axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    let _ = shutdown_rx.await;
                })
                .await;
            if let Err(e) = served {
                error!("Interaction listener failed: {e}");
            }
        });

        Ok(Self {
            local_addr,
            shutdown_tx: Some(shutdown_tx),
            task: Some(task),
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Stop accepting requests and wait for in-flight ones to finish.
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                error!("Interaction listener task failed: {e}");
            }
        }
        info!(addr = %self.local_addr, "Interaction listener stopped");
    }
}

impl Drop for InteractionListener {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}
