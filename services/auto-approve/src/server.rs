//! Webhook Service
//!
//! Receives GitHub webhook deliveries and runs pull request events through
//! the approval pipeline.

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::post,
    Json, Router,
};
use hmac::{Hmac, Mac};
use serde_json::json;
use sha2::Sha256;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::approver::AutoApprover;
use crate::error::ApproveError;
use crate::event::PullRequestEvent;

#[derive(Clone)]
pub struct AppState {
    pub webhook_secret: Option<Vec<u8>>,
    pub approver: Arc<AutoApprover>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/webhook", post(handle_webhook))
        .route("/healthz", post(healthz).get(healthz))
        .with_state(state)
}

async fn healthz() -> impl IntoResponse {
    (StatusCode::OK, Json(json!({"status": "ok"})))
}

/// Check a `sha256=<hex>` HMAC signature of `body`
pub fn verify_signature(secret: &[u8], body: &[u8], signature: &str) -> bool {
    let Some(signature_hex) = signature.strip_prefix("sha256=") else {
        return false;
    };

    let Ok(expected) = hex::decode(signature_hex) else {
        return false;
    };

    let Ok(mut mac) = Hmac::<Sha256>::new_from_slice(secret) else {
        return false;
    };
    mac.update(body);
    mac.verify_slice(&expected).is_ok()
}

fn error_status(err: &ApproveError) -> StatusCode {
    match err {
        ApproveError::InvalidEvent(_) | ApproveError::InvalidRepository(_) => {
            StatusCode::BAD_REQUEST
        }
        ApproveError::TokenIssuance(_) => StatusCode::BAD_GATEWAY,
        ApproveError::MissingCredential(_) | ApproveError::Config(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

async fn handle_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    if let Some(secret) = &state.webhook_secret {
        let signature = headers
            .get("X-Hub-Signature-256")
            .and_then(|value| value.to_str().ok());
        match signature {
            Some(signature) if verify_signature(secret, &body, signature) => {}
            _ => {
                warn!("Webhook signature verification failed.");
                return (
                    StatusCode::UNAUTHORIZED,
                    Json(json!({"error": "invalid signature"})),
                );
            }
        }
    }

    let event = headers
        .get("X-GitHub-Event")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    match event {
        "ping" => {
            info!("Received ping event.");
            (StatusCode::OK, Json(json!({"status": "pong"})))
        }
        "pull_request" | "pull_request_target" => {
            let result = match PullRequestEvent::from_webhook(&body) {
                Ok(pr) => state.approver.handle(&pr).await,
                Err(err) => Err(err),
            };
            match result {
                Ok(outcome) => match serde_json::to_value(&outcome) {
                    Ok(value) => (StatusCode::OK, Json(value)),
                    Err(err) => {
                        error!("Failed to serialize outcome: {err:#}");
                        (
                            StatusCode::INTERNAL_SERVER_ERROR,
                            Json(json!({"error": err.to_string()})),
                        )
                    }
                },
                Err(err) => {
                    error!("Failed to process pull request event: {err:#}");
                    (error_status(&err), Json(json!({"error": err.to_string()})))
                }
            }
        }
        other => {
            info!("Ignoring GitHub event: {other}");
            (StatusCode::OK, Json(json!({"status": "ignored", "event": other})))
        }
    }
}
