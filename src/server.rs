//! Inbound webhook endpoint.
//!
//! Telegram POSTs each update to `/api/webhook`. The handler decodes the
//! body, runs the dispatcher and reports the outcome as a small JSON
//! status object.

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{body::Bytes, extract::State, http::StatusCode, routing::post, Json, Router};
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::dispatcher::Dispatcher;
use crate::platform::Update;

pub const WEBHOOK_PATH: &str = "/api/webhook";

#[derive(Debug, Serialize, PartialEq)]
pub struct WebhookResponse {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl WebhookResponse {
    fn success() -> (StatusCode, Json<Self>) {
        (
            StatusCode::OK,
            Json(Self {
                status: "success",
                message: None,
            }),
        )
    }

    fn error(message: String) -> (StatusCode, Json<Self>) {
        error!("Webhook error: {}", message);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(Self {
                status: "error",
                message: Some(message),
            }),
        )
    }
}

pub fn router(dispatcher: Arc<Dispatcher>) -> Router {
    Router::new()
        .route(WEBHOOK_PATH, post(handle_webhook))
        .with_state(dispatcher)
}

pub async fn handle_webhook(
    State(dispatcher): State<Arc<Dispatcher>>,
    body: Bytes,
) -> (StatusCode, Json<WebhookResponse>) {
    let update = match Update::from_slice(&body) {
        Ok(update) => update,
        Err(e) => return WebhookResponse::error(e.to_string()),
    };
    debug!("Received update {}", update.update_id);

    let Some(incoming) = update.into_incoming() else {
        return WebhookResponse::success();
    };

    // Run on its own task so a dropped connection does not cancel the
    // generation call or the reply, and a panic is reported as a 500.
    let task = tokio::spawn(async move { dispatcher.dispatch(&incoming).await });

    match task.await {
        Ok(Ok(())) => WebhookResponse::success(),
        Ok(Err(e)) => WebhookResponse::error(format!("{:#}", e)),
        Err(e) => WebhookResponse::error(format!("dispatch task failed: {}", e)),
    }
}

/// Serve the webhook until Ctrl-C.
pub async fn serve(bind_address: &str, dispatcher: Arc<Dispatcher>) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(bind_address)
        .await
        .with_context(|| format!("Failed to bind to {}", bind_address))?;

    info!(
        "Listening for webhooks on http://{}{}",
        listener.local_addr()?,
        WEBHOOK_PATH
    );

    axum::serve(listener, router(dispatcher))
        .with_graceful_shutdown(async {
            match tokio::signal::ctrl_c().await {
                Ok(()) => info!("Shutting down"),
                Err(e) => warn!("Failed to listen for Ctrl-C, shutting down: {}", e),
            }
        })
        .await
        .context("Server error")?;

    Ok(())
}
