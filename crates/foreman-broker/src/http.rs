// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The broker's one HTTP endpoint: `POST /permission/request`. Runs on a
//! background worker independent of the daemon's cooperative scheduler
//! bind the listener only after the scheduler's notification channel
//! has been installed into the broker, so no request can race ahead of a
//! consumer.

use crate::broker::PermissionBroker;
use crate::error::BrokerError;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use foreman_core::permission::PermissionRequest;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{error, info};

pub fn router(broker: Arc<PermissionBroker>) -> Router {
    Router::new().route("/permission/request", post(handle_request)).with_state(broker)
}

/// Bind and serve the broker's HTTP surface until the listener is dropped
/// or an unrecoverable I/O error occurs.
pub async fn serve(broker: Arc<PermissionBroker>, addr: SocketAddr) -> Result<(), BrokerError> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|source| BrokerError::Bind { addr: addr.to_string(), source })?;
    info!(%addr, "permission broker listening");
    axum::serve(listener, router(broker)).await.map_err(BrokerError::Serve)
}

async fn handle_request(
    State(broker): State<Arc<PermissionBroker>>,
    Json(request): Json<PermissionRequest>,
) -> Response {
    // Run on its own task so a panic inside `request` surfaces as a
    // `JoinError` (-> 500) instead of taking the whole worker down.
    let joined = tokio::spawn(async move {
        broker
            .request(
                request.tool_name,
                request.tool_input,
                request.tool_use_id,
                request.session_id,
                request.cwd,
            )
            .await
    })
    .await;

    match joined {
        Ok(decision) => (StatusCode::OK, Json(decision)).into_response(),
        Err(join_error) => {
            error!(error = %join_error, "permission broker request handler failed");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

#[cfg(test)]
#[path = "http_tests.rs"]
mod tests;
