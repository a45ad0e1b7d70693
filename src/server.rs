use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use oracle_monitor::Monitor;
use oracle_types::hash::h256_from_hex;
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::endpoint::InferenceEndpoint;
use crate::error::OracleError;

#[derive(Clone)]
pub struct AppState {
    pub endpoint: Arc<InferenceEndpoint>,
    pub monitor: Option<Arc<Monitor>>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/predict", post(predict))
        .route("/health", get(health_check))
        .route("/submissions/:tx_hash", get(submission))
        .route("/metrics", get(metrics))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Serve until ctrl-c.
pub async fn serve(addr: SocketAddr, state: AppState) -> anyhow::Result<()> {
    let app = router(state);
    
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Oracle HTTP server listening on {}", addr);
    
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!("Failed to listen for shutdown signal: {}", e);
            }
            info!("Shutting down...");
        })
        .await?;
    
    Ok(())
}

async fn predict(State(state): State<AppState>, body: Bytes) -> Response {
    let body: Value = match serde_json::from_slice(&body) {
        Ok(body) => body,
        Err(e) => return error_response(&OracleError::Validation(format!("Invalid JSON body: {}", e))),
    };
    
    match state.endpoint.predict(&body).await {
        Ok(prediction) => (StatusCode::OK, Json(prediction)).into_response(),
        Err(e) => {
            if e.http_status() >= 500 {
                warn!(kind = e.kind(), error = %e, "prediction failed");
            }
            error_response(&e)
        }
    }
}

async fn health_check() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn submission(State(state): State<AppState>, Path(tx_hash): Path<String>) -> Response {
    let hash = match h256_from_hex(&tx_hash) {
        Ok(hash) => hash,
        Err(e) => {
            return (StatusCode::BAD_REQUEST, Json(json!({ "error": format!("Invalid transaction hash: {}", e) })))
                .into_response()
        }
    };
    
    match state.endpoint.lookup_submission(&hash).await {
        Some(record) => (StatusCode::OK, Json(record)).into_response(),
        None => (StatusCode::NOT_FOUND, Json(json!({ "error": "Unknown transaction" }))).into_response(),
    }
}

async fn metrics(State(state): State<AppState>) -> Response {
    let monitor = match &state.monitor {
        Some(monitor) => monitor,
        None => return StatusCode::NOT_FOUND.into_response(),
    };
    
    match monitor.get_metrics() {
        Ok(text) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            text,
        )
            .into_response(),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
    }
}

/// 400s carry the message; 500s add a diagnostic trace and, once a
/// transaction exists, its hash for reconciliation.
fn error_response(error: &OracleError) -> Response {
    let status = StatusCode::from_u16(error.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    
    let mut body = json!({
        "error": error.to_string(),
        "kind": error.kind(),
    });
    if status.is_server_error() {
        body["trace"] = json!(error.trace());
        body["retryable"] = json!(error.retryable());
        if let Some(hash) = error.tx_hash() {
            body["tx_hash"] = json!(format!("{:#x}", hash));
        }
    }
    
    (status, Json(body)).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use oracle_types::H256;
    
    async fn body_json(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }
    
    #[tokio::test]
    async fn test_validation_error_shape() {
        let response = error_response(&OracleError::Validation("Missing 'features' or 'user' in request body".into()));
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["error"], json!("Missing 'features' or 'user' in request body"));
        assert_eq!(body["kind"], json!("validation_error"));
        assert!(body.get("trace").is_none());
    }
    
    #[tokio::test]
    async fn test_server_error_shape() {
        let hash = H256::repeat_byte(0xcd);
        let response = error_response(&OracleError::SubmissionTimeout { tx_hash: hash });
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(response).await;
        assert_eq!(body["kind"], json!("submission_timeout"));
        assert_eq!(body["tx_hash"], json!(format!("0x{}", "cd".repeat(32))));
        assert_eq!(body["retryable"], json!(false));
        assert!(body["trace"].as_str().unwrap().contains("SubmissionTimeout"));
    }
}
