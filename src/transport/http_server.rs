//! HTTP listener
//!
//! `POST /rpc` takes one request envelope and answers with one response
//! envelope. `GET /health` reports liveness. When an auth token is configured
//! `/rpc` requires `Authorization: Bearer <token>` and answers 401 otherwise.

use axum::{ Json, Router, extract::State, routing::{ get, post } };
use http::{ HeaderMap, Method, StatusCode, header::AUTHORIZATION };
use serde_json::{ Value, json };
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{ Any, CorsLayer };
use tracing::{ info, warn };

use crate::errors::Error;
use crate::messages::Response;
use crate::server::Server;

struct AppState {
    server: Arc<Server>,
    auth_token: Option<String>,
}

pub fn router(server: Arc<Server>, auth_token: Option<String>) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any)
        .allow_origin(Any);

    Router::new()
        .route("/rpc", post(handle_rpc))
        .route("/health", get(health))
        .layer(cors)
        .with_state(Arc::new(AppState { server, auth_token }))
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
}

async fn handle_rpc(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: String
) -> Result<Json<Response>, StatusCode> {
    if let Some(expected) = &state.auth_token {
        if bearer_token(&headers) != Some(expected.as_str()) {
            warn!("Rejected request without a valid bearer token");
            return Err(StatusCode::UNAUTHORIZED);
        }
    }
    Ok(Json(state.server.handle_raw(&body).await))
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// Serve until `shutdown` resolves
pub async fn serve<F>(server: Arc<Server>, listener: TcpListener, shutdown: F) -> Result<(), Error>
    where F: Future<Output = ()> + Send + 'static
{
    let auth_token = server.config().auth_token.clone();
    if let Ok(addr) = listener.local_addr() {
        info!("Listening for requests on http://{}/rpc", addr);
    }
    axum
        ::serve(listener, router(server, auth_token))
        .with_graceful_shutdown(shutdown).await
        .map_err(|e| Error::Transport(format!("Server error: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServerConfig;
    use axum::body::{ Body, to_bytes };
    use http::Request as HttpRequest;
    use tower::ServiceExt;

    fn app(token: Option<&str>) -> Router {
        router(Arc::new(Server::new(ServerConfig::default())), token.map(str::to_string))
    }

    fn rpc(body: &str, token: Option<&str>) -> HttpRequest<Body> {
        let mut builder = HttpRequest::builder()
            .method("POST")
            .uri("/rpc")
            .header("content-type", "application/json");
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {}", token));
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    async fn json_body(response: axum::response::Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn answers_rpc_requests() {
        let response = app(None)
            .oneshot(rpc(r#"{"jsonrpc":"2.0","id":1,"method":"initialize"}"#, None)).await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["id"], 1);
        assert_eq!(body["result"]["protocolVersion"], "2024-11-05");
    }

    #[tokio::test]
    async fn protocol_errors_are_still_http_200() {
        let response = app(None)
            .oneshot(rpc(r#"{"jsonrpc":"2.0","id":2,"method":"tools/delete"}"#, None)).await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["error"]["code"], -32601);
    }

    #[tokio::test]
    async fn bearer_token_is_enforced() {
        let body = r#"{"jsonrpc":"2.0","id":1,"method":"tools/list"}"#;

        let missing = app(Some("s3cret")).oneshot(rpc(body, None)).await.unwrap();
        assert_eq!(missing.status(), StatusCode::UNAUTHORIZED);

        let wrong = app(Some("s3cret")).oneshot(rpc(body, Some("guess"))).await.unwrap();
        assert_eq!(wrong.status(), StatusCode::UNAUTHORIZED);

        let right = app(Some("s3cret")).oneshot(rpc(body, Some("s3cret"))).await.unwrap();
        assert_eq!(right.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn health_check() {
        let response = app(Some("s3cret"))
            .oneshot(HttpRequest::builder().uri("/health").body(Body::empty()).unwrap()).await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["status"], "ok");
    }
}
