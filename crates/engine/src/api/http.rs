//! HTTP routes.
//!
//! A thin transport over the tool router: every call is `POST /tools/call` with the
//! caller's role, the operation name and its arguments.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::app::App;
use crate::tools::role::UnknownRole;
use crate::tools::{ErrorKind, Role, ToolError};

/// Create all HTTP routes.
pub fn routes() -> Router<Arc<App>> {
    Router::new()
        .route("/health", get(health))
        .route("/tools/call", post(call_tool))
        .route("/tools/{role}", get(list_operations))
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "healthy" }))
}

#[derive(Debug, Deserialize)]
pub struct ToolCall {
    pub role: String,
    pub operation: String,
    #[serde(default)]
    pub arguments: Value,
}

async fn call_tool(
    State(app): State<Arc<App>>,
    Json(call): Json<ToolCall>,
) -> Result<Json<Value>, ApiError> {
    let result = app
        .router
        .call(&call.role, &call.operation, call.arguments)
        .await?;
    Ok(Json(json!({ "ok": true, "result": result })))
}

async fn list_operations(
    State(app): State<Arc<App>>,
    Path(role): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let role: Role = role
        .parse()
        .map_err(|e: UnknownRole| ToolError::permission(e.to_string()))?;
    Ok(Json(json!({
        "role": role,
        "operations": app.router.operations(role),
    })))
}

/// A tool error rendered as `{ok: false, error: {kind, message}}`.
#[derive(Debug)]
pub struct ApiError(pub ToolError);

impl From<ToolError> for ApiError {
    fn from(e: ToolError) -> Self {
        ApiError(e)
    }
}

fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::Validation => StatusCode::BAD_REQUEST,
        ErrorKind::BoundaryViolation => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Permission => StatusCode::FORBIDDEN,
        ErrorKind::Conflict | ErrorKind::State => StatusCode::CONFLICT,
        ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = status_for(self.0.kind);
        let error = if self.0.kind == ErrorKind::Internal {
            // Storage details stay in the log.
            tracing::error!(error = %self.0.message, "Internal error serving tool call");
            ToolError::new(ErrorKind::Internal, "Internal error")
        } else {
            self.0
        };
        (status, Json(json!({ "ok": false, "error": error }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    use crate::app::Repositories;
    use crate::infrastructure::clock::{FixedRandom, SystemClock};
    use crate::infrastructure::sqlite::SqliteStore;
    use crate::tools::Capabilities;

    async fn app(dir: &tempfile::TempDir) -> Router {
        let path = dir.path().join("http.db");
        let store = SqliteStore::open(path.to_str().unwrap(), Arc::new(SystemClock::new()))
            .await
            .unwrap();
        let app = App::new(
            Repositories::sqlite(Arc::new(store)),
            Capabilities::builtin(),
            Arc::new(SystemClock::new()),
            Arc::new(FixedRandom(4)),
        );
        routes().with_state(Arc::new(app))
    }

    async fn post_call(router: Router, body: Value) -> (StatusCode, Value) {
        let response = router
            .oneshot(
                Request::post("/tools/call")
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn health_reports_healthy() {
        let dir = tempfile::tempdir().unwrap();
        let response = app(&dir)
            .await
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn successful_call_wraps_result() {
        let dir = tempfile::tempdir().unwrap();
        let (status, body) = post_call(
            app(&dir).await,
            json!({
                "role": "world_builder",
                "operation": "set_world",
                "arguments": {"name": "Faerûn"},
            }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["ok"], true);
        assert_eq!(body["result"]["name"], "Faerûn");
    }

    #[tokio::test]
    async fn denied_call_is_forbidden() {
        let dir = tempfile::tempdir().unwrap();
        let (status, body) = post_call(
            app(&dir).await,
            json!({"role": "scribe", "operation": "set_world", "arguments": {"name": "Nope"}}),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["ok"], false);
        assert_eq!(body["error"]["kind"], "permission");
    }

    #[tokio::test]
    async fn missing_record_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let (status, body) = post_call(
            app(&dir).await,
            json!({
                "role": "narrator",
                "operation": "get_entity",
                "arguments": {"id": uuid::Uuid::new_v4()},
            }),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["kind"], "not_found");
    }

    #[test]
    fn kinds_map_to_statuses() {
        assert_eq!(status_for(ErrorKind::BoundaryViolation), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(status_for(ErrorKind::State), StatusCode::CONFLICT);
        assert_eq!(status_for(ErrorKind::Internal), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
