//! Route handlers: the thin boundary between HTTP and the engine.
//!
//! The transport only distinguishes three outcomes: engine unavailable
//! (503), handler-reported failure (400), and success (200). Everything
//! richer lives in the `{success, message, data?}` envelope itself.

use axum::{
    extract::rejection::JsonRejection,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::info;
use uibridge::{AutomationEngine, Command, CommandResult};

#[derive(Clone)]
pub struct AppState {
    /// `None` until an engine is attached; commands answer 503 meanwhile.
    pub engine: Option<Arc<AutomationEngine>>,
    pub port: u16,
}

#[derive(Debug, Serialize)]
pub struct PingResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: &'static str,
    pub http_server: &'static str,
    pub accessibility_service: bool,
    pub port: u16,
}

pub async fn ping() -> Json<PingResponse> {
    Json(PingResponse {
        status: "ok",
        service: "uibridge",
        version: env!("CARGO_PKG_VERSION"),
    })
}

pub async fn status(State(state): State<AppState>) -> Json<StatusResponse> {
    let accessibility = state
        .engine
        .as_ref()
        .map(|engine| engine.service_enabled())
        .unwrap_or(false);
    Json(StatusResponse {
        status: if accessibility {
            "ready"
        } else {
            "accessibility_disabled"
        },
        http_server: "running",
        accessibility_service: accessibility,
        port: state.port,
    })
}

pub async fn cmd(
    State(state): State<AppState>,
    body: Result<Json<Command>, JsonRejection>,
) -> Response {
    let command = match body {
        Ok(Json(command)) => command,
        Err(rejection) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(CommandResult::fail(format!("invalid JSON body: {rejection}"))),
            )
                .into_response()
        }
    };
    execute(&state, command).await
}

/// Alternate path form: the action name is embedded in the path, the body
/// supplies only params.
pub async fn element_action(
    State(state): State<AppState>,
    Path(action): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> Response {
    let params = match body {
        Ok(Json(params)) => params,
        Err(rejection) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(CommandResult::fail(format!("invalid JSON body: {rejection}"))),
            )
                .into_response()
        }
    };
    execute(&state, Command::new(action, params)).await
}

pub async fn not_found() -> (StatusCode, Json<Value>) {
    (
        StatusCode::NOT_FOUND,
        Json(serde_json::json!({"error": "Not Found"})),
    )
}

async fn execute(state: &AppState, command: Command) -> Response {
    let Some(engine) = state.engine.as_ref() else {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(CommandResult::fail("automation engine not attached")),
        )
            .into_response();
    };
    info!(action = %command.action, "dispatching command");
    let result = engine.dispatch(command).await;
    let code = if result.success {
        StatusCode::OK
    } else {
        StatusCode::BAD_REQUEST
    };
    (code, Json(result)).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use uibridge::platforms::simulated::{SimNode, SimulatedPlatform};

    fn state_with_engine() -> (SimulatedPlatform, AppState) {
        let tree = SimNode::new("android.widget.FrameLayout")
            .bounds(0, 0, 1080, 1920)
            .child(SimNode::new("android.widget.TextView").text("Hello"));
        let platform = SimulatedPlatform::with_tree(tree);
        let state = AppState {
            engine: Some(Arc::new(AutomationEngine::new(Arc::new(platform.clone())))),
            port: 8080,
        };
        (platform, state)
    }

    fn detached_state() -> AppState {
        AppState {
            engine: None,
            port: 8080,
        }
    }

    #[tokio::test]
    async fn ping_reports_service_identity() {
        let Json(body) = ping().await;
        assert_eq!(body.status, "ok");
        assert_eq!(body.service, "uibridge");
        assert!(!body.version.is_empty());
    }

    #[tokio::test]
    async fn status_is_ready_with_an_attached_engine() {
        let (_platform, state) = state_with_engine();
        let Json(body) = status(State(state)).await;
        assert_eq!(body.status, "ready");
        assert!(body.accessibility_service);
        assert_eq!(body.port, 8080);
    }

    #[tokio::test]
    async fn status_reports_accessibility_disabled_when_detached() {
        let Json(body) = status(State(detached_state())).await;
        assert_eq!(body.status, "accessibility_disabled");
        assert!(!body.accessibility_service);
    }

    #[tokio::test]
    async fn status_follows_the_platform_service_flag() {
        let (platform, state) = state_with_engine();
        platform.set_service_enabled(false);
        let Json(body) = status(State(state)).await;
        assert_eq!(body.status, "accessibility_disabled");
    }

    #[tokio::test(start_paused = true)]
    async fn successful_command_maps_to_200() {
        let (platform, state) = state_with_engine();
        let response = execute(
            &state,
            Command::new("tap", json!({"x": 10, "y": 20})),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(platform.gestures().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_command_maps_to_400() {
        let (_platform, state) = state_with_engine();
        let response = execute(&state, Command::new("teleport", Value::Null)).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn detached_engine_maps_to_503() {
        let state = detached_state();
        let response = execute(&state, Command::new("tap", json!({"x": 1, "y": 1}))).await;
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn unknown_route_payload_matches_the_contract() {
        let (code, Json(body)) = not_found().await;
        assert_eq!(code, StatusCode::NOT_FOUND);
        assert_eq!(body, json!({"error": "Not Found"}));
    }
}
