// src/api/mod.rs
// Thin HTTP boundary over the orchestrator

use std::sync::Arc;

use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;
use uuid::Uuid;

use crate::llm::ChatMessage;
use crate::orchestrator::{OrchestrationResult, Orchestrator, OrchestratorConfig};
use crate::tools::ToolRegistry;

#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<Orchestrator>,
    pub registry: Arc<dyn ToolRegistry>,
    pub default_model: String,
    pub config: OrchestratorConfig,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrchestrateRequest {
    pub message: String,
    #[serde(default)]
    pub chat_history: Vec<ChatMessage>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub attached_files: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrchestrateResponse {
    pub request_id: String,
    #[serde(flatten)]
    pub result: OrchestrationResult,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/orchestrate", post(orchestrate))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

async fn orchestrate(
    State(state): State<AppState>,
    Json(request): Json<OrchestrateRequest>,
) -> Json<OrchestrateResponse> {
    let request_id = Uuid::new_v4().to_string();
    let model = request
        .model
        .unwrap_or_else(|| state.default_model.clone());
    info!(request_id = %request_id, model = %model, "Handling orchestrate request");

    let result = state
        .orchestrator
        .orchestrate(
            &request.message,
            &request.chat_history,
            state.registry.as_ref(),
            &model,
            &state.config,
            &request.attached_files,
        )
        .await;

    Json(OrchestrateResponse { request_id, result })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::KnowledgeConfig;
    use crate::llm::{CompletionProvider, Generated, GenerateRequest};
    use crate::tools::StaticToolRegistry;
    use anyhow::Result;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use serde_json::json;
    use tower::util::ServiceExt;

    struct SilentProvider;

    #[async_trait]
    impl CompletionProvider for SilentProvider {
        async fn generate_text(&self, _request: &GenerateRequest) -> Result<Generated> {
            Ok(Generated {
                text: String::new(),
            })
        }
    }

    fn test_state() -> AppState {
        AppState {
            orchestrator: Arc::new(Orchestrator::new(
                Arc::new(SilentProvider),
                KnowledgeConfig::default(),
            )),
            registry: Arc::new(StaticToolRegistry::new()),
            default_model: "gpt-4o".to_string(),
            config: OrchestratorConfig::default(),
        }
    }

    #[tokio::test]
    async fn test_health_route() {
        let app = router(test_state());
        let response = app
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_orchestrate_route_translates_shapes() {
        let app = router(test_state());
        let body = serde_json::to_string(&json!({ "message": "hello there" })).unwrap();
        let response = app
            .oneshot(
                Request::post("/api/orchestrate")
                    .header("content-type", "application/json")
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let parsed: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(parsed["success"], true);
        assert!(parsed["requestId"].is_string());
        assert!(parsed["toolCalls"].is_array());
    }
}
