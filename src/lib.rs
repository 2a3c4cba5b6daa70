pub mod auth;
pub mod backend;
pub mod config;
pub mod db;
pub mod dispatch;
pub mod error;
pub mod health;
pub mod request_counter;
pub mod ui;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};
use sqlx::SqlitePool;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::backend::BackendClient;
use crate::config::Settings;
use crate::dispatch::validation::MAX_FILE_SIZE;
use crate::request_counter::RequestCounter;

#[derive(Clone)]
pub struct AppState {
    pub db_pool: SqlitePool,
    pub backend: BackendClient,
    pub settings: Arc<Settings>,
}

impl AppState {
    pub fn new(db_pool: SqlitePool, settings: Settings) -> anyhow::Result<Self> {
        let backend = BackendClient::new(&settings, RequestCounter::new())?;
        Ok(Self {
            db_pool,
            backend,
            settings: Arc::new(settings),
        })
    }
}

pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/", get(ui::index))
        .route("/health", get(health::health_check))
        .route("/api", post(dispatch::api_handler))
        // Room for the multipart framing around a maximum-size upload
        .layer(DefaultBodyLimit::max(MAX_FILE_SIZE + 1024 * 1024))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
pub(crate) async fn test_state(backend_url: &str, data_root: &std::path::Path) -> AppState {
    let mut settings = Settings::from_lookup(|key| match key {
        "SESSION_SECRET" => Some("test-secret".to_string()),
        "OPENAI_API_KEY" => Some("sk-test".to_string()),
        _ => None,
    })
    .unwrap();
    settings.backend_url = backend_url.to_string();
    settings.data_root = data_root.to_path_buf();

    AppState::new(db::test_pool().await, settings).unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_health_check() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state("http://127.0.0.1:1", dir.path()).await;

        let response = app(state)
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["status"], "ok");
        assert_eq!(body["backend"]["chat_requests"], 0);
    }
}
