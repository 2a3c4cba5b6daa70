use axum::{Json, extract::State};
use serde::Serialize;

use crate::AppState;
use crate::request_counter::CounterSnapshot;

#[derive(Serialize)]
pub struct HealthCheckResponse {
    status: String,
    backend: CounterSnapshot,
}

pub async fn health_check(State(state): State<AppState>) -> Json<HealthCheckResponse> {
    let response = HealthCheckResponse {
        status: "ok".to_string(),
        backend: state.backend.counter().snapshot(),
    };
    Json(response)
}
