use crate::interface_adapters::http::error_response;
use crate::interface_adapters::state::AppState;
use crate::use_cases::{RegistryError, WorldStatus};

use axum::{
    extract::{Json, Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use std::sync::Arc;

#[derive(Debug, serde::Deserialize)]
pub struct WorldInitRequest {
    // World id chosen by the caller (room/session service).
    world_id: String,
}

#[derive(Debug, serde::Serialize)]
struct WorldInitResponse {
    // The world id that was created.
    world_id: String,
}

#[derive(Debug, serde::Serialize)]
struct WorldStatusResponse {
    world_id: String,
    tick: u64,
    players: usize,
    projectiles: usize,
    match_over: bool,
}

impl From<WorldStatus> for WorldStatusResponse {
    fn from(status: WorldStatus) -> Self {
        Self {
            world_id: status.world_id,
            tick: status.tick,
            players: status.players,
            projectiles: status.projectiles,
            match_over: status.match_over,
        }
    }
}

pub async fn create_world_handler(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<WorldInitRequest>,
) -> impl IntoResponse {
    let world_id = payload.world_id.trim().to_string();
    if world_id.is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "world_id is required");
    }
    if *state.shutdown.borrow() {
        return error_response(StatusCode::SERVICE_UNAVAILABLE, "server shutting down");
    }

    match state.registry.create_world(&world_id).await {
        Ok(world) => (
            StatusCode::CREATED,
            Json(WorldInitResponse {
                world_id: world.world_id.to_string(),
            }),
        )
            .into_response(),
        Err(RegistryError::AlreadyExists) => error_response(StatusCode::CONFLICT, "world already exists"),
        Err(RegistryError::InvalidId) => {
            error_response(StatusCode::BAD_REQUEST, "world_id must not contain whitespace")
        }
    }
}

pub async fn world_status_handler(
    State(state): State<Arc<AppState>>,
    Path(world_id): Path<String>,
) -> impl IntoResponse {
    match state.registry.get_world(&world_id).await {
        Some(world) => Json(WorldStatusResponse::from(world.status().await)).into_response(),
        None => error_response(StatusCode::NOT_FOUND, "world not found"),
    }
}
