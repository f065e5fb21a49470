use crate::store::{Location, RemoveOutcome, SaveOutcome, StoreHandle};
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use tower_http::cors::CorsLayer;

#[derive(Clone)]
pub struct HttpState {
    pub store: StoreHandle,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

type MessageReply = (StatusCode, Json<MessageResponse>);

fn reply(status: StatusCode, message: &str) -> MessageReply {
    (
        status,
        Json(MessageResponse {
            message: message.to_string(),
        }),
    )
}

fn internal_error(err: impl Display) -> MessageReply {
    tracing::error!(error = %err, "location store failure");
    reply(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
}

async fn healthz() -> &'static str {
    "ok"
}

async fn get_locations(
    State(state): State<HttpState>,
) -> Result<Json<Vec<Location>>, MessageReply> {
    let locations = state.store.list().await.map_err(internal_error)?;
    Ok(Json(locations))
}

async fn save_location(
    State(state): State<HttpState>,
    Json(location): Json<Location>,
) -> MessageReply {
    match state.store.save(location).await {
        Ok(SaveOutcome::Saved) => {
            tracing::info!(lat = location.latitude, lng = location.longitude, "location saved");
            reply(StatusCode::OK, "Location saved")
        }
        Ok(SaveOutcome::AlreadyExists) => reply(StatusCode::BAD_REQUEST, "Location already exists"),
        Err(err) => internal_error(err),
    }
}

async fn remove_location(
    State(state): State<HttpState>,
    Json(location): Json<Location>,
) -> MessageReply {
    match state.store.remove(location).await {
        Ok(RemoveOutcome::Removed { rows }) => {
            tracing::info!(rows, lat = location.latitude, lng = location.longitude, "location removed");
            reply(StatusCode::OK, "Location removed")
        }
        Ok(RemoveOutcome::NotFound) => reply(StatusCode::NOT_FOUND, "Location not found"),
        Err(err) => internal_error(err),
    }
}

async fn clear_all(State(state): State<HttpState>) -> MessageReply {
    match state.store.clear().await {
        Ok(()) => {
            tracing::info!("all locations cleared");
            reply(StatusCode::OK, "All locations cleared")
        }
        Err(err) => internal_error(err),
    }
}

pub fn router(state: HttpState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/get_locations", get(get_locations))
        .route("/save_location", post(save_location))
        .route("/remove_location", post(remove_location))
        .route("/clear_all", post(clear_all))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
