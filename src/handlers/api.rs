use axum::{Json, extract::State};
use std::sync::Arc;

use crate::error::GuestbookError;
use crate::models::{HeartCounter, Wish};
use crate::state::AppState;

// GET /api/greetings - every wish, oldest first
pub async fn greetings_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Wish>>, GuestbookError> {
    let snapshot = state.snapshot().await?;
    Ok(Json(snapshot.greetings))
}

// GET /api/hearts
pub async fn hearts_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<HeartCounter>, GuestbookError> {
    let snapshot = state.snapshot().await?;
    Ok(Json(HeartCounter {
        count: snapshot.hearts,
    }))
}
