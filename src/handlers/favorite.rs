// src/handlers/favorite.rs

use std::sync::Arc;

use axum::{
    Extension, Json,
    extract::{Path, State},
    response::IntoResponse,
};
use serde_json::json;
use uuid::Uuid;

use crate::{error::AppError, store::QuizStore, utils::jwt::Claims};

/// Toggle Favorite.
/// Adds the quiz to the user's favorites, or removes it if already there.
pub async fn toggle_favorite(
    State(store): State<Arc<dyn QuizStore>>,
    Extension(claims): Extension<Claims>,
    Path(quiz_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let quiz = store
        .get_quiz(quiz_id)
        .await?
        .ok_or(AppError::NotFound("Quiz not found".to_string()))?;

    if !quiz.is_published && quiz.creator_id != claims.sub {
        return Err(AppError::NotFound("Quiz not found".to_string()));
    }

    let is_favorited = store.toggle_favorite(&claims.sub, quiz_id).await?;

    tracing::debug!(
        "User {} {} quiz {}",
        claims.sub,
        if is_favorited { "favorited" } else { "unfavorited" },
        quiz_id
    );

    Ok(Json(json!({ "is_favorited": is_favorited })))
}
