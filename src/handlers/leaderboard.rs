use std::sync::Arc;

use axum::{
    Json,
    extract::{Query, State},
    response::IntoResponse,
};

use crate::{
    config::{GLOBAL_LEADERBOARD_LIMIT, GLOBAL_LEADERBOARD_MAX},
    error::AppError,
    handlers::attempt::LimitParams,
    store::QuizStore,
};

/// Global leaderboard ordered by cumulative points, then average score.
/// Users that only created quizzes are not listed.
pub async fn global_leaderboard(
    State(store): State<Arc<dyn QuizStore>>,
    Query(params): Query<LimitParams>,
) -> Result<impl IntoResponse, AppError> {
    let limit = params
        .limit
        .unwrap_or(GLOBAL_LEADERBOARD_LIMIT)
        .clamp(1, GLOBAL_LEADERBOARD_MAX);

    Ok(Json(store.global_leaderboard(limit).await?))
}
