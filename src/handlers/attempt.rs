// src/handlers/attempt.rs

use std::sync::Arc;

use axum::{
    Extension, Json,
    extract::{Path, Query, State, rejection::JsonRejection},
    response::IntoResponse,
};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::{
    config::{GLOBAL_LEADERBOARD_MAX, QUIZ_LEADERBOARD_LIMIT},
    error::AppError,
    models::attempt::{SubmissionResponse, SubmitAttemptRequest},
    services::{
        scorer,
        submission::{self, SubmitAttempt},
    },
    state::AppState,
    store::QuizStore,
    utils::jwt::Claims,
};

/// Submits answers for a published quiz.
///
/// * Grades the answers against the stored answer keys.
/// * Stores the attempt, updates the user's statistics, awards achievements.
/// * Returns the attempt, any new achievements and per-question results.
pub async fn submit_attempt(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(quiz_id): Path<Uuid>,
    payload: Result<Json<SubmitAttemptRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(req) = payload?;
    req.validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let store = state.store.as_ref();

    let quiz = store
        .get_quiz(quiz_id)
        .await?
        .filter(|q| q.is_published)
        .ok_or(AppError::NotFound("Quiz not found".to_string()))?;

    let questions = store.get_questions(quiz_id).await?;
    let report = scorer::score_attempt(&questions, &req.answers, quiz.total_points)?;

    let outcome = submission::submit(
        store,
        &state.locks,
        SubmitAttempt {
            quiz_id,
            user_id: claims.sub,
            score: report.total_score,
            total_points: quiz.total_points,
            percentage: report.percentage,
            answers: req.answers,
            time_spent: req.time_spent,
        },
    )
    .await?;

    Ok(Json(SubmissionResponse {
        attempt: outcome.attempt,
        new_achievements: outcome.new_achievements,
        question_results: report.per_question,
    }))
}

#[derive(Debug, Deserialize)]
pub struct LimitParams {
    pub limit: Option<i64>,
}

/// Best result per user on one quiz.
pub async fn quiz_leaderboard(
    State(store): State<Arc<dyn QuizStore>>,
    Path(quiz_id): Path<Uuid>,
    Query(params): Query<LimitParams>,
) -> Result<impl IntoResponse, AppError> {
    let limit = params
        .limit
        .unwrap_or(QUIZ_LEADERBOARD_LIMIT)
        .clamp(1, GLOBAL_LEADERBOARD_MAX);

    store
        .get_quiz(quiz_id)
        .await?
        .ok_or(AppError::NotFound("Quiz not found".to_string()))?;

    Ok(Json(store.quiz_leaderboard(quiz_id, limit).await?))
}

/// Attempt count, average percentage and average time of one quiz.
pub async fn quiz_analytics(
    State(store): State<Arc<dyn QuizStore>>,
    Path(quiz_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    store
        .get_quiz(quiz_id)
        .await?
        .ok_or(AppError::NotFound("Quiz not found".to_string()))?;

    Ok(Json(store.quiz_analytics(quiz_id).await?))
}
