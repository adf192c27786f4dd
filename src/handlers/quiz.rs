// src/handlers/quiz.rs

use std::sync::Arc;

use axum::{
    Extension, Json,
    extract::{Path, Query, State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;

use crate::{
    config::QUIZ_LIST_MAX,
    error::AppError,
    models::{
        question::PublicQuestion,
        quiz::{CreateQuizRequest, QuizDetail, QuizListParams, QuizQuestions},
    },
    services::authoring,
    state::AppState,
    store::QuizStore,
    utils::jwt::Claims,
};

/// Lists published quizzes.
///
/// Supports search on title/description, difficulty, tags (any match) and sort order.
pub async fn list_quizzes(
    State(store): State<Arc<dyn QuizStore>>,
    Query(params): Query<QuizListParams>,
) -> Result<impl IntoResponse, AppError> {
    let filter = params.into_filter(QUIZ_LIST_MAX);
    let quizzes = store.list_quizzes(&filter).await?;
    Ok(Json(quizzes))
}

/// All distinct tags used by published quizzes, sorted.
pub async fn list_tags(
    State(store): State<Arc<dyn QuizStore>>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(store.all_tags().await?))
}

/// Quizzes created by the current user, drafts included.
pub async fn list_my_quizzes(
    State(store): State<Arc<dyn QuizStore>>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(store.list_quizzes_by_creator(&claims.sub).await?))
}

/// Returns a quiz with its questions.
///
/// * Drafts are visible to their creator only.
/// * Answer keys and explanations are hidden from everyone but the creator.
pub async fn get_quiz(
    State(store): State<Arc<dyn QuizStore>>,
    claims: Option<Extension<Claims>>,
    Path(quiz_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let viewer = claims.map(|Extension(c)| c.sub);

    let quiz = store
        .get_quiz(quiz_id)
        .await?
        .ok_or(AppError::NotFound("Quiz not found".to_string()))?;

    let is_creator = viewer.as_deref() == Some(quiz.creator_id.as_str());
    if !quiz.is_published && !is_creator {
        return Err(AppError::NotFound("Quiz not found".to_string()));
    }

    let questions = store.get_questions(quiz_id).await?;
    let questions = if is_creator {
        QuizQuestions::Full(questions)
    } else {
        QuizQuestions::Public(questions.iter().map(PublicQuestion::from).collect())
    };

    let is_favorited = match &viewer {
        Some(user_id) => store.is_favorited(user_id, quiz_id).await?,
        None => false,
    };

    Ok(Json(QuizDetail {
        quiz,
        questions,
        is_favorited,
    }))
}

/// Creates a quiz with its questions. Publishes it right away when `publish` is set.
pub async fn create_quiz(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    payload: Result<Json<CreateQuizRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(payload) = payload?;
    let created =
        authoring::create_quiz(state.store.as_ref(), &state.locks, &claims.sub, payload).await?;

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({
            "quiz": created.quiz,
            "new_achievements": created.new_achievements,
        })),
    ))
}

/// Publishes a draft. Creator only.
pub async fn publish_quiz(
    State(store): State<Arc<dyn QuizStore>>,
    Extension(claims): Extension<Claims>,
    Path(quiz_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let quiz = authoring::publish_quiz(store.as_ref(), &claims.sub, quiz_id).await?;
    Ok(Json(quiz))
}

/// Deletes a quiz and everything attached to it. Creator only.
pub async fn delete_quiz(
    State(store): State<Arc<dyn QuizStore>>,
    Extension(claims): Extension<Claims>,
    Path(quiz_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    authoring::delete_quiz(store.as_ref(), &claims.sub, quiz_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
