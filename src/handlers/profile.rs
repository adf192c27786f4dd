use std::sync::Arc;

use axum::{
    Extension, Json,
    extract::{Query, State},
    response::IntoResponse,
};
use serde::Serialize;

use crate::{
    config::{ATTEMPT_HISTORY_LIMIT, GLOBAL_LEADERBOARD_MAX},
    error::AppError,
    handlers::attempt::LimitParams,
    models::{
        achievement::Achievement,
        statistics::{DashboardStats, UserStatistics},
    },
    store::QuizStore,
    utils::jwt::Claims,
};

#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub statistics: UserStatistics,
    pub achievements: Vec<Achievement>,
}

/// Get current user's statistics and achievements.
/// Users without any activity get an all-zero record.
pub async fn get_me(
    State(store): State<Arc<dyn QuizStore>>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.sub.as_str();

    let (statistics, rank, achievements) = tokio::try_join!(
        store.get_statistics(user_id),
        store.user_rank(user_id),
        store.list_achievements(user_id),
    )?;

    let mut statistics =
        statistics.unwrap_or_else(|| UserStatistics::empty(user_id, chrono::Utc::now()));
    statistics.rank = rank.unwrap_or(0);

    Ok(Json(MeResponse {
        statistics,
        achievements,
    }))
}

/// Recent attempts of the current user, newest first.
pub async fn list_my_attempts(
    State(store): State<Arc<dyn QuizStore>>,
    Extension(claims): Extension<Claims>,
    Query(params): Query<LimitParams>,
) -> Result<impl IntoResponse, AppError> {
    let limit = params
        .limit
        .unwrap_or(ATTEMPT_HISTORY_LIMIT)
        .clamp(1, GLOBAL_LEADERBOARD_MAX);

    Ok(Json(store.list_attempts_by_user(&claims.sub, limit).await?))
}

/// Quizzes the current user has favorited, most recent first.
pub async fn list_my_favorites(
    State(store): State<Arc<dyn QuizStore>>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(store.list_favorites(&claims.sub).await?))
}

/// Creator and taker numbers for the current user.
pub async fn get_dashboard(
    State(store): State<Arc<dyn QuizStore>>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.sub.as_str();

    let (created, attempts_on_mine, statistics) = tokio::try_join!(
        store.list_quizzes_by_creator(user_id),
        store.count_attempts_on_creator_quizzes(user_id),
        store.get_statistics(user_id),
    )?;

    let mut dashboard = DashboardStats {
        total_quizzes_created: created.len() as i64,
        published_quizzes: created.iter().filter(|q| q.is_published).count() as i64,
        total_attempts_on_my_quizzes: attempts_on_mine,
        ..Default::default()
    };

    if let Some(stats) = statistics {
        dashboard.my_quizzes_taken = stats.quizzes_taken;
        dashboard.my_average_score = stats.average_score;
        dashboard.my_current_streak = stats.current_streak;
    }

    Ok(Json(dashboard))
}
