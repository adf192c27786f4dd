// src/services/submission.rs

use uuid::Uuid;

use crate::{
    models::{
        achievement::Achievement,
        attempt::{AnswerMap, Attempt, NewAttempt},
    },
    services::{
        QuizError, QuizResult, achievements,
        statistics::{self, UserLocks},
    },
    store::QuizStore,
};

/// An already scored submission.
#[derive(Debug, Clone)]
pub struct SubmitAttempt {
    pub quiz_id: Uuid,
    pub user_id: String,
    pub score: i32,
    pub total_points: i32,
    pub percentage: i32,
    pub answers: AnswerMap,
    pub time_spent: Option<i32>,
}

#[derive(Debug, Clone)]
pub struct SubmissionOutcome {
    pub attempt: Attempt,
    pub new_achievements: Vec<Achievement>,
}

/// Stores an attempt, updates the user's statistics and awards achievements.
///
/// Score and percentage are stored as given. Any failure is reported as
/// [`QuizError::SubmissionFailed`] with the cause only logged. The steps are
/// not transactional: an attempt stored before a later step fails stays
/// stored, and the statistics are then not updated for it.
pub async fn submit(
    store: &dyn QuizStore,
    locks: &UserLocks,
    request: SubmitAttempt,
) -> QuizResult<SubmissionOutcome> {
    let quiz_id = request.quiz_id;
    let user_id = request.user_id.clone();

    run(store, locks, request).await.map_err(|e| {
        tracing::error!(
            %quiz_id,
            user_id = %user_id,
            error = %e,
            "Failed to submit quiz attempt"
        );
        QuizError::SubmissionFailed
    })
}

async fn run(
    store: &dyn QuizStore,
    locks: &UserLocks,
    request: SubmitAttempt,
) -> QuizResult<SubmissionOutcome> {
    let attempt = store
        .insert_attempt(NewAttempt {
            quiz_id: request.quiz_id,
            user_id: request.user_id,
            score: request.score,
            total_points: request.total_points,
            percentage: request.percentage,
            answers: request.answers,
            time_spent: request.time_spent,
        })
        .await?;

    let _guard = locks.lock(&attempt.user_id).await;
    let stats = statistics::apply_attempt(store, &attempt.user_id, attempt.percentage).await?;
    let new_achievements = achievements::award(store, &stats).await?;

    tracing::info!(
        attempt_id = %attempt.id,
        quiz_id = %attempt.quiz_id,
        user_id = %attempt.user_id,
        percentage = attempt.percentage,
        new_achievements = new_achievements.len(),
        "Quiz attempt submitted"
    );

    Ok(SubmissionOutcome {
        attempt,
        new_achievements,
    })
}
