// src/models/attempt.rs

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use sqlx::{FromRow, types::Json};
use uuid::Uuid;
use validator::Validate;

use crate::models::{achievement::Achievement, question::SubmittedAnswer};

/// Submitted answers keyed by question id.
pub type AnswerMap = HashMap<Uuid, SubmittedAnswer>;

/// Represents the 'quiz_attempts' table in the database.
/// Written once per submission and never updated.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Attempt {
    pub id: Uuid,
    pub quiz_id: Uuid,
    pub user_id: String,
    pub score: i32,

    /// Snapshot of the quiz total at submission time.
    pub total_points: i32,

    /// `round(100 * score / total_points)`, or 0 when `total_points` is 0.
    pub percentage: i32,

    pub answers: Json<AnswerMap>,

    /// Elapsed seconds reported by the client.
    pub time_spent: Option<i32>,

    pub completed_at: chrono::DateTime<chrono::Utc>,
}

/// Attempt data ready to be stored. Values are trusted as given.
#[derive(Debug, Clone)]
pub struct NewAttempt {
    pub quiz_id: Uuid,
    pub user_id: String,
    pub score: i32,
    pub total_points: i32,
    pub percentage: i32,
    pub answers: AnswerMap,
    pub time_spent: Option<i32>,
}

/// DTO for submitting a quiz attempt.
#[derive(Debug, Deserialize, Validate)]
pub struct SubmitAttemptRequest {
    /// Key: question id. Value: a string, or a list of strings for checkbox questions.
    #[serde(default)]
    pub answers: AnswerMap,

    #[validate(range(min = 0, max = 86400))]
    pub time_spent: Option<i32>,
}

/// Correctness of one question, attached to the submission response for review.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuestionResult {
    pub correct: bool,
    pub explanation: Option<String>,
}

/// Response of `POST /api/quizzes/{id}/attempts`.
#[derive(Debug, Serialize)]
pub struct SubmissionResponse {
    pub attempt: Attempt,
    pub new_achievements: Vec<Achievement>,
    pub question_results: HashMap<Uuid, QuestionResult>,
}

/// One row of a user's attempt history, joined with the quiz.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct AttemptHistoryEntry {
    pub id: Uuid,
    pub quiz_id: Uuid,
    pub quiz_title: Option<String>,
    pub quiz_difficulty: Option<String>,
    pub score: i32,
    pub total_points: i32,
    pub percentage: i32,
    pub time_spent: Option<i32>,
    pub completed_at: chrono::DateTime<chrono::Utc>,
}

/// Best result of one user on one quiz.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct QuizLeaderboardEntry {
    pub user_id: String,
    pub best_score: i32,
    /// Fastest time among the attempts that reached `best_score`.
    pub best_time: Option<i32>,
    pub attempt_count: i64,
}

/// Aggregates over all attempts of a quiz.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct QuizAnalytics {
    pub total_attempts: i64,
    /// Rounded mean percentage.
    pub average_score: i64,
    /// Rounded mean of the reported elapsed seconds.
    pub average_time: i64,
}
