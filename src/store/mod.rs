//! Persistence seam.
//!
//! Services only talk to storage through [`QuizStore`]. [`PgStore`] backs the
//! server; [`MemoryStore`] keeps everything in process and backs the tests.

use std::collections::HashSet;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{
    achievement::{Achievement, NewAchievement},
    attempt::{Attempt, AttemptHistoryEntry, NewAttempt, QuizAnalytics, QuizLeaderboardEntry},
    favorite::FavoriteQuiz,
    question::{NewQuestion, Question},
    quiz::{NewQuiz, Quiz, QuizFilter},
    statistics::{LeaderboardEntry, UserStatistics},
};

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Errors raised by a storage backend.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A compare-and-swap lost against a concurrent writer.
    #[error("concurrent update conflict: {0}")]
    Conflict(String),

    /// A stored row cannot be turned into a domain value.
    #[error("invalid record: {0}")]
    InvalidRecord(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait QuizStore: Send + Sync {
    // Quizzes and questions

    /// Inserts a quiz and its questions atomically.
    async fn create_quiz(&self, quiz: NewQuiz, questions: Vec<NewQuestion>) -> StoreResult<Quiz>;

    async fn get_quiz(&self, quiz_id: Uuid) -> StoreResult<Option<Quiz>>;

    /// Questions of a quiz ordered by position.
    async fn get_questions(&self, quiz_id: Uuid) -> StoreResult<Vec<Question>>;

    /// Marks the quiz published and fixes `total_points` to the sum of its question points.
    async fn publish_quiz(&self, quiz_id: Uuid) -> StoreResult<Option<Quiz>>;

    /// Deletes the quiz with its questions, attempts and favorites.
    async fn delete_quiz(&self, quiz_id: Uuid) -> StoreResult<bool>;

    /// Published quizzes matching the filter.
    async fn list_quizzes(&self, filter: &QuizFilter) -> StoreResult<Vec<Quiz>>;

    async fn list_quizzes_by_creator(&self, user_id: &str) -> StoreResult<Vec<Quiz>>;

    /// Distinct trimmed tags of published quizzes, sorted.
    async fn all_tags(&self) -> StoreResult<Vec<String>>;

    // Attempts

    async fn insert_attempt(&self, attempt: NewAttempt) -> StoreResult<Attempt>;

    async fn list_attempts_by_user(
        &self,
        user_id: &str,
        limit: i64,
    ) -> StoreResult<Vec<AttemptHistoryEntry>>;

    async fn quiz_leaderboard(
        &self,
        quiz_id: Uuid,
        limit: i64,
    ) -> StoreResult<Vec<QuizLeaderboardEntry>>;

    async fn quiz_analytics(&self, quiz_id: Uuid) -> StoreResult<QuizAnalytics>;

    /// Attempts made by anyone on quizzes created by `user_id`.
    async fn count_attempts_on_creator_quizzes(&self, user_id: &str) -> StoreResult<i64>;

    // Statistics

    async fn get_statistics(&self, user_id: &str) -> StoreResult<Option<UserStatistics>>;

    /// Stores `stats` if the stored version still equals `stats.version`
    /// (absent row for version 0). Returns the record with its new version.
    async fn save_statistics(&self, stats: &UserStatistics) -> StoreResult<UserStatistics>;

    async fn global_leaderboard(&self, limit: i64) -> StoreResult<Vec<LeaderboardEntry>>;

    /// 1-based rank on the global leaderboard, `None` without statistics.
    async fn user_rank(&self, user_id: &str) -> StoreResult<Option<i64>>;

    // Achievements

    async fn get_achievement_types(&self, user_id: &str) -> StoreResult<HashSet<String>>;

    /// Returns `None` when the user already holds an achievement of that type.
    async fn insert_achievement(
        &self,
        achievement: NewAchievement,
    ) -> StoreResult<Option<Achievement>>;

    /// Achievements of a user, newest first.
    async fn list_achievements(&self, user_id: &str) -> StoreResult<Vec<Achievement>>;

    // Favorites

    /// Adds or removes the favorite. Returns whether the quiz is now favorited.
    async fn toggle_favorite(&self, user_id: &str, quiz_id: Uuid) -> StoreResult<bool>;

    async fn is_favorited(&self, user_id: &str, quiz_id: Uuid) -> StoreResult<bool>;

    async fn list_favorites(&self, user_id: &str) -> StoreResult<Vec<FavoriteQuiz>>;
}
