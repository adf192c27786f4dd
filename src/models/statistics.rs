// src/models/statistics.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Represents the 'user_stats' table: one aggregate row per user.
///
/// Only the statistics updater writes it, always as a full read-modify-write.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct UserStatistics {
    pub user_id: String,
    pub quizzes_created: i32,
    pub quizzes_taken: i32,
    /// Sum of all attempt percentages.
    pub cumulative_points: i64,
    pub average_score: i32,
    pub best_score: i32,
    pub current_streak: i32,
    pub longest_streak: i32,

    /// 1-based position on the global leaderboard. Computed on read.
    #[sqlx(default)]
    pub rank: i64,

    pub updated_at: chrono::DateTime<chrono::Utc>,

    /// Compare-and-swap token. 0 means the row has never been stored.
    #[serde(skip)]
    pub version: i64,
}

impl UserStatistics {
    /// A record for a user that has neither taken nor created a quiz.
    pub fn empty(user_id: &str, now: chrono::DateTime<chrono::Utc>) -> Self {
        UserStatistics {
            user_id: user_id.to_string(),
            quizzes_created: 0,
            quizzes_taken: 0,
            cumulative_points: 0,
            average_score: 0,
            best_score: 0,
            current_streak: 0,
            longest_streak: 0,
            rank: 0,
            updated_at: now,
            version: 0,
        }
    }
}

/// One row of the global leaderboard.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct LeaderboardEntry {
    pub rank: i64,
    pub user_id: String,
    pub cumulative_points: i64,
    pub average_score: i32,
    pub quizzes_taken: i32,
    pub current_streak: i32,
}

/// Aggregated numbers shown on the dashboard of the current user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DashboardStats {
    pub total_quizzes_created: i64,
    pub published_quizzes: i64,
    pub total_attempts_on_my_quizzes: i64,
    pub my_quizzes_taken: i32,
    pub my_average_score: i32,
    pub my_current_streak: i32,
}
