// src/models/favorite.rs

use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

/// DTO for a favorited quiz item, including joined quiz info.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct FavoriteQuiz {
    pub quiz_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub creator_id: String,
    pub tags: Vec<String>,
    pub total_points: i32,
    pub difficulty: String,
    pub estimated_time: Option<i32>,
    pub favorited_at: chrono::DateTime<chrono::Utc>,
}
