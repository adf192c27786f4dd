// src/models/achievement.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Represents the 'achievements' table in the database.
/// A user holds at most one achievement of each `type`.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Achievement {
    pub id: Uuid,
    pub user_id: String,
    #[sqlx(rename = "type")]
    #[serde(rename = "type")]
    pub achievement_type: String,
    pub title: String,
    pub description: Option<String>,
    pub icon_name: Option<String>,
    pub earned_at: chrono::DateTime<chrono::Utc>,
}

/// Achievement data ready to be stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAchievement {
    pub user_id: String,
    pub achievement_type: String,
    pub title: String,
    pub description: Option<String>,
    pub icon_name: Option<String>,
}
