// src/models/quiz.rs

use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::question::{CreateQuestionRequest, PublicQuestion, Question};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "easy" => Some(Difficulty::Easy),
            "medium" => Some(Difficulty::Medium),
            "hard" => Some(Difficulty::Hard),
            _ => None,
        }
    }
}

/// Represents the 'quizzes' table in the database.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Quiz {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub creator_id: String,
    pub tags: Vec<String>,

    /// Sum of question points, fixed when the quiz is published. 0 before.
    pub total_points: i32,

    pub is_published: bool,
    pub difficulty: Difficulty,

    /// Estimated time to complete, in minutes.
    pub estimated_time: Option<i32>,

    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

/// Quiz data ready to be stored.
#[derive(Debug, Clone)]
pub struct NewQuiz {
    pub title: String,
    pub description: Option<String>,
    pub creator_id: String,
    pub tags: Vec<String>,
    pub difficulty: Difficulty,
    pub estimated_time: Option<i32>,
}

/// A quiz with its questions, as returned by `GET /api/quizzes/{id}`.
///
/// Answer keys are included only for the quiz creator.
#[derive(Debug, Serialize)]
pub struct QuizDetail {
    #[serde(flatten)]
    pub quiz: Quiz,
    pub questions: QuizQuestions,
    pub is_favorited: bool,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum QuizQuestions {
    Full(Vec<Question>),
    Public(Vec<PublicQuestion>),
}

/// DTO for creating a quiz together with its questions.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateQuizRequest {
    #[validate(length(min = 1, max = 200, message = "Quiz title is required"))]
    pub title: String,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    #[validate(length(max = 10))]
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub difficulty: Difficulty,
    #[validate(range(min = 1, max = 600))]
    pub estimated_time: Option<i32>,
    #[validate(
        length(min = 1, max = 100, message = "At least one question is required"),
        nested
    )]
    pub questions: Vec<CreateQuestionRequest>,
    /// Publish right after creation.
    #[serde(default)]
    pub publish: bool,
}

/// Sort orders accepted by the quiz listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuizSort {
    #[default]
    Newest,
    Oldest,
    Title,
    Points,
}

/// Query parameters for listing published quizzes.
#[derive(Debug, Default, Deserialize)]
pub struct QuizListParams {
    /// Case-insensitive match against title or description.
    pub q: Option<String>,
    pub difficulty: Option<Difficulty>,
    /// Comma separated; a quiz matches if it carries any of them.
    pub tags: Option<String>,
    #[serde(default)]
    pub sort: QuizSort,
    pub limit: Option<i64>,
}

/// Normalized listing filter handed to the store.
#[derive(Debug, Clone, Default)]
pub struct QuizFilter {
    pub search: Option<String>,
    pub difficulty: Option<Difficulty>,
    pub tags: Vec<String>,
    pub sort: QuizSort,
    pub limit: i64,
}

impl QuizListParams {
    pub fn into_filter(self, max_limit: i64) -> QuizFilter {
        let tags = self
            .tags
            .map(|t| {
                t.split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        QuizFilter {
            search: self.q.map(|q| q.trim().to_string()).filter(|q| !q.is_empty()),
            difficulty: self.difficulty,
            tags,
            sort: self.sort,
            limit: self.limit.unwrap_or(max_limit).clamp(1, max_limit),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_params_normalize_tags_and_limit() {
        let params = QuizListParams {
            q: Some("  ".to_string()),
            difficulty: None,
            tags: Some("rust, ,sql ".to_string()),
            sort: QuizSort::Title,
            limit: Some(500),
        };
        let filter = params.into_filter(50);
        assert_eq!(filter.search, None);
        assert_eq!(filter.tags, vec!["rust".to_string(), "sql".to_string()]);
        assert_eq!(filter.limit, 50);
        assert_eq!(filter.sort, QuizSort::Title);
    }

    #[test]
    fn difficulty_defaults_to_medium() {
        assert_eq!(Difficulty::default(), Difficulty::Medium);
        assert_eq!(Difficulty::parse("hard"), Some(Difficulty::Hard));
        assert_eq!(Difficulty::parse("extreme"), None);
    }
}
