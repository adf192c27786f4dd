// src/store/postgres.rs

use std::collections::HashSet;

use async_trait::async_trait;
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder, types::Json};
use uuid::Uuid;

use crate::{
    models::{
        achievement::{Achievement, NewAchievement},
        attempt::{Attempt, AttemptHistoryEntry, NewAttempt, QuizAnalytics, QuizLeaderboardEntry},
        favorite::FavoriteQuiz,
        question::{AnswerKey, NewQuestion, Question, QuestionType},
        quiz::{Difficulty, NewQuiz, Quiz, QuizFilter, QuizSort},
        statistics::{LeaderboardEntry, UserStatistics},
    },
    store::{QuizStore, StoreError, StoreResult},
};

const QUIZ_COLUMNS: &str = "id, title, description, creator_id, tags, is_published, total_points, \
     difficulty, estimated_time, created_at, updated_at";

const QUESTION_COLUMNS: &str =
    "id, quiz_id, type, prompt, options, correct_answers, points, explanation, position";

const ATTEMPT_COLUMNS: &str =
    "id, quiz_id, user_id, score, total_points, percentage, answers, time_spent, completed_at";

const STATS_COLUMNS: &str = "user_id, quizzes_created, quizzes_taken, cumulative_points, average_score, \
     best_score, current_streak, longest_streak, updated_at, version";

const ACHIEVEMENT_COLUMNS: &str = "id, user_id, type, title, description, icon_name, earned_at";

/// Raw 'quizzes' row; `difficulty` is stored as text.
#[derive(FromRow)]
struct QuizRow {
    id: Uuid,
    title: String,
    description: Option<String>,
    creator_id: String,
    tags: Vec<String>,
    is_published: bool,
    total_points: i32,
    difficulty: String,
    estimated_time: Option<i32>,
    created_at: chrono::DateTime<chrono::Utc>,
    updated_at: chrono::DateTime<chrono::Utc>,
}

impl TryFrom<QuizRow> for Quiz {
    type Error = StoreError;

    fn try_from(row: QuizRow) -> Result<Self, Self::Error> {
        let difficulty = Difficulty::parse(&row.difficulty).ok_or_else(|| {
            StoreError::InvalidRecord(format!(
                "quiz {} has unknown difficulty '{}'",
                row.id, row.difficulty
            ))
        })?;

        Ok(Quiz {
            id: row.id,
            title: row.title,
            description: row.description,
            creator_id: row.creator_id,
            tags: row.tags,
            total_points: row.total_points,
            is_published: row.is_published,
            difficulty,
            estimated_time: row.estimated_time,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Raw 'questions' row. The answer key is split over `type` and `correct_answers`.
#[derive(FromRow)]
struct QuestionRow {
    id: Uuid,
    quiz_id: Uuid,
    #[sqlx(rename = "type")]
    question_type: String,
    prompt: String,
    options: Json<Vec<String>>,
    correct_answers: Json<Vec<String>>,
    points: i32,
    explanation: Option<String>,
    position: i32,
}

impl TryFrom<QuestionRow> for Question {
    type Error = StoreError;

    fn try_from(row: QuestionRow) -> Result<Self, Self::Error> {
        let question_type = QuestionType::parse(&row.question_type).ok_or_else(|| {
            StoreError::InvalidRecord(format!(
                "question {} has unsupported type '{}'",
                row.id, row.question_type
            ))
        })?;

        let answer_key = AnswerKey::from_parts(question_type, row.correct_answers.0)
            .ok_or_else(|| {
                StoreError::InvalidRecord(format!(
                    "question {} has malformed correct answers",
                    row.id
                ))
            })?;

        Ok(Question {
            id: row.id,
            quiz_id: row.quiz_id,
            prompt: row.prompt,
            options: row.options.0,
            answer_key,
            points: row.points,
            explanation: row.explanation,
            position: row.position,
        })
    }
}

fn into_quizzes(rows: Vec<QuizRow>) -> StoreResult<Vec<Quiz>> {
    rows.into_iter().map(Quiz::try_from).collect()
}

/// Escapes LIKE wildcards so user input matches literally.
fn like_pattern(term: &str) -> String {
    let escaped = term
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

/// PostgreSQL implementation of [`QuizStore`].
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl QuizStore for PgStore {
    async fn create_quiz(&self, quiz: NewQuiz, questions: Vec<NewQuestion>) -> StoreResult<Quiz> {
        let mut tx = self.pool.begin().await?;

        let row: QuizRow = sqlx::query_as(&format!(
            r#"
            INSERT INTO quizzes (id, title, description, creator_id, tags, difficulty, estimated_time)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {QUIZ_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(&quiz.title)
        .bind(&quiz.description)
        .bind(&quiz.creator_id)
        .bind(&quiz.tags)
        .bind(quiz.difficulty.as_str())
        .bind(quiz.estimated_time)
        .fetch_one(&mut *tx)
        .await?;

        for question in &questions {
            sqlx::query(
                r#"
                INSERT INTO questions
                    (id, quiz_id, type, prompt, options, correct_answers, points, explanation, position)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(row.id)
            .bind(question.answer_key.question_type().as_str())
            .bind(&question.prompt)
            .bind(Json(&question.options))
            .bind(Json(question.answer_key.to_list()))
            .bind(question.points)
            .bind(&question.explanation)
            .bind(question.position)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        Quiz::try_from(row)
    }

    async fn get_quiz(&self, quiz_id: Uuid) -> StoreResult<Option<Quiz>> {
        let row: Option<QuizRow> =
            sqlx::query_as(&format!("SELECT {QUIZ_COLUMNS} FROM quizzes WHERE id = $1"))
                .bind(quiz_id)
                .fetch_optional(&self.pool)
                .await?;

        row.map(Quiz::try_from).transpose()
    }

    async fn get_questions(&self, quiz_id: Uuid) -> StoreResult<Vec<Question>> {
        let rows: Vec<QuestionRow> = sqlx::query_as(&format!(
            "SELECT {QUESTION_COLUMNS} FROM questions WHERE quiz_id = $1 ORDER BY position ASC"
        ))
        .bind(quiz_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Question::try_from).collect()
    }

    async fn publish_quiz(&self, quiz_id: Uuid) -> StoreResult<Option<Quiz>> {
        let row: Option<QuizRow> = sqlx::query_as(&format!(
            r#"
            UPDATE quizzes SET
                is_published = TRUE,
                total_points = COALESCE((SELECT SUM(points) FROM questions WHERE quiz_id = $1), 0)::INTEGER,
                updated_at = NOW()
            WHERE id = $1
            RETURNING {QUIZ_COLUMNS}
            "#
        ))
        .bind(quiz_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Quiz::try_from).transpose()
    }

    async fn delete_quiz(&self, quiz_id: Uuid) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM quizzes WHERE id = $1")
            .bind(quiz_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_quizzes(&self, filter: &QuizFilter) -> StoreResult<Vec<Quiz>> {
        let mut query_builder = QueryBuilder::<Postgres>::new(format!(
            "SELECT {QUIZ_COLUMNS} FROM quizzes WHERE is_published = TRUE"
        ));

        if let Some(search) = &filter.search {
            let pattern = like_pattern(search);
            query_builder
                .push(" AND (title ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR description ILIKE ")
                .push_bind(pattern)
                .push(")");
        }

        if let Some(difficulty) = filter.difficulty {
            query_builder
                .push(" AND difficulty = ")
                .push_bind(difficulty.as_str());
        }

        if !filter.tags.is_empty() {
            query_builder
                .push(" AND tags && ")
                .push_bind(filter.tags.clone());
        }

        query_builder.push(match filter.sort {
            QuizSort::Newest => " ORDER BY created_at DESC",
            QuizSort::Oldest => " ORDER BY created_at ASC",
            QuizSort::Title => " ORDER BY title ASC",
            QuizSort::Points => " ORDER BY total_points DESC",
        });

        query_builder.push(" LIMIT ").push_bind(filter.limit);

        let rows: Vec<QuizRow> = query_builder
            .build_query_as()
            .fetch_all(&self.pool)
            .await?;

        into_quizzes(rows)
    }

    async fn list_quizzes_by_creator(&self, user_id: &str) -> StoreResult<Vec<Quiz>> {
        let rows: Vec<QuizRow> = sqlx::query_as(&format!(
            "SELECT {QUIZ_COLUMNS} FROM quizzes WHERE creator_id = $1 ORDER BY created_at DESC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        into_quizzes(rows)
    }

    async fn all_tags(&self) -> StoreResult<Vec<String>> {
        let tags: Vec<String> = sqlx::query_scalar(
            r#"
            SELECT DISTINCT TRIM(t) AS tag
            FROM quizzes, UNNEST(tags) AS t
            WHERE is_published = TRUE AND TRIM(t) <> ''
            ORDER BY tag
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(tags)
    }

    async fn insert_attempt(&self, attempt: NewAttempt) -> StoreResult<Attempt> {
        let inserted: Attempt = sqlx::query_as(&format!(
            r#"
            INSERT INTO quiz_attempts
                (id, quiz_id, user_id, score, total_points, percentage, answers, time_spent)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {ATTEMPT_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(attempt.quiz_id)
        .bind(&attempt.user_id)
        .bind(attempt.score)
        .bind(attempt.total_points)
        .bind(attempt.percentage)
        .bind(Json(&attempt.answers))
        .bind(attempt.time_spent)
        .fetch_one(&self.pool)
        .await?;

        Ok(inserted)
    }

    async fn list_attempts_by_user(
        &self,
        user_id: &str,
        limit: i64,
    ) -> StoreResult<Vec<AttemptHistoryEntry>> {
        let entries = sqlx::query_as::<_, AttemptHistoryEntry>(
            r#"
            SELECT
                a.id, a.quiz_id,
                q.title AS quiz_title, q.difficulty AS quiz_difficulty,
                a.score, a.total_points, a.percentage, a.time_spent, a.completed_at
            FROM quiz_attempts a
            LEFT JOIN quizzes q ON a.quiz_id = q.id
            WHERE a.user_id = $1
            ORDER BY a.completed_at DESC
            LIMIT $2
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }

    async fn quiz_leaderboard(
        &self,
        quiz_id: Uuid,
        limit: i64,
    ) -> StoreResult<Vec<QuizLeaderboardEntry>> {
        let entries = sqlx::query_as::<_, QuizLeaderboardEntry>(
            r#"
            WITH best AS (
                SELECT user_id, MAX(percentage) AS best_score, COUNT(*) AS attempt_count
                FROM quiz_attempts
                WHERE quiz_id = $1
                GROUP BY user_id
            )
            SELECT
                b.user_id,
                b.best_score,
                (
                    SELECT MIN(a.time_spent) FROM quiz_attempts a
                    WHERE a.quiz_id = $1 AND a.user_id = b.user_id AND a.percentage = b.best_score
                ) AS best_time,
                b.attempt_count
            FROM best b
            ORDER BY b.best_score DESC, best_time ASC NULLS LAST, b.user_id ASC
            LIMIT $2
            "#,
        )
        .bind(quiz_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }

    async fn quiz_analytics(&self, quiz_id: Uuid) -> StoreResult<QuizAnalytics> {
        let (total_attempts, average_score, average_time): (i64, i64, i64) = sqlx::query_as(
            r#"
            SELECT
                COUNT(*),
                COALESCE(ROUND(AVG(percentage)), 0)::BIGINT,
                COALESCE(ROUND(AVG(time_spent)), 0)::BIGINT
            FROM quiz_attempts
            WHERE quiz_id = $1
            "#,
        )
        .bind(quiz_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(QuizAnalytics {
            total_attempts,
            average_score,
            average_time,
        })
    }

    async fn count_attempts_on_creator_quizzes(&self, user_id: &str) -> StoreResult<i64> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM quiz_attempts a
            JOIN quizzes q ON a.quiz_id = q.id
            WHERE q.creator_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    async fn get_statistics(&self, user_id: &str) -> StoreResult<Option<UserStatistics>> {
        let stats = sqlx::query_as::<_, UserStatistics>(&format!(
            "SELECT {STATS_COLUMNS} FROM user_stats WHERE user_id = $1"
        ))
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(stats)
    }

    async fn save_statistics(&self, stats: &UserStatistics) -> StoreResult<UserStatistics> {
        let new_version: Option<i64> = if stats.version == 0 {
            sqlx::query_scalar(
                r#"
                INSERT INTO user_stats
                    (user_id, quizzes_created, quizzes_taken, cumulative_points, average_score,
                     best_score, current_streak, longest_streak, updated_at, version)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, 1)
                ON CONFLICT (user_id) DO NOTHING
                RETURNING version
                "#,
            )
            .bind(&stats.user_id)
            .bind(stats.quizzes_created)
            .bind(stats.quizzes_taken)
            .bind(stats.cumulative_points)
            .bind(stats.average_score)
            .bind(stats.best_score)
            .bind(stats.current_streak)
            .bind(stats.longest_streak)
            .bind(stats.updated_at)
            .fetch_optional(&self.pool)
            .await?
        } else {
            sqlx::query_scalar(
                r#"
                UPDATE user_stats SET
                    quizzes_created = $2,
                    quizzes_taken = $3,
                    cumulative_points = $4,
                    average_score = $5,
                    best_score = $6,
                    current_streak = $7,
                    longest_streak = $8,
                    updated_at = $9,
                    version = version + 1
                WHERE user_id = $1 AND version = $10
                RETURNING version
                "#,
            )
            .bind(&stats.user_id)
            .bind(stats.quizzes_created)
            .bind(stats.quizzes_taken)
            .bind(stats.cumulative_points)
            .bind(stats.average_score)
            .bind(stats.best_score)
            .bind(stats.current_streak)
            .bind(stats.longest_streak)
            .bind(stats.updated_at)
            .bind(stats.version)
            .fetch_optional(&self.pool)
            .await?
        };

        let version = new_version.ok_or_else(|| {
            StoreError::Conflict(format!(
                "statistics of user {} changed since version {}",
                stats.user_id, stats.version
            ))
        })?;

        Ok(UserStatistics {
            version,
            ..stats.clone()
        })
    }

    async fn global_leaderboard(&self, limit: i64) -> StoreResult<Vec<LeaderboardEntry>> {
        let entries = sqlx::query_as::<_, LeaderboardEntry>(
            r#"
            SELECT
                RANK() OVER (ORDER BY cumulative_points DESC, average_score DESC) AS rank,
                user_id, cumulative_points, average_score, quizzes_taken, current_streak
            FROM user_stats
            WHERE quizzes_taken > 0
            ORDER BY cumulative_points DESC, average_score DESC, user_id ASC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }

    async fn user_rank(&self, user_id: &str) -> StoreResult<Option<i64>> {
        let rank: Option<i64> = sqlx::query_scalar(
            r#"
            SELECT 1 + (
                SELECT COUNT(*) FROM user_stats o
                WHERE o.quizzes_taken > 0
                  AND (o.cumulative_points, o.average_score) > (s.cumulative_points, s.average_score)
            )
            FROM user_stats s
            WHERE s.user_id = $1 AND s.quizzes_taken > 0
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(rank)
    }

    async fn get_achievement_types(&self, user_id: &str) -> StoreResult<HashSet<String>> {
        let types: Vec<String> =
            sqlx::query_scalar("SELECT type FROM achievements WHERE user_id = $1")
                .bind(user_id)
                .fetch_all(&self.pool)
                .await?;

        Ok(types.into_iter().collect())
    }

    async fn insert_achievement(
        &self,
        achievement: NewAchievement,
    ) -> StoreResult<Option<Achievement>> {
        // The (user_id, type) constraint turns a concurrent duplicate into a no-op.
        let inserted = sqlx::query_as::<_, Achievement>(&format!(
            r#"
            INSERT INTO achievements (id, user_id, type, title, description, icon_name)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (user_id, type) DO NOTHING
            RETURNING {ACHIEVEMENT_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(&achievement.user_id)
        .bind(&achievement.achievement_type)
        .bind(&achievement.title)
        .bind(&achievement.description)
        .bind(&achievement.icon_name)
        .fetch_optional(&self.pool)
        .await?;

        Ok(inserted)
    }

    async fn list_achievements(&self, user_id: &str) -> StoreResult<Vec<Achievement>> {
        let list = sqlx::query_as::<_, Achievement>(&format!(
            "SELECT {ACHIEVEMENT_COLUMNS} FROM achievements WHERE user_id = $1 ORDER BY earned_at DESC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(list)
    }

    async fn toggle_favorite(&self, user_id: &str, quiz_id: Uuid) -> StoreResult<bool> {
        let mut tx = self.pool.begin().await?;

        let removed = sqlx::query("DELETE FROM quiz_favorites WHERE user_id = $1 AND quiz_id = $2")
            .bind(user_id)
            .bind(quiz_id)
            .execute(&mut *tx)
            .await?
            .rows_affected()
            > 0;

        if !removed {
            sqlx::query(
                "INSERT INTO quiz_favorites (user_id, quiz_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
            )
            .bind(user_id)
            .bind(quiz_id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        Ok(!removed)
    }

    async fn is_favorited(&self, user_id: &str, quiz_id: Uuid) -> StoreResult<bool> {
        let existing: Option<i32> = sqlx::query_scalar(
            "SELECT 1 FROM quiz_favorites WHERE user_id = $1 AND quiz_id = $2",
        )
        .bind(user_id)
        .bind(quiz_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(existing.is_some())
    }

    async fn list_favorites(&self, user_id: &str) -> StoreResult<Vec<FavoriteQuiz>> {
        let favorites = sqlx::query_as::<_, FavoriteQuiz>(
            r#"
            SELECT
                q.id AS quiz_id, q.title, q.description, q.creator_id, q.tags,
                q.total_points, q.difficulty, q.estimated_time,
                f.created_at AS favorited_at
            FROM quiz_favorites f
            JOIN quizzes q ON f.quiz_id = q.id
            WHERE f.user_id = $1
            ORDER BY f.created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(favorites)
    }
}
