// src/store/memory.rs

use std::collections::{BTreeSet, HashMap, HashSet};

use async_trait::async_trait;
use chrono::Utc;
use sqlx::types::Json;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{
    models::{
        achievement::{Achievement, NewAchievement},
        attempt::{Attempt, AttemptHistoryEntry, NewAttempt, QuizAnalytics, QuizLeaderboardEntry},
        favorite::FavoriteQuiz,
        question::{NewQuestion, Question},
        quiz::{NewQuiz, Quiz, QuizFilter, QuizSort},
        statistics::{LeaderboardEntry, UserStatistics},
    },
    store::{QuizStore, StoreError, StoreResult},
};

#[derive(Default)]
struct Inner {
    quizzes: HashMap<Uuid, Quiz>,
    questions: HashMap<Uuid, Vec<Question>>,
    /// Insertion order is completion order.
    attempts: Vec<Attempt>,
    stats: HashMap<String, UserStatistics>,
    achievements: Vec<Achievement>,
    favorites: Vec<(String, Uuid, chrono::DateTime<Utc>)>,
}

impl Inner {
    /// Users with at least one attempt, in leaderboard order.
    fn ranked(&self) -> Vec<&UserStatistics> {
        let mut ranked: Vec<&UserStatistics> =
            self.stats.values().filter(|s| s.quizzes_taken > 0).collect();
        ranked.sort_by(|a, b| {
            b.cumulative_points
                .cmp(&a.cumulative_points)
                .then(b.average_score.cmp(&a.average_score))
                .then(a.user_id.cmp(&b.user_id))
        });
        ranked
    }

    fn rank_of(&self, stats: &UserStatistics) -> i64 {
        let ahead = self
            .stats
            .values()
            .filter(|o| {
                o.quizzes_taken > 0
                    && (o.cumulative_points, o.average_score)
                        > (stats.cumulative_points, stats.average_score)
            })
            .count();
        ahead as i64 + 1
    }
}

/// In-process [`QuizStore`]. All data is lost when it is dropped.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn round_div(sum: i64, count: i64) -> i64 {
    if count == 0 {
        return 0;
    }
    (2 * sum + count) / (2 * count)
}

#[async_trait]
impl QuizStore for MemoryStore {
    async fn create_quiz(&self, quiz: NewQuiz, questions: Vec<NewQuestion>) -> StoreResult<Quiz> {
        let now = Utc::now();
        let stored = Quiz {
            id: Uuid::new_v4(),
            title: quiz.title,
            description: quiz.description,
            creator_id: quiz.creator_id,
            tags: quiz.tags,
            total_points: 0,
            is_published: false,
            difficulty: quiz.difficulty,
            estimated_time: quiz.estimated_time,
            created_at: now,
            updated_at: now,
        };

        let mut stored_questions: Vec<Question> = questions
            .into_iter()
            .map(|q| Question {
                id: Uuid::new_v4(),
                quiz_id: stored.id,
                prompt: q.prompt,
                options: q.options,
                answer_key: q.answer_key,
                points: q.points,
                explanation: q.explanation,
                position: q.position,
            })
            .collect();
        stored_questions.sort_by_key(|q| q.position);

        let mut inner = self.inner.write().await;
        inner.questions.insert(stored.id, stored_questions);
        inner.quizzes.insert(stored.id, stored.clone());

        Ok(stored)
    }

    async fn get_quiz(&self, quiz_id: Uuid) -> StoreResult<Option<Quiz>> {
        Ok(self.inner.read().await.quizzes.get(&quiz_id).cloned())
    }

    async fn get_questions(&self, quiz_id: Uuid) -> StoreResult<Vec<Question>> {
        Ok(self
            .inner
            .read()
            .await
            .questions
            .get(&quiz_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn publish_quiz(&self, quiz_id: Uuid) -> StoreResult<Option<Quiz>> {
        let mut inner = self.inner.write().await;
        let total: i32 = inner
            .questions
            .get(&quiz_id)
            .map(|qs| qs.iter().map(|q| q.points).sum())
            .unwrap_or(0);

        Ok(inner.quizzes.get_mut(&quiz_id).map(|quiz| {
            quiz.is_published = true;
            quiz.total_points = total;
            quiz.updated_at = Utc::now();
            quiz.clone()
        }))
    }

    async fn delete_quiz(&self, quiz_id: Uuid) -> StoreResult<bool> {
        let mut inner = self.inner.write().await;
        if inner.quizzes.remove(&quiz_id).is_none() {
            return Ok(false);
        }
        inner.questions.remove(&quiz_id);
        inner.attempts.retain(|a| a.quiz_id != quiz_id);
        inner.favorites.retain(|(_, q, _)| *q != quiz_id);
        Ok(true)
    }

    async fn list_quizzes(&self, filter: &QuizFilter) -> StoreResult<Vec<Quiz>> {
        let inner = self.inner.read().await;
        let search = filter.search.as_ref().map(|s| s.to_lowercase());

        let mut quizzes: Vec<Quiz> = inner
            .quizzes
            .values()
            .filter(|q| q.is_published)
            .filter(|q| match &search {
                Some(term) => {
                    q.title.to_lowercase().contains(term)
                        || q
                            .description
                            .as_ref()
                            .is_some_and(|d| d.to_lowercase().contains(term))
                }
                None => true,
            })
            .filter(|q| filter.difficulty.is_none_or(|d| q.difficulty == d))
            .filter(|q| filter.tags.is_empty() || q.tags.iter().any(|t| filter.tags.contains(t)))
            .cloned()
            .collect();

        match filter.sort {
            QuizSort::Newest => quizzes.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
            QuizSort::Oldest => quizzes.sort_by(|a, b| a.created_at.cmp(&b.created_at)),
            QuizSort::Title => quizzes.sort_by(|a, b| a.title.cmp(&b.title)),
            QuizSort::Points => quizzes.sort_by(|a, b| b.total_points.cmp(&a.total_points)),
        }
        quizzes.truncate(filter.limit.max(0) as usize);

        Ok(quizzes)
    }

    async fn list_quizzes_by_creator(&self, user_id: &str) -> StoreResult<Vec<Quiz>> {
        let inner = self.inner.read().await;
        let mut quizzes: Vec<Quiz> = inner
            .quizzes
            .values()
            .filter(|q| q.creator_id == user_id)
            .cloned()
            .collect();
        quizzes.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(quizzes)
    }

    async fn all_tags(&self) -> StoreResult<Vec<String>> {
        let inner = self.inner.read().await;
        let tags: BTreeSet<String> = inner
            .quizzes
            .values()
            .filter(|q| q.is_published)
            .flat_map(|q| q.tags.iter())
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect();
        Ok(tags.into_iter().collect())
    }

    async fn insert_attempt(&self, attempt: NewAttempt) -> StoreResult<Attempt> {
        let mut inner = self.inner.write().await;

        // Same constraints as the quiz_attempts table
        if !(0..=100).contains(&attempt.percentage) {
            return Err(StoreError::InvalidRecord(format!(
                "attempt percentage {} is outside 0..=100",
                attempt.percentage
            )));
        }
        if !inner.quizzes.contains_key(&attempt.quiz_id) {
            return Err(StoreError::InvalidRecord(format!(
                "attempt references unknown quiz {}",
                attempt.quiz_id
            )));
        }

        let stored = Attempt {
            id: Uuid::new_v4(),
            quiz_id: attempt.quiz_id,
            user_id: attempt.user_id,
            score: attempt.score,
            total_points: attempt.total_points,
            percentage: attempt.percentage,
            answers: Json(attempt.answers),
            time_spent: attempt.time_spent,
            completed_at: Utc::now(),
        };
        inner.attempts.push(stored.clone());
        Ok(stored)
    }

    async fn list_attempts_by_user(
        &self,
        user_id: &str,
        limit: i64,
    ) -> StoreResult<Vec<AttemptHistoryEntry>> {
        let inner = self.inner.read().await;
        Ok(inner
            .attempts
            .iter()
            .rev()
            .filter(|a| a.user_id == user_id)
            .take(limit.max(0) as usize)
            .map(|a| {
                let quiz = inner.quizzes.get(&a.quiz_id);
                AttemptHistoryEntry {
                    id: a.id,
                    quiz_id: a.quiz_id,
                    quiz_title: quiz.map(|q| q.title.clone()),
                    quiz_difficulty: quiz.map(|q| q.difficulty.as_str().to_string()),
                    score: a.score,
                    total_points: a.total_points,
                    percentage: a.percentage,
                    time_spent: a.time_spent,
                    completed_at: a.completed_at,
                }
            })
            .collect())
    }

    async fn quiz_leaderboard(
        &self,
        quiz_id: Uuid,
        limit: i64,
    ) -> StoreResult<Vec<QuizLeaderboardEntry>> {
        let inner = self.inner.read().await;
        let mut per_user: HashMap<&str, QuizLeaderboardEntry> = HashMap::new();

        for a in inner.attempts.iter().filter(|a| a.quiz_id == quiz_id) {
            let entry = per_user
                .entry(a.user_id.as_str())
                .or_insert_with(|| QuizLeaderboardEntry {
                    user_id: a.user_id.clone(),
                    best_score: a.percentage,
                    best_time: a.time_spent,
                    attempt_count: 0,
                });
            entry.attempt_count += 1;
            if a.percentage > entry.best_score {
                entry.best_score = a.percentage;
                entry.best_time = a.time_spent;
            } else if a.percentage == entry.best_score {
                entry.best_time = match (entry.best_time, a.time_spent) {
                    (Some(x), Some(y)) => Some(x.min(y)),
                    (x, y) => x.or(y),
                };
            }
        }

        let mut entries: Vec<QuizLeaderboardEntry> = per_user.into_values().collect();
        entries.sort_by(|a, b| {
            b.best_score
                .cmp(&a.best_score)
                .then_with(|| match (a.best_time, b.best_time) {
                    (Some(x), Some(y)) => x.cmp(&y),
                    (Some(_), None) => std::cmp::Ordering::Less,
                    (None, Some(_)) => std::cmp::Ordering::Greater,
                    (None, None) => std::cmp::Ordering::Equal,
                })
                .then(a.user_id.cmp(&b.user_id))
        });
        entries.truncate(limit.max(0) as usize);
        Ok(entries)
    }

    async fn quiz_analytics(&self, quiz_id: Uuid) -> StoreResult<QuizAnalytics> {
        let inner = self.inner.read().await;
        let attempts: Vec<&Attempt> = inner
            .attempts
            .iter()
            .filter(|a| a.quiz_id == quiz_id)
            .collect();

        let total = attempts.len() as i64;
        let score_sum: i64 = attempts.iter().map(|a| a.percentage as i64).sum();
        let times: Vec<i64> = attempts
            .iter()
            .filter_map(|a| a.time_spent.map(i64::from))
            .collect();

        Ok(QuizAnalytics {
            total_attempts: total,
            average_score: round_div(score_sum, total),
            average_time: round_div(times.iter().sum(), times.len() as i64),
        })
    }

    async fn count_attempts_on_creator_quizzes(&self, user_id: &str) -> StoreResult<i64> {
        let inner = self.inner.read().await;
        Ok(inner
            .attempts
            .iter()
            .filter(|a| {
                inner
                    .quizzes
                    .get(&a.quiz_id)
                    .is_some_and(|q| q.creator_id == user_id)
            })
            .count() as i64)
    }

    async fn get_statistics(&self, user_id: &str) -> StoreResult<Option<UserStatistics>> {
        Ok(self.inner.read().await.stats.get(user_id).cloned())
    }

    async fn save_statistics(&self, stats: &UserStatistics) -> StoreResult<UserStatistics> {
        let mut inner = self.inner.write().await;
        let stored_version = inner.stats.get(&stats.user_id).map_or(0, |s| s.version);

        if stored_version != stats.version {
            return Err(StoreError::Conflict(format!(
                "statistics of user {} changed since version {}",
                stats.user_id, stats.version
            )));
        }

        let saved = UserStatistics {
            version: stats.version + 1,
            ..stats.clone()
        };
        inner.stats.insert(saved.user_id.clone(), saved.clone());
        Ok(saved)
    }

    async fn global_leaderboard(&self, limit: i64) -> StoreResult<Vec<LeaderboardEntry>> {
        let inner = self.inner.read().await;
        Ok(inner
            .ranked()
            .into_iter()
            .take(limit.max(0) as usize)
            .map(|s| LeaderboardEntry {
                rank: inner.rank_of(s),
                user_id: s.user_id.clone(),
                cumulative_points: s.cumulative_points,
                average_score: s.average_score,
                quizzes_taken: s.quizzes_taken,
                current_streak: s.current_streak,
            })
            .collect())
    }

    async fn user_rank(&self, user_id: &str) -> StoreResult<Option<i64>> {
        let inner = self.inner.read().await;
        Ok(inner
            .stats
            .get(user_id)
            .filter(|s| s.quizzes_taken > 0)
            .map(|s| inner.rank_of(s)))
    }

    async fn get_achievement_types(&self, user_id: &str) -> StoreResult<HashSet<String>> {
        Ok(self
            .inner
            .read()
            .await
            .achievements
            .iter()
            .filter(|a| a.user_id == user_id)
            .map(|a| a.achievement_type.clone())
            .collect())
    }

    async fn insert_achievement(
        &self,
        achievement: NewAchievement,
    ) -> StoreResult<Option<Achievement>> {
        let mut inner = self.inner.write().await;
        let exists = inner.achievements.iter().any(|a| {
            a.user_id == achievement.user_id && a.achievement_type == achievement.achievement_type
        });
        if exists {
            return Ok(None);
        }

        let stored = Achievement {
            id: Uuid::new_v4(),
            user_id: achievement.user_id,
            achievement_type: achievement.achievement_type,
            title: achievement.title,
            description: achievement.description,
            icon_name: achievement.icon_name,
            earned_at: Utc::now(),
        };
        inner.achievements.push(stored.clone());
        Ok(Some(stored))
    }

    async fn list_achievements(&self, user_id: &str) -> StoreResult<Vec<Achievement>> {
        Ok(self
            .inner
            .read()
            .await
            .achievements
            .iter()
            .rev()
            .filter(|a| a.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn toggle_favorite(&self, user_id: &str, quiz_id: Uuid) -> StoreResult<bool> {
        let mut inner = self.inner.write().await;
        let before = inner.favorites.len();
        inner
            .favorites
            .retain(|(u, q, _)| !(u == user_id && *q == quiz_id));

        if inner.favorites.len() < before {
            return Ok(false);
        }
        inner
            .favorites
            .push((user_id.to_string(), quiz_id, Utc::now()));
        Ok(true)
    }

    async fn is_favorited(&self, user_id: &str, quiz_id: Uuid) -> StoreResult<bool> {
        Ok(self
            .inner
            .read()
            .await
            .favorites
            .iter()
            .any(|(u, q, _)| u == user_id && *q == quiz_id))
    }

    async fn list_favorites(&self, user_id: &str) -> StoreResult<Vec<FavoriteQuiz>> {
        let inner = self.inner.read().await;
        Ok(inner
            .favorites
            .iter()
            .rev()
            .filter(|(u, _, _)| u == user_id)
            .filter_map(|(_, quiz_id, at)| {
                inner.quizzes.get(quiz_id).map(|q| FavoriteQuiz {
                    quiz_id: q.id,
                    title: q.title.clone(),
                    description: q.description.clone(),
                    creator_id: q.creator_id.clone(),
                    tags: q.tags.clone(),
                    total_points: q.total_points,
                    difficulty: q.difficulty.as_str().to_string(),
                    estimated_time: q.estimated_time,
                    favorited_at: *at,
                })
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::quiz::Difficulty;

    fn stats(user: &str, taken: i32, points: i64, avg: i32) -> UserStatistics {
        UserStatistics {
            quizzes_taken: taken,
            cumulative_points: points,
            average_score: avg,
            ..UserStatistics::empty(user, Utc::now())
        }
    }

    #[tokio::test]
    async fn save_statistics_is_compare_and_swap() {
        let store = MemoryStore::new();
        let first = store.save_statistics(&stats("alice", 1, 80, 80)).await.unwrap();
        assert_eq!(first.version, 1);

        // A second writer that read the absent state loses.
        let stale = store.save_statistics(&stats("alice", 1, 50, 50)).await;
        assert!(matches!(stale, Err(StoreError::Conflict(_))));

        let second = store
            .save_statistics(&UserStatistics {
                quizzes_taken: 2,
                ..first.clone()
            })
            .await
            .unwrap();
        assert_eq!(second.version, 2);
    }

    #[tokio::test]
    async fn ranking_orders_by_points_then_average() {
        let store = MemoryStore::new();
        store.save_statistics(&stats("a", 2, 150, 75)).await.unwrap();
        store.save_statistics(&stats("b", 3, 150, 50)).await.unwrap();
        store.save_statistics(&stats("c", 1, 200, 100)).await.unwrap();
        store.save_statistics(&stats("creator", 0, 0, 0)).await.unwrap();

        let board = store.global_leaderboard(10).await.unwrap();
        let order: Vec<(&str, i64)> = board.iter().map(|e| (e.user_id.as_str(), e.rank)).collect();
        assert_eq!(order, vec![("c", 1), ("a", 2), ("b", 3)]);

        assert_eq!(store.user_rank("b").await.unwrap(), Some(3));
        assert_eq!(store.user_rank("creator").await.unwrap(), None);
    }

    #[tokio::test]
    async fn achievement_types_are_unique_per_user() {
        let store = MemoryStore::new();
        let new = NewAchievement {
            user_id: "alice".to_string(),
            achievement_type: "first_quiz".to_string(),
            title: "Getting Started".to_string(),
            description: None,
            icon_name: None,
        };
        assert!(store.insert_achievement(new.clone()).await.unwrap().is_some());
        assert!(store.insert_achievement(new).await.unwrap().is_none());
        assert_eq!(store.list_achievements("alice").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn attempts_need_a_quiz_and_a_valid_percentage() {
        let store = MemoryStore::new();
        let quiz = store
            .create_quiz(
                NewQuiz {
                    title: "Rust".to_string(),
                    description: None,
                    creator_id: "alice".to_string(),
                    tags: vec![],
                    difficulty: Difficulty::Easy,
                    estimated_time: None,
                },
                vec![],
            )
            .await
            .unwrap();
        let attempt = |quiz_id: Uuid, percentage: i32| NewAttempt {
            quiz_id,
            user_id: "bob".to_string(),
            score: 0,
            total_points: 0,
            percentage,
            answers: Default::default(),
            time_spent: None,
        };

        let unknown_quiz = store.insert_attempt(attempt(Uuid::new_v4(), 50)).await;
        assert!(matches!(unknown_quiz, Err(StoreError::InvalidRecord(_))));

        for percentage in [-1, 101] {
            let out_of_range = store.insert_attempt(attempt(quiz.id, percentage)).await;
            assert!(matches!(out_of_range, Err(StoreError::InvalidRecord(_))));
        }

        assert!(store.insert_attempt(attempt(quiz.id, 100)).await.is_ok());
        assert_eq!(store.list_attempts_by_user("bob", 10).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn delete_quiz_cascades() {
        let store = MemoryStore::new();
        let quiz = store
            .create_quiz(
                NewQuiz {
                    title: "Rust".to_string(),
                    description: None,
                    creator_id: "alice".to_string(),
                    tags: vec![],
                    difficulty: Difficulty::Easy,
                    estimated_time: None,
                },
                vec![],
            )
            .await
            .unwrap();
        assert!(store.toggle_favorite("bob", quiz.id).await.unwrap());

        assert!(store.delete_quiz(quiz.id).await.unwrap());
        assert!(!store.delete_quiz(quiz.id).await.unwrap());
        assert!(store.list_favorites("bob").await.unwrap().is_empty());
    }
}
