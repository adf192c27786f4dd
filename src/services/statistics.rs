//! Rolling per-user statistics.
//!
//! The transitions are pure functions over `Option<UserStatistics>`; the async
//! wrappers do the read-modify-write against the store while holding the
//! user's lock from [`UserLocks`].

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use chrono::{DateTime, Utc};
use tokio::sync::OwnedMutexGuard;

use crate::{
    config::STREAK_THRESHOLD,
    models::statistics::UserStatistics,
    services::QuizResult,
    store::QuizStore,
};

/// Number of idle entries tolerated before `UserLocks` prunes its map.
const LOCK_PRUNE_THRESHOLD: usize = 1024;

/// One async mutex per user id. Serializes statistics updates of a user
/// inside this process; different users never contend.
#[derive(Default)]
pub struct UserLocks {
    locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl UserLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn lock(&self, user_id: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
            if locks.len() >= LOCK_PRUNE_THRESHOLD {
                locks.retain(|_, l| Arc::strong_count(l) > 1);
            }
            locks.entry(user_id.to_string()).or_default().clone()
        };
        lock.lock_owned().await
    }
}

fn round_div(sum: i64, count: i64) -> i32 {
    if count <= 0 {
        return 0;
    }
    ((2 * sum + count) / (2 * count)) as i32
}

/// Folds one attempt into the statistics of `user_id`.
pub fn next_after_attempt(
    previous: Option<UserStatistics>,
    user_id: &str,
    percentage: i32,
    now: DateTime<Utc>,
) -> UserStatistics {
    let passed = percentage >= STREAK_THRESHOLD;

    match previous {
        None => {
            let streak = if passed { 1 } else { 0 };
            UserStatistics {
                quizzes_taken: 1,
                cumulative_points: i64::from(percentage),
                average_score: percentage,
                best_score: percentage,
                current_streak: streak,
                longest_streak: streak,
                ..UserStatistics::empty(user_id, now)
            }
        }
        Some(stats) => {
            let quizzes_taken = stats.quizzes_taken + 1;
            let cumulative_points = stats.cumulative_points + i64::from(percentage);
            let current_streak = if passed { stats.current_streak + 1 } else { 0 };

            UserStatistics {
                quizzes_taken,
                cumulative_points,
                average_score: round_div(cumulative_points, i64::from(quizzes_taken)),
                best_score: stats.best_score.max(percentage),
                current_streak,
                longest_streak: stats.longest_streak.max(current_streak),
                updated_at: now,
                ..stats
            }
        }
    }
}

/// Counts one more created quiz for `user_id`. Attempt aggregates are untouched.
pub fn next_after_quiz_created(
    previous: Option<UserStatistics>,
    user_id: &str,
    now: DateTime<Utc>,
) -> UserStatistics {
    let stats = previous.unwrap_or_else(|| UserStatistics::empty(user_id, now));
    UserStatistics {
        quizzes_created: stats.quizzes_created + 1,
        updated_at: now,
        ..stats
    }
}

/// Reads, updates and stores the statistics of `user_id` after an attempt.
///
/// The caller must hold the user's lock from [`UserLocks`].
pub async fn apply_attempt(
    store: &dyn QuizStore,
    user_id: &str,
    percentage: i32,
) -> QuizResult<UserStatistics> {
    let previous = store.get_statistics(user_id).await?;
    let next = next_after_attempt(previous, user_id, percentage, Utc::now());
    let saved = store.save_statistics(&next).await?;

    tracing::debug!(
        user_id,
        quizzes_taken = saved.quizzes_taken,
        average_score = saved.average_score,
        current_streak = saved.current_streak,
        "statistics updated after attempt"
    );

    Ok(saved)
}

/// Reads, updates and stores the statistics of `user_id` after a quiz was created.
///
/// The caller must hold the user's lock from [`UserLocks`].
pub async fn apply_quiz_created(store: &dyn QuizStore, user_id: &str) -> QuizResult<UserStatistics> {
    let previous = store.get_statistics(user_id).await?;
    let next = next_after_quiz_created(previous, user_id, Utc::now());
    Ok(store.save_statistics(&next).await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn run(percentages: &[i32]) -> Vec<UserStatistics> {
        let mut state = None;
        let mut history = Vec::new();
        for &p in percentages {
            let next = next_after_attempt(state.clone(), "alice", p, Utc::now());
            history.push(next.clone());
            state = Some(next);
        }
        history
    }

    #[test]
    fn first_attempt_initializes_record() {
        let stats = next_after_attempt(None, "alice", 100, Utc::now());
        assert_eq!(stats.quizzes_taken, 1);
        assert_eq!(stats.cumulative_points, 100);
        assert_eq!(stats.average_score, 100);
        assert_eq!(stats.best_score, 100);
        assert_eq!(stats.current_streak, 1);
        assert_eq!(stats.longest_streak, 1);

        let low = next_after_attempt(None, "bob", 69, Utc::now());
        assert_eq!(low.current_streak, 0);
        assert_eq!(low.longest_streak, 0);
    }

    #[test]
    fn streaks_reset_below_threshold() {
        let history = run(&[80, 90, 60, 75]);
        let current: Vec<i32> = history.iter().map(|s| s.current_streak).collect();
        let longest: Vec<i32> = history.iter().map(|s| s.longest_streak).collect();
        assert_eq!(current, vec![1, 2, 0, 1]);
        assert_eq!(longest, vec![1, 2, 2, 2]);
    }

    #[test]
    fn threshold_is_inclusive() {
        let history = run(&[70, 70]);
        assert_eq!(history[1].current_streak, 2);
    }

    #[test]
    fn average_converges_to_rounded_mean() {
        let percentages = [100, 50, 33, 67, 91, 0, 12];
        let history = run(&percentages);
        for (n, stats) in history.iter().enumerate() {
            let slice = &percentages[..=n];
            let sum: i32 = slice.iter().sum();
            let expected = (sum as f64 / slice.len() as f64).round() as i32;
            assert_eq!(stats.average_score, expected);
            assert_eq!(stats.quizzes_taken as usize, n + 1);
            assert_eq!(stats.best_score, *slice.iter().max().unwrap());
        }
    }

    #[test]
    fn quiz_created_keeps_attempt_aggregates() {
        let created = next_after_quiz_created(None, "alice", Utc::now());
        assert_eq!(created.quizzes_created, 1);
        assert_eq!(created.quizzes_taken, 0);

        let after_attempt = next_after_attempt(Some(created), "alice", 90, Utc::now());
        assert_eq!(after_attempt.quizzes_created, 1);
        assert_eq!(after_attempt.quizzes_taken, 1);

        let again = next_after_quiz_created(Some(after_attempt), "alice", Utc::now());
        assert_eq!(again.quizzes_created, 2);
        assert_eq!(again.average_score, 90);
    }

    #[tokio::test]
    async fn apply_attempt_persists_each_step() {
        let store = MemoryStore::new();
        let first = apply_attempt(&store, "alice", 100).await.unwrap();
        assert_eq!(first.version, 1);

        let second = apply_attempt(&store, "alice", 50).await.unwrap();
        assert_eq!(second.quizzes_taken, 2);
        assert_eq!(second.average_score, 75);
        assert_eq!(second.version, 2);
        assert_eq!(store.get_statistics("alice").await.unwrap(), Some(second));
    }

    #[tokio::test]
    async fn concurrent_updates_for_one_user_are_serialized() {
        let store = Arc::new(MemoryStore::new());
        let locks = Arc::new(UserLocks::new());

        let mut handles = Vec::new();
        for _ in 0..20 {
            let store = store.clone();
            let locks = locks.clone();
            handles.push(tokio::spawn(async move {
                let _guard = locks.lock("alice").await;
                apply_attempt(store.as_ref(), "alice", 80).await.unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let stats = store.get_statistics("alice").await.unwrap().unwrap();
        assert_eq!(stats.quizzes_taken, 20);
        assert_eq!(stats.current_streak, 20);
    }
}
