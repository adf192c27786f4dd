// src/services/achievements.rs

use std::collections::HashSet;

use crate::{
    models::{
        achievement::{Achievement, NewAchievement},
        statistics::UserStatistics,
    },
    services::QuizResult,
    store::QuizStore,
};

/// A one-time badge and the statistics threshold that grants it.
pub struct AchievementRule {
    pub achievement_type: &'static str,
    pub title: &'static str,
    pub description: &'static str,
    pub icon_name: &'static str,
    pub qualifies: fn(&UserStatistics) -> bool,
}

/// Evaluated in order. Every rule fires independently.
pub const RULES: [AchievementRule; 5] = [
    AchievementRule {
        achievement_type: "first_quiz",
        title: "Getting Started",
        description: "Completed your first quiz!",
        icon_name: "Trophy",
        qualifies: |s| s.quizzes_taken >= 1,
    },
    AchievementRule {
        achievement_type: "quiz_master",
        title: "Quiz Master",
        description: "Completed 10 quizzes!",
        icon_name: "Crown",
        qualifies: |s| s.quizzes_taken >= 10,
    },
    AchievementRule {
        achievement_type: "perfect_score",
        title: "Perfect Score",
        description: "Achieved a perfect score!",
        icon_name: "Star",
        qualifies: |s| s.best_score == 100,
    },
    AchievementRule {
        achievement_type: "streak_5",
        title: "On Fire",
        description: "Maintained a 5-quiz streak!",
        icon_name: "Flame",
        qualifies: |s| s.current_streak >= 5,
    },
    AchievementRule {
        achievement_type: "first_creator",
        title: "Quiz Creator",
        description: "Created your first quiz!",
        icon_name: "Lightbulb",
        qualifies: |s| s.quizzes_created >= 1,
    },
];

/// Achievements `stats` qualifies for that are not in `earned` yet, in rule order.
pub fn qualifying(stats: &UserStatistics, earned: &HashSet<String>) -> Vec<NewAchievement> {
    RULES
        .iter()
        .filter(|rule| !earned.contains(rule.achievement_type) && (rule.qualifies)(stats))
        .map(|rule| NewAchievement {
            user_id: stats.user_id.clone(),
            achievement_type: rule.achievement_type.to_string(),
            title: rule.title.to_string(),
            description: Some(rule.description.to_string()),
            icon_name: Some(rule.icon_name.to_string()),
        })
        .collect()
}

/// Persists every newly qualifying achievement and returns the stored ones.
///
/// A type that shows up concurrently between the read and the insert is
/// skipped rather than reported twice.
pub async fn award(store: &dyn QuizStore, stats: &UserStatistics) -> QuizResult<Vec<Achievement>> {
    let earned = store.get_achievement_types(&stats.user_id).await?;

    let mut awarded = Vec::new();
    for new in qualifying(stats, &earned) {
        if let Some(achievement) = store.insert_achievement(new).await? {
            tracing::info!(
                user_id = %achievement.user_id,
                achievement = %achievement.achievement_type,
                "achievement earned"
            );
            awarded.push(achievement);
        }
    }

    Ok(awarded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use chrono::Utc;

    fn stats(taken: i32, best: i32, streak: i32, created: i32) -> UserStatistics {
        UserStatistics {
            quizzes_taken: taken,
            best_score: best,
            current_streak: streak,
            quizzes_created: created,
            ..UserStatistics::empty("alice", Utc::now())
        }
    }

    fn types(list: &[NewAchievement]) -> Vec<&str> {
        list.iter().map(|a| a.achievement_type.as_str()).collect()
    }

    #[test]
    fn nothing_qualifies_for_empty_statistics() {
        assert!(qualifying(&stats(0, 0, 0, 0), &HashSet::new()).is_empty());
    }

    #[test]
    fn all_qualifying_rules_fire_in_table_order() {
        let fired = qualifying(&stats(10, 100, 5, 1), &HashSet::new());
        assert_eq!(
            types(&fired),
            vec!["first_quiz", "quiz_master", "perfect_score", "streak_5", "first_creator"]
        );
        assert_eq!(fired[0].title, "Getting Started");
        assert_eq!(fired[0].icon_name.as_deref(), Some("Trophy"));
    }

    #[test]
    fn earned_types_are_skipped() {
        let earned: HashSet<String> = ["first_quiz".to_string()].into_iter().collect();
        let fired = qualifying(&stats(1, 100, 1, 0), &earned);
        assert_eq!(types(&fired), vec!["perfect_score"]);
    }

    #[test]
    fn thresholds_are_exact() {
        assert_eq!(types(&qualifying(&stats(9, 99, 4, 0), &HashSet::new())), vec!["first_quiz"]);
    }

    #[tokio::test]
    async fn award_is_idempotent() {
        let store = MemoryStore::new();
        let s = stats(1, 100, 1, 0);

        let first = award(&store, &s).await.unwrap();
        let first_types: Vec<&str> = first.iter().map(|a| a.achievement_type.as_str()).collect();
        assert_eq!(first_types, vec!["first_quiz", "perfect_score"]);

        let second = award(&store, &s).await.unwrap();
        assert!(second.is_empty());
        assert_eq!(store.list_achievements("alice").await.unwrap().len(), 2);
    }
}
