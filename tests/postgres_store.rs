// tests/postgres_store.rs
//
// Runs against the database in DATABASE_URL. Skipped when it is not set.

use quizhub::{
    models::{
        achievement::NewAchievement,
        question::{AnswerKey, NewQuestion},
        quiz::{Difficulty, NewQuiz},
        statistics::UserStatistics,
    },
    store::{PgStore, QuizStore, StoreError},
};
use sqlx::postgres::PgPoolOptions;

async fn connect() -> Option<PgStore> {
    let database_url = std::env::var("DATABASE_URL").ok()?;

    let pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&database_url)
        .await
        .expect("Failed to connect to Postgres for testing.");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to migrate database");

    Some(PgStore::new(pool))
}

fn unique_user(prefix: &str) -> String {
    format!("{}_{}", prefix, &uuid::Uuid::new_v4().to_string()[..8])
}

#[tokio::test]
async fn quiz_round_trip_keeps_question_order_and_keys() {
    let Some(store) = connect().await else {
        return;
    };
    let creator = unique_user("creator");

    let quiz = store
        .create_quiz(
            NewQuiz {
                title: "Postgres quiz".to_string(),
                description: Some("stored for real".to_string()),
                creator_id: creator.clone(),
                tags: vec!["sql".to_string()],
                difficulty: Difficulty::Hard,
                estimated_time: Some(5),
            },
            vec![
                NewQuestion {
                    prompt: "Pick two".to_string(),
                    options: vec!["a".to_string(), "b".to_string(), "c".to_string()],
                    answer_key: AnswerKey::Checkbox(vec!["a".to_string(), "c".to_string()]),
                    points: 2,
                    explanation: None,
                    position: 0,
                },
                NewQuestion {
                    prompt: "Name it".to_string(),
                    options: vec![],
                    answer_key: AnswerKey::ShortAnswer(vec!["postgres".to_string()]),
                    points: 3,
                    explanation: Some("It is Postgres".to_string()),
                    position: 1,
                },
            ],
        )
        .await
        .unwrap();

    let published = store.publish_quiz(quiz.id).await.unwrap().unwrap();
    let questions = store.get_questions(quiz.id).await.unwrap();

    assert!(published.is_published);
    assert_eq!(published.total_points, 5);
    assert_eq!(questions.len(), 2);
    assert_eq!(
        questions[0].answer_key,
        AnswerKey::Checkbox(vec!["a".to_string(), "c".to_string()])
    );
    assert_eq!(questions[1].prompt, "Name it");

    assert!(store.delete_quiz(quiz.id).await.unwrap());
    assert!(store.get_quiz(quiz.id).await.unwrap().is_none());
}

#[tokio::test]
async fn stale_statistics_are_rejected() {
    let Some(store) = connect().await else {
        return;
    };
    let user = unique_user("cas");

    let mut stats = UserStatistics::empty(&user, chrono::Utc::now());
    stats.quizzes_taken = 1;
    stats.cumulative_points = 80;
    stats.average_score = 80;
    let saved = store.save_statistics(&stats).await.unwrap();
    assert_eq!(saved.version, 1);

    // Writing again from the version-0 snapshot loses the race
    let stale = store.save_statistics(&stats).await;
    assert!(matches!(stale, Err(StoreError::Conflict(_))));

    let mut next = saved.clone();
    next.quizzes_taken = 2;
    let saved_again = store.save_statistics(&next).await.unwrap();
    assert_eq!(saved_again.version, 2);
    assert_eq!(
        store.get_statistics(&user).await.unwrap().unwrap().quizzes_taken,
        2
    );
}

#[tokio::test]
async fn achievements_are_unique_per_type() {
    let Some(store) = connect().await else {
        return;
    };
    let user = unique_user("ach");
    let achievement = || NewAchievement {
        user_id: user.clone(),
        achievement_type: "first_quiz".to_string(),
        title: "Getting Started".to_string(),
        description: None,
        icon_name: None,
    };

    assert!(store.insert_achievement(achievement()).await.unwrap().is_some());
    assert!(store.insert_achievement(achievement()).await.unwrap().is_none());
    assert_eq!(store.list_achievements(&user).await.unwrap().len(), 1);
}
