// src/services/authoring.rs

use uuid::Uuid;
use validator::Validate;

use crate::{
    models::{
        achievement::Achievement,
        question::{AnswerKey, CreateQuestionRequest, NewQuestion},
        quiz::{CreateQuizRequest, NewQuiz, Quiz},
    },
    services::{
        QuizError, QuizResult, achievements,
        statistics::{self, UserLocks},
    },
    store::QuizStore,
    utils::html::clean_html,
};

#[derive(Debug, Clone)]
pub struct CreatedQuiz {
    pub quiz: Quiz,
    pub new_achievements: Vec<Achievement>,
}

/// Choice questions need options, and their correct answers must be among them.
fn check_question(index: usize, q: &CreateQuestionRequest) -> QuizResult<()> {
    let keys: &[String] = match &q.answer_key {
        AnswerKey::MultipleChoice(answer) => std::slice::from_ref(answer),
        AnswerKey::Checkbox(answers) => answers,
        AnswerKey::ShortAnswer(_) => return Ok(()),
    };

    if q.options.is_empty() {
        return Err(QuizError::Validation(format!(
            "question {} needs at least one option",
            index + 1
        )));
    }
    if let Some(missing) = keys.iter().find(|k| !q.options.contains(*k)) {
        return Err(QuizError::Validation(format!(
            "question {}: correct answer '{}' is not one of the options",
            index + 1,
            missing
        )));
    }
    Ok(())
}

fn clean_optional(text: Option<String>) -> Option<String> {
    text.map(|t| clean_html(t.trim()))
        .filter(|t| !t.is_empty())
}

/// Validates and stores a quiz with its questions, then credits the creator.
///
/// Order: store quiz, bump `quizzes_created`, award achievements, publish if asked.
pub async fn create_quiz(
    store: &dyn QuizStore,
    locks: &UserLocks,
    creator_id: &str,
    request: CreateQuizRequest,
) -> QuizResult<CreatedQuiz> {
    request
        .validate()
        .map_err(|e| QuizError::Validation(e.to_string()))?;

    let title = clean_html(request.title.trim()).trim().to_string();
    if title.is_empty() {
        return Err(QuizError::Validation("Quiz title is required".to_string()));
    }
    for (index, question) in request.questions.iter().enumerate() {
        check_question(index, question)?;
    }

    let quiz = NewQuiz {
        title,
        description: clean_optional(request.description),
        creator_id: creator_id.to_string(),
        tags: request
            .tags
            .iter()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect(),
        difficulty: request.difficulty,
        estimated_time: request.estimated_time,
    };

    let questions = request
        .questions
        .into_iter()
        .enumerate()
        .map(|(position, q)| NewQuestion {
            prompt: clean_html(q.prompt.trim()),
            options: q.options,
            answer_key: q.answer_key,
            points: q.points,
            explanation: clean_optional(q.explanation),
            position: position as i32,
        })
        .collect();

    let mut quiz = store.create_quiz(quiz, questions).await?;
    tracing::info!(quiz_id = %quiz.id, creator_id, "Quiz created");

    let new_achievements = {
        let _guard = locks.lock(creator_id).await;
        let stats = statistics::apply_quiz_created(store, creator_id).await?;
        achievements::award(store, &stats).await?
    };

    if request.publish {
        quiz = store
            .publish_quiz(quiz.id)
            .await?
            .ok_or_else(|| QuizError::NotFound("Quiz".to_string()))?;
    }

    Ok(CreatedQuiz {
        quiz,
        new_achievements,
    })
}

/// Loads a quiz and checks that `actor` created it.
async fn owned_quiz(store: &dyn QuizStore, actor: &str, quiz_id: Uuid) -> QuizResult<Quiz> {
    let quiz = store
        .get_quiz(quiz_id)
        .await?
        .ok_or_else(|| QuizError::NotFound("Quiz".to_string()))?;

    if quiz.creator_id != actor {
        return Err(QuizError::Forbidden(
            "Only the creator can change this quiz".to_string(),
        ));
    }
    Ok(quiz)
}

/// Publishes a quiz, fixing its total points. Questions are frozen from here on.
pub async fn publish_quiz(store: &dyn QuizStore, actor: &str, quiz_id: Uuid) -> QuizResult<Quiz> {
    owned_quiz(store, actor, quiz_id).await?;

    let quiz = store
        .publish_quiz(quiz_id)
        .await?
        .ok_or_else(|| QuizError::NotFound("Quiz".to_string()))?;

    tracing::info!(%quiz_id, total_points = quiz.total_points, "Quiz published");
    Ok(quiz)
}

/// Deletes a quiz together with its questions, attempts and favorites.
pub async fn delete_quiz(store: &dyn QuizStore, actor: &str, quiz_id: Uuid) -> QuizResult<()> {
    owned_quiz(store, actor, quiz_id).await?;

    if !store.delete_quiz(quiz_id).await? {
        return Err(QuizError::NotFound("Quiz".to_string()));
    }

    tracing::info!(%quiz_id, "Quiz deleted");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::quiz::Difficulty;
    use crate::store::MemoryStore;

    fn question(key: AnswerKey, options: &[&str], points: i32) -> CreateQuestionRequest {
        CreateQuestionRequest {
            prompt: "Which one?".to_string(),
            options: options.iter().map(|s| s.to_string()).collect(),
            answer_key: key,
            points,
            explanation: None,
        }
    }

    fn request(publish: bool) -> CreateQuizRequest {
        CreateQuizRequest {
            title: "  Rust <script>alert(1)</script>basics ".to_string(),
            description: Some("   ".to_string()),
            tags: vec![" rust ".to_string(), "".to_string()],
            difficulty: Difficulty::Easy,
            estimated_time: Some(5),
            questions: vec![
                question(AnswerKey::MultipleChoice("B".to_string()), &["A", "B"], 2),
                question(AnswerKey::ShortAnswer(vec!["cargo".to_string()]), &[], 3),
            ],
            publish,
        }
    }

    #[tokio::test]
    async fn create_sanitizes_and_credits_creator() {
        let store = MemoryStore::new();
        let locks = UserLocks::new();

        let created = create_quiz(&store, &locks, "alice", request(false)).await.unwrap();
        assert_eq!(created.quiz.title, "Rust basics");
        assert_eq!(created.quiz.description, None);
        assert_eq!(created.quiz.tags, vec!["rust".to_string()]);
        assert!(!created.quiz.is_published);
        assert_eq!(created.quiz.total_points, 0);

        let types: Vec<&str> = created
            .new_achievements
            .iter()
            .map(|a| a.achievement_type.as_str())
            .collect();
        assert_eq!(types, vec!["first_creator"]);

        let stats = store.get_statistics("alice").await.unwrap().unwrap();
        assert_eq!(stats.quizzes_created, 1);
        assert_eq!(stats.quizzes_taken, 0);

        let questions = store.get_questions(created.quiz.id).await.unwrap();
        assert_eq!(questions.len(), 2);
        assert_eq!(questions[1].position, 1);
    }

    #[tokio::test]
    async fn publish_sums_question_points() {
        let store = MemoryStore::new();
        let locks = UserLocks::new();

        let created = create_quiz(&store, &locks, "alice", request(true)).await.unwrap();
        assert!(created.quiz.is_published);
        assert_eq!(created.quiz.total_points, 5);
    }

    #[tokio::test]
    async fn markup_only_title_is_rejected() {
        let store = MemoryStore::new();
        let locks = UserLocks::new();
        let mut req = request(false);
        req.title = " <script>alert(1)</script> ".to_string();

        let res = create_quiz(&store, &locks, "alice", req).await;
        assert!(matches!(res, Err(QuizError::Validation(_))));
        assert!(store.list_quizzes_by_creator("alice").await.unwrap().is_empty());
        assert!(store.get_statistics("alice").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn answer_outside_options_is_rejected() {
        let store = MemoryStore::new();
        let locks = UserLocks::new();
        let mut req = request(false);
        req.questions[0] = question(AnswerKey::Checkbox(vec!["Z".to_string()]), &["A"], 1);

        let res = create_quiz(&store, &locks, "alice", req).await;
        assert!(matches!(res, Err(QuizError::Validation(_))));
        assert!(store.list_quizzes_by_creator("alice").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn only_creator_may_publish_or_delete() {
        let store = MemoryStore::new();
        let locks = UserLocks::new();
        let created = create_quiz(&store, &locks, "alice", request(false)).await.unwrap();

        assert!(matches!(
            publish_quiz(&store, "mallory", created.quiz.id).await,
            Err(QuizError::Forbidden(_))
        ));
        assert!(matches!(
            delete_quiz(&store, "mallory", created.quiz.id).await,
            Err(QuizError::Forbidden(_))
        ));
        assert!(matches!(
            delete_quiz(&store, "alice", Uuid::new_v4()).await,
            Err(QuizError::NotFound(_))
        ));

        delete_quiz(&store, "alice", created.quiz.id).await.unwrap();
        assert!(store.get_quiz(created.quiz.id).await.unwrap().is_none());
    }
}
