// src/services/scorer.rs

use std::collections::HashMap;

use uuid::Uuid;

use crate::{
    models::{
        attempt::{AnswerMap, QuestionResult},
        question::Question,
    },
    services::{QuizError, QuizResult, evaluator},
};

/// Outcome of grading one submission. Held in memory only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoreReport {
    pub total_score: i32,
    pub percentage: i32,
    pub per_question: HashMap<Uuid, QuestionResult>,
}

/// `round(100 * score / total)`, halves rounded up, clamped to `0..=100`.
/// A non-positive total yields 0.
pub fn percentage(score: i32, total_points: i32) -> i32 {
    if total_points <= 0 {
        return 0;
    }
    let score = i64::from(score.max(0));
    let total = i64::from(total_points);
    let rounded = (200 * score + total) / (2 * total);
    rounded.clamp(0, 100) as i32
}

/// Grades `answers` against every question of a quiz.
///
/// Fails only when an answer refers to a question outside `questions`.
pub fn score_attempt(
    questions: &[Question],
    answers: &AnswerMap,
    quiz_total_points: i32,
) -> QuizResult<ScoreReport> {
    if let Some(unknown) = answers
        .keys()
        .find(|id| !questions.iter().any(|q| q.id == **id))
    {
        return Err(QuizError::Validation(format!(
            "answer for question {} which is not part of this quiz",
            unknown
        )));
    }

    let mut total_score = 0;
    let mut per_question = HashMap::with_capacity(questions.len());

    for question in questions {
        let correct = evaluator::evaluate(question, answers.get(&question.id));
        if correct {
            total_score += question.points;
        }
        per_question.insert(
            question.id,
            QuestionResult {
                correct,
                explanation: question.explanation.clone(),
            },
        );
    }

    Ok(ScoreReport {
        total_score,
        percentage: percentage(total_score, quiz_total_points),
        per_question,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::question::{AnswerKey, SubmittedAnswer};

    fn question(key: AnswerKey, points: i32) -> Question {
        Question {
            id: Uuid::new_v4(),
            quiz_id: Uuid::new_v4(),
            prompt: "?".to_string(),
            options: vec![],
            answer_key: key,
            points,
            explanation: Some("because".to_string()),
            position: 0,
        }
    }

    fn sample_quiz() -> Vec<Question> {
        vec![
            question(AnswerKey::MultipleChoice("A".to_string()), 2),
            question(AnswerKey::Checkbox(vec!["A".to_string(), "C".to_string()]), 3),
            question(AnswerKey::ShortAnswer(vec!["rust".to_string()]), 1),
        ]
    }

    #[test]
    fn no_answers_scores_zero() {
        let questions = sample_quiz();
        for total in [0, 6, 100] {
            let report = score_attempt(&questions, &AnswerMap::new(), total).unwrap();
            assert_eq!(report.total_score, 0);
            assert_eq!(report.percentage, 0);
            assert_eq!(report.per_question.len(), 3);
            assert!(report.per_question.values().all(|r| !r.correct));
        }
    }

    #[test]
    fn partial_answers_add_points_of_correct_questions() {
        let questions = sample_quiz();
        let mut answers = AnswerMap::new();
        answers.insert(questions[0].id, SubmittedAnswer::Text("A".to_string()));
        answers.insert(
            questions[1].id,
            SubmittedAnswer::Choices(vec!["C".to_string(), "A".to_string()]),
        );
        answers.insert(questions[2].id, SubmittedAnswer::Text("go".to_string()));

        let report = score_attempt(&questions, &answers, 6).unwrap();
        assert_eq!(report.total_score, 5);
        assert_eq!(report.percentage, 83);
        assert_eq!(
            report.per_question[&questions[2].id],
            QuestionResult {
                correct: false,
                explanation: Some("because".to_string()),
            }
        );
    }

    #[test]
    fn answer_for_foreign_question_is_rejected() {
        let questions = sample_quiz();
        let mut answers = AnswerMap::new();
        answers.insert(Uuid::new_v4(), SubmittedAnswer::Text("A".to_string()));
        assert!(matches!(
            score_attempt(&questions, &answers, 6),
            Err(QuizError::Validation(_))
        ));
    }

    #[test]
    fn percentage_rounds_and_stays_in_range() {
        assert_eq!(percentage(0, 0), 0);
        assert_eq!(percentage(5, 0), 0);
        assert_eq!(percentage(1, 3), 33);
        assert_eq!(percentage(2, 3), 67);
        assert_eq!(percentage(1, 8), 13); // 12.5 rounds up
        assert_eq!(percentage(4, 4), 100);
        assert_eq!(percentage(9, 4), 100);
        for total in 1..=40 {
            for score in 0..=total {
                let p = percentage(score, total);
                assert!((0..=100).contains(&p));
                let exact = 100.0 * score as f64 / total as f64;
                assert!((p as f64 - exact).abs() <= 0.5);
            }
        }
    }
}
