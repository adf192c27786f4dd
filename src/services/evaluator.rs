// src/services/evaluator.rs

use crate::models::question::{AnswerKey, Question, SubmittedAnswer};

/// Decides whether `answer` is a correct response to `question`.
///
/// * Multiple choice: exact, case-sensitive string match.
/// * Checkbox: both lists sorted and compared element-wise. Duplicates count.
/// * Short answer: trimmed and lower-cased, equal to any trimmed, lower-cased keyword.
///
/// A missing answer, or one of the wrong shape, is incorrect.
pub fn evaluate(question: &Question, answer: Option<&SubmittedAnswer>) -> bool {
    let Some(answer) = answer else {
        return false;
    };

    match (&question.answer_key, answer) {
        (AnswerKey::MultipleChoice(correct), SubmittedAnswer::Text(given)) => given == correct,
        (AnswerKey::Checkbox(correct), SubmittedAnswer::Choices(given)) => {
            let mut correct: Vec<&str> = correct.iter().map(String::as_str).collect();
            let mut given: Vec<&str> = given.iter().map(String::as_str).collect();
            correct.sort_unstable();
            given.sort_unstable();
            correct == given
        }
        (AnswerKey::ShortAnswer(keywords), SubmittedAnswer::Text(given)) => {
            let given = normalize(given);
            keywords.iter().any(|k| normalize(k) == given)
        }
        _ => false,
    }
}

fn normalize(text: &str) -> String {
    text.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn question(answer_key: AnswerKey) -> Question {
        Question {
            id: Uuid::new_v4(),
            quiz_id: Uuid::new_v4(),
            prompt: "?".to_string(),
            options: vec![],
            answer_key,
            points: 1,
            explanation: None,
            position: 0,
        }
    }

    fn text(s: &str) -> SubmittedAnswer {
        SubmittedAnswer::Text(s.to_string())
    }

    fn choices(items: &[&str]) -> SubmittedAnswer {
        SubmittedAnswer::Choices(items.iter().map(|s| s.to_string()).collect())
    }

    #[test]
    fn multiple_choice_is_exact() {
        let q = question(AnswerKey::MultipleChoice("Paris".to_string()));
        assert!(evaluate(&q, Some(&text("Paris"))));
        assert!(!evaluate(&q, Some(&text("paris"))));
        assert!(!evaluate(&q, Some(&text(" Paris"))));
        assert!(!evaluate(&q, Some(&text("Lyon"))));
        assert!(!evaluate(&q, Some(&choices(&["Paris"]))));
    }

    #[test]
    fn checkbox_ignores_order_but_not_membership() {
        let q = question(AnswerKey::Checkbox(vec!["A".to_string(), "B".to_string()]));
        assert!(evaluate(&q, Some(&choices(&["A", "B"]))));
        assert!(evaluate(&q, Some(&choices(&["B", "A"]))));
        assert!(!evaluate(&q, Some(&choices(&["A"]))));
        assert!(!evaluate(&q, Some(&choices(&["A", "B", "C"]))));
        assert!(!evaluate(&q, Some(&choices(&[]))));
        assert!(!evaluate(&q, Some(&text("A"))));
    }

    #[test]
    fn checkbox_duplicates_matter() {
        let q = question(AnswerKey::Checkbox(vec!["A".to_string(), "B".to_string()]));
        assert!(!evaluate(&q, Some(&choices(&["A", "B", "B"]))));
    }

    #[test]
    fn short_answer_normalizes_case_and_whitespace() {
        let q = question(AnswerKey::ShortAnswer(vec![
            "Paris".to_string(),
            "paris city".to_string(),
        ]));
        assert!(evaluate(&q, Some(&text(" PARIS "))));
        assert!(evaluate(&q, Some(&text("Paris City"))));
        assert!(!evaluate(&q, Some(&text("Pariss"))));
        assert!(!evaluate(&q, Some(&text("city"))));
    }

    #[test]
    fn missing_answer_is_incorrect_for_every_type() {
        for key in [
            AnswerKey::MultipleChoice("A".to_string()),
            AnswerKey::Checkbox(vec![]),
            AnswerKey::ShortAnswer(vec!["".to_string()]),
        ] {
            assert!(!evaluate(&question(key), None));
        }
    }

    #[test]
    fn null_or_number_answer_is_incorrect_for_every_type() {
        for key in [
            AnswerKey::MultipleChoice("2".to_string()),
            AnswerKey::Checkbox(vec![]),
            AnswerKey::ShortAnswer(vec!["2".to_string()]),
        ] {
            let q = question(key);
            assert!(!evaluate(&q, Some(&SubmittedAnswer::Other(serde_json::Value::Null))));
            assert!(!evaluate(&q, Some(&SubmittedAnswer::Other(serde_json::json!(2)))));
        }
    }
}
