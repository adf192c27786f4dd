// src/models/question.rs

use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Discriminant of a question, as stored in the `questions.type` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
    MultipleChoice,
    Checkbox,
    ShortAnswer,
}

impl QuestionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuestionType::MultipleChoice => "multiple_choice",
            QuestionType::Checkbox => "checkbox",
            QuestionType::ShortAnswer => "short_answer",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "multiple_choice" => Some(QuestionType::MultipleChoice),
            "checkbox" => Some(QuestionType::Checkbox),
            "short_answer" => Some(QuestionType::ShortAnswer),
            _ => None,
        }
    }
}

/// The correct answer of a question, tagged by question type.
///
/// Serialized as `{"type": "checkbox", "correct_answers": ["A", "B"]}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "correct_answers", rename_all = "snake_case")]
pub enum AnswerKey {
    /// Exactly one option string is correct.
    MultipleChoice(String),
    /// The exact multiset of selected options must match.
    Checkbox(Vec<String>),
    /// Any of the keywords matches, case-insensitively after trimming.
    ShortAnswer(Vec<String>),
}

impl AnswerKey {
    pub fn question_type(&self) -> QuestionType {
        match self {
            AnswerKey::MultipleChoice(_) => QuestionType::MultipleChoice,
            AnswerKey::Checkbox(_) => QuestionType::Checkbox,
            AnswerKey::ShortAnswer(_) => QuestionType::ShortAnswer,
        }
    }

    /// Builds a key from the stored type and a JSON list of answers.
    /// Returns `None` when the shape does not fit the type.
    pub fn from_parts(question_type: QuestionType, answers: Vec<String>) -> Option<Self> {
        match question_type {
            QuestionType::MultipleChoice => {
                let mut answers = answers;
                if answers.len() != 1 {
                    return None;
                }
                answers.pop().map(AnswerKey::MultipleChoice)
            }
            QuestionType::Checkbox => Some(AnswerKey::Checkbox(answers)),
            QuestionType::ShortAnswer => Some(AnswerKey::ShortAnswer(answers)),
        }
    }

    /// Flattens the key into the list stored in the `correct_answers` column.
    pub fn to_list(&self) -> Vec<String> {
        match self {
            AnswerKey::MultipleChoice(answer) => vec![answer.clone()],
            AnswerKey::Checkbox(answers) | AnswerKey::ShortAnswer(answers) => answers.clone(),
        }
    }

    fn is_empty(&self) -> bool {
        match self {
            AnswerKey::MultipleChoice(answer) => answer.trim().is_empty(),
            AnswerKey::Checkbox(answers) | AnswerKey::ShortAnswer(answers) => {
                answers.iter().all(|a| a.trim().is_empty())
            }
        }
    }
}

/// Represents the 'questions' table in the database.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Question {
    pub id: Uuid,
    pub quiz_id: Uuid,

    /// The text shown to the quiz taker.
    pub prompt: String,

    /// Options for the choice types. Empty for short answers.
    pub options: Vec<String>,

    pub answer_key: AnswerKey,

    /// Points awarded when answered correctly. Always positive.
    pub points: i32,

    /// Shown after submission next to the result.
    pub explanation: Option<String>,

    /// Zero-based position within the quiz.
    pub position: i32,
}

impl Question {
    pub fn question_type(&self) -> QuestionType {
        self.answer_key.question_type()
    }
}

/// A submitted answer: a single string, or a list of selected options.
///
/// Any other JSON value (`null`, a number, an object) lands in `Other`, is
/// stored as sent and graded as incorrect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SubmittedAnswer {
    Text(String),
    Choices(Vec<String>),
    Other(serde_json::Value),
}

/// DTO for sending a question to a quiz taker (excludes the answer key and explanation).
#[derive(Debug, Serialize)]
pub struct PublicQuestion {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub question_type: QuestionType,
    pub prompt: String,
    pub options: Vec<String>,
    pub points: i32,
}

impl From<&Question> for PublicQuestion {
    fn from(q: &Question) -> Self {
        PublicQuestion {
            id: q.id,
            question_type: q.question_type(),
            prompt: q.prompt.clone(),
            options: q.options.clone(),
            points: q.points,
        }
    }
}

/// Question data ready to be stored together with a new quiz.
#[derive(Debug, Clone)]
pub struct NewQuestion {
    pub prompt: String,
    pub options: Vec<String>,
    pub answer_key: AnswerKey,
    pub points: i32,
    pub explanation: Option<String>,
    pub position: i32,
}

/// DTO for a question inside a create-quiz request.
#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct CreateQuestionRequest {
    #[validate(length(min = 1, max = 1000))]
    pub prompt: String,
    #[validate(custom(function = validate_options))]
    #[serde(default)]
    pub options: Vec<String>,
    #[validate(custom(function = validate_answer_key))]
    pub answer_key: AnswerKey,
    #[validate(range(min = 1, max = 100))]
    #[serde(default = "default_points")]
    pub points: i32,
    #[validate(length(max = 2000))]
    pub explanation: Option<String>,
}

fn default_points() -> i32 {
    1
}

fn validate_options(options: &[String]) -> Result<(), validator::ValidationError> {
    if options.len() > 20 {
        return Err(validator::ValidationError::new("too_many_options"));
    }
    for opt in options {
        if opt.len() > 500 {
            return Err(validator::ValidationError::new("option_too_long"));
        }
    }
    Ok(())
}

fn validate_answer_key(key: &AnswerKey) -> Result<(), validator::ValidationError> {
    if key.is_empty() {
        return Err(validator::ValidationError::new("correct_answer_required"));
    }
    Ok(())
}
