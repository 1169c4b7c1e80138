use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// The value a student picks for a question. For option based questions this is
/// the option text itself, mirroring how answers are stored upstream.
pub type Answer = String;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, strum_macros::Display)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QuestionType {
    #[default]
    Mcq,
    TrueFalse,
    Numerical,
}

impl QuestionType {
    /// Whether the correct answer has to be one of the listed options
    pub fn answer_from_options(&self) -> bool {
        matches!(self, QuestionType::Mcq | QuestionType::TrueFalse)
    }
}

/// A read-only question record handed to a session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub id: String,
    pub question_text: String,
    #[serde(default)]
    pub question_type: QuestionType,
    #[serde(default)]
    pub options: Vec<String>,
    pub correct_answer: Answer,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Question {
    pub fn mcq(id: &str, text: &str, options: &[&str], correct_answer: &str) -> Self {
        Self {
            id: id.to_string(),
            question_text: text.to_string(),
            question_type: QuestionType::Mcq,
            options: options.iter().map(|o| o.to_string()).collect(),
            correct_answer: correct_answer.to_string(),
            description: None,
        }
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }
}

/// Payload supplied once per exercise selection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionSet {
    pub title: String,
    pub duration_secs: u64,
    pub questions: Vec<Question>,
}

impl QuestionSet {
    pub fn new(title: impl Into<String>, duration_secs: u64, questions: Vec<Question>) -> Self {
        Self {
            title: title.into(),
            duration_secs,
            questions,
        }
    }

    pub fn from_json_slice(bytes: &[u8]) -> Result<Self> {
        let set: QuestionSet = serde_json::from_slice(bytes)?;
        set.validate()?;
        Ok(set)
    }

    /// Rejects payloads that would desync the attempt bookkeeping.
    /// An empty question list is allowed; callers show a "no questions" state.
    pub fn validate(&self) -> Result<()> {
        if self.duration_secs == 0 {
            return Err(Error::InvalidQuestionSet(
                "duration must be at least one second".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for (idx, q) in self.questions.iter().enumerate() {
            if q.id.trim().is_empty() {
                return Err(Error::InvalidQuestionSet(format!(
                    "question #{} has an empty id",
                    idx + 1
                )));
            }
            if !seen.insert(q.id.as_str()) {
                return Err(Error::InvalidQuestionSet(format!(
                    "duplicate question id '{}'",
                    q.id
                )));
            }
            if q.question_type.answer_from_options() && !q.options.contains(&q.correct_answer) {
                return Err(Error::InvalidQuestionSet(format!(
                    "correct answer of question '{}' is not one of its options",
                    q.id
                )));
            }
        }

        Ok(())
    }
}

pub trait QuestionSetLoader {
    fn load(&self) -> Result<QuestionSet>;
}

/// Reads a question set from a JSON document on disk
#[derive(Debug, Clone)]
pub struct FileQuestionSetLoader {
    path: PathBuf,
}

impl FileQuestionSetLoader {
    pub fn with_path<P: AsRef<Path>>(p: P) -> Self {
        Self {
            path: p.as_ref().to_path_buf(),
        }
    }
}

impl QuestionSetLoader for FileQuestionSetLoader {
    fn load(&self) -> Result<QuestionSet> {
        let bytes = fs::read(&self.path)?;
        let set = QuestionSet::from_json_slice(&bytes)?;
        log::info!(
            "loaded question set '{}' ({} questions, {}s) from {}",
            set.title,
            set.questions.len(),
            set.duration_secs,
            self.path.display()
        );
        Ok(set)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use tempfile::tempdir;

    fn two_questions() -> Vec<Question> {
        vec![
            Question::mcq("q1", "2 + 2", &["3", "4"], "4"),
            Question::mcq("q2", "Capital of Maharashtra", &["Pune", "Mumbai"], "Mumbai"),
        ]
    }

    #[test]
    fn parses_camel_case_document() {
        let json = br#"{
            "title": "Exercise 1.1",
            "durationSecs": 1800,
            "questions": [
                {
                    "id": "q1",
                    "questionText": "2 + 2",
                    "options": ["3", "4"],
                    "correctAnswer": "4",
                    "description": "Basic addition"
                },
                {
                    "id": "q2",
                    "questionText": "Square root of 81",
                    "questionType": "NUMERICAL",
                    "correctAnswer": "9"
                }
            ]
        }"#;

        let set = QuestionSet::from_json_slice(json).unwrap();
        assert_eq!(set.title, "Exercise 1.1");
        assert_eq!(set.duration_secs, 1800);
        assert_eq!(set.questions.len(), 2);
        assert_eq!(set.questions[0].question_type, QuestionType::Mcq);
        assert_eq!(set.questions[0].description.as_deref(), Some("Basic addition"));
        assert_eq!(set.questions[1].question_type, QuestionType::Numerical);
        assert!(set.questions[1].options.is_empty());
    }

    #[test]
    fn empty_question_list_is_valid() {
        let set = QuestionSet::new("empty", 60, vec![]);
        assert!(set.validate().is_ok());
    }

    #[test]
    fn rejects_duplicate_ids() {
        let mut questions = two_questions();
        questions[1].id = "q1".to_string();
        let set = QuestionSet::new("dup", 60, questions);
        assert_matches!(set.validate(), Err(Error::InvalidQuestionSet(msg)) if msg.contains("q1"));
    }

    #[test]
    fn rejects_blank_id_and_zero_duration() {
        let mut questions = two_questions();
        questions[0].id = "  ".to_string();
        assert_matches!(
            QuestionSet::new("blank", 60, questions).validate(),
            Err(Error::InvalidQuestionSet(_))
        );
        assert_matches!(
            QuestionSet::new("zero", 0, two_questions()).validate(),
            Err(Error::InvalidQuestionSet(_))
        );
    }

    #[test]
    fn rejects_mcq_answer_outside_options() {
        let mut questions = two_questions();
        questions[0].correct_answer = "5".to_string();
        assert_matches!(
            QuestionSet::new("bad", 60, questions).validate(),
            Err(Error::InvalidQuestionSet(_))
        );
    }

    #[test]
    fn malformed_json_is_an_error() {
        assert_matches!(QuestionSet::from_json_slice(b"{ not json"), Err(Error::Json(_)));
    }

    #[test]
    fn file_loader_reads_and_validates() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("set.json");
        let set = QuestionSet::new("Exercise 2", 300, two_questions());
        fs::write(&path, serde_json::to_vec(&set).unwrap()).unwrap();

        let loaded = FileQuestionSetLoader::with_path(&path).load().unwrap();
        assert_eq!(loaded, set);

        let missing = FileQuestionSetLoader::with_path(dir.path().join("nope.json"));
        assert_matches!(missing.load(), Err(Error::Io(_)));
    }
}
