use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::question::{Answer, Question};

/// Marks awarded per correctly answered question
pub const MARKS_PER_QUESTION: u32 = 5;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultRecord {
    pub correct_answers: u32,
    /// Everything not correct, unanswered questions included
    pub wrong_answers: u32,
    pub total_marks: u32,
    pub time_spent_secs: u64,
}

impl ResultRecord {
    /// `m:ss` rendering of the time spent
    pub fn time_spent(&self) -> String {
        format_clock(self.time_spent_secs)
    }

    pub fn max_marks(&self) -> u32 {
        (self.correct_answers + self.wrong_answers) * MARKS_PER_QUESTION
    }
}

pub fn format_clock(secs: u64) -> String {
    format!("{}:{:02}", secs / 60, secs % 60)
}

/// Score a finished attempt.
///
/// Only a stored answer strictly equal to the correct answer counts as correct.
/// A missing or cleared answer lands in the wrong bucket alongside incorrect
/// ones; the result screen does not tell them apart.
pub fn score(
    questions: &[Question],
    answers: &HashMap<String, Option<Answer>>,
    elapsed_secs: u64,
) -> ResultRecord {
    let (correct, wrong) = questions.iter().fold((0u32, 0u32), |(correct, wrong), q| {
        if is_correct(q, answers) {
            (correct + 1, wrong)
        } else {
            (correct, wrong + 1)
        }
    });

    ResultRecord {
        correct_answers: correct,
        wrong_answers: wrong,
        total_marks: correct * MARKS_PER_QUESTION,
        time_spent_secs: elapsed_secs,
    }
}

fn is_correct(question: &Question, answers: &HashMap<String, Option<Answer>>) -> bool {
    matches!(answers.get(&question.id), Some(Some(a)) if *a == question.correct_answer)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
pub enum ReviewStatus {
    Correct,
    Wrong,
    NotAttempted,
}

/// One row of the detailed result: what was asked, what was picked, what was right
#[derive(Debug, Clone, PartialEq)]
pub struct ReviewEntry<'a> {
    pub question: &'a Question,
    pub given: Option<&'a Answer>,
    pub status: ReviewStatus,
}

impl ReviewEntry<'_> {
    /// Signed marks shown next to the question: `+5`, `-5` or nothing
    pub fn marks_label(&self) -> Option<String> {
        match self.status {
            ReviewStatus::Correct => Some(format!("+{}", MARKS_PER_QUESTION)),
            ReviewStatus::Wrong => Some(format!("-{}", MARKS_PER_QUESTION)),
            ReviewStatus::NotAttempted => None,
        }
    }
}

/// Per-question review. Unlike [`score`], unanswered questions are reported
/// separately here.
pub fn review<'a>(
    questions: &'a [Question],
    answers: &'a HashMap<String, Option<Answer>>,
) -> Vec<ReviewEntry<'a>> {
    questions
        .iter()
        .map(|q| {
            let given = answers.get(&q.id).and_then(|a| a.as_ref());
            let status = match given {
                None => ReviewStatus::NotAttempted,
                Some(a) if *a == q.correct_answer => ReviewStatus::Correct,
                Some(_) => ReviewStatus::Wrong,
            };
            ReviewEntry {
                question: q,
                given,
                status,
            }
        })
        .collect()
}
