use std::collections::HashSet;
use thiserror::Error;

use crate::model::ids::{AssessmentId, QuestionId};
use crate::model::question::Question;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum AssessmentError {
    #[error("assessment title cannot be empty")]
    EmptyTitle,

    #[error("duplicate question id: {0}")]
    DuplicateQuestion(QuestionId),
}

/// An ordered, timed set of questions.
///
/// Empty question lists and a zero duration are representable here so that
/// authoring tools can save drafts. A taking session refuses to start on them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assessment {
    id: AssessmentId,
    title: String,
    duration_minutes: u32,
    total_points: u32,
    questions: Vec<Question>,
}

impl Assessment {
    /// Creates an assessment from already-validated questions.
    ///
    /// # Errors
    ///
    /// Returns `AssessmentError::EmptyTitle` for a blank title.
    /// Returns `AssessmentError::DuplicateQuestion` if two questions share an id.
    pub fn new(
        id: AssessmentId,
        title: impl Into<String>,
        duration_minutes: u32,
        total_points: u32,
        questions: Vec<Question>,
    ) -> Result<Self, AssessmentError> {
        let title = title.into();
        if title.trim().is_empty() {
            return Err(AssessmentError::EmptyTitle);
        }

        let mut seen = HashSet::with_capacity(questions.len());
        for q in &questions {
            if !seen.insert(q.id()) {
                return Err(AssessmentError::DuplicateQuestion(q.id()));
            }
        }

        Ok(Self {
            id,
            title,
            duration_minutes,
            total_points,
            questions,
        })
    }

    #[must_use]
    pub fn id(&self) -> AssessmentId {
        self.id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn duration_minutes(&self) -> u32 {
        self.duration_minutes
    }

    /// Point budget declared by the author.
    #[must_use]
    pub fn total_points(&self) -> u32 {
        self.total_points
    }

    #[must_use]
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    #[must_use]
    pub fn question_count(&self) -> usize {
        self.questions.len()
    }

    /// Sum of per-question points. Not required to equal `total_points`.
    #[must_use]
    pub fn points_sum(&self) -> u64 {
        self.questions.iter().map(|q| u64::from(q.points())).sum()
    }

    #[must_use]
    pub fn points_match_budget(&self) -> bool {
        self.points_sum() == u64::from(self.total_points)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn essay(id: u64, points: u32) -> Question {
        Question::essay(QuestionId::new(id), format!("Q{id}"), points).unwrap()
    }

    #[test]
    fn rejects_duplicate_question_ids() {
        let err = Assessment::new(
            AssessmentId::new(1),
            "Midterm",
            30,
            10,
            vec![essay(1, 5), essay(1, 5)],
        )
        .unwrap_err();
        assert_eq!(err, AssessmentError::DuplicateQuestion(QuestionId::new(1)));
    }

    #[test]
    fn rejects_blank_title() {
        let err = Assessment::new(AssessmentId::new(1), " ", 30, 10, vec![]).unwrap_err();
        assert_eq!(err, AssessmentError::EmptyTitle);
    }

    #[test]
    fn budget_mismatch_is_reported_not_enforced() {
        let a = Assessment::new(
            AssessmentId::new(1),
            "Quiz",
            10,
            100,
            vec![essay(1, 5), essay(2, 7)],
        )
        .unwrap();
        assert_eq!(a.points_sum(), 12);
        assert!(!a.points_match_budget());
    }

    #[test]
    fn accepts_empty_draft() {
        let a = Assessment::new(AssessmentId::new(9), "Draft", 0, 0, vec![]).unwrap();
        assert_eq!(a.question_count(), 0);
    }
}
