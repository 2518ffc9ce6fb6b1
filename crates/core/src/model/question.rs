use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

use crate::model::ids::{OptionId, QuestionId};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuestionError {
    #[error("question text cannot be empty")]
    EmptyText,

    #[error("multiple choice question needs at least one option")]
    NoOptions,

    #[error("option label cannot be empty")]
    EmptyOptionId,

    #[error("duplicate option id: {0}")]
    DuplicateOption(OptionId),
}

//
// ─── OPTIONS ───────────────────────────────────────────────────────────────────
//

/// A selectable option of a multiple-choice question, as authored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChoiceOption {
    pub id: OptionId,
    pub text: String,
    pub is_correct: bool,
}

impl ChoiceOption {
    #[must_use]
    pub fn new(id: impl Into<OptionId>, text: impl Into<String>, is_correct: bool) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            is_correct,
        }
    }
}

/// The taker-facing view of an option. Correctness is not part of it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresentedOption {
    pub id: OptionId,
    pub text: String,
}

//
// ─── QUESTION ──────────────────────────────────────────────────────────────────
//

/// Variant-specific shape of a question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum QuestionKind {
    MultipleChoice { options: Vec<ChoiceOption> },
    Essay,
    /// Evaluated out-of-band by a human; nothing is captured in the session.
    Practical,
}

impl QuestionKind {
    /// Stable storage/transport tag for the variant.
    #[must_use]
    pub fn tag(&self) -> &'static str {
        match self {
            QuestionKind::MultipleChoice { .. } => "multiple_choice",
            QuestionKind::Essay => "essay",
            QuestionKind::Practical => "practical",
        }
    }
}

/// A single authored question of an assessment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    id: QuestionId,
    text: String,
    points: u32,
    kind: QuestionKind,
}

impl Question {
    /// Creates a validated question.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError::EmptyText` if `text` is blank.
    /// Returns `QuestionError::NoOptions`, `EmptyOptionId` or `DuplicateOption`
    /// when a multiple-choice option list is malformed.
    pub fn new(
        id: QuestionId,
        text: impl Into<String>,
        points: u32,
        kind: QuestionKind,
    ) -> Result<Self, QuestionError> {
        let text = text.into();
        if text.trim().is_empty() {
            return Err(QuestionError::EmptyText);
        }

        if let QuestionKind::MultipleChoice { options } = &kind {
            if options.is_empty() {
                return Err(QuestionError::NoOptions);
            }
            let mut seen = HashSet::with_capacity(options.len());
            for option in options {
                if option.id.as_str().trim().is_empty() {
                    return Err(QuestionError::EmptyOptionId);
                }
                if !seen.insert(&option.id) {
                    return Err(QuestionError::DuplicateOption(option.id.clone()));
                }
            }
        }

        Ok(Self {
            id,
            text,
            points,
            kind,
        })
    }

    pub fn multiple_choice(
        id: QuestionId,
        text: impl Into<String>,
        points: u32,
        options: Vec<ChoiceOption>,
    ) -> Result<Self, QuestionError> {
        Self::new(id, text, points, QuestionKind::MultipleChoice { options })
    }

    pub fn essay(id: QuestionId, text: impl Into<String>, points: u32) -> Result<Self, QuestionError> {
        Self::new(id, text, points, QuestionKind::Essay)
    }

    pub fn practical(
        id: QuestionId,
        text: impl Into<String>,
        points: u32,
    ) -> Result<Self, QuestionError> {
        Self::new(id, text, points, QuestionKind::Practical)
    }

    #[must_use]
    pub fn id(&self) -> QuestionId {
        self.id
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn points(&self) -> u32 {
        self.points
    }

    #[must_use]
    pub fn kind(&self) -> &QuestionKind {
        &self.kind
    }

    /// Builds the snapshot handed to a taking session.
    #[must_use]
    pub fn present(&self) -> PresentedQuestion {
        let kind = match &self.kind {
            QuestionKind::MultipleChoice { options } => PresentedKind::MultipleChoice {
                options: options
                    .iter()
                    .map(|o| PresentedOption {
                        id: o.id.clone(),
                        text: o.text.clone(),
                    })
                    .collect(),
            },
            QuestionKind::Essay => PresentedKind::Essay,
            QuestionKind::Practical => PresentedKind::Practical,
        };

        PresentedQuestion {
            id: self.id,
            text: self.text.clone(),
            points: self.points,
            kind,
        }
    }
}

//
// ─── PRESENTED QUESTION ────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PresentedKind {
    MultipleChoice { options: Vec<PresentedOption> },
    Essay,
    Practical,
}

/// Immutable copy of a question as shown to the taker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresentedQuestion {
    pub id: QuestionId,
    pub text: String,
    pub points: u32,
    pub kind: PresentedKind,
}

impl PresentedQuestion {
    #[must_use]
    pub fn has_option(&self, option: &OptionId) -> bool {
        match &self.kind {
            PresentedKind::MultipleChoice { options } => options.iter().any(|o| &o.id == option),
            PresentedKind::Essay | PresentedKind::Practical => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn abc() -> Vec<ChoiceOption> {
        vec![
            ChoiceOption::new("A", "first", false),
            ChoiceOption::new("B", "second", true),
            ChoiceOption::new("C", "third", false),
        ]
    }

    #[test]
    fn rejects_blank_text() {
        let err = Question::essay(QuestionId::new(1), "   ", 5).unwrap_err();
        assert_eq!(err, QuestionError::EmptyText);
    }

    #[test]
    fn rejects_duplicate_options() {
        let options = vec![
            ChoiceOption::new("A", "x", false),
            ChoiceOption::new("A", "y", true),
        ];
        let err = Question::multiple_choice(QuestionId::new(1), "Pick", 1, options).unwrap_err();
        assert_eq!(err, QuestionError::DuplicateOption(OptionId::new("A")));
    }

    #[test]
    fn rejects_empty_option_list() {
        let err = Question::multiple_choice(QuestionId::new(1), "Pick", 1, vec![]).unwrap_err();
        assert_eq!(err, QuestionError::NoOptions);
    }

    #[test]
    fn presented_question_hides_correctness() {
        let q = Question::multiple_choice(QuestionId::new(1), "Pick", 2, abc()).unwrap();
        let presented = q.present();
        let PresentedKind::MultipleChoice { options } = &presented.kind else {
            panic!("expected multiple choice");
        };
        assert_eq!(options.len(), 3);
        assert_eq!(options[1].id, OptionId::new("B"));
        assert!(presented.has_option(&OptionId::new("C")));
        assert!(!presented.has_option(&OptionId::new("D")));
    }

    #[test]
    fn kind_serializes_with_type_tag() {
        let json = serde_json::to_value(QuestionKind::Essay).unwrap();
        assert_eq!(json["type"], "essay");
        assert_eq!(QuestionKind::Practical.tag(), "practical");
    }
}
