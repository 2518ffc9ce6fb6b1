//! Sample content for local runs and smoke tests.

use assess_core::model::{
    Assessment, AssessmentError, AssessmentId, ChoiceOption, Question, QuestionError, QuestionId,
};

/// Errors raised while assembling fixture content.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum FixtureError {
    #[error(transparent)]
    Question(#[from] QuestionError),
    #[error(transparent)]
    Assessment(#[from] AssessmentError),
}

/// Two-question sample: one multiple choice (A/B/C) and one essay.
///
/// `with_practical` appends a practical question. Total points always equal the
/// sum of question points.
///
/// # Errors
///
/// Returns `FixtureError` if `title` is blank.
pub fn sample_assessment(
    id: AssessmentId,
    title: impl Into<String>,
    duration_minutes: u32,
    with_practical: bool,
) -> Result<Assessment, FixtureError> {
    let mut questions = vec![
        Question::multiple_choice(
            QuestionId::new(1),
            "Which keyword declares an immutable binding in Rust?",
            2,
            vec![
                ChoiceOption::new("A", "var", false),
                ChoiceOption::new("B", "let", true),
                ChoiceOption::new("C", "mut", false),
            ],
        )?,
        Question::essay(
            QuestionId::new(2),
            "Explain in a few sentences what ownership means.",
            8,
        )?,
    ];
    if with_practical {
        questions.push(Question::practical(
            QuestionId::new(3),
            "Pair with an instructor and refactor a function live.",
            10,
        )?);
    }

    let total_points = questions.iter().map(Question::points).sum();
    Ok(Assessment::new(
        id,
        title,
        duration_minutes,
        total_points,
        questions,
    )?)
}
