use crate::model::ids::{OptionId, QuestionId};

/// Response captured for a single question.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum AnswerValue {
    /// Nothing recorded yet, or not collected (practical questions).
    #[default]
    Empty,
    /// Selected option of a multiple-choice question.
    Choice(OptionId),
    /// Free-text essay response.
    Text(String),
}

impl AnswerValue {
    #[must_use]
    pub fn choice(option: impl Into<OptionId>) -> Self {
        Self::Choice(option.into())
    }

    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        matches!(self, AnswerValue::Empty)
    }

    /// Flat string form used by summaries and the terminal driver.
    #[must_use]
    pub fn as_display(&self) -> &str {
        match self {
            AnswerValue::Empty => "",
            AnswerValue::Choice(option) => option.as_str(),
            AnswerValue::Text(text) => text,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Answer {
    pub question_id: QuestionId,
    pub value: AnswerValue,
}

/// One answer per question, kept in question order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AnswerSet {
    answers: Vec<Answer>,
}

impl AnswerSet {
    /// Creates an all-empty answer set for the given question order.
    #[must_use]
    pub fn empty_for(question_ids: impl IntoIterator<Item = QuestionId>) -> Self {
        Self {
            answers: question_ids
                .into_iter()
                .map(|question_id| Answer {
                    question_id,
                    value: AnswerValue::Empty,
                })
                .collect(),
        }
    }

    /// Rebuilds a set from stored answers, keeping the given order.
    #[must_use]
    pub fn from_answers(answers: Vec<Answer>) -> Self {
        Self { answers }
    }

    #[must_use]
    pub fn get(&self, question_id: QuestionId) -> Option<&AnswerValue> {
        self.answers
            .iter()
            .find(|a| a.question_id == question_id)
            .map(|a| &a.value)
    }

    /// Overwrites the value for `question_id`. Returns false if the id is not part of the set.
    pub fn set(&mut self, question_id: QuestionId, value: AnswerValue) -> bool {
        match self.answers.iter_mut().find(|a| a.question_id == question_id) {
            Some(answer) => {
                answer.value = value;
                true
            }
            None => false,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Answer> {
        self.answers.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.answers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.answers.is_empty()
    }

    /// Number of questions with a non-empty response.
    #[must_use]
    pub fn answered_count(&self) -> usize {
        self.answers.iter().filter(|a| !a.value.is_empty()).count()
    }
}

impl<'a> IntoIterator for &'a AnswerSet {
    type Item = &'a Answer;
    type IntoIter = std::slice::Iter<'a, Answer>;

    fn into_iter(self) -> Self::IntoIter {
        self.answers.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_set_keeps_question_order() {
        let set = AnswerSet::empty_for([QuestionId::new(3), QuestionId::new(1)]);
        let ids: Vec<_> = set.iter().map(|a| a.question_id).collect();
        assert_eq!(ids, vec![QuestionId::new(3), QuestionId::new(1)]);
        assert_eq!(set.answered_count(), 0);
    }

    #[test]
    fn set_ignores_unknown_ids() {
        let mut set = AnswerSet::empty_for([QuestionId::new(1)]);
        assert!(!set.set(QuestionId::new(2), AnswerValue::text("x")));
        assert!(set.set(QuestionId::new(1), AnswerValue::choice("B")));
        assert_eq!(set.get(QuestionId::new(1)), Some(&AnswerValue::choice("B")));
        assert_eq!(set.answered_count(), 1);
    }

    #[test]
    fn display_form_is_flat() {
        assert_eq!(AnswerValue::Empty.as_display(), "");
        assert_eq!(AnswerValue::choice("C").as_display(), "C");
        assert_eq!(AnswerValue::text("my answer").as_display(), "my answer");
    }
}
