//! Timed assessment session.
//!
//! A `Session` is the single-owner, in-memory run of one taker through one
//! assessment. It never performs IO: the caller feeds it elapsed time via
//! [`Session::tick`], forwards navigation and answers, and hands the emitted
//! [`SessionResult`] to whatever delivers it.

use chrono::{DateTime, Duration, Utc};
use std::fmt;
use thiserror::Error;

use crate::model::{
    AnswerSet, AnswerValue, Assessment, AssessmentId, PresentedKind, PresentedQuestion, QuestionId,
    SessionResult, SubmitTrigger,
};
use crate::time::elapsed_seconds;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SessionError {
    #[error("invalid assessment: {0}")]
    InvalidAssessment(&'static str),

    #[error("unknown question: {0}")]
    UnknownQuestion(QuestionId),

    #[error("session already submitted")]
    SessionClosed,

    #[error("invalid answer for question {question_id}: {reason}")]
    InvalidAnswer {
        question_id: QuestionId,
        reason: &'static str,
    },
}

//
// ─── STATUS / PROGRESS ─────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    InProgress,
    Submitted,
}

/// Aggregated view of session progress, useful for UI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionProgress {
    pub total: usize,
    pub answered: usize,
    pub current_index: usize,
    pub remaining_seconds: u64,
    pub is_submitted: bool,
}

//
// ─── SESSION ───────────────────────────────────────────────────────────────────
//

pub struct Session {
    assessment_id: AssessmentId,
    title: String,
    duration_minutes: u32,
    questions: Vec<PresentedQuestion>,
    current: usize,
    answers: AnswerSet,
    started_at: DateTime<Utc>,
    remaining_seconds: u64,
    status: SessionStatus,
    ended_at: Option<DateTime<Utc>>,
}

impl Session {
    /// Starts a session from a loaded assessment.
    ///
    /// The question list is snapshotted; later edits to `assessment` do not
    /// reach the session, and option correctness is dropped.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidAssessment` if the assessment has no
    /// questions or a zero duration.
    pub fn start(assessment: &Assessment, now: DateTime<Utc>) -> Result<Self, SessionError> {
        if assessment.questions().is_empty() {
            return Err(SessionError::InvalidAssessment("no questions"));
        }
        if assessment.duration_minutes() == 0 {
            return Err(SessionError::InvalidAssessment("duration must be > 0"));
        }

        let questions: Vec<PresentedQuestion> =
            assessment.questions().iter().map(|q| q.present()).collect();
        let answers = AnswerSet::empty_for(questions.iter().map(|q| q.id));

        Ok(Self {
            assessment_id: assessment.id(),
            title: assessment.title().to_owned(),
            duration_minutes: assessment.duration_minutes(),
            questions,
            current: 0,
            answers,
            started_at: now,
            remaining_seconds: u64::from(assessment.duration_minutes()) * 60,
            status: SessionStatus::InProgress,
            ended_at: None,
        })
    }

    #[must_use]
    pub fn assessment_id(&self) -> AssessmentId {
        self.assessment_id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn status(&self) -> SessionStatus {
        self.status
    }

    #[must_use]
    pub fn is_submitted(&self) -> bool {
        self.status == SessionStatus::Submitted
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    #[must_use]
    pub fn ended_at(&self) -> Option<DateTime<Utc>> {
        self.ended_at
    }

    #[must_use]
    pub fn remaining_seconds(&self) -> u64 {
        self.remaining_seconds
    }

    #[must_use]
    pub fn questions(&self) -> &[PresentedQuestion] {
        &self.questions
    }

    #[must_use]
    pub fn current_index(&self) -> usize {
        self.current
    }

    #[must_use]
    pub fn current_question(&self) -> &PresentedQuestion {
        // Non-empty by construction and `current` is always clamped.
        &self.questions[self.current]
    }

    #[must_use]
    pub fn answers(&self) -> &AnswerSet {
        &self.answers
    }

    #[must_use]
    pub fn answer(&self, question_id: QuestionId) -> Option<&AnswerValue> {
        self.answers.get(question_id)
    }

    #[must_use]
    pub fn progress(&self) -> SessionProgress {
        SessionProgress {
            total: self.questions.len(),
            answered: self.answers.answered_count(),
            current_index: self.current,
            remaining_seconds: self.remaining_seconds,
            is_submitted: self.is_submitted(),
        }
    }

    /// Consumes elapsed time from the countdown.
    ///
    /// Returns `Some(result)` exactly once: on the tick that drains the
    /// remaining time, after which the session is submitted.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::SessionClosed` if the session was already submitted.
    pub fn tick(&mut self, elapsed_secs: u64) -> Result<Option<SessionResult>, SessionError> {
        self.ensure_open()?;

        self.remaining_seconds = self.remaining_seconds.saturating_sub(elapsed_secs);
        if self.remaining_seconds > 0 {
            return Ok(None);
        }

        let duration_secs = u64::from(self.duration_minutes) * 60;
        let ended_at = self.started_at + Duration::minutes(i64::from(self.duration_minutes));
        Ok(Some(self.finalize(ended_at, duration_secs, SubmitTrigger::TimeExpired)))
    }

    /// Records or overwrites the answer for `question_id`.
    ///
    /// `AnswerValue::Empty` clears any question. Otherwise the value must fit
    /// the question kind: a listed option for multiple choice, text for essays.
    /// Practical questions only accept `Empty`.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::SessionClosed` once submitted,
    /// `SessionError::UnknownQuestion` for ids outside the snapshot, and
    /// `SessionError::InvalidAnswer` for a value that does not fit the question.
    pub fn record_answer(
        &mut self,
        question_id: QuestionId,
        value: AnswerValue,
    ) -> Result<(), SessionError> {
        self.ensure_open()?;

        let question = self
            .questions
            .iter()
            .find(|q| q.id == question_id)
            .ok_or(SessionError::UnknownQuestion(question_id))?;
        check_answer_fits(question, &value)?;

        if !self.answers.set(question_id, value) {
            return Err(SessionError::UnknownQuestion(question_id));
        }
        Ok(())
    }

    /// Moves to the next question. Returns false at the last question or once submitted.
    pub fn go_to_next(&mut self) -> bool {
        if self.is_submitted() || self.current + 1 >= self.questions.len() {
            return false;
        }
        self.current += 1;
        true
    }

    /// Moves to the previous question. Returns false at the first question or once submitted.
    pub fn go_to_previous(&mut self) -> bool {
        if self.is_submitted() || self.current == 0 {
            return false;
        }
        self.current -= 1;
        true
    }

    /// Jumps to `index`. Out-of-range indexes are ignored.
    pub fn go_to(&mut self, index: usize) -> bool {
        if self.is_submitted() || index >= self.questions.len() {
            return false;
        }
        self.current = index;
        true
    }

    /// Finalizes the session explicitly.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::SessionClosed` if the session was already submitted.
    pub fn submit(&mut self, now: DateTime<Utc>) -> Result<SessionResult, SessionError> {
        self.ensure_open()?;
        let ended_at = now.max(self.started_at);
        let elapsed = elapsed_seconds(self.started_at, ended_at);
        Ok(self.finalize(ended_at, elapsed, SubmitTrigger::Manual))
    }

    fn ensure_open(&self) -> Result<(), SessionError> {
        match self.status {
            SessionStatus::InProgress => Ok(()),
            SessionStatus::Submitted => Err(SessionError::SessionClosed),
        }
    }

    fn finalize(
        &mut self,
        ended_at: DateTime<Utc>,
        elapsed_seconds: u64,
        trigger: SubmitTrigger,
    ) -> SessionResult {
        self.status = SessionStatus::Submitted;
        self.ended_at = Some(ended_at);

        SessionResult {
            assessment_id: self.assessment_id,
            started_at: self.started_at,
            ended_at,
            elapsed_seconds,
            answers: self.answers.clone(),
            trigger,
            score: None,
        }
    }
}

fn check_answer_fits(question: &PresentedQuestion, value: &AnswerValue) -> Result<(), SessionError> {
    let reason = match (&question.kind, value) {
        (_, AnswerValue::Empty) | (PresentedKind::Essay, AnswerValue::Text(_)) => return Ok(()),
        (PresentedKind::MultipleChoice { .. }, AnswerValue::Choice(option)) => {
            if question.has_option(option) {
                return Ok(());
            }
            "unknown option"
        }
        (PresentedKind::Practical, _) => "practical questions are evaluated out-of-band",
        (PresentedKind::MultipleChoice { .. } | PresentedKind::Essay, _) => {
            "answer kind does not match question"
        }
    };
    Err(SessionError::InvalidAnswer {
        question_id: question.id,
        reason,
    })
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("assessment_id", &self.assessment_id)
            .field("questions_len", &self.questions.len())
            .field("current", &self.current)
            .field("answered", &self.answers.answered_count())
            .field("started_at", &self.started_at)
            .field("remaining_seconds", &self.remaining_seconds)
            .field("status", &self.status)
            .finish_non_exhaustive()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
