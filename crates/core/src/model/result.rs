use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

use crate::model::answer::{Answer, AnswerSet, AnswerValue};
use crate::model::ids::{AssessmentId, OptionId, QuestionId};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum PayloadError {
    #[error("ended_at is before started_at")]
    InvalidTimeRange,

    #[error("duplicate answer for question {0}")]
    DuplicateAnswer(QuestionId),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

//
// ─── RESULT ────────────────────────────────────────────────────────────────────
//

/// What finalized the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmitTrigger {
    /// The taker submitted explicitly.
    Manual,
    /// The countdown reached zero and the session auto-submitted.
    TimeExpired,
}

impl SubmitTrigger {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            SubmitTrigger::Manual => "manual",
            SubmitTrigger::TimeExpired => "time_expired",
        }
    }

    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "manual" => Some(Self::Manual),
            "time_expired" => Some(Self::TimeExpired),
            _ => None,
        }
    }
}

/// Frozen output of a finished session.
///
/// Scoring happens downstream, so `score` is `None` when the session emits it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionResult {
    pub assessment_id: AssessmentId,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub elapsed_seconds: u64,
    pub answers: AnswerSet,
    pub trigger: SubmitTrigger,
    pub score: Option<u32>,
}

impl SessionResult {
    #[must_use]
    pub fn is_auto_submitted(&self) -> bool {
        self.trigger == SubmitTrigger::TimeExpired
    }

    #[must_use]
    pub fn to_payload(&self) -> ResultPayload {
        ResultPayload {
            assessment_id: self.assessment_id,
            started_at: self.started_at,
            ended_at: self.ended_at,
            elapsed_seconds: self.elapsed_seconds,
            trigger: self.trigger,
            score: self.score,
            answers: answers_to_payload(&self.answers),
        }
    }

    /// Encodes the result as its JSON transport payload.
    ///
    /// # Errors
    ///
    /// Returns `PayloadError::Json` if serialization fails.
    pub fn encode_json(&self) -> Result<String, PayloadError> {
        Ok(serde_json::to_string(&self.to_payload())?)
    }

    /// Decodes a JSON transport payload.
    ///
    /// # Errors
    ///
    /// Returns `PayloadError::Json` for malformed input, and
    /// `InvalidTimeRange` or `DuplicateAnswer` for inconsistent payloads.
    pub fn decode_json(raw: &str) -> Result<Self, PayloadError> {
        let payload: ResultPayload = serde_json::from_str(raw)?;
        payload.into_result()
    }
}

//
// ─── TRANSPORT PAYLOAD ─────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AnswerPayloadValue {
    Empty,
    Choice { option: OptionId },
    Text { text: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerPayload {
    pub question_id: QuestionId,
    pub value: AnswerPayloadValue,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultPayload {
    pub assessment_id: AssessmentId,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub elapsed_seconds: u64,
    pub trigger: SubmitTrigger,
    #[serde(default)]
    pub score: Option<u32>,
    pub answers: Vec<AnswerPayload>,
}

impl ResultPayload {
    /// Validates and converts the payload back into a domain result.
    ///
    /// # Errors
    ///
    /// Returns `PayloadError::InvalidTimeRange` or `PayloadError::DuplicateAnswer`.
    pub fn into_result(self) -> Result<SessionResult, PayloadError> {
        if self.ended_at < self.started_at {
            return Err(PayloadError::InvalidTimeRange);
        }
        Ok(SessionResult {
            assessment_id: self.assessment_id,
            started_at: self.started_at,
            ended_at: self.ended_at,
            elapsed_seconds: self.elapsed_seconds,
            answers: answers_from_payload(self.answers)?,
            trigger: self.trigger,
            score: self.score,
        })
    }
}

fn answers_to_payload(answers: &AnswerSet) -> Vec<AnswerPayload> {
    answers
        .iter()
        .map(|a| AnswerPayload {
            question_id: a.question_id,
            value: match &a.value {
                AnswerValue::Empty => AnswerPayloadValue::Empty,
                AnswerValue::Choice(option) => AnswerPayloadValue::Choice {
                    option: option.clone(),
                },
                AnswerValue::Text(text) => AnswerPayloadValue::Text { text: text.clone() },
            },
        })
        .collect()
}

fn answers_from_payload(payload: Vec<AnswerPayload>) -> Result<AnswerSet, PayloadError> {
    let mut seen = HashSet::with_capacity(payload.len());
    let mut answers = Vec::with_capacity(payload.len());
    for item in payload {
        if !seen.insert(item.question_id) {
            return Err(PayloadError::DuplicateAnswer(item.question_id));
        }
        let value = match item.value {
            AnswerPayloadValue::Empty => AnswerValue::Empty,
            AnswerPayloadValue::Choice { option } => AnswerValue::Choice(option),
            AnswerPayloadValue::Text { text } => AnswerValue::Text(text),
        };
        answers.push(Answer {
            question_id: item.question_id,
            value,
        });
    }
    Ok(AnswerSet::from_answers(answers))
}

/// Encodes only the answer list, as stored next to a submission row.
///
/// # Errors
///
/// Returns `PayloadError::Json` if serialization fails.
pub fn encode_answers_json(answers: &AnswerSet) -> Result<String, PayloadError> {
    Ok(serde_json::to_string(&answers_to_payload(answers))?)
}

/// Inverse of [`encode_answers_json`].
///
/// # Errors
///
/// Returns `PayloadError::Json` or `PayloadError::DuplicateAnswer`.
pub fn decode_answers_json(raw: &str) -> Result<AnswerSet, PayloadError> {
    let payload: Vec<AnswerPayload> = serde_json::from_str(raw)?;
    answers_from_payload(payload)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    fn sample() -> SessionResult {
        let mut answers = AnswerSet::empty_for([QuestionId::new(1), QuestionId::new(2), QuestionId::new(3)]);
        answers.set(QuestionId::new(1), AnswerValue::choice("B"));
        answers.set(QuestionId::new(2), AnswerValue::text("my \"quoted\" answer"));
        SessionResult {
            assessment_id: AssessmentId::new(4),
            started_at: fixed_now(),
            ended_at: fixed_now() + chrono::Duration::seconds(30),
            elapsed_seconds: 30,
            answers,
            trigger: SubmitTrigger::Manual,
            score: None,
        }
    }

    #[test]
    fn json_payload_preserves_answers_by_question() {
        let result = sample();
        let raw = result.encode_json().unwrap();
        let decoded = SessionResult::decode_json(&raw).unwrap();

        for answer in &result.answers {
            assert_eq!(decoded.answers.get(answer.question_id), Some(&answer.value));
        }
        assert_eq!(decoded, result);
    }

    #[test]
    fn payload_shape_is_tagged_by_kind() {
        let value = serde_json::to_value(sample().to_payload()).unwrap();
        assert_eq!(value["trigger"], "manual");
        assert_eq!(value["answers"][0]["value"]["kind"], "choice");
        assert_eq!(value["answers"][0]["value"]["option"], "B");
        assert_eq!(value["answers"][2]["value"]["kind"], "empty");
        assert!(value["score"].is_null());
    }

    #[test]
    fn decode_rejects_duplicate_answers() {
        let raw = r#"[
            {"question_id": 1, "value": {"kind": "empty"}},
            {"question_id": 1, "value": {"kind": "text", "text": "x"}}
        ]"#;
        let err = decode_answers_json(raw).unwrap_err();
        assert!(matches!(err, PayloadError::DuplicateAnswer(id) if id == QuestionId::new(1)));
    }

    #[test]
    fn decode_rejects_inverted_time_range() {
        let mut payload = sample().to_payload();
        payload.ended_at = payload.started_at - chrono::Duration::seconds(1);
        let raw = serde_json::to_string(&payload).unwrap();
        assert!(matches!(
            SessionResult::decode_json(&raw),
            Err(PayloadError::InvalidTimeRange)
        ));
    }

    #[test]
    fn trigger_round_trips_through_storage_tag() {
        for trigger in [SubmitTrigger::Manual, SubmitTrigger::TimeExpired] {
            assert_eq!(SubmitTrigger::parse(trigger.as_str()), Some(trigger));
        }
        assert_eq!(SubmitTrigger::parse("late"), None);
    }
}
