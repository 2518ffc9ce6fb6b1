use assess_core::model::{
    ActorId, ActorRole, AssessmentId, ChoiceOption, OptionId, Question, QuestionId, QuestionKind,
    SessionResult, SubmitTrigger, result::decode_answers_json,
};
use sqlx::Row;

use crate::repository::{StorageError, StoredSubmission};

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

/// Maps write-side sqlx failures, keeping constraint violations distinguishable.
pub(crate) fn write_err(e: sqlx::Error) -> StorageError {
    if let sqlx::Error::Database(db) = &e {
        if db.is_unique_violation() {
            return StorageError::Conflict;
        }
        if db.is_foreign_key_violation() {
            return StorageError::NotFound;
        }
    }
    StorageError::Connection(e.to_string())
}

pub(crate) fn read_err(e: sqlx::Error) -> StorageError {
    StorageError::Connection(e.to_string())
}

fn i64_to_u64(field: &'static str, v: i64) -> Result<u64, StorageError> {
    u64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} sign overflow")))
}

pub(crate) fn u64_to_i64(field: &'static str, v: u64) -> Result<i64, StorageError> {
    i64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} overflow")))
}

pub(crate) fn u32_from_i64(field: &'static str, v: i64) -> Result<u32, StorageError> {
    u32::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {field}: {v}")))
}

pub(crate) fn assessment_id_from_i64(v: i64) -> Result<AssessmentId, StorageError> {
    Ok(AssessmentId::new(i64_to_u64("assessment_id", v)?))
}

pub(crate) fn question_id_from_i64(v: i64) -> Result<QuestionId, StorageError> {
    Ok(QuestionId::new(i64_to_u64("question_id", v)?))
}

pub(crate) fn actor_id_from_i64(v: i64) -> Result<ActorId, StorageError> {
    Ok(ActorId::new(i64_to_u64("actor_id", v)?))
}

/// Options belonging to one question, in authored order.
pub(crate) type OptionRows = Vec<ChoiceOption>;

pub(crate) fn map_option_row(row: &sqlx::sqlite::SqliteRow) -> Result<(QuestionId, ChoiceOption), StorageError> {
    let question_id = question_id_from_i64(row.try_get::<i64, _>("question_id").map_err(ser)?)?;
    let option = ChoiceOption {
        id: OptionId::new(row.try_get::<String, _>("option_id").map_err(ser)?),
        text: row.try_get("text").map_err(ser)?,
        is_correct: row.try_get("is_correct").map_err(ser)?,
    };
    Ok((question_id, option))
}

/// Rebuilds a question row. `options` is only consulted for multiple choice.
pub(crate) fn map_question_row(
    row: &sqlx::sqlite::SqliteRow,
    options: OptionRows,
) -> Result<Question, StorageError> {
    let id = question_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?;
    let kind_str: String = row.try_get("kind").map_err(ser)?;
    let kind = match kind_str.as_str() {
        "multiple_choice" => QuestionKind::MultipleChoice { options },
        "essay" => QuestionKind::Essay,
        "practical" => QuestionKind::Practical,
        other => {
            return Err(StorageError::Serialization(format!(
                "invalid question kind: {other}"
            )));
        }
    };
    let points = u32_from_i64("points", row.try_get::<i64, _>("points").map_err(ser)?)?;
    let text: String = row.try_get("text").map_err(ser)?;

    Question::new(id, text, points, kind).map_err(ser)
}

pub(crate) fn map_submission_row(
    row: &sqlx::sqlite::SqliteRow,
) -> Result<StoredSubmission, StorageError> {
    let role_str: String = row.try_get("actor_role").map_err(ser)?;
    let actor_role = ActorRole::parse(&role_str)
        .ok_or_else(|| StorageError::Serialization(format!("invalid actor role: {role_str}")))?;
    let trigger_str: String = row.try_get("submit_trigger").map_err(ser)?;
    let trigger = SubmitTrigger::parse(&trigger_str)
        .ok_or_else(|| StorageError::Serialization(format!("invalid trigger: {trigger_str}")))?;
    let elapsed_seconds = i64_to_u64(
        "elapsed_seconds",
        row.try_get::<i64, _>("elapsed_seconds").map_err(ser)?,
    )?;
    let score = row
        .try_get::<Option<i64>, _>("score")
        .map_err(ser)?
        .map(|v| u32_from_i64("score", v))
        .transpose()?;
    let answers_json: String = row.try_get("answers_json").map_err(ser)?;
    let answers = decode_answers_json(&answers_json).map_err(ser)?;

    Ok(StoredSubmission {
        id: row.try_get("id").map_err(ser)?,
        actor_id: actor_id_from_i64(row.try_get::<i64, _>("actor_id").map_err(ser)?)?,
        actor_name: row.try_get("actor_name").map_err(ser)?,
        actor_role,
        result: SessionResult {
            assessment_id: assessment_id_from_i64(
                row.try_get::<i64, _>("assessment_id").map_err(ser)?,
            )?,
            started_at: row.try_get("started_at").map_err(ser)?,
            ended_at: row.try_get("ended_at").map_err(ser)?,
            elapsed_seconds,
            answers,
            trigger,
            score,
        },
    })
}
