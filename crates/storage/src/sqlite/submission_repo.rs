use assess_core::model::{
    Actor, AssessmentId, SessionResult, SubmissionId, result::encode_answers_json,
};

use super::SqliteRepository;
use super::mapping::{map_submission_row, read_err, ser, u64_to_i64, write_err};
use crate::repository::{StorageError, StoredSubmission, SubmissionRepository, SubmissionSink};

#[async_trait::async_trait]
impl SubmissionSink for SqliteRepository {
    async fn submit_result(
        &self,
        actor: &Actor,
        result: &SessionResult,
    ) -> Result<SubmissionId, StorageError> {
        let answers_json = encode_answers_json(&result.answers).map_err(ser)?;

        let res = sqlx::query(
            r"
                INSERT INTO submissions (
                    assessment_id, actor_id, actor_name, actor_role, started_at,
                    ended_at, elapsed_seconds, submit_trigger, score, answers_json
                )
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            ",
        )
        .bind(u64_to_i64("assessment_id", result.assessment_id.value())?)
        .bind(u64_to_i64("actor_id", actor.id.value())?)
        .bind(actor.display_name.as_str())
        .bind(actor.role.as_str())
        .bind(result.started_at)
        .bind(result.ended_at)
        .bind(u64_to_i64("elapsed_seconds", result.elapsed_seconds)?)
        .bind(result.trigger.as_str())
        .bind(result.score.map(i64::from))
        .bind(answers_json)
        .execute(&self.pool)
        .await
        .map_err(write_err)?;

        Ok(res.last_insert_rowid())
    }
}

#[async_trait::async_trait]
impl SubmissionRepository for SqliteRepository {
    async fn get_submission(&self, id: SubmissionId) -> Result<StoredSubmission, StorageError> {
        let row = sqlx::query(
            r"
                SELECT
                    id, assessment_id, actor_id, actor_name, actor_role, started_at,
                    ended_at, elapsed_seconds, submit_trigger, score, answers_json
                FROM submissions
                WHERE id = ?1
            ",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(read_err)?
        .ok_or(StorageError::NotFound)?;

        map_submission_row(&row)
    }

    async fn list_submissions(
        &self,
        assessment_id: AssessmentId,
        limit: u32,
    ) -> Result<Vec<StoredSubmission>, StorageError> {
        let rows = sqlx::query(
            r"
                SELECT
                    id, assessment_id, actor_id, actor_name, actor_role, started_at,
                    ended_at, elapsed_seconds, submit_trigger, score, answers_json
                FROM submissions
                WHERE assessment_id = ?1
                ORDER BY ended_at DESC, id DESC
                LIMIT ?2
            ",
        )
        .bind(u64_to_i64("assessment_id", assessment_id.value())?)
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(read_err)?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(map_submission_row(&row)?);
        }
        Ok(out)
    }
}
