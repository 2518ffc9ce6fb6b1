use assess_core::model::{Assessment, AssessmentId, ChoiceOption, QuestionId, QuestionKind};
use sqlx::Row;
use std::collections::HashMap;

use super::SqliteRepository;
use super::mapping::{
    assessment_id_from_i64, map_option_row, map_question_row, question_id_from_i64, read_err,
    ser, u32_from_i64, u64_to_i64, write_err,
};
use crate::repository::{AssessmentListItem, AssessmentRepository, StorageError};

#[async_trait::async_trait]
impl AssessmentRepository for SqliteRepository {
    async fn upsert_assessment(&self, assessment: &Assessment) -> Result<(), StorageError> {
        let assessment_id = u64_to_i64("assessment_id", assessment.id().value())?;
        let mut tx = self.pool.begin().await.map_err(write_err)?;

        sqlx::query(
            r"
                INSERT INTO assessments (id, title, duration_minutes, total_points)
                VALUES (?1, ?2, ?3, ?4)
                ON CONFLICT(id) DO UPDATE SET
                    title = excluded.title,
                    duration_minutes = excluded.duration_minutes,
                    total_points = excluded.total_points
            ",
        )
        .bind(assessment_id)
        .bind(assessment.title())
        .bind(i64::from(assessment.duration_minutes()))
        .bind(i64::from(assessment.total_points()))
        .execute(&mut *tx)
        .await
        .map_err(write_err)?;

        // Replace the question list wholesale; positions follow the new order.
        sqlx::query("DELETE FROM question_options WHERE assessment_id = ?1")
            .bind(assessment_id)
            .execute(&mut *tx)
            .await
            .map_err(write_err)?;
        sqlx::query("DELETE FROM questions WHERE assessment_id = ?1")
            .bind(assessment_id)
            .execute(&mut *tx)
            .await
            .map_err(write_err)?;

        for (position, question) in assessment.questions().iter().enumerate() {
            let question_id = u64_to_i64("question_id", question.id().value())?;
            sqlx::query(
                r"
                    INSERT INTO questions (id, assessment_id, position, kind, text, points)
                    VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                ",
            )
            .bind(question_id)
            .bind(assessment_id)
            .bind(u64_to_i64("position", position as u64)?)
            .bind(question.kind().tag())
            .bind(question.text())
            .bind(i64::from(question.points()))
            .execute(&mut *tx)
            .await
            .map_err(write_err)?;

            if let QuestionKind::MultipleChoice { options } = question.kind() {
                for (opt_position, option) in options.iter().enumerate() {
                    sqlx::query(
                        r"
                            INSERT INTO question_options (
                                assessment_id, question_id, option_id, position, text, is_correct
                            )
                            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                        ",
                    )
                    .bind(assessment_id)
                    .bind(question_id)
                    .bind(option.id.as_str())
                    .bind(u64_to_i64("option position", opt_position as u64)?)
                    .bind(option.text.as_str())
                    .bind(option.is_correct)
                    .execute(&mut *tx)
                    .await
                    .map_err(write_err)?;
                }
            }
        }

        tx.commit().await.map_err(write_err)?;
        tracing::debug!(
            assessment_id = %assessment.id(),
            questions = assessment.question_count(),
            "assessment stored"
        );
        Ok(())
    }

    async fn get_assessment(&self, id: AssessmentId) -> Result<Assessment, StorageError> {
        let assessment_id = u64_to_i64("assessment_id", id.value())?;

        let row = sqlx::query(
            r"
                SELECT id, title, duration_minutes, total_points
                FROM assessments
                WHERE id = ?1
            ",
        )
        .bind(assessment_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(read_err)?
        .ok_or(StorageError::NotFound)?;

        let option_rows = sqlx::query(
            r"
                SELECT question_id, option_id, text, is_correct
                FROM question_options
                WHERE assessment_id = ?1
                ORDER BY question_id, position
            ",
        )
        .bind(assessment_id)
        .fetch_all(&self.pool)
        .await
        .map_err(read_err)?;

        let mut options_by_question: HashMap<QuestionId, Vec<ChoiceOption>> = HashMap::new();
        for option_row in &option_rows {
            let (question_id, option) = map_option_row(option_row)?;
            options_by_question.entry(question_id).or_default().push(option);
        }

        let question_rows = sqlx::query(
            r"
                SELECT id, kind, text, points
                FROM questions
                WHERE assessment_id = ?1
                ORDER BY position
            ",
        )
        .bind(assessment_id)
        .fetch_all(&self.pool)
        .await
        .map_err(read_err)?;

        let mut questions = Vec::with_capacity(question_rows.len());
        for question_row in &question_rows {
            let question_id =
                question_id_from_i64(question_row.try_get::<i64, _>("id").map_err(ser)?)?;
            let options = options_by_question.remove(&question_id).unwrap_or_default();
            questions.push(map_question_row(question_row, options)?);
        }

        Assessment::new(
            assessment_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?,
            row.try_get::<String, _>("title").map_err(ser)?,
            u32_from_i64(
                "duration_minutes",
                row.try_get::<i64, _>("duration_minutes").map_err(ser)?,
            )?,
            u32_from_i64(
                "total_points",
                row.try_get::<i64, _>("total_points").map_err(ser)?,
            )?,
            questions,
        )
        .map_err(ser)
    }

    async fn list_assessments(&self, limit: u32) -> Result<Vec<AssessmentListItem>, StorageError> {
        let rows = sqlx::query(
            r"
                SELECT
                    a.id, a.title, a.duration_minutes,
                    (SELECT COUNT(*) FROM questions q WHERE q.assessment_id = a.id) AS question_count
                FROM assessments a
                ORDER BY a.id
                LIMIT ?1
            ",
        )
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(read_err)?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            let question_count: i64 = row.try_get("question_count").map_err(ser)?;
            out.push(AssessmentListItem {
                id: assessment_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?,
                title: row.try_get("title").map_err(ser)?,
                duration_minutes: u32_from_i64(
                    "duration_minutes",
                    row.try_get::<i64, _>("duration_minutes").map_err(ser)?,
                )?,
                question_count: usize::try_from(question_count).map_err(ser)?,
            });
        }
        Ok(out)
    }
}
