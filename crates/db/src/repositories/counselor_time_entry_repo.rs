//! Repository for the `counselor_time_entries` table.

use sqlx::PgPool;
use schoolnet_core::types::{DbId, Minutes, Timestamp};

use crate::models::counseling::{CounselorTimeEntry, CreateCounselorTimeEntry};

const COLUMNS: &str = "id, counselor_id, student_id, counselor_meeting_id, \
                        counselor_time_card_id, date, minutes, category, note, pay_rate_cents, \
                        include_in_hours_bank, created_at";

/// Provides CRUD operations for counselor time entries.
pub struct CounselorTimeEntryRepo;

impl CounselorTimeEntryRepo {
    pub async fn create(
        pool: &PgPool,
        input: &CreateCounselorTimeEntry,
    ) -> Result<CounselorTimeEntry, sqlx::Error> {
        let query = format!(
            "INSERT INTO counselor_time_entries
                (counselor_id, student_id, counselor_meeting_id, date, minutes, category, note,
                 pay_rate_cents, include_in_hours_bank)
             VALUES ($1, $2, $3, $4, $5, $6, COALESCE($7, ''), $8, COALESCE($9, true))
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, CounselorTimeEntry>(&query)
            .bind(input.counselor_id)
            .bind(input.student_id)
            .bind(input.counselor_meeting_id)
            .bind(input.date)
            .bind(input.minutes)
            .bind(&input.category)
            .bind(&input.note)
            .bind(input.pay_rate_cents)
            .bind(input.include_in_hours_bank)
            .fetch_one(pool)
            .await
    }

    pub async fn find_for_meeting(
        pool: &PgPool,
        counselor_meeting_id: DbId,
    ) -> Result<Option<CounselorTimeEntry>, sqlx::Error> {
        let query =
            format!("SELECT {COLUMNS} FROM counselor_time_entries WHERE counselor_meeting_id = $1");
        sqlx::query_as::<_, CounselorTimeEntry>(&query)
            .bind(counselor_meeting_id)
            .fetch_optional(pool)
            .await
    }

    /// Move a meeting's entry to the new date and duration. Entries on a
    /// time card an admin has approved stay as they are.
    pub async fn update_for_meeting(
        pool: &PgPool,
        counselor_meeting_id: DbId,
        date: Timestamp,
        minutes: Minutes,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE counselor_time_entries e SET date = $2, minutes = $3
             WHERE e.counselor_meeting_id = $1
               AND NOT EXISTS (
                   SELECT 1 FROM counselor_time_cards c
                   WHERE c.id = e.counselor_time_card_id AND c.admin_approval_time IS NOT NULL)",
        )
        .bind(counselor_meeting_id)
        .bind(date)
        .bind(minutes)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn delete_for_meeting(
        pool: &PgPool,
        counselor_meeting_id: DbId,
    ) -> Result<bool, sqlx::Error> {
        let result =
            sqlx::query("DELETE FROM counselor_time_entries WHERE counselor_meeting_id = $1")
                .bind(counselor_meeting_id)
                .execute(pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn list_for_card(
        pool: &PgPool,
        counselor_time_card_id: DbId,
    ) -> Result<Vec<CounselorTimeEntry>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM counselor_time_entries WHERE counselor_time_card_id = $1
             ORDER BY date, id"
        );
        sqlx::query_as::<_, CounselorTimeEntry>(&query)
            .bind(counselor_time_card_id)
            .fetch_all(pool)
            .await
    }

    pub async fn list_for_student(
        pool: &PgPool,
        student_id: DbId,
    ) -> Result<Vec<CounselorTimeEntry>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM counselor_time_entries WHERE student_id = $1
             ORDER BY date, id"
        );
        sqlx::query_as::<_, CounselorTimeEntry>(&query)
            .bind(student_id)
            .fetch_all(pool)
            .await
    }
}
