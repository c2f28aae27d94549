//! Repository for the `counselor_time_cards` table.

use sqlx::PgPool;
use schoolnet_core::time_cards::{ADMIN_CATEGORIES, ADMIN_TIME_PAY_RATE_CENTS};
use schoolnet_core::types::{Cents, DbId, Timestamp};

use crate::models::counseling::{CounselorTimeCard, TimeEntryRate};

const COLUMNS: &str = "id, counselor_id, starts_at, ends_at, hourly_rate_cents, total_cents, \
                        counselor_approval_time, counselor_note, admin_approval_time, \
                        admin_note, created_at, updated_at";

/// Provides CRUD operations for counselor time cards.
pub struct CounselorTimeCardRepo;

impl CounselorTimeCardRepo {
    /// Create a card and claim the counselor's unassigned, non-negative
    /// entries dated within `[start, end]`. Admin-category entries are
    /// priced at the admin rate.
    pub async fn create_with_entries(
        pool: &PgPool,
        counselor_id: DbId,
        start: Timestamp,
        end: Timestamp,
        hourly_rate_cents: Cents,
    ) -> Result<CounselorTimeCard, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let query = format!(
            "INSERT INTO counselor_time_cards (counselor_id, starts_at, ends_at, hourly_rate_cents)
             VALUES ($1, $2, $3, $4)
             RETURNING {COLUMNS}"
        );
        let card = sqlx::query_as::<_, CounselorTimeCard>(&query)
            .bind(counselor_id)
            .bind(start)
            .bind(end)
            .bind(hourly_rate_cents)
            .fetch_one(&mut *tx)
            .await?;

        sqlx::query(
            "UPDATE counselor_time_entries SET counselor_time_card_id = $2
             WHERE counselor_id = $1 AND counselor_time_card_id IS NULL
               AND minutes >= 0 AND date >= $3 AND date <= $4",
        )
        .bind(counselor_id)
        .bind(card.id)
        .bind(start)
        .bind(end)
        .execute(&mut *tx)
        .await?;

        let admin_categories: Vec<String> =
            ADMIN_CATEGORIES.iter().map(|c| c.to_string()).collect();
        sqlx::query(
            "UPDATE counselor_time_entries SET pay_rate_cents = $3
             WHERE counselor_time_card_id = $1 AND category = ANY($2)",
        )
        .bind(card.id)
        .bind(&admin_categories)
        .bind(ADMIN_TIME_PAY_RATE_CENTS)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(card)
    }

    pub async fn find_by_id(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<CounselorTimeCard>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM counselor_time_cards WHERE id = $1");
        sqlx::query_as::<_, CounselorTimeCard>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Cards newest first, optionally for one counselor.
    pub async fn list(
        pool: &PgPool,
        counselor_id: Option<DbId>,
    ) -> Result<Vec<CounselorTimeCard>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM counselor_time_cards
             WHERE ($1::BIGINT IS NULL OR counselor_id = $1)
             ORDER BY starts_at DESC, id DESC"
        );
        sqlx::query_as::<_, CounselorTimeCard>(&query)
            .bind(counselor_id)
            .fetch_all(pool)
            .await
    }

    /// Minutes and rates of the entries on a card, with each entry's
    /// student pay rate.
    pub async fn entry_rates(
        pool: &PgPool,
        card_id: DbId,
    ) -> Result<Vec<TimeEntryRate>, sqlx::Error> {
        sqlx::query_as::<_, TimeEntryRate>(
            "SELECT e.minutes, e.pay_rate_cents, s.counselor_pay_rate_cents AS student_pay_rate_cents
             FROM counselor_time_entries e
             LEFT JOIN students s ON s.id = e.student_id
             WHERE e.counselor_time_card_id = $1
             ORDER BY e.id",
        )
        .bind(card_id)
        .fetch_all(pool)
        .await
    }

    pub async fn set_total(
        pool: &PgPool,
        id: DbId,
        total_cents: Cents,
    ) -> Result<Option<CounselorTimeCard>, sqlx::Error> {
        let query = format!(
            "UPDATE counselor_time_cards SET total_cents = $2 WHERE id = $1 RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, CounselorTimeCard>(&query)
            .bind(id)
            .bind(total_cents)
            .fetch_optional(pool)
            .await
    }

    /// Persist both approval stamps. A `None` note leaves the stored note as is.
    pub async fn set_approvals(
        pool: &PgPool,
        id: DbId,
        counselor_approval_time: Option<Timestamp>,
        admin_approval_time: Option<Timestamp>,
        counselor_note: Option<&str>,
        admin_note: Option<&str>,
    ) -> Result<Option<CounselorTimeCard>, sqlx::Error> {
        let query = format!(
            "UPDATE counselor_time_cards SET
                counselor_approval_time = $2,
                admin_approval_time = $3,
                counselor_note = COALESCE($4, counselor_note),
                admin_note = COALESCE($5, admin_note)
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, CounselorTimeCard>(&query)
            .bind(id)
            .bind(counselor_approval_time)
            .bind(admin_approval_time)
            .bind(counselor_note)
            .bind(admin_note)
            .fetch_optional(pool)
            .await
    }
}
