//! Repository for `tutor_time_cards` and `tutor_time_card_line_items`.

use sqlx::PgPool;
use schoolnet_core::types::{Cents, DbId, Timestamp};

use crate::models::tutoring::{CreateLineItem, TutorTimeCard, TutorTimeCardLineItem};

const COLUMNS: &str = "id, tutor_id, starts_at, ends_at, hourly_rate_cents, total_cents, \
                        tutor_approval_time, tutor_note, admin_approver_id, \
                        admin_approval_time, admin_note, created_at, updated_at";

const LINE_ITEM_COLUMNS: &str = "id, time_card_id, title, date, minutes, hourly_rate_cents, \
                                  individual_tutoring_session_id, group_tutoring_session_id, \
                                  created_at";

/// Provides CRUD operations for tutor time cards.
pub struct TutorTimeCardRepo;

impl TutorTimeCardRepo {
    /// Insert a card and its line items in one transaction.
    pub async fn create_with_line_items(
        pool: &PgPool,
        tutor_id: DbId,
        start: Timestamp,
        end: Timestamp,
        hourly_rate_cents: Cents,
        items: &[CreateLineItem],
    ) -> Result<TutorTimeCard, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let query = format!(
            "INSERT INTO tutor_time_cards (tutor_id, starts_at, ends_at, hourly_rate_cents)
             VALUES ($1, $2, $3, $4)
             RETURNING {COLUMNS}"
        );
        let card = sqlx::query_as::<_, TutorTimeCard>(&query)
            .bind(tutor_id)
            .bind(start)
            .bind(end)
            .bind(hourly_rate_cents)
            .fetch_one(&mut *tx)
            .await?;

        for item in items {
            sqlx::query(
                "INSERT INTO tutor_time_card_line_items
                    (time_card_id, title, date, minutes, hourly_rate_cents,
                     individual_tutoring_session_id, group_tutoring_session_id)
                 VALUES ($1, $2, $3, $4, $5, $6, $7)",
            )
            .bind(card.id)
            .bind(&item.title)
            .bind(item.date)
            .bind(item.minutes)
            .bind(item.hourly_rate_cents)
            .bind(item.individual_tutoring_session_id)
            .bind(item.group_tutoring_session_id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(card)
    }

    pub async fn find_by_id(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<TutorTimeCard>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM tutor_time_cards WHERE id = $1");
        sqlx::query_as::<_, TutorTimeCard>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn list_for_tutor(
        pool: &PgPool,
        tutor_id: DbId,
    ) -> Result<Vec<TutorTimeCard>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM tutor_time_cards WHERE tutor_id = $1
             ORDER BY starts_at DESC, id DESC"
        );
        sqlx::query_as::<_, TutorTimeCard>(&query)
            .bind(tutor_id)
            .fetch_all(pool)
            .await
    }

    /// A tutor's cards with an endpoint inside `[start, end]` or spanning it.
    pub async fn list_touching(
        pool: &PgPool,
        tutor_id: DbId,
        start: Timestamp,
        end: Timestamp,
    ) -> Result<Vec<TutorTimeCard>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM tutor_time_cards
             WHERE tutor_id = $1
               AND ((starts_at >= $2 AND starts_at <= $3)
                 OR (ends_at >= $2 AND ends_at <= $3)
                 OR (starts_at < $2 AND ends_at > $3))
             ORDER BY starts_at, id"
        );
        sqlx::query_as::<_, TutorTimeCard>(&query)
            .bind(tutor_id)
            .bind(start)
            .bind(end)
            .fetch_all(pool)
            .await
    }

    /// Ids of active tutors with no card created at or after `since`.
    pub async fn tutors_without_card_since(
        pool: &PgPool,
        since: Timestamp,
    ) -> Result<Vec<DbId>, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT t.id FROM tutors t
             JOIN users u ON u.id = t.user_id
             WHERE u.is_active = true
               AND NOT EXISTS (
                   SELECT 1 FROM tutor_time_cards c
                   WHERE c.tutor_id = t.id AND c.created_at >= $1
               )
             ORDER BY t.id",
        )
        .bind(since)
        .fetch_all(pool)
        .await
    }

    pub async fn line_items(
        pool: &PgPool,
        time_card_id: DbId,
    ) -> Result<Vec<TutorTimeCardLineItem>, sqlx::Error> {
        let query = format!(
            "SELECT {LINE_ITEM_COLUMNS} FROM tutor_time_card_line_items WHERE time_card_id = $1
             ORDER BY date NULLS LAST, id"
        );
        sqlx::query_as::<_, TutorTimeCardLineItem>(&query)
            .bind(time_card_id)
            .fetch_all(pool)
            .await
    }

    pub async fn set_total(
        pool: &PgPool,
        id: DbId,
        hourly_rate_cents: Cents,
        total_cents: Cents,
    ) -> Result<Option<TutorTimeCard>, sqlx::Error> {
        let query = format!(
            "UPDATE tutor_time_cards SET hourly_rate_cents = $2, total_cents = $3
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, TutorTimeCard>(&query)
            .bind(id)
            .bind(hourly_rate_cents)
            .bind(total_cents)
            .fetch_optional(pool)
            .await
    }

    /// Move the displayed end of a card.
    pub async fn set_ends_at(
        pool: &PgPool,
        id: DbId,
        ends_at: Timestamp,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE tutor_time_cards SET ends_at = $2 WHERE id = $1")
            .bind(id)
            .bind(ends_at)
            .execute(pool)
            .await?;
        Ok(())
    }

    /// Persist both approval stamps. A `None` note leaves the stored note as is.
    pub async fn set_approvals(
        pool: &PgPool,
        id: DbId,
        tutor_approval_time: Option<Timestamp>,
        admin_approval_time: Option<Timestamp>,
        admin_approver_id: Option<DbId>,
        tutor_note: Option<&str>,
        admin_note: Option<&str>,
    ) -> Result<Option<TutorTimeCard>, sqlx::Error> {
        let query = format!(
            "UPDATE tutor_time_cards SET
                tutor_approval_time = $2,
                admin_approval_time = $3,
                admin_approver_id = COALESCE($4, admin_approver_id),
                tutor_note = COALESCE($5, tutor_note),
                admin_note = COALESCE($6, admin_note)
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, TutorTimeCard>(&query)
            .bind(id)
            .bind(tutor_approval_time)
            .bind(admin_approval_time)
            .bind(admin_approver_id)
            .bind(tutor_note)
            .bind(admin_note)
            .fetch_optional(pool)
            .await
    }
}
