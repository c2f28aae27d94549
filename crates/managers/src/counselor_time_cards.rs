//! Counselor time cards: claiming entries, totals and approvals.

use chrono::Utc;
use schoolnet_core::time_cards::{counselor_card_total, ApprovalState, CounselorEntryAmount};
use schoolnet_core::types::{Cents, DbId, Timestamp};
use schoolnet_db::models::counseling::CounselorTimeCard;
use schoolnet_db::repositories::{CounselorRepo, CounselorTimeCardRepo};
use schoolnet_db::DbPool;

use crate::error::{ManagerError, ManagerResult};

pub struct CounselorTimeCardManager {
    pool: DbPool,
}

impl CounselorTimeCardManager {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn load(&self, card_id: DbId) -> ManagerResult<CounselorTimeCard> {
        CounselorTimeCardRepo::find_by_id(&self.pool, card_id)
            .await?
            .ok_or_else(|| ManagerError::not_found("CounselorTimeCard", card_id))
    }

    /// Create a card for a part-time counselor covering `[start, end]` and
    /// claim their unassigned time entries in that span.
    pub async fn create(
        &self,
        counselor_id: DbId,
        start: Timestamp,
        end: Timestamp,
    ) -> ManagerResult<CounselorTimeCard> {
        if start >= end {
            return Err(ManagerError::validation("Time card start must be before end"));
        }
        let counselor = CounselorRepo::find_by_id(&self.pool, counselor_id)
            .await?
            .ok_or_else(|| ManagerError::not_found("Counselor", counselor_id))?;
        if !counselor.part_time {
            return Err(ManagerError::validation(
                "Time cards can only be created for part-time counselors",
            ));
        }

        let card = CounselorTimeCardRepo::create_with_entries(
            &self.pool,
            counselor_id,
            start,
            end,
            counselor.hourly_rate_cents,
        )
        .await?;
        let card = self.set_total(card.id).await?;

        tracing::info!(
            card_id = card.id,
            counselor_id,
            total_cents = card.total_cents,
            "Counselor time card created"
        );
        Ok(card)
    }

    /// Recompute and store the card total from its entries.
    pub async fn set_total(&self, card_id: DbId) -> ManagerResult<CounselorTimeCard> {
        let card = self.load(card_id).await?;
        let total = self.calculate_total(&card).await?;
        CounselorTimeCardRepo::set_total(&self.pool, card_id, total)
            .await?
            .ok_or_else(|| ManagerError::not_found("CounselorTimeCard", card_id))
    }

    async fn calculate_total(&self, card: &CounselorTimeCard) -> ManagerResult<Cents> {
        let entries: Vec<CounselorEntryAmount> =
            CounselorTimeCardRepo::entry_rates(&self.pool, card.id)
                .await?
                .into_iter()
                .map(|r| CounselorEntryAmount {
                    minutes: r.minutes,
                    pay_rate_cents: r.pay_rate_cents,
                    student_pay_rate_cents: r.student_pay_rate_cents,
                })
                .collect();
        Ok(counselor_card_total(&entries, card.hourly_rate_cents))
    }

    /// The owning counselor signs off. Fails when already approved or when
    /// `counselor_id` does not own the card.
    pub async fn approve_as_counselor(
        &self,
        card_id: DbId,
        counselor_id: DbId,
        note: Option<&str>,
    ) -> ManagerResult<CounselorTimeCard> {
        let card = self.load(card_id).await?;
        if card.counselor_id != counselor_id {
            return Err(ManagerError::forbidden("Time card belongs to another counselor"));
        }
        let mut state = approval_state(&card);
        state.approve_as_owner(Utc::now())?;
        self.store_approvals(card_id, state, note, None).await
    }

    /// Admin sign-off, applying the counselor approval when it is missing.
    pub async fn approve_as_admin(
        &self,
        card_id: DbId,
        note: Option<&str>,
    ) -> ManagerResult<CounselorTimeCard> {
        let card = self.load(card_id).await?;
        let mut state = approval_state(&card);
        state.approve_as_admin(Utc::now())?;
        self.store_approvals(card_id, state, None, note).await
    }

    async fn store_approvals(
        &self,
        card_id: DbId,
        state: ApprovalState,
        counselor_note: Option<&str>,
        admin_note: Option<&str>,
    ) -> ManagerResult<CounselorTimeCard> {
        CounselorTimeCardRepo::set_approvals(
            &self.pool,
            card_id,
            state.owner_approved_at,
            state.admin_approved_at,
            counselor_note,
            admin_note,
        )
        .await?
        .ok_or_else(|| ManagerError::not_found("CounselorTimeCard", card_id))
    }
}

fn approval_state(card: &CounselorTimeCard) -> ApprovalState {
    ApprovalState {
        owner_approved_at: card.counselor_approval_time,
        admin_approved_at: card.admin_approval_time,
    }
}
