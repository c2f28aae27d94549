//! Tutor time cards: span fitting, session line items, totals and approvals.

use chrono::Utc;
use schoolnet_core::time_cards::{
    adjust_span_for_existing, spans_overlap, tutor_card_total, ApprovalState, LineItemAmount,
    PayPeriod, Span, SpanDecision,
};
use schoolnet_core::types::{DbId, Timestamp};
use schoolnet_db::models::tutoring::{CreateLineItem, TutorTimeCard};
use schoolnet_db::repositories::{
    StudentRepo, TutorRepo, TutorTimeCardRepo, TutoringSessionRepo, UserRepo,
};
use schoolnet_db::DbPool;

use crate::error::{ManagerError, ManagerResult};

/// Result of creating cards for many tutors at once.
#[derive(Debug, Default)]
pub struct CreatedTimeCards {
    pub created: Vec<TutorTimeCard>,
    /// Tutor ids for which no card was created.
    pub skipped: Vec<DbId>,
}

pub struct TutorTimeCardManager {
    pool: DbPool,
}

impl TutorTimeCardManager {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn load(&self, card_id: DbId) -> ManagerResult<TutorTimeCard> {
        TutorTimeCardRepo::find_by_id(&self.pool, card_id)
            .await?
            .ok_or_else(|| ManagerError::not_found("TutorTimeCard", card_id))
    }

    /// Create a card for `[start, end)`. With `include_sessions`, the
    /// tutor's payable individual sessions and non-cancelled group sessions
    /// in the span become line items.
    pub async fn create_time_card(
        &self,
        tutor_id: DbId,
        start: Timestamp,
        end: Timestamp,
        include_sessions: bool,
    ) -> ManagerResult<TutorTimeCard> {
        let tutor = TutorRepo::find_by_id(&self.pool, tutor_id)
            .await?
            .ok_or_else(|| ManagerError::not_found("Tutor", tutor_id))?;

        let proposed = Span::new(start, end);
        let existing = TutorTimeCardRepo::list_for_tutor(&self.pool, tutor_id).await?;
        let overlaps = existing
            .iter()
            .any(|c| spans_overlap(&Span::new(c.starts_at, c.ends_at), &proposed));
        if start >= end || overlaps {
            return Err(ManagerError::validation("Invalid time span for new time card"));
        }

        let items = if include_sessions {
            self.session_line_items(tutor_id, start, end).await?
        } else {
            Vec::new()
        };

        let card = TutorTimeCardRepo::create_with_line_items(
            &self.pool,
            tutor_id,
            start,
            end,
            tutor.hourly_rate_cents,
            &items,
        )
        .await?;
        self.calculate_total(card.id, true).await
    }

    async fn session_line_items(
        &self,
        tutor_id: DbId,
        start: Timestamp,
        end: Timestamp,
    ) -> ManagerResult<Vec<CreateLineItem>> {
        let mut items = Vec::new();

        for session in
            TutoringSessionRepo::list_payable_individual(&self.pool, tutor_id, start, end).await?
        {
            let student_name = match session.student_id {
                Some(student_id) => self.student_name(student_id).await?,
                None => String::new(),
            };
            items.push(CreateLineItem {
                title: format!("Individual tutoring session with {student_name}"),
                date: Some(session.starts_at),
                minutes: session.duration_minutes,
                individual_tutoring_session_id: Some(session.id),
                ..Default::default()
            });
        }

        let groups =
            TutoringSessionRepo::list_group_for_tutor(&self.pool, tutor_id, start, end).await?;
        for group in groups {
            items.push(CreateLineItem {
                title: format!("Group session: {}", group.title),
                date: Some(group.starts_at),
                minutes: group.pay_tutor_minutes(),
                group_tutoring_session_id: Some(group.id),
                ..Default::default()
            });
        }

        Ok(items)
    }

    async fn student_name(&self, student_id: DbId) -> ManagerResult<String> {
        let Some(student) = StudentRepo::find_by_id(&self.pool, student_id).await? else {
            return Ok(String::new());
        };
        Ok(UserRepo::find_by_id(&self.pool, student.user_id)
            .await?
            .map(|u| u.full_name())
            .unwrap_or_default())
    }

    /// Create cards for each tutor over `period`, trimming around at most
    /// one existing card. Cards that run to the period's end are shown as
    /// ending at the period's display end.
    pub async fn create_many(
        &self,
        tutor_ids: &[DbId],
        period: PayPeriod,
        include_sessions: bool,
    ) -> ManagerResult<CreatedTimeCards> {
        let mut result = CreatedTimeCards::default();

        for &tutor_id in tutor_ids {
            let existing: Vec<Span> =
                TutorTimeCardRepo::list_touching(&self.pool, tutor_id, period.start, period.end)
                    .await?
                    .iter()
                    .map(|c| Span::new(c.starts_at, c.ends_at))
                    .collect();

            let span = match adjust_span_for_existing(Span::new(period.start, period.end), &existing) {
                SpanDecision::Create(span) => span,
                SpanDecision::Skip(reason) => {
                    tracing::warn!(tutor_id, ?reason, "Skipping tutor time card");
                    result.skipped.push(tutor_id);
                    continue;
                }
            };

            match self
                .create_time_card(tutor_id, span.start, span.end, include_sessions)
                .await
            {
                Ok(card) if card.ends_at == period.end => {
                    TutorTimeCardRepo::set_ends_at(&self.pool, card.id, period.display_end).await?;
                    result.created.push(TutorTimeCard {
                        ends_at: period.display_end,
                        ..card
                    });
                }
                Ok(card) => result.created.push(card),
                Err(e) => {
                    tracing::error!(tutor_id, error = %e, "Failed to create tutor time card");
                    result.skipped.push(tutor_id);
                }
            }
        }

        Ok(result)
    }

    /// Recompute the card total. With `refresh_pay_rate`, the tutor's
    /// current hourly rate replaces the card's.
    pub async fn calculate_total(
        &self,
        card_id: DbId,
        refresh_pay_rate: bool,
    ) -> ManagerResult<TutorTimeCard> {
        let card = self.load(card_id).await?;
        let rate = if refresh_pay_rate {
            TutorRepo::find_by_id(&self.pool, card.tutor_id)
                .await?
                .map_or(card.hourly_rate_cents, |t| t.hourly_rate_cents)
        } else {
            card.hourly_rate_cents
        };

        let items: Vec<LineItemAmount> = TutorTimeCardRepo::line_items(&self.pool, card_id)
            .await?
            .iter()
            .map(|i| LineItemAmount {
                minutes: i.minutes,
                hourly_rate_cents: i.hourly_rate_cents,
            })
            .collect();

        TutorTimeCardRepo::set_total(&self.pool, card_id, rate, tutor_card_total(&items, rate))
            .await?
            .ok_or_else(|| ManagerError::not_found("TutorTimeCard", card_id))
    }

    /// A tutor approves their own card.
    pub async fn tutor_approve(
        &self,
        card_id: DbId,
        tutor_id: DbId,
        note: Option<&str>,
    ) -> ManagerResult<TutorTimeCard> {
        let card = self.load(card_id).await?;
        if card.tutor_id != tutor_id {
            return Err(ManagerError::forbidden("Tutor can't approve another tutor's time card"));
        }
        let mut state = approval_state(&card);
        state.approve_as_owner(Utc::now())?;
        TutorTimeCardRepo::set_approvals(
            &self.pool,
            card_id,
            state.owner_approved_at,
            state.admin_approved_at,
            None,
            note,
            None,
        )
        .await?
        .ok_or_else(|| ManagerError::not_found("TutorTimeCard", card_id))
    }

    pub async fn admin_approve(
        &self,
        card_id: DbId,
        admin_user_id: DbId,
        note: Option<&str>,
    ) -> ManagerResult<TutorTimeCard> {
        let card = self.load(card_id).await?;
        let mut state = approval_state(&card);
        state.approve_as_admin(Utc::now())?;
        TutorTimeCardRepo::set_approvals(
            &self.pool,
            card_id,
            state.owner_approved_at,
            state.admin_approved_at,
            Some(admin_user_id),
            None,
            note,
        )
        .await?
        .ok_or_else(|| ManagerError::not_found("TutorTimeCard", card_id))
    }
}

fn approval_state(card: &TutorTimeCard) -> ApprovalState {
    ApprovalState {
        owner_approved_at: card.tutor_approval_time,
        admin_approved_at: card.admin_approval_time,
    }
}
