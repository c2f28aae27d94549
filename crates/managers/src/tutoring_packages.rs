//! Tutoring package purchases and the hours they buy.

use chrono::Utc;
use schoolnet_core::hours::{available_tutoring_hours, SessionUsage, TutoringHours};
use schoolnet_core::notification_types as types;
use schoolnet_core::types::{Cents, DbId};
use schoolnet_db::models::tutoring::TutoringPackagePurchase;
use schoolnet_db::repositories::{StudentRepo, TutoringPackageRepo, TutoringSessionRepo};
use schoolnet_db::DbPool;
use schoolnet_events::{NewNotification, Notifier};
use serde_json::json;

use crate::error::{ManagerError, ManagerResult};

pub struct TutoringPackageManager {
    pool: DbPool,
    notifier: Notifier,
}

impl TutoringPackageManager {
    pub fn new(notifier: Notifier) -> Self {
        Self {
            pool: notifier.pool().clone(),
            notifier,
        }
    }

    /// Purchased minutes minus deducted sessions, per bucket.
    pub async fn available_hours(&self, student_id: DbId) -> ManagerResult<TutoringHours> {
        let purchased = TutoringPackageRepo::purchased_minutes(&self.pool, student_id).await?;
        let sessions: Vec<SessionUsage> = TutoringSessionRepo::usage_for_student(&self.pool, student_id)
            .await?
            .into_iter()
            .map(SessionUsage::from)
            .collect();
        Ok(available_tutoring_hours(purchased.into(), &sessions))
    }

    /// Record a purchase and enroll the student in the package's group
    /// sessions. `paid` defaults to the package price.
    pub async fn purchase_package(
        &self,
        student_id: DbId,
        package_id: DbId,
        paid_cents: Option<Cents>,
        purchaser_id: Option<DbId>,
        notify: bool,
    ) -> ManagerResult<TutoringPackagePurchase> {
        let student = StudentRepo::find_by_id(&self.pool, student_id)
            .await?
            .ok_or_else(|| ManagerError::not_found("Student", student_id))?;
        let package = TutoringPackageRepo::find_by_id(&self.pool, package_id)
            .await?
            .ok_or_else(|| ManagerError::not_found("TutoringPackage", package_id))?;

        let purchase = TutoringPackageRepo::create_purchase(
            &self.pool,
            student_id,
            package_id,
            purchaser_id,
            paid_cents.unwrap_or(package.price_cents),
        )
        .await?;

        let enrolled =
            TutoringSessionRepo::enroll_in_package_group_sessions(&self.pool, student_id, package_id)
                .await?;
        tracing::info!(
            purchase_id = purchase.id,
            student_id,
            package_id,
            enrolled = enrolled.len(),
            "Tutoring package purchased"
        );

        if notify {
            self.notifier
                .create(
                    NewNotification::new(types::PACKAGE_PURCHASE_CONFIRMATION)
                        .to_user(student.user_id)
                        .actor(purchaser_id)
                        .related("tutoring_package_purchase", purchase.id)
                        .args(json!({ "title": package.title })),
                )
                .await?;
        }

        Ok(purchase)
    }

    /// Reverse a purchase. Once the student holds no other unreversed
    /// purchase of the package, their future group sessions from it are
    /// cancelled.
    pub async fn unpurchase_package(
        &self,
        student_id: DbId,
        purchase_id: DbId,
        reversed_by: Option<DbId>,
    ) -> ManagerResult<TutoringPackagePurchase> {
        let purchase = TutoringPackageRepo::find_purchase(&self.pool, purchase_id)
            .await?
            .ok_or_else(|| ManagerError::not_found("TutoringPackagePurchase", purchase_id))?;
        if purchase.student_id != student_id {
            return Err(ManagerError::validation(
                "Package purchase student does not match student",
            ));
        }
        if purchase.purchase_reversed.is_some() {
            return Err(ManagerError::conflict("Package purchase already reversed"));
        }

        let now = Utc::now();
        let reversed = TutoringPackageRepo::reverse_purchase(&self.pool, purchase_id, reversed_by, now)
            .await?
            .ok_or_else(|| ManagerError::not_found("TutoringPackagePurchase", purchase_id))?;

        let package_id = reversed.tutoring_package_id;
        if !TutoringPackageRepo::has_active_purchase(&self.pool, student_id, package_id).await? {
            let cancelled = TutoringSessionRepo::cancel_future_package_sessions(
                &self.pool, student_id, package_id, now,
            )
            .await?;
            tracing::info!(purchase_id, student_id, cancelled, "Cancelled package group sessions");
        }

        Ok(reversed)
    }
}
