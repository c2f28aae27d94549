//! Repository for `tutoring_packages` and `tutoring_package_purchases`.

use sqlx::PgPool;
use schoolnet_core::types::{Cents, DbId, Timestamp};

use crate::models::tutoring::{
    CreateTutoringPackage, PurchasedMinutesRow, TutoringPackage, TutoringPackagePurchase,
};

const COLUMNS: &str = "id, title, individual_test_prep_minutes, group_test_prep_minutes, \
                        individual_curriculum_minutes, price_cents, active, created_at, updated_at";

const PURCHASE_COLUMNS: &str = "id, student_id, tutoring_package_id, purchased_by_id, \
                                 price_paid_cents, purchase_reversed, purchase_reversed_by_id, \
                                 created_at";

/// Provides CRUD operations for tutoring packages and their purchases.
pub struct TutoringPackageRepo;

impl TutoringPackageRepo {
    pub async fn create(
        pool: &PgPool,
        input: &CreateTutoringPackage,
    ) -> Result<TutoringPackage, sqlx::Error> {
        let query = format!(
            "INSERT INTO tutoring_packages
                (title, individual_test_prep_minutes, group_test_prep_minutes,
                 individual_curriculum_minutes, price_cents)
             VALUES ($1, COALESCE($2, 0), COALESCE($3, 0), COALESCE($4, 0), COALESCE($5, 0))
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, TutoringPackage>(&query)
            .bind(&input.title)
            .bind(input.individual_test_prep_minutes)
            .bind(input.group_test_prep_minutes)
            .bind(input.individual_curriculum_minutes)
            .bind(input.price_cents)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<TutoringPackage>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM tutoring_packages WHERE id = $1");
        sqlx::query_as::<_, TutoringPackage>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    // -----------------------------------------------------------------------
    // Purchases
    // -----------------------------------------------------------------------

    pub async fn create_purchase(
        pool: &PgPool,
        student_id: DbId,
        tutoring_package_id: DbId,
        purchased_by_id: Option<DbId>,
        price_paid_cents: Cents,
    ) -> Result<TutoringPackagePurchase, sqlx::Error> {
        let query = format!(
            "INSERT INTO tutoring_package_purchases
                (student_id, tutoring_package_id, purchased_by_id, price_paid_cents)
             VALUES ($1, $2, $3, $4)
             RETURNING {PURCHASE_COLUMNS}"
        );
        sqlx::query_as::<_, TutoringPackagePurchase>(&query)
            .bind(student_id)
            .bind(tutoring_package_id)
            .bind(purchased_by_id)
            .bind(price_paid_cents)
            .fetch_one(pool)
            .await
    }

    pub async fn find_purchase(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<TutoringPackagePurchase>, sqlx::Error> {
        let query = format!("SELECT {PURCHASE_COLUMNS} FROM tutoring_package_purchases WHERE id = $1");
        sqlx::query_as::<_, TutoringPackagePurchase>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Mark a purchase reversed. Returns `None` if it was already reversed.
    pub async fn reverse_purchase(
        pool: &PgPool,
        id: DbId,
        reversed_by_id: Option<DbId>,
        at: Timestamp,
    ) -> Result<Option<TutoringPackagePurchase>, sqlx::Error> {
        let query = format!(
            "UPDATE tutoring_package_purchases
             SET purchase_reversed = $3, purchase_reversed_by_id = $2
             WHERE id = $1 AND purchase_reversed IS NULL
             RETURNING {PURCHASE_COLUMNS}"
        );
        sqlx::query_as::<_, TutoringPackagePurchase>(&query)
            .bind(id)
            .bind(reversed_by_id)
            .bind(at)
            .fetch_optional(pool)
            .await
    }

    /// Whether the student still holds an unreversed purchase of the package.
    pub async fn has_active_purchase(
        pool: &PgPool,
        student_id: DbId,
        tutoring_package_id: DbId,
    ) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT EXISTS (
                SELECT 1 FROM tutoring_package_purchases
                WHERE student_id = $1 AND tutoring_package_id = $2 AND purchase_reversed IS NULL
             )",
        )
        .bind(student_id)
        .bind(tutoring_package_id)
        .fetch_one(pool)
        .await
    }

    /// Package minutes summed over the student's unreversed purchases.
    pub async fn purchased_minutes(
        pool: &PgPool,
        student_id: DbId,
    ) -> Result<PurchasedMinutesRow, sqlx::Error> {
        sqlx::query_as::<_, PurchasedMinutesRow>(
            "SELECT
                COALESCE(SUM(p.individual_test_prep_minutes), 0)::BIGINT AS individual_test_prep,
                COALESCE(SUM(p.group_test_prep_minutes), 0)::BIGINT AS group_test_prep,
                COALESCE(SUM(p.individual_curriculum_minutes), 0)::BIGINT AS individual_curriculum
             FROM tutoring_package_purchases tp
             JOIN tutoring_packages p ON p.id = tp.tutoring_package_id
             WHERE tp.student_id = $1 AND tp.purchase_reversed IS NULL",
        )
        .bind(student_id)
        .fetch_one(pool)
        .await
    }

    pub async fn attach_group_session(
        pool: &PgPool,
        tutoring_package_id: DbId,
        group_tutoring_session_id: DbId,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO group_tutoring_session_packages
                (group_tutoring_session_id, tutoring_package_id)
             VALUES ($1, $2)
             ON CONFLICT DO NOTHING",
        )
        .bind(group_tutoring_session_id)
        .bind(tutoring_package_id)
        .execute(pool)
        .await?;
        Ok(())
    }
}
