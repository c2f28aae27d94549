//! Repository for `counseling_packages` and `counseling_hours_grants`.

use sqlx::PgPool;
use schoolnet_core::types::{Cents, DbId, Minutes};

use crate::models::counseling::{
    CounselingHoursGrant, CounselingPackage, CreateCounselingHoursGrant,
};

const PACKAGE_COLUMNS: &str = "id, package_name, minutes, grade, semester, created_at";

const GRANT_COLUMNS: &str = "id, student_id, counseling_package_id, created_by_id, minutes, \
                              amount_paid_cents, note, include_in_hours_bank, created_at";

/// Provides access to counseling packages and hours granted to students.
pub struct CounselingHoursRepo;

impl CounselingHoursRepo {
    pub async fn create_package(
        pool: &PgPool,
        package_name: &str,
        minutes: Minutes,
        grade: Option<i32>,
        semester: Option<i32>,
    ) -> Result<CounselingPackage, sqlx::Error> {
        let query = format!(
            "INSERT INTO counseling_packages (package_name, minutes, grade, semester)
             VALUES ($1, $2, $3, $4)
             RETURNING {PACKAGE_COLUMNS}"
        );
        sqlx::query_as::<_, CounselingPackage>(&query)
            .bind(package_name)
            .bind(minutes)
            .bind(grade)
            .bind(semester)
            .fetch_one(pool)
            .await
    }

    /// Packages with the given name, grade/semester independent ones first.
    pub async fn packages_named(
        pool: &PgPool,
        package_name: &str,
    ) -> Result<Vec<CounselingPackage>, sqlx::Error> {
        let query = format!(
            "SELECT {PACKAGE_COLUMNS} FROM counseling_packages
             WHERE package_name = $1
             ORDER BY (grade IS NULL AND semester IS NULL) DESC, id"
        );
        sqlx::query_as::<_, CounselingPackage>(&query)
            .bind(package_name)
            .fetch_all(pool)
            .await
    }

    pub async fn create_grant(
        pool: &PgPool,
        input: &CreateCounselingHoursGrant,
    ) -> Result<CounselingHoursGrant, sqlx::Error> {
        let query = format!(
            "INSERT INTO counseling_hours_grants
                (student_id, counseling_package_id, created_by_id, minutes, amount_paid_cents, note)
             VALUES ($1, $2, $3, $4, $5, COALESCE($6, ''))
             RETURNING {GRANT_COLUMNS}"
        );
        sqlx::query_as::<_, CounselingHoursGrant>(&query)
            .bind(input.student_id)
            .bind(input.counseling_package_id)
            .bind(input.created_by_id)
            .bind(input.minutes)
            .bind(input.amount_paid_cents)
            .bind(&input.note)
            .fetch_one(pool)
            .await
    }

    pub async fn list_grants(
        pool: &PgPool,
        student_id: DbId,
    ) -> Result<Vec<CounselingHoursGrant>, sqlx::Error> {
        let query = format!(
            "SELECT {GRANT_COLUMNS} FROM counseling_hours_grants WHERE student_id = $1
             ORDER BY created_at, id"
        );
        sqlx::query_as::<_, CounselingHoursGrant>(&query)
            .bind(student_id)
            .fetch_all(pool)
            .await
    }

    /// Total amount a student has paid for counseling hours.
    pub async fn total_paid(pool: &PgPool, student_id: DbId) -> Result<Cents, sqlx::Error> {
        let total: Option<i64> = sqlx::query_scalar(
            "SELECT SUM(amount_paid_cents)::BIGINT FROM counseling_hours_grants
             WHERE student_id = $1",
        )
        .bind(student_id)
        .fetch_one(pool)
        .await?;
        Ok(total.unwrap_or(0))
    }
}
