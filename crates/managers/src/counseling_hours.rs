//! Counseling hour bank: grants in, counselor time entries out.

use chrono::Datelike;
use schoolnet_core::hours::{
    counseling_balance, current_grade, current_semester, BankRow, CounselingBalance,
};
use schoolnet_core::types::{Cents, DbId, Minutes, Timestamp};
use schoolnet_db::models::counseling::{
    CounselingHoursGrant, CounselingPackage, CreateCounselingHoursGrant,
};
use schoolnet_db::repositories::{CounselingHoursRepo, CounselorTimeEntryRepo, StudentRepo};
use schoolnet_db::DbPool;
use serde::Serialize;

use crate::error::{ManagerError, ManagerResult};

/// Hours bank with what the student has paid so far.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct CounselingHoursSummary {
    #[serde(flatten)]
    pub balance: CounselingBalance,
    pub total_paid_cents: Cents,
}

pub struct CounselingHoursManager {
    pool: DbPool,
}

impl CounselingHoursManager {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn summary(&self, student_id: DbId) -> ManagerResult<CounselingHoursSummary> {
        let grants: Vec<BankRow> = CounselingHoursRepo::list_grants(&self.pool, student_id)
            .await?
            .iter()
            .map(|g| BankRow {
                minutes: g.minutes,
                include_in_hours_bank: g.include_in_hours_bank,
            })
            .collect();
        let entries: Vec<BankRow> = CounselorTimeEntryRepo::list_for_student(&self.pool, student_id)
            .await?
            .iter()
            .map(|e| BankRow {
                minutes: e.minutes,
                include_in_hours_bank: e.include_in_hours_bank,
            })
            .collect();

        Ok(CounselingHoursSummary {
            balance: counseling_balance(&grants, &entries),
            total_paid_cents: CounselingHoursRepo::total_paid(&self.pool, student_id).await?,
        })
    }

    /// Grant hours to a student.
    pub async fn add_hours(
        &self,
        student_id: DbId,
        minutes: Minutes,
        amount_paid_cents: Option<Cents>,
        note: Option<String>,
        package_id: Option<DbId>,
        created_by_id: Option<DbId>,
    ) -> ManagerResult<CounselingHoursGrant> {
        if minutes <= 0 {
            return Err(ManagerError::validation("Granted minutes must be positive"));
        }
        StudentRepo::find_by_id(&self.pool, student_id)
            .await?
            .ok_or_else(|| ManagerError::not_found("Student", student_id))?;

        let grant = CounselingHoursRepo::create_grant(
            &self.pool,
            &CreateCounselingHoursGrant {
                student_id,
                counseling_package_id: package_id,
                created_by_id,
                minutes,
                amount_paid_cents,
                note,
            },
        )
        .await?;
        tracing::info!(grant_id = grant.id, student_id, minutes, "Counseling hours granted");
        Ok(grant)
    }

    /// The package named `package_name` that applies to the student today.
    /// A package with no grade or semester applies to everyone and wins.
    pub async fn counseling_package_for(
        &self,
        student_id: DbId,
        package_name: &str,
        now: Timestamp,
    ) -> ManagerResult<Option<CounselingPackage>> {
        let student = StudentRepo::find_by_id(&self.pool, student_id)
            .await?
            .ok_or_else(|| ManagerError::not_found("Student", student_id))?;
        let packages = CounselingHoursRepo::packages_named(&self.pool, package_name).await?;

        if let Some(any) = packages
            .iter()
            .find(|p| p.grade.is_none() && p.semester.is_none())
        {
            return Ok(Some(any.clone()));
        }

        let Some(graduation_year) = student.graduation_year else {
            return Ok(None);
        };
        let grade = current_grade(graduation_year, now);
        let semester = current_semester(now.month());
        Ok(packages
            .into_iter()
            .find(|p| p.grade == Some(grade) && p.semester == Some(semester)))
    }
}
