//! Student-facing read models: progress summary and academic history.

use crate::db_storage::{self, HistoryRow};
use crate::degree_map::map_status;
use crate::errors::AppError;
use crate::models::{HistoryEntry, HistoryStatus, MapStatus, Plan, Student, StudentSummary};
use bigdecimal::{BigDecimal, ToPrimitive};
use sqlx::PgPool;

fn decimal_to_f64(value: Option<&BigDecimal>) -> Option<f64> {
    value.and_then(ToPrimitive::to_f64)
}

/// Progress figures for a student on their plan.
pub fn build_summary(student: &Student, plan: Option<&Plan>) -> StudentSummary {
    let plan_total = plan.map(|p| p.total_credits).unwrap_or(0);
    let social_service = plan.and_then(|p| p.social_service_credits).unwrap_or(0);
    let practice = plan
        .and_then(|p| p.professional_practice_credits)
        .unwrap_or(0);

    let general_average = decimal_to_f64(student.general_average.as_ref()).unwrap_or(0.0);
    let previous_average =
        decimal_to_f64(student.period_average.as_ref()).unwrap_or(general_average);

    let current_credits = student.total_credits;
    let total_credits = if plan_total > 0 {
        plan_total
    } else {
        current_credits
    };
    let progress_percent = if total_credits > 0 {
        current_credits as f64 / total_credits as f64 * 100.0
    } else {
        0.0
    };

    StudentSummary {
        name: student.full_name(),
        folio: student.folio.clone(),
        academic_status: student.academic_status.clone(),
        general_average,
        previous_average,
        current_credits,
        total_credits,
        progress_percent,
        social_service_enabled: social_service > 0 && current_credits >= social_service,
        professional_practice_enabled: practice > 0 && current_credits >= practice,
        english_level: student.english_level.unwrap_or(0.0),
    }
}

pub async fn summary_by_folio(pool: &PgPool, folio: &str) -> Result<StudentSummary, AppError> {
    let mut conn = pool.acquire().await?;
    let student = db_storage::student_by_folio(&mut conn, folio).await?;
    let plan = db_storage::plan_by_id(&mut conn, student.plan_id).await?;
    Ok(build_summary(&student, plan.as_ref()))
}

/// Shares the status aliases of the degree map, legacy names included.
pub fn history_status(raw: &str) -> HistoryStatus {
    match map_status(&[raw.to_string()]) {
        MapStatus::Approved => HistoryStatus::Passed,
        MapStatus::Failed => HistoryStatus::Failed,
        MapStatus::Withdrawn => HistoryStatus::Dropped,
        MapStatus::InProgress => HistoryStatus::InProgress,
        MapStatus::NotTaken => HistoryStatus::NotTaken,
    }
}

impl From<HistoryRow> for HistoryEntry {
    fn from(row: HistoryRow) -> Self {
        HistoryEntry {
            status: history_status(&row.status),
            code: row.code,
            name: row.name,
            group: row.section_flag,
            term: row.term,
            grade: row.grade,
        }
    }
}

pub async fn history_by_folio(pool: &PgPool, folio: &str) -> Result<Vec<HistoryEntry>, AppError> {
    let mut conn = pool.acquire().await?;
    let student = db_storage::student_by_folio(&mut conn, folio).await?;
    let rows = db_storage::history_rows(&mut conn, student.id).await?;
    Ok(rows.into_iter().map(HistoryEntry::from).collect())
}
