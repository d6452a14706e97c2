//! Degree-plan progress map.
//!
//! Merges a static plan definition with the statuses recorded for a student
//! and buckets the catalog by suggested semester. Free electives go to
//! semester 0, which is always listed last.

use crate::db_storage;
use crate::errors::AppError;
use crate::models::{DegreeMap, MapCourse, MapSemester, MapStatus, Plan};
use crate::plan_registry::{PlanDefinition, PlanRegistry};
use sqlx::PgPool;
use std::collections::{BTreeMap, HashMap};

/// Semester bucket of the free-elective axis.
pub const ELECTIVE_SEMESTER: u32 = 0;

const IN_PROGRESS: &[&str] = &["ENROLLED", "INSCRITO", "INS"];
const APPROVED: &[&str] = &[
    "PASSED",
    "ACCREDITED",
    "PARTIALLY_ACCREDITED",
    "APROBADA",
    "ACREDITADA",
    "PARCIALMENTE_ACREDITADA",
];
const WITHDRAWN: &[&str] = &["WITHDRAWN", "BAJA_VOLUNTARIA", "BAJA", "BAJA_DEFINITIVA"];
const FAILED: &[&str] = &["FAILED", "NO_ACREDITADA", "REPROBADA", "NO_APROBADA"];

/// Collapses every raw status recorded for one course into a map status.
///
/// Checked in order: in progress, approved, withdrawn, failed.
pub fn map_status(raw_statuses: &[String]) -> MapStatus {
    let upper: Vec<String> = raw_statuses
        .iter()
        .map(|s| s.trim().to_uppercase())
        .collect();
    let any_of = |set: &[&str]| upper.iter().any(|s| set.contains(&s.as_str()));

    if any_of(IN_PROGRESS) {
        MapStatus::InProgress
    } else if any_of(APPROVED) {
        MapStatus::Approved
    } else if any_of(WITHDRAWN) {
        MapStatus::Withdrawn
    } else if any_of(FAILED) {
        MapStatus::Failed
    } else {
        MapStatus::NotTaken
    }
}

fn bucket_order(semester: u32) -> (bool, u32) {
    (semester == ELECTIVE_SEMESTER, semester)
}

/// Builds the map from a definition and `(course code, raw status)` pairs.
pub fn build_degree_map(
    plan: &Plan,
    definition: &PlanDefinition,
    statuses: &[(String, String)],
) -> DegreeMap {
    let mut by_code: HashMap<&str, Vec<String>> = HashMap::new();
    for (code, status) in statuses {
        by_code
            .entry(code.trim())
            .or_default()
            .push(status.clone());
    }

    let mut buckets: BTreeMap<(bool, u32), Vec<MapCourse>> = BTreeMap::new();
    for course in &definition.courses {
        let code = course.code.trim();
        if code.is_empty() {
            continue;
        }

        let semester = if course.is_elective() {
            ELECTIVE_SEMESTER
        } else {
            match definition.suggested_semesters.get(code) {
                Some(semester) => *semester,
                None => continue,
            }
        };

        let status = by_code
            .get(code)
            .map(|raw| map_status(raw))
            .unwrap_or(MapStatus::NotTaken);

        buckets
            .entry(bucket_order(semester))
            .or_default()
            .push(MapCourse {
                code: code.to_string(),
                name: course.name.clone(),
                credits: course.credits,
                status,
            });
    }

    let semesters = buckets
        .into_iter()
        .map(|((_, semester), mut courses)| {
            courses.sort_by(|a, b| a.code.cmp(&b.code));
            MapSemester { semester, courses }
        })
        .collect();

    DegreeMap {
        plan_name: plan.name.clone(),
        plan_version: plan.version.trim().to_string(),
        total_suggested_semesters: plan.suggested_terms,
        semesters,
    }
}

/// Degree map of the student with `folio`.
pub async fn degree_map_for_folio(
    pool: &PgPool,
    registry: &PlanRegistry,
    folio: &str,
) -> Result<DegreeMap, AppError> {
    let mut conn = pool.acquire().await?;

    let student = db_storage::student_by_folio(&mut conn, folio).await?;
    let plan = db_storage::plan_by_id(&mut conn, student.plan_id)
        .await?
        .ok_or_else(|| {
            AppError::InternalError(format!("plan of student {} not found", student.folio))
        })?;

    let definition = registry.get(plan.version.trim())?;
    let statuses = db_storage::course_statuses(&mut conn, student.id).await?;

    tracing::debug!(
        "Building degree map for {} on plan {} ({} recorded lines)",
        student.folio,
        plan.version,
        statuses.len()
    );

    Ok(build_degree_map(&plan, definition, &statuses))
}
