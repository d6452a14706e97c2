//! Transcript ingestion.
//!
//! One parsed kárdex is applied in a single serializable transaction:
//! 1. Resolve the plan (must already be provisioned)
//! 2. Resolve or create the student, refresh plan and status
//! 3. Store the language-proficiency level when present
//! 4. For every line: term, course, classification, transcript-line upsert
//! 5. Reconcile approved credits and averages, then commit
//!
//! Any failure rolls the whole transaction back.
use crate::classifier::classify;
use crate::db_storage::{
    self, upsert_by_key, CourseDraft, LineDraft, LineKey, StudentDraft, TermDraft,
};
use crate::errors::{AppError, IngestionPhase, ResultExt};
use crate::models::{
    Course, IngestionOutcome, KardexPayload, PayloadLine, Plan, Student, Term, TranscriptLine,
};
use crate::normalizer::{normalize_course_code, term_for_line};
use crate::reconciler;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

/// Settings that are not part of the payload.
#[derive(Debug, Clone)]
pub struct IngestionOptions {
    /// Domain of the placeholder address given to new students.
    pub student_email_domain: String,
}

impl Default for IngestionOptions {
    fn default() -> Self {
        Self {
            student_email_domain: "unison.mx".to_string(),
        }
    }
}

/// Checks that can run before touching the store.
pub fn validate_payload(payload: &KardexPayload) -> Result<(), AppError> {
    if !payload.ok {
        return Err(AppError::BadRequest(
            "Transcript payload was rejected by the parser (ok=false)".to_string(),
        ));
    }
    if payload.alumno.expediente.trim().is_empty() {
        return Err(AppError::BadRequest("Missing student folio".to_string()));
    }
    if payload.alumno.plan.trim().is_empty() {
        return Err(AppError::BadRequest("Missing plan version".to_string()));
    }

    // Malformed codes are rejected before any write.
    for line in &payload.materias {
        normalize_course_code(&line.codigo)?;
        term_for_line(line)?;
        if line.cr.is_some_and(|credits| credits < 0) {
            return Err(AppError::BadRequest(format!(
                "Negative credits for course {}",
                line.codigo.trim()
            )));
        }
    }
    Ok(())
}

/// Applies a parsed transcript atomically and returns the committed totals.
pub async fn ingest_transcript(
    pool: &PgPool,
    payload: &KardexPayload,
    options: &IngestionOptions,
) -> Result<IngestionOutcome, AppError> {
    validate_payload(payload).map_err(|e| e.in_phase(IngestionPhase::Validate))?;

    let mut tx = pool
        .begin()
        .await
        .map_err(|e| AppError::from(e).in_phase(IngestionPhase::Commit))?;
    sqlx::query("SET TRANSACTION ISOLATION LEVEL SERIALIZABLE")
        .execute(&mut *tx)
        .await
        .map_err(|e| AppError::from(e).in_phase(IngestionPhase::Commit))?;

    // Dropping `tx` on error rolls everything back.
    let outcome = apply_transcript(&mut tx, payload, options).await?;

    tx.commit()
        .await
        .map_err(|e| AppError::from(e).in_phase(IngestionPhase::Commit))?;

    tracing::info!(
        "Ingested transcript for {}: {} lines, {} approved credits",
        payload.alumno.expediente.trim(),
        outcome.lines_processed,
        outcome.total_approved_credits
    );

    Ok(outcome)
}

async fn apply_transcript(
    conn: &mut PgConnection,
    payload: &KardexPayload,
    options: &IngestionOptions,
) -> Result<IngestionOutcome, AppError> {
    let header = &payload.alumno;
    let folio = header.expediente.trim();

    let plan: Plan = upsert_by_key(&mut *conn, header.plan.trim(), header.programa.trim())
        .await
        .map_err(|e| e.in_phase(IngestionPhase::Plan))?;

    let student_draft = StudentDraft {
        full_name: header.alumno.clone(),
        plan_id: plan.id,
        status_code: header.estatus.clone(),
        email_domain: options.student_email_domain.clone(),
    };
    let student: Student = upsert_by_key(&mut *conn, folio, &student_draft)
        .await
        .map_err(|e| e.in_phase(IngestionPhase::Student))?;

    if let Some(level) = header.ingles.as_ref().and_then(|i| i.nivel) {
        db_storage::set_english_level(&mut *conn, student.id, level)
            .await
            .map_err(|e| e.in_phase(IngestionPhase::Student))?;
    }

    for line in &payload.materias {
        apply_line(&mut *conn, student.id, plan.id, line).await?;
    }

    let totals = reconciler::reconcile_student(&mut *conn, student.id, payload.resumen.as_ref())
        .await
        .map_err(|e| e.in_phase(IngestionPhase::Reconcile))?;

    Ok(IngestionOutcome {
        ok: true,
        student_id: student.id,
        plan_id: plan.id,
        lines_processed: payload.materias.len(),
        total_approved_credits: totals.total_credits,
    })
}

async fn apply_line(
    conn: &mut PgConnection,
    student_id: Uuid,
    plan_id: Uuid,
    line: &PayloadLine,
) -> Result<TranscriptLine, AppError> {
    let term_code = term_for_line(line).map_err(|e| e.in_phase(IngestionPhase::Term))?;
    let term: Term = upsert_by_key(
        &mut *conn,
        term_code.label.as_str(),
        &TermDraft {
            year: term_code.year,
            cycle: term_code.cycle,
        },
    )
    .await
    .map_err(|e| e.in_phase(IngestionPhase::Term))?;

    let code = normalize_course_code(&line.codigo).map_err(|e| e.in_phase(IngestionPhase::Course))?;
    let course: Course = upsert_by_key(
        &mut *conn,
        code.as_str(),
        &CourseDraft {
            name: line.nombre.clone(),
            credits: line.cr,
            plan_id,
        },
    )
    .await
    .with_context(|| format!("course {} ({})", code, line.nombre.trim()))
    .map_err(|e| e.in_phase(IngestionPhase::Course))?;

    let classification = classify(line);
    tracing::debug!(
        "{} {} -> {} (grade {:?})",
        code,
        term.label,
        classification.status,
        classification.grade
    );

    let section_flag = line
        .e2
        .as_deref()
        .map(|flag| flag.trim().to_uppercase())
        .filter(|flag| !flag.is_empty());

    upsert_by_key::<TranscriptLine>(
        conn,
        &LineKey {
            student_id,
            course_id: course.id,
            term_id: term.id,
        },
        &LineDraft {
            grade: classification.grade,
            status: classification.status.as_str().to_string(),
            section_flag,
        },
    )
    .await
    .with_context(|| format!("line {} in {}", code, term.label))
    .map_err(|e| e.in_phase(IngestionPhase::TranscriptLine))
}
