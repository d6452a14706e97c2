//! Academic graph store: plans, students, terms, courses and transcript lines.
//!
//! Every entity is resolved through [`upsert_by_key`]: look the row up by its
//! natural key, create it when missing, otherwise reconcile the stored row
//! with the incoming draft.

use crate::errors::{AppError, ResultExt};
use crate::models::{Course, Plan, Student, Term, TranscriptLine, ACTIVE, INACTIVE};
use crate::normalizer::{collapse_whitespace, split_full_name};
use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::PgConnection;
use uuid::Uuid;

/// Fraction of the plan's total credits used when a milestone threshold is unset.
pub const DEFAULT_MILESTONE_RATIO: f64 = 0.70;

/// An entity with a natural key that can be found, created and refreshed.
#[async_trait]
pub trait NaturalKeyEntity: Sized + Send {
    type Key: ?Sized + Sync;
    type Draft: ?Sized + Sync;

    async fn find_by_key(conn: &mut PgConnection, key: &Self::Key)
        -> Result<Option<Self>, AppError>;

    async fn create(
        conn: &mut PgConnection,
        key: &Self::Key,
        draft: &Self::Draft,
    ) -> Result<Self, AppError>;

    async fn reconcile(
        self,
        conn: &mut PgConnection,
        draft: &Self::Draft,
    ) -> Result<Self, AppError>;
}

/// Find-or-create by natural key, reconciling existing rows with `draft`.
pub async fn upsert_by_key<E: NaturalKeyEntity>(
    conn: &mut PgConnection,
    key: &E::Key,
    draft: &E::Draft,
) -> Result<E, AppError> {
    match E::find_by_key(&mut *conn, key).await? {
        Some(existing) => existing.reconcile(conn, draft).await,
        None => E::create(conn, key, draft).await,
    }
}

// ============ Plan ============

pub fn default_milestone_credits(total_credits: i32) -> i32 {
    (total_credits as f64 * DEFAULT_MILESTONE_RATIO).ceil() as i32
}

/// Plans are provisioned out-of-band: `create` always fails with `UnknownPlan`.
/// The draft is the program name printed on the transcript.
#[async_trait]
impl NaturalKeyEntity for Plan {
    type Key = str;
    type Draft = str;

    async fn find_by_key(conn: &mut PgConnection, version: &str) -> Result<Option<Self>, AppError> {
        let plan = sqlx::query_as::<_, Plan>(
            r#"
            SELECT id, version, name, total_credits, suggested_terms,
                   social_service_credits, professional_practice_credits
            FROM plans
            WHERE version = $1
            "#,
        )
        .bind(version)
        .fetch_optional(conn)
        .await?;
        Ok(plan)
    }

    async fn create(
        _conn: &mut PgConnection,
        version: &str,
        program: &str,
    ) -> Result<Self, AppError> {
        tracing::warn!("Plan {} ({}) has not been provisioned", version, program);
        Err(AppError::UnknownPlan(version.to_string()))
    }

    async fn reconcile(mut self, conn: &mut PgConnection, _program: &str) -> Result<Self, AppError> {
        let needs_service = self.social_service_credits.is_none();
        let needs_practice = self.professional_practice_credits.is_none();
        if !(needs_service || needs_practice) || self.total_credits <= 0 {
            return Ok(self);
        }

        let threshold = default_milestone_credits(self.total_credits);
        if needs_service {
            self.social_service_credits = Some(threshold);
        }
        if needs_practice {
            self.professional_practice_credits = Some(threshold);
        }

        sqlx::query(
            r#"
            UPDATE plans
            SET social_service_credits = $2,
                professional_practice_credits = $3,
                updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(self.id)
        .bind(self.social_service_credits)
        .bind(self.professional_practice_credits)
        .execute(conn)
        .await?;

        tracing::info!(
            "Defaulted milestone thresholds of plan {} to {} credits",
            self.version,
            threshold
        );
        Ok(self)
    }
}

// ============ Student ============

pub struct StudentDraft {
    pub full_name: String,
    pub plan_id: Uuid,
    /// Single-letter status code from the transcript header.
    pub status_code: String,
    pub email_domain: String,
}

impl StudentDraft {
    fn is_active(&self) -> bool {
        self.status_code.trim().eq_ignore_ascii_case("A")
    }
}

const STUDENT_COLUMNS: &str = "id, folio, given_name, paternal_surname, maternal_surname, email, \
     academic_status, plan_id, english_level, total_credits, general_average, period_average";

#[async_trait]
impl NaturalKeyEntity for Student {
    type Key = str;
    type Draft = StudentDraft;

    async fn find_by_key(conn: &mut PgConnection, folio: &str) -> Result<Option<Self>, AppError> {
        let student = sqlx::query_as::<_, Student>(&format!(
            "SELECT {} FROM students WHERE folio = $1",
            STUDENT_COLUMNS
        ))
        .bind(folio)
        .fetch_optional(conn)
        .await?;
        Ok(student)
    }

    async fn create(
        conn: &mut PgConnection,
        folio: &str,
        draft: &StudentDraft,
    ) -> Result<Self, AppError> {
        let name = split_full_name(&draft.full_name);
        let status = if draft.is_active() { ACTIVE } else { INACTIVE };
        let email = format!("a{}@{}", folio, draft.email_domain);

        let student = sqlx::query_as::<_, Student>(&format!(
            r#"
            INSERT INTO students (folio, given_name, paternal_surname, maternal_surname,
                                  email, academic_status, plan_id, total_credits)
            VALUES ($1, $2, $3, $4, $5, $6, $7, 0)
            RETURNING {}
            "#,
            STUDENT_COLUMNS
        ))
        .bind(folio)
        .bind(&name.given)
        .bind(&name.paternal)
        .bind(Some(name.maternal.as_str()).filter(|m| !m.is_empty()))
        .bind(&email)
        .bind(status)
        .bind(draft.plan_id)
        .fetch_one(conn)
        .await?;

        tracing::info!("Created student {} ({})", folio, status);
        Ok(student)
    }

    /// Refreshes the plan and promotes inactive students; never demotes.
    async fn reconcile(
        mut self,
        conn: &mut PgConnection,
        draft: &StudentDraft,
    ) -> Result<Self, AppError> {
        let promote = !self.is_active() && draft.is_active();
        if promote {
            self.academic_status = ACTIVE.to_string();
            tracing::info!("Promoting student {} to {}", self.folio, ACTIVE);
        }
        self.plan_id = draft.plan_id;

        sqlx::query(
            r#"
            UPDATE students
            SET plan_id = $2, academic_status = $3, updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(self.id)
        .bind(self.plan_id)
        .bind(&self.academic_status)
        .execute(conn)
        .await?;

        Ok(self)
    }
}

pub async fn set_english_level(
    conn: &mut PgConnection,
    student_id: Uuid,
    level: f64,
) -> Result<(), AppError> {
    sqlx::query("UPDATE students SET english_level = $2, updated_at = now() WHERE id = $1")
        .bind(student_id)
        .bind(level)
        .execute(conn)
        .await?;
    Ok(())
}

// ============ Term ============

pub struct TermDraft {
    pub year: i32,
    pub cycle: i32,
}

#[async_trait]
impl NaturalKeyEntity for Term {
    type Key = str;
    type Draft = TermDraft;

    async fn find_by_key(conn: &mut PgConnection, label: &str) -> Result<Option<Self>, AppError> {
        let term = sqlx::query_as::<_, Term>(
            "SELECT id, label, year, cycle, starts_on, ends_on FROM terms WHERE label = $1",
        )
        .bind(label)
        .fetch_optional(conn)
        .await?;
        Ok(term)
    }

    async fn create(
        conn: &mut PgConnection,
        label: &str,
        draft: &TermDraft,
    ) -> Result<Self, AppError> {
        let bounds = NaiveDate::from_ymd_opt(draft.year, 1, 1)
            .zip(NaiveDate::from_ymd_opt(draft.year, 12, 31))
            .ok_or_else(|| AppError::InvalidTermCode(label.to_string()))?;

        let term = sqlx::query_as::<_, Term>(
            r#"
            INSERT INTO terms (label, year, cycle, starts_on, ends_on)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, label, year, cycle, starts_on, ends_on
            "#,
        )
        .bind(label)
        .bind(draft.year)
        .bind(draft.cycle)
        .bind(bounds.0)
        .bind(bounds.1)
        .fetch_one(conn)
        .await?;
        Ok(term)
    }

    async fn reconcile(self, _conn: &mut PgConnection, _draft: &TermDraft) -> Result<Self, AppError> {
        Ok(self)
    }
}

// ============ Course ============

pub struct CourseDraft {
    pub name: String,
    pub credits: Option<i32>,
    pub plan_id: Uuid,
}

#[async_trait]
impl NaturalKeyEntity for Course {
    type Key = str;
    type Draft = CourseDraft;

    async fn find_by_key(conn: &mut PgConnection, code: &str) -> Result<Option<Self>, AppError> {
        let course = sqlx::query_as::<_, Course>(
            "SELECT id, code, name, credits, plan_id FROM courses WHERE code = $1",
        )
        .bind(code)
        .fetch_optional(conn)
        .await?;
        Ok(course)
    }

    async fn create(
        conn: &mut PgConnection,
        code: &str,
        draft: &CourseDraft,
    ) -> Result<Self, AppError> {
        let course = sqlx::query_as::<_, Course>(
            r#"
            INSERT INTO courses (code, name, credits, kind, plan_id)
            VALUES ($1, $2, $3, 'MANDATORY', $4)
            RETURNING id, code, name, credits, plan_id
            "#,
        )
        .bind(code)
        .bind(collapse_whitespace(&draft.name))
        .bind(draft.credits.unwrap_or(0))
        .bind(draft.plan_id)
        .fetch_one(conn)
        .await?;
        Ok(course)
    }

    /// Last sighting wins for name and credits.
    async fn reconcile(
        mut self,
        conn: &mut PgConnection,
        draft: &CourseDraft,
    ) -> Result<Self, AppError> {
        self.name = collapse_whitespace(&draft.name);
        self.credits = draft.credits.unwrap_or(self.credits);

        sqlx::query("UPDATE courses SET name = $2, credits = $3, updated_at = now() WHERE id = $1")
            .bind(self.id)
            .bind(&self.name)
            .bind(self.credits)
            .execute(conn)
            .await?;
        Ok(self)
    }
}

// ============ Transcript line ============

pub struct LineKey {
    pub student_id: Uuid,
    pub course_id: Uuid,
    pub term_id: Uuid,
}

pub struct LineDraft {
    pub grade: Option<f64>,
    pub status: String,
    pub section_flag: Option<String>,
}

const LINE_COLUMNS: &str = "id, student_id, course_id, term_id, grade, status, section_flag";

#[async_trait]
impl NaturalKeyEntity for TranscriptLine {
    type Key = LineKey;
    type Draft = LineDraft;

    async fn find_by_key(conn: &mut PgConnection, key: &LineKey) -> Result<Option<Self>, AppError> {
        let line = sqlx::query_as::<_, TranscriptLine>(&format!(
            "SELECT {} FROM transcript_lines WHERE student_id = $1 AND course_id = $2 AND term_id = $3",
            LINE_COLUMNS
        ))
        .bind(key.student_id)
        .bind(key.course_id)
        .bind(key.term_id)
        .fetch_optional(conn)
        .await?;
        Ok(line)
    }

    async fn create(
        conn: &mut PgConnection,
        key: &LineKey,
        draft: &LineDraft,
    ) -> Result<Self, AppError> {
        let line = sqlx::query_as::<_, TranscriptLine>(&format!(
            r#"
            INSERT INTO transcript_lines (student_id, course_id, term_id, grade, status, section_flag)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {}
            "#,
            LINE_COLUMNS
        ))
        .bind(key.student_id)
        .bind(key.course_id)
        .bind(key.term_id)
        .bind(draft.grade)
        .bind(&draft.status)
        .bind(&draft.section_flag)
        .fetch_one(conn)
        .await?;
        Ok(line)
    }

    async fn reconcile(
        mut self,
        conn: &mut PgConnection,
        draft: &LineDraft,
    ) -> Result<Self, AppError> {
        self.grade = draft.grade;
        self.status = draft.status.clone();
        self.section_flag = draft.section_flag.clone();

        sqlx::query(
            r#"
            UPDATE transcript_lines
            SET grade = $2, status = $3, section_flag = $4, updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(self.id)
        .bind(self.grade)
        .bind(&self.status)
        .bind(&self.section_flag)
        .execute(conn)
        .await?;
        Ok(self)
    }
}

// ============ Read models ============

/// Grade, status and course credits of one stored line.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CreditRow {
    pub grade: Option<f64>,
    pub status: String,
    pub credits: i32,
}

pub async fn credit_rows(
    conn: &mut PgConnection,
    student_id: Uuid,
) -> Result<Vec<CreditRow>, AppError> {
    let rows = sqlx::query_as::<_, CreditRow>(
        r#"
        SELECT l.grade, l.status, c.credits
        FROM transcript_lines l
        JOIN courses c ON c.id = l.course_id
        WHERE l.student_id = $1
        "#,
    )
    .bind(student_id)
    .fetch_all(conn)
    .await
    .with_context(|| format!("loading credit rows of student {}", student_id))?;
    Ok(rows)
}

/// Writes the reconciled totals; `None` averages keep their stored values.
pub async fn update_student_totals(
    conn: &mut PgConnection,
    student_id: Uuid,
    total_credits: i32,
    general_average: Option<bigdecimal::BigDecimal>,
    period_average: Option<bigdecimal::BigDecimal>,
) -> Result<(), AppError> {
    sqlx::query(
        r#"
        UPDATE students
        SET total_credits = $2,
            general_average = COALESCE($3, general_average),
            period_average = COALESCE($4, period_average),
            updated_at = now()
        WHERE id = $1
        "#,
    )
    .bind(student_id)
    .bind(total_credits)
    .bind(general_average)
    .bind(period_average)
    .execute(conn)
    .await
    .with_context(|| format!("updating totals of student {}", student_id))?;
    Ok(())
}

pub async fn plan_by_id(conn: &mut PgConnection, plan_id: Uuid) -> Result<Option<Plan>, AppError> {
    let plan = sqlx::query_as::<_, Plan>(
        r#"
        SELECT id, version, name, total_credits, suggested_terms,
               social_service_credits, professional_practice_credits
        FROM plans
        WHERE id = $1
        "#,
    )
    .bind(plan_id)
    .fetch_optional(conn)
    .await?;
    Ok(plan)
}

/// (course code, raw status) for every stored line of a student.
pub async fn course_statuses(
    conn: &mut PgConnection,
    student_id: Uuid,
) -> Result<Vec<(String, String)>, AppError> {
    let rows = sqlx::query_as::<_, (String, String)>(
        r#"
        SELECT c.code, l.status
        FROM transcript_lines l
        JOIN courses c ON c.id = l.course_id
        WHERE l.student_id = $1
        "#,
    )
    .bind(student_id)
    .fetch_all(conn)
    .await?;
    Ok(rows)
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct HistoryRow {
    pub code: String,
    pub name: String,
    pub section_flag: Option<String>,
    pub term: String,
    pub grade: Option<f64>,
    pub status: String,
}

/// Every line of a student ordered by term year, term cycle, course code.
pub async fn history_rows(
    conn: &mut PgConnection,
    student_id: Uuid,
) -> Result<Vec<HistoryRow>, AppError> {
    let rows = sqlx::query_as::<_, HistoryRow>(
        r#"
        SELECT c.code, c.name, l.section_flag, t.label AS term, l.grade, l.status
        FROM transcript_lines l
        JOIN courses c ON c.id = l.course_id
        JOIN terms t ON t.id = l.term_id
        WHERE l.student_id = $1
        ORDER BY t.year, t.cycle, c.code
        "#,
    )
    .bind(student_id)
    .fetch_all(conn)
    .await
    .context("loading academic history")?;
    Ok(rows)
}

pub async fn student_by_folio(
    conn: &mut PgConnection,
    folio: &str,
) -> Result<Student, AppError> {
    Student::find_by_key(conn, folio.trim())
        .await?
        .ok_or_else(|| AppError::NotFound(format!("No student with folio {}", folio.trim())))
}
