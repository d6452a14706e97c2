use bigdecimal::BigDecimal;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use std::collections::BTreeMap;
use uuid::Uuid;

// ============ Parser Payload ============

/// Structured transcript produced by the external PDF parser.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KardexPayload {
    /// `false` when the parser could not recognise the document.
    pub ok: bool,
    pub alumno: PayloadStudent,
    #[serde(default)]
    pub materias: Vec<PayloadLine>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resumen: Option<PayloadSummary>,
}

/// Student header block of the transcript.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PayloadStudent {
    /// Institutional folio.
    pub expediente: String,
    /// Full display name, "GIVEN NAMES PATERNAL MATERNAL".
    pub alumno: String,
    /// Plan version code, e.g. "2182".
    pub plan: String,
    /// Program name as printed on the transcript.
    #[serde(default)]
    pub programa: String,
    /// Single-letter academic status code ("A" = active).
    #[serde(default)]
    pub estatus: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ingles: Option<PayloadEnglish>,
}

/// Language-proficiency block. Only `nivel` is consumed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PayloadEnglish {
    /// The parser emits a float, e.g. `5.0`.
    #[serde(default)]
    pub nivel: Option<f64>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// One transcript line as printed on the kárdex.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PayloadLine {
    pub codigo: String,
    #[serde(default)]
    pub nombre: String,
    /// Credit weight.
    #[serde(default)]
    pub cr: Option<i32>,
    /// Primary free-text flag.
    #[serde(default)]
    pub e1: Option<String>,
    /// Secondary flag: section marker, "BV", "A", "ACRED"...
    #[serde(default)]
    pub e2: Option<String>,
    /// Ordinary exam grade.
    #[serde(default)]
    pub ord: Option<f64>,
    /// Extraordinary exam grade.
    #[serde(default)]
    pub reg: Option<f64>,
    /// Compact 4-digit term code.
    #[serde(default)]
    pub cic: String,
    /// Explicit "YYYY-C" term label; wins over `cic`.
    #[serde(default)]
    pub periodo: Option<String>,
    /// Withdrawal counter.
    #[serde(default)]
    pub bajas: Option<i32>,
}

/// Summary block with averages and credit figures.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PayloadSummary {
    /// Keyed by "kardex"/"KARDEX" (general) or by "YYYY-C" period labels.
    #[serde(default)]
    pub promedios: BTreeMap<String, Value>,
    /// Keyed by "APR"/"apr" (approved credits), among others.
    #[serde(default)]
    pub creditos: BTreeMap<String, Value>,
}

// ============ Database Models ============

/// A versioned degree plan. Provisioned out-of-band.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Plan {
    pub id: Uuid,
    pub version: String,
    pub name: String,
    pub total_credits: i32,
    pub suggested_terms: i32,
    /// Credits needed to start social service.
    pub social_service_credits: Option<i32>,
    /// Credits needed to start professional practice.
    pub professional_practice_credits: Option<i32>,
}

/// A student, keyed by institutional folio.
#[derive(Debug, Clone, FromRow)]
pub struct Student {
    pub id: Uuid,
    pub folio: String,
    pub given_name: String,
    pub paternal_surname: String,
    pub maternal_surname: Option<String>,
    pub email: String,
    /// "ACTIVE" or "INACTIVE".
    pub academic_status: String,
    pub plan_id: Uuid,
    pub english_level: Option<f64>,
    pub total_credits: i32,
    pub general_average: Option<BigDecimal>,
    pub period_average: Option<BigDecimal>,
}

impl Student {
    pub fn is_active(&self) -> bool {
        self.academic_status == ACTIVE
    }

    /// Display name with empty parts dropped.
    pub fn full_name(&self) -> String {
        [
            Some(self.given_name.as_str()),
            Some(self.paternal_surname.as_str()),
            self.maternal_surname.as_deref(),
        ]
        .into_iter()
        .flatten()
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
    }
}

pub const ACTIVE: &str = "ACTIVE";
pub const INACTIVE: &str = "INACTIVE";

/// An academic term such as "2024-1".
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Term {
    pub id: Uuid,
    pub label: String,
    pub year: i32,
    pub cycle: i32,
    pub starts_on: NaiveDate,
    pub ends_on: NaiveDate,
}

/// A course, unique by canonical code across all plans.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Course {
    pub id: Uuid,
    pub code: String,
    pub name: String,
    pub credits: i32,
    pub plan_id: Uuid,
}

/// One (student, course, term) academic record.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct TranscriptLine {
    pub id: Uuid,
    pub student_id: Uuid,
    pub course_id: Uuid,
    pub term_id: Uuid,
    pub grade: Option<f64>,
    pub status: String,
    /// Raw secondary flag, upper-cased.
    pub section_flag: Option<String>,
}

/// Row of the ingestion audit trail.
#[derive(Debug, Clone, FromRow)]
pub struct IngestionAuditRow {
    pub id: Uuid,
    pub folio: String,
    pub payload_sha256: String,
    pub stage: String,
    pub status: String,
    pub detail: Option<String>,
    pub created_at: DateTime<Utc>,
}

// ============ API Responses ============

/// Result of a committed ingestion.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestionOutcome {
    pub ok: bool,
    pub student_id: Uuid,
    pub plan_id: Uuid,
    pub lines_processed: usize,
    pub total_approved_credits: i32,
}

/// Coarse per-course status shown on the degree-plan map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MapStatus {
    Approved,
    Withdrawn,
    InProgress,
    Failed,
    NotTaken,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MapCourse {
    pub code: String,
    pub name: String,
    pub credits: i32,
    pub status: MapStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MapSemester {
    /// 1..N, 0 = free-elective axis.
    pub semester: u32,
    pub courses: Vec<MapCourse>,
}

/// Semester-bucketed progress view of a student's degree plan.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DegreeMap {
    pub plan_name: String,
    pub plan_version: String,
    pub total_suggested_semesters: i32,
    pub semesters: Vec<MapSemester>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentSummary {
    pub name: String,
    pub folio: String,
    pub academic_status: String,
    pub general_average: f64,
    pub previous_average: f64,
    pub current_credits: i32,
    pub total_credits: i32,
    pub progress_percent: f64,
    pub social_service_enabled: bool,
    pub professional_practice_enabled: bool,
    pub english_level: f64,
}

/// Status of a transcript line as shown in the academic history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoryStatus {
    Passed,
    Failed,
    Dropped,
    InProgress,
    NotTaken,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub code: String,
    pub name: String,
    pub group: Option<String>,
    pub term: String,
    pub grade: Option<f64>,
    pub status: HistoryStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IngestionState {
    Valid,
    Rejected,
    Processing,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestionRecord {
    pub id: Uuid,
    pub uploaded_at: DateTime<Utc>,
    pub fingerprint: String,
    pub status: IngestionState,
}

#[derive(Debug, Deserialize)]
pub struct FolioQuery {
    pub expediente: Option<String>,
}
