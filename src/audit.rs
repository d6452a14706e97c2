use crate::errors::AppError;
use crate::models::{IngestionAuditRow, IngestionRecord, IngestionState, KardexPayload};
use sha2::{Digest, Sha256};
use sqlx::PgPool;

pub const STAGE_INGEST: &str = "INGEST";
pub const STATUS_OK: &str = "OK";
pub const STATUS_ERROR: &str = "ERROR";

const MAX_DETAIL_CHARS: usize = 800;
const RECENT_LIMIT: i64 = 50;

/// SHA-256 (hex) of the payload's canonical JSON form.
pub fn payload_fingerprint(payload: &KardexPayload) -> String {
    let mut hasher = Sha256::new();
    hasher.update(serde_json::to_vec(payload).unwrap_or_default());
    hex::encode(hasher.finalize())
}

fn truncate_detail(detail: &str) -> String {
    detail.chars().take(MAX_DETAIL_CHARS).collect()
}

/// True when the same payload was already ingested successfully.
pub async fn was_ingested(pool: &PgPool, fingerprint: &str) -> Result<bool, AppError> {
    let seen: Option<(i32,)> = sqlx::query_as(
        "SELECT 1 FROM ingestion_audit WHERE payload_sha256 = $1 AND status = 'OK' LIMIT 1",
    )
    .bind(fingerprint)
    .fetch_optional(pool)
    .await?;
    Ok(seen.is_some())
}

/// Records one ingestion attempt. Runs outside the ingestion transaction.
pub async fn record_attempt(
    pool: &PgPool,
    folio: &str,
    fingerprint: &str,
    status: &str,
    detail: &str,
) -> Result<(), AppError> {
    sqlx::query(
        r#"
        INSERT INTO ingestion_audit (folio, payload_sha256, stage, status, detail)
        VALUES ($1, $2, $3, $4, $5)
        "#,
    )
    .bind(folio)
    .bind(fingerprint)
    .bind(STAGE_INGEST)
    .bind(status)
    .bind(truncate_detail(detail))
    .execute(pool)
    .await?;
    Ok(())
}

pub fn ingestion_state(status: &str) -> IngestionState {
    match status.to_uppercase().as_str() {
        STATUS_OK => IngestionState::Valid,
        STATUS_ERROR => IngestionState::Rejected,
        _ => IngestionState::Processing,
    }
}

/// Latest ingestion attempts for a folio, newest first.
pub async fn recent_ingestions(
    pool: &PgPool,
    folio: &str,
) -> Result<Vec<IngestionRecord>, AppError> {
    let rows = sqlx::query_as::<_, IngestionAuditRow>(
        r#"
        SELECT id, folio, payload_sha256, stage, status, detail, created_at
        FROM ingestion_audit
        WHERE folio = $1 AND stage = $2
        ORDER BY created_at DESC
        LIMIT $3
        "#,
    )
    .bind(folio.trim())
    .bind(STAGE_INGEST)
    .bind(RECENT_LIMIT)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|row| IngestionRecord {
            id: row.id,
            uploaded_at: row.created_at,
            status: ingestion_state(&row.status),
            fingerprint: row.payload_sha256,
        })
        .collect())
}
