use crate::audit;
use crate::config::Config;
use crate::degree_map;
use crate::errors::AppError;
use crate::ingestion::{self, IngestionOptions};
use crate::models::*;
use crate::plan_registry::PlanRegistry;
use crate::summary;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use sqlx::PgPool;
use std::sync::Arc;

/// Shared application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub db: PgPool,
    /// Application configuration.
    pub config: Config,
    /// Static plan definitions, keyed by plan version.
    pub plans: Arc<PlanRegistry>,
}

impl AppState {
    fn ingestion_options(&self) -> IngestionOptions {
        IngestionOptions {
            student_email_domain: self.config.student_email_domain.clone(),
        }
    }
}

/// Routes under `/api/v1`. The caller adds `/health` and the middleware stack.
pub fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/v1/kardex", post(ingest_kardex))
        .route("/api/v1/mapa", get(degree_map))
        .route("/api/v1/students/:folio/summary", get(student_summary))
        .route("/api/v1/students/:folio/history", get(student_history))
        .route("/api/v1/students/:folio/ingestions", get(student_ingestions))
}

/// Health check endpoint.
///
/// Returns the service status, version, and health information.
pub async fn health() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "service": "kardex-ingest",
            "version": env!("CARGO_PKG_VERSION")
        })),
    )
}

/// POST /api/v1/kardex
///
/// Ingests one parsed transcript. Payloads with `ok=false` or malformed
/// course/term codes are rejected before the store is touched.
///
/// # Arguments
///
/// * `state` - The application state.
/// * `payload` - The parser output for one transcript.
///
/// # Returns
///
/// * `Result<Json<IngestionOutcome>, AppError>` - The committed totals or the failing phase.
pub async fn ingest_kardex(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<KardexPayload>,
) -> Result<Json<IngestionOutcome>, AppError> {
    ingestion::validate_payload(&payload)?;

    let folio = payload.alumno.expediente.trim().to_string();
    let fingerprint = audit::payload_fingerprint(&payload);
    tracing::info!(
        "POST /kardex - folio {} with {} lines (sha256 {})",
        folio,
        payload.materias.len(),
        &fingerprint[..12]
    );

    match audit::was_ingested(&state.db, &fingerprint).await {
        Ok(true) => tracing::info!("Transcript {} was already ingested; re-applying", &fingerprint[..12]),
        Ok(false) => {}
        Err(e) => tracing::warn!("Could not check ingestion history: {}", e),
    }

    let result =
        ingestion::ingest_transcript(&state.db, &payload, &state.ingestion_options()).await;

    let (status, detail) = match &result {
        Ok(outcome) => (
            audit::STATUS_OK,
            json!({ "studentId": outcome.student_id, "planId": outcome.plan_id }).to_string(),
        ),
        Err(e) => (audit::STATUS_ERROR, e.to_string()),
    };
    if let Err(e) = audit::record_attempt(&state.db, &folio, &fingerprint, status, &detail).await {
        tracing::warn!("Failed to record ingestion audit for {}: {}", folio, e);
    }

    Ok(Json(result?))
}

/// GET /api/v1/mapa?expediente=FOLIO
///
/// Degree-plan progress map of a student.
pub async fn degree_map(
    State(state): State<Arc<AppState>>,
    Query(params): Query<FolioQuery>,
) -> Result<Json<DegreeMap>, AppError> {
    let folio = params
        .expediente
        .as_deref()
        .map(str::trim)
        .filter(|f| !f.is_empty())
        .ok_or_else(|| AppError::BadRequest("Missing 'expediente' parameter".to_string()))?;

    tracing::info!("GET /mapa - folio {}", folio);
    let map = degree_map::degree_map_for_folio(&state.db, &state.plans, folio).await?;
    Ok(Json(map))
}

/// GET /api/v1/students/:folio/summary
pub async fn student_summary(
    State(state): State<Arc<AppState>>,
    Path(folio): Path<String>,
) -> Result<Json<StudentSummary>, AppError> {
    let summary = summary::summary_by_folio(&state.db, &folio).await?;
    Ok(Json(summary))
}

/// GET /api/v1/students/:folio/history
pub async fn student_history(
    State(state): State<Arc<AppState>>,
    Path(folio): Path<String>,
) -> Result<Json<Vec<HistoryEntry>>, AppError> {
    let history = summary::history_by_folio(&state.db, &folio).await?;
    Ok(Json(history))
}

/// GET /api/v1/students/:folio/ingestions
///
/// Latest ingestion attempts for a folio, newest first.
pub async fn student_ingestions(
    State(state): State<Arc<AppState>>,
    Path(folio): Path<String>,
) -> Result<Json<Vec<IngestionRecord>>, AppError> {
    let records = audit::recent_ingestions(&state.db, &folio).await?;
    Ok(Json(records))
}
