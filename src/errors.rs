use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::fmt;

/// Step of the ingestion transaction that produced an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestionPhase {
    Validate,
    Plan,
    Student,
    Term,
    Course,
    TranscriptLine,
    Reconcile,
    Commit,
}

impl IngestionPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            IngestionPhase::Validate => "validate",
            IngestionPhase::Plan => "plan",
            IngestionPhase::Student => "student",
            IngestionPhase::Term => "term",
            IngestionPhase::Course => "course",
            IngestionPhase::TranscriptLine => "transcript_line",
            IngestionPhase::Reconcile => "reconcile",
            IngestionPhase::Commit => "commit",
        }
    }
}

impl fmt::Display for IngestionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Application-specific error types.
#[derive(Debug)]
pub enum AppError {
    /// Database-related errors.
    DatabaseError(sqlx::Error),
    /// Resource not found error.
    NotFound(String),
    /// Bad request error (invalid input).
    BadRequest(String),
    /// Course code with no digits in it.
    InvalidCourseCode(String),
    /// Term code that is neither a 4-digit compact code nor a `YYYY-C` label.
    InvalidTermCode(String),
    /// Transcript references a plan version that was never provisioned.
    UnknownPlan(String),
    /// Plan exists in the store but has no registered static definition.
    UnsupportedPlan(String),
    /// The ingestion transaction was aborted.
    IngestionFailed {
        /// Step that failed.
        phase: IngestionPhase,
        /// The underlying cause.
        source: Box<AppError>,
    },
    /// Internal server error.
    InternalError(String),
    /// Error with context chain for better debugging.
    WithContext {
        /// The underlying source of the error.
        source: Box<AppError>,
        /// Additional context message.
        context: String,
    },
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::DatabaseError(e) => write!(f, "Database error: {}", e),
            AppError::NotFound(msg) => write!(f, "Not found: {}", msg),
            AppError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            AppError::InvalidCourseCode(code) => write!(f, "Invalid course code: {:?}", code),
            AppError::InvalidTermCode(code) => write!(f, "Invalid term code: {:?}", code),
            AppError::UnknownPlan(version) => write!(
                f,
                "Plan {} is not provisioned; register it before ingesting transcripts",
                version
            ),
            AppError::UnsupportedPlan(version) => {
                write!(f, "No plan definition registered for version {}", version)
            }
            AppError::IngestionFailed { phase, source } => {
                write!(f, "Ingestion failed during {}: {}", phase, source)
            }
            AppError::InternalError(msg) => write!(f, "Internal error: {}", msg),
            AppError::WithContext { source, context } => {
                write!(f, "{}: {}", context, source)
            }
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::DatabaseError(e) => Some(e),
            AppError::IngestionFailed { source, .. } | AppError::WithContext { source, .. } => {
                Some(source.as_ref())
            }
            _ => None,
        }
    }
}

impl AppError {
    /// Wraps an error as an aborted ingestion at `phase`.
    ///
    /// Already-wrapped errors keep their original phase.
    pub fn in_phase(self, phase: IngestionPhase) -> Self {
        match self {
            AppError::IngestionFailed { .. } => self,
            other => AppError::IngestionFailed {
                phase,
                source: Box::new(other),
            },
        }
    }

    /// Innermost error, skipping phase and context wrappers.
    pub fn root(&self) -> &AppError {
        match self {
            AppError::IngestionFailed { source, .. } | AppError::WithContext { source, .. } => {
                source.root()
            }
            other => other,
        }
    }

    /// HTTP status and client-facing message for this error.
    fn response_parts(&self) -> (StatusCode, String) {
        match self {
            AppError::DatabaseError(e) => {
                tracing::error!("Database error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Database error".to_string(),
                )
            }
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::InvalidCourseCode(_) | AppError::InvalidTermCode(_) => {
                (StatusCode::BAD_REQUEST, self.to_string())
            }
            AppError::UnknownPlan(_) | AppError::UnsupportedPlan(_) => {
                tracing::warn!("{}", self);
                (StatusCode::UNPROCESSABLE_ENTITY, self.to_string())
            }
            AppError::IngestionFailed { phase, source } => {
                tracing::error!("Ingestion aborted during {}: {}", phase, source);
                let (status, message) = source.response_parts();
                if status.is_server_error() {
                    (status, "Ingestion failed".to_string())
                } else {
                    (status, format!("Ingestion failed during {}: {}", phase, message))
                }
            }
            AppError::InternalError(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
            AppError::WithContext { source, context } => {
                tracing::error!("Error with context: {} -> {}", context, source);
                source.response_parts()
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = self.response_parts();

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::DatabaseError(err)
    }
}

/// Extension trait for adding context to errors.
/// Similar to `anyhow::Context` but for our `AppError` type.
pub trait ResultExt<T> {
    /// Add context to an error.
    fn context(self, context: impl Into<String>) -> Result<T, AppError>;

    /// Add context lazily (only evaluated on error).
    fn with_context<F>(self, f: F) -> Result<T, AppError>
    where
        F: FnOnce() -> String;
}

impl<T> ResultExt<T> for Result<T, AppError> {
    fn context(self, context: impl Into<String>) -> Result<T, AppError> {
        self.map_err(|e| AppError::WithContext {
            source: Box::new(e),
            context: context.into(),
        })
    }

    fn with_context<F>(self, f: F) -> Result<T, AppError>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| AppError::WithContext {
            source: Box::new(e),
            context: f(),
        })
    }
}

/// Extension for sqlx::Error to add context
impl<T> ResultExt<T> for Result<T, sqlx::Error> {
    fn context(self, context: impl Into<String>) -> Result<T, AppError> {
        self.map_err(|e| AppError::WithContext {
            source: Box::new(AppError::DatabaseError(e)),
            context: context.into(),
        })
    }

    fn with_context<F>(self, f: F) -> Result<T, AppError>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| AppError::WithContext {
            source: Box::new(AppError::DatabaseError(e)),
            context: f(),
        })
    }
}
