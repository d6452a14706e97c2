//! Static plan definitions (course catalog + suggested-semester table).
//!
//! The registry is built once at startup and looked up by exact plan version.

use crate::errors::AppError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

const BUILTIN_DEFINITIONS: &[(&str, &str)] = &[(
    "isi-2182.json",
    include_str!("../data/plans/isi-2182.json"),
)];

/// Axis code of free-elective courses.
pub const ELECTIVE_AXIS: &str = "E";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogCourse {
    pub code: String,
    pub name: String,
    pub credits: i32,
    /// Curriculum axis; `E` marks free electives.
    #[serde(default)]
    pub axis: Option<String>,
}

impl CatalogCourse {
    pub fn is_elective(&self) -> bool {
        self.axis.as_deref().map(str::trim) == Some(ELECTIVE_AXIS)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanDefinition {
    pub version: String,
    pub name: String,
    pub courses: Vec<CatalogCourse>,
    /// Course code → suggested semester.
    #[serde(default)]
    pub suggested_semesters: HashMap<String, u32>,
}

impl PlanDefinition {
    pub fn from_json(raw: &str) -> Result<Self, AppError> {
        serde_json::from_str(raw)
            .map_err(|e| AppError::InternalError(format!("invalid plan definition: {}", e)))
    }
}

#[derive(Debug, Clone, Default)]
pub struct PlanRegistry {
    definitions: HashMap<String, PlanDefinition>,
}

impl PlanRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the definitions shipped in the binary.
    pub fn builtin() -> Result<Self, AppError> {
        let mut registry = Self::new();
        for (name, raw) in BUILTIN_DEFINITIONS {
            let definition = PlanDefinition::from_json(raw).map_err(|e| {
                AppError::InternalError(format!("built-in plan {}: {}", name, e))
            })?;
            registry.register(definition);
        }
        Ok(registry)
    }

    /// Adds every `*.json` definition found in `dir`.
    pub fn load_dir(&mut self, dir: &Path) -> Result<usize, AppError> {
        let entries = std::fs::read_dir(dir).map_err(|e| {
            AppError::InternalError(format!("cannot read {}: {}", dir.display(), e))
        })?;

        let mut loaded = 0;
        for entry in entries {
            let path = entry
                .map_err(|e| AppError::InternalError(e.to_string()))?
                .path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }
            let raw = std::fs::read_to_string(&path).map_err(|e| {
                AppError::InternalError(format!("cannot read {}: {}", path.display(), e))
            })?;
            let definition = PlanDefinition::from_json(&raw).map_err(|e| {
                AppError::InternalError(format!("{}: {}", path.display(), e))
            })?;
            self.register(definition);
            loaded += 1;
        }
        Ok(loaded)
    }

    /// Registers a definition, replacing any earlier one with the same version.
    pub fn register(&mut self, definition: PlanDefinition) {
        let version = definition.version.trim().to_string();
        tracing::info!(
            "Registered plan definition {} ({} courses)",
            version,
            definition.courses.len()
        );
        if let Some(previous) = self.definitions.insert(version, definition) {
            tracing::warn!("Plan definition {} replaced", previous.version);
        }
    }

    pub fn get(&self, version: &str) -> Result<&PlanDefinition, AppError> {
        self.definitions
            .get(version)
            .ok_or_else(|| AppError::UnsupportedPlan(version.to_string()))
    }

    pub fn versions(&self) -> Vec<&str> {
        let mut versions: Vec<&str> = self.definitions.keys().map(String::as_str).collect();
        versions.sort_unstable();
        versions
    }
}
