//! Kárdex Ingestion Library
//!
//! This library ingests parsed student transcripts (kárdex) into a relational
//! academic graph and serves the read models built on top of it: the
//! degree-plan progress map, the student summary and academic history.
//!
//! # Modules
//!
//! - `api`: API definitions.
//! - `core`: Core business logic.
//! - `data`: Data access layer.
//! - `audit`: Ingestion audit trail and payload fingerprints.
//! - `classifier`: Transcript-line status classification.
//! - `config`: Configuration management.
//! - `db`: Database connection and pool management.
//! - `db_storage`: Upsert-by-natural-key storage operations.
//! - `degree_map`: Degree-plan progress map.
//! - `errors`: Error handling types.
//! - `handlers`: HTTP request handlers.
//! - `ingestion`: Transactional transcript ingestion.
//! - `models`: Payload, row and response models.
//! - `normalizer`: Course code, term code and name normalization.
//! - `plan_registry`: Static plan definitions.
//! - `reconciler`: Approved-credit and average reconciliation.
//! - `summary`: Student summary and history.

pub mod api;
pub mod core;
pub mod data;

// Re-export primary modules for shared use in tests and other binaries
pub mod audit;
pub mod classifier;
pub mod config;
pub mod db;
pub mod db_storage;
pub mod degree_map;
pub mod errors;
pub mod handlers;
pub mod ingestion;
pub mod models;
pub mod normalizer;
pub mod plan_registry;
pub mod reconciler;
pub mod summary;
