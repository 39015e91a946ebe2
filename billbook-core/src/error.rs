//! Error types for Billbook operations

use crate::EntityType;
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

/// Storage layer errors, including failures of the remote data source.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StorageError {
    #[error("Entity not found: {entity_type:?} with id {id}")]
    NotFound { entity_type: EntityType, id: Uuid },

    #[error("Remote read failed for {operation}: {reason}")]
    RemoteFailed { operation: String, reason: String },

    #[error("Persisted state error at {path}: {reason}")]
    Persistence { path: String, reason: String },

    #[error("Storage lock poisoned")]
    LockPoisoned,
}

/// Cache layer errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CacheError {
    #[error("Loader for {key} timed out after {timeout:?}")]
    LoaderTimeout { key: String, timeout: Duration },

    #[error("Cached value for {key} is not a {expected}")]
    TypeMismatch { key: String, expected: &'static str },

    #[error("Timed out after {waited:?} waiting for loading marker on {key}")]
    LoadingMarkerStuck { key: String, waited: Duration },

    #[error("Loader for {key} did not finish: {reason}")]
    LoaderAborted { key: String, reason: String },
}

/// Validation errors for invoice and payment input.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ValidationError {
    #[error("Required field missing: {field}")]
    RequiredFieldMissing { field: String },

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Unsupported GST rate {rate}%")]
    UnsupportedGstRate { rate: f64 },
}

/// Configuration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required configuration field: {field}")]
    MissingRequired { field: String },

    #[error("Invalid value for {field}: {value} - {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },
}

/// Master error type for all Billbook errors.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum BillbookError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

/// Result type alias for Billbook operations.
pub type BillbookResult<T> = Result<T, BillbookError>;

// =============================================================================
// TESTS
// =============================================================================
