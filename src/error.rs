//! Crate error type
//!
//! Expected absence of data (no health attributes, empty visibility polygon)
//! is handled locally with logging and never surfaces here. This enum covers
//! the conditions that callers must react to.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SplatError {
    /// Operation attempted against a scene that is not active
    #[error("scene {0} is not active")]
    InactiveScene(String),

    /// Record update without an id is a programmer error, not a degradable one
    #[error("record update without an id")]
    MissingRecordId,

    /// Host persistence rejected a read or write
    #[error("store operation failed: {0}")]
    Store(String),
}
