//! Cloud OCR usage gate.
//!
//! The paid OCR engine is budgeted per calendar day and per calendar month.
//! [`QuotaTracker`] reads the counters before every gate check and persists
//! them after every usage increment through an injected [`QuotaStore`].

pub mod store;
pub mod tracker;

pub use store::*;
pub use tracker::*;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum QuotaError {
    #[error("I/O error on quota store: {0}")]
    Io(#[from] std::io::Error),

    #[error("Quota record is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Quota store lock poisoned")]
    LockPoisoned,
}
