use std::io::Write;
use std::path::PathBuf;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use super::QuotaError;

/// Persisted usage counters for the cloud OCR engine.
///
/// One record per deployment. Dates are stored as `YYYY-MM-DD` and months as
/// `YYYY-MM` so the record stays readable when inspected by hand.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuotaState {
    pub daily_count: u32,
    pub daily_date: String,
    pub monthly_count: u32,
    pub monthly_month: String,
}

/// Durable storage for [`QuotaState`] (allows mocking for tests).
pub trait QuotaStore: Send + Sync {
    /// Load the current record. A store that was never written returns the default state.
    fn load(&self) -> Result<QuotaState, QuotaError>;

    fn save(&self, state: &QuotaState) -> Result<(), QuotaError>;
}

/// Quota record kept in a single JSON file.
///
/// Writes go through a temp file in the same directory followed by a rename,
/// so a crash mid-write never leaves a truncated record behind.
pub struct JsonFileQuotaStore {
    path: PathBuf,
}

impl JsonFileQuotaStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl QuotaStore for JsonFileQuotaStore {
    fn load(&self) -> Result<QuotaState, QuotaError> {
        match std::fs::read_to_string(&self.path) {
            Ok(content) if content.trim().is_empty() => Ok(QuotaState::default()),
            Ok(content) => Ok(serde_json::from_str(&content)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(QuotaState::default()),
            Err(e) => Err(e.into()),
        }
    }

    fn save(&self, state: &QuotaState) -> Result<(), QuotaError> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&dir)?;

        let json = serde_json::to_string_pretty(state)?;
        let mut tmp = tempfile::NamedTempFile::new_in(&dir)?;
        tmp.write_all(json.as_bytes())?;
        tmp.flush()?;
        tmp.persist(&self.path).map_err(|e| QuotaError::Io(e.error))?;

        tracing::debug!(
            path = %self.path.display(),
            daily = state.daily_count,
            monthly = state.monthly_count,
            "Quota record persisted"
        );
        Ok(())
    }
}

/// In-memory store for tests and one-shot CLI runs without a quota file.
#[derive(Default)]
pub struct InMemoryQuotaStore {
    state: Mutex<QuotaState>,
}

impl InMemoryQuotaStore {
    pub fn new(state: QuotaState) -> Self {
        Self {
            state: Mutex::new(state),
        }
    }

    pub fn snapshot(&self) -> QuotaState {
        self.state
            .lock()
            .map(|s| s.clone())
            .unwrap_or_default()
    }
}

impl QuotaStore for InMemoryQuotaStore {
    fn load(&self) -> Result<QuotaState, QuotaError> {
        self.state
            .lock()
            .map(|s| s.clone())
            .map_err(|_| QuotaError::LockPoisoned)
    }

    fn save(&self, state: &QuotaState) -> Result<(), QuotaError> {
        let mut guard = self.state.lock().map_err(|_| QuotaError::LockPoisoned)?;
        *guard = state.clone();
        Ok(())
    }
}
