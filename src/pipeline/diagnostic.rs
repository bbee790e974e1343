//! Pipeline diagnostic dump: writes intermediate artifacts to disk.
//!
//! Disabled unless `JURITEXT_DUMP_DIR` is set (or a directory is passed to
//! the processor explicitly). Every writer logs and swallows its own
//! failures, so a full disk never breaks a conversion.
//!
//! **Output structure**:
//! ```text
//! {dump_dir}/{run_id}/
//!   00-source.pdf
//!   00-source-info.json
//!   01-extraction-result.json
//!   02-raw-text.txt
//!   03-cleaned-text.txt
//!   04-metadata.json
//!   05-structure.json
//!   06-document.html
//! ```

use std::path::{Path, PathBuf};

use uuid::Uuid;

// ──────────────────────────────────────────────
// Dump directory resolution
// ──────────────────────────────────────────────

/// Environment variable naming the dump root.
pub const DUMP_DIR_ENV: &str = "JURITEXT_DUMP_DIR";

/// Base dump directory from the environment, `None` when dumps are off.
pub fn resolve_base_dir() -> Option<PathBuf> {
    std::env::var_os(DUMP_DIR_ENV)
        .filter(|dir| !dir.is_empty())
        .map(PathBuf::from)
}

/// Per-run directory under `base`, created on demand.
///
/// Returns `None` (with a warning) if the directory cannot be created.
pub fn dump_dir_for(base: &Path, run_id: &Uuid) -> Option<PathBuf> {
    let dir = base.join(run_id.to_string());

    if let Err(e) = std::fs::create_dir_all(&dir) {
        tracing::warn!(
            path = %dir.display(),
            error = %e,
            "Diagnostic dump: failed to create directory"
        );
        return None;
    }

    Some(dir)
}

// ──────────────────────────────────────────────
// Dump writers
// ──────────────────────────────────────────────

/// Write raw bytes. Never panics.
pub fn dump_binary(dir: &Path, filename: &str, data: &[u8]) {
    let path = dir.join(filename);
    match std::fs::write(&path, data) {
        Ok(()) => tracing::debug!(
            path = %path.display(),
            size = data.len(),
            "Diagnostic dump: binary written"
        ),
        Err(e) => tracing::warn!(
            path = %path.display(),
            error = %e,
            "Diagnostic dump: failed to write binary"
        ),
    }
}

/// Write any serializable value as pretty JSON. Never panics.
pub fn dump_json<T: serde::Serialize>(dir: &Path, filename: &str, value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => dump_text(dir, filename, &json),
        Err(e) => tracing::warn!(
            path = %dir.join(filename).display(),
            error = %e,
            "Diagnostic dump: failed to serialize JSON"
        ),
    }
}

/// Write a text artifact. Never panics.
pub fn dump_text(dir: &Path, filename: &str, text: &str) {
    let path = dir.join(filename);
    match std::fs::write(&path, text.as_bytes()) {
        Ok(()) => tracing::debug!(
            path = %path.display(),
            size = text.len(),
            "Diagnostic dump: text written"
        ),
        Err(e) => tracing::warn!(
            path = %path.display(),
            error = %e,
            "Diagnostic dump: failed to write text"
        ),
    }
}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────
