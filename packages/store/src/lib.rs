#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Append-only JSON Lines storage for enriched samples.
//!
//! One UTF-8 JSON object per newline-terminated line, in append order.
//! Records are never rewritten or deduplicated here; readers must tolerate
//! repeats. A malformed line is logged and skipped on read so one corrupt
//! record cannot take the whole history down with it.

use std::fs::OpenOptions;
use std::io::Write as _;
use std::path::{Path, PathBuf};

use thiserror::Error;
use traffic_map_sample_models::EnrichedSample;

/// Default location of the sample history file.
pub const DEFAULT_STORE_PATH: &str = "data/samples.jsonl";

/// Errors from sample persistence operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// An I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Handle to the JSON Lines sample file.
///
/// Holds no open file descriptor; every operation opens, works, and closes,
/// so the poller and server can share one path without coordination beyond
/// the append-only discipline.
#[derive(Debug, Clone)]
pub struct SampleStore {
    path: PathBuf,
}

impl SampleStore {
    /// Creates a store handle for the given file path.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the underlying file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends one record to the history.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the record fails to serialize or the file
    /// cannot be written.
    pub fn append(&self, sample: &EnrichedSample) -> Result<(), StoreError> {
        self.append_all(std::slice::from_ref(sample)).map(|_| ())
    }

    /// Appends a batch of records in order and returns how many were
    /// written.
    ///
    /// The whole batch is serialized before the file is opened, so a bad
    /// record leaves the file untouched, and written with a single call so
    /// one poll cycle's lines stay contiguous.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if any record fails to serialize or the file
    /// cannot be written.
    pub fn append_all(&self, samples: &[EnrichedSample]) -> Result<usize, StoreError> {
        if samples.is_empty() {
            return Ok(0);
        }

        let mut lines = String::new();
        for sample in samples {
            lines.push_str(&sample.to_json_line()?);
            lines.push('\n');
        }

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(lines.as_bytes())?;

        Ok(samples.len())
    }

    /// Reads the full history in append order.
    ///
    /// A missing file is an empty history, not an error. Malformed or blank
    /// lines are skipped with a warning.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the file exists but cannot be read.
    pub fn read_all(&self) -> Result<Vec<EnrichedSample>, StoreError> {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut samples = Vec::new();
        for (index, line) in contents.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            match serde_json::from_str::<EnrichedSample>(line) {
                Ok(sample) => samples.push(sample),
                Err(e) => {
                    log::warn!(
                        "Skipping malformed record at {}:{}: {e}",
                        self.path.display(),
                        index + 1
                    );
                }
            }
        }

        Ok(samples)
    }

    /// Replaces the whole history with `samples`, atomically.
    ///
    /// Writes a sibling temp file and renames it over the original, so a
    /// concurrent reader sees either the old history or the new one, never
    /// a half-written file. Normal operation only appends; this exists for
    /// re-enrichment, which recomputes every record's metrics.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if any record fails to serialize or the file
    /// cannot be written or renamed.
    pub fn rewrite_atomic(&self, samples: &[EnrichedSample]) -> Result<usize, StoreError> {
        let mut lines = String::new();
        for sample in samples {
            lines.push_str(&sample.to_json_line()?);
            lines.push('\n');
        }

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let tmp = self.path.with_extension("jsonl.tmp");
        std::fs::write(&tmp, lines)?;
        std::fs::rename(&tmp, &self.path)?;

        Ok(samples.len())
    }
}
