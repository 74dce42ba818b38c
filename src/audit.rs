//! Append-only audit ledger for administrative and automated defense actions.
//!
//! Every entry is held in memory (newest first) and mirrored to a
//! line-delimited JSON file that is replayed on startup. The ledger never
//! silently drops an entry: a failed disk write surfaces as an error so that
//! the originating action can refuse to report success.

use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use miette::Diagnostic;
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// One immutable ledger entry. Never mutated or deleted once appended.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    /// Monotonically assigned id; assignment resumes past the replayed
    /// maximum after a restart.
    pub id: u64,
    pub timestamp: DateTime<Utc>,
    /// User, system, or service account, e.g. `security-analyst`.
    pub actor: String,
    /// Upper-case verb, e.g. `QUARANTINE_NODE`.
    pub action: String,
    /// What the action touched, e.g. an IP or a rule id.
    pub resource: String,
    #[serde(default)]
    pub details: FxHashMap<String, Value>,
}

/// Errors raised by ledger operations.
#[derive(Debug, Error, Diagnostic)]
pub enum AuditError {
    /// The entry could not be persisted. The originating action must not be
    /// reported successful.
    #[error("audit ledger I/O failure: {0}")]
    #[diagnostic(
        code(shadowscope::audit::io),
        help("Check that the ledger path is writable; the action was not recorded.")
    )]
    Io(#[from] std::io::Error),
}

/// Tamper-evident, crash-safe audit log.
///
/// A single mutex covers the in-memory list and the file handle; `append` is
/// the only writer and holds the lock through the flushed disk write, so
/// on-disk order always matches assignment order.
#[derive(Debug)]
pub struct AuditLedger {
    path: PathBuf,
    inner: Mutex<LedgerInner>,
}

#[derive(Debug)]
struct LedgerInner {
    /// Newest first, mirroring read patterns of the control plane.
    entries: Vec<AuditEntry>,
    file: File,
    next_id: u64,
}

impl AuditLedger {
    /// Open (or create) the ledger at `path`, creating the parent directory
    /// if missing and replaying any existing entries into memory.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, AuditError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }

        let mut entries = Self::replay(&path)?;
        // Replayed newest-first for get_logs.
        entries.sort_by(|a, b| b.id.cmp(&a.id));
        let next_id = entries.first().map_or(1, |entry| entry.id + 1);

        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self {
            path,
            inner: Mutex::new(LedgerInner {
                entries,
                file,
                next_id,
            }),
        })
    }

    /// Append an entry, flushing it to disk before returning.
    ///
    /// The action verb is normalized to upper case. On I/O failure the entry
    /// is not admitted to memory either, so memory and disk stay consistent.
    pub fn append(
        &self,
        actor: impl Into<String>,
        action: impl Into<String>,
        resource: impl Into<String>,
        details: FxHashMap<String, Value>,
    ) -> Result<AuditEntry, AuditError> {
        let mut inner = self.inner.lock();
        let entry = AuditEntry {
            id: inner.next_id,
            timestamp: Utc::now(),
            actor: actor.into(),
            action: action.into().to_uppercase(),
            resource: resource.into(),
            details,
        };

        let line = serde_json::to_string(&entry).map_err(std::io::Error::other)?;
        if let Err(err) = writeln!(inner.file, "{line}").and_then(|()| inner.file.flush()) {
            tracing::error!(
                target: "shadowscope::audit",
                path = %self.path.display(),
                error = %err,
                "failed to persist audit entry"
            );
            return Err(AuditError::Io(err));
        }

        inner.next_id += 1;
        inner.entries.insert(0, entry.clone());
        Ok(entry)
    }

    /// The newest `limit` entries, newest first.
    pub fn get_logs(&self, limit: usize) -> Vec<AuditEntry> {
        let inner = self.inner.lock();
        inner.entries.iter().take(limit).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().entries.is_empty()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn replay(path: &Path) -> Result<Vec<AuditEntry>, AuditError> {
        if !path.exists() {
            return Ok(Vec::new());
        }
        let reader = BufReader::new(File::open(path)?);
        let mut entries = Vec::new();
        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<AuditEntry>(&line) {
                Ok(entry) => entries.push(entry),
                Err(err) => {
                    tracing::warn!(
                        target: "shadowscope::audit",
                        path = %path.display(),
                        error = %err,
                        "skipping malformed ledger line during replay"
                    );
                }
            }
        }
        Ok(entries)
    }
}
