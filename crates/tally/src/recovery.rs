//! Disaster recovery: rebuild the ratings document by replaying the audit
//! log.
//!
//! The log is applied in file order, which is chronological because writes
//! are append-only. Each matching line overwrites the pair it names, so the
//! final value for a (user, talk) pair equals the chronologically-last
//! matching line. Replay is deterministic and idempotent: order is truth.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use shelf::{EntityKind, JsonStore, StoreError};
use thiserror::Error;

use crate::audit::AuditEvent;
use crate::ledger::RatingSet;

/// Errors from a recovery run, distinct from validation errors so callers
/// can tell "nothing to recover" from "bad input".
#[derive(Debug, Error)]
pub enum RecoveryError {
    #[error("log file not found")]
    LogNotFound,

    #[error("failed to read log file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to save recovered ratings: {0}")]
    Store(#[from] StoreError),
}

/// Outcome of a successful recovery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecoveryReport {
    /// Count of recovered (user, talk) entries.
    pub entries: usize,
}

impl RecoveryReport {
    /// Operator-facing success message.
    pub fn message(&self) -> String {
        format!(
            "Ratings successfully recovered from the log file. {} ratings recovered.",
            self.entries
        )
    }
}

/// Fold parsed log lines into a fresh rating set.
///
/// Non-matching lines are skipped silently; each assignment overwrites, so
/// the last matching line for a pair wins.
pub fn replay<I, S>(lines: I) -> RatingSet
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut ratings = RatingSet::new();

    for line in lines {
        match AuditEvent::parse_line(line.as_ref()) {
            Some(AuditEvent::Rated {
                user_id,
                talk_id,
                rating,
            }) => {
                ratings.entry(user_id).or_default().insert(talk_id, rating);
            }
            Some(AuditEvent::Changed {
                user_id,
                talk_id,
                to,
                ..
            }) => {
                // "from" is informational only
                ratings.entry(user_id).or_default().insert(talk_id, to);
            }
            None => {}
        }
    }

    ratings
}

/// Rebuild the ratings document from the audit log and overwrite the store.
///
/// The replayed set replaces the current document entirely; there is no
/// merge. Returns the count of recovered entries on success.
pub fn recover_from_log(log_path: &Path, store: &JsonStore) -> Result<RecoveryReport, RecoveryError> {
    if !log_path.exists() {
        return Err(RecoveryError::LogNotFound);
    }

    let file = File::open(log_path)?;
    let lines: Vec<String> = BufReader::new(file).lines().collect::<Result<_, _>>()?;

    let ratings = replay(&lines);
    let entries: usize = ratings.values().map(|user_ratings| user_ratings.len()).sum();

    store.save(EntityKind::Ratings, &ratings)?;

    tracing::info!(
        "recovered {} rating entries from {}",
        entries,
        log_path.display()
    );

    Ok(RecoveryReport { entries })
}
