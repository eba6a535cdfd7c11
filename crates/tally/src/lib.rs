//! Rating ledger with an append-only audit log and log-replay recovery.
//!
//! The ledger owns every rating mutation and query. Each mutation is
//! persisted to the ratings document first, then recorded as one
//! human-readable line in the audit log. If the ratings document is ever
//! lost or corrupted, [`recovery::recover_from_log`] rebuilds it from
//! scratch by replaying the log in file order.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use shelf::JsonStore;
//! use tally::{FileAuditLog, Ledger};
//!
//! let store = JsonStore::new("/var/lib/ovation/data").unwrap();
//! let log = FileAuditLog::new("/var/lib/ovation/logs/ratings.log");
//!
//! let ledger = Ledger::new(store, Box::new(log), 5);
//! ledger.set_rating("alice", "7", 4).unwrap();
//! assert_eq!(ledger.user_rating_for_talk("alice", "7"), 4);
//! ```

pub mod audit;
pub mod ledger;
pub mod recovery;

// Re-exports for convenience
pub use audit::{AuditEvent, AuditSink, FileAuditLog};
pub use ledger::{Ledger, LedgerError, RatingSet};
pub use recovery::{recover_from_log, RecoveryError, RecoveryReport};
