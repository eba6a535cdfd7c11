//! Shared state for web handlers.

use std::sync::Arc;

use ovaconf::OvationConfig;
use shelf::JsonStore;
use tally::{FileAuditLog, Ledger};

/// Everything a handler needs, cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<OvationConfig>,
    pub store: JsonStore,
    pub ledger: Arc<Ledger>,
}

impl AppState {
    /// Build the full state from a config: record store over the data
    /// directory, file-backed audit log, ledger wired to both.
    pub fn from_config(config: OvationConfig) -> std::io::Result<Self> {
        let store = JsonStore::new(&config.paths.data_dir)?;
        std::fs::create_dir_all(&config.paths.log_dir)?;

        let log = FileAuditLog::new(config.rating_log_file());
        let ledger = Ledger::new(store.clone(), Box::new(log), config.rating.max_rating);

        Ok(Self {
            config: Arc::new(config),
            store,
            ledger: Arc::new(ledger),
        })
    }
}
