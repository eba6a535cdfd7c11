//! Flat-file JSON record store for Ovation.
//!
//! Every entity kind (talks, speakers, users, ratings, comments) lives in
//! one whole-document JSON file inside a data directory. Documents are
//! loaded and rewritten in full on every mutation; there are no partial
//! updates and no schema validation at this layer.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use std::collections::BTreeMap;
//! use shelf::{EntityKind, JsonStore};
//!
//! let store = JsonStore::new("/var/lib/ovation/data").unwrap();
//!
//! // Missing or unreadable files load as the empty document.
//! let mut users: BTreeMap<String, serde_json::Value> = store.load(EntityKind::Users);
//!
//! users.insert("user_1".into(), serde_json::json!({"name": "Alice"}));
//! store.save(EntityKind::Users, &users).unwrap();
//! ```

pub mod kind;
pub mod store;

// Re-exports for convenience
pub use kind::EntityKind;
pub use store::{JsonStore, StoreError};
