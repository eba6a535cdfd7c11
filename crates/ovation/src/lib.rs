//! Ovation: a conference talk-rating service.
//!
//! Attendees authenticate with an access token, browse talks, and submit
//! star ratings and short comments. An administrator manages user accounts,
//! reviews aggregated results, exports them as CSV, and can rebuild the
//! rating store from the audit log after data loss.
//!
//! The interesting machinery lives in the `tally` crate (ledger, audit log,
//! recovery) and `shelf` (flat-file record store); this crate is the HTTP
//! glue around them.

pub mod auth;
pub mod models;
pub mod state;
pub mod web;
