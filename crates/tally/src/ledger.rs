//! The rating ledger: every rating mutation and query goes through here.
//!
//! Persistence ordering matters: the ratings document is saved before the
//! audit line is appended, so a concurrent read can never observe a
//! logged-but-unstored rating.

use std::collections::BTreeMap;

use shelf::{EntityKind, JsonStore, StoreError};
use thiserror::Error;

use crate::audit::{AuditEvent, AuditSink};

/// The full rating state: userId -> talkId -> rating.
///
/// Absence means unrated; no entry ever holds zero. BTreeMap keeps the
/// persisted JSON deterministic.
pub type RatingSet = BTreeMap<String, BTreeMap<String, u32>>;

/// Errors from ledger operations.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("invalid rating: please choose 1-{max} stars")]
    InvalidRating { max: u32 },

    #[error("failed to save ratings: {0}")]
    Store(#[from] StoreError),
}

/// Owns rating mutation and query logic over the ratings document.
pub struct Ledger {
    store: JsonStore,
    log: Box<dyn AuditSink>,
    max_rating: u32,
}

impl Ledger {
    /// Create a ledger over a store, with an injected audit sink and the
    /// configured maximum star value.
    pub fn new(store: JsonStore, log: Box<dyn AuditSink>, max_rating: u32) -> Self {
        Self {
            store,
            log,
            max_rating,
        }
    }

    /// The configured maximum rating value.
    pub fn max_rating(&self) -> u32 {
        self.max_rating
    }

    /// Set a user's rating for a talk.
    ///
    /// Validates the range before touching anything. On success the ratings
    /// document is persisted first, then one audit line is appended - with
    /// the previous value attached if the user had already rated this talk.
    /// A failed append is logged but does not fail the call; the rating is
    /// already durable at that point.
    pub fn set_rating(&self, user_id: &str, talk_id: &str, rating: u32) -> Result<(), LedgerError> {
        if rating < 1 || rating > self.max_rating {
            return Err(LedgerError::InvalidRating {
                max: self.max_rating,
            });
        }

        let mut ratings: RatingSet = self.store.load(EntityKind::Ratings);
        let user_ratings = ratings.entry(user_id.to_string()).or_default();
        let previous = user_ratings.insert(talk_id.to_string(), rating);

        self.store.save(EntityKind::Ratings, &ratings)?;

        let event = match previous {
            Some(old) => AuditEvent::Changed {
                user_id: user_id.to_string(),
                talk_id: talk_id.to_string(),
                from: old,
                to: rating,
            },
            None => AuditEvent::Rated {
                user_id: user_id.to_string(),
                talk_id: talk_id.to_string(),
                rating,
            },
        };

        if let Err(e) = self.log.append(&event.to_line()) {
            tracing::error!("failed to append audit line: {}", e);
        }

        Ok(())
    }

    /// All ratings by one user: talkId -> rating. Empty if the user is
    /// unknown.
    pub fn ratings_for_user(&self, user_id: &str) -> BTreeMap<String, u32> {
        let ratings: RatingSet = self.store.load(EntityKind::Ratings);
        ratings.get(user_id).cloned().unwrap_or_default()
    }

    /// All ratings for one talk: userId -> rating.
    pub fn ratings_for_talk(&self, talk_id: &str) -> BTreeMap<String, u32> {
        let ratings: RatingSet = self.store.load(EntityKind::Ratings);
        ratings
            .into_iter()
            .filter_map(|(user_id, user_ratings)| {
                user_ratings.get(talk_id).map(|r| (user_id, *r))
            })
            .collect()
    }

    /// One user's rating for one talk; 0 signals "no rating" and is never a
    /// valid stored value.
    pub fn user_rating_for_talk(&self, user_id: &str, talk_id: &str) -> u32 {
        let ratings: RatingSet = self.store.load(EntityKind::Ratings);
        ratings
            .get(user_id)
            .and_then(|user_ratings| user_ratings.get(talk_id))
            .copied()
            .unwrap_or(0)
    }

    /// Unweighted mean rating per talk, across all users.
    ///
    /// Only talks with at least one rating appear; callers joining against
    /// the full talk list report 0 for the rest.
    pub fn average_ratings(&self) -> BTreeMap<String, f64> {
        let ratings: RatingSet = self.store.load(EntityKind::Ratings);

        let mut sums: BTreeMap<String, (u64, u64)> = BTreeMap::new();
        for user_ratings in ratings.values() {
            for (talk_id, rating) in user_ratings {
                let entry = sums.entry(talk_id.clone()).or_insert((0, 0));
                entry.0 += u64::from(*rating);
                entry.1 += 1;
            }
        }

        sums.into_iter()
            .map(|(talk_id, (sum, count))| (talk_id, sum as f64 / count as f64))
            .collect()
    }

    /// Number of users who rated a talk.
    pub fn rating_count_for_talk(&self, talk_id: &str) -> usize {
        self.ratings_for_talk(talk_id).len()
    }

    /// Remove a user's entire sub-mapping, for account deletion.
    ///
    /// The audit log is NOT rewritten: the deleted user's history remains in
    /// the log and a later recovery will restore their ratings. Known
    /// discrepancy, kept pending a product decision.
    pub fn delete_for_user(&self, user_id: &str) -> Result<(), LedgerError> {
        let mut ratings: RatingSet = self.store.load(EntityKind::Ratings);

        if ratings.remove(user_id).is_some() {
            self.store.save(EntityKind::Ratings, &ratings)?;
        }

        Ok(())
    }
}
