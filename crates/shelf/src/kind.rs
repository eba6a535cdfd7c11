//! EntityKind: the five whole-document JSON files the store knows about.

use std::fmt;

/// One persisted document per kind, named `<kind>.json` in the data
/// directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Talks,
    Speakers,
    Users,
    Ratings,
    Comments,
}

impl EntityKind {
    /// File name for this kind's document.
    pub fn file_name(&self) -> &'static str {
        match self {
            EntityKind::Talks => "talks.json",
            EntityKind::Speakers => "speakers.json",
            EntityKind::Users => "users.json",
            EntityKind::Ratings => "ratings.json",
            EntityKind::Comments => "comments.json",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EntityKind::Talks => "talks",
            EntityKind::Speakers => "speakers",
            EntityKind::Users => "users",
            EntityKind::Ratings => "ratings",
            EntityKind::Comments => "comments",
        };
        write!(f, "{}", name)
    }
}
