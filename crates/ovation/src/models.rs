//! Flat entity records persisted as whole JSON documents.
//!
//! Field names follow the data files the conference system ships
//! (camelCase), so existing documents load unchanged. None of these types
//! carry rating logic; they only produce and consume the ids the ledger
//! references.

use std::collections::BTreeMap;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use shelf::{EntityKind, JsonStore, StoreError};
use thiserror::Error;

use crate::auth::generate_token;

/// Validation and lookup failures from entity operations.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("a user with this email address already exists")]
    DuplicateEmail,

    #[error("user not found")]
    UserNotFound,

    #[error("please enter a comment")]
    EmptyComment,

    #[error("comments may be at most {0} characters long")]
    CommentTooLong(usize),

    #[error("failed to save: {0}")]
    Store(#[from] StoreError),
}

/// Longest accepted comment, in characters.
pub const MAX_COMMENT_LEN: usize = 200;

/// A conference talk.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Talk {
    pub id: Option<u64>,
    pub booking_number: Option<String>,
    pub title: String,
    #[serde(rename = "abstract")]
    pub abstract_text: String,
    pub topic_id: Option<String>,
    pub keywords: Option<String>,
    pub speaker_id: Option<u64>,
    pub co_speaker_id1: Option<u64>,
    pub co_speaker_id2: Option<u64>,
}

pub type TalkSet = BTreeMap<String, Talk>;

impl Talk {
    /// All talks, keyed by talk id.
    pub fn all(store: &JsonStore) -> TalkSet {
        store.load(EntityKind::Talks)
    }

    pub fn by_id(store: &JsonStore, talk_id: &str) -> Option<Talk> {
        Self::all(store).remove(talk_id)
    }

    /// Case-insensitive keyword match over title, abstract, and keywords.
    pub fn matches_keyword(&self, keyword: &str) -> bool {
        let keyword = keyword.to_lowercase();
        self.title.to_lowercase().contains(&keyword)
            || self.abstract_text.to_lowercase().contains(&keyword)
            || self
                .keywords
                .as_deref()
                .unwrap_or("")
                .to_lowercase()
                .contains(&keyword)
    }

    /// Talks per topic, for the topic filter UI.
    pub fn topic_counts(talks: &TalkSet) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for talk in talks.values() {
            if let Some(topic) = &talk.topic_id {
                *counts.entry(topic.clone()).or_insert(0) += 1;
            }
        }
        counts
    }
}

/// A conference speaker. Sensitive contact fields are stripped before the
/// record leaves the admin surface.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Speaker {
    pub id: Option<u64>,
    pub first_name: String,
    pub sur_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(rename = "eMail", skip_serializing_if = "Option::is_none")]
    pub e_mail: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zip_code: Option<String>,
}

pub type SpeakerSet = BTreeMap<String, Speaker>;

impl Speaker {
    pub fn all(store: &JsonStore) -> SpeakerSet {
        store.load(EntityKind::Speakers)
    }

    /// Look up a speaker with contact details removed.
    pub fn sanitized(store: &JsonStore, speaker_id: u64) -> Option<Speaker> {
        let mut speaker = Self::all(store).remove(&speaker_id.to_string())?;
        speaker.phone = None;
        speaker.e_mail = None;
        speaker.address = None;
        speaker.zip_code = None;
        Some(speaker)
    }

    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.sur_name)
            .trim()
            .to_string()
    }
}

/// An application user, authenticated by access token.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct User {
    pub name: String,
    pub email: String,
    pub token: String,
    pub created_at: String,
}

pub type UserSet = BTreeMap<String, User>;

impl User {
    pub fn all(store: &JsonStore) -> UserSet {
        store.load(EntityKind::Users)
    }

    pub fn by_id(store: &JsonStore, user_id: &str) -> Option<User> {
        Self::all(store).remove(user_id)
    }

    /// Find a user by access token, returning the id alongside the record.
    pub fn by_token(store: &JsonStore, token: &str) -> Option<(String, User)> {
        Self::all(store).into_iter().find(|(_, u)| u.token == token)
    }

    /// Create a user with a fresh token. Emails must be unique.
    pub fn create(store: &JsonStore, name: &str, email: &str) -> Result<(String, User), ModelError> {
        let mut users = Self::all(store);

        if users.values().any(|u| u.email == email) {
            return Err(ModelError::DuplicateEmail);
        }

        let user_id = format!("user_{}_{}", Utc::now().timestamp(), users.len() + 1);
        let user = User {
            name: name.to_string(),
            email: email.to_string(),
            token: generate_token(),
            created_at: Utc::now().to_rfc3339(),
        };

        users.insert(user_id.clone(), user.clone());
        store.save(EntityKind::Users, &users)?;

        Ok((user_id, user))
    }

    /// Replace a user's access token, invalidating the old one.
    pub fn regenerate_token(store: &JsonStore, user_id: &str) -> Result<String, ModelError> {
        let mut users = Self::all(store);
        let user = users.get_mut(user_id).ok_or(ModelError::UserNotFound)?;

        user.token = generate_token();
        let token = user.token.clone();
        store.save(EntityKind::Users, &users)?;

        Ok(token)
    }

    /// Delete a user record. The caller cascades the rating deletion via
    /// the ledger; the audit log keeps the user's history either way.
    pub fn delete(store: &JsonStore, user_id: &str) -> Result<User, ModelError> {
        let mut users = Self::all(store);
        let user = users.remove(user_id).ok_or(ModelError::UserNotFound)?;
        store.save(EntityKind::Users, &users)?;
        Ok(user)
    }
}

/// One attendee comment on a talk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    pub user_id: String,
    pub user_name: String,
    pub text: String,
    /// Unix timestamp with fractional seconds.
    pub timestamp: f64,
}

pub type CommentSet = BTreeMap<String, Vec<Comment>>;

impl Comment {
    /// Comments for one talk, oldest first.
    pub fn for_talk(store: &JsonStore, talk_id: &str) -> Vec<Comment> {
        let mut comments: CommentSet = store.load(EntityKind::Comments);
        comments.remove(talk_id).unwrap_or_default()
    }

    /// Append a comment. Rejects blank text and texts over
    /// [`MAX_COMMENT_LEN`] characters before any mutation.
    pub fn add(
        store: &JsonStore,
        talk_id: &str,
        user_id: &str,
        user_name: &str,
        text: &str,
    ) -> Result<(), ModelError> {
        if text.trim().is_empty() {
            return Err(ModelError::EmptyComment);
        }
        if text.chars().count() > MAX_COMMENT_LEN {
            return Err(ModelError::CommentTooLong(MAX_COMMENT_LEN));
        }

        let mut comments: CommentSet = store.load(EntityKind::Comments);
        comments.entry(talk_id.to_string()).or_default().push(Comment {
            user_id: user_id.to_string(),
            user_name: user_name.to_string(),
            text: text.to_string(),
            timestamp: Utc::now().timestamp_millis() as f64 / 1000.0,
        });

        store.save(EntityKind::Comments, &comments)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn test_store() -> (JsonStore, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let store = JsonStore::new(temp_dir.path()).unwrap();
        (store, temp_dir)
    }

    fn seed_talks(store: &JsonStore) {
        let mut talks = TalkSet::new();
        talks.insert(
            "1".into(),
            Talk {
                id: Some(1),
                booking_number: Some("TX-001".into()),
                title: "Test Talk 1".into(),
                abstract_text: "This is a test talk abstract.".into(),
                topic_id: Some("Java".into()),
                keywords: Some("test,java".into()),
                speaker_id: Some(101),
                ..Default::default()
            },
        );
        talks.insert(
            "2".into(),
            Talk {
                id: Some(2),
                title: "Test Talk 2".into(),
                abstract_text: "This is another test talk abstract.".into(),
                topic_id: Some("Spring".into()),
                keywords: Some("test,spring".into()),
                speaker_id: Some(102),
                ..Default::default()
            },
        );
        store.save(EntityKind::Talks, &talks).unwrap();
    }

    #[test]
    fn test_talk_camel_case_fields_load() {
        let (store, _dir) = test_store();
        std::fs::write(
            store.path_for(EntityKind::Talks),
            r#"{"1": {"bookingNumber": "TX-001", "id": 1, "title": "T",
                 "abstract": "A", "topicId": "Java", "keywords": "k",
                 "speakerId": 101, "coSpeakerId1": 102}}"#,
        )
        .unwrap();

        let talk = Talk::by_id(&store, "1").unwrap();
        assert_eq!(talk.booking_number.as_deref(), Some("TX-001"));
        assert_eq!(talk.topic_id.as_deref(), Some("Java"));
        assert_eq!(talk.co_speaker_id1, Some(102));
    }

    #[test]
    fn test_keyword_search() {
        let (store, _dir) = test_store();
        seed_talks(&store);

        let talks = Talk::all(&store);
        let hits: Vec<_> = talks.values().filter(|t| t.matches_keyword("SPRING")).collect();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].title, "Test Talk 2");
    }

    #[test]
    fn test_topic_counts() {
        let (store, _dir) = test_store();
        seed_talks(&store);

        let counts = Talk::topic_counts(&Talk::all(&store));
        assert_eq!(counts["Java"], 1);
        assert_eq!(counts["Spring"], 1);
    }

    #[test]
    fn test_speaker_sanitized_strips_contact_fields() {
        let (store, _dir) = test_store();
        let mut speakers = SpeakerSet::new();
        speakers.insert(
            "101".into(),
            Speaker {
                id: Some(101),
                first_name: "John".into(),
                sur_name: "Doe".into(),
                phone: Some("+1234567890".into()),
                e_mail: Some("john@example.com".into()),
                address: Some("123 Test St".into()),
                bio: Some("Test bio".into()),
                ..Default::default()
            },
        );
        store.save(EntityKind::Speakers, &speakers).unwrap();

        let sanitized = Speaker::sanitized(&store, 101).unwrap();
        assert!(sanitized.phone.is_none());
        assert!(sanitized.e_mail.is_none());
        assert!(sanitized.address.is_none());
        assert_eq!(sanitized.bio.as_deref(), Some("Test bio"));
        assert_eq!(sanitized.display_name(), "John Doe");

        let json = serde_json::to_value(&sanitized).unwrap();
        assert!(json.get("phone").is_none());
        assert!(json.get("eMail").is_none());
    }

    #[test]
    fn test_user_create_find_delete() {
        let (store, _dir) = test_store();

        let (user_id, user) = User::create(&store, "Test User", "user@example.com").unwrap();
        assert!(user.token.len() >= 16);

        let (found_id, found) = User::by_token(&store, &user.token).unwrap();
        assert_eq!(found_id, user_id);
        assert_eq!(found.name, "Test User");

        let deleted = User::delete(&store, &user_id).unwrap();
        assert_eq!(deleted.email, "user@example.com");
        assert!(User::by_id(&store, &user_id).is_none());
    }

    #[test]
    fn test_user_duplicate_email_rejected() {
        let (store, _dir) = test_store();

        User::create(&store, "A", "same@example.com").unwrap();
        let result = User::create(&store, "B", "same@example.com");
        assert!(matches!(result, Err(ModelError::DuplicateEmail)));
    }

    #[test]
    fn test_regenerate_token_invalidates_old() {
        let (store, _dir) = test_store();

        let (user_id, user) = User::create(&store, "A", "a@example.com").unwrap();
        let old_token = user.token;

        let new_token = User::regenerate_token(&store, &user_id).unwrap();
        assert_ne!(new_token, old_token);
        assert!(User::by_token(&store, &old_token).is_none());
        assert!(User::by_token(&store, &new_token).is_some());
    }

    #[test]
    fn test_regenerate_token_unknown_user() {
        let (store, _dir) = test_store();
        assert!(matches!(
            User::regenerate_token(&store, "ghost"),
            Err(ModelError::UserNotFound)
        ));
    }

    #[test]
    fn test_comment_validation() {
        let (store, _dir) = test_store();

        assert!(matches!(
            Comment::add(&store, "1", "u", "U", "   "),
            Err(ModelError::EmptyComment)
        ));
        assert!(matches!(
            Comment::add(&store, "1", "u", "U", &"x".repeat(201)),
            Err(ModelError::CommentTooLong(200))
        ));

        // Nothing persisted by the rejected attempts
        assert!(Comment::for_talk(&store, "1").is_empty());
    }

    #[test]
    fn test_comment_add_and_list() {
        let (store, _dir) = test_store();

        Comment::add(&store, "1", "user1", "Test User", "This is a test comment").unwrap();
        Comment::add(&store, "1", "user2", "Other", "Another").unwrap();

        let comments = Comment::for_talk(&store, "1");
        assert_eq!(comments.len(), 2);
        assert_eq!(comments[0].text, "This is a test comment");
        assert!(comments[0].timestamp > 0.0);

        assert!(Comment::for_talk(&store, "2").is_empty());
    }
}
