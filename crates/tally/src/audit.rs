//! Append-only audit log of rating mutations.
//!
//! One event per line, two shapes:
//! ```text
//! 2025-03-01 12:00:00,123 - User alice rated talk 7 with 4
//! 2025-03-01 12:05:00,456 - User alice changed rating for talk 7 from 4 to 2
//! ```
//! Entries are never edited or deleted; the log is the source of truth for
//! recovery. The timestamp format matches the predecessor system's log files
//! byte for byte, so recovery accepts logs written before the rewrite.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use std::sync::OnceLock;

use chrono::Local;
use regex::Regex;

/// Timestamp format carried on every line, millisecond precision.
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S,%3f";

static RATED_PATTERN: OnceLock<Regex> = OnceLock::new();
static CHANGED_PATTERN: OnceLock<Regex> = OnceLock::new();

fn rated_pattern() -> &'static Regex {
    RATED_PATTERN.get_or_init(|| {
        Regex::new(
            r"^\d{4}-\d{2}-\d{2} \d{2}:\d{2}:\d{2},\d{3} - User (\w+) rated talk (\w+) with (\d+)",
        )
        .unwrap()
    })
}

fn changed_pattern() -> &'static Regex {
    CHANGED_PATTERN.get_or_init(|| {
        Regex::new(
            r"^\d{4}-\d{2}-\d{2} \d{2}:\d{2}:\d{2},\d{3} - User (\w+) changed rating for talk (\w+) from (\d+) to (\d+)",
        )
        .unwrap()
    })
}

/// One rating mutation, as recorded in the log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuditEvent {
    /// First rating by this user for this talk.
    Rated {
        user_id: String,
        talk_id: String,
        rating: u32,
    },
    /// Rating change; `from` is informational only, replay uses `to`.
    Changed {
        user_id: String,
        talk_id: String,
        from: u32,
        to: u32,
    },
}

impl AuditEvent {
    /// Format this event as one log line with the current wall-clock time.
    pub fn to_line(&self) -> String {
        self.to_line_at(Local::now().format(TIMESTAMP_FORMAT).to_string())
    }

    fn to_line_at(&self, timestamp: String) -> String {
        match self {
            AuditEvent::Rated {
                user_id,
                talk_id,
                rating,
            } => format!(
                "{} - User {} rated talk {} with {}",
                timestamp, user_id, talk_id, rating
            ),
            AuditEvent::Changed {
                user_id,
                talk_id,
                from,
                to,
            } => format!(
                "{} - User {} changed rating for talk {} from {} to {}",
                timestamp, user_id, talk_id, from, to
            ),
        }
    }

    /// Parse one log line back into an event.
    ///
    /// Lines matching neither pattern return `None`; callers skip them
    /// silently so stray log noise never breaks replay.
    pub fn parse_line(line: &str) -> Option<AuditEvent> {
        if let Some(caps) = changed_pattern().captures(line) {
            return Some(AuditEvent::Changed {
                user_id: caps[1].to_string(),
                talk_id: caps[2].to_string(),
                from: caps[3].parse().ok()?,
                to: caps[4].parse().ok()?,
            });
        }

        if let Some(caps) = rated_pattern().captures(line) {
            return Some(AuditEvent::Rated {
                user_id: caps[1].to_string(),
                talk_id: caps[2].to_string(),
                rating: caps[3].parse().ok()?,
            });
        }

        None
    }
}

/// Destination for audit lines.
///
/// Injected into the ledger at construction so tests can capture lines
/// in memory instead of touching the filesystem.
pub trait AuditSink: Send + Sync {
    /// Append one line to the log.
    fn append(&self, line: &str) -> std::io::Result<()>;
}

/// File-backed audit sink: create-if-missing, append-only, flush per line.
#[derive(Debug, Clone)]
pub struct FileAuditLog {
    path: PathBuf,
}

impl FileAuditLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the log file.
    pub fn path(&self) -> &PathBuf {
        &self.path
    }
}

impl AuditSink for FileAuditLog {
    fn append(&self, line: &str) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{}", line)?;
        file.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_rated_line_roundtrip() {
        let event = AuditEvent::Rated {
            user_id: "alice".into(),
            talk_id: "7".into(),
            rating: 4,
        };

        let line = event.to_line();
        assert!(line.ends_with("- User alice rated talk 7 with 4"));
        assert_eq!(AuditEvent::parse_line(&line), Some(event));
    }

    #[test]
    fn test_changed_line_roundtrip() {
        let event = AuditEvent::Changed {
            user_id: "alice".into(),
            talk_id: "7".into(),
            from: 4,
            to: 2,
        };

        let line = event.to_line();
        assert!(line.ends_with("- User alice changed rating for talk 7 from 4 to 2"));
        assert_eq!(AuditEvent::parse_line(&line), Some(event));
    }

    #[test]
    fn test_timestamp_shape() {
        let line = AuditEvent::Rated {
            user_id: "u".into(),
            talk_id: "t".into(),
            rating: 1,
        }
        .to_line();

        // "YYYY-mm-dd HH:MM:SS,mmm - ..."
        assert_eq!(&line[4..5], "-");
        assert_eq!(&line[10..11], " ");
        assert_eq!(&line[19..20], ",");
        assert_eq!(&line[23..26], " - ");
    }

    #[test]
    fn test_parse_predecessor_format() {
        // Lines written by the system this one replaced.
        let line = "2025-03-01 09:30:12,042 - User user_1747_3 rated talk 12 with 5";
        assert_eq!(
            AuditEvent::parse_line(line),
            Some(AuditEvent::Rated {
                user_id: "user_1747_3".into(),
                talk_id: "12".into(),
                rating: 5,
            })
        );
    }

    #[test]
    fn test_parse_rejects_noise() {
        assert_eq!(AuditEvent::parse_line(""), None);
        assert_eq!(AuditEvent::parse_line("not a log line"), None);
        assert_eq!(
            AuditEvent::parse_line("2025-03-01 09:30:12,042 - Server restarted"),
            None
        );
        // Timestamp must lead the line
        assert_eq!(
            AuditEvent::parse_line("prefix 2025-03-01 09:30:12,042 - User a rated talk b with 3"),
            None
        );
    }

    #[test]
    fn test_file_sink_appends() {
        let temp_dir = TempDir::new().unwrap();
        let log = FileAuditLog::new(temp_dir.path().join("logs").join("ratings.log"));

        log.append("first line").unwrap();
        log.append("second line").unwrap();

        let contents = std::fs::read_to_string(log.path()).unwrap();
        assert_eq!(contents, "first line\nsecond line\n");
    }
}
