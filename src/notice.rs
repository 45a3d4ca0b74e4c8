/// User-visible notices.
///
/// Two severities: errors stay up until the condition clears (or a caller
/// dismisses them), warnings auto-dismiss after five seconds. The board
/// never reads the clock itself; every query takes `now` so tests can
/// drive time explicitly.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

/// How long a warning stays visible.
pub const WARNING_TTL_SECS: i64 = 5;

pub const MSG_DATA_CONNECTION_LOST: &str = "Data connection lost. Retrying...";
pub const MSG_OFFLINE: &str = "Internet connection lost. Map data may not load.";
pub const MSG_RESTORED: &str = "Internet connection restored. Refreshing data...";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeKind {
    /// Persistent.
    Error,
    /// Auto-dismisses after `WARNING_TTL_SECS`.
    Warning,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notice {
    pub id: u64,
    pub kind: NoticeKind,
    pub message: String,
    pub raised_at: DateTime<Utc>,
}

impl Notice {
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        match self.kind {
            NoticeKind::Error => None,
            NoticeKind::Warning => Some(self.raised_at + Duration::seconds(WARNING_TTL_SECS)),
        }
    }

    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.expires_at().is_none_or(|t| now < t)
    }
}

#[derive(Debug, Clone, Default)]
pub struct NoticeBoard {
    notices: Vec<Notice>,
    next_id: u64,
}

impl NoticeBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raises a notice. Re-raising an active notice with the same message
    /// refreshes its timestamp instead of stacking a duplicate.
    pub fn raise(&mut self, kind: NoticeKind, message: &str, now: DateTime<Utc>) -> u64 {
        self.prune(now);

        if let Some(existing) = self
            .notices
            .iter_mut()
            .find(|n| n.kind == kind && n.message == message)
        {
            existing.raised_at = now;
            return existing.id;
        }

        self.next_id += 1;
        self.notices.push(Notice {
            id: self.next_id,
            kind,
            message: message.to_string(),
            raised_at: now,
        });
        self.next_id
    }

    pub fn error(&mut self, message: &str, now: DateTime<Utc>) -> u64 {
        self.raise(NoticeKind::Error, message, now)
    }

    pub fn warning(&mut self, message: &str, now: DateTime<Utc>) -> u64 {
        self.raise(NoticeKind::Warning, message, now)
    }

    pub fn dismiss(&mut self, id: u64) -> bool {
        let before = self.notices.len();
        self.notices.retain(|n| n.id != id);
        self.notices.len() != before
    }

    /// Drops every notice carrying `message`, whatever its kind.
    pub fn clear_message(&mut self, message: &str) {
        self.notices.retain(|n| n.message != message);
    }

    /// Re-raises every notice of `other` with its original timestamp.
    /// Used to fold in notices raised on a worker thread.
    pub fn absorb(&mut self, other: &NoticeBoard) {
        for notice in &other.notices {
            self.raise(notice.kind, &notice.message, notice.raised_at);
        }
    }

    /// Notices still visible at `now`, oldest first.
    pub fn active(&self, now: DateTime<Utc>) -> Vec<Notice> {
        self.notices.iter().filter(|n| n.is_active(now)).cloned().collect()
    }

    fn prune(&mut self, now: DateTime<Utc>) {
        self.notices.retain(|n| n.is_active(now));
    }
}
