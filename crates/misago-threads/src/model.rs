//! Thread and category DTOs shared by the operation and the data layer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Forum thread as stored in `misago_threads`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Thread {
    /// Primary key.
    pub id: i32,
    /// Category the thread belongs to.
    pub category_id: i32,
    /// First post of the thread, once created.
    pub first_post_id: Option<i32>,
    /// User who started the thread (cleared when the account is deleted).
    pub starter_id: Option<i32>,
    /// Display name of the thread starter.
    pub starter_name: String,
    /// User who posted last (cleared when the account is deleted).
    pub last_poster_id: Option<i32>,
    /// Display name of the last poster.
    pub last_poster_name: String,
    /// Thread title.
    pub title: String,
    /// URL slug derived from the title.
    pub slug: String,
    /// Creation timestamp.
    pub started_at: DateTime<Utc>,
    /// Timestamp of the most recent post.
    pub last_posted_at: DateTime<Utc>,
    /// Number of replies.
    pub replies: i32,
    /// Whether the thread is closed for new replies.
    pub is_closed: bool,
    /// Plugin-owned extra data.
    pub extra: Value,
}

/// Forum category as stored in `misago_categories`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    /// Primary key.
    pub id: i32,
    /// Display name.
    pub name: String,
    /// URL slug.
    pub slug: String,
    /// Closed categories only accept content from moderators.
    pub is_closed: bool,
}
