//! Debounced search with stale-response protection.

pub mod pipeline;

pub use pipeline::SearchPipeline;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SearchStatus {
    #[default]
    Idle,
    Pending,
    /// The latest issued query has results committed, possibly none.
    Done,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostHit {
    pub id: String,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub prompt: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserHit {
    #[serde(alias = "id")]
    pub user_id: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResults {
    #[serde(default)]
    pub posts: Vec<PostHit>,
    #[serde(default)]
    pub users: Vec<UserHit>,
}

impl SearchResults {
    pub fn is_empty(&self) -> bool {
        self.posts.is_empty() && self.users.is_empty()
    }
}

/// What a reader of the pipeline sees.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SearchSnapshot {
    /// Token of the most recently issued request.
    pub query_token: u64,
    pub query_text: String,
    pub results: SearchResults,
    pub status: SearchStatus,
    pub last_error: Option<String>,
}
