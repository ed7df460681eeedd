use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Author block rendered next to a comment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentAuthor {
    pub name: String,
    pub username: String,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

/// A confirmed comment. `id` and `created_at` always come from the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub id: String,
    pub author: CommentAuthor,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// Paired flag and counter that must always move together.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Toggle {
    pub active: bool,
    pub count: u64,
}

impl Toggle {
    pub fn new(active: bool, count: u64) -> Self {
        Self { active, count }
    }

    /// Flip the flag and move the counter one step in the same direction.
    pub fn flipped(self) -> Self {
        if self.active {
            Self {
                active: false,
                count: self.count.saturating_sub(1),
            }
        } else {
            Self {
                active: true,
                count: self.count.saturating_add(1),
            }
        }
    }
}

/// Interaction state for one post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InteractionRecord {
    pub post_id: String,
    pub author_id: Option<String>,
    pub prompt: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub amplify: Toggle,
    pub is_bookmarked: bool,
    pub reply_count: u64,
    pub comments: Vec<Comment>,
}

impl InteractionRecord {
    pub fn amplify_count(&self) -> u64 {
        self.amplify.count
    }

    pub fn is_amplified(&self) -> bool {
        self.amplify.active
    }

    pub(crate) fn from_seed(post_id: &str, seed: PostSeed) -> Self {
        Self {
            post_id: post_id.to_string(),
            author_id: seed.author_id,
            prompt: seed.prompt,
            created_at: seed.created_at,
            amplify: Toggle::new(
                seed.is_amplified.unwrap_or(false),
                seed.amplify_count.unwrap_or(0),
            ),
            is_bookmarked: seed.is_bookmarked.unwrap_or(false),
            reply_count: seed.reply_count.unwrap_or(0),
            comments: seed.comments.unwrap_or_default(),
        }
    }

    /// Fill fields this record does not have yet. Interaction flags and
    /// counters already present are never touched.
    pub(crate) fn fill_missing(&mut self, seed: PostSeed) {
        if self.author_id.is_none() {
            self.author_id = seed.author_id;
        }
        if self.prompt.is_none() {
            self.prompt = seed.prompt;
        }
        if self.created_at.is_none() {
            self.created_at = seed.created_at;
        }
        if self.comments.is_empty()
            && let Some(comments) = seed.comments
        {
            self.comments = comments;
        }
    }
}

/// Follow state for one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserRecord {
    pub user_id: String,
    pub name: Option<String>,
    pub username: Option<String>,
    pub avatar_url: Option<String>,
    pub follow: Toggle,
    pub following_count: u64,
}

impl UserRecord {
    pub fn is_following(&self) -> bool {
        self.follow.active
    }

    pub fn follower_count(&self) -> u64 {
        self.follow.count
    }

    pub(crate) fn from_seed(user_id: &str, seed: UserSeed) -> Self {
        Self {
            user_id: user_id.to_string(),
            name: seed.name,
            username: seed.username,
            avatar_url: seed.avatar_url,
            follow: Toggle::new(
                seed.is_following.unwrap_or(false),
                seed.follower_count.unwrap_or(0),
            ),
            following_count: seed.following_count.unwrap_or(0),
        }
    }

    pub(crate) fn fill_missing(&mut self, seed: UserSeed) {
        if self.name.is_none() {
            self.name = seed.name;
        }
        if self.username.is_none() {
            self.username = seed.username;
        }
        if self.avatar_url.is_none() {
            self.avatar_url = seed.avatar_url;
        }
    }
}

/// Partial post data a view knows when it first renders a post.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct PostSeed {
    #[serde(default, alias = "user_id")]
    pub author_id: Option<String>,
    #[serde(default)]
    pub prompt: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, alias = "amplifies")]
    pub amplify_count: Option<u64>,
    #[serde(default)]
    pub is_amplified: Option<bool>,
    #[serde(default)]
    pub is_bookmarked: Option<bool>,
    #[serde(default, alias = "replies")]
    pub reply_count: Option<u64>,
    #[serde(default)]
    pub comments: Option<Vec<Comment>>,
}

impl PostSeed {
    /// Field-wise merge where `self` wins and `fallback` fills the gaps.
    pub fn or(self, fallback: PostSeed) -> PostSeed {
        PostSeed {
            author_id: self.author_id.or(fallback.author_id),
            prompt: self.prompt.or(fallback.prompt),
            created_at: self.created_at.or(fallback.created_at),
            amplify_count: self.amplify_count.or(fallback.amplify_count),
            is_amplified: self.is_amplified.or(fallback.is_amplified),
            is_bookmarked: self.is_bookmarked.or(fallback.is_bookmarked),
            reply_count: self.reply_count.or(fallback.reply_count),
            comments: self.comments.or(fallback.comments),
        }
    }
}

/// Partial user data a view knows when it first renders a user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct UserSeed {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub is_following: Option<bool>,
    #[serde(default, alias = "followers")]
    pub follower_count: Option<u64>,
    #[serde(default, alias = "following")]
    pub following_count: Option<u64>,
}
