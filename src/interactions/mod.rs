//! Per-post and per-user interaction state with optimistic writes.

pub mod cache;
pub mod optimistic;
pub mod records;

pub use cache::InteractionCache;
pub use optimistic::{InFlightGuard, InFlightKeys, Optimistic, RecordKey};
pub use records::{
    Comment, CommentAuthor, InteractionRecord, PostSeed, Toggle, UserRecord, UserSeed,
};

use serde::Serialize;

/// How a write request ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum MutationOutcome {
    /// Backend confirmed the change.
    Committed,
    /// Applied locally only; the session is a demo session.
    LocalOnly,
    /// Backend refused or was unreachable; the prior value was restored.
    RolledBack,
    /// Another mutation on the same record is still outstanding.
    Rejected,
    /// Nothing was attempted (no credential, demo comment, empty input).
    Skipped,
    /// No record with that id is cached.
    Missing,
    /// The record was already in the requested state.
    Unchanged,
    /// A create request failed; nothing was shown locally.
    Failed,
}

impl MutationOutcome {
    /// Whether local state now reflects the request.
    pub fn applied(self) -> bool {
        matches!(self, Self::Committed | Self::LocalOnly | Self::Unchanged)
    }
}
