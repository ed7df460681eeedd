use super::MutationOutcome;
use super::optimistic::{InFlightKeys, Optimistic, RecordKey};
use super::records::{
    Comment, CommentAuthor, InteractionRecord, PostSeed, Toggle, UserRecord, UserSeed,
};
use crate::auth::SessionHandle;
use crate::error::InteractionError;
use crate::gateway::{GatewayResponse, Method, RequestGateway};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, Default)]
struct CacheState {
    /// Bumped by `reset`; completions from an older epoch are dropped.
    epoch: u64,
    posts: HashMap<String, InteractionRecord>,
    users: HashMap<String, UserRecord>,
    last_error: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Access {
    Remote,
    LocalOnly,
    Denied,
}

/// One toggleable facet of a record: what it reads and writes, how it flips,
/// which request confirms it and how an authoritative answer is folded in.
trait Facet: Copy + std::fmt::Debug {
    type Record;

    fn key(id: &str) -> RecordKey;
    fn table(state: &mut CacheState) -> &mut HashMap<String, Self::Record>;
    fn read(record: &Self::Record) -> Self;
    fn write(self, record: &mut Self::Record);
    fn flipped(self) -> Self;
    fn is_on(self) -> bool;
    /// Request confirming a change whose optimistic value is `self`.
    fn request(self, id: &str) -> (Method, String);
    /// Fold an authoritative response into the optimistic value `self`.
    /// `snapshot` is the value from before the change.
    fn reconcile(self, snapshot: Self, body: &Value) -> Self;
}

/// Merge a server answer into an optimistic toggle without ever pairing a
/// flag with a counter that moved the other way.
fn authoritative(
    applied: Toggle,
    snapshot: Toggle,
    body: &Value,
    flag: &str,
    count: &str,
) -> Toggle {
    let flag = body.get(flag).and_then(Value::as_bool);
    let count = body.get(count).and_then(Value::as_u64);
    match (flag, count) {
        (Some(active), Some(count)) => Toggle { active, count },
        // Flag alone: it either confirms the flip or says nothing changed.
        (Some(active), None) if active == applied.active => applied,
        (Some(_), None) => snapshot,
        (None, Some(count)) => Toggle {
            active: applied.active,
            count,
        },
        (None, None) => applied,
    }
}

#[derive(Debug, Clone, Copy)]
struct Amplify(Toggle);

impl Facet for Amplify {
    type Record = InteractionRecord;

    fn key(id: &str) -> RecordKey {
        RecordKey::Post(id.to_string())
    }
    fn table(state: &mut CacheState) -> &mut HashMap<String, InteractionRecord> {
        &mut state.posts
    }
    fn read(record: &InteractionRecord) -> Self {
        Self(record.amplify)
    }
    fn write(self, record: &mut InteractionRecord) {
        record.amplify = self.0;
    }
    fn flipped(self) -> Self {
        Self(self.0.flipped())
    }
    fn is_on(self) -> bool {
        self.0.active
    }
    fn request(self, id: &str) -> (Method, String) {
        (Method::POST, format!("/calls/{id}/amplify"))
    }
    fn reconcile(self, snapshot: Self, body: &Value) -> Self {
        Self(authoritative(self.0, snapshot.0, body, "is_amplified", "amplifies"))
    }
}

#[derive(Debug, Clone, Copy)]
struct Bookmark(bool);

impl Facet for Bookmark {
    type Record = InteractionRecord;

    fn key(id: &str) -> RecordKey {
        RecordKey::Post(id.to_string())
    }
    fn table(state: &mut CacheState) -> &mut HashMap<String, InteractionRecord> {
        &mut state.posts
    }
    fn read(record: &InteractionRecord) -> Self {
        Self(record.is_bookmarked)
    }
    fn write(self, record: &mut InteractionRecord) {
        record.is_bookmarked = self.0;
    }
    fn flipped(self) -> Self {
        Self(!self.0)
    }
    fn is_on(self) -> bool {
        self.0
    }
    fn request(self, id: &str) -> (Method, String) {
        (Method::POST, format!("/calls/{id}/bookmark"))
    }
    fn reconcile(self, _snapshot: Self, body: &Value) -> Self {
        Self(
            body.get("is_bookmarked")
                .and_then(Value::as_bool)
                .unwrap_or(self.0),
        )
    }
}

#[derive(Debug, Clone, Copy)]
struct Follow(Toggle);

impl Facet for Follow {
    type Record = UserRecord;

    fn key(id: &str) -> RecordKey {
        RecordKey::User(id.to_string())
    }
    fn table(state: &mut CacheState) -> &mut HashMap<String, UserRecord> {
        &mut state.users
    }
    fn read(record: &UserRecord) -> Self {
        Self(record.follow)
    }
    fn write(self, record: &mut UserRecord) {
        record.follow = self.0;
    }
    fn flipped(self) -> Self {
        Self(self.0.flipped())
    }
    fn is_on(self) -> bool {
        self.0.active
    }
    fn request(self, id: &str) -> (Method, String) {
        let method = if self.0.active {
            Method::POST
        } else {
            Method::DELETE
        };
        (method, format!("/users/{id}/follow"))
    }
    fn reconcile(self, snapshot: Self, body: &Value) -> Self {
        Self(authoritative(self.0, snapshot.0, body, "is_following", "followers"))
    }
}

#[derive(Debug, Deserialize)]
struct CreatedResponse {
    id: String,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct CreatedResponseEnvelope {
    response: CreatedResponse,
}

#[derive(Debug, Deserialize)]
struct CreatedCall {
    id: String,
    #[serde(default)]
    user_id: Option<String>,
    #[serde(default)]
    prompt: Option<String>,
    #[serde(default)]
    created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
struct CreatedCallEnvelope {
    call: CreatedCall,
}

#[derive(Debug, Deserialize)]
struct CreatedEcho {
    id: String,
    #[serde(default)]
    user_id: Option<String>,
    #[serde(default)]
    created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
struct CreatedEchoEnvelope {
    echo: CreatedEcho,
}

/// Reply to a request that creates a post.
trait CreatedPost: DeserializeOwned {
    fn into_seed(self) -> (String, PostSeed);
}

impl CreatedPost for CreatedCallEnvelope {
    fn into_seed(self) -> (String, PostSeed) {
        let call = self.call;
        let seed = PostSeed {
            author_id: call.user_id,
            prompt: call.prompt,
            created_at: call.created_at,
            ..PostSeed::default()
        };
        (call.id, seed)
    }
}

impl CreatedPost for CreatedEchoEnvelope {
    fn into_seed(self) -> (String, PostSeed) {
        let echo = self.echo;
        let seed = PostSeed {
            author_id: echo.user_id,
            created_at: echo.created_at,
            ..PostSeed::default()
        };
        (echo.id, seed)
    }
}

/// Keyed store of per-post and per-user interaction state.
///
/// Amplify, bookmark and follow are applied locally first, confirmed through
/// the gateway, and on failure restored to the value captured before the
/// change. At most one mutation per key is outstanding; a second call for a
/// busy key is rejected without touching state rather than queued, so two
/// flips can never interleave their snapshots.
pub struct InteractionCache {
    session: SessionHandle,
    gateway: Arc<dyn RequestGateway>,
    state: Mutex<CacheState>,
    in_flight: InFlightKeys,
}

impl InteractionCache {
    pub fn new(session: SessionHandle, gateway: Arc<dyn RequestGateway>) -> Self {
        Self {
            session,
            gateway,
            state: Mutex::new(CacheState::default()),
            in_flight: InFlightKeys::new(),
        }
    }

    // ── Reads ────────────────────────────────────────────────────────

    pub fn post(&self, post_id: &str) -> Option<InteractionRecord> {
        self.lock().posts.get(post_id).cloned()
    }

    pub fn user(&self, user_id: &str) -> Option<UserRecord> {
        self.lock().users.get(user_id).cloned()
    }

    pub fn last_error(&self) -> Option<String> {
        self.lock().last_error.clone()
    }

    pub fn clear_error(&self) {
        self.lock().last_error = None;
    }

    pub fn is_in_flight(&self, key: &RecordKey) -> bool {
        self.in_flight.contains(key)
    }

    // ── Seeding ──────────────────────────────────────────────────────

    /// Insert a post, or fill only the fields an existing record lacks.
    pub fn initialize_post(&self, post_id: &str, seed: PostSeed) {
        match self.lock().posts.entry(post_id.to_string()) {
            Entry::Occupied(mut existing) => existing.get_mut().fill_missing(seed),
            Entry::Vacant(slot) => {
                slot.insert(InteractionRecord::from_seed(post_id, seed));
            }
        }
    }

    /// Insert a user, or fill only the fields an existing record lacks.
    pub fn initialize_user(&self, user_id: &str, seed: UserSeed) {
        match self.lock().users.entry(user_id.to_string()) {
            Entry::Occupied(mut existing) => existing.get_mut().fill_missing(seed),
            Entry::Vacant(slot) => {
                slot.insert(UserRecord::from_seed(user_id, seed));
            }
        }
    }

    /// Seed a post from the backend's interaction summary. Fields in `seed`
    /// take precedence over fetched ones; without a credential, or when the
    /// fetch fails, `seed` is used alone.
    pub async fn hydrate_post(&self, post_id: &str, seed: PostSeed) {
        if self.access() != Access::Remote {
            self.initialize_post(post_id, seed);
            return;
        }

        let fetched = self
            .gateway
            .get(&format!("/calls/{post_id}/interactions"))
            .await
            .and_then(GatewayResponse::into_result)
            .and_then(|resp| resp.json::<PostSeed>());

        let merged = match fetched {
            Ok(remote) => seed.or(remote),
            Err(err) => {
                tracing::warn!(post_id, error = %err, "interaction fetch failed, using seed");
                seed
            }
        };
        self.initialize_post(post_id, merged);
    }

    // ── Optimistic toggles ───────────────────────────────────────────

    pub async fn amplify(&self, post_id: &str) -> MutationOutcome {
        self.toggle::<Amplify>(post_id, None).await
    }

    pub async fn bookmark(&self, post_id: &str) -> MutationOutcome {
        self.toggle::<Bookmark>(post_id, None).await
    }

    pub async fn toggle_follow(&self, user_id: &str) -> MutationOutcome {
        self.toggle::<Follow>(user_id, None).await
    }

    pub async fn follow(&self, user_id: &str) -> MutationOutcome {
        self.toggle::<Follow>(user_id, Some(true)).await
    }

    pub async fn unfollow(&self, user_id: &str) -> MutationOutcome {
        self.toggle::<Follow>(user_id, Some(false)).await
    }

    async fn toggle<F>(&self, id: &str, target: Option<bool>) -> MutationOutcome
    where
        F: Facet,
    {
        let key = F::key(id);
        let access = self.access();
        if access == Access::Denied {
            tracing::debug!(%key, "no credential, write not attempted");
            return MutationOutcome::Skipped;
        }

        let Some(_guard) = self.in_flight.try_begin(key.clone()) else {
            tracing::debug!(%key, "mutation already in flight, rejecting");
            return MutationOutcome::Rejected;
        };

        let (pending, epoch) = {
            let mut state = self.lock();
            let epoch = state.epoch;
            let Some(record) = F::table(&mut state).get_mut(id) else {
                return MutationOutcome::Missing;
            };
            let current = F::read(record);
            if target.is_some_and(|wanted| wanted == current.is_on()) {
                return MutationOutcome::Unchanged;
            }
            let pending = Optimistic::begin(&current, |facet| facet.flipped());
            pending.applied().write(record);
            (pending, epoch)
        };

        if access == Access::LocalOnly {
            tracing::debug!(%key, "demo session, change kept local");
            return MutationOutcome::LocalOnly;
        }

        let (method, path) = pending.applied().request(id);
        let result = self
            .gateway
            .call(method, &path, None)
            .await
            .and_then(GatewayResponse::into_result);

        match result {
            Ok(resp) => {
                let snapshot = *pending.snapshot();
                let settled = pending.commit(|facet| facet.reconcile(snapshot, &resp.body));
                self.settle(id, epoch, settled);
                tracing::debug!(%key, "mutation committed");
                MutationOutcome::Committed
            }
            Err(err) => {
                tracing::warn!(%key, error = %err, "mutation failed, rolling back");
                self.settle(id, epoch, pending.revert());
                self.record_error(
                    epoch,
                    &InteractionError::Rollback {
                        key: key.to_string(),
                        reason: err.to_string(),
                    },
                );
                MutationOutcome::RolledBack
            }
        }
    }

    fn settle<F: Facet>(&self, id: &str, epoch: u64, value: F) {
        let mut state = self.lock();
        if state.epoch != epoch {
            tracing::debug!(id, "cache reset while mutation was in flight");
            return;
        }
        if let Some(record) = F::table(&mut state).get_mut(id) {
            value.write(record);
        }
    }

    // ── Backend-confirmed creation ───────────────────────────────────

    /// Append a comment once the backend has created it. Nothing is shown
    /// before confirmation, so there is nothing to roll back on failure.
    pub async fn add_comment(&self, post_id: &str, content: &str) -> MutationOutcome {
        let content = content.trim();
        if content.is_empty() {
            return MutationOutcome::Skipped;
        }

        let snapshot = self.session.load();
        let session = &snapshot.session;
        if session.is_demo() {
            tracing::debug!(post_id, "demo session cannot obtain backend comment ids");
            return MutationOutcome::Skipped;
        }
        let (Some(actor_id), Some(_), Some(profile)) =
            (session.actor_id(), session.credential(), session.profile())
        else {
            tracing::debug!(post_id, "no signed-in profile, comment not sent");
            return MutationOutcome::Skipped;
        };

        let epoch = {
            let state = self.lock();
            if !state.posts.contains_key(post_id) {
                return MutationOutcome::Missing;
            }
            state.epoch
        };

        let body = json!({
            "call_id": post_id,
            "user_id": actor_id,
            "response_text": content,
        });
        let created = self
            .gateway
            .post("/responses", Some(body))
            .await
            .and_then(GatewayResponse::into_result)
            .and_then(|resp| resp.json::<CreatedResponseEnvelope>());

        match created {
            Ok(envelope) => {
                let comment = Comment {
                    id: envelope.response.id,
                    author: CommentAuthor {
                        name: profile.username.clone(),
                        username: profile.username.clone(),
                        avatar_url: profile.avatar_url.clone(),
                    },
                    content: content.to_string(),
                    created_at: envelope.response.created_at,
                };
                let mut state = self.lock();
                if state.epoch != epoch {
                    return MutationOutcome::Skipped;
                }
                if let Some(record) = state.posts.get_mut(post_id) {
                    record.comments.push(comment);
                    record.reply_count = record.reply_count.saturating_add(1);
                }
                tracing::debug!(post_id, "comment appended");
                MutationOutcome::Committed
            }
            Err(err) => {
                tracing::warn!(post_id, error = %err, "comment creation failed");
                self.record_error(epoch, &err);
                MutationOutcome::Failed
            }
        }
    }

    /// Publish a new call and seed a zeroed record for it. Returns the
    /// backend-issued id.
    pub async fn create_call(&self, prompt: &str) -> Option<String> {
        let prompt = prompt.trim().to_string();
        self.create_post::<CreatedCallEnvelope>("call", "/calls", |actor_id| {
            json!({ "user_id": actor_id, "prompt": prompt })
        })
        .await
    }

    /// Echo `response_id` under `call_id` as a new post of the actor's own.
    /// Returns the backend-issued echo id.
    pub async fn create_echo(&self, call_id: &str, response_id: &str) -> Option<String> {
        self.create_post::<CreatedEchoEnvelope>("echo", "/echoes", |actor_id| {
            json!({ "call_id": call_id, "response_id": response_id, "user_id": actor_id })
        })
        .await
    }

    async fn create_post<P: CreatedPost>(
        &self,
        kind: &'static str,
        path: &str,
        body: impl FnOnce(&str) -> Value,
    ) -> Option<String> {
        let snapshot = self.session.load();
        let session = &snapshot.session;
        let (Some(actor_id), Some(_), false) =
            (session.actor_id(), session.credential(), session.is_demo())
        else {
            tracing::debug!(kind, "no credential, post not created");
            return None;
        };

        let epoch = self.lock().epoch;
        let created = self
            .gateway
            .post(path, Some(body(actor_id)))
            .await
            .and_then(GatewayResponse::into_result)
            .and_then(|resp| resp.json::<P>());

        match created {
            Ok(reply) => {
                if self.lock().epoch != epoch {
                    return None;
                }
                let (id, seed) = reply.into_seed();
                self.initialize_post(&id, seed);
                tracing::info!(kind, post_id = %id, "post created");
                Some(id)
            }
            Err(err) => {
                tracing::warn!(kind, error = %err, "post creation failed");
                self.record_error(epoch, &err);
                None
            }
        }
    }

    // ── Lifecycle ────────────────────────────────────────────────────

    /// Drop every record. Mutations still in flight finish against the old
    /// epoch and are discarded.
    pub fn reset(&self) {
        let mut state = self.lock();
        state.epoch += 1;
        state.posts.clear();
        state.users.clear();
        state.last_error = None;
    }

    fn access(&self) -> Access {
        let snapshot = self.session.load();
        if snapshot.session.is_demo() {
            Access::LocalOnly
        } else if snapshot.session.credential().is_some() {
            Access::Remote
        } else {
            Access::Denied
        }
    }

    fn record_error(&self, epoch: u64, err: &dyn std::fmt::Display) {
        let mut state = self.lock();
        if state.epoch == epoch {
            state.last_error = Some(err.to_string());
        }
    }

    fn lock(&self) -> MutexGuard<'_, CacheState> {
        self.state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl std::fmt::Debug for InteractionCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.lock();
        f.debug_struct("InteractionCache")
            .field("posts", &state.posts.len())
            .field("users", &state.users.len())
            .field("in_flight", &self.in_flight.len())
            .finish_non_exhaustive()
    }
}
