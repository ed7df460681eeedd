use arc_swap::ArcSwap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::watch;

/// Backend profile of an actor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub user_id: String,
    pub username: String,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
}

/// Identity delivered by the sign-in provider.
#[derive(Clone, PartialEq, Eq)]
pub struct SignedInSession {
    pub actor_id: String,
    pub credential: String,
}

impl SignedInSession {
    pub fn new(actor_id: impl Into<String>, credential: impl Into<String>) -> Self {
        Self {
            actor_id: actor_id.into(),
            credential: credential.into(),
        }
    }
}

impl std::fmt::Debug for SignedInSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignedInSession")
            .field("actor_id", &self.actor_id)
            .finish_non_exhaustive()
    }
}

/// Who the current actor is.
///
/// Fields are private; the constructors are the only way to build one, which
/// keeps two rules true for every value: a demo session holds no credential,
/// and `has_profile()` implies an actor id.
#[derive(Clone, Default, PartialEq, Eq, Serialize)]
pub struct AuthSession {
    actor_id: Option<String>,
    #[serde(skip_serializing)]
    credential: Option<String>,
    is_demo: bool,
    profile: Option<Profile>,
}

impl AuthSession {
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// Signed in, profile not (yet) known.
    pub fn without_profile(signed_in: SignedInSession) -> Self {
        Self {
            actor_id: Some(signed_in.actor_id),
            credential: Some(signed_in.credential),
            is_demo: false,
            profile: None,
        }
    }

    pub fn with_profile(signed_in: SignedInSession, profile: Profile) -> Self {
        Self {
            actor_id: Some(signed_in.actor_id),
            credential: Some(signed_in.credential),
            is_demo: false,
            profile: Some(profile),
        }
    }

    pub fn demo(profile: Profile) -> Self {
        Self {
            actor_id: Some(profile.user_id.clone()),
            credential: None,
            is_demo: true,
            profile: Some(profile),
        }
    }

    pub fn actor_id(&self) -> Option<&str> {
        self.actor_id.as_deref()
    }

    pub fn credential(&self) -> Option<&str> {
        self.credential.as_deref()
    }

    pub fn is_demo(&self) -> bool {
        self.is_demo
    }

    pub fn has_profile(&self) -> bool {
        self.profile.is_some()
    }

    pub fn profile(&self) -> Option<&Profile> {
        self.profile.as_ref()
    }

    pub fn is_anonymous(&self) -> bool {
        self.actor_id.is_none()
    }

    /// The sign-in identity, when this session carries a real credential.
    pub fn signed_in(&self) -> Option<SignedInSession> {
        match (&self.actor_id, &self.credential) {
            (Some(actor_id), Some(credential)) => {
                Some(SignedInSession::new(actor_id.clone(), credential.clone()))
            }
            _ => None,
        }
    }
}

impl std::fmt::Debug for AuthSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthSession")
            .field("actor_id", &self.actor_id)
            .field("credential", &self.credential.as_ref().map(|_| "<redacted>"))
            .field("is_demo", &self.is_demo)
            .field("profile", &self.profile)
            .finish()
    }
}

/// The five resolution states of the session controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, strum::Display)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum AuthState {
    #[default]
    Unknown,
    Resolving,
    Anonymous,
    AuthenticatedNoProfile,
    AuthenticatedWithProfile,
}

/// Where the UI should send the user for the current state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum::Display)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Route {
    Loading,
    SignIn,
    CreateProfile,
    Feed,
}

impl From<AuthState> for Route {
    fn from(state: AuthState) -> Self {
        match state {
            AuthState::Unknown | AuthState::Resolving => Self::Loading,
            AuthState::Anonymous => Self::SignIn,
            AuthState::AuthenticatedNoProfile => Self::CreateProfile,
            AuthState::AuthenticatedWithProfile => Self::Feed,
        }
    }
}

/// State and session, always replaced together.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SessionSnapshot {
    pub state: AuthState,
    pub session: AuthSession,
    pub last_error: Option<String>,
}

impl SessionSnapshot {
    pub fn unknown() -> Self {
        Self::default()
    }

    pub fn resolving(session: AuthSession) -> Self {
        Self {
            state: AuthState::Resolving,
            session,
            last_error: None,
        }
    }

    pub fn anonymous(last_error: Option<String>) -> Self {
        Self {
            state: AuthState::Anonymous,
            session: AuthSession::anonymous(),
            last_error,
        }
    }

    pub fn no_profile(signed_in: SignedInSession) -> Self {
        Self {
            state: AuthState::AuthenticatedNoProfile,
            session: AuthSession::without_profile(signed_in),
            last_error: None,
        }
    }

    pub fn with_profile(session: AuthSession) -> Self {
        debug_assert!(session.has_profile());
        Self {
            state: AuthState::AuthenticatedWithProfile,
            session,
            last_error: None,
        }
    }

    pub fn route(&self) -> Route {
        Route::from(self.state)
    }
}

/// Shared, lock-free cell holding the current [`SessionSnapshot`].
///
/// Readers load a whole snapshot; writers swap the pointer. The gateway reads
/// the credential on every request, so `load` stays on the `ArcSwap` and never
/// touches the `watch` lock. Subscribers get a `watch` notification carrying
/// the same `Arc`. Both cells are written while holding the `watch` write lock,
/// so concurrent stores cannot leave them disagreeing.
#[derive(Clone)]
pub struct SessionHandle {
    inner: Arc<ArcSwap<SessionSnapshot>>,
    changes: watch::Sender<Arc<SessionSnapshot>>,
}

impl SessionHandle {
    pub fn new() -> Self {
        let initial = Arc::new(SessionSnapshot::unknown());
        let (changes, _) = watch::channel(Arc::clone(&initial));
        Self {
            inner: Arc::new(ArcSwap::new(initial)),
            changes,
        }
    }

    /// Current snapshot. Lock-free.
    pub fn load(&self) -> Arc<SessionSnapshot> {
        self.inner.load_full()
    }

    pub fn state(&self) -> AuthState {
        self.inner.load().state
    }

    pub fn credential(&self) -> Option<String> {
        self.inner.load().session.credential().map(ToOwned::to_owned)
    }

    /// Atomically replace the snapshot.
    pub fn store(&self, snapshot: SessionSnapshot) {
        let snapshot = Arc::new(snapshot);
        self.changes.send_modify(|current| {
            self.inner.store(Arc::clone(&snapshot));
            *current = snapshot;
        });
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<SessionSnapshot>> {
        self.changes.subscribe()
    }
}

impl Default for SessionHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SessionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionHandle")
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}
