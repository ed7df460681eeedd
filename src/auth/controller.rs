use super::session::{
    AuthSession, AuthState, Profile, Route, SessionHandle, SessionSnapshot, SignedInSession,
};
use crate::config::DemoConfig;
use crate::error::{AuthError, GatewayError};
use crate::gateway::{Method, RequestGateway};
use serde::Deserialize;
use serde_json::json;
use std::sync::{Arc, Mutex};
use tokio::sync::watch;

/// Push notification from the sign-in provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    SignedIn(SignedInSession),
    SignedOut,
}

/// Fields collected by the profile creation flow.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileDraft {
    pub username: String,
    pub bio: Option<String>,
    pub avatar_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProfileEnvelope {
    profile: Profile,
}

/// Sole writer of "who is the current actor".
///
/// Every transition is a single [`SessionHandle::store`] of a complete
/// snapshot. Each entry into `Resolving` takes a new generation number; a
/// profile lookup may only commit while its generation is still current, so a
/// sign-out or newer sign-in that lands mid-lookup always wins.
pub struct AuthSessionController {
    session: SessionHandle,
    gateway: Arc<dyn RequestGateway>,
    demo: DemoConfig,
    generation: Mutex<u64>,
}

impl AuthSessionController {
    pub fn new(session: SessionHandle, gateway: Arc<dyn RequestGateway>, demo: DemoConfig) -> Self {
        Self {
            session,
            gateway,
            demo,
            generation: Mutex::new(0),
        }
    }

    pub fn snapshot(&self) -> Arc<SessionSnapshot> {
        self.session.load()
    }

    pub fn state(&self) -> AuthState {
        self.session.state()
    }

    pub fn route(&self) -> Route {
        Route::from(self.state())
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<SessionSnapshot>> {
        self.session.subscribe()
    }

    pub fn handle(&self) -> &SessionHandle {
        &self.session
    }

    /// Startup check: `existing` is whatever session the sign-in provider
    /// already holds.
    pub async fn start(&self, existing: Option<SignedInSession>) {
        self.resolve(existing).await;
    }

    pub async fn handle_event(&self, event: SessionEvent) {
        match event {
            SessionEvent::SignedIn(signed_in) => self.resolve(Some(signed_in)).await,
            SessionEvent::SignedOut => self.sign_out(),
        }
    }

    /// Land directly in `AuthenticatedWithProfile` as the demo persona. No
    /// network call is made and no credential is ever attached.
    pub fn enter_demo(&self) {
        let profile = Profile {
            user_id: self.demo.actor_id.clone(),
            username: self.demo.username.clone(),
            avatar_url: Some(self.demo.avatar_url.clone()),
            bio: Some(self.demo.bio.clone()),
        };
        self.commit_next(SessionSnapshot::with_profile(AuthSession::demo(profile)));
        tracing::info!(actor_id = %self.demo.actor_id, "entered demo session");
    }

    /// Unconditional transition to `Anonymous` with every session field cleared.
    pub fn sign_out(&self) {
        self.commit_next(SessionSnapshot::anonymous(None));
        tracing::info!("signed out");
    }

    /// Profile was created elsewhere; promote the pending session.
    pub fn profile_created(&self, profile: Profile) -> bool {
        let mut generation = self.lock_generation();
        let current = self.session.load();
        if current.state != AuthState::AuthenticatedNoProfile
            || current.session.actor_id() != Some(profile.user_id.as_str())
        {
            tracing::debug!(state = %current.state, "ignoring profile for inactive actor");
            return false;
        }
        let Some(signed_in) = current.session.signed_in() else {
            return false;
        };
        *generation += 1;
        self.session.store(SessionSnapshot::with_profile(AuthSession::with_profile(
            signed_in, profile,
        )));
        tracing::info!("profile attached to session");
        true
    }

    /// Create the backend profile for an actor in `AuthenticatedNoProfile`.
    ///
    /// A 409 means the profile already exists, which is resolved by looking it
    /// up again. Any other failure keeps the state and records `last_error`.
    pub async fn create_profile(&self, draft: ProfileDraft) -> Result<Profile, AuthError> {
        let current = self.session.load();
        let (Some(signed_in), AuthState::AuthenticatedNoProfile) =
            (current.session.signed_in(), current.state)
        else {
            return Err(AuthError::NotSignedIn);
        };
        let generation = *self.lock_generation();

        let body = json!({
            "user_id": signed_in.actor_id,
            "username": draft.username.trim(),
            "bio": draft.bio,
            "avatar_url": draft.avatar_url,
        });
        let created = match self.gateway.post("/profiles", Some(body)).await {
            Ok(resp) if resp.is_success() => resp
                .json::<ProfileEnvelope>()
                .map(|envelope| envelope.profile)
                .map_err(|e| AuthError::ProfileCreation(e.to_string())),
            Ok(resp) if resp.status == 409 => {
                tracing::debug!("profile already exists, looking it up");
                self.lookup_profile(&signed_in.actor_id).await
            }
            Ok(resp) => Err(AuthError::ProfileCreation(
                GatewayError::Status {
                    status: resp.status,
                    body: resp.body.to_string(),
                }
                .to_string(),
            )),
            Err(e) => Err(AuthError::ProfileCreation(e.to_string())),
        };

        match created {
            Ok(profile) => {
                let committed = self.commit_if_current(
                    generation,
                    SessionSnapshot::with_profile(AuthSession::with_profile(
                        signed_in,
                        profile.clone(),
                    )),
                );
                if !committed {
                    return Err(AuthError::NotSignedIn);
                }
                tracing::info!("profile created");
                Ok(profile)
            }
            Err(err) => {
                tracing::warn!(error = %err, "profile creation failed");
                self.commit_if_current(
                    generation,
                    SessionSnapshot {
                        last_error: Some(err.to_string()),
                        ..SessionSnapshot::no_profile(signed_in)
                    },
                );
                Err(err)
            }
        }
    }

    async fn resolve(&self, existing: Option<SignedInSession>) {
        let Some(signed_in) = existing else {
            self.commit_next(SessionSnapshot::anonymous(None));
            tracing::debug!("no session present");
            return;
        };

        // The credential is visible while resolving so the lookup is authorized.
        let generation = self.commit_next(SessionSnapshot::resolving(
            AuthSession::without_profile(signed_in.clone()),
        ));
        tracing::debug!(actor_id = %signed_in.actor_id, generation, "resolving session");

        let next = match self.lookup_profile(&signed_in.actor_id).await {
            Ok(profile) => {
                SessionSnapshot::with_profile(AuthSession::with_profile(signed_in, profile))
            }
            Err(AuthError::ProfileNotFound) => SessionSnapshot::no_profile(signed_in),
            Err(err) => {
                tracing::error!(error = %err, "profile lookup failed, clearing session");
                SessionSnapshot::anonymous(Some(err.to_string()))
            }
        };

        let state = next.state;
        if self.commit_if_current(generation, next) {
            tracing::info!(%state, "session resolved");
        } else {
            tracing::debug!(generation, "discarding superseded profile lookup");
        }
    }

    async fn lookup_profile(&self, actor_id: &str) -> Result<Profile, AuthError> {
        let response = self
            .gateway
            .call(Method::GET, &format!("/profiles/{actor_id}"), None)
            .await
            .map_err(|e| AuthError::ProfileLookup {
                status: None,
                message: e.to_string(),
            })?;

        match response.status {
            404 => Err(AuthError::ProfileNotFound),
            status if !response.is_success() => Err(AuthError::ProfileLookup {
                status: Some(status),
                message: response.body.to_string(),
            }),
            status => response
                .json::<ProfileEnvelope>()
                .map(|envelope| envelope.profile)
                .map_err(|e| AuthError::ProfileLookup {
                    status: Some(status),
                    message: e.to_string(),
                }),
        }
    }

    fn lock_generation(&self) -> std::sync::MutexGuard<'_, u64> {
        self.generation
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Start a new generation and store `snapshot` under it.
    fn commit_next(&self, snapshot: SessionSnapshot) -> u64 {
        let mut generation = self.lock_generation();
        *generation += 1;
        self.session.store(snapshot);
        *generation
    }

    fn commit_if_current(&self, expected: u64, snapshot: SessionSnapshot) -> bool {
        let generation = self.lock_generation();
        if *generation != expected {
            return false;
        }
        self.session.store(snapshot);
        true
    }
}
