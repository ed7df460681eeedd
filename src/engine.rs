//! Wiring of the session controller, interaction cache and search pipeline.

use crate::auth::{
    AuthSessionController, Profile, ProfileDraft, SessionEvent, SessionHandle, SignedInSession,
};
use crate::config::Config;
use crate::gateway::{HttpGateway, RequestGateway};
use crate::interactions::InteractionCache;
use crate::search::SearchPipeline;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// One instance of each engine component, sharing a single session cell and
/// a single gateway. Created once at startup.
pub struct ClientEngine {
    config: Config,
    session: SessionHandle,
    auth: AuthSessionController,
    interactions: InteractionCache,
    search: SearchPipeline,
}

impl ClientEngine {
    /// Assemble the engine around an existing gateway. `session` must be the
    /// same handle the gateway reads its credential from.
    pub fn new(config: Config, session: SessionHandle, gateway: Arc<dyn RequestGateway>) -> Self {
        let auth =
            AuthSessionController::new(session.clone(), Arc::clone(&gateway), config.demo.clone());
        let interactions = InteractionCache::new(session.clone(), Arc::clone(&gateway));
        let search = SearchPipeline::new(gateway, Duration::from_millis(config.search.debounce_ms));
        Self {
            config,
            session,
            auth,
            interactions,
            search,
        }
    }

    /// Build an [`HttpGateway`] from `config` and assemble the engine on it.
    pub fn connect(config: Config) -> Self {
        let session = SessionHandle::new();
        let gateway: Arc<dyn RequestGateway> =
            Arc::new(HttpGateway::from_config(&config, session.clone()));
        Self::new(config, session, gateway)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn session(&self) -> &SessionHandle {
        &self.session
    }

    pub fn auth(&self) -> &AuthSessionController {
        &self.auth
    }

    pub fn interactions(&self) -> &InteractionCache {
        &self.interactions
    }

    pub fn search(&self) -> &SearchPipeline {
        &self.search
    }

    /// Session carried by the configuration, if both actor id and credential
    /// are set.
    pub fn configured_session(&self) -> Option<SignedInSession> {
        match (&self.config.actor_id, &self.config.credential) {
            (Some(actor_id), Some(credential)) => {
                Some(SignedInSession::new(actor_id.clone(), credential.clone()))
            }
            _ => None,
        }
    }

    /// Resolve the configured session, if any, into a final auth state.
    pub async fn start(&self) {
        self.auth.start(self.configured_session()).await;
    }

    /// Create the profile for a signed-in actor that has none yet.
    pub async fn create_profile(&self, draft: ProfileDraft) -> crate::Result<Profile> {
        let profile = self.auth.create_profile(draft).await?;
        tracing::info!(user_id = %profile.user_id, "profile ready");
        Ok(profile)
    }

    pub fn enter_demo(&self) {
        self.reset_views();
        self.auth.enter_demo();
    }

    pub fn sign_out(&self) {
        self.auth.sign_out();
        self.reset_views();
    }

    pub async fn handle_event(&self, event: SessionEvent) {
        match event {
            SessionEvent::SignedOut => self.sign_out(),
            SessionEvent::SignedIn(signed_in) => {
                let current = self.session.load();
                if current.session.actor_id() != Some(signed_in.actor_id.as_str()) {
                    self.reset_views();
                }
                self.auth
                    .handle_event(SessionEvent::SignedIn(signed_in))
                    .await;
            }
        }
    }

    /// Forward session events until the sender side closes.
    pub async fn run(&self, mut events: mpsc::Receiver<SessionEvent>) {
        while let Some(event) = events.recv().await {
            self.handle_event(event).await;
        }
        tracing::debug!("session event stream closed");
    }

    fn reset_views(&self) {
        self.interactions.reset();
        self.search.clear();
    }
}

impl std::fmt::Debug for ClientEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientEngine")
            .field("api_base_url", &self.config.api_base_url)
            .field("state", &self.session.state())
            .finish_non_exhaustive()
    }
}
