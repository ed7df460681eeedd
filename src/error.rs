use thiserror::Error;

// ─── Top-level error hierarchy ───────────────────────────────────────────────

/// Structured error hierarchy for `Glitchary`.
///
/// Each subsystem defines its own error variant. Fallible engine calls return
/// [`Result`]; the interaction and search components instead surface failures
/// as outcome values plus a `last_error` string. The CLI and config loading
/// wrap these in `anyhow` context chains.
#[derive(Debug, Error)]
pub enum GlitcharyError {
    // ── Config ───────────────────────────────────────────────────────────
    #[error("config: {0}")]
    Config(#[from] ConfigError),

    // ── Gateway / transport ─────────────────────────────────────────────
    #[error("gateway: {0}")]
    Gateway(#[from] GatewayError),

    // ── Auth session ────────────────────────────────────────────────────
    #[error("auth: {0}")]
    Auth(#[from] AuthError),

    // ── Interactions ────────────────────────────────────────────────────
    #[error("interaction: {0}")]
    Interaction(#[from] InteractionError),

    // ── Search ──────────────────────────────────────────────────────────
    #[error("search: {0}")]
    Search(#[from] SearchError),

    // ── Generic fallthrough (wraps anyhow for interop) ──────────────────
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

// ─── Config errors ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load config: {0}")]
    Load(String),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

// ─── Gateway errors ─────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("transport failed: {0}")]
    Transport(String),

    #[error("backend returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("failed to decode response: {0}")]
    Decode(String),

    #[error("invalid request path: {0}")]
    InvalidPath(String),
}

impl GatewayError {
    /// HTTP status carried by the error, if the backend answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

// ─── Auth errors ────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("profile lookup failed ({status:?}): {message}")]
    ProfileLookup {
        status: Option<u16>,
        message: String,
    },

    #[error("no profile exists for this actor")]
    ProfileNotFound,

    #[error("not signed in")]
    NotSignedIn,

    #[error("profile creation failed: {0}")]
    ProfileCreation(String),
}

// ─── Interaction errors ─────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum InteractionError {
    #[error("mutation on {key} rolled back: {reason}")]
    Rollback { key: String, reason: String },
}

// ─── Search errors ──────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("search request failed: {0}")]
    Transport(String),
}

// ─── Convenience re-exports ─────────────────────────────────────────────────

/// Shorthand result type for the crate.
pub type Result<T> = std::result::Result<T, GlitcharyError>;
