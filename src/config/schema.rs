use crate::error::ConfigError;
use anyhow::{Context, Result};
use directories::UserDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use url::Url;

const MAX_DEBOUNCE_MS: u64 = 10_000;

// ── Top-level config ──────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Path to config.toml - computed from home, not serialized
    #[serde(skip)]
    pub config_path: PathBuf,
    /// Backend API root; request paths are joined onto it
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    /// Max tracing level for the CLI subscriber ("trace".."error")
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Bearer credential from the environment - never persisted
    #[serde(skip)]
    pub credential: Option<String>,
    /// Actor id paired with `credential` - never persisted
    #[serde(skip)]
    pub actor_id: Option<String>,

    #[serde(default)]
    pub search: SearchConfig,

    #[serde(default)]
    pub demo: DemoConfig,
}

// ── Search ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Delay between the last keystroke and the request (default: 300)
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
}

fn default_debounce_ms() -> u64 {
    300
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
        }
    }
}

// ── Demo persona ─────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DemoConfig {
    #[serde(default = "default_demo_actor_id")]
    pub actor_id: String,
    #[serde(default = "default_demo_username")]
    pub username: String,
    #[serde(default = "default_demo_avatar_url")]
    pub avatar_url: String,
    #[serde(default = "default_demo_bio")]
    pub bio: String,
}

fn default_demo_actor_id() -> String {
    "mock-user-id-123".into()
}

fn default_demo_username() -> String {
    "Demo User".into()
}

fn default_demo_avatar_url() -> String {
    "https://images.pexels.com/photos/1542083/pexels-photo-1542083.jpeg".into()
}

fn default_demo_bio() -> String {
    "This is a demo account.".into()
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            actor_id: default_demo_actor_id(),
            username: default_demo_username(),
            avatar_url: default_demo_avatar_url(),
            bio: default_demo_bio(),
        }
    }
}

fn default_api_base_url() -> String {
    "http://localhost:8000/api".into()
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_log_level() -> String {
    "info".into()
}

impl Default for Config {
    fn default() -> Self {
        let home =
            UserDirs::new().map_or_else(|| PathBuf::from("."), |u| u.home_dir().to_path_buf());
        let glitchary_dir = home.join(".glitchary");

        Self {
            config_path: glitchary_dir.join("config.toml"),
            api_base_url: default_api_base_url(),
            request_timeout_secs: default_request_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
            log_level: default_log_level(),
            credential: None,
            actor_id: None,
            search: SearchConfig::default(),
            demo: DemoConfig::default(),
        }
    }
}

impl Config {
    pub fn load_or_init() -> Result<Self> {
        let home = UserDirs::new()
            .map(|u| u.home_dir().to_path_buf())
            .context("Could not find home directory")?;
        let config_path = home.join(".glitchary").join("config.toml");
        let mut config = Self::load_or_init_at(&config_path)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Load the config at `config_path`, writing defaults there if it is absent.
    pub fn load_or_init_at(config_path: &Path) -> Result<Self> {
        if config_path.exists() {
            let contents = fs::read_to_string(config_path)
                .map_err(ConfigError::Io)
                .context("Failed to read config file")?;
            let mut config: Config = toml::from_str(&contents)
                .map_err(|e| ConfigError::Load(e.to_string()))
                .context("Failed to parse config file")?;
            // Set computed paths that are skipped during serialization
            config.config_path = config_path.to_path_buf();
            config.validate()?;
            Ok(config)
        } else {
            let config = Self {
                config_path: config_path.to_path_buf(),
                ..Self::default()
            };
            config.save()?;
            Ok(config)
        }
    }

    /// Apply environment variable overrides to config
    pub fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var("GLITCHARY_API_URL")
            && !url.is_empty()
        {
            self.api_base_url = url;
        }

        if let Ok(token) = std::env::var("GLITCHARY_TOKEN")
            && !token.trim().is_empty()
        {
            self.credential = Some(token.trim().to_string());
        }

        if let Ok(actor) = std::env::var("GLITCHARY_ACTOR_ID")
            && !actor.trim().is_empty()
        {
            self.actor_id = Some(actor.trim().to_string());
        }
    }

    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        let base = self.api_base_url.trim();
        if base.is_empty() {
            return Err(ConfigError::Validation("api_base_url is empty".into()));
        }
        let parsed = Url::parse(base)
            .map_err(|e| ConfigError::Validation(format!("api_base_url '{base}': {e}")))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ConfigError::Validation(format!(
                "api_base_url must be http(s), got '{}'",
                parsed.scheme()
            )));
        }
        if self.request_timeout_secs == 0 || self.connect_timeout_secs == 0 {
            return Err(ConfigError::Validation("timeouts must be non-zero".into()));
        }
        if self.search.debounce_ms > MAX_DEBOUNCE_MS {
            return Err(ConfigError::Validation(format!(
                "search.debounce_ms must be <= {MAX_DEBOUNCE_MS}"
            )));
        }
        Ok(())
    }

    pub fn save(&self) -> Result<()> {
        let parent = self
            .config_path
            .parent()
            .unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(parent)
            .map_err(ConfigError::Io)
            .with_context(|| format!("Failed to create config directory: {}", parent.display()))?;
        let toml_str = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::Load(e.to_string()))
            .context("Failed to serialize config")?;
        fs::write(&self.config_path, toml_str)
            .map_err(ConfigError::Io)
            .context("Failed to write config file")?;
        Ok(())
    }
}
