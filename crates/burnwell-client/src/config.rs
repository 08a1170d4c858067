//! Client configuration and backend factory.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use burnwell_core::session::SessionConfig;
use burnwell_core::traits::AssessmentApi;

use crate::http::{HttpBackend, DEFAULT_BASE_URL, DEFAULT_TIMEOUT_SECS};
use crate::offline::OfflineBackend;

/// Which backend the client talks to.
///
/// The Debug impl masks the API token.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum BackendConfig {
    Http {
        #[serde(default = "default_base_url")]
        base_url: String,
        #[serde(default)]
        api_token: Option<String>,
    },
    Offline,
}

impl std::fmt::Debug for BackendConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendConfig::Http {
                base_url,
                api_token,
            } => f
                .debug_struct("Http")
                .field("base_url", base_url)
                .field("api_token", &api_token.as_ref().map(|_| "***"))
                .finish(),
            BackendConfig::Offline => f.write_str("Offline"),
        }
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        BackendConfig::Http {
            base_url: default_base_url(),
            api_token: None,
        }
    }
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

/// Top-level burnwell configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BurnwellConfig {
    /// User to run assessments as when none is given on the command line.
    #[serde(default)]
    pub user_id: Option<String>,
    /// How to address the user in the terminal.
    #[serde(default)]
    pub display_name: Option<String>,
    /// Pause after answering before moving to the next question.
    #[serde(default = "default_advance_delay")]
    pub advance_delay_ms: u64,
    /// Per-request timeout.
    #[serde(default = "default_timeout")]
    pub request_timeout_secs: u64,
    #[serde(default)]
    pub backend: BackendConfig,
}

fn default_advance_delay() -> u64 {
    300
}
fn default_timeout() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

impl Default for BurnwellConfig {
    fn default() -> Self {
        Self {
            user_id: None,
            display_name: None,
            advance_delay_ms: default_advance_delay(),
            request_timeout_secs: default_timeout(),
            backend: BackendConfig::default(),
        }
    }
}

impl BurnwellConfig {
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            advance_delay: Duration::from_millis(self.advance_delay_ms),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Resolve environment variable references like `${VAR_NAME}` in a string.
fn resolve_env_vars(s: &str) -> String {
    let mut result = s.to_string();
    while let Some(start) = result.find("${") {
        let Some(end) = result[start..].find('}') else {
            break;
        };
        let var_name = &result[start + 2..start + end];
        let value = std::env::var(var_name).unwrap_or_default();
        result = format!("{}{}{}", &result[..start], value, &result[start + end + 1..]);
    }
    result
}

fn resolve_backend_config(config: &BackendConfig) -> BackendConfig {
    match config {
        BackendConfig::Http {
            base_url,
            api_token,
        } => BackendConfig::Http {
            base_url: resolve_env_vars(base_url),
            api_token: api_token
                .as_deref()
                .map(resolve_env_vars)
                .filter(|t| !t.is_empty()),
        },
        BackendConfig::Offline => BackendConfig::Offline,
    }
}

/// Apply `BURNWELL_*` overrides. `lookup` is `std::env::var` outside tests.
fn apply_env_overrides(config: &mut BurnwellConfig, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(url) = lookup("BURNWELL_API_URL") {
        let api_token = match &config.backend {
            BackendConfig::Http { api_token, .. } => api_token.clone(),
            BackendConfig::Offline => None,
        };
        config.backend = BackendConfig::Http {
            base_url: url,
            api_token,
        };
    }

    if let Some(token) = lookup("BURNWELL_API_TOKEN") {
        if let BackendConfig::Http { api_token, .. } = &mut config.backend {
            *api_token = Some(token);
        }
    }

    if let Some(user) = lookup("BURNWELL_USER_ID") {
        config.user_id = Some(user);
    }
}

/// Load configuration from well-known paths.
///
/// Search order:
/// 1. `burnwell.toml` in the current directory
/// 2. `~/.config/burnwell/config.toml`
///
/// Environment variable overrides: `BURNWELL_API_URL`, `BURNWELL_API_TOKEN`,
/// `BURNWELL_USER_ID`.
pub fn load_config() -> Result<BurnwellConfig> {
    load_config_from(None)
}

/// Load config from an explicit path, or search the default locations.
pub fn load_config_from(path: Option<&Path>) -> Result<BurnwellConfig> {
    let config_path = match path {
        Some(p) if p.exists() => Some(p.to_path_buf()),
        Some(p) => anyhow::bail!("config file not found: {}", p.display()),
        None => {
            let local = PathBuf::from("burnwell.toml");
            if local.exists() {
                Some(local)
            } else {
                dirs_path()
                    .map(|dir| dir.join("config.toml"))
                    .filter(|global| global.exists())
            }
        }
    };

    let mut config = match config_path {
        Some(path) => parse_config_file(&path)?,
        None => BurnwellConfig::default(),
    };

    apply_env_overrides(&mut config, |name| std::env::var(name).ok());
    config.backend = resolve_backend_config(&config.backend);

    Ok(config)
}

fn parse_config_file(path: &Path) -> Result<BurnwellConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config: {}", path.display()))?;
    toml::from_str::<BurnwellConfig>(&content)
        .with_context(|| format!("failed to parse config: {}", path.display()))
}

fn dirs_path() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(|h| PathBuf::from(h).join(".config").join("burnwell"))
}

/// Create a backend instance from configuration.
pub fn create_backend(config: &BurnwellConfig) -> Result<Arc<dyn AssessmentApi>> {
    match &config.backend {
        BackendConfig::Http {
            base_url,
            api_token,
        } => {
            let backend = HttpBackend::new(base_url, api_token.clone(), config.request_timeout())
                .with_context(|| format!("failed to create HTTP backend for {base_url}"))?;
            Ok(Arc::new(backend))
        }
        BackendConfig::Offline => Ok(Arc::new(OfflineBackend::new())),
    }
}
