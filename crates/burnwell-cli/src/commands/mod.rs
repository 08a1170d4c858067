//! Subcommand implementations.

pub mod init;
pub mod questions;
pub mod status;
pub mod take;

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;

use burnwell_client::{create_backend, load_config_from, BackendConfig, BurnwellConfig};
use burnwell_core::traits::AssessmentApi;
use burnwell_core::UserContext;

/// Load config, forcing the offline backend when asked.
pub(crate) fn load(config_path: Option<&Path>, offline: bool) -> Result<BurnwellConfig> {
    let mut config = load_config_from(config_path)?;
    if offline {
        config.backend = BackendConfig::Offline;
    }
    Ok(config)
}

pub(crate) fn backend(config: &BurnwellConfig) -> Result<Arc<dyn AssessmentApi>> {
    let backend = create_backend(config)?;
    tracing::debug!(backend = backend.name(), "backend ready");
    Ok(backend)
}

/// The `--user` flag wins over `user_id` from config.
pub(crate) fn user(flag: Option<String>, config: &BurnwellConfig) -> Result<UserContext> {
    let user_id = flag
        .or_else(|| config.user_id.clone())
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| anyhow::anyhow!("no user id: pass --user or set user_id in burnwell.toml"))?;
    let user = UserContext::new(user_id);
    Ok(match &config.display_name {
        Some(name) => user.with_display_name(name.clone()),
        None => user,
    })
}
