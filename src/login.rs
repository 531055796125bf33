//! Credential acquisition.
//!
//! Logging in happens outside this crate (usually in a browser). A
//! [`CredentialSource`] hands the resulting cookies over; this module bounds
//! the wait and turns a usable bundle into a fresh config file.

use std::future::Future;
use std::path::Path;
use std::time::Duration;

use tokio::time::timeout;
use tracing::{info, warn};

use crate::config::ClientConfig;
use crate::credential::CredentialBundle;
use crate::error::Result;

/// How long an interactive login may take before giving up.
pub const LOGIN_TIMEOUT: Duration = Duration::from_secs(300);

/// Environment variable read by [`EnvCredentialSource`].
pub const COOKIE_ENV: &str = "BILI_COOKIE";

/// Anything that can produce a credential bundle, possibly after a long
/// user interaction.
pub trait CredentialSource: Send + Sync {
    fn acquire(&self) -> impl Future<Output = Option<CredentialBundle>> + Send;
}

/// Run `source` with a deadline. Only token-complete bundles are returned.
pub async fn acquire_credentials<S: CredentialSource>(
    source: &S,
    limit: Duration,
) -> Option<CredentialBundle> {
    match timeout(limit, source.acquire()).await {
        Ok(Some(bundle)) if bundle.is_complete() => Some(bundle),
        Ok(Some(_)) => {
            warn!("Login returned incomplete credentials");
            None
        }
        Ok(None) => None,
        Err(_) => {
            warn!("Login timed out after {:?}", limit);
            None
        }
    }
}

/// Acquire credentials and write a default config for them to `path`.
///
/// Returns `Ok(None)` when no usable credentials were obtained.
pub async fn setup_config<S: CredentialSource>(
    source: &S,
    path: impl AsRef<Path>,
    limit: Duration,
) -> Result<Option<ClientConfig>> {
    let Some(bundle) = acquire_credentials(source, limit).await else {
        return Ok(None);
    };
    let config = ClientConfig::from_credentials(bundle);
    config.save(path.as_ref())?;
    info!("Saved credentials to {}", path.as_ref().display());
    Ok(Some(config))
}

/// Reads a `Cookie` header string from the environment.
#[derive(Debug, Clone)]
pub struct EnvCredentialSource {
    var: String,
}

impl EnvCredentialSource {
    pub fn new() -> Self {
        Self {
            var: COOKIE_ENV.to_string(),
        }
    }

    pub fn with_var(var: impl Into<String>) -> Self {
        Self { var: var.into() }
    }
}

impl Default for EnvCredentialSource {
    fn default() -> Self {
        Self::new()
    }
}

impl CredentialSource for EnvCredentialSource {
    async fn acquire(&self) -> Option<CredentialBundle> {
        let header = std::env::var(&self.var).ok()?;
        Some(CredentialBundle::from_cookie_header(&header))
    }
}

/// Asks the user to paste the `Cookie` header copied from a logged-in
/// browser tab.
#[derive(Debug, Clone, Default)]
pub struct PromptCredentialSource;

impl CredentialSource for PromptCredentialSource {
    async fn acquire(&self) -> Option<CredentialBundle> {
        let line = tokio::task::spawn_blocking(|| {
            eprintln!("Log in at https://passport.bilibili.com/login in your browser,");
            eprintln!("then paste the Cookie header of any bilibili.com request:");
            let mut line = String::new();
            std::io::stdin().read_line(&mut line).map(|_| line)
        })
        .await
        .map_err(std::io::Error::other)
        .and_then(|r| r);

        match line {
            Ok(line) if !line.trim().is_empty() => {
                Some(CredentialBundle::from_cookie_header(line.trim()))
            }
            Ok(_) => None,
            Err(e) => {
                warn!("Failed to read cookie: {}", e);
                None
            }
        }
    }
}
