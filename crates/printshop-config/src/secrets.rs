//! Runtime secret resolution.
//!
//! # Contract
//! - Config YAML stores only env var NAMES (e.g. `store.api_key_env: "API_KEY"`).
//! - At startup `main` calls [`resolve_secrets`] once and passes the result
//!   into constructors; nothing else reads these variables.
//! - `Debug` on [`ResolvedSecrets`] redacts every value.
//! - Error messages name the env var, never its value.
//!
//! | Backend   | Required                                              |
//! |-----------|-------------------------------------------------------|
//! | `jsonbin` | bin id, store api key, session secret, admin password |
//! | `memory`  | session secret, admin password                        |

use anyhow::{bail, Result};

use crate::{ShopConfig, StoreBackend};

/// Secrets for one daemon process. Values are redacted in `Debug` output.
#[derive(Clone)]
pub struct ResolvedSecrets {
    /// `None` only with the memory backend.
    pub store_bin_id: Option<String>,
    /// `None` only with the memory backend.
    pub store_api_key: Option<String>,
    pub session_secret: String,
    pub admin_password: String,
}

impl std::fmt::Debug for ResolvedSecrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedSecrets")
            .field("store_bin_id", &self.store_bin_id)
            .field(
                "store_api_key",
                &self.store_api_key.as_ref().map(|_| "<REDACTED>"),
            )
            .field("session_secret", &"<REDACTED>")
            .field("admin_password", &"<REDACTED>")
            .finish()
    }
}

/// Unset or blank variables count as missing.
fn resolve_env(var_name: &str) -> Option<String> {
    match std::env::var(var_name) {
        Ok(v) if !v.trim().is_empty() => Some(v),
        _ => None,
    }
}

/// Resolve secrets from the process environment.
pub fn resolve_secrets(cfg: &ShopConfig) -> Result<ResolvedSecrets> {
    resolve_secrets_with(cfg, resolve_env)
}

/// Resolve secrets through `lookup` (env var name → value).
///
/// # Errors
/// `SECRETS_MISSING` naming the first required variable that is absent.
pub fn resolve_secrets_with(
    cfg: &ShopConfig,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<ResolvedSecrets> {
    let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
    let backend = cfg.store.backend.as_str();

    let require = |name: &str, what: &str| -> Result<String> {
        match get(name) {
            Some(v) => Ok(v),
            None => bail!(
                "SECRETS_MISSING backend={}: required env var '{}' ({}) is not set or empty",
                backend,
                name,
                what,
            ),
        }
    };

    let (store_bin_id, store_api_key) = match cfg.store.backend {
        StoreBackend::Jsonbin => (
            Some(require(&cfg.store.bin_id_env, "store bin id")?.trim().to_string()),
            Some(require(&cfg.store.api_key_env, "store api key")?),
        ),
        StoreBackend::Memory => (None, None),
    };

    Ok(ResolvedSecrets {
        store_bin_id,
        store_api_key,
        session_secret: require(&cfg.session.secret_env, "session secret")?,
        admin_password: require(&cfg.admin.password_env, "admin password")?,
    })
}
