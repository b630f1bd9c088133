//! printshop-config
//!
//! Layered YAML configuration for the print shop daemon.
//!
//! Layers are deep-merged in order (built-in defaults first, later files win),
//! converted to JSON, screened for literal secrets, canonicalised and hashed,
//! then deserialized into [`ShopConfig`]. Secrets are referenced by env var
//! NAME only and resolved once at startup (see [`secrets`]).

pub mod secrets;

use std::collections::BTreeSet;
use std::fs;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use printshop_schemas::OrderStatus;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};

pub use secrets::{resolve_secrets, resolve_secrets_with, ResolvedSecrets};

/// Built-in base layer.
pub const DEFAULTS_YAML: &str = include_str!("../config/defaults.yaml");

/// Comma-separated list of YAML files layered over the defaults.
pub const CONFIG_PATHS_ENV: &str = "PRINTSHOP_CONFIG";
/// Full bind address override (`host:port`).
pub const BIND_ADDR_ENV: &str = "PRINTSHOP_ADDR";
/// Hosting-platform port override; keeps the configured host.
pub const PORT_ENV: &str = "PORT";

/// Known secret-like prefixes. Any leaf string in the effective config that
/// starts with one of these aborts loading with CONFIG_SECRET_DETECTED.
const SECRET_PREFIXES: &[&str] = &[
    "sk-",        // OpenAI style
    "sk_live",    // Stripe live
    "sk_test",    // Stripe test
    "AKIA",       // AWS access key ID
    "-----BEGIN", // PEM private keys
    "ghp_",       // GitHub PAT
    "gho_",       // GitHub OAuth
    "glpat-",     // GitLab PAT
    "xoxb-",      // Slack bot token
    "xoxp-",      // Slack user token
    "$2a$",       // JSONBin master keys (bcrypt-shaped)
    "$2b$",
];

/// JSON-pointer prefixes the daemon actually reads. Anything else in the
/// effective config is reported by [`unused_keys`].
const CONSUMED_POINTERS: &[&str] = &[
    "/daemon/bind_addr",
    "/store/backend",
    "/store/base_url",
    "/store/bin_id_env",
    "/store/api_key_env",
    "/store/request_timeout_secs",
    "/session/secret_env",
    "/session/max_age_secs",
    "/admin/password_env",
    "/orders/protect_non_empty_filaments",
    "/orders/active_hidden_statuses",
    "/orders/dashboard_include_terminal",
];

// ---------------------------------------------------------------------------
// Typed configuration
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShopConfig {
    pub daemon: DaemonConfig,
    pub store: StoreConfig,
    pub session: SessionConfig,
    pub admin: AdminConfig,
    pub orders: OrdersConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DaemonConfig {
    pub bind_addr: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// Hosted JSON bin; needs bin id and api key secrets.
    Jsonbin,
    /// Process-local document; contents are lost on exit.
    Memory,
}

impl StoreBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            StoreBackend::Jsonbin => "jsonbin",
            StoreBackend::Memory => "memory",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    pub base_url: String,
    pub bin_id_env: String,
    pub api_key_env: String,
    pub request_timeout_secs: u64,
}

impl StoreConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    pub secret_env: String,
    pub max_age_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminConfig {
    pub password_env: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrdersConfig {
    /// Refuse to replace a filament list with an empty one.
    pub protect_non_empty_filaments: bool,
    /// Hidden from the active views (public queue, dashboard without terminal).
    pub active_hidden_statuses: Vec<OrderStatus>,
    /// Dashboard default when the request has no `include_terminal` query.
    pub dashboard_include_terminal: bool,
}

impl ShopConfig {
    /// Apply `PRINTSHOP_ADDR` / `PORT` overrides. `PRINTSHOP_ADDR` wins.
    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(addr) = lookup(BIND_ADDR_ENV).filter(|v| !v.trim().is_empty()) {
            self.daemon.bind_addr = addr.trim().to_string();
            return Ok(());
        }
        if let Some(port) = lookup(PORT_ENV).filter(|v| !v.trim().is_empty()) {
            let port: u16 = port
                .trim()
                .parse()
                .with_context(|| format!("CONFIG_INVALID: {PORT_ENV} is not a port number"))?;
            let host = match self.daemon.bind_addr.rsplit_once(':') {
                Some((host, _)) => host.to_string(),
                None => self.daemon.bind_addr.clone(),
            };
            self.daemon.bind_addr = format!("{host}:{port}");
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.daemon.bind_addr.trim().is_empty() {
            bail!("CONFIG_INVALID: daemon.bind_addr is empty");
        }
        if self.store.request_timeout_secs == 0 {
            bail!("CONFIG_INVALID: store.request_timeout_secs must be > 0");
        }
        if self.session.max_age_secs == 0 {
            bail!("CONFIG_INVALID: session.max_age_secs must be > 0");
        }
        if self.store.backend == StoreBackend::Jsonbin {
            let base = self.store.base_url.trim();
            if !(base.starts_with("http://") || base.starts_with("https://")) {
                bail!("CONFIG_INVALID: store.base_url must be an http(s) URL");
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config_hash: String,
    pub canonical_json: String,
    pub config_json: Value,
}

#[derive(Debug, Clone)]
pub struct LoadedShopConfig {
    pub config: ShopConfig,
    pub config_hash: String,
    /// Leaf pointers present in the effective config that nothing reads.
    pub unused_keys: Vec<String>,
}

/// Defaults + the files named by `PRINTSHOP_CONFIG` (if set).
pub fn load_from_env() -> Result<LoadedShopConfig> {
    let raw = std::env::var(CONFIG_PATHS_ENV).unwrap_or_default();
    let paths: Vec<&str> = raw
        .split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect();
    load_shop_config(&paths)
}

/// Defaults layered with the YAML files at `paths`, in order.
pub fn load_shop_config(paths: &[&str]) -> Result<LoadedShopConfig> {
    let mut docs: Vec<String> = vec![DEFAULTS_YAML.to_string()];
    for p in paths {
        let raw =
            fs::read_to_string(p).with_context(|| format!("failed to read yaml path: {p}"))?;
        docs.push(raw);
    }
    let doc_refs: Vec<&str> = docs.iter().map(|s| s.as_str()).collect();
    shop_config_from_strings(&doc_refs)
}

/// Typed config from already-read YAML layers. The caller supplies every
/// layer, including the defaults when wanted.
pub fn shop_config_from_strings(yaml_docs: &[&str]) -> Result<LoadedShopConfig> {
    let loaded = load_layered_yaml_from_strings(yaml_docs)?;
    let config: ShopConfig = serde_json::from_value(loaded.config_json.clone())
        .context("CONFIG_INVALID: effective config does not match the expected shape")?;
    config.validate()?;
    Ok(LoadedShopConfig {
        config,
        unused_keys: unused_keys(&loaded.config_json),
        config_hash: loaded.config_hash,
    })
}

pub fn load_layered_yaml_from_strings(yaml_docs: &[&str]) -> Result<LoadedConfig> {
    // Earlier docs are base, later docs override.
    let mut merged = serde_json::json!({});
    for raw in yaml_docs {
        let v_yaml: serde_yaml::Value = serde_yaml::from_str(raw).context("invalid yaml")?;
        let v_json = serde_json::to_value(v_yaml).context("yaml->json conversion failed")?;
        merged = deep_merge(merged, v_json);
    }

    enforce_no_secret_literals(&merged)?;

    let canonical_json = canonicalize_json(&merged)?;
    let config_hash = sha256_hex(canonical_json.as_bytes());
    Ok(LoadedConfig {
        config_hash,
        canonical_json,
        config_json: merged,
    })
}

/// Leaf pointers not covered by any consumed prefix (sorted).
pub fn unused_keys(config_json: &Value) -> Vec<String> {
    let mut leaves = Vec::new();
    collect_leaf_pointers(config_json, "", &mut leaves);

    let mut unused: BTreeSet<String> = BTreeSet::new();
    for lp in leaves {
        if !CONSUMED_POINTERS.iter().any(|cp| is_prefix_pointer(cp, &lp)) {
            unused.insert(lp);
        }
    }
    unused.into_iter().collect()
}

fn deep_merge(a: Value, b: Value) -> Value {
    match (a, b) {
        (Value::Object(mut a_map), Value::Object(b_map)) => {
            for (k, b_val) in b_map {
                let a_val = a_map.remove(&k).unwrap_or(Value::Null);
                a_map.insert(k, deep_merge(a_val, b_val));
            }
            Value::Object(a_map)
        }
        // An empty YAML layer parses as null; it must not erase the base.
        (a_other, Value::Null) if !a_other.is_null() => a_other,
        (_, b_other) => b_other,
    }
}

fn canonicalize_json(v: &Value) -> Result<String> {
    // serde_json's default map is key-sorted, so compact output is canonical.
    serde_json::to_string(v).context("canonical json serialize failed")
}

fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// "/a/b" consumes "/a/b" and "/a/b/c" but not "/a/bc".
fn is_prefix_pointer(prefix: &str, leaf: &str) -> bool {
    if leaf == prefix {
        return true;
    }
    leaf.starts_with(prefix) && leaf.as_bytes().get(prefix.len()) == Some(&b'/')
}

fn collect_leaf_pointers(v: &Value, prefix: &str, out: &mut Vec<String>) {
    match v {
        Value::Object(map) => {
            for (k, vv) in map.iter() {
                let next = format!("{}/{}", prefix, escape_pointer_token(k));
                collect_leaf_pointers(vv, &next, out);
            }
        }
        Value::Array(arr) => {
            for (i, vv) in arr.iter().enumerate() {
                collect_leaf_pointers(vv, &format!("{prefix}/{i}"), out);
            }
        }
        _ => out.push(if prefix.is_empty() {
            "/".to_string()
        } else {
            prefix.to_string()
        }),
    }
}

fn escape_pointer_token(s: &str) -> String {
    s.replace('~', "~0").replace('/', "~1")
}

fn enforce_no_secret_literals(v: &Value) -> Result<()> {
    let mut leaves = Vec::new();
    collect_leaf_pointers(v, "", &mut leaves);

    for ptr in leaves {
        if let Some(s) = v.pointer(&ptr).and_then(Value::as_str) {
            if looks_like_secret(s) {
                bail!("CONFIG_SECRET_DETECTED leaf={} value=REDACTED", ptr);
            }
        }
    }
    Ok(())
}

fn looks_like_secret(s: &str) -> bool {
    let t = s.trim();
    if t.len() < 8 {
        return false;
    }
    SECRET_PREFIXES.iter().any(|p| t.starts_with(p))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn defaults() -> ShopConfig {
        shop_config_from_strings(&[DEFAULTS_YAML]).unwrap().config
    }

    #[test]
    fn defaults_parse_and_are_fully_consumed() {
        let loaded = shop_config_from_strings(&[DEFAULTS_YAML]).unwrap();
        let cfg = &loaded.config;
        assert_eq!(cfg.store.backend, StoreBackend::Jsonbin);
        assert_eq!(cfg.store.base_url, "https://api.jsonbin.io/v3");
        assert_eq!(cfg.store.request_timeout(), Duration::from_secs(15));
        assert_eq!(cfg.session.max_age_secs, 8 * 60 * 60);
        assert!(cfg.orders.protect_non_empty_filaments);
        assert_eq!(cfg.orders.active_hidden_statuses, vec![OrderStatus::Delivered]);
        assert!(cfg.orders.dashboard_include_terminal);
        assert!(loaded.unused_keys.is_empty(), "{:?}", loaded.unused_keys);
    }

    #[test]
    fn empty_overlay_keeps_base() {
        let a = shop_config_from_strings(&[DEFAULTS_YAML]).unwrap();
        let b = shop_config_from_strings(&[DEFAULTS_YAML, ""]).unwrap();
        assert_eq!(a.config, b.config);
        assert_eq!(a.config_hash, b.config_hash);
    }

    #[test]
    fn port_override_keeps_host_and_addr_override_wins() {
        let mut cfg = defaults();
        cfg.apply_env_overrides(|k| (k == PORT_ENV).then(|| "9000".to_string()))
            .unwrap();
        assert_eq!(cfg.daemon.bind_addr, "127.0.0.1:9000");

        let mut cfg = defaults();
        cfg.apply_env_overrides(|k| match k {
            BIND_ADDR_ENV => Some("0.0.0.0:80".to_string()),
            PORT_ENV => Some("9000".to_string()),
            _ => None,
        })
        .unwrap();
        assert_eq!(cfg.daemon.bind_addr, "0.0.0.0:80");

        let mut cfg = defaults();
        let err = cfg
            .apply_env_overrides(|k| (k == PORT_ENV).then(|| "http".to_string()))
            .unwrap_err();
        assert!(err.to_string().contains("CONFIG_INVALID"), "{err}");
    }

    #[test]
    fn prefix_pointer_respects_segment_boundary() {
        assert!(is_prefix_pointer("/orders/active_hidden_statuses", "/orders/active_hidden_statuses/0"));
        assert!(is_prefix_pointer("/store/backend", "/store/backend"));
        assert!(!is_prefix_pointer("/store/backend", "/store/backends"));
    }

    #[test]
    fn jsonbin_master_key_literal_is_rejected() {
        let err = load_layered_yaml_from_strings(&[
            "store:\n  api_key_env: \"$2b$10$abcdefghijklmnopqrstuv\"\n",
        ])
        .unwrap_err();
        assert!(err.to_string().contains("CONFIG_SECRET_DETECTED"), "{err}");
        assert!(!err.to_string().contains("abcdefghijklmnop"));
    }
}
