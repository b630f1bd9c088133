//! Shared runtime state for printshop-daemon.
//!
//! Handlers receive `State<Arc<AppState>>` from axum. Everything mutable lives
//! in the remote document; the only in-process shared state is the desk's
//! writer lock.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use printshop_config::{ResolvedSecrets, ShopConfig, StoreBackend};
use printshop_orders::OrderPolicy;
use printshop_store::{DocumentStore, JsonBinStore, MemoryStore, StoreClient};

use crate::desk::OrderDesk;
use crate::session::SessionGate;

/// Static build metadata included in health responses.
#[derive(Clone, Debug)]
pub struct BuildInfo {
    pub service: &'static str,
    pub version: &'static str,
}

impl Default for BuildInfo {
    fn default() -> Self {
        Self {
            service: "printshop-daemon",
            version: env!("CARGO_PKG_VERSION"),
        }
    }
}

#[derive(Clone, Debug)]
pub struct AppState {
    pub build: BuildInfo,
    pub desk: OrderDesk,
    pub gate: SessionGate,
    /// Dashboard default when the request has no `include_terminal` query.
    pub dashboard_include_terminal: bool,
}

impl AppState {
    pub fn new(desk: OrderDesk, gate: SessionGate, dashboard_include_terminal: bool) -> Self {
        Self {
            build: BuildInfo::default(),
            desk,
            gate,
            dashboard_include_terminal,
        }
    }

    /// Wire the store backend, order policy and session gate from config.
    pub fn from_config(cfg: &ShopConfig, secrets: &ResolvedSecrets) -> anyhow::Result<Self> {
        let store = StoreClient::new(build_store(cfg, secrets)?);
        let policy = OrderPolicy {
            protect_non_empty_filaments: cfg.orders.protect_non_empty_filaments,
            active_hidden_statuses: cfg.orders.active_hidden_statuses.clone(),
        };
        let gate = SessionGate::new(
            &secrets.session_secret,
            &secrets.admin_password,
            Duration::from_secs(cfg.session.max_age_secs),
        )
        .context("session gate setup failed")?;

        Ok(Self::new(
            OrderDesk::new(store, policy),
            gate,
            cfg.orders.dashboard_include_terminal,
        ))
    }
}

fn build_store(
    cfg: &ShopConfig,
    secrets: &ResolvedSecrets,
) -> anyhow::Result<Arc<dyn DocumentStore>> {
    match cfg.store.backend {
        StoreBackend::Jsonbin => {
            let bin_id = secrets
                .store_bin_id
                .clone()
                .context("jsonbin backend requires a bin id")?;
            let api_key = secrets
                .store_api_key
                .clone()
                .context("jsonbin backend requires an api key")?;
            let store = JsonBinStore::new(
                cfg.store.base_url.clone(),
                bin_id,
                api_key,
                cfg.store.request_timeout(),
            )
            .context("jsonbin store setup failed")?;
            Ok(Arc::new(store))
        }
        StoreBackend::Memory => Ok(Arc::new(MemoryStore::new())),
    }
}
