//! Order desk: every shop operation as load → mutate → save.
//!
//! Reads go through [`StoreClient::load`] and degrade to an empty document.
//! Writes are serialized by one in-process mutex and use the checked fetch
//! and replace: a write the store cannot read or accept fails with
//! [`DeskError::StoreUnavailable`] and leaves the remote document untouched.

use std::fmt;
use std::sync::Arc;

use chrono::Utc;
use printshop_orders::{
    create_order, parse_admin_edit, parse_colors_list, repository, AdminEditForm, FilamentUpdate,
    NewOrder, OrderError, OrderEvent, OrderLifecycle, OrderPolicy, Transition,
};
use printshop_schemas::{Document, Order};
use printshop_store::{StoreClient, StoreError};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::session::AdminSession;

/// Why a desk operation did not complete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeskError {
    Order(OrderError),
    /// The store could not be read or written; nothing was persisted.
    StoreUnavailable(StoreError),
}

impl DeskError {
    pub fn kind(&self) -> &'static str {
        match self {
            DeskError::Order(e) => e.kind(),
            DeskError::StoreUnavailable(_) => "store_unavailable",
        }
    }
}

impl fmt::Display for DeskError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeskError::Order(e) => write!(f, "{e}"),
            DeskError::StoreUnavailable(e) => write!(f, "nothing was saved: {e}"),
        }
    }
}

impl std::error::Error for DeskError {}

impl From<OrderError> for DeskError {
    fn from(e: OrderError) -> Self {
        DeskError::Order(e)
    }
}

/// Admin dashboard contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DashboardSnapshot {
    pub orders: Vec<Order>,
    pub filaments: Vec<String>,
}

#[derive(Clone)]
pub struct OrderDesk {
    store: StoreClient,
    policy: OrderPolicy,
    write_lock: Arc<Mutex<()>>,
}

impl fmt::Debug for OrderDesk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OrderDesk")
            .field("store", &self.store)
            .field("policy", &self.policy)
            .finish()
    }
}

impl OrderDesk {
    pub fn new(store: StoreClient, policy: OrderPolicy) -> Self {
        Self {
            store,
            policy,
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn store_backend(&self) -> &'static str {
        self.store.backend_name()
    }

    pub fn policy(&self) -> &OrderPolicy {
        &self.policy
    }

    // -----------------------------------------------------------------------
    // Customer operations
    // -----------------------------------------------------------------------

    /// Filament options for the intake form.
    pub async fn intake_options(&self) -> Vec<String> {
        repository::filaments(&self.store.load().await).to_vec()
    }

    pub async fn submit_order(&self, req: NewOrder) -> Result<Order, DeskError> {
        let order = self
            .write("submit_order", |doc| {
                let order = create_order(doc, req, Utc::now())?;
                repository::append(doc, order.clone());
                Ok((order, true))
            })
            .await?;
        info!(order_id = %order.id, color = %order.color, profile = %order.profile, "order submitted");
        Ok(order)
    }

    pub async fn get_order(&self, id: &str) -> Result<Order, OrderError> {
        let doc = self.store.load().await;
        repository::find_by_id(&doc, id)
            .cloned()
            .ok_or_else(|| OrderError::NotFound(id.to_string()))
    }

    pub async fn rename_order(&self, id: &str, name: &str) -> Result<Order, DeskError> {
        let order = self
            .write("rename_order", |doc| {
                repository::update_where(doc, id, |o| {
                    o.rename(name)?;
                    Ok((o.clone(), true))
                })
            })
            .await?;
        info!(order_id = %order.id, name = %order.name, "order renamed");
        Ok(order)
    }

    pub async fn approve_price(&self, id: &str) -> Result<Transition, DeskError> {
        self.apply_event(id, OrderEvent::ApprovePrice).await
    }

    pub async fn deny_price(&self, id: &str) -> Result<Transition, DeskError> {
        self.apply_event(id, OrderEvent::DenyPrice).await
    }

    pub async fn cancel_order(&self, id: &str) -> Result<Transition, DeskError> {
        self.apply_event(id, OrderEvent::Cancel).await
    }

    /// Orders still in the production pipeline (public queue).
    pub async fn active_queue(&self) -> Vec<Order> {
        let doc = self.store.load().await;
        repository::list_orders(&doc, false, &self.policy)
            .into_iter()
            .cloned()
            .collect()
    }

    // -----------------------------------------------------------------------
    // Admin operations
    // -----------------------------------------------------------------------

    pub async fn dashboard(&self, _admin: &AdminSession, include_terminal: bool) -> DashboardSnapshot {
        let doc = self.store.load().await;
        DashboardSnapshot {
            orders: repository::list_orders(&doc, include_terminal, &self.policy)
                .into_iter()
                .cloned()
                .collect(),
            filaments: repository::filaments(&doc).to_vec(),
        }
    }

    /// Validate the whole form, then apply every supplied field at once.
    pub async fn update_order(
        &self,
        _admin: &AdminSession,
        id: &str,
        form: AdminEditForm,
    ) -> Result<Transition, DeskError> {
        let edit = parse_admin_edit(form)?;
        let dirty = !edit.is_empty();
        let t = self
            .write("update_order", |doc| {
                repository::update_where(doc, id, |o| Ok((o.apply_admin_edit(edit), dirty)))
            })
            .await?;
        info!(order_id = %id, from = %t.from, to = %t.to, "order updated by admin");
        Ok(t)
    }

    /// Replace the filament list from a comma-separated admin entry.
    pub async fn update_filaments(
        &self,
        _admin: &AdminSession,
        colors_list: &str,
    ) -> Result<FilamentUpdate, DeskError> {
        let filaments = parse_colors_list(colors_list);
        let outcome = self
            .write("update_filaments", |doc| {
                let outcome = repository::set_filaments(doc, filaments, &self.policy);
                Ok((outcome, outcome != FilamentUpdate::RejectedEmpty))
            })
            .await?;
        match outcome {
            FilamentUpdate::Replaced { count } => info!(count, "filament list replaced"),
            FilamentUpdate::RejectedEmpty => warn!("empty filament list ignored; existing list kept"),
        }
        Ok(outcome)
    }

    pub async fn delete_order(&self, _admin: &AdminSession, id: &str) -> Result<usize, DeskError> {
        let removed = self
            .write("delete_order", |doc| match repository::delete_by_id(doc, id) {
                0 => Err(OrderError::NotFound(id.to_string())),
                n => Ok((n, true)),
            })
            .await?;
        info!(order_id = %id, removed, "order deleted");
        Ok(removed)
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    async fn apply_event(&self, id: &str, event: OrderEvent) -> Result<Transition, DeskError> {
        let result = self
            .write(event_op(event), |doc| {
                repository::update_where(doc, id, |o| {
                    let t = o.apply(event)?;
                    Ok((t, t.changed()))
                })
            })
            .await;
        match &result {
            Ok(t) => info!(order_id = %id, event = %event, from = %t.from, to = %t.to, "order transition"),
            Err(DeskError::Order(OrderError::Conflict(e))) => {
                info!(order_id = %id, event = %event, from = %e.from, "transition refused")
            }
            Err(_) => {}
        }
        result
    }

    /// Load → mutate → save under the writer lock.
    ///
    /// `mutate` returns its result plus whether the document changed; an
    /// error or an unchanged document skips the save. An unreadable store
    /// fails the write before `mutate` runs.
    async fn write<R>(
        &self,
        op: &'static str,
        mutate: impl FnOnce(&mut Document) -> Result<(R, bool), OrderError>,
    ) -> Result<R, DeskError> {
        let _guard = self.write_lock.lock().await;

        let mut doc = self.store.fetch().await.map_err(|e| {
            warn!(op, error = %e, "store load failed; write refused");
            DeskError::StoreUnavailable(e)
        })?;

        let (out, dirty) = mutate(&mut doc)?;
        if !dirty {
            debug!(op, "document unchanged; nothing to save");
            return Ok(out);
        }
        self.store.replace(&doc).await.map_err(|e| {
            warn!(op, error = %e, "store save failed; update lost");
            DeskError::StoreUnavailable(e)
        })?;
        debug!(op, orders = doc.orders.len(), "document saved");
        Ok(out)
    }
}

fn event_op(event: OrderEvent) -> &'static str {
    match event {
        OrderEvent::ApprovePrice => "approve_price",
        OrderEvent::DenyPrice => "deny_price",
        OrderEvent::Cancel => "cancel_order",
        OrderEvent::AdminSet(_) => "admin_set_status",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use printshop_schemas::OrderStatus;
    use printshop_store::MemoryStore;

    const ADMIN: AdminSession = AdminSession::for_tests();

    fn desk_with(mem: &MemoryStore) -> OrderDesk {
        OrderDesk::new(StoreClient::new(Arc::new(mem.clone())), OrderPolicy::default())
    }

    fn intake(link: &str) -> NewOrder {
        NewOrder {
            link: link.into(),
            color: "Red".into(),
            ..NewOrder::default()
        }
    }

    #[tokio::test]
    async fn submit_persists_and_get_reads_back() {
        let mem = MemoryStore::new();
        let desk = desk_with(&mem);

        let o = desk.submit_order(intake("http://example/model1")).await.unwrap();
        assert_eq!(mem.replace_count(), 1);
        assert_eq!(desk.get_order(&o.id).await.unwrap(), o);
        assert_eq!(
            desk.get_order("NOPE").await.unwrap_err(),
            OrderError::NotFound("NOPE".into())
        );
    }

    #[tokio::test]
    async fn refused_transition_saves_nothing() {
        let mem = MemoryStore::new();
        let desk = desk_with(&mem);
        let o = desk.submit_order(intake("http://example/m")).await.unwrap();

        let err = desk.approve_price(&o.id).await.unwrap_err();
        assert_eq!(err.kind(), "conflict");
        assert_eq!(mem.replace_count(), 1);
        assert_eq!(desk.get_order(&o.id).await.unwrap().status, OrderStatus::PendingQuote);
    }

    #[tokio::test]
    async fn cancelling_twice_saves_once() {
        let mem = MemoryStore::new();
        let desk = desk_with(&mem);
        let o = desk.submit_order(intake("http://example/m")).await.unwrap();

        assert!(desk.cancel_order(&o.id).await.unwrap().changed());
        assert!(!desk.cancel_order(&o.id).await.unwrap().changed());
        assert_eq!(mem.replace_count(), 2);
    }

    #[tokio::test]
    async fn outage_at_load_fails_writes_without_touching_the_store() {
        let mut seeded = Document::empty();
        seeded.settings.filaments = vec!["Red".into()];
        let mem = MemoryStore::with_document(&seeded);
        let desk = desk_with(&mem);

        mem.set_fail_fetch(true);
        let err = desk.submit_order(intake("http://example/m")).await.unwrap_err();
        assert_eq!(err.kind(), "store_unavailable");
        assert!(matches!(
            desk.update_filaments(&ADMIN, "Blue").await,
            Err(DeskError::StoreUnavailable(_))
        ));
        assert_eq!(mem.replace_count(), 0);

        mem.set_fail_fetch(false);
        assert_eq!(desk.intake_options().await, vec!["Red"]);
        assert!(desk.active_queue().await.is_empty());
    }

    #[tokio::test]
    async fn failed_save_is_reported() {
        let mem = MemoryStore::new();
        let desk = desk_with(&mem);
        let o = desk.submit_order(intake("http://example/m")).await.unwrap();

        mem.set_fail_replace(true);
        let err = desk.cancel_order(&o.id).await.unwrap_err();
        assert!(matches!(err, DeskError::StoreUnavailable(_)));
        assert_eq!(desk.get_order(&o.id).await.unwrap().status, OrderStatus::PendingQuote);
    }

    #[tokio::test]
    async fn writes_keep_orders_that_do_not_decode() {
        let mem = MemoryStore::with_raw(serde_json::json!({
            "orders": [
                { "id": "GOOD0001", "link": "http://example/a", "color": "Red", "status": "Printing" },
                { "id": "BAD00001", "link": "http://example/b", "print_price": "$25" }
            ],
            "settings": { "filaments": ["Red"] }
        }));
        let bad = mem.raw()["orders"][1].clone();
        let desk = desk_with(&mem);

        assert_eq!(desk.get_order("GOOD0001").await.unwrap().status, OrderStatus::Printing);
        assert_eq!(desk.intake_options().await, vec!["Red"]);

        let o = desk.submit_order(intake("http://example/m")).await.unwrap();
        assert_eq!(mem.replace_count(), 1);
        assert_eq!(desk.get_order(&o.id).await.unwrap(), o);

        let stored = mem.raw();
        let stored = stored["orders"].as_array().unwrap();
        assert_eq!(stored.len(), 3);
        assert!(stored.contains(&bad));
    }

    #[tokio::test]
    async fn empty_filament_update_is_ignored_under_default_policy() {
        let mem = MemoryStore::new();
        let desk = desk_with(&mem);

        desk.update_filaments(&ADMIN, "Red, Blue").await.unwrap();
        assert_eq!(
            desk.update_filaments(&ADMIN, " , ").await.unwrap(),
            FilamentUpdate::RejectedEmpty
        );
        assert_eq!(desk.intake_options().await, vec!["Red", "Blue"]);
        assert_eq!(mem.replace_count(), 1);
    }

    #[tokio::test]
    async fn dashboard_and_queue_respect_hidden_statuses() {
        let mem = MemoryStore::new();
        let desk = desk_with(&mem);
        let a = desk.submit_order(intake("http://example/a")).await.unwrap();
        let b = desk.submit_order(intake("http://example/b")).await.unwrap();
        desk.update_order(
            &ADMIN,
            &b.id,
            AdminEditForm {
                status: Some("Delivered".into()),
                ..AdminEditForm::default()
            },
        )
        .await
        .unwrap();

        let queue: Vec<_> = desk.active_queue().await.into_iter().map(|o| o.id).collect();
        assert_eq!(queue, vec![a.id.clone()]);
        assert_eq!(desk.dashboard(&ADMIN, true).await.orders.len(), 2);
        assert_eq!(desk.dashboard(&ADMIN, false).await.orders.len(), 1);
    }
}
