//! Order status state machine.
//!
//! # Design
//!
//! Every status change goes through [`OrderLifecycle::apply`]. Customer events
//! are checked against the current status; illegal events return a
//! [`TransitionError`] and leave the order untouched. The admin event
//! ([`OrderEvent::AdminSet`]) carries override authority and is accepted from
//! every state.
//!
//! # State diagram
//!
//! ```text
//!   new ──► Pending Quote ──(admin)──► Waiting for Approval ──ApprovePrice──► Approved
//!                                              │
//!                                              └──────────DenyPrice────────► Price Denied
//!
//!   any ──(admin)──► Printing ──(admin)──► Done ──(admin)──► Delivered (term.)
//!
//!   any except {Printing, Done, Delivered} ──Cancel──► Cancelled (term.)
//! ```
//!
//! Field edits that are not status changes live here too, so that no other
//! code path needs write access to `status`:
//! - [`OrderLifecycle::apply_admin_edit`]: status + price + fee + delivery as
//!   one atomic replace.
//! - [`OrderLifecycle::rename`]: label only, any state, either party.

use std::fmt;

use printshop_schemas::{Money, Order, OrderStatus, UNNAMED_ORDER};

use crate::error::OrderError;

/// Longest accepted order name, in characters.
pub const MAX_NAME_CHARS: usize = 120;

// ---------------------------------------------------------------------------
// OrderEvent
// ---------------------------------------------------------------------------

/// Events that drive status transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderEvent {
    /// Admin sets the status directly (any state → any status).
    AdminSet(OrderStatus),
    /// Customer accepts the quoted price.
    ApprovePrice,
    /// Customer rejects the quoted price.
    DenyPrice,
    /// Customer withdraws the order.
    Cancel,
}

impl fmt::Display for OrderEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderEvent::AdminSet(st) => write!(f, "admin_set({st})"),
            OrderEvent::ApprovePrice => f.write_str("approve_price"),
            OrderEvent::DenyPrice => f.write_str("deny_price"),
            OrderEvent::Cancel => f.write_str("cancel"),
        }
    }
}

// ---------------------------------------------------------------------------
// TransitionError / Transition
// ---------------------------------------------------------------------------

/// Returned when an event cannot legally be applied in the current status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionError {
    pub order_id: String,
    /// The status the order was in when the event arrived.
    pub from: OrderStatus,
    pub event: OrderEvent,
}

impl fmt::Display for TransitionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.event {
            OrderEvent::Cancel => write!(
                f,
                "order {} cannot be cancelled while {}",
                self.order_id, self.from
            ),
            OrderEvent::ApprovePrice | OrderEvent::DenyPrice => write!(
                f,
                "order {} has no price awaiting approval (status: {})",
                self.order_id, self.from
            ),
            OrderEvent::AdminSet(_) => write!(
                f,
                "illegal order transition: {} + {}",
                self.from, self.event
            ),
        }
    }
}

impl std::error::Error for TransitionError {}

/// A status change that was applied (`from == to` for no-op edits).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: OrderStatus,
    pub to: OrderStatus,
}

impl Transition {
    pub fn changed(&self) -> bool {
        self.from != self.to
    }
}

/// Status an event leads to from `from`, or `None` when illegal.
pub fn next_status(from: OrderStatus, event: OrderEvent) -> Option<OrderStatus> {
    use OrderEvent::*;
    use OrderStatus::*;

    match (from, event) {
        (_, AdminSet(to)) => Some(to),

        (WaitingForApproval, ApprovePrice) => Some(Approved),
        (WaitingForApproval, DenyPrice) => Some(PriceDenied),

        (st, Cancel) if !st.is_locked() => Some(Cancelled),

        _ => None,
    }
}

// ---------------------------------------------------------------------------
// AdminEdit
// ---------------------------------------------------------------------------

/// One admin update of an order. `None` fields keep their prior value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdminEdit {
    pub status: Option<OrderStatus>,
    pub print_price: Option<Money>,
    pub material_fee: Option<Money>,
    pub delivery_time: Option<String>,
}

impl AdminEdit {
    pub fn is_empty(&self) -> bool {
        self.status.is_none()
            && self.print_price.is_none()
            && self.material_fee.is_none()
            && self.delivery_time.is_none()
    }
}

// ---------------------------------------------------------------------------
// OrderLifecycle
// ---------------------------------------------------------------------------

/// State-machine operations on an [`Order`].
pub trait OrderLifecycle {
    /// Apply a status event. Errors leave the order unchanged.
    fn apply(&mut self, event: OrderEvent) -> Result<Transition, TransitionError>;

    /// Apply an already-validated admin edit in one step.
    fn apply_admin_edit(&mut self, edit: AdminEdit) -> Transition;

    /// Set the display name. Blank names reset to [`UNNAMED_ORDER`].
    fn rename(&mut self, name: &str) -> Result<(), OrderError>;
}

impl OrderLifecycle for Order {
    fn apply(&mut self, event: OrderEvent) -> Result<Transition, TransitionError> {
        let from = self.status;
        let to = next_status(from, event).ok_or_else(|| TransitionError {
            order_id: self.id.clone(),
            from,
            event,
        })?;
        self.status = to;
        Ok(Transition { from, to })
    }

    fn apply_admin_edit(&mut self, edit: AdminEdit) -> Transition {
        let from = self.status;
        if let Some(status) = edit.status {
            self.status = status;
        }
        if let Some(price) = edit.print_price {
            self.print_price = price;
        }
        if let Some(fee) = edit.material_fee {
            self.material_fee = fee;
        }
        if let Some(delivery) = edit.delivery_time {
            self.delivery_time = delivery;
        }
        Transition {
            from,
            to: self.status,
        }
    }

    fn rename(&mut self, name: &str) -> Result<(), OrderError> {
        let name = name.trim();
        if name.chars().count() > MAX_NAME_CHARS {
            return Err(OrderError::validation(format!(
                "name must be at most {MAX_NAME_CHARS} characters"
            )));
        }
        self.name = if name.is_empty() {
            UNNAMED_ORDER.to_string()
        } else {
            name.to_string()
        };
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
