//! Request forms and response view models for the printshop-daemon HTTP
//! endpoints. No business logic lives here.

use chrono::{DateTime, Utc};
use printshop_orders::{state_machine::next_status, AdminEditForm, NewOrder, OrderEvent};
use printshop_schemas::{Money, Order, OrderStatus};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// /health
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub ok: bool,
    pub service: &'static str,
    pub version: &'static str,
    pub store_backend: &'static str,
}

// ---------------------------------------------------------------------------
// Errors (404 / 403 / 422)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    /// "not_found" | "conflict" | "validation" | "store_unavailable"
    pub kind: &'static str,
}

// ---------------------------------------------------------------------------
// Customer views
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct IntakeView {
    pub filaments: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct OrderView {
    pub id: String,
    pub name: String,
    pub link: String,
    pub color: String,
    pub profile: String,
    pub status: OrderStatus,
    pub print_price: Money,
    pub material_fee: Money,
    pub total: Money,
    pub delivery_time: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    /// Approve/deny buttons apply.
    pub awaiting_approval: bool,
    pub can_cancel: bool,
}

impl From<&Order> for OrderView {
    fn from(o: &Order) -> Self {
        Self {
            id: o.id.clone(),
            name: o.name.clone(),
            link: o.link.clone(),
            color: o.color.clone(),
            profile: o.profile.clone(),
            status: o.status,
            print_price: o.print_price,
            material_fee: o.material_fee,
            total: o.total(),
            delivery_time: o.delivery_time.clone(),
            created_at: o.created_at,
            notes: o.notes.clone(),
            awaiting_approval: next_status(o.status, OrderEvent::ApprovePrice).is_some(),
            can_cancel: next_status(o.status, OrderEvent::Cancel).is_some(),
        }
    }
}

/// Public production queue entry; deliberately omits links and prices.
#[derive(Debug, Clone, Serialize)]
pub struct QueueEntry {
    pub name: String,
    pub status: OrderStatus,
}

#[derive(Debug, Clone, Serialize)]
pub struct QueueView {
    pub orders: Vec<QueueEntry>,
}

// ---------------------------------------------------------------------------
// Admin views
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct LoginView {
    pub authenticated: bool,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DashboardView {
    pub orders: Vec<OrderView>,
    pub filaments: Vec<String>,
    pub include_terminal: bool,
    /// Options for the status selector.
    pub statuses: Vec<&'static str>,
}

// ---------------------------------------------------------------------------
// Forms
// ---------------------------------------------------------------------------

/// POST /submit_order. Missing fields deserialize as blank so validation
/// reports them instead of the form extractor.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SubmitOrderForm {
    #[serde(default)]
    pub link: String,
    #[serde(default)]
    pub color: String,
    pub profile: Option<String>,
    pub name: Option<String>,
    pub notes: Option<String>,
}

impl From<SubmitOrderForm> for NewOrder {
    fn from(f: SubmitOrderForm) -> Self {
        NewOrder {
            link: f.link,
            color: f.color,
            profile: f.profile,
            name: f.name,
            notes: f.notes,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CheckOrderForm {
    #[serde(default)]
    pub order_id: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NameOrderForm {
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateOrderForm {
    pub status: Option<String>,
    pub print_price: Option<String>,
    pub material_fee: Option<String>,
    pub delivery_time: Option<String>,
}

impl From<UpdateOrderForm> for AdminEditForm {
    fn from(f: UpdateOrderForm) -> Self {
        AdminEditForm {
            status: f.status,
            print_price: f.print_price,
            material_fee: f.material_fee,
            delivery_time: f.delivery_time,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateColorsForm {
    #[serde(default)]
    pub colors_list: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DashboardQuery {
    pub include_terminal: Option<bool>,
}
