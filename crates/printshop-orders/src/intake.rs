//! Parsing of customer and admin form input into domain values.
//!
//! Everything here validates first and constructs second: a rejected form
//! never produces a partially-filled order or edit.

use chrono::{DateTime, Utc};
use printshop_schemas::{Document, Money, Order, OrderStatus, DEFAULT_PROFILE};
use uuid::Uuid;

use crate::error::OrderError;
use crate::repository;
use crate::state_machine::{AdminEdit, OrderLifecycle};

/// Length of generated order ids.
pub const ORDER_ID_LEN: usize = 8;
/// Longest accepted model link, in bytes.
pub const MAX_LINK_LEN: usize = 2048;

/// Customer intake form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewOrder {
    pub link: String,
    pub color: String,
    pub profile: Option<String>,
    pub name: Option<String>,
    pub notes: Option<String>,
}

/// Short opaque id not used by any order in `doc`.
pub fn generate_order_id(doc: &Document) -> String {
    loop {
        let candidate = Uuid::new_v4().simple().to_string()[..ORDER_ID_LEN].to_ascii_uppercase();
        if !repository::contains_id(doc, &candidate) {
            return candidate;
        }
    }
}

/// Validate an intake form and build the new `Pending Quote` order.
///
/// The order is not appended; the caller decides when to commit it.
pub fn create_order(
    doc: &Document,
    req: NewOrder,
    now: DateTime<Utc>,
) -> Result<Order, OrderError> {
    let link = req.link.trim();
    if link.is_empty() {
        return Err(OrderError::validation("a model link is required"));
    }
    if link.len() > MAX_LINK_LEN {
        return Err(OrderError::validation(format!(
            "model link must be at most {MAX_LINK_LEN} characters"
        )));
    }
    if !(link.starts_with("http://") || link.starts_with("https://")) {
        return Err(OrderError::validation(
            "model link must start with http:// or https://",
        ));
    }

    let color = req.color.trim();
    if color.is_empty() {
        return Err(OrderError::validation("a filament color is required"));
    }

    let profile = non_blank(req.profile).unwrap_or_else(|| DEFAULT_PROFILE.to_string());
    let mut order = Order::new(generate_order_id(doc), link, color, profile);
    if let Some(name) = req.name {
        order.rename(&name)?;
    }
    order.notes = non_blank(req.notes);
    order.created_at = Some(now);
    Ok(order)
}

/// Raw admin update form; blank fields mean "keep the prior value".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdminEditForm {
    pub status: Option<String>,
    pub print_price: Option<String>,
    pub material_fee: Option<String>,
    pub delivery_time: Option<String>,
}

/// Validate every supplied field; fails on the first bad one.
pub fn parse_admin_edit(form: AdminEditForm) -> Result<AdminEdit, OrderError> {
    let status = non_blank(form.status)
        .map(|s| s.parse::<OrderStatus>())
        .transpose()
        .map_err(|e| OrderError::validation(e.to_string()))?;
    let print_price = parse_money_field("print_price", form.print_price)?;
    let material_fee = parse_money_field("material_fee", form.material_fee)?;

    Ok(AdminEdit {
        status,
        print_price,
        material_fee,
        delivery_time: non_blank(form.delivery_time),
    })
}

fn parse_money_field(field: &str, raw: Option<String>) -> Result<Option<Money>, OrderError> {
    non_blank(raw)
        .map(|s| Money::parse(&s))
        .transpose()
        .map_err(|e| OrderError::validation(format!("{field}: {e}")))
}

fn non_blank(v: Option<String>) -> Option<String> {
    v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}
