//! printshop-schemas
//!
//! Wire types of the remote state document. The whole persisted state is one
//! JSON document: `{ "orders": [...], "settings": { "filaments": [...] } }`.
//! Every key is optional on load; absent or `null` keys default to empty.
//! Orders are decoded one at a time: an order that does not decode is kept
//! verbatim in [`Document::unreadable_orders`] and written back on save.

mod money;

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

pub use money::{Money, MoneyError, MICROS_PER_UNIT};

/// Display label of an order the customer has not named yet.
pub const UNNAMED_ORDER: &str = "Unnamed Order";
/// Delivery estimate before the admin sets one.
pub const DEFAULT_DELIVERY_TIME: &str = "TBD";
/// Print profile used when the intake form leaves it out.
pub const DEFAULT_PROFILE: &str = "Standard";

// ---------------------------------------------------------------------------
// OrderStatus
// ---------------------------------------------------------------------------

/// Fixed set of order lifecycle states, serialized as their display names.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderStatus {
    #[default]
    #[serde(rename = "Pending Quote")]
    PendingQuote,
    #[serde(rename = "Waiting for Approval")]
    WaitingForApproval,
    #[serde(rename = "Approved")]
    Approved,
    #[serde(rename = "Price Denied")]
    PriceDenied,
    #[serde(rename = "Printing")]
    Printing,
    #[serde(rename = "Done")]
    Done,
    #[serde(rename = "Delivered")]
    Delivered,
    #[serde(rename = "Cancelled")]
    Cancelled,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 8] = [
        OrderStatus::PendingQuote,
        OrderStatus::WaitingForApproval,
        OrderStatus::Approved,
        OrderStatus::PriceDenied,
        OrderStatus::Printing,
        OrderStatus::Done,
        OrderStatus::Delivered,
        OrderStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::PendingQuote => "Pending Quote",
            OrderStatus::WaitingForApproval => "Waiting for Approval",
            OrderStatus::Approved => "Approved",
            OrderStatus::PriceDenied => "Price Denied",
            OrderStatus::Printing => "Printing",
            OrderStatus::Done => "Done",
            OrderStatus::Delivered => "Delivered",
            OrderStatus::Cancelled => "Cancelled",
        }
    }

    /// No further status-changing customer transition exists.
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Delivered | OrderStatus::Cancelled)
    }

    /// Production has started; the customer can no longer cancel.
    pub fn is_locked(&self) -> bool {
        matches!(
            self,
            OrderStatus::Printing | OrderStatus::Done | OrderStatus::Delivered
        )
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a status name is not one of [`OrderStatus::ALL`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownStatus(pub String);

impl fmt::Display for UnknownStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown order status '{}'", self.0)
    }
}

impl std::error::Error for UnknownStatus {}

impl FromStr for OrderStatus {
    type Err = UnknownStatus;

    /// Exact display name, compared case-insensitively after trimming.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        OrderStatus::ALL
            .into_iter()
            .find(|st| st.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| UnknownStatus(wanted.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Order
// ---------------------------------------------------------------------------

/// One customer print request and its fulfillment state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    #[serde(default)]
    pub id: String,
    #[serde(default = "default_name")]
    pub name: String,
    #[serde(default)]
    pub link: String,
    #[serde(default)]
    pub color: String,
    #[serde(default = "default_profile")]
    pub profile: String,
    #[serde(default)]
    pub status: OrderStatus,
    #[serde(default)]
    pub print_price: Money,
    #[serde(default)]
    pub material_fee: Money,
    #[serde(default = "default_delivery_time")]
    pub delivery_time: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl Order {
    /// A fresh `Pending Quote` order with every admin field at its default.
    pub fn new(
        id: impl Into<String>,
        link: impl Into<String>,
        color: impl Into<String>,
        profile: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: UNNAMED_ORDER.to_string(),
            link: link.into(),
            color: color.into(),
            profile: profile.into(),
            status: OrderStatus::PendingQuote,
            print_price: Money::ZERO,
            material_fee: Money::ZERO,
            delivery_time: DEFAULT_DELIVERY_TIME.to_string(),
            created_at: None,
            notes: None,
        }
    }

    /// Print price plus material fee.
    pub fn total(&self) -> Money {
        Money::from_micros(
            self.print_price
                .micros()
                .saturating_add(self.material_fee.micros()),
        )
    }
}

fn default_name() -> String {
    UNNAMED_ORDER.to_string()
}

fn default_profile() -> String {
    DEFAULT_PROFILE.to_string()
}

fn default_delivery_time() -> String {
    DEFAULT_DELIVERY_TIME.to_string()
}

// ---------------------------------------------------------------------------
// Settings / Document
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Filament/color options offered on the intake form, in admin order.
    #[serde(default, deserialize_with = "null_as_default")]
    pub filaments: Vec<String>,
}

/// A stored order that could not be decoded, kept as its raw JSON.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnreadableOrder {
    pub raw: Value,
    pub error: String,
}

impl UnreadableOrder {
    /// The stored `id`, when it is a string.
    pub fn id(&self) -> Option<&str> {
        self.raw.get("id").and_then(Value::as_str)
    }
}

/// The entire persisted state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Document {
    pub orders: Vec<Order>,
    pub settings: Settings,
    /// Stored orders that failed to decode. Never shown or edited, always
    /// saved back after the readable orders.
    pub unreadable_orders: Vec<UnreadableOrder>,
}

impl Document {
    pub fn empty() -> Self {
        Self::default()
    }
}

#[derive(Deserialize)]
struct StoredDocument {
    #[serde(default, deserialize_with = "null_as_default")]
    orders: Vec<Value>,
    #[serde(default, deserialize_with = "null_as_default")]
    settings: Settings,
}

impl<'de> Deserialize<'de> for Document {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let stored = StoredDocument::deserialize(deserializer)?;
        let mut doc = Document {
            settings: stored.settings,
            ..Document::default()
        };
        for raw in stored.orders {
            match Order::deserialize(&raw) {
                Ok(order) => doc.orders.push(order),
                Err(e) => doc.unreadable_orders.push(UnreadableOrder {
                    error: e.to_string(),
                    raw,
                }),
            }
        }
        Ok(doc)
    }
}

#[derive(Serialize)]
#[serde(untagged)]
enum StoredOrder<'a> {
    Readable(&'a Order),
    Unreadable(&'a Value),
}

impl Serialize for Document {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        #[derive(Serialize)]
        struct Out<'a> {
            orders: Vec<StoredOrder<'a>>,
            settings: &'a Settings,
        }

        let orders = self
            .orders
            .iter()
            .map(StoredOrder::Readable)
            .chain(self.unreadable_orders.iter().map(|u| StoredOrder::Unreadable(&u.raw)))
            .collect();
        Out {
            orders,
            settings: &self.settings,
        }
        .serialize(serializer)
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
