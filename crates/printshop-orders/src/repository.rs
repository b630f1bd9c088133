//! In-memory operations over a freshly loaded [`Document`].
//!
//! Callers load the whole document, use these functions to locate and mutate
//! entities, and then save the whole document back. Nothing here performs I/O.

use printshop_schemas::{Document, Order};

use crate::error::OrderError;
use crate::policy::OrderPolicy;

/// First order with exactly this id.
pub fn find_by_id<'a>(doc: &'a Document, id: &str) -> Option<&'a Order> {
    doc.orders.iter().find(|o| o.id == id)
}

pub fn find_by_id_mut<'a>(doc: &'a mut Document, id: &str) -> Option<&'a mut Order> {
    doc.orders.iter_mut().find(|o| o.id == id)
}

/// Also true for ids held by orders that could not be decoded, so a new id
/// never shadows a stored one.
pub fn contains_id(doc: &Document, id: &str) -> bool {
    find_by_id(doc, id).is_some() || doc.unreadable_orders.iter().any(|u| u.id() == Some(id))
}

/// Add to the end of the collection; arrival order is listing order.
pub fn append(doc: &mut Document, order: Order) {
    doc.orders.push(order);
}

/// Run `mutator` on the matching order.
///
/// The mutator's own error aborts the update; since mutators validate before
/// writing, an `Err` means the order is unchanged.
pub fn update_where<R>(
    doc: &mut Document,
    id: &str,
    mutator: impl FnOnce(&mut Order) -> Result<R, OrderError>,
) -> Result<R, OrderError> {
    let order = find_by_id_mut(doc, id).ok_or_else(|| OrderError::NotFound(id.to_string()))?;
    mutator(order)
}

/// Remove every order with this id. Returns how many were removed.
pub fn delete_by_id(doc: &mut Document, id: &str) -> usize {
    let before = doc.orders.len();
    doc.orders.retain(|o| o.id != id);
    before - doc.orders.len()
}

/// Orders in arrival order. With `include_terminal == false` the statuses the
/// policy hides from the active view are filtered out.
pub fn list_orders<'a>(
    doc: &'a Document,
    include_terminal: bool,
    policy: &OrderPolicy,
) -> Vec<&'a Order> {
    doc.orders
        .iter()
        .filter(|o| include_terminal || !policy.is_hidden_from_active(o.status))
        .collect()
}

pub fn filaments(doc: &Document) -> &[String] {
    &doc.settings.filaments
}

/// Outcome of [`set_filaments`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilamentUpdate {
    Replaced { count: usize },
    /// Empty replacement refused by `protect_non_empty_filaments`.
    RejectedEmpty,
}

/// Replace the filament list wholesale.
pub fn set_filaments(
    doc: &mut Document,
    filaments: Vec<String>,
    policy: &OrderPolicy,
) -> FilamentUpdate {
    if filaments.is_empty() && policy.protect_non_empty_filaments {
        return FilamentUpdate::RejectedEmpty;
    }
    let count = filaments.len();
    doc.settings.filaments = filaments;
    FilamentUpdate::Replaced { count }
}

/// Split an admin-supplied comma list: trim entries, drop blanks, keep order
/// and duplicates.
pub fn parse_colors_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
