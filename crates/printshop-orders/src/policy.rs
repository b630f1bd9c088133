use printshop_schemas::OrderStatus;

/// Behaviour switches that earlier iterations of the shop disagreed on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderPolicy {
    /// Refuse (silently) to replace the filament list with an empty one.
    pub protect_non_empty_filaments: bool,
    /// Statuses left out of the active view when terminal orders are excluded.
    pub active_hidden_statuses: Vec<OrderStatus>,
}

impl Default for OrderPolicy {
    fn default() -> Self {
        Self {
            protect_non_empty_filaments: true,
            active_hidden_statuses: vec![OrderStatus::Delivered],
        }
    }
}

impl OrderPolicy {
    pub fn is_hidden_from_active(&self, status: OrderStatus) -> bool {
        self.active_hidden_statuses.contains(&status)
    }
}
