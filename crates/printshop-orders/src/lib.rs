//! printshop-orders
//!
//! Order repository and order state machine over an in-memory
//! [`printshop_schemas::Document`].
//!
//! - `repository`: find / append / update / delete / list, filament settings
//! - `state_machine`: the only code path that changes `Order::status`
//! - `intake`: validation of customer and admin form input
//!
//! Pure, synchronous logic. Loading and saving the document is the caller's
//! job (see `printshop-store`).

mod error;
pub mod intake;
mod policy;
pub mod repository;
pub mod state_machine;

pub use error::OrderError;
pub use intake::{create_order, parse_admin_edit, AdminEditForm, NewOrder};
pub use policy::OrderPolicy;
pub use repository::{parse_colors_list, FilamentUpdate};
pub use state_machine::{
    AdminEdit, OrderEvent, OrderLifecycle, Transition, TransitionError,
};
