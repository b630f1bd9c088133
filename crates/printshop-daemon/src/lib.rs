//! printshop-daemon library target.
//!
//! Exposes the router, state, desk and session gate for integration tests.
//! The binary `main.rs` depends on this library target.

pub mod api_types;
pub mod desk;
pub mod routes;
pub mod session;
pub mod state;
