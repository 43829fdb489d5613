//! HTTP surface for the marketplace. Handlers live in `routes.rs`, shared
//! state in `state.rs`, request/response shapes in `api_types.rs`, and the
//! error-to-status mapping in `error.rs`. `main.rs` only wires these up.

pub mod api_types;
pub mod error;
pub mod routes;
pub mod state;
