//! Domain services for the order lifecycle: cart staging, checkout, the
//! order state machine, delivery assignment, feedback, and the catalog read
//! path. Every service is a free function over the injected [`mh_store::Store`];
//! no service talks to the database directly.

pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod delivery;
mod error;
pub mod feedback;
pub mod orders;
pub mod owner_meals;

pub use error::OrderError;

pub type Result<T> = std::result::Result<T, OrderError>;
