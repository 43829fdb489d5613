//! Domain error taxonomy. The HTTP layer maps each variant to a status code;
//! services never see status codes.

use thiserror::Error;
use uuid::Uuid;

use mh_schemas::OrderStatus;

#[derive(Debug, Error)]
pub enum OrderError {
    #[error("{0}")]
    InvalidInput(String),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0}")]
    Forbidden(&'static str),

    #[error("{0}")]
    Conflict(String),

    #[error("cart is empty")]
    EmptyCart,

    #[error("cart contains items from multiple restaurants")]
    MultiRestaurantCart,

    #[error("not enough surplus for meal {meal_id}")]
    InsufficientStock { meal_id: Uuid },

    #[error("only {available} left for this item")]
    CapacityExceeded { available: i64 },

    #[error("invalid transition {from} -> {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },

    #[error("{0}")]
    InvalidState(String),

    #[error("invalid delivery code")]
    InvalidCode,

    #[error("feedback already submitted")]
    AlreadySubmitted,

    /// Store / provider plumbing failure; surfaces as a 5xx upstream error.
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}
