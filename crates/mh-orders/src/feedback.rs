//! Post-order feedback. Each order carries two independent one-shot rating
//! slots (restaurant, driver); the write is conditional on the slot still
//! being empty, so the first submission wins and repeats conflict.

use serde::Serialize;
use uuid::Uuid;

use mh_schemas::{FeedbackSide, OrderStatus};
use mh_store::Store;

use crate::{OrderError, Result};

#[derive(Debug, Clone, Serialize)]
pub struct FeedbackEntry {
    pub rating: i32,
    pub comment: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct OrderFeedback {
    pub order_id: Uuid,
    pub restaurant: Option<FeedbackEntry>,
    pub driver: Option<FeedbackEntry>,
}

/// Submit a rating for one side of a finished order.
pub async fn submit_feedback(
    store: &dyn Store,
    user_id: Uuid,
    order_id: Uuid,
    side: FeedbackSide,
    rating: i32,
    comment: Option<&str>,
) -> Result<()> {
    if !(1..=5).contains(&rating) {
        return Err(OrderError::InvalidInput(
            "rating must be between 1 and 5".to_string(),
        ));
    }

    let order = store
        .order(order_id)
        .await?
        .ok_or(OrderError::NotFound("order"))?;
    if order.user_id != user_id {
        return Err(OrderError::Forbidden("not your order"));
    }
    if !matches!(
        order.status,
        OrderStatus::Delivered | OrderStatus::Completed
    ) {
        return Err(OrderError::InvalidState(
            "can only rate completed orders".to_string(),
        ));
    }

    let comment = comment.map(str::trim).filter(|c| !c.is_empty());
    let applied = store
        .set_feedback_if_absent(order_id, side, rating, comment)
        .await?;
    if !applied {
        return Err(OrderError::AlreadySubmitted);
    }
    Ok(())
}

/// Both feedback slots as currently filled, owner only.
pub async fn order_feedback(
    store: &dyn Store,
    user_id: Uuid,
    order_id: Uuid,
) -> Result<OrderFeedback> {
    let order = store
        .order(order_id)
        .await?
        .ok_or(OrderError::NotFound("order"))?;
    if order.user_id != user_id {
        return Err(OrderError::Forbidden("not your order"));
    }

    Ok(OrderFeedback {
        order_id,
        restaurant: order.restaurant_rating.map(|rating| FeedbackEntry {
            rating,
            comment: order.restaurant_comment.clone(),
        }),
        driver: order.driver_rating.map(|rating| FeedbackEntry {
            rating,
            comment: order.driver_comment.clone(),
        }),
    })
}
