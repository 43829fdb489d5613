//! Order lifecycle states and the unified transition table.
//!
//! The staff-driven kitchen flow and the driver-driven delivery flow used to
//! be checked independently; here they are one graph with the acting role
//! annotated on each edge. `Delivered` and `Completed` are parallel terminal
//! states reached by different actors — a delivered order is never
//! additionally marked completed by staff.
//!
//! ```text
//!  pending ──► accepted ──► preparing ──► ready ──► completed (staff, term.)
//!     │            │             │          │
//!     │            │             │          └──► assigned ──► out_for_delivery
//!     │            │             │     (driver)     │                │
//!     ▼            ▼             ▼                  └──► delivered ◄─┘
//! cancelled    cancelled     cancelled                  (code-gated, term.)
//! ```

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};

/// Who is driving a transition. The table only admits an edge for the role
/// that owns it; ownership checks (staff roster, assigned driver, customer)
/// happen in the services before the table is consulted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Actor {
    Staff,
    Driver,
    Customer,
}

/// All states an order can occupy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Accepted,
    Preparing,
    Ready,
    /// A driver has claimed the order; handoff not yet started.
    Assigned,
    OutForDelivery,
    /// Terminal. Reached only through the delivery-code check.
    Delivered,
    /// Terminal. Staff-confirmed pickup/handover.
    Completed,
    /// Terminal.
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Accepted => "accepted",
            OrderStatus::Preparing => "preparing",
            OrderStatus::Ready => "ready",
            OrderStatus::Assigned => "assigned",
            OrderStatus::OutForDelivery => "out_for_delivery",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Completed => "completed",
            OrderStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "pending" => Ok(OrderStatus::Pending),
            "accepted" => Ok(OrderStatus::Accepted),
            "preparing" => Ok(OrderStatus::Preparing),
            "ready" => Ok(OrderStatus::Ready),
            "assigned" => Ok(OrderStatus::Assigned),
            "out_for_delivery" => Ok(OrderStatus::OutForDelivery),
            "delivered" => Ok(OrderStatus::Delivered),
            "completed" => Ok(OrderStatus::Completed),
            "cancelled" => Ok(OrderStatus::Cancelled),
            other => Err(anyhow!("invalid order status: {}", other)),
        }
    }

    /// Returns `true` if no further transitions are possible.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OrderStatus::Delivered | OrderStatus::Completed | OrderStatus::Cancelled
        )
    }

    /// A driver currently holds the order when it sits in one of these.
    pub fn is_active_delivery(&self) -> bool {
        matches!(self, OrderStatus::Assigned | OrderStatus::OutForDelivery)
    }

    /// True when `actor` may move an order from `self` to `target`.
    pub fn can_transition(&self, target: OrderStatus, actor: Actor) -> bool {
        use Actor::*;
        use OrderStatus::*;

        match (self, target, actor) {
            // Kitchen flow.
            (Pending, Accepted, Staff) => true,
            (Accepted, Preparing, Staff) => true,
            (Preparing, Ready, Staff) => true,
            (Ready, Completed, Staff) => true,
            // Staff may cancel anywhere before the food is ready.
            (Pending | Accepted | Preparing, Cancelled, Staff) => true,

            // Customer cancellation is stricter: pending only.
            (Pending, Cancelled, Customer) => true,

            // Delivery flow. `Ready -> Assigned` is reachable only through
            // the acceptance claim, but it is still a table edge so the
            // audit log always reads as a legal walk.
            (Ready, Assigned, Driver) => true,
            (Assigned, OutForDelivery, Driver) => true,
            (Assigned | OutForDelivery, Delivered, Driver) => true,

            _ => false,
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_round_trips_every_state() {
        for s in [
            OrderStatus::Pending,
            OrderStatus::Accepted,
            OrderStatus::Preparing,
            OrderStatus::Ready,
            OrderStatus::Assigned,
            OrderStatus::OutForDelivery,
            OrderStatus::Delivered,
            OrderStatus::Completed,
            OrderStatus::Cancelled,
        ] {
            assert_eq!(OrderStatus::parse(s.as_str()).unwrap(), s);
        }
        assert!(OrderStatus::parse("shipped").is_err());
    }

    #[test]
    fn staff_kitchen_path_is_legal() {
        use Actor::Staff;
        assert!(OrderStatus::Pending.can_transition(OrderStatus::Accepted, Staff));
        assert!(OrderStatus::Accepted.can_transition(OrderStatus::Preparing, Staff));
        assert!(OrderStatus::Preparing.can_transition(OrderStatus::Ready, Staff));
        assert!(OrderStatus::Ready.can_transition(OrderStatus::Completed, Staff));
    }

    #[test]
    fn staff_cannot_skip_ahead() {
        use Actor::Staff;
        assert!(!OrderStatus::Pending.can_transition(OrderStatus::Ready, Staff));
        assert!(!OrderStatus::Pending.can_transition(OrderStatus::Completed, Staff));
        assert!(!OrderStatus::Ready.can_transition(OrderStatus::Cancelled, Staff));
    }

    #[test]
    fn customer_cancel_only_from_pending() {
        use Actor::Customer;
        assert!(OrderStatus::Pending.can_transition(OrderStatus::Cancelled, Customer));
        assert!(!OrderStatus::Accepted.can_transition(OrderStatus::Cancelled, Customer));
        assert!(!OrderStatus::Preparing.can_transition(OrderStatus::Cancelled, Customer));
    }

    #[test]
    fn driver_edges() {
        use Actor::Driver;
        assert!(OrderStatus::Ready.can_transition(OrderStatus::Assigned, Driver));
        assert!(OrderStatus::Assigned.can_transition(OrderStatus::OutForDelivery, Driver));
        assert!(OrderStatus::Assigned.can_transition(OrderStatus::Delivered, Driver));
        assert!(OrderStatus::OutForDelivery.can_transition(OrderStatus::Delivered, Driver));
        // A driver never walks the kitchen graph.
        assert!(!OrderStatus::Pending.can_transition(OrderStatus::Accepted, Driver));
        assert!(!OrderStatus::Ready.can_transition(OrderStatus::Completed, Driver));
    }

    #[test]
    fn terminal_states_have_no_exits() {
        for term in [
            OrderStatus::Delivered,
            OrderStatus::Completed,
            OrderStatus::Cancelled,
        ] {
            assert!(term.is_terminal());
            for target in [
                OrderStatus::Pending,
                OrderStatus::Accepted,
                OrderStatus::Completed,
                OrderStatus::Delivered,
                OrderStatus::Cancelled,
            ] {
                for actor in [Actor::Staff, Actor::Driver, Actor::Customer] {
                    assert!(!term.can_transition(target, actor));
                }
            }
        }
    }

    #[test]
    fn delivered_is_not_followed_by_completed() {
        assert!(!OrderStatus::Delivered.can_transition(OrderStatus::Completed, Actor::Staff));
    }
}
