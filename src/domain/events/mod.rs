//! Domain events published to the notification dispatcher.
//!
//! Delivery is fire-and-forget: the dispatcher owns retries and channel
//! selection, the core only emits.

use serde::Serialize;
use uuid::Uuid;

use crate::domain::aggregates::order::OrderStatus;

#[derive(Clone, Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DomainEvent {
    OrderCreated {
        order_id: Uuid,
        order_number: String,
        customer_id: Uuid,
    },
    OrderStatusChanged {
        order_id: Uuid,
        order_number: String,
        from: OrderStatus,
        to: OrderStatus,
        actor_id: Uuid,
    },
    LowStock {
        product_id: Uuid,
        sku: String,
        available: i32,
    },
    Restocked {
        product_id: Uuid,
        sku: String,
        quantity_added: i32,
        subscriber_ids: Vec<Uuid>,
    },
}

impl DomainEvent {
    pub fn subject(&self) -> &'static str {
        match self {
            DomainEvent::OrderCreated { .. } => "orders.created",
            DomainEvent::OrderStatusChanged { .. } => "orders.status_changed",
            DomainEvent::LowStock { .. } => "stock.low",
            DomainEvent::Restocked { .. } => "stock.restocked",
        }
    }
}

/// Thin wrapper over an optional NATS connection. Publish failures are
/// logged and dropped; a missing connection disables dispatch entirely.
#[derive(Clone)]
pub struct Notifier {
    client: Option<async_nats::Client>,
}

impl Notifier {
    pub fn new(client: Option<async_nats::Client>) -> Self {
        Self { client }
    }

    pub fn disabled() -> Self {
        Self { client: None }
    }

    pub async fn publish(&self, event: &DomainEvent) {
        let Some(client) = &self.client else { return };
        let payload = match serde_json::to_vec(event) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!(error = %e, "failed to serialize domain event");
                return;
            }
        };
        if let Err(e) = client.publish(event.subject(), payload.into()).await {
            tracing::warn!(subject = event.subject(), error = %e, "event publish failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subjects_match_event_kinds() {
        let e = DomainEvent::LowStock {
            product_id: Uuid::new_v4(),
            sku: "ORG-KALE".into(),
            available: 2,
        };
        assert_eq!(e.subject(), "stock.low");
        let json = serde_json::to_value(&e).unwrap();
        assert_eq!(json["type"], "low_stock");
    }

    #[tokio::test]
    async fn disabled_notifier_is_a_no_op() {
        let n = Notifier::disabled();
        n.publish(&DomainEvent::LowStock {
            product_id: Uuid::new_v4(),
            sku: "X".into(),
            available: 0,
        })
        .await;
    }
}
