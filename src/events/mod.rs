//! Typed cross-service event contracts.
//!
//! Pure data definitions shared by every service publishing or consuming
//! events on the bus; no delivery logic lives here. Wire names and field
//! casing must stay stable across services.

use serde::{Deserialize, Serialize};

/// Bus subjects an event can be published under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Subject {
    #[serde(rename = "ticket:created")]
    TicketCreated,
    #[serde(rename = "ticket:updated")]
    TicketUpdated,
    #[serde(rename = "order:created")]
    OrderCreated,
    #[serde(rename = "order:canceled")]
    OrderCanceled,
    #[serde(rename = "expiration:complete")]
    ExpirationComplete,
    #[serde(rename = "payment:created")]
    PaymentCreated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderStatus {
    // Order created, but the ticket it targets is not reserved yet
    #[serde(rename = "created")]
    Created,
    // Ticket already reserved, order canceled by the user, or expired unpaid
    #[serde(rename = "canceled")]
    Canceled,
    // Ticket reserved, waiting for payment
    #[serde(rename = "awaiting:payment")]
    AwaitingPayment,
    // Ticket reserved and paid
    #[serde(rename = "complete")]
    Complete,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TicketRef {
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketCreatedData {
    pub id: String,
    pub title: String,
    pub price: i64,
    pub user_id: String,
    pub version: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketUpdatedData {
    pub id: String,
    pub title: String,
    pub price: i64,
    pub user_id: String,
    pub order_id: Option<String>,
    pub version: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderCreatedData {
    pub id: String,
    pub status: OrderStatus,
    pub user_id: String,
    pub expires_at: String,
    pub ticket: TicketRef,
    pub version: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderCanceledData {
    pub id: String,
    pub ticket: TicketRef,
    pub version: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpirationCompleteData {
    pub order_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentCreatedData {
    pub id: String,
    pub order_id: String,
    pub stripe_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subject_wire_names() {
        assert_eq!(
            serde_json::to_string(&Subject::OrderCanceled).unwrap(),
            r#""order:canceled""#
        );
        assert_eq!(
            serde_json::to_string(&Subject::ExpirationComplete).unwrap(),
            r#""expiration:complete""#
        );
    }

    #[test]
    fn test_order_status_wire_names() {
        assert_eq!(
            serde_json::to_string(&OrderStatus::AwaitingPayment).unwrap(),
            r#""awaiting:payment""#
        );
        let status: OrderStatus = serde_json::from_str(r#""canceled""#).unwrap();
        assert_eq!(status, OrderStatus::Canceled);
    }

    #[test]
    fn test_event_field_casing() {
        let data = OrderCanceledData {
            id: "order-1".to_string(),
            ticket: TicketRef {
                id: "ticket-1".to_string(),
            },
            version: 2,
        };
        let json = serde_json::to_value(&data).unwrap();
        assert_eq!(json["ticket"]["id"], "ticket-1");

        let expiration = ExpirationCompleteData {
            order_id: "order-1".to_string(),
        };
        let json = serde_json::to_value(&expiration).unwrap();
        assert!(json.get("orderId").is_some());
    }
}
