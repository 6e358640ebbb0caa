use crate::models::booking::{BookingStage, Verdict};
use crate::models::interval::Interval;
use crate::models::reservation::{ReservationId, ResourceId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Lifecycle notifications published by a booking flow
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingEvent {
    DatesChanged {
        resource_id: ResourceId,
        interval: Option<Interval>,
        timestamp: i64,
    },
    VerdictChanged {
        resource_id: ResourceId,
        generation: u64,
        verdict: Verdict,
        timestamp: i64,
    },
    ReservationCreated {
        reservation_id: ReservationId,
        resource_id: ResourceId,
        total_amount: Decimal,
        timestamp: i64,
    },
    PaymentInitialized {
        reservation_id: ReservationId,
        authorization_url: String,
        timestamp: i64,
    },
    PaymentInitFailed {
        reservation_id: ReservationId,
        reason: String,
        timestamp: i64,
    },
    ReservationCancelled {
        reservation_id: ReservationId,
        timestamp: i64,
    },
    Failed {
        stage: BookingStage,
        reason: String,
        timestamp: i64,
    },
    Aborted {
        resource_id: ResourceId,
        timestamp: i64,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_is_tagged() {
        let event = BookingEvent::Failed {
            stage: BookingStage::Creation,
            reason: "boom".to_string(),
            timestamp: 0,
        };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["type"], "FAILED");
        assert_eq!(value["stage"], "creation");
    }
}
