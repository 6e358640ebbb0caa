use crate::models::reservation::ReservationId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Gateway handoff for one reservation. Holding an intent means the payment
/// flow was launched, not that money moved.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PaymentIntent {
    pub reservation_id: ReservationId,
    pub authorization_url: String,
    pub reference: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Settlement as reported by the gateway's verify endpoint
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Failed,
}
