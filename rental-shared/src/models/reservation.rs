use crate::models::interval::Interval;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

pub type ResourceId = String;

/// Server-assigned reservation identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReservationId(pub Uuid);

impl ReservationId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ReservationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ReservationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A bookable car
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Resource {
    pub id: ResourceId,
    pub name: String,
    pub daily_rate: Decimal,
}

impl Resource {
    pub fn new(id: impl Into<ResourceId>, name: impl Into<String>, daily_rate: Decimal) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            daily_rate,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PeriodStatus {
    Available,
    Booked,
}

/// One entry of the authority's availability answer. `Available` entries only
/// exist for calendar display.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AvailabilityPeriod {
    pub interval: Interval,
    pub status: PeriodStatus,
}

impl AvailabilityPeriod {
    pub fn booked(interval: Interval) -> Self {
        Self { interval, status: PeriodStatus::Booked }
    }

    pub fn available(interval: Interval) -> Self {
        Self { interval, status: PeriodStatus::Available }
    }

    pub fn is_booked(&self) -> bool {
        self.status == PeriodStatus::Booked
    }
}

/// Reservation status as owned by the authority
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ReservationStatus {
    PendingPayment,
    Confirmed,
    Cancelled,
    /// Rental period is over
    Completed,
}

impl ReservationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReservationStatus::PendingPayment => "pending_payment",
            ReservationStatus::Confirmed => "confirmed",
            ReservationStatus::Cancelled => "cancelled",
            ReservationStatus::Completed => "completed",
        }
    }

    /// Whether the window still blocks other bookings
    pub fn holds_window(&self) -> bool {
        matches!(self, ReservationStatus::PendingPayment | ReservationStatus::Confirmed)
    }
}

impl fmt::Display for ReservationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Reservation {
    pub id: ReservationId,
    pub resource_id: ResourceId,
    pub interval: Interval,
    pub total_amount: Decimal,
    pub status: ReservationStatus,
    pub created_at: DateTime<Utc>,
}

impl Reservation {
    pub fn pending(resource_id: ResourceId, interval: Interval, total_amount: Decimal) -> Self {
        Self {
            id: ReservationId::new(),
            resource_id,
            interval,
            total_amount,
            status: ReservationStatus::PendingPayment,
            created_at: Utc::now(),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.status == ReservationStatus::Cancelled
    }
}

/// Payload of a reservation-creation request
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewReservation {
    pub resource_id: ResourceId,
    pub interval: Interval,
    pub total_amount: Decimal,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_status_wire_names() {
        let json = serde_json::to_string(&ReservationStatus::PendingPayment).unwrap();
        assert_eq!(json, "\"pending_payment\"");
        let parsed: ReservationStatus = serde_json::from_str("\"completed\"").unwrap();
        assert_eq!(parsed, ReservationStatus::Completed);
    }

    #[test]
    fn test_only_live_reservations_hold_window() {
        assert!(ReservationStatus::PendingPayment.holds_window());
        assert!(ReservationStatus::Confirmed.holds_window());
        assert!(!ReservationStatus::Cancelled.holds_window());
        assert!(!ReservationStatus::Completed.holds_window());
    }

    #[test]
    fn test_new_reservation_is_pending() {
        let interval = Interval::new(
            Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2025, 3, 3, 9, 0, 0).unwrap(),
        )
        .unwrap();
        let rsvp = Reservation::pending("car-1".to_string(), interval, Decimal::new(9000, 2));
        assert_eq!(rsvp.status, ReservationStatus::PendingPayment);
        assert!(!rsvp.is_cancelled());
    }
}
