use chrono::{DateTime, Utc};
use rental_catalog::PriceCalculator;
use rental_shared::{
    AvailabilityPeriod, BookingStage, Interval, PaymentIntent, PaymentStatus, Reservation,
    Resource, ResourceId, Verdict,
};
use rust_decimal::Decimal;
use serde::Serialize;
use std::fmt;

use crate::error::LastError;

/// Booking flow states.
///
/// `Confirmed` means the reservation exists and the payment handoff succeeded.
/// It does not mean the gateway has settled the payment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingState {
    SelectingDates,
    Reviewing,
    AwaitingPayment,
    Confirmed,
    Failed { stage: BookingStage, reason: String },
    Aborted,
}

impl BookingState {
    pub fn name(&self) -> &'static str {
        match self {
            BookingState::SelectingDates => "SELECTING_DATES",
            BookingState::Reviewing => "REVIEWING",
            BookingState::AwaitingPayment => "AWAITING_PAYMENT",
            BookingState::Confirmed => "CONFIRMED",
            BookingState::Failed { .. } => "FAILED",
            BookingState::Aborted => "ABORTED",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, BookingState::Confirmed | BookingState::Aborted)
    }
}

impl fmt::Display for BookingState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BookingState::Failed { stage, .. } => write!(f, "FAILED({})", stage),
            other => f.write_str(other.name()),
        }
    }
}

/// Selected window and its price, before a reservation exists.
///
/// The daily rate is copied from the resource when the draft is created, so
/// the total stays stable for the rest of the flow.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BookingDraft {
    pub resource_id: ResourceId,
    pub interval: Interval,
    pub daily_rate: Decimal,
    pub computed_total: Decimal,
    pub verdict: Verdict,
}

impl BookingDraft {
    pub fn new(resource: &Resource, interval: Interval) -> Self {
        Self {
            resource_id: resource.id.clone(),
            interval,
            daily_rate: resource.daily_rate,
            computed_total: PriceCalculator::total(resource.daily_rate, &interval),
            verdict: Verdict::Checking,
        }
    }

    /// Move the draft to a new window; the verdict goes back to `Checking`.
    pub fn reselect(&mut self, interval: Interval) {
        self.interval = interval;
        self.computed_total = PriceCalculator::total(self.daily_rate, &interval);
        self.verdict = Verdict::Checking;
    }

    pub fn rental_days(&self) -> i64 {
        PriceCalculator::rental_days(&self.interval)
    }
}

/// Authority answer for one probe cycle, kept for calendar display only.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AvailabilitySnapshot {
    pub resource_id: ResourceId,
    pub window: Interval,
    pub periods: Vec<AvailabilityPeriod>,
}

/// Everything the presentation layer reads from a booking flow
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BookingSnapshot {
    pub state: BookingState,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub draft: Option<BookingDraft>,
    pub reservation: Option<Reservation>,
    pub payment_intent: Option<PaymentIntent>,
    pub verdict: Verdict,
    pub computed_total: Option<Decimal>,
    pub payment_init_failed: bool,
    /// A creation or payment call is in flight
    pub submitting: bool,
    pub last_error: Option<LastError>,
    pub availability: Option<AvailabilitySnapshot>,
    pub settlement: Option<PaymentStatus>,
}
