use rental_core::CoreError;
use rental_shared::{BookingStage, IntervalError, ReservationId};
use serde::Serialize;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BookingError {
    #[error(transparent)]
    InvalidInterval(#[from] IntervalError),

    /// The authority refused the window at creation time; dates must change
    #[error("Selected dates are no longer available: {0}")]
    Conflict(String),

    #[error("Booking creation failed: {0}")]
    CreationFailed(String),

    /// The reservation exists; only the payment handoff failed
    #[error("Reservation {reservation_id} created but payment initialization failed: {reason}")]
    PaymentInitFailed {
        reservation_id: ReservationId,
        reason: String,
    },

    #[error("Invalid state transition from {from} to {to}")]
    InvalidStateTransition { from: String, to: String },

    #[error("{stage} call timed out after {after:?}")]
    Timeout { stage: BookingStage, after: Duration },

    #[error("Result could not be determined: {0}")]
    Unknown(String),

    #[error("Please log in to make a booking")]
    Unauthenticated,

    #[error("Cancellation failed: {0}")]
    CancellationFailed(String),

    #[error("Reservation not found: {0}")]
    NotFound(String),
}

/// Discriminant of [`BookingError`] for the presentation layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidInterval,
    Conflict,
    CreationFailed,
    PaymentInitFailed,
    InvalidStateTransition,
    Timeout,
    Unknown,
    Unauthenticated,
    CancellationFailed,
    NotFound,
}

impl BookingError {
    pub fn invalid_transition(from: impl Into<String>, to: impl Into<String>) -> Self {
        BookingError::InvalidStateTransition {
            from: from.into(),
            to: to.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            BookingError::InvalidInterval(_) => ErrorKind::InvalidInterval,
            BookingError::Conflict(_) => ErrorKind::Conflict,
            BookingError::CreationFailed(_) => ErrorKind::CreationFailed,
            BookingError::PaymentInitFailed { .. } => ErrorKind::PaymentInitFailed,
            BookingError::InvalidStateTransition { .. } => ErrorKind::InvalidStateTransition,
            BookingError::Timeout { .. } => ErrorKind::Timeout,
            BookingError::Unknown(_) => ErrorKind::Unknown,
            BookingError::Unauthenticated => ErrorKind::Unauthenticated,
            BookingError::CancellationFailed(_) => ErrorKind::CancellationFailed,
            BookingError::NotFound(_) => ErrorKind::NotFound,
        }
    }

    /// Contract violations (bad interval, illegal transition) are not recoverable;
    /// everything else can be fixed by retrying, changing dates or logging in.
    pub fn is_recoverable(&self) -> bool {
        !matches!(
            self,
            BookingError::InvalidInterval(_) | BookingError::InvalidStateTransition { .. }
        )
    }

    pub fn stage(&self) -> Option<BookingStage> {
        match self {
            BookingError::InvalidInterval(_) | BookingError::Unknown(_) => Some(BookingStage::Availability),
            BookingError::Conflict(_) | BookingError::CreationFailed(_) | BookingError::Unauthenticated => {
                Some(BookingStage::Creation)
            }
            BookingError::PaymentInitFailed { .. } => Some(BookingStage::Payment),
            BookingError::Timeout { stage, .. } => Some(*stage),
            BookingError::CancellationFailed(_) | BookingError::NotFound(_) => Some(BookingStage::Cancellation),
            BookingError::InvalidStateTransition { .. } => None,
        }
    }

    /// Map a reservation-creation failure. `Conflict` stays distinct because it
    /// means the user has to pick new dates.
    pub fn from_creation(err: CoreError) -> Self {
        match err {
            CoreError::Conflict(msg) => BookingError::Conflict(msg),
            CoreError::Unauthorized(_) => BookingError::Unauthenticated,
            other => BookingError::CreationFailed(other.to_string()),
        }
    }

    pub fn from_cancellation(err: CoreError) -> Self {
        match err {
            CoreError::NotFound(msg) => BookingError::NotFound(msg),
            CoreError::Unauthorized(_) => BookingError::Unauthenticated,
            other => BookingError::CancellationFailed(other.to_string()),
        }
    }
}

/// Most recent error of a booking flow, as shown to the user
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LastError {
    pub stage: BookingStage,
    pub kind: ErrorKind,
    pub message: String,
}

impl LastError {
    pub fn new(stage: BookingStage, error: &BookingError) -> Self {
        Self {
            stage,
            kind: error.kind(),
            message: error.to_string(),
        }
    }

    /// `true` when the fix is choosing other dates rather than retrying
    pub fn requires_new_dates(&self) -> bool {
        self.kind == ErrorKind::Conflict
    }
}
