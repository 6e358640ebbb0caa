use rental_core::{ReservationAuthority, Session};
use rental_shared::{BookingStage, Reservation, ReservationStatus};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{info, warn};

use crate::error::BookingError;

/// Cancels existing reservations.
///
/// Source state is validated locally first: `pending_payment` and `confirmed`
/// go to the authority, `cancelled` is returned unchanged, anything else is a
/// contract violation.
pub struct CancellationHandler {
    authority: Arc<dyn ReservationAuthority>,
    call_timeout: Duration,
}

impl CancellationHandler {
    pub fn new(authority: Arc<dyn ReservationAuthority>, call_timeout: Duration) -> Self {
        Self { authority, call_timeout }
    }

    /// `Ok(false)` when the reservation is already cancelled
    pub fn ensure_cancellable(reservation: &Reservation) -> Result<bool, BookingError> {
        match reservation.status {
            ReservationStatus::PendingPayment | ReservationStatus::Confirmed => Ok(true),
            ReservationStatus::Cancelled => Ok(false),
            other => Err(BookingError::invalid_transition(
                other.as_str(),
                ReservationStatus::Cancelled.as_str(),
            )),
        }
    }

    pub async fn cancel(&self, session: &Session, reservation: &Reservation) -> Result<Reservation, BookingError> {
        if !Self::ensure_cancellable(reservation)? {
            return Ok(reservation.clone());
        }

        let updated = match timeout(
            self.call_timeout,
            self.authority.cancel_reservation(session, reservation.id),
        )
        .await
        {
            Ok(Ok(updated)) => updated,
            Ok(Err(err)) => {
                warn!(reservation_id = %reservation.id, "Cancellation failed: {}", err);
                return Err(BookingError::from_cancellation(err));
            }
            Err(_) => {
                warn!(reservation_id = %reservation.id, "Cancellation timed out");
                return Err(BookingError::Timeout {
                    stage: BookingStage::Cancellation,
                    after: self.call_timeout,
                });
            }
        };

        if updated.status != ReservationStatus::Cancelled {
            return Err(BookingError::invalid_transition(
                updated.status.as_str(),
                ReservationStatus::Cancelled.as_str(),
            ));
        }
        info!(reservation_id = %updated.id, "Reservation cancelled");
        Ok(updated)
    }
}
