use async_trait::async_trait;
use rental_shared::{AvailabilityPeriod, Interval, NewReservation, Reservation, ReservationId, ResourceId};

use crate::{CoreResult, Session};

/// The server-side authority over resources and their reservations.
#[async_trait]
pub trait ReservationAuthority: Send + Sync {
    /// Periods overlapping `window`. Read-only and safe to call rapidly.
    async fn get_availability(
        &self,
        session: &Session,
        resource_id: &ResourceId,
        window: Interval,
    ) -> CoreResult<Vec<AvailabilityPeriod>>;

    /// Create a reservation in `pending_payment`. The authority re-validates the
    /// window and answers `CoreError::Conflict` if it was taken meanwhile.
    async fn create_reservation(
        &self,
        session: &Session,
        request: NewReservation,
    ) -> CoreResult<Reservation>;

    async fn cancel_reservation(
        &self,
        session: &Session,
        id: ReservationId,
    ) -> CoreResult<Reservation>;

    /// Reservations owned by the session user
    async fn list_reservations(&self, session: &Session) -> CoreResult<Vec<Reservation>>;
}
