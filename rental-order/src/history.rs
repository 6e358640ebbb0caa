use rental_core::{ReservationAuthority, Session};
use rental_shared::{BookingStage, Reservation, ReservationId};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::info;

use crate::cancellation::CancellationHandler;
use crate::error::BookingError;

/// Cached list of the session user's reservations.
///
/// Loaded once; cancellations patch the cached entry in place instead of
/// refetching the collection.
pub struct BookingHistory {
    authority: Arc<dyn ReservationAuthority>,
    cancellations: CancellationHandler,
    call_timeout: Duration,
    entries: Vec<Reservation>,
}

impl BookingHistory {
    pub fn new(authority: Arc<dyn ReservationAuthority>, call_timeout: Duration) -> Self {
        Self {
            cancellations: CancellationHandler::new(authority.clone(), call_timeout),
            authority,
            call_timeout,
            entries: Vec::new(),
        }
    }

    pub async fn load(&mut self, session: &Session) -> Result<&[Reservation], BookingError> {
        let mut entries = match timeout(self.call_timeout, self.authority.list_reservations(session)).await {
            Ok(Ok(entries)) => entries,
            Ok(Err(err)) => return Err(BookingError::Unknown(err.to_string())),
            Err(_) => {
                return Err(BookingError::Timeout {
                    stage: BookingStage::Cancellation,
                    after: self.call_timeout,
                })
            }
        };
        // newest first
        entries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        info!(count = entries.len(), user_id = %session.user_id, "Booking history loaded");
        self.entries = entries;
        Ok(&self.entries)
    }

    pub fn entries(&self) -> &[Reservation] {
        &self.entries
    }

    pub fn get(&self, id: ReservationId) -> Option<&Reservation> {
        self.entries.iter().find(|r| r.id == id)
    }

    /// Entries the user may still cancel
    pub fn cancellable(&self) -> impl Iterator<Item = &Reservation> {
        self.entries
            .iter()
            .filter(|r| matches!(CancellationHandler::ensure_cancellable(r), Ok(true)))
    }

    pub async fn cancel(&mut self, session: &Session, id: ReservationId) -> Result<Reservation, BookingError> {
        let current = self
            .get(id)
            .cloned()
            .ok_or_else(|| BookingError::NotFound(id.to_string()))?;
        let updated = self.cancellations.cancel(session, &current).await?;
        self.apply(updated.clone());
        Ok(updated)
    }

    /// Replace the cached entry with the same id, or add it
    pub fn apply(&mut self, reservation: Reservation) {
        match self.entries.iter_mut().find(|r| r.id == reservation.id) {
            Some(entry) => *entry = reservation,
            None => self.entries.insert(0, reservation),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::window;
    use rental_shared::{ReservationStatus, Resource};
    use rental_store::InMemoryAuthority;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn test_cancel_patches_cached_entry() {
        let authority = Arc::new(InMemoryAuthority::new());
        authority.add_resource(Resource::new("car-1", "Corolla", dec!(50))).await;
        let confirmed = authority
            .seed_reservation("alice", "car-1", window(0, 2), ReservationStatus::Confirmed)
            .await;
        authority
            .seed_reservation("alice", "car-1", window(5, 6), ReservationStatus::Completed)
            .await;
        authority
            .seed_reservation("bob", "car-1", window(8, 9), ReservationStatus::Confirmed)
            .await;

        let session = Session::authenticated("alice", "token");
        let mut history = BookingHistory::new(authority.clone(), Duration::from_secs(5));
        assert_eq!(history.load(&session).await.unwrap().len(), 2);
        assert_eq!(history.cancellable().count(), 1);

        history.cancel(&session, confirmed.id).await.unwrap();
        assert_eq!(history.get(confirmed.id).unwrap().status, ReservationStatus::Cancelled);
        assert_eq!(history.entries().len(), 2);
        assert_eq!(history.cancellable().count(), 0);
    }

    #[tokio::test]
    async fn test_cancel_unknown_id() {
        let authority = Arc::new(InMemoryAuthority::new());
        let mut history = BookingHistory::new(authority, Duration::from_secs(5));
        let err = history
            .cancel(&Session::authenticated("alice", "token"), ReservationId::new())
            .await
            .unwrap_err();
        assert!(matches!(err, BookingError::NotFound(_)));
    }
}
