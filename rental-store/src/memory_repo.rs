use async_trait::async_trait;
use rental_catalog::IntervalSet;
use rental_core::{CoreError, CoreResult, ReservationAuthority, Session};
use rental_shared::{
    AvailabilityPeriod, Interval, NewReservation, Reservation, ReservationId, ReservationStatus,
    Resource, ResourceId,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::RwLock;
use tracing::info;

#[derive(Debug, Clone)]
struct StoredReservation {
    owner: String,
    reservation: Reservation,
}

/// In-memory reservation authority. Re-validates every creation against the
/// windows it holds, like the real server is expected to.
#[derive(Default)]
pub struct InMemoryAuthority {
    resources: RwLock<HashMap<ResourceId, Resource>>,
    reservations: RwLock<Vec<StoredReservation>>,
    availability_calls: AtomicUsize,
    create_calls: AtomicUsize,
}

impl InMemoryAuthority {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_resource(&self, resource: Resource) {
        self.resources.write().await.insert(resource.id.clone(), resource);
    }

    /// Insert a reservation directly, bypassing conflict checks.
    pub async fn seed_reservation(
        &self,
        owner: &str,
        resource_id: &str,
        interval: Interval,
        status: ReservationStatus,
    ) -> Reservation {
        let mut reservation = Reservation::pending(resource_id.to_string(), interval, Default::default());
        reservation.status = status;
        self.reservations.write().await.push(StoredReservation {
            owner: owner.to_string(),
            reservation: reservation.clone(),
        });
        reservation
    }

    pub async fn get(&self, id: ReservationId) -> Option<Reservation> {
        self.reservations
            .read()
            .await
            .iter()
            .find(|s| s.reservation.id == id)
            .map(|s| s.reservation.clone())
    }

    pub async fn set_status(&self, id: ReservationId, status: ReservationStatus) -> CoreResult<()> {
        let mut reservations = self.reservations.write().await;
        let stored = reservations
            .iter_mut()
            .find(|s| s.reservation.id == id)
            .ok_or_else(|| CoreError::NotFound(id.to_string()))?;
        stored.reservation.status = status;
        Ok(())
    }

    pub fn availability_calls(&self) -> usize {
        self.availability_calls.load(Ordering::SeqCst)
    }

    pub fn create_calls(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
    }

    async fn ensure_resource(&self, resource_id: &str) -> CoreResult<()> {
        if self.resources.read().await.contains_key(resource_id) {
            Ok(())
        } else {
            Err(CoreError::NotFound(format!("resource {}", resource_id)))
        }
    }
}

fn booked_windows(reservations: &[StoredReservation], resource_id: &str) -> IntervalSet {
    IntervalSet::from_intervals(
        reservations
            .iter()
            .map(|s| &s.reservation)
            .filter(|r| r.resource_id == resource_id && r.status.holds_window())
            .map(|r| r.interval),
    )
}

fn require_login(session: &Session) -> CoreResult<()> {
    if session.is_authenticated() {
        Ok(())
    } else {
        Err(CoreError::Unauthorized("missing bearer token".to_string()))
    }
}

#[async_trait]
impl ReservationAuthority for InMemoryAuthority {
    async fn get_availability(
        &self,
        _session: &Session,
        resource_id: &ResourceId,
        window: Interval,
    ) -> CoreResult<Vec<AvailabilityPeriod>> {
        self.availability_calls.fetch_add(1, Ordering::SeqCst);
        self.ensure_resource(resource_id).await?;
        let reservations = self.reservations.read().await;
        Ok(booked_windows(&reservations, resource_id).periods_within(&window))
    }

    async fn create_reservation(
        &self,
        session: &Session,
        request: NewReservation,
    ) -> CoreResult<Reservation> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        require_login(session)?;
        self.ensure_resource(&request.resource_id).await?;

        // check and insert under one write lock so two creations cannot both pass
        let mut reservations = self.reservations.write().await;
        let taken = booked_windows(&reservations, &request.resource_id);
        if let Some(existing) = taken.first_conflict(&request.interval) {
            return Err(CoreError::Conflict(format!(
                "{} overlaps {} on {}",
                request.interval, existing, request.resource_id
            )));
        }

        let reservation = Reservation::pending(request.resource_id, request.interval, request.total_amount);
        reservations.push(StoredReservation {
            owner: session.user_id.clone(),
            reservation: reservation.clone(),
        });
        info!("Reservation created: {} for {}", reservation.id, reservation.resource_id);
        Ok(reservation)
    }

    async fn cancel_reservation(
        &self,
        session: &Session,
        id: ReservationId,
    ) -> CoreResult<Reservation> {
        require_login(session)?;
        let mut reservations = self.reservations.write().await;
        let stored = reservations
            .iter_mut()
            .find(|s| s.reservation.id == id && s.owner == session.user_id)
            .ok_or_else(|| CoreError::NotFound(id.to_string()))?;

        match stored.reservation.status {
            ReservationStatus::PendingPayment | ReservationStatus::Confirmed => {
                stored.reservation.status = ReservationStatus::Cancelled;
                info!("Reservation cancelled: {}", id);
            }
            ReservationStatus::Cancelled => {}
            ReservationStatus::Completed => {
                return Err(CoreError::Rejected(format!("reservation {} is completed", id)));
            }
        }
        Ok(stored.reservation.clone())
    }

    async fn list_reservations(&self, session: &Session) -> CoreResult<Vec<Reservation>> {
        require_login(session)?;
        Ok(self
            .reservations
            .read()
            .await
            .iter()
            .filter(|s| s.owner == session.user_id)
            .map(|s| s.reservation.clone())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use rental_shared::PeriodStatus;
    use rust_decimal_macros::dec;

    fn day(n: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 7, 1, 10, 0, 0).unwrap() + Duration::days(n)
    }

    fn window(from: i64, to: i64) -> Interval {
        Interval::new(day(from), day(to)).unwrap()
    }

    async fn authority() -> InMemoryAuthority {
        let authority = InMemoryAuthority::new();
        authority.add_resource(Resource::new("car-1", "Corolla", dec!(40))).await;
        authority
    }

    fn request(from: i64, to: i64) -> NewReservation {
        NewReservation {
            resource_id: "car-1".to_string(),
            interval: window(from, to),
            total_amount: dec!(40) * rust_decimal::Decimal::from(to - from),
        }
    }

    #[tokio::test]
    async fn test_create_rejects_overlap_but_allows_back_to_back() {
        let authority = authority().await;
        let session = Session::authenticated("alice", "token");

        authority.create_reservation(&session, request(0, 3)).await.unwrap();
        let err = authority.create_reservation(&session, request(2, 4)).await.unwrap_err();
        assert!(matches!(err, CoreError::Conflict(_)));

        authority.create_reservation(&session, request(3, 5)).await.unwrap();
        assert_eq!(authority.create_calls(), 3);
    }

    #[tokio::test]
    async fn test_cancelled_reservation_frees_window() {
        let authority = authority().await;
        let session = Session::authenticated("alice", "token");

        let rsvp = authority.create_reservation(&session, request(0, 3)).await.unwrap();
        let cancelled = authority.cancel_reservation(&session, rsvp.id).await.unwrap();
        assert_eq!(cancelled.status, ReservationStatus::Cancelled);

        authority.create_reservation(&session, request(1, 2)).await.unwrap();
    }

    #[tokio::test]
    async fn test_availability_reports_booked_and_free_periods() {
        let authority = authority().await;
        authority
            .seed_reservation("bob", "car-1", window(2, 4), ReservationStatus::Confirmed)
            .await;

        let periods = authority
            .get_availability(&Session::anonymous(), &"car-1".to_string(), window(0, 6))
            .await
            .unwrap();
        let statuses: Vec<PeriodStatus> = periods.iter().map(|p| p.status).collect();
        assert_eq!(statuses, vec![PeriodStatus::Available, PeriodStatus::Booked, PeriodStatus::Available]);
    }

    #[tokio::test]
    async fn test_unknown_resource_and_anonymous_create() {
        let authority = authority().await;
        let err = authority
            .get_availability(&Session::anonymous(), &"car-404".to_string(), window(0, 1))
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::NotFound(_)));

        let err = authority
            .create_reservation(&Session::anonymous(), request(0, 1))
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn test_list_only_returns_own_reservations() {
        let authority = authority().await;
        authority.seed_reservation("bob", "car-1", window(0, 1), ReservationStatus::Confirmed).await;
        let alice = Session::authenticated("alice", "token");
        authority.create_reservation(&alice, request(2, 3)).await.unwrap();

        let mine = authority.list_reservations(&alice).await.unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].interval, window(2, 3));
    }
}
