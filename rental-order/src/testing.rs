//! Scriptable collaborators for unit tests. Responses can be gated so a test
//! decides when (and in which order) calls complete.

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use rental_core::{CoreError, CoreResult, PaymentGateway, ReservationAuthority, Session};
use rental_shared::{
    AvailabilityPeriod, Interval, NewReservation, PaymentIntent, PaymentStatus, Reservation,
    ReservationId, ReservationStatus, Resource, ResourceId,
};
use rust_decimal_macros::dec;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use tokio::sync::oneshot;

pub fn at_day(n: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 9, 1, 10, 0, 0).unwrap() + Duration::days(n)
}

pub fn window(from: i64, to: i64) -> Interval {
    Interval::new(at_day(from), at_day(to)).unwrap()
}

pub fn car() -> Resource {
    Resource::new("car-1", "Toyota Corolla", dec!(50))
}

pub struct Gate<T>(oneshot::Sender<T>);

impl<T> Gate<T> {
    pub fn release(self, value: T) {
        let _ = self.0.send(value);
    }
}

#[derive(Default)]
pub struct GatedAuthority {
    periods: Mutex<Vec<AvailabilityPeriod>>,
    availability_error: Mutex<Option<String>>,
    availability_gates: Mutex<VecDeque<oneshot::Receiver<Vec<AvailabilityPeriod>>>>,
    creation_gates: Mutex<VecDeque<oneshot::Receiver<CoreResult<()>>>>,
    created: Mutex<Vec<Reservation>>,
    availability_calls: AtomicUsize,
    create_calls: AtomicUsize,
}

impl GatedAuthority {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer every ungated availability call with `periods`
    pub fn respond_with(&self, periods: Vec<AvailabilityPeriod>) {
        *self.periods.lock().unwrap() = periods;
    }

    pub fn fail_availability(&self, message: &str) {
        *self.availability_error.lock().unwrap() = Some(message.to_string());
    }

    pub fn clear_availability_failure(&self) {
        *self.availability_error.lock().unwrap() = None;
    }

    /// The next availability call waits for the returned gate
    pub fn gate_availability(&self) -> Gate<Vec<AvailabilityPeriod>> {
        let (tx, rx) = oneshot::channel();
        self.availability_gates.lock().unwrap().push_back(rx);
        Gate(tx)
    }

    /// The next creation call waits for the returned gate; `Err` fails it
    pub fn gate_creation(&self) -> Gate<CoreResult<()>> {
        let (tx, rx) = oneshot::channel();
        self.creation_gates.lock().unwrap().push_back(rx);
        Gate(tx)
    }

    pub fn availability_calls(&self) -> usize {
        self.availability_calls.load(Ordering::SeqCst)
    }

    pub fn create_calls(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ReservationAuthority for GatedAuthority {
    async fn get_availability(
        &self,
        _session: &Session,
        _resource_id: &ResourceId,
        _window: Interval,
    ) -> CoreResult<Vec<AvailabilityPeriod>> {
        self.availability_calls.fetch_add(1, Ordering::SeqCst);
        let gate = self.availability_gates.lock().unwrap().pop_front();
        if let Some(rx) = gate {
            return rx.await.map_err(|_| CoreError::Unavailable("gate dropped".into()));
        }
        if let Some(message) = self.availability_error.lock().unwrap().clone() {
            return Err(CoreError::Unavailable(message));
        }
        Ok(self.periods.lock().unwrap().clone())
    }

    async fn create_reservation(
        &self,
        _session: &Session,
        request: NewReservation,
    ) -> CoreResult<Reservation> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        let gate = self.creation_gates.lock().unwrap().pop_front();
        if let Some(rx) = gate {
            rx.await.map_err(|_| CoreError::Unavailable("gate dropped".into()))??;
        }
        let reservation = Reservation::pending(request.resource_id, request.interval, request.total_amount);
        self.created.lock().unwrap().push(reservation.clone());
        Ok(reservation)
    }

    async fn cancel_reservation(
        &self,
        _session: &Session,
        id: ReservationId,
    ) -> CoreResult<Reservation> {
        let mut created = self.created.lock().unwrap();
        let reservation = created
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| CoreError::NotFound(id.to_string()))?;
        reservation.status = ReservationStatus::Cancelled;
        Ok(reservation.clone())
    }

    async fn list_reservations(&self, _session: &Session) -> CoreResult<Vec<Reservation>> {
        Ok(self.created.lock().unwrap().clone())
    }
}

/// Gateway that never answers, optionally except for initialization
#[derive(Default)]
pub struct StalledGateway {
    answer_init: bool,
}

impl StalledGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hands out intents but never answers verification
    pub fn stalling_verification() -> Self {
        Self { answer_init: true }
    }
}

#[async_trait]
impl PaymentGateway for StalledGateway {
    async fn initialize_payment(
        &self,
        _session: &Session,
        reservation_id: ReservationId,
    ) -> CoreResult<PaymentIntent> {
        if !self.answer_init {
            std::future::pending::<()>().await;
        }
        Ok(PaymentIntent {
            reservation_id,
            authorization_url: format!("https://pay.test/{}", reservation_id),
            reference: None,
            created_at: Utc::now(),
        })
    }

    async fn verify_payment(
        &self,
        _session: &Session,
        _reservation_id: ReservationId,
    ) -> CoreResult<PaymentStatus> {
        std::future::pending().await
    }
}
