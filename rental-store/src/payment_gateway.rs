use async_trait::async_trait;
use chrono::Utc;
use rental_core::{CoreError, CoreResult, PaymentGateway, Session};
use rental_shared::{PaymentIntent, PaymentStatus, ReservationId};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::RwLock;
use tracing::{info, warn};

/// Stand-in for a hosted checkout gateway.
///
/// Intents are keyed by reservation id, so repeated initialization returns the
/// same authorization URL. `fail_next` simulates gateway outages.
pub struct MockPaymentGateway {
    checkout_base_url: String,
    intents: RwLock<HashMap<ReservationId, PaymentIntent>>,
    settlements: RwLock<HashMap<ReservationId, PaymentStatus>>,
    init_calls: AtomicUsize,
    failures_left: AtomicUsize,
}

impl MockPaymentGateway {
    pub fn new(checkout_base_url: impl Into<String>) -> Self {
        Self {
            checkout_base_url: checkout_base_url.into(),
            intents: RwLock::new(HashMap::new()),
            settlements: RwLock::new(HashMap::new()),
            init_calls: AtomicUsize::new(0),
            failures_left: AtomicUsize::new(0),
        }
    }

    /// Make the next `count` initialization calls fail with `Unavailable`
    pub fn fail_next(&self, count: usize) {
        self.failures_left.store(count, Ordering::SeqCst);
    }

    pub fn init_calls(&self) -> usize {
        self.init_calls.load(Ordering::SeqCst)
    }

    /// Simulate the gateway webhook settling a payment
    pub async fn settle(&self, reservation_id: ReservationId, status: PaymentStatus) {
        self.settlements.write().await.insert(reservation_id, status);
    }

    fn take_failure(&self) -> bool {
        self.failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok()
    }
}

#[async_trait]
impl PaymentGateway for MockPaymentGateway {
    async fn initialize_payment(
        &self,
        _session: &Session,
        reservation_id: ReservationId,
    ) -> CoreResult<PaymentIntent> {
        self.init_calls.fetch_add(1, Ordering::SeqCst);
        if self.take_failure() {
            warn!("Simulated gateway failure for reservation {}", reservation_id);
            return Err(CoreError::Unavailable("simulated payment gateway failure".to_string()));
        }

        let mut intents = self.intents.write().await;
        if let Some(existing) = intents.get(&reservation_id) {
            return Ok(existing.clone());
        }

        let reference = format!("rsv_{}", reservation_id.0.simple());
        let intent = PaymentIntent {
            reservation_id,
            authorization_url: format!("{}/{}", self.checkout_base_url, reference),
            reference: Some(reference),
            created_at: Utc::now(),
        };
        intents.insert(reservation_id, intent.clone());
        info!("Payment initialized for reservation {}", reservation_id);
        Ok(intent)
    }

    async fn verify_payment(
        &self,
        _session: &Session,
        reservation_id: ReservationId,
    ) -> CoreResult<PaymentStatus> {
        if !self.intents.read().await.contains_key(&reservation_id) {
            return Err(CoreError::NotFound(format!("no payment for {}", reservation_id)));
        }
        Ok(self
            .settlements
            .read()
            .await
            .get(&reservation_id)
            .copied()
            .unwrap_or(PaymentStatus::Pending))
    }
}
