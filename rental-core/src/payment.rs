use async_trait::async_trait;
use rental_shared::{PaymentIntent, PaymentStatus, ReservationId};

use crate::{CoreResult, Session};

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Start a payment for an existing reservation. Retry-safe per reservation id.
    async fn initialize_payment(
        &self,
        session: &Session,
        reservation_id: ReservationId,
    ) -> CoreResult<PaymentIntent>;

    /// Settlement status as last seen by the gateway
    async fn verify_payment(
        &self,
        session: &Session,
        reservation_id: ReservationId,
    ) -> CoreResult<PaymentStatus>;
}
