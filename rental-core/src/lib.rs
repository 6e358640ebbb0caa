pub mod payment;
pub mod repository;
pub mod session;

pub use payment::PaymentGateway;
pub use repository::ReservationAuthority;
pub use session::Session;

/// Failures reported by the external collaborators
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CoreError {
    /// The authority refused the window because it is already taken
    #[error("Window already booked: {0}")]
    Conflict(String),
    #[error("Request rejected: {0}")]
    Rejected(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Service unavailable: {0}")]
    Unavailable(String),
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
}

pub type CoreResult<T> = Result<T, CoreError>;
