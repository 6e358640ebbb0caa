pub mod app_config;
pub mod memory_repo;
pub mod payment_gateway;

pub use app_config::{BookingRules, Config};
pub use memory_repo::InMemoryAuthority;
pub use payment_gateway::MockPaymentGateway;
