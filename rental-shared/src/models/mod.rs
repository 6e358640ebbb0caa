pub mod booking;
pub mod events;
pub mod interval;
pub mod payment;
pub mod reservation;

pub use booking::{BookingStage, Verdict};
pub use events::BookingEvent;
pub use interval::{Interval, IntervalError};
pub use payment::{PaymentIntent, PaymentStatus};
pub use reservation::{
    AvailabilityPeriod, NewReservation, PeriodStatus, Reservation, ReservationId,
    ReservationStatus, Resource, ResourceId,
};
