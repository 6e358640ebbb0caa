pub mod availability;
pub mod pricing;

pub use availability::{conflicts, conflicts_between, IntervalSet};
pub use pricing::PriceCalculator;
