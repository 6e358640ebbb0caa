use serde::{Deserialize, Serialize};
use std::fmt;

/// Result of an availability check for the selected window
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    /// Not checked yet, or the check could not be completed. Cannot proceed.
    #[default]
    Unknown,
    Checking,
    Available,
    Unavailable,
}

impl Verdict {
    pub fn is_settled(&self) -> bool {
        *self != Verdict::Checking
    }
}

/// Step of the booking lifecycle an error or failure belongs to
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum BookingStage {
    Availability,
    Creation,
    Payment,
    Cancellation,
}

impl fmt::Display for BookingStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BookingStage::Availability => "availability",
            BookingStage::Creation => "creation",
            BookingStage::Payment => "payment",
            BookingStage::Cancellation => "cancellation",
        };
        f.write_str(name)
    }
}
