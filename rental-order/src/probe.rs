use rental_catalog::IntervalSet;
use rental_core::{ReservationAuthority, Session};
use rental_shared::{AvailabilityPeriod, BookingStage, Interval, ResourceId, Verdict};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, timeout};
use tracing::{debug, warn};

use crate::error::BookingError;

/// Result of one probe cycle that was still current when it finished
#[derive(Debug, Clone, PartialEq)]
pub struct ProbeOutcome {
    pub generation: u64,
    pub window: Interval,
    pub verdict: Verdict,
    pub periods: Vec<AvailabilityPeriod>,
    pub error: Option<BookingError>,
}

/// Debounced availability check against the reservation authority.
///
/// Every request takes a new generation; a result is only handed back when
/// its generation is still the latest, both after the quiet period and after
/// the authority answers. Superseded calls are not cancelled, their results
/// are dropped.
pub struct AvailabilityProbe {
    authority: Arc<dyn ReservationAuthority>,
    generation: AtomicU64,
    debounce: Duration,
    timeout: Duration,
}

impl AvailabilityProbe {
    pub fn new(authority: Arc<dyn ReservationAuthority>, debounce: Duration, timeout: Duration) -> Self {
        Self {
            authority,
            generation: AtomicU64::new(0),
            debounce,
            timeout,
        }
    }

    /// Supersede every earlier request and return the generation for the next one
    pub fn next_generation(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Drop whatever is in flight without starting a new request
    pub fn invalidate(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
    }

    pub fn current_generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    pub fn is_current(&self, generation: u64) -> bool {
        self.current_generation() == generation
    }

    /// Start a new request and run it. `None` means a later request superseded it.
    pub async fn check(
        &self,
        session: &Session,
        resource_id: &ResourceId,
        candidate: Interval,
    ) -> Option<ProbeOutcome> {
        let generation = self.next_generation();
        self.check_as(generation, session, resource_id, candidate).await
    }

    /// Run a request whose generation was taken earlier with [`Self::next_generation`].
    pub async fn check_as(
        &self,
        generation: u64,
        session: &Session,
        resource_id: &ResourceId,
        candidate: Interval,
    ) -> Option<ProbeOutcome> {
        sleep(self.debounce).await;
        if !self.is_current(generation) {
            debug!(generation, "Availability probe superseded during quiet period");
            return None;
        }

        debug!(generation, %resource_id, window = %candidate, "Querying availability");
        let answer = timeout(
            self.timeout,
            self.authority.get_availability(session, resource_id, candidate),
        )
        .await;

        if !self.is_current(generation) {
            debug!(generation, "Discarding stale availability result");
            return None;
        }

        let outcome = match answer {
            Ok(Ok(periods)) => {
                let verdict = if IntervalSet::from_periods(&periods).conflicts(&candidate) {
                    Verdict::Unavailable
                } else {
                    Verdict::Available
                };
                ProbeOutcome { generation, window: candidate, verdict, periods, error: None }
            }
            Ok(Err(err)) => {
                warn!(generation, %resource_id, "Availability check failed: {}", err);
                ProbeOutcome {
                    generation,
                    window: candidate,
                    verdict: Verdict::Unknown,
                    periods: Vec::new(),
                    error: Some(BookingError::Unknown(err.to_string())),
                }
            }
            Err(_) => {
                warn!(generation, %resource_id, "Availability check timed out after {:?}", self.timeout);
                ProbeOutcome {
                    generation,
                    window: candidate,
                    verdict: Verdict::Unknown,
                    periods: Vec::new(),
                    error: Some(BookingError::Timeout {
                        stage: BookingStage::Availability,
                        after: self.timeout,
                    }),
                }
            }
        };
        Some(outcome)
    }
}
