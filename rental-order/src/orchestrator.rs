use chrono::{DateTime, Utc};
use rental_core::{PaymentGateway, ReservationAuthority, Session};
use rental_shared::{
    BookingEvent, BookingStage, Interval, NewReservation, PaymentIntent, PaymentStatus, Reservation,
    ReservationId, Resource, Verdict,
};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::{broadcast, watch};
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::cancellation::CancellationHandler;
use crate::error::{BookingError, LastError};
use crate::models::{AvailabilitySnapshot, BookingDraft, BookingSnapshot, BookingState};
use crate::probe::{AvailabilityProbe, ProbeOutcome};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrchestratorConfig {
    /// Quiet period before an availability query is sent
    pub debounce: Duration,
    pub probe_timeout: Duration,
    /// Deadline for creation, payment and cancellation calls
    pub call_timeout: Duration,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(500),
            probe_timeout: Duration::from_secs(10),
            call_timeout: Duration::from_secs(15),
        }
    }
}

#[derive(Debug)]
struct Flow {
    state: BookingState,
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
    draft: Option<BookingDraft>,
    reservation: Option<Reservation>,
    payment_intent: Option<PaymentIntent>,
    payment_init_failed: bool,
    in_flight: bool,
    /// Bumped per submission so a stale release cannot clear a newer one
    submission: u64,
    last_error: Option<LastError>,
    availability: Option<AvailabilitySnapshot>,
    settlement: Option<PaymentStatus>,
}

impl Flow {
    fn new() -> Self {
        Self {
            state: BookingState::SelectingDates,
            start: None,
            end: None,
            draft: None,
            reservation: None,
            payment_intent: None,
            payment_init_failed: false,
            in_flight: false,
            submission: 0,
            last_error: None,
            availability: None,
            settlement: None,
        }
    }

    fn snapshot(&self) -> BookingSnapshot {
        BookingSnapshot {
            state: self.state.clone(),
            start_date: self.start,
            end_date: self.end,
            draft: self.draft.clone(),
            reservation: self.reservation.clone(),
            payment_intent: self.payment_intent.clone(),
            verdict: self.draft.as_ref().map(|d| d.verdict).unwrap_or_default(),
            computed_total: self
                .draft
                .as_ref()
                .map(|d| d.computed_total)
                .or_else(|| self.reservation.as_ref().map(|r| r.total_amount)),
            payment_init_failed: self.payment_init_failed,
            submitting: self.in_flight,
            last_error: self.last_error.clone(),
            availability: self.availability.clone(),
            settlement: self.settlement,
        }
    }

    fn ensure_selecting(&self, to: &str) -> Result<(), BookingError> {
        if self.state == BookingState::SelectingDates {
            Ok(())
        } else {
            Err(BookingError::invalid_transition(self.state.to_string(), to))
        }
    }

    fn clear_error_for(&mut self, stage: BookingStage) {
        if self.last_error.as_ref().is_some_and(|e| e.stage == stage) {
            self.last_error = None;
        }
    }
}

enum Step {
    Create(NewReservation),
    Pay(ReservationId),
}

/// Clears the in-flight flag when a `confirm` future is dropped before its
/// collaborator call returned. A no-op once the call has completed.
struct SubmissionRelease<'a> {
    orchestrator: &'a BookingOrchestrator,
    submission: u64,
}

impl Drop for SubmissionRelease<'_> {
    fn drop(&mut self) {
        let mut guard = self.orchestrator.flow();
        let flow = &mut *guard;
        if !flow.in_flight || flow.submission != self.submission {
            return;
        }

        flow.in_flight = false;
        warn!(submission = self.submission, "Submission abandoned before the call returned");
        // reservation exists but the payment step never finished: offer the retry
        if let (BookingState::AwaitingPayment, Some(reservation), None) =
            (&flow.state, &flow.reservation, &flow.payment_intent)
        {
            let err = BookingError::PaymentInitFailed {
                reservation_id: reservation.id,
                reason: "abandoned before the gateway answered".to_string(),
            };
            flow.payment_init_failed = true;
            flow.last_error = Some(LastError::new(BookingStage::Payment, &err));
        }
        self.orchestrator.publish(flow);
    }
}

struct Inner {
    resource: Resource,
    session: Session,
    authority: Arc<dyn ReservationAuthority>,
    gateway: Arc<dyn PaymentGateway>,
    probe: AvailabilityProbe,
    cancellations: CancellationHandler,
    config: OrchestratorConfig,
    flow: Mutex<Flow>,
    snapshots: watch::Sender<BookingSnapshot>,
    events: broadcast::Sender<BookingEvent>,
}

/// Drives one booking of one resource from date selection to payment handoff.
///
/// Cloning yields another handle to the same flow. Date and transition
/// operations are synchronous; only availability probes, reservation
/// creation, payment initialization, verification and cancellation await
/// external calls. State is never held across an await.
///
/// `BookingState::Confirmed` means "reservation exists and the payment flow
/// was launched". Settlement is observed separately through
/// [`BookingOrchestrator::verify_payment`].
#[derive(Clone)]
pub struct BookingOrchestrator {
    inner: Arc<Inner>,
}

impl BookingOrchestrator {
    pub fn new(
        resource: Resource,
        session: Session,
        authority: Arc<dyn ReservationAuthority>,
        gateway: Arc<dyn PaymentGateway>,
        config: OrchestratorConfig,
    ) -> Self {
        let flow = Flow::new();
        let (snapshots, _) = watch::channel(flow.snapshot());
        let (events, _) = broadcast::channel(64);

        Self {
            inner: Arc::new(Inner {
                probe: AvailabilityProbe::new(authority.clone(), config.debounce, config.probe_timeout),
                cancellations: CancellationHandler::new(authority.clone(), config.call_timeout),
                resource,
                session,
                authority,
                gateway,
                config,
                flow: Mutex::new(flow),
                snapshots,
                events,
            }),
        }
    }

    pub fn resource(&self) -> &Resource {
        &self.inner.resource
    }

    pub fn state(&self) -> BookingState {
        self.flow().state.clone()
    }

    pub fn snapshot(&self) -> BookingSnapshot {
        self.flow().snapshot()
    }

    /// Latest snapshot, updated after every change
    pub fn subscribe(&self) -> watch::Receiver<BookingSnapshot> {
        self.inner.snapshots.subscribe()
    }

    pub fn events(&self) -> broadcast::Receiver<BookingEvent> {
        self.inner.events.subscribe()
    }

    /// A start date that is not strictly before the current end date clears the end date.
    pub fn set_start_date(&self, start: DateTime<Utc>) -> Result<(), BookingError> {
        let mut guard = self.flow();
        let flow = &mut *guard;
        flow.ensure_selecting(BookingState::SelectingDates.name())?;

        flow.start = Some(start);
        if flow.end.is_some_and(|end| start >= end) {
            debug!("Start date moved to or past end date; end date cleared");
            flow.end = None;
        }
        self.dates_changed(flow);
        Ok(())
    }

    /// An end date not after the current start date is rejected and nothing changes.
    pub fn set_end_date(&self, end: DateTime<Utc>) -> Result<(), BookingError> {
        let mut guard = self.flow();
        let flow = &mut *guard;
        flow.ensure_selecting(BookingState::SelectingDates.name())?;

        if let Some(start) = flow.start {
            Interval::new(start, end)?;
        }
        flow.end = Some(end);
        self.dates_changed(flow);
        Ok(())
    }

    pub fn clear_dates(&self) -> Result<(), BookingError> {
        let mut guard = self.flow();
        let flow = &mut *guard;
        flow.ensure_selecting(BookingState::SelectingDates.name())?;

        flow.start = None;
        flow.end = None;
        self.dates_changed(flow);
        Ok(())
    }

    /// Query the authority again for the current dates, e.g. after `Verdict::Unknown`.
    pub fn recheck_availability(&self) -> Result<(), BookingError> {
        let mut guard = self.flow();
        let flow = &mut *guard;
        flow.ensure_selecting("CHECKING")?;
        if flow.draft.is_none() {
            return Err(BookingError::invalid_transition("SELECTING_DATES (no dates)", "CHECKING"));
        }
        debug!(resource_id = %self.inner.resource.id, "Rechecking availability");
        self.restart_probe(flow);
        self.publish(flow);
        Ok(())
    }

    /// User-gated `SelectingDates -> Reviewing`; needs an `available` verdict.
    pub fn review(&self) -> Result<(), BookingError> {
        let mut guard = self.flow();
        let flow = &mut *guard;
        let to = BookingState::Reviewing.name();
        flow.ensure_selecting(to)?;

        match &flow.draft {
            Some(draft) if draft.verdict == Verdict::Available => {}
            Some(draft) => {
                return Err(BookingError::invalid_transition(
                    format!("SELECTING_DATES (verdict {:?})", draft.verdict),
                    to,
                ))
            }
            None => return Err(BookingError::invalid_transition("SELECTING_DATES (no dates)", to)),
        }

        flow.state = BookingState::Reviewing;
        info!(resource_id = %self.inner.resource.id, "Reviewing booking");
        self.publish(flow);
        Ok(())
    }

    /// Back to date selection, keeping the dates. Only while no reservation exists.
    pub fn back_to_dates(&self) -> Result<(), BookingError> {
        let mut guard = self.flow();
        let flow = &mut *guard;
        let can_go_back = matches!(
            flow.state,
            BookingState::Reviewing | BookingState::Failed { stage: BookingStage::Creation, .. }
        ) && flow.reservation.is_none()
            && !flow.in_flight;
        if !can_go_back {
            return Err(BookingError::invalid_transition(
                flow.state.to_string(),
                BookingState::SelectingDates.name(),
            ));
        }

        flow.state = BookingState::SelectingDates;
        flow.clear_error_for(BookingStage::Creation);
        self.restart_probe(flow);
        self.publish(flow);
        Ok(())
    }

    /// `Reviewing -> AwaitingPayment -> Confirmed`.
    ///
    /// Creates the reservation, then initializes payment for it. While a call
    /// is in flight a second invocation returns the current snapshot without
    /// doing anything. Once a reservation exists it is never created again:
    /// re-invoking only retries the payment step.
    ///
    /// Dropping the returned future releases the submission: the flow leaves
    /// `submitting`, and if the reservation already exists it is marked
    /// `payment_init_failed` so the payment retry is offered.
    pub async fn confirm(&self) -> Result<BookingSnapshot, BookingError> {
        let (step, submission) = {
            let mut guard = self.flow();
            let flow = &mut *guard;
            if flow.in_flight {
                debug!("Submission already in flight; ignoring");
                return Ok(flow.snapshot());
            }

            let step = match (&flow.state, &flow.reservation) {
                (BookingState::Confirmed, Some(_)) => return Ok(flow.snapshot()),
                (BookingState::AwaitingPayment, Some(reservation)) => {
                    if reservation.is_cancelled() {
                        return Err(BookingError::invalid_transition(
                            "AWAITING_PAYMENT (reservation cancelled)",
                            BookingState::Confirmed.name(),
                        ));
                    }
                    Step::Pay(reservation.id)
                }
                (BookingState::Failed { .. }, None)
                    if flow.last_error.as_ref().is_some_and(LastError::requires_new_dates) =>
                {
                    return Err(BookingError::invalid_transition(
                        "FAILED(conflict)",
                        BookingState::AwaitingPayment.name(),
                    ));
                }
                (
                    BookingState::Reviewing | BookingState::Failed { stage: BookingStage::Creation, .. },
                    None,
                ) => match &flow.draft {
                    Some(draft) => Step::Create(NewReservation {
                        resource_id: draft.resource_id.clone(),
                        interval: draft.interval,
                        total_amount: draft.computed_total,
                    }),
                    None => {
                        return Err(BookingError::invalid_transition(
                            flow.state.to_string(),
                            BookingState::AwaitingPayment.name(),
                        ))
                    }
                },
                (state, _) => {
                    return Err(BookingError::invalid_transition(
                        state.to_string(),
                        BookingState::AwaitingPayment.name(),
                    ))
                }
            };

            if matches!(step, Step::Create(_)) && !self.inner.session.is_authenticated() {
                let err = BookingError::Unauthenticated;
                flow.last_error = Some(LastError::new(BookingStage::Creation, &err));
                self.publish(flow);
                return Err(err);
            }

            flow.in_flight = true;
            flow.submission += 1;
            self.publish(flow);
            (step, flow.submission)
        };
        let _release = SubmissionRelease {
            orchestrator: self,
            submission,
        };

        let reservation_id = match step {
            Step::Create(request) => match self.create(request).await? {
                Some(id) => id,
                None => return Ok(self.snapshot()),
            },
            Step::Pay(id) => id,
        };
        self.initialize_payment(reservation_id).await
    }

    /// Re-send creation after `Failed(creation)`. Refused after a conflict.
    pub async fn retry_creation(&self) -> Result<BookingSnapshot, BookingError> {
        {
            let flow = self.flow();
            if !matches!(
                flow.state,
                BookingState::Reviewing | BookingState::Failed { stage: BookingStage::Creation, .. }
            ) {
                return Err(BookingError::invalid_transition(
                    flow.state.to_string(),
                    BookingState::AwaitingPayment.name(),
                ));
            }
        }
        self.confirm().await
    }

    /// Retry payment initialization for the reservation already held.
    pub async fn retry_payment_init(&self) -> Result<BookingSnapshot, BookingError> {
        {
            let flow = self.flow();
            match (&flow.state, &flow.reservation) {
                (BookingState::Confirmed, Some(_)) => return Ok(flow.snapshot()),
                (BookingState::AwaitingPayment, Some(_)) => {}
                (state, _) => {
                    return Err(BookingError::invalid_transition(
                        state.to_string(),
                        BookingState::Confirmed.name(),
                    ))
                }
            }
        }
        self.confirm().await
    }

    /// Ask the gateway whether the payment settled. Advisory: the flow state
    /// does not change, only `snapshot().settlement`.
    pub async fn verify_payment(&self) -> Result<PaymentStatus, BookingError> {
        let reservation_id = {
            let flow = self.flow();
            match (&flow.reservation, &flow.payment_intent) {
                (Some(reservation), Some(_)) => reservation.id,
                _ => {
                    return Err(BookingError::invalid_transition(
                        flow.state.to_string(),
                        "PAYMENT_VERIFIED",
                    ))
                }
            }
        };

        let inner = &self.inner;
        let result = match timeout(
            inner.config.call_timeout,
            inner.gateway.verify_payment(&inner.session, reservation_id),
        )
        .await
        {
            Ok(Ok(status)) => Ok(status),
            Ok(Err(err)) => Err(BookingError::Unknown(err.to_string())),
            Err(_) => Err(BookingError::Timeout {
                stage: BookingStage::Payment,
                after: inner.config.call_timeout,
            }),
        };

        let mut guard = self.flow();
        let flow = &mut *guard;
        match result {
            Ok(status) => {
                flow.settlement = Some(status);
                flow.clear_error_for(BookingStage::Payment);
                info!(%reservation_id, ?status, "Payment status verified");
                self.publish(flow);
                Ok(status)
            }
            Err(err) => {
                warn!(%reservation_id, "Payment verification failed: {}", err);
                flow.last_error = Some(LastError::new(BookingStage::Payment, &err));
                self.publish(flow);
                Err(err)
            }
        }
    }

    /// Cancel the reservation this flow created. With only a draft there is
    /// nothing to cancel.
    pub async fn cancel_reservation(&self) -> Result<Reservation, BookingError> {
        let reservation = {
            let flow = self.flow();
            match &flow.reservation {
                _ if flow.in_flight => {
                    return Err(BookingError::invalid_transition(
                        format!("{} (submitting)", flow.state),
                        "CANCELLED",
                    ))
                }
                Some(reservation) => reservation.clone(),
                None => {
                    let from = if flow.draft.is_some() { "DRAFT" } else { "NO_RESERVATION" };
                    return Err(BookingError::invalid_transition(from, "CANCELLED"));
                }
            }
        };

        let result = self.inner.cancellations.cancel(&self.inner.session, &reservation).await;
        let mut guard = self.flow();
        let flow = &mut *guard;
        match result {
            Ok(updated) => {
                if !reservation.is_cancelled() {
                    self.emit(BookingEvent::ReservationCancelled {
                        reservation_id: updated.id,
                        timestamp: Utc::now().timestamp(),
                    });
                }
                flow.reservation = Some(updated.clone());
                flow.clear_error_for(BookingStage::Cancellation);
                self.publish(flow);
                Ok(updated)
            }
            Err(err) => {
                flow.last_error = Some(LastError::new(BookingStage::Cancellation, &err));
                self.publish(flow);
                Err(err)
            }
        }
    }

    /// User abandons the flow. In-flight probes are discarded; a creation
    /// already sent still records its reservation but payment is not started.
    pub fn abort(&self) -> Result<(), BookingError> {
        let mut guard = self.flow();
        let flow = &mut *guard;
        if flow.state.is_terminal() {
            return Err(BookingError::invalid_transition(
                flow.state.to_string(),
                BookingState::Aborted.name(),
            ));
        }

        self.inner.probe.invalidate();
        if let Some(draft) = flow.draft.as_mut().filter(|d| d.verdict == Verdict::Checking) {
            draft.verdict = Verdict::Unknown;
        }
        flow.state = BookingState::Aborted;
        info!(resource_id = %self.inner.resource.id, "Booking flow aborted");
        self.emit(BookingEvent::Aborted {
            resource_id: self.inner.resource.id.clone(),
            timestamp: Utc::now().timestamp(),
        });
        self.publish(flow);
        Ok(())
    }

    /// Drop the draft and everything else, back to an empty `SelectingDates`.
    pub fn reset(&self) -> Result<(), BookingError> {
        let mut guard = self.flow();
        if guard.in_flight {
            return Err(BookingError::invalid_transition(
                format!("{} (submitting)", guard.state),
                BookingState::SelectingDates.name(),
            ));
        }

        self.inner.probe.invalidate();
        let submission = guard.submission;
        *guard = Flow::new();
        guard.submission = submission;
        debug!(resource_id = %self.inner.resource.id, "Booking flow reset");
        self.publish(&guard);
        Ok(())
    }

    fn flow(&self) -> MutexGuard<'_, Flow> {
        self.inner.flow.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, flow: &Flow) {
        self.inner.snapshots.send_replace(flow.snapshot());
    }

    fn emit(&self, event: BookingEvent) {
        // no subscribers is fine
        let _ = self.inner.events.send(event);
    }

    /// Rebuild the draft from the selected dates and start a probe for it.
    fn dates_changed(&self, flow: &mut Flow) {
        let interval = match (flow.start, flow.end) {
            (Some(start), Some(end)) => Interval::new(start, end).ok(),
            _ => None,
        };

        match interval {
            Some(interval) => {
                if let Some(draft) = flow.draft.as_mut() {
                    draft.reselect(interval);
                } else {
                    flow.draft = Some(BookingDraft::new(&self.inner.resource, interval));
                }
                self.restart_probe(flow);
            }
            None => {
                flow.availability = None;
                flow.clear_error_for(BookingStage::Availability);
                flow.draft = None;
                self.inner.probe.invalidate();
            }
        }

        self.emit(BookingEvent::DatesChanged {
            resource_id: self.inner.resource.id.clone(),
            interval,
            timestamp: Utc::now().timestamp(),
        });
        self.publish(flow);
    }

    /// Supersede any running probe and check the current draft again. The
    /// dates are untouched, so no `DatesChanged` is emitted here.
    fn restart_probe(&self, flow: &mut Flow) {
        flow.availability = None;
        flow.clear_error_for(BookingStage::Availability);
        let Some(draft) = flow.draft.as_mut() else {
            self.inner.probe.invalidate();
            return;
        };
        draft.verdict = Verdict::Checking;
        let interval = draft.interval;

        let generation = self.inner.probe.next_generation();
        if !self.spawn_probe(generation, interval) {
            let err = BookingError::Unknown("no async runtime to run the availability check".to_string());
            draft.verdict = Verdict::Unknown;
            flow.last_error = Some(LastError::new(BookingStage::Availability, &err));
        }
    }

    fn spawn_probe(&self, generation: u64, interval: Interval) -> bool {
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            warn!("Availability probe not started: no Tokio runtime");
            return false;
        };

        let this = self.clone();
        handle.spawn(async move {
            let inner = &this.inner;
            let outcome = inner
                .probe
                .check_as(generation, &inner.session, &inner.resource.id, interval)
                .await;
            if let Some(outcome) = outcome {
                this.apply_probe(outcome);
            }
        });
        true
    }

    fn apply_probe(&self, outcome: ProbeOutcome) {
        let mut guard = self.flow();
        let flow = &mut *guard;
        // checked again under the lock: dates may have changed since the probe returned
        if !self.inner.probe.is_current(outcome.generation) || flow.state != BookingState::SelectingDates {
            debug!(generation = outcome.generation, "Dropping superseded availability result");
            return;
        }
        let Some(draft) = flow.draft.as_mut().filter(|d| d.interval == outcome.window) else {
            return;
        };

        draft.verdict = outcome.verdict;
        match &outcome.error {
            Some(err) => flow.last_error = Some(LastError::new(BookingStage::Availability, err)),
            None => {
                flow.availability = Some(AvailabilitySnapshot {
                    resource_id: self.inner.resource.id.clone(),
                    window: outcome.window,
                    periods: outcome.periods,
                });
            }
        }

        info!(
            generation = outcome.generation,
            resource_id = %self.inner.resource.id,
            verdict = ?outcome.verdict,
            "Availability verdict applied"
        );
        self.emit(BookingEvent::VerdictChanged {
            resource_id: self.inner.resource.id.clone(),
            generation: outcome.generation,
            verdict: outcome.verdict,
            timestamp: Utc::now().timestamp(),
        });
        self.publish(flow);
    }

    /// `Ok(None)` when the flow was aborted while the call was in flight.
    async fn create(&self, request: NewReservation) -> Result<Option<ReservationId>, BookingError> {
        let inner = &self.inner;
        info!(
            resource_id = %request.resource_id,
            window = %request.interval,
            total = %request.total_amount,
            "Creating reservation"
        );

        let result = match timeout(
            inner.config.call_timeout,
            inner.authority.create_reservation(&inner.session, request),
        )
        .await
        {
            Ok(Ok(reservation)) => Ok(reservation),
            Ok(Err(err)) => Err(BookingError::from_creation(err)),
            Err(_) => Err(BookingError::Timeout {
                stage: BookingStage::Creation,
                after: inner.config.call_timeout,
            }),
        };

        let mut guard = self.flow();
        let flow = &mut *guard;
        match result {
            Ok(reservation) => {
                let id = reservation.id;
                info!(reservation_id = %id, "Reservation created");
                self.emit(BookingEvent::ReservationCreated {
                    reservation_id: id,
                    resource_id: reservation.resource_id.clone(),
                    total_amount: reservation.total_amount,
                    timestamp: Utc::now().timestamp(),
                });
                flow.reservation = Some(reservation);

                if flow.state == BookingState::Aborted {
                    warn!(reservation_id = %id, "Reservation created after the flow was aborted; payment not started");
                    flow.in_flight = false;
                    self.publish(flow);
                    return Ok(None);
                }

                flow.draft = None;
                flow.state = BookingState::AwaitingPayment;
                flow.last_error = None;
                self.publish(flow);
                Ok(Some(id))
            }
            Err(err) => {
                warn!(resource_id = %inner.resource.id, "Reservation creation failed: {}", err);
                flow.in_flight = false;
                if matches!(err, BookingError::Conflict(_)) {
                    // the authority overrides a stale client-side verdict
                    if let Some(draft) = flow.draft.as_mut() {
                        draft.verdict = Verdict::Unavailable;
                    }
                }
                flow.last_error = Some(LastError::new(BookingStage::Creation, &err));
                if flow.state != BookingState::Aborted {
                    flow.state = BookingState::Failed {
                        stage: BookingStage::Creation,
                        reason: err.to_string(),
                    };
                }
                self.emit(BookingEvent::Failed {
                    stage: BookingStage::Creation,
                    reason: err.to_string(),
                    timestamp: Utc::now().timestamp(),
                });
                self.publish(flow);
                Err(err)
            }
        }
    }

    async fn initialize_payment(&self, reservation_id: ReservationId) -> Result<BookingSnapshot, BookingError> {
        let inner = &self.inner;
        info!(%reservation_id, "Initializing payment");

        let result = match timeout(
            inner.config.call_timeout,
            inner.gateway.initialize_payment(&inner.session, reservation_id),
        )
        .await
        {
            Ok(Ok(intent)) => Ok(intent),
            Ok(Err(err)) => Err(err.to_string()),
            Err(_) => Err(format!("timed out after {:?}", inner.config.call_timeout)),
        };

        let mut guard = self.flow();
        let flow = &mut *guard;
        flow.in_flight = false;
        match result {
            Ok(intent) => {
                self.emit(BookingEvent::PaymentInitialized {
                    reservation_id,
                    authorization_url: intent.authorization_url.clone(),
                    timestamp: Utc::now().timestamp(),
                });
                flow.payment_intent = Some(intent);
                flow.payment_init_failed = false;
                flow.clear_error_for(BookingStage::Payment);
                if flow.state == BookingState::AwaitingPayment {
                    flow.state = BookingState::Confirmed;
                    info!(%reservation_id, "Payment handoff succeeded");
                }
                self.publish(flow);
                Ok(flow.snapshot())
            }
            Err(reason) => {
                warn!(%reservation_id, "Payment initialization failed: {}", reason);
                let err = BookingError::PaymentInitFailed {
                    reservation_id,
                    reason: reason.clone(),
                };
                flow.payment_init_failed = true;
                flow.last_error = Some(LastError::new(BookingStage::Payment, &err));
                self.emit(BookingEvent::PaymentInitFailed {
                    reservation_id,
                    reason,
                    timestamp: Utc::now().timestamp(),
                });
                self.publish(flow);
                Err(err)
            }
        }
    }
}
