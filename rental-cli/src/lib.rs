//! Wiring for the booking demo: config mapping, seed data and a scripted
//! booking run on top of [`BookingOrchestrator`].

use anyhow::{bail, Context};
use chrono::{DateTime, Utc};
use rental_catalog::PriceCalculator;
use rental_order::{BookingOrchestrator, BookingSnapshot, OrchestratorConfig};
use rental_shared::{Interval, ReservationStatus, Resource, Verdict};
use rental_store::{BookingRules, InMemoryAuthority};
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::info;

pub const DEMO_RESOURCE_ID: &str = "car-001";

pub fn orchestrator_config(rules: &BookingRules) -> OrchestratorConfig {
    OrchestratorConfig {
        debounce: rules.debounce(),
        probe_timeout: rules.probe_timeout(),
        call_timeout: rules.call_timeout(),
    }
}

pub fn demo_resource() -> Resource {
    Resource::new(DEMO_RESOURCE_ID, "Toyota Corolla 2019", Decimal::new(4500, 2))
}

/// Authority holding the demo car, already booked by someone else for `taken`.
pub async fn seeded_authority(taken: Interval) -> Arc<InMemoryAuthority> {
    let authority = Arc::new(InMemoryAuthority::new());
    authority.add_resource(demo_resource()).await;
    authority
        .seed_reservation("other-renter", DEMO_RESOURCE_ID, taken, ReservationStatus::Confirmed)
        .await;
    authority
}

/// Wait until the current availability check resolves.
pub async fn wait_for_verdict(orchestrator: &BookingOrchestrator) -> anyhow::Result<Verdict> {
    let mut snapshots = orchestrator.subscribe();
    let snapshot = snapshots
        .wait_for(|s| s.verdict.is_settled())
        .await
        .context("booking flow dropped")?;
    Ok(snapshot.verdict)
}

/// Select dates, wait for the verdict, review and confirm.
pub async fn book(
    orchestrator: &BookingOrchestrator,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> anyhow::Result<BookingSnapshot> {
    orchestrator.set_start_date(start)?;
    orchestrator.set_end_date(end)?;

    let verdict = wait_for_verdict(orchestrator).await?;
    if verdict != Verdict::Available {
        bail!(
            "{} cannot be booked from {} to {}: availability is {:?}",
            orchestrator.resource().id,
            start,
            end,
            verdict
        );
    }

    orchestrator.review()?;
    let snapshot = orchestrator.confirm().await.context("confirming booking")?;
    info!(state = %snapshot.state, "Booking submitted");
    Ok(snapshot)
}

/// One-line description of where a booking flow ended up
pub fn summary(snapshot: &BookingSnapshot, currency: &str) -> String {
    let Some(reservation) = &snapshot.reservation else {
        return format!("No reservation ({})", snapshot.state);
    };
    let days = PriceCalculator::rental_days(&reservation.interval);
    let mut line = format!(
        "Reservation {} for {} day(s), {} {:.2}: {}",
        reservation.id, days, currency, reservation.total_amount, snapshot.state
    );
    match &snapshot.payment_intent {
        Some(intent) => line.push_str(&format!(", pay at {}", intent.authorization_url)),
        None if snapshot.payment_init_failed => line.push_str(", payment not started (retry)"),
        None => {}
    }
    line
}
