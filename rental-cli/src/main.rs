use anyhow::Context;
use chrono::{Duration, Utc};
use rental_cli::{book, demo_resource, orchestrator_config, seeded_authority, summary};
use rental_core::Session;
use rental_order::{BookingHistory, BookingOrchestrator};
use rental_shared::Interval;
use rental_store::{Config, MockPaymentGateway};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rental_cli=debug,rental_order=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load().context("Failed to load config")?;
    tracing::info!(
        debounce_ms = config.booking.debounce_ms,
        call_timeout_secs = config.booking.call_timeout_secs,
        "Starting rental booking demo"
    );

    let now = Utc::now();
    let day = |n: i64| now + Duration::days(n);

    let authority = seeded_authority(Interval::new(day(2), day(4))?).await;
    let gateway = Arc::new(MockPaymentGateway::new(config.payment.checkout_base_url.clone()));
    let session = Session::authenticated("demo-user", "demo-token");

    let orchestrator = BookingOrchestrator::new(
        demo_resource(),
        session.clone(),
        authority.clone(),
        gateway,
        orchestrator_config(&config.booking),
    );

    // overlaps the seeded booking
    if let Err(err) = book(&orchestrator, day(3), day(5)).await {
        tracing::info!("First attempt refused: {:#}", err);
    }
    orchestrator.clear_dates()?;

    let snapshot = book(&orchestrator, day(5), day(8)).await?;
    println!("{}", serde_json::to_string_pretty(&snapshot)?);
    println!("{}", summary(&snapshot, &config.booking.currency));

    let status = orchestrator.verify_payment().await?;
    tracing::info!(?status, "Payment status checked");

    let mut history = BookingHistory::new(authority, config.booking.call_timeout());
    for reservation in history.load(&session).await? {
        println!(
            "{}  {}  {}  {} {:.2}",
            reservation.id, reservation.interval, reservation.status, config.booking.currency, reservation.total_amount
        );
    }

    Ok(())
}
