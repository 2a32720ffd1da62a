mod config;
mod listeners;
mod logging;

use crate::config::ShellConfig;
use crate::listeners::{ORDER_PLACED, SYSTEM_SHUTDOWN, ShellEvent, USER_LOGIN};
use anyhow::Context;
use herald_events::{Dispatcher, EmitOptions, Event, EventKey, load_config};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let (cfg, fallback) = match load_config::<ShellConfig>(Some("herald")) {
        Ok(cfg) => (cfg, None),
        Err(err) => (ShellConfig::default(), Some(err)),
    };

    logging::init(cfg.log_filter.as_deref(), cfg.dispatcher.debug)?;

    if let Some(err) = fallback {
        warn!(error = %err, "No usable configuration, running with defaults");
    }

    let dispatcher = Dispatcher::<ShellEvent>::builder()
        .config(cfg.dispatcher.clone())
        .on_error(|err, ctx| {
            warn!(event = %ctx.event, listener_index = ctx.listener_index, error = %err, "Listener failed");
        })
        .on_capacity_exceeded(|key, count, max| {
            warn!(event = %key, count, max, "Too many listeners, possible leak");
        })
        .build();

    listeners::register_all(&dispatcher).context("Failed to register listeners")?;
    info!(registry = ?dispatcher.registry(), "Listeners registered");

    run(&dispatcher, &cfg).await
}

async fn run(dispatcher: &Dispatcher<ShellEvent>, cfg: &ShellConfig) -> anyhow::Result<()> {
    let login = EventKey::new(USER_LOGIN)?;
    dispatcher.emit(Event::new(login.clone(), ShellEvent::UserLogin { user: "alice".into() }));
    dispatcher.emit(Event::new(login, ShellEvent::UserLogin { user: String::new() }));

    let order = EventKey::new(ORDER_PLACED)?;
    let timeout = cfg.listener_timeout();

    dispatcher
        .emit_async(
            Event::new(order.clone(), ShellEvent::OrderPlaced { id: 1, total_cents: 4_200 }),
            EmitOptions::sequential().stop_on_error(true).timeout(timeout),
        )
        .await
        .context("Order 1 was not processed")?;

    // Charging fails and stock reservation outlives the deadline; both are
    // reported to the sink while the call itself succeeds.
    dispatcher
        .emit_async(
            Event::new(order, ShellEvent::OrderPlaced { id: 9, total_cents: 0 }),
            EmitOptions::concurrent().timeout(timeout),
        )
        .await?;

    let shutdown = CancellationToken::new();
    let trigger = shutdown.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });

    let outcome = dispatcher
        .emit_async(
            Event::new(EventKey::new(SYSTEM_SHUTDOWN)?, ShellEvent::Shutdown { reason: "demo finished" }),
            EmitOptions::sequential().stop_on_error(true).cancellation(shutdown),
        )
        .await;

    match outcome {
        Err(err) if err.is_aborted() => info!("Shutdown listeners interrupted"),
        other => other?,
    }

    Ok(())
}
