//! `tradingkerneld`: the process that owns the three trading loops (spec
//! §4.12). Wires the simulated broker, the strategy registry, and the
//! event bus together, spawns L1/L2/L3 under supervision, and shuts them
//! down cooperatively on SIGINT.
//!
//! A real deployment swaps [`kernel_market_data::SimulatedBrokerAdapter`]
//! for a venue-specific adapter and [`persistence::NullPersistenceSink`]
//! for a database-backed [`persistence::PersistenceSink`]; both are named
//! external collaborators (spec §1), not this binary's concern.

mod config;
mod control;
mod l1_market_data;
mod l2_signal_trading;
mod l3_risk_monitoring;
mod persistence;
mod reversal;
mod state;
mod test_support;

use kernel_common::instrument::Underlying;
use kernel_events::{EventBus, EventBusConfig};
use kernel_execution::OrderManager;
use kernel_market_data::{SimulatedBrokerAdapter, SimulatedBrokerConfig};
use kernel_risk::circuit_breaker::trip_monitor_loop_failure;
use kernel_strategies::StrategyRegistry;
use persistence::NullPersistenceSink;
use reversal::NeverReverses;
use state::KernelState;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

const SERVICE_NAME: &str = "tradingkerneld";

/// Supervises one long-lived loop: restarts it with exponential backoff if
/// it ever returns while the process is not shutting down (spec §4.12 "a
/// loop crash is caught, logged ... and the loop is restarted with
/// exponential backoff"). `run` loops are written to return only on
/// shutdown or panic, so any other return is treated as a crash.
async fn supervise<F, Fut>(name: &'static str, state: Arc<KernelState>, is_l3: bool, run: F)
where
    F: Fn(Arc<KernelState>) -> Fut + Send + 'static,
    Fut: std::future::Future<Output = ()> + Send + 'static,
{
    let mut backoff = kernel_common::Backoff::new(Duration::from_secs(1), Duration::from_secs(60));
    let mut consecutive_failures: u32 = 0;

    loop {
        if state.is_shutting_down() {
            return;
        }

        let task_state = Arc::clone(&state);
        let handle = tokio::spawn(run(task_state));

        match handle.await {
            Ok(()) if state.is_shutting_down() => return,
            Ok(()) => {
                warn!(loop_name = name, "loop exited without a shutdown signal, treating as a crash");
            }
            Err(join_err) => {
                error!(loop_name = name, error = %join_err, "loop panicked");
            }
        }

        if state.is_shutting_down() {
            return;
        }

        consecutive_failures += 1;
        state.event_bus.publish(kernel_events::KernelEvent::alert(
            kernel_events::AlertLevel::Critical,
            format!("{name} loop crashed, restarting"),
            Some(format!("consecutive_failures={consecutive_failures}")),
        ));

        if is_l3 && consecutive_failures >= 5 {
            error!(loop_name = name, "L3 crashed repeatedly, raising circuit breaker");
            let mut circuit = state.circuit_breaker.write();
            trip_monitor_loop_failure(&mut circuit, chrono::Utc::now());
        }

        tokio::time::sleep(backoff.next_delay()).await;
    }
}

/// Drives the simulated broker's internal clock forward once a second so
/// the push-tick feed and the periodic refresher both see movement. A real
/// broker adapter has no equivalent: its ticks arrive from the exchange on
/// their own schedule.
async fn run_simulation_driver(adapter: Arc<SimulatedBrokerAdapter>, mut shutdown: tokio::sync::watch::Receiver<bool>) {
    let mut ticker = tokio::time::interval(Duration::from_secs(1));
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                adapter.step(1.0 / (365.0 * 24.0 * 3_600.0), chrono::Utc::now());
            }
            _ = shutdown.changed() => return,
        }
        if *shutdown.borrow() {
            return;
        }
    }
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| format!("{SERVICE_NAME}=info,kernel=info").into()))
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    info!(version = env!("CARGO_PKG_VERSION"), "starting trading kernel");

    let config_path = std::env::var("KERNEL_CONFIG_FILE").ok();
    let settings = config::load_settings(config_path.as_deref())?;
    info!(trading_mode = ?settings.trading_mode, starting_capital = settings.starting_capital, "configuration loaded");

    let simulated_broker = Arc::new(SimulatedBrokerAdapter::new(SimulatedBrokerConfig::default()));
    let broker: Arc<dyn kernel_market_data::BrokerAdapter> = Arc::clone(&simulated_broker) as Arc<dyn kernel_market_data::BrokerAdapter>;

    let trading_mode = settings.trading_mode;
    let order_manager = Arc::new(OrderManager::new(Arc::clone(&broker), trading_mode));
    let event_bus = Arc::new(EventBus::new(EventBusConfig::default()));

    let underlyings = vec![Underlying::Nifty, Underlying::BankNifty, Underlying::Sensex];
    let vix_instrument_key = SimulatedBrokerAdapter::vix_key();

    let kernel_state = Arc::new(KernelState::new(
        settings,
        broker,
        StrategyRegistry::with_defaults(),
        order_manager,
        Arc::clone(&event_bus),
        Arc::new(NullPersistenceSink),
        Arc::new(NeverReverses),
        underlyings,
        vix_instrument_key,
    ));

    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);

    let l1_refresh = tokio::spawn(supervise("L1-refresh", Arc::clone(&kernel_state), false, |s| l1_market_data::run(s)));
    let l1_ticks = tokio::spawn(l1_market_data::run_tick_router(Arc::clone(&kernel_state), shutdown_rx.clone()));
    let l2 = tokio::spawn(supervise("L2-signal-trading", Arc::clone(&kernel_state), false, |s| l2_signal_trading::run(s)));
    let l3 = tokio::spawn(supervise("L3-risk-monitoring", Arc::clone(&kernel_state), true, |s| l3_risk_monitoring::run(s)));
    let heartbeat = tokio::spawn(Arc::clone(&event_bus).run_heartbeat(shutdown_rx.clone()));
    let simulation = tokio::spawn(run_simulation_driver(Arc::clone(&simulated_broker), shutdown_rx.clone()));

    control::start(&kernel_state);

    tokio::signal::ctrl_c().await?;
    info!("shutdown signal received");
    control::stop(&kernel_state);
    let _ = shutdown_tx.send(true);

    // L2 has already stopped admitting by the time we get here; give L3 a
    // bounded window to finish marking and exiting whatever is still open
    // before L1 (which both of them still read from) is allowed to stop.
    let drain_deadline = Duration::from_secs(30);
    let _ = tokio::time::timeout(drain_deadline, async {
        while !kernel_state.position_tracker.is_empty() {
            tokio::time::sleep(Duration::from_millis(200)).await;
        }
    })
    .await;

    for handle in [l1_refresh, l1_ticks, l2, l3, heartbeat, simulation] {
        handle.abort();
    }

    info!("trading kernel shut down");
    Ok(())
}
