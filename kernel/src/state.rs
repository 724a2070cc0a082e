//! Shared kernel state (spec §4.12, §5): the cross-cutting mutable state
//! the three loops collaborate through. Each field's lock discipline
//! follows spec §5 exactly:
//!
//! - `settings`: swapped wholesale under a short write lock, read via a
//!   cheap `Arc` clone (`update_settings` applied atomically at the next
//!   L2 cycle boundary).
//! - `market_cache`: single-writer copy-on-write, owned by
//!   [`kernel_market_data::MarketStateCache`] itself.
//! - `risk_state` / `circuit_breaker`: exclusive mutex, short critical
//!   sections, mutated only from L2 (admission) and L3 (exit).
//! - `position_tracker`: per-position-id locking, owned by
//!   [`kernel_portfolio::PositionTracker`] itself.
//! - `instrument_index`: non-owning handle from instrument-key to
//!   position-id so a push tick can route into the tracker without the
//!   tracker and the feed knowing about each other directly (spec §9
//!   "non-owning handles" redesign note).

use crate::persistence::PersistenceSink;
use crate::reversal::ReversalDetector;
use kernel_common::config::Settings;
use kernel_common::instrument::{InstrumentKey, Underlying};
use kernel_common::{CircuitBreakerState, RiskState};
use kernel_events::EventBus;
use kernel_market_data::{BrokerAdapter, MarketStateCache};
use kernel_portfolio::PositionTracker;
use kernel_risk::circuit_breaker::IvSample;
use kernel_strategies::StrategyRegistry;
use parking_lot::{Mutex, RwLock};
use rustc_hash::FxHashMap;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// How long a trailing IV sample is kept before it ages out of the
/// IV-shock window (spec §4.7: "within a 5-minute window").
const IV_HISTORY_WINDOW: std::time::Duration = std::time::Duration::from_secs(5 * 60);

/// Per-underlying trailing IV sample history for the circuit breaker's
/// IV-shock trigger (spec §4.7). The watched instrument is the underlying's
/// ATM call; one bounded deque per underlying, pruned to the trailing
/// window on every push.
#[derive(Default)]
pub struct IvHistory {
    by_underlying: Mutex<FxHashMap<String, VecDeque<IvSample>>>,
}

impl IvHistory {
    fn new() -> Self {
        Self::default()
    }

    /// Records a new sample for `underlying` and returns the samples still
    /// inside the trailing window, oldest first.
    pub fn push_and_window(&self, underlying: &str, sample: IvSample) -> Vec<IvSample> {
        let mut guard = self.by_underlying.lock();
        let deque = guard.entry(underlying.to_string()).or_default();
        deque.push_back(sample);
        let cutoff = sample.observed_at
            - chrono::Duration::from_std(IV_HISTORY_WINDOW).unwrap_or(chrono::Duration::zero());
        while deque.front().is_some_and(|s| s.observed_at < cutoff) {
            deque.pop_front();
        }
        deque.iter().copied().collect()
    }
}

/// A single recorded outcome of an L2 admission attempt, kept in a bounded
/// ring for operator visibility (spec §4.12 step 5).
#[derive(Debug, Clone)]
pub enum SignalOutcome {
    Executed { position_id: String },
    BlockedByRisk { reason: String },
    ExecutionFailed { reason: String },
}

#[derive(Debug, Clone)]
pub struct RecentSignal {
    pub strategy_id: String,
    pub symbol: String,
    pub outcome: SignalOutcome,
    pub at: chrono::DateTime<chrono::Utc>,
}

const RECENT_SIGNALS_CAPACITY: usize = 200;

/// Bounded ring buffer; oldest entries drop once full.
pub struct RecentSignalsRing {
    inner: Mutex<std::collections::VecDeque<RecentSignal>>,
}

impl RecentSignalsRing {
    fn new() -> Self {
        Self { inner: Mutex::new(std::collections::VecDeque::with_capacity(RECENT_SIGNALS_CAPACITY)) }
    }

    pub fn push(&self, entry: RecentSignal) {
        let mut guard = self.inner.lock();
        if guard.len() >= RECENT_SIGNALS_CAPACITY {
            guard.pop_front();
        }
        guard.push_back(entry);
    }

    #[must_use]
    pub fn snapshot(&self) -> Vec<RecentSignal> {
        self.inner.lock().iter().cloned().collect()
    }
}

/// Everything the three loops and the control surface share. Constructed
/// once at startup; each loop holds an `Arc<KernelState>`.
pub struct KernelState {
    pub settings: RwLock<Arc<Settings>>,
    pub market_cache: Arc<MarketStateCache>,
    pub broker: Arc<dyn BrokerAdapter>,
    pub registry: RwLock<StrategyRegistry>,
    pub risk_state: Mutex<RiskState>,
    pub circuit_breaker: RwLock<CircuitBreakerState>,
    pub position_tracker: Arc<PositionTracker>,
    /// instrument-key -> position-id, maintained by L2 (insert on open)
    /// and L3 (remove on close). Lets a push tick route to the position it
    /// belongs to without the feed and the tracker referencing each other.
    pub instrument_index: RwLock<FxHashMap<InstrumentKey, String>>,
    pub order_manager: RwLock<Arc<kernel_execution::OrderManager>>,
    pub event_bus: Arc<EventBus>,
    pub persistence: Arc<dyn PersistenceSink>,
    pub reversal_detector: Arc<dyn ReversalDetector>,
    pub recent_signals: RecentSignalsRing,
    pub iv_history: IvHistory,
    pub underlyings: Vec<Underlying>,
    pub vix_instrument_key: InstrumentKey,
    /// Set once by the control surface; every loop checks it between
    /// iterations and exits cooperatively (spec §4.12 cancellation).
    pub shutting_down: AtomicBool,
    /// Set/cleared by `pause`/`resume`; L2 stops admitting new signals
    /// while paused, L1/L3 keep running.
    pub paused: AtomicBool,
}

impl KernelState {
    /// Assembles the shared state once at startup. Every collaborator
    /// (broker, persistence sink, reversal detector, event bus) is injected
    /// rather than looked up through a singleton (spec §9 "dependency-
    /// injected interfaces passed into the trading kernel at start").
    #[allow(clippy::too_many_arguments)]
    #[must_use]
    pub fn new(
        settings: Settings,
        broker: Arc<dyn BrokerAdapter>,
        registry: StrategyRegistry,
        order_manager: Arc<kernel_execution::OrderManager>,
        event_bus: Arc<EventBus>,
        persistence: Arc<dyn PersistenceSink>,
        reversal_detector: Arc<dyn ReversalDetector>,
        underlyings: Vec<Underlying>,
        vix_instrument_key: InstrumentKey,
    ) -> Self {
        let starting_capital = settings.starting_capital;
        Self {
            settings: RwLock::new(Arc::new(settings)),
            market_cache: Arc::new(MarketStateCache::new()),
            broker,
            registry: RwLock::new(registry),
            risk_state: Mutex::new(RiskState::new(starting_capital)),
            circuit_breaker: RwLock::new(CircuitBreakerState::default()),
            position_tracker: Arc::new(PositionTracker::new()),
            instrument_index: RwLock::new(FxHashMap::default()),
            order_manager: RwLock::new(order_manager),
            event_bus,
            persistence,
            reversal_detector,
            recent_signals: RecentSignalsRing::new(),
            iv_history: IvHistory::new(),
            underlyings,
            vix_instrument_key,
            shutting_down: AtomicBool::new(false),
            paused: AtomicBool::new(false),
        }
    }

    pub fn is_shutting_down(&self) -> bool {
        self.shutting_down.load(Ordering::SeqCst)
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn current_settings(&self) -> Arc<Settings> {
        self.settings.read().clone()
    }
}
