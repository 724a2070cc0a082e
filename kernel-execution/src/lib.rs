//! Order lifecycle and paper/live execution (spec §4.8).

pub mod errors;
pub mod lifecycle;
pub mod manager;
pub mod slippage;

pub use errors::{ExecutionError, ExecutionResult};
pub use lifecycle::{can_transition, OrderLifecycleState};
pub use manager::{OrderManager, PendingOrder, SubmitOutcome};
pub use slippage::{execution_price, SlippageInputs};
