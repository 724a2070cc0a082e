//! Strategy contract, canonical-id registry, and the illustrative strategy
//! set (spec §4.2, §4.4).

pub mod contract;
pub mod registry;
pub mod strategies;

pub use contract::{Strategy, StrategyContext};
pub use registry::StrategyRegistry;
pub use strategies::all_builtin;
