//! Event bus boundary errors (spec §7).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EventBusError {
    #[error("failed to serialise event for the observer channel: {0}")]
    Serialize(#[from] serde_json::Error),
}

pub type EventBusResult<T> = Result<T, EventBusError>;
