//! Order-manager boundary errors (spec §7).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("broker rejected the order: {0}")]
    Rejected(String),

    #[error("broker call failed: {0}")]
    Broker(#[from] kernel_common::KernelError),

    #[error("cancellation did not confirm after {attempts} attempts")]
    CancelExhausted { attempts: u32 },

    #[error("illegal order lifecycle transition")]
    IllegalTransition,
}

pub type ExecutionResult<T> = Result<T, ExecutionError>;
