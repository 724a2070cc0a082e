//! The persistence boundary (spec §1 "out of scope", §6 "Persistence
//! (outbound)"). The relational store itself — the `trades`, `positions`,
//! `daily_performance`, `strategy_performance`, `option_chain_snapshots`,
//! `settings`, and `capital` tables — is a named external collaborator;
//! this crate only defines the interface the kernel writes through and a
//! no-op sink for tests and for running without a database configured.

use async_trait::async_trait;
use kernel_common::position::Position;
use kernel_common::trade::Trade;

#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error("persistence write failed: {0}")]
    Write(String),
}

pub type PersistenceResult<T> = Result<T, PersistenceError>;

/// Write policy (spec §6): positions are persisted on open, on state
/// change, and on close; trades on close only. Aggregates are computed
/// post-close by an external job, out of scope here.
#[async_trait]
pub trait PersistenceSink: Send + Sync {
    async fn upsert_position(&self, position: &Position) -> PersistenceResult<()>;
    async fn remove_position(&self, position_id: &str) -> PersistenceResult<()>;
    async fn insert_trade(&self, trade: &Trade) -> PersistenceResult<()>;
}

/// Used when no database is configured; every write is a no-op logged at
/// debug. Lets the kernel run (paper mode, demos, tests) without a
/// persistence layer standing behind it.
#[derive(Debug, Default)]
pub struct NullPersistenceSink;

#[async_trait]
impl PersistenceSink for NullPersistenceSink {
    async fn upsert_position(&self, position: &Position) -> PersistenceResult<()> {
        tracing::debug!(position_id = %position.position_id, "persistence disabled, position not written");
        Ok(())
    }

    async fn remove_position(&self, position_id: &str) -> PersistenceResult<()> {
        tracing::debug!(position_id, "persistence disabled, removal not written");
        Ok(())
    }

    async fn insert_trade(&self, trade: &Trade) -> PersistenceResult<()> {
        tracing::debug!(position_id = %trade.position_id, "persistence disabled, trade not written");
        Ok(())
    }
}
