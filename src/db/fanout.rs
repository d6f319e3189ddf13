//! Batched writes and the four-table trade fan-out.
//!
//! Batching bounds request size only; it is not an atomicity mechanism. A
//! failure part way through a trade fan-out leaves the tables already written
//! ahead of the rest, and the error says which ones.

use super::rows::{account_values, position_values, trade_values};
use super::session::{Session, Statement, StoreError, Value};
use super::tables::Table;
use crate::domain::{Account, Position, Trade};
use crate::error::AppError;
use crate::generator::Dataset;
use tracing::{debug, info, warn};

/// Rows per batch unless configured otherwise.
pub const DEFAULT_BATCH_SIZE: usize = 10;

/// Counts reported after populating the keyspace.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PopulateSummary {
    pub accounts: usize,
    pub positions: usize,
    pub trades: usize,
    /// Batch submissions across all tables.
    pub batches: usize,
}

/// Writes rows in sequential, bounded batches through one session.
pub struct BatchWriter<'a, S: Session> {
    session: &'a S,
    batch_size: usize,
}

impl<'a, S: Session> BatchWriter<'a, S> {
    pub fn new(session: &'a S) -> Self {
        Self::with_batch_size(session, DEFAULT_BATCH_SIZE)
    }

    /// A batch size of zero is treated as one.
    pub fn with_batch_size(session: &'a S, batch_size: usize) -> Self {
        BatchWriter {
            session,
            batch_size: batch_size.max(1),
        }
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Persist `rows` (already in `table` column order) and return the number
    /// of batches submitted. An empty input submits nothing.
    ///
    /// # Errors
    /// Returns a write error naming the table on the first failed batch;
    /// earlier batches stay written.
    pub async fn write_batch(&self, table: Table, rows: &[Vec<Value>]) -> Result<usize, AppError> {
        if rows.is_empty() {
            return Ok(0);
        }

        let write_err = |source: StoreError| AppError::Write {
            table: table.name(),
            source,
        };
        let prepared = self
            .session
            .prepare(&Statement::Insert(table))
            .await
            .map_err(write_err)?;

        let mut submitted = 0;
        for chunk in rows.chunks(self.batch_size) {
            self.session
                .batch(&prepared, chunk)
                .await
                .map_err(write_err)?;
            submitted += 1;
            debug!(table = %table, rows = chunk.len(), batch = submitted, "batch written");
        }
        Ok(submitted)
    }

    pub async fn write_accounts(&self, accounts: &[Account]) -> Result<usize, AppError> {
        let rows: Vec<_> = accounts.iter().map(account_values).collect();
        self.write_batch(Table::AccountsByUser, &rows).await
    }

    pub async fn write_positions(&self, positions: &[Position]) -> Result<usize, AppError> {
        let rows: Vec<_> = positions.iter().map(position_values).collect();
        self.write_batch(Table::PositionsByAccount, &rows).await
    }

    /// Write the same trade rows into every trade table.
    ///
    /// # Errors
    /// Returns [`AppError::PartialFanout`] when a table fails after others
    /// were written, or [`AppError::Write`] when the first table fails.
    pub async fn write_trades(&self, trades: &[Trade]) -> Result<usize, AppError> {
        let rows: Vec<_> = trades.iter().map(trade_values).collect();
        let mut completed = Vec::with_capacity(Table::TRADES.len());
        let mut submitted = 0;

        for table in Table::TRADES {
            match self.write_batch(table, &rows).await {
                Ok(n) => {
                    submitted += n;
                    completed.push(table.name());
                }
                Err(AppError::Write { table: failed, source }) if !completed.is_empty() => {
                    warn!(
                        "Trade fan-out diverged: {} failed after {:?} were written",
                        failed, completed
                    );
                    return Err(AppError::PartialFanout {
                        failed,
                        completed,
                        source,
                    });
                }
                Err(e) => return Err(e),
            }
        }
        Ok(submitted)
    }

    /// Write a generated dataset: accounts, positions, then the trade fan-out.
    pub async fn populate(&self, dataset: &Dataset) -> Result<PopulateSummary, AppError> {
        info!(
            "Populating {} accounts, {} positions, {} trades (batch size {})",
            dataset.accounts.len(),
            dataset.positions.len(),
            dataset.trades.len(),
            self.batch_size
        );
        let mut batches = self.write_accounts(&dataset.accounts).await?;
        batches += self.write_positions(&dataset.positions).await?;
        batches += self.write_trades(&dataset.trades).await?;

        let summary = PopulateSummary {
            accounts: dataset.accounts.len(),
            positions: dataset.positions.len(),
            trades: dataset.trades.len(),
            batches,
        };
        info!("Populate finished: {:?}", summary);
        Ok(summary)
    }
}
