//! Maps each read onto the one table that serves it.

use super::filter::{AccessPattern, TradeFilter};
use crate::db::rows::{account_from_row, position_from_row, trade_from_row};
use crate::db::{Restriction, Row, Select, Session, Statement, StoreError, Value};
use crate::domain::{Account, AccountNumber, Catalog, Position, Symbol, Trade, Username};
use crate::error::AppError;
use tracing::debug;

/// Trade rows returned when neither the filter nor the config says otherwise.
pub const DEFAULT_HISTORY_LIMIT: usize = 10;

/// Read side of the store.
///
/// Every query binds the partition key of its table and relies on the
/// table's clustering order; nothing is sorted or filtered client-side.
pub struct QueryRouter<'a, S: Session> {
    session: &'a S,
    catalog: &'a Catalog,
    history_limit: usize,
}

impl<'a, S: Session> QueryRouter<'a, S> {
    pub fn new(session: &'a S, catalog: &'a Catalog) -> Self {
        QueryRouter {
            session,
            catalog,
            history_limit: DEFAULT_HISTORY_LIMIT,
        }
    }

    /// A limit of zero is treated as one.
    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.history_limit = limit.max(1);
        self
    }

    pub fn history_limit(&self) -> usize {
        self.history_limit
    }

    /// Symbols a trade filter may name.
    pub fn instruments(&self) -> &[Symbol] {
        self.catalog.instruments()
    }

    pub fn has_instrument(&self, symbol: &Symbol) -> bool {
        self.catalog.has_instrument(symbol.as_str())
    }

    /// Accounts of `username` in account number order. Unknown users have none.
    pub async fn list_accounts(&self, username: &Username) -> Result<Vec<Account>, AppError> {
        if username.as_str().trim().is_empty() {
            return Err(AppError::invalid_query("username is required"));
        }
        let select = Select::from(AccessPattern::AccountsForUser.table())
            .with(Restriction::eq("username"));
        let rows = self
            .fetch(select, vec![Value::from(username.as_str())])
            .await?;
        decode(&rows, account_from_row)
    }

    /// Positions of one account, by symbol.
    pub async fn list_positions(&self, account: &AccountNumber) -> Result<Vec<Position>, AppError> {
        if account.as_str().trim().is_empty() {
            return Err(AppError::invalid_query("account is required"));
        }
        let select = Select::from(AccessPattern::PositionsForAccount.table())
            .with(Restriction::eq("account"));
        let rows = self
            .fetch(select, vec![Value::from(account.as_str())])
            .await?;
        decode(&rows, position_from_row)
    }

    /// Trade history, newest first within the filter's table order.
    pub async fn list_trades(&self, filter: &TradeFilter) -> Result<Vec<Trade>, AppError> {
        self.list_trades_as(filter.pattern(), filter).await
    }

    /// Trade history through an explicitly chosen pattern.
    ///
    /// # Errors
    /// Returns [`AppError::InvalidQuery`] without touching the store when the
    /// filter does not carry exactly the fields `pattern` needs, or when a
    /// field is empty or out of range.
    pub async fn list_trades_as(
        &self,
        pattern: AccessPattern,
        filter: &TradeFilter,
    ) -> Result<Vec<Trade>, AppError> {
        let limit = self.validate(pattern, filter)?;
        let (restrictions, values) = filter.bind();
        let select = restrictions
            .into_iter()
            .fold(Select::from(pattern.table()), Select::with)
            .limit(limit);
        let rows = self.fetch(select, values).await?;
        decode(&rows, trade_from_row)
    }

    fn validate(&self, pattern: AccessPattern, filter: &TradeFilter) -> Result<usize, AppError> {
        if !pattern.is_trade_history() {
            return Err(AppError::invalid_query(format!(
                "{} is not a trade history pattern",
                pattern
            )));
        }
        if filter.account.as_str().trim().is_empty() {
            return Err(AppError::invalid_query("account is required"));
        }
        if pattern.needs_type() != filter.trade_type.is_some() {
            return Err(AppError::invalid_query(format!(
                "{} {} a trade type",
                pattern,
                if pattern.needs_type() { "requires" } else { "does not take" }
            )));
        }
        if pattern.needs_symbol() != filter.symbol.is_some() {
            return Err(AppError::invalid_query(format!(
                "{} {} a symbol",
                pattern,
                if pattern.needs_symbol() { "requires" } else { "does not take" }
            )));
        }
        if let Some(symbol) = &filter.symbol {
            if symbol.as_str().trim().is_empty() {
                return Err(AppError::invalid_query("symbol must not be empty"));
            }
        }
        if let Some(range) = &filter.range {
            if range.is_reversed() {
                return Err(AppError::invalid_query(format!(
                    "date range ends ({}) before it starts ({})",
                    range.end, range.start
                )));
            }
        }
        match filter.limit {
            Some(0) => Err(AppError::invalid_query("limit must be at least 1")),
            Some(limit) => Ok(limit),
            None => Ok(self.history_limit),
        }
    }

    async fn fetch(&self, select: Select, values: Vec<Value>) -> Result<Vec<Row>, AppError> {
        let table = select.table;
        let rows = self
            .session
            .execute(&Statement::Select(select), values)
            .await
            .map_err(AppError::Read)?;
        debug!(table = %table, rows = rows.len(), "read");
        Ok(rows)
    }
}

fn decode<T>(rows: &[Row], f: fn(&Row) -> Result<T, StoreError>) -> Result<Vec<T>, AppError> {
    rows.iter().map(f).collect::<Result<_, _>>().map_err(AppError::Read)
}
