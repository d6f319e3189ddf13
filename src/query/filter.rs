//! Access patterns and trade filters.

use crate::db::{Restriction, Table, Value};
use crate::domain::{AccountNumber, Symbol, TradeType};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};

/// One supported read, each served by exactly one table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccessPattern {
    AllTrades,
    TradesByType,
    TradesByTypeAndSymbol,
    TradesBySymbol,
    PositionsForAccount,
    AccountsForUser,
}

impl AccessPattern {
    /// Trade history patterns, in menu order.
    pub const TRADES: [AccessPattern; 4] = [
        AccessPattern::AllTrades,
        AccessPattern::TradesByType,
        AccessPattern::TradesByTypeAndSymbol,
        AccessPattern::TradesBySymbol,
    ];

    pub fn table(&self) -> Table {
        match self {
            AccessPattern::AllTrades => Table::TradesByAccount,
            AccessPattern::TradesByType => Table::TradesByType,
            AccessPattern::TradesByTypeAndSymbol => Table::TradesByTypeAndSymbol,
            AccessPattern::TradesBySymbol => Table::TradesBySymbol,
            AccessPattern::PositionsForAccount => Table::PositionsByAccount,
            AccessPattern::AccountsForUser => Table::AccountsByUser,
        }
    }

    pub fn is_trade_history(&self) -> bool {
        Self::TRADES.contains(self)
    }

    pub fn needs_type(&self) -> bool {
        matches!(
            self,
            AccessPattern::TradesByType | AccessPattern::TradesByTypeAndSymbol
        )
    }

    pub fn needs_symbol(&self) -> bool {
        matches!(
            self,
            AccessPattern::TradesByTypeAndSymbol | AccessPattern::TradesBySymbol
        )
    }

    pub fn label(&self) -> &'static str {
        match self {
            AccessPattern::AllTrades => "all trades",
            AccessPattern::TradesByType => "trades by type",
            AccessPattern::TradesByTypeAndSymbol => "trades by type and symbol",
            AccessPattern::TradesBySymbol => "trades by symbol",
            AccessPattern::PositionsForAccount => "positions",
            AccessPattern::AccountsForUser => "accounts",
        }
    }
}

impl std::fmt::Display for AccessPattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Inclusive range of trade days.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        DateRange { start, end }
    }

    pub fn is_reversed(&self) -> bool {
        self.start > self.end
    }

    /// Midnight UTC of the first day.
    pub fn since(&self) -> DateTime<Utc> {
        self.start.and_time(NaiveTime::MIN).and_utc()
    }

    /// Last millisecond of the final day; time UUID bounds have millisecond precision.
    pub fn until(&self) -> DateTime<Utc> {
        let last = NaiveTime::from_hms_milli_opt(23, 59, 59, 999).unwrap_or(NaiveTime::MIN);
        self.end.and_time(last).and_utc()
    }
}

/// Trade history request for one account.
///
/// Which optional fields are set decides the access pattern; see
/// [`TradeFilter::pattern`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TradeFilter {
    pub account: AccountNumber,
    pub trade_type: Option<TradeType>,
    pub symbol: Option<Symbol>,
    pub range: Option<DateRange>,
    /// Overrides the router's default history limit.
    pub limit: Option<usize>,
}

impl TradeFilter {
    pub fn for_account(account: AccountNumber) -> Self {
        TradeFilter {
            account,
            trade_type: None,
            symbol: None,
            range: None,
            limit: None,
        }
    }

    pub fn with_type(mut self, trade_type: TradeType) -> Self {
        self.trade_type = Some(trade_type);
        self
    }

    pub fn with_symbol(mut self, symbol: Symbol) -> Self {
        self.symbol = Some(symbol);
        self
    }

    pub fn between(mut self, start: NaiveDate, end: NaiveDate) -> Self {
        self.range = Some(DateRange::new(start, end));
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// The trade pattern whose table serves exactly the fields set here.
    pub fn pattern(&self) -> AccessPattern {
        match (self.trade_type.is_some(), self.symbol.is_some()) {
            (false, false) => AccessPattern::AllTrades,
            (true, false) => AccessPattern::TradesByType,
            (true, true) => AccessPattern::TradesByTypeAndSymbol,
            (false, true) => AccessPattern::TradesBySymbol,
        }
    }

    /// Restrictions and their bound values, in clustering order.
    pub(crate) fn bind(&self) -> (Vec<Restriction>, Vec<Value>) {
        let mut restrictions = vec![Restriction::eq("account")];
        let mut values = vec![Value::from(self.account.as_str())];
        if let Some(trade_type) = self.trade_type {
            restrictions.push(Restriction::eq("type"));
            values.push(Value::from(trade_type.as_str()));
        }
        if let Some(symbol) = &self.symbol {
            restrictions.push(Restriction::eq("symbol"));
            values.push(Value::from(symbol.as_str()));
        }
        if let Some(range) = &self.range {
            restrictions.push(Restriction::since("trade_id"));
            values.push(Value::Timestamp(range.since()));
            restrictions.push(Restriction::until("trade_id"));
            values.push(Value::Timestamp(range.until()));
        }
        (restrictions, values)
    }
}
