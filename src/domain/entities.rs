//! Account, position, and trade records.

use super::{AccountNumber, Money, Symbol, TradeId, TradeType, Username};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A brokerage account owned by one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub username: Username,
    pub account_number: AccountNumber,
    /// Owner display name (static per user partition).
    pub name: String,
    pub cash_balance: Money,
}

/// Shares of one instrument held in one account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub account: AccountNumber,
    pub symbol: Symbol,
    pub quantity: i32,
}

/// A single buy or sell.
///
/// Stored four times, once per trade table; every copy carries these values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trade {
    pub account: AccountNumber,
    pub trade_id: TradeId,
    pub trade_type: TradeType,
    pub symbol: Symbol,
    pub shares: i32,
    pub price: Money,
    pub amount: Money,
}

impl Trade {
    /// Create a trade, deriving `amount` from `shares × price`.
    pub fn new(
        account: AccountNumber,
        trade_id: TradeId,
        trade_type: TradeType,
        symbol: Symbol,
        shares: i32,
        price: Money,
    ) -> Self {
        Trade {
            account,
            trade_id,
            trade_type,
            symbol,
            shares,
            price,
            amount: price.times(shares),
        }
    }

    /// Day the trade happened, read from the trade id.
    pub fn trade_date(&self) -> NaiveDate {
        self.trade_id.trade_date()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trade_amount_and_date() {
        let date = NaiveDate::from_ymd_opt(2021, 11, 2).unwrap();
        let trade = Trade::new(
            AccountNumber::new("acc-1"),
            TradeId::from_date(date, 3, [9; 6]).unwrap(),
            TradeType::Sell,
            Symbol::new("QQQ"),
            12,
            Money::from_cents(250_050),
        );
        assert_eq!(trade.amount, Money::from_cents(3_000_600));
        assert_eq!(trade.trade_date(), date);
    }
}
