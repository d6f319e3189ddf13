//! Mapping between entities and table rows (definition column order).

use super::session::{Row, StoreError, Value};
use crate::domain::{Account, AccountNumber, Money, Position, Symbol, Trade, TradeType, Username};

/// `accounts_by_user`: username, account_number, cash_balance, name.
pub fn account_values(account: &Account) -> Vec<Value> {
    vec![
        Value::from(account.username.as_str()),
        Value::from(account.account_number.as_str()),
        Value::Decimal(account.cash_balance.inner()),
        Value::from(account.name.as_str()),
    ]
}

/// `positions_by_account`: account, symbol, quantity.
pub fn position_values(position: &Position) -> Vec<Value> {
    vec![
        Value::from(position.account.as_str()),
        Value::from(position.symbol.as_str()),
        Value::Int(position.quantity),
    ]
}

/// Any trade table: account, trade_id, type, symbol, shares, price, amount.
pub fn trade_values(trade: &Trade) -> Vec<Value> {
    vec![
        Value::from(trade.account.as_str()),
        Value::from(trade.trade_id),
        Value::from(trade.trade_type.as_str()),
        Value::from(trade.symbol.as_str()),
        Value::Int(trade.shares),
        Value::Decimal(trade.price.inner()),
        Value::Decimal(trade.amount.inner()),
    ]
}

pub fn account_from_row(row: &Row) -> Result<Account, StoreError> {
    let name = match row.get(3)? {
        Value::Null => String::new(),
        _ => row.text(3)?.to_string(),
    };
    Ok(Account {
        username: Username::new(row.text(0)?),
        account_number: AccountNumber::new(row.text(1)?),
        cash_balance: Money::new(row.decimal(2)?),
        name,
    })
}

pub fn position_from_row(row: &Row) -> Result<Position, StoreError> {
    Ok(Position {
        account: AccountNumber::new(row.text(0)?),
        symbol: Symbol::new(row.text(1)?),
        quantity: row.int(2)?,
    })
}

pub fn trade_from_row(row: &Row) -> Result<Trade, StoreError> {
    let trade_type = row
        .text(2)?
        .parse::<TradeType>()
        .map_err(|e| StoreError::Decode {
            index: 2,
            reason: e.to_string(),
        })?;
    Ok(Trade {
        account: AccountNumber::new(row.text(0)?),
        trade_id: row.timeuuid(1)?,
        trade_type,
        symbol: Symbol::new(row.text(3)?),
        shares: row.int(4)?,
        price: Money::new(row.decimal(5)?),
        amount: Money::new(row.decimal(6)?),
    })
}
