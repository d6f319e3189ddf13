//! Storage session abstraction: typed statements, bound values, and rows.

use super::tables::Table;
use crate::domain::TradeId;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::cmp::Ordering;
use thiserror::Error;

/// Error type for storage operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The driver or cluster reported a failure.
    #[error("store backend error: {0}")]
    Backend(String),
    /// The store refused the statement (unknown table, missing partition key, ...).
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    /// A returned column did not have the expected type.
    #[error("cannot decode column {index}: {reason}")]
    Decode { index: usize, reason: String },
}

/// A value bound to a statement placeholder or read back from a row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Null,
    Text(String),
    Int(i32),
    Decimal(Decimal),
    TimeUuid(TradeId),
    Timestamp(DateTime<Utc>),
}

impl Value {
    fn rank(&self) -> u8 {
        match self {
            Value::Null => 0,
            Value::Text(_) => 1,
            Value::Int(_) => 2,
            Value::Decimal(_) => 3,
            Value::TimeUuid(_) => 4,
            Value::Timestamp(_) => 5,
        }
    }
}

impl Ord for Value {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Value::Text(a), Value::Text(b)) => a.cmp(b),
            (Value::Int(a), Value::Int(b)) => a.cmp(b),
            (Value::Decimal(a), Value::Decimal(b)) => a.cmp(b),
            (Value::TimeUuid(a), Value::TimeUuid(b)) => a.cmp(b),
            (Value::Timestamp(a), Value::Timestamp(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Int(value)
    }
}

impl From<Decimal> for Value {
    fn from(value: Decimal) -> Self {
        Value::Decimal(value)
    }
}

impl From<TradeId> for Value {
    fn from(value: TradeId) -> Self {
        Value::TimeUuid(value)
    }
}

/// One result row, columns in the order the select listed them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    values: Vec<Value>,
}

impl Row {
    pub fn new(values: Vec<Value>) -> Self {
        Row { values }
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn get(&self, index: usize) -> Result<&Value, StoreError> {
        self.values.get(index).ok_or_else(|| StoreError::Decode {
            index,
            reason: format!("row has only {} columns", self.values.len()),
        })
    }

    pub fn text(&self, index: usize) -> Result<&str, StoreError> {
        match self.get(index)? {
            Value::Text(s) => Ok(s),
            other => Err(mismatch(index, "text", other)),
        }
    }

    pub fn int(&self, index: usize) -> Result<i32, StoreError> {
        match self.get(index)? {
            Value::Int(v) => Ok(*v),
            other => Err(mismatch(index, "int", other)),
        }
    }

    pub fn decimal(&self, index: usize) -> Result<Decimal, StoreError> {
        match self.get(index)? {
            Value::Decimal(v) => Ok(*v),
            other => Err(mismatch(index, "decimal", other)),
        }
    }

    pub fn timeuuid(&self, index: usize) -> Result<TradeId, StoreError> {
        match self.get(index)? {
            Value::TimeUuid(v) => Ok(*v),
            other => Err(mismatch(index, "timeuuid", other)),
        }
    }
}

fn mismatch(index: usize, expected: &str, got: &Value) -> StoreError {
    StoreError::Decode {
        index,
        reason: format!("expected {}, got {:?}", expected, got),
    }
}

/// How a restricted column relates to its bound value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relation {
    /// `column = ?`
    Eq,
    /// `column >= minTimeuuid(?)`, bound to a timestamp.
    SinceTime,
    /// `column <= maxTimeuuid(?)`, bound to a timestamp.
    UntilTime,
}

/// A `WHERE` term; each consumes one bound value, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Restriction {
    pub column: &'static str,
    pub relation: Relation,
}

impl Restriction {
    pub fn eq(column: &'static str) -> Self {
        Restriction {
            column,
            relation: Relation::Eq,
        }
    }

    pub fn since(column: &'static str) -> Self {
        Restriction {
            column,
            relation: Relation::SinceTime,
        }
    }

    pub fn until(column: &'static str) -> Self {
        Restriction {
            column,
            relation: Relation::UntilTime,
        }
    }
}

/// A read of every column of one table, in definition order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Select {
    pub table: Table,
    pub restrictions: Vec<Restriction>,
    pub limit: Option<usize>,
}

impl Select {
    pub fn from(table: Table) -> Self {
        Select {
            table,
            restrictions: Vec::new(),
            limit: None,
        }
    }

    pub fn with(mut self, restriction: Restriction) -> Self {
        self.restrictions.push(restriction);
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Statements the data layer issues.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Statement {
    CreateKeyspace {
        name: String,
        replication_factor: u32,
    },
    CreateTable(Table),
    /// Full-row insert, one placeholder per column in definition order.
    Insert(Table),
    Select(Select),
}

/// Connection to the wide-column store.
///
/// One session lives for the whole process; every call completes before the
/// caller issues the next one.
#[async_trait]
pub trait Session: Send + Sync {
    /// Server-side handle for a prepared statement.
    type Prepared: Send + Sync;

    /// Execute a statement with positional values and return its rows.
    async fn execute(&self, statement: &Statement, values: Vec<Value>)
        -> Result<Vec<Row>, StoreError>;

    /// Prepare a statement for repeated execution.
    async fn prepare(&self, statement: &Statement) -> Result<Self::Prepared, StoreError>;

    /// Submit one batch: the prepared statement executed once per value row.
    async fn batch(&self, prepared: &Self::Prepared, rows: &[Vec<Value>])
        -> Result<(), StoreError>;

    /// Select the keyspace that unqualified table names resolve against.
    async fn use_keyspace(&self, keyspace: &str) -> Result<(), StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_row_accessors() {
        let row = Row::new(vec![
            Value::from("VOO"),
            Value::Int(10),
            Value::Decimal(Decimal::new(1999, 2)),
        ]);
        assert_eq!(row.text(0).unwrap(), "VOO");
        assert_eq!(row.int(1).unwrap(), 10);
        assert_eq!(row.decimal(2).unwrap(), Decimal::new(1999, 2));
    }

    #[test]
    fn test_row_type_mismatch() {
        let row = Row::new(vec![Value::Int(1)]);
        let err = row.text(0).unwrap_err();
        assert!(matches!(err, StoreError::Decode { index: 0, .. }));
        assert!(row.int(3).is_err());
    }

    #[test]
    fn test_value_ordering() {
        assert!(Value::from("AMZN") < Value::from("VOO"));
        assert!(Value::Decimal(Decimal::new(5, 0)) > Value::Decimal(Decimal::new(45, 1)));

        let d1 = NaiveDate::from_ymd_opt(2014, 1, 1).unwrap();
        let d2 = NaiveDate::from_ymd_opt(2015, 1, 1).unwrap();
        let a = TradeId::from_date(d1, 0, [0; 6]).unwrap();
        let b = TradeId::from_date(d2, 0, [0; 6]).unwrap();
        assert!(Value::from(a) < Value::from(b));
    }

    #[test]
    fn test_select_builder() {
        let select = Select::from(Table::TradesBySymbol)
            .with(Restriction::eq("account"))
            .with(Restriction::eq("symbol"))
            .limit(10);
        assert_eq!(select.restrictions.len(), 2);
        assert_eq!(select.limit, Some(10));
    }
}
