//! Domain primitives: Username, AccountNumber, Symbol, TradeType.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Login name of a portfolio owner (partition key of `accounts_by_user`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Username(pub String);

impl Username {
    /// Create a Username from a string.
    pub fn new(name: impl Into<String>) -> Self {
        Username(name.into())
    }

    /// Get the username as a string reference.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Username {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Account number, a UUID rendered as text.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AccountNumber(pub String);

impl AccountNumber {
    /// Create an AccountNumber from a string.
    pub fn new(number: impl Into<String>) -> Self {
        AccountNumber(number.into())
    }

    /// Account number rendered from 16 random bytes as a version-4 uuid.
    pub fn from_random_bytes(bytes: [u8; 16]) -> Self {
        AccountNumber(uuid::Builder::from_random_bytes(bytes).into_uuid().to_string())
    }

    /// Get the account number as a string reference.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for AccountNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Instrument ticker symbol (e.g., "VOO", "BRK.A").
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Symbol(pub String);

impl Symbol {
    /// Create a Symbol from a string.
    pub fn new(symbol: impl Into<String>) -> Self {
        Symbol(symbol.into())
    }

    /// Get the symbol as a string reference.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Symbol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Trade direction, stored as `buy` / `sell` in the `type` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeType {
    Buy,
    Sell,
}

impl TradeType {
    pub const ALL: [TradeType; 2] = [TradeType::Buy, TradeType::Sell];

    /// Column value for this trade type.
    pub fn as_str(&self) -> &'static str {
        match self {
            TradeType::Buy => "buy",
            TradeType::Sell => "sell",
        }
    }
}

impl std::fmt::Display for TradeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown trade type: {0}")]
pub struct TradeTypeParseError(pub String);

impl FromStr for TradeType {
    type Err = TradeTypeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "buy" => Ok(TradeType::Buy),
            "sell" => Ok(TradeType::Sell),
            _ => Err(TradeTypeParseError(s.to_string())),
        }
    }
}
