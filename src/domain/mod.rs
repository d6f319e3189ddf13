//! Domain types for the investments data model.
//!
//! This module provides:
//! - Primitives: Username, AccountNumber, Symbol, TradeType
//! - Money amounts and time-ordered trade ids
//! - Entity records (Account, Position, Trade) and the fixed catalog

pub mod catalog;
pub mod entities;
pub mod money;
pub mod primitives;
pub mod trade_id;

pub use catalog::{Catalog, User};
pub use entities::{Account, Position, Trade};
pub use money::{Money, MONEY_SCALE};
pub use primitives::{AccountNumber, Symbol, TradeType, TradeTypeParseError, Username};
pub use trade_id::{TradeId, TradeIdError};
