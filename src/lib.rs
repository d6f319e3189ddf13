pub mod config;
pub mod console;
pub mod db;
pub mod domain;
pub mod error;
pub mod generator;
pub mod query;

pub use config::Config;
pub use console::Console;
pub use db::{BatchWriter, MemorySession, ScyllaSession, Session};
pub use domain::{Account, AccountNumber, Catalog, Money, Position, Symbol, Trade, TradeId, TradeType, Username};
pub use error::AppError;
pub use generator::{Dataset, Generator, GeneratorConfig};
pub use query::{AccessPattern, QueryRouter, TradeFilter};
