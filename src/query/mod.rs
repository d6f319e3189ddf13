//! Query routing: one table per access pattern.

pub mod filter;
pub mod router;

pub use filter::{AccessPattern, DateRange, TradeFilter};
pub use router::{QueryRouter, DEFAULT_HISTORY_LIMIT};
