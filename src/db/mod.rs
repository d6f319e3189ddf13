//! Storage layer for the wide-column store.
//!
//! This module provides:
//! - The `Session` abstraction with cluster and in-memory backends
//! - Table definitions and CQL rendering
//! - Keyspace/table provisioning
//! - Batched, denormalized writes

pub mod cluster;
pub mod cql;
pub mod fanout;
pub mod memory;
pub mod rows;
pub mod schema;
pub mod session;
pub mod tables;

pub use cluster::ScyllaSession;
pub use fanout::{BatchWriter, PopulateSummary, DEFAULT_BATCH_SIZE};
pub use memory::MemorySession;
pub use schema::{ensure_keyspace, ensure_schema, init_store};
pub use session::{Restriction, Row, Select, Session, Statement, StoreError, Value};
pub use tables::Table;
