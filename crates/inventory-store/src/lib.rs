//! Storage layer for the inventory checkout engine.
//!
//! - [`StorageGovernor`] opens the single-writer SQLite pool with WAL,
//!   relaxed `synchronous` and a bounded busy timeout.
//! - [`StockLedger`] owns per-SKU counters and their version stamps.
//! - [`OrderRepository`] persists orders together with their items.
//!
//! Both traits come with a SQLite implementation and an in-memory one
//! for tests.

pub mod error;
pub mod governor;
pub mod ledger;
pub mod memory;
pub mod orders;
pub mod record;
pub mod sqlite;

pub use error::{Result, StoreError};
pub use governor::{GovernorConfig, JournalMode, StorageGovernor, SyncMode};
pub use ledger::StockLedger;
pub use memory::{InMemoryOrderRepository, InMemoryStockLedger};
pub use orders::OrderRepository;
pub use record::{RestoreOutcome, StockRecord, Version};
pub use sqlite::{SqliteOrderRepository, SqliteStockLedger};
