//! Adapters - Implementations of port interfaces.
//!
//! - `postgres` - durable storage on PostgreSQL
//! - `memory` - in-process storage for tests and local runs

pub mod memory;
pub mod postgres;

pub use memory::InMemoryProgressRepository;
pub use postgres::PostgresProgressRepository;
