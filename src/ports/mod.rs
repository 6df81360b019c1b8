//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the domain and the outside world. Adapters implement these ports.
//!
//! - `ProgressRepository` - Durable storage of Progress aggregates and the
//!   statistics read models

mod progress_repository;

pub use progress_repository::ProgressRepository;
