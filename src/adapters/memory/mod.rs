//! In-memory adapters.

mod progress_repository;

pub use progress_repository::InMemoryProgressRepository;
