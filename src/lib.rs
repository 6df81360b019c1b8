//! Learning Progress - learner progress tracking core
//!
//! Records how far each learner is through the lessons of a module and
//! derives completion figures, time estimates, streaks and leaderboards
//! from that state.
//!
//! - `domain` - value objects, the `Progress` aggregate and read models
//! - `application` - track / calculate / overview use cases
//! - `ports` - the repository contract
//! - `adapters` - PostgreSQL and in-memory repositories
//! - `config` - environment-driven configuration

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
