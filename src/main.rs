//! learning-progress - bootstraps the progress store.
//!
//! Loads configuration, installs logging, connects to PostgreSQL and
//! optionally migrates it, then logs the leaderboard head. Given a user id
//! argument, prints that learner's progress overview as JSON.

use std::sync::Arc;

use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use learning_progress::adapters::postgres::{self, PostgresProgressRepository};
use learning_progress::application::{GetUserProgressHandler, GetUserProgressQuery};
use learning_progress::config::{AppConfig, LoggingConfig, ValidationError};
use learning_progress::ports::ProgressRepository;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Configuration
    let config = AppConfig::load()?;
    config.validate()?;

    // 2. Logging
    init_tracing(&config.logging)?;
    info!(version = env!("CARGO_PKG_VERSION"), "Starting learning-progress");

    // 3. Database
    let pool = postgres::connect(&config.database).await?;
    if config.database.run_migrations {
        postgres::run_migrations(&pool).await?;
    }
    let repository: Arc<dyn ProgressRepository> =
        Arc::new(PostgresProgressRepository::new(pool));

    // 4. Smoke check
    let leaders = repository
        .get_top_users(config.tracking.top_users_limit(None))
        .await?;
    info!(users = leaders.len(), "Progress store ready");
    for (rank, leader) in leaders.iter().enumerate() {
        info!(
            rank = rank + 1,
            user_id = %leader.user_id,
            lessons_completed = leader.lessons_completed,
            modules_completed = leader.modules_completed,
            total_time_spent = leader.total_time_spent,
            "Leaderboard"
        );
    }

    // 5. Optional overview
    if let Some(user_id) = std::env::args().nth(1) {
        let handler = GetUserProgressHandler::new(repository)
            .with_estimated_total_factor(config.tracking.estimated_total_factor);
        let report = handler
            .handle(GetUserProgressQuery {
                user_id,
                ..Default::default()
            })
            .await?;
        println!("{}", serde_json::to_string_pretty(&report)?);
    }

    Ok(())
}

fn init_tracing(logging: &LoggingConfig) -> Result<(), ValidationError> {
    let registry = tracing_subscriber::registry().with(logging.env_filter()?);

    if logging.json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
    Ok(())
}
