//! Progress tracking configuration

use serde::Deserialize;

use super::error::ValidationError;
use crate::domain::progress::DEFAULT_ESTIMATED_TOTAL_FACTOR;

/// Tunables for the progress use cases.
#[derive(Debug, Clone, Deserialize)]
pub struct TrackingConfig {
    /// Leaderboard size when the caller gives none
    #[serde(default = "default_top_users_limit")]
    pub default_top_users_limit: u32,

    /// Largest leaderboard a caller may request
    #[serde(default = "default_max_top_users_limit")]
    pub max_top_users_limit: u32,

    /// Multiplier guessing a module's size from its tracked lessons
    #[serde(default = "default_estimated_total_factor")]
    pub estimated_total_factor: f64,
}

impl TrackingConfig {
    /// Clamps a requested leaderboard size into the configured bounds.
    pub fn top_users_limit(&self, requested: Option<u32>) -> u32 {
        requested
            .unwrap_or(self.default_top_users_limit)
            .clamp(1, self.max_top_users_limit)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.default_top_users_limit == 0
            || self.default_top_users_limit > self.max_top_users_limit
        {
            return Err(ValidationError::InvalidTopUsersLimit);
        }
        if !self.estimated_total_factor.is_finite() || self.estimated_total_factor < 1.0 {
            return Err(ValidationError::InvalidEstimateFactor);
        }
        Ok(())
    }
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            default_top_users_limit: default_top_users_limit(),
            max_top_users_limit: default_max_top_users_limit(),
            estimated_total_factor: default_estimated_total_factor(),
        }
    }
}

fn default_top_users_limit() -> u32 {
    10
}

fn default_max_top_users_limit() -> u32 {
    100
}

fn default_estimated_total_factor() -> f64 {
    DEFAULT_ESTIMATED_TOTAL_FACTOR
}
