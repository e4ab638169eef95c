//! Worker configuration.

use serde::{Deserialize, Serialize};

use crate::queue::{is_valid_tube_name, DEFAULT_TUBE};

/// Worker configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Tube treated as the implicit subscription every connection starts
    /// with. A job arriving from this tube without a registered handler is
    /// released and the tube unwatched, rather than treated as a fault.
    #[serde(default = "default_fallback_tube")]
    pub fallback_tube: String,
}

fn default_fallback_tube() -> String {
    DEFAULT_TUBE.to_string()
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            fallback_tube: default_fallback_tube(),
        }
    }
}

impl WorkerConfig {
    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if `fallback_tube` is not a legal tube name.
    pub fn validate(&self) -> Result<(), String> {
        if !is_valid_tube_name(&self.fallback_tube) {
            return Err(format!(
                "fallback_tube {:?} is not a valid tube name",
                self.fallback_tube
            ));
        }
        Ok(())
    }
}
