//! Configuration Module - Runtime Tuning Parameters
//!
//! Manages all configuration parameters for RGC.
//! Proper configuration balances collection frequency against footprint.

/// Main configuration for the Riven memory runtime
///
/// Stores all parameters affecting allocator and collector behavior.
/// Most parameters have sensible defaults.
///
/// # Examples
///
/// ```rust
/// use rgc::GcConfig;
///
/// // Use default configuration
/// let config = GcConfig::default();
///
/// // Custom configuration for a small embedded host
/// let config = GcConfig {
///     collect_threshold: 256 * 1024,
///     scratch_capacity: 64 * 1024,
///     ..Default::default()
/// };
/// ```
#[derive(Debug, Clone)]
pub struct GcConfig {
    /// Soft heap budget in bytes
    ///
    /// Advisory upper bound used for logging and statistics. The heap
    /// itself grows on demand; exceeding the budget is reported, not
    /// refused.
    /// Default: 64MB
    pub heap_budget: usize,

    /// Minimum collection threshold in bytes
    ///
    /// A collection is considered when live bytes plus the pending
    /// allocation would exceed the current threshold. The threshold
    /// never drops below this floor, so small programs are not
    /// collected continuously.
    /// Default: 1MB
    pub collect_threshold: usize,

    /// Heap growth factor
    ///
    /// After each collection the next threshold becomes
    /// `max(collect_threshold, live_bytes * growth_factor)`.
    ///
    /// Recommended values:
    /// - Tight memory: 1.25 - 1.5
    /// - General purpose: 2.0
    ///
    /// Default: 2.0
    pub growth_factor: f64,

    /// Scratch allocator capacity in bytes
    ///
    /// Fixed size of the LIFO scratch buffer used for call frames.
    /// Exhaustion surfaces as `RgcError::ScratchOverflow`.
    /// Default: 1MB
    pub scratch_capacity: usize,

    /// Overwrite freed object memory with a poison pattern
    ///
    /// Makes use-after-free in the embedding fail loudly instead of
    /// silently reading stale data.
    /// Default: true in debug builds, false in release
    pub poison_freed: bool,

    /// Enable verbose collection logging
    ///
    /// Logs cycle start/end, trigger reason, and per-cycle statistics.
    /// Default: false
    pub verbose: bool,
}

impl Default for GcConfig {
    /// Default configuration
    ///
    /// Balanced for a general-purpose interpreter host.
    fn default() -> Self {
        GcConfig {
            heap_budget: 64 * MB,
            collect_threshold: MB,
            growth_factor: 2.0,
            scratch_capacity: MB,
            poison_freed: cfg!(debug_assertions),
            verbose: false,
        }
    }
}

impl GcConfig {
    /// Validate configuration
    ///
    /// Checks if all values are in valid ranges.
    /// Returns error if configuration is invalid.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use rgc::GcConfig;
    ///
    /// let config = GcConfig {
    ///     growth_factor: 0.5,  // Invalid!
    ///     ..Default::default()
    /// };
    ///
    /// assert!(config.validate().is_err());
    /// ```
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.collect_threshold == 0 {
            return Err(ConfigError::InvalidThreshold(
                "collect_threshold must be > 0".to_string(),
            ));
        }

        if self.heap_budget < self.collect_threshold {
            return Err(ConfigError::InvalidHeapBudget(
                "heap_budget must be >= collect_threshold".to_string(),
            ));
        }

        if !self.growth_factor.is_finite() || self.growth_factor < 1.0 {
            return Err(ConfigError::InvalidGrowthFactor(
                "growth_factor must be a finite value >= 1.0".to_string(),
            ));
        }

        if self.scratch_capacity == 0 {
            return Err(ConfigError::InvalidScratchCapacity(
                "scratch_capacity must be > 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Build configuration from environment variables
    ///
    /// Overrides defaults with environment variables:
    /// - RGC_HEAP_BUDGET
    /// - RGC_COLLECT_THRESHOLD
    /// - RGC_GROWTH_FACTOR
    /// - RGC_SCRATCH_CAPACITY
    /// - RGC_VERBOSE
    ///
    /// # Examples
    ///
    /// ```bash
    /// export RGC_COLLECT_THRESHOLD=4194304  # 4MB
    /// export RGC_VERBOSE=1
    /// ```
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("RGC_HEAP_BUDGET") {
            if let Ok(size) = val.parse::<usize>() {
                config.heap_budget = size;
            }
        }

        if let Ok(val) = std::env::var("RGC_COLLECT_THRESHOLD") {
            if let Ok(size) = val.parse::<usize>() {
                config.collect_threshold = size;
            }
        }

        if let Ok(val) = std::env::var("RGC_GROWTH_FACTOR") {
            if let Ok(factor) = val.parse::<f64>() {
                config.growth_factor = factor;
            }
        }

        if let Ok(val) = std::env::var("RGC_SCRATCH_CAPACITY") {
            if let Ok(size) = val.parse::<usize>() {
                config.scratch_capacity = size;
            }
        }

        if let Ok(val) = std::env::var("RGC_VERBOSE") {
            config.verbose = val == "1" || val.eq_ignore_ascii_case("true");
        }

        config
    }
}

/// Error types for configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid heap budget: {0}")]
    InvalidHeapBudget(String),

    #[error("Invalid threshold: {0}")]
    InvalidThreshold(String),

    #[error("Invalid growth factor: {0}")]
    InvalidGrowthFactor(String),

    #[error("Invalid scratch capacity: {0}")]
    InvalidScratchCapacity(String),
}

const MB: usize = 1024 * 1024;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = GcConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.growth_factor, 2.0);
        assert_eq!(config.collect_threshold, MB);
    }

    #[test]
    fn test_zero_threshold_rejected() {
        let config = GcConfig {
            collect_threshold: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_shrinking_growth_factor_rejected() {
        let config = GcConfig {
            growth_factor: 0.9,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_budget_below_threshold_rejected() {
        let config = GcConfig {
            heap_budget: 1024,
            collect_threshold: 2048,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
