use crate::error::ConfigError;

/// Default fraction of a pool's maximum at which occupancy is reported.
pub const DEFAULT_POOL_WARNING_FRACTION: f64 = 0.75;

/// Default fraction of the stored pool above which the per-item ceiling is
/// reported as too generous.
pub const DEFAULT_ITEM_WARNING_FRACTION: f64 = 0.5;

/// Advisory thresholds for `ItemStorageManager::check_capacity`.
///
/// These do not change caching behaviour; they only decide when a warning is
/// logged for the operator.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default, deny_unknown_fields))]
pub struct WarningThresholds {
  /// Warn when a pool's current size reaches this fraction of its maximum.
  pub pool_fraction: f64,
  /// Warn when the stored per-item ceiling exceeds this fraction of the
  /// stored pool.
  pub item_fraction: f64,
}

impl Default for WarningThresholds {
  fn default() -> Self {
    Self {
      pool_fraction: DEFAULT_POOL_WARNING_FRACTION,
      item_fraction: DEFAULT_ITEM_WARNING_FRACTION,
    }
  }
}

impl WarningThresholds {
  fn validate(&self) -> Result<(), ConfigError> {
    for (field, value) in [
      ("pool_fraction", self.pool_fraction),
      ("item_fraction", self.item_fraction),
    ] {
      if !(value > 0.0 && value <= 1.0) {
        return Err(ConfigError::Threshold { field, value });
      }
    }
    Ok(())
  }
}

/// The three byte limits an `ItemStorageManager` is sized from.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(deny_unknown_fields))]
pub struct StorageConfig {
  /// Ceiling for the stored pool.
  pub stored_max_bytes: u64,
  /// Largest single stored item worth caching.
  pub stored_max_item_bytes: u64,
  /// Ceiling for the unstored pool, and for any single unstored item.
  pub unstored_max_bytes: u64,
  #[cfg_attr(feature = "serde", serde(default))]
  pub thresholds: WarningThresholds,
}

impl StorageConfig {
  pub fn new(stored_max_bytes: u64, stored_max_item_bytes: u64, unstored_max_bytes: u64) -> Self {
    Self {
      stored_max_bytes,
      stored_max_item_bytes,
      unstored_max_bytes,
      thresholds: WarningThresholds::default(),
    }
  }

  pub fn with_thresholds(mut self, thresholds: WarningThresholds) -> Self {
    self.thresholds = thresholds;
    self
  }

  /// Checks that every limit is positive and every threshold is in range.
  pub fn validate(&self) -> Result<(), ConfigError> {
    for (field, value) in [
      ("stored_max_bytes", self.stored_max_bytes),
      ("stored_max_item_bytes", self.stored_max_item_bytes),
      ("unstored_max_bytes", self.unstored_max_bytes),
    ] {
      if value == 0 {
        return Err(ConfigError::NonPositive { field });
      }
    }
    self.thresholds.validate()
  }

  /// Parses and validates a YAML document such as
  ///
  /// ```yaml
  /// stored_max_bytes: 1048576
  /// stored_max_item_bytes: 65536
  /// unstored_max_bytes: 524288
  /// thresholds:
  ///   pool_fraction: 0.8
  /// ```
  #[cfg(feature = "serde")]
  pub fn from_yaml_str(source: &str) -> Result<Self, ConfigError> {
    let config: StorageConfig =
      serde_yaml::from_str(source).map_err(|e| ConfigError::Parse(e.to_string()))?;
    config.validate()?;
    Ok(config)
  }
}
