use crate::config::{StorageConfig, WarningThresholds};
use crate::error::ConfigError;
use crate::indirection::Indirection;
use crate::manager::ItemStorageManager;

/// A builder for creating `ItemStorageManager` instances.
///
/// All three byte limits are required; the warning thresholds default to
/// `WarningThresholds::default()`.
#[derive(Debug, Clone, Default)]
pub struct StorageManagerBuilder {
  stored_max_bytes: Option<u64>,
  stored_max_item_bytes: Option<u64>,
  unstored_max_bytes: Option<u64>,
  thresholds: WarningThresholds,
}

impl StorageManagerBuilder {
  /// Creates a new `StorageManagerBuilder` with no limits set.
  pub fn new() -> Self {
    Self::default()
  }

  /// Seeds every field from an existing configuration.
  pub fn from_config(config: &StorageConfig) -> Self {
    Self {
      stored_max_bytes: Some(config.stored_max_bytes),
      stored_max_item_bytes: Some(config.stored_max_item_bytes),
      unstored_max_bytes: Some(config.unstored_max_bytes),
      thresholds: config.thresholds,
    }
  }

  /// Sets the byte ceiling of the stored pool.
  pub fn stored_max_bytes(mut self, bytes: u64) -> Self {
    self.stored_max_bytes = Some(bytes);
    self
  }

  /// Sets the largest stored item that will be cached.
  pub fn stored_max_item_bytes(mut self, bytes: u64) -> Self {
    self.stored_max_item_bytes = Some(bytes);
    self
  }

  /// Sets the byte ceiling of the unstored pool.
  pub fn unstored_max_bytes(mut self, bytes: u64) -> Self {
    self.unstored_max_bytes = Some(bytes);
    self
  }

  /// Sets the occupancy fraction at which `check_capacity` warns.
  pub fn pool_warning_fraction(mut self, fraction: f64) -> Self {
    self.thresholds.pool_fraction = fraction;
    self
  }

  /// Sets the item-to-pool ratio above which the stored item ceiling is
  /// reported.
  pub fn item_warning_fraction(mut self, fraction: f64) -> Self {
    self.thresholds.item_fraction = fraction;
    self
  }

  /// Assembles the configuration without building anything.
  pub fn to_config(&self) -> Result<StorageConfig, ConfigError> {
    let config = StorageConfig {
      stored_max_bytes: self
        .stored_max_bytes
        .ok_or(ConfigError::Missing("stored_max_bytes"))?,
      stored_max_item_bytes: self
        .stored_max_item_bytes
        .ok_or(ConfigError::Missing("stored_max_item_bytes"))?,
      unstored_max_bytes: self
        .unstored_max_bytes
        .ok_or(ConfigError::Missing("unstored_max_bytes"))?,
      thresholds: self.thresholds,
    };
    config.validate()?;
    Ok(config)
  }

  /// Builds an `ItemStorageManager`.
  pub fn build<H: Indirection + ?Sized + 'static>(
    self,
  ) -> Result<ItemStorageManager<H>, ConfigError> {
    ItemStorageManager::initialize(&self.to_config()?)
  }
}
