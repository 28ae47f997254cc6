use std::fmt;
use std::sync::Arc;

use crate::config::StorageConfig;
use crate::error::ConfigError;
use crate::indirection::{Indirection, StorageKind, StorageStrategy};
use crate::metrics::CacheStatistics;
use crate::policy::{IndirectionManager, StoredItemManager, UnstoredItemManager};

/// An advisory condition an operator may want to resize the pools for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CapacityWarning {
  /// A pool's occupancy reached the configured warning fraction.
  PoolNearCapacity {
    kind: StorageKind,
    current_size: u64,
    maximum_size: u64,
  },
  /// Items were refused as oversized since the last reset.
  ItemsRefused { kind: StorageKind, count: u64 },
  /// The stored per-item ceiling is large relative to the stored pool, so a
  /// single admission can flush most of it.
  ItemCeilingHigh {
    maximum_item_size: u64,
    maximum_size: u64,
  },
}

impl fmt::Display for CapacityWarning {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      CapacityWarning::PoolNearCapacity {
        kind,
        current_size,
        maximum_size,
      } => write!(
        f,
        "{} pool holds {} of {} bytes",
        kind, current_size, maximum_size
      ),
      CapacityWarning::ItemsRefused { kind, count } => {
        write!(f, "{} pool refused {} oversized items", kind, count)
      }
      CapacityWarning::ItemCeilingHigh {
        maximum_item_size,
        maximum_size,
      } => write!(
        f,
        "stored item ceiling of {} bytes is large for a {} byte pool",
        maximum_item_size, maximum_size
      ),
    }
  }
}

/// Owns the stored and unstored discard caches and routes items to them.
pub struct ItemStorageManager<H: Indirection + ?Sized + 'static = dyn Indirection> {
  stored: Arc<StoredItemManager<H>>,
  unstored: Arc<UnstoredItemManager<H>>,
  config: StorageConfig,
}

impl<H: Indirection + ?Sized + 'static> ItemStorageManager<H> {
  /// Sizes both caches from `config`. Fails if any limit is zero.
  pub fn initialize(config: &StorageConfig) -> Result<Self, ConfigError> {
    config.validate()?;

    let manager = Self {
      stored: Arc::new(StoredItemManager::new(
        config.stored_max_bytes,
        config.stored_max_item_bytes,
      )),
      unstored: Arc::new(UnstoredItemManager::new(config.unstored_max_bytes)),
      config: *config,
    };

    tracing::info!(
      stored_max_bytes = config.stored_max_bytes,
      stored_max_item_bytes = config.stored_max_item_bytes,
      unstored_max_bytes = config.unstored_max_bytes,
      "item storage manager initialized"
    );
    if let Some(warning) = manager.item_ceiling_warning() {
      tracing::warn!(%warning, "storage configuration");
    }

    Ok(manager)
  }

  pub fn config(&self) -> &StorageConfig {
    &self.config
  }

  /// Returns the cache an item with `strategy` belongs to.
  ///
  /// `StoreNever` items go to the unstored cache, everything else to the
  /// stored cache. The caller keeps the reference for the item's lifetime.
  pub fn register(&self, strategy: StorageStrategy) -> Arc<dyn IndirectionManager<H>> {
    match StorageKind::from(strategy) {
      StorageKind::Stored => Arc::clone(&self.stored) as Arc<dyn IndirectionManager<H>>,
      StorageKind::Unstored => Arc::clone(&self.unstored) as Arc<dyn IndirectionManager<H>>,
    }
  }

  pub fn stored(&self) -> &Arc<StoredItemManager<H>> {
    &self.stored
  }

  pub fn unstored(&self) -> &Arc<UnstoredItemManager<H>> {
    &self.unstored
  }

  pub fn current_count(&self) -> u64 {
    self
      .stored
      .current_count()
      .saturating_add(self.unstored.current_count())
  }

  pub fn current_size(&self) -> u64 {
    self
      .stored
      .current_size()
      .saturating_add(self.unstored.current_size())
  }

  pub fn discardable_size(&self) -> u64 {
    self
      .stored
      .discardable_size()
      .saturating_add(self.unstored.discardable_size())
  }

  pub fn maximum_size(&self) -> u64 {
    self
      .stored
      .maximum_size()
      .saturating_add(self.unstored.maximum_size())
  }

  pub fn total_count(&self) -> u64 {
    self
      .stored
      .total_count()
      .saturating_add(self.unstored.total_count())
  }

  pub fn total_discard_count(&self) -> u64 {
    self
      .stored
      .total_discard_count()
      .saturating_add(self.unstored.total_discard_count())
  }

  pub fn total_discard_size(&self) -> u64 {
    self
      .stored
      .total_discard_size()
      .saturating_add(self.unstored.total_discard_size())
  }

  pub fn total_refusal_count(&self) -> u64 {
    self
      .stored
      .total_refusal_count()
      .saturating_add(self.unstored.total_refusal_count())
  }

  /// The combined statistics of both caches.
  pub fn statistics(&self) -> CacheStatistics {
    self.stored.statistics() + self.unstored.statistics()
  }

  /// Zeroes the monotonic counters of both caches.
  pub fn reset_totals(&self) {
    self.stored.reset_totals();
    self.unstored.reset_totals();
  }

  /// Evaluates the warning thresholds and logs every warning found.
  pub fn check_capacity(&self) -> Vec<CapacityWarning> {
    let mut warnings = Vec::new();
    let pool_fraction = self.config.thresholds.pool_fraction;

    for (kind, stats) in [
      (StorageKind::Stored, self.stored.statistics()),
      (StorageKind::Unstored, self.unstored.statistics()),
    ] {
      if stats.current_size > 0
        && stats.current_size as f64 >= stats.maximum_size as f64 * pool_fraction
      {
        warnings.push(CapacityWarning::PoolNearCapacity {
          kind,
          current_size: stats.current_size,
          maximum_size: stats.maximum_size,
        });
      }
      if stats.total_refusal_count > 0 {
        warnings.push(CapacityWarning::ItemsRefused {
          kind,
          count: stats.total_refusal_count,
        });
      }
    }
    warnings.extend(self.item_ceiling_warning());

    for warning in &warnings {
      tracing::warn!(%warning, "item storage capacity");
    }
    warnings
  }

  fn item_ceiling_warning(&self) -> Option<CapacityWarning> {
    let maximum_item_size = self.stored.maximum_item_size();
    let maximum_size = self.stored.maximum_size();
    let limit = maximum_size as f64 * self.config.thresholds.item_fraction;
    (maximum_item_size as f64 > limit).then_some(CapacityWarning::ItemCeilingHigh {
      maximum_item_size,
      maximum_size,
    })
  }

  /// Renders both caches and their linked handles as a short XML report.
  pub fn write_xml(&self, out: &mut dyn fmt::Write) -> fmt::Result {
    writeln!(out, "<ItemStorageManager>")?;
    self.stored.write_xml(out)?;
    self.unstored.write_xml(out)?;
    writeln!(out, "</ItemStorageManager>")
  }

  pub fn xml_dump(&self) -> String {
    let mut out = String::new();
    // Writing into a String cannot fail.
    let _ = self.write_xml(&mut out);
    out
  }
}

impl<H: Indirection + ?Sized + 'static> fmt::Debug for ItemStorageManager<H> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("ItemStorageManager")
      .field("stored", &self.stored)
      .field("unstored", &self.unstored)
      .finish()
  }
}
