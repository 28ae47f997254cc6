use std::fmt;
use std::ops::Add;
use std::sync::atomic::{AtomicU64, Ordering};

use crossbeam_utils::CachePadded;

/// Monotonic counters for one discard policy.
/// All fields are atomic so the hot path never takes a lock to count.
#[derive(Debug, Default)]
pub(crate) struct Metrics {
  // --- Admissions ---
  pub(crate) added: CachePadded<AtomicU64>,
  pub(crate) added_size: CachePadded<AtomicU64>,

  // --- Discards ---
  pub(crate) discarded: CachePadded<AtomicU64>,
  pub(crate) discarded_size: CachePadded<AtomicU64>,

  // --- Refusals ---
  pub(crate) refused: CachePadded<AtomicU64>,
}

impl Metrics {
  pub(crate) fn new() -> Self {
    Self::default()
  }

  pub(crate) fn record_add(&self, size: u64) {
    self.added.fetch_add(1, Ordering::Relaxed);
    self.added_size.fetch_add(size, Ordering::Relaxed);
  }

  pub(crate) fn record_discard(&self, size: u64) {
    self.discarded.fetch_add(1, Ordering::Relaxed);
    self.discarded_size.fetch_add(size, Ordering::Relaxed);
  }

  pub(crate) fn record_refusal(&self) {
    self.refused.fetch_add(1, Ordering::Relaxed);
  }

  /// Zeroes every counter.
  pub(crate) fn reset(&self) {
    self.added.store(0, Ordering::Relaxed);
    self.added_size.store(0, Ordering::Relaxed);
    self.discarded.store(0, Ordering::Relaxed);
    self.discarded_size.store(0, Ordering::Relaxed);
    self.refused.store(0, Ordering::Relaxed);
  }
}

/// A point-in-time snapshot of a cache's occupancy and counters.
///
/// Snapshots of several caches can be summed with `+`.
#[derive(Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStatistics {
  /// Number of handles currently linked.
  pub current_count: u64,
  /// Total recorded size of the linked handles.
  pub current_size: u64,
  /// Bytes that could be discarded right now. Every linked handle is
  /// discardable, so this always equals `current_size`.
  pub discardable_size: u64,
  /// The configured byte ceiling.
  pub maximum_size: u64,
  /// Handles admitted since the last reset.
  pub total_count: u64,
  /// Bytes admitted since the last reset.
  pub total_size: u64,
  /// Handles discarded by the slimming pass since the last reset.
  pub total_discard_count: u64,
  /// Bytes discarded by the slimming pass since the last reset.
  pub total_discard_size: u64,
  /// Handles refused as oversized since the last reset.
  pub total_refusal_count: u64,
}

impl Add for CacheStatistics {
  type Output = CacheStatistics;

  fn add(self, rhs: CacheStatistics) -> CacheStatistics {
    CacheStatistics {
      current_count: self.current_count.saturating_add(rhs.current_count),
      current_size: self.current_size.saturating_add(rhs.current_size),
      discardable_size: self.discardable_size.saturating_add(rhs.discardable_size),
      maximum_size: self.maximum_size.saturating_add(rhs.maximum_size),
      total_count: self.total_count.saturating_add(rhs.total_count),
      total_size: self.total_size.saturating_add(rhs.total_size),
      total_discard_count: self.total_discard_count.saturating_add(rhs.total_discard_count),
      total_discard_size: self.total_discard_size.saturating_add(rhs.total_discard_size),
      total_refusal_count: self.total_refusal_count.saturating_add(rhs.total_refusal_count),
    }
  }
}

impl fmt::Debug for CacheStatistics {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let occupancy = if self.maximum_size == 0 {
      0.0
    } else {
      self.current_size as f64 / self.maximum_size as f64
    };
    f.debug_struct("CacheStatistics")
      .field("current_count", &self.current_count)
      .field("current_size", &self.current_size)
      .field("discardable_size", &self.discardable_size)
      .field("maximum_size", &self.maximum_size)
      .field("occupancy", &format!("{:.2}%", occupancy * 100.0))
      .field("total_count", &self.total_count)
      .field("total_size", &self.total_size)
      .field("total_discard_count", &self.total_discard_count)
      .field("total_discard_size", &self.total_discard_size)
      .field("total_refusal_count", &self.total_refusal_count)
      .finish()
  }
}
