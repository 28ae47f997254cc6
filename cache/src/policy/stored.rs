use std::fmt;

use super::{DiscardPolicy, IndirectionCache};
use crate::indirection::{Indirection, StorageKind};

/// Caches items that already have a durable copy.
///
/// Discarding only drops the cache's link; the payload stays with its item and
/// can be read back from storage later. Items above `maximum_item_size` are
/// refused, as caching them would flush too much of the pool at once.
#[derive(Debug, Clone, Copy)]
pub struct StoredPolicy {
  maximum_item_size: u64,
}

impl StoredPolicy {
  pub fn new(maximum_item_size: u64) -> Self {
    Self { maximum_item_size }
  }

  pub fn maximum_item_size(&self) -> u64 {
    self.maximum_item_size
  }
}

impl<H: Indirection + ?Sized> DiscardPolicy<H> for StoredPolicy {
  const KIND: StorageKind = StorageKind::Stored;
  const NAME: &'static str = "StoredItemManager";

  fn admits(&self, size: u64, _maximum_size: u64) -> bool {
    size <= self.maximum_item_size
  }

  /// Soft discard: nothing to release.
  fn on_discard(&self, _victim: &H) {}

  fn write_xml_attributes(&self, out: &mut dyn fmt::Write) -> fmt::Result {
    write!(out, " maximumItemSize=\"{}\"", self.maximum_item_size)
  }
}

/// The discard cache for items with a durable backing copy.
pub type StoredItemManager<H = dyn Indirection> = IndirectionCache<H, StoredPolicy>;

impl<H: Indirection + ?Sized> IndirectionCache<H, StoredPolicy> {
  pub fn new(maximum_size: u64, maximum_item_size: u64) -> Self {
    Self::with_policy(maximum_size, StoredPolicy::new(maximum_item_size))
  }

  pub fn maximum_item_size(&self) -> u64 {
    self.policy().maximum_item_size()
  }
}
