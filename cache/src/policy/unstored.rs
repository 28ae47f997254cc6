use super::{DiscardPolicy, IndirectionCache};
use crate::indirection::{Indirection, StorageKind};

/// Caches items whose only representation is in memory.
///
/// A discarded handle has its payload released through
/// `Indirection::release_if_discardable`. The pool ceiling doubles as the
/// per-item ceiling.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnstoredPolicy;

impl<H: Indirection + ?Sized> DiscardPolicy<H> for UnstoredPolicy {
  const KIND: StorageKind = StorageKind::Unstored;
  const NAME: &'static str = "UnstoredItemManager";

  fn admits(&self, size: u64, maximum_size: u64) -> bool {
    size <= maximum_size
  }

  fn on_discard(&self, victim: &H) {
    victim.release_if_discardable();
  }
}

/// The discard cache for items with no durable copy.
pub type UnstoredItemManager<H = dyn Indirection> = IndirectionCache<H, UnstoredPolicy>;

impl<H: Indirection + ?Sized> IndirectionCache<H, UnstoredPolicy> {
  pub fn new(maximum_size: u64) -> Self {
    Self::with_policy(maximum_size, UnstoredPolicy)
  }
}
