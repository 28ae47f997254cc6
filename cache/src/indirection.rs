use std::fmt;

use generational_arena::Index;
use parking_lot::Mutex;

/// The capability an item exposes so that it can be threaded into an
/// `IndirectionList`.
///
/// Implemented by the owning item's wrapper, never by the cache. The cache
/// only ever holds a `Weak` reference to the implementor.
pub trait Indirection: Send + Sync {
  /// A stable numeric id. Diagnostic only, never used for lookup.
  fn id(&self) -> u64;

  /// Approximate in-memory cost of the item in bytes.
  ///
  /// Must stay fixed while the handle is linked; the list subtracts the value
  /// it recorded at append time, not a fresh reading.
  fn in_memory_size(&self) -> u64;

  /// Frees the item's payload if it is still discardable.
  ///
  /// Only called by the unstored policy when it discards this handle, and
  /// only after every list lock has been released, so the implementation may
  /// call back into `manage`/`unmanage`.
  fn release_if_discardable(&self);

  /// The link cell the cache uses to record this handle's list membership.
  fn cache_link(&self) -> &CacheLink;
}

/// Where a linked handle currently lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct LinkSlot {
  pub(crate) list: u64,
  pub(crate) index: Index,
}

/// Per-handle membership cell.
///
/// Empty when the handle is not in any list. Written exclusively by
/// `IndirectionList` while it holds its own lock, which makes the
/// "already linked" check structural: a handle whose cell is occupied is
/// refused by every list.
#[derive(Default)]
pub struct CacheLink {
  slot: Mutex<Option<LinkSlot>>,
}

impl CacheLink {
  pub fn new() -> Self {
    Self::default()
  }

  /// Returns `true` if the handle is currently linked into some list.
  pub fn is_linked(&self) -> bool {
    self.slot.lock().is_some()
  }

  pub(crate) fn slot(&self) -> &Mutex<Option<LinkSlot>> {
    &self.slot
  }
}

impl fmt::Debug for CacheLink {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match *self.slot.lock() {
      Some(slot) => f
        .debug_struct("CacheLink")
        .field("list", &slot.list)
        .finish_non_exhaustive(),
      None => f.write_str("CacheLink(unlinked)"),
    }
  }
}

/// How the owning item intends to persist itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageStrategy {
  /// The item is never written to durable storage.
  StoreNever,
  /// The item may be written if memory pressure demands it.
  StoreMaybe,
  /// The item is written at some point after being added.
  StoreEventually,
  /// The item is written as part of the operation that adds it.
  StoreAlways,
}

impl StorageStrategy {
  /// Whether an item with this strategy can have a durable backing copy.
  pub fn may_persist(self) -> bool {
    !matches!(self, StorageStrategy::StoreNever)
  }
}

/// Which of the two discard policies a handle belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageKind {
  /// Items with a durable copy. Discarding only drops the memory shortcut.
  Stored,
  /// Items that exist only in memory. Discarding releases the payload.
  Unstored,
}

impl From<StorageStrategy> for StorageKind {
  fn from(strategy: StorageStrategy) -> Self {
    if strategy.may_persist() {
      StorageKind::Stored
    } else {
      StorageKind::Unstored
    }
  }
}

impl fmt::Display for StorageKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      StorageKind::Stored => write!(f, "stored"),
      StorageKind::Unstored => write!(f, "unstored"),
    }
  }
}
