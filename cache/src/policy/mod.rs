pub mod stored;
pub mod unstored;

use std::fmt;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use crate::error::InvariantError;
use crate::indirection::{Indirection, StorageKind};
use crate::list::{AppendOutcome, IndirectionList};
use crate::metrics::{CacheStatistics, Metrics};

pub use stored::{StoredItemManager, StoredPolicy};
pub use unstored::{UnstoredItemManager, UnstoredPolicy};

/// The result of asking a cache to manage a handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
  /// The handle was linked. `discarded` older handles were dropped by the
  /// slimming pass that followed.
  Admitted { discarded: u64 },
  /// The handle is too large to be worth caching. It was not linked.
  Refused,
  /// The handle was already linked into a list. Nothing changed.
  AlreadyManaged,
}

impl Admission {
  pub fn is_admitted(&self) -> bool {
    matches!(self, Admission::Admitted { .. })
  }
}

/// The two points where stored and unstored caching differ.
pub trait DiscardPolicy<H: ?Sized>: Send + Sync {
  /// Which storage kind this policy serves.
  const KIND: StorageKind;
  /// Element name used in the diagnostic dump.
  const NAME: &'static str;

  /// Whether a handle of `size` bytes may be linked at all.
  fn admits(&self, size: u64, maximum_size: u64) -> bool;

  /// Called for every handle the slimming pass discards, with no list lock
  /// held.
  fn on_discard(&self, victim: &H);

  /// Extra attributes for the policy's element in the diagnostic dump.
  fn write_xml_attributes(&self, _out: &mut dyn fmt::Write) -> fmt::Result {
    Ok(())
  }
}

/// An object-safe reference to one of the discard policies.
///
/// This is what `ItemStorageManager::register` hands out. An item keeps it for
/// its whole lifetime and calls `manage`/`unmanage` on it as its payload
/// becomes discardable or pinned again.
pub trait IndirectionManager<H: ?Sized>: Send + Sync {
  fn kind(&self) -> StorageKind;
  fn manage(&self, handle: &Arc<H>) -> Result<Admission, InvariantError>;
  fn unmanage(&self, handle: &H) -> Result<bool, InvariantError>;
  fn statistics(&self) -> CacheStatistics;
  fn reset_totals(&self);
  fn write_xml(&self, out: &mut dyn fmt::Write) -> fmt::Result;
}

/// A size-bounded FIFO cache of discardable handles.
///
/// The list and the counters are the only state. Admission and the discard
/// side effect come from `P`.
pub struct IndirectionCache<H: Indirection + ?Sized, P> {
  list: IndirectionList<H>,
  policy: P,
  maximum_size: u64,
  metrics: Metrics,
}

impl<H, P> IndirectionCache<H, P>
where
  H: Indirection + ?Sized,
  P: DiscardPolicy<H>,
{
  pub fn with_policy(maximum_size: u64, policy: P) -> Self {
    Self {
      list: IndirectionList::new(),
      policy,
      maximum_size,
      metrics: Metrics::new(),
    }
  }

  pub fn kind(&self) -> StorageKind {
    P::KIND
  }

  pub fn policy(&self) -> &P {
    &self.policy
  }

  pub fn list(&self) -> &IndirectionList<H> {
    &self.list
  }

  /// Links `handle` and then discards from the head until the list is back
  /// under `maximum_size`.
  pub fn manage(&self, handle: &Arc<H>) -> Result<Admission, InvariantError> {
    let size = handle.in_memory_size();
    if !self.policy.admits(size, self.maximum_size) {
      self.metrics.record_refusal();
      tracing::debug!(
        kind = %P::KIND,
        id = handle.id(),
        size,
        "item too large to cache, refused"
      );
      return Ok(Admission::Refused);
    }

    match self.list.try_append(handle)? {
      AppendOutcome::Linked => {}
      AppendOutcome::AlreadyLinked => return Ok(Admission::AlreadyManaged),
      AppendOutcome::SizeOverflow => {
        self.metrics.record_refusal();
        tracing::debug!(
          kind = %P::KIND,
          id = handle.id(),
          size,
          "item would overflow the pool's running size, refused"
        );
        return Ok(Admission::Refused);
      }
    }
    self.metrics.record_add(size);

    let discarded = self.slim()?;
    Ok(Admission::Admitted { discarded })
  }

  /// Unlinks `handle` if this cache holds it.
  pub fn unmanage(&self, handle: &H) -> Result<bool, InvariantError> {
    self.list.unlink(handle)
  }

  // Each pop is its own critical section; `on_discard` runs between them.
  fn slim(&self) -> Result<u64, InvariantError> {
    let mut discarded = 0;
    while let Some(victim) = self.list.remove_first_over(self.maximum_size)? {
      self.metrics.record_discard(victim.size);
      tracing::trace!(kind = %P::KIND, id = victim.id, size = victim.size, "discarded");
      if let Some(item) = &victim.item {
        self.policy.on_discard(item);
      }
      discarded += 1;
    }
    Ok(discarded)
  }

  pub fn current_count(&self) -> u64 {
    self.list.count()
  }

  pub fn current_size(&self) -> u64 {
    self.list.total_size()
  }

  /// Every linked handle is discardable by definition.
  pub fn discardable_size(&self) -> u64 {
    self.list.total_size()
  }

  pub fn maximum_size(&self) -> u64 {
    self.maximum_size
  }

  pub fn total_count(&self) -> u64 {
    self.metrics.added.load(Ordering::Relaxed)
  }

  pub fn total_discard_count(&self) -> u64 {
    self.metrics.discarded.load(Ordering::Relaxed)
  }

  pub fn total_discard_size(&self) -> u64 {
    self.metrics.discarded_size.load(Ordering::Relaxed)
  }

  pub fn total_refusal_count(&self) -> u64 {
    self.metrics.refused.load(Ordering::Relaxed)
  }

  pub fn statistics(&self) -> CacheStatistics {
    let (current_count, current_size) = self.list.aggregates();
    CacheStatistics {
      current_count,
      current_size,
      discardable_size: current_size,
      maximum_size: self.maximum_size,
      total_count: self.metrics.added.load(Ordering::Relaxed),
      total_size: self.metrics.added_size.load(Ordering::Relaxed),
      total_discard_count: self.metrics.discarded.load(Ordering::Relaxed),
      total_discard_size: self.metrics.discarded_size.load(Ordering::Relaxed),
      total_refusal_count: self.metrics.refused.load(Ordering::Relaxed),
    }
  }

  /// Zeroes the monotonic counters. Occupancy is untouched.
  pub fn reset_totals(&self) {
    self.metrics.reset();
  }

  /// Renders this cache and its linked handles, head first.
  pub fn write_xml(&self, out: &mut dyn fmt::Write) -> fmt::Result {
    let stats = self.statistics();
    write!(
      out,
      "  <{} count=\"{}\" size=\"{}\" maximumSize=\"{}\"",
      P::NAME,
      stats.current_count,
      stats.current_size,
      stats.maximum_size
    )?;
    self.policy.write_xml_attributes(out)?;
    write!(
      out,
      " totalCount=\"{}\" discardCount=\"{}\" discardSize=\"{}\" refusalCount=\"{}\"",
      stats.total_count,
      stats.total_discard_count,
      stats.total_discard_size,
      stats.total_refusal_count
    )?;

    let entries = self.list.entries();
    if entries.is_empty() {
      return writeln!(out, "/>");
    }
    writeln!(out, ">")?;
    for entry in entries {
      writeln!(out, "    <Indirection id=\"{}\" size=\"{}\"/>", entry.id, entry.size)?;
    }
    writeln!(out, "  </{}>", P::NAME)
  }
}

impl<H, P> IndirectionManager<H> for IndirectionCache<H, P>
where
  H: Indirection + ?Sized,
  P: DiscardPolicy<H>,
{
  fn kind(&self) -> StorageKind {
    P::KIND
  }

  fn manage(&self, handle: &Arc<H>) -> Result<Admission, InvariantError> {
    IndirectionCache::manage(self, handle)
  }

  fn unmanage(&self, handle: &H) -> Result<bool, InvariantError> {
    IndirectionCache::unmanage(self, handle)
  }

  fn statistics(&self) -> CacheStatistics {
    IndirectionCache::statistics(self)
  }

  fn reset_totals(&self) {
    IndirectionCache::reset_totals(self)
  }

  fn write_xml(&self, out: &mut dyn fmt::Write) -> fmt::Result {
    IndirectionCache::write_xml(self, out)
  }
}

impl<H, P> fmt::Debug for IndirectionCache<H, P>
where
  H: Indirection + ?Sized,
  P: DiscardPolicy<H>,
{
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct(P::NAME)
      .field("list", &self.list)
      .field("maximum_size", &self.maximum_size)
      .finish_non_exhaustive()
  }
}
