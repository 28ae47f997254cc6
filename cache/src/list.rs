use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use generational_arena::{Arena, Index};
use parking_lot::Mutex;

use crate::error::InvariantError;
use crate::indirection::{Indirection, LinkSlot};

static NEXT_LIST_ID: AtomicU64 = AtomicU64::new(1);

struct Node<H: ?Sized> {
  id: u64,
  // Size recorded at append time; the value subtracted on removal.
  size: u64,
  item: Weak<H>,
  next: Option<Index>,
  prev: Option<Index>,
}

/// A read-only view of one linked handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListEntry {
  pub id: u64,
  pub size: u64,
}

/// A handle detached from the head of the list.
///
/// `item` is `None` if the owning item was dropped while still linked.
pub struct Discarded<H: ?Sized> {
  pub id: u64,
  pub size: u64,
  pub item: Option<Arc<H>>,
}

impl<H: ?Sized> fmt::Debug for Discarded<H> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Discarded")
      .field("id", &self.id)
      .field("size", &self.size)
      .field("alive", &self.item.is_some())
      .finish()
  }
}

/// What `IndirectionList::try_append` did with a handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum AppendOutcome {
  Linked,
  AlreadyLinked,
  /// Linking would push `total_size` past `u64::MAX`. Nothing changed.
  SizeOverflow,
}

struct ListState<H: ?Sized> {
  nodes: Arena<Node<H>>,
  // Head is the oldest handle, the next discard victim.
  head: Option<Index>,
  tail: Option<Index>,
  count: u64,
  total_size: u64,
}

impl<H: ?Sized> ListState<H> {
  fn new() -> Self {
    Self {
      nodes: Arena::new(),
      head: None,
      tail: None,
      count: 0,
      total_size: 0,
    }
  }

  // Splices `index` out of the chain. Every neighbour pointer is validated
  // before anything is mutated, so a corrupt list is reported, not patched.
  fn detach(&mut self, list: u64, index: Index) -> Result<Node<H>, InvariantError> {
    let (prev, next, size) = match self.nodes.get(index) {
      Some(node) => (node.prev, node.next, node.size),
      None => return Err(InvariantError::new(list, "linked handle has no arena node")),
    };

    match prev {
      Some(prev_idx) => {
        if self.nodes.get(prev_idx).map(|node| node.next) != Some(Some(index)) {
          return Err(InvariantError::new(list, "predecessor does not point forward to the node"));
        }
      }
      None => {
        if self.head != Some(index) {
          return Err(InvariantError::new(list, "node without predecessor is not the head"));
        }
      }
    }

    match next {
      Some(next_idx) => {
        if self.nodes.get(next_idx).map(|node| node.prev) != Some(Some(index)) {
          return Err(InvariantError::new(list, "successor does not point back to the node"));
        }
      }
      None => {
        if self.tail != Some(index) {
          return Err(InvariantError::new(list, "node without successor is not the tail"));
        }
      }
    }

    if self.count == 0 || self.total_size < size {
      return Err(InvariantError::new(list, "aggregates smaller than the linked node"));
    }

    match prev {
      Some(prev_idx) => {
        if let Some(node) = self.nodes.get_mut(prev_idx) {
          node.next = next;
        }
      }
      None => self.head = next,
    }
    match next {
      Some(next_idx) => {
        if let Some(node) = self.nodes.get_mut(next_idx) {
          node.prev = prev;
        }
      }
      None => self.tail = prev,
    }

    self.count -= 1;
    self.total_size -= size;

    self
      .nodes
      .remove(index)
      .ok_or_else(|| InvariantError::new(list, "linked handle has no arena node"))
  }
}

/// An arena-indexed, doubly linked FIFO of `Indirection` handles.
///
/// Appends go to the tail, discards come from the head. Each public operation
/// is its own critical section; the list never calls back into a handle other
/// than to update its `CacheLink`.
pub struct IndirectionList<H: Indirection + ?Sized> {
  id: u64,
  state: Mutex<ListState<H>>,
}

impl<H: Indirection + ?Sized> IndirectionList<H> {
  pub fn new() -> Self {
    Self {
      id: NEXT_LIST_ID.fetch_add(1, Ordering::Relaxed),
      state: Mutex::new(ListState::new()),
    }
  }

  /// The process-unique id of this list.
  pub fn id(&self) -> u64 {
    self.id
  }

  /// Number of linked handles.
  pub fn count(&self) -> u64 {
    self.state.lock().count
  }

  /// Sum of the sizes recorded for the linked handles.
  pub fn total_size(&self) -> u64 {
    self.state.lock().total_size
  }

  /// `(count, total_size)` read under a single lock acquisition.
  pub fn aggregates(&self) -> (u64, u64) {
    let state = self.state.lock();
    (state.count, state.total_size)
  }

  pub fn is_empty(&self) -> bool {
    self.state.lock().head.is_none()
  }

  /// The oldest linked handle, if any.
  pub fn first(&self) -> Option<ListEntry> {
    let state = self.state.lock();
    state
      .head
      .and_then(|index| state.nodes.get(index))
      .map(|node| ListEntry {
        id: node.id,
        size: node.size,
      })
  }

  /// Returns `true` if `handle` is linked into this list.
  pub fn contains(&self, handle: &H) -> bool {
    let _state = self.state.lock();
    let slot = handle.cache_link().slot().lock();
    matches!(*slot, Some(link) if link.list == self.id)
  }

  /// Snapshot of the linked handles from head to tail.
  pub fn entries(&self) -> Vec<ListEntry> {
    let state = self.state.lock();
    let mut entries = Vec::with_capacity(state.nodes.len());
    let mut current = state.head;
    while let Some(index) = current {
      let Some(node) = state.nodes.get(index) else {
        break;
      };
      entries.push(ListEntry {
        id: node.id,
        size: node.size,
      });
      current = node.next;
    }
    entries
  }

  /// Links `handle` at the tail.
  ///
  /// Returns `Ok(false)` without touching anything if the handle is already
  /// linked into this or any other list, or if its size would overflow the
  /// running total.
  pub fn append(&self, handle: &Arc<H>) -> Result<bool, InvariantError> {
    Ok(self.try_append(handle)? == AppendOutcome::Linked)
  }

  pub(crate) fn try_append(&self, handle: &Arc<H>) -> Result<AppendOutcome, InvariantError> {
    let mut guard = self.state.lock();
    let state = &mut *guard;
    let mut slot = handle.cache_link().slot().lock();
    if slot.is_some() {
      return Ok(AppendOutcome::AlreadyLinked);
    }

    let size = handle.in_memory_size();
    let Some(total_size) = state.total_size.checked_add(size) else {
      return Ok(AppendOutcome::SizeOverflow);
    };

    let old_tail = state.tail;
    match old_tail {
      Some(tail) if !state.nodes.contains(tail) => {
        return Err(InvariantError::new(self.id, "tail has no arena node"));
      }
      None if state.head.is_some() => {
        return Err(InvariantError::new(self.id, "list has a head but no tail"));
      }
      _ => {}
    }

    let index = state.nodes.insert(Node {
      id: handle.id(),
      size,
      item: Arc::downgrade(handle),
      next: None,
      prev: old_tail,
    });

    match old_tail {
      Some(tail) => {
        if let Some(node) = state.nodes.get_mut(tail) {
          node.next = Some(index);
        }
      }
      None => state.head = Some(index),
    }
    state.tail = Some(index);
    state.count += 1;
    state.total_size = total_size;

    *slot = Some(LinkSlot {
      list: self.id,
      index,
    });
    Ok(AppendOutcome::Linked)
  }

  /// Detaches and returns the head of the list.
  ///
  /// On an empty list the aggregates are forced back to zero.
  pub fn remove_first(&self) -> Result<Option<Discarded<H>>, InvariantError> {
    self.pop_head(None)
  }

  /// Like `remove_first`, but only while `total_size() > limit`. The check and
  /// the pop happen under one lock acquisition.
  pub(crate) fn remove_first_over(
    &self,
    limit: u64,
  ) -> Result<Option<Discarded<H>>, InvariantError> {
    self.pop_head(Some(limit))
  }

  fn pop_head(&self, limit: Option<u64>) -> Result<Option<Discarded<H>>, InvariantError> {
    let mut guard = self.state.lock();
    let state = &mut *guard;

    if matches!(limit, Some(limit) if state.total_size <= limit) {
      return Ok(None);
    }

    let Some(head) = state.head else {
      if state.count != 0 || state.total_size != 0 {
        tracing::warn!(
          list = self.id,
          count = state.count,
          total_size = state.total_size,
          "empty indirection list carried stale aggregates, resetting"
        );
      }
      state.count = 0;
      state.total_size = 0;
      return Ok(None);
    };

    let item = state.nodes.get(head).and_then(|node| node.item.upgrade());
    let expected = Some(LinkSlot {
      list: self.id,
      index: head,
    });
    if let Some(item) = &item {
      if *item.cache_link().slot().lock() != expected {
        return Err(InvariantError::new(self.id, "head handle's link names another slot"));
      }
    }

    let node = state.detach(self.id, head)?;
    if let Some(item) = &item {
      *item.cache_link().slot().lock() = None;
    }

    Ok(Some(Discarded {
      id: node.id,
      size: node.size,
      item,
    }))
  }

  /// Removes `handle` from wherever it sits in the list.
  ///
  /// Returns `Ok(false)` if the handle is not linked into this list.
  pub fn unlink(&self, handle: &H) -> Result<bool, InvariantError> {
    let mut guard = self.state.lock();
    let state = &mut *guard;
    let mut slot = handle.cache_link().slot().lock();

    let link = match *slot {
      Some(link) if link.list == self.id => link,
      _ => return Ok(false),
    };

    if state.head.is_none() {
      // Nothing in an empty list can point at the handle, so the cell is stale.
      tracing::warn!(
        list = self.id,
        id = handle.id(),
        "handle claimed membership of an empty indirection list, clearing its link"
      );
      *slot = None;
      return Ok(false);
    }

    let owned_by_handle = state.nodes.get(link.index).is_some_and(|node| {
      node.item.as_ptr() as *const () == handle as *const H as *const ()
    });
    if !owned_by_handle {
      return Err(InvariantError::new(self.id, "link names a node owned by another item"));
    }

    state.detach(self.id, link.index)?;
    *slot = None;
    Ok(true)
  }
}

impl<H: Indirection + ?Sized> Default for IndirectionList<H> {
  fn default() -> Self {
    Self::new()
  }
}

impl<H: Indirection + ?Sized> fmt::Debug for IndirectionList<H> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let (count, total_size) = self.aggregates();
    f.debug_struct("IndirectionList")
      .field("id", &self.id)
      .field("count", &count)
      .field("total_size", &total_size)
      .finish()
  }
}

impl<H: Indirection + ?Sized> Drop for IndirectionList<H> {
  fn drop(&mut self) {
    let id = self.id;
    let state = self.state.get_mut();
    for (index, node) in state.nodes.iter() {
      if let Some(item) = node.item.upgrade() {
        let mut slot = item.cache_link().slot().lock();
        if *slot == Some(LinkSlot { list: id, index }) {
          *slot = None;
        }
      }
    }
  }
}
