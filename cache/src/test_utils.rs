use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::indirection::{CacheLink, Indirection};

/// A minimal item that counts how often its payload was released.
pub(crate) struct TestItem {
  id: u64,
  size: u64,
  releases: AtomicUsize,
  link: CacheLink,
}

impl TestItem {
  pub(crate) fn new(id: u64, size: u64) -> Arc<Self> {
    Arc::new(Self {
      id,
      size,
      releases: AtomicUsize::new(0),
      link: CacheLink::new(),
    })
  }

  pub(crate) fn releases(&self) -> usize {
    self.releases.load(Ordering::SeqCst)
  }

  pub(crate) fn is_linked(&self) -> bool {
    self.link.is_linked()
  }
}

impl Indirection for TestItem {
  fn id(&self) -> u64 {
    self.id
  }

  fn in_memory_size(&self) -> u64 {
    self.size
  }

  fn release_if_discardable(&self) {
    self.releases.fetch_add(1, Ordering::SeqCst);
  }

  fn cache_link(&self) -> &CacheLink {
    &self.link
  }
}
