#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use fibre_item_cache::{CacheLink, Indirection, StorageConfig, ItemStorageManager};
use parking_lot::Mutex;

type ReleaseHook = Box<dyn Fn(&TestItem) + Send + Sync>;

// An item whose payload is just a size. Counts releases and can run a custom
// hook from inside `release_if_discardable` to exercise re-entrancy.
pub struct TestItem {
  id: u64,
  size: u64,
  link: CacheLink,
  releases: AtomicUsize,
  hook: Mutex<Option<ReleaseHook>>,
}

impl TestItem {
  pub fn new(id: u64, size: u64) -> Arc<Self> {
    Arc::new(Self {
      id,
      size,
      link: CacheLink::new(),
      releases: AtomicUsize::new(0),
      hook: Mutex::new(None),
    })
  }

  pub fn on_release(&self, hook: impl Fn(&TestItem) + Send + Sync + 'static) {
    *self.hook.lock() = Some(Box::new(hook));
  }

  pub fn releases(&self) -> usize {
    self.releases.load(Ordering::SeqCst)
  }

  pub fn is_linked(&self) -> bool {
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
    if let Some(hook) = self.hook.lock().as_ref() {
      hook(self);
    }
  }

  fn cache_link(&self) -> &CacheLink {
    &self.link
  }
}

// Helper to build a manager for testing purposes.
pub fn build_test_manager(stored: u64, stored_item: u64, unstored: u64) -> ItemStorageManager<TestItem> {
  ItemStorageManager::initialize(&StorageConfig::new(stored, stored_item, unstored)).unwrap()
}

pub fn items(ids: std::ops::RangeInclusive<u64>, size: u64) -> Vec<Arc<TestItem>> {
  ids.map(|id| TestItem::new(id, size)).collect()
}
