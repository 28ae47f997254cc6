mod common;

use common::{build_test_manager, items, TestItem};
use fibre_item_cache::{
  ConfigError, ItemStorageManager, StorageConfig, StorageKind, StorageManagerBuilder,
  StorageStrategy,
};
use pretty_assertions::assert_eq;

#[test]
fn test_register_routes_store_never_to_unstored() {
  let manager = build_test_manager(100, 50, 100);

  let unstored = manager.register(StorageStrategy::StoreNever);
  assert_eq!(unstored.kind(), StorageKind::Unstored);
  for strategy in [
    StorageStrategy::StoreMaybe,
    StorageStrategy::StoreEventually,
    StorageStrategy::StoreAlways,
  ] {
    assert_eq!(manager.register(strategy).kind(), StorageKind::Stored);
  }
}

#[test]
fn test_registered_policies_are_independent() {
  let manager = build_test_manager(100, 50, 100);
  let stored = manager.register(StorageStrategy::StoreAlways);
  let unstored = manager.register(StorageStrategy::StoreNever);

  let persistent = items(1..=3, 40);
  let transient = items(11..=12, 30);
  for item in &persistent {
    stored.manage(item).unwrap();
  }
  for item in &transient {
    unstored.manage(item).unwrap();
  }

  assert_eq!(manager.stored().current_count(), 2);
  assert_eq!(manager.stored().total_discard_count(), 1);
  assert_eq!(manager.unstored().current_count(), 2);
  assert_eq!(manager.unstored().total_discard_count(), 0);
  assert!(transient.iter().all(|item| item.releases() == 0));

  // A handle linked through one policy is not visible to the other.
  assert!(!unstored.unmanage(&persistent[2]).unwrap());
  assert!(stored.unmanage(&persistent[2]).unwrap());
}

#[test]
fn test_aggregate_getters_sum_both_policies() {
  let manager = build_test_manager(100, 50, 60);
  let stored = manager.register(StorageStrategy::StoreEventually);
  let unstored = manager.register(StorageStrategy::StoreNever);

  let persistent = items(1..=4, 30);
  let transient = items(11..=14, 25);
  for (p, t) in persistent.iter().zip(&transient) {
    stored.manage(p).unwrap();
    unstored.manage(t).unwrap();
  }
  stored.manage(&TestItem::new(99, 51)).unwrap();
  unstored.unmanage(&transient[3]).unwrap();

  let s = manager.stored().statistics();
  let u = manager.unstored().statistics();
  assert_eq!(manager.current_count(), s.current_count + u.current_count);
  assert_eq!(manager.current_size(), s.current_size + u.current_size);
  assert_eq!(manager.discardable_size(), s.discardable_size + u.discardable_size);
  assert_eq!(manager.maximum_size(), 160);
  assert_eq!(manager.total_count(), 8);
  assert_eq!(manager.total_discard_count(), s.total_discard_count + u.total_discard_count);
  assert_eq!(manager.total_discard_size(), s.total_discard_size + u.total_discard_size);
  assert_eq!(manager.total_refusal_count(), 1);
  assert_eq!(manager.statistics(), s + u);

  manager.reset_totals();
  assert_eq!(manager.total_count(), 0);
  assert_eq!(manager.total_refusal_count(), 0);
}

#[test]
fn test_xml_dump_lists_handles_head_first() {
  let manager = build_test_manager(100, 50, 100);
  let persistent = items(1..=3, 40);
  for item in &persistent {
    manager.stored().manage(item).unwrap();
  }

  let expected = "\
<ItemStorageManager>
  <StoredItemManager count=\"2\" size=\"80\" maximumSize=\"100\" maximumItemSize=\"50\" totalCount=\"3\" discardCount=\"1\" discardSize=\"40\" refusalCount=\"0\">
    <Indirection id=\"2\" size=\"40\"/>
    <Indirection id=\"3\" size=\"40\"/>
  </StoredItemManager>
  <UnstoredItemManager count=\"0\" size=\"0\" maximumSize=\"100\" totalCount=\"0\" discardCount=\"0\" discardSize=\"0\" refusalCount=\"0\"/>
</ItemStorageManager>
";
  assert_eq!(manager.xml_dump(), expected);
}

#[test]
fn test_builder_requires_every_limit() {
  let err = StorageManagerBuilder::new()
    .stored_max_bytes(100)
    .stored_max_item_bytes(10)
    .build::<TestItem>()
    .unwrap_err();
  assert_eq!(err, ConfigError::Missing("unstored_max_bytes"));

  let err = StorageManagerBuilder::new()
    .stored_max_bytes(100)
    .stored_max_item_bytes(10)
    .unstored_max_bytes(0)
    .build::<TestItem>()
    .unwrap_err();
  assert_eq!(
    err,
    ConfigError::NonPositive {
      field: "unstored_max_bytes"
    }
  );
}

#[test]
fn test_default_handle_type_is_a_trait_object() {
  let manager: ItemStorageManager = ItemStorageManager::initialize(&StorageConfig::new(10, 10, 10)).unwrap();
  let policy = manager.register(StorageStrategy::StoreNever);
  let item: std::sync::Arc<dyn fibre_item_cache::Indirection> = TestItem::new(1, 10);
  assert!(policy.manage(&item).unwrap().is_admitted());
  assert_eq!(manager.current_count(), 1);
}

#[cfg(feature = "serde")]
mod yaml {
  use fibre_item_cache::{ConfigError, ItemStorageManager, StorageConfig};
  use pretty_assertions::assert_eq;

  use crate::common::TestItem;

  #[test]
  fn test_yaml_config_initializes_manager() {
    let config = StorageConfig::from_yaml_str(
      "stored_max_bytes: 4096\n\
       stored_max_item_bytes: 512\n\
       unstored_max_bytes: 2048\n\
       thresholds:\n  pool_fraction: 0.9\n",
    )
    .unwrap();
    assert_eq!(config.thresholds.pool_fraction, 0.9);
    assert_eq!(config.thresholds.item_fraction, 0.5);

    let manager = ItemStorageManager::<TestItem>::initialize(&config).unwrap();
    assert_eq!(manager.maximum_size(), 6144);
  }

  #[test]
  fn test_yaml_missing_limit_is_a_parse_error() {
    let err = StorageConfig::from_yaml_str("stored_max_bytes: 4096\nunstored_max_bytes: 2048\n")
      .unwrap_err();
    assert!(matches!(err, ConfigError::Parse(msg) if msg.contains("stored_max_item_bytes")));
  }

  #[test]
  fn test_yaml_zero_limit_is_rejected() {
    let err = StorageConfig::from_yaml_str(
      "stored_max_bytes: 0\nstored_max_item_bytes: 1\nunstored_max_bytes: 1\n",
    )
    .unwrap_err();
    assert_eq!(
      err,
      ConfigError::NonPositive {
        field: "stored_max_bytes"
      }
    );
  }

  #[test]
  fn test_yaml_unknown_field_is_rejected() {
    let err = StorageConfig::from_yaml_str(
      "stored_max_bytes: 1\nstored_max_item_bytes: 1\nunstored_max_bytes: 1\nspill: true\n",
    )
    .unwrap_err();
    assert!(matches!(err, ConfigError::Parse(_)));
  }
}
