//! Partition membership, splits and class weights.

use super::{assert_aligned, fixture, fixture_with};
use crate::config::{SplitRatios, StoreConfig};
use crate::error::StoreError;
use crate::model::Partition;

#[test]
fn test_remove_image_renumbers_partitions() {
    let mut f = fixture();
    f.touch("image1.jpg");
    f.touch("image2.jpg");
    f.store.add_image("image1.jpg").unwrap();
    f.store.add_image("image2.jpg").unwrap();
    assert_eq!(f.store.partition(Partition::Train), [0, 1]);

    f.store.remove_image(0).unwrap();

    assert_eq!(f.store.partition(Partition::Train), [0]);
    assert_eq!(f.store.partition(Partition::Trainval), [0]);
    assert_eq!(f.reopen().partition(Partition::Train), [0]);
}

#[test]
fn test_remove_middle_image_shifts_only_higher_rows() {
    let mut f = fixture();
    for name in ["a.png", "b.png", "c.png", "d.png"] {
        f.touch(name);
        f.store.add_image(name).unwrap();
    }
    f.store.assign_partition(1, Partition::Test).unwrap();
    f.store.assign_partition(3, Partition::Test).unwrap();

    f.store.remove_image(1).unwrap();

    assert_eq!(f.store.partition(Partition::Train), [0, 1, 2]);
    assert_eq!(f.store.partition(Partition::Test), [2]);
    assert_aligned(&f.store);
}

#[test]
fn test_assign_and_unassign_are_idempotent() {
    let mut f = fixture_with(StoreConfig::new().with_default_partitions(Vec::new()));
    f.touch("a.png");
    f.touch("b.png");
    f.store.add_image("a.png").unwrap();
    f.store.add_image("b.png").unwrap();
    assert!(f.store.partition(Partition::Val).is_empty());

    assert!(f.store.assign_partition(1, Partition::Val).unwrap());
    assert!(f.store.assign_partition(0, Partition::Val).unwrap());
    assert!(!f.store.assign_partition(0, Partition::Val).unwrap());
    assert_eq!(f.store.partition(Partition::Val), [0, 1]);

    assert!(f.store.unassign_partition(1, Partition::Val).unwrap());
    assert!(!f.store.unassign_partition(1, Partition::Val).unwrap());
    assert_eq!(f.store.partition(Partition::Val), [0]);
    assert_eq!(f.reopen().partition(Partition::Val), [0]);
}

#[test]
fn test_assign_out_of_range() {
    let mut f = fixture();
    assert!(matches!(
        f.store.assign_partition(0, Partition::Test),
        Err(StoreError::IndexOutOfRange { kind: "image", .. })
    ));
    assert!(f.store.unassign_partition(0, Partition::Test).is_err());
}

#[test]
fn test_apply_split_uses_configured_ratios() {
    let mut config = StoreConfig::new();
    config.split = SplitRatios {
        train: 0.5,
        val: 0.25,
    };
    let mut f = fixture_with(config);
    for i in 0..4 {
        let name = format!("{}.png", i);
        f.touch(&name);
        f.store.add_image(&name).unwrap();
    }

    f.store.apply_split().unwrap();

    assert_eq!(f.store.partition(Partition::Train), [0, 1]);
    assert_eq!(f.store.partition(Partition::Val), [2]);
    assert_eq!(f.store.partition(Partition::Test), [3]);
    assert_eq!(f.store.partition(Partition::Trainval), [0, 1, 2]);
    assert_aligned(&f.store);
}

#[test]
fn test_apply_split_on_empty_dataset() {
    let mut f = fixture();
    f.store.apply_split().unwrap();
    for &p in Partition::all() {
        assert!(f.store.partition(p).is_empty());
    }
}

#[test]
fn test_update_class_weights() {
    let mut f = fixture();
    f.store.add_label("A").unwrap();
    f.store.add_label("B").unwrap();
    let rows = [
        ("a.png", [1u8, 0]),
        ("b.png", [1, 1]),
        ("c.png", [0, 0]),
        ("d.png", [1, 0]),
    ];
    for (name, labels) in rows {
        f.touch(name);
        f.store.add_image_with_labels(name, Some(&labels)).unwrap();
    }
    f.store.unassign_partition(3, Partition::Train).unwrap();

    f.store.update_class_weights().unwrap();

    let ann = f.store.annotation();
    assert_eq!(ann.weight_train.len(), 2);
    assert!((ann.weight_train[0] - 2.0 / 3.0).abs() < 1e-9);
    assert!((ann.weight_train[1] - 1.0 / 3.0).abs() < 1e-9);
    assert!((ann.weight_trainval[0] - 0.75).abs() < 1e-9);
    assert!((ann.weight_trainval[1] - 0.25).abs() < 1e-9);
    assert_eq!(f.reopen().annotation().weight_train, ann.weight_train);
}

#[test]
fn test_weights_follow_column_edits() {
    let mut f = fixture();
    f.touch("a.png");
    f.store.add_label("A").unwrap();
    f.store.add_image_with_labels("a.png", Some(&[1])).unwrap();
    f.store.update_class_weights().unwrap();

    f.store.add_label_with_default("B", 1).unwrap();
    assert_eq!(f.store.annotation().weight_train, vec![1.0, 1.0]);

    f.store.remove_label(0).unwrap();
    assert_eq!(f.store.annotation().weight_trainval, vec![1.0]);
    assert_aligned(&f.store);
}

#[test]
fn test_weights_empty_partition_is_zero() {
    let mut f = fixture_with(StoreConfig::new().with_default_partitions(Vec::new()));
    f.touch("a.png");
    f.store.add_label("A").unwrap();
    f.store.add_image_with_labels("a.png", Some(&[1])).unwrap();

    f.store.update_class_weights().unwrap();

    assert_eq!(f.store.annotation().weight_train, vec![0.0]);
}
