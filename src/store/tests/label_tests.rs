//! Attribute (column) operations.

use ndarray::array;

use super::{assert_aligned, fixture};
use crate::error::StoreError;
use crate::model::LabelGroup;

#[test]
fn test_add_label_returns_column_index() {
    let mut f = fixture();
    assert_eq!(f.store.add_label("Hat").unwrap(), 0);
    assert_eq!(f.store.add_label("LongHair").unwrap(), 1);
    assert_eq!(f.store.dataset_labels(), ["Hat", "LongHair"]);
    assert_eq!(f.store.all_labels().dim(), (0, 2));
}

#[test]
fn test_add_label_fills_existing_rows_with_default() {
    let mut f = fixture();
    f.touch("a.png");
    f.touch("b.png");
    f.store.add_label("Hat").unwrap();
    f.store.add_image("a.png").unwrap();
    f.store.add_image("b.png").unwrap();

    f.store.add_label_with_default("Backpack", 1).unwrap();

    assert_eq!(f.store.all_labels(), array![[0u8, 1], [0, 1]]);
    assert_aligned(&f.store);
}

#[test]
fn test_duplicate_label_rejected_without_change() {
    let mut f = fixture();
    f.touch("a.png");
    f.store.add_label("unique_label").unwrap();
    f.store.add_image("a.png").unwrap();
    let before = f.store.annotation().clone();

    let result = f.store.add_label("unique_label");

    assert!(matches!(result, Err(StoreError::DuplicateLabel { ref name }) if name == "unique_label"));
    assert_eq!(f.store.annotation(), &before);
    assert_eq!(f.reopen().annotation(), &before);
}

#[test]
fn test_non_binary_default_rejected() {
    let mut f = fixture();
    assert!(matches!(
        f.store.add_label_with_default("Hat", 2),
        Err(StoreError::Validation { .. })
    ));
    assert!(f.store.dataset_labels().is_empty());
}

#[test]
fn test_blank_label_rejected() {
    let mut f = fixture();
    assert!(f.store.add_label("  ").is_err());
}

#[test]
fn test_edit_label_renames_only() {
    let mut f = fixture();
    f.touch("a.png");
    f.store.add_label("gender").unwrap();
    f.store.add_image_with_labels("a.png", Some(&[1])).unwrap();

    f.store.edit_label(0, "new_gender").unwrap();

    assert_eq!(f.store.dataset_labels(), ["new_gender"]);
    assert_eq!(f.store.all_labels(), array![[1u8]]);
}

#[test]
fn test_edit_label_to_same_name_is_allowed() {
    let mut f = fixture();
    f.store.add_label("Hat").unwrap();
    assert!(f.store.edit_label(0, "Hat").is_ok());
}

#[test]
fn test_edit_label_rejects_collision_and_bad_index() {
    let mut f = fixture();
    f.store.add_label("A").unwrap();
    f.store.add_label("B").unwrap();

    assert!(matches!(
        f.store.edit_label(1, "A"),
        Err(StoreError::DuplicateLabel { .. })
    ));
    assert!(matches!(
        f.store.edit_label(5, "C"),
        Err(StoreError::IndexOutOfRange { kind: "label", index: 5, len: 2 })
    ));
    assert_eq!(f.store.dataset_labels(), ["A", "B"]);
}

#[test]
fn test_remove_label_drops_column() {
    let mut f = fixture();
    f.touch("a.png");
    f.store.add_label("A").unwrap();
    f.store.add_label("B").unwrap();
    f.store.add_label("C").unwrap();
    f.store.add_image_with_labels("a.png", Some(&[1, 0, 1])).unwrap();

    f.store.remove_label(1).unwrap();

    assert_eq!(f.store.dataset_labels(), ["A", "C"]);
    assert_eq!(f.store.all_labels(), array![[1u8, 1]]);
    assert_aligned(&f.store);
}

#[test]
fn test_remove_label_out_of_bounds() {
    let mut f = fixture();
    assert!(matches!(
        f.store.remove_label(0),
        Err(StoreError::IndexOutOfRange { .. })
    ));
}

#[test]
fn test_remove_label_renumbers_label_groups() {
    let mut f = fixture();
    for name in ["A", "B", "C", "D"] {
        f.store.add_label(name).unwrap();
    }
    f.store
        .set_label_group(LabelGroup::Eval, vec![0, 1, 2, 3])
        .unwrap();
    f.store.set_label_group(LabelGroup::Color, vec![3]).unwrap();

    f.store.remove_label(1).unwrap();

    let groups = &f.store.annotation().label_idx;
    assert_eq!(groups.eval, vec![0, 1, 2]);
    assert_eq!(groups.color, vec![2]);
}

#[test]
fn test_set_label_group_bounds_checked() {
    let mut f = fixture();
    f.store.add_label("A").unwrap();
    assert!(f.store.set_label_group(LabelGroup::Extra, vec![0, 1]).is_err());
    assert!(f.store.annotation().label_idx.extra.is_empty());
}

#[test]
fn test_label_counts() {
    let mut f = fixture();
    f.touch("a.png");
    f.touch("b.png");
    f.store.add_label("A").unwrap();
    f.store.add_label("B").unwrap();
    f.store.add_image_with_labels("a.png", Some(&[1, 0])).unwrap();
    f.store.add_image_with_labels("b.png", Some(&[1, 1])).unwrap();

    assert_eq!(f.store.label_counts(), vec![2, 1]);
}
