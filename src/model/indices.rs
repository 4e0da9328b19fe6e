//! Index-list maintenance shared by partitions and label groups.
//!
//! Partitions hold row indices into `image_name` and label groups hold
//! column indices into `attr_name`. Both are plain `Vec<usize>` lists that
//! must stay valid when the referenced collection shrinks, so every deletion
//! goes through [`remove_and_shift`].

/// Remove `removed` from `list` and decrement every index greater than it.
///
/// Indices below `removed` are untouched. Returns whether `removed` was
/// present in the list.
pub fn remove_and_shift(list: &mut Vec<usize>, removed: usize) -> bool {
    let before = list.len();
    list.retain(|&index| index != removed);
    for index in list.iter_mut() {
        if *index > removed {
            *index -= 1;
        }
    }
    list.len() != before
}

/// Insert `index` keeping the list sorted and free of duplicates.
///
/// Returns `false` if the index was already present.
pub fn insert_sorted(list: &mut Vec<usize>, index: usize) -> bool {
    match list.binary_search(&index) {
        Ok(_) => false,
        Err(pos) => {
            list.insert(pos, index);
            true
        }
    }
}

/// Remove `index` from the list without renumbering.
pub fn remove_value(list: &mut Vec<usize>, index: usize) -> bool {
    let before = list.len();
    list.retain(|&i| i != index);
    list.len() != before
}

/// First index in `list` that is not below `bound`, if any.
pub fn first_out_of_bounds(list: &[usize], bound: usize) -> Option<usize> {
    list.iter().copied().find(|&i| i >= bound)
}
