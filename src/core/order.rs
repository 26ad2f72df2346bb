//! Order-vector algorithms shared by the engine and the worker mirror.

use crate::types::{BaseIndex, CellValue};

/// `[0, 1, .., row_count)`.
pub fn identity(row_count: usize) -> Vec<BaseIndex> {
    (0..row_count).collect()
}

/// Stable permutation of `0..values.len()` ordered by value.
///
/// Ties keep ascending base-index order in both directions.
pub fn sort_by_vector(values: &[CellValue], desc: bool) -> Vec<BaseIndex> {
    let mut order = identity(values.len());
    if desc {
        order.sort_by(|a, b| values[*b].cmp(&values[*a]));
    } else {
        order.sort_by(|a, b| values[*a].cmp(&values[*b]));
    }
    order
}

/// Subsequence of `order` (identity over `row_count` when absent) whose
/// elements satisfy `keep`, in `order`'s relative sequence.
pub fn filter_order(
    order: Option<&[BaseIndex]>,
    row_count: usize,
    mut keep: impl FnMut(BaseIndex) -> bool,
) -> Vec<BaseIndex> {
    match order {
        Some(order) => order.iter().copied().filter(|i| keep(*i)).collect(),
        None => (0..row_count).filter(|i| keep(*i)).collect(),
    }
}

/// Display-order safety rule.
///
/// With a query active the candidate wins, even when empty (no match); a
/// missing candidate falls back to the last known-good order and then to the
/// identity. Without a query an empty candidate is never shown: the fallback
/// or the identity replaces it so the view cannot blank out.
pub fn ensure_order(
    candidate: Option<&[BaseIndex]>,
    fallback: Option<&[BaseIndex]>,
    row_count: usize,
    has_query: bool,
) -> Vec<BaseIndex> {
    let or_fallback = || match fallback {
        Some(f) if !f.is_empty() => f.to_vec(),
        _ => identity(row_count),
    };

    match candidate {
        Some(c) if has_query => c.to_vec(),
        Some(c) if !c.is_empty() => c.to_vec(),
        _ => or_fallback(),
    }
}

/// True when `sub` appears in `full` in the same relative sequence.
pub fn is_ordered_subsequence(sub: &[BaseIndex], full: &[BaseIndex]) -> bool {
    let mut it = full.iter();
    sub.iter().all(|s| it.any(|f| f == s))
}
