use std::{
    collections::{BTreeMap, VecDeque},
    sync::Arc,
    time::Duration,
};

use hashbrown::HashMap;
use tokio::time::Instant;

use crate::{
    row::{GridRow, RowPatch},
    types::{BaseIndex, ColumnId, Dataset},
};

/// Fixed-capacity deque; pushing at capacity evicts the oldest entry.
#[derive(Debug, Clone)]
pub struct BoundedDeque<T> {
    cap: usize,
    buf: VecDeque<T>,
}

impl<T> BoundedDeque<T> {
    /// A zero capacity makes every push a no-op.
    pub fn new(cap: usize) -> Self {
        Self {
            cap,
            buf: VecDeque::with_capacity(cap.min(64)),
        }
    }

    /// Appends `value`, evicting the oldest entry when full.
    pub fn push(&mut self, value: T) {
        if self.cap == 0 {
            return;
        }
        if self.buf.len() == self.cap {
            self.buf.pop_front();
        }
        self.buf.push_back(value);
    }

    /// Removes the newest entry.
    pub fn pop(&mut self) -> Option<T> {
        self.buf.pop_back()
    }

    /// Drops every entry.
    pub fn clear(&mut self) {
        self.buf.clear();
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// True when there are no entries.
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Configured capacity, not the allocation size.
    pub fn capacity(&self) -> usize {
        self.cap
    }
}

/// Result of a committed flush.
#[derive(Debug)]
pub struct Commit<R> {
    /// Dataset with every staged patch applied.
    pub rows: Dataset<R>,
    /// Base indices whose rows were replaced, ascending.
    pub edited: Vec<BaseIndex>,
}

/// What a rate-limited flush did.
#[derive(Debug)]
pub enum FlushOutcome<R> {
    /// Nothing staged.
    Idle,
    /// Too soon after the previous flush; retry after the delay.
    Deferred(Duration),
    /// Staged edits were applied.
    Committed(Commit<R>),
}

/// Staged edit overlay plus bounded undo/redo snapshot stacks.
///
/// Snapshots share row allocations with the dataset they were taken from.
/// Rows are never mutated after publication (a commit clones each edited row
/// before patching it), so a snapshot is as good as a deep copy.
#[derive(Debug)]
pub struct EditHistory<R> {
    overlay: BTreeMap<BaseIndex, RowPatch>,
    undo: BoundedDeque<Dataset<R>>,
    redo: BoundedDeque<Dataset<R>>,
    cell_versions: HashMap<(BaseIndex, ColumnId), u64>,
    min_interval: Duration,
    last_flush: Option<Instant>,
}

impl<R: GridRow> EditHistory<R> {
    /// `min_interval` is the minimum spacing between committed flushes.
    pub fn new(undo_limit: usize, redo_limit: usize, min_interval: Duration) -> Self {
        Self {
            overlay: BTreeMap::new(),
            undo: BoundedDeque::new(undo_limit),
            redo: BoundedDeque::new(redo_limit),
            cell_versions: HashMap::new(),
            min_interval,
            last_flush: None,
        }
    }

    /// Stages `patch` for `idx`, merging with anything already staged.
    pub fn stage(&mut self, idx: BaseIndex, patch: RowPatch) {
        if patch.is_empty() {
            return;
        }
        self.overlay.entry(idx).or_default().merge(patch);
    }

    /// Uncommitted patch for `idx`.
    pub fn staged(&self, idx: BaseIndex) -> Option<&RowPatch> {
        self.overlay.get(&idx)
    }

    /// True while any edit is waiting for a flush.
    pub fn has_staged(&self) -> bool {
        !self.overlay.is_empty()
    }

    /// How long a flush requested at `now` must wait.
    pub fn flush_delay(&self, now: Instant) -> Duration {
        self.last_flush
            .map(|last| self.min_interval.saturating_sub(now.saturating_duration_since(last)))
            .unwrap_or(Duration::ZERO)
    }

    /// Rate-limited flush. Staged edits are kept on deferral.
    pub fn try_commit(&mut self, rows: &Dataset<R>, now: Instant) -> FlushOutcome<R> {
        if self.overlay.is_empty() {
            return FlushOutcome::Idle;
        }
        let delay = self.flush_delay(now);
        if !delay.is_zero() {
            return FlushOutcome::Deferred(delay);
        }
        match self.commit(rows, now) {
            Some(commit) => FlushOutcome::Committed(commit),
            None => FlushOutcome::Idle,
        }
    }

    /// Unconditional flush ignoring the rate limit.
    pub fn commit(&mut self, rows: &Dataset<R>, now: Instant) -> Option<Commit<R>> {
        if self.overlay.is_empty() {
            return None;
        }
        let overlay = std::mem::take(&mut self.overlay);
        self.last_flush = Some(now);

        let mut next: Vec<Arc<R>> = rows.to_vec();
        let mut edited = Vec::with_capacity(overlay.len());
        for (idx, patch) in overlay {
            let Some(old) = next.get(idx) else {
                tracing::warn!(idx, len = rows.len(), "dropping edit for row outside dataset");
                continue;
            };
            let mut row = R::clone(old);
            patch.apply_to(&mut row);
            for (column, _) in patch.iter() {
                if old.cell(column) != row.cell(column) {
                    self.bump(idx, column);
                }
            }
            next[idx] = Arc::new(row);
            edited.push(idx);
        }

        if edited.is_empty() {
            return None;
        }
        self.undo.push(Arc::clone(rows));
        self.redo.clear();
        Some(Commit {
            rows: next.into(),
            edited,
        })
    }

    /// Pops the newest undo snapshot, moving `current` onto the redo stack.
    pub fn undo(&mut self, current: &Dataset<R>, columns: &[ColumnId]) -> Option<Dataset<R>> {
        let restored = self.undo.pop()?;
        self.bump_diff(current, &restored, columns);
        self.redo.push(Arc::clone(current));
        Some(restored)
    }

    /// Pops the newest redo snapshot, moving `current` onto the undo stack.
    pub fn redo(&mut self, current: &Dataset<R>, columns: &[ColumnId]) -> Option<Dataset<R>> {
        let restored = self.redo.pop()?;
        self.bump_diff(current, &restored, columns);
        self.undo.push(Arc::clone(current));
        Some(restored)
    }

    /// Snapshots available to undo.
    pub fn undo_len(&self) -> usize {
        self.undo.len()
    }

    /// Snapshots available to redo.
    pub fn redo_len(&self) -> usize {
        self.redo.len()
    }

    /// Bumped each time the cell value changes; zero if it never has.
    pub fn cell_version(&self, idx: BaseIndex, column: &str) -> u64 {
        self.cell_versions
            .get(&(idx, column.to_string()))
            .copied()
            .unwrap_or(0)
    }

    fn bump(&mut self, idx: BaseIndex, column: &str) {
        *self
            .cell_versions
            .entry((idx, column.to_string()))
            .or_insert(0) += 1;
    }

    fn bump_diff(&mut self, a: &Dataset<R>, b: &Dataset<R>, columns: &[ColumnId]) {
        for idx in 0..a.len().max(b.len()) {
            match (a.get(idx), b.get(idx)) {
                (Some(x), Some(y)) if Arc::ptr_eq(x, y) => {}
                (Some(x), Some(y)) => {
                    for column in columns {
                        if x.cell(column) != y.cell(column) {
                            self.bump(idx, column);
                        }
                    }
                }
                _ => {
                    for column in columns {
                        self.bump(idx, column);
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CellValue;

    #[derive(Debug, Clone, PartialEq)]
    struct Item {
        name: String,
    }

    impl GridRow for Item {
        fn cell(&self, column: &str) -> CellValue {
            match column {
                "name" => CellValue::from(self.name.as_str()),
                _ => CellValue::Null,
            }
        }

        fn set_cell(&mut self, column: &str, value: CellValue) {
            if column == "name" {
                self.name = value.to_text();
            }
        }
    }

    fn rows(names: &[&str]) -> Dataset<Item> {
        names
            .iter()
            .map(|n| Arc::new(Item { name: n.to_string() }))
            .collect()
    }

    #[test]
    fn bounded_deque_evicts_oldest() {
        let mut d = BoundedDeque::new(2);
        d.push(1);
        d.push(2);
        d.push(3);
        assert_eq!(d.len(), 2);
        assert_eq!(d.pop(), Some(3));
        assert_eq!(d.pop(), Some(2));
        assert_eq!(d.pop(), None);
    }

    #[test]
    fn deferred_flush_keeps_staged_edits() {
        let mut h = EditHistory::new(5, 5, Duration::from_millis(50));
        let now = Instant::now();
        let data = rows(&["a", "b"]);

        h.stage(0, RowPatch::new().set("name", "x"));
        let FlushOutcome::Committed(commit) = h.try_commit(&data, now) else {
            panic!("first flush commits");
        };

        h.stage(1, RowPatch::new().set("name", "y"));
        let later = now + Duration::from_millis(20);
        match h.try_commit(&commit.rows, later) {
            FlushOutcome::Deferred(d) => assert_eq!(d, Duration::from_millis(30)),
            other => panic!("expected deferral, got {other:?}"),
        }
        assert!(h.staged(1).is_some());

        let FlushOutcome::Committed(second) = h.try_commit(&commit.rows, now + Duration::from_millis(50))
        else {
            panic!("flush after interval commits");
        };
        assert_eq!(second.edited, vec![1]);
        assert_eq!(second.rows[1].name, "y");
    }

    #[test]
    fn unchanged_values_do_not_bump_versions() {
        let mut h = EditHistory::new(5, 5, Duration::ZERO);
        let data = rows(&["a"]);
        h.stage(0, RowPatch::new().set("name", "a"));
        let commit = h.commit(&data, Instant::now()).expect("commit");
        assert_eq!(h.cell_version(0, "name"), 0);

        h.stage(0, RowPatch::new().set("name", "b"));
        h.commit(&commit.rows, Instant::now()).expect("commit");
        assert_eq!(h.cell_version(0, "name"), 1);
    }
}
