use std::sync::Arc;

use hashbrown::HashMap;

use crate::types::{BaseIndex, Dataset};

/// Index-or-object row reference accepted at the engine boundary.
#[derive(Debug)]
pub enum RowInput<R> {
    /// Raw base index.
    Index(BaseIndex),
    /// Row reference, resolved by pointer identity.
    Row(Arc<R>),
}

impl<R> Clone for RowInput<R> {
    fn clone(&self) -> Self {
        match self {
            Self::Index(i) => Self::Index(*i),
            Self::Row(r) => Self::Row(Arc::clone(r)),
        }
    }
}

impl<R> From<BaseIndex> for RowInput<R> {
    fn from(value: BaseIndex) -> Self {
        Self::Index(value)
    }
}

impl<R> From<Arc<R>> for RowInput<R> {
    fn from(value: Arc<R>) -> Self {
        Self::Row(value)
    }
}

/// Reference-identity lookup from row pointer to base index.
///
/// Rebuilt only when the dataset reference itself changes; two datasets with
/// deep-equal rows but different allocations resolve independently.
#[derive(Debug)]
pub struct RowIdentityMap<R> {
    source: Option<Dataset<R>>,
    by_ptr: HashMap<usize, BaseIndex>,
}

impl<R> Default for RowIdentityMap<R> {
    fn default() -> Self {
        Self {
            source: None,
            by_ptr: HashMap::new(),
        }
    }
}

impl<R> RowIdentityMap<R> {
    /// Empty instance.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true when the map was rebuilt.
    pub fn refresh(&mut self, rows: &Dataset<R>) -> bool {
        if self.source.as_ref().is_some_and(|s| Arc::ptr_eq(s, rows)) {
            return false;
        }
        self.by_ptr.clear();
        self.by_ptr.reserve(rows.len());
        for (idx, row) in rows.iter().enumerate() {
            // First occurrence wins when the same Arc appears twice.
            self.by_ptr.entry(ptr_key(row)).or_insert(idx);
        }
        self.source = Some(Arc::clone(rows));
        true
    }

    /// Resolves one input; out-of-range indices and unknown rows yield `None`.
    pub fn resolve(&self, input: &RowInput<R>) -> Option<BaseIndex> {
        let len = self.source.as_ref().map_or(0, |s| s.len());
        match input {
            RowInput::Index(i) if *i < len => Some(*i),
            RowInput::Index(_) => None,
            RowInput::Row(r) => self.by_ptr.get(&ptr_key(r)).copied(),
        }
    }

    /// Resolves every input, silently omitting unresolvable entries.
    pub fn normalize_to_index_set<'a>(
        &self,
        inputs: impl IntoIterator<Item = &'a RowInput<R>>,
    ) -> Vec<BaseIndex>
    where
        R: 'a,
    {
        let mut out: Vec<BaseIndex> = inputs.into_iter().filter_map(|i| self.resolve(i)).collect();
        out.sort_unstable();
        out.dedup();
        out
    }
}

fn ptr_key<R>(row: &Arc<R>) -> usize {
    Arc::as_ptr(row) as *const () as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dataset(values: &[&str]) -> Dataset<String> {
        values.iter().map(|v| Arc::new(v.to_string())).collect()
    }

    #[test]
    fn resolves_indices_and_references() {
        let rows = dataset(&["a", "b", "c"]);
        let mut map = RowIdentityMap::new();
        assert!(map.refresh(&rows));
        assert!(!map.refresh(&rows));

        let inputs = vec![
            RowInput::Row(Arc::clone(&rows[2])),
            RowInput::Index(0),
            RowInput::Index(7),
            RowInput::Row(Arc::new("b".to_string())),
            RowInput::Index(2),
        ];
        assert_eq!(map.normalize_to_index_set(&inputs), vec![0, 2]);
    }

    #[test]
    fn new_dataset_reference_rebuilds() {
        let first = dataset(&["a"]);
        let second = dataset(&["a"]);
        let mut map = RowIdentityMap::new();
        map.refresh(&first);
        let old_ref = RowInput::Row(Arc::clone(&first[0]));
        assert_eq!(map.resolve(&old_ref), Some(0));

        assert!(map.refresh(&second));
        assert_eq!(map.resolve(&old_ref), None);
    }
}
