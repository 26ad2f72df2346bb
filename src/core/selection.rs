//! Base-index selection set with disabled rows and tri-state select-all.

use std::collections::BTreeSet;

use hashbrown::HashSet;

use crate::types::BaseIndex;

/// Select-all control state for one scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectAllState {
    /// No eligible row in scope is selected.
    Unchecked,
    /// Every eligible row in scope is selected.
    Checked,
    /// Some but not all eligible rows are selected.
    Indeterminate,
    /// The scope has no eligible rows.
    Disabled,
}

/// Selected and disabled base indices with single/multi semantics.
#[derive(Debug, Clone)]
pub struct SelectionModel {
    enabled: bool,
    multi: bool,
    selected: BTreeSet<BaseIndex>,
    disabled: HashSet<BaseIndex>,
    last_signature: Option<String>,
}

impl SelectionModel {
    /// Empty selection.
    pub fn new(enabled: bool, multi: bool) -> Self {
        Self {
            enabled,
            multi,
            selected: BTreeSet::new(),
            disabled: HashSet::new(),
            last_signature: None,
        }
    }

    /// Whether toggles are accepted.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Whether more than one row may be selected.
    pub fn is_multi(&self) -> bool {
        self.multi
    }

    /// Selected base indices, ascending.
    pub fn selected(&self) -> &BTreeSet<BaseIndex> {
        &self.selected
    }

    /// Whether `idx` is selected.
    pub fn is_selected(&self, idx: BaseIndex) -> bool {
        self.selected.contains(&idx)
    }

    /// Whether `idx` is excluded from selection.
    pub fn is_disabled(&self, idx: BaseIndex) -> bool {
        self.disabled.contains(&idx)
    }

    /// Replaces the selection with already-normalized indices.
    ///
    /// Disabled indices are dropped; single-select keeps the lowest index.
    pub fn set_selected(&mut self, indices: impl IntoIterator<Item = BaseIndex>) {
        self.selected = indices
            .into_iter()
            .filter(|i| !self.disabled.contains(i))
            .collect();
        self.enforce_single();
    }

    /// Replaces the disabled set. Already-selected rows stay selected.
    pub fn set_disabled(&mut self, indices: impl IntoIterator<Item = BaseIndex>) {
        self.disabled = indices.into_iter().collect();
    }

    /// Turning multi-select off collapses the set to its lowest member.
    pub fn set_multi(&mut self, multi: bool) {
        self.multi = multi;
        self.enforce_single();
    }

    /// Disabling keeps the current set but rejects toggles.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Returns true when membership changed.
    pub fn toggle_one(&mut self, idx: BaseIndex) -> bool {
        if !self.enabled || self.disabled.contains(&idx) {
            return false;
        }
        if self.multi {
            if !self.selected.remove(&idx) {
                self.selected.insert(idx);
            }
            return true;
        }
        if self.selected.len() == 1 && self.selected.contains(&idx) {
            return false;
        }
        self.selected.clear();
        self.selected.insert(idx);
        true
    }

    /// Header checkbox state over `scope`, ignoring disabled rows.
    pub fn select_all_state(&self, scope: &[BaseIndex]) -> SelectAllState {
        let mut eligible = 0usize;
        let mut chosen = 0usize;
        for idx in scope.iter().filter(|i| !self.disabled.contains(*i)) {
            eligible += 1;
            if self.selected.contains(idx) {
                chosen += 1;
            }
        }
        match (eligible, chosen) {
            (0, _) => SelectAllState::Disabled,
            (_, 0) => SelectAllState::Unchecked,
            (e, c) if e == c => SelectAllState::Checked,
            _ => SelectAllState::Indeterminate,
        }
    }

    /// Select-all toggle over `scope`.
    ///
    /// Checked scopes are cleared; anything else selects every eligible row.
    /// Disabled rows inside the scope are deselected either way. No-op in
    /// single-select mode or when the scope has no eligible rows.
    pub fn toggle_all(&mut self, scope: &[BaseIndex]) -> bool {
        if !self.enabled || !self.multi {
            return false;
        }
        let state = self.select_all_state(scope);
        if state == SelectAllState::Disabled {
            return false;
        }
        for idx in scope {
            if state == SelectAllState::Checked || self.disabled.contains(idx) {
                self.selected.remove(idx);
            } else {
                self.selected.insert(*idx);
            }
        }
        true
    }

    /// Returns the selection when its signature differs from the last one
    /// returned, recording the new signature.
    pub fn take_change(&mut self) -> Option<&BTreeSet<BaseIndex>> {
        let signature = self
            .selected
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(",");
        if self.last_signature.as_deref() == Some(signature.as_str()) {
            return None;
        }
        self.last_signature = Some(signature);
        Some(&self.selected)
    }

    fn enforce_single(&mut self) {
        if self.multi || self.selected.len() <= 1 {
            return;
        }
        if let Some(lowest) = self.selected.first().copied() {
            self.selected.clear();
            self.selected.insert(lowest);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_rows_never_toggle() {
        let mut s = SelectionModel::new(true, true);
        s.set_disabled([2]);
        assert!(!s.toggle_one(2));
        assert!(s.toggle_one(1));
        assert!(s.toggle_one(1));
        assert!(s.selected().is_empty());
    }

    #[test]
    fn single_select_replaces() {
        let mut s = SelectionModel::new(true, false);
        s.toggle_one(3);
        s.toggle_one(1);
        assert_eq!(s.selected().iter().copied().collect::<Vec<_>>(), vec![1]);
    }

    #[test]
    fn collapsing_to_single_keeps_lowest() {
        let mut s = SelectionModel::new(true, true);
        for i in [7, 2, 5] {
            s.toggle_one(i);
        }
        s.set_multi(false);
        assert_eq!(s.selected().iter().copied().collect::<Vec<_>>(), vec![2]);
    }

    #[test]
    fn tri_state_respects_disabled_rows() {
        let mut s = SelectionModel::new(true, true);
        s.set_disabled([0]);
        let scope = [0, 1, 2];
        assert_eq!(s.select_all_state(&scope), SelectAllState::Unchecked);
        s.toggle_one(1);
        assert_eq!(s.select_all_state(&scope), SelectAllState::Indeterminate);
        s.toggle_one(2);
        assert_eq!(s.select_all_state(&scope), SelectAllState::Checked);
        assert_eq!(s.select_all_state(&[0]), SelectAllState::Disabled);
        assert_eq!(s.select_all_state(&[]), SelectAllState::Disabled);
    }

    #[test]
    fn toggle_all_clears_disabled_members() {
        let mut s = SelectionModel::new(true, true);
        s.set_selected([0, 1]);
        s.set_disabled([0]);
        assert!(s.is_selected(0));

        assert!(s.toggle_all(&[0, 1, 2]));
        assert_eq!(s.selected().iter().copied().collect::<Vec<_>>(), vec![1, 2]);
        assert!(s.toggle_all(&[0, 1, 2]));
        assert!(s.selected().is_empty());
    }

    #[test]
    fn change_emitted_once_per_signature() {
        let mut s = SelectionModel::new(true, true);
        s.toggle_one(4);
        assert!(s.take_change().is_some());
        assert!(s.take_change().is_none());
        s.set_selected([4]);
        assert!(s.take_change().is_none());
        s.toggle_one(5);
        assert!(s.take_change().is_some());
    }
}
