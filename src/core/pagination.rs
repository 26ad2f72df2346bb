//! Page window over the current view order.

use serde::{Deserialize, Serialize};

/// `{page_index, page_size}` pair. `page_size` is at least one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PaginationState {
    /// Zero-based page.
    pub page_index: usize,
    /// Rows per page.
    pub page_size: usize,
}

impl PaginationState {
    /// Builds a state, raising a zero page size to one.
    pub fn new(page_index: usize, page_size: usize) -> Self {
        Self {
            page_index,
            page_size: page_size.max(1),
        }
    }
}

/// Derived slice of the view order for one page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    /// Length of the order the window is cut from.
    pub total_count: usize,
    /// `max(1, ceil(total_count / page_size))`.
    pub page_count: usize,
    /// Clamped page index, always `< page_count`.
    pub page_index: usize,
    /// Inclusive start offset into the order vector.
    pub start: usize,
    /// Exclusive end offset into the order vector.
    pub end: usize,
}

impl PageWindow {
    /// Computes the window. With pagination disabled the single page spans
    /// the whole order.
    pub fn compute(state: PaginationState, total_count: usize, enabled: bool) -> Self {
        if !enabled {
            return Self {
                total_count,
                page_count: 1,
                page_index: 0,
                start: 0,
                end: total_count,
            };
        }
        let size = state.page_size.max(1);
        let page_count = page_count(total_count, size);
        let page_index = state.page_index.min(page_count - 1);
        let start = (page_index * size).min(total_count);
        let end = (start + size).min(total_count);
        Self {
            total_count,
            page_count,
            page_index,
            start,
            end,
        }
    }

    /// Number of rows on this page.
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    /// True when the page holds no rows.
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// `max(1, ceil(total_count / page_size))`.
pub fn page_count(total_count: usize, page_size: usize) -> usize {
    total_count.div_ceil(page_size.max(1)).max(1)
}

/// Who owns the pagination state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaginationMode {
    /// The owner holds the state; the engine only requests changes.
    Controlled,
    /// The engine holds the state.
    Uncontrolled,
}

/// A requested or applied state transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaginationChange {
    /// State before the change.
    pub previous: PaginationState,
    /// State after the change.
    pub next: PaginationState,
}

impl PaginationChange {
    /// True when the page index moved.
    pub fn index_changed(&self) -> bool {
        self.previous.page_index != self.next.page_index
    }

    /// True when the page size changed.
    pub fn size_changed(&self) -> bool {
        self.previous.page_size != self.next.page_size
    }
}

/// Pagination state holder, controlled or uncontrolled.
///
/// Every setter returns the transition it produced (or requested, in
/// controlled mode) so the caller can notify observers; `None` means nothing
/// changed and nothing should be emitted.
#[derive(Debug, Clone)]
pub struct PaginationWindow {
    mode: PaginationMode,
    state: PaginationState,
}

impl PaginationWindow {
    /// Starts at `initial`.
    pub fn new(mode: PaginationMode, initial: PaginationState) -> Self {
        Self {
            mode,
            state: initial,
        }
    }

    /// Who owns the state.
    pub fn mode(&self) -> PaginationMode {
        self.mode
    }

    /// Current state; in controlled mode, the last state the owner supplied.
    pub fn state(&self) -> PaginationState {
        self.state
    }

    /// Supplies the owner's current state in controlled mode.
    pub fn sync_controlled(&mut self, state: PaginationState) {
        self.state = PaginationState::new(state.page_index, state.page_size);
    }

    /// Moves to `page_index`, keeping the page size.
    pub fn set_page_index(&mut self, page_index: usize) -> Option<PaginationChange> {
        self.transition(PaginationState::new(page_index, self.state.page_size))
    }

    /// Changing the page size always resets the index to zero.
    pub fn set_page_size(&mut self, page_size: usize) -> Option<PaginationChange> {
        self.transition(PaginationState::new(0, page_size))
    }

    /// Pulls the index back into range for `total_count`; a no-op when the
    /// index is already valid.
    pub fn clamp(&mut self, total_count: usize) -> Option<PaginationChange> {
        let last = page_count(total_count, self.state.page_size) - 1;
        if self.state.page_index <= last {
            return None;
        }
        self.transition(PaginationState::new(last, self.state.page_size))
    }

    /// Slice of a view of `total_count` rows covered by the current page.
    pub fn window(&self, total_count: usize, enabled: bool) -> PageWindow {
        PageWindow::compute(self.state, total_count, enabled)
    }

    fn transition(&mut self, next: PaginationState) -> Option<PaginationChange> {
        if next == self.state {
            return None;
        }
        let change = PaginationChange {
            previous: self.state,
            next,
        };
        if self.mode == PaginationMode::Uncontrolled {
            self.state = next;
        }
        Some(change)
    }
}
