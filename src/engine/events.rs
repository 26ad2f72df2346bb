//! Engine event stream payloads.

use std::{collections::BTreeMap, sync::Arc};

use crate::{
    core::pagination::PaginationState,
    types::{BaseIndex, Dataset},
};

/// Events broadcast by [`crate::engine::grid::GridEngine`].
#[derive(Debug, Clone)]
pub enum GridEvent<R> {
    /// A new authoritative dataset was published (edit flush, undo, redo).
    DataChanged {
        /// Published rows.
        rows: Dataset<R>,
    },
    /// The displayed order vector changed.
    OrderChanged {
        /// Length of the displayed order.
        len: usize,
    },
    /// The selection set changed.
    RowSelectionChanged {
        /// Selected base indices, each mapped to `true`.
        selection: BTreeMap<BaseIndex, bool>,
    },
    /// Materialized rows for the new selection.
    SelectedRowsChanged {
        /// Selected rows in base-index order.
        rows: Vec<Arc<R>>,
    },
    /// Pagination state changed, or a change is requested in controlled mode.
    PaginationChanged {
        /// New state.
        state: PaginationState,
    },
    /// The page index changed.
    PageIndexChanged {
        /// New page index.
        page_index: usize,
    },
    /// The page size changed.
    PageSizeChanged {
        /// New page size.
        page_size: usize,
    },
    /// Undo or redo depth changed.
    HistoryChanged {
        /// Entries on the undo stack.
        undo_len: usize,
        /// Entries on the redo stack.
        redo_len: usize,
    },
}
