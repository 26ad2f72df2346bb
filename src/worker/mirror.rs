use crate::{
    core::order,
    row::GridRow,
    types::{BaseIndex, CellValue, ColumnId},
};

use super::traits::{WorkerError, WorkerResult};

/// Worker-owned copy of the dataset reduced to lower-cased cell text.
///
/// Only text survives ingest: the mirror keeps no reference to caller rows.
#[derive(Debug, Default)]
pub struct TextMirror {
    columns: Vec<ColumnId>,
    text: Vec<Vec<String>>,
}

impl TextMirror {
    /// Empty instance.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.text.len()
    }

    /// True when there are no entries.
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Searchable columns.
    pub fn columns(&self) -> &[ColumnId] {
        &self.columns
    }

    /// Replaces the mirrored text wholesale.
    pub fn ingest<R: GridRow>(&mut self, rows: &[std::sync::Arc<R>], columns: Vec<ColumnId>) {
        self.text = rows.iter().map(|r| row_text(r.as_ref(), &columns)).collect();
        self.columns = columns;
    }

    /// Re-derives one row's text from `row`.
    pub fn update_row<R: GridRow>(&mut self, index: BaseIndex, row: &R) -> WorkerResult<()> {
        let len = self.text.len();
        let slot = self
            .text
            .get_mut(index)
            .ok_or(WorkerError::RowOutOfRange { index, len })?;
        *slot = row_text(row, &self.columns);
        Ok(())
    }

    /// Drops all mirrored text and columns.
    pub fn reset(&mut self) {
        self.text.clear();
        self.columns.clear();
    }

    /// Case-insensitive substring match of the trimmed query against any
    /// indexed column. A blank query keeps every row.
    pub fn filter(&self, query: &str, order: Option<&[BaseIndex]>) -> WorkerResult<Vec<BaseIndex>> {
        let len = self.text.len();
        if let Some(bad) = order.and_then(|o| o.iter().find(|i| **i >= len)) {
            return Err(WorkerError::LengthMismatch { index: *bad, len });
        }
        let needle = query.trim().to_lowercase();
        Ok(order::filter_order(order, len, |i| {
            needle.is_empty() || self.text[i].iter().any(|cell| cell.contains(&needle))
        }))
    }

    /// Stable sort of base indices by `values`.
    pub fn sort(values: &[CellValue], desc: bool) -> Vec<BaseIndex> {
        order::sort_by_vector(values, desc)
    }
}

fn row_text<R: GridRow>(row: &R, columns: &[ColumnId]) -> Vec<String> {
    columns
        .iter()
        .map(|c| row.cell(c).to_text().to_lowercase())
        .collect()
}
