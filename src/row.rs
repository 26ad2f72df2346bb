//! Row accessor trait and sparse row patches.

use std::{collections::BTreeMap, fmt::Debug};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

use crate::types::{CellValue, ColumnId};

/// Opaque row record addressed through column accessors.
///
/// The engine never inspects a row except through [`GridRow::cell`]; edits go
/// through [`GridRow::set_cell`] on a private clone, so published rows are
/// never mutated in place.
pub trait GridRow: Clone + Debug + Send + Sync + 'static {
    /// Extracts the value of `column` from this row.
    fn cell(&self, column: &str) -> CellValue;
    /// Overwrites the value of `column`.
    fn set_cell(&mut self, column: &str, value: CellValue);
}

impl GridRow for Map<String, Value> {
    fn cell(&self, column: &str) -> CellValue {
        match self.get(column) {
            None | Some(Value::Null) => CellValue::Null,
            Some(Value::Bool(v)) => CellValue::Bool(*v),
            Some(Value::Number(n)) => n.as_f64().map(CellValue::Number).unwrap_or_default(),
            Some(Value::String(s)) => CellValue::Text(s.clone()),
            Some(other) => CellValue::Text(other.to_string()),
        }
    }

    fn set_cell(&mut self, column: &str, value: CellValue) {
        let json = match value {
            CellValue::Null => Value::Null,
            CellValue::Bool(v) => Value::Bool(v),
            CellValue::Number(v) => Number::from_f64(v).map(Value::Number).unwrap_or(Value::Null),
            CellValue::Text(s) => Value::String(s),
        };
        self.insert(column.to_string(), json);
    }
}

/// Sparse patch where each present column overwrites the row value.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RowPatch {
    cells: BTreeMap<ColumnId, CellValue>,
}

impl RowPatch {
    /// Creates an empty patch.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style setter.
    pub fn set(mut self, column: impl Into<ColumnId>, value: impl Into<CellValue>) -> Self {
        self.cells.insert(column.into(), value.into());
        self
    }

    /// Returns true when no columns are set.
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Iterates `(column, value)` pairs in column order.
    pub fn iter(&self) -> impl Iterator<Item = (&ColumnId, &CellValue)> {
        self.cells.iter()
    }

    /// Folds `later` into `self`; columns present in both take `later`'s value.
    pub fn merge(&mut self, later: RowPatch) {
        self.cells.extend(later.cells);
    }

    /// Applies this patch in place to `row`.
    pub fn apply_to<R: GridRow>(&self, row: &mut R) {
        for (column, value) in &self.cells {
            row.set_cell(column, value.clone());
        }
    }
}

impl<C: Into<ColumnId>, V: Into<CellValue>> FromIterator<(C, V)> for RowPatch {
    fn from_iter<I: IntoIterator<Item = (C, V)>>(iter: I) -> Self {
        Self {
            cells: iter.into_iter().map(|(c, v)| (c.into(), v.into())).collect(),
        }
    }
}
