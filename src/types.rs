//! Shared primitive IDs, cell values and sort enums.

use std::{cmp::Ordering, fmt, sync::Arc};

use serde::{Deserialize, Serialize};

/// Position of a row in the dataset at the time of the last ingest.
pub type BaseIndex = usize;
/// Column identifier used by accessors, the text mirror and cell versions.
pub type ColumnId = String;
/// Monotonic generation token for one request category.
pub type Token = u64;
/// Authoritative row sequence; replaced wholesale, never mutated in place.
pub type Dataset<R> = Arc<[Arc<R>]>;

/// Scalar value extracted from a row by a column accessor.
///
/// Values are totally ordered: `Null < Bool < Number < Text`. Numbers compare
/// with [`f64::total_cmp`], so `NaN` sorts after every finite number.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    /// Missing or empty value.
    #[default]
    Null,
    /// Boolean value.
    Bool(bool),
    /// Numeric value.
    Number(f64),
    /// Text value.
    Text(String),
}

impl CellValue {
    fn rank(&self) -> u8 {
        match self {
            Self::Null => 0,
            Self::Bool(_) => 1,
            Self::Number(_) => 2,
            Self::Text(_) => 3,
        }
    }

    /// Text used by the filter index. `Null` renders as the empty string.
    pub fn to_text(&self) -> String {
        self.to_string()
    }

    /// Returns true for [`CellValue::Null`].
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

impl PartialEq for CellValue {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for CellValue {}

impl PartialOrd for CellValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for CellValue {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Bool(a), Self::Bool(b)) => a.cmp(b),
            (Self::Number(a), Self::Number(b)) => a.total_cmp(b),
            (Self::Text(a), Self::Text(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => Ok(()),
            Self::Bool(v) => write!(f, "{v}"),
            // Integral values print without a trailing ".0" so "4" matches 4.0.
            Self::Number(v) if v.is_finite() && v.fract() == 0.0 && v.abs() < 1e15 => {
                write!(f, "{}", *v as i64)
            }
            Self::Number(v) => write!(f, "{v}"),
            Self::Text(v) => f.write_str(v),
        }
    }
}

impl From<bool> for CellValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<i64> for CellValue {
    fn from(value: i64) -> Self {
        Self::Number(value as f64)
    }
}

impl From<i32> for CellValue {
    fn from(value: i32) -> Self {
        Self::Number(f64::from(value))
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for CellValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl<T: Into<CellValue>> From<Option<T>> for CellValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or_default()
    }
}

/// Sort direction for one column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SortDirection {
    /// Smallest value first.
    Ascending,
    /// Largest value first.
    Descending,
}

impl SortDirection {
    /// True for [`SortDirection::Descending`].
    pub fn is_desc(self) -> bool {
        matches!(self, Self::Descending)
    }
}

/// Active sort: at most one column is sorted at a time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortState {
    /// Sorted column.
    pub column: ColumnId,
    /// Sort direction.
    pub direction: SortDirection,
}

impl SortState {
    /// Advances the three-state toggle for `column`.
    ///
    /// unsorted -> ascending -> descending -> unsorted. Choosing a different
    /// column than the active one starts that column at ascending.
    pub fn toggle(current: Option<&SortState>, column: &str) -> Option<SortState> {
        match current {
            Some(s) if s.column == column => match s.direction {
                SortDirection::Ascending => Some(SortState {
                    column: s.column.clone(),
                    direction: SortDirection::Descending,
                }),
                SortDirection::Descending => None,
            },
            _ => Some(SortState {
                column: column.to_string(),
                direction: SortDirection::Ascending,
            }),
        }
    }
}
