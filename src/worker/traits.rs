use std::future::Future;

use crate::types::{BaseIndex, CellValue, ColumnId, Dataset};

/// Failure reported by a [`ComputeWorker`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WorkerError {
    /// The worker stopped or crashed; its mailbox is gone.
    #[error("worker channel closed")]
    ChannelClosed,
    /// The worker thread could not be started.
    #[error("failed to spawn worker thread: {0}")]
    Spawn(String),
    /// An incremental update named a row the mirror does not hold.
    #[error("row {index} outside mirrored dataset of {len} rows")]
    RowOutOfRange {
        /// Requested row.
        index: BaseIndex,
        /// Rows in the mirror.
        len: usize,
    },
    /// A supplied order does not fit the mirrored dataset.
    #[error("order references row {index} but the mirror holds {len} rows")]
    LengthMismatch {
        /// First offending index.
        index: BaseIndex,
        /// Rows in the mirror.
        len: usize,
    },
}

/// Result of a worker call.
pub type WorkerResult<T> = Result<T, WorkerError>;

/// Background compute contract: a mirrored, text-indexed copy of the dataset
/// reachable only through asynchronous requests.
pub trait ComputeWorker<R>: Clone + Send + Sync + 'static {
    /// Replaces the mirror and rebuilds the text index over `columns`.
    fn ingest_rows(
        &self,
        rows: Dataset<R>,
        columns: Vec<ColumnId>,
    ) -> impl Future<Output = WorkerResult<()>> + Send;

    /// Refreshes the text index for one row without a full rebuild.
    fn update_row_text(
        &self,
        index: BaseIndex,
        row: std::sync::Arc<R>,
    ) -> impl Future<Output = WorkerResult<()>> + Send;

    /// Stable permutation of `0..values.len()`.
    fn sort_by_vector(
        &self,
        values: Vec<CellValue>,
        desc: bool,
    ) -> impl Future<Output = WorkerResult<Vec<BaseIndex>>> + Send;

    /// Subsequence of `order` (identity when absent) matching `query`. An
    /// empty result means no match.
    fn global_filter(
        &self,
        query: String,
        order: Option<Vec<BaseIndex>>,
    ) -> impl Future<Output = WorkerResult<Vec<BaseIndex>>> + Send;

    /// Discards all mirrored state.
    fn reset(&self) -> impl Future<Output = WorkerResult<()>> + Send;
}
