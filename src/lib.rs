//! Ordered-view engine for large in-memory data grids: off-thread sort and
//! filter with generation-token race control, pagination, index-based
//! selection, and rate-limited batched edits with bounded undo/redo.
//!
//! # Examples
//!
//! Pure order helpers from [`core::order`]:
//! ```
//! use gridview::{core::order::sort_by_vector, types::CellValue};
//!
//! let values: Vec<CellValue> = [3, 1, 4, 1, 5].into_iter().map(CellValue::from).collect();
//! assert_eq!(sort_by_vector(&values, false), vec![1, 3, 0, 2, 4]);
//! ```
//!
//! Engine usage with the background worker:
//! ```no_run
//! use std::sync::Arc;
//!
//! use gridview::{
//!     config::GridConfig,
//!     engine::grid::GridEngine,
//!     worker::handle::spawn_worker,
//! };
//! use serde_json::{json, Map, Value};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let config = GridConfig::default();
//! let worker = spawn_worker::<Map<String, Value>>(config.worker_queue_bound).expect("spawn worker");
//! let mut grid: GridEngine<Map<String, Value>, _> =
//!     GridEngine::new(worker.clone(), vec!["name".to_string()], config);
//! let rows: Vec<Arc<Map<String, Value>>> = ["Ada", "Grace"]
//!     .iter()
//!     .filter_map(|n| json!({ "name": n }).as_object().cloned())
//!     .map(Arc::new)
//!     .collect();
//! grid.set_data(rows);
//! grid.request_sort("name");
//! grid.request_filter("gr");
//! grid.settle().await;
//! assert_eq!(grid.view_order(), &[1]);
//! worker.shutdown().await.expect("shutdown");
//! # }
//! ```

#![deny(missing_docs)]

/// Engine configuration surface.
pub mod config;
/// Synchronous order, pagination, selection and history building blocks.
pub mod core;
/// Ingest coordination, ordering, events and the engine itself.
pub mod engine;
/// Row accessor trait and sparse patches.
pub mod row;
/// Shared primitive types and enums.
pub mod types;
/// Background compute worker.
pub mod worker;
