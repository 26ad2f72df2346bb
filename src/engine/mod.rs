//! Ordered-view engine: ingest coordination, sort/filter ordering, and the
//! glue to pagination, selection and edit history.

/// Engine event stream types.
pub mod events;
/// Engine state and operations.
pub mod grid;
/// Per-category generation tokens.
pub mod tokens;
