//! Pure, synchronous building blocks of the ordered view.

/// Bounded undo/redo stacks, edit overlay and cell versions.
pub mod history;
/// Index-or-object row inputs and the reference-identity lookup.
pub mod indices;
/// Order-vector algorithms.
pub mod order;
/// Page window and controlled/uncontrolled pagination state.
pub mod pagination;
/// Selection set, disabled set and select-all state.
pub mod selection;
