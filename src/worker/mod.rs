//! Background compute worker: contract, mirror state and actor handle.

/// Dedicated-thread actor and its handle.
pub mod handle;
/// Worker-side mirror with the text index and sort/filter kernels.
pub mod mirror;
/// Worker contract and error type.
pub mod traits;
