use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

use crate::types::Token;

/// Monotonic counter for one request category.
///
/// A request captures [`Generation::advance`]'s value; its response is
/// applied only while [`Generation::is_current`] still holds.
#[derive(Debug, Default)]
pub struct Generation(AtomicU64);

impl Generation {
    /// Starts a new request, superseding every earlier token.
    pub fn advance(&self) -> Token {
        self.0.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Latest issued token.
    pub fn current(&self) -> Token {
        self.0.load(Ordering::SeqCst)
    }

    /// Whether `token` has not been superseded.
    pub fn is_current(&self, token: Token) -> bool {
        self.current() == token
    }
}

/// Independent generations for ingest, sort and filter requests.
///
/// The ingest generation is shared with scheduled ingest tasks so a pending
/// schedule can notice it was superseded before contacting the worker.
#[derive(Debug, Default)]
pub struct GenerationTokens {
    /// Full dataset syncs and incremental row updates.
    pub ingest: Arc<Generation>,
    /// Sort requests.
    pub sort: Generation,
    /// Filter requests.
    pub filter: Generation,
}
