//! Engine configuration surface.

use std::{path::Path, time::Duration};

use serde::{Deserialize, Serialize};

/// Failure to load a [`GridConfig`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Reading the config file failed.
    #[error("config io error: {0}")]
    Io(#[from] std::io::Error),
    /// The config JSON was malformed.
    #[error("config parse error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Recognized engine options.
///
/// Pixel heights and overscan counts are hints for the rendering
/// collaborator; the engine only passes them through.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    /// Rendered height of one body row, in pixels.
    pub row_height: f32,
    /// Header row height, in pixels.
    pub header_height: f32,
    /// Viewport height cap, in pixels.
    pub max_height: f32,
    /// Extra rows rendered past each viewport edge.
    pub overscan_rows: usize,
    /// Extra columns rendered past each viewport edge.
    pub overscan_columns: usize,
    /// Slice the view into pages.
    pub enable_pagination: bool,
    /// Initial rows per page.
    pub page_size: usize,
    /// Initial zero-based page.
    pub page_index: usize,
    /// When true the owner supplies pagination state and the engine only
    /// requests changes through events.
    pub controlled_pagination: bool,
    /// Accept selection toggles.
    pub enable_selection: bool,
    /// Allow more than one selected row.
    pub multi_select: bool,
    /// Undo snapshots kept; oldest evicted first.
    pub undo_limit: usize,
    /// Redo snapshots kept.
    pub redo_limit: usize,
    /// Edit flush rate limit.
    pub max_flushes_per_second: u32,
    /// Capacity of the worker request mailbox.
    pub worker_queue_bound: usize,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            row_height: 36.0,
            header_height: 40.0,
            max_height: 600.0,
            overscan_rows: 8,
            overscan_columns: 2,
            enable_pagination: false,
            page_size: 50,
            page_index: 0,
            controlled_pagination: false,
            enable_selection: true,
            multi_select: true,
            undo_limit: 5,
            redo_limit: 5,
            max_flushes_per_second: 20,
            worker_queue_bound: 256,
        }
    }
}

impl GridConfig {
    /// Parses a JSON document; absent keys keep their defaults.
    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(s)?)
    }

    /// Reads and parses a JSON config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Minimum spacing between two edit flushes.
    pub fn flush_interval(&self) -> Duration {
        Duration::from_millis(1000 / u64::from(self.max_flushes_per_second.max(1)))
    }
}
