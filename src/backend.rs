//! Instrumentation backend seam
//!
//! The in-kernel collector hooks scheduler-switch, wakeup and exit events
//! while the traced command runs. Once the command has terminated its state
//! is read exactly once as a [`Snapshot`].

use crate::snapshot::Snapshot;
use anyhow::{Context, Result};
use std::path::PathBuf;

pub trait Backend {
    /// Read the collector's state after the traced command exited
    fn snapshot(&self) -> Result<Snapshot>;
}

/// Collector that dumps its maps to a JSON file
#[derive(Debug, Clone)]
pub struct SnapshotFile {
    path: PathBuf,
}

impl SnapshotFile {
    pub const DEFAULT_PATH: &'static str = "schedtime-snapshot.json";

    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl Backend for SnapshotFile {
    fn snapshot(&self) -> Result<Snapshot> {
        let snapshot = Snapshot::from_path(&self.path)
            .with_context(|| format!("Failed to read backend snapshot: {}", self.path.display()))?;
        tracing::debug!(
            edges = snapshot.edges.len(),
            samples = snapshot.samples.len(),
            lifetimes = snapshot.lifetimes.len(),
            "read backend snapshot"
        );
        Ok(snapshot)
    }
}

/// A snapshot already in memory
impl Backend for Snapshot {
    fn snapshot(&self) -> Result<Snapshot> {
        Ok(self.clone())
    }
}
