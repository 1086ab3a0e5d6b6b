//! Backend snapshot data model
//!
//! After the traced command exits, the instrumentation backend's state is
//! read once as an immutable [`Snapshot`]: task-creation edges, captured
//! kernel stacks, off-CPU samples and task lifetimes. Durations are already
//! scaled to microseconds by the backend.
//!
//! The on-disk form is JSON:
//!
//! ```json
//! {
//!   "root": 1234,
//!   "edges":     [{"parent": 1234, "child": 1240}],
//!   "stacks":    {"7": ["io_schedule", "blk_mq_get_tag", "submit_bio"]},
//!   "samples":   [{"tid": 1240, "pid": 1234, "stack_id": 7, "duration_us": 100}],
//!   "lifetimes": [{"tid": 1240, "duration_us": 1000, "exited": true, "comm": "worker"}]
//! }
//! ```

use crate::symbols::SymbolResolver;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use thiserror::Error;

/// Kernel task identifier
pub type Tid = u32;

/// Errors that can occur while loading a snapshot
#[derive(Error, Debug)]
pub enum SnapshotError {
    #[error("failed to open snapshot {path}: {source}")]
    Open {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed snapshot: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Task creation: `parent` created `child`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Edge {
    pub parent: Tid,
    pub child: Tid,
}

impl Edge {
    pub fn new(parent: Tid, child: Tid) -> Self {
        Self { parent, child }
    }
}

/// One captured stack frame, either already symbolized or a raw address
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Frame {
    Address(u64),
    Symbol(String),
}

/// Off-CPU interval record, pre-aggregated per (tid, pid, stack)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sample {
    pub tid: Tid,
    /// Owning process (thread group) of `tid`
    pub pid: Tid,
    /// Key into [`Snapshot::stacks`]; negative when stack capture failed
    pub stack_id: i64,
    pub duration_us: u64,
}

/// Lifetime of a task as recorded by the backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LifetimeRecord {
    pub tid: Tid,
    pub duration_us: u64,
    /// Only records of exited tasks carry a trustworthy duration
    pub exited: bool,
    #[serde(default)]
    pub comm: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Directly spawned command, when known to the backend
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root: Option<Tid>,
    #[serde(default)]
    pub edges: Vec<Edge>,
    #[serde(default)]
    pub stacks: HashMap<i64, Vec<Frame>>,
    #[serde(default)]
    pub samples: Vec<Sample>,
    #[serde(default)]
    pub lifetimes: Vec<LifetimeRecord>,
}

impl Snapshot {
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, SnapshotError> {
        Ok(serde_json::from_reader(reader)?)
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, SnapshotError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| SnapshotError::Open {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_reader(BufReader::new(file))
    }

    /// Resolve a stack id to function names
    ///
    /// Frames that cannot be symbolized are left out, so the result may be
    /// shorter than the captured stack. Unknown or negative ids resolve to an
    /// empty stack.
    pub fn resolve_stack(&self, stack_id: i64, resolver: &dyn SymbolResolver) -> Vec<String> {
        let Some(frames) = self.stacks.get(&stack_id) else {
            return Vec::new();
        };

        frames
            .iter()
            .filter_map(|frame| match frame {
                Frame::Symbol(name) => Some(name.clone()),
                Frame::Address(addr) => resolver.resolve(*addr),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbols::NoSymbols;

    /// Knows a single kernel symbol
    struct OneSymbol;

    impl SymbolResolver for OneSymbol {
        fn resolve(&self, addr: u64) -> Option<String> {
            (addr == 0xffffffff80000000).then(|| "__schedule".to_string())
        }
    }

    const SNAPSHOT: &str = r#"{
        "root": 100,
        "edges": [{"parent": 100, "child": 101}],
        "stacks": {
            "1": ["io_schedule", "submit_bio_wait", "blkdev_issue_flush"],
            "2": [18446744071562067968, "schedule", 12]
        },
        "samples": [{"tid": 101, "pid": 100, "stack_id": 1, "duration_us": 100}],
        "lifetimes": [{"tid": 101, "duration_us": 1000, "exited": true, "comm": "worker"}]
    }"#;

    #[test]
    fn test_parse_snapshot() {
        let snapshot = Snapshot::from_reader(SNAPSHOT.as_bytes()).unwrap();
        assert_eq!(snapshot.root, Some(100));
        assert_eq!(snapshot.edges, vec![Edge::new(100, 101)]);
        assert_eq!(snapshot.samples[0].duration_us, 100);
        assert_eq!(snapshot.lifetimes[0].comm, "worker");
        assert_eq!(
            snapshot.stacks[&2][0],
            Frame::Address(18446744071562067968)
        );
    }

    #[test]
    fn test_empty_object_is_empty_snapshot() {
        let snapshot = Snapshot::from_reader("{}".as_bytes()).unwrap();
        assert_eq!(snapshot, Snapshot::default());
    }

    #[test]
    fn test_malformed_snapshot_is_error() {
        let err = Snapshot::from_reader("{\"edges\": 3}".as_bytes()).unwrap_err();
        assert!(matches!(err, SnapshotError::Parse(_)));
    }

    #[test]
    fn test_missing_file_is_open_error() {
        let err = Snapshot::from_path("/nonexistent/schedtime/snapshot.json").unwrap_err();
        assert!(err.to_string().contains("/nonexistent/schedtime/snapshot.json"));
    }

    #[test]
    fn test_resolve_symbolized_stack() {
        let snapshot = Snapshot::from_reader(SNAPSHOT.as_bytes()).unwrap();
        let stack = snapshot.resolve_stack(1, &NoSymbols);
        assert_eq!(
            stack,
            vec!["io_schedule", "submit_bio_wait", "blkdev_issue_flush"]
        );
    }

    #[test]
    fn test_resolve_drops_unresolved_addresses() {
        let snapshot = Snapshot::from_reader(SNAPSHOT.as_bytes()).unwrap();
        assert_eq!(snapshot.resolve_stack(2, &NoSymbols), vec!["schedule"]);

        assert_eq!(
            snapshot.resolve_stack(2, &OneSymbol),
            vec!["__schedule", "schedule"]
        );
    }

    #[test]
    fn test_resolve_failed_capture_is_empty() {
        let snapshot = Snapshot::from_reader(SNAPSHOT.as_bytes()).unwrap();
        assert!(snapshot.resolve_stack(-14, &NoSymbols).is_empty());
        assert!(snapshot.resolve_stack(99, &NoSymbols).is_empty());
    }
}
