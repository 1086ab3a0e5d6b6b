//! schedtime - where did a command's wall-clock time go?
//!
//! This library turns the raw state of a scheduler-level instrumentation
//! backend (task-creation edges, off-CPU samples tagged with kernel stacks,
//! task exit lifetimes) into a per-task breakdown of on-CPU time, waits,
//! locking, I/O and page faults for every task a traced command spawned.
//!
//! The pipeline is strictly sequential: [`process_tree`] selects the tasks
//! of the traced tree, [`aggregator`] attributes samples to them using
//! [`classifier`], and [`report`] renders the finished records.

pub mod aggregator;
pub mod backend;
pub mod category;
pub mod classifier;
pub mod cli;
pub mod process_tree;
pub mod report;
pub mod snapshot;
pub mod symbols;
pub mod tracer;
