//! Per-task time aggregation
//!
//! Folds classified off-CPU samples and exit lifetimes into one record per
//! task of the traced tree. A task's on-CPU time is whatever part of its
//! lifetime was not attributed to a wait category.
//!
//! The backend records a task's lifetime when it exits. A task can be in the
//! tree but have no exit record when the snapshot is taken (the exit
//! bookkeeping races with the snapshot); such tasks are dropped from the
//! result rather than reported with a made-up number.

use crate::category::{Bucket, Category, CategoryTimes};
use crate::classifier::{Classification, StackClassifier};
use crate::process_tree::reachable_tasks;
use crate::snapshot::{LifetimeRecord, Sample, Snapshot, Tid};
use crate::symbols::SymbolResolver;
use serde::Serialize;
use std::collections::{HashMap, HashSet};

/// Microseconds as a signed value, saturating at `i64::MAX`
pub(crate) fn signed(micros: u64) -> i64 {
    i64::try_from(micros).unwrap_or(i64::MAX)
}

/// Time breakdown of a single task, all values in microseconds
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskTimes {
    pub tid: Tid,
    /// Display name, known once the task has exited
    pub comm: String,
    pub lifetime_us: u64,
    pub times: CategoryTimes,
}

impl TaskTimes {
    pub fn new(tid: Tid) -> Self {
        Self {
            tid,
            comm: String::new(),
            lifetime_us: 0,
            times: CategoryTimes::new(),
        }
    }

    /// Lifetime minus all attributed off-CPU time
    ///
    /// Negative when more off-CPU time was attributed than the task lived,
    /// which points at misclassified or double-counted samples.
    pub fn on_cpu_us(&self) -> i64 {
        signed(self.lifetime_us).saturating_sub(signed(self.times.total()))
    }

    pub fn io_us(&self) -> u64 {
        self.times.bucket_total(Bucket::Io)
    }

    pub fn user_wait_us(&self) -> u64 {
        self.times.bucket_total(Bucket::UserWait)
    }

    pub fn kernel_wait_us(&self) -> u64 {
        self.times.bucket_total(Bucket::KernelWait)
    }
}

/// Sample whose stack passed the pre-filter but matched no rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnknownStack {
    pub tid: Tid,
    pub pid: Tid,
    pub duration_us: u64,
    pub stack: Vec<String>,
}

/// What happened to a sample handed to [`TimeAggregator::attribute_sample`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attribution {
    Charged(Category),
    Filtered,
    Unknown,
    /// Task is not part of the traced tree
    OutsideTree,
}

/// Totals across all retained tasks, in microseconds
///
/// `on_cpu_us + user_wait_us + kernel_wait_us + io_us == lifetime_us`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AggregateTotals {
    pub lifetime_us: u64,
    pub on_cpu_us: i64,
    pub user_wait_us: u64,
    pub kernel_wait_us: u64,
    pub io_us: u64,
}

impl AggregateTotals {
    pub fn from_tasks<'a>(tasks: impl IntoIterator<Item = &'a TaskTimes>) -> Self {
        let mut totals = AggregateTotals::default();
        for task in tasks {
            totals.lifetime_us = totals.lifetime_us.saturating_add(task.lifetime_us);
            totals.io_us = totals.io_us.saturating_add(task.io_us());
            totals.user_wait_us = totals.user_wait_us.saturating_add(task.user_wait_us());
            totals.kernel_wait_us = totals.kernel_wait_us.saturating_add(task.kernel_wait_us());
        }
        totals.on_cpu_us = signed(totals.lifetime_us)
            .saturating_sub(signed(totals.io_us))
            .saturating_sub(signed(totals.user_wait_us))
            .saturating_sub(signed(totals.kernel_wait_us));
        totals
    }
}

/// Collects per-task times for one reporting run
#[derive(Debug)]
pub struct TimeAggregator<'a> {
    classifier: &'a StackClassifier,
    root: Tid,
    reachable: HashSet<Tid>,
    tasks: HashMap<Tid, TaskTimes>,
    unknown: Vec<UnknownStack>,
    filtered: usize,
}

impl<'a> TimeAggregator<'a> {
    pub fn new(root: Tid, reachable: HashSet<Tid>, classifier: &'a StackClassifier) -> Self {
        let tasks = reachable.iter().map(|&tid| (tid, TaskTimes::new(tid))).collect();
        Self {
            classifier,
            root,
            reachable,
            tasks,
            unknown: Vec::new(),
            filtered: 0,
        }
    }

    pub fn is_reachable(&self, tid: Tid) -> bool {
        self.reachable.contains(&tid)
    }

    /// Classify `stack` and charge the sample's duration to its task
    pub fn attribute_sample(&mut self, sample: &Sample, stack: &[String]) -> Attribution {
        let Some(task) = self.tasks.get_mut(&sample.tid) else {
            return Attribution::OutsideTree;
        };

        match self.classifier.classify(stack) {
            Classification::Category(category) => {
                task.times.add(category, sample.duration_us);
                Attribution::Charged(category)
            }
            Classification::Filtered(reason) => {
                tracing::trace!(tid = sample.tid, ?reason, "sample filtered");
                self.filtered += 1;
                Attribution::Filtered
            }
            Classification::Unknown => {
                tracing::debug!(tid = sample.tid, frames = stack.len(), "unknown schedule reason");
                self.unknown.push(UnknownStack {
                    tid: sample.tid,
                    pid: sample.pid,
                    duration_us: sample.duration_us,
                    stack: stack.to_vec(),
                });
                Attribution::Unknown
            }
        }
    }

    /// Record lifetime and name of an exited task
    ///
    /// Records for tasks that have not exited, or that are outside the
    /// tree, are ignored. Returns whether the record was used.
    pub fn set_lifetime(&mut self, record: &LifetimeRecord) -> bool {
        if !record.exited {
            return false;
        }
        let Some(task) = self.tasks.get_mut(&record.tid) else {
            return false;
        };
        task.lifetime_us = record.duration_us;
        task.comm = record.comm.clone();
        true
    }

    /// Lifetime of the root task: wall-clock duration of the whole run
    pub fn wall_time(&self) -> Option<u64> {
        self.tasks
            .get(&self.root)
            .map(|t| t.lifetime_us)
            .filter(|&lifetime| lifetime > 0)
    }

    /// Drop tasks without a recorded lifetime and hand back the result
    ///
    /// A zero lifetime is treated the same as a missing one.
    pub fn finalize(self) -> Analysis {
        let wall_time_us = self.wall_time();

        let (retained, dropped): (Vec<TaskTimes>, Vec<TaskTimes>) =
            self.tasks.into_values().partition(|t| t.lifetime_us > 0);

        let mut dropped: Vec<Tid> = dropped.into_iter().map(|t| t.tid).collect();
        dropped.sort_unstable();
        if !dropped.is_empty() {
            tracing::debug!(count = dropped.len(), "dropped tasks without exit lifetime");
        }

        let mut tasks = retained;
        tasks.sort_by_key(|t| t.tid);

        Analysis {
            root: self.root,
            wall_time_us,
            tasks,
            dropped,
            unknown: self.unknown,
            filtered: self.filtered,
        }
    }
}

/// Finished per-task records of one run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Analysis {
    pub root: Tid,
    pub wall_time_us: Option<u64>,
    /// Retained tasks, ordered by tid
    pub tasks: Vec<TaskTimes>,
    /// Tasks in the tree that were dropped for lack of a lifetime
    pub dropped: Vec<Tid>,
    pub unknown: Vec<UnknownStack>,
    /// Number of samples discarded by the stack pre-filter
    pub filtered: usize,
}

impl Analysis {
    pub fn totals(&self) -> AggregateTotals {
        AggregateTotals::from_tasks(&self.tasks)
    }

    pub fn task(&self, tid: Tid) -> Option<&TaskTimes> {
        self.tasks.iter().find(|t| t.tid == tid)
    }
}

/// Run the whole analysis over a backend snapshot
///
/// Builds the task tree under `root`, attributes every sample of a task in
/// that tree, applies exit lifetimes and drops incomplete tasks.
pub fn analyze(
    snapshot: &Snapshot,
    root: Tid,
    classifier: &StackClassifier,
    resolver: &dyn SymbolResolver,
) -> Analysis {
    let reachable = reachable_tasks(root, &snapshot.edges);
    let mut aggregator = TimeAggregator::new(root, reachable, classifier);

    for sample in &snapshot.samples {
        if !aggregator.is_reachable(sample.tid) {
            continue;
        }
        let stack = snapshot.resolve_stack(sample.stack_id, resolver);
        aggregator.attribute_sample(sample, &stack);
    }

    for record in &snapshot.lifetimes {
        aggregator.set_lifetime(record);
    }

    let analysis = aggregator.finalize();
    tracing::info!(
        tasks = analysis.tasks.len(),
        dropped = analysis.dropped.len(),
        unknown = analysis.unknown.len(),
        filtered = analysis.filtered,
        "analysis complete"
    );
    analysis
}
