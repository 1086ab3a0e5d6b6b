//! JSON report (`--format json`)

use super::{percent, DisplayUnit, SortKey};
use crate::aggregator::{signed, Analysis, TaskTimes, UnknownStack};
use crate::category::Category;
use crate::snapshot::Tid;
use serde::Serialize;
use std::io::Write;

/// A duration in the display unit together with its share of a whole
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct JsonAmount {
    pub value: f64,
    pub percent: f64,
}

impl JsonAmount {
    fn new(micros: i64, whole_us: u64, unit: DisplayUnit) -> Self {
        Self {
            value: unit.scale(micros),
            percent: percent(micros, whole_us),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct JsonSummary {
    pub total: JsonAmount,
    pub wall_time: Option<JsonAmount>,
    pub on_cpu: JsonAmount,
    pub user_wait: JsonAmount,
    pub kernel_wait: JsonAmount,
    pub io: JsonAmount,
}

#[derive(Debug, Clone, Serialize)]
pub struct JsonCategoryTime {
    pub category: Category,
    #[serde(flatten)]
    pub amount: JsonAmount,
}

#[derive(Debug, Clone, Serialize)]
pub struct JsonTask {
    pub tid: Tid,
    pub comm: String,
    pub lifetime: f64,
    pub on_cpu: JsonAmount,
    pub times: Vec<JsonCategoryTime>,
}

impl JsonTask {
    fn new(task: &TaskTimes, unit: DisplayUnit) -> Self {
        let whole = task.lifetime_us;
        Self {
            tid: task.tid,
            comm: task.comm.clone(),
            lifetime: unit.scale(signed(whole)),
            on_cpu: JsonAmount::new(task.on_cpu_us(), whole, unit),
            times: task
                .times
                .iter()
                .map(|(category, us)| JsonCategoryTime {
                    category,
                    amount: JsonAmount::new(signed(us), whole, unit),
                })
                .collect(),
        }
    }
}

/// Complete JSON document for one run
#[derive(Debug, Clone, Serialize)]
pub struct JsonReport {
    pub unit: &'static str,
    pub root: Tid,
    pub summary: JsonSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tasks: Option<Vec<JsonTask>>,
    pub dropped: Vec<Tid>,
    pub unknown: Vec<UnknownStack>,
}

impl JsonReport {
    pub fn new(analysis: &Analysis, unit: DisplayUnit) -> Self {
        let totals = analysis.totals();
        let whole = totals.lifetime_us;

        Self {
            unit: unit.suffix(),
            root: analysis.root,
            summary: JsonSummary {
                total: JsonAmount::new(signed(whole), whole, unit),
                wall_time: analysis
                    .wall_time_us
                    .map(|wall| JsonAmount::new(signed(wall), whole, unit)),
                on_cpu: JsonAmount::new(totals.on_cpu_us, whole, unit),
                user_wait: JsonAmount::new(signed(totals.user_wait_us), whole, unit),
                kernel_wait: JsonAmount::new(signed(totals.kernel_wait_us), whole, unit),
                io: JsonAmount::new(signed(totals.io_us), whole, unit),
            },
            sort: None,
            tasks: None,
            dropped: analysis.dropped.clone(),
            unknown: analysis.unknown.clone(),
        }
    }

    /// Attach the per-task listing, already sorted by `key`
    pub fn with_tasks(mut self, tasks: &[TaskTimes], key: SortKey, unit: DisplayUnit) -> Self {
        self.sort = Some(key.to_string());
        self.tasks = Some(tasks.iter().map(|t| JsonTask::new(t, unit)).collect());
        self
    }

    pub fn write<W: Write>(&self, out: &mut W) -> Result<(), super::ReportError> {
        serde_json::to_writer_pretty(&mut *out, self)?;
        writeln!(out)?;
        Ok(())
    }
}
