use super::ReportError;
use crate::aggregator::TaskTimes;
use crate::category::Category;
use std::cmp::Reverse;
use std::fmt;
use std::str::FromStr;

/// Ordering of the per-task listing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortKey {
    /// Longest-lived first
    #[default]
    Lifetime,
    /// Command name, ascending
    Comm,
    /// Task id, ascending
    Tid,
    /// Most on-CPU time first
    OnCpu,
    /// Most time in the given category first
    Category(Category),
}

impl SortKey {
    /// Keys accepted on the command line
    pub const NAMES: [&'static str; 11] = [
        "lifetime",
        "comm",
        "tid",
        "oncpu",
        "disk-io",
        "page-faults",
        "network-io",
        "kernel-locking",
        "involuntary-preempt",
        "userspace-locking",
        "voluntary-wait",
    ];
}

impl FromStr for SortKey {
    type Err = ReportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "lifetime" => Ok(SortKey::Lifetime),
            "comm" => Ok(SortKey::Comm),
            "tid" => Ok(SortKey::Tid),
            "oncpu" | "on-cpu" | "on_cpu" => Ok(SortKey::OnCpu),
            other => other
                .parse::<Category>()
                .map(SortKey::Category)
                .map_err(|_| ReportError::UnknownSortKey(s.to_string())),
        }
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortKey::Lifetime => f.write_str("lifetime"),
            SortKey::Comm => f.write_str("comm"),
            SortKey::Tid => f.write_str("tid"),
            SortKey::OnCpu => f.write_str("oncpu"),
            SortKey::Category(c) => f.write_str(&c.name().replace(' ', "-")),
        }
    }
}

/// Sort tasks in place; ties keep ascending task id order
pub fn sort_tasks(tasks: &mut [TaskTimes], key: SortKey) {
    tasks.sort_by_key(|t| t.tid);
    match key {
        SortKey::Lifetime => tasks.sort_by_key(|t| Reverse(t.lifetime_us)),
        SortKey::Comm => tasks.sort_by(|a, b| a.comm.cmp(&b.comm)),
        SortKey::Tid => {}
        SortKey::OnCpu => tasks.sort_by_key(|t| Reverse(t.on_cpu_us())),
        SortKey::Category(c) => tasks.sort_by_key(|t| Reverse(t.times[c])),
    }
}
