//! Off-CPU wait categories
//!
//! Every attributed off-CPU interval lands in exactly one of seven fixed
//! categories. The categories are grouped into three reporting buckets
//! (I/O, user wait, kernel wait) which, together with on-CPU time,
//! partition a task's lifetime.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Index, IndexMut};
use std::str::FromStr;

/// Semantic reason a task was scheduled out
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Category {
    #[serde(rename = "disk io")]
    DiskIo,
    #[serde(rename = "voluntary wait")]
    VoluntaryWait,
    #[serde(rename = "involuntary preempt")]
    InvoluntaryPreempt,
    #[serde(rename = "userspace locking")]
    UserspaceLocking,
    #[serde(rename = "kernel locking")]
    KernelLocking,
    #[serde(rename = "network io")]
    NetworkIo,
    #[serde(rename = "page faults")]
    PageFaults,
}

/// Reporting bucket a category rolls up into
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bucket {
    Io,
    UserWait,
    KernelWait,
}

impl Category {
    pub const COUNT: usize = 7;

    /// All categories in display order
    pub const ALL: [Category; Category::COUNT] = [
        Category::DiskIo,
        Category::VoluntaryWait,
        Category::InvoluntaryPreempt,
        Category::UserspaceLocking,
        Category::KernelLocking,
        Category::NetworkIo,
        Category::PageFaults,
    ];

    /// Human-readable name, also used as the key in TOML and JSON
    pub fn name(self) -> &'static str {
        match self {
            Category::DiskIo => "disk io",
            Category::VoluntaryWait => "voluntary wait",
            Category::InvoluntaryPreempt => "involuntary preempt",
            Category::UserspaceLocking => "userspace locking",
            Category::KernelLocking => "kernel locking",
            Category::NetworkIo => "network io",
            Category::PageFaults => "page faults",
        }
    }

    pub fn bucket(self) -> Bucket {
        match self {
            Category::DiskIo | Category::NetworkIo => Bucket::Io,
            Category::VoluntaryWait | Category::UserspaceLocking => Bucket::UserWait,
            Category::InvoluntaryPreempt | Category::KernelLocking | Category::PageFaults => {
                Bucket::KernelWait
            }
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Error returned when a string names no category
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown category '{0}'")]
pub struct UnknownCategory(pub String);

impl FromStr for Category {
    type Err = UnknownCategory;

    /// Accepts the display name as well as `-`/`_` separated spellings
    /// (`disk io`, `disk-io`, `disk_io`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace(['-', '_'], " ");
        Category::ALL
            .into_iter()
            .find(|c| c.name() == normalized)
            .ok_or_else(|| UnknownCategory(s.to_string()))
    }
}

/// Accumulated off-CPU time per category, in microseconds
///
/// Every category is always present and starts at zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CategoryTimes([u64; Category::COUNT]);

impl CategoryTimes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, category: Category, duration_us: u64) {
        self[category] = self[category].saturating_add(duration_us);
    }

    /// Sum over all seven categories
    pub fn total(&self) -> u64 {
        self.0.iter().fold(0, |acc, &t| acc.saturating_add(t))
    }

    /// Sum over the categories belonging to `bucket`
    pub fn bucket_total(&self, bucket: Bucket) -> u64 {
        self.iter()
            .filter(|(c, _)| c.bucket() == bucket)
            .fold(0, |acc, (_, t)| acc.saturating_add(t))
    }

    pub fn iter(&self) -> impl Iterator<Item = (Category, u64)> + '_ {
        Category::ALL.into_iter().map(move |c| (c, self[c]))
    }
}

impl Index<Category> for CategoryTimes {
    type Output = u64;

    fn index(&self, category: Category) -> &u64 {
        &self.0[category.index()]
    }
}

impl IndexMut<Category> for CategoryTimes {
    fn index_mut(&mut self, category: Category) -> &mut u64 {
        &mut self.0[category.index()]
    }
}

impl Serialize for CategoryTimes {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeMap;
        let mut map = serializer.serialize_map(Some(Category::COUNT))?;
        for (category, time) in self.iter() {
            map.serialize_entry(category.name(), &time)?;
        }
        map.end()
    }
}
