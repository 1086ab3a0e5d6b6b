//! Human- and machine-readable reports of an [`Analysis`]
//!
//! All output goes to a sink handed to [`ReportEngine`], so the same code
//! writes to stdout, to a `-o` file, or to a buffer in tests. Stored values
//! are microseconds; the display unit only scales what is printed.

mod json;
mod sort;
mod text;

pub use json::JsonReport;
pub use sort::{sort_tasks, SortKey};

use crate::aggregator::{Analysis, UnknownStack};
use crate::cli::OutputFormat;
use std::io::Write;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("unknown sort key '{0}' (expected one of: {keys})", keys = SortKey::NAMES.join(", "))]
    UnknownSortKey(String),

    #[error("failed to write report: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to serialize report: {0}")]
    Json(#[from] serde_json::Error),
}

/// Unit used to display durations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DisplayUnit {
    Milliseconds,
    #[default]
    Seconds,
}

impl DisplayUnit {
    pub fn suffix(self) -> &'static str {
        match self {
            DisplayUnit::Milliseconds => "ms",
            DisplayUnit::Seconds => "s",
        }
    }

    /// Convert a microsecond value for display
    pub fn scale(self, micros: i64) -> f64 {
        match self {
            DisplayUnit::Milliseconds => micros as f64 / 1_000.0,
            DisplayUnit::Seconds => micros as f64 / 1_000_000.0,
        }
    }
}

/// `part` as a percentage of `whole`; 0 when `whole` is 0
pub fn percent(part: i64, whole: u64) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    part as f64 / whole as f64 * 100.0
}

/// Writes reports to an injected sink
#[derive(Debug)]
pub struct ReportEngine<W: Write> {
    sink: W,
    unit: DisplayUnit,
    format: OutputFormat,
}

impl<W: Write> ReportEngine<W> {
    pub fn new(sink: W, unit: DisplayUnit, format: OutputFormat) -> Self {
        Self { sink, unit, format }
    }

    /// Write the aggregate summary and, if `listing` is given, the per-task
    /// listing sorted by that key
    ///
    /// An unknown sort key is reported only after the summary has been
    /// written; no task listing is produced in that case.
    pub fn render(&mut self, analysis: &Analysis, listing: Option<&str>) -> Result<(), ReportError> {
        let sort_key = listing.map(str::parse::<SortKey>).transpose();

        let result = match self.format {
            OutputFormat::Text => self.render_text(analysis, sort_key),
            OutputFormat::Json => self.render_json(analysis, sort_key),
        };

        // Flush even on a bad sort key so the summary is not lost
        self.sink.flush()?;
        result
    }

    fn render_text(
        &mut self,
        analysis: &Analysis,
        sort_key: Result<Option<SortKey>, ReportError>,
    ) -> Result<(), ReportError> {
        text::write_summary(&mut self.sink, analysis, self.unit)?;

        if let Some(key) = sort_key? {
            let mut tasks = analysis.tasks.clone();
            sort_tasks(&mut tasks, key);
            text::write_tasks(&mut self.sink, &tasks, self.unit)?;
        }
        Ok(())
    }

    fn render_json(
        &mut self,
        analysis: &Analysis,
        sort_key: Result<Option<SortKey>, ReportError>,
    ) -> Result<(), ReportError> {
        let mut report = JsonReport::new(analysis, self.unit);

        let result = match sort_key {
            Ok(Some(key)) => {
                let mut tasks = analysis.tasks.clone();
                sort_tasks(&mut tasks, key);
                report = report.with_tasks(&tasks, key, self.unit);
                Ok(())
            }
            Ok(None) => Ok(()),
            Err(e) => Err(e),
        };

        report.write(&mut self.sink)?;
        result
    }

    pub fn into_inner(self) -> W {
        self.sink
    }
}

/// Write "unknown schedule reason" diagnostics with their full stacks
pub fn write_unknown_stacks<W: Write>(out: &mut W, unknown: &[UnknownStack]) -> std::io::Result<()> {
    text::write_unknown_stacks(out, unknown)
}
