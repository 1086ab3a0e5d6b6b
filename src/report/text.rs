//! Plain-text report layout

use super::{percent, DisplayUnit};
use crate::aggregator::{signed, Analysis, TaskTimes, UnknownStack};
use std::io::{self, Write};

const RULE: &str = "------------------------------------------------";

fn write_row<W: Write>(
    out: &mut W,
    label: &str,
    micros: i64,
    whole_us: u64,
    unit: DisplayUnit,
) -> io::Result<()> {
    writeln!(
        out,
        "{:<22}{:>14.3} {:<2} {:>7.2}%",
        label,
        unit.scale(micros),
        unit.suffix(),
        percent(micros, whole_us)
    )
}

/// Aggregate summary over all retained tasks
pub fn write_summary<W: Write>(out: &mut W, analysis: &Analysis, unit: DisplayUnit) -> io::Result<()> {
    let totals = analysis.totals();
    let whole = totals.lifetime_us;

    writeln!(out, "Scheduler time summary ({} tasks)", analysis.tasks.len())?;
    writeln!(out, "{}", RULE)?;
    write_row(out, "Total time", signed(whole), whole, unit)?;
    match analysis.wall_time_us {
        Some(wall) => write_row(out, "Wall time", signed(wall), whole, unit)?,
        None => writeln!(out, "{:<22}{:>14}", "Wall time", "n/a")?,
    }
    write_row(out, "On-CPU", totals.on_cpu_us, whole, unit)?;
    write_row(out, "User wait", signed(totals.user_wait_us), whole, unit)?;
    write_row(out, "Kernel wait", signed(totals.kernel_wait_us), whole, unit)?;
    write_row(out, "I/O", signed(totals.io_us), whole, unit)?;
    writeln!(out, "{}", RULE)?;
    Ok(())
}

/// Per-task breakdown, percentages relative to each task's own lifetime
pub fn write_tasks<W: Write>(out: &mut W, tasks: &[TaskTimes], unit: DisplayUnit) -> io::Result<()> {
    for task in tasks {
        let whole = task.lifetime_us;
        writeln!(out)?;
        writeln!(
            out,
            "tid {} ({}): lifetime {:.3} {}",
            task.tid,
            task.comm,
            unit.scale(signed(whole)),
            unit.suffix()
        )?;
        write_row(out, "  on-cpu", task.on_cpu_us(), whole, unit)?;
        for (category, micros) in task.times.iter() {
            write_row(out, &format!("  {}", category), signed(micros), whole, unit)?;
        }
    }
    Ok(())
}

pub fn write_unknown_stacks<W: Write>(out: &mut W, unknown: &[UnknownStack]) -> io::Result<()> {
    for entry in unknown {
        writeln!(
            out,
            "unknown schedule reason: tid {} pid {} ({} us)",
            entry.tid, entry.pid, entry.duration_us
        )?;
        for frame in &entry.stack {
            writeln!(out, "    {}", frame)?;
        }
    }
    Ok(())
}
