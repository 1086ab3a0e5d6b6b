//! Running the traced command
//!
//! The command is spawned and awaited unconditionally. While it runs,
//! terminal-generated signals are ignored by schedtime itself (the command
//! starts with the dispositions schedtime inherited), so an operator
//! interrupt ends the command but not the analysis that follows.

use crate::snapshot::Tid;
use anyhow::{bail, Context, Result};
use nix::sys::signal::{signal, SigHandler, Signal};
use std::os::unix::process::{CommandExt, ExitStatusExt};
use std::process::{Command, ExitStatus};

const TERMINAL_SIGNALS: [Signal; 3] = [Signal::SIGINT, Signal::SIGQUIT, Signal::SIGTERM];

/// Outcome of a traced run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TracedRun {
    /// Task id of the directly spawned command: root of the task tree
    pub root: Tid,
    /// Exit code, or 128 + signal number when killed by a signal
    pub exit_code: i32,
}

/// Ignores terminal signals until dropped, then restores prior handlers
struct IgnoreSignals {
    previous: Vec<(Signal, SigHandler)>,
}

impl IgnoreSignals {
    fn install() -> Result<Self> {
        let mut previous = Vec::with_capacity(TERMINAL_SIGNALS.len());
        for sig in TERMINAL_SIGNALS {
            // SAFETY: SigIgn installs no handler code
            let old = unsafe { signal(sig, SigHandler::SigIgn) }
                .with_context(|| format!("Failed to ignore {}", sig))?;
            previous.push((sig, old));
        }
        Ok(Self { previous })
    }

    /// Dispositions the command should start with
    fn for_child(&self) -> Vec<(Signal, SigHandler)> {
        self.previous
            .iter()
            .map(|&(sig, handler)| (sig, child_handler(handler)))
            .collect()
    }
}

impl Drop for IgnoreSignals {
    fn drop(&mut self) {
        for &(sig, handler) in &self.previous {
            // SAFETY: restores the handler that was installed before
            if let Err(e) = unsafe { signal(sig, handler) } {
                tracing::warn!("Failed to restore {} handler: {}", sig, e);
            }
        }
    }
}

/// An inherited ignore (nohup, background job) carries over to the
/// command; anything else starts at the default action.
fn child_handler(previous: SigHandler) -> SigHandler {
    match previous {
        SigHandler::SigIgn => SigHandler::SigIgn,
        _ => SigHandler::SigDfl,
    }
}

fn exit_code(status: ExitStatus) -> i32 {
    match (status.code(), status.signal()) {
        (Some(code), _) => code,
        (None, Some(sig)) => 128 + sig,
        (None, None) => 1,
    }
}

/// Spawn `command` and block until it terminates
pub fn trace_command(command: &[String]) -> Result<TracedRun> {
    let Some((program, args)) = command.split_first() else {
        bail!("Command array is empty");
    };

    let guard = IgnoreSignals::install()?;

    let child_handlers = guard.for_child();
    let mut cmd = Command::new(program);
    cmd.args(args);
    // SAFETY: only async-signal-safe calls between fork and exec
    unsafe {
        cmd.pre_exec(move || {
            for &(sig, handler) in &child_handlers {
                signal(sig, handler).map_err(std::io::Error::from)?;
            }
            Ok(())
        });
    }

    let mut child = cmd
        .spawn()
        .with_context(|| format!("Failed to spawn {}", program))?;
    let root = child.id();
    tracing::info!(root, program = %program, "traced command started");

    let status = child
        .wait()
        .with_context(|| format!("Failed to wait for {}", program))?;
    drop(guard);

    if let Some(sig) = status.signal() {
        eprintln!("[schedtime: {} killed by signal {}]", program, sig);
    }

    let run = TracedRun {
        root,
        exit_code: exit_code(status),
    };
    tracing::info!(root, exit_code = run.exit_code, "traced command finished");
    Ok(run)
}
