use anyhow::{Context, Result};
use clap::Parser;
use schedtime::aggregator;
use schedtime::backend::{Backend, SnapshotFile};
use schedtime::classifier::{ClassificationTable, StackClassifier};
use schedtime::cli::{Cli, OutputFormat};
use schedtime::report::{self, ReportEngine, ReportError};
use schedtime::symbols::{Kallsyms, NoSymbols, SymbolResolver};
use schedtime::tracer;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use tracing_subscriber::EnvFilter;

/// Initialize tracing subscriber for debug output
fn init_tracing(debug: bool) {
    if debug {
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::from_default_env().add_directive(tracing::Level::DEBUG.into()),
            )
            .with_writer(std::io::stderr)
            .init();
    }
}

/// Open the report destination before anything runs
fn open_sink(args: &Cli) -> Result<Box<dyn Write>> {
    match &args.output {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to open output file: {}", path.display()))?;
            Ok(Box::new(BufWriter::new(file)))
        }
        None => Ok(Box::new(BufWriter::new(io::stdout()))),
    }
}

fn load_classifier(args: &Cli) -> Result<StackClassifier> {
    let table = match &args.table {
        Some(path) => ClassificationTable::from_path(path)?,
        None => ClassificationTable::builtin()?,
    };
    Ok(StackClassifier::new(table))
}

/// An explicit `--kallsyms` must exist; the system table is best effort
fn load_resolver(args: &Cli) -> Result<Box<dyn SymbolResolver>> {
    if let Some(path) = &args.kallsyms {
        return Ok(Box::new(Kallsyms::from_path(path)?));
    }
    match Kallsyms::from_path(Kallsyms::DEFAULT_PATH) {
        Ok(syms) => Ok(Box::new(syms)),
        Err(e) => {
            tracing::debug!("kernel symbols unavailable: {:#}", e);
            Ok(Box::new(NoSymbols))
        }
    }
}

fn main() -> Result<()> {
    let args = Cli::parse();

    // Initialize tracing if --debug flag is set
    init_tracing(args.debug);

    let sink = open_sink(&args)?;
    let classifier = load_classifier(&args)?;
    let resolver = load_resolver(&args)?;

    // Either replay a saved snapshot or run the command and read the backend
    let (snapshot, root, exit_code) = match (&args.replay, &args.command) {
        (Some(path), None) => {
            let snapshot = SnapshotFile::new(path).snapshot()?;
            let root = snapshot
                .root
                .with_context(|| format!("Snapshot {} does not name a root task", path.display()))?;
            (snapshot, root, 0)
        }
        (None, Some(command)) => {
            let run = tracer::trace_command(command)?;
            let snapshot = SnapshotFile::new(&args.snapshot).snapshot()?;
            (snapshot, run.root, run.exit_code)
        }
        (Some(_), Some(_)) => {
            anyhow::bail!("Cannot specify both --replay and a command. Choose one.");
        }
        (None, None) => {
            anyhow::bail!("Must specify either --replay FILE or a command. Usage: schedtime -- COMMAND [ARGS...]");
        }
    };

    let analysis = aggregator::analyze(&snapshot, root, &classifier, resolver.as_ref());

    if args.format == OutputFormat::Text {
        report::write_unknown_stacks(&mut io::stderr().lock(), &analysis.unknown)?;
    }

    let mut engine = ReportEngine::new(sink, args.unit(), args.format);
    match engine.render(&analysis, args.listing()) {
        Ok(()) => {}
        Err(e @ ReportError::UnknownSortKey(_)) => {
            eprintln!("schedtime: {}", e);
            std::process::exit(1);
        }
        Err(e) => return Err(e.into()),
    }

    // Exit with traced program's exit code
    std::process::exit(exit_code);
}
