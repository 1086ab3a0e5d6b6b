/// Analysis Pipeline Benchmarks
///
/// Measures task tree construction, stack classification and the full
/// snapshot analysis for synthetic traces of increasing size.
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use schedtime::aggregator::analyze;
use schedtime::classifier::StackClassifier;
use schedtime::process_tree::reachable_tasks;
use schedtime::snapshot::{Edge, Frame, LifetimeRecord, Sample, Snapshot};
use schedtime::symbols::NoSymbols;

const STACKS: [&[&str]; 5] = [
    &["__schedule", "schedule", "io_schedule", "folio_wait_bit_common", "filemap_read"],
    &["__schedule", "schedule", "futex_wait_queue", "futex_wait", "do_futex"],
    &["__schedule", "schedule", "schedule_timeout", "sk_wait_data", "tcp_recvmsg_locked"],
    &["__schedule", "preempt_schedule_irq", "asm_sysvec_apic_timer_interrupt"],
    &["__schedule", "schedule", "some_driver_wait", "driver_ioctl", "__x64_sys_ioctl"],
];

/// Fan-out tree of `tasks` threads, each with one sample per stack shape
fn synthetic_snapshot(tasks: u32) -> Snapshot {
    let edges = (1..tasks).map(|t| Edge::new(t / 4, t)).collect();
    let stacks = STACKS
        .iter()
        .enumerate()
        .map(|(i, frames)| {
            let frames = frames.iter().map(|f| Frame::Symbol(f.to_string()));
            (i as i64, frames.collect::<Vec<_>>())
        })
        .collect();

    let mut samples = Vec::new();
    let mut lifetimes = Vec::new();
    for tid in 0..tasks {
        for stack_id in 0..STACKS.len() as i64 {
            samples.push(Sample {
                tid,
                pid: 0,
                stack_id,
                duration_us: 100 + stack_id as u64,
            });
        }
        lifetimes.push(LifetimeRecord {
            tid,
            duration_us: 100_000,
            exited: tid % 17 != 0,
            comm: format!("worker-{}", tid),
        });
    }

    Snapshot {
        root: Some(0),
        edges,
        stacks,
        samples,
        lifetimes,
    }
}

fn bench_task_tree(c: &mut Criterion) {
    let mut group = c.benchmark_group("task_tree");

    for size in [100u32, 1_000, 10_000] {
        let snapshot = synthetic_snapshot(size);
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &snapshot, |b, s| {
            b.iter(|| black_box(reachable_tasks(0, &s.edges)));
        });
    }

    group.finish();
}

fn bench_classification(c: &mut Criterion) {
    let classifier = StackClassifier::builtin().expect("builtin table");
    let stacks: Vec<Vec<String>> = STACKS
        .iter()
        .map(|s| s.iter().map(|f| f.to_string()).collect())
        .collect();

    c.bench_function("classify_stack_shapes", |b| {
        b.iter(|| {
            for stack in &stacks {
                black_box(classifier.classify(stack));
            }
        });
    });
}

fn bench_full_analysis(c: &mut Criterion) {
    let classifier = StackClassifier::builtin().expect("builtin table");
    let mut group = c.benchmark_group("analyze");

    for size in [100u32, 1_000, 10_000] {
        let snapshot = synthetic_snapshot(size);
        group.throughput(Throughput::Elements(snapshot.samples.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &snapshot, |b, s| {
            b.iter(|| black_box(analyze(s, 0, &classifier, &NoSymbols)));
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_task_tree,
    bench_classification,
    bench_full_analysis
);

criterion_main!(benches);
