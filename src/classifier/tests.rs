// Classification table and first-match tests

use super::*;
use std::io::Write;
use tempfile::NamedTempFile;

fn stack(frames: &[&str]) -> Vec<String> {
    frames.iter().map(|f| f.to_string()).collect()
}

fn builtin() -> StackClassifier {
    StackClassifier::builtin().expect("embedded table must parse")
}

#[test]
fn test_builtin_table_loads() {
    let classifier = builtin();
    let table = classifier.table();
    assert_eq!(table.filter.min_frames, 3);
    assert!(table.filter.short_circuit.contains(&"ret_from_fork".to_string()));
    assert_eq!(table.rules[0], Rule::new("io_schedule", Category::DiskIo));

    // Every category is reachable from the default table
    for category in Category::ALL {
        assert!(
            table.rules.iter().any(|r| r.category == category),
            "no rule for {}",
            category
        );
    }
}

#[test]
fn test_io_schedule_anywhere_is_disk_io() {
    let classifier = builtin();
    for s in [
        stack(&["io_schedule", "folio_wait_bit", "filemap_read"]),
        stack(&["__schedule", "schedule", "io_schedule", "blk_mq_get_tag"]),
        stack(&["__schedule", "schedule", "bit_wait_io", "io_schedule"]),
    ] {
        assert_eq!(classifier.classify(&s), Classification::Category(Category::DiskIo));
    }
}

#[test]
fn test_earlier_rule_wins_regardless_of_stack_order() {
    let classifier = builtin();

    // Page fault that ends up waiting for disk: io_schedule is listed first
    let fault_io = stack(&[
        "__schedule",
        "io_schedule",
        "filemap_fault",
        "handle_mm_fault",
        "do_user_addr_fault",
    ]);
    assert_eq!(classifier.first_match(&fault_io), Some(Category::DiskIo));

    let reversed: Vec<String> = fault_io.iter().rev().cloned().collect();
    assert_eq!(classifier.first_match(&reversed), Some(Category::DiskIo));

    // Fault blocked on mmap lock: page faults precede kernel locking
    let fault_lock = stack(&[
        "__schedule",
        "rwsem_down_read_slowpath",
        "do_user_addr_fault",
        "exc_page_fault",
    ]);
    assert_eq!(classifier.first_match(&fault_lock), Some(Category::PageFaults));
}

#[test]
fn test_each_category_classifies() {
    let classifier = builtin();
    let cases = [
        (&["__schedule", "sk_wait_data", "tcp_recvmsg"][..], Category::NetworkIo),
        (&["__schedule", "futex_wait_queue", "futex_wait"][..], Category::UserspaceLocking),
        (&["__schedule", "__mutex_lock", "do_truncate"][..], Category::KernelLocking),
        (&["__schedule", "preempt_schedule_irq", "asm_sysvec_apic_timer_interrupt"][..], Category::InvoluntaryPreempt),
        (&["__schedule", "do_nanosleep", "hrtimer_nanosleep"][..], Category::VoluntaryWait),
        (&["__schedule", "handle_mm_fault", "exc_page_fault"][..], Category::PageFaults),
    ];
    for (frames, expected) in cases {
        assert_eq!(
            classifier.classify(&stack(frames)),
            Classification::Category(expected),
            "stack {:?}",
            frames
        );
    }
}

#[test]
fn test_shallow_stack_is_filtered_not_unknown() {
    let classifier = builtin();

    let shallow = stack(&["__schedule", "io_schedule"]);
    assert_eq!(
        classifier.classify(&shallow),
        Classification::Filtered(FilterReason::TooShallow { frames: 2 })
    );

    let empty: Vec<String> = Vec::new();
    assert_eq!(
        classifier.classify(&empty),
        Classification::Filtered(FilterReason::TooShallow { frames: 0 })
    );
}

#[test]
fn test_short_circuit_marker_filters_matching_stack() {
    let classifier = builtin();
    let s = stack(&["__schedule", "schedule", "exit_to_user_mode_loop", "io_schedule"]);
    assert_eq!(
        classifier.classify(&s),
        Classification::Filtered(FilterReason::ShortCircuit {
            marker: "exit_to_user_mode_loop".to_string()
        })
    );
}

#[test]
fn test_unmatched_stack_is_unknown() {
    let classifier = builtin();
    let s = stack(&["__schedule", "schedule", "some_driver_wait"]);
    assert_eq!(classifier.classify(&s), Classification::Unknown);
    assert_eq!(classifier.classify(&s).category(), None);
}

#[test]
fn test_custom_table_from_file() {
    let mut file = NamedTempFile::new().unwrap();
    write!(
        file,
        r#"
[[rule]]
function = "schedule"
category = "voluntary wait"

[[rule]]
function = "io_schedule"
category = "disk io"
"#
    )
    .unwrap();

    let classifier = StackClassifier::new(ClassificationTable::from_path(file.path()).unwrap());
    assert!(classifier.table().filter.short_circuit.is_empty());

    // Rule order is honoured even when it shadows a more specific rule
    let s = stack(&["io_schedule", "schedule", "submit_bio_wait"]);
    assert_eq!(classifier.classify(&s), Classification::Category(Category::VoluntaryWait));
    assert_eq!(
        classifier.classify(&stack(&["io_schedule", "submit_bio_wait", "blkdev_issue_flush"])),
        Classification::Category(Category::DiskIo)
    );
}

#[test]
fn test_table_cannot_lower_frame_minimum() {
    for min_frames in [0, 1, 2] {
        let err = ClassificationTable::from_toml_str(&format!(
            r#"
[filter]
min_frames = {min_frames}

[[rule]]
function = "io_schedule"
category = "disk io"
"#
        ))
        .unwrap_err();
        assert!(matches!(err, TableError::TooFewFrames { min_frames: m } if m == min_frames));
    }
}

#[test]
fn test_table_may_raise_frame_minimum() {
    let table = ClassificationTable::from_toml_str(
        r#"
[filter]
min_frames = 5

[[rule]]
function = "io_schedule"
category = "disk io"
"#,
    )
    .unwrap();
    let classifier = StackClassifier::new(table);
    assert_eq!(
        classifier.classify(&stack(&["io_schedule", "a", "b", "c"])),
        Classification::Filtered(FilterReason::TooShallow { frames: 4 })
    );
}

#[test]
fn test_filter_section_defaults() {
    let table = ClassificationTable::from_toml_str(
        r#"
[[rule]]
function = "io_schedule"
category = "disk io"
"#,
    )
    .unwrap();
    assert_eq!(table.filter, StackFilter::default());
}

#[test]
fn test_unknown_category_rejected() {
    let err = ClassificationTable::from_toml_str(
        r#"
[[rule]]
function = "io_schedule"
category = "coffee break"
"#,
    )
    .unwrap_err();
    assert!(matches!(err, TableError::Parse(_)));
}

#[test]
fn test_empty_table_rejected() {
    let err = ClassificationTable::from_toml_str("rule = []").unwrap_err();
    assert!(matches!(err, TableError::Empty));
}

#[test]
fn test_blank_function_rejected() {
    let err = ClassificationTable::from_toml_str(
        r#"
[[rule]]
function = "io_schedule"
category = "disk io"

[[rule]]
function = "  "
category = "disk io"
"#,
    )
    .unwrap_err();
    assert!(matches!(err, TableError::EmptyFunction { index: 1 }));
}

#[test]
fn test_missing_table_file() {
    let err = ClassificationTable::from_path("/nonexistent/table.toml").unwrap_err();
    assert!(err.to_string().contains("/nonexistent/table.toml"));
}
