#![no_main]

use libfuzzer_sys::fuzz_target;
use schedtime::aggregator::analyze;
use schedtime::classifier::StackClassifier;
use schedtime::snapshot::Snapshot;
use schedtime::symbols::NoSymbols;

fuzz_target!(|data: &[u8]| {
    // Malformed snapshots must be rejected, never panic
    let Ok(snapshot) = Snapshot::from_reader(data) else {
        return;
    };

    // Whatever parses must also analyze without panicking
    if let (Some(root), Ok(classifier)) = (snapshot.root, StackClassifier::builtin()) {
        let _ = analyze(&snapshot, root, &classifier, &NoSymbols);
    }
});
