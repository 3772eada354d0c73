#![no_main]

use libfuzzer_sys::fuzz_target;
use lapstat::trace::CheckpointTrace;

fuzz_target!(|data: &[u8]| {
    if let Ok(input) = std::str::from_utf8(data) {
        // Malformed documents must be rejected, never panic
        if let Ok(trace) = CheckpointTrace::from_json(input) {
            let _ = trace.replay();
        }
    }
});
