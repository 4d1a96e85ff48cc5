#![no_main]
use formatid::signature::{compile, matches, Anchor};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let split = data.iter().position(|&b| b == 0).unwrap_or(data.len());
    let Ok(expr) = std::str::from_utf8(&data[..split]) else {
        return;
    };
    let haystack = data.get(split + 1..).unwrap_or_default();
    for anchor in [Anchor::Bof, Anchor::Eof, Anchor::Variable] {
        if let Ok(sequence) = compile(expr, anchor) {
            let _ = matches(&sequence, haystack, Some(4096));
        }
    }
});
