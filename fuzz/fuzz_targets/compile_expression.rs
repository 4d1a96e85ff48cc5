#![no_main]
use formatid::signature::{compile, serialize, Anchor, Syntax};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    for anchor in [Anchor::Bof, Anchor::Eof, Anchor::Variable] {
        if let Ok(sequence) = compile(text, anchor) {
            let rendered = serialize(&sequence, Syntax::Container, false).expect("container syntax");
            assert_eq!(compile(&rendered, anchor).as_ref(), Ok(&sequence));
        }
    }
});
