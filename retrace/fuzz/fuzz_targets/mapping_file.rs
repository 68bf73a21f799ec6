#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let _ = retrace::SymbolTable::from_bytes(data);
});
