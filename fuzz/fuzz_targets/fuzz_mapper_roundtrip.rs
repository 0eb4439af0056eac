#![no_main]

use libfuzzer_sys::fuzz_target;
use sifen::xml::modular_to_official;

fuzz_target!(|data: &str| {
    let _ = modular_to_official(data);
});
