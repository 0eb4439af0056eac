#![no_main]

use libfuzzer_sys::fuzz_target;
use sifen::core::parse_and_validate;

fuzz_target!(|data: &str| {
    let _ = parse_and_validate(data);
});
