#![no_main]

use libfuzzer_sys::fuzz_target;
use sifen::core::validate_cdc;

fuzz_target!(|data: &str| {
    let _ = validate_cdc(data);
});
