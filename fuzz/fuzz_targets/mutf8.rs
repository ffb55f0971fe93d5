#![no_main]

use dextree::utf;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // end must be a zero
    if let Some(end) = data.iter().position(|&x| x == 0) {
        if let Ok(s) = utf::mutf8_to_str(&data[0..end]) {
            let _ = utf::str_to_mutf8(&s);
        }
    }
});
