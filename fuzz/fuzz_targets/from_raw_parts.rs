#![no_main]

use dextree::file::{dump::render_tree, DexFile, DexLocation, VerifyPreset};

extern crate dextree;
extern crate libfuzzer_sys;

libfuzzer_sys::fuzz_target!(|data: &[u8]| {
    // this must not panic
    if let Ok(dex) = DexFile::from_raw_parts(data, DexLocation::InMemory) {
        let _ = render_tree(&dex, None);
        let _ = dex.failures().len();
    }
    let _ = DexFile::open(data, DexLocation::InMemory, VerifyPreset::All);
});
