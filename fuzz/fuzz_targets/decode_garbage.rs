#![no_main]
use jxl_entropy::{BitReader, EntropyDecoder};
use libfuzzer_sys::fuzz_target;

// Arbitrary bytes must fail cleanly, never panic.
fuzz_target!(|data: &[u8]| {
    let mut reader = BitReader::new(data);
    let Ok(mut decoder) = EntropyDecoder::new(&mut reader, 4) else {
        return;
    };
    for i in 0..64u32 {
        if decoder.read_token(i % 4, &mut reader).is_err() {
            return;
        }
    }
    let _ = decoder.finish();
});
