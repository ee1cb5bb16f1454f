#![no_main]
use jxl_entropy::{decode_tokens, encode_tokens, BitReader, BitWriter, EntropyConfig, Token};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: (Vec<(u8, u32)>, bool, u8)| {
    let (raw, use_prefix_code, log_tab_size) = data;
    let num_contexts = 8;
    let tokens: Vec<Token> = raw
        .iter()
        .map(|&(c, v)| Token::new(u32::from(c) % num_contexts, v))
        .collect();
    let config = EntropyConfig::new()
        .use_prefix_code(use_prefix_code)
        .log_tab_size(8 + u32::from(log_tab_size % 5));

    let mut writer = BitWriter::new();
    if encode_tokens(&tokens, num_contexts as usize, &config, &mut writer).is_err() {
        return;
    }
    let bytes = writer.into_bytes();
    let contexts: Vec<u32> = tokens.iter().map(|t| t.context).collect();
    let values = decode_tokens(&mut BitReader::new(&bytes), num_contexts as usize, &contexts)
        .expect("encoded stream must decode");
    let expected: Vec<u32> = tokens.iter().map(|t| t.value).collect();
    assert_eq!(values, expected);
});
