use criterion::{criterion_group, criterion_main, Criterion};
use jxl_entropy::{decode_tokens, encode_tokens, BitReader, BitWriter, EntropyConfig, Token};

fn sample_tokens() -> Vec<Token> {
    // Skewed values spread over 16 contexts.
    (0..10_000u32)
        .map(|i| {
            let x = i.wrapping_mul(2_654_435_761);
            Token::new(i % 16, (x >> 24) * (x >> 28) / 7)
        })
        .collect()
}

fn bench_family(c: &mut Criterion, name: &str, config: EntropyConfig) {
    let mut group = c.benchmark_group(name);
    let tokens = sample_tokens();
    let contexts: Vec<u32> = tokens.iter().map(|t| t.context).collect();

    group.bench_function("encode", |b| {
        b.iter(|| {
            let mut writer = BitWriter::with_capacity(tokens.len());
            encode_tokens(&tokens, 16, &config, &mut writer).unwrap();
            writer.into_bytes()
        })
    });

    let mut writer = BitWriter::new();
    encode_tokens(&tokens, 16, &config, &mut writer).unwrap();
    let bytes = writer.into_bytes();

    group.bench_function("decode", |b| {
        b.iter(|| decode_tokens(&mut BitReader::new(&bytes), 16, &contexts).unwrap())
    });
    group.finish();
}

fn bench_ans(c: &mut Criterion) {
    bench_family(c, "ans", EntropyConfig::new());
}

fn bench_prefix(c: &mut Criterion) {
    bench_family(c, "prefix", EntropyConfig::new().use_prefix_code(true));
}

criterion_group!(benches, bench_ans, bench_prefix);
criterion_main!(benches);
