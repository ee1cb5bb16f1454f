use jxl_entropy::ac_strategy::{AcStrategyImage, AcStrategyType};
use jxl_entropy::chroma_from_luma::ColorCorrelationMap;
use jxl_entropy::static_codes::{extend_static_codes, static_prefix_codes, StaticCodeKind};
use jxl_entropy::{
    build_histograms, decode_tokens, encode_tokens, extend_prefix_code, kraft_sum,
    normalize_counts, BitReader, BitWriter, EntropyConfig, Error, Histogram, HybridUintConfig,
    PrefixCode, Token,
};
use proptest::prelude::*;

fn roundtrip(tokens: &[Token], num_contexts: usize, config: &EntropyConfig) -> Vec<u32> {
    let mut writer = BitWriter::new();
    encode_tokens(tokens, num_contexts, config, &mut writer).unwrap();
    let bytes = writer.into_bytes();
    let contexts: Vec<u32> = tokens.iter().map(|t| t.context).collect();
    decode_tokens(&mut BitReader::new(&bytes), num_contexts, &contexts).unwrap()
}

fn tokens_strategy() -> impl Strategy<Value = (usize, Vec<Token>)> {
    (1usize..300).prop_flat_map(|num_contexts| {
        let token = (0..num_contexts as u32, prop_oneof![0u32..64, any::<u32>()])
            .prop_map(|(c, v)| Token::new(c, v));
        (Just(num_contexts), prop::collection::vec(token, 0..500))
    })
}

fn hybrid_config_strategy() -> impl Strategy<Value = HybridUintConfig> {
    (0u32..=15)
        .prop_flat_map(|split| (Just(split), 0..=split))
        .prop_flat_map(|(split, msb)| (Just(split), Just(msb), 0..=(split - msb)))
        .prop_map(|(split, msb, lsb)| HybridUintConfig::new(split, msb, lsb).unwrap())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn test_stream_roundtrip_ans((num_contexts, tokens) in tokens_strategy()) {
        let values: Vec<u32> = tokens.iter().map(|t| t.value).collect();
        prop_assert_eq!(roundtrip(&tokens, num_contexts, &EntropyConfig::new()), values);
    }

    #[test]
    fn test_stream_roundtrip_prefix((num_contexts, tokens) in tokens_strategy()) {
        let values: Vec<u32> = tokens.iter().map(|t| t.value).collect();
        let config = EntropyConfig::new().use_prefix_code(true);
        prop_assert_eq!(roundtrip(&tokens, num_contexts, &config), values);
    }

    #[test]
    fn test_roundtrip_with_custom_tokenizer(
        raw in prop::collection::vec((0u32..4, any::<u32>()), 1..300),
        prefix in any::<bool>(),
    ) {
        let tokens: Vec<Token> = raw.iter().map(|&(c, v)| Token::new(c, v)).collect();
        let values: Vec<u32> = tokens.iter().map(|t| t.value).collect();
        let config = EntropyConfig::new()
            .use_prefix_code(prefix)
            .hybrid_uint(HybridUintConfig::new(6, 3, 1).unwrap());
        prop_assert_eq!(roundtrip(&tokens, 4, &config), values);
    }

    #[test]
    fn test_any_tokenizer_encodes_cleanly_or_roundtrips(
        hybrid in hybrid_config_strategy(),
        raw in prop::collection::vec((0u32..4, any::<u32>()), 1..300),
        prefix in any::<bool>(),
    ) {
        let tokens: Vec<Token> = raw.iter().map(|&(c, v)| Token::new(c, v)).collect();
        let config = EntropyConfig::new().use_prefix_code(prefix).hybrid_uint(hybrid);
        let mut writer = BitWriter::new();
        match encode_tokens(&tokens, 4, &config, &mut writer) {
            Ok(_) => {
                let bytes = writer.into_bytes();
                let contexts: Vec<u32> = tokens.iter().map(|t| t.context).collect();
                let decoded = decode_tokens(&mut BitReader::new(&bytes), 4, &contexts).unwrap();
                let values: Vec<u32> = tokens.iter().map(|t| t.value).collect();
                prop_assert_eq!(decoded, values);
            }
            Err(err) => {
                prop_assert!(matches!(err, Error::AlphabetSizeExceeded { .. }), "{:?}", err);
                let max_token = tokens.iter().map(|t| hybrid.encode(t.value).token).max();
                prop_assert!(max_token.unwrap_or(0) >= 1 << 16);
            }
        }
    }

    #[test]
    fn test_histogram_additivity(
        a in prop::collection::vec(0usize..200, 0..300),
        b in prop::collection::vec(0usize..200, 0..300),
    ) {
        let mut ha = Histogram::new();
        a.iter().for_each(|&s| ha.add(s));
        let mut hb = Histogram::new();
        b.iter().for_each(|&s| hb.add(s));
        let mut all = Histogram::new();
        a.iter().chain(&b).for_each(|&s| all.add(s));
        ha.add_histogram(&hb);
        prop_assert_eq!(ha.total(), (a.len() + b.len()) as u64);
        prop_assert_eq!(ha, all);
    }

    #[test]
    fn test_prefix_codes_satisfy_kraft(counts in prop::collection::vec(0u32..1_000_000, 2..1000)) {
        prop_assume!(counts.iter().filter(|&&c| c > 0).count() >= 2);
        let code = PrefixCode::from_histogram(&Histogram::from_counts(&counts)).unwrap();
        prop_assert_eq!(kraft_sum(code.depths()), 1u64 << 15);
    }

    #[test]
    fn test_extension_of_any_complete_code(
        counts in prop::collection::vec(1u32..100, 2..16),
        new_size in 17usize..300,
    ) {
        let mut code = PrefixCode::from_histogram(&Histogram::from_counts(&counts)).unwrap();
        extend_prefix_code(&mut code, new_size).unwrap();
        prop_assert_eq!(code.alphabet_size(), new_size);
        prop_assert!(code.depths().iter().all(|&d| (1..=15).contains(&d)));
        prop_assert_eq!(kraft_sum(code.depths()), 1u64 << 15);
    }
}

#[test]
fn test_normalization_scenario() {
    assert_eq!(normalize_counts(&[5, 0, 3, 2], 4).unwrap(), vec![8, 0, 5, 3]);
}

#[test]
fn test_extension_scenario() {
    let mut code = PrefixCode::from_depths(vec![1, 2, 2]).unwrap();
    extend_prefix_code(&mut code, 5).unwrap();
    assert_eq!(code.depths(), &[1, 3, 2, 4, 4]);
}

#[test]
fn test_static_codes_extend_to_any_larger_size() {
    for kind in [StaticCodeKind::Dc, StaticCodeKind::Ac] {
        for size in [17, 64, 259] {
            let codes = extend_static_codes(kind, size).unwrap();
            assert_eq!(codes.len(), static_prefix_codes(kind).len());
            for code in &codes {
                assert_eq!(code.alphabet_size(), size);
                assert_eq!(kraft_sum(code.depths()), 1 << 15);
            }
        }
    }
}

#[test]
fn test_histograms_route_through_context_map() {
    let tokens = vec![Token::new(0, 1), Token::new(1, 1), Token::new(2, 40)];
    let map = jxl_entropy::ContextMap::new(vec![0, 0, 1]).unwrap();
    let histograms =
        build_histograms(Some(&map), 3, HybridUintConfig::default(), &tokens).unwrap();
    assert_eq!(histograms.len(), 2);
    assert_eq!(histograms[0].count(1), 2);
    assert_eq!(histograms[1].total(), 1);
}

#[test]
fn test_strategy_and_correlation_tokens_roundtrip() {
    let mut image = AcStrategyImage::new(8, 8);
    image.fill_dct8();
    image.set(0, 0, AcStrategyType::Dct32x32).unwrap();
    image.set(4, 4, AcStrategyType::Dct16x8).unwrap();
    let mut cmap = ColorCorrelationMap::new(512, 256, true);
    cmap.set_ytox(3, 1, -7).unwrap();
    cmap.set_ytob(7, 3, 100).unwrap();

    let mut tokens = image.tokens(0);
    tokens.extend(cmap.tokens(1, 2));
    let values: Vec<u32> = tokens.iter().map(|t| t.value).collect();
    for prefix in [false, true] {
        let config = EntropyConfig::new().use_prefix_code(prefix);
        assert_eq!(roundtrip(&tokens, 3, &config), values);
    }
}
