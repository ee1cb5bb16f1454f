//! Model serialization and token emission.
//!
//! A coded segment is laid out as
//!
//! ```text
//! context map | header | one model per cluster | token payload
//! ```
//!
//! The header selects the code family (range-coded ANS or canonical prefix),
//! the ANS precision and the hybrid-integer split. Models with one or two
//! used symbols use a compact form; larger ANS models send a log-count per
//! symbol with run-length escapes, larger prefix models send a 4-bit depth
//! per symbol.
//!
//! ANS payloads start with the 32-bit final encoder state. Each token then
//! contributes its optional 16-bit renormalization chunk followed by its
//! extra bits, in token order, so a decoder reading forwards finds every
//! chunk exactly when its state needs refilling.

use crate::bit_io::{read_var_u32, write_var_u32, BitReader, BitWriter};
use crate::context_map::{cluster_histograms, ContextMap, MAX_CLUSTERS};
use crate::distribution::{AnsTable, ANS_LOG_TAB_SIZE, MAX_ALPHABET_SIZE};
use crate::error::{Error, Result};
use crate::histogram::{build_histograms, Histogram};
use crate::huffman::{PrefixCode, PrefixDecoder};
use crate::hybrid_uint::{HybridToken, HybridUintConfig, Token};
use crate::rans::{RansDecoder, RansEncoder};

/// Smallest ANS precision a stream header can select.
pub const MIN_STREAM_LOG_TAB_SIZE: u32 = 5;

/// Log-count value announcing a run of repeated frequencies.
const RLE_ESCAPE: u32 = 15;

/// Shortest run worth an escape.
const MIN_RLE_RUN: usize = 4;

/// Options controlling how a segment is modelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntropyConfig {
    use_prefix_code: bool,
    log_tab_size: u32,
    hybrid_uint: HybridUintConfig,
    max_clusters: Option<usize>,
}

impl Default for EntropyConfig {
    fn default() -> Self {
        Self {
            use_prefix_code: false,
            log_tab_size: ANS_LOG_TAB_SIZE,
            hybrid_uint: HybridUintConfig::default(),
            max_clusters: None,
        }
    }
}

impl EntropyConfig {
    /// Creates the default configuration (ANS, precision 12).
    pub fn new() -> Self {
        Self::default()
    }

    /// Selects canonical prefix codes instead of ANS.
    #[must_use]
    pub fn use_prefix_code(mut self, use_prefix_code: bool) -> Self {
        self.use_prefix_code = use_prefix_code;
        self
    }

    /// Sets the ANS table precision.
    #[must_use]
    pub fn log_tab_size(mut self, log_tab_size: u32) -> Self {
        self.log_tab_size = log_tab_size;
        self
    }

    /// Sets the hybrid-integer tokenizer.
    #[must_use]
    pub fn hybrid_uint(mut self, config: HybridUintConfig) -> Self {
        self.hybrid_uint = config;
        self
    }

    /// Caps the number of transmitted models; contexts beyond it are clustered.
    #[must_use]
    pub fn max_clusters(mut self, max_clusters: usize) -> Self {
        self.max_clusters = Some(max_clusters);
        self
    }

    /// True if prefix codes are selected.
    pub fn is_prefix_code(&self) -> bool {
        self.use_prefix_code
    }

    /// ANS table precision.
    pub fn ans_log_tab_size(&self) -> u32 {
        self.log_tab_size
    }

    /// Tokenizer configuration.
    pub fn hybrid_uint_config(&self) -> HybridUintConfig {
        self.hybrid_uint
    }

    /// Effective model budget.
    pub fn cluster_budget(&self) -> usize {
        self.max_clusters.unwrap_or(MAX_CLUSTERS)
    }

    /// Checks every value is in its supported range.
    pub fn validate(&self) -> Result<()> {
        if !(MIN_STREAM_LOG_TAB_SIZE..=ANS_LOG_TAB_SIZE).contains(&self.log_tab_size) {
            return Err(Error::InvalidConfig("log_tab_size must be in 5..=12"));
        }
        if !(1..=MAX_CLUSTERS).contains(&self.cluster_budget()) {
            return Err(Error::InvalidConfig("max_clusters must be in 1..=256"));
        }
        Ok(())
    }
}

/// Coding model of one cluster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EncodingModel {
    /// Range-coded distribution.
    Ans(AnsTable),
    /// Canonical prefix code.
    Prefix(PrefixCode),
}

impl EncodingModel {
    /// Estimated payload cost in bits of coding `histogram` with this model.
    pub fn estimate_bits(&self, histogram: &Histogram) -> f64 {
        match self {
            EncodingModel::Ans(table) => table.estimate_bits(histogram),
            EncodingModel::Prefix(code) => code.estimate_bits(histogram),
        }
    }
}

/// Everything needed to emit (or decode) the tokens of one segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntropyEncodingData {
    use_prefix_code: bool,
    log_tab_size: u32,
    hybrid_uint: HybridUintConfig,
    models: Vec<EncodingModel>,
}

impl EntropyEncodingData {
    /// One model per cluster.
    pub fn models(&self) -> &[EncodingModel] {
        &self.models
    }

    /// True if the models are prefix codes.
    pub fn use_prefix_code(&self) -> bool {
        self.use_prefix_code
    }

    /// ANS precision announced in the header.
    pub fn log_tab_size(&self) -> u32 {
        self.log_tab_size
    }

    /// Tokenizer announced in the header.
    pub fn hybrid_uint(&self) -> HybridUintConfig {
        self.hybrid_uint
    }

    fn model(&self, cluster: usize) -> Result<&EncodingModel> {
        self.models.get(cluster).ok_or(Error::ContextOutOfRange {
            context: cluster,
            num_contexts: self.models.len(),
        })
    }
}

/// Writes `map` ahead of the models it indexes.
pub fn write_context_map(map: &ContextMap, writer: &mut BitWriter) {
    map.write(writer);
}

/// Reads a map of `num_contexts` entries.
pub fn read_context_map(reader: &mut BitReader<'_>, num_contexts: usize) -> Result<ContextMap> {
    ContextMap::read(reader, num_contexts)
}

/// Builds one model per histogram and writes the header and the models.
///
/// # Errors
/// Fails on an invalid `config` or a histogram no model of the selected
/// family can represent.
pub fn write_histograms(
    histograms: &[Histogram],
    config: &EntropyConfig,
    writer: &mut BitWriter,
) -> Result<EntropyEncodingData> {
    config.validate()?;
    writer.write_bool(config.use_prefix_code);
    writer.write_bits(u64::from(config.log_tab_size - MIN_STREAM_LOG_TAB_SIZE), 3);
    config.hybrid_uint.write(writer);

    let start = writer.bits_written();
    let models = histograms
        .iter()
        .map(|h| {
            if config.use_prefix_code {
                write_prefix_model(h, writer).map(EncodingModel::Prefix)
            } else {
                write_ans_model(h, config.log_tab_size, writer).map(EncodingModel::Ans)
            }
        })
        .collect::<Result<Vec<_>>>()?;

    if tracing::enabled!(tracing::Level::DEBUG) {
        let payload_bits: f64 = models
            .iter()
            .zip(histograms)
            .map(|(m, h)| m.estimate_bits(h))
            .sum();
        tracing::debug!(
            models = models.len(),
            prefix = config.use_prefix_code,
            header_bits = writer.bits_written() - start,
            payload_bits,
            "wrote entropy models"
        );
    }

    Ok(EntropyEncodingData {
        use_prefix_code: config.use_prefix_code,
        log_tab_size: config.log_tab_size,
        hybrid_uint: config.hybrid_uint,
        models,
    })
}

fn write_ans_model(histogram: &Histogram, log_tab_size: u32, writer: &mut BitWriter) -> Result<AnsTable> {
    let table = AnsTable::from_histogram(histogram, log_tab_size)?;
    let freqs = table.frequencies();
    let used: Vec<usize> = (0..freqs.len()).filter(|&s| freqs[s] > 0).collect();

    match used.as_slice() {
        &[symbol] => {
            writer.write_bool(true);
            writer.write_bool(false);
            write_var_u32(writer, symbol as u32);
        }
        &[first, second] => {
            writer.write_bool(true);
            writer.write_bool(true);
            write_var_u32(writer, first as u32);
            write_var_u32(writer, second as u32);
            writer.write_bits(u64::from(freqs[first]), log_tab_size);
        }
        _ => {
            writer.write_bool(false);
            write_var_u32(writer, freqs.len() as u32);
            // The last frequency is implied by the table size.
            let explicit = &freqs[..freqs.len() - 1];
            let mut i = 0;
            while i < explicit.len() {
                let f = u32::from(explicit[i]);
                write_log_count(writer, f);
                let run = explicit[i + 1..]
                    .iter()
                    .take_while(|&&g| u32::from(g) == f)
                    .count();
                if run >= MIN_RLE_RUN {
                    writer.write_bits(u64::from(RLE_ESCAPE), 4);
                    write_var_u32(writer, run as u32);
                    i += run;
                }
                i += 1;
            }
        }
    }
    Ok(table)
}

/// Bit length of `f` in 4 bits, then the bits below its top bit.
fn write_log_count(writer: &mut BitWriter, f: u32) {
    let len = 32 - f.leading_zeros();
    writer.write_bits(u64::from(len), 4);
    if len > 1 {
        writer.write_bits(u64::from(f), len - 1);
    }
}

fn write_prefix_model(histogram: &Histogram, writer: &mut BitWriter) -> Result<PrefixCode> {
    // Symbol ids and alphabet sizes above the limit are rejected by the reader.
    if histogram.alphabet_size() > MAX_ALPHABET_SIZE {
        return Err(Error::AlphabetSizeExceeded {
            size: histogram.alphabet_size(),
            max: MAX_ALPHABET_SIZE,
        });
    }
    let code = PrefixCode::from_histogram(histogram)?;
    match code.single_symbol() {
        Some(symbol) => {
            writer.write_bool(true);
            write_var_u32(writer, symbol as u32);
        }
        None => {
            writer.write_bool(false);
            write_var_u32(writer, code.alphabet_size() as u32);
            for &d in code.depths() {
                writer.write_bits(u64::from(d), 4);
            }
        }
    }
    Ok(code)
}

/// Reads the header and `num_histograms` models written by [`write_histograms`].
pub fn read_histograms(
    reader: &mut BitReader<'_>,
    num_histograms: usize,
) -> Result<EntropyEncodingData> {
    let use_prefix_code = reader.read_bool()?;
    let log_tab_size = reader.read_bits(3)? + MIN_STREAM_LOG_TAB_SIZE;
    let hybrid_uint = HybridUintConfig::read(reader)?;
    let models = (0..num_histograms)
        .map(|_| {
            if use_prefix_code {
                read_prefix_model(reader).map(EncodingModel::Prefix)
            } else {
                read_ans_model(reader, log_tab_size).map(EncodingModel::Ans)
            }
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(EntropyEncodingData {
        use_prefix_code,
        log_tab_size,
        hybrid_uint,
        models,
    })
}

fn read_symbol_id(reader: &mut BitReader<'_>) -> Result<usize> {
    let symbol = read_var_u32(reader)? as usize;
    if symbol >= MAX_ALPHABET_SIZE {
        return Err(Error::InvalidStream("symbol id above alphabet limit"));
    }
    Ok(symbol)
}

fn read_ans_model(reader: &mut BitReader<'_>, log_tab_size: u32) -> Result<AnsTable> {
    let table_size = 1u32 << log_tab_size;
    let freqs = if reader.read_bool()? {
        if reader.read_bool()? {
            let first = read_symbol_id(reader)?;
            let second = read_symbol_id(reader)?;
            let f = reader.read_bits(log_tab_size)?;
            if first == second || f == 0 {
                return Err(Error::InvalidStream("malformed two-symbol distribution"));
            }
            let mut freqs = vec![0u32; first.max(second) + 1];
            freqs[first] = f;
            freqs[second] = table_size - f;
            freqs
        } else {
            let symbol = read_symbol_id(reader)?;
            let mut freqs = vec![0u32; symbol + 1];
            freqs[symbol] = table_size;
            freqs
        }
    } else {
        let alphabet_size = read_var_u32(reader)? as usize;
        if !(2..=MAX_ALPHABET_SIZE).contains(&alphabet_size) {
            return Err(Error::InvalidStream("distribution alphabet size out of range"));
        }
        let mut freqs = Vec::with_capacity(alphabet_size);
        while freqs.len() < alphabet_size - 1 {
            let len = reader.read_bits(4)?;
            if len == RLE_ESCAPE {
                let &previous = freqs
                    .last()
                    .ok_or(Error::InvalidStream("run escape before any frequency"))?;
                let run = read_var_u32(reader)? as usize;
                if freqs.len() + run > alphabet_size - 1 {
                    return Err(Error::InvalidStream("frequency run past alphabet end"));
                }
                freqs.extend(std::iter::repeat(previous).take(run));
                continue;
            }
            if len > log_tab_size {
                return Err(Error::InvalidStream("frequency above table size"));
            }
            let f = match len {
                0 => 0,
                1 => 1,
                _ => (1 << (len - 1)) | reader.read_bits(len - 1)?,
            };
            freqs.push(f);
        }
        let sum: u64 = freqs.iter().map(|&f| u64::from(f)).sum();
        if sum >= u64::from(table_size) {
            return Err(Error::InvalidStream("frequencies exceed table size"));
        }
        freqs.push(table_size - sum as u32);
        freqs
    };
    AnsTable::from_frequencies(&freqs, log_tab_size)
}

fn read_prefix_model(reader: &mut BitReader<'_>) -> Result<PrefixCode> {
    if reader.read_bool()? {
        let symbol = read_symbol_id(reader)?;
        return PrefixCode::from_depths(vec![0; symbol + 1]);
    }
    let alphabet_size = read_var_u32(reader)? as usize;
    if !(2..=MAX_ALPHABET_SIZE).contains(&alphabet_size) {
        return Err(Error::InvalidStream("prefix alphabet size out of range"));
    }
    let depths = (0..alphabet_size)
        .map(|_| reader.read_bits(4).map(|d| d as u8))
        .collect::<Result<Vec<_>>>()?;
    PrefixCode::from_depths(depths)
}

/// Writes the payload of `tokens` with the models in `codes`.
///
/// # Errors
/// - [`Error::ContextOutOfRange`] if a token's context (or its cluster) has
///   no model.
/// - [`Error::ZeroFrequency`] if a token was not counted when the models
///   were built.
pub fn write_tokens(
    tokens: &[Token],
    codes: &EntropyEncodingData,
    context_map: &ContextMap,
    writer: &mut BitWriter,
) -> Result<()> {
    let hybrid = tokens
        .iter()
        .map(|t| -> Result<(&EncodingModel, HybridToken)> {
            let cluster = context_map.cluster(t.context as usize)?;
            Ok((codes.model(cluster)?, codes.hybrid_uint.encode(t.value)))
        })
        .collect::<Result<Vec<_>>>()?;
    let start = writer.bits_written();

    if codes.use_prefix_code {
        for (model, t) in &hybrid {
            let EncodingModel::Prefix(code) = model else {
                return Err(Error::InvalidConfig("ANS model in a prefix-coded segment"));
            };
            code.write_symbol(t.token as usize, writer)?;
            writer.write_bits(u64::from(t.bits), t.nbits);
        }
    } else {
        let mut encoder = RansEncoder::new();
        let mut chunks = vec![None; hybrid.len()];
        for (chunk, (model, t)) in chunks.iter_mut().zip(&hybrid).rev() {
            let EncodingModel::Ans(table) = model else {
                return Err(Error::InvalidConfig("prefix model in an ANS-coded segment"));
            };
            *chunk = encoder.put(table, t.token as usize)?;
        }
        writer.write_bits(u64::from(encoder.state()), 32);
        for (chunk, (_, t)) in chunks.iter().zip(&hybrid) {
            if let Some(chunk) = chunk {
                writer.write_bits(u64::from(*chunk), 16);
            }
            writer.write_bits(u64::from(t.bits), t.nbits);
        }
    }

    tracing::trace!(
        tokens = tokens.len(),
        bits = writer.bits_written() - start,
        "wrote tokens"
    );
    Ok(())
}

/// Models, clusters and writes `tokens` in one pass.
///
/// Histograms are built per raw context. When there are more contexts than
/// the cluster budget they are merged by [`cluster_histograms`]; otherwise
/// the identity map is used. Writes the context map, the models and the
/// payload, and returns the map and models.
pub fn encode_tokens(
    tokens: &[Token],
    num_contexts: usize,
    config: &EntropyConfig,
    writer: &mut BitWriter,
) -> Result<(ContextMap, EntropyEncodingData)> {
    config.validate()?;
    let raw = build_histograms(None, num_contexts, config.hybrid_uint, tokens)?;
    let budget = config.cluster_budget();
    let (context_map, histograms) = if num_contexts > budget {
        cluster_histograms(&raw, budget)?
    } else {
        (ContextMap::identity(num_contexts)?, raw)
    };

    write_context_map(&context_map, writer);
    let codes = write_histograms(&histograms, config, writer)?;
    write_tokens(tokens, &codes, &context_map, writer)?;
    tracing::debug!(
        tokens = tokens.len(),
        contexts = num_contexts,
        clusters = context_map.num_clusters(),
        bits = writer.bits_written(),
        "encoded token stream"
    );
    Ok((context_map, codes))
}

#[derive(Debug, Clone)]
enum DecodingModel {
    Ans(AnsTable),
    Prefix(PrefixDecoder),
}

/// Reads tokens back from a segment.
#[derive(Debug, Clone)]
pub struct EntropyDecoder {
    context_map: ContextMap,
    hybrid_uint: HybridUintConfig,
    models: Vec<DecodingModel>,
    ans: Option<RansDecoder>,
}

impl EntropyDecoder {
    /// Reads the context map and models of a segment with `num_contexts`
    /// contexts, then positions itself at the start of the payload.
    pub fn new(reader: &mut BitReader<'_>, num_contexts: usize) -> Result<Self> {
        let context_map = read_context_map(reader, num_contexts)?;
        let codes = read_histograms(reader, context_map.num_clusters())?;
        Self::from_codes(context_map, codes, reader)
    }

    /// Builds a decoder from already parsed models.
    ///
    /// For ANS segments the initial state is read from `reader`.
    pub fn from_codes(
        context_map: ContextMap,
        codes: EntropyEncodingData,
        reader: &mut BitReader<'_>,
    ) -> Result<Self> {
        if context_map.num_clusters() > codes.models.len() {
            return Err(Error::InvalidStream("context map addresses a missing model"));
        }
        let models = codes
            .models
            .into_iter()
            .map(|m| match m {
                EncodingModel::Ans(table) => DecodingModel::Ans(table),
                EncodingModel::Prefix(code) => DecodingModel::Prefix(PrefixDecoder::new(&code)),
            })
            .collect();
        let ans = if codes.use_prefix_code {
            None
        } else {
            Some(RansDecoder::from_reader(reader)?)
        };
        Ok(Self {
            context_map,
            hybrid_uint: codes.hybrid_uint,
            models,
            ans,
        })
    }

    /// Context map of the segment.
    pub fn context_map(&self) -> &ContextMap {
        &self.context_map
    }

    /// Reads the next value, coded in raw context `context`.
    pub fn read_token(&mut self, context: u32, reader: &mut BitReader<'_>) -> Result<u32> {
        let cluster = self.context_map.cluster(context as usize)?;
        let token = match (&self.models[cluster], self.ans.as_mut()) {
            (DecodingModel::Ans(table), Some(ans)) => ans.get(table, reader)?,
            (DecodingModel::Prefix(decoder), None) => decoder.read_symbol(reader)?,
            _ => return Err(Error::InvalidStream("model family mismatch")),
        } as u32;
        let nbits = self.hybrid_uint.extra_bits_for_token(token);
        if nbits > 32 {
            return Err(Error::InvalidStream("hybrid token exceeds 32-bit range"));
        }
        let bits = reader.read_bits(nbits)?;
        self.hybrid_uint.decode(token, bits)
    }

    /// Verifies the segment ended cleanly.
    ///
    /// # Errors
    /// Returns [`Error::CorruptState`] if the ANS state is not back at its
    /// starting signature.
    pub fn finish(&self) -> Result<()> {
        match &self.ans {
            Some(ans) => ans.check_final_state(),
            None => Ok(()),
        }
    }
}

/// Decodes a segment written by [`encode_tokens`], given each token's context.
pub fn decode_tokens(
    reader: &mut BitReader<'_>,
    num_contexts: usize,
    contexts: &[u32],
) -> Result<Vec<u32>> {
    let mut decoder = EntropyDecoder::new(reader, num_contexts)?;
    let values = contexts
        .iter()
        .map(|&c| decoder.read_token(c, reader))
        .collect::<Result<Vec<_>>>()?;
    decoder.finish()?;
    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn roundtrip(tokens: &[Token], num_contexts: usize, config: &EntropyConfig) -> Vec<u32> {
        let mut writer = BitWriter::new();
        encode_tokens(tokens, num_contexts, config, &mut writer).unwrap();
        let bytes = writer.into_bytes();
        let contexts: Vec<u32> = tokens.iter().map(|t| t.context).collect();
        decode_tokens(&mut BitReader::new(&bytes), num_contexts, &contexts).unwrap()
    }

    fn sample_tokens() -> Vec<Token> {
        (0..500u32)
            .map(|i| Token::new(i % 3, (i * 7919) % (1 + 40 * (i % 3))))
            .collect()
    }

    #[test]
    fn test_ans_roundtrip() {
        let tokens = sample_tokens();
        let values: Vec<u32> = tokens.iter().map(|t| t.value).collect();
        assert_eq!(roundtrip(&tokens, 3, &EntropyConfig::new()), values);
    }

    #[test]
    fn test_prefix_roundtrip() {
        let tokens = sample_tokens();
        let values: Vec<u32> = tokens.iter().map(|t| t.value).collect();
        let config = EntropyConfig::new().use_prefix_code(true);
        assert_eq!(roundtrip(&tokens, 3, &config), values);
    }

    #[test]
    fn test_large_values_roundtrip() {
        let tokens: Vec<Token> = [0, 1, u32::MAX, 1 << 31, 12345, u32::MAX - 1]
            .iter()
            .map(|&v| Token::new(0, v))
            .collect();
        let values: Vec<u32> = tokens.iter().map(|t| t.value).collect();
        for prefix in [false, true] {
            let config = EntropyConfig::new().use_prefix_code(prefix);
            assert_eq!(roundtrip(&tokens, 1, &config), values);
        }
    }

    #[test]
    fn test_empty_segment() {
        for prefix in [false, true] {
            let config = EntropyConfig::new().use_prefix_code(prefix);
            assert!(roundtrip(&[], 4, &config).is_empty());
            assert!(roundtrip(&[], 0, &config).is_empty());
        }
    }

    #[test]
    fn test_single_symbol_ans_payload_is_state_only() {
        let tokens = vec![Token::new(0, 3); 1000];
        let codes = write_histograms(
            &[Histogram::from_counts(&[0, 0, 0, 1000])],
            &EntropyConfig::new(),
            &mut BitWriter::new(),
        )
        .unwrap();
        let mut writer = BitWriter::new();
        write_tokens(&tokens, &codes, &ContextMap::identity(1).unwrap(), &mut writer).unwrap();
        assert_eq!(writer.bits_written(), 32);
    }

    #[test]
    fn test_run_length_frequencies_roundtrip() {
        let mut counts = vec![10u32; 40];
        counts[0] = 500;
        counts[39] = 3;
        let histogram = Histogram::from_counts(&counts);
        let mut writer = BitWriter::new();
        let codes = write_histograms(&[histogram], &EntropyConfig::new(), &mut writer).unwrap();
        let bytes = writer.into_bytes();
        let read = read_histograms(&mut BitReader::new(&bytes), 1).unwrap();
        assert_eq!(read, codes);
    }

    #[test]
    fn test_clustering_above_budget() {
        let tokens: Vec<Token> = (0..3000u32).map(|i| Token::new(i % 300, i % 5)).collect();
        let config = EntropyConfig::new().max_clusters(8);
        let mut writer = BitWriter::new();
        let (map, codes) = encode_tokens(&tokens, 300, &config, &mut writer).unwrap();
        assert!(map.num_clusters() <= 8);
        assert_eq!(codes.models().len(), map.num_clusters());
        let values: Vec<u32> = tokens.iter().map(|t| t.value).collect();
        assert_eq!(roundtrip(&tokens, 300, &config), values);
    }

    #[test]
    fn test_context_out_of_range() {
        let err = encode_tokens(
            &[Token::new(5, 1)],
            2,
            &EntropyConfig::new(),
            &mut BitWriter::new(),
        );
        assert!(matches!(err, Err(Error::ContextOutOfRange { context: 5, .. })));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut writer = BitWriter::new();
        for config in [
            EntropyConfig::new().log_tab_size(4),
            EntropyConfig::new().log_tab_size(13),
            EntropyConfig::new().max_clusters(0),
            EntropyConfig::new().max_clusters(257),
        ] {
            assert!(matches!(
                encode_tokens(&[], 1, &config, &mut writer),
                Err(Error::InvalidConfig(_))
            ));
        }
    }

    #[test]
    fn test_wide_tokenizer_alphabet_limit() {
        let hybrid = HybridUintConfig::new(15, 15, 0).unwrap();
        for prefix in [false, true] {
            let config = EntropyConfig::new().use_prefix_code(prefix).hybrid_uint(hybrid);
            for values in [vec![u32::MAX], vec![u32::MAX, 1, 2]] {
                let tokens: Vec<Token> = values.iter().map(|&v| Token::new(0, v)).collect();
                let err = encode_tokens(&tokens, 1, &config, &mut BitWriter::new());
                assert!(
                    matches!(err, Err(Error::AlphabetSizeExceeded { max: MAX_ALPHABET_SIZE, .. })),
                    "prefix={prefix}: {err:?}"
                );
            }
            // Tokens just inside the limit still round-trip.
            let tokens: Vec<Token> = [0, 1, 40_000, 65_535]
                .iter()
                .map(|&v| Token::new(0, v))
                .collect();
            let values: Vec<u32> = tokens.iter().map(|t| t.value).collect();
            assert_eq!(roundtrip(&tokens, 1, &config), values);
        }
    }

    #[test]
    fn test_uncounted_token_rejected() {
        let codes = write_histograms(
            &[Histogram::from_counts(&[4, 4])],
            &EntropyConfig::new(),
            &mut BitWriter::new(),
        )
        .unwrap();
        let err = write_tokens(
            &[Token::new(0, 2)],
            &codes,
            &ContextMap::identity(1).unwrap(),
            &mut BitWriter::new(),
        );
        assert!(matches!(err, Err(Error::ZeroFrequency(2))));
    }

    #[test]
    fn test_corrupted_payload_detected() {
        let tokens = sample_tokens();
        let mut writer = BitWriter::new();
        encode_tokens(&tokens, 3, &EntropyConfig::new(), &mut writer).unwrap();
        let mut bytes = writer.into_bytes();
        let last = bytes.len() - 1;
        bytes.truncate(last - 8);
        let contexts: Vec<u32> = tokens.iter().map(|t| t.context).collect();
        assert!(decode_tokens(&mut BitReader::new(&bytes), 3, &contexts).is_err());
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn prop_stream_roundtrip(
            raw in prop::collection::vec((0u32..6, 0u32..5000), 0..400),
            prefix in any::<bool>(),
            log_tab_size in 7u32..=12,
        ) {
            let tokens: Vec<Token> = raw.iter().map(|&(c, v)| Token::new(c, v)).collect();
            let config = EntropyConfig::new().use_prefix_code(prefix).log_tab_size(log_tab_size);
            let values: Vec<u32> = tokens.iter().map(|t| t.value).collect();
            prop_assert_eq!(roundtrip(&tokens, 6, &config), values);
        }
    }
}
