//! Token histograms.
//!
//! A [`Histogram`] counts token occurrences for one context (or one cluster
//! of contexts). [`HistogramBuilder`] tokenizes values and routes them to the
//! histogram selected by their context, optionally through a [`ContextMap`].

use crate::context_map::ContextMap;
use crate::error::{Error, Result};
use crate::hybrid_uint::{HybridUintConfig, Token};

/// Histograms grow in multiples of this many symbols.
pub const HISTOGRAM_ROUNDING: usize = 8;

/// Growable per-context frequency table.
///
/// Invariant: `total() == counts().iter().sum()`. Storage grows on demand
/// to the next multiple of [`HISTOGRAM_ROUNDING`] and never shrinks, so
/// `counts()` may carry trailing zeros.
#[derive(Debug, Clone, Default)]
pub struct Histogram {
    counts: Vec<u32>,
    total: u64,
}

impl Histogram {
    /// Creates an empty histogram.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a histogram from static counts.
    #[must_use]
    pub fn from_counts(counts: &[u32]) -> Self {
        Self {
            counts: counts.to_vec(),
            total: counts.iter().map(|&c| u64::from(c)).sum(),
        }
    }

    /// Removes all counts.
    pub fn clear(&mut self) {
        self.counts.clear();
        self.total = 0;
    }

    /// Records one occurrence of `symbol`.
    #[inline]
    pub fn add(&mut self, symbol: usize) {
        if self.counts.len() <= symbol {
            let len = (symbol + 1).div_ceil(HISTOGRAM_ROUNDING) * HISTOGRAM_ROUNDING;
            self.counts.resize(len, 0);
        }
        self.counts[symbol] += 1;
        self.total += 1;
    }

    /// Adds `other` pointwise.
    pub fn add_histogram(&mut self, other: &Histogram) {
        if other.counts.len() > self.counts.len() {
            self.counts.resize(other.counts.len(), 0);
        }
        for (dst, &src) in self.counts.iter_mut().zip(&other.counts) {
            *dst += src;
        }
        self.total += other.total;
    }

    /// Returns the sum of `self` and `other`.
    #[must_use]
    pub fn combined(&self, other: &Histogram) -> Histogram {
        let mut out = self.clone();
        out.add_histogram(other);
        out
    }

    /// Raw counts, possibly padded with zeros.
    pub fn counts(&self) -> &[u32] {
        &self.counts
    }

    /// Count for `symbol` (zero beyond the stored range).
    pub fn count(&self, symbol: usize) -> u32 {
        self.counts.get(symbol).copied().unwrap_or(0)
    }

    /// Sum of all counts.
    pub fn total(&self) -> u64 {
        self.total
    }

    /// True if nothing has been counted.
    pub fn is_empty(&self) -> bool {
        self.total == 0
    }

    /// One past the largest symbol with a nonzero count.
    pub fn alphabet_size(&self) -> usize {
        self.counts
            .iter()
            .rposition(|&c| c > 0)
            .map_or(0, |last| last + 1)
    }

    /// Number of symbols with a nonzero count.
    pub fn num_used_symbols(&self) -> usize {
        self.counts.iter().filter(|&&c| c > 0).count()
    }

    /// Total Shannon information of the counted data, in bits.
    pub fn shannon_entropy_bits(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        let total = self.total as f64;
        self.counts
            .iter()
            .filter(|&&c| c > 0)
            .map(|&c| {
                let c = f64::from(c);
                -c * (c / total).log2()
            })
            .sum()
    }
}

/// Histograms compare equal when they hold the same counts, regardless of
/// trailing zero padding.
impl PartialEq for Histogram {
    fn eq(&self, other: &Self) -> bool {
        let len = self.alphabet_size();
        self.total == other.total
            && len == other.alphabet_size()
            && self.counts[..len] == other.counts[..len]
    }
}

impl Eq for Histogram {}

/// Routes tokens into per-context (or per-cluster) histograms.
#[derive(Debug, Clone)]
pub struct HistogramBuilder<'a> {
    context_map: Option<&'a ContextMap>,
    config: HybridUintConfig,
    histograms: Vec<Histogram>,
}

impl<'a> HistogramBuilder<'a> {
    /// Creates a builder with one histogram per raw context.
    #[must_use]
    pub fn new(num_contexts: usize) -> Self {
        Self {
            context_map: None,
            config: HybridUintConfig::default(),
            histograms: vec![Histogram::new(); num_contexts],
        }
    }

    /// Creates a builder with one histogram per cluster of `context_map`.
    #[must_use]
    pub fn with_context_map(context_map: &'a ContextMap) -> Self {
        Self {
            context_map: Some(context_map),
            config: HybridUintConfig::default(),
            histograms: vec![Histogram::new(); context_map.num_clusters()],
        }
    }

    /// Sets the tokenizer used by [`HistogramBuilder::add_token`].
    #[must_use]
    pub fn hybrid_uint(mut self, config: HybridUintConfig) -> Self {
        self.config = config;
        self
    }

    /// Number of histograms being filled.
    pub fn num_histograms(&self) -> usize {
        self.histograms.len()
    }

    /// Counts `symbol` in histogram `context`.
    ///
    /// # Errors
    /// Returns [`Error::ContextOutOfRange`] if `context` has no histogram.
    pub fn add_symbol(&mut self, symbol: usize, context: usize) -> Result<()> {
        let num_contexts = self.histograms.len();
        let histogram = self
            .histograms
            .get_mut(context)
            .ok_or(Error::ContextOutOfRange {
                context,
                num_contexts,
            })?;
        histogram.add(symbol);
        Ok(())
    }

    /// Tokenizes `token.value` and counts the token in its context's histogram.
    pub fn add_token(&mut self, token: &Token) -> Result<()> {
        let hybrid = self.config.encode(token.value);
        let context = match self.context_map {
            Some(map) => map.cluster(token.context as usize)?,
            None => token.context as usize,
        };
        self.add_symbol(hybrid.token as usize, context)
    }

    /// Adds every token in order.
    pub fn add_tokens(&mut self, tokens: &[Token]) -> Result<()> {
        tokens.iter().try_for_each(|t| self.add_token(t))
    }

    /// Histograms built so far.
    pub fn histograms(&self) -> &[Histogram] {
        &self.histograms
    }

    /// Consumes the builder.
    #[must_use]
    pub fn into_histograms(self) -> Vec<Histogram> {
        self.histograms
    }
}

/// Builds one histogram per raw context (or per cluster when a context map
/// is supplied) from `tokens`.
pub fn build_histograms(
    context_map: Option<&ContextMap>,
    num_contexts: usize,
    config: HybridUintConfig,
    tokens: &[Token],
) -> Result<Vec<Histogram>> {
    let mut builder = match context_map {
        Some(map) => HistogramBuilder::with_context_map(map),
        None => HistogramBuilder::new(num_contexts),
    }
    .hybrid_uint(config);
    builder.add_tokens(tokens)?;
    tracing::trace!(
        tokens = tokens.len(),
        histograms = builder.num_histograms(),
        "built histograms"
    );
    Ok(builder.into_histograms())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_grows_in_blocks() {
        let mut h = Histogram::new();
        h.add(0);
        assert_eq!(h.counts().len(), HISTOGRAM_ROUNDING);
        h.add(8);
        assert_eq!(h.counts().len(), 2 * HISTOGRAM_ROUNDING);
        h.add(3);
        assert_eq!(h.counts().len(), 2 * HISTOGRAM_ROUNDING);
        assert_eq!(h.total(), 3);
        assert_eq!(h.alphabet_size(), 9);
    }

    #[test]
    fn test_from_counts_total() {
        let h = Histogram::from_counts(&[5, 0, 3, 2]);
        assert_eq!(h.total(), 10);
        assert_eq!(h.num_used_symbols(), 3);
        assert_eq!(h.count(7), 0);
    }

    #[test]
    fn test_entropy_of_uniform() {
        let h = Histogram::from_counts(&[4, 4, 4, 4]);
        assert!((h.shannon_entropy_bits() - 32.0).abs() < 1e-9);
        assert_eq!(Histogram::new().shannon_entropy_bits(), 0.0);
    }

    #[test]
    fn test_builder_rejects_out_of_range_context() {
        let mut builder = HistogramBuilder::new(2);
        builder.add_symbol(1, 1).unwrap();
        let err = builder.add_symbol(1, 2).unwrap_err();
        assert!(matches!(
            err,
            Error::ContextOutOfRange {
                context: 2,
                num_contexts: 2
            }
        ));
    }

    #[test]
    fn test_builder_routes_through_context_map() {
        let map = ContextMap::new(vec![0, 1, 0]).unwrap();
        let mut builder = HistogramBuilder::with_context_map(&map);
        builder
            .add_tokens(&[Token::new(0, 1), Token::new(2, 1), Token::new(1, 3)])
            .unwrap();
        let hs = builder.into_histograms();
        assert_eq!(hs.len(), 2);
        assert_eq!(hs[0].count(1), 2);
        assert_eq!(hs[1].count(3), 1);
    }

    #[test]
    fn test_builder_tokenizes_values() {
        let hs = build_histograms(None, 1, HybridUintConfig::default(), &[Token::new(0, 1000)])
            .unwrap();
        let expected = HybridUintConfig::default().encode(1000).token as usize;
        assert_eq!(hs[0].count(expected), 1);
        assert_eq!(hs[0].total(), 1);
    }

    fn any_histogram() -> impl Strategy<Value = Histogram> {
        prop::collection::vec(0u32..1000, 0..40).prop_map(|c| Histogram::from_counts(&c))
    }

    proptest! {
        #[test]
        fn prop_add_histogram_commutative(a in any_histogram(), b in any_histogram()) {
            prop_assert_eq!(a.combined(&b), b.combined(&a));
        }

        #[test]
        fn prop_add_histogram_associative(
            a in any_histogram(),
            b in any_histogram(),
            c in any_histogram(),
        ) {
            prop_assert_eq!(a.combined(&b).combined(&c), a.combined(&b.combined(&c)));
        }

        #[test]
        fn prop_merge_sums(a in any_histogram(), b in any_histogram()) {
            let m = a.combined(&b);
            prop_assert_eq!(m.total(), a.total() + b.total());
            for i in 0..m.counts().len() {
                prop_assert_eq!(m.count(i), a.count(i) + b.count(i));
            }
            prop_assert_eq!(m.total(), m.counts().iter().map(|&c| u64::from(c)).sum::<u64>());
        }
    }
}
