//! Normalized distributions for range (ANS) coding.
//!
//! Observed counts are rescaled so they sum to exactly `2^log_tab_size`,
//! the coder's fixed total. Every observed symbol keeps a frequency of at
//! least one. [`AnsTable`] adds what the coder needs at run time: cumulative
//! starts, fixed-point reciprocals for division-free encoding, and a
//! slot-to-symbol lookup for decoding.

use crate::error::{Error, Result};
use crate::histogram::Histogram;

/// Default precision of the ANS tables used in streams.
pub const ANS_LOG_TAB_SIZE: u32 = 12;

/// Largest supported table precision (frequencies are stored as `u16`).
pub const MAX_LOG_TAB_SIZE: u32 = 15;

/// Largest alphabet an [`AnsTable`] can index.
pub const MAX_ALPHABET_SIZE: usize = 1 << 16;

/// Rescales `counts` so they sum to `1 << log_tab_size`.
///
/// Frequencies are rounded from `count * 2^log_tab_size / total`, raised to
/// one for every nonzero count, then nudged by ±1 (towards the symbols whose
/// rounding error is largest) until the sum is exact. Symbols with a zero
/// count get zero frequency.
///
/// An all-zero input yields a degenerate distribution giving symbol 0 the
/// whole table.
///
/// # Errors
/// - [`Error::InvalidConfig`] if `log_tab_size` is outside `1..=15`.
/// - [`Error::AlphabetTooLarge`] if more symbols are used than slots exist.
pub fn normalize_counts(counts: &[u32], log_tab_size: u32) -> Result<Vec<u32>> {
    if !(1..=MAX_LOG_TAB_SIZE).contains(&log_tab_size) {
        return Err(Error::InvalidConfig("ANS precision must be in 1..=15"));
    }
    let table_size = 1u32 << log_tab_size;
    let total: u64 = counts.iter().map(|&c| u64::from(c)).sum();
    let mut freqs = vec![0u32; counts.len().max(1)];

    if total == 0 {
        freqs[0] = table_size;
        return Ok(freqs);
    }

    let used = counts.iter().filter(|&&c| c > 0).count();
    if used > table_size as usize {
        return Err(Error::AlphabetTooLarge {
            used,
            slots: table_size as usize,
        });
    }

    let scale = u64::from(table_size);
    for (f, &c) in freqs.iter_mut().zip(counts) {
        if c > 0 {
            let rounded = (2 * u64::from(c) * scale + total) / (2 * total);
            *f = rounded.max(1) as u32;
        }
    }

    // Positive error means the symbol got less than its exact share.
    let error = |i: usize, f: u32| -> i128 {
        i128::from(counts[i]) * i128::from(scale) - i128::from(f) * i128::from(total)
    };

    let mut sum: u64 = freqs.iter().map(|&f| u64::from(f)).sum();
    while sum < scale {
        let i = (0..counts.len())
            .filter(|&i| counts[i] > 0)
            .max_by(|&a, &b| error(a, freqs[a]).cmp(&error(b, freqs[b])).then(b.cmp(&a)))
            .ok_or(Error::InvalidConfig("no symbol to adjust"))?;
        freqs[i] += 1;
        sum += 1;
    }
    while sum > scale {
        let i = (0..counts.len())
            .filter(|&i| freqs[i] > 1)
            .min_by(|&a, &b| error(a, freqs[a]).cmp(&error(b, freqs[b])).then(a.cmp(&b)))
            .ok_or(Error::AlphabetTooLarge {
                used,
                slots: table_size as usize,
            })?;
        freqs[i] -= 1;
        sum -= 1;
    }
    Ok(freqs)
}

/// Encoding/decoding table of one ANS distribution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnsTable {
    log_tab_size: u32,
    freqs: Vec<u16>,
    cumulative: Vec<u32>,
    inverse_freqs: Vec<u64>,
    reverse_map: Vec<u16>,
}

impl AnsTable {
    /// Normalizes `histogram` and builds the table.
    pub fn from_histogram(histogram: &Histogram, log_tab_size: u32) -> Result<Self> {
        let len = histogram.alphabet_size();
        let freqs = normalize_counts(&histogram.counts()[..len], log_tab_size)?;
        Self::from_frequencies(&freqs, log_tab_size)
    }

    /// Builds a table from frequencies that already sum to `1 << log_tab_size`.
    ///
    /// # Errors
    /// Returns [`Error::InvalidStream`] if the frequencies do not sum to the
    /// table size, [`Error::InvalidConfig`] for an unsupported precision, and
    /// [`Error::AlphabetSizeExceeded`] if the alphabet cannot be indexed.
    pub fn from_frequencies(freqs: &[u32], log_tab_size: u32) -> Result<Self> {
        if !(1..=MAX_LOG_TAB_SIZE).contains(&log_tab_size) {
            return Err(Error::InvalidConfig("ANS precision must be in 1..=15"));
        }
        if freqs.len() > MAX_ALPHABET_SIZE {
            return Err(Error::AlphabetSizeExceeded {
                size: freqs.len(),
                max: MAX_ALPHABET_SIZE,
            });
        }
        let table_size = 1u32 << log_tab_size;
        let sum: u64 = freqs.iter().map(|&f| u64::from(f)).sum();
        if sum != u64::from(table_size) {
            return Err(Error::InvalidStream("frequencies do not sum to table size"));
        }

        let mut cumulative = Vec::with_capacity(freqs.len());
        let mut inverse_freqs = Vec::with_capacity(freqs.len());
        let mut reverse_map = Vec::with_capacity(table_size as usize);
        let mut start = 0u32;
        for (symbol, &f) in freqs.iter().enumerate() {
            cumulative.push(start);
            inverse_freqs.push(if f == 0 {
                0
            } else {
                ((1u64 << (32 + log_tab_size)) + u64::from(f) - 1) / u64::from(f)
            });
            reverse_map.extend(std::iter::repeat(symbol as u16).take(f as usize));
            start += f;
        }

        Ok(Self {
            log_tab_size,
            freqs: freqs.iter().map(|&f| f as u16).collect(),
            cumulative,
            inverse_freqs,
            reverse_map,
        })
    }

    /// Table precision in bits.
    pub fn log_tab_size(&self) -> u32 {
        self.log_tab_size
    }

    /// `1 << log_tab_size`.
    pub fn table_size(&self) -> u32 {
        1 << self.log_tab_size
    }

    /// Number of symbols described (the last one has nonzero frequency
    /// unless the table is degenerate).
    pub fn alphabet_size(&self) -> usize {
        self.freqs.len()
    }

    /// Frequency of `symbol` (zero outside the alphabet).
    #[inline]
    pub fn freq(&self, symbol: usize) -> u32 {
        self.freqs.get(symbol).map_or(0, |&f| u32::from(f))
    }

    /// All frequencies.
    pub fn frequencies(&self) -> &[u16] {
        &self.freqs
    }

    /// First slot owned by `symbol`.
    #[inline]
    pub fn cumulative(&self, symbol: usize) -> u32 {
        self.cumulative[symbol]
    }

    /// Fractional bits of [`AnsTable::inverse_freq`].
    ///
    /// With `32 + log_tab_size` bits, `(x * inverse_freq) >> precision`
    /// equals `x / freq` for every renormalized state `x < freq << (32 - log_tab_size)`.
    #[inline]
    pub fn reciprocal_precision(&self) -> u32 {
        32 + self.log_tab_size
    }

    /// `ceil(2^reciprocal_precision / freq)`, or zero for unused symbols.
    #[inline]
    pub fn inverse_freq(&self, symbol: usize) -> u64 {
        self.inverse_freqs[symbol]
    }

    /// `x / freq(symbol)` computed with the stored reciprocal.
    #[inline]
    pub fn divide(&self, x: u32, symbol: usize) -> u32 {
        ((u128::from(x) * u128::from(self.inverse_freqs[symbol])) >> self.reciprocal_precision())
            as u32
    }

    /// Symbol owning `slot`.
    #[inline]
    pub fn symbol_for_slot(&self, slot: u32) -> usize {
        usize::from(self.reverse_map[slot as usize])
    }

    /// The symbol holding the whole table, if there is one.
    pub fn single_symbol(&self) -> Option<usize> {
        let table_size = self.table_size();
        self.freqs
            .iter()
            .position(|&f| u32::from(f) == table_size)
    }

    /// Estimated cost in bits of coding `histogram` with this table.
    pub fn estimate_bits(&self, histogram: &Histogram) -> f64 {
        let log_tab = f64::from(self.log_tab_size);
        histogram
            .counts()
            .iter()
            .enumerate()
            .filter(|&(_, &c)| c > 0)
            .map(|(s, &c)| match self.freq(s) {
                0 => f64::INFINITY,
                f => f64::from(c) * (log_tab - f64::from(f).log2()),
            })
            .sum()
    }
}
