//! Length-limited canonical prefix codes.
//!
//! Depths come from a Huffman tree whose leaf weights are floored at a
//! `count_limit`; whenever the tree is deeper than the limit the floor is
//! doubled and the tree rebuilt, which flattens the rare tail until it fits.
//! Codewords are then assigned canonically (by depth, ties by ascending
//! symbol id), so a decoder can rebuild them from the depth table alone.
//!
//! Codewords are stored bit-reversed, ready for an LSB-first [`BitWriter`]:
//! writing `bits[s]` with `depths[s]` bits puts the canonical codeword on
//! the wire most significant bit first.

use std::collections::BinaryHeap;

use crate::bit_io::{BitReader, BitWriter};
use crate::error::{Error, Result};
use crate::histogram::Histogram;

/// Maximum codeword length.
pub const MAX_PREFIX_DEPTH: u8 = 15;

/// Huffman tree node.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Node {
    Leaf {
        symbol: usize,
        weight: u64,
    },
    Internal {
        left: Box<Node>,
        right: Box<Node>,
        weight: u64,
        order: usize,
    },
}

impl Node {
    fn weight(&self) -> u64 {
        match self {
            Node::Leaf { weight, .. } => *weight,
            Node::Internal { weight, .. } => *weight,
        }
    }

    /// Creation order; leaves sort by symbol, internal nodes after all leaves.
    fn order(&self) -> usize {
        match self {
            Node::Leaf { symbol, .. } => *symbol,
            Node::Internal { order, .. } => *order,
        }
    }
}

impl Ord for Node {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        // Min-priority queue, deterministic on ties.
        (other.weight(), other.order()).cmp(&(self.weight(), self.order()))
    }
}

impl PartialOrd for Node {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

/// Computes code depths for `counts`, none deeper than `tree_limit`.
///
/// Symbols with a zero count get depth 0. When at most one symbol is used,
/// every depth is 0: the lone symbol costs nothing to code.
///
/// # Errors
/// Returns [`Error::AlphabetTooLarge`] if more symbols are used than a tree
/// of depth `tree_limit` can hold.
pub fn create_huffman_tree(counts: &[u32], tree_limit: u8) -> Result<Vec<u8>> {
    let mut depths = vec![0u8; counts.len()];
    let used: Vec<usize> = (0..counts.len()).filter(|&s| counts[s] > 0).collect();
    if used.len() <= 1 {
        return Ok(depths);
    }
    let capacity = 1usize << tree_limit.min(31);
    if used.len() > capacity {
        return Err(Error::AlphabetTooLarge {
            used: used.len(),
            slots: capacity,
        });
    }

    let mut count_limit = 1u64;
    loop {
        let mut pq: BinaryHeap<Node> = used
            .iter()
            .map(|&symbol| Node::Leaf {
                symbol,
                weight: u64::from(counts[symbol]).max(count_limit),
            })
            .collect();

        let mut order = counts.len();
        while pq.len() > 1 {
            let (Some(left), Some(right)) = (pq.pop(), pq.pop()) else {
                break;
            };
            let weight = left.weight() + right.weight();
            pq.push(Node::Internal {
                left: Box::new(left),
                right: Box::new(right),
                weight,
                order,
            });
            order += 1;
        }

        let Some(root) = pq.pop() else {
            return Ok(depths);
        };
        let max_depth = assign_depths(&root, &mut depths);
        if max_depth <= usize::from(tree_limit) {
            tracing::trace!(
                symbols = used.len(),
                max_depth,
                count_limit,
                "built length-limited prefix code"
            );
            return Ok(depths);
        }
        count_limit *= 2;
    }
}

/// Writes leaf depths into `depths` and returns the deepest level.
fn assign_depths(root: &Node, depths: &mut [u8]) -> usize {
    let mut max_depth = 0usize;
    let mut stack = vec![(root, 0usize)];
    while let Some((node, depth)) = stack.pop() {
        match node {
            Node::Leaf { symbol, .. } => {
                depths[*symbol] = depth.min(usize::from(u8::MAX)) as u8;
                max_depth = max_depth.max(depth);
            }
            Node::Internal { left, right, .. } => {
                stack.push((right, depth + 1));
                stack.push((left, depth + 1));
            }
        }
    }
    max_depth
}

/// Reverses the low `len` bits of `code`.
#[inline]
fn reverse_bits(code: u32, len: u8) -> u16 {
    if len == 0 {
        return 0;
    }
    (code.reverse_bits() >> (32 - u32::from(len))) as u16
}

/// Assigns canonical codewords to `depths` (ties broken by ascending symbol
/// id) and returns them bit-reversed for LSB-first emission.
pub fn depths_to_codes(depths: &[u8]) -> Vec<u16> {
    let mut bl_count = [0u32; MAX_PREFIX_DEPTH as usize + 1];
    for &d in depths {
        if d > 0 {
            bl_count[usize::from(d.min(MAX_PREFIX_DEPTH))] += 1;
        }
    }
    let mut next_code = [0u32; MAX_PREFIX_DEPTH as usize + 1];
    let mut code = 0u32;
    for len in 1..=MAX_PREFIX_DEPTH as usize {
        code = (code + bl_count[len - 1]) << 1;
        next_code[len] = code;
    }
    depths
        .iter()
        .map(|&d| {
            if d == 0 || d > MAX_PREFIX_DEPTH {
                return 0;
            }
            let canonical = next_code[usize::from(d)];
            next_code[usize::from(d)] += 1;
            reverse_bits(canonical, d)
        })
        .collect()
}

/// Kraft sum of `depths` in units of `2^-15` (complete codes sum to `2^15`).
pub fn kraft_sum(depths: &[u8]) -> u64 {
    depths
        .iter()
        .filter(|&&d| d > 0 && d <= MAX_PREFIX_DEPTH)
        .map(|&d| 1u64 << (MAX_PREFIX_DEPTH - d))
        .sum()
}

/// A canonical prefix code: per-symbol depths and (bit-reversed) codewords.
///
/// When no symbol has a nonzero depth the code is degenerate and stands for
/// its last symbol, which is coded with zero bits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrefixCode {
    depths: Vec<u8>,
    bits: Vec<u16>,
}

impl PrefixCode {
    /// Builds a length-limited code for `histogram`.
    pub fn from_histogram(histogram: &Histogram) -> Result<Self> {
        let len = histogram.alphabet_size().max(1);
        let counts: Vec<u32> = (0..len).map(|s| histogram.count(s)).collect();
        let depths = create_huffman_tree(&counts, MAX_PREFIX_DEPTH)?;
        let bits = depths_to_codes(&depths);
        Ok(Self { depths, bits })
    }

    /// Builds the canonical code for `depths`.
    ///
    /// # Errors
    /// Returns [`Error::InvalidStream`] if a depth exceeds
    /// [`MAX_PREFIX_DEPTH`] or the coded symbols do not form a complete code.
    pub fn from_depths(depths: Vec<u8>) -> Result<Self> {
        if depths.is_empty() {
            return Err(Error::InvalidStream("empty prefix code"));
        }
        if depths.iter().any(|&d| d > MAX_PREFIX_DEPTH) {
            return Err(Error::InvalidStream("prefix code depth above 15"));
        }
        let coded = depths.iter().filter(|&&d| d > 0).count();
        if coded > 0 && kraft_sum(&depths) != 1 << MAX_PREFIX_DEPTH {
            return Err(Error::InvalidStream("incomplete prefix code"));
        }
        let bits = depths_to_codes(&depths);
        Ok(Self { depths, bits })
    }

    /// Assembles a code from parts without validation.
    pub(crate) fn from_parts(depths: Vec<u8>, bits: Vec<u16>) -> Self {
        Self { depths, bits }
    }

    /// Per-symbol code lengths.
    pub fn depths(&self) -> &[u8] {
        &self.depths
    }

    /// Per-symbol codewords, bit-reversed for LSB-first writing.
    pub fn bits(&self) -> &[u16] {
        &self.bits
    }

    /// Number of symbols described.
    pub fn alphabet_size(&self) -> usize {
        self.depths.len()
    }

    /// Number of symbols with a nonzero depth.
    pub fn num_coded(&self) -> usize {
        self.depths.iter().filter(|&&d| d > 0).count()
    }

    /// The symbol a degenerate code stands for.
    pub fn single_symbol(&self) -> Option<usize> {
        if self.num_coded() == 0 {
            self.depths.len().checked_sub(1)
        } else {
            None
        }
    }

    /// True if the coded symbols satisfy the Kraft equality.
    pub fn is_complete(&self) -> bool {
        kraft_sum(&self.depths) == 1 << MAX_PREFIX_DEPTH
    }

    /// Writes the codeword of `symbol`.
    ///
    /// # Errors
    /// Returns [`Error::ZeroFrequency`] if `symbol` has no codeword.
    #[inline]
    pub fn write_symbol(&self, symbol: usize, writer: &mut BitWriter) -> Result<()> {
        match self.depths.get(symbol) {
            Some(&d) if d > 0 => {
                writer.write_bits(u64::from(self.bits[symbol]), u32::from(d));
                Ok(())
            }
            _ if self.single_symbol() == Some(symbol) => Ok(()),
            _ => Err(Error::ZeroFrequency(symbol)),
        }
    }

    /// Estimated cost in bits of coding `histogram` with this code.
    pub fn estimate_bits(&self, histogram: &Histogram) -> f64 {
        let single = self.single_symbol();
        histogram
            .counts()
            .iter()
            .enumerate()
            .filter(|&(_, &c)| c > 0)
            .map(|(s, &c)| match self.depths.get(s) {
                Some(&d) if d > 0 => f64::from(c) * f64::from(d),
                _ if single == Some(s) => 0.0,
                _ => f64::INFINITY,
            })
            .sum()
    }
}

/// Canonical decoder rebuilt from a depth table.
#[derive(Debug, Clone)]
pub struct PrefixDecoder {
    single: Option<usize>,
    count: [u16; MAX_PREFIX_DEPTH as usize + 1],
    symbols: Vec<u16>,
}

impl PrefixDecoder {
    /// Builds the decoder for `code`.
    pub fn new(code: &PrefixCode) -> Self {
        let mut count = [0u16; MAX_PREFIX_DEPTH as usize + 1];
        for &d in code.depths() {
            if d > 0 {
                count[usize::from(d)] += 1;
            }
        }
        let mut symbols: Vec<u16> = (0..code.alphabet_size())
            .filter(|&s| code.depths()[s] > 0)
            .map(|s| s as u16)
            .collect();
        symbols.sort_by_key(|&s| code.depths()[usize::from(s)]);
        Self {
            single: code.single_symbol(),
            count,
            symbols,
        }
    }

    /// Reads one symbol, most significant codeword bit first.
    pub fn read_symbol(&self, reader: &mut BitReader<'_>) -> Result<usize> {
        if let Some(symbol) = self.single {
            return Ok(symbol);
        }
        let mut code = 0u32;
        let mut first = 0u32;
        let mut index = 0u32;
        for len in 1..=MAX_PREFIX_DEPTH as usize {
            code |= reader.read_bits(1)?;
            let count = u32::from(self.count[len]);
            if code < first + count {
                return Ok(usize::from(self.symbols[(index + code - first) as usize]));
            }
            index += count;
            first = (first + count) << 1;
            code <<= 1;
        }
        Err(Error::InvalidStream("prefix codeword longer than 15 bits"))
    }
}
