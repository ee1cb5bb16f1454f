//! Error types for the entropy-coding core.

use thiserror::Error;

/// Error variants for model building, emission and decoding.
#[derive(Debug, Error)]
pub enum Error {
    /// A token or symbol referenced a context outside the configured range.
    #[error("context {context} out of range (num_contexts = {num_contexts})")]
    ContextOutOfRange {
        /// Offending context id.
        context: usize,
        /// Number of configured contexts.
        num_contexts: usize,
    },

    /// Two arrays that must describe the same alphabet have different lengths.
    #[error("length mismatch: {depths} depths vs {codewords} codewords")]
    LengthMismatch {
        /// Number of bit depths.
        depths: usize,
        /// Number of codewords.
        codewords: usize,
    },

    /// Population counts derived from a prefix code do not sum to the expected total.
    #[error("invalid population: counts sum to {total}, expected {expected}")]
    InvalidPopulation {
        /// Actual sum of population counts.
        total: u64,
        /// Expected sum (a power of two).
        expected: u64,
    },

    /// The requested alphabet is not larger than the current one.
    #[error("new alphabet size {requested} must be greater than current size {current}")]
    AlphabetNotLarger {
        /// Requested alphabet size.
        requested: usize,
        /// Current alphabet size.
        current: usize,
    },

    /// More symbols are in use than the distribution has slots for.
    #[error("{used} symbols do not fit in a table of {slots} slots")]
    AlphabetTooLarge {
        /// Number of symbols with a nonzero count.
        used: usize,
        /// Number of table slots.
        slots: usize,
    },

    /// An alphabet is longer than a serialized model can describe.
    #[error("alphabet of {size} symbols exceeds the limit of {max}")]
    AlphabetSizeExceeded {
        /// Alphabet length, one past the largest symbol id.
        size: usize,
        /// Largest supported alphabet length.
        max: usize,
    },

    /// A symbol was coded with a model that gives it no probability.
    #[error("symbol {0} has zero frequency")]
    ZeroFrequency(usize),

    /// A configuration value is out of its supported range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(&'static str),

    /// A multi-block transform would overlap an already assigned block.
    #[error("block overlap at ({x}, {y})")]
    BlockOverlap {
        /// Block column.
        x: usize,
        /// Block row.
        y: usize,
    },

    /// A transform would extend past the edge of the strategy image.
    #[error("strategy at ({x}, {y}) does not fit in a {xsize}x{ysize} block image")]
    BlockOutOfBounds {
        /// Block column.
        x: usize,
        /// Block row.
        y: usize,
        /// Image width in blocks.
        xsize: usize,
        /// Image height in blocks.
        ysize: usize,
    },

    /// A raw strategy byte does not name a transform.
    #[error("invalid raw strategy {0}")]
    InvalidStrategy(u8),

    /// The bit reader ran out of input.
    #[error("unexpected end of bitstream")]
    UnexpectedEof,

    /// The bitstream does not describe a valid model or token.
    #[error("invalid bitstream: {0}")]
    InvalidStream(&'static str),

    /// The final ANS state does not match the initial signature.
    #[error("ANS state mismatch: got {0:#010x}")]
    CorruptState(u32),

    /// The context map is too short for annotated printing.
    #[error("context map has {len} entries, need at least {required}")]
    ContextMapTooShort {
        /// Provided length.
        len: usize,
        /// Required length.
        required: usize,
    },

    /// Formatting failed while rendering a table.
    #[error("format error: {0}")]
    Fmt(#[from] std::fmt::Error),

    /// An I/O error occurred while writing output.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// A specialized Result type for entropy-coding operations.
pub type Result<T> = std::result::Result<T, Error>;
