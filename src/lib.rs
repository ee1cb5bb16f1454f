//! # Entropy coding for an image codec
//!
//! *Per-context statistics in, compact and exactly decodable bits out.*
//!
//! ## Intuition First
//!
//! An image encoder produces a long list of small integers (coefficient
//! magnitudes, transform choices, correlation factors), each tagged with a
//! *context* describing where it came from. Values from the same context
//! tend to look alike, so we count them per context, turn the counts into a
//! probability model, and spend fewer bits on what is common.
//!
//! ## The Problem
//!
//! - Values can be huge, but a model over millions of symbols is useless.
//!   A **hybrid integer** split keeps a small token for the model and sends
//!   the rest as raw bits.
//! - Hundreds of contexts each with their own model cost too much header.
//!   A **context map** clusters contexts with similar statistics.
//! - Two code families trade speed for rate: **ANS** gets within a fraction
//!   of a bit of the entropy, **prefix codes** are simpler and faster.
//!
//! ## Pipeline
//!
//! ```text
//! Token { context, value }
//!   -> HybridUintConfig::encode      (token, nbits, bits)
//!   -> HistogramBuilder              one histogram per context / cluster
//!   -> cluster_histograms            at most 256 models
//!   -> AnsTable | PrefixCode         EncodingModel per cluster
//!   -> write_histograms, write_tokens
//! ```
//!
//! The decoder mirrors every step: [`EntropyDecoder`] reads the context map
//! and models, then returns values one context at a time. ANS streams end
//! with a state check, so corruption is reported rather than silently
//! decoded.
//!
//! ## Mathematical Formulation
//!
//! With frequencies $f_s$ summing to $M = 2^k$ and cumulative starts $c_s$,
//! rANS encodes symbol $s$ into state $x$ as
//!
//! ```text
//! C(x, s) = floor(x / f_s) * M + (x mod f_s) + c_s
//! ```
//!
//! Prefix codes are canonical with depths limited to 15, so they are fully
//! described by their depth table and satisfy the Kraft equality
//! $\sum_s 2^{-d_s} = 1$.
//!
//! ## Failure Modes
//!
//! 1. **Crowded alphabets**: more used symbols than ANS slots cannot be
//!    normalized; use a larger precision or prefix codes.
//! 2. **Stale models**: coding a token that was not counted when the model
//!    was built is rejected as a zero-frequency symbol.
//!
//! ## Offline tooling
//!
//! The `update_static_codes` binary extends the compiled-in DC/AC prefix
//! codes ([`static_codes`]) to a larger alphabet and prints the new tables.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod ac_strategy;
pub mod bit_io;
pub mod chroma_from_luma;
pub mod context_map;
pub mod distribution;
pub mod error;
pub mod extend;
pub mod histogram;
pub mod huffman;
pub mod hybrid_uint;
pub mod printer;
pub mod rans;
pub mod static_codes;
pub mod stream;

pub use ac_strategy::{AcStrategy, AcStrategyImage, AcStrategyType};
pub use bit_io::{BitReader, BitWriter};
pub use chroma_from_luma::ColorCorrelationMap;
pub use context_map::{cluster_histograms, ContextMap, MAX_CLUSTERS};
pub use distribution::{normalize_counts, AnsTable, ANS_LOG_TAB_SIZE};
pub use error::{Error, Result};
pub use extend::extend_prefix_code;
pub use histogram::{build_histograms, Histogram, HistogramBuilder};
pub use huffman::{create_huffman_tree, depths_to_codes, kraft_sum, PrefixCode, PrefixDecoder};
pub use hybrid_uint::{HybridToken, HybridUintConfig, Token};
pub use printer::format_ac_context_map;
pub use rans::{RansDecoder, RansEncoder};
pub use stream::{
    decode_tokens, encode_tokens, read_context_map, read_histograms, write_context_map,
    write_histograms, write_tokens, EncodingModel, EntropyConfig, EntropyDecoder,
    EntropyEncodingData,
};
