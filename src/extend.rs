//! Extension of a fixed prefix code to a larger alphabet.
//!
//! Every depth `d` is turned back into the population count `2^(15 - d)` it
//! stands for; a complete code sums to exactly `2^15`. The new symbols get a
//! count of one, and depths and codewords are rebuilt from scratch with the
//! usual length limit. Existing symbols therefore keep (almost) their old
//! probabilities while the new ones become long, rare codewords.

use crate::error::{Error, Result};
use crate::huffman::{create_huffman_tree, depths_to_codes, PrefixCode, MAX_PREFIX_DEPTH};

/// Extends `code` in place to `new_alphabet_size` symbols.
///
/// # Errors
/// - [`Error::LengthMismatch`] if the depth and codeword arrays differ in length.
/// - [`Error::AlphabetNotLarger`] if `new_alphabet_size` does not grow the code.
/// - [`Error::InvalidPopulation`] if the depths do not describe a complete
///   code of depth at most 15.
pub fn extend_prefix_code(code: &mut PrefixCode, new_alphabet_size: usize) -> Result<()> {
    let alphabet_size = code.depths().len();
    if code.bits().len() != alphabet_size {
        return Err(Error::LengthMismatch {
            depths: alphabet_size,
            codewords: code.bits().len(),
        });
    }
    if new_alphabet_size <= alphabet_size {
        return Err(Error::AlphabetNotLarger {
            requested: new_alphabet_size,
            current: alphabet_size,
        });
    }

    let expected = 1u64 << MAX_PREFIX_DEPTH;
    let mut counts = vec![1u32; new_alphabet_size];
    let mut total = 0u64;
    for (count, &depth) in counts.iter_mut().zip(code.depths()) {
        if depth > MAX_PREFIX_DEPTH {
            return Err(Error::InvalidPopulation { total, expected });
        }
        *count = 1 << (MAX_PREFIX_DEPTH - depth);
        total += u64::from(*count);
    }
    if total != expected {
        return Err(Error::InvalidPopulation { total, expected });
    }

    let depths = create_huffman_tree(&counts, MAX_PREFIX_DEPTH)?;
    let bits = depths_to_codes(&depths);
    tracing::debug!(
        from = alphabet_size,
        to = new_alphabet_size,
        max_depth = depths.iter().copied().max().unwrap_or(0),
        "extended prefix code"
    );
    *code = PrefixCode::from_parts(depths, bits);
    Ok(())
}
