//! Annotated rendering of the AC context map.
//!
//! The map starts with `37 * 4` entries for the number-of-nonzeros contexts
//! (37 predicted counts times 4 block contexts), followed by one zero-density
//! section of 458 entries per block context.

use std::fmt::Write as _;

use crate::error::{Error, Result};

const NUM_BLOCK_CTXS: usize = 4;
const NUM_NZ_PRED_CTXS: usize = 37;
const ZERO_DENSITY_CTXS: usize = 458;

/// Number of entries [`format_ac_context_map`] reads.
pub const AC_CONTEXT_MAP_SIZE: usize =
    NUM_NZ_PRED_CTXS * NUM_BLOCK_CTXS + NUM_BLOCK_CTXS * ZERO_DENSITY_CTXS;

const CTX_PER_NZ_BUCKET: [usize; 8] = [31, 31, 31, 30, 29, 28, 26, 23];
const LAST_LINE_FROM: [usize; 8] = [48, 48, 48, 48, 48, 48, 32, 24];
const LAST_LINE_TO: [usize; 8] = [63, 63, 63, 59, 55, 51, 43, 31];
const NONZEROS_LEFT: [usize; 9] = [1, 2, 3, 5, 9, 13, 21, 33, 64];

const LINE_COMMENTS: [&str; 8] = [
    "  // k:  1 -  3\n",
    "  // k:  4 -  7\n",
    "  // k:  8 - 11\n",
    "  // k: 12 - 15\n",
    "  // k: 16 - 23\n",
    "  // k: 24 - 31\n",
    "  // k: 32 - 47\n",
    "  // k: 48 - 63\n",
];

const BLOCK_CONTEXTS: [&str; NUM_BLOCK_CTXS] = [
    "8x8 Y",
    "8x16 and 16x8 Y",
    "8x8 X and B",
    "8x16 and 16x8 X and B",
];

/// Renders `context_map` as an annotated source table.
///
/// # Errors
/// Returns [`Error::ContextMapTooShort`] if the map has fewer than
/// [`AC_CONTEXT_MAP_SIZE`] entries.
pub fn format_ac_context_map(context_map: &[u8]) -> Result<String> {
    if context_map.len() < AC_CONTEXT_MAP_SIZE {
        return Err(Error::ContextMapTooShort {
            len: context_map.len(),
            required: AC_CONTEXT_MAP_SIZE,
        });
    }
    let mut out = String::new();
    out.push_str("static constexpr uint8_t kACContextMap[] = {\n");
    out.push_str("    // Context map for number of nonzeros\n");
    out.push_str("    //   8x8   8x16  8x8   8x16\n");
    out.push_str("    //    Y     Y    X,B   X,B\n");
    for (i, &entry) in context_map[..NUM_NZ_PRED_CTXS * NUM_BLOCK_CTXS]
        .iter()
        .enumerate()
    {
        let bctx = i % NUM_BLOCK_CTXS;
        let pred_ctx = i / NUM_BLOCK_CTXS;
        if bctx == 0 {
            out.push_str("      ");
        }
        write!(out, " {entry:4},")?;
        if bctx + 1 == NUM_BLOCK_CTXS {
            match pred_ctx {
                0..=7 => writeln!(out, "    // pred: {pred_ctx:2}")?,
                8..=35 => writeln!(
                    out,
                    "    // pred: {:2} - {:2}",
                    2 * pred_ctx - 8,
                    2 * pred_ctx - 7
                )?,
                _ => out.push_str("    // pred: 64 -\n"),
            }
        }
    }

    for (bctx, name) in BLOCK_CONTEXTS.iter().enumerate() {
        out.push_str("\n    //\n");
        writeln!(out, "    // Zero density context map for {name} blocks")?;
        out.push_str("    //\n");
        let mut i = 0;
        for nzctx in 0..CTX_PER_NZ_BUCKET.len() {
            let left_min = NONZEROS_LEFT[nzctx];
            let left_max = NONZEROS_LEFT[nzctx + 1] - 1;
            if left_min == left_max {
                writeln!(out, "    // Nonzeros left: {left_min}")?;
            } else {
                writeln!(out, "    // Nonzeros left: {left_min} - {left_max}")?;
            }
            let last = CTX_PER_NZ_BUCKET[nzctx];
            let mut kctx = 0;
            while kctx <= last {
                if kctx % 4 == 0 {
                    out.push_str("   ");
                }
                if kctx == 0 {
                    out.push_str("          ");
                    kctx += 1;
                }
                for p in 0..2 {
                    let ctx = NUM_NZ_PRED_CTXS * NUM_BLOCK_CTXS
                        + bctx * ZERO_DENSITY_CTXS
                        + i * 2
                        + p;
                    write!(out, " {:2},", context_map[ctx])?;
                }
                if kctx == last {
                    while kctx % 4 != 3 {
                        out.push_str("          ");
                        kctx += 1;
                    }
                    writeln!(
                        out,
                        "  // k: {:2} - {:2}",
                        LAST_LINE_FROM[nzctx], LAST_LINE_TO[nzctx]
                    )?;
                } else if kctx % 4 == 3 {
                    out.push_str(LINE_COMMENTS[kctx / 4]);
                } else {
                    out.push_str("  ");
                }
                kctx += 1;
                i += 1;
            }
        }
    }
    out.push_str("};\n");
    Ok(out)
}

/// Writes the annotated table to `out`.
pub fn print_ac_context_map<W: std::io::Write>(context_map: &[u8], out: &mut W) -> Result<()> {
    out.write_all(format_ac_context_map(context_map)?.as_bytes())?;
    Ok(())
}
