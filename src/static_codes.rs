//! Compiled-in prefix codes for DC and AC symbols.
//!
//! Only the depths are stored; canonical codewords are derived once on first
//! use and shared for the rest of the process.

use std::fmt::Write as _;
use std::str::FromStr;
use std::sync::OnceLock;

use crate::error::{Error, Result};
use crate::extend::extend_prefix_code;
use crate::huffman::{depths_to_codes, PrefixCode};

/// Alphabet size of every compiled-in code.
pub const STATIC_ALPHABET_SIZE: usize = 16;

// Stand-in depth tables: complete codes of the right shape, not tuned on
// real image statistics. Replace with measured tables before shipping streams.
const DC_DEPTHS: [[u8; STATIC_ALPHABET_SIZE]; 2] = [
    [2, 2, 3, 3, 4, 4, 5, 5, 6, 6, 7, 7, 8, 8, 8, 8],
    [2, 3, 3, 4, 4, 4, 4, 5, 5, 5, 5, 5, 5, 5, 6, 6],
];

const AC_DEPTHS: [[u8; STATIC_ALPHABET_SIZE]; 3] = [
    [1, 2, 4, 4, 5, 5, 6, 6, 7, 7, 8, 8, 9, 9, 9, 9],
    [4; STATIC_ALPHABET_SIZE],
    [1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15, 15],
];

/// Which family of compiled-in codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StaticCodeKind {
    /// Codes for DC coefficients.
    Dc,
    /// Codes for AC coefficients.
    Ac,
}

impl StaticCodeKind {
    /// Name used in generated tables.
    pub fn name(self) -> &'static str {
        match self {
            StaticCodeKind::Dc => "DC",
            StaticCodeKind::Ac => "AC",
        }
    }
}

impl FromStr for StaticCodeKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "DC" => Ok(StaticCodeKind::Dc),
            "AC" => Ok(StaticCodeKind::Ac),
            _ => Err(Error::InvalidConfig("code type must be DC or AC")),
        }
    }
}

fn build(depths: &[[u8; STATIC_ALPHABET_SIZE]]) -> Vec<PrefixCode> {
    depths
        .iter()
        .map(|d| PrefixCode::from_parts(d.to_vec(), depths_to_codes(d)))
        .collect()
}

/// The compiled-in codes of `kind`.
pub fn static_prefix_codes(kind: StaticCodeKind) -> &'static [PrefixCode] {
    static DC: OnceLock<Vec<PrefixCode>> = OnceLock::new();
    static AC: OnceLock<Vec<PrefixCode>> = OnceLock::new();
    match kind {
        StaticCodeKind::Dc => DC.get_or_init(|| build(&DC_DEPTHS)),
        StaticCodeKind::Ac => AC.get_or_init(|| build(&AC_DEPTHS)),
    }
}

/// Copies of the codes of `kind`, each extended to `new_alphabet_size`.
pub fn extend_static_codes(kind: StaticCodeKind, new_alphabet_size: usize) -> Result<Vec<PrefixCode>> {
    static_prefix_codes(kind)
        .iter()
        .map(|code| {
            let mut code = code.clone();
            extend_prefix_code(&mut code, new_alphabet_size)?;
            Ok(code)
        })
        .collect()
}

/// Renders `codes` as a source table: depths 16 per line, codewords 8 per line.
pub fn format_codes(kind: StaticCodeKind, codes: &[PrefixCode]) -> Result<String> {
    let name = kind.name();
    let mut out = String::new();
    writeln!(out, "static constexpr size_t kNum{name}PrefixCodes = {};", codes.len())?;
    writeln!(
        out,
        "static constexpr PrefixCode k{name}PrefixCodes[kNum{name}PrefixCodes] = {{"
    )?;
    for code in codes {
        let n = code.alphabet_size();
        writeln!(out, "    {{{{")?;
        for (j, d) in code.depths().iter().enumerate() {
            let lead = if j % 16 == 0 { "         " } else { " " };
            let end = if j % 16 == 15 || j + 1 == n { "\n" } else { "" };
            write!(out, "{lead}{d:2},{end}")?;
        }
        writeln!(out, "     }},")?;
        writeln!(out, "     {{")?;
        for (j, b) in code.bits().iter().enumerate() {
            let lead = if j % 8 == 0 { "         " } else { " " };
            let end = if j % 8 == 7 || j + 1 == n { "\n" } else { "" };
            write!(out, "{lead}0x{b:04x},{end}")?;
        }
        writeln!(out, "     }}}},")?;
    }
    writeln!(out, "}};")?;
    Ok(out)
}
