//! Range Asymmetric Numeral Systems (rANS).
//!
//! The state is a 32-bit integer kept in `[2^16, 2^32)` and renormalized in
//! 16-bit chunks. Symbols are encoded in reverse order; the decoder consumes
//! them forwards and must end in the same state the encoder started from,
//! which doubles as an integrity check.

use crate::bit_io::BitReader;
use crate::distribution::AnsTable;
use crate::error::{Error, Result};

/// Signature folded into the initial encoder state.
pub const ANS_SIGNATURE: u32 = 0x13;

/// Initial encoder state, and the state a complete decode must end in.
pub const ANS_INITIAL_STATE: u32 = ANS_SIGNATURE << 16;

/// Lower bound of the normalized state interval.
const RANS_L: u32 = 1 << 16;

/// rANS encoder.
#[derive(Debug, Clone)]
pub struct RansEncoder {
    state: u32,
}

impl RansEncoder {
    /// Create a new rANS encoder.
    pub fn new() -> Self {
        Self {
            state: ANS_INITIAL_STATE,
        }
    }

    /// Encode `symbol` with `table`.
    ///
    /// Returns the 16-bit chunk flushed by renormalization, if any. The
    /// decoder reads that chunk right after decoding this symbol.
    ///
    /// # Errors
    /// Returns `Error::ZeroFrequency` if `symbol` has no slots in `table`.
    #[inline]
    pub fn put(&mut self, table: &AnsTable, symbol: usize) -> Result<Option<u16>> {
        let freq = table.freq(symbol);
        if freq == 0 {
            return Err(Error::ZeroFrequency(symbol));
        }
        let log_tab_size = table.log_tab_size();

        // Renormalize: state must be below freq << (32 - log_tab_size).
        let mut chunk = None;
        if (self.state >> (32 - log_tab_size)) >= freq {
            chunk = Some(self.state as u16);
            self.state >>= 16;
        }

        // state = (x / freq) * total + (x % freq) + cum_freq
        let quotient = table.divide(self.state, symbol);
        let offset = self.state - quotient * freq;
        self.state = (quotient << log_tab_size) + offset + table.cumulative(symbol);
        Ok(chunk)
    }

    /// Return the current internal state.
    pub fn state(&self) -> u32 {
        self.state
    }
}

impl Default for RansEncoder {
    fn default() -> Self {
        Self::new()
    }
}

/// rANS decoder.
#[derive(Debug, Clone)]
pub struct RansDecoder {
    state: u32,
}

impl RansDecoder {
    /// Create a decoder from the final encoder state.
    pub fn new(state: u32) -> Self {
        Self { state }
    }

    /// Read the 32-bit initial state from `reader`.
    pub fn from_reader(reader: &mut BitReader<'_>) -> Result<Self> {
        let state = reader.read_bits(32)?;
        if state < RANS_L {
            return Err(Error::CorruptState(state));
        }
        Ok(Self::new(state))
    }

    /// Return the current internal state.
    pub fn state(&self) -> u32 {
        self.state
    }

    /// Decode one symbol, refilling the state from `reader` when it drops
    /// below `2^16`.
    #[inline]
    pub fn get(&mut self, table: &AnsTable, reader: &mut BitReader<'_>) -> Result<usize> {
        let log_tab_size = table.log_tab_size();
        let slot = self.state & (table.table_size() - 1);
        let symbol = table.symbol_for_slot(slot);

        // state = freq * (state / total) + (state % total) - cum_freq
        self.state =
            table.freq(symbol) * (self.state >> log_tab_size) + slot - table.cumulative(symbol);

        if self.state < RANS_L {
            self.state = (self.state << 16) | reader.read_bits(16)?;
        }
        Ok(symbol)
    }

    /// Check that decoding ended in the encoder's initial state.
    pub fn check_final_state(&self) -> Result<()> {
        if self.state == ANS_INITIAL_STATE {
            Ok(())
        } else {
            Err(Error::CorruptState(self.state))
        }
    }
}
