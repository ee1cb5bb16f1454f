//! Hybrid-integer tokenization.
//!
//! A value is split into a small *token*, which is entropy coded, and a run
//! of raw *extra bits* written verbatim. Values below `2^split_exponent` are
//! their own token. Larger values are bucketed by the position of their top
//! bit; the token additionally carries `msb_in_token` bits just below the top
//! bit and the lowest `lsb_in_token` bits, and everything in between becomes
//! extra bits:
//!
//! ```text
//! value  = 1 | msb bits | extra bits | lsb bits
//! token  = 2^split + ((n - split) << (msb + lsb)) + (msb bits << lsb) + lsb bits
//! ```
//!
//! where `n = floor(log2(value))`. The number of extra bits depends on the
//! token alone, so the decoder knows how many raw bits to read as soon as it
//! has the token.

use crate::bit_io::{BitReader, BitWriter};
use crate::error::{Error, Result};

/// A value to be entropy coded, together with the context selecting its model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Token {
    /// Raw context id, in `[0, num_contexts)`.
    pub context: u32,
    /// Value to code.
    pub value: u32,
}

impl Token {
    /// Creates a token.
    #[inline]
    pub const fn new(context: u32, value: u32) -> Self {
        Self { context, value }
    }
}

/// A tokenized value: the coded symbol plus its raw extra bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HybridToken {
    /// Symbol handed to the entropy coder.
    pub token: u32,
    /// Number of raw extra bits.
    pub nbits: u32,
    /// The extra bits themselves (low `nbits` bits).
    pub bits: u32,
}

/// Parameters of the hybrid-integer split.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HybridUintConfig {
    split_exponent: u32,
    msb_in_token: u32,
    lsb_in_token: u32,
}

impl Default for HybridUintConfig {
    fn default() -> Self {
        Self {
            split_exponent: 4,
            msb_in_token: 2,
            lsb_in_token: 0,
        }
    }
}

impl HybridUintConfig {
    /// Largest supported split exponent.
    pub const MAX_SPLIT_EXPONENT: u32 = 15;

    /// Creates a configuration.
    ///
    /// # Errors
    /// Returns [`Error::InvalidConfig`] if `split_exponent` exceeds
    /// [`Self::MAX_SPLIT_EXPONENT`] or `msb_in_token + lsb_in_token` exceeds
    /// `split_exponent`.
    pub fn new(split_exponent: u32, msb_in_token: u32, lsb_in_token: u32) -> Result<Self> {
        if split_exponent > Self::MAX_SPLIT_EXPONENT {
            return Err(Error::InvalidConfig("split exponent above 15"));
        }
        if msb_in_token + lsb_in_token > split_exponent {
            return Err(Error::InvalidConfig(
                "msb_in_token + lsb_in_token exceeds split exponent",
            ));
        }
        Ok(Self {
            split_exponent,
            msb_in_token,
            lsb_in_token,
        })
    }

    /// Exponent below which values are coded directly.
    pub fn split_exponent(&self) -> u32 {
        self.split_exponent
    }

    /// Number of bits below the top bit carried by the token.
    pub fn msb_in_token(&self) -> u32 {
        self.msb_in_token
    }

    /// Number of lowest bits carried by the token.
    pub fn lsb_in_token(&self) -> u32 {
        self.lsb_in_token
    }

    #[inline]
    fn split_token(&self) -> u32 {
        1 << self.split_exponent
    }

    /// Splits `value` into a token and extra bits.
    #[inline]
    pub fn encode(&self, value: u32) -> HybridToken {
        let split_token = self.split_token();
        if value < split_token {
            return HybridToken {
                token: value,
                nbits: 0,
                bits: 0,
            };
        }
        let n = 31 - value.leading_zeros();
        let m = value - (1 << n);
        let in_token = self.msb_in_token + self.lsb_in_token;
        let token = split_token
            + ((n - self.split_exponent) << in_token)
            + ((m >> (n - self.msb_in_token)) << self.lsb_in_token)
            + (m & ((1 << self.lsb_in_token) - 1));
        let nbits = n - in_token;
        let bits = (value >> self.lsb_in_token) & low_mask(nbits);
        HybridToken { token, nbits, bits }
    }

    /// Number of extra bits that follow `token`.
    #[inline]
    pub fn extra_bits_for_token(&self, token: u32) -> u32 {
        let split_token = self.split_token();
        if token < split_token {
            return 0;
        }
        let in_token = self.msb_in_token + self.lsb_in_token;
        (self.split_exponent - in_token).saturating_add((token - split_token) >> in_token)
    }

    /// Reconstructs a value from its token and extra bits.
    ///
    /// # Errors
    /// Returns [`Error::InvalidStream`] if the token describes a value that
    /// does not fit in 32 bits.
    pub fn decode(&self, token: u32, bits: u32) -> Result<u32> {
        let split_token = self.split_token();
        if token < split_token {
            return Ok(token);
        }
        let nbits = self.extra_bits_for_token(token);
        if 1 + u64::from(self.msb_in_token) + u64::from(nbits) + u64::from(self.lsb_in_token) > 32 {
            return Err(Error::InvalidStream("hybrid token exceeds 32-bit range"));
        }
        let low = token & ((1 << self.lsb_in_token) - 1);
        let high = token >> self.lsb_in_token;
        let top = (1u64 << self.msb_in_token) | u64::from(high & ((1 << self.msb_in_token) - 1));
        let value = (((top << nbits) | u64::from(bits & low_mask(nbits))) << self.lsb_in_token)
            | u64::from(low);
        Ok(value as u32)
    }

    /// Smallest value mapped to `token`.
    ///
    /// When `lsb_in_token == 0` every value satisfies
    /// `token_base(t) + bits == value`.
    pub fn token_base(&self, token: u32) -> Result<u32> {
        self.decode(token, 0)
    }

    /// Serializes the configuration.
    pub fn write(&self, writer: &mut BitWriter) {
        writer.write_bits(u64::from(self.split_exponent), 4);
        writer.write_bits(
            u64::from(self.msb_in_token),
            ceil_log2(self.split_exponent + 1),
        );
        writer.write_bits(
            u64::from(self.lsb_in_token),
            ceil_log2(self.split_exponent - self.msb_in_token + 1),
        );
    }

    /// Reads a configuration written by [`HybridUintConfig::write`].
    pub fn read(reader: &mut BitReader<'_>) -> Result<Self> {
        let split_exponent = reader.read_bits(4)?;
        let msb_in_token = reader.read_bits(ceil_log2(split_exponent + 1))?;
        if msb_in_token > split_exponent {
            return Err(Error::InvalidStream("msb_in_token above split exponent"));
        }
        let lsb_in_token = reader.read_bits(ceil_log2(split_exponent - msb_in_token + 1))?;
        Self::new(split_exponent, msb_in_token, lsb_in_token)
            .map_err(|_| Error::InvalidStream("invalid hybrid uint config"))
    }
}

#[inline]
fn low_mask(nbits: u32) -> u32 {
    if nbits >= 32 {
        u32::MAX
    } else {
        (1u32 << nbits) - 1
    }
}

/// Zigzag mapping of signed values onto unsigned ones: 0, -1, 1, -2, ...
#[inline]
pub fn pack_signed(value: i32) -> u32 {
    ((value as u32) << 1) ^ ((value >> 31) as u32)
}

/// Inverse of [`pack_signed`].
#[inline]
pub fn unpack_signed(value: u32) -> i32 {
    ((value >> 1) as i32) ^ -((value & 1) as i32)
}

/// Number of bits needed to represent values in `[0, n)`.
#[inline]
pub(crate) fn ceil_log2(n: u32) -> u32 {
    if n <= 1 {
        0
    } else {
        32 - (n - 1).leading_zeros()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_small_values_are_direct() {
        let config = HybridUintConfig::default();
        for v in 0..16 {
            assert_eq!(
                config.encode(v),
                HybridToken {
                    token: v,
                    nbits: 0,
                    bits: 0
                }
            );
        }
    }

    #[test]
    fn test_default_config_buckets() {
        let config = HybridUintConfig::default();
        // 16..=31: n = 4, two msb bits in the token, two extra bits.
        assert_eq!(config.encode(16).token, 16);
        assert_eq!(config.encode(16).nbits, 2);
        assert_eq!(config.encode(20).token, 17);
        assert_eq!(config.encode(31).token, 19);
        assert_eq!(config.encode(32).token, 20);
        assert_eq!(config.encode(32).nbits, 3);
    }

    #[test]
    fn test_elias_style_config() {
        let config = HybridUintConfig::new(0, 0, 0).unwrap();
        assert_eq!(config.encode(0).token, 0);
        assert_eq!(config.encode(1).token, 1);
        assert_eq!(config.encode(1).nbits, 0);
        assert_eq!(config.encode(5).token, 3);
        assert_eq!(config.encode(5).nbits, 2);
        assert_eq!(config.encode(5).bits, 1);
        assert_eq!(config.encode(u32::MAX).token, 32);
    }

    #[test]
    fn test_rejects_invalid_config() {
        assert!(HybridUintConfig::new(16, 0, 0).is_err());
        assert!(HybridUintConfig::new(4, 3, 2).is_err());
    }

    #[test]
    fn test_config_serialization() {
        let configs = [
            HybridUintConfig::default(),
            HybridUintConfig::new(0, 0, 0).unwrap(),
            HybridUintConfig::new(8, 3, 4).unwrap(),
            HybridUintConfig::new(15, 15, 0).unwrap(),
        ];
        let mut writer = BitWriter::new();
        for c in &configs {
            c.write(&mut writer);
        }
        let bytes = writer.into_bytes();
        let mut reader = BitReader::new(&bytes);
        for c in &configs {
            assert_eq!(&HybridUintConfig::read(&mut reader).unwrap(), c);
        }
    }

    #[test]
    fn test_pack_signed() {
        assert_eq!(pack_signed(0), 0);
        assert_eq!(pack_signed(-1), 1);
        assert_eq!(pack_signed(1), 2);
        assert_eq!(pack_signed(-2), 3);
        assert_eq!(pack_signed(i32::MIN), u32::MAX);
        assert_eq!(unpack_signed(u32::MAX), i32::MIN);
        assert_eq!(unpack_signed(pack_signed(-128)), -128);
    }

    fn any_config() -> impl Strategy<Value = HybridUintConfig> {
        (0u32..=15)
            .prop_flat_map(|split| (Just(split), 0..=split))
            .prop_flat_map(|(split, msb)| (Just(split), Just(msb), 0..=(split - msb)))
            .prop_map(|(split, msb, lsb)| HybridUintConfig::new(split, msb, lsb).unwrap())
    }

    proptest! {
        #[test]
        fn prop_tokenizer_invertible(config in any_config(), value in any::<u32>()) {
            let t = config.encode(value);
            prop_assert_eq!(config.extra_bits_for_token(t.token), t.nbits);
            prop_assert!(t.nbits == 32 || t.bits < (1u32 << t.nbits));
            prop_assert_eq!(config.decode(t.token, t.bits).unwrap(), value);
        }

        #[test]
        fn prop_base_plus_extra_bits(split in 0u32..=15, msb_frac in 0u32..=15, value in any::<u32>()) {
            let msb = msb_frac.min(split);
            let config = HybridUintConfig::new(split, msb, 0).unwrap();
            let t = config.encode(value);
            let base = config.token_base(t.token).unwrap();
            prop_assert_eq!(u64::from(base) + u64::from(t.bits), u64::from(value));
        }

        #[test]
        fn prop_tokens_monotonic(value in 0u32..u32::MAX) {
            let config = HybridUintConfig::default();
            prop_assert!(config.encode(value).token <= config.encode(value + 1).token);
        }
    }
}
