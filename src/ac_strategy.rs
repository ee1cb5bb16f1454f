//! Per-block transform strategies.
//!
//! Each 8x8 block of a frame stores one byte: the transform type shifted left
//! by one, with the low bit set on the top-left block of the transform. A
//! multi-block transform covers a rectangle in which only that top-left
//! block is flagged.

use crate::error::{Error, Result};
use crate::hybrid_uint::Token;

/// Transform kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum AcStrategyType {
    /// Regular 8x8 DCT.
    Dct = 0,
    /// Pixels coded without a transform.
    Identity = 1,
    /// 2x2 DCT.
    Dct2x2 = 2,
    /// 4x4 DCT.
    Dct4x4 = 3,
    /// 16x16 DCT.
    Dct16x16 = 4,
    /// 32x32 DCT.
    Dct32x32 = 5,
    /// 16x8 DCT.
    Dct16x8 = 6,
    /// 8x16 DCT.
    Dct8x16 = 7,
    /// 32x8 DCT.
    Dct32x8 = 8,
    /// 8x32 DCT.
    Dct8x32 = 9,
    /// 32x16 DCT.
    Dct32x16 = 10,
    /// 16x32 DCT.
    Dct16x32 = 11,
    /// 4x8 DCT.
    Dct4x8 = 12,
    /// 8x4 DCT.
    Dct8x4 = 13,
    /// Corner DCT, first orientation.
    Afv0 = 14,
    /// Corner DCT, second orientation.
    Afv1 = 15,
    /// Corner DCT, third orientation.
    Afv2 = 16,
    /// Corner DCT, fourth orientation.
    Afv3 = 17,
}

const COVERED_BLOCKS_X: [u8; AcStrategyType::NUM_VALID] =
    [1, 1, 1, 1, 2, 4, 1, 2, 1, 4, 2, 4, 1, 1, 1, 1, 1, 1];
const COVERED_BLOCKS_Y: [u8; AcStrategyType::NUM_VALID] =
    [1, 1, 1, 1, 2, 4, 2, 1, 4, 1, 4, 2, 1, 1, 1, 1, 1, 1];
const LOG2_COVERED_BLOCKS: [u8; AcStrategyType::NUM_VALID] =
    [0, 0, 0, 0, 2, 4, 1, 1, 2, 2, 3, 3, 0, 0, 0, 0, 0, 0];

impl AcStrategyType {
    /// Number of transform kinds.
    pub const NUM_VALID: usize = 18;

    /// Every kind, in raw order.
    pub const ALL: [AcStrategyType; Self::NUM_VALID] = [
        AcStrategyType::Dct,
        AcStrategyType::Identity,
        AcStrategyType::Dct2x2,
        AcStrategyType::Dct4x4,
        AcStrategyType::Dct16x16,
        AcStrategyType::Dct32x32,
        AcStrategyType::Dct16x8,
        AcStrategyType::Dct8x16,
        AcStrategyType::Dct32x8,
        AcStrategyType::Dct8x32,
        AcStrategyType::Dct32x16,
        AcStrategyType::Dct16x32,
        AcStrategyType::Dct4x8,
        AcStrategyType::Dct8x4,
        AcStrategyType::Afv0,
        AcStrategyType::Afv1,
        AcStrategyType::Afv2,
        AcStrategyType::Afv3,
    ];

    /// Kind with raw value `raw`.
    pub fn from_raw(raw: u8) -> Result<Self> {
        Self::ALL
            .get(usize::from(raw))
            .copied()
            .ok_or(Error::InvalidStrategy(raw))
    }

    /// Raw value, as used for tokenization.
    #[inline]
    pub fn raw(self) -> u8 {
        self as u8
    }

    /// Width in blocks.
    #[inline]
    pub fn covered_blocks_x(self) -> usize {
        usize::from(COVERED_BLOCKS_X[self as usize])
    }

    /// Height in blocks.
    #[inline]
    pub fn covered_blocks_y(self) -> usize {
        usize::from(COVERED_BLOCKS_Y[self as usize])
    }

    /// Log2 of the number of covered blocks.
    #[inline]
    pub fn log2_covered_blocks(self) -> usize {
        usize::from(LOG2_COVERED_BLOCKS[self as usize])
    }

    /// True if the transform spans more than one block.
    #[inline]
    pub fn is_multiblock(self) -> bool {
        self.log2_covered_blocks() > 0
    }
}

/// The strategy of one block: its transform and whether it is the
/// transform's top-left block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AcStrategy {
    strategy: AcStrategyType,
    is_first: bool,
}

impl AcStrategy {
    /// Top-left block of a transform of raw kind `raw`.
    pub fn from_raw_strategy(raw: u8) -> Result<Self> {
        Ok(Self {
            strategy: AcStrategyType::from_raw(raw)?,
            is_first: true,
        })
    }

    /// Unpacks a stored byte.
    pub fn from_packed(byte: u8) -> Result<Self> {
        let strategy = AcStrategyType::from_raw(byte >> 1).map_err(|_| Error::InvalidStrategy(byte))?;
        let is_first = byte & 1 == 1;
        if !is_first && !strategy.is_multiblock() {
            return Err(Error::InvalidStrategy(byte));
        }
        Ok(Self { strategy, is_first })
    }

    /// Packed byte: `kind << 1 | is_first`.
    #[inline]
    pub fn packed(&self) -> u8 {
        (self.strategy.raw() << 1) | u8::from(self.is_first)
    }

    /// Transform kind.
    pub fn strategy(&self) -> AcStrategyType {
        self.strategy
    }

    /// Raw transform kind.
    pub fn raw_strategy(&self) -> u8 {
        self.strategy.raw()
    }

    /// True for the top-left block of the transform.
    pub fn is_first_block(&self) -> bool {
        self.is_first
    }

    /// See [`AcStrategyType::is_multiblock`].
    pub fn is_multiblock(&self) -> bool {
        self.strategy.is_multiblock()
    }

    /// See [`AcStrategyType::covered_blocks_x`].
    pub fn covered_blocks_x(&self) -> usize {
        self.strategy.covered_blocks_x()
    }

    /// See [`AcStrategyType::covered_blocks_y`].
    pub fn covered_blocks_y(&self) -> usize {
        self.strategy.covered_blocks_y()
    }

    /// See [`AcStrategyType::log2_covered_blocks`].
    pub fn log2_covered_blocks(&self) -> usize {
        self.strategy.log2_covered_blocks()
    }
}

/// Strategy byte of every block of a frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcStrategyImage {
    xsize: usize,
    ysize: usize,
    layers: Vec<u8>,
}

impl AcStrategyImage {
    /// Marks an unassigned block.
    const INVALID: u8 = 0xFF;

    /// Creates an image of `xsize` by `ysize` unassigned blocks.
    pub fn new(xsize: usize, ysize: usize) -> Self {
        Self {
            xsize,
            ysize,
            layers: vec![Self::INVALID; xsize * ysize],
        }
    }

    /// Width in blocks.
    pub fn xsize(&self) -> usize {
        self.xsize
    }

    /// Height in blocks.
    pub fn ysize(&self) -> usize {
        self.ysize
    }

    /// Assigns a plain 8x8 DCT to every block.
    pub fn fill_dct8(&mut self) {
        self.layers.fill((AcStrategyType::Dct.raw() << 1) | 1);
    }

    /// Marks every block unassigned.
    pub fn fill_invalid(&mut self) {
        self.layers.fill(Self::INVALID);
    }

    fn check_bounds(&self, x: usize, y: usize, kind: AcStrategyType) -> Result<()> {
        if x + kind.covered_blocks_x() > self.xsize || y + kind.covered_blocks_y() > self.ysize {
            return Err(Error::BlockOutOfBounds {
                x,
                y,
                xsize: self.xsize,
                ysize: self.ysize,
            });
        }
        Ok(())
    }

    fn write(&mut self, x: usize, y: usize, kind: AcStrategyType) {
        for iy in 0..kind.covered_blocks_y() {
            for ix in 0..kind.covered_blocks_x() {
                let first = u8::from(ix == 0 && iy == 0);
                self.layers[(y + iy) * self.xsize + x + ix] = (kind.raw() << 1) | first;
            }
        }
    }

    /// Places `kind` with its top-left block at `(x, y)`, overwriting
    /// whatever was there.
    pub fn set(&mut self, x: usize, y: usize, kind: AcStrategyType) -> Result<()> {
        self.check_bounds(x, y, kind)?;
        self.write(x, y, kind);
        Ok(())
    }

    /// Places `kind` at `(x, y)` only if every covered block is unassigned.
    ///
    /// # Errors
    /// Returns [`Error::BlockOverlap`] naming the first occupied block; the
    /// image is left untouched.
    pub fn set_checked(&mut self, x: usize, y: usize, kind: AcStrategyType) -> Result<()> {
        self.check_bounds(x, y, kind)?;
        for iy in 0..kind.covered_blocks_y() {
            for ix in 0..kind.covered_blocks_x() {
                if self.layers[(y + iy) * self.xsize + x + ix] != Self::INVALID {
                    return Err(Error::BlockOverlap { x: x + ix, y: y + iy });
                }
            }
        }
        self.write(x, y, kind);
        Ok(())
    }

    /// True if block `(x, y)` has been assigned.
    pub fn is_valid(&self, x: usize, y: usize) -> bool {
        x < self.xsize && y < self.ysize && self.layers[y * self.xsize + x] != Self::INVALID
    }

    /// Strategy of block `(x, y)`.
    pub fn get(&self, x: usize, y: usize) -> Result<AcStrategy> {
        if x >= self.xsize || y >= self.ysize {
            return Err(Error::BlockOutOfBounds {
                x,
                y,
                xsize: self.xsize,
                ysize: self.ysize,
            });
        }
        AcStrategy::from_packed(self.layers[y * self.xsize + x])
    }

    /// Packed bytes of row `y`.
    ///
    /// # Errors
    /// Returns [`Error::BlockOutOfBounds`] if `y` is not below the image height.
    pub fn row(&self, y: usize) -> Result<&[u8]> {
        if y >= self.ysize {
            return Err(Error::BlockOutOfBounds {
                x: 0,
                y,
                xsize: self.xsize,
                ysize: self.ysize,
            });
        }
        Ok(&self.layers[y * self.xsize..(y + 1) * self.xsize])
    }

    /// Number of transforms of `kind` (counted at their top-left block).
    pub fn count_blocks(&self, kind: AcStrategyType) -> usize {
        let first = (kind.raw() << 1) | 1;
        self.layers.iter().filter(|&&b| b == first).count()
    }

    /// One token per transform, in raster order of the top-left blocks, all
    /// in `context`.
    pub fn tokens(&self, context: u32) -> Vec<Token> {
        self.layers
            .iter()
            .filter(|&&b| b != Self::INVALID && b & 1 == 1)
            .map(|&b| Token::new(context, u32::from(b >> 1)))
            .collect()
    }
}
