//! Per-tile chroma-from-luma factors.
//!
//! The X and B channels are predicted from luma as `ratio * Y`, with
//! `ratio = base + factor / 84`. Factors are chosen per 64x64 pixel tile and
//! stored as signed bytes; a separate pair of factors applies to DC.

use crate::error::{Error, Result};
use crate::hybrid_uint::{pack_signed, Token};

/// Side of a colour tile, in pixels.
pub const COLOR_TILE_DIM: usize = 64;

/// Tile side in 8x8 blocks.
pub const COLOR_TILE_DIM_IN_BLOCKS: usize = COLOR_TILE_DIM / 8;

/// Factor denominator.
pub const DEFAULT_COLOR_FACTOR: u8 = 84;

/// `1 / DEFAULT_COLOR_FACTOR`.
pub const INV_COLOR_FACTOR: f32 = 1.0 / DEFAULT_COLOR_FACTOR as f32;

/// Fractional bits of the fixed-point ratios.
pub const CFL_FIXED_POINT_PRECISION: u32 = 11;

/// Default B-from-luma correlation of XYB images.
pub const Y_TO_B_RATIO: f32 = 1.0;

/// Tile-indexed correlation factors and DC offsets.
#[derive(Debug, Clone, PartialEq)]
pub struct ColorCorrelationMap {
    xsize_tiles: usize,
    ysize_tiles: usize,
    ytox_map: Vec<i8>,
    ytob_map: Vec<i8>,
    dc_factors: [f32; 4],
    base_correlation_x: f32,
    base_correlation_b: f32,
    ytox_dc: i32,
    ytob_dc: i32,
}

impl Default for ColorCorrelationMap {
    /// A single tile with no correlation adjustment.
    fn default() -> Self {
        Self::new(COLOR_TILE_DIM, COLOR_TILE_DIM, true)
    }
}

impl ColorCorrelationMap {
    /// Creates a zeroed map for an image of `xsize` by `ysize` pixels.
    ///
    /// Non-XYB images get no base B correlation, so an all-zero map is a
    /// no-op.
    pub fn new(xsize: usize, ysize: usize, xyb: bool) -> Self {
        let xsize_tiles = xsize.div_ceil(COLOR_TILE_DIM).max(1);
        let ysize_tiles = ysize.div_ceil(COLOR_TILE_DIM).max(1);
        let mut map = Self {
            xsize_tiles,
            ysize_tiles,
            ytox_map: vec![0; xsize_tiles * ysize_tiles],
            ytob_map: vec![0; xsize_tiles * ysize_tiles],
            dc_factors: [0.0; 4],
            base_correlation_x: 0.0,
            base_correlation_b: if xyb { Y_TO_B_RATIO } else { 0.0 },
            ytox_dc: 0,
            ytob_dc: 0,
        };
        map.recompute_dc_factors();
        map
    }

    /// Width in tiles.
    pub fn xsize_tiles(&self) -> usize {
        self.xsize_tiles
    }

    /// Height in tiles.
    pub fn ysize_tiles(&self) -> usize {
        self.ysize_tiles
    }

    /// X-from-luma ratio for `factor`.
    #[inline]
    pub fn y_to_x_ratio(&self, factor: i32) -> f32 {
        self.base_correlation_x + factor as f32 * INV_COLOR_FACTOR
    }

    /// B-from-luma ratio for `factor`.
    #[inline]
    pub fn y_to_b_ratio(&self, factor: i32) -> f32 {
        self.base_correlation_b + factor as f32 * INV_COLOR_FACTOR
    }

    /// Sets the DC factor for X.
    pub fn set_y_to_x_dc(&mut self, factor: i32) {
        self.ytox_dc = factor;
        self.recompute_dc_factors();
    }

    /// Sets the DC factor for B.
    pub fn set_y_to_b_dc(&mut self, factor: i32) {
        self.ytob_dc = factor;
        self.recompute_dc_factors();
    }

    /// DC factor for X.
    pub fn y_to_x_dc(&self) -> i32 {
        self.ytox_dc
    }

    /// DC factor for B.
    pub fn y_to_b_dc(&self) -> i32 {
        self.ytob_dc
    }

    /// Base X correlation.
    pub fn base_correlation_x(&self) -> f32 {
        self.base_correlation_x
    }

    /// Base B correlation.
    pub fn base_correlation_b(&self) -> f32 {
        self.base_correlation_b
    }

    /// DC ratios per channel (X at 0, B at 2).
    pub fn dc_factors(&self) -> &[f32; 4] {
        &self.dc_factors
    }

    fn recompute_dc_factors(&mut self) {
        self.dc_factors[0] = self.y_to_x_ratio(self.ytox_dc);
        self.dc_factors[2] = self.y_to_b_ratio(self.ytob_dc);
    }

    fn index(&self, tx: usize, ty: usize) -> Result<usize> {
        if tx >= self.xsize_tiles || ty >= self.ysize_tiles {
            return Err(Error::BlockOutOfBounds {
                x: tx,
                y: ty,
                xsize: self.xsize_tiles,
                ysize: self.ysize_tiles,
            });
        }
        Ok(ty * self.xsize_tiles + tx)
    }

    /// X factor of tile `(tx, ty)`.
    pub fn ytox(&self, tx: usize, ty: usize) -> Result<i8> {
        Ok(self.ytox_map[self.index(tx, ty)?])
    }

    /// B factor of tile `(tx, ty)`.
    pub fn ytob(&self, tx: usize, ty: usize) -> Result<i8> {
        Ok(self.ytob_map[self.index(tx, ty)?])
    }

    /// Sets the X factor of tile `(tx, ty)`.
    pub fn set_ytox(&mut self, tx: usize, ty: usize, factor: i8) -> Result<()> {
        let i = self.index(tx, ty)?;
        self.ytox_map[i] = factor;
        Ok(())
    }

    /// Sets the B factor of tile `(tx, ty)`.
    pub fn set_ytob(&mut self, tx: usize, ty: usize, factor: i8) -> Result<()> {
        let i = self.index(tx, ty)?;
        self.ytob_map[i] = factor;
        Ok(())
    }

    /// Tile factors as tokens: all X factors in `x_context`, then all B
    /// factors in `b_context`, each zigzag packed.
    pub fn tokens(&self, x_context: u32, b_context: u32) -> Vec<Token> {
        let x = self
            .ytox_map
            .iter()
            .map(|&f| Token::new(x_context, pack_signed(i32::from(f))));
        let b = self
            .ytob_map
            .iter()
            .map(|&f| Token::new(b_context, pack_signed(i32::from(f))));
        x.chain(b).collect()
    }
}

/// `ratio` in fixed point with [`CFL_FIXED_POINT_PRECISION`] fractional bits.
#[inline]
pub fn ratio_to_fixed(ratio: f32) -> i32 {
    (ratio * (1u32 << CFL_FIXED_POINT_PRECISION) as f32).round() as i32
}
