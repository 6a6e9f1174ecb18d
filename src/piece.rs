//! Quarto pieces.
//!
//! A piece is an immutable tuple of four binary attributes. There are exactly
//! 16 pieces, one per combination, and pieces compare by value.

use std::fmt;

use crate::constants::PIECE_COUNT;

/// One of the four binary attributes every piece carries.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Attribute {
    /// Tall (`true`) or short.
    Height,
    /// Solid (`true`) or hollow.
    Solidity,
    /// Square (`true`) or circular.
    Shape,
    /// Dark (`true`) or light.
    Color,
}

impl Attribute {
    pub const ALL: [Attribute; 4] = [
        Attribute::Height,
        Attribute::Solidity,
        Attribute::Shape,
        Attribute::Color,
    ];
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Piece {
    pub height: bool,
    pub solidity: bool,
    pub shape: bool,
    pub color: bool,
}

impl Piece {
    pub const fn new(height: bool, solidity: bool, shape: bool, color: bool) -> Self {
        Self {
            height,
            solidity,
            shape,
            color,
        }
    }

    /// Decode a piece from its low four bits: height is bit 3, solidity bit 2,
    /// shape bit 1 and color bit 0.
    pub const fn from_bits(bits: u8) -> Self {
        Self::new(bits & 8 != 0, bits & 4 != 0, bits & 2 != 0, bits & 1 != 0)
    }

    pub const fn bits(self) -> u8 {
        (self.height as u8) << 3 | (self.solidity as u8) << 2 | (self.shape as u8) << 1 | self.color as u8
    }

    #[inline]
    pub fn attribute(self, attr: Attribute) -> bool {
        match attr {
            Attribute::Height => self.height,
            Attribute::Solidity => self.solidity,
            Attribute::Shape => self.shape,
            Attribute::Color => self.color,
        }
    }

    /// The full set of 16 pieces, starting from tall-solid-square-dark and
    /// counting down through the bit patterns.
    pub fn full_set() -> Vec<Piece> {
        (0..PIECE_COUNT as u8).rev().map(Piece::from_bits).collect()
    }
}

impl fmt::Display for Piece {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-{}-{}-{}",
            if self.height { 't' } else { 's' },
            if self.solidity { 's' } else { 'h' },
            if self.shape { 's' } else { 'c' },
            if self.color { 'd' } else { 'l' },
        )
    }
}
