use std::fmt;

use num_derive::FromPrimitive;
use num_traits::FromPrimitive;

use crate::PersistError;

/// Magic value opening every frame.
pub const SIG_FRONT: u64 = 0xDEAD_BEEF_CAFE_BABE;

/// Magic value closing every frame.
pub const SIG_BACK: u64 = 0xBEEF_ABAD_FEED_FACE;

/// Front signature plus the 4-byte total length.
pub const HEADER_SIZE: usize = 8 + 4;

/// Back signature.
pub const FOOTER_SIZE: usize = 8;

/// Bytes every frame carries regardless of its fields.
pub const FRAME_OVERHEAD: usize = HEADER_SIZE + FOOTER_SIZE;

/// Width of the element count written in front of every array.
pub const COUNT_SIZE: usize = 4;

/// Wire type of a record field.
///
/// The discriminants are part of the format and never change.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash, FromPrimitive)]
#[repr(u8)]
pub enum TypeTag {
    /// `bool`, one byte
    Bool = 0,
    /// `i64`
    I64 = 1,
    /// `u64`
    U64 = 2,
    /// `f64`
    F64 = 3,
    /// `f32`
    F32 = 4,
    /// `i32`
    I32 = 5,
    /// `u32`
    U32 = 6,
    /// `i16`
    I16 = 7,
    /// `u16`
    U16 = 8,
    /// `i8`
    I8 = 9,
    /// `u8`
    U8 = 10,
    /// Zero terminated string
    Str = 11,
}

/// On-wire width of a [`TypeTag`].
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Width {
    /// Always exactly this many bytes.
    Fixed(usize),
    /// Depends on the value (strings).
    Variable,
}

impl TypeTag {
    /// Resolve the on-wire width of this tag.
    pub const fn width(self) -> Width {
        match self {
            Self::Bool | Self::I8 | Self::U8 => Width::Fixed(1),
            Self::I16 | Self::U16 => Width::Fixed(2),
            Self::I32 | Self::U32 | Self::F32 => Width::Fixed(4),
            Self::I64 | Self::U64 | Self::F64 => Width::Fixed(8),
            Self::Str => Width::Variable,
        }
    }

    /// The fixed width of this tag, or [`PersistError::UnknownType`] when the
    /// tag has no fixed width and was used where one is required.
    pub fn fixed_width(self) -> Result<usize, PersistError> {
        match self.width() {
            Width::Fixed(width) => Ok(width),
            Width::Variable => Err(PersistError::UnknownType(self as u8)),
        }
    }

    /// Short lowercase name, as used in descriptor listings.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::I64 => "i64",
            Self::U64 => "u64",
            Self::F64 => "f64",
            Self::F32 => "f32",
            Self::I32 => "i32",
            Self::U32 => "u32",
            Self::I16 => "i16",
            Self::U16 => "u16",
            Self::I8 => "i8",
            Self::U8 => "u8",
            Self::Str => "str",
        }
    }
}

impl TryFrom<u8> for TypeTag {
    type Error = PersistError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::from_u8(value).ok_or(PersistError::UnknownType(value))
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
