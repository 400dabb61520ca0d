//! Typed values moved between records and frames.
//!
//! Fixed-width fields are carried as [`Scalar`] (single values),
//! [`ScalarSlice`] (borrowed while encoding) and [`ScalarVec`] (owned after
//! decoding). The [`Primitive`] trait ties a Rust type to its [`TypeTag`].

use bytes::{Buf, BufMut};

use crate::{PersistError, TypeTag};

mod sealed {
    use bytes::{Buf, BufMut};

    /// Native-endian wire access, implemented for the fixed-width types only.
    pub trait Wire: Copy {
        fn put_ne<B: BufMut>(self, buf: &mut B);
        fn get_ne<B: Buf>(buf: &mut B) -> Self;
    }
}

pub(crate) use sealed::Wire;

macro_rules! impl_wire {
    ($($ty:ty => $put:ident, $get:ident;)*) => {
        $(
            impl Wire for $ty {
                #[inline]
                fn put_ne<B: BufMut>(self, buf: &mut B) {
                    buf.$put(self)
                }

                #[inline]
                fn get_ne<B: Buf>(buf: &mut B) -> Self {
                    buf.$get()
                }
            }
        )*
    };
}

impl_wire! {
    i8 => put_i8, get_i8;
    u8 => put_u8, get_u8;
    i16 => put_i16_ne, get_i16_ne;
    u16 => put_u16_ne, get_u16_ne;
    i32 => put_i32_ne, get_i32_ne;
    u32 => put_u32_ne, get_u32_ne;
    f32 => put_f32_ne, get_f32_ne;
    i64 => put_i64_ne, get_i64_ne;
    u64 => put_u64_ne, get_u64_ne;
    f64 => put_f64_ne, get_f64_ne;
}

impl Wire for bool {
    #[inline]
    fn put_ne<B: BufMut>(self, buf: &mut B) {
        buf.put_u8(self as u8)
    }

    #[inline]
    fn get_ne<B: Buf>(buf: &mut B) -> Self {
        buf.get_u8() != 0
    }
}

/// A Rust type that maps onto one fixed-width [`TypeTag`].
///
/// Implemented for `bool`, the 8 to 64-bit integers, `f32` and `f64`.
pub trait Primitive: Wire + 'static {
    /// Tag written for this type.
    const TAG: TypeTag;

    /// Wrap a value.
    fn into_scalar(self) -> Scalar;

    /// Unwrap a value, `None` if the scalar holds another type.
    fn from_scalar(value: Scalar) -> Option<Self>;

    /// Borrow a typed slice as an erased one.
    fn as_slice(items: &[Self]) -> ScalarSlice<'_>;

    /// Unwrap an owned array, `None` if it holds another type.
    fn from_vec(items: ScalarVec) -> Option<Vec<Self>>;
}

/// Allocate exactly `count` slots and fill them from `buf`.
///
/// The caller has already checked that `buf` holds `count` values.
fn read_vec<T: Wire, B: Buf>(count: usize, buf: &mut B) -> Result<Vec<T>, PersistError> {
    let mut items = Vec::new();
    items
        .try_reserve_exact(count)
        .map_err(|_| PersistError::AllocationFailed {
            bytes: count.saturating_mul(std::mem::size_of::<T>()),
        })?;
    items.extend((0..count).map(|_| T::get_ne(buf)));
    Ok(items)
}

macro_rules! define_values {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        /// A single fixed-width value.
        #[derive(Debug, Clone, Copy, PartialEq)]
        pub enum Scalar {
            $(
                #[doc = concat!("`", stringify!($ty), "`")]
                $variant($ty),
            )*
        }

        /// A borrowed array of fixed-width values.
        #[derive(Debug, Clone, Copy, PartialEq)]
        pub enum ScalarSlice<'a> {
            $(
                #[doc = concat!("`[", stringify!($ty), "]`")]
                $variant(&'a [$ty]),
            )*
        }

        /// An owned array of fixed-width values.
        #[derive(Debug, Clone, PartialEq)]
        pub enum ScalarVec {
            $(
                #[doc = concat!("`Vec<", stringify!($ty), ">`")]
                $variant(Vec<$ty>),
            )*
        }

        impl Scalar {
            /// Tag of the held value.
            pub const fn tag(&self) -> TypeTag {
                match self {
                    $(Self::$variant(_) => TypeTag::$variant,)*
                }
            }

            pub(crate) fn put<B: BufMut>(self, buf: &mut B) {
                match self {
                    $(Self::$variant(value) => value.put_ne(buf),)*
                }
            }

            /// Read one value of type `tag`. The caller checked the width.
            pub(crate) fn get<B: Buf>(tag: TypeTag, buf: &mut B) -> Result<Self, PersistError> {
                match tag {
                    $(TypeTag::$variant => Ok(Self::$variant(<$ty as Wire>::get_ne(buf))),)*
                    TypeTag::Str => Err(PersistError::UnknownType(tag as u8)),
                }
            }
        }

        impl<'a> ScalarSlice<'a> {
            /// Tag of the elements.
            pub const fn tag(&self) -> TypeTag {
                match self {
                    $(Self::$variant(_) => TypeTag::$variant,)*
                }
            }

            /// Number of elements.
            pub const fn len(&self) -> usize {
                match self {
                    $(Self::$variant(items) => items.len(),)*
                }
            }

            /// Whether the slice has no elements.
            pub const fn is_empty(&self) -> bool {
                self.len() == 0
            }

            /// The first `count` elements.
            pub(crate) fn prefix(self, count: usize) -> ScalarSlice<'a> {
                match self {
                    $(Self::$variant(items) => Self::$variant(&items[..count]),)*
                }
            }

            pub(crate) fn put<B: BufMut>(self, buf: &mut B) {
                match self {
                    $(Self::$variant(items) => items.iter().for_each(|value| value.put_ne(buf)),)*
                }
            }
        }

        impl ScalarVec {
            /// Tag of the elements.
            pub const fn tag(&self) -> TypeTag {
                match self {
                    $(Self::$variant(_) => TypeTag::$variant,)*
                }
            }

            /// Number of elements.
            pub fn len(&self) -> usize {
                match self {
                    $(Self::$variant(items) => items.len(),)*
                }
            }

            /// Whether the array has no elements.
            pub fn is_empty(&self) -> bool {
                self.len() == 0
            }

            /// Borrow the elements.
            pub fn as_slice(&self) -> ScalarSlice<'_> {
                match self {
                    $(Self::$variant(items) => ScalarSlice::$variant(items),)*
                }
            }

            /// Read `count` values of type `tag`. The caller checked the width.
            pub(crate) fn get<B: Buf>(
                tag: TypeTag,
                count: usize,
                buf: &mut B,
            ) -> Result<Self, PersistError> {
                match tag {
                    $(TypeTag::$variant => read_vec::<$ty, B>(count, buf).map(Self::$variant),)*
                    TypeTag::Str => Err(PersistError::UnknownType(tag as u8)),
                }
            }
        }

        $(
            impl Primitive for $ty {
                const TAG: TypeTag = TypeTag::$variant;

                #[inline]
                fn into_scalar(self) -> Scalar {
                    Scalar::$variant(self)
                }

                #[inline]
                fn from_scalar(value: Scalar) -> Option<Self> {
                    match value {
                        Scalar::$variant(value) => Some(value),
                        _ => None,
                    }
                }

                #[inline]
                fn as_slice(items: &[Self]) -> ScalarSlice<'_> {
                    ScalarSlice::$variant(items)
                }

                #[inline]
                fn from_vec(items: ScalarVec) -> Option<Vec<Self>> {
                    match items {
                        ScalarVec::$variant(items) => Some(items),
                        _ => None,
                    }
                }
            }

            impl From<Vec<$ty>> for ScalarVec {
                fn from(items: Vec<$ty>) -> Self {
                    Self::$variant(items)
                }
            }
        )*
    };
}

define_values! {
    bool => Bool,
    i8 => I8,
    u8 => U8,
    i16 => I16,
    u16 => U16,
    i32 => I32,
    u32 => U32,
    f32 => F32,
    i64 => I64,
    u64 => U64,
    f64 => F64,
}
