//! Field descriptors: the table that drives both encoding and decoding.
//!
//! A descriptor table is an ordered slice of [`FieldDescriptor`]s. Each entry
//! carries typed accessors into the record instead of byte offsets, so the
//! codec never touches record memory it was not handed by the record itself.
//!
//! Records follow one layout convention:
//!
//! - fixed-width fields are plain values (`i32`, `f64`, `bool`, ...)
//! - strings are `Option<String>`
//! - arrays are `Option<Vec<T>>` paired with a `u32` element count
//!
//! Tables are normally built once with [`persist_fields!`](crate::persist_fields)
//! and kept in a `static`.

use std::fmt;

use crate::{PersistError, Scalar, ScalarSlice, ScalarVec, TypeTag};

/// Borrowed view of a fixed-width array field: the record's own count plus
/// its backing storage, if any.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScalarArrayRef<'a> {
    /// Element count as the record reports it.
    pub count: u32,
    /// Backing storage, `None` when the record holds no array.
    pub items: Option<ScalarSlice<'a>>,
}

/// Borrowed view of a string array field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StrArrayRef<'a> {
    /// Element count as the record reports it.
    pub count: u32,
    /// Backing storage, `None` when the record holds no array.
    pub items: Option<&'a [Option<String>]>,
}

/// Check a count against its backing storage length.
fn check_count(
    field: &'static str,
    count: u32,
    len: Option<usize>,
) -> Result<usize, PersistError> {
    let wanted = count as usize;
    match len {
        _ if count == 0 => Ok(0),
        None => Err(PersistError::NullWithCount { field, count }),
        Some(len) if len < wanted => Err(PersistError::CountOverflow { field, count, len }),
        Some(_) => Ok(wanted),
    }
}

impl<'a> ScalarArrayRef<'a> {
    /// The elements that will be written, or an error when the count and the
    /// storage disagree.
    pub fn resolve(
        self,
        field: &'static str,
        tag: TypeTag,
    ) -> Result<Option<ScalarSlice<'a>>, PersistError> {
        let count = check_count(field, self.count, self.items.map(|items| items.len()))?;
        match self.items {
            Some(items) if count > 0 => {
                if items.tag() != tag {
                    return Err(PersistError::TypeMismatch {
                        field,
                        expected: tag,
                        actual: items.tag(),
                    });
                }
                Ok(Some(items.prefix(count)))
            }
            _ => Ok(None),
        }
    }
}

impl<'a> StrArrayRef<'a> {
    /// The elements that will be written, or an error when the count and the
    /// storage disagree.
    pub fn resolve(self, field: &'static str) -> Result<&'a [Option<String>], PersistError> {
        let count = check_count(field, self.count, self.items.map(<[_]>::len))?;
        Ok(self.items.map_or(&[][..], |items| &items[..count]))
    }
}

/// Accessor for a fixed-width array field.
pub type ScalarArrayGetter<R> = fn(&R) -> ScalarArrayRef<'_>;
/// Accessor for a string array field.
pub type StrArrayGetter<R> = fn(&R) -> StrArrayRef<'_>;

/// How a field is laid out on the wire, with its accessors.
pub enum FieldKind<R> {
    /// A single fixed-width value.
    Scalar {
        /// Wire type
        tag: TypeTag,
        /// Read the value
        get: fn(&R) -> Scalar,
        /// Store a decoded value
        set: fn(&mut R, Scalar),
    },
    /// A nullable zero-terminated string.
    Str {
        /// Read the value
        get: fn(&R) -> Option<&str>,
        /// Store a decoded value
        set: fn(&mut R, Option<String>),
    },
    /// A counted array of fixed-width values.
    ScalarArray {
        /// Element wire type
        tag: TypeTag,
        /// Read count and storage
        get: ScalarArrayGetter<R>,
        /// Store a decoded count and storage
        set: fn(&mut R, u32, Option<ScalarVec>),
    },
    /// A counted array of nullable strings.
    StrArray {
        /// Read count and storage
        get: StrArrayGetter<R>,
        /// Store a decoded count and storage
        set: fn(&mut R, u32, Option<Vec<Option<String>>>),
    },
}

/// One entry of a descriptor table.
pub struct FieldDescriptor<R> {
    /// Field name, used in errors and logs.
    pub name: &'static str,
    /// Layout and accessors.
    pub kind: FieldKind<R>,
}

impl<R> FieldDescriptor<R> {
    /// Type of the field, or of its elements for arrays.
    pub const fn type_tag(&self) -> TypeTag {
        match &self.kind {
            FieldKind::Scalar { tag, .. } | FieldKind::ScalarArray { tag, .. } => *tag,
            FieldKind::Str { .. } | FieldKind::StrArray { .. } => TypeTag::Str,
        }
    }

    /// Whether the field is written with an element count.
    pub const fn is_array(&self) -> bool {
        matches!(
            self.kind,
            FieldKind::ScalarArray { .. } | FieldKind::StrArray { .. }
        )
    }
}

impl<R> fmt::Debug for FieldDescriptor<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldDescriptor")
            .field("name", &self.name)
            .field("type", &self.type_tag())
            .field("is_array", &self.is_array())
            .finish()
    }
}

/// Build a `&'static [FieldDescriptor<Record>]` table.
///
/// Each entry names a record field and its wire shape:
///
/// - `field: i32` (any [`Primitive`](crate::Primitive) type)
/// - `field: str` for an `Option<String>`
/// - `field: [i32; count_field]` for an `Option<Vec<i32>>` counted by `count_field: u32`
/// - `field: [str; count_field]` for an `Option<Vec<Option<String>>>`
///
/// ```rust
/// use persist::{FieldDescriptor, persist_fields};
///
/// #[derive(Default)]
/// struct Sample {
///     id: u16,
///     label: Option<String>,
///     points: Option<Vec<f32>>,
///     point_count: u32,
/// }
///
/// static SAMPLE_FIELDS: &[FieldDescriptor<Sample>] = persist_fields!(Sample {
///     id: u16,
///     label: str,
///     points: [f32; point_count],
/// });
///
/// assert_eq!(SAMPLE_FIELDS.len(), 3);
/// assert!(SAMPLE_FIELDS[2].is_array());
/// ```
#[macro_export]
macro_rules! persist_fields {
    (@field $record:ty, $field:ident, str) => {
        $crate::FieldDescriptor {
            name: stringify!($field),
            kind: $crate::FieldKind::Str {
                get: |record: &$record| record.$field.as_deref(),
                set: |record: &mut $record, value| record.$field = value,
            },
        }
    };
    (@field $record:ty, $field:ident, [str; $count:ident]) => {
        $crate::FieldDescriptor {
            name: stringify!($field),
            kind: $crate::FieldKind::StrArray {
                get: |record: &$record| $crate::StrArrayRef {
                    count: record.$count,
                    items: record.$field.as_deref(),
                },
                set: |record: &mut $record, count, items| {
                    record.$count = count;
                    record.$field = items;
                },
            },
        }
    };
    (@field $record:ty, $field:ident, [$ty:ty; $count:ident]) => {
        $crate::FieldDescriptor {
            name: stringify!($field),
            kind: $crate::FieldKind::ScalarArray {
                tag: <$ty as $crate::Primitive>::TAG,
                get: |record: &$record| $crate::ScalarArrayRef {
                    count: record.$count,
                    items: record
                        .$field
                        .as_deref()
                        .map(<$ty as $crate::Primitive>::as_slice),
                },
                set: |record: &mut $record, count, items| {
                    record.$count = count;
                    record.$field = items.and_then(<$ty as $crate::Primitive>::from_vec);
                },
            },
        }
    };
    (@field $record:ty, $field:ident, $ty:ty) => {
        $crate::FieldDescriptor {
            name: stringify!($field),
            kind: $crate::FieldKind::Scalar {
                tag: <$ty as $crate::Primitive>::TAG,
                get: |record: &$record| $crate::Primitive::into_scalar(record.$field),
                set: |record: &mut $record, value| {
                    if let Some(value) = <$ty as $crate::Primitive>::from_scalar(value) {
                        record.$field = value;
                    }
                },
            },
        }
    };
    ($record:ty { $($field:ident : $kind:tt),* $(,)? }) => {
        &[$($crate::persist_fields!(@field $record, $field, $kind)),*]
    };
}
