use bytes::{BufMut, Bytes, BytesMut};
use tracing::debug;

use crate::{
    FieldDescriptor, FieldKind, PersistError, SIG_BACK, SIG_FRONT, estimate::estimate_size,
};

/// Frame encoder.
///
/// Borrows a descriptor table and turns records into frames. The record is
/// only read.
pub struct Encoder<'f, R> {
    fields: &'f [FieldDescriptor<R>],
}

impl<'f, R> Encoder<'f, R> {
    /// Create an encoder over a descriptor table.
    pub const fn new(fields: &'f [FieldDescriptor<R>]) -> Self {
        Self { fields }
    }

    /// Encode `record` into a freshly allocated frame of exactly the
    /// estimated size.
    pub fn encode(&self, record: &R) -> Result<Bytes, PersistError> {
        let total = estimate_size(record, self.fields)?;

        let mut buf = Vec::new();
        buf.try_reserve_exact(total)
            .map_err(|_| PersistError::AllocationFailed { bytes: total })?;

        self.write_frame(record, total, &mut buf)?;
        if buf.len() != total {
            return Err(PersistError::Misalignment {
                expected: total,
                actual: buf.len(),
            });
        }

        debug!(fields = self.fields.len(), bytes = total, "encoded frame");
        Ok(Bytes::from(buf))
    }

    /// Append the frame for `record` to `dst`, returning its length.
    pub fn encode_into(&self, record: &R, dst: &mut BytesMut) -> Result<usize, PersistError> {
        let total = estimate_size(record, self.fields)?;
        dst.reserve(total);

        let start = dst.len();
        self.write_frame(record, total, dst)?;
        let written = dst.len() - start;
        if written != total {
            dst.truncate(start);
            return Err(PersistError::Misalignment {
                expected: total,
                actual: written,
            });
        }

        debug!(fields = self.fields.len(), bytes = total, "appended frame");
        Ok(total)
    }

    fn write_frame<B: BufMut>(&self, record: &R, total: usize, buf: &mut B) -> Result<(), PersistError> {
        let total = u32::try_from(total).map_err(|_| PersistError::FrameTooLarge(total))?;

        buf.put_u64_ne(SIG_FRONT);
        buf.put_u32_ne(total);
        for field in self.fields {
            write_field(record, field, buf)?;
        }
        buf.put_u64_ne(SIG_BACK);
        Ok(())
    }
}

/// Write a nullable string: bytes then a terminating zero, or a lone zero.
fn put_str<B: BufMut>(buf: &mut B, value: Option<&str>) {
    if let Some(value) = value {
        buf.put_slice(value.as_bytes());
    }
    buf.put_u8(0);
}

fn write_field<R, B: BufMut>(
    record: &R,
    field: &FieldDescriptor<R>,
    buf: &mut B,
) -> Result<(), PersistError> {
    match &field.kind {
        FieldKind::Scalar { get, .. } => get(record).put(buf),
        FieldKind::Str { get, .. } => put_str(buf, get(record)),
        FieldKind::ScalarArray { tag, get, .. } => match get(record).resolve(field.name, *tag)? {
            Some(items) => {
                buf.put_u32_ne(items.len() as u32);
                items.put(buf);
            }
            None => buf.put_u32_ne(0),
        },
        FieldKind::StrArray { get, .. } => {
            let items = get(record).resolve(field.name)?;
            buf.put_u32_ne(items.len() as u32);
            for item in items {
                put_str(buf, item.as_deref());
            }
        }
    }
    Ok(())
}

/// Encode `record` into a new frame.
pub fn serialize<R>(record: &R, fields: &[FieldDescriptor<R>]) -> Result<Bytes, PersistError> {
    Encoder::new(fields).encode(record)
}

/// Append the frame for `record` to `dst`, returning its length.
pub fn serialize_into<R>(
    record: &R,
    fields: &[FieldDescriptor<R>],
    dst: &mut BytesMut,
) -> Result<usize, PersistError> {
    Encoder::new(fields).encode_into(record, dst)
}

#[cfg(test)]
#[cfg_attr(all(test, coverage_nightly), coverage(off))]
mod tests {
    use super::*;
    use crate::{FRAME_OVERHEAD, Scalar, TypeTag, persist_fields};

    #[derive(Debug, Default)]
    struct User {
        id: i32,
        score: f64,
        name: Option<String>,
        active: bool,
    }

    static USER_FIELDS: &[FieldDescriptor<User>] = persist_fields!(User {
        id: i32,
        score: f64,
        name: str,
        active: bool,
    });

    #[derive(Debug, Default)]
    struct Lists {
        values: Option<Vec<u16>>,
        value_count: u32,
        words: Option<Vec<Option<String>>>,
        word_count: u32,
    }

    static LIST_FIELDS: &[FieldDescriptor<Lists>] = persist_fields!(Lists {
        values: [u16; value_count],
        words: [str; word_count],
    });

    #[test]
    fn test_encode_layout() {
        let user = User {
            id: 42,
            score: 99.7,
            name: Some("Hans".to_owned()),
            active: true,
        };
        let frame = serialize(&user, USER_FIELDS).unwrap();

        let mut expected = Vec::new();
        expected.extend_from_slice(&SIG_FRONT.to_ne_bytes());
        expected.extend_from_slice(&38u32.to_ne_bytes());
        expected.extend_from_slice(&42i32.to_ne_bytes());
        expected.extend_from_slice(&99.7f64.to_ne_bytes());
        expected.extend_from_slice(b"Hans\0");
        expected.push(1);
        expected.extend_from_slice(&SIG_BACK.to_ne_bytes());

        assert_eq!(frame.len(), 38);
        assert_eq!(&frame[..], &expected[..]);
    }

    #[test]
    fn test_null_string_is_single_zero() {
        let frame = serialize(&User::default(), USER_FIELDS).unwrap();
        assert_eq!(frame.len(), FRAME_OVERHEAD + 4 + 8 + 1 + 1);
        assert_eq!(frame[24], 0);
    }

    #[test]
    fn test_encode_arrays() {
        let lists = Lists {
            values: Some(vec![1, 0xffff]),
            value_count: 2,
            words: Some(vec![Some("a".to_owned()), None, Some(String::new())]),
            word_count: 3,
        };
        let frame = serialize(&lists, LIST_FIELDS).unwrap();

        let mut expected = Vec::new();
        expected.extend_from_slice(&2u32.to_ne_bytes());
        expected.extend_from_slice(&1u16.to_ne_bytes());
        expected.extend_from_slice(&0xffffu16.to_ne_bytes());
        expected.extend_from_slice(&3u32.to_ne_bytes());
        expected.extend_from_slice(b"a\0\0\0");

        assert_eq!(&frame[12..frame.len() - 8], &expected[..]);
    }

    #[test]
    fn test_empty_arrays_write_only_counts() {
        let lists = Lists {
            values: Some(vec![5, 6]),
            value_count: 0,
            ..Default::default()
        };
        let frame = serialize(&lists, LIST_FIELDS).unwrap();
        assert_eq!(frame.len(), FRAME_OVERHEAD + 8);
        assert_eq!(&frame[12..20], &[0u8; 8]);
    }

    #[test]
    fn test_null_with_count_is_rejected() {
        let lists = Lists {
            value_count: 3,
            ..Default::default()
        };
        assert!(matches!(
            serialize(&lists, LIST_FIELDS),
            Err(PersistError::NullWithCount {
                field: "values",
                count: 3
            })
        ));
    }

    #[test]
    fn test_encode_into_appends() {
        let mut dst = BytesMut::from(&b"xy"[..]);
        let written = serialize_into(&User::default(), USER_FIELDS, &mut dst).unwrap();
        assert_eq!(written, 34);
        assert_eq!(dst.len(), 36);
        assert_eq!(&dst[..2], b"xy");
        assert_eq!(&dst[2..10], &SIG_FRONT.to_ne_bytes());
    }

    #[test]
    fn test_drifting_accessor_is_misalignment() {
        use std::sync::atomic::{AtomicBool, Ordering};

        static FIRST_CALL: AtomicBool = AtomicBool::new(true);

        // Reports a long string while sizing and a short one while writing.
        let fields: &[FieldDescriptor<User>] = &[FieldDescriptor {
            name: "name",
            kind: FieldKind::Str {
                get: |_: &User| {
                    if FIRST_CALL.swap(false, Ordering::SeqCst) {
                        Some("long value")
                    } else {
                        Some("x")
                    }
                },
                set: |_, _| {},
            },
        }];

        assert!(matches!(
            serialize(&User::default(), fields),
            Err(PersistError::Misalignment {
                expected: 31,
                actual: 22
            })
        ));
    }

    #[test]
    fn test_scalar_type_checked_before_writing() {
        let fields: &[FieldDescriptor<User>] = &[FieldDescriptor {
            name: "active",
            kind: FieldKind::Scalar {
                tag: TypeTag::Bool,
                get: |user: &User| Scalar::I32(user.id),
                set: |_, _| {},
            },
        }];
        assert!(matches!(
            serialize(&User::default(), fields),
            Err(PersistError::TypeMismatch { field: "active", .. })
        ));
    }
}
