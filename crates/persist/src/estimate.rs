use tracing::trace;

use crate::{COUNT_SIZE, FRAME_OVERHEAD, FieldDescriptor, FieldKind, PersistError};

/// Encoded size of a nullable string: its bytes plus the terminating zero.
pub(crate) fn str_size(field: &'static str, value: Option<&str>) -> Result<usize, PersistError> {
    match value {
        Some(value) if value.as_bytes().contains(&0) => Err(PersistError::InteriorNul { field }),
        Some(value) => Ok(value.len() + 1),
        None => Ok(1),
    }
}

/// Size of one field's payload.
fn field_size<R>(record: &R, field: &FieldDescriptor<R>) -> Result<usize, PersistError> {
    match &field.kind {
        FieldKind::Scalar { tag, get, .. } => {
            let value = get(record);
            if value.tag() != *tag {
                return Err(PersistError::TypeMismatch {
                    field: field.name,
                    expected: *tag,
                    actual: value.tag(),
                });
            }
            tag.fixed_width()
        }
        FieldKind::Str { get, .. } => str_size(field.name, get(record)),
        FieldKind::ScalarArray { tag, get, .. } => {
            let width = tag.fixed_width()?;
            let items = get(record).resolve(field.name, *tag)?;
            Ok(COUNT_SIZE + items.map_or(0, |items| items.len() * width))
        }
        FieldKind::StrArray { get, .. } => {
            let items = get(record).resolve(field.name)?;
            items.iter().try_fold(COUNT_SIZE, |size, item| {
                Ok(size + str_size(field.name, item.as_deref())?)
            })
        }
    }
}

/// Exact size of the field payloads of `record`, without framing.
pub fn payload_size<R>(record: &R, fields: &[FieldDescriptor<R>]) -> Result<usize, PersistError> {
    fields.iter().try_fold(0usize, |size, field| {
        let field_size = field_size(record, field)?;
        trace!(field = field.name, size = field_size, "sized field");
        Ok(size + field_size)
    })
}

/// Exact size of the frame `record` encodes to, signatures and length
/// included.
///
/// Nothing is written; the walk mirrors the encoder field by field.
pub fn estimate_size<R>(record: &R, fields: &[FieldDescriptor<R>]) -> Result<usize, PersistError> {
    let total = FRAME_OVERHEAD + payload_size(record, fields)?;
    if u32::try_from(total).is_err() {
        return Err(PersistError::FrameTooLarge(total));
    }
    Ok(total)
}

#[cfg(test)]
#[cfg_attr(all(test, coverage_nightly), coverage(off))]
mod tests {
    use super::*;
    use crate::{Scalar, TypeTag, persist_fields};

    #[derive(Debug, Default)]
    struct Sample {
        id: i32,
        score: f64,
        name: Option<String>,
        active: bool,
        scores: Option<Vec<i32>>,
        score_count: u32,
        tags: Option<Vec<Option<String>>>,
        tag_count: u32,
    }

    static SAMPLE_FIELDS: &[FieldDescriptor<Sample>] = persist_fields!(Sample {
        id: i32,
        score: f64,
        name: str,
        active: bool,
        scores: [i32; score_count],
        tags: [str; tag_count],
    });

    #[test]
    fn test_empty_record_size() {
        // 4 + 8 + 1 (null name) + 1 + 4 + 4
        let sample = Sample::default();
        assert_eq!(payload_size(&sample, SAMPLE_FIELDS).unwrap(), 22);
        assert_eq!(estimate_size(&sample, SAMPLE_FIELDS).unwrap(), 42);
    }

    #[test]
    fn test_variable_fields() {
        let sample = Sample {
            name: Some("Hans".to_owned()),
            scores: Some(vec![1, 2, 3, 4]),
            score_count: 4,
            tags: Some(vec![Some("a".to_owned()), None, Some(String::new())]),
            tag_count: 3,
            ..Default::default()
        };
        // 4 + 8 + 5 + 1 + (4 + 16) + (4 + 2 + 1 + 1)
        assert_eq!(payload_size(&sample, SAMPLE_FIELDS).unwrap(), 46);
    }

    #[test]
    fn test_count_limits_written_elements() {
        let sample = Sample {
            scores: Some(vec![1, 2, 3, 4]),
            score_count: 1,
            ..Default::default()
        };
        assert_eq!(payload_size(&sample, SAMPLE_FIELDS).unwrap(), 26);
    }

    #[test]
    fn test_null_with_count() {
        let sample = Sample {
            score_count: 2,
            ..Default::default()
        };
        assert!(matches!(
            estimate_size(&sample, SAMPLE_FIELDS),
            Err(PersistError::NullWithCount {
                field: "scores",
                count: 2
            })
        ));

        let sample = Sample {
            tag_count: 1,
            ..Default::default()
        };
        assert!(matches!(
            estimate_size(&sample, SAMPLE_FIELDS),
            Err(PersistError::NullWithCount { field: "tags", .. })
        ));
    }

    #[test]
    fn test_interior_nul() {
        let sample = Sample {
            name: Some("a\0b".to_owned()),
            ..Default::default()
        };
        assert!(matches!(
            estimate_size(&sample, SAMPLE_FIELDS),
            Err(PersistError::InteriorNul { field: "name" })
        ));
    }

    #[test]
    fn test_scalar_type_mismatch() {
        let fields: &[FieldDescriptor<Sample>] = &[FieldDescriptor {
            name: "id",
            kind: FieldKind::Scalar {
                tag: TypeTag::U16,
                get: |sample: &Sample| Scalar::I32(sample.id),
                set: |_, _| {},
            },
        }];
        assert!(matches!(
            estimate_size(&Sample::default(), fields),
            Err(PersistError::TypeMismatch {
                expected: TypeTag::U16,
                actual: TypeTag::I32,
                ..
            })
        ));
    }

    #[test]
    fn test_string_tag_in_scalar_position() {
        let fields: &[FieldDescriptor<Sample>] = &[FieldDescriptor {
            name: "scores",
            kind: FieldKind::ScalarArray {
                tag: TypeTag::Str,
                get: |_| crate::ScalarArrayRef {
                    count: 0,
                    items: None,
                },
                set: |_, _, _| {},
            },
        }];
        assert!(matches!(
            estimate_size(&Sample::default(), fields),
            Err(PersistError::UnknownType(11))
        ));
    }
}
