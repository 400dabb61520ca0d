use bytes::Buf;
use memchr::memchr;
use tracing::{debug, trace, warn};

use crate::{
    COUNT_SIZE, FOOTER_SIZE, FRAME_OVERHEAD, FieldDescriptor, FieldKind, HEADER_SIZE,
    PersistError, SIG_BACK, SIG_FRONT, Scalar, ScalarVec, TypeTag,
};

/// Facts read from the first 12 bytes of a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    /// Declared length of the whole frame, signatures included.
    pub total_len: u32,
}

impl FrameHeader {
    /// Declared frame length in bytes.
    pub const fn len(&self) -> usize {
        self.total_len as usize
    }

    /// Whether the frame carries no field payload.
    pub const fn is_empty(&self) -> bool {
        self.len() == FRAME_OVERHEAD
    }
}

/// Check the front signature and read the declared length.
///
/// `buf` only needs to hold the header; the declared length is not compared
/// against it.
pub fn read_header(buf: &[u8]) -> Result<FrameHeader, PersistError> {
    if buf.is_empty() {
        return Err(PersistError::NullArgument);
    }
    if buf.len() < HEADER_SIZE {
        return Err(PersistError::BufferTooSmall {
            needed: HEADER_SIZE,
            available: buf.len(),
        });
    }

    let mut head = &buf[..HEADER_SIZE];
    let front = head.get_u64_ne();
    if front != SIG_FRONT {
        warn!(signature = front, "front signature mismatch");
        return Err(PersistError::FrontSignatureMismatch(front));
    }

    let total_len = head.get_u32_ne();
    if (total_len as usize) < FRAME_OVERHEAD {
        return Err(PersistError::BufferTooSmall {
            needed: FRAME_OVERHEAD,
            available: total_len as usize,
        });
    }

    Ok(FrameHeader { total_len })
}

/// Like [`read_header`], and also check that `buf` holds the whole frame.
pub fn peek_header(buf: &[u8]) -> Result<FrameHeader, PersistError> {
    let header = read_header(buf)?;
    if header.len() > buf.len() {
        return Err(PersistError::BufferTooSmall {
            needed: header.len(),
            available: buf.len(),
        });
    }
    Ok(header)
}

/// A decoded value waiting to be stored, with the setter that stores it.
enum Pending<R> {
    Scalar(fn(&mut R, Scalar), Scalar),
    Str(fn(&mut R, Option<String>), String),
    ScalarArray(fn(&mut R, u32, Option<ScalarVec>), u32, Option<ScalarVec>),
    StrArray(
        fn(&mut R, u32, Option<Vec<Option<String>>>),
        u32,
        Option<Vec<Option<String>>>,
    ),
}

impl<R> Pending<R> {
    fn apply(self, record: &mut R) {
        match self {
            Self::Scalar(set, value) => set(record, value),
            Self::Str(set, value) => set(record, Some(value)),
            Self::ScalarArray(set, count, items) => set(record, count, items),
            Self::StrArray(set, count, items) => set(record, count, items),
        }
    }
}

/// Everything a decode pass has read and allocated so far.
///
/// Values stay here until the whole frame, back signature included, has been
/// validated. [`commit`](Self::commit) hands them to the record in descriptor
/// order; dropping the ledger instead releases every allocation it holds, so
/// a failed decode never leaves owned memory behind or in the record.
pub struct DecodeLedger<R> {
    pending: Vec<Pending<R>>,
}

impl<R> DecodeLedger<R> {
    fn with_capacity(capacity: usize) -> Self {
        Self {
            pending: Vec::with_capacity(capacity),
        }
    }

    /// Number of fields populated so far.
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Whether no field has been populated yet.
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    fn push(&mut self, pending: Pending<R>) {
        self.pending.push(pending);
    }

    /// Store every staged value into `record`, transferring ownership.
    pub fn commit(mut self, record: &mut R) {
        for pending in std::mem::take(&mut self.pending) {
            pending.apply(record);
        }
    }
}

impl<R> Drop for DecodeLedger<R> {
    fn drop(&mut self) {
        if !self.pending.is_empty() {
            warn!(
                fields = self.pending.len(),
                "releasing partially decoded fields"
            );
        }
    }
}

/// Bounded reader over the body of one frame.
struct FrameReader<'a> {
    /// Unread bytes, ending at the declared frame end.
    buf: &'a [u8],
    /// Declared frame length.
    end: usize,
}

impl<'a> FrameReader<'a> {
    fn position(&self) -> usize {
        self.end - self.buf.len()
    }

    fn ensure(&self, len: usize) -> Result<(), PersistError> {
        if self.buf.len() < len {
            return Err(PersistError::BufferTooSmall {
                needed: self.position().saturating_add(len),
                available: self.end,
            });
        }
        Ok(())
    }

    fn read_count(&mut self) -> Result<usize, PersistError> {
        self.ensure(COUNT_SIZE)?;
        Ok(self.buf.get_u32_ne() as usize)
    }

    fn read_scalar(&mut self, tag: TypeTag) -> Result<Scalar, PersistError> {
        self.ensure(tag.fixed_width()?)?;
        Scalar::get(tag, &mut self.buf)
    }

    fn read_scalars(
        &mut self,
        tag: TypeTag,
        width: usize,
        count: usize,
    ) -> Result<ScalarVec, PersistError> {
        self.ensure(count.saturating_mul(width))?;
        ScalarVec::get(tag, count, &mut self.buf)
    }

    fn read_str(&mut self, field: &'static str) -> Result<String, PersistError> {
        let len = memchr(0, self.buf).ok_or(PersistError::BufferTooSmall {
            needed: self.end + 1,
            available: self.end,
        })?;
        let value = std::str::from_utf8(&self.buf[..len])
            .map_err(|source| PersistError::InvalidUtf8 { field, source })?;

        let mut owned = String::new();
        owned
            .try_reserve_exact(len)
            .map_err(|_| PersistError::AllocationFailed { bytes: len })?;
        owned.push_str(value);

        self.buf.advance(len + 1);
        Ok(owned)
    }

    fn read_strs(
        &mut self,
        field: &'static str,
        count: usize,
    ) -> Result<Vec<Option<String>>, PersistError> {
        // Every element takes at least its terminating zero.
        self.ensure(count)?;

        let mut items = Vec::new();
        items
            .try_reserve_exact(count)
            .map_err(|_| PersistError::AllocationFailed {
                bytes: count.saturating_mul(std::mem::size_of::<Option<String>>()),
            })?;
        for _ in 0..count {
            items.push(Some(self.read_str(field)?));
        }
        Ok(items)
    }
}

/// Walk the descriptors in order, staging one value per field.
fn read_fields<R>(
    reader: &mut FrameReader<'_>,
    fields: &[FieldDescriptor<R>],
    ledger: &mut DecodeLedger<R>,
) -> Result<(), PersistError> {
    for field in fields {
        let pending = match &field.kind {
            FieldKind::Scalar { tag, set, .. } => Pending::Scalar(*set, reader.read_scalar(*tag)?),
            FieldKind::Str { set, .. } => Pending::Str(*set, reader.read_str(field.name)?),
            FieldKind::ScalarArray { tag, set, .. } => {
                let width = tag.fixed_width()?;
                let count = reader.read_count()?;
                let items = match count {
                    0 => None,
                    count => Some(reader.read_scalars(*tag, width, count)?),
                };
                Pending::ScalarArray(*set, count as u32, items)
            }
            FieldKind::StrArray { set, .. } => {
                let count = reader.read_count()?;
                let items = match count {
                    0 => None,
                    count => Some(reader.read_strs(field.name, count)?),
                };
                Pending::StrArray(*set, count as u32, items)
            }
        };
        trace!(field = field.name, position = reader.position(), "decoded field");
        ledger.push(pending);
    }
    Ok(())
}

/// Frame decoder over a borrowed input buffer.
///
/// The buffer may be longer than the frame; bytes past the declared length
/// are ignored.
pub struct Decoder<'a> {
    buf: &'a [u8],
}

impl<'a> Decoder<'a> {
    /// Create a decoder over `buf`.
    pub const fn new(buf: &'a [u8]) -> Self {
        Self { buf }
    }

    /// Validate the header and the declared length.
    pub fn header(&self) -> Result<FrameHeader, PersistError> {
        peek_header(self.buf)
    }

    /// Read and validate the whole frame without touching any record.
    ///
    /// On success the returned ledger owns every decoded value; on failure
    /// everything allocated so far has already been released.
    pub fn stage<R>(&self, fields: &[FieldDescriptor<R>]) -> Result<DecodeLedger<R>, PersistError> {
        let header = self.header()?;
        let total = header.len();
        let mut reader = FrameReader {
            buf: &self.buf[HEADER_SIZE..total],
            end: total,
        };

        let mut ledger = DecodeLedger::with_capacity(fields.len());
        read_fields(&mut reader, fields, &mut ledger)?;

        reader.ensure(FOOTER_SIZE)?;
        let back = reader.buf.get_u64_ne();
        if back != SIG_BACK {
            warn!(signature = back, "back signature mismatch");
            return Err(PersistError::BackSignatureMismatch(back));
        }
        if !reader.buf.is_empty() {
            return Err(PersistError::Misalignment {
                expected: total,
                actual: reader.position(),
            });
        }

        Ok(ledger)
    }

    /// Decode the frame into `out`.
    ///
    /// `out` is only written once the whole frame has been validated, so on
    /// error it is left exactly as it was.
    pub fn decode_into<R>(
        &self,
        fields: &[FieldDescriptor<R>],
        out: &mut R,
    ) -> Result<(), PersistError> {
        let ledger = self.stage(fields)?;
        let populated = ledger.len();
        ledger.commit(out);
        debug!(fields = populated, bytes = self.buf.len(), "decoded frame");
        Ok(())
    }

    /// Decode the frame into a new default record.
    pub fn decode<R: Default>(&self, fields: &[FieldDescriptor<R>]) -> Result<R, PersistError> {
        let mut record = R::default();
        self.decode_into(fields, &mut record)?;
        Ok(record)
    }
}

/// Decode the frame in `buf` into `out`.
pub fn deserialize<R>(
    buf: &[u8],
    fields: &[FieldDescriptor<R>],
    out: &mut R,
) -> Result<(), PersistError> {
    Decoder::new(buf).decode_into(fields, out)
}

/// Decode the frame in `buf` into a new default record.
pub fn from_bytes<R: Default>(buf: &[u8], fields: &[FieldDescriptor<R>]) -> Result<R, PersistError> {
    Decoder::new(buf).decode(fields)
}
