use bytes::BytesMut;
use tokio_util::codec;

use crate::{Decoder, FieldDescriptor, HEADER_SIZE, PersistError, read_header, serialize_into};

/// Stream codec carrying one record per frame.
///
/// Frames are self-delimiting through the length in their header, so any
/// byte stream (a file holding several frames, a socket) can be split with
/// [`FramedRead`](tokio_util::codec::FramedRead) and written with
/// [`FramedWrite`](tokio_util::codec::FramedWrite).
pub struct PersistCodec<'f, R> {
    fields: &'f [FieldDescriptor<R>],
}

impl<'f, R> PersistCodec<'f, R> {
    /// Create a codec over a descriptor table.
    pub const fn new(fields: &'f [FieldDescriptor<R>]) -> Self {
        Self { fields }
    }
}

impl<R> Clone for PersistCodec<'_, R> {
    fn clone(&self) -> Self {
        Self {
            fields: self.fields,
        }
    }
}

impl<R: Default> codec::Decoder for PersistCodec<'_, R> {
    type Item = R;
    type Error = PersistError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.len() < HEADER_SIZE {
            return Ok(None);
        }

        let len = read_header(src)?.len();
        if src.len() < len {
            src.reserve(len - src.len());
            return Ok(None);
        }

        let frame = src.split_to(len).freeze();
        Decoder::new(&frame).decode(self.fields).map(Some)
    }
}

impl<R> codec::Encoder<&R> for PersistCodec<'_, R> {
    type Error = PersistError;

    fn encode(&mut self, item: &R, dst: &mut BytesMut) -> Result<(), Self::Error> {
        serialize_into(item, self.fields, dst).map(|_| ())
    }
}
