//! Whole-frame file adapters.
//!
//! These only move bytes: one frame is written with a single whole-buffer
//! write, and read back after sizing the input from the file metadata.

use std::fs::File;
use std::io::{self, Read, Write};

use tracing::debug;

use crate::{FieldDescriptor, PersistError, deserialize, serialize};

/// Write the whole buffer, reporting how far a stalled sink got.
fn write_frame<W: Write>(writer: &mut W, frame: &[u8]) -> Result<(), PersistError> {
    let mut written = 0;
    while written < frame.len() {
        match writer.write(&frame[written..]) {
            Ok(0) => {
                return Err(PersistError::ShortWrite {
                    expected: frame.len(),
                    actual: written,
                });
            }
            Ok(n) => written += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e.into()),
        }
    }
    Ok(())
}

/// Fill `buf` completely, reporting how far a drained source got.
fn read_frame<Rd: Read>(reader: &mut Rd, buf: &mut [u8]) -> Result<(), PersistError> {
    let mut read = 0;
    while read < buf.len() {
        match reader.read(&mut buf[read..]) {
            Ok(0) => {
                return Err(PersistError::ShortRead {
                    expected: buf.len(),
                    actual: read,
                });
            }
            Ok(n) => read += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e.into()),
        }
    }
    Ok(())
}

/// Encode `record` and write the frame to `writer`. Returns the frame length.
pub fn write_to_file<R, W: Write>(
    record: &R,
    fields: &[FieldDescriptor<R>],
    writer: &mut W,
) -> Result<usize, PersistError> {
    let frame = serialize(record, fields)?;
    write_frame(writer, &frame)?;
    writer.flush()?;

    debug!(bytes = frame.len(), "wrote frame");
    Ok(frame.len())
}

/// Read exactly `len` bytes from `reader` and decode them into `out`.
pub fn read_from_reader<R, Rd: Read>(
    out: &mut R,
    fields: &[FieldDescriptor<R>],
    reader: &mut Rd,
    len: usize,
) -> Result<(), PersistError> {
    let mut buf = Vec::new();
    buf.try_reserve_exact(len)
        .map_err(|_| PersistError::AllocationFailed { bytes: len })?;
    buf.resize(len, 0);

    read_frame(reader, &mut buf)?;
    debug!(bytes = len, "read frame");

    deserialize(&buf, fields, out)
}

/// Read the whole of `file` and decode it into `out`.
///
/// The input length is taken from the file size.
pub fn read_from_file<R>(
    out: &mut R,
    fields: &[FieldDescriptor<R>],
    file: &mut File,
) -> Result<(), PersistError> {
    let len = file.metadata()?.len();
    let len = usize::try_from(len).map_err(|_| PersistError::AllocationFailed {
        bytes: usize::MAX,
    })?;
    read_from_reader(out, fields, file, len)
}
