//! A descriptor-driven binary codec for plain records.
//!
//! A record is described by an ordered table of [`FieldDescriptor`]s. The
//! same table drives the size estimator, the encoder and the decoder, which
//! walk it in lockstep. Every encoded record is a self-describing frame:
//!
//! ```text
//! [ front signature (8) | total length (4) | field payloads... | back signature (8) ]
//! ```
//!
//! Values are written in the host's native byte order. Strings are zero
//! terminated (a missing string is a lone zero byte, so it decodes as an
//! empty string), arrays carry a 4-byte element count.
//!
//! # Examples
//!
//! ```rust
//! # fn test() -> Result<(), persist::PersistError> {
//! use persist::{FieldDescriptor, persist_fields};
//!
//! #[derive(Debug, Default, PartialEq)]
//! struct User {
//!     id: i32,
//!     score: f64,
//!     name: Option<String>,
//!     active: bool,
//!     scores: Option<Vec<i32>>,
//!     score_count: u32,
//! }
//!
//! static USER_FIELDS: &[FieldDescriptor<User>] = persist_fields!(User {
//!     id: i32,
//!     score: f64,
//!     name: str,
//!     active: bool,
//!     scores: [i32; score_count],
//! });
//!
//! let user = User {
//!     id: 42,
//!     score: 99.7,
//!     name: Some("Hans".to_owned()),
//!     active: true,
//!     scores: Some(vec![1, 2, 3]),
//!     score_count: 3,
//! };
//!
//! let frame = persist::serialize(&user, USER_FIELDS)?;
//! assert_eq!(frame.len(), persist::estimate_size(&user, USER_FIELDS)?);
//!
//! let mut decoded = User::default();
//! persist::deserialize(&frame, USER_FIELDS, &mut decoded)?;
//! assert_eq!(decoded, user);
//! # Ok(())
//! # }
//! # test().expect("test failed");
//! ```
//!
//! ## License
//!
//! This project is licensed under the [MIT](./LICENSE.MIT) or [Apache-2.0](./LICENSE.Apache-2.0) license.
//! You can choose between one of them if you use this work.
//!
//! `SPDX-License-Identifier: MIT OR Apache-2.0`
#![cfg_attr(all(coverage_nightly, test), feature(coverage_attribute))]
#![deny(unsafe_code)]

#[cfg(feature = "codec")]
mod codec;
mod decode;
mod define;
mod descriptor;
mod encode;
mod errors;
mod estimate;
mod file;
mod value;

#[cfg(feature = "codec")]
pub use crate::codec::PersistCodec;
pub use crate::decode::{
    DecodeLedger, Decoder, FrameHeader, deserialize, from_bytes, peek_header, read_header,
};
pub use crate::define::{
    COUNT_SIZE, FOOTER_SIZE, FRAME_OVERHEAD, HEADER_SIZE, SIG_BACK, SIG_FRONT, TypeTag, Width,
};
pub use crate::descriptor::{
    FieldDescriptor, FieldKind, ScalarArrayGetter, ScalarArrayRef, StrArrayGetter, StrArrayRef,
};
pub use crate::encode::{Encoder, serialize, serialize_into};
pub use crate::errors::{ErrorCode, PersistError, describe_error, report_error};
pub use crate::estimate::{estimate_size, payload_size};
pub use crate::file::{read_from_file, read_from_reader, write_to_file};
pub use crate::value::{Primitive, Scalar, ScalarSlice, ScalarVec};

/// Result alias used across the crate.
pub type Result<T, E = PersistError> = std::result::Result<T, E>;
