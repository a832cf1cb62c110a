//! `nino-wire` is the reference implementation of the Nino binary wire
//! contract: the byte-level [`Writer`] and [`Reader`] cursors, collection
//! headers, polymorphic type-id prefixes, both string modes, the optional
//! weak-version-tolerance framing, and the process-wide runtime dispatch
//! table ([`registry::Registry`]) that generated code installs itself into.
//!
//! The code generator (`nino-gen`) emits host-language routines that target
//! exactly the operations exposed here; this crate makes those semantics
//! executable so the wire format can be validated without a host toolchain.
//!
//! # Wire format
//!
//! - Unmanaged fixed-size values: host-endian, natural size, no padding.
//! - Booleans: one byte, `0` or `1`; anything else is an invalid payload.
//! - Collections: a 32-bit header carrying the element count, or the
//!   distinguished [`NULL_COLLECTION`](io::NULL_COLLECTION) sentinel for a
//!   null collection. Empty collections write the header and nothing else.
//! - Strings: length-prefixed UTF-16 code units by default; a member-level
//!   opt-in UTF-8 mode with a 32-bit byte-length prefix. Null strings use
//!   the null-collection sentinel in both modes.
//! - Polymorphic values: a 32-bit [`TypeId`] prefix, with [`TypeId::NULL`]
//!   reserved for null references.
//! - Weak-version-tolerance framing: each managed member is preceded by a
//!   4-byte back-patched payload length so decoders can skip unknown
//!   trailing members or default missing ones.
//!
//! # Quickstart
//!
//! ```
//! use nino_wire::{Reader, Writer};
//!
//! let mut writer = Writer::new();
//! writer.write_unmanaged(&42i32);
//! writer.write_bool(true);
//!
//! let bytes = writer.into_bytes();
//! let mut reader = Reader::new(&bytes);
//! assert_eq!(reader.read_unmanaged::<i32>().unwrap(), 42);
//! assert!(reader.read_bool().unwrap());
//! ```

pub mod error;
pub use error::{ReadError, ReadResult, WriteError, WriteResult};
pub mod id;
pub use id::TypeId;
pub mod io;
pub use io::{Reader, Writer};
mod pod;
pub use pod::Pod;
pub mod registry;
#[cfg(test)]
mod proptest_config;
