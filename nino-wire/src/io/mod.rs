//! [`Writer`] and [`Reader`] implementations for the wire contract.

mod reader;
mod writer;

pub use {
    reader::Reader,
    writer::{Frame, Writer},
};

/// Distinguished 32-bit header value encoding a null collection (or null
/// string). Real lengths are restricted to the 31-bit range, so this value
/// can never be a valid element count.
pub const NULL_COLLECTION: u32 = 0x8000_0000;

/// Upper bound (inclusive) for a collection header's element count.
pub const MAX_COLLECTION_LEN: usize = i32::MAX as usize;
