//! Error types and helpers.
use {core::str::Utf8Error, thiserror::Error};

#[derive(Error, Debug)]
pub enum WriteError {
    #[error("Collection length {0} exceeds the 31-bit header range")]
    LengthOverflow(usize),
    #[error("Value's runtime type is not registered for serialization")]
    NotRegistered,
    #[error("Runtime type id {child} is not a recorded sub-type of declared type id {declared}")]
    UnknownSubType { declared: i32, child: i32 },
}

#[derive(Error, Debug)]
pub enum ReadError {
    #[error("Attempting to read {needed} bytes with {remaining} remaining")]
    Eof { needed: usize, remaining: usize },
    #[error("Invalid bool encoding: {0}")]
    InvalidBoolEncoding(u8),
    #[error("Unknown polymorphic type id: {0}")]
    UnknownTypeId(i32),
    #[error("Collection length {0} exceeds the remaining payload")]
    InvalidCollectionLength(u32),
    #[error(transparent)]
    InvalidUtf8Encoding(#[from] Utf8Error),
    #[error("Invalid utf-16 payload")]
    InvalidUtf16Encoding,
    #[error("Constructor invocation failed: {0}")]
    ConstructorFailed(&'static str),
    #[error("Type id {0} has no registered deserializer")]
    NotRegistered(i32),
}

pub type WriteResult<T> = core::result::Result<T, WriteError>;
pub type ReadResult<T> = core::result::Result<T, ReadError>;

#[cold]
pub const fn eof(needed: usize, remaining: usize) -> ReadError {
    ReadError::Eof { needed, remaining }
}

#[cold]
pub const fn invalid_bool_encoding(byte: u8) -> ReadError {
    ReadError::InvalidBoolEncoding(byte)
}

#[cold]
pub const fn unknown_type_id(id: i32) -> ReadError {
    ReadError::UnknownTypeId(id)
}

#[cold]
pub const fn invalid_collection_length(len: u32) -> ReadError {
    ReadError::InvalidCollectionLength(len)
}

#[cold]
pub const fn length_overflow(len: usize) -> WriteError {
    WriteError::LengthOverflow(len)
}
