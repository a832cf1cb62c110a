use {
    super::NULL_COLLECTION,
    crate::{
        error::{eof, invalid_bool_encoding, invalid_collection_length, ReadError, ReadResult},
        id::TypeId,
        pod::Pod,
    },
    core::{mem::size_of, ptr},
};

/// A bounds-checked cursor over a byte slice implementing the read side of
/// the wire contract.
///
/// # Examples
///
/// ```
/// use nino_wire::{Reader, Writer};
///
/// let mut writer = Writer::new();
/// writer.write_str_utf16(Some("hi")).unwrap();
/// let bytes = writer.into_bytes();
///
/// let mut reader = Reader::new(&bytes);
/// assert_eq!(reader.read_str_utf16().unwrap().as_deref(), Some("hi"));
/// assert!(reader.is_eof());
/// ```
pub struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    #[must_use]
    pub const fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    #[inline]
    #[must_use]
    pub const fn position(&self) -> usize {
        self.pos
    }

    #[inline]
    #[must_use]
    pub const fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    /// True once every byte has been consumed. With weak-version-tolerance
    /// enabled, generated deserializers check this at entry and yield the
    /// type's default silently.
    #[inline]
    #[must_use]
    pub const fn is_eof(&self) -> bool {
        self.pos >= self.buf.len()
    }

    /// Consume and return exactly `n` bytes.
    pub fn read_bytes(&mut self, n: usize) -> ReadResult<&'a [u8]> {
        let Some(src) = self.buf[self.pos..].get(..n) else {
            return Err(eof(n, self.remaining()));
        };
        self.pos += n;
        Ok(src)
    }

    /// Read a single unmanaged value from its raw wire bytes.
    pub fn read_unmanaged<T: Pod>(&mut self) -> ReadResult<T> {
        let src = self.read_bytes(size_of::<T>())?;
        // SAFETY: `T: Pod` guarantees every bit pattern is valid; the source
        // slice is exactly `size_of::<T>()` bytes and may be unaligned.
        Ok(unsafe { ptr::read_unaligned(src.as_ptr().cast::<T>()) })
    }

    /// Read `len` unmanaged values as a single bulk copy.
    pub fn read_unmanaged_vec<T: Pod>(&mut self, len: usize) -> ReadResult<Vec<T>> {
        let byte_len = len
            .checked_mul(size_of::<T>())
            .ok_or_else(|| eof(usize::MAX, self.remaining()))?;
        let src = self.read_bytes(byte_len)?;
        let mut out: Vec<T> = Vec::with_capacity(len);
        // SAFETY: `src` holds exactly `len * size_of::<T>()` valid bytes and
        // `out` has capacity for `len` elements; Pod rules out invalid bit
        // patterns.
        unsafe {
            ptr::copy_nonoverlapping(src.as_ptr(), out.as_mut_ptr().cast::<u8>(), byte_len);
            out.set_len(len);
        }
        Ok(out)
    }

    pub fn read_bool(&mut self) -> ReadResult<bool> {
        match self.read_unmanaged::<u8>()? {
            0 => Ok(false),
            1 => Ok(true),
            byte => Err(invalid_bool_encoding(byte)),
        }
    }

    /// Read a 32-bit collection header. Returns `None` for the null
    /// sentinel, otherwise the element count.
    ///
    /// A count that could not possibly fit the remaining payload (each
    /// element takes at least one byte) is rejected as an invalid payload.
    pub fn read_collection_header(&mut self) -> ReadResult<Option<u32>> {
        let raw = self.read_unmanaged::<u32>()?;
        if raw == NULL_COLLECTION {
            return Ok(None);
        }
        if raw as usize > self.remaining() {
            return Err(invalid_collection_length(raw));
        }
        Ok(Some(raw))
    }

    /// Read a 32-bit polymorphic type-id prefix.
    #[inline]
    pub fn read_type_id(&mut self) -> ReadResult<TypeId> {
        Ok(TypeId(self.read_unmanaged::<i32>()?))
    }

    /// Read a default-mode string. Returns `None` for the null sentinel.
    pub fn read_str_utf16(&mut self) -> ReadResult<Option<String>> {
        let Some(units) = self.read_collection_header()? else {
            return Ok(None);
        };
        let byte_len = units as usize * 2;
        let src = self.read_bytes(byte_len)?;
        let mut decoded = Vec::with_capacity(units as usize);
        for pair in src.chunks_exact(2) {
            decoded.push(u16::from_ne_bytes([pair[0], pair[1]]));
        }
        String::from_utf16(&decoded)
            .map(Some)
            .map_err(|_| ReadError::InvalidUtf16Encoding)
    }

    /// Read an opt-in utf8-mode string. Returns `None` for the null
    /// sentinel.
    pub fn read_str_utf8(&mut self) -> ReadResult<Option<String>> {
        let Some(byte_len) = self.read_collection_header()? else {
            return Ok(None);
        };
        let src = self.read_bytes(byte_len as usize)?;
        Ok(Some(core::str::from_utf8(src)?.to_owned()))
    }

    /// Enter a weak-version-tolerance member frame.
    ///
    /// Returns `Ok(None)` at EOF, in which case the member takes its default
    /// value. Otherwise reads the 4-byte payload length, advances this
    /// reader past the frame, and returns a sub-reader confined to the
    /// frame's payload, so a decoder that does not understand the payload
    /// is still correctly positioned at the next member.
    pub fn enter_frame(&mut self) -> ReadResult<Option<Reader<'a>>> {
        if self.is_eof() {
            return Ok(None);
        }
        let len = self.read_unmanaged::<u32>()? as usize;
        let payload = self.read_bytes(len)?;
        Ok(Some(Reader::new(payload)))
    }
}
