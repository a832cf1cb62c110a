use {
    super::{MAX_COLLECTION_LEN, NULL_COLLECTION},
    crate::{
        error::{length_overflow, WriteResult},
        id::TypeId,
        pod::Pod,
    },
    core::{mem::size_of, ptr, slice},
};

/// A growable byte sink implementing the write side of the wire contract.
///
/// All multi-byte values are written host-endian with their natural size and
/// no padding. The writer never fails on capacity; the only write-side
/// failures are contract violations (oversized collection headers,
/// unregistered polymorphic values).
///
/// # Examples
///
/// ```
/// use nino_wire::Writer;
///
/// let mut writer = Writer::new();
/// writer.write_collection_header(2).unwrap();
/// writer.write_unmanaged(&1i32);
/// writer.write_unmanaged(&2i32);
/// assert_eq!(writer.as_bytes().len(), 4 + 8);
/// ```
pub struct Writer {
    buf: Vec<u8>,
}

/// Offset of a reserved 4-byte length placeholder, to be back-patched with
/// [`Writer::patch_frame`] once the member payload has been written.
#[derive(Debug, Clone, Copy)]
#[must_use = "a reserved frame must be patched"]
pub struct Frame(usize);

impl Writer {
    #[must_use]
    pub const fn new() -> Self {
        Self { buf: Vec::new() }
    }

    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: Vec::with_capacity(capacity),
        }
    }

    #[inline]
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn clear(&mut self) {
        self.buf.clear();
    }

    #[inline]
    pub fn write_bytes(&mut self, src: &[u8]) {
        self.buf.extend_from_slice(src);
    }

    /// Write a single unmanaged value as its raw in-memory bytes.
    #[inline]
    pub fn write_unmanaged<T: Pod>(&mut self, value: &T) {
        // SAFETY: `T: Pod` guarantees no padding and a raw-byte-stable
        // representation.
        let src = unsafe { slice::from_raw_parts(ptr::from_ref(value).cast::<u8>(), size_of::<T>()) };
        self.buf.extend_from_slice(src);
    }

    /// Write a contiguous run of unmanaged values as a single bulk copy.
    ///
    /// This is the fast path the generator selects for collections and
    /// member runs whose every leaf is unmanaged and non-polymorphic.
    #[inline]
    pub fn write_unmanaged_slice<T: Pod>(&mut self, values: &[T]) {
        // SAFETY: as above; slices of Pod have no inter-element padding.
        let src = unsafe {
            slice::from_raw_parts(values.as_ptr().cast::<u8>(), core::mem::size_of_val(values))
        };
        self.buf.extend_from_slice(src);
    }

    #[inline]
    pub fn write_bool(&mut self, value: bool) {
        self.buf.push(u8::from(value));
    }

    /// Write a 32-bit collection header carrying `len`.
    ///
    /// Fails with [`WriteError::LengthOverflow`](crate::WriteError) if `len`
    /// does not fit the 31-bit range reserved for real lengths.
    pub fn write_collection_header(&mut self, len: usize) -> WriteResult<()> {
        if len > MAX_COLLECTION_LEN {
            return Err(length_overflow(len));
        }
        self.write_unmanaged(&(len as u32));
        Ok(())
    }

    /// Write the distinguished null-collection sentinel.
    pub fn write_null_collection(&mut self) {
        self.write_unmanaged(&NULL_COLLECTION);
    }

    /// Write a 32-bit polymorphic type-id prefix.
    #[inline]
    pub fn write_type_id(&mut self, id: TypeId) {
        self.write_unmanaged(&id.raw());
    }

    /// Write a string in the default mode: a collection header carrying the
    /// UTF-16 code unit count, followed by the code units. `None` writes the
    /// null sentinel only.
    pub fn write_str_utf16(&mut self, value: Option<&str>) -> WriteResult<()> {
        let Some(value) = value else {
            self.write_null_collection();
            return Ok(());
        };
        let units: Vec<u16> = value.encode_utf16().collect();
        self.write_collection_header(units.len())?;
        self.write_unmanaged_slice(&units);
        Ok(())
    }

    /// Write a string in the opt-in utf8 mode: a collection header carrying
    /// the byte length, followed by the UTF-8 bytes.
    pub fn write_str_utf8(&mut self, value: Option<&str>) -> WriteResult<()> {
        let Some(value) = value else {
            self.write_null_collection();
            return Ok(());
        };
        self.write_collection_header(value.len())?;
        self.write_bytes(value.as_bytes());
        Ok(())
    }

    /// Reserve a 4-byte length placeholder for a weak-version-tolerance
    /// member frame. The returned [`Frame`] must be handed back to
    /// [`Writer::patch_frame`] after the member payload has been written.
    pub fn reserve_frame(&mut self) -> Frame {
        let offset = self.buf.len();
        self.write_unmanaged(&0u32);
        Frame(offset)
    }

    /// Back-patch a reserved frame with the number of payload bytes written
    /// since [`Writer::reserve_frame`] (exclusive of the 4-byte prefix).
    pub fn patch_frame(&mut self, frame: Frame) {
        let Frame(offset) = frame;
        debug_assert!(offset + 4 <= self.buf.len(), "frame reserved past the buffer");
        let len = (self.buf.len() - offset - 4) as u32;
        self.buf[offset..offset + 4].copy_from_slice(&len.to_ne_bytes());
    }
}

impl Default for Writer {
    fn default() -> Self {
        Self::new()
    }
}
