//! Marker trait for values that can cross the wire as raw bytes.

/// Indicates that the type is represented by raw bytes and does not have any
/// invalid bit patterns, so a single bulk copy is a valid encode or decode.
///
/// This is what makes the unmanaged fast paths of [`Writer`](crate::Writer)
/// and [`Reader`](crate::Reader) sound; the generator only selects those
/// paths for member runs whose every leaf is unmanaged.
///
/// # Safety
///
/// Implementors must guarantee:
/// - every bit pattern of the type is a valid value (notably excludes `bool`
///   and `char`),
/// - the in-memory representation has no padding bytes (`#[repr(C)]` structs
///   must order fields so none is introduced),
/// - the type is `Copy` with no drop glue.
pub unsafe trait Pod: Copy {}

macro_rules! impl_pod {
    ($($ty:ty),* $(,)?) => {
        $(
            // SAFETY: primitive integers and floats have no invalid bit
            // patterns and no padding.
            unsafe impl Pod for $ty {}
        )*
    };
}

impl_pod!(u8, u16, u32, u64, u128, usize, i8, i16, i32, i64, i128, isize, f32, f64);

// SAFETY: an array of Pod is Pod; arrays have no padding between elements.
unsafe impl<T: Pod, const N: usize> Pod for [T; N] {}
