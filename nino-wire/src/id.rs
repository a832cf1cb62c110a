//! Deterministic 32-bit type identifiers.
//!
//! A [`TypeId`] is the wire tag for polymorphic values and the key of the
//! runtime dispatch table. It is a pure function of a type's fully-qualified
//! name, so the same type hashes to the same id across processes, platforms,
//! and host compiler versions.
use core::fmt;

/// A deterministic 32-bit hash of a type's fully-qualified name.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeId(pub i32);

impl TypeId {
    /// Reserved sentinel written for null references.
    pub const NULL: TypeId = TypeId(0);

    /// Hash a fully-qualified type name into its wire id.
    ///
    /// Dual-lane djb2: even-indexed bytes feed one lane, odd-indexed bytes
    /// the other, combined with a final multiply. Never the runtime identity
    /// hash; the id depends only on the string.
    #[must_use]
    pub fn of(fqn: &str) -> TypeId {
        let mut hash1: u32 = 5381;
        let mut hash2: u32 = 5381;
        for (i, byte) in fqn.bytes().enumerate() {
            if i % 2 == 0 {
                hash1 = (hash1.wrapping_shl(5)).wrapping_add(hash1) ^ u32::from(byte);
            } else {
                hash2 = (hash2.wrapping_shl(5)).wrapping_add(hash2) ^ u32::from(byte);
            }
        }
        TypeId(hash1.wrapping_add(hash2.wrapping_mul(1_566_083_941)) as i32)
    }

    /// The raw 32-bit value as written on the wire.
    #[inline]
    #[must_use]
    pub const fn raw(self) -> i32 {
        self.0
    }

    #[inline]
    #[must_use]
    pub const fn is_null(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Debug for TypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeId({:#010x})", self.0 as u32)
    }
}

impl fmt::Display for TypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#010x}", self.0 as u32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_is_stable_across_calls() {
        assert_eq!(TypeId::of("Game.A"), TypeId::of("Game.A"));
        assert_eq!(TypeId::of("Game.A").raw(), 805_598_721);
        assert_eq!(TypeId::of("Game.B").raw(), 1_208_883_248);
        assert_eq!(TypeId::of("Game.C").raw(), -357_200_693);
        assert_eq!(
            TypeId::of("System.Collections.Generic.List<int>").raw(),
            -794_398_500
        );
    }

    #[test]
    fn distinct_names_get_distinct_ids() {
        assert_ne!(TypeId::of("Game.A"), TypeId::of("Game.B"));
        assert_ne!(TypeId::of("A"), TypeId::of("a"));
    }

    #[test]
    fn null_sentinel_is_zero() {
        assert!(TypeId::NULL.is_null());
        assert_eq!(TypeId::NULL.raw(), 0);
    }
}
