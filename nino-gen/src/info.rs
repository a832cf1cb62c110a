//! The `TypeInfo` value record.
//!
//! Everything downstream of metadata projection sees types only through
//! this record. It is value-equatable (equal content means equal hash and
//! equal identity), which is the caching contract of the whole pipeline.
//! Recursive positions (generic arguments, array elements, nullable
//! underlyings, tuple elements) are always fully materialized, never
//! forward references, so equality is structural.
use {
    crate::symbols::{Accessibility, SpecialType, SymbolKind},
    nino_wire::TypeId,
};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GenericInfo {
    /// Original definition display, e.g.
    /// `System.Collections.Generic.List<T>`.
    pub definition: String,
    pub args: Vec<TypeInfo>,
    pub is_definition: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ArrayInfo {
    pub rank: u32,
    pub element: Box<TypeInfo>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TupleElementInfo {
    /// Canonical positional name (`Item1`, `Item2`, …). User-declared
    /// element names are erased during normalization so that two tuples
    /// differing only in names share an identity.
    pub name: String,
    pub ty: TypeInfo,
}

/// Collection surface of a user-typed enumerable, captured at projection so
/// the structural emitter can pick a construction strategy without going
/// back to host metadata.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EnumerableInfo {
    pub element: Box<TypeInfo>,
    /// Public `Add(element)` plus `Clear()`.
    pub has_add_clear: bool,
    /// A constructor accepting an array/enumerable of the element type.
    pub has_enumerable_ctor: bool,
}

/// Identity, classification, traits and shape of one type, projected from
/// host metadata into a pure value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TypeInfo {
    /// Deterministic hash of the fully-qualified (normalized) name. Two
    /// records with the same id are interchangeable for dispatch.
    pub type_id: TypeId,
    pub kind: SymbolKind,
    pub special: SpecialType,
    pub accessibility: Accessibility,
    pub is_value_type: bool,
    pub is_unmanaged: bool,
    pub is_ref_like: bool,
    pub is_record: bool,
    pub is_abstract: bool,
    pub is_sealed: bool,
    pub is_static: bool,
    /// Interfaces, and reference types that are neither sealed nor structs.
    pub is_polymorphic: bool,
    pub is_enum: bool,
    pub enum_underlying: Option<Box<TypeInfo>>,
    pub generic: Option<GenericInfo>,
    pub array: Option<ArrayInfo>,
    /// `Nullable<T>`'s underlying value type.
    pub nullable: Option<Box<TypeInfo>>,
    pub tuple_elements: Vec<TupleElementInfo>,
    pub enumerable: Option<EnumerableInfo>,
    pub namespace: String,
    pub assembly: String,
    /// Display name with multi-dimensional-array syntax sanitized
    /// (`T[*,*]` → `T[,]`). This is the fully-qualified name the id hashes.
    pub display_name: String,
    /// Host-convention display before sanitization.
    pub raw_display_name: String,
    /// Lowercase, identifier-safe variable name with the reserved `@`
    /// sigil, e.g. `@game_a`.
    pub instance_name: String,
    pub simple_name: String,
}

impl TypeInfo {
    /// The fully-qualified, normalized name the [`TypeId`] is derived from.
    #[inline]
    #[must_use]
    pub fn fqn(&self) -> &str {
        &self.display_name
    }

    #[inline]
    #[must_use]
    pub fn is_reference_type(&self) -> bool {
        !self.is_value_type
    }

    #[inline]
    #[must_use]
    pub fn is_string(&self) -> bool {
        self.special == SpecialType::String
    }

    #[inline]
    #[must_use]
    pub fn is_generic(&self) -> bool {
        self.generic.is_some()
    }

    /// True when a concrete type is required here but a generic type
    /// parameter (or a shape still containing one) was supplied.
    #[must_use]
    pub fn has_type_parameter(&self) -> bool {
        if self.kind == SymbolKind::TypeParameter {
            return true;
        }
        if let Some(generic) = &self.generic {
            if generic.is_definition || generic.args.iter().any(TypeInfo::has_type_parameter) {
                return true;
            }
        }
        if let Some(array) = &self.array {
            if array.element.has_type_parameter() {
                return true;
            }
        }
        if let Some(nullable) = &self.nullable {
            if nullable.has_type_parameter() {
                return true;
            }
        }
        self.tuple_elements
            .iter()
            .any(|element| element.ty.has_type_parameter())
    }

    /// Immediate child shapes: generic arguments, array element, nullable
    /// underlying, tuple elements. Cycle detection and builtin-shape
    /// collection both walk these edges.
    pub fn children(&self) -> impl Iterator<Item = &TypeInfo> {
        let generic = self.generic.iter().flat_map(|g| g.args.iter());
        let array = self.array.iter().map(|a| a.element.as_ref());
        let nullable = self.nullable.iter().map(|n| n.as_ref());
        let tuple = self.tuple_elements.iter().map(|e| &e.ty);
        generic.chain(array).chain(nullable).chain(tuple)
    }
}
