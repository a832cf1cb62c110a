//! The read-only host metadata contract.
//!
//! The host compiler front-end is an external collaborator: it owns parsing,
//! binding and semantic analysis, and hands the generator a fully-resolved,
//! immutable object model of the types it compiled. This module defines that
//! model. Nothing downstream of metadata projection may hold one of these
//! symbols; projection turns them into value records and drops them.
use {rustc_hash::FxHashSet, std::sync::Arc};

pub type SymbolRef = Arc<TypeSymbol>;

/// Host-language classification of a type declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SymbolKind {
    #[default]
    Class,
    Struct,
    Interface,
    Enum,
    Array,
    Pointer,
    Delegate,
    TypeParameter,
}

/// Well-known built-in primitives and collection interfaces the host tags
/// directly, so the generator never string-matches their names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SpecialType {
    #[default]
    None,
    Bool,
    Byte,
    SByte,
    Short,
    UShort,
    Int,
    UInt,
    Long,
    ULong,
    Float,
    Double,
    Char,
    String,
    Object,
    /// `System.Collections.Generic.IEnumerable<T>` and friends.
    EnumerableInterface,
}

impl SpecialType {
    /// The host-language keyword for the primitive, if there is one.
    #[must_use]
    pub const fn keyword(self) -> Option<&'static str> {
        Some(match self {
            SpecialType::Bool => "bool",
            SpecialType::Byte => "byte",
            SpecialType::SByte => "sbyte",
            SpecialType::Short => "short",
            SpecialType::UShort => "ushort",
            SpecialType::Int => "int",
            SpecialType::UInt => "uint",
            SpecialType::Long => "long",
            SpecialType::ULong => "ulong",
            SpecialType::Float => "float",
            SpecialType::Double => "double",
            SpecialType::Char => "char",
            SpecialType::String => "string",
            SpecialType::Object => "object",
            _ => return None,
        })
    }

    #[must_use]
    pub const fn is_unmanaged_primitive(self) -> bool {
        matches!(
            self,
            SpecialType::Bool
                | SpecialType::Byte
                | SpecialType::SByte
                | SpecialType::Short
                | SpecialType::UShort
                | SpecialType::Int
                | SpecialType::UInt
                | SpecialType::Long
                | SpecialType::ULong
                | SpecialType::Float
                | SpecialType::Double
                | SpecialType::Char
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Accessibility {
    #[default]
    Public,
    Internal,
    Protected,
    Private,
}

/// Generic shape of a constructed or unbound generic type.
#[derive(Debug, Clone, Default)]
pub struct GenericShape {
    /// Original definition display, e.g.
    /// `System.Collections.Generic.List<T>`.
    pub definition: String,
    pub args: Vec<SymbolRef>,
    /// True for the unbound definition itself (no concrete arguments).
    pub is_definition: bool,
}

#[derive(Debug, Clone)]
pub struct ArrayShape {
    pub rank: u32,
    pub element: SymbolRef,
}

#[derive(Debug, Clone)]
pub struct TupleElement {
    /// User-declared element name, if any. Identity ignores it.
    pub name: Option<String>,
    pub ty: SymbolRef,
}

/// A field or auto-property as the host sees it.
#[derive(Debug, Clone)]
pub struct MemberSymbol {
    pub name: String,
    pub ty: SymbolRef,
    pub is_property: bool,
    pub is_static: bool,
    pub is_readonly: bool,
    pub accessibility: Accessibility,
    /// Member carries the explicit-ignore marker.
    pub is_ignored: bool,
    /// Member carries the utf8-string marker.
    pub is_utf8_string: bool,
    /// Member-level custom formatter type, when annotated.
    pub custom_formatter: Option<SymbolRef>,
}

impl MemberSymbol {
    #[must_use]
    pub fn field(name: &str, ty: SymbolRef) -> Self {
        Self {
            name: name.to_owned(),
            ty,
            is_property: false,
            is_static: false,
            is_readonly: false,
            accessibility: Accessibility::Public,
            is_ignored: false,
            is_utf8_string: false,
            custom_formatter: None,
        }
    }

    #[must_use]
    pub fn property(name: &str, ty: SymbolRef) -> Self {
        Self {
            is_property: true,
            ..Self::field(name, ty)
        }
    }
}

#[derive(Debug, Clone)]
pub struct CtorParam {
    pub name: String,
    pub ty: SymbolRef,
}

/// A constructor or static factory method.
#[derive(Debug, Clone)]
pub struct CtorSymbol {
    pub params: Vec<CtorParam>,
    pub accessibility: Accessibility,
    /// Parameter-name sequence from the explicit-ordering attribute.
    pub ordered_names: Option<Vec<String>>,
    /// True for a record's primary constructor.
    pub is_primary: bool,
    /// True for a static factory rather than a constructor proper.
    pub is_static_factory: bool,
    /// Method name when this is a factory.
    pub method_name: Option<String>,
}

impl CtorSymbol {
    #[must_use]
    pub fn parameterless() -> Self {
        Self {
            params: Vec::new(),
            accessibility: Accessibility::Public,
            ordered_names: None,
            is_primary: false,
            is_static_factory: false,
            method_name: None,
        }
    }

    #[must_use]
    pub fn with_params(params: Vec<(&str, SymbolRef)>) -> Self {
        Self {
            params: params
                .into_iter()
                .map(|(name, ty)| CtorParam {
                    name: name.to_owned(),
                    ty,
                })
                .collect(),
            ..Self::parameterless()
        }
    }
}

/// Static methods the generator inspects for reference-deserialization
/// factories.
#[derive(Debug, Clone)]
pub struct MethodSymbol {
    pub name: String,
    pub is_static: bool,
    pub is_public: bool,
    pub param_count: usize,
    /// Method returns the declaring type itself.
    pub returns_self: bool,
    /// Method carries the reference-deserialization attribute.
    pub is_ref_factory: bool,
}

/// An attribute application with its named boolean arguments.
#[derive(Debug, Clone)]
pub struct AttrSymbol {
    pub name: String,
    pub bool_args: Vec<(String, bool)>,
}

impl AttrSymbol {
    pub const NINO_TYPE: &'static str = "NinoType";

    #[must_use]
    pub fn nino_type() -> Self {
        Self {
            name: Self::NINO_TYPE.to_owned(),
            bool_args: Vec::new(),
        }
    }

    #[must_use]
    pub fn nino_type_with(args: &[(&str, bool)]) -> Self {
        Self {
            name: Self::NINO_TYPE.to_owned(),
            bool_args: args
                .iter()
                .map(|(name, value)| ((*name).to_owned(), *value))
                .collect(),
        }
    }

    #[must_use]
    pub fn bool_arg(&self, name: &str, default: bool) -> bool {
        self.bool_args
            .iter()
            .find(|(arg, _)| arg == name)
            .map_or(default, |(_, value)| *value)
    }
}

/// A fully-resolved type as the host metadata API exposes it.
#[derive(Debug, Clone, Default)]
pub struct TypeSymbol {
    pub name: String,
    pub namespace: String,
    pub assembly: String,
    pub kind: SymbolKind,
    pub special: SpecialType,
    pub accessibility: Accessibility,
    pub is_value_type: bool,
    pub is_unmanaged: bool,
    /// Stack-only (`ref struct`) types.
    pub is_ref_like: bool,
    pub is_record: bool,
    pub is_abstract: bool,
    pub is_sealed: bool,
    pub is_static: bool,
    /// Reference nullability annotation (`T?` on a reference type).
    /// Normalized away during projection.
    pub nullable_annotated: bool,
    pub enum_underlying: Option<SymbolRef>,
    pub base: Option<SymbolRef>,
    /// Implemented interfaces, declaration order.
    pub interfaces: Vec<SymbolRef>,
    pub generic: Option<GenericShape>,
    pub array: Option<ArrayShape>,
    /// `Nullable<T>`'s underlying value type.
    pub nullable_underlying: Option<SymbolRef>,
    pub tuple_elements: Vec<TupleElement>,
    /// Declared members only; extraction accumulates the base chain.
    pub members: Vec<MemberSymbol>,
    pub ctors: Vec<CtorSymbol>,
    pub methods: Vec<MethodSymbol>,
    pub attributes: Vec<AttrSymbol>,
    /// `Add(element)` + `Clear()` surface, for user-typed enumerables.
    pub has_add_clear: bool,
    /// A constructor accepting an array/enumerable of the element type.
    pub has_enumerable_ctor: bool,
    /// Element type when the type implements the enumerable interface.
    pub enumerable_element: Option<SymbolRef>,
}

impl TypeSymbol {
    #[must_use]
    pub fn class(name: &str, namespace: &str, assembly: &str) -> Self {
        Self {
            name: name.to_owned(),
            namespace: namespace.to_owned(),
            assembly: assembly.to_owned(),
            kind: SymbolKind::Class,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn strukt(name: &str, namespace: &str, assembly: &str) -> Self {
        Self {
            kind: SymbolKind::Struct,
            is_value_type: true,
            is_sealed: true,
            ..Self::class(name, namespace, assembly)
        }
    }

    #[must_use]
    pub fn interface(name: &str, namespace: &str, assembly: &str) -> Self {
        Self {
            kind: SymbolKind::Interface,
            is_abstract: true,
            ..Self::class(name, namespace, assembly)
        }
    }

    fn primitive(name: &str, special: SpecialType) -> Self {
        Self {
            kind: SymbolKind::Struct,
            special,
            is_value_type: true,
            is_unmanaged: true,
            is_sealed: true,
            ..Self::class(name, "System", "System.Runtime")
        }
    }

    #[must_use]
    pub fn bool_() -> Self {
        Self::primitive("Boolean", SpecialType::Bool)
    }

    #[must_use]
    pub fn int() -> Self {
        Self::primitive("Int32", SpecialType::Int)
    }

    #[must_use]
    pub fn long() -> Self {
        Self::primitive("Int64", SpecialType::Long)
    }

    #[must_use]
    pub fn byte() -> Self {
        Self::primitive("Byte", SpecialType::Byte)
    }

    #[must_use]
    pub fn float() -> Self {
        Self::primitive("Single", SpecialType::Float)
    }

    #[must_use]
    pub fn double() -> Self {
        Self::primitive("Double", SpecialType::Double)
    }

    #[must_use]
    pub fn string() -> Self {
        Self {
            kind: SymbolKind::Class,
            special: SpecialType::String,
            is_sealed: true,
            ..Self::class("String", "System", "System.Runtime")
        }
    }

    /// A rank-`rank` array of `element`.
    #[must_use]
    pub fn array(element: SymbolRef, rank: u32) -> Self {
        Self {
            kind: SymbolKind::Array,
            is_sealed: true,
            array: Some(ArrayShape { rank, element }),
            ..Self::class("Array", "System", "System.Runtime")
        }
    }

    /// A constructed generic such as `List<int>`.
    #[must_use]
    pub fn generic(definition: &str, args: Vec<SymbolRef>, assembly: &str) -> Self {
        let (namespace, name) = split_definition(definition);
        Self {
            generic: Some(GenericShape {
                definition: definition.to_owned(),
                args,
                is_definition: false,
            }),
            ..Self::class(&name, &namespace, assembly)
        }
    }

    /// `Nullable<T>` over a value type.
    #[must_use]
    pub fn nullable(underlying: SymbolRef) -> Self {
        Self {
            kind: SymbolKind::Struct,
            is_value_type: true,
            is_sealed: true,
            nullable_underlying: Some(underlying),
            ..Self::class("Nullable", "System", "System.Runtime")
        }
    }

    #[must_use]
    pub fn tuple(elements: Vec<(Option<&str>, SymbolRef)>) -> Self {
        Self {
            kind: SymbolKind::Struct,
            is_value_type: true,
            is_sealed: true,
            tuple_elements: elements
                .into_iter()
                .map(|(name, ty)| TupleElement {
                    name: name.map(str::to_owned),
                    ty,
                })
                .collect(),
            ..Self::class("ValueTuple", "System", "System.Runtime")
        }
    }

    /// An unbound generic type parameter (`T`).
    #[must_use]
    pub fn type_parameter(name: &str) -> Self {
        Self {
            kind: SymbolKind::TypeParameter,
            ..Self::class(name, "", "")
        }
    }

    #[must_use]
    pub fn with_base(mut self, base: SymbolRef) -> Self {
        self.base = Some(base);
        self
    }

    #[must_use]
    pub fn with_attr(mut self, attr: AttrSymbol) -> Self {
        self.attributes.push(attr);
        self
    }

    #[must_use]
    pub fn with_members(mut self, members: Vec<MemberSymbol>) -> Self {
        self.members = members;
        self
    }

    pub fn find_attribute(&self, name: &str) -> Option<&AttrSymbol> {
        self.attributes.iter().find(|attr| attr.name == name)
    }
}

/// Split a generic definition display into `(namespace, simple name)`.
fn split_definition(definition: &str) -> (String, String) {
    let head = definition.split('<').next().unwrap_or(definition);
    match head.rsplit_once('.') {
        Some((namespace, name)) => (namespace.to_owned(), name.to_owned()),
        None => (String::new(), head.to_owned()),
    }
}

/// One host compilation: the assembly being compiled, the candidate types
/// the host delivered, and what the generator can see of referenced
/// assemblies.
#[derive(Debug, Clone, Default)]
pub struct HostCompilation {
    pub assembly: String,
    /// Set when the compilation references the well-known game-engine
    /// assemblies; adds the scene-load auto-init hook to emitted glue.
    pub is_host_game_runtime: bool,
    /// Referenced assemblies that already carry generated codecs in their
    /// generated namespace.
    pub referenced_generated: FxHashSet<String>,
    /// Candidate types, in host delivery order.
    pub types: Vec<SymbolRef>,
}

impl HostCompilation {
    #[must_use]
    pub fn new(assembly: &str) -> Self {
        Self {
            assembly: assembly.to_owned(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_types(mut self, types: Vec<SymbolRef>) -> Self {
        self.types = types;
        self
    }
}

/// The namespace generated artifacts for `assembly` live in. Also where
/// cross-assembly codec discovery looks for `Serializer` / `Deserializer`
/// sibling types.
#[must_use]
pub fn generated_namespace(assembly: &str) -> String {
    let sanitized: String = assembly
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    format!("Nino.Generated.{sanitized}")
}
