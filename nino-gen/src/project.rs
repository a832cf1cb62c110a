//! Metadata projection: the only stage that touches host metadata.
//!
//! `project` reads one type from the host model and returns an immutable
//! [`TypeInfo`]. The projection normalizes away syntactic aliasing so ids
//! are stable: nullability annotations are stripped, named tuples unwrap to
//! the underlying untagged tuple, and generic arguments are normalized
//! recursively before the constructed name is rebuilt.
use {
    crate::{
        cancel::{CancellationToken, Cancelled},
        info::{ArrayInfo, EnumerableInfo, GenericInfo, TupleElementInfo, TypeInfo},
        symbols::{generated_namespace, HostCompilation, SpecialType, SymbolKind, TypeSymbol},
    },
    nino_wire::TypeId,
};

/// Rewrite multi-dimensional-array syntax `T[*,*]` to `T[,]`.
#[must_use]
pub fn sanitize_display(raw: &str) -> String {
    raw.replace('*', "")
}

/// Derive the identifier-safe instance name: lowercase the display name,
/// replace every non-alphanumeric character with `_`, and prefix the
/// reserved `@` sigil so the result cannot collide with user identifiers.
#[must_use]
pub fn instance_name(display: &str) -> String {
    let mut out = String::with_capacity(display.len() + 1);
    out.push('@');
    for c in display.chars() {
        if c.is_ascii_alphanumeric() {
            out.extend(c.to_lowercase());
        } else {
            out.push('_');
        }
    }
    out
}

/// Project one host type into its [`TypeInfo`] record.
///
/// Pure and reentrant; checks the token at entry and at every
/// type-argument recursion.
pub fn project(symbol: &TypeSymbol, token: &CancellationToken) -> Result<TypeInfo, Cancelled> {
    token.check()?;

    // Arrays: identity is the element identity plus rank.
    if let Some(array) = &symbol.array {
        let element = project(&array.element, token)?;
        let raw_suffix = raw_rank_suffix(array.rank);
        let raw_display = format!("{}{raw_suffix}", element.raw_display_name);
        let display = sanitize_display(&format!("{}{raw_suffix}", element.display_name));
        return Ok(TypeInfo {
            type_id: TypeId::of(&display),
            kind: SymbolKind::Array,
            special: SpecialType::None,
            accessibility: symbol.accessibility,
            is_value_type: false,
            is_unmanaged: false,
            is_ref_like: false,
            is_record: false,
            is_abstract: false,
            is_sealed: true,
            is_static: false,
            is_polymorphic: false,
            is_enum: false,
            enum_underlying: None,
            generic: None,
            array: Some(ArrayInfo {
                rank: array.rank,
                element: Box::new(element),
            }),
            nullable: None,
            tuple_elements: Vec::new(),
            enumerable: None,
            namespace: symbol.namespace.clone(),
            assembly: symbol.assembly.clone(),
            instance_name: instance_name(&display),
            simple_name: symbol.name.clone(),
            display_name: display,
            raw_display_name: raw_display,
        });
    }

    // Nullable<T>: identity is `T?` over the normalized underlying.
    if let Some(underlying) = &symbol.nullable_underlying {
        let underlying = project(underlying, token)?;
        let display = format!("{}?", underlying.display_name);
        let raw_display = format!("{}?", underlying.raw_display_name);
        return Ok(TypeInfo {
            type_id: TypeId::of(&display),
            kind: SymbolKind::Struct,
            special: SpecialType::None,
            accessibility: symbol.accessibility,
            is_value_type: true,
            is_unmanaged: false,
            is_ref_like: false,
            is_record: false,
            is_abstract: false,
            is_sealed: true,
            is_static: false,
            is_polymorphic: false,
            is_enum: false,
            enum_underlying: None,
            generic: None,
            array: None,
            nullable: Some(Box::new(underlying)),
            tuple_elements: Vec::new(),
            enumerable: None,
            namespace: symbol.namespace.clone(),
            assembly: symbol.assembly.clone(),
            instance_name: instance_name(&display),
            simple_name: symbol.name.clone(),
            display_name: display,
            raw_display_name: raw_display,
        });
    }

    // Tuples: unwrap to the underlying untagged tuple so two tuples
    // differing only in element names share an identity.
    if !symbol.tuple_elements.is_empty() {
        let mut elements = Vec::with_capacity(symbol.tuple_elements.len());
        for (index, element) in symbol.tuple_elements.iter().enumerate() {
            token.check()?;
            elements.push(TupleElementInfo {
                name: format!("Item{}", index + 1),
                ty: project(&element.ty, token)?,
            });
        }
        let display = format!(
            "({})",
            elements
                .iter()
                .map(|e| e.ty.display_name.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        );
        let is_unmanaged = elements.iter().all(|e| e.ty.is_unmanaged);
        return Ok(TypeInfo {
            type_id: TypeId::of(&display),
            kind: SymbolKind::Struct,
            special: SpecialType::None,
            accessibility: symbol.accessibility,
            is_value_type: true,
            is_unmanaged,
            is_ref_like: false,
            is_record: false,
            is_abstract: false,
            is_sealed: true,
            is_static: false,
            is_polymorphic: false,
            is_enum: false,
            enum_underlying: None,
            generic: None,
            array: None,
            nullable: None,
            tuple_elements: elements,
            enumerable: None,
            namespace: symbol.namespace.clone(),
            assembly: symbol.assembly.clone(),
            instance_name: instance_name(&display),
            simple_name: symbol.name.clone(),
            raw_display_name: display.clone(),
            display_name: display,
        });
    }

    // Generics: normalize each argument, then rebuild the constructed name
    // from the normalized arguments so ids are stable across aliasing.
    let generic = match &symbol.generic {
        Some(shape) => {
            let mut args = Vec::with_capacity(shape.args.len());
            for arg in &shape.args {
                token.check()?;
                args.push(project(arg, token)?);
            }
            Some(GenericInfo {
                definition: shape.definition.clone(),
                args,
                is_definition: shape.is_definition,
            })
        }
        None => None,
    };

    let (display, raw_display) = display_of(symbol, generic.as_ref());

    let enum_underlying = match &symbol.enum_underlying {
        Some(underlying) => Some(Box::new(project(underlying, token)?)),
        None => None,
    };

    let enumerable = match &symbol.enumerable_element {
        Some(element) => Some(EnumerableInfo {
            element: Box::new(project(element, token)?),
            has_add_clear: symbol.has_add_clear,
            has_enumerable_ctor: symbol.has_enumerable_ctor,
        }),
        None => None,
    };

    let is_enum = symbol.kind == SymbolKind::Enum;
    Ok(TypeInfo {
        type_id: TypeId::of(&display),
        kind: symbol.kind,
        special: symbol.special,
        accessibility: symbol.accessibility,
        is_value_type: symbol.is_value_type,
        is_unmanaged: symbol.is_unmanaged || is_enum || symbol.special.is_unmanaged_primitive(),
        is_ref_like: symbol.is_ref_like,
        is_record: symbol.is_record,
        is_abstract: symbol.is_abstract,
        is_sealed: symbol.is_sealed,
        is_static: symbol.is_static,
        is_polymorphic: symbol.kind == SymbolKind::Interface
            || (!symbol.is_value_type && !symbol.is_sealed && symbol.special != SpecialType::String),
        is_enum,
        enum_underlying,
        generic,
        array: None,
        nullable: None,
        tuple_elements: Vec::new(),
        enumerable,
        namespace: symbol.namespace.clone(),
        assembly: symbol.assembly.clone(),
        instance_name: instance_name(&display),
        simple_name: symbol.name.clone(),
        display_name: display,
        raw_display_name: raw_display,
    })
}

fn raw_rank_suffix(rank: u32) -> String {
    // Host convention renders each extra dimension as `*`.
    if rank <= 1 {
        "[]".to_owned()
    } else {
        format!("[{}]", vec!["*"; rank as usize].join(","))
    }
}

fn display_of(symbol: &TypeSymbol, generic: Option<&GenericInfo>) -> (String, String) {
    if let Some(keyword) = symbol.special.keyword() {
        return (keyword.to_owned(), keyword.to_owned());
    }
    let qualified = if symbol.namespace.is_empty() {
        symbol.name.clone()
    } else {
        format!("{}.{}", symbol.namespace, symbol.name)
    };
    match generic {
        Some(generic) if !generic.is_definition => {
            let args = generic
                .args
                .iter()
                .map(|a| a.display_name.as_str())
                .collect::<Vec<_>>()
                .join(", ");
            let raw_args = generic
                .args
                .iter()
                .map(|a| a.raw_display_name.as_str())
                .collect::<Vec<_>>()
                .join(", ");
            (
                format!("{qualified}<{args}>"),
                format!("{qualified}<{raw_args}>"),
            )
        }
        Some(_) => {
            let display = generic_definition_display(&qualified, symbol);
            (display.clone(), display)
        }
        None => (qualified.clone(), qualified),
    }
}

fn generic_definition_display(qualified: &str, symbol: &TypeSymbol) -> String {
    match &symbol.generic {
        Some(shape) => {
            // Preserve the definition's parameter list, e.g. `List<T>`.
            match shape.definition.split_once('<') {
                Some((_, params)) => format!("{qualified}<{params}"),
                None => qualified.to_owned(),
            }
        }
        None => qualified.to_owned(),
    }
}

/// Cross-assembly codec discovery.
///
/// If the type lives in a referenced assembly whose generated namespace
/// already carries `Serializer` / `Deserializer` siblings, return their
/// display names so emission calls them instead of re-emitting the codec.
#[must_use]
pub fn discover_cross_assembly_codecs(
    symbol: &TypeSymbol,
    host: &HostCompilation,
) -> Option<(String, String)> {
    if symbol.assembly == host.assembly {
        return None;
    }
    if !host.referenced_generated.contains(&symbol.assembly) {
        return None;
    }
    let namespace = generated_namespace(&symbol.assembly);
    Some((
        format!("{namespace}.Serializer"),
        format!("{namespace}.Deserializer"),
    ))
}

/// Find the reference-deserialization factory: a public, static,
/// zero-parameter method returning the declaring type and carrying the
/// reference-deserialization attribute.
#[must_use]
pub fn discover_ref_factory(symbol: &TypeSymbol) -> Option<String> {
    symbol
        .methods
        .iter()
        .find(|m| m.is_ref_factory && m.is_static && m.is_public && m.param_count == 0 && m.returns_self)
        .map(|m| m.name.clone())
}
