//! Entity extraction: from annotated host types to [`NinoType`] records.
//!
//! A type participates when it carries the `NinoType` attribute directly,
//! or inherits it from a base type or interface whose attribute allows
//! inheritance. Everything the emitter needs is captured here; host
//! metadata is never consulted again downstream.
use {
    crate::{
        cancel::{CancellationToken, Cancelled},
        model::{ConstructorInfo, CtorParameter, NinoMember, NinoType},
        project::{discover_cross_assembly_codecs, discover_ref_factory, project},
        symbols::{Accessibility, AttrSymbol, HostCompilation, SymbolKind, TypeSymbol},
    },
    std::sync::Arc,
};

/// Options recognized on the `NinoType` attribute.
#[derive(Debug, Clone, Copy)]
pub struct NinoAttribute {
    pub auto_collect: bool,
    pub contain_non_public: bool,
    pub allow_inheritance: bool,
}

impl NinoAttribute {
    fn from_attr(attr: &AttrSymbol) -> Self {
        Self {
            auto_collect: attr.bool_arg("autoCollect", true),
            contain_non_public: attr.bool_arg("containNonPublicMembers", false),
            allow_inheritance: attr.bool_arg("allowInheritance", true),
        }
    }
}

/// Search self → base chain → implemented interfaces for the `NinoType`
/// attribute. Stops as soon as an attribute is found whose
/// `allowInheritance` flag is false on a non-self match.
fn find_attribute(symbol: &TypeSymbol) -> Option<(NinoAttribute, bool)> {
    if let Some(attr) = symbol.find_attribute(AttrSymbol::NINO_TYPE) {
        return Some((NinoAttribute::from_attr(attr), true));
    }

    let mut base = symbol.base.as_deref();
    while let Some(candidate) = base {
        if let Some(attr) = candidate.find_attribute(AttrSymbol::NINO_TYPE) {
            let options = NinoAttribute::from_attr(attr);
            return options.allow_inheritance.then_some((options, false));
        }
        base = candidate.base.as_deref();
    }

    for interface in interface_closure(symbol) {
        if let Some(attr) = interface.find_attribute(AttrSymbol::NINO_TYPE) {
            let options = NinoAttribute::from_attr(attr);
            return options.allow_inheritance.then_some((options, false));
        }
    }
    None
}

/// Implemented interfaces, declaration order, depth-first.
fn interface_closure(symbol: &TypeSymbol) -> Vec<Arc<TypeSymbol>> {
    let mut out = Vec::new();
    let mut stack: Vec<Arc<TypeSymbol>> = symbol.interfaces.iter().rev().cloned().collect();
    while let Some(interface) = stack.pop() {
        if out
            .iter()
            .any(|seen: &Arc<TypeSymbol>| Arc::ptr_eq(seen, &interface))
        {
            continue;
        }
        stack.extend(interface.interfaces.iter().rev().cloned());
        out.push(interface);
    }
    out
}

/// Extract every surviving candidate of the compilation.
///
/// Types that fail the structural checks (unbound generics, type-parameter
/// leaves) are silently skipped; a diagnostic is raised later only if a
/// surviving type refers to one.
pub fn extract_all(
    host: &HostCompilation,
    token: &CancellationToken,
) -> Result<Vec<NinoType>, Cancelled> {
    let mut out = Vec::with_capacity(host.types.len());
    for symbol in &host.types {
        token.check()?;
        if let Some(extracted) = extract_one(symbol, host, token)? {
            out.push(extracted);
        }
    }
    Ok(out)
}

/// Extract one candidate, or `None` on a structural reject.
pub fn extract_one(
    symbol: &TypeSymbol,
    host: &HostCompilation,
    token: &CancellationToken,
) -> Result<Option<NinoType>, Cancelled> {
    token.check()?;

    let Some((options, is_direct)) = find_attribute(symbol) else {
        return Ok(None);
    };
    if symbol.is_static {
        return Ok(None);
    }

    let info = project(symbol, token)?;
    if info.has_type_parameter() {
        return Ok(None);
    }

    let mut members = if options.auto_collect {
        collect_members(symbol, &options, token)?
    } else {
        Vec::new()
    };

    let mut constructors = Vec::new();
    for ctor in &symbol.ctors {
        token.check()?;
        if ctor.accessibility == Accessibility::Private {
            continue;
        }
        let mut params = Vec::with_capacity(ctor.params.len());
        for param in &ctor.params {
            params.push(CtorParameter {
                name: param.name.clone(),
                ty: project(&param.ty, token)?,
            });
        }
        constructors.push(ConstructorInfo {
            params,
            has_ordering_attribute: ctor.ordered_names.is_some(),
            ordered_names: ctor.ordered_names.clone(),
            is_primary: ctor.is_primary,
            is_constructor: !ctor.is_static_factory,
            method_name: ctor.method_name.clone(),
        });
    }

    // Base class first, then interfaces in declaration order. The walk
    // order is the dispatch tie-break downstream, so it must be preserved.
    let mut parents = Vec::new();
    if let Some(base) = &symbol.base {
        if base.special != crate::symbols::SpecialType::Object {
            parents.push(project(base, token)?.type_id);
        }
    }
    for interface in &symbol.interfaces {
        let id = project(interface, token)?.type_id;
        if !parents.contains(&id) {
            parents.push(id);
        }
    }

    let codecs = discover_cross_assembly_codecs(symbol, host);
    let mut nino_type = NinoType {
        info,
        members: Vec::new(),
        parents,
        custom_serializer: codecs.as_ref().map(|(s, _)| s.clone()),
        custom_deserializer: codecs.as_ref().map(|(_, d)| d.clone()),
        ref_factory: discover_ref_factory(symbol),
        constructors,
        has_direct_attribute: is_direct,
        is_polymorphic: false,
        is_circular: false,
        hierarchy_level: 0,
    };

    // Mark the members that feed the selected constructor.
    if let Some(ctor) = nino_type.select_constructor() {
        let ctor_params: Vec<String> = ctor.params.iter().map(|p| p.name.clone()).collect();
        for member in &mut members {
            member.is_ctor_parameter = ctor_params
                .iter()
                .any(|p| p.eq_ignore_ascii_case(&member.name));
        }
    }
    nino_type.members = members;
    Ok(Some(nino_type))
}

/// Instance fields and properties only, base chain first so member order
/// matches the wire layout of derived types.
fn collect_members(
    symbol: &TypeSymbol,
    options: &NinoAttribute,
    token: &CancellationToken,
) -> Result<Vec<NinoMember>, Cancelled> {
    let mut chain = Vec::new();
    let mut cursor = Some(symbol);
    while let Some(current) = cursor {
        if current.special != crate::symbols::SpecialType::Object {
            chain.push(current);
        }
        cursor = current.base.as_deref();
    }
    chain.reverse();

    let mut out = Vec::new();
    for declaring in chain {
        if declaring.kind == SymbolKind::Interface {
            continue;
        }
        for member in &declaring.members {
            token.check()?;
            if member.is_static || member.is_ignored {
                continue;
            }
            let public = member.accessibility == Accessibility::Public;
            if !public && !options.contain_non_public {
                continue;
            }
            let custom_formatter = match &member.custom_formatter {
                Some(formatter) => Some(project(formatter, token)?),
                None => None,
            };
            out.push(NinoMember {
                name: member.name.clone(),
                ty: project(&member.ty, token)?,
                is_ctor_parameter: false,
                is_private: !public,
                is_property: member.is_property,
                is_utf8_string: member.is_utf8_string,
                is_static: member.is_static,
                is_readonly: member.is_readonly,
                custom_formatter,
            });
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::symbols::{MemberSymbol, TypeSymbol},
        std::sync::Arc,
    };

    fn host() -> HostCompilation {
        HostCompilation::new("Game.Core")
    }

    fn token() -> CancellationToken {
        CancellationToken::new()
    }

    fn annotated_class(name: &str) -> TypeSymbol {
        TypeSymbol::class(name, "Game", "Game.Core").with_attr(AttrSymbol::nino_type())
    }

    #[test]
    fn unannotated_types_are_silently_dropped() {
        let symbol = TypeSymbol::class("Plain", "Game", "Game.Core");
        assert!(extract_one(&symbol, &host(), &token()).unwrap().is_none());
    }

    #[test]
    fn attribute_is_inherited_through_the_base_chain() {
        let base = Arc::new(annotated_class("Base"));
        let derived = TypeSymbol::class("Derived", "Game", "Game.Core").with_base(base);
        let extracted = extract_one(&derived, &host(), &token()).unwrap().unwrap();
        assert!(!extracted.has_direct_attribute);
        assert_eq!(extracted.parents.len(), 1);
    }

    #[test]
    fn inheritance_stops_on_allow_inheritance_false() {
        let base = Arc::new(
            TypeSymbol::class("Base", "Game", "Game.Core")
                .with_attr(AttrSymbol::nino_type_with(&[("allowInheritance", false)])),
        );
        let derived = TypeSymbol::class("Derived", "Game", "Game.Core").with_base(base.clone());
        assert!(extract_one(&derived, &host(), &token()).unwrap().is_none());
        // The base itself is a self match, so the flag does not affect it.
        assert!(extract_one(&base, &host(), &token()).unwrap().is_some());
    }

    #[test]
    fn static_and_ignored_members_are_dropped() {
        let mut ignored = MemberSymbol::field("Skipped", Arc::new(TypeSymbol::int()));
        ignored.is_ignored = true;
        let mut stat = MemberSymbol::field("Shared", Arc::new(TypeSymbol::int()));
        stat.is_static = true;
        let symbol = annotated_class("Holder").with_members(vec![
            MemberSymbol::field("Kept", Arc::new(TypeSymbol::int())),
            ignored,
            stat,
        ]);
        let extracted = extract_one(&symbol, &host(), &token()).unwrap().unwrap();
        assert_eq!(extracted.members.len(), 1);
        assert_eq!(extracted.members[0].name, "Kept");
    }

    #[test]
    fn non_public_members_require_the_option() {
        let mut hidden = MemberSymbol::field("Hp", Arc::new(TypeSymbol::int()));
        hidden.accessibility = Accessibility::Private;

        let without = annotated_class("Holder").with_members(vec![hidden.clone()]);
        let extracted = extract_one(&without, &host(), &token()).unwrap().unwrap();
        assert!(extracted.members.is_empty());

        let with = TypeSymbol::class("Holder", "Game", "Game.Core")
            .with_attr(AttrSymbol::nino_type_with(&[(
                "containNonPublicMembers",
                true,
            )]))
            .with_members(vec![hidden]);
        let extracted = extract_one(&with, &host(), &token()).unwrap().unwrap();
        assert_eq!(extracted.members.len(), 1);
        assert!(extracted.members[0].is_private);
    }

    #[test]
    fn inherited_members_come_base_first() {
        let base = Arc::new(
            annotated_class("Base")
                .with_members(vec![MemberSymbol::field("A", Arc::new(TypeSymbol::int()))]),
        );
        let derived = TypeSymbol::class("Derived", "Game", "Game.Core")
            .with_base(base)
            .with_members(vec![MemberSymbol::field(
                "B",
                Arc::new(TypeSymbol::string()),
            )]);
        let extracted = extract_one(&derived, &host(), &token()).unwrap().unwrap();
        let names: Vec<_> = extracted.members.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, ["A", "B"]);
    }

    #[test]
    fn unbound_generics_are_rejected() {
        let mut symbol = annotated_class("Holder");
        symbol.generic = Some(crate::symbols::GenericShape {
            definition: "Game.Holder<T>".into(),
            args: vec![Arc::new(TypeSymbol::type_parameter("T"))],
            is_definition: false,
        });
        assert!(extract_one(&symbol, &host(), &token()).unwrap().is_none());
    }

    #[test]
    fn auto_collect_false_skips_member_collection() {
        let symbol = TypeSymbol::class("Raw", "Game", "Game.Core")
            .with_attr(AttrSymbol::nino_type_with(&[("autoCollect", false)]))
            .with_members(vec![MemberSymbol::field("X", Arc::new(TypeSymbol::int()))]);
        let extracted = extract_one(&symbol, &host(), &token()).unwrap().unwrap();
        assert!(extracted.members.is_empty());
    }

    #[test]
    fn cross_assembly_codecs_are_recorded() {
        let mut compilation = host();
        compilation
            .referenced_generated
            .insert("Game.Shared".to_owned());
        let symbol = TypeSymbol::class("Item", "Game", "Game.Shared").with_attr(AttrSymbol::nino_type());
        let extracted = extract_one(&symbol, &compilation, &token()).unwrap().unwrap();
        assert_eq!(
            extracted.custom_serializer.as_deref(),
            Some("Nino.Generated.Game_Shared.Serializer")
        );
        assert_eq!(
            extracted.custom_deserializer.as_deref(),
            Some("Nino.Generated.Game_Shared.Deserializer")
        );
    }
}
