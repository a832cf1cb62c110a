//! The `NinoMember` / `ConstructorInfo` / `NinoType` value records.
//!
//! A `NinoType` stores parent **ids**, never parent references: the
//! hierarchy is rebuilt from ids by the graph builder, which is what keeps
//! naturally-cyclic object graphs representable as plain values.
use {crate::info::TypeInfo, nino_wire::TypeId};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NinoMember {
    pub name: String,
    pub ty: TypeInfo,
    /// Member feeds the selected constructor rather than being assigned
    /// after construction.
    pub is_ctor_parameter: bool,
    pub is_private: bool,
    pub is_property: bool,
    pub is_utf8_string: bool,
    pub is_static: bool,
    pub is_readonly: bool,
    pub custom_formatter: Option<TypeInfo>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CtorParameter {
    pub name: String,
    pub ty: TypeInfo,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConstructorInfo {
    pub params: Vec<CtorParameter>,
    /// Set when the explicit-ordering attribute was present.
    pub has_ordering_attribute: bool,
    /// Parameter-name sequence overriding default order, when given.
    pub ordered_names: Option<Vec<String>>,
    pub is_primary: bool,
    /// False for static factories.
    pub is_constructor: bool,
    /// Factory method name when `is_constructor` is false.
    pub method_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NinoType {
    pub info: TypeInfo,
    /// Declared plus inherited serializable members, base-chain first.
    pub members: Vec<NinoMember>,
    /// Base class then interfaces, declaration order. Ids only.
    pub parents: Vec<TypeId>,
    /// Cross-assembly codec targets, when the type's assembly already
    /// carries generated `Serializer` / `Deserializer` siblings.
    pub custom_serializer: Option<String>,
    pub custom_deserializer: Option<String>,
    /// Reference-deserialization factory method name, when present.
    pub ref_factory: Option<String>,
    pub constructors: Vec<ConstructorInfo>,
    /// True when the attribute was found on the type itself rather than
    /// inherited; wins dedup collisions in the graph builder.
    pub has_direct_attribute: bool,
    // Filled by the graph builder.
    pub is_polymorphic: bool,
    pub is_circular: bool,
    pub hierarchy_level: u32,
}

impl NinoType {
    #[inline]
    #[must_use]
    pub fn type_id(&self) -> TypeId {
        self.info.type_id
    }

    /// Select the constructor the deserializer invokes.
    ///
    /// Preference order: the constructor or static factory carrying the
    /// explicit-ordering attribute; for records, the primary constructor
    /// whose parameter names all match members; the constructor with the
    /// fewest parameters. Private constructors never reach this list.
    #[must_use]
    pub fn select_constructor(&self) -> Option<&ConstructorInfo> {
        if let Some(ordered) = self
            .constructors
            .iter()
            .find(|c| c.has_ordering_attribute)
        {
            return Some(ordered);
        }
        if self.info.is_record {
            if let Some(primary) = self.constructors.iter().find(|c| {
                c.is_primary
                    && c.params.iter().all(|param| {
                        self.members
                            .iter()
                            .any(|m| m.name.eq_ignore_ascii_case(&param.name))
                    })
            }) {
                return Some(primary);
            }
        }
        self.constructors
            .iter()
            .min_by_key(|c| c.params.len())
    }

    /// The constructor parameters of the selected constructor, in call
    /// order (the ordering attribute's name sequence when present).
    #[must_use]
    pub fn ctor_call_order<'a>(&self, ctor: &'a ConstructorInfo) -> Vec<&'a CtorParameter> {
        match &ctor.ordered_names {
            Some(names) => names
                .iter()
                .filter_map(|name| {
                    ctor.params
                        .iter()
                        .find(|p| p.name.eq_ignore_ascii_case(name))
                })
                .collect(),
            None => ctor.params.iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::{cancel::CancellationToken, project::project, symbols::TypeSymbol},
    };

    fn info_of(symbol: &TypeSymbol) -> TypeInfo {
        project(symbol, &CancellationToken::new()).unwrap()
    }

    fn member(name: &str) -> NinoMember {
        NinoMember {
            name: name.to_owned(),
            ty: info_of(&TypeSymbol::int()),
            is_ctor_parameter: false,
            is_private: false,
            is_property: false,
            is_utf8_string: false,
            is_static: false,
            is_readonly: false,
            custom_formatter: None,
        }
    }

    fn ctor(params: &[&str]) -> ConstructorInfo {
        ConstructorInfo {
            params: params
                .iter()
                .map(|name| CtorParameter {
                    name: (*name).to_owned(),
                    ty: info_of(&TypeSymbol::int()),
                })
                .collect(),
            has_ordering_attribute: false,
            ordered_names: None,
            is_primary: false,
            is_constructor: true,
            method_name: None,
        }
    }

    fn nino_type(record: bool, ctors: Vec<ConstructorInfo>) -> NinoType {
        let mut symbol = TypeSymbol::class("Player", "Game", "Game.Core");
        symbol.is_record = record;
        NinoType {
            info: info_of(&symbol),
            members: vec![member("X"), member("Y")],
            parents: Vec::new(),
            custom_serializer: None,
            custom_deserializer: None,
            ref_factory: None,
            constructors: ctors,
            has_direct_attribute: true,
            is_polymorphic: false,
            is_circular: false,
            hierarchy_level: 0,
        }
    }

    #[test]
    fn ordering_attribute_beats_everything() {
        let mut annotated = ctor(&["x", "y"]);
        annotated.has_ordering_attribute = true;
        let t = nino_type(false, vec![ctor(&[]), annotated.clone()]);
        assert_eq!(t.select_constructor(), Some(&annotated));
    }

    #[test]
    fn record_primary_wins_when_names_match_members() {
        let mut primary = ctor(&["x", "y"]);
        primary.is_primary = true;
        let t = nino_type(true, vec![ctor(&["x", "y", "z"]), primary.clone()]);
        assert_eq!(t.select_constructor(), Some(&primary));
    }

    #[test]
    fn fewest_parameters_is_the_fallback() {
        let t = nino_type(false, vec![ctor(&["x", "y"]), ctor(&[]), ctor(&["x"])]);
        assert_eq!(t.select_constructor().unwrap().params.len(), 0);
    }

    #[test]
    fn ordered_names_reorder_the_call() {
        let mut annotated = ctor(&["x", "y"]);
        annotated.ordered_names = Some(vec!["y".into(), "x".into()]);
        let order = nino_type(false, vec![annotated.clone()]);
        let ctor_ref = &order.constructors[0];
        let call = order.ctor_call_order(ctor_ref);
        assert_eq!(call[0].name, "y");
        assert_eq!(call[1].name, "x");
    }
}
