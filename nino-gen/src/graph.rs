//! The type graph: base→derived hierarchy, classification, cycles.
//!
//! Built once per input batch on a single thread. The graph stores ids and
//! id-keyed adjacency tables; `NinoType` records never reference each
//! other, which is what keeps naturally-cyclic hierarchies representable.
use {
    crate::model::NinoType,
    nino_wire::TypeId,
    rustc_hash::{FxHashMap, FxHashSet},
};

#[derive(Debug, Default)]
pub struct NinoGraph {
    /// Deduped types with classification flags filled, first-seen order.
    types: Vec<NinoType>,
    index: FxHashMap<TypeId, usize>,
    /// Transitive ancestors, depth-first, base first, interfaces in
    /// declaration order. Unresolved (external) parents are dropped.
    pub base_types: FxHashMap<TypeId, Vec<TypeId>>,
    /// Inverse of `base_types`.
    pub sub_types: FxHashMap<TypeId, Vec<TypeId>>,
    /// Types with zero resolved ancestors.
    pub top_types: FxHashSet<TypeId>,
    /// Types reachable from themselves via member edges.
    pub circular_types: FxHashSet<TypeId>,
    /// Display name → id.
    pub type_map: FxHashMap<String, TypeId>,
}

impl NinoGraph {
    pub fn build(types: Vec<NinoType>) -> NinoGraph {
        let mut graph = NinoGraph::default();

        // Dedup by id; direct-attribute extraction wins over inherited.
        for t in types {
            match graph.index.get(&t.type_id()) {
                Some(&existing) => {
                    if t.has_direct_attribute && !graph.types[existing].has_direct_attribute {
                        graph.types[existing] = t;
                    }
                }
                None => {
                    graph.index.insert(t.type_id(), graph.types.len());
                    graph.types.push(t);
                }
            }
        }

        for t in &graph.types {
            graph
                .type_map
                .insert(t.info.display_name.clone(), t.type_id());
        }

        // Transitive ancestor walk with duplicate suppression, order
        // preserved by walk order.
        for i in 0..graph.types.len() {
            let id = graph.types[i].type_id();
            let mut ancestors = Vec::new();
            graph.walk_ancestors(id, &mut ancestors);
            if ancestors.is_empty() {
                graph.top_types.insert(id);
            }
            graph.base_types.insert(id, ancestors);
        }

        // Sub-type inversion.
        for (derived, ancestors) in &graph.base_types {
            for ancestor in ancestors {
                let subs = graph.sub_types.entry(*ancestor).or_default();
                if !subs.contains(derived) {
                    subs.push(*derived);
                }
            }
        }

        // Classification flags.
        for i in 0..graph.types.len() {
            let id = graph.types[i].type_id();
            let level = graph.base_types[&id].len() as u32;
            let polymorphic =
                !graph.types[i].parents.is_empty() || graph.types[i].info.is_polymorphic;
            let t = &mut graph.types[i];
            t.hierarchy_level = level;
            t.is_polymorphic = polymorphic;
        }

        // Cycle detection last: it traverses members of *other* types, so
        // the full dedup set must exist first.
        let circular: Vec<TypeId> = graph
            .types
            .iter()
            .filter(|t| graph.is_circular(t))
            .map(NinoType::type_id)
            .collect();
        for id in circular {
            graph.circular_types.insert(id);
            if let Some(&i) = graph.index.get(&id) {
                graph.types[i].is_circular = true;
            }
        }

        graph
    }

    fn walk_ancestors(&self, id: TypeId, out: &mut Vec<TypeId>) {
        let Some(&i) = self.index.get(&id) else {
            return;
        };
        for parent in &self.types[i].parents {
            // Unresolved parents are external types, not errors.
            if !self.index.contains_key(parent) || out.contains(parent) {
                continue;
            }
            out.push(*parent);
            self.walk_ancestors(*parent, out);
        }
    }

    /// Bounded DFS over member edges: self-reference, reference to an
    /// ancestor, generic arguments, array elements, nullable underlyings,
    /// and transitively the members of any other participating type.
    /// Value-type and unmanaged members cannot contribute.
    fn is_circular(&self, root: &NinoType) -> bool {
        if root.info.is_value_type {
            return false;
        }
        let root_id = root.type_id();
        let ancestors = &self.base_types[&root_id];

        let mut visited = FxHashSet::default();
        let mut stack: Vec<&crate::info::TypeInfo> = Vec::new();
        for member in &root.members {
            if member.ty.is_unmanaged || member.ty.is_value_type_leafless() {
                continue;
            }
            stack.push(&member.ty);
        }

        while let Some(info) = stack.pop() {
            if info.type_id == root_id || ancestors.contains(&info.type_id) {
                return true;
            }
            stack.extend(info.children());
            if let Some(&i) = self.index.get(&info.type_id) {
                if visited.insert(info.type_id) {
                    for member in &self.types[i].members {
                        if member.ty.is_unmanaged || member.ty.is_value_type_leafless() {
                            continue;
                        }
                        stack.push(&member.ty);
                    }
                }
            }
        }
        false
    }

    #[must_use]
    pub fn types(&self) -> &[NinoType] {
        &self.types
    }

    #[must_use]
    pub fn get(&self, id: TypeId) -> Option<&NinoType> {
        self.index.get(&id).map(|&i| &self.types[i])
    }

    /// Transitive ancestors of `id`, walk order.
    #[must_use]
    pub fn ancestors(&self, id: TypeId) -> &[TypeId] {
        self.base_types.get(&id).map_or(&[], Vec::as_slice)
    }

    /// Known sub-types of `id`.
    #[must_use]
    pub fn sub_types_of(&self, id: TypeId) -> &[TypeId] {
        self.sub_types.get(&id).map_or(&[], Vec::as_slice)
    }

    /// Known concrete sub-types of `t`, deepest-first by ancestor count
    /// with walk order as the tie-break: the polymorphic dispatch order.
    #[must_use]
    pub fn dispatch_order(&self, t: &NinoType) -> Vec<&NinoType> {
        let mut subs: Vec<&NinoType> = self
            .sub_types_of(t.type_id())
            .iter()
            .filter_map(|id| self.get(*id))
            .collect();
        subs.sort_by(|a, b| b.hierarchy_level.cmp(&a.hierarchy_level));
        subs
    }
}

impl crate::info::TypeInfo {
    /// Value types cannot participate in a managed cycle.
    fn is_value_type_leafless(&self) -> bool {
        self.is_value_type && self.tuple_elements.is_empty() && self.nullable.is_none()
    }
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::{
            cancel::CancellationToken,
            extract::extract_all,
            symbols::{AttrSymbol, HostCompilation, MemberSymbol, TypeSymbol},
        },
        std::sync::Arc,
    };

    fn build(symbols: Vec<Arc<TypeSymbol>>) -> NinoGraph {
        let host = HostCompilation::new("Game.Core").with_types(symbols);
        let types = extract_all(&host, &CancellationToken::new()).unwrap();
        NinoGraph::build(types)
    }

    fn annotated(name: &str) -> TypeSymbol {
        TypeSymbol::class(name, "Game", "Game.Core").with_attr(AttrSymbol::nino_type())
    }

    fn id(name: &str) -> TypeId {
        TypeId::of(&format!("Game.{name}"))
    }

    #[test]
    fn hierarchy_classification() {
        let a = Arc::new(
            annotated("A").with_members(vec![MemberSymbol::field("A", Arc::new(TypeSymbol::int()))]),
        );
        let b = Arc::new(
            TypeSymbol::class("B", "Game", "Game.Core")
                .with_base(a.clone())
                .with_members(vec![MemberSymbol::field(
                    "B",
                    Arc::new(TypeSymbol::string()),
                )]),
        );
        let c = Arc::new(
            TypeSymbol::class("C", "Game", "Game.Core")
                .with_base(b.clone())
                .with_members(vec![MemberSymbol::field(
                    "C",
                    Arc::new(TypeSymbol::bool_()),
                )]),
        );
        let graph = build(vec![a, b, c]);

        assert!(graph.top_types.contains(&id("A")));
        assert_eq!(graph.ancestors(id("C")), [id("B"), id("A")]);
        assert_eq!(graph.sub_types_of(id("A")), [id("B"), id("C")]);
        assert_eq!(graph.get(id("C")).unwrap().hierarchy_level, 2);
        assert!(graph.get(id("A")).unwrap().is_polymorphic);

        // Deepest-first dispatch order at A: C (level 2) before B (level 1).
        let order: Vec<_> = graph
            .dispatch_order(graph.get(id("A")).unwrap())
            .iter()
            .map(|t| t.info.simple_name.clone())
            .collect();
        assert_eq!(order, ["C", "B"]);
    }

    #[test]
    fn unresolved_parents_are_silently_dropped() {
        let external = Arc::new(TypeSymbol::class("External", "Lib", "Lib.Core"));
        let derived = Arc::new(annotated("Derived").with_base(external));
        let graph = build(vec![derived]);
        assert!(graph.top_types.contains(&id("Derived")));
        assert!(graph.ancestors(id("Derived")).is_empty());
        // Raw parent ids still mark the type polymorphic.
        assert!(graph.get(id("Derived")).unwrap().is_polymorphic);
    }

    #[test]
    fn self_reference_is_circular() {
        let mut node = annotated("Node");
        let node_ref = Arc::new(node.clone());
        node.members
            .push(MemberSymbol::field("Next", node_ref));
        let graph = build(vec![Arc::new(node)]);
        assert!(graph.circular_types.contains(&id("Node")));
    }

    #[test]
    fn mutual_reference_is_circular_through_other_members() {
        let left_plain = annotated("Left");
        let right = annotated("Right").with_members(vec![MemberSymbol::field(
            "Left",
            Arc::new(left_plain.clone()),
        )]);
        let left = left_plain.with_members(vec![MemberSymbol::field(
            "Right",
            Arc::new(right.clone()),
        )]);
        let graph = build(vec![Arc::new(left), Arc::new(right)]);
        assert!(graph.circular_types.contains(&id("Left")));
        assert!(graph.circular_types.contains(&id("Right")));
    }

    #[test]
    fn reference_through_generic_argument_is_circular() {
        let mut node = annotated("Tree");
        let list_of_self = TypeSymbol::generic(
            "System.Collections.Generic.List<T>",
            vec![Arc::new(node.clone())],
            "System.Collections",
        );
        node.members
            .push(MemberSymbol::field("Children", Arc::new(list_of_self)));
        let graph = build(vec![Arc::new(node)]);
        assert!(graph.circular_types.contains(&id("Tree")));
    }

    #[test]
    fn upward_reference_to_an_ancestor_is_circular() {
        let base = Arc::new(annotated("Base"));
        let derived = TypeSymbol::class("Derived", "Game", "Game.Core")
            .with_base(base.clone())
            .with_members(vec![MemberSymbol::field("Owner", base.clone())]);
        let graph = build(vec![base, Arc::new(derived)]);
        assert!(graph.circular_types.contains(&id("Derived")));
    }

    #[test]
    fn unmanaged_members_cannot_contribute_to_cycles() {
        let plain = annotated("Plain").with_members(vec![
            MemberSymbol::field("X", Arc::new(TypeSymbol::int())),
            MemberSymbol::field("Name", Arc::new(TypeSymbol::string())),
        ]);
        let graph = build(vec![Arc::new(plain)]);
        assert!(graph.circular_types.is_empty());
    }

    #[test]
    fn dedup_prefers_direct_attribute() {
        let inherited_base = Arc::new(annotated("Base"));
        // The same type delivered twice: once via inheritance, once direct.
        let direct = TypeSymbol::class("Dup", "Game", "Game.Core")
            .with_base(inherited_base.clone())
            .with_attr(AttrSymbol::nino_type());
        let inherited = TypeSymbol::class("Dup", "Game", "Game.Core").with_base(inherited_base.clone());
        let graph = build(vec![inherited_base, Arc::new(inherited), Arc::new(direct)]);
        assert!(graph.get(id("Dup")).unwrap().has_direct_attribute);
        assert_eq!(graph.types().len(), 2);
    }
}
