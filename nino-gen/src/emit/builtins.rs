//! Structural builtins: specialized codecs for every distinct generic
//! shape reachable from user-type members.
//!
//! The catalogue is a fixed list of generators, each a shape predicate
//! plus a template. The driver collects every distinct shape from the
//! graph, routes it to the first matching generator, and emits one
//! serializer/deserializer pair (plus a `ref` mutation overload for
//! mutable containers) into the shared builtins artifact.
use crate::{
    emit::{read_call, write_call, CodeWriter, EmitContext},
    graph::NinoGraph,
    info::TypeInfo,
};

/// One entry of the structural catalogue.
pub struct BuiltinGenerator {
    pub name: &'static str,
    pub matches: fn(&TypeInfo) -> bool,
    pub emit: fn(&mut CodeWriter, &mut CodeWriter, &TypeInfo, &EmitContext<'_>),
}

fn def_head(ty: &TypeInfo) -> &str {
    match &ty.generic {
        Some(generic) => generic.definition.split('<').next().unwrap_or_default(),
        None => "",
    }
}

fn def_in(ty: &TypeInfo, heads: &[&str]) -> bool {
    heads.contains(&def_head(ty))
}

fn arg(ty: &TypeInfo, index: usize) -> &TypeInfo {
    &ty.generic.as_ref().expect("generic shape").args[index]
}

const LIST_HEADS: &[&str] = &[
    "System.Collections.Generic.List",
    "System.Collections.Generic.IList",
    "System.Collections.Generic.IReadOnlyList",
    "System.Collections.Generic.ICollection",
    "System.Collections.Generic.IEnumerable",
    "System.Collections.ObjectModel.Collection",
];

const DICT_HEADS: &[&str] = &[
    "System.Collections.Generic.Dictionary",
    "System.Collections.Generic.IDictionary",
    "System.Collections.Generic.IReadOnlyDictionary",
    "System.Collections.Generic.SortedDictionary",
    "System.Collections.Generic.SortedList",
    "System.Collections.Concurrent.ConcurrentDictionary",
    "System.Collections.ObjectModel.ReadOnlyDictionary",
];

const STACK_HEADS: &[&str] = &[
    "System.Collections.Generic.Stack",
    "System.Collections.Concurrent.ConcurrentStack",
];

const QUEUE_HEADS: &[&str] = &[
    "System.Collections.Generic.Queue",
    "System.Collections.Concurrent.ConcurrentQueue",
];

/// The fixed catalogue, ordered most-specific first; a shape is served by
/// the first generator whose predicate accepts it.
pub fn catalogue() -> &'static [BuiltinGenerator] {
    CATALOGUE
}

const CATALOGUE: &[BuiltinGenerator] = &[
    BuiltinGenerator {
        name: "nullable",
        matches: |ty| ty.nullable.is_some(),
        emit: emit_nullable,
    },
    BuiltinGenerator {
        name: "key-value-pair",
        matches: |ty| def_in(ty, &["System.Collections.Generic.KeyValuePair"]),
        emit: emit_kvp,
    },
    BuiltinGenerator {
        name: "tuple",
        matches: |ty| !ty.tuple_elements.is_empty(),
        emit: emit_tuple,
    },
    BuiltinGenerator {
        name: "array",
        matches: |ty| ty.array.as_ref().is_some_and(|a| a.rank == 1),
        emit: emit_array,
    },
    BuiltinGenerator {
        name: "array-segment",
        matches: |ty| def_in(ty, &["System.ArraySegment"]),
        emit: emit_array_segment,
    },
    BuiltinGenerator {
        name: "dictionary",
        matches: |ty| def_in(ty, DICT_HEADS),
        emit: emit_dictionary,
    },
    BuiltinGenerator {
        name: "stack",
        matches: |ty| def_in(ty, STACK_HEADS),
        emit: emit_stack,
    },
    BuiltinGenerator {
        name: "queue",
        matches: |ty| def_in(ty, QUEUE_HEADS),
        emit: emit_queue,
    },
    BuiltinGenerator {
        name: "hash-set",
        matches: |ty| {
            def_in(
                ty,
                &[
                    "System.Collections.Generic.HashSet",
                    "System.Collections.Generic.ISet",
                ],
            )
        },
        emit: emit_add_set,
    },
    BuiltinGenerator {
        name: "sorted-set",
        matches: |ty| def_in(ty, &["System.Collections.Generic.SortedSet"]),
        emit: emit_add_set,
    },
    BuiltinGenerator {
        name: "linked-list",
        matches: |ty| def_in(ty, &["System.Collections.Generic.LinkedList"]),
        emit: emit_linked_list,
    },
    BuiltinGenerator {
        name: "immutable",
        matches: |ty| {
            def_in(
                ty,
                &[
                    "System.Collections.Immutable.ImmutableArray",
                    "System.Collections.Immutable.ImmutableList",
                ],
            )
        },
        emit: emit_immutable,
    },
    BuiltinGenerator {
        name: "priority-queue",
        matches: |ty| def_in(ty, &["System.Collections.Generic.PriorityQueue"]),
        emit: emit_priority_queue,
    },
    BuiltinGenerator {
        name: "list",
        matches: |ty| def_in(ty, LIST_HEADS),
        emit: emit_list,
    },
    BuiltinGenerator {
        name: "custom-enumerable",
        matches: |ty| {
            ty.enumerable
                .as_ref()
                .is_some_and(|e| e.has_add_clear || e.has_enumerable_ctor)
        },
        emit: emit_custom_enumerable,
    },
];

/// Find the generator serving a shape, if any.
#[must_use]
pub fn find_generator(ty: &TypeInfo) -> Option<&'static BuiltinGenerator> {
    catalogue().iter().find(|g| (g.matches)(ty))
}

/// Collect every distinct builtin shape reachable from the graph's member
/// types, first-encounter order.
#[must_use]
pub fn collect_shapes(graph: &NinoGraph) -> Vec<TypeInfo> {
    let mut seen = rustc_hash::FxHashSet::default();
    let mut out = Vec::new();
    let mut stack: Vec<&TypeInfo> = Vec::new();
    for t in graph.types() {
        for member in &t.members {
            stack.push(&member.ty);
        }
    }
    // Shapes nest (a list of dictionaries needs both codecs), so children
    // of a collected shape are walked too.
    while let Some(ty) = stack.pop() {
        stack.extend(ty.children());
        if find_generator(ty).is_some()
            && graph.get(ty.type_id).is_none()
            && seen.insert(ty.type_id)
        {
            out.push(ty.clone());
        }
    }
    out.sort_by(|a, b| a.display_name.cmp(&b.display_name));
    out
}

/// Emit the shared builtins artifact for a set of collected shapes.
#[must_use]
pub fn emit_builtins_artifact(shapes: &[TypeInfo], ctx: &EmitContext<'_>) -> String {
    let mut w = CodeWriter::new();
    super::artifact_prologue(&mut w, &ctx.namespace);

    let mut ser = CodeWriter::new();
    let mut de = CodeWriter::new();
    for shape in shapes {
        if let Some(generator) = find_generator(shape) {
            (generator.emit)(&mut ser, &mut de, shape, ctx);
        }
    }

    w.line("public static partial class Serializer");
    w.open();
    for line in ser.finish().lines() {
        w.line(line);
    }
    w.close();
    w.blank();
    w.line("public static partial class Deserializer");
    w.open();
    for line in de.finish().lines() {
        w.line(line);
    }
    w.close();
    super::artifact_epilogue(&mut w);
    w.finish()
}

fn serialize_signature(w: &mut CodeWriter, cs: &str) {
    w.line("[MethodImpl(MethodImplOptions.AggressiveInlining)]");
    w.line(&format!("public static void Serialize(this {cs} value, ref Writer writer)"));
}

fn null_collection_guard(w: &mut CodeWriter) {
    w.line("if (value == null)");
    w.open();
    w.line("writer.Write(NinoTypeConst.NullCollection);");
    w.line("return;");
    w.close();
}

fn header_read_guard(w: &mut CodeWriter, null_value: &str) {
    w.line("if (!reader.ReadCollectionHeader(out int @len))");
    w.open();
    w.line(&format!("value = {null_value};"));
    w.line("return;");
    w.close();
}

fn elem_write_loop(w: &mut CodeWriter, elem: &TypeInfo, ctx: &EmitContext<'_>) {
    w.line("foreach (var @item in value)");
    w.open();
    w.line(&write_call(elem, "@item", None, ctx.graph));
    w.close();
}

/// Read `@len` elements into a scratch array named `@scratch`.
fn scratch_read_loop(w: &mut CodeWriter, elem: &TypeInfo, ctx: &EmitContext<'_>) {
    let elem_cs = &elem.display_name;
    if elem.is_unmanaged {
        w.line(&format!("reader.ReadUnmanagedSpan(out {elem_cs}[] @scratch, @len);"));
        return;
    }
    w.line(&format!("var @scratch = new {elem_cs}[@len];"));
    w.line("for (int @i = 0; @i < @len; @i++)");
    w.open();
    w.line(&read_call(elem, "@item", None, ctx.graph));
    w.line("@scratch[@i] = @item;");
    w.close();
}

// Nullable<T>: bool tag + payload when present.
fn emit_nullable(ser: &mut CodeWriter, de: &mut CodeWriter, ty: &TypeInfo, ctx: &EmitContext<'_>) {
    let cs = &ty.display_name;
    let underlying = ty.nullable.as_deref().expect("nullable shape");
    let under_cs = &underlying.display_name;

    serialize_signature(ser, cs);
    ser.open();
    ser.line("if (!value.HasValue)");
    ser.open();
    ser.line("writer.Write(false);");
    ser.line("return;");
    ser.close();
    ser.line("writer.Write(true);");
    ser.line(&write_call(underlying, "value.Value", None, ctx.graph));
    ser.close();
    ser.blank();

    de.line(&format!("public static void Deserialize(out {cs} value, ref Reader reader)"));
    de.open();
    de.line("reader.Read(out bool @has);");
    de.line("if (!@has)");
    de.open();
    de.line("value = null;");
    de.line("return;");
    de.close();
    de.line(&read_call(underlying, "@inner", None, ctx.graph));
    de.line("value = @inner;");
    de.close();
    de.blank();
}

// KeyValuePair<K, V>: key then value; unmanaged pairs collapse into one
// bulk write.
fn emit_kvp(ser: &mut CodeWriter, de: &mut CodeWriter, ty: &TypeInfo, ctx: &EmitContext<'_>) {
    let cs = &ty.display_name;
    let key = arg(ty, 0);
    let value = arg(ty, 1);

    serialize_signature(ser, cs);
    ser.open();
    if ty.is_unmanaged || (key.is_unmanaged && value.is_unmanaged) {
        ser.line("writer.Write(value);");
    } else {
        ser.line(&write_call(key, "value.Key", None, ctx.graph));
        ser.line(&write_call(value, "value.Value", None, ctx.graph));
    }
    ser.close();
    ser.blank();

    de.line(&format!("public static void Deserialize(out {cs} value, ref Reader reader)"));
    de.open();
    if ty.is_unmanaged || (key.is_unmanaged && value.is_unmanaged) {
        de.line("reader.Read(out value);");
    } else {
        de.line(&read_call(key, "@key", None, ctx.graph));
        de.line(&read_call(value, "@val", None, ctx.graph));
        de.line(&format!("value = new {cs}(@key, @val);"));
    }
    de.close();
    de.blank();
}

// Tuples: items in order; all-unmanaged tuples collapse into one bulk
// write.
fn emit_tuple(ser: &mut CodeWriter, de: &mut CodeWriter, ty: &TypeInfo, ctx: &EmitContext<'_>) {
    let cs = &ty.display_name;

    serialize_signature(ser, cs);
    ser.open();
    if ty.is_unmanaged {
        ser.line("writer.Write(value);");
    } else {
        for element in &ty.tuple_elements {
            ser.line(&write_call(
                &element.ty,
                &format!("value.{}", element.name),
                None,
                ctx.graph,
            ));
        }
    }
    ser.close();
    ser.blank();

    de.line(&format!("public static void Deserialize(out {cs} value, ref Reader reader)"));
    de.open();
    if ty.is_unmanaged {
        de.line("reader.Read(out value);");
    } else {
        let mut locals = Vec::new();
        for element in &ty.tuple_elements {
            let var = format!("@item{}", locals.len() + 1);
            de.line(&read_call(&element.ty, &var, None, ctx.graph));
            locals.push(var);
        }
        de.line(&format!("value = ({});", locals.join(", ")));
    }
    de.close();
    de.blank();
}

// Rank-1 arrays: collection header then N elements; unmanaged elements go
// through the bulk span path.
fn emit_array(ser: &mut CodeWriter, de: &mut CodeWriter, ty: &TypeInfo, ctx: &EmitContext<'_>) {
    let cs = &ty.display_name;
    let elem = ty.array.as_ref().expect("array shape").element.as_ref();
    let elem_cs = &elem.display_name;

    serialize_signature(ser, cs);
    ser.open();
    null_collection_guard(ser);
    ser.line("writer.Write(value.Length);");
    if elem.is_unmanaged {
        ser.line(&format!("writer.WriteUnmanagedSpan<{elem_cs}>(value);"));
    } else {
        elem_write_loop(ser, elem, ctx);
    }
    ser.close();
    ser.blank();

    de.line(&format!("public static void Deserialize(out {cs} value, ref Reader reader)"));
    de.open();
    header_read_guard(de, "null");
    if elem.is_unmanaged {
        de.line("reader.ReadUnmanagedSpan(out value, @len);");
    } else {
        de.line(&format!("value = new {elem_cs}[@len];"));
        de.line("for (int @i = 0; @i < @len; @i++)");
        de.open();
        de.line(&read_call(elem, "@item", None, ctx.graph));
        de.line("value[@i] = @item;");
        de.close();
    }
    de.close();
    de.blank();
}

// ArraySegment<T>: header + N elements, rebuilt over a fresh array.
fn emit_array_segment(
    ser: &mut CodeWriter,
    de: &mut CodeWriter,
    ty: &TypeInfo,
    ctx: &EmitContext<'_>,
) {
    let cs = &ty.display_name;
    let elem = arg(ty, 0);

    serialize_signature(ser, cs);
    ser.open();
    ser.line("writer.Write(value.Count);");
    elem_write_loop(ser, elem, ctx);
    ser.close();
    ser.blank();

    de.line(&format!("public static void Deserialize(out {cs} value, ref Reader reader)"));
    de.open();
    header_read_guard(de, "default");
    scratch_read_loop(de, elem, ctx);
    de.line(&format!("value = new {cs}(@scratch);"));
    de.close();
    de.blank();
}

// The list family: header + N elements, Add-based rebuild, plus a `ref`
// overload that clears and repopulates an existing instance.
fn emit_list(ser: &mut CodeWriter, de: &mut CodeWriter, ty: &TypeInfo, ctx: &EmitContext<'_>) {
    let cs = &ty.display_name;
    let elem = arg(ty, 0);
    let elem_cs = &elem.display_name;
    let concrete = format!("System.Collections.Generic.List<{elem_cs}>");

    serialize_signature(ser, cs);
    ser.open();
    null_collection_guard(ser);
    ser.line("writer.Write(value.Count);");
    if elem.is_unmanaged && def_head(ty) == "System.Collections.Generic.List" {
        ser.line(&format!(
            "writer.WriteUnmanagedSpan<{elem_cs}>(CollectionsMarshal.AsSpan(value));"
        ));
    } else {
        elem_write_loop(ser, elem, ctx);
    }
    ser.close();
    ser.blank();

    de.line(&format!("public static void Deserialize(out {cs} value, ref Reader reader)"));
    de.open();
    header_read_guard(de, "null");
    de.line(&format!("var @list = new {concrete}(@len);"));
    emit_add_loop(de, elem, "@list.Add(@item);", ctx);
    de.line("value = @list;");
    de.close();
    de.blank();

    // Mutation overload: allocate when null, otherwise clear and refill.
    de.line(&format!("public static void Deserialize(ref {cs} value, ref Reader reader)"));
    de.open();
    header_read_guard(de, "null");
    de.line("if (value == null)");
    de.open();
    de.line(&format!("value = new {concrete}(@len);"));
    de.close();
    de.line("else");
    de.open();
    de.line("value.Clear();");
    de.close();
    emit_add_loop(de, elem, "value.Add(@item);", ctx);
    de.close();
    de.blank();
}

fn emit_add_loop(w: &mut CodeWriter, elem: &TypeInfo, add_stmt: &str, ctx: &EmitContext<'_>) {
    w.line("for (int @i = 0; @i < @len; @i++)");
    w.open();
    w.line(&read_call(elem, "@item", None, ctx.graph));
    w.line(add_stmt);
    w.close();
}

// The dictionary family: header then N key/value pairs; unmanaged pairs
// collapse into one bulk copy.
fn emit_dictionary(ser: &mut CodeWriter, de: &mut CodeWriter, ty: &TypeInfo, ctx: &EmitContext<'_>) {
    let cs = &ty.display_name;
    let key = arg(ty, 0);
    let value = arg(ty, 1);
    let key_cs = &key.display_name;
    let value_cs = &value.display_name;
    let fast = key.is_unmanaged && value.is_unmanaged;
    let head = def_head(ty).to_owned();
    let read_only = head == "System.Collections.ObjectModel.ReadOnlyDictionary";

    serialize_signature(ser, cs);
    ser.open();
    null_collection_guard(ser);
    ser.line("writer.Write(value.Count);");
    if fast {
        ser.line(&format!("writer.WriteUnmanagedPairs<{key_cs}, {value_cs}>(value);"));
    } else {
        ser.line("foreach (var @pair in value)");
        ser.open();
        ser.line(&write_call(key, "@pair.Key", None, ctx.graph));
        ser.line(&write_call(value, "@pair.Value", None, ctx.graph));
        ser.close();
    }
    ser.close();
    ser.blank();

    // Concrete container the deserializer fills.
    let concrete = match head.as_str() {
        "System.Collections.Generic.Dictionary"
        | "System.Collections.Generic.IDictionary"
        | "System.Collections.Generic.IReadOnlyDictionary"
        | "System.Collections.ObjectModel.ReadOnlyDictionary" => {
            format!("System.Collections.Generic.Dictionary<{key_cs}, {value_cs}>(@len)")
        }
        "System.Collections.Generic.SortedList" => {
            format!("System.Collections.Generic.SortedList<{key_cs}, {value_cs}>(@len)")
        }
        _ => format!("{head}<{key_cs}, {value_cs}>()"),
    };

    de.line(&format!("public static void Deserialize(out {cs} value, ref Reader reader)"));
    de.open();
    header_read_guard(de, "null");
    de.line(&format!("var @map = new {concrete};"));
    if fast {
        de.line(&format!("reader.ReadUnmanagedPairs<{key_cs}, {value_cs}>(@map, @len);"));
    } else {
        emit_pair_add_loop(de, key, value, ctx);
    }
    if read_only {
        de.line(&format!("value = new {cs}(@map);"));
    } else {
        de.line("value = @map;");
    }
    de.close();
    de.blank();

    if !read_only {
        de.line(&format!("public static void Deserialize(ref {cs} value, ref Reader reader)"));
        de.open();
        header_read_guard(de, "null");
        de.line("if (value == null)");
        de.open();
        de.line(&format!("value = new {concrete};"));
        de.close();
        de.line("else");
        de.open();
        de.line("value.Clear();");
        de.close();
        if fast {
            de.line(&format!("reader.ReadUnmanagedPairs<{key_cs}, {value_cs}>(value, @len);"));
        } else {
            de.line("for (int @i = 0; @i < @len; @i++)");
            de.open();
            de.line(&read_call(key, "@key", None, ctx.graph));
            de.line(&read_call(value, "@val", None, ctx.graph));
            de.line("value[@key] = @val;");
            de.close();
        }
        de.close();
        de.blank();
    }
}

fn emit_pair_add_loop(w: &mut CodeWriter, key: &TypeInfo, value: &TypeInfo, ctx: &EmitContext<'_>) {
    w.line("for (int @i = 0; @i < @len; @i++)");
    w.open();
    w.line(&read_call(key, "@key", None, ctx.graph));
    w.line(&read_call(value, "@val", None, ctx.graph));
    w.line("@map[@key] = @val;");
    w.close();
}

// Stacks write top-to-bottom (their enumeration order) and rebuild by
// pushing a scratch array in reverse, so round-trips preserve pop order.
fn emit_stack(ser: &mut CodeWriter, de: &mut CodeWriter, ty: &TypeInfo, ctx: &EmitContext<'_>) {
    let cs = &ty.display_name;
    let elem = arg(ty, 0);

    serialize_signature(ser, cs);
    ser.open();
    null_collection_guard(ser);
    ser.line("writer.Write(value.Count);");
    elem_write_loop(ser, elem, ctx);
    ser.close();
    ser.blank();

    de.line(&format!("public static void Deserialize(out {cs} value, ref Reader reader)"));
    de.open();
    header_read_guard(de, "null");
    scratch_read_loop(de, elem, ctx);
    de.line(&format!("value = new {cs}(@len);"));
    de.line("for (int @i = @len - 1; @i >= 0; @i--)");
    de.open();
    de.line("value.Push(@scratch[@i]);");
    de.close();
    de.close();
    de.blank();
}

// Queues enumerate front-to-back; rebuild enqueues in order.
fn emit_queue(ser: &mut CodeWriter, de: &mut CodeWriter, ty: &TypeInfo, ctx: &EmitContext<'_>) {
    let cs = &ty.display_name;
    let elem = arg(ty, 0);

    serialize_signature(ser, cs);
    ser.open();
    null_collection_guard(ser);
    ser.line("writer.Write(value.Count);");
    elem_write_loop(ser, elem, ctx);
    ser.close();
    ser.blank();

    de.line(&format!("public static void Deserialize(out {cs} value, ref Reader reader)"));
    de.open();
    header_read_guard(de, "null");
    de.line(&format!("value = new {cs}(@len);"));
    emit_add_loop(de, elem, "value.Enqueue(@item);", ctx);
    de.close();
    de.blank();
}

// HashSet and SortedSet share the Add-based rebuild.
fn emit_add_set(ser: &mut CodeWriter, de: &mut CodeWriter, ty: &TypeInfo, ctx: &EmitContext<'_>) {
    let cs = &ty.display_name;
    let elem = arg(ty, 0);
    let elem_cs = &elem.display_name;
    let concrete = if def_head(ty) == "System.Collections.Generic.ISet" {
        format!("System.Collections.Generic.HashSet<{elem_cs}>")
    } else {
        cs.clone()
    };

    serialize_signature(ser, cs);
    ser.open();
    null_collection_guard(ser);
    ser.line("writer.Write(value.Count);");
    elem_write_loop(ser, elem, ctx);
    ser.close();
    ser.blank();

    de.line(&format!("public static void Deserialize(out {cs} value, ref Reader reader)"));
    de.open();
    header_read_guard(de, "null");
    de.line(&format!("var @set = new {concrete}();"));
    emit_add_loop(de, elem, "@set.Add(@item);", ctx);
    de.line("value = @set;");
    de.close();
    de.blank();
}

fn emit_linked_list(ser: &mut CodeWriter, de: &mut CodeWriter, ty: &TypeInfo, ctx: &EmitContext<'_>) {
    let cs = &ty.display_name;
    let elem = arg(ty, 0);

    serialize_signature(ser, cs);
    ser.open();
    null_collection_guard(ser);
    ser.line("writer.Write(value.Count);");
    elem_write_loop(ser, elem, ctx);
    ser.close();
    ser.blank();

    de.line(&format!("public static void Deserialize(out {cs} value, ref Reader reader)"));
    de.open();
    header_read_guard(de, "null");
    de.line(&format!("value = new {cs}();"));
    emit_add_loop(de, elem, "value.AddLast(@item);", ctx);
    de.close();
    de.blank();
}

// Immutable shapes: header + N elements + factory call. The `ref`
// overload delegates to the `out` overload.
fn emit_immutable(ser: &mut CodeWriter, de: &mut CodeWriter, ty: &TypeInfo, ctx: &EmitContext<'_>) {
    let cs = &ty.display_name;
    let elem = arg(ty, 0);
    let factory = if def_head(ty) == "System.Collections.Immutable.ImmutableArray" {
        "System.Collections.Immutable.ImmutableArray.Create(@scratch)".to_owned()
    } else {
        "System.Collections.Immutable.ImmutableList.CreateRange(@scratch)".to_owned()
    };

    serialize_signature(ser, cs);
    ser.open();
    ser.line("if (value.IsDefault)");
    ser.open();
    ser.line("writer.Write(NinoTypeConst.NullCollection);");
    ser.line("return;");
    ser.close();
    ser.line("writer.Write(value.Length);");
    elem_write_loop(ser, elem, ctx);
    ser.close();
    ser.blank();

    de.line(&format!("public static void Deserialize(out {cs} value, ref Reader reader)"));
    de.open();
    header_read_guard(de, "default");
    scratch_read_loop(de, elem, ctx);
    de.line(&format!("value = {factory};"));
    de.close();
    de.blank();

    de.line(&format!("public static void Deserialize(ref {cs} value, ref Reader reader)"));
    de.open();
    de.line("Deserialize(out value, ref reader);");
    de.close();
    de.blank();
}

// PriorityQueue<TElement, TPriority>: header + N (element, priority)
// pairs via UnorderedItems; rebuild enqueues each pair.
fn emit_priority_queue(
    ser: &mut CodeWriter,
    de: &mut CodeWriter,
    ty: &TypeInfo,
    ctx: &EmitContext<'_>,
) {
    let cs = &ty.display_name;
    let element = arg(ty, 0);
    let priority = arg(ty, 1);

    serialize_signature(ser, cs);
    ser.open();
    null_collection_guard(ser);
    ser.line("writer.Write(value.Count);");
    ser.line("foreach (var (@element, @priority) in value.UnorderedItems)");
    ser.open();
    ser.line(&write_call(element, "@element", None, ctx.graph));
    ser.line(&write_call(priority, "@priority", None, ctx.graph));
    ser.close();
    ser.close();
    ser.blank();

    de.line(&format!("public static void Deserialize(out {cs} value, ref Reader reader)"));
    de.open();
    header_read_guard(de, "null");
    de.line(&format!("value = new {cs}(@len);"));
    de.line("for (int @i = 0; @i < @len; @i++)");
    de.open();
    de.line(&read_call(element, "@element", None, ctx.graph));
    de.line(&read_call(priority, "@priority", None, ctx.graph));
    de.line("value.Enqueue(@element, @priority);");
    de.close();
    de.close();
    de.blank();
}

// User-typed enumerables: `Add`/`Clear` surface uses the int-capacity or
// empty constructor and adds; otherwise a constructor accepting an
// array of the element type gets a scratch array.
fn emit_custom_enumerable(
    ser: &mut CodeWriter,
    de: &mut CodeWriter,
    ty: &TypeInfo,
    ctx: &EmitContext<'_>,
) {
    let cs = &ty.display_name;
    let enumerable = ty.enumerable.as_ref().expect("enumerable shape");
    let elem = enumerable.element.as_ref();

    serialize_signature(ser, cs);
    ser.open();
    null_collection_guard(ser);
    ser.line("writer.Write(value.Count);");
    elem_write_loop(ser, elem, ctx);
    ser.close();
    ser.blank();

    de.line(&format!("public static void Deserialize(out {cs} value, ref Reader reader)"));
    de.open();
    header_read_guard(de, "null");
    if enumerable.has_add_clear {
        de.line(&format!("value = new {cs}();"));
        emit_add_loop(de, elem, "value.Add(@item);", ctx);
    } else {
        scratch_read_loop(de, elem, ctx);
        de.line(&format!("value = new {cs}(@scratch);"));
    }
    de.close();
    de.blank();

    if enumerable.has_add_clear {
        de.line(&format!("public static void Deserialize(ref {cs} value, ref Reader reader)"));
        de.open();
        header_read_guard(de, "null");
        de.line("if (value == null)");
        de.open();
        de.line(&format!("value = new {cs}();"));
        de.close();
        de.line("else");
        de.open();
        de.line("value.Clear();");
        de.close();
        emit_add_loop(de, elem, "value.Add(@item);", ctx);
        de.close();
        de.blank();
    }
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::{
            cancel::CancellationToken,
            driver::GeneratorConfig,
            extract::extract_all,
            project::project,
            symbols::{generated_namespace, AttrSymbol, HostCompilation, MemberSymbol, TypeSymbol},
        },
        std::sync::Arc,
    };

    fn shape_of(symbol: &TypeSymbol) -> TypeInfo {
        project(symbol, &CancellationToken::new()).unwrap()
    }

    fn list_of_int() -> TypeSymbol {
        TypeSymbol::generic(
            "System.Collections.Generic.List<T>",
            vec![Arc::new(TypeSymbol::int())],
            "System.Collections",
        )
    }

    fn dict_int_int() -> TypeSymbol {
        TypeSymbol::generic(
            "System.Collections.Generic.Dictionary<TKey, TValue>",
            vec![Arc::new(TypeSymbol::int()), Arc::new(TypeSymbol::int())],
            "System.Collections",
        )
    }

    fn emit_one(symbol: &TypeSymbol) -> String {
        let shape = shape_of(symbol);
        assert!(find_generator(&shape).is_some(), "no generator for shape");
        let graph = crate::graph::NinoGraph::build(Vec::new());
        let config = GeneratorConfig::default();
        let ctx = EmitContext {
            graph: &graph,
            config: &config,
            namespace: generated_namespace("Game.Core"),
        };
        emit_builtins_artifact(&[shape], &ctx)
    }

    #[test]
    fn catalogue_routes_shapes_to_the_expected_generators() {
        let cases: Vec<(TypeSymbol, &str)> = vec![
            (TypeSymbol::nullable(Arc::new(TypeSymbol::int())), "nullable"),
            (list_of_int(), "list"),
            (dict_int_int(), "dictionary"),
            (
                TypeSymbol::generic(
                    "System.Collections.Generic.Stack<T>",
                    vec![Arc::new(TypeSymbol::int())],
                    "System.Collections",
                ),
                "stack",
            ),
            (
                TypeSymbol::generic(
                    "System.Collections.Generic.PriorityQueue<TElement, TPriority>",
                    vec![Arc::new(TypeSymbol::string()), Arc::new(TypeSymbol::int())],
                    "System.Collections",
                ),
                "priority-queue",
            ),
            (
                TypeSymbol::tuple(vec![
                    (None, Arc::new(TypeSymbol::int())),
                    (None, Arc::new(TypeSymbol::string())),
                ]),
                "tuple",
            ),
            (
                TypeSymbol::array(Arc::new(TypeSymbol::byte()), 1),
                "array",
            ),
        ];
        for (symbol, expected) in cases {
            let shape = shape_of(&symbol);
            assert_eq!(find_generator(&shape).unwrap().name, expected, "{}", shape.display_name);
        }
    }

    #[test]
    fn multi_dimensional_arrays_have_no_generator() {
        let shape = shape_of(&TypeSymbol::array(Arc::new(TypeSymbol::int()), 2));
        assert!(find_generator(&shape).is_none());
    }

    #[test]
    fn dictionary_fast_path_uses_bulk_pairs() {
        let text = emit_one(&dict_int_int());
        assert!(text.contains("writer.WriteUnmanagedPairs<int, int>(value);"));
        assert!(text.contains("reader.ReadUnmanagedPairs<int, int>(@map, @len);"));
        assert!(text.contains("writer.Write(NinoTypeConst.NullCollection);"));
    }

    #[test]
    fn dictionary_with_managed_values_reads_pairs_elementwise() {
        let dict = TypeSymbol::generic(
            "System.Collections.Generic.Dictionary<TKey, TValue>",
            vec![Arc::new(TypeSymbol::int()), Arc::new(TypeSymbol::string())],
            "System.Collections",
        );
        let text = emit_one(&dict);
        assert!(text.contains("@map[@key] = @val;"));
        assert!(!text.contains("WriteUnmanagedPairs"));
    }

    #[test]
    fn stack_rebuilds_by_pushing_in_reverse() {
        let stack = TypeSymbol::generic(
            "System.Collections.Generic.Stack<T>",
            vec![Arc::new(TypeSymbol::int())],
            "System.Collections",
        );
        let text = emit_one(&stack);
        assert!(text.contains("for (int @i = @len - 1; @i >= 0; @i--)"));
        assert!(text.contains("value.Push(@scratch[@i]);"));
    }

    #[test]
    fn list_emits_a_ref_mutation_overload() {
        let text = emit_one(&list_of_int());
        assert!(text.contains("public static void Deserialize(ref System.Collections.Generic.List<int> value, ref Reader reader)"));
        assert!(text.contains("value.Clear();"));
        assert!(text.contains("CollectionsMarshal.AsSpan(value)"));
    }

    #[test]
    fn immutable_ref_overload_delegates_to_out() {
        let immutable = TypeSymbol::generic(
            "System.Collections.Immutable.ImmutableArray<T>",
            vec![Arc::new(TypeSymbol::int())],
            "System.Collections.Immutable",
        );
        let text = emit_one(&immutable);
        assert!(text.contains("Deserialize(out value, ref reader);"));
        assert!(text.contains("ImmutableArray.Create(@scratch)"));
    }

    #[test]
    fn nullable_writes_bool_tag_then_payload() {
        let text = emit_one(&TypeSymbol::nullable(Arc::new(TypeSymbol::int())));
        assert!(text.contains("writer.Write(true);"));
        assert!(text.contains("writer.Write(false);"));
        assert!(text.contains("reader.Read(out bool @has);"));
    }

    #[test]
    fn shapes_are_collected_transitively_and_deduped() {
        let list_of_lists = TypeSymbol::generic(
            "System.Collections.Generic.List<T>",
            vec![Arc::new(list_of_int())],
            "System.Collections",
        );
        let holder = Arc::new(
            TypeSymbol::class("Holder", "Game", "Game.Core")
                .with_attr(AttrSymbol::nino_type())
                .with_members(vec![
                    MemberSymbol::field("Nested", Arc::new(list_of_lists)),
                    MemberSymbol::field("Plain", Arc::new(list_of_int())),
                ]),
        );
        let host = HostCompilation::new("Game.Core").with_types(vec![holder]);
        let graph =
            crate::graph::NinoGraph::build(extract_all(&host, &CancellationToken::new()).unwrap());
        let shapes = collect_shapes(&graph);
        let names: Vec<_> = shapes.iter().map(|s| s.display_name.as_str()).collect();
        assert_eq!(
            names,
            [
                "System.Collections.Generic.List<System.Collections.Generic.List<int>>",
                "System.Collections.Generic.List<int>",
            ]
        );
    }
}
