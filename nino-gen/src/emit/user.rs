//! Per-type emission: serializer, deserializer, private-member accessors
//! and registration glue for every participating user type.
use crate::{
    emit::{const_name, ensure_resolvable, write_call, CodeWriter, EmitContext},
    model::{NinoMember, NinoType},
    GenResult,
};

/// Widest unsafe bulk primitive the runtime exposes: adjacent unmanaged
/// members are coalesced into tuple writes of at most this many lanes.
pub const MAX_BULK_RUN: usize = 16;

enum MemberGroup<'a> {
    /// A run of adjacent unmanaged, non-polymorphic, no-custom-formatter
    /// members, written as one tuple.
    Bulk(Vec<&'a NinoMember>),
    Single(&'a NinoMember),
}

fn bulk_eligible(member: &NinoMember) -> bool {
    member.ty.is_unmanaged && member.custom_formatter.is_none()
}

fn flush_run<'a>(run: &mut Vec<&'a NinoMember>, groups: &mut Vec<MemberGroup<'a>>) {
    match run.len() {
        0 => {}
        1 => groups.push(MemberGroup::Single(run[0])),
        _ => groups.push(MemberGroup::Bulk(std::mem::take(run))),
    }
    run.clear();
}

fn group_members(members: &[NinoMember]) -> Vec<MemberGroup<'_>> {
    let mut groups = Vec::new();
    let mut run: Vec<&NinoMember> = Vec::new();
    for member in members {
        if bulk_eligible(member) {
            run.push(member);
            if run.len() == MAX_BULK_RUN {
                flush_run(&mut run, &mut groups);
            }
        } else {
            flush_run(&mut run, &mut groups);
            groups.push(MemberGroup::Single(member));
        }
    }
    flush_run(&mut run, &mut groups);
    groups
}

fn local_name(member: &NinoMember) -> String {
    let mut out = String::with_capacity(member.name.len() + 1);
    out.push('@');
    for c in member.name.chars() {
        if c.is_ascii_alphanumeric() {
            out.extend(c.to_lowercase());
        } else {
            out.push('_');
        }
    }
    out
}

/// The read expression for a member on an existing instance.
fn member_get(t: &NinoType, member: &NinoMember, receiver: &str, ctx: &EmitContext) -> String {
    if !member.is_private {
        return format!("{receiver}.{}", member.name);
    }
    let accessor = accessor_class(t);
    if member.is_readonly {
        // The readonly write shim is a ref; it doubles as the reader.
        return format!("{accessor}.__{}({receiver})", member.name);
    }
    if ctx.config.unsafe_accessors {
        if member.is_property {
            format!("{accessor}.__get_{}({receiver})", member.name)
        } else {
            format!("{accessor}.__{}({receiver})", member.name)
        }
    } else {
        format!("{receiver}.__nino__{}", member.name)
    }
}

/// The assignment statement for a member on a freshly-built instance.
fn member_set(
    t: &NinoType,
    member: &NinoMember,
    receiver: &str,
    value: &str,
    ctx: &EmitContext,
) -> String {
    if member.is_readonly {
        // Readonly fields and get-only properties cannot be assigned
        // outside the declaring constructor, whatever their accessibility;
        // the unsafe accessor's ref is the only legal device.
        return format!(
            "{}.__{}({receiver}) = {value};",
            accessor_class(t),
            member.name
        );
    }
    if !member.is_private {
        return format!("{receiver}.{} = {value};", member.name);
    }
    let accessor = accessor_class(t);
    if ctx.config.unsafe_accessors {
        if member.is_property {
            format!("{accessor}.__set_{}({receiver}, {value});", member.name)
        } else {
            format!("{accessor}.__{}({receiver}) = {value};", member.name)
        }
    } else {
        format!("{receiver}.__nino__{} = {value};", member.name)
    }
}

fn accessor_class(t: &NinoType) -> String {
    format!("PrivateAccessor_{}", const_name(&t.info))
}

/// Non-declaring read statement into an existing local, against an
/// explicit reader expression (the weak-version-tolerance path reads from
/// a frame-confined reader).
fn read_into(member: &NinoMember, var: &str, reader: &str, ctx: &EmitContext) -> String {
    let ty = &member.ty;
    if let Some(formatter) = &member.custom_formatter {
        return format!("{}.Deserialize(out {var}, ref {reader});", formatter.display_name);
    }
    if let Some(user) = ctx.graph.get(ty.type_id) {
        if let Some(custom) = &user.custom_deserializer {
            return format!("{custom}.Deserialize(out {var}, ref {reader});");
        }
    }
    if member.is_utf8_string && ty.is_string() {
        return format!("{reader}.ReadUtf8(out {var});");
    }
    if ty.is_unmanaged || ty.is_string() {
        return format!("{reader}.Read(out {var});");
    }
    format!("Deserialize(out {var}, ref {reader});")
}

/// Emit the complete artifact for one user type: `Serialize` dispatcher and
/// impl, `Deserialize` dispatcher and impl, and accessor shims.
///
/// Types carrying cross-assembly codec hints are not re-emitted; callers
/// route to the referenced assembly's codecs instead.
pub fn emit_user_type(t: &NinoType, ctx: &EmitContext) -> GenResult<String> {
    for member in &t.members {
        ensure_resolvable(&t.info.display_name, &member.name, &member.ty, ctx.graph)?;
    }

    let mut w = CodeWriter::new();
    super::artifact_prologue(&mut w, &ctx.namespace);

    w.line("public static partial class Serializer");
    w.open();
    emit_serializer(&mut w, t, ctx);
    w.blank();
    emit_serialize_impl(&mut w, t, ctx);
    w.close();
    w.blank();

    w.line("public static partial class Deserializer");
    w.open();
    emit_deserializer(&mut w, t, ctx);
    w.blank();
    emit_deserialize_impl(&mut w, t, ctx)?;
    w.close();

    emit_unsafe_accessors(&mut w, t, ctx);
    super::artifact_epilogue(&mut w);

    if !ctx.config.unsafe_accessors {
        emit_partial_augmentation(&mut w, t);
    }
    Ok(w.finish())
}

/// The polymorphic dispatch serializer.
///
/// Reference types always carry the 32-bit type-id prefix (null writes the
/// null sentinel alone); polymorphic types branch over known concrete
/// sub-types deepest-first. The default case writes the declared type's own
/// id and members, and is omitted when the declared type is abstract.
fn emit_serializer(w: &mut CodeWriter, t: &NinoType, ctx: &EmitContext) {
    let cs = &t.info.display_name;
    w.line("[MethodImpl(MethodImplOptions.AggressiveInlining)]");
    w.line(&format!("public static void Serialize(this {cs} value, ref Writer writer)"));
    w.open();

    if t.info.is_value_type {
        w.line("SerializeImpl(value, ref writer);");
        w.close();
        return;
    }

    w.line("if (value == null)");
    w.open();
    w.line("writer.Write(NinoTypeConst.Null);");
    w.line("return;");
    w.close();

    let subs = ctx.graph.dispatch_order(t);
    if t.is_polymorphic && !subs.is_empty() {
        w.line("switch (value)");
        w.open();
        for sub in &subs {
            let sub_cs = &sub.info.display_name;
            let var = &sub.info.instance_name;
            w.line(&format!("case {sub_cs} {var}:"));
            w.with_indent(|w| {
                w.line(&format!("writer.Write(NinoTypeConst.{});", const_name(&sub.info)));
                w.line(&format!("SerializeImpl({var}, ref writer);"));
                w.line("return;");
            });
        }
        if !t.info.is_abstract {
            w.line("default:");
            w.with_indent(|w| {
                w.line(&format!("writer.Write(NinoTypeConst.{});", const_name(&t.info)));
                w.line("SerializeImpl(value, ref writer);");
                w.line("return;");
            });
        }
        w.close();
    } else {
        w.line(&format!("writer.Write(NinoTypeConst.{});", const_name(&t.info)));
        w.line("SerializeImpl(value, ref writer);");
    }
    w.close();
}

/// The member-writing body: adjacent unmanaged members coalesce into tuple
/// writes of up to sixteen lanes, everything else writes singly (framed
/// when weak-version-tolerance is on).
fn emit_serialize_impl(w: &mut CodeWriter, t: &NinoType, ctx: &EmitContext) {
    let cs = &t.info.display_name;
    w.line("[MethodImpl(MethodImplOptions.AggressiveInlining)]");
    w.line(&format!("internal static void SerializeImpl({cs} value, ref Writer writer)"));
    w.open();
    let mut frame = 0usize;
    for group in group_members(&t.members) {
        match group {
            MemberGroup::Bulk(members) => {
                let args = members
                    .iter()
                    .map(|m| member_get(t, m, "value", ctx))
                    .collect::<Vec<_>>()
                    .join(", ");
                w.line(&format!("writer.Write(NinoTuple.Create({args}));"));
            }
            MemberGroup::Single(member) => {
                let expr = member_get(t, member, "value", ctx);
                let stmt = write_call(&member.ty, &expr, Some(member), ctx.graph);
                if ctx.config.weak_version_tolerance && !member.ty.is_unmanaged {
                    let slot = format!("@frame{frame}");
                    frame += 1;
                    w.line(&format!("var {slot} = writer.ReserveFrame();"));
                    w.line(&stmt);
                    w.line(&format!("writer.PatchFrame({slot});"));
                } else {
                    w.line(&stmt);
                }
            }
        }
    }
    w.close();
}

/// The polymorphic dispatch deserializer, mirroring the serializer's
/// deepest-first case order. An unknown id is an invalid payload.
fn emit_deserializer(w: &mut CodeWriter, t: &NinoType, ctx: &EmitContext) {
    let cs = &t.info.display_name;
    w.line(&format!("public static void Deserialize(out {cs} value, ref Reader reader)"));
    w.open();
    if ctx.config.weak_version_tolerance {
        w.line("if (reader.Eof)");
        w.open();
        w.line("value = default;");
        w.line("return;");
        w.close();
    }

    if t.info.is_value_type {
        w.line("DeserializeImpl(out value, ref reader);");
        w.close();
        return;
    }

    w.line("reader.Read(out int typeId);");
    w.line("switch (typeId)");
    w.open();
    w.line("case NinoTypeConst.Null:");
    w.with_indent(|w| {
        w.line("value = null;");
        w.line("return;");
    });
    for sub in ctx.graph.dispatch_order(t) {
        let sub_cs = &sub.info.display_name;
        let var = &sub.info.instance_name;
        w.line(&format!("case NinoTypeConst.{}:", const_name(&sub.info)));
        w.with_indent(|w| {
            w.line(&format!("DeserializeImpl(out {sub_cs} {var}, ref reader);"));
            w.line(&format!("value = {var};"));
            w.line("return;");
        });
    }
    if !t.info.is_abstract {
        w.line(&format!("case NinoTypeConst.{}:", const_name(&t.info)));
        w.with_indent(|w| {
            w.line(&format!("DeserializeImpl(out {cs} {var}, ref reader);", var = "@self"));
            w.line("value = @self;");
            w.line("return;");
        });
    }
    w.line("default:");
    w.with_indent(|w| {
        w.line(&format!(
            "throw new InvalidPayloadException($\"Unknown type id {{typeId}} while reading {cs}\");"
        ));
    });
    w.close();
    w.close();
}

/// The member-reading body. Members that are constructor parameters feed
/// the selected constructor or factory; the rest are assigned after,
/// through accessor shims when non-public.
fn emit_deserialize_impl(w: &mut CodeWriter, t: &NinoType, ctx: &EmitContext) -> GenResult<()> {
    let cs = &t.info.display_name;
    w.line(&format!("internal static void DeserializeImpl(out {cs} value, ref Reader reader)"));
    w.open();

    // Read every member into a local first, in wire order.
    let mut frame = 0usize;
    let mut run = 0usize;
    // Pre-compute each member's value expression (a plain local, or a lane
    // of a bulk tuple read).
    let mut exprs: Vec<(usize, String)> = Vec::new();
    let member_index = |member: &NinoMember| {
        t.members
            .iter()
            .position(|m| std::ptr::eq(m, member))
            .unwrap_or_default()
    };
    for group in group_members(&t.members) {
        match group {
            MemberGroup::Bulk(members) => {
                let types = members
                    .iter()
                    .map(|m| m.ty.display_name.clone())
                    .collect::<Vec<_>>()
                    .join(", ");
                let var = format!("@run{run}");
                run += 1;
                w.line(&format!("reader.Read(out NinoTuple<{types}> {var});"));
                for (lane, member) in members.iter().enumerate() {
                    exprs.push((member_index(member), format!("{var}.Item{}", lane + 1)));
                }
            }
            MemberGroup::Single(member) => {
                let var = local_name(member);
                let member_cs = &member.ty.display_name;
                if ctx.config.weak_version_tolerance && !member.ty.is_unmanaged {
                    let frame_var = format!("@frame{frame}");
                    frame += 1;
                    w.line(&format!("{member_cs} {var} = default;"));
                    w.line(&format!("if (reader.EnterFrame(out Reader {frame_var}))"));
                    w.open();
                    w.line(&read_into(member, &var, &frame_var, ctx));
                    w.close();
                } else {
                    w.line(&format!("{member_cs} {var};"));
                    w.line(&read_into(member, &var, "reader", ctx));
                }
                exprs.push((member_index(member), var));
            }
        }
    }
    exprs.sort_by_key(|(index, _)| *index);
    let expr_of = |member: &NinoMember| {
        exprs
            .iter()
            .find(|(index, _)| *index == member_index(member))
            .map(|(_, expr)| expr.clone())
            .unwrap_or_default()
    };

    // Construct the instance.
    if let Some(factory) = &t.ref_factory {
        w.line(&format!("var @result = {cs}.{factory}();"));
        for member in &t.members {
            w.line(&member_set(t, member, "@result", &expr_of(member), ctx));
        }
    } else {
        let ctor = t
            .select_constructor()
            .ok_or_else(|| crate::GenError::NoConstructor(cs.clone()))?;
        let args = t
            .ctor_call_order(ctor)
            .iter()
            .map(|param| {
                t.members
                    .iter()
                    .find(|m| m.name.eq_ignore_ascii_case(&param.name))
                    .map(|m| expr_of(m))
                    .unwrap_or_else(|| "default".to_owned())
            })
            .collect::<Vec<_>>()
            .join(", ");
        let call = if ctor.is_constructor {
            format!("var @result = new {cs}({args});")
        } else {
            let method = ctor.method_name.as_deref().unwrap_or("Create");
            format!("var @result = {cs}.{method}({args});")
        };
        w.line(&call);
        for member in t.members.iter().filter(|m| !m.is_ctor_parameter) {
            w.line(&member_set(t, member, "@result", &expr_of(member), ctx));
        }
    }
    w.line("value = @result;");
    w.close();
    Ok(())
}

/// `UnsafeAccessor` extern shims.
///
/// Private members get shims when the host runtime supports unsafe
/// accessors (otherwise the partial-class augmentation serves them).
/// Readonly fields and get-only auto-properties get a ref shim against the
/// field (or compiler-named backing field) regardless of the config: no
/// other assignment device is legal outside the declaring constructor.
fn emit_unsafe_accessors(w: &mut CodeWriter, t: &NinoType, ctx: &EmitContext) {
    // Every readonly member keeps a shim: the ref-deserialization-factory
    // path assigns constructor-fed members post-construction too.
    let readonly_shim = |m: &&NinoMember| m.is_readonly;
    let private_shim =
        |m: &&NinoMember| m.is_private && !m.is_readonly && ctx.config.unsafe_accessors;
    let shims: Vec<&NinoMember> = t
        .members
        .iter()
        .filter(|m| readonly_shim(m) || private_shim(m))
        .collect();
    if shims.is_empty() {
        return;
    }
    let cs = &t.info.display_name;
    w.blank();
    w.line(&format!("internal static class {}", accessor_class(t)));
    w.open();
    for member in shims {
        let member_cs = &member.ty.display_name;
        if member.is_readonly {
            let field = if member.is_property {
                format!("<{}>k__BackingField", member.name)
            } else {
                member.name.clone()
            };
            w.line(&format!(
                "[UnsafeAccessor(UnsafeAccessorKind.Field, Name = \"{field}\")]"
            ));
            w.line(&format!(
                "internal static extern ref {member_cs} __{}({cs} @this);",
                member.name
            ));
        } else if member.is_property {
            w.line(&format!(
                "[UnsafeAccessor(UnsafeAccessorKind.Method, Name = \"get_{}\")]",
                member.name
            ));
            w.line(&format!(
                "internal static extern {member_cs} __get_{}({cs} @this);",
                member.name
            ));
            w.line(&format!(
                "[UnsafeAccessor(UnsafeAccessorKind.Method, Name = \"set_{}\")]",
                member.name
            ));
            w.line(&format!(
                "internal static extern void __set_{}({cs} @this, {member_cs} value);",
                member.name
            ));
        } else {
            w.line(&format!(
                "[UnsafeAccessor(UnsafeAccessorKind.Field, Name = \"{}\")]",
                member.name
            ));
            w.line(&format!(
                "internal static extern ref {member_cs} __{}({cs} @this);",
                member.name
            ));
        }
    }
    w.close();
}

/// Fallback for host runtimes without unsafe accessors: a partial-class
/// augmentation exposing same-typed back-door properties. Requires the
/// user type to be declared `partial`. Readonly members are excluded: a
/// back-door setter could not legally assign them, so they keep their
/// unconditional accessor shims.
fn emit_partial_augmentation(w: &mut CodeWriter, t: &NinoType) {
    let privates: Vec<&NinoMember> = t
        .members
        .iter()
        .filter(|m| m.is_private && !m.is_readonly)
        .collect();
    if privates.is_empty() {
        return;
    }
    w.blank();
    w.line(&format!("namespace {}", t.info.namespace));
    w.open();
    let keyword = if t.info.is_value_type { "struct" } else { "class" };
    w.line(&format!("public partial {keyword} {}", t.info.simple_name));
    w.open();
    for member in privates {
        let member_cs = &member.ty.display_name;
        w.line(&format!(
            "internal {member_cs} __nino__{name} {{ get => {name}; set => {name} = value; }}",
            name = member.name
        ));
    }
    w.close();
    w.close();
}

/// One registrar per type. Installs the direct impl under both the
/// declared type and its stable id, records parent-to-child sub-type
/// entries so a serializer invoked at a base finds the derived writer, and
/// registers the polymorphic dispatcher as the "optimal" entrypoint for
/// non-sealed reference types.
///
/// Sub-type recording happens in the *base* type's registrar: a derived
/// type in a different assembly is not dispatchable here until that
/// assembly's own `Init()` has run.
pub fn emit_registration(w: &mut CodeWriter, t: &NinoType, ctx: &EmitContext) {
    let cs = &t.info.display_name;
    let konst = const_name(&t.info);
    w.line(&format!("private static void Register_{konst}()"));
    w.open();
    w.line(&format!(
        "NinoTypeRegistry.Register<{cs}>(NinoTypeConst.{konst}, Serializer.SerializeImpl, Deserializer.DeserializeImpl);"
    ));
    for sub in ctx.graph.dispatch_order(t) {
        w.line(&format!(
            "NinoTypeRegistry.RecordSubType(NinoTypeConst.{konst}, NinoTypeConst.{});",
            const_name(&sub.info)
        ));
    }
    if t.is_polymorphic && !t.info.is_value_type && !t.info.is_sealed {
        w.line(&format!(
            "NinoTypeRegistry.RegisterPolymorphic<{cs}>(Serializer.Serialize, Deserializer.Deserialize);"
        ));
    }
    w.close();
}
