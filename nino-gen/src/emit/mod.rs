//! Code emission: artifacts of host-language source text.
//!
//! `user` emits the per-type serializer/deserializer pairs and their
//! registration glue; `builtins` emits the structural catalogue. Both
//! render through [`CodeWriter`] and share the per-value codec selection in
//! this module.
use crate::{
    driver::GeneratorConfig,
    graph::NinoGraph,
    info::TypeInfo,
    model::NinoMember,
    GenError, GenResult,
};

pub mod builtins;
pub mod user;

/// Emission buffers start at a modest pre-size and grow geometrically;
/// large buffers are released after the batch rather than pooled.
pub const EMIT_BUFFER_CAPACITY: usize = 256 * 1024;

const INDENT: &str = "    ";

/// Indentation-tracking source-text builder.
pub struct CodeWriter {
    buf: String,
    indent: usize,
}

impl CodeWriter {
    #[must_use]
    pub fn new() -> Self {
        Self {
            buf: String::with_capacity(EMIT_BUFFER_CAPACITY),
            indent: 0,
        }
    }

    pub fn line(&mut self, line: &str) {
        for _ in 0..self.indent {
            self.buf.push_str(INDENT);
        }
        self.buf.push_str(line);
        self.buf.push('\n');
    }

    pub fn blank(&mut self) {
        self.buf.push('\n');
    }

    /// Open a brace block on its own line, host-language style.
    pub fn open(&mut self) {
        self.line("{");
        self.indent += 1;
    }

    pub fn close(&mut self) {
        self.indent = self.indent.saturating_sub(1);
        self.line("}");
    }

    /// Close with a trailing token, e.g. `});`.
    pub fn close_with(&mut self, suffix: &str) {
        self.indent = self.indent.saturating_sub(1);
        self.line(&format!("}}{suffix}"));
    }

    /// Run `body` one indentation level deeper, without braces. Used for
    /// `case` bodies.
    pub fn with_indent(&mut self, body: impl FnOnce(&mut CodeWriter)) {
        self.indent += 1;
        body(self);
        self.indent -= 1;
    }

    #[must_use]
    pub fn finish(self) -> String {
        self.buf
    }
}

impl Default for CodeWriter {
    fn default() -> Self {
        Self::new()
    }
}

/// Shared state for one emission batch.
pub struct EmitContext<'a> {
    pub graph: &'a NinoGraph,
    pub config: &'a GeneratorConfig,
    /// The generated namespace artifacts live in.
    pub namespace: String,
}

/// How a value of a given shape is encoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodecKind {
    /// Fixed-size raw-byte value (primitives, enums, unmanaged structs).
    Unmanaged,
    /// Length-prefixed UTF-16 string.
    String,
    /// A participating user type (direct or cross-assembly codec).
    User,
    /// A structurally-derived helper shape from the builtin catalogue.
    Builtin,
}

/// Classify a shape, or fail when no codec can serve it.
pub fn classify(ty: &TypeInfo, graph: &NinoGraph) -> Option<CodecKind> {
    if ty.is_unmanaged {
        return Some(CodecKind::Unmanaged);
    }
    if ty.is_string() {
        return Some(CodecKind::String);
    }
    if graph.get(ty.type_id).is_some() {
        return Some(CodecKind::User);
    }
    if builtins::catalogue().iter().any(|g| (g.matches)(ty)) {
        return Some(CodecKind::Builtin);
    }
    None
}

/// Verify that `ty` and every shape it transitively contains has a codec.
pub fn ensure_resolvable(
    owner: &str,
    member: &str,
    ty: &TypeInfo,
    graph: &NinoGraph,
) -> GenResult<()> {
    let Some(kind) = classify(ty, graph) else {
        return Err(GenError::MissingCodec {
            ty: owner.to_owned(),
            member: member.to_owned(),
            member_ty: ty.display_name.clone(),
        });
    };
    // User types were validated when they were extracted; builtin shapes
    // must be checked leaf-wise.
    if kind == CodecKind::Builtin {
        for child in ty.children() {
            ensure_resolvable(owner, member, child, graph)?;
        }
    }
    Ok(())
}

/// Mangle a display name into an identifier-safe constant name,
/// e.g. `Game.A` → `Game_A`.
#[must_use]
pub fn const_name(ty: &TypeInfo) -> String {
    ty.display_name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

/// Render the single-statement write call for a value expression.
///
/// `member` carries the member-level utf8 and custom-formatter markers;
/// element positions inside builtin shapes pass `None`.
pub fn write_call(
    ty: &TypeInfo,
    expr: &str,
    member: Option<&NinoMember>,
    graph: &NinoGraph,
) -> String {
    if let Some(formatter) = member.and_then(|m| m.custom_formatter.as_ref()) {
        return format!("{}.Serialize({expr}, ref writer);", formatter.display_name);
    }
    if let Some(user) = graph.get(ty.type_id) {
        if let Some(custom) = &user.custom_serializer {
            return format!("{custom}.Serialize({expr}, ref writer);");
        }
    }
    if member.is_some_and(|m| m.is_utf8_string) && ty.is_string() {
        return format!("writer.WriteUtf8({expr});");
    }
    if ty.is_unmanaged || ty.is_string() {
        return format!("writer.Write({expr});");
    }
    format!("Serialize({expr}, ref writer);")
}

/// Render the single-statement read call declaring `var`.
pub fn read_call(
    ty: &TypeInfo,
    var: &str,
    member: Option<&NinoMember>,
    graph: &NinoGraph,
) -> String {
    let cs = &ty.display_name;
    if let Some(formatter) = member.and_then(|m| m.custom_formatter.as_ref()) {
        return format!(
            "{}.Deserialize(out {cs} {var}, ref reader);",
            formatter.display_name
        );
    }
    if let Some(user) = graph.get(ty.type_id) {
        if let Some(custom) = &user.custom_deserializer {
            return format!("{custom}.Deserialize(out {cs} {var}, ref reader);");
        }
    }
    if member.is_some_and(|m| m.is_utf8_string) && ty.is_string() {
        return format!("reader.ReadUtf8(out {cs} {var});");
    }
    if ty.is_unmanaged || ty.is_string() {
        return format!("reader.Read(out {cs} {var});");
    }
    format!("Deserialize(out {cs} {var}, ref reader);")
}

/// Standard artifact prologue: header comment, usings, namespace open.
pub fn artifact_prologue(w: &mut CodeWriter, namespace: &str) {
    w.line("// <auto-generated/>");
    w.line("// Produced by the Nino code generator. Any edits will be overwritten.");
    w.line("using System;");
    w.line("using System.Runtime.CompilerServices;");
    w.line("using System.Runtime.InteropServices;");
    w.line("using Nino.Core;");
    w.blank();
    w.line(&format!("namespace {namespace}"));
    w.open();
}

pub fn artifact_epilogue(w: &mut CodeWriter) {
    w.close();
}
