//! The driver: one orchestrator from host compilation to artifact batch.
//!
//! Each type's emission is isolated: an unresolvable member codec skips
//! that type with a diagnostic, an internal emission failure produces a
//! warning diagnostic plus a comment-only stub artifact, and the batch
//! always continues.
use {
    crate::{
        cancel::{CancellationToken, Cancelled},
        diagnostics::{codes, Diagnostic},
        emit::{
            builtins::{collect_shapes, emit_builtins_artifact},
            const_name, ensure_resolvable,
            user::{emit_registration, emit_user_type},
            CodeWriter, EmitContext,
        },
        extract::extract_all,
        graph::NinoGraph,
        symbols::{generated_namespace, HostCompilation},
        GenError,
    },
    nino_wire::TypeId,
    rustc_hash::FxHashSet,
    tracing::{debug, warn},
};

/// Compile-time switches of the generator.
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    /// Frame every managed member write with a back-patched 4-byte length
    /// so decoders can skip unknown trailing members or default missing
    /// ones.
    pub weak_version_tolerance: bool,
    /// Host runtime supports `UnsafeAccessor` extern shims; otherwise
    /// non-public members go through partial-class back-door properties.
    pub unsafe_accessors: bool,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            weak_version_tolerance: false,
            unsafe_accessors: true,
        }
    }
}

/// One emitted source-text artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub file_name: String,
    pub text: String,
}

/// The result of one generation batch.
#[derive(Debug, Default)]
pub struct Output {
    pub artifacts: Vec<Artifact>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Run the full pipeline: extraction, graph build, emission.
pub fn generate(
    host: &HostCompilation,
    config: &GeneratorConfig,
    token: &CancellationToken,
) -> Result<Output, Cancelled> {
    let types = extract_all(host, token)?;
    debug!(assembly = %host.assembly, count = types.len(), "extracted nino types");
    let graph = NinoGraph::build(types);
    token.check()?;
    Ok(generate_from_graph(&graph, host, config))
}

/// Emission half of the pipeline, for callers that already hold a graph.
pub fn generate_from_graph(
    graph: &NinoGraph,
    host: &HostCompilation,
    config: &GeneratorConfig,
) -> Output {
    let ctx = EmitContext {
        graph,
        config,
        namespace: generated_namespace(&host.assembly),
    };
    let mut output = Output::default();
    let mut skipped: FxHashSet<TypeId> = FxHashSet::default();

    for t in graph.types() {
        // Cross-assembly codecs already exist; route to them, never
        // re-emit.
        if t.custom_serializer.is_some() {
            debug!(ty = %t.info.display_name, "using cross-assembly codec");
            skipped.insert(t.type_id());
            continue;
        }
        let file_name = format!("NinoSerializer.{}.g.cs", const_name(&t.info));
        match emit_user_type(t, &ctx) {
            Ok(text) => {
                debug!(ty = %t.info.display_name, file = %file_name, "emitted");
                output.artifacts.push(Artifact { file_name, text });
            }
            Err(GenError::MissingCodec {
                ty,
                member,
                member_ty,
            }) => {
                warn!(ty = %ty, member = %member, "no resolvable codec; skipping type");
                output.diagnostics.push(Diagnostic::warning(
                    codes::MISSING_MEMBER,
                    format!("{ty}.{member}"),
                    format!("Member type `{member_ty}` has no resolvable codec; `{ty}` was skipped"),
                ));
                skipped.insert(t.type_id());
            }
            Err(err) => {
                warn!(ty = %t.info.display_name, error = %err, "emission failed");
                output.diagnostics.push(Diagnostic::warning(
                    codes::EMISSION_FAILURE,
                    t.info.display_name.clone(),
                    err.to_string(),
                ));
                output.artifacts.push(stub_artifact(file_name, t, &err));
            }
        }
    }

    let shapes: Vec<_> = collect_shapes(graph)
        .into_iter()
        .filter(|shape| ensure_resolvable("<builtins>", "<element>", shape, graph).is_ok())
        .collect();
    if !shapes.is_empty() {
        output.artifacts.push(Artifact {
            file_name: "NinoSerializer.Builtins.g.cs".to_owned(),
            text: emit_builtins_artifact(&shapes, &ctx),
        });
    }

    output.artifacts.push(const_artifact(graph, &ctx));
    output
        .artifacts
        .push(registration_artifact(graph, host, &ctx, &skipped));
    output
}

fn stub_artifact(file_name: String, t: &crate::model::NinoType, err: &GenError) -> Artifact {
    let mut w = CodeWriter::new();
    w.line("// <auto-generated/>");
    w.line(&format!(
        "// Emission failed for {}; this artifact is intentionally comment-only.",
        t.info.display_name
    ));
    w.line(&format!("// {err}"));
    Artifact {
        file_name,
        text: w.finish(),
    }
}

/// The stable 32-bit id of every participating type, as compile-time
/// constants the emitted dispatch code switches over.
fn const_artifact(graph: &NinoGraph, ctx: &EmitContext<'_>) -> Artifact {
    let mut w = CodeWriter::new();
    crate::emit::artifact_prologue(&mut w, &ctx.namespace);
    w.line("public static partial class NinoTypeConst");
    w.open();
    w.line("public const int Null = 0;");
    w.line("public const int NullCollection = unchecked((int)0x80000000);");
    for t in graph.types() {
        w.line(&format!(
            "public const int {} = unchecked((int)0x{:08X});",
            const_name(&t.info),
            t.type_id().raw() as u32
        ));
    }
    w.close();
    crate::emit::artifact_epilogue(&mut w);
    Artifact {
        file_name: "NinoTypeConst.g.cs".to_owned(),
        text: w.finish(),
    }
}

/// The per-namespace `Init()` entrypoint: idempotent under a lock, marked
/// as a module initializer, with an extra scene-load hook on game-engine
/// hosts. One registrar per emitted type.
fn registration_artifact(
    graph: &NinoGraph,
    host: &HostCompilation,
    ctx: &EmitContext<'_>,
    skipped: &FxHashSet<TypeId>,
) -> Artifact {
    let mut w = CodeWriter::new();
    crate::emit::artifact_prologue(&mut w, &ctx.namespace);
    w.line("public static partial class NinoGen");
    w.open();
    w.line("private static readonly object __gate = new object();");
    w.line("private static bool __initialized;");
    w.blank();
    w.line("[ModuleInitializer]");
    w.line("public static void Init()");
    w.open();
    w.line("lock (__gate)");
    w.open();
    w.line("if (__initialized)");
    w.open();
    w.line("return;");
    w.close();
    w.line("__initialized = true;");
    for t in graph.types() {
        if skipped.contains(&t.type_id()) {
            continue;
        }
        w.line(&format!("Register_{}();", const_name(&t.info)));
    }
    w.close();
    w.close();
    w.blank();

    if host.is_host_game_runtime {
        w.line("[RuntimeInitializeOnLoadMethod(RuntimeInitializeLoadType.AfterSceneLoad)]");
        w.line("private static void InitOnSceneLoad()");
        w.open();
        w.line("Init();");
        w.close();
        w.blank();
    }

    for t in graph.types() {
        if skipped.contains(&t.type_id()) {
            continue;
        }
        emit_registration(&mut w, t, ctx);
        w.blank();
    }
    w.close();
    crate::emit::artifact_epilogue(&mut w);
    Artifact {
        file_name: "NinoGen.Registration.g.cs".to_owned(),
        text: w.finish(),
    }
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::symbols::{AttrSymbol, MemberSymbol, SpecialType, TypeSymbol},
        std::sync::Arc,
    };

    fn point() -> TypeSymbol {
        TypeSymbol::strukt("Point", "Demo", "Demo.Core")
            .with_attr(AttrSymbol::nino_type())
            .with_members(vec![
                MemberSymbol::field("X", Arc::new(TypeSymbol::int())),
                MemberSymbol::field("Y", Arc::new(TypeSymbol::int())),
            ])
    }

    fn run(host: &HostCompilation, config: &GeneratorConfig) -> Output {
        generate(host, config, &CancellationToken::new()).unwrap()
    }

    #[test]
    fn batch_produces_type_const_and_registration_artifacts() {
        let host = HostCompilation::new("Demo.Core").with_types(vec![Arc::new(point())]);
        let output = run(&host, &GeneratorConfig::default());

        let names: Vec<_> = output
            .artifacts
            .iter()
            .map(|a| a.file_name.as_str())
            .collect();
        assert!(names.contains(&"NinoSerializer.Demo_Point.g.cs"));
        assert!(names.contains(&"NinoTypeConst.g.cs"));
        assert!(names.contains(&"NinoGen.Registration.g.cs"));
        assert!(output.diagnostics.is_empty());

        let consts = output
            .artifacts
            .iter()
            .find(|a| a.file_name == "NinoTypeConst.g.cs")
            .unwrap();
        let expected = format!(
            "public const int Demo_Point = unchecked((int)0x{:08X});",
            TypeId::of("Demo.Point").raw() as u32
        );
        assert!(consts.text.contains(&expected));
        assert!(consts.text.contains("public const int Null = 0;"));

        let registration = output
            .artifacts
            .iter()
            .find(|a| a.file_name == "NinoGen.Registration.g.cs")
            .unwrap();
        assert!(registration.text.contains("[ModuleInitializer]"));
        assert!(registration.text.contains("lock (__gate)"));
        assert!(registration.text.contains("Register_Demo_Point();"));
        assert!(!registration.text.contains("RuntimeInitializeOnLoadMethod"));
    }

    #[test]
    fn member_collections_produce_the_builtins_artifact() {
        let list = TypeSymbol::generic(
            "System.Collections.Generic.List<T>",
            vec![Arc::new(TypeSymbol::int())],
            "System.Collections",
        );
        let holder = TypeSymbol::class("Holder", "Demo", "Demo.Core")
            .with_attr(AttrSymbol::nino_type())
            .with_members(vec![MemberSymbol::field("Items", Arc::new(list))]);
        let host = HostCompilation::new("Demo.Core").with_types(vec![Arc::new(holder)]);
        let output = run(&host, &GeneratorConfig::default());
        let builtins = output
            .artifacts
            .iter()
            .find(|a| a.file_name == "NinoSerializer.Builtins.g.cs")
            .unwrap();
        assert!(builtins
            .text
            .contains("this System.Collections.Generic.List<int> value"));
    }

    #[test]
    fn unresolvable_member_skips_the_type_with_a_diagnostic() {
        let mut object_symbol = TypeSymbol::class("Object", "System", "System.Runtime");
        object_symbol.special = SpecialType::Object;
        let bad = TypeSymbol::class("Bad", "Demo", "Demo.Core")
            .with_attr(AttrSymbol::nino_type())
            .with_members(vec![MemberSymbol::field(
                "Anything",
                Arc::new(object_symbol),
            )]);
        let host =
            HostCompilation::new("Demo.Core").with_types(vec![Arc::new(bad), Arc::new(point())]);
        let output = run(&host, &GeneratorConfig::default());

        assert_eq!(output.diagnostics.len(), 1);
        let diagnostic = &output.diagnostics[0];
        assert_eq!(diagnostic.code, codes::MISSING_MEMBER);
        assert_eq!(diagnostic.location, "Demo.Bad.Anything");

        // The bad type has no artifact and no registrar; the good one has
        // both.
        assert!(!output
            .artifacts
            .iter()
            .any(|a| a.file_name.contains("Demo_Bad")));
        let registration = output
            .artifacts
            .iter()
            .find(|a| a.file_name == "NinoGen.Registration.g.cs")
            .unwrap();
        assert!(!registration.text.contains("Register_Demo_Bad"));
        assert!(registration.text.contains("Register_Demo_Point();"));
    }

    #[test]
    fn game_runtime_hosts_get_the_scene_load_hook() {
        let mut host = HostCompilation::new("Demo.Core").with_types(vec![Arc::new(point())]);
        host.is_host_game_runtime = true;
        let output = run(&host, &GeneratorConfig::default());
        let registration = output
            .artifacts
            .iter()
            .find(|a| a.file_name == "NinoGen.Registration.g.cs")
            .unwrap();
        assert!(registration
            .text
            .contains("[RuntimeInitializeOnLoadMethod(RuntimeInitializeLoadType.AfterSceneLoad)]"));
    }

    #[test]
    fn weak_version_tolerance_reaches_emitted_members() {
        let holder = TypeSymbol::class("Note", "Demo", "Demo.Core")
            .with_attr(AttrSymbol::nino_type())
            .with_members(vec![MemberSymbol::field(
                "Text",
                Arc::new(TypeSymbol::string()),
            )]);
        let host = HostCompilation::new("Demo.Core").with_types(vec![Arc::new(holder)]);
        let config = GeneratorConfig {
            weak_version_tolerance: true,
            ..GeneratorConfig::default()
        };
        let output = run(&host, &config);
        let artifact = output
            .artifacts
            .iter()
            .find(|a| a.file_name == "NinoSerializer.Demo_Note.g.cs")
            .unwrap();
        assert!(artifact.text.contains("writer.ReserveFrame();"));
        assert!(artifact.text.contains("if (reader.Eof)"));
    }

    #[test]
    fn cancellation_discards_the_batch() {
        let host = HostCompilation::new("Demo.Core").with_types(vec![Arc::new(point())]);
        let token = CancellationToken::new();
        token.cancel();
        assert!(generate(&host, &GeneratorConfig::default(), &token).is_err());
    }

    #[test]
    fn cross_assembly_types_are_not_re_emitted() {
        let mut host = HostCompilation::new("Demo.Core");
        host.referenced_generated.insert("Demo.Shared".to_owned());
        let foreign = TypeSymbol::class("Item", "Demo", "Demo.Shared").with_attr(AttrSymbol::nino_type());
        host.types = vec![Arc::new(foreign), Arc::new(point())];
        let output = run(&host, &GeneratorConfig::default());
        assert!(!output
            .artifacts
            .iter()
            .any(|a| a.file_name.contains("Demo_Item")));
        let registration = output
            .artifacts
            .iter()
            .find(|a| a.file_name == "NinoGen.Registration.g.cs")
            .unwrap();
        assert!(!registration.text.contains("Register_Demo_Item"));
    }
}
