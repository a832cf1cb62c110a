//! Nino's compile-time code generator.
//!
//! Given a set of user-annotated aggregate types, the generator produces
//! specialized, inlineable, zero-reflection encode/decode routines over the
//! compact binary wire format implemented by `nino-wire`.
//!
//! The pipeline is a strict one-way dataflow:
//!
//! 1. **Metadata projection** ([`project`]): reads one type from the host
//!    metadata model and returns an immutable, value-equatable [`TypeInfo`]
//!    record. This is the only stage that touches host metadata.
//! 2. **Entity extraction** ([`extract`]): projects each annotated type's
//!    members, constructors, parent ids and codec hints into a
//!    [`NinoType`] record.
//! 3. **Graph building** ([`graph`]): merges the records into a directed
//!    base→derived hierarchy, detects cycles, and classifies every node.
//! 4. **Emission** ([`emit`], [`driver`]): for every graph node and every
//!    structurally-derived helper shape, emits a serializer/deserializer
//!    pair plus registration glue, as host-language source-text artifacts.
//!
//! Everything downstream of projection consumes only value records, so the
//! host can cache the whole pipeline on input equality: when only unrelated
//! code changes, no stage re-runs.
//!
//! ```
//! use {
//!     nino_gen::{
//!         cancel::CancellationToken,
//!         driver::{self, GeneratorConfig},
//!         symbols::{HostCompilation, TypeSymbol},
//!     },
//!     std::sync::Arc,
//! };
//!
//! let mut point = TypeSymbol::strukt("Point", "Demo", "Demo.Core");
//! point.members.push(nino_gen::symbols::MemberSymbol::field(
//!     "X",
//!     Arc::new(TypeSymbol::int()),
//! ));
//! point.attributes.push(nino_gen::symbols::AttrSymbol::nino_type());
//!
//! let host = HostCompilation::new("Demo.Core").with_types(vec![Arc::new(point)]);
//! let output = driver::generate(
//!     &host,
//!     &GeneratorConfig::default(),
//!     &CancellationToken::new(),
//! )
//! .unwrap();
//! assert!(output.artifacts.iter().any(|a| a.file_name.contains("Point")));
//! ```

pub mod cancel;
pub mod diagnostics;
pub mod driver;
pub mod emit;
pub mod extract;
pub mod graph;
pub mod info;
pub mod model;
pub mod project;
pub mod symbols;

pub use {
    graph::NinoGraph,
    info::TypeInfo,
    model::{ConstructorInfo, NinoMember, NinoType},
};

use thiserror::Error;

/// Internal emission failure. Surfaces as a warning diagnostic plus a
/// comment-only stub artifact; the batch continues with other types.
#[derive(Error, Debug)]
pub enum GenError {
    #[error("No resolvable codec for member `{member}` of type `{ty}` (member type `{member_ty}`)")]
    MissingCodec {
        ty: String,
        member: String,
        member_ty: String,
    },
    #[error("No usable constructor on `{0}`")]
    NoConstructor(String),
    #[error("Emission invariant violated: {0}")]
    Invariant(String),
}

pub type GenResult<T> = core::result::Result<T, GenError>;
