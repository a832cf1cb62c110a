//! The runtime dispatch table generated code installs itself into.
//!
//! The table is the only polymorphic device emitted code needs: a mapping
//! from `(declared type, runtime type id)` to encode/decode function
//! pointers. No virtual methods are involved. A polymorphic serializer
//! looks up the value's runtime id, writes it as the wire prefix, and calls
//! the concrete writer; the matching deserializer reads the prefix back and
//! dispatches the same way.
//!
//! Registration is driven by generated per-namespace `Init()` entrypoints.
//! Those may run any number of times from any threads; the table after N
//! calls equals the table after one. A single mutex guards mutation, and
//! after initialization the table is effectively read-only for the life of
//! the process.
//!
//! Sub-type recording is emitted inside the *base* type's registrar. A
//! derived type living in a different assembly therefore cannot be
//! dispatched at its base until that assembly's own `Init()` has run; this
//! is accepted behavior, not something the table tries to repair.
use {
    crate::{
        error::{unknown_type_id, ReadError, ReadResult, WriteError, WriteResult},
        id::TypeId,
        io::{Reader, Writer},
    },
    core::any::Any,
    parking_lot::Mutex,
    rustc_hash::{FxHashMap, FxHashSet},
    std::sync::OnceLock,
};

/// Writes a value's members (no type-id prefix; the dispatcher writes it).
pub type SerializeFn = fn(&dyn Any, &mut Writer) -> WriteResult<()>;
/// Reads a value's members and returns the boxed concrete value.
pub type DeserializeFn = for<'a> fn(&mut Reader<'a>) -> ReadResult<Box<dyn Any>>;

#[derive(Clone, Copy)]
struct Entry {
    serialize: SerializeFn,
    deserialize: DeserializeFn,
}

#[derive(Default)]
struct State {
    entries: FxHashMap<TypeId, Entry>,
    runtime_ids: FxHashMap<core::any::TypeId, TypeId>,
    sub_types: FxHashMap<TypeId, Vec<TypeId>>,
    initialized: FxHashSet<&'static str>,
}

/// Mutation surface handed to a registration closure by
/// [`Registry::run_init`].
pub struct Registration<'a> {
    state: &'a mut State,
}

impl Registration<'_> {
    /// Install the codec pair for `T` under its stable wire id.
    ///
    /// Re-registering an already-known id is a no-op, which is what makes
    /// repeated `Init()` calls idempotent.
    pub fn register<T: Any>(&mut self, id: TypeId, serialize: SerializeFn, deserialize: DeserializeFn) {
        self.state
            .entries
            .entry(id)
            .or_insert(Entry { serialize, deserialize });
        self.state
            .runtime_ids
            .entry(core::any::TypeId::of::<T>())
            .or_insert(id);
    }

    /// Record `child` as a dispatchable sub-type of `parent`.
    pub fn record_sub_type(&mut self, parent: TypeId, child: TypeId) {
        let children = self.state.sub_types.entry(parent).or_default();
        if !children.contains(&child) {
            children.push(child);
        }
    }
}

/// The dispatch table. Most callers use the process-wide
/// [`Registry::global`]; tests construct private instances.
pub struct Registry {
    state: Mutex<State>,
}

impl Registry {
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State::default()),
        }
    }

    /// The process-wide table generated module initializers target.
    pub fn global() -> &'static Registry {
        static GLOBAL: OnceLock<Registry> = OnceLock::new();
        GLOBAL.get_or_init(Registry::new)
    }

    /// Run a namespace's registration body exactly once.
    ///
    /// Subsequent calls for the same namespace return without invoking the
    /// closure. Safe to call concurrently from any number of threads.
    pub fn run_init(&self, namespace: &'static str, body: impl FnOnce(&mut Registration<'_>)) {
        let mut state = self.state.lock();
        if !state.initialized.insert(namespace) {
            return;
        }
        body(&mut Registration { state: &mut state });
    }

    /// Number of installed codec entries. Registration idempotence is
    /// observable through this.
    #[must_use]
    pub fn entry_count(&self) -> usize {
        self.state.lock().entries.len()
    }

    /// Installed wire ids in sorted order, for table-equality assertions.
    #[must_use]
    pub fn registered_ids(&self) -> Vec<TypeId> {
        let mut ids: Vec<TypeId> = self.state.lock().entries.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    fn lookup(&self, id: TypeId) -> Option<Entry> {
        self.state.lock().entries.get(&id).copied()
    }

    fn runtime_id(&self, value: &dyn Any) -> Option<TypeId> {
        self.state.lock().runtime_ids.get(&value.type_id()).copied()
    }

    fn is_dispatchable(&self, declared: TypeId, id: TypeId) -> bool {
        if declared == id {
            return true;
        }
        let state = self.state.lock();
        state
            .sub_types
            .get(&declared)
            .is_some_and(|children| children.contains(&id))
    }

    /// Encode a polymorphic value at a declared static type: a 32-bit
    /// type-id prefix followed by the concrete type's members. `None`
    /// writes only the null sentinel.
    pub fn serialize_polymorphic(
        &self,
        declared: TypeId,
        value: Option<&dyn Any>,
        writer: &mut Writer,
    ) -> WriteResult<()> {
        let Some(value) = value else {
            writer.write_type_id(TypeId::NULL);
            return Ok(());
        };
        let id = self.runtime_id(value).ok_or(WriteError::NotRegistered)?;
        if !self.is_dispatchable(declared, id) {
            return Err(WriteError::UnknownSubType {
                declared: declared.raw(),
                child: id.raw(),
            });
        }
        // Copy the entry out before calling: the codec may re-enter the
        // registry for nested polymorphic members.
        let entry = self.lookup(id).ok_or(WriteError::NotRegistered)?;
        writer.write_type_id(id);
        (entry.serialize)(value, writer)
    }

    /// Decode a polymorphic value at a declared static type. The null
    /// sentinel yields `None`; an id that is neither the declared type nor
    /// a recorded sub-type fails as an invalid payload.
    pub fn deserialize_polymorphic(
        &self,
        declared: TypeId,
        reader: &mut Reader<'_>,
    ) -> ReadResult<Option<Box<dyn Any>>> {
        let id = reader.read_type_id()?;
        if id.is_null() {
            return Ok(None);
        }
        if !self.is_dispatchable(declared, id) {
            return Err(unknown_type_id(id.raw()));
        }
        let entry = self
            .lookup(id)
            .ok_or(ReadError::NotRegistered(id.raw()))?;
        (entry.deserialize)(reader).map(Some)
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use {super::*, std::sync::Arc, std::thread};

    // Conformance fixtures mirroring the shape of generated code for the
    // hierarchy `A { a: i32 }` ⇐ `B : A { b: string }` ⇐ `C : B { c: bool }`.
    #[derive(Debug, Clone, PartialEq)]
    struct A {
        a: i32,
    }
    #[derive(Debug, Clone, PartialEq)]
    struct B {
        a: i32,
        b: String,
    }
    #[derive(Debug, Clone, PartialEq)]
    struct C {
        a: i32,
        b: String,
        c: bool,
    }

    fn id_a() -> TypeId {
        TypeId::of("Game.A")
    }
    fn id_b() -> TypeId {
        TypeId::of("Game.B")
    }
    fn id_c() -> TypeId {
        TypeId::of("Game.C")
    }

    fn write_a(value: &dyn Any, writer: &mut Writer) -> WriteResult<()> {
        let value = value.downcast_ref::<A>().expect("registered for A");
        writer.write_unmanaged(&value.a);
        Ok(())
    }
    fn read_a(reader: &mut Reader<'_>) -> ReadResult<Box<dyn Any>> {
        Ok(Box::new(A {
            a: reader.read_unmanaged()?,
        }))
    }
    fn write_b(value: &dyn Any, writer: &mut Writer) -> WriteResult<()> {
        let value = value.downcast_ref::<B>().expect("registered for B");
        writer.write_unmanaged(&value.a);
        writer.write_str_utf8(Some(&value.b))?;
        Ok(())
    }
    fn read_b(reader: &mut Reader<'_>) -> ReadResult<Box<dyn Any>> {
        Ok(Box::new(B {
            a: reader.read_unmanaged()?,
            b: reader.read_str_utf8()?.unwrap_or_default(),
        }))
    }
    fn write_c(value: &dyn Any, writer: &mut Writer) -> WriteResult<()> {
        let value = value.downcast_ref::<C>().expect("registered for C");
        writer.write_unmanaged(&value.a);
        writer.write_str_utf8(Some(&value.b))?;
        writer.write_bool(value.c);
        Ok(())
    }
    fn read_c(reader: &mut Reader<'_>) -> ReadResult<Box<dyn Any>> {
        Ok(Box::new(C {
            a: reader.read_unmanaged()?,
            b: reader.read_str_utf8()?.unwrap_or_default(),
            c: reader.read_bool()?,
        }))
    }

    fn init_hierarchy(registry: &Registry) {
        registry.run_init("Game", |reg| {
            reg.register::<A>(id_a(), write_a, read_a);
            reg.register::<B>(id_b(), write_b, read_b);
            reg.register::<C>(id_c(), write_c, read_c);
            reg.record_sub_type(id_a(), id_b());
            reg.record_sub_type(id_a(), id_c());
            reg.record_sub_type(id_b(), id_c());
        });
    }

    #[test]
    fn encoding_at_base_keeps_runtime_type() {
        let registry = Registry::new();
        init_hierarchy(&registry);

        let value = C {
            a: 7,
            b: "x".into(),
            c: true,
        };
        let mut writer = Writer::new();
        registry
            .serialize_polymorphic(id_a(), Some(&value), &mut writer)
            .unwrap();

        // [TypeId(C)][7][len=1 "x"][true]
        let bytes = writer.into_bytes();
        assert_eq!(&bytes[..4], &id_c().raw().to_ne_bytes());
        assert_eq!(&bytes[4..8], &7i32.to_ne_bytes());
        assert_eq!(&bytes[8..12], &1u32.to_ne_bytes());
        assert_eq!(bytes[12], b'x');
        assert_eq!(bytes[13], 1);

        let mut reader = Reader::new(&bytes);
        let decoded = registry
            .deserialize_polymorphic(id_a(), &mut reader)
            .unwrap()
            .expect("non-null");
        assert_eq!(decoded.downcast_ref::<C>(), Some(&value));
    }

    #[test]
    fn null_reference_writes_only_the_sentinel() {
        let registry = Registry::new();
        init_hierarchy(&registry);

        let mut writer = Writer::new();
        registry
            .serialize_polymorphic(id_a(), None, &mut writer)
            .unwrap();
        assert_eq!(writer.as_bytes(), &0i32.to_ne_bytes()[..]);

        let bytes = writer.into_bytes();
        let mut reader = Reader::new(&bytes);
        assert!(registry
            .deserialize_polymorphic(id_a(), &mut reader)
            .unwrap()
            .is_none());
    }

    #[test]
    fn unknown_id_is_an_invalid_payload() {
        let registry = Registry::new();
        init_hierarchy(&registry);

        let mut writer = Writer::new();
        writer.write_type_id(TypeId::of("Game.Unknown"));
        let bytes = writer.into_bytes();
        let mut reader = Reader::new(&bytes);
        assert!(matches!(
            registry.deserialize_polymorphic(id_a(), &mut reader),
            Err(ReadError::UnknownTypeId(_))
        ));
    }

    #[test]
    fn sibling_id_is_not_dispatchable_at_unrelated_declared_type() {
        let registry = Registry::new();
        init_hierarchy(&registry);

        // C is a sub-type of B, but B is not a sub-type of C.
        let value = B {
            a: 1,
            b: "y".into(),
        };
        let mut writer = Writer::new();
        assert!(matches!(
            registry.serialize_polymorphic(id_c(), Some(&value), &mut writer),
            Err(WriteError::UnknownSubType { .. })
        ));
    }

    #[test]
    fn init_is_idempotent_across_threads() {
        let registry = Arc::new(Registry::new());
        init_hierarchy(&registry);
        let baseline = registry.registered_ids();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = Arc::clone(&registry);
                thread::spawn(move || init_hierarchy(&registry))
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(registry.registered_ids(), baseline);
        assert_eq!(registry.entry_count(), 3);
    }
}
