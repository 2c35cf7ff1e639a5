//! A guest module instantiated under wasmi with the wasm-pass host surface.

use tracing::debug;
use wasmi::{Engine, Instance, Linker, Memory, Module, Store, WasmParams, WasmResults};
use wasmpass_types::{LayoutChecksum, Schema, Slice, WasmType};

use crate::allocator::Allocator;
use crate::imports::link_default_imports;
use crate::layout::{embedded_checksum, verify};
use crate::{GuestConfig, HostError, HostResult, HostState};

/// Collects imports and layout expectations before instantiating a guest.
pub struct GuestBuilder<T> {
    engine: Engine,
    linker: Linker<HostState<T>>,
    config: GuestConfig,
    expected: Option<LayoutChecksum>,
}

impl<T: 'static> GuestBuilder<T> {
    /// Create a builder with the default imports already linked.
    pub fn new(config: GuestConfig) -> HostResult<Self> {
        let engine = Engine::default();
        let mut linker = Linker::new(&engine);
        link_default_imports(&mut linker, &config.import_module)?;
        Ok(Self {
            engine,
            linker,
            config,
            expected: None,
        })
    }

    /// Linker for application-specific imports.
    pub fn linker_mut(&mut self) -> &mut Linker<HostState<T>> {
        &mut self.linker
    }

    pub fn config(&self) -> &GuestConfig {
        &self.config
    }

    /// Require the guest to embed the checksum of `schema`.
    pub fn expect_layout(self, schema: &Schema) -> Self {
        self.expect_checksum(schema.checksum())
    }

    pub fn expect_checksum(mut self, checksum: LayoutChecksum) -> Self {
        self.expected = Some(checksum);
        self
    }

    /// Verify the layout, instantiate, run the start function and resolve
    /// the memory and allocator exports.
    pub fn instantiate(self, wasm: &[u8]) -> HostResult<Guest<T>> {
        let embedded = embedded_checksum(wasm, &self.config.layout_section)?;
        verify(self.expected, embedded, self.config.require_layout)?;

        let module = Module::new(&self.engine, wasm)?;
        let mut store = Store::new(
            &self.engine,
            HostState::new(
                self.config.memory_export.clone(),
                self.config.guest_log_limit,
            ),
        );
        let instance = self
            .linker
            .instantiate(&mut store, &module)?
            .start(&mut store)?;

        let memory = instance
            .get_memory(&store, &self.config.memory_export)
            .ok_or_else(|| HostError::MissingExport(self.config.memory_export.clone()))?;
        let allocator = Allocator::new(&store, &instance, &self.config)?;
        store.data_mut().set_allocator(allocator.clone());

        debug!(
            pages = memory.size(&store),
            layout = ?embedded,
            "guest instantiated"
        );
        Ok(Guest {
            store,
            instance,
            memory,
            allocator,
            config: self.config,
            layout: embedded,
        })
    }
}

/// A running guest: its store, memory and allocator.
///
/// Memory is re-borrowed from the store on every access, so growth during
/// a guest call is always observed.
pub struct Guest<T> {
    store: Store<HostState<T>>,
    instance: Instance,
    memory: Memory,
    allocator: Allocator,
    config: GuestConfig,
    layout: Option<LayoutChecksum>,
}

impl<T: 'static> Guest<T> {
    /// Call the guest's `init` export if it has one.
    pub fn init(&mut self) -> HostResult<()> {
        let name = self.config.init_export.clone();
        if self.instance.get_func(&self.store, &name).is_none() {
            debug!(export = %name, "no init export");
            return Ok(());
        }
        self.call(&name, ())
    }

    /// Call an exported function with typed parameters and results.
    pub fn call<P: WasmParams, R: WasmResults>(&mut self, name: &str, params: P) -> HostResult<R> {
        let func = self
            .instance
            .get_func(&self.store, name)
            .ok_or_else(|| HostError::MissingExport(name.to_string()))?;
        let typed = func.typed::<P, R>(&self.store)?;
        Ok(typed.call(&mut self.store, params)?)
    }

    /// Decode a `V` at `offset`.
    pub fn decode<V: WasmType>(&self, offset: u32) -> HostResult<V> {
        Ok(V::decode(self.memory(), offset)?)
    }

    /// Encode `value` at `offset`.
    pub fn encode<V: WasmType>(&mut self, offset: u32, value: &V) -> HostResult<()> {
        Ok(value.encode(self.memory_mut(), offset)?)
    }

    /// Allocate a guest slice of `length` elements.
    pub fn alloc<V: WasmType>(&mut self, length: u32) -> HostResult<Slice<V>> {
        self.allocator.alloc(&mut self.store, length)
    }

    /// Release a slice obtained from [`Guest::alloc`].
    pub fn free<V: WasmType>(&mut self, slice: Slice<V>) -> HostResult<()> {
        self.allocator.free(&mut self.store, slice)
    }

    /// Allocate a byte slice holding a copy of `data`.
    pub fn alloc_bytes(&mut self, data: &[u8]) -> HostResult<Slice<u8>> {
        self.allocator.alloc_copy(&mut self.store, self.memory, data)
    }

    pub fn slice_get<V: WasmType>(&self, slice: &Slice<V>, index: u32) -> HostResult<V> {
        Ok(slice.get(self.memory(), index)?)
    }

    pub fn slice_set<V: WasmType>(&mut self, slice: &Slice<V>, index: u32, value: &V) -> HostResult<()> {
        Ok(slice.set(self.memory_mut(), index, value)?)
    }

    /// Current contents of linear memory.
    pub fn memory(&self) -> &[u8] {
        self.memory.data(&self.store)
    }

    pub fn memory_mut(&mut self) -> &mut [u8] {
        self.memory.data_mut(&mut self.store)
    }

    pub fn allocator(&self) -> &Allocator {
        &self.allocator
    }

    /// Checksum embedded in the module, if any.
    pub fn layout_checksum(&self) -> Option<LayoutChecksum> {
        self.layout
    }

    pub fn state(&self) -> &HostState<T> {
        self.store.data()
    }

    pub fn state_mut(&mut self) -> &mut HostState<T> {
        self.store.data_mut()
    }

    pub fn store_mut(&mut self) -> &mut Store<HostState<T>> {
        &mut self.store
    }
}
