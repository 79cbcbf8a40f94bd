//! wasmtime-backed module handle.
//!
//! `WasmModule` speaks the managed-object ABI directly: it calls the runtime exports
//! (`__alloc`, `__retain`, `__release`) and reads or writes linear memory using the layout in
//! `modcheck_abi`.

use std::cell::RefCell;

use modcheck_abi::layout::{self, ARRAY_LENGTH_OFFSET, ARRAY_SIZE, VIEW_BUFFER_OFFSET, VIEW_BYTELENGTH_OFFSET};
use modcheck_abi::layout::{VIEW_DATASTART_OFFSET, VIEW_SIZE};
use modcheck_abi::rtti::{self, TypeInfo};
use modcheck_abi::{ARRAYBUFFER_ID, STRING_ID, encode_utf16, strings};
use wasmtime::{Engine, Instance, Linker, Memory, Module, Store, TypedFunc, Val, ValType};

use super::host::{self, HostState};
use super::{ImportConfig, LoadError};
use crate::runtime::{ManagedRuntime, ModuleExports, Ref, RuntimeError, RuntimeResult, TypeId};

const ALLOC: &str = "__alloc";
const RETAIN: &str = "__retain";
const RELEASE: &str = "__release";
const RTTI_BASE: &str = "__rtti_base";
/// Current name of the argument-count setter, then the pre-0.9 one.
const SET_ARGUMENTS_LENGTH: [&str; 2] = ["__setArgumentsLength", "__setargc"];

struct RuntimeFns {
    alloc: TypedFunc<(i32, i32), i32>,
    retain: TypedFunc<i32, i32>,
    release: TypedFunc<i32, ()>,
    set_arguments_length: Option<TypedFunc<i32, ()>>,
}

/// An instantiated module plus the host state it runs against.
pub struct WasmModule {
    store: RefCell<Store<HostState>>,
    instance: Instance,
    memory: Memory,
    rtti_base: u32,
    runtime: RuntimeFns,
}

impl WasmModule {
    /// Link `module` against the host imports and instantiate it.
    #[tracing::instrument(skip_all)]
    pub fn instantiate(engine: &Engine, module: &Module, config: &ImportConfig) -> Result<Self, LoadError> {
        let mut store = Store::new(engine, HostState::default());
        let mut linker = Linker::new(engine);
        let imported_memory = host::define_imports(&mut linker, &mut store, config)?;
        if config.trap_unknown_imports {
            linker
                .define_unknown_imports_as_traps(module)
                .map_err(|e| LoadError::Instantiate(format!("{e:#}")))?;
        }

        let instance = linker
            .instantiate(&mut store, module)
            .map_err(|e| LoadError::Instantiate(format!("{e:#}")))?;

        let exported_memory = instance.get_memory(&mut store, "memory");
        let memory = exported_memory.unwrap_or(imported_memory);
        store.data_mut().memory = Some(memory);

        let alloc = instance
            .get_typed_func::<(i32, i32), i32>(&mut store, ALLOC)
            .map_err(|_| LoadError::MissingRuntimeExport(ALLOC))?;
        let retain = instance
            .get_typed_func::<i32, i32>(&mut store, RETAIN)
            .map_err(|_| LoadError::MissingRuntimeExport(RETAIN))?;
        let release = instance
            .get_typed_func::<i32, ()>(&mut store, RELEASE)
            .map_err(|_| LoadError::MissingRuntimeExport(RELEASE))?;
        let set_arguments_length = SET_ARGUMENTS_LENGTH
            .iter()
            .find_map(|name| instance.get_typed_func::<i32, ()>(&mut store, name).ok());

        let rtti_base = match instance.get_global(&mut store, RTTI_BASE).map(|g| g.get(&mut store)) {
            Some(Val::I32(base)) => base as u32,
            _ => return Err(LoadError::MissingRuntimeExport(RTTI_BASE)),
        };

        tracing::debug!(
            rtti_base,
            memory_pages = memory.size(&store),
            exported_memory = exported_memory.is_some(),
            "module instantiated"
        );

        Ok(Self {
            store: RefCell::new(store),
            instance,
            memory,
            rtti_base,
            runtime: RuntimeFns {
                alloc,
                retain,
                release,
                set_arguments_length,
            },
        })
    }

    /// Messages the module sent through `trace`, oldest first.
    pub fn traces(&self) -> Vec<String> {
        self.store.borrow().data().traces.clone()
    }

    /// Map a failed call to an abort (if the module called `abort`) or a plain trap.
    fn trap(&self, export: &str, error: wasmtime::Error) -> RuntimeError {
        match self.store.borrow_mut().data_mut().abort.take() {
            Some(info) => RuntimeError::Aborted {
                export: export.to_string(),
                info,
            },
            None => RuntimeError::Trap {
                export: export.to_string(),
                message: format!("{error:#}"),
            },
        }
    }

    fn alloc(&self, size: u32, id: u32) -> RuntimeResult<u32> {
        let result = self
            .runtime
            .alloc
            .call(&mut *self.store.borrow_mut(), (size as i32, id as i32));
        result.map(|ptr| ptr as u32).map_err(|e| self.trap(ALLOC, e))
    }

    fn type_info(&self, id: u32) -> RuntimeResult<TypeInfo> {
        let store = self.store.borrow();
        rtti::lookup(self.memory.data(&*store), self.rtti_base, id)?.ok_or(RuntimeError::InvalidTypeId(id))
    }

    /// Look up `id` and require a view over 32-bit integers.
    fn i32_array_info(&self, id: u32) -> RuntimeResult<TypeInfo> {
        let info = self.type_info(id)?;
        if !info.is_array_view() {
            return Err(RuntimeError::NotAnArray(id));
        }
        if !info.flags.is_i32_elements() {
            return Err(RuntimeError::UnsupportedElement(id));
        }
        Ok(info)
    }
}

impl ManagedRuntime for WasmModule {
    fn alloc_string(&self, text: &str) -> RuntimeResult<Ref> {
        let bytes = encode_utf16(text);
        let size = u32::try_from(bytes.len()).map_err(|_| RuntimeError::TooLarge(bytes.len()))?;
        let ptr = self.alloc(size, STRING_ID)?;
        let mut store = self.store.borrow_mut();
        layout::slice_mut(self.memory.data_mut(&mut *store), ptr, size)?.copy_from_slice(&bytes);
        Ok(Ref(ptr))
    }

    fn alloc_array(&self, type_id: TypeId, values: &[i32]) -> RuntimeResult<Ref> {
        let info = self.i32_array_info(type_id.0)?;
        let length = u32::try_from(values.len()).map_err(|_| RuntimeError::TooLarge(values.len()))?;
        let byte_length = length.checked_mul(4).ok_or(RuntimeError::TooLarge(values.len()))?;

        let buffer = self.alloc(byte_length, ARRAYBUFFER_ID)?;
        let array = self.alloc(if info.is_array() { ARRAY_SIZE } else { VIEW_SIZE }, type_id.0)?;
        // The view owns one hold on its backing buffer.
        let buffer = self.retain(Ref(buffer))?.0;

        let mut store = self.store.borrow_mut();
        let memory = self.memory.data_mut(&mut *store);
        layout::write_u32(memory, layout::field_addr(array, VIEW_BUFFER_OFFSET)?, buffer)?;
        layout::write_u32(memory, layout::field_addr(array, VIEW_DATASTART_OFFSET)?, buffer)?;
        layout::write_u32(memory, layout::field_addr(array, VIEW_BYTELENGTH_OFFSET)?, byte_length)?;
        if info.is_array() {
            layout::write_u32(memory, layout::field_addr(array, ARRAY_LENGTH_OFFSET)?, length)?;
        }
        let data = layout::slice_mut(memory, buffer, byte_length)?;
        for (chunk, value) in data.chunks_exact_mut(4).zip(values) {
            chunk.copy_from_slice(&value.to_le_bytes());
        }
        Ok(Ref(array))
    }

    fn retain(&self, ptr: Ref) -> RuntimeResult<Ref> {
        let result = self.runtime.retain.call(&mut *self.store.borrow_mut(), ptr.as_arg());
        result.map(Ref::from_arg).map_err(|e| self.trap(RETAIN, e))
    }

    fn release(&self, ptr: Ref) -> RuntimeResult<()> {
        let result = self.runtime.release.call(&mut *self.store.borrow_mut(), ptr.as_arg());
        result.map_err(|e| self.trap(RELEASE, e))
    }

    fn read_string(&self, ptr: Ref) -> RuntimeResult<String> {
        let store = self.store.borrow();
        Ok(strings::read_string(self.memory.data(&*store), ptr.0)?)
    }

    fn read_array(&self, ptr: Ref) -> RuntimeResult<Vec<i32>> {
        let id = {
            let store = self.store.borrow();
            layout::object_id(self.memory.data(&*store), ptr.0)?
        };
        let info = self.i32_array_info(id)?;

        let store = self.store.borrow();
        let memory = self.memory.data(&*store);
        let data_start = layout::read_u32(memory, layout::field_addr(ptr.0, VIEW_DATASTART_OFFSET)?)?;
        let length = if info.is_array() {
            layout::read_u32(memory, layout::field_addr(ptr.0, ARRAY_LENGTH_OFFSET)?)?
        } else {
            layout::read_u32(memory, layout::field_addr(ptr.0, VIEW_BYTELENGTH_OFFSET)?)? >> 2
        };
        let byte_length = length.checked_mul(4).ok_or(RuntimeError::TooLarge(length as usize))?;
        let data = layout::slice(memory, data_start, byte_length)?;
        Ok(data
            .chunks_exact(4)
            .map(|chunk| i32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
            .collect())
    }

    fn instance_of(&self, ptr: Ref, type_id: TypeId) -> RuntimeResult<bool> {
        let store = self.store.borrow();
        let memory = self.memory.data(&*store);
        let id = layout::object_id(memory, ptr.0)?;
        Ok(rtti::is_subtype(memory, self.rtti_base, id, type_id.0)?)
    }
}

impl ModuleExports for WasmModule {
    fn global(&self, name: &str) -> RuntimeResult<u32> {
        let mut store = self.store.borrow_mut();
        let global = self
            .instance
            .get_global(&mut *store, name)
            .ok_or_else(|| RuntimeError::MissingExport(name.to_string()))?;
        match global.get(&mut *store) {
            Val::I32(value) => Ok(value as u32),
            other => Err(RuntimeError::Signature {
                name: name.to_string(),
                detail: format!("expected an i32 global, found {other:?}"),
            }),
        }
    }

    fn call(&self, name: &str, args: &[i32]) -> RuntimeResult<Option<i32>> {
        let func = {
            let mut store = self.store.borrow_mut();
            self.instance
                .get_func(&mut *store, name)
                .ok_or_else(|| RuntimeError::MissingExport(name.to_string()))?
        };

        let result_count = {
            let store = self.store.borrow();
            let ty = func.ty(&*store);
            let params_ok = ty.params().len() == args.len() && ty.params().all(|p| matches!(p, ValType::I32));
            let results: Vec<ValType> = ty.results().collect();
            if !params_ok || results.len() > 1 || !results.iter().all(|r| matches!(r, ValType::I32)) {
                return Err(RuntimeError::Signature {
                    name: name.to_string(),
                    detail: format!("{ty:?} cannot be called with {} i32 argument(s)", args.len()),
                });
            }
            results.len()
        };

        if let Some(set_length) = &self.runtime.set_arguments_length {
            // Matches the checked parameter count, which wasm caps far below `i32::MAX`.
            let argc = args.len() as i32;
            let result = set_length.call(&mut *self.store.borrow_mut(), argc);
            result.map_err(|e| self.trap(SET_ARGUMENTS_LENGTH[0], e))?;
        }

        let params: Vec<Val> = args.iter().copied().map(Val::I32).collect();
        let mut results = vec![Val::I32(0); result_count];
        let outcome = func.call(&mut *self.store.borrow_mut(), &params, &mut results);
        outcome.map_err(|e| self.trap(name, e))?;

        Ok(results.first().and_then(Val::i32))
    }
}
