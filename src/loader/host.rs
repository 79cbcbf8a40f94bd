//! Host side of the import object.
//!
//! The module imports from `env`:
//!
//! - `memory`: linear memory
//! - `table`: indirect call table (`funcref`)
//! - `abort(message, file, line, column)`: fatal error inside the module
//! - `trace(message, n, a0, a1, a2, a3, a4)`: debug output with up to five numbers

use modcheck_abi::strings::read_string;
use wasmtime::{
    Caller, Extern, Linker, Memory, MemoryType, Ref as WasmRef, RefType, Store, Table, TableType,
};

use super::{ImportConfig, LoadError};
use crate::runtime::AbortInfo;

pub const IMPORT_MODULE: &str = "env";

/// Per-store host data.
#[derive(Debug, Default)]
pub struct HostState {
    /// The memory handed to the module, used to decode strings passed to host functions
    pub memory: Option<Memory>,
    /// Set by `abort`, taken by the caller that observes the resulting trap
    pub abort: Option<AbortInfo>,
    /// Messages received through `trace`, most recent last
    pub traces: Vec<String>,
}

/// Create the memory and table and register every host function on `linker`.
pub fn define_imports(
    linker: &mut Linker<HostState>,
    store: &mut Store<HostState>,
    config: &ImportConfig,
) -> Result<Memory, LoadError> {
    let memory = Memory::new(&mut *store, MemoryType::new(config.initial_memory_pages, None))
        .map_err(|e| LoadError::Instantiate(format!("cannot create memory: {e:#}")))?;
    let table = Table::new(
        &mut *store,
        TableType::new(RefType::FUNCREF, config.initial_table_elements, None),
        WasmRef::Func(None),
    )
    .map_err(|e| LoadError::Instantiate(format!("cannot create table: {e:#}")))?;
    store.data_mut().memory = Some(memory);

    linker
        .define(&*store, IMPORT_MODULE, "memory", memory)
        .and_then(|l| l.define(&*store, IMPORT_MODULE, "table", table))
        .and_then(|l| {
            l.func_wrap(
                IMPORT_MODULE,
                "abort",
                |mut caller: Caller<'_, HostState>, message: i32, file: i32, line: i32, column: i32| {
                    let info = AbortInfo {
                        message: module_string(&mut caller, message),
                        file: module_string(&mut caller, file),
                        line: line as u32,
                        column: column as u32,
                    };
                    tracing::error!(%info, "module aborted");
                    let error = wasmtime::Error::msg(format!("abort: {info}"));
                    caller.data_mut().abort = Some(info);
                    Err::<(), _>(error)
                },
            )
        })
        .and_then(|l| {
            l.func_wrap(
                IMPORT_MODULE,
                "trace",
                |mut caller: Caller<'_, HostState>,
                 message: i32,
                 n: i32,
                 a0: f64,
                 a1: f64,
                 a2: f64,
                 a3: f64,
                 a4: f64| {
                    let text = module_string(&mut caller, message).unwrap_or_default();
                    let count = n.clamp(0, 5) as usize;
                    let args: Vec<String> = [a0, a1, a2, a3, a4][..count].iter().map(|v| v.to_string()).collect();
                    let line = if args.is_empty() {
                        text
                    } else {
                        format!("{} {}", text, args.join(", "))
                    };
                    tracing::info!(target: "modcheck::trace", "{}", line);
                    caller.data_mut().traces.push(line);
                },
            )
        })
        .map_err(|e| LoadError::Instantiate(format!("cannot define imports: {e:#}")))?;

    Ok(memory)
}

/// Decode a string argument passed by the module; `None` for null or unreadable pointers.
fn module_string(caller: &mut Caller<'_, HostState>, ptr: i32) -> Option<String> {
    if ptr == 0 {
        return None;
    }
    let memory = match caller.get_export("memory") {
        Some(Extern::Memory(memory)) => memory,
        _ => caller.data().memory?,
    };
    read_string(memory.data(&*caller), ptr as u32).ok()
}
