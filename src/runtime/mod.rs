//! Capability traits through which the harness reaches a loaded module.
//!
//! The harness never touches an engine directly. It is handed something implementing [`Module`]:
//! - [`ManagedRuntime`]: the marshalling helpers (allocate, retain/release, read back, instance-of),
//! - [`ModuleExports`]: named constants and functions.
//!
//! `loader::WasmModule` implements both over wasmtime; [`fake::FakeModule`] implements both in memory
//! so checks can be exercised without a compiled artifact.
//!
//! All methods take `&self`. Implementations are single-threaded and use interior mutability;
//! no call re-enters another.

pub mod error;
pub mod fake;
pub mod handle;

pub use error::{AbortInfo, RuntimeError, RuntimeResult};
pub use handle::{Ref, Retained, TypeId};

/// Marshalling helpers for managed values in module memory.
pub trait ManagedRuntime {
    /// Copy `text` into module memory. The returned reference is unretained.
    fn alloc_string(&self, text: &str) -> RuntimeResult<Ref>;

    /// Copy `values` into a new array of runtime type `type_id`. The returned reference is unretained.
    fn alloc_array(&self, type_id: TypeId, values: &[i32]) -> RuntimeResult<Ref>;

    /// Add one external hold; returns the same reference.
    fn retain(&self, ptr: Ref) -> RuntimeResult<Ref>;

    /// Remove one external hold.
    fn release(&self, ptr: Ref) -> RuntimeResult<()>;

    /// Copy out the string at `ptr`.
    fn read_string(&self, ptr: Ref) -> RuntimeResult<String>;

    /// Copy out the elements of the array at `ptr`.
    fn read_array(&self, ptr: Ref) -> RuntimeResult<Vec<i32>>;

    /// Check whether the object at `ptr` was allocated as `type_id` or a subclass of it.
    fn instance_of(&self, ptr: Ref, type_id: TypeId) -> RuntimeResult<bool>;
}

/// Named exports of a module.
///
/// Every value crossing this boundary is an `i32`: integers, booleans (0/1) and references alike.
pub trait ModuleExports {
    /// Read an exported constant.
    fn global(&self, name: &str) -> RuntimeResult<u32>;

    /// Call an exported function.
    ///
    /// ## Returns
    /// - (`Ok(None)`): the function returns nothing.
    fn call(&self, name: &str, args: &[i32]) -> RuntimeResult<Option<i32>>;
}

/// A loaded module: marshalling helpers plus exports.
pub trait Module: ManagedRuntime + ModuleExports {}

impl<T: ManagedRuntime + ModuleExports + ?Sized> Module for T {}
