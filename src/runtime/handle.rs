//! Managed references and the retain/release guard.
//!
//! ## Reference discipline
//!
//! A [`Ref`] returned by an allocation helper is unretained: the module may collect it at any time.
//! [`Retained`] owns exactly one external hold on a reference. The hold is given back by
//! [`Retained::release`], which consumes the guard, so a released reference cannot be used again.
//! A guard dropped without `release` (for example on an early `?` return) still gives its hold back.

use std::fmt;

use super::{ManagedRuntime, RuntimeResult};

/// A managed pointer into module memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Ref(pub u32);

impl Ref {
    pub const NULL: Ref = Ref(0);

    pub fn is_null(self) -> bool {
        self.0 == 0
    }

    /// The pointer as the `i32` the module's ABI passes around.
    pub fn as_arg(self) -> i32 {
        self.0 as i32
    }

    /// Reinterpret an `i32` returned by the module as a pointer.
    pub fn from_arg(value: i32) -> Ref {
        Ref(value as u32)
    }
}

impl fmt::Display for Ref {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// A runtime type id, as found in the module's type table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeId(pub u32);

impl fmt::Display for TypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One external hold on a managed reference.
pub struct Retained<'m, M: ManagedRuntime + ?Sized> {
    module: &'m M,
    ptr: Ref,
    released: bool,
}

impl<'m, M: ManagedRuntime + ?Sized> Retained<'m, M> {
    /// Retain `ptr` and take ownership of the new hold.
    pub fn retain(module: &'m M, ptr: Ref) -> RuntimeResult<Self> {
        let ptr = module.retain(ptr)?;
        Ok(Self {
            module,
            ptr,
            released: false,
        })
    }

    /// Take ownership of a hold the module already handed out.
    ///
    /// Managed values returned from exports (constructor results, for example) arrive retained
    /// for the caller; adopting them avoids a second retain.
    pub fn adopt(module: &'m M, ptr: Ref) -> Self {
        Self {
            module,
            ptr,
            released: false,
        }
    }

    pub fn get(&self) -> Ref {
        self.ptr
    }

    pub fn module(&self) -> &'m M {
        self.module
    }

    /// Give the hold back.
    pub fn release(mut self) -> RuntimeResult<()> {
        self.released = true;
        self.module.release(self.ptr)
    }
}

impl<M: ManagedRuntime + ?Sized> fmt::Debug for Retained<'_, M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Retained")
            .field("ptr", &self.ptr)
            .field("released", &self.released)
            .finish()
    }
}

impl<M: ManagedRuntime + ?Sized> Drop for Retained<'_, M> {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        tracing::warn!(ptr = %self.ptr, "retained reference dropped without release");
        if let Err(err) = self.module.release(self.ptr) {
            tracing::warn!(ptr = %self.ptr, error = %err, "implicit release failed");
        }
    }
}
