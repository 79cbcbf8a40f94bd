//! Typed view of the demo module's exports.
//!
//! The module is expected to export:
//!
//! | Export | Kind | Meaning |
//! |---|---|---|
//! | `LIFE_MOTTO` | global | reference to a static string |
//! | `INT32ARRAY_ID` | global | runtime id of `Int32Array` |
//! | `ARRAYI32_ID` | global | runtime id of `Array<i32>` |
//! | `strlen(s)` | function | length of `s` in UTF-16 code units |
//! | `sum(a)` | function | sum of an `Int32Array` |
//! | `changeLength(a, n)` | function | set the length of an `Array<i32>` |
//! | `varadd(a, b)` | function | `a + b` |
//! | `Car#...` | class | see [`Car`] |

use std::fmt;

use crate::runtime::{Module, Ref, Retained, RuntimeError, RuntimeResult, TypeId};

pub const LIFE_MOTTO: &str = "LIFE_MOTTO";
pub const INT32ARRAY_ID: &str = "INT32ARRAY_ID";
pub const ARRAYI32_ID: &str = "ARRAYI32_ID";
pub const STRLEN: &str = "strlen";
pub const SUM: &str = "sum";
pub const CHANGE_LENGTH: &str = "changeLength";
pub const VARADD: &str = "varadd";
pub const CAR_CONSTRUCTOR: &str = "Car#constructor";
pub const CAR_NUM_DOORS: &str = "Car#get:numDoors";
pub const CAR_IS_DOORS_OPEN: &str = "Car#get:isDoorsOpen";
pub const CAR_OPEN_DOORS: &str = "Car#openDoors";
pub const CAR_CLOSE_DOORS: &str = "Car#closeDoors";

/// The array classes the harness knows how to allocate.
///
/// Each kind maps to exactly one exported id constant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArrayKind {
    /// `Int32Array`: a fixed-length typed view.
    Int32Array,
    /// `Array<i32>`: a growable array with its own length field.
    ArrayI32,
}

impl ArrayKind {
    pub fn id_export(self) -> &'static str {
        match self {
            ArrayKind::Int32Array => INT32ARRAY_ID,
            ArrayKind::ArrayI32 => ARRAYI32_ID,
        }
    }
}

impl fmt::Display for ArrayKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArrayKind::Int32Array => write!(f, "Int32Array"),
            ArrayKind::ArrayI32 => write!(f, "Array<i32>"),
        }
    }
}

/// Typed calls into a [`Module`].
pub struct ExportSurface<'m, M: Module + ?Sized> {
    module: &'m M,
}

impl<M: Module + ?Sized> Clone for ExportSurface<'_, M> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<M: Module + ?Sized> Copy for ExportSurface<'_, M> {}

impl<'m, M: Module + ?Sized> ExportSurface<'m, M> {
    pub fn new(module: &'m M) -> Self {
        Self { module }
    }

    pub fn module(&self) -> &'m M {
        self.module
    }

    /// Reference to the exported `LIFE_MOTTO` string.
    pub fn life_motto(&self) -> RuntimeResult<Ref> {
        self.module.global(LIFE_MOTTO).map(Ref)
    }

    /// Runtime id of an array class.
    pub fn type_id(&self, kind: ArrayKind) -> RuntimeResult<TypeId> {
        self.module.global(kind.id_export()).map(TypeId)
    }

    /// Allocate and retain a string.
    pub fn retain_string(&self, text: &str) -> RuntimeResult<Retained<'m, M>> {
        let ptr = self.module.alloc_string(text)?;
        Retained::retain(self.module, ptr)
    }

    /// Allocate and retain an array of the given kind.
    pub fn retain_array(&self, kind: ArrayKind, values: &[i32]) -> RuntimeResult<Retained<'m, M>> {
        let id = self.type_id(kind)?;
        let ptr = self.module.alloc_array(id, values)?;
        Retained::retain(self.module, ptr)
    }

    pub fn strlen(&self, text: &Retained<'_, M>) -> RuntimeResult<i32> {
        returned(STRLEN, self.module.call(STRLEN, &[text.get().as_arg()])?)
    }

    pub fn sum(&self, array: &Retained<'_, M>) -> RuntimeResult<i32> {
        returned(SUM, self.module.call(SUM, &[array.get().as_arg()])?)
    }

    pub fn change_length(&self, array: &Retained<'_, M>, length: i32) -> RuntimeResult<()> {
        self.module.call(CHANGE_LENGTH, &[array.get().as_arg(), length])?;
        Ok(())
    }

    pub fn varadd(&self, a: i32, b: i32) -> RuntimeResult<i32> {
        returned(VARADD, self.module.call(VARADD, &[a, b])?)
    }

    /// Construct a `Car` with `num_doors` doors.
    pub fn new_car(&self, num_doors: i32) -> RuntimeResult<Car<'m, M>> {
        // A null `this` asks the constructor to allocate.
        let ptr = returned(
            CAR_CONSTRUCTOR,
            self.module.call(CAR_CONSTRUCTOR, &[Ref::NULL.as_arg(), num_doors])?,
        )?;
        Ok(Car {
            exports: *self,
            this: Retained::adopt(self.module, Ref::from_arg(ptr)),
        })
    }
}

/// An instance of the exported `Car` class.
///
/// Owns the hold the constructor returned; give it back with [`Car::release`].
pub struct Car<'m, M: Module + ?Sized> {
    exports: ExportSurface<'m, M>,
    this: Retained<'m, M>,
}

impl<'m, M: Module + ?Sized> Car<'m, M> {
    pub fn ptr(&self) -> Ref {
        self.this.get()
    }

    pub fn num_doors(&self) -> RuntimeResult<i32> {
        self.method(CAR_NUM_DOORS)
    }

    /// Encoded boolean: `0` closed, `1` open.
    pub fn is_doors_open(&self) -> RuntimeResult<i32> {
        self.method(CAR_IS_DOORS_OPEN)
    }

    pub fn open_doors(&self) -> RuntimeResult<()> {
        self.exports.module().call(CAR_OPEN_DOORS, &[self.this.get().as_arg()])?;
        Ok(())
    }

    pub fn close_doors(&self) -> RuntimeResult<()> {
        self.exports.module().call(CAR_CLOSE_DOORS, &[self.this.get().as_arg()])?;
        Ok(())
    }

    pub fn release(self) -> RuntimeResult<()> {
        self.this.release()
    }

    fn method(&self, name: &str) -> RuntimeResult<i32> {
        returned(name, self.exports.module().call(name, &[self.this.get().as_arg()])?)
    }
}

/// Require a return value from an export that should produce one.
fn returned(name: &str, value: Option<i32>) -> RuntimeResult<i32> {
    value.ok_or_else(|| RuntimeError::Signature {
        name: name.to_string(),
        detail: "expected a single i32 result, got none".to_string(),
    })
}
