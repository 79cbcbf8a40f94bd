//! The fixed check sequence.
//!
//! Each check is an independent, synchronous scenario. Any hold a check takes is given back inside
//! that check before it returns successfully.

use super::assert::{expect_eq, expect_true};
use super::error::CheckError;
use crate::exports::{ArrayKind, ExportSurface};
use crate::runtime::{Module, Ref};

/// Result of one check.
pub type CheckResult = Result<(), CheckError>;

/// A named check against a module.
pub struct Check<M: Module + ?Sized> {
    pub name: &'static str,
    pub run: fn(&ExportSurface<'_, M>) -> CheckResult,
}

impl<M: Module + ?Sized> Clone for Check<M> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<M: Module + ?Sized> Copy for Check<M> {}

impl<M: Module + ?Sized> std::fmt::Debug for Check<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Check").field("name", &self.name).finish()
    }
}

pub const EXPECTED_MOTTO: &str = "YOLO";
pub const GREETING: &str = "Hello world!";
pub const SOURCE_ARRAY: [i32; 5] = [1, 2, 3, 4, 5];
pub const TRUNCATED_LENGTH: i32 = 3;
pub const CAR_DOORS: i32 = 5;

/// All checks, in run order.
pub fn all<M: Module + ?Sized>() -> Vec<Check<M>> {
    vec![
        Check {
            name: "life_motto",
            run: life_motto::<M>,
        },
        Check {
            name: "string_round_trip",
            run: string_round_trip::<M>,
        },
        Check {
            name: "typed_array_round_trip",
            run: typed_array_round_trip::<M>,
        },
        Check {
            name: "array_truncation",
            run: array_truncation::<M>,
        },
        Check {
            name: "arithmetic",
            run: arithmetic::<M>,
        },
        Check {
            name: "class_lifecycle",
            run: class_lifecycle::<M>,
        },
    ]
}

/// The exported string constant decodes to the expected literal.
#[tracing::instrument(skip_all)]
pub fn life_motto<M: Module + ?Sized>(exports: &ExportSurface<'_, M>) -> CheckResult {
    let motto = exports.module().read_string(exports.life_motto()?)?;
    expect_eq("LIFE_MOTTO", motto.as_str(), EXPECTED_MOTTO)?;
    Ok(())
}

/// A host string survives the trip into module memory and back, and `strlen` agrees on its length.
#[tracing::instrument(skip_all)]
pub fn string_round_trip<M: Module + ?Sized>(exports: &ExportSurface<'_, M>) -> CheckResult {
    let text = exports.retain_string(GREETING)?;
    let copied = exports.module().read_string(text.get())?;
    expect_eq("string read back", copied.as_str(), GREETING)?;

    let length = exports.strlen(&text)?;
    let expected = i32::try_from(GREETING.encode_utf16().count()).unwrap_or(i32::MAX);
    expect_eq("strlen", &length, &expected)?;

    text.release()?;
    Ok(())
}

/// An `Int32Array` round-trips, is an instance of its class, and `sum` reduces it.
#[tracing::instrument(skip_all)]
pub fn typed_array_round_trip<M: Module + ?Sized>(exports: &ExportSurface<'_, M>) -> CheckResult {
    let id = exports.type_id(ArrayKind::Int32Array)?;
    let array = exports.retain_array(ArrayKind::Int32Array, &SOURCE_ARRAY)?;
    expect_true("instance of Int32Array", exports.module().instance_of(array.get(), id)?)?;

    let copied = exports.module().read_array(array.get())?;
    expect_eq("array read back", copied.as_slice(), &SOURCE_ARRAY[..])?;
    tracing::info!(array = ?copied, "the array");

    let sum = exports.sum(&array)?;
    tracing::info!(sum, "sum of array");
    let expected = SOURCE_ARRAY.iter().fold(0i32, |acc, v| acc.wrapping_add(*v));
    expect_eq("sum", &sum, &expected)?;

    array.release()?;
    Ok(())
}

/// `changeLength` truncates an `Array<i32>` and keeps its prefix.
#[tracing::instrument(skip_all)]
pub fn array_truncation<M: Module + ?Sized>(exports: &ExportSurface<'_, M>) -> CheckResult {
    let array = exports.retain_array(ArrayKind::ArrayI32, &SOURCE_ARRAY)?;
    exports.change_length(&array, TRUNCATED_LENGTH)?;

    let copied = exports.module().read_array(array.get())?;
    let prefix = &SOURCE_ARRAY[..TRUNCATED_LENGTH as usize];
    expect_eq("truncated array", copied.as_slice(), prefix)?;

    array.release()?;
    Ok(())
}

/// `varadd(2, 3)` is exactly 5.
#[tracing::instrument(skip_all)]
pub fn arithmetic<M: Module + ?Sized>(exports: &ExportSurface<'_, M>) -> CheckResult {
    expect_eq("varadd(2, 3)", &exports.varadd(2, 3)?, &5)?;
    Ok(())
}

/// A `Car` keeps its constructor argument and its doors toggle in direction.
#[tracing::instrument(skip_all)]
pub fn class_lifecycle<M: Module + ?Sized>(exports: &ExportSurface<'_, M>) -> CheckResult {
    let car = exports.new_car(CAR_DOORS)?;
    tracing::debug!(ptr = %car.ptr(), "constructed Car");
    expect_true("Car reference", car.ptr() != Ref::NULL)?;
    expect_eq("numDoors", &car.num_doors()?, &CAR_DOORS)?;
    expect_eq("isDoorsOpen after construction", &car.is_doors_open()?, &0)?;

    car.open_doors()?;
    expect_eq("isDoorsOpen after openDoors", &car.is_doors_open()?, &1)?;
    car.open_doors()?;
    expect_eq("isDoorsOpen after second openDoors", &car.is_doors_open()?, &1)?;

    car.close_doors()?;
    expect_eq("isDoorsOpen after closeDoors", &car.is_doors_open()?, &0)?;

    car.release()?;
    Ok(())
}
