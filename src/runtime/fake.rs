//! In-memory stand-in for the demo module.
//!
//! `FakeModule` implements [`ManagedRuntime`] and [`ModuleExports`] without an engine. It keeps an
//! object table keyed by [`Ref`] and counts external holds per object, so tests can check that a run
//! gives every hold back and never touches a released object.
//!
//! Objects are collected as soon as their hold count returns to zero after having been retained.
//! Freshly allocated, never retained objects stay alive, as in the real runtime.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::collections::HashMap;

use modcheck_abi::strings::utf16_len;
use modcheck_abi::{ARRAYBUFFERVIEW_ID, STRING_ID};

use super::{ManagedRuntime, ModuleExports, Ref, RuntimeError, RuntimeResult, TypeId};
use crate::exports;

/// Runtime id of `Int32Array` in the fake type table.
pub const FAKE_INT32ARRAY_ID: u32 = 3;
/// Runtime id of `Array<i32>` in the fake type table.
pub const FAKE_ARRAYI32_ID: u32 = 4;
/// Runtime id of `Car` in the fake type table.
pub const FAKE_CAR_ID: u32 = 5;

/// Base id of every fake type (index = type id). `None` marks a root class.
const BASES: [Option<u32>; 6] = [None, None, None, Some(ARRAYBUFFERVIEW_ID), Some(ARRAYBUFFERVIEW_ID), None];

/// First address handed out by the fake allocator.
const HEAP_BASE: u32 = 0x1000;
/// Address spacing between fake objects.
const SLOT_STRIDE: u32 = 0x20;
/// Address of the static `LIFE_MOTTO` string.
const MOTTO_PTR: u32 = 0x100;

type ExportOverride = Box<dyn Fn(&[i32]) -> Option<i32>>;

#[derive(Debug, Clone, PartialEq)]
enum Object {
    Str(String),
    Array(Vec<i32>),
    Car { num_doors: i32, doors_open: bool },
}

#[derive(Debug)]
struct Slot {
    type_id: u32,
    object: Object,
    holds: u32,
    /// Static data is never collected and ignores retain/release.
    is_static: bool,
}

#[derive(Debug, Default)]
struct FakeState {
    objects: BTreeMap<Ref, Slot>,
    next: u32,
    calls: Vec<String>,
}

impl FakeState {
    fn insert(&mut self, type_id: u32, object: Object, holds: u32) -> Ref {
        let ptr = Ref(HEAP_BASE + self.next * SLOT_STRIDE);
        self.next += 1;
        self.objects.insert(
            ptr,
            Slot {
                type_id,
                object,
                holds,
                is_static: false,
            },
        );
        ptr
    }

    fn slot(&self, ptr: Ref) -> RuntimeResult<&Slot> {
        self.objects.get(&ptr).ok_or(RuntimeError::DanglingReference(ptr))
    }

    fn slot_mut(&mut self, ptr: Ref) -> RuntimeResult<&mut Slot> {
        self.objects.get_mut(&ptr).ok_or(RuntimeError::DanglingReference(ptr))
    }
}

/// An in-memory module exporting `LIFE_MOTTO`, `strlen`, `sum`, `changeLength`, `varadd` and `Car`.
pub struct FakeModule {
    state: RefCell<FakeState>,
    overrides: HashMap<String, ExportOverride>,
}

impl Default for FakeModule {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeModule {
    /// Create a module whose motto is `"YOLO"`.
    pub fn new() -> Self {
        let mut state = FakeState::default();
        state.objects.insert(
            Ref(MOTTO_PTR),
            Slot {
                type_id: STRING_ID,
                object: Object::Str("YOLO".to_string()),
                holds: 0,
                is_static: true,
            },
        );
        Self {
            state: RefCell::new(state),
            overrides: HashMap::new(),
        }
    }

    /// Replace the static motto string.
    pub fn with_motto(self, motto: &str) -> Self {
        if let Some(slot) = self.state.borrow_mut().objects.get_mut(&Ref(MOTTO_PTR)) {
            slot.object = Object::Str(motto.to_string());
        }
        self
    }

    /// Replace an exported function with `f`.
    pub fn with_export(mut self, name: &str, f: impl Fn(&[i32]) -> Option<i32> + 'static) -> Self {
        self.overrides.insert(name.to_string(), Box::new(f));
        self
    }

    /// Total external holds currently outstanding.
    pub fn retained_count(&self) -> u32 {
        self.state.borrow().objects.values().map(|slot| slot.holds).sum()
    }

    /// Whether `ptr` still points at a live object.
    pub fn is_live(&self, ptr: Ref) -> bool {
        self.state.borrow().objects.contains_key(&ptr)
    }

    /// Names of the exports called so far, in order.
    pub fn calls(&self) -> Vec<String> {
        self.state.borrow().calls.clone()
    }

    fn string_arg(&self, ptr: Ref) -> RuntimeResult<String> {
        match &self.state.borrow().slot(ptr)?.object {
            Object::Str(text) => Ok(text.clone()),
            _ => Err(RuntimeError::Trap {
                export: exports::STRLEN.to_string(),
                message: format!("{ptr} is not a string"),
            }),
        }
    }

    fn with_array<T>(&self, export: &str, ptr: Ref, f: impl FnOnce(&mut Vec<i32>) -> T) -> RuntimeResult<T> {
        let mut state = self.state.borrow_mut();
        match &mut state.slot_mut(ptr)?.object {
            Object::Array(values) => Ok(f(values)),
            _ => Err(RuntimeError::Trap {
                export: export.to_string(),
                message: format!("{ptr} is not an array"),
            }),
        }
    }

    fn with_car<T>(&self, export: &str, ptr: Ref, f: impl FnOnce(&mut i32, &mut bool) -> T) -> RuntimeResult<T> {
        let mut state = self.state.borrow_mut();
        match &mut state.slot_mut(ptr)?.object {
            Object::Car { num_doors, doors_open } => Ok(f(num_doors, doors_open)),
            _ => Err(RuntimeError::Trap {
                export: export.to_string(),
                message: format!("{ptr} is not a Car"),
            }),
        }
    }

    fn builtin(&self, name: &str, args: &[i32]) -> RuntimeResult<Option<i32>> {
        match (name, args) {
            (exports::STRLEN, &[s]) => {
                let text = self.string_arg(Ref::from_arg(s))?;
                Ok(Some(utf16_len(&text) as i32))
            }
            (exports::SUM, &[a]) => self
                .with_array(name, Ref::from_arg(a), |values| values.iter().fold(0i32, |acc, v| acc.wrapping_add(*v)))
                .map(Some),
            (exports::CHANGE_LENGTH, &[a, length]) => {
                let length = usize::try_from(length).map_err(|_| RuntimeError::Trap {
                    export: name.to_string(),
                    message: format!("invalid length {length}"),
                })?;
                self.with_array(name, Ref::from_arg(a), |values| values.resize(length, 0))?;
                Ok(None)
            }
            (exports::VARADD, &[a, b]) => Ok(Some(a.wrapping_add(b))),
            (exports::CAR_CONSTRUCTOR, &[this, num_doors]) => {
                let this = Ref::from_arg(this);
                if !this.is_null() {
                    self.with_car(name, this, |doors, open| {
                        *doors = num_doors;
                        *open = false;
                    })?;
                    self.retain(this)?;
                    return Ok(Some(this.as_arg()));
                }
                let car = Object::Car {
                    num_doors,
                    doors_open: false,
                };
                // Constructor results are handed to the caller already retained.
                let ptr = self.state.borrow_mut().insert(FAKE_CAR_ID, car, 1);
                Ok(Some(ptr.as_arg()))
            }
            (exports::CAR_NUM_DOORS, &[this]) => self.with_car(name, Ref::from_arg(this), |doors, _| Some(*doors)),
            (exports::CAR_IS_DOORS_OPEN, &[this]) => {
                self.with_car(name, Ref::from_arg(this), |_, open| Some(i32::from(*open)))
            }
            (exports::CAR_OPEN_DOORS, &[this]) => self.with_car(name, Ref::from_arg(this), |_, open| {
                *open = true;
                None
            }),
            (exports::CAR_CLOSE_DOORS, &[this]) => self.with_car(name, Ref::from_arg(this), |_, open| {
                *open = false;
                None
            }),
            (
                exports::STRLEN
                | exports::SUM
                | exports::CHANGE_LENGTH
                | exports::VARADD
                | exports::CAR_CONSTRUCTOR
                | exports::CAR_NUM_DOORS
                | exports::CAR_IS_DOORS_OPEN
                | exports::CAR_OPEN_DOORS
                | exports::CAR_CLOSE_DOORS,
                _,
            ) => Err(RuntimeError::Signature {
                name: name.to_string(),
                detail: format!("called with {} argument(s)", args.len()),
            }),
            _ => Err(RuntimeError::MissingExport(name.to_string())),
        }
    }
}

impl ManagedRuntime for FakeModule {
    fn alloc_string(&self, text: &str) -> RuntimeResult<Ref> {
        Ok(self.state.borrow_mut().insert(STRING_ID, Object::Str(text.to_string()), 0))
    }

    fn alloc_array(&self, type_id: TypeId, values: &[i32]) -> RuntimeResult<Ref> {
        match type_id.0 {
            FAKE_INT32ARRAY_ID | FAKE_ARRAYI32_ID => {
                Ok(self.state.borrow_mut().insert(type_id.0, Object::Array(values.to_vec()), 0))
            }
            id if (id as usize) < BASES.len() => Err(RuntimeError::NotAnArray(id)),
            id => Err(RuntimeError::InvalidTypeId(id)),
        }
    }

    fn retain(&self, ptr: Ref) -> RuntimeResult<Ref> {
        let mut state = self.state.borrow_mut();
        let slot = state.slot_mut(ptr)?;
        if !slot.is_static {
            slot.holds += 1;
        }
        Ok(ptr)
    }

    fn release(&self, ptr: Ref) -> RuntimeResult<()> {
        let mut state = self.state.borrow_mut();
        let slot = state.slot_mut(ptr)?;
        if slot.is_static {
            return Ok(());
        }
        if slot.holds == 0 {
            return Err(RuntimeError::NotRetained(ptr));
        }
        slot.holds -= 1;
        if slot.holds == 0 {
            state.objects.remove(&ptr);
        }
        Ok(())
    }

    fn read_string(&self, ptr: Ref) -> RuntimeResult<String> {
        let state = self.state.borrow();
        match &state.slot(ptr)?.object {
            Object::Str(text) => Ok(text.clone()),
            _ => Err(RuntimeError::DanglingReference(ptr)),
        }
    }

    fn read_array(&self, ptr: Ref) -> RuntimeResult<Vec<i32>> {
        let state = self.state.borrow();
        let slot = state.slot(ptr)?;
        match &slot.object {
            Object::Array(values) => Ok(values.clone()),
            _ => Err(RuntimeError::NotAnArray(slot.type_id)),
        }
    }

    fn instance_of(&self, ptr: Ref, type_id: TypeId) -> RuntimeResult<bool> {
        let mut current = Some(self.state.borrow().slot(ptr)?.type_id);
        while let Some(id) = current {
            if id == type_id.0 {
                return Ok(true);
            }
            current = BASES.get(id as usize).copied().flatten();
        }
        Ok(false)
    }
}

impl ModuleExports for FakeModule {
    fn global(&self, name: &str) -> RuntimeResult<u32> {
        match name {
            exports::LIFE_MOTTO => Ok(MOTTO_PTR),
            exports::INT32ARRAY_ID => Ok(FAKE_INT32ARRAY_ID),
            exports::ARRAYI32_ID => Ok(FAKE_ARRAYI32_ID),
            _ => Err(RuntimeError::MissingExport(name.to_string())),
        }
    }

    fn call(&self, name: &str, args: &[i32]) -> RuntimeResult<Option<i32>> {
        self.state.borrow_mut().calls.push(name.to_string());
        if let Some(f) = self.overrides.get(name) {
            return Ok(f(args));
        }
        self.builtin(name, args)
    }
}
