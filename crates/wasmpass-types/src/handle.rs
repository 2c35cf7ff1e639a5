//! Opaque integer handles to host-only objects.
//!
//! The guest can only hold integers, so host objects it needs to refer to
//! live in a [`HandleTable`] and the guest is given the slot index.  Any
//! guest code holding the integer can ask for the object through an import,
//! which makes every handle arriving from the guest untrusted input: lookups
//! are bounds-checked and answer `None` instead of failing.
//!
//! Slots are never reissued.  [`HandleTable::take`] empties a slot but the
//! index stays retired until the table is dropped with its guest instance.

use serde::{Deserialize, Serialize};
use std::any::Any;
use std::fmt;

use crate::layout::TypeRef;
use crate::memory::LinearMemory;
use crate::ty::WasmType;
use crate::{Error, Result};

/// Index of a slot in a [`HandleTable`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Handle(u32);

impl Handle {
    pub const fn from_raw(index: u32) -> Self {
        Self(index)
    }

    /// Reinterpret a wasm `i32` argument as a handle.
    pub const fn from_guest(raw: i32) -> Self {
        Self(raw as u32)
    }

    pub const fn index(self) -> u32 {
        self.0
    }

    /// The value passed back to the guest as a wasm `i32`.
    pub const fn to_guest(self) -> i32 {
        self.0 as i32
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl WasmType for Handle {
    const SIZE: u32 = 4;

    fn type_ref() -> TypeRef {
        TypeRef::Handle
    }

    fn decode<M: LinearMemory + ?Sized>(memory: &M, offset: u32) -> Result<Self> {
        memory.read::<u32>(offset).map(Self)
    }

    fn encode<M: LinearMemory + ?Sized>(&self, memory: &mut M, offset: u32) -> Result<()> {
        memory.write(offset, self.0)
    }
}

/// Grow-only arena of optional host objects indexed by [`Handle`].
#[derive(Debug)]
pub struct HandleTable<T> {
    slots: Vec<Option<T>>,
}

impl<T> HandleTable<T> {
    pub fn new() -> Self {
        Self { slots: Vec::new() }
    }

    /// Append an empty slot and return its handle.
    pub fn create_handle(&mut self) -> Handle {
        self.slots.push(None);
        Handle(self.slots.len() as u32 - 1)
    }

    /// Append a populated slot.
    pub fn insert(&mut self, value: T) -> Handle {
        self.slots.push(Some(value));
        Handle(self.slots.len() as u32 - 1)
    }

    /// Store `value` in an existing slot, returning the previous content.
    ///
    /// Fails with [`Error::HandleAbsent`] if the handle was never created.
    pub fn populate(&mut self, handle: Handle, value: T) -> Result<Option<T>> {
        let slot = self
            .slots
            .get_mut(handle.0 as usize)
            .ok_or(Error::HandleAbsent(handle))?;
        Ok(slot.replace(value))
    }

    /// The slot's content; `None` when empty or out of range.
    pub fn get(&self, handle: Handle) -> Option<&T> {
        self.slots.get(handle.0 as usize)?.as_ref()
    }

    pub fn get_mut(&mut self, handle: Handle) -> Option<&mut T> {
        self.slots.get_mut(handle.0 as usize)?.as_mut()
    }

    /// Empty a slot without retiring its index for reuse.
    pub fn take(&mut self, handle: Handle) -> Option<T> {
        self.slots.get_mut(handle.0 as usize)?.take()
    }

    pub fn contains(&self, handle: Handle) -> bool {
        self.get(handle).is_some()
    }

    /// Number of slots ever created, populated or not.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Populated slots in handle order.
    pub fn iter(&self) -> impl Iterator<Item = (Handle, &T)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| slot.as_ref().map(|v| (Handle(i as u32), v)))
    }
}

impl<T> Default for HandleTable<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl HandleTable<Box<dyn Any + Send>> {
    /// Look up a heterogeneous slot and downcast it to `U`.
    pub fn get_as<U: Any>(&self, handle: Handle) -> Option<&U> {
        self.get(handle)?.downcast_ref::<U>()
    }
}
