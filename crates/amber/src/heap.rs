//! Arena storage for the synthetic host graph behind [`crate::mirror::Mirror`].
//!
//! Values live for exactly one serialization session, so the arena never
//! frees slots; handles are plain indices. Own properties keep insertion
//! order, which the walker relies on for stable output.

use std::collections::BTreeMap;

use indexmap::IndexMap;

use crate::value::{ObjId, PropertyKey, SourceLocation, Value};

/// Full own-property state, mirroring a property descriptor without its key.
#[derive(Debug, Clone)]
pub struct OwnProperty {
    pub value: Option<Value>,
    pub get: Option<Value>,
    pub set: Option<Value>,
    pub writable: bool,
    pub enumerable: bool,
    pub configurable: bool,
}

impl OwnProperty {
    /// A plain `{ value, writable: true, enumerable: true, configurable: true }` slot.
    pub fn simple(value: Value) -> Self {
        Self {
            value: Some(value),
            get: None,
            set: None,
            writable: true,
            enumerable: true,
            configurable: true,
        }
    }

    pub fn accessor(get: Option<Value>, set: Option<Value>) -> Self {
        Self {
            value: None,
            get,
            set,
            writable: false,
            enumerable: true,
            configurable: true,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ObjectData {
    pub props: IndexMap<PropertyKey, OwnProperty>,
    pub proto: Value,
    /// Overrides the `[object Object]` class tag (arguments-likes).
    pub class_tag: Option<String>,
}

#[derive(Debug, Clone)]
pub struct FunctionData {
    pub source: String,
    pub location: SourceLocation,
    /// Lexical scope chain, innermost frame first.
    pub scope: Vec<IndexMap<String, Value>>,
    pub props: IndexMap<PropertyKey, OwnProperty>,
    pub proto: Value,
}

#[derive(Debug, Clone)]
pub struct ArrayData {
    pub length: usize,
    /// Present numeric slots only; missing indices are holes.
    pub elements: BTreeMap<usize, Value>,
    /// Non-numeric own properties.
    pub props: IndexMap<PropertyKey, OwnProperty>,
    pub proto: Value,
}

#[derive(Debug, Clone)]
pub enum HeapData {
    Object(ObjectData),
    Function(FunctionData),
    Array(ArrayData),
    Regexp { source: String, flags: String },
    Promise { resolved: Value },
    Deferred { value: Value, secret: bool, wrapper: ObjId },
}

#[derive(Debug, Default)]
pub struct Heap {
    slots: Vec<HeapData>,
    /// Symbol descriptions by `SymbolId` index.
    symbols: Vec<Option<String>>,
}

impl Heap {
    pub fn alloc(&mut self, data: HeapData) -> ObjId {
        let id = ObjId::new(self.slots.len());
        self.slots.push(data);
        id
    }

    pub fn alloc_symbol(&mut self, description: Option<String>) -> usize {
        self.symbols.push(description);
        self.symbols.len() - 1
    }

    pub fn symbol_description(&self, index: usize) -> Option<&str> {
        self.symbols.get(index).and_then(Option::as_deref)
    }

    pub fn get(&self, id: ObjId) -> &HeapData {
        &self.slots[id.index()]
    }

    pub fn get_mut(&mut self, id: ObjId) -> &mut HeapData {
        &mut self.slots[id.index()]
    }

    pub fn object(&self, id: ObjId) -> &ObjectData {
        match self.get(id) {
            HeapData::Object(data) => data,
            other => panic!("expected object at {id:?}, found {other:?}"),
        }
    }

    pub fn object_mut(&mut self, id: ObjId) -> &mut ObjectData {
        match self.get_mut(id) {
            HeapData::Object(data) => data,
            other => panic!("expected object at {id:?}, found {other:?}"),
        }
    }

    pub fn function(&self, id: ObjId) -> &FunctionData {
        match self.get(id) {
            HeapData::Function(data) => data,
            other => panic!("expected function at {id:?}, found {other:?}"),
        }
    }

    pub fn function_mut(&mut self, id: ObjId) -> &mut FunctionData {
        match self.get_mut(id) {
            HeapData::Function(data) => data,
            other => panic!("expected function at {id:?}, found {other:?}"),
        }
    }

    pub fn array_mut(&mut self, id: ObjId) -> &mut ArrayData {
        match self.get_mut(id) {
            HeapData::Array(data) => data,
            other => panic!("expected array at {id:?}, found {other:?}"),
        }
    }

    /// Own properties of any reference value, in insertion order.
    pub fn props(&self, id: ObjId) -> Option<&IndexMap<PropertyKey, OwnProperty>> {
        match self.get(id) {
            HeapData::Object(data) => Some(&data.props),
            HeapData::Function(data) => Some(&data.props),
            HeapData::Array(data) => Some(&data.props),
            _ => None,
        }
    }

    pub fn props_mut(&mut self, id: ObjId) -> Option<&mut IndexMap<PropertyKey, OwnProperty>> {
        match self.get_mut(id) {
            HeapData::Object(data) => Some(&mut data.props),
            HeapData::Function(data) => Some(&mut data.props),
            HeapData::Array(data) => Some(&mut data.props),
            _ => None,
        }
    }
}
