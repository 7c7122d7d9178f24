//! The normalized intermediate form produced by the graph walker.
//!
//! Entries live in an arena and reference each other by id, mirroring the
//! identity structure of the live graph: every reference-typed live value
//! maps to exactly one entry, cycles included. An entry starts `Pending`
//! (the placeholder inserted before recursing into children) and is
//! populated exactly once; the disposition never changes afterwards,
//! though object payloads may gain further properties.

use indexmap::IndexMap;

/// Index into the [`EntryArena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntryId(u32);

impl EntryId {
    fn new(index: usize) -> Self {
        Self(u32::try_from(index).expect("entry id out of range"))
    }

    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// A JSON-representable primitive, with the extra `undefined` sentinel the
/// host language needs.
#[derive(Debug, Clone, PartialEq)]
pub enum JsonLiteral {
    Undefined,
    Value(serde_json::Value),
}

impl JsonLiteral {
    pub fn string(s: impl Into<String>) -> Self {
        Self::Value(serde_json::Value::String(s.into()))
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Value(serde_json::Value::String(s)) => Some(s),
            _ => None,
        }
    }

    /// Render as a source-text literal.
    pub fn to_source(&self) -> String {
        match self {
            Self::Undefined => "undefined".to_owned(),
            Self::Value(v) => v.to_string(),
        }
    }
}

/// Per-property descriptor captured alongside a property's value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PropertyInfo {
    pub has_value: bool,
    pub configurable: bool,
    pub enumerable: bool,
    pub writable: bool,
    pub get: Option<EntryId>,
    pub set: Option<EntryId>,
}

impl PropertyInfo {
    /// Simple infos may be omitted from emission in favor of direct
    /// assignment.
    pub fn is_simple(&self) -> bool {
        self.enumerable && self.writable && self.configurable && self.get.is_none() && self.set.is_none()
    }
}

/// One property binding: descriptor info plus the value entry. `entry` is
/// `None` while the slot is a pre-installed sentinel guarding recursive
/// layouts.
#[derive(Debug, Clone)]
pub struct PropertySlot {
    pub info: Option<PropertyInfo>,
    pub entry: Option<EntryId>,
}

/// Ordered properties keyed by their key entry (a `json` string or a
/// well-known symbol expression).
pub type PropertyMap = IndexMap<EntryId, PropertySlot>;

#[derive(Debug, Clone, Default)]
pub struct ObjectShape {
    pub env: PropertyMap,
    pub proto: Option<EntryId>,
}

#[derive(Debug, Clone)]
pub struct FunctionShape {
    /// Normalized, name-stripped function expression text.
    pub code: String,
    /// Captured variables in first-insertion order.
    pub captured: IndexMap<String, EntryId>,
    /// Own properties installed on the function object.
    pub env: PropertyMap,
    pub uses_non_lexical_receiver: bool,
    pub proto: Option<EntryId>,
    /// Original name, kept only to improve emitted identifiers.
    pub name: Option<String>,
    /// Declared parameter count; preserved because hosts introspect arity.
    pub param_count: usize,
}

#[derive(Debug, Clone, Default)]
pub struct ArrayShape {
    /// One slot per index up to the array's length; `None` slots are holes.
    pub elements: Vec<Option<EntryId>>,
    /// Non-numeric own properties, in insertion order.
    pub extras: Vec<(String, EntryId)>,
}

#[derive(Debug, Clone, strum::IntoStaticStr)]
pub enum EntryData {
    /// Placeholder installed before recursing into children.
    Pending,
    Json(JsonLiteral),
    /// Opaque source-text expression (intrinsics, `-0`, `NaN`, bigints).
    Expr(String),
    Regexp { source: String, flags: String },
    /// Reference-form module import by normalized name.
    Module(String),
    Function(Box<FunctionShape>),
    Object(ObjectShape),
    Array(ArrayShape),
    Promise(EntryId),
    Output(EntryId),
}

impl EntryData {
    pub fn tag(&self) -> &'static str {
        self.into()
    }
}

/// Arena of IR entries for one serialization.
#[derive(Debug, Default)]
pub struct EntryArena {
    entries: Vec<EntryData>,
}

impl EntryArena {
    pub fn alloc_pending(&mut self) -> EntryId {
        self.alloc(EntryData::Pending)
    }

    pub fn alloc(&mut self, data: EntryData) -> EntryId {
        let id = EntryId::new(self.entries.len());
        self.entries.push(data);
        id
    }

    pub fn get(&self, id: EntryId) -> &EntryData {
        &self.entries[id.index()]
    }

    pub fn get_mut(&mut self, id: EntryId) -> &mut EntryData {
        &mut self.entries[id.index()]
    }

    /// Populate a pending entry. The single-population invariant is the
    /// walker's cycle-breaking contract.
    pub fn populate(&mut self, id: EntryId, data: EntryData) {
        debug_assert!(
            matches!(self.get(id), EntryData::Pending),
            "entry {id:?} populated twice"
        );
        self.entries[id.index()] = data;
    }

    pub fn function(&self, id: EntryId) -> Option<&FunctionShape> {
        match self.get(id) {
            EntryData::Function(shape) => Some(shape),
            _ => None,
        }
    }

    pub fn function_mut(&mut self, id: EntryId) -> Option<&mut FunctionShape> {
        match self.get_mut(id) {
            EntryData::Function(shape) => Some(shape),
            _ => None,
        }
    }

    pub fn object(&self, id: EntryId) -> Option<&ObjectShape> {
        match self.get(id) {
            EntryData::Object(shape) => Some(shape),
            _ => None,
        }
    }

    pub fn object_mut(&mut self, id: EntryId) -> Option<&mut ObjectShape> {
        match self.get_mut(id) {
            EntryData::Object(shape) => Some(shape),
            _ => None,
        }
    }

    /// A `json` entry for a finite number, preferring integer rendering.
    pub fn number_literal(value: f64) -> JsonLiteral {
        if value.fract() == 0.0 && value.abs() < 9_007_199_254_740_992.0 {
            // within the safe-integer range, render without a fraction
            #[expect(clippy::cast_possible_truncation, reason = "fract checked above")]
            let as_int = value as i64;
            JsonLiteral::Value(serde_json::Value::from(as_int))
        } else {
            JsonLiteral::Value(
                serde_json::Number::from_f64(value).map_or(serde_json::Value::Null, serde_json::Value::Number),
            )
        }
    }
}
