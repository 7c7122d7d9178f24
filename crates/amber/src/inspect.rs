//! The host-runtime introspection contract.
//!
//! Everything the serializer learns about live values flows through
//! [`Introspector`], so the core stays testable against a synthetic host
//! (see [`crate::mirror`]) and portable across real runtimes. Suspension
//! points of the original design (scope-chain queries, promise resolution,
//! module loading) surface here as ordinary fallible calls: the adapter is
//! expected to hand over settled values.

use crate::value::{ObjId, PropertyKey, SourceLocation, SymbolId, Value};

/// Classification of a reference-typed value, driving walker dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefKind {
    Function,
    Array,
    Regexp,
    Promise,
    /// A deferred/computed handle from the host ecosystem (an "Output").
    Deferred,
    Object,
}

/// Normalized own-property descriptor.
///
/// Exactly one of a string name or a symbol is carried by `key`. A data
/// property has `value: Some(..)` (possibly `Some(Value::Undefined)`);
/// accessor properties have `value: None` and at least one of `get`/`set`.
/// The `__proto__` pseudo-property must never appear here.
#[derive(Debug, Clone)]
pub struct PropertyDescriptor {
    pub key: PropertyKey,
    pub value: Option<Value>,
    pub get: Option<Value>,
    pub set: Option<Value>,
    pub writable: bool,
    pub enumerable: bool,
    pub configurable: bool,
}

impl PropertyDescriptor {
    pub fn has_value(&self) -> bool {
        self.value.is_some()
    }

    pub fn is_accessor(&self) -> bool {
        self.get.is_some() || self.set.is_some()
    }
}

/// A resolved deferred value handed over by the host adapter.
#[derive(Debug, Clone)]
pub struct DeferredInfo {
    /// The settled inner value.
    pub value: Value,
    /// Whether the handle was flagged secret.
    pub secret: bool,
    /// A fresh, empty wrapper instance (`value` property still undefined)
    /// whose shape the walker serializes and then splices the inner value
    /// into.
    pub wrapper: Value,
}

/// One entry of the host's loaded-module cache.
#[derive(Debug, Clone)]
pub struct ModuleCacheEntry {
    /// Absolute path of the module file.
    pub path: String,
    /// The module's exported value.
    pub exports: Value,
}

/// Failure reported by the host adapter.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{0}")]
pub struct IntrospectError(pub String);

impl IntrospectError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Read-only window into the host runtime.
pub trait Introspector {
    /// Classify a reference-typed value.
    fn kind(&self, id: ObjId) -> RefKind;

    /// Textual representation of a callable, suitable for normalization.
    fn source_text(&self, func: ObjId) -> Result<String, IntrospectError>;

    /// Best-effort source position; unknown positions return the default.
    fn source_location(&self, func: ObjId) -> SourceLocation;

    /// Search the callable's lexical scope chain for `name`.
    fn lookup_captured_variable(&self, func: ObjId, name: &str) -> Option<Value>;

    fn prototype_of(&self, id: ObjId) -> Value;

    fn own_property_descriptors(&self, id: ObjId) -> Vec<PropertyDescriptor>;

    /// Value of an own property; `Undefined` for accessor descriptors and
    /// missing keys.
    fn own_property(&self, id: ObjId, key: &PropertyKey) -> Value;

    /// Canonical `[object …]` class string; used to detect arguments-likes.
    fn class_tag(&self, id: ObjId) -> String;

    /// Source and flags of a regexp value.
    fn regexp_literal(&self, id: ObjId) -> Option<(String, String)>;

    fn symbol_description(&self, sym: SymbolId) -> Option<String>;

    // --- intrinsics ---

    fn global_object(&self) -> Value;

    /// The intrinsic reachable via `Object.getPrototypeOf` of any plain
    /// non-derived function.
    fn default_function_prototype(&self) -> Value;

    /// The intrinsic reachable via `Object.getPrototypeOf` of any object
    /// literal.
    fn default_object_prototype(&self) -> Value;

    /// `Object.getPrototypeOf(function*(){})`.
    fn generator_function_prototype(&self) -> Value;

    /// The well-known iterator symbol.
    fn iterator_symbol(&self) -> Value;

    // --- asynchronous values ---

    /// Settle a promise and return its resolution; rejections surface as
    /// errors.
    fn await_promise(&self, id: ObjId) -> Result<Value, IntrospectError>;

    /// Deferred-handle payload, if `id` is one.
    fn deferred_info(&self, id: ObjId) -> Option<DeferredInfo>;

    // --- modules ---

    /// The closed set of host-standard module names.
    fn built_in_module_names(&self) -> Vec<String>;

    fn require_module(&self, name: &str) -> Result<Value, IntrospectError>;

    fn module_cache(&self) -> Vec<ModuleCacheEntry>;

    fn process_cwd(&self) -> String;

    /// Names of the ambient global object's properties, used to filter
    /// free variables that resolve globally.
    fn global_property_names(&self) -> Vec<String>;
}
