//! A synthetic host: an arena-backed object graph implementing
//! [`Introspector`].
//!
//! The serializer core never touches a real runtime; it sees values only
//! through the introspection trait. `Mirror` is the reference host: test
//! suites and embedders build object graphs with the methods here (objects,
//! functions with source text and scope chains, arrays, regexps, promises,
//! deferred handles, modules) and then hand the mirror to
//! [`serialize_closure`](crate::serialize_closure).

use indexmap::IndexMap;

use crate::{
    heap::{ArrayData, FunctionData, Heap, HeapData, ObjectData, OwnProperty},
    inspect::{DeferredInfo, Introspector, IntrospectError, ModuleCacheEntry, PropertyDescriptor, RefKind},
    value::{ObjId, PropertyKey, SourceLocation, SymbolId, Value},
};

/// The closed set of host-standard built-in module names.
pub const BUILT_IN_MODULE_NAMES: &[&str] = &[
    "assert",
    "buffer",
    "child_process",
    "cluster",
    "console",
    "constants",
    "crypto",
    "dgram",
    "dns",
    "domain",
    "events",
    "fs",
    "http",
    "https",
    "module",
    "net",
    "os",
    "path",
    "process",
    "punycode",
    "querystring",
    "readline",
    "repl",
    "stream",
    "string_decoder",
    "timers",
    "tls",
    "tty",
    "url",
    "util",
    "v8",
    "vm",
    "zlib",
];

/// Runtime sources for the deferred-value wrapper class. The emitter and
/// the deserialization environment both depend on the `value` property and
/// the `get`/`apply` method pair.
const WRAPPER_CTOR_SOURCE: &str = "function (value) { this.value = value; }";
const WRAPPER_APPLY_SOURCE: &str = "function () { throw new Error(\"'apply' is not allowed from inside a captured callback. Use 'get' to retrieve the value of this output directly.\"); }";
const WRAPPER_GET_SOURCE: &str = "function () { return this.value; }";

struct WrapperClass {
    prototype: ObjId,
}

/// Synthetic host graph plus the intrinsic objects every host carries.
pub struct Mirror {
    heap: Heap,
    object_prototype: ObjId,
    function_prototype: ObjId,
    generator_function_prototype: ObjId,
    global: ObjId,
    iterator_symbol: SymbolId,
    wrapper_class: Option<WrapperClass>,
    builtin_modules: IndexMap<String, ObjId>,
    module_cache: Vec<(String, Value)>,
    cwd: String,
}

impl Default for Mirror {
    fn default() -> Self {
        Self::new()
    }
}

impl Mirror {
    pub fn new() -> Self {
        let mut heap = Heap::default();
        let object_prototype = heap.alloc(HeapData::Object(ObjectData::default()));
        let function_prototype = heap.alloc(HeapData::Object(ObjectData {
            proto: Value::Ref(object_prototype),
            ..ObjectData::default()
        }));
        let global = heap.alloc(HeapData::Object(ObjectData {
            proto: Value::Ref(object_prototype),
            ..ObjectData::default()
        }));
        let generator_function_prototype = heap.alloc(HeapData::Object(ObjectData {
            proto: Value::Ref(function_prototype),
            ..ObjectData::default()
        }));
        let generator_prototype = heap.alloc(HeapData::Object(ObjectData {
            proto: Value::Ref(object_prototype),
            ..ObjectData::default()
        }));
        match heap.get_mut(generator_function_prototype) {
            HeapData::Object(data) => {
                data.props.insert(
                    PropertyKey::string("prototype"),
                    OwnProperty {
                        enumerable: false,
                        ..OwnProperty::simple(Value::Ref(generator_prototype))
                    },
                );
            }
            _ => unreachable!(),
        }
        let iterator_symbol = SymbolId::new(heap.alloc_symbol(Some("Symbol.iterator".to_owned())));

        let mut mirror = Self {
            heap,
            object_prototype,
            function_prototype,
            generator_function_prototype,
            global,
            iterator_symbol,
            wrapper_class: None,
            builtin_modules: IndexMap::new(),
            module_cache: Vec::new(),
            cwd: "/work/app".to_owned(),
        };
        mirror.install_intrinsics();
        for name in BUILT_IN_MODULE_NAMES {
            let exports = mirror.object();
            mirror.builtin_modules.insert((*name).to_owned(), exports);
        }
        mirror
    }

    fn install_intrinsics(&mut self) {
        let object_proto = self.object_prototype;
        let function_proto = self.function_prototype;
        self.install_native_ctor("Object", object_proto);
        self.install_native_ctor("Function", function_proto);
        for name in ["Array", "Number", "String", "Boolean", "Promise", "Symbol", "RegExp", "Error", "Date"] {
            let proto = self.object();
            self.install_native_ctor(name, proto);
        }
        for name in ["Math", "JSON", "console", "Reflect"] {
            let ns = self.object();
            self.global_set(name, Value::Ref(ns));
        }
        self.global_set("NaN", Value::Number(f64::NAN));
        self.global_set("Infinity", Value::Number(f64::INFINITY));
        self.global_set("undefined", Value::Undefined);
        self.global_set("global", Value::Ref(self.global));
        for name in ["parseInt", "parseFloat", "isNaN", "isFinite"] {
            let func = self.native_function(name);
            self.global_set(name, Value::Ref(func));
        }
    }

    fn native_function(&mut self, name: &str) -> ObjId {
        let source = format!("function {name}() {{ [native code] }}");
        self.heap.alloc(HeapData::Function(FunctionData {
            source,
            location: SourceLocation::default(),
            scope: Vec::new(),
            props: IndexMap::new(),
            proto: Value::Ref(self.function_prototype),
        }))
    }

    fn install_native_ctor(&mut self, name: &str, prototype: ObjId) {
        let ctor = self.native_function(name);
        self.heap
            .function_mut(ctor)
            .props
            .insert(PropertyKey::string("prototype"), OwnProperty {
                writable: false,
                enumerable: false,
                configurable: false,
                ..OwnProperty::simple(Value::Ref(prototype))
            });
        self.heap.object_mut(prototype).props.insert(
            PropertyKey::string("constructor"),
            OwnProperty {
                enumerable: false,
                ..OwnProperty::simple(Value::Ref(ctor))
            },
        );
        self.global_set(name, Value::Ref(ctor));
    }

    // === graph builders ===

    pub fn object(&mut self) -> ObjId {
        let proto = Value::Ref(self.object_prototype);
        self.object_with_proto(proto)
    }

    pub fn object_with_proto(&mut self, proto: Value) -> ObjId {
        self.heap.alloc(HeapData::Object(ObjectData {
            proto,
            ..ObjectData::default()
        }))
    }

    /// Set a plain (writable/enumerable/configurable) string-keyed property.
    pub fn set(&mut self, obj: ObjId, key: &str, value: Value) {
        self.define(obj, PropertyKey::string(key), OwnProperty::simple(value));
    }

    pub fn define(&mut self, obj: ObjId, key: PropertyKey, prop: OwnProperty) {
        if let HeapData::Array(data) = self.heap.get_mut(obj) {
            if let Some(index) = key.as_index() {
                if let Some(value) = prop.value {
                    data.elements.insert(index, value);
                    data.length = data.length.max(index + 1);
                }
                return;
            }
        }
        self.heap
            .props_mut(obj)
            .expect("value has no property table")
            .insert(key, prop);
    }

    pub fn set_proto(&mut self, obj: ObjId, proto: Value) {
        match self.heap.get_mut(obj) {
            HeapData::Object(data) => data.proto = proto,
            HeapData::Function(data) => data.proto = proto,
            HeapData::Array(data) => data.proto = proto,
            _ => {}
        }
    }

    /// Allocate a function from source text. A fresh `prototype` object
    /// with a `constructor` back-reference is installed, matching what the
    /// runtime gives every plain function.
    pub fn function(&mut self, source: &str) -> ObjId {
        self.function_at(source, SourceLocation::default())
    }

    pub fn function_at(&mut self, source: &str, location: SourceLocation) -> ObjId {
        let func = self.heap.alloc(HeapData::Function(FunctionData {
            source: source.to_owned(),
            location,
            scope: Vec::new(),
            props: IndexMap::new(),
            proto: Value::Ref(self.function_prototype),
        }));
        let prototype = self.object();
        self.heap.object_mut(prototype).props.insert(
            PropertyKey::string("constructor"),
            OwnProperty {
                enumerable: false,
                ..OwnProperty::simple(Value::Ref(func))
            },
        );
        self.heap.function_mut(func).props.insert(
            PropertyKey::string("prototype"),
            OwnProperty {
                enumerable: false,
                configurable: false,
                ..OwnProperty::simple(Value::Ref(prototype))
            },
        );
        func
    }

    /// Bind `name` in the function's innermost scope frame.
    pub fn bind(&mut self, func: ObjId, name: &str, value: Value) {
        let data = self.heap.function_mut(func);
        if data.scope.is_empty() {
            data.scope.push(IndexMap::new());
        }
        data.scope[0].insert(name.to_owned(), value);
    }

    /// Push an additional (outer) scope frame.
    pub fn push_outer_scope(&mut self, func: ObjId) {
        self.heap.function_mut(func).scope.push(IndexMap::new());
    }

    pub fn array(&mut self, length: usize) -> ObjId {
        self.heap.alloc(HeapData::Array(ArrayData {
            length,
            elements: std::collections::BTreeMap::new(),
            props: IndexMap::new(),
            proto: Value::Ref(self.object_prototype),
        }))
    }

    pub fn array_set(&mut self, arr: ObjId, index: usize, value: Value) {
        let data = self.heap.array_mut(arr);
        data.elements.insert(index, value);
        data.length = data.length.max(index + 1);
    }

    pub fn dense_array(&mut self, values: &[Value]) -> ObjId {
        let arr = self.array(values.len());
        for (i, v) in values.iter().enumerate() {
            self.array_set(arr, i, v.clone());
        }
        arr
    }

    pub fn regexp(&mut self, source: &str, flags: &str) -> ObjId {
        self.heap.alloc(HeapData::Regexp {
            source: source.to_owned(),
            flags: flags.to_owned(),
        })
    }

    /// A promise already settled with `resolved`.
    pub fn promise(&mut self, resolved: Value) -> ObjId {
        self.heap.alloc(HeapData::Promise { resolved })
    }

    pub fn symbol(&mut self, description: &str) -> SymbolId {
        SymbolId::new(self.heap.alloc_symbol(Some(description.to_owned())))
    }

    /// An arguments-like object: dense values under the
    /// `[object Arguments]` class tag.
    pub fn arguments_object(&mut self, values: &[Value]) -> ObjId {
        let mut props = IndexMap::new();
        for (i, v) in values.iter().enumerate() {
            props.insert(PropertyKey::string(i.to_string()), OwnProperty::simple(v.clone()));
        }
        props.insert(
            PropertyKey::string("length"),
            OwnProperty {
                enumerable: false,
                ..OwnProperty::simple(Value::Number(values.len() as f64))
            },
        );
        self.heap.alloc(HeapData::Object(ObjectData {
            props,
            proto: Value::Ref(self.object_prototype),
            class_tag: Some("[object Arguments]".to_owned()),
        }))
    }

    /// A deferred handle (host "Output") settled with `value`.
    pub fn deferred(&mut self, value: Value, secret: bool) -> ObjId {
        let prototype = self.ensure_wrapper_class();
        let wrapper = self.object_with_proto(Value::Ref(prototype));
        self.set(wrapper, "value", Value::Undefined);
        self.heap.alloc(HeapData::Deferred { value, secret, wrapper })
    }

    fn ensure_wrapper_class(&mut self) -> ObjId {
        if let Some(class) = &self.wrapper_class {
            return class.prototype;
        }
        let ctor = self.function(WRAPPER_CTOR_SOURCE);
        let apply = self.function(WRAPPER_APPLY_SOURCE);
        let get = self.function(WRAPPER_GET_SOURCE);
        let prototype = self.object();
        self.heap.object_mut(prototype).props.insert(
            PropertyKey::string("constructor"),
            OwnProperty {
                enumerable: false,
                ..OwnProperty::simple(Value::Ref(ctor))
            },
        );
        self.set(prototype, "apply", Value::Ref(apply));
        self.set(prototype, "get", Value::Ref(get));
        self.define(ctor, PropertyKey::string("prototype"), OwnProperty {
            enumerable: false,
            configurable: false,
            ..OwnProperty::simple(Value::Ref(prototype))
        });
        self.wrapper_class = Some(WrapperClass { prototype });
        prototype
    }

    /// Mark a value as non-capturable; the walker serializes it as a stub
    /// that throws at runtime.
    pub fn mark_do_not_capture(&mut self, obj: ObjId) {
        self.set(obj, "doNotCapture", Value::Bool(true));
    }

    /// Mark a module's exports as usable at deployment time only.
    pub fn mark_deployment_only(&mut self, exports: ObjId) {
        self.set(exports, "deploymentOnlyModule", Value::Bool(true));
    }

    /// Register a module in the host's module cache.
    pub fn register_module(&mut self, path: &str, exports: Value) {
        self.module_cache.push((path.to_owned(), exports));
    }

    /// Exports object of a pre-wired built-in module.
    pub fn builtin_exports(&self, name: &str) -> Option<ObjId> {
        self.builtin_modules.get(name).copied()
    }

    pub fn set_cwd(&mut self, cwd: &str) {
        self.cwd = cwd.to_owned();
    }

    pub fn global(&self) -> ObjId {
        self.global
    }

    pub fn global_set(&mut self, name: &str, value: Value) {
        let key = PropertyKey::string(name);
        let prop = OwnProperty::simple(value);
        self.heap.object_mut(self.global).props.insert(key, prop);
    }

    fn descriptor_from(&self, key: PropertyKey, prop: &OwnProperty) -> PropertyDescriptor {
        PropertyDescriptor {
            key,
            value: prop.value.clone(),
            get: prop.get.clone(),
            set: prop.set.clone(),
            writable: prop.writable,
            enumerable: prop.enumerable,
            configurable: prop.configurable,
        }
    }
}

impl Introspector for Mirror {
    fn kind(&self, id: ObjId) -> RefKind {
        match self.heap.get(id) {
            HeapData::Object(_) => RefKind::Object,
            HeapData::Function(_) => RefKind::Function,
            HeapData::Array(_) => RefKind::Array,
            HeapData::Regexp { .. } => RefKind::Regexp,
            HeapData::Promise { .. } => RefKind::Promise,
            HeapData::Deferred { .. } => RefKind::Deferred,
        }
    }

    fn source_text(&self, func: ObjId) -> Result<String, IntrospectError> {
        match self.heap.get(func) {
            HeapData::Function(data) => Ok(data.source.clone()),
            _ => Err(IntrospectError::new("value is not callable")),
        }
    }

    fn source_location(&self, func: ObjId) -> SourceLocation {
        match self.heap.get(func) {
            HeapData::Function(data) => data.location.clone(),
            _ => SourceLocation::default(),
        }
    }

    fn lookup_captured_variable(&self, func: ObjId, name: &str) -> Option<Value> {
        match self.heap.get(func) {
            HeapData::Function(data) => {
                for frame in &data.scope {
                    if let Some(value) = frame.get(name) {
                        return Some(value.clone());
                    }
                }
                None
            }
            _ => None,
        }
    }

    fn prototype_of(&self, id: ObjId) -> Value {
        match self.heap.get(id) {
            HeapData::Object(data) => data.proto.clone(),
            HeapData::Function(data) => data.proto.clone(),
            HeapData::Array(data) => data.proto.clone(),
            _ => Value::Ref(self.object_prototype),
        }
    }

    fn own_property_descriptors(&self, id: ObjId) -> Vec<PropertyDescriptor> {
        match self.heap.get(id) {
            HeapData::Array(data) => {
                let mut out = Vec::new();
                for (index, value) in &data.elements {
                    out.push(PropertyDescriptor {
                        key: PropertyKey::string(index.to_string()),
                        value: Some(value.clone()),
                        get: None,
                        set: None,
                        writable: true,
                        enumerable: true,
                        configurable: true,
                    });
                }
                out.push(PropertyDescriptor {
                    key: PropertyKey::string("length"),
                    value: Some(Value::Number(data.length as f64)),
                    get: None,
                    set: None,
                    writable: true,
                    enumerable: false,
                    configurable: false,
                });
                for (key, prop) in &data.props {
                    out.push(self.descriptor_from(key.clone(), prop));
                }
                out
            }
            _ => self
                .heap
                .props(id)
                .map(|props| {
                    props
                        .iter()
                        .map(|(key, prop)| self.descriptor_from(key.clone(), prop))
                        .collect()
                })
                .unwrap_or_default(),
        }
    }

    fn own_property(&self, id: ObjId, key: &PropertyKey) -> Value {
        if let HeapData::Array(data) = self.heap.get(id) {
            if let Some(index) = key.as_index() {
                return data.elements.get(&index).cloned().unwrap_or_default();
            }
            if key.as_str() == Some("length") {
                return Value::Number(data.length as f64);
            }
        }
        self.heap
            .props(id)
            .and_then(|props| props.get(key))
            .and_then(|prop| prop.value.clone())
            .unwrap_or_default()
    }

    fn class_tag(&self, id: ObjId) -> String {
        match self.heap.get(id) {
            HeapData::Object(data) => data
                .class_tag
                .clone()
                .unwrap_or_else(|| "[object Object]".to_owned()),
            HeapData::Function(_) => "[object Function]".to_owned(),
            HeapData::Array(_) => "[object Array]".to_owned(),
            HeapData::Regexp { .. } => "[object RegExp]".to_owned(),
            HeapData::Promise { .. } => "[object Promise]".to_owned(),
            HeapData::Deferred { .. } => "[object Object]".to_owned(),
        }
    }

    fn regexp_literal(&self, id: ObjId) -> Option<(String, String)> {
        match self.heap.get(id) {
            HeapData::Regexp { source, flags } => Some((source.clone(), flags.clone())),
            _ => None,
        }
    }

    fn symbol_description(&self, sym: SymbolId) -> Option<String> {
        self.heap.symbol_description(sym.index()).map(str::to_owned)
    }

    fn global_object(&self) -> Value {
        Value::Ref(self.global)
    }

    fn default_function_prototype(&self) -> Value {
        Value::Ref(self.function_prototype)
    }

    fn default_object_prototype(&self) -> Value {
        Value::Ref(self.object_prototype)
    }

    fn generator_function_prototype(&self) -> Value {
        Value::Ref(self.generator_function_prototype)
    }

    fn iterator_symbol(&self) -> Value {
        Value::Symbol(self.iterator_symbol)
    }

    fn await_promise(&self, id: ObjId) -> Result<Value, IntrospectError> {
        match self.heap.get(id) {
            HeapData::Promise { resolved } => Ok(resolved.clone()),
            _ => Err(IntrospectError::new("value is not a promise")),
        }
    }

    fn deferred_info(&self, id: ObjId) -> Option<DeferredInfo> {
        match self.heap.get(id) {
            HeapData::Deferred { value, secret, wrapper } => Some(DeferredInfo {
                value: value.clone(),
                secret: *secret,
                wrapper: Value::Ref(*wrapper),
            }),
            _ => None,
        }
    }

    fn built_in_module_names(&self) -> Vec<String> {
        BUILT_IN_MODULE_NAMES.iter().map(|s| (*s).to_owned()).collect()
    }

    fn require_module(&self, name: &str) -> Result<Value, IntrospectError> {
        self.builtin_modules
            .get(name)
            .map(|id| Value::Ref(*id))
            .ok_or_else(|| IntrospectError::new(format!("unknown module '{name}'")))
    }

    fn module_cache(&self) -> Vec<ModuleCacheEntry> {
        self.module_cache
            .iter()
            .map(|(path, exports)| ModuleCacheEntry {
                path: path.clone(),
                exports: exports.clone(),
            })
            .collect()
    }

    fn process_cwd(&self) -> String {
        self.cwd.clone()
    }

    fn global_property_names(&self) -> Vec<String> {
        self.heap
            .object(self.global)
            .props
            .keys()
            .filter_map(|key| key.as_str().map(str::to_owned))
            .collect()
    }
}
