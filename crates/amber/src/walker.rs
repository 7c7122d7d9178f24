//! Walks the live object graph into the Entry IR.
//!
//! The walker owns the identity cache and the single-visit discipline:
//! every reference-typed value gets a placeholder entry inserted into the
//! cache before its children are visited, so cycles terminate and every
//! alternate path rediscovers the same entry. Dispatch follows a strict
//! first-match order; see the individual steps below.

use indexmap::IndexMap;
use tracing::debug;

use crate::{
    context::{CacheKey, Context, ContextFrame},
    entry::{
        ArrayShape, EntryArena, EntryData, EntryId, FunctionShape, JsonLiteral, ObjectShape, PropertyInfo,
        PropertySlot,
    },
    error::{ErrorKind, SerializeError},
    freevars::{analyze_function, AnalyzeError, PropertyChain},
    globals::seed_well_known,
    inspect::{Introspector, PropertyDescriptor, RefKind},
    modmap::{ModuleCapture, ModuleMap},
    normalize::{normalize_function_text, NormalizeError},
    rewrite::{rewrite_super_references, SUPER_BINDING},
    value::{ObjId, PropertyKey, Value},
};

type WalkResult<T> = Result<T, SerializeError>;

/// Walker for one serialization call: one context, one cache, one walk.
pub struct ClosureWalker<'a, I: Introspector> {
    insp: &'a I,
    pub arena: EntryArena,
    pub ctx: Context,
    modules: ModuleMap,
    globals: ahash::AHashSet<String>,
    serialize_pred: Option<&'a dyn Fn(&Value) -> bool>,
}

impl<'a, I: Introspector> ClosureWalker<'a, I> {
    pub fn new(insp: &'a I, serialize_pred: Option<&'a dyn Fn(&Value) -> bool>) -> Self {
        let mut walker = Self {
            insp,
            arena: EntryArena::default(),
            ctx: Context::default(),
            modules: ModuleMap::default(),
            globals: insp.global_property_names().into_iter().collect(),
            serialize_pred,
        };
        seed_well_known(insp, &mut walker.ctx, &mut walker.arena);
        walker
    }

    /// Serialize the root callable.
    pub fn serialize_root(&mut self, value: &Value) -> WalkResult<EntryId> {
        let is_function = value
            .as_ref_id()
            .is_some_and(|id| self.insp.kind(id) == RefKind::Function);
        if !is_function {
            return Err(SerializeError::new(
                ErrorKind::UnparseableFunction,
                "the value to serialize is not a function.",
            ));
        }
        let entry = self.get_or_create_entry(value.clone(), &[])?;
        match self.arena.get(entry) {
            EntryData::Function(_) => Ok(entry),
            other => Err(SerializeError::new(
                ErrorKind::UnparseableFunction,
                format!("the root callable serialized to a non-function entry ({}).", other.tag()),
            )),
        }
    }

    /// The walker's single entry point: produce the entry for a live value,
    /// optionally restricted by property-chain hints.
    pub fn get_or_create_entry(&mut self, value: Value, chains: &[PropertyChain]) -> WalkResult<EntryId> {
        // Numbers come before the cache: the non-JSON cases (`-0`, `NaN`,
        // the infinities) would collide with ordinary keys in an identity
        // map keyed on numeric value.
        if let Value::Number(n) = value {
            return Ok(self.arena.alloc(number_entry(n)));
        }

        // cache hit; objects may need widening for new chains
        if let Some(key) = CacheKey::of(&value) {
            if let Some(&entry) = self.ctx.cache.get(&key) {
                if !chains.is_empty() && matches!(self.arena.get(entry), EntryData::Object(_)) {
                    let id = value.as_ref_id().expect("object cache key");
                    self.serialize_object_worker(id, entry, chains)?;
                }
                return Ok(entry);
            }
        }

        // a callable carrying its own doNotCapture marker becomes a stub
        // that throws at runtime
        if let Some(id) = value.as_ref_id() {
            if self.insp.kind(id) == RefKind::Function && self.marker(id, "doNotCapture") {
                return self.stub_function(id);
            }
        }

        // placeholder before recursing, so cycles terminate
        let entry = self.arena.alloc_pending();
        if let Some(key) = CacheKey::of(&value) {
            self.ctx.cache.insert(key, entry);
        }

        if !self.capture_allowed(&value) {
            self.arena.populate(entry, EntryData::Json(JsonLiteral::Undefined));
            return Ok(entry);
        }

        match &value {
            Value::Undefined => {
                self.arena.populate(entry, EntryData::Json(JsonLiteral::Undefined));
                return Ok(entry);
            }
            Value::Null => {
                self.arena
                    .populate(entry, EntryData::Json(JsonLiteral::Value(serde_json::Value::Null)));
                return Ok(entry);
            }
            Value::Bool(b) => {
                self.arena
                    .populate(entry, EntryData::Json(JsonLiteral::Value(serde_json::Value::Bool(*b))));
                return Ok(entry);
            }
            Value::String(s) => {
                self.arena.populate(entry, EntryData::Json(JsonLiteral::string(s.clone())));
                return Ok(entry);
            }
            Value::BigInt(n) => {
                self.arena.populate(entry, EntryData::Expr(format!("{n}n")));
                return Ok(entry);
            }
            Value::Symbol(sym) => {
                let description = self
                    .insp
                    .symbol_description(*sym)
                    .unwrap_or_else(|| "<no description>".to_owned());
                return Err(self.ctx.error(
                    ErrorKind::BrokenInvariant,
                    &format!("it captured the symbol '{description}', and only well-known symbols can be captured."),
                    None,
                ));
            }
            Value::Number(_) => unreachable!("numbers handled above"),
            Value::Ref(_) => {}
        }

        let id = value.as_ref_id().expect("reference value");
        if let RefKind::Regexp = self.insp.kind(id) {
            let (source, flags) = self
                .insp
                .regexp_literal(id)
                .unwrap_or_else(|| (String::new(), String::new()));
            self.arena.populate(entry, EntryData::Regexp { source, flags });
            return Ok(entry);
        }

        // module lookup precedes everything else reference-shaped: exports
        // captured by reference short-circuit the walk entirely
        if let Some(info) = self.modules.lookup(self.insp, &value) {
            if let ModuleCapture::ByReference(name) = info.capture {
                self.arena.populate(entry, EntryData::Module(name));
                return Ok(entry);
            }
            // by-value modules continue through ordinary dispatch
        }

        match self.insp.kind(id) {
            RefKind::Function => self.serialize_function(id, entry),
            RefKind::Deferred => self.serialize_deferred(id, entry),
            RefKind::Promise => {
                let inner = self.insp.await_promise(id).map_err(|e| {
                    self.ctx.error(
                        ErrorKind::BrokenInvariant,
                        &format!("a captured promise could not be resolved: {e}."),
                        None,
                    )
                })?;
                let inner_entry = self.get_or_create_entry(inner, &[])?;
                self.arena.populate(entry, EntryData::Promise(inner_entry));
                Ok(entry)
            }
            RefKind::Array => self.serialize_array(id, entry),
            RefKind::Regexp => unreachable!("regexps handled above"),
            RefKind::Object => {
                if self.insp.class_tag(id) == "[object Arguments]" {
                    return self.serialize_arguments_like(id, entry);
                }
                self.arena.populate(entry, EntryData::Object(ObjectShape::default()));
                self.serialize_object_worker(id, entry, chains)?;
                Ok(entry)
            }
        }
    }

    // === predicates and markers ===

    fn marker(&self, id: ObjId, name: &str) -> bool {
        self.insp.own_property(id, &PropertyKey::string(name)).is_truthy()
    }

    fn proto_chain_marked(&self, id: ObjId) -> bool {
        let mut current = self.insp.prototype_of(id);
        while let Some(pid) = current.as_ref_id() {
            if self.marker(pid, "doNotCapture") {
                return true;
            }
            current = self.insp.prototype_of(pid);
        }
        false
    }

    fn capture_allowed(&self, value: &Value) -> bool {
        if let Some(pred) = self.serialize_pred {
            if !pred(value) {
                return false;
            }
        }
        if let Some(id) = value.as_ref_id() {
            if self.marker(id, "doNotCapture") {
                return false;
            }
            if self.insp.kind(id) == RefKind::Function && self.proto_chain_marked(id) {
                return false;
            }
        }
        true
    }

    // === callables ===

    fn serialize_function(&mut self, id: ObjId, entry: EntryId) -> WalkResult<EntryId> {
        let location = self.insp.source_location(id);
        self.ctx.frames.push(ContextFrame::Function {
            name: None,
            location,
        });

        let source = self.insp.source_text(id).map_err(|e| {
            self.ctx
                .error(ErrorKind::UnparseableFunction, &format!("{e}."), None)
        })?;
        let normalized = normalize_function_text(&source).map_err(|e| {
            let kind = match &e {
                NormalizeError::Parse(_) => ErrorKind::Parse,
                _ => ErrorKind::UnparseableFunction,
            };
            self.ctx.error(kind, &e.to_string(), Some(&source))
        })?;
        if let Some(ContextFrame::Function { name, .. }) = self.ctx.frames.last_mut() {
            name.clone_from(&normalized.declaration_name);
        }
        debug!(name = ?normalized.declaration_name, "serializing function");

        let free_vars = {
            let globals = &self.globals;
            analyze_function(normalized.analysis_text(), &|name| globals.contains(name)).map_err(|e| {
                let kind = match &e {
                    AnalyzeError::ArrowCapturedThis => ErrorKind::MissingCapture,
                    _ => ErrorKind::Parse,
                };
                self.ctx.error(kind, &e.to_string(), Some(&source))
            })?
        };

        let mut shape = FunctionShape {
            code: normalized.expr_text.clone(),
            captured: IndexMap::new(),
            env: IndexMap::new(),
            uses_non_lexical_receiver: free_vars.uses_non_lexical_receiver,
            proto: None,
            name: normalized.declaration_name.clone(),
            param_count: normalized.param_count,
        };

        // captured variables, required then optional
        for (name, chains) in &free_vars.required {
            let Some(value) = self.insp.lookup_captured_variable(id, name) else {
                return Err(self.ctx.error(
                    ErrorKind::MissingCapture,
                    &format!("it captured variable '{name}' which could not be found in any enclosing scope."),
                    Some(&source),
                ));
            };
            let captured = self.capture_value(name, value, chains)?;
            shape.captured.insert(name.clone(), captured);
        }
        for (name, chains) in &free_vars.optional {
            if shape.captured.contains_key(name) {
                continue;
            }
            if let Some(value) = self.insp.lookup_captured_variable(id, name) {
                let captured = self.capture_value(name, value, chains)?;
                shape.captured.insert(name.clone(), captured);
            }
        }

        // prototype: skipped for the default function prototype, async
        // functions, and callables descending from a non-capturable ancestor
        let proto = self.insp.prototype_of(id);
        let is_class = source.trim_start().starts_with("class ") || source.trim_start().starts_with("class{");
        if !proto.identical(&self.insp.default_function_prototype())
            && !normalized.is_async
            && !self.proto_chain_marked(id)
        {
            let proto_entry = self.get_or_create_entry(proto, &[])?;
            shape.proto = Some(proto_entry);
            if is_class {
                // derived class constructor: route every member's `super`
                // through the base-class binding
                self.register_class_members(id, proto_entry);
                shape.code = rewrite_super_references(&shape.code, false);
                shape.captured.insert(SUPER_BINDING.to_owned(), proto_entry);
            }
        }

        // own properties, minus the runtime-managed ones
        for descriptor in self.insp.own_property_descriptors(id) {
            match descriptor.key.as_str() {
                Some("length" | "name") => continue,
                Some("prototype") => {
                    let prototype_value = descriptor.value.clone().unwrap_or_default();
                    if self.is_default_prototype_object(id, &prototype_value) {
                        continue;
                    }
                }
                _ => {}
            }
            let key_entry = self.key_entry(&descriptor.key)?;
            let info = self.property_info(&descriptor)?;
            let value = descriptor.value.clone().unwrap_or_default();
            let value_entry = self.get_or_create_entry(value, &[])?;
            shape.env.insert(
                key_entry,
                PropertySlot {
                    info: if info.is_simple() { None } else { Some(info) },
                    entry: Some(value_entry),
                },
            );
        }

        // class members registered by a derived constructor get the
        // synthesized super binding
        if let Some(&base) = self.ctx.instance_member_base.get(&id) {
            shape.code = rewrite_super_references(&shape.code, false);
            shape.captured.insert(SUPER_BINDING.to_owned(), base);
        } else if let Some(&base) = self.ctx.static_member_base.get(&id) {
            shape.code = rewrite_super_references(&shape.code, true);
            shape.captured.insert(SUPER_BINDING.to_owned(), base);
        }

        // named functions bind their own name so recursion still resolves
        // after name stripping
        if let Some(name) = &normalized.declaration_name {
            shape.captured.insert(name.clone(), entry);
        }

        // capture-free functions with identical code collapse into one
        let simple = shape.captured.is_empty() && shape.env.is_empty() && shape.proto.is_none();
        if simple {
            for &candidate in &self.ctx.simple_functions {
                if let Some(existing) = self.arena.function(candidate) {
                    if existing.code == shape.code
                        && existing.uses_non_lexical_receiver == shape.uses_non_lexical_receiver
                    {
                        self.arena.populate(entry, EntryData::Function(Box::new(shape)));
                        if let Some(key) = CacheKey::of(&Value::Ref(id)) {
                            self.ctx.cache.insert(key, candidate);
                        }
                        self.ctx.frames.pop();
                        return Ok(candidate);
                    }
                }
            }
        }
        self.arena.populate(entry, EntryData::Function(Box::new(shape)));
        if simple {
            self.ctx.simple_functions.push(entry);
        }
        self.ctx.frames.pop();
        Ok(entry)
    }

    fn capture_value(&mut self, name: &str, value: Value, chains: &[PropertyChain]) -> WalkResult<EntryId> {
        let frame = match self.modules.lookup(self.insp, &value) {
            Some(info) => ContextFrame::CapturedModule {
                name: info.name,
                deployment_only: info.deployment_only,
            },
            None => ContextFrame::CapturedVariable(name.to_owned()),
        };
        self.ctx.frames.push(frame);
        let entry = self.get_or_create_entry(value, chains)?;
        self.ctx.frames.pop();
        Ok(entry)
    }

    /// Is `prototype_value` the untouched auto-created prototype object of
    /// `func`: a single own `constructor` property pointing back at `func`?
    fn is_default_prototype_object(&self, func: ObjId, prototype_value: &Value) -> bool {
        let Some(pid) = prototype_value.as_ref_id() else {
            return false;
        };
        let descriptors = self.insp.own_property_descriptors(pid);
        if descriptors.len() != 1 {
            return false;
        }
        let Some("constructor") = descriptors[0].key.as_str() else {
            return false;
        };
        self.insp
            .own_property(pid, &PropertyKey::string("constructor"))
            .identical(&Value::Ref(func))
    }

    /// Record the base-class entry for every own method of a derived class
    /// constructor (static side) and of its prototype object (instance
    /// side), so those methods capture `__super` when serialized.
    fn register_class_members(&mut self, ctor: ObjId, base: EntryId) {
        let mut register = |descriptors: Vec<PropertyDescriptor>, map_static: bool, walker: &mut Self| {
            for descriptor in descriptors {
                for candidate in [&descriptor.value, &descriptor.get, &descriptor.set] {
                    let Some(Value::Ref(member)) = candidate else {
                        continue;
                    };
                    if *member == ctor || walker.insp.kind(*member) != RefKind::Function {
                        continue;
                    }
                    if map_static {
                        walker.ctx.static_member_base.insert(*member, base);
                    } else {
                        walker.ctx.instance_member_base.insert(*member, base);
                    }
                }
            }
        };
        register(self.insp.own_property_descriptors(ctor), true, self);
        if let Value::Ref(prototype) = self.insp.own_property(ctor, &PropertyKey::string("prototype")) {
            register(self.insp.own_property_descriptors(prototype), false, self);
        }
    }

    fn stub_function(&mut self, id: ObjId) -> WalkResult<EntryId> {
        let entry = self.arena.alloc_pending();
        self.ctx.cache.insert(CacheKey::Obj(id), entry);
        let name = self
            .insp
            .source_text(id)
            .ok()
            .and_then(|source| normalize_function_text(&source).ok())
            .and_then(|normalized| normalized.declaration_name);
        let location = self.insp.source_location(id);
        let label = match (&name, location.is_known()) {
            (Some(name), true) => format!("'{name}': {location}"),
            (Some(name), false) => format!("'{name}'"),
            (None, true) => format!("at {location}"),
            (None, false) => "'<anonymous>'".to_owned(),
        };
        let message = serde_json::Value::String(format!(
            "Function {label} cannot be called at runtime. It can only be used at deployment time."
        ));
        let shape = FunctionShape {
            code: format!("function () {{ throw new Error({message}); }}"),
            captured: IndexMap::new(),
            env: IndexMap::new(),
            uses_non_lexical_receiver: false,
            proto: None,
            name,
            param_count: 0,
        };
        self.arena.populate(entry, EntryData::Function(Box::new(shape)));
        Ok(entry)
    }

    // === arrays ===

    fn serialize_array(&mut self, id: ObjId, entry: EntryId) -> WalkResult<EntryId> {
        let descriptors = self.insp.own_property_descriptors(id);
        let length = descriptors
            .iter()
            .find(|d| d.key.as_str() == Some("length"))
            .and_then(|d| match &d.value {
                Some(Value::Number(n)) => Some(*n as usize),
                _ => None,
            })
            .unwrap_or(0);
        let mut shape = ArrayShape {
            elements: vec![None; length],
            extras: Vec::new(),
        };
        for descriptor in &descriptors {
            if descriptor.key.as_str() == Some("length") {
                continue;
            }
            if let Some(index) = descriptor.key.as_index() {
                let value = descriptor.value.clone().unwrap_or_default();
                let element = self.get_or_create_entry(value, &[])?;
                if index >= shape.elements.len() {
                    shape.elements.resize(index + 1, None);
                }
                shape.elements[index] = Some(element);
            } else if let Some(name) = descriptor.key.as_str() {
                let value = descriptor.value.clone().unwrap_or_default();
                let extra = self.get_or_create_entry(value, &[])?;
                shape.extras.push((name.to_owned(), extra));
            }
        }
        self.arena.populate(entry, EntryData::Array(shape));
        Ok(entry)
    }

    /// Arguments-like objects flatten to a dense array.
    fn serialize_arguments_like(&mut self, id: ObjId, entry: EntryId) -> WalkResult<EntryId> {
        let descriptors = self.insp.own_property_descriptors(id);
        let mut indexed: Vec<(usize, Value)> = descriptors
            .iter()
            .filter_map(|d| Some((d.key.as_index()?, d.value.clone().unwrap_or_default())))
            .collect();
        indexed.sort_by_key(|(index, _)| *index);
        let mut shape = ArrayShape::default();
        for (_, value) in indexed {
            let element = self.get_or_create_entry(value, &[])?;
            shape.elements.push(Some(element));
        }
        self.arena.populate(entry, EntryData::Array(shape));
        Ok(entry)
    }

    // === deferred values ===

    fn serialize_deferred(&mut self, id: ObjId, entry: EntryId) -> WalkResult<EntryId> {
        let info = self.insp.deferred_info(id).ok_or_else(|| {
            self.ctx
                .error(ErrorKind::BrokenInvariant, "a deferred value lost its payload.", None)
        })?;
        if info.secret {
            self.ctx.contains_secrets = true;
        }
        let value_entry = self.get_or_create_entry(info.value, &[])?;
        // the wrapper is serialized while still empty, then the settled
        // value is spliced into its single `value` property; this avoids
        // the infinite regress of hosts that surface live values through
        // the wrapper itself
        let wrapper_entry = self.get_or_create_entry(info.wrapper, &[])?;
        let wrapper_key = self
            .arena
            .object(wrapper_entry)
            .filter(|shape| shape.env.len() == 1)
            .and_then(|shape| shape.env.keys().next().copied());
        let key_is_value = wrapper_key
            .is_some_and(|key| matches!(self.arena.get(key), EntryData::Json(lit) if lit.as_str() == Some("value")));
        if !key_is_value {
            return Err(self.ctx.error(
                ErrorKind::BrokenInvariant,
                "the deferred-value wrapper no longer has exactly one 'value' property.",
                None,
            ));
        }
        let shape = self.arena.object_mut(wrapper_entry).expect("wrapper object");
        if let Some(slot) = shape.env.values_mut().next() {
            slot.entry = Some(value_entry);
        }
        self.arena.populate(entry, EntryData::Output(wrapper_entry));
        Ok(entry)
    }

    // === ordinary objects ===

    /// Serialize (or widen) an object entry's properties. Empty `chains`
    /// means materialize everything.
    fn serialize_object_worker(&mut self, id: ObjId, entry: EntryId, chains: &[PropertyChain]) -> WalkResult<()> {
        if chains.is_empty() || chains.iter().any(|chain| chain.is_empty()) {
            return self.materialize_all(id, entry);
        }
        if self.serialize_subset(id, entry, chains)? {
            // receiver escape: the partial env would lose the invocation
            // receiver, so drop it and materialize everything
            debug!(?id, "receiver escape, re-materializing object");
            if let Some(shape) = self.arena.object_mut(entry) {
                shape.env.clear();
            }
            return self.materialize_all(id, entry);
        }
        Ok(())
    }

    fn materialize_all(&mut self, id: ObjId, entry: EntryId) -> WalkResult<()> {
        for descriptor in self.insp.own_property_descriptors(id) {
            // a slot that already exists is either mid-flight (sentinel on
            // a self-recursive path) or already serialized; leave it alone
            if self.find_slot(entry, &descriptor.key).is_some() {
                continue;
            }
            let key_entry = self.key_entry(&descriptor.key)?;
            if let Some(shape) = self.arena.object_mut(entry) {
                shape.env.insert(key_entry, PropertySlot { info: None, entry: None });
            }
            let info = self.property_info(&descriptor)?;
            let value = descriptor.value.clone().unwrap_or_default();
            let value_entry = self.get_or_create_entry(value, &[])?;
            if let Some(shape) = self.arena.object_mut(entry) {
                shape.env.insert(
                    key_entry,
                    PropertySlot {
                        info: if info.is_simple() { None } else { Some(info) },
                        entry: Some(value_entry),
                    },
                );
            }
        }
        let needs_proto = self
            .arena
            .object_mut(entry)
            .is_some_and(|shape| shape.proto.is_none());
        if needs_proto {
            let proto = self.insp.prototype_of(id);
            if !proto.identical(&self.insp.default_object_prototype()) {
                let proto_entry = self.get_or_create_entry(proto, &[])?;
                if let Some(shape) = self.arena.object_mut(entry) {
                    shape.proto = Some(proto_entry);
                }
            }
        }
        Ok(())
    }

    /// Returns true when the receiver-escape rule fired and the caller
    /// must re-materialize the whole object.
    fn serialize_subset(&mut self, id: ObjId, entry: EntryId, chains: &[PropertyChain]) -> WalkResult<bool> {
        // group chains by their first step; a one-step chain means the
        // whole property value is needed, overriding any deeper tails
        #[derive(Default)]
        struct Group {
            tails: Vec<PropertyChain>,
            invoked: bool,
            full: bool,
        }
        let mut groups: IndexMap<String, Group> = IndexMap::new();
        for chain in chains {
            let Some(first) = chain.first() else {
                continue;
            };
            let group = groups.entry(first.name.clone()).or_default();
            if chain.len() > 1 {
                group.tails.push(chain[1..].iter().cloned().collect());
            } else {
                group.full = true;
            }
            group.invoked |= first.invoked;
        }

        let descriptors = self.insp.own_property_descriptors(id);
        for (name, group) in groups {
            let tails = if group.full { Vec::new() } else { group.tails };
            let invoked = group.invoked;
            let key = PropertyKey::string(&name);
            let descriptor = descriptors.iter().find(|d| d.key == key);
            let existing = self.find_slot(entry, &key);
            let key_entry = match existing {
                Some(key_entry) => key_entry,
                None => {
                    let key_entry = self.key_entry(&key)?;
                    if let Some(shape) = self.arena.object_mut(entry) {
                        shape.env.insert(key_entry, PropertySlot { info: None, entry: None });
                    }
                    key_entry
                }
            };
            let Some(descriptor) = descriptor else {
                // the chain named a property the object does not own
                if existing.is_none() {
                    if let Some(shape) = self.arena.object_mut(entry) {
                        shape.env.shift_remove(&key_entry);
                    }
                }
                continue;
            };
            let info = self.property_info(descriptor)?;
            let value = descriptor.value.clone().unwrap_or_default();
            let value_entry = self.get_or_create_entry(value, &tails)?;
            if invoked && (self.entry_uses_receiver(value_entry) || self.accessor_uses_receiver(&info)) {
                return Ok(true);
            }
            if let Some(shape) = self.arena.object_mut(entry) {
                shape.env.insert(
                    key_entry,
                    PropertySlot {
                        info: if info.is_simple() { None } else { Some(info) },
                        entry: Some(value_entry),
                    },
                );
            }
        }
        Ok(false)
    }

    fn entry_uses_receiver(&self, entry: EntryId) -> bool {
        self.arena
            .function(entry)
            .is_some_and(|shape| shape.uses_non_lexical_receiver)
    }

    fn accessor_uses_receiver(&self, info: &PropertyInfo) -> bool {
        info.get.is_some_and(|get| self.entry_uses_receiver(get))
            || info.set.is_some_and(|set| self.entry_uses_receiver(set))
    }

    // === property plumbing ===

    fn property_info(&mut self, descriptor: &PropertyDescriptor) -> WalkResult<PropertyInfo> {
        let get = match &descriptor.get {
            Some(get) => Some(self.get_or_create_entry(get.clone(), &[])?),
            None => None,
        };
        let set = match &descriptor.set {
            Some(set) => Some(self.get_or_create_entry(set.clone(), &[])?),
            None => None,
        };
        Ok(PropertyInfo {
            has_value: descriptor.has_value(),
            configurable: descriptor.configurable,
            enumerable: descriptor.enumerable,
            writable: descriptor.writable,
            get,
            set,
        })
    }

    /// Entry for a property key: a fresh `json` string, or the cached
    /// well-known symbol expression.
    fn key_entry(&mut self, key: &PropertyKey) -> WalkResult<EntryId> {
        match key {
            PropertyKey::String(s) => Ok(self.arena.alloc(EntryData::Json(JsonLiteral::string(s.clone())))),
            PropertyKey::Symbol(sym) => self.get_or_create_entry(Value::Symbol(*sym), &[]),
        }
    }

    /// Find the existing env slot whose key entry denotes `key`, comparing
    /// by key value rather than entry identity.
    fn find_slot(&self, entry: EntryId, key: &PropertyKey) -> Option<EntryId> {
        let symbol_entry = match key {
            PropertyKey::Symbol(sym) => self.ctx.cache.get(&CacheKey::Sym(*sym)).copied(),
            PropertyKey::String(_) => None,
        };
        let shape = match self.arena.get(entry) {
            EntryData::Object(shape) => shape,
            _ => return None,
        };
        for &key_entry in shape.env.keys() {
            let matches = match key {
                PropertyKey::String(s) => {
                    matches!(self.arena.get(key_entry), EntryData::Json(lit) if lit.as_str() == Some(s.as_str()))
                }
                PropertyKey::Symbol(_) => symbol_entry == Some(key_entry),
            };
            if matches {
                return Some(key_entry);
            }
        }
        None
    }
}

/// Step one of dispatch: the four non-JSON numbers become expressions,
/// everything else a `json` literal.
fn number_entry(n: f64) -> EntryData {
    if n.is_nan() {
        EntryData::Expr("NaN".to_owned())
    } else if n == f64::INFINITY {
        EntryData::Expr("Infinity".to_owned())
    } else if n == f64::NEG_INFINITY {
        EntryData::Expr("-Infinity".to_owned())
    } else if n == 0.0 && n.is_sign_negative() {
        EntryData::Expr("-0".to_owned())
    } else {
        EntryData::Json(EntryArena::number_literal(n))
    }
}
