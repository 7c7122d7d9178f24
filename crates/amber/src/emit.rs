//! Renders the Entry IR into a source-text module.
//!
//! The module text is two buckets: `environment_text` (top-level `var`
//! declarations and post-hoc property statements for shared structures, in
//! dependency order) and `function_text` (generated function
//! declarations), with a single export line placed before or after them
//! depending on factory mode. Reference-typed entries that appear in the
//! environment get exactly one top-level name; everything simple is
//! inlined at its use sites.

use ahash::{AHashMap, AHashSet};
use tracing::debug;

use crate::{
    entry::{ArrayShape, EntryArena, EntryData, EntryId, ObjectShape, PropertySlot},
    error::{ErrorKind, SerializeError},
    rewrite::SUPER_BINDING,
    syntax::lexer::{is_identifier_text, is_reserved_word},
};

type EmitResult<T> = Result<T, SerializeError>;

/// Render `root` (a function entry) as a complete module exporting
/// `export_name`. In factory mode the root is invoked at load time, so the
/// export line trails the environment; otherwise it leads the module.
pub fn emit_module(arena: &EntryArena, root: EntryId, export_name: &str, factory: bool) -> EmitResult<String> {
    debug!(export_name, factory, "emitting module text");
    let mut emitter = Emitter {
        arena,
        env_entry_to_name: AHashMap::new(),
        function_to_name: AHashMap::new(),
        used_names: AHashSet::new(),
        environment_text: String::new(),
        function_text: String::new(),
    };
    // the synthesized super binding must never be claimed by a generated name
    emitter.used_names.insert(SUPER_BINDING.to_owned());

    let root_name = emitter.emit_function_and_get_name(root)?;
    let environment = emitter.environment_text;
    let functions = emitter.function_text;
    let text = if factory {
        format!("{environment}{functions}\nexports.{export_name} = {root_name}();\n")
    } else if environment.is_empty() {
        format!("exports.{export_name} = {root_name};\n{functions}")
    } else {
        format!("exports.{export_name} = {root_name};\n\n{environment}{functions}")
    };
    Ok(text)
}

/// How a property key renders at its use sites.
enum KeyText {
    /// Legal for dotted access: `target.key`.
    Ident(String),
    /// Needs quoting: `target["some key"]`.
    Quoted(String),
    /// A computed expression, e.g. a well-known symbol.
    Expr(String),
}

impl KeyText {
    /// Expression form, usable inside `[...]` and `Object.defineProperty`.
    fn as_expr(&self) -> String {
        match self {
            Self::Ident(s) | Self::Quoted(s) => quote(s),
            Self::Expr(e) => e.clone(),
        }
    }

    /// Key position of an object literal.
    fn as_literal_key(&self) -> String {
        match self {
            Self::Ident(s) => s.clone(),
            Self::Quoted(s) => quote(s),
            Self::Expr(e) => format!("[{e}]"),
        }
    }
}

fn quote(s: &str) -> String {
    serde_json::Value::String(s.to_owned()).to_string()
}

fn invariant(message: impl Into<String>) -> SerializeError {
    SerializeError::new(ErrorKind::BrokenInvariant, message)
}

struct Emitter<'a> {
    arena: &'a EntryArena,
    /// Reference-typed entries already assigned a top-level variable name.
    env_entry_to_name: AHashMap<EntryId, String>,
    /// Function entries already emitted.
    function_to_name: AHashMap<EntryId, String>,
    used_names: AHashSet<String>,
    environment_text: String,
    function_text: String,
}

impl Emitter<'_> {
    fn create_env_var_name(&mut self, base: &str, add_index_at_end: bool) -> String {
        let legalized: String = base
            .trim_start_matches('_')
            .chars()
            .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '$')
            .collect();
        let legalized = if legalized.is_empty() { "f".to_owned() } else { legalized };
        let mut index = 0usize;
        let mut candidate = if add_index_at_end {
            format!("__{legalized}{index}")
        } else {
            format!("__{legalized}")
        };
        while self.used_names.contains(&candidate) {
            index += 1;
            candidate = format!("__{legalized}{index}");
        }
        self.used_names.insert(candidate.clone());
        candidate
    }

    fn emit_function_and_get_name(&mut self, entry: EntryId) -> EmitResult<String> {
        if let Some(name) = self.function_to_name.get(&entry) {
            return Ok(name.clone());
        }
        let arena = self.arena;
        let shape = arena
            .function(entry)
            .ok_or_else(|| invariant("a non-function entry reached function emission"))?;
        let name = match &shape.name {
            Some(base) => self.create_env_var_name(base, false),
            None => self.create_env_var_name("f", true),
        };
        // registered before the body renders, so self-captures resolve
        self.function_to_name.insert(entry, name.clone());

        let mut this_capture = "undefined".to_owned();
        let mut arguments_capture = "undefined".to_owned();
        let mut bindings = Vec::new();
        for (captured_name, &captured_entry) in &shape.captured {
            let value_text = self.env_entry_to_string(captured_entry, captured_name)?;
            match captured_name.as_str() {
                "this" => this_capture = value_text,
                "arguments" => arguments_capture = value_text,
                _ => bindings.push(format!("{captured_name}: {value_text}")),
            }
        }
        let env_obj = if bindings.is_empty() {
            "{}".to_owned()
        } else {
            format!("{{ {} }}", bindings.join(", "))
        };
        let parameters = (0..shape.param_count)
            .map(|i| format!("__{i}"))
            .collect::<Vec<_>>()
            .join(", ");

        let code = &shape.code;
        self.function_text.push_str(&format!(
            "\nfunction {name}({parameters}) {{\n  return (function() {{\n    with({env_obj}) {{\n\nreturn {code};\n\n    }}\n  }}).apply({this_capture}, {arguments_capture}).apply(this, arguments);\n}}\n"
        ));

        if let Some(proto) = shape.proto {
            let proto_text = self.env_entry_to_string(proto, &format!("{name}_proto"))?;
            self.environment_text
                .push_str(&format!("Object.setPrototypeOf({name}, {proto_text});\n"));
        }
        for (&key_entry, slot) in &shape.env {
            self.emit_property_statement(&name, key_entry, slot)?;
        }
        Ok(name)
    }

    fn env_entry_to_string(&mut self, entry: EntryId, base: &str) -> EmitResult<String> {
        let arena = self.arena;
        match arena.get(entry) {
            EntryData::Pending => Err(invariant("an unpopulated entry reached the emitter")),
            EntryData::Json(lit) => Ok(lit.to_source()),
            EntryData::Expr(expr) => Ok(expr.clone()),
            EntryData::Module(name) => Ok(format!("require({})", quote(name))),
            EntryData::Function(_) => self.emit_function_and_get_name(entry),
            EntryData::Promise(inner) => {
                let inner_text = self.env_entry_to_string(*inner, base)?;
                Ok(format!("Promise.resolve({inner_text})"))
            }
            EntryData::Output(inner) => self.env_entry_to_string(*inner, base),
            EntryData::Object(_) | EntryData::Array(_) | EntryData::Regexp { .. } => {
                self.complex_env_entry_to_string(entry, base)
            }
        }
    }

    /// Objects, arrays, and regexps get a top-level variable: exactly one
    /// per entry, so shared and cyclic structures keep their identity.
    fn complex_env_entry_to_string(&mut self, entry: EntryId, base: &str) -> EmitResult<String> {
        if let Some(name) = self.env_entry_to_name.get(&entry) {
            return Ok(name.clone());
        }
        let name = self.create_env_var_name(base, false);
        self.env_entry_to_name.insert(entry, name.clone());
        let arena = self.arena;
        match arena.get(entry) {
            EntryData::Object(shape) => self.emit_object(&name, shape)?,
            EntryData::Array(shape) => self.emit_array(&name, shape)?,
            EntryData::Regexp { source, flags } => {
                let line = format!("var {name} = new RegExp({}, {});\n", quote(source), quote(flags));
                self.environment_text.push_str(&line);
            }
            _ => return Err(invariant("entry kind cannot be lifted to a variable")),
        }
        Ok(name)
    }

    fn emit_object(&mut self, name: &str, shape: &ObjectShape) -> EmitResult<()> {
        if self.is_complex_object(shape) {
            let declaration = match shape.proto {
                Some(proto) => {
                    let proto_text = self.env_entry_to_string(proto, &format!("{name}_proto"))?;
                    format!("var {name} = Object.create({proto_text});\n")
                }
                None => format!("var {name} = {{}};\n"),
            };
            self.environment_text.push_str(&declaration);
            for (key_entry, slot) in &shape.env {
                self.emit_property_statement(name, *key_entry, slot)?;
            }
        } else {
            let mut props = Vec::new();
            for (key_entry, slot) in &shape.env {
                let key = self.property_key_text(*key_entry)?;
                let value_entry = slot
                    .entry
                    .ok_or_else(|| invariant("a sentinel property slot survived the walk"))?;
                let value_base = match &key {
                    KeyText::Ident(s) | KeyText::Quoted(s) => s.clone(),
                    KeyText::Expr(_) => "sym".to_owned(),
                };
                let value_text = self.env_entry_to_string(value_entry, &value_base)?;
                props.push(format!("{}: {value_text}", key.as_literal_key()));
            }
            let line = if props.is_empty() {
                format!("var {name} = {{}};\n")
            } else {
                format!("var {name} = {{{}}};\n", props.join(", "))
            };
            self.environment_text.push_str(&line);
        }
        Ok(())
    }

    fn emit_array(&mut self, name: &str, shape: &ArrayShape) -> EmitResult<()> {
        if self.is_trivial_array(shape) {
            let mut elements = Vec::new();
            for element in &shape.elements {
                let element = element.ok_or_else(|| invariant("trivial array with a hole"))?;
                elements.push(self.env_entry_to_string(element, name)?);
            }
            let line = format!("var {name} = [{}];\n", elements.join(", "));
            self.environment_text.push_str(&line);
            return Ok(());
        }
        self.environment_text.push_str(&format!("var {name} = [];\n"));
        for (index, element) in shape.elements.iter().enumerate() {
            let Some(element) = element else {
                continue;
            };
            let value_text = self.env_entry_to_string(*element, name)?;
            self.environment_text.push_str(&format!("{name}[{index}] = {value_text};\n"));
        }
        for (key, extra) in &shape.extras {
            let value_text = self.env_entry_to_string(*extra, key)?;
            if is_identifier_text(key) && !is_reserved_word(key) {
                self.environment_text.push_str(&format!("{name}.{key} = {value_text};\n"));
            } else {
                self.environment_text
                    .push_str(&format!("{name}[{}] = {value_text};\n", quote(key)));
            }
        }
        Ok(())
    }

    /// One statement per property: plain assignment for simple
    /// descriptors, `Object.defineProperty` otherwise.
    fn emit_property_statement(&mut self, target: &str, key_entry: EntryId, slot: &PropertySlot) -> EmitResult<()> {
        let key = self.property_key_text(key_entry)?;
        let value_entry = slot
            .entry
            .ok_or_else(|| invariant("a sentinel property slot survived the walk"))?;
        let value_base = match &key {
            KeyText::Ident(s) | KeyText::Quoted(s) => s.clone(),
            KeyText::Expr(_) => "sym".to_owned(),
        };
        match &slot.info {
            None => {
                let value_text = self.env_entry_to_string(value_entry, &value_base)?;
                let statement = match &key {
                    KeyText::Ident(k) => format!("{target}.{k} = {value_text};\n"),
                    other => format!("{target}[{}] = {value_text};\n", other.as_expr()),
                };
                self.environment_text.push_str(&statement);
            }
            Some(info) => {
                let mut parts = Vec::new();
                if info.configurable {
                    parts.push("configurable: true".to_owned());
                }
                if info.enumerable {
                    parts.push("enumerable: true".to_owned());
                }
                if info.has_value && info.writable {
                    parts.push("writable: true".to_owned());
                }
                if let Some(get) = info.get {
                    let get_text = self.env_entry_to_string(get, &format!("{value_base}_get"))?;
                    parts.push(format!("get: {get_text}"));
                }
                if let Some(set) = info.set {
                    let set_text = self.env_entry_to_string(set, &format!("{value_base}_set"))?;
                    parts.push(format!("set: {set_text}"));
                }
                if info.has_value {
                    let value_text = self.env_entry_to_string(value_entry, &value_base)?;
                    parts.push(format!("value: {value_text}"));
                }
                self.environment_text.push_str(&format!(
                    "Object.defineProperty({target}, {}, {{ {} }});\n",
                    key.as_expr(),
                    parts.join(", ")
                ));
            }
        }
        Ok(())
    }

    fn property_key_text(&self, key_entry: EntryId) -> EmitResult<KeyText> {
        match self.arena.get(key_entry) {
            EntryData::Json(lit) => match lit.as_str() {
                Some(s) if is_identifier_text(s) && !is_reserved_word(s) => Ok(KeyText::Ident(s.to_owned())),
                Some(s) => Ok(KeyText::Quoted(s.to_owned())),
                None => Err(invariant("a property key entry is neither a string nor a symbol")),
            },
            EntryData::Expr(expr) => Ok(KeyText::Expr(expr.clone())),
            _ => Err(invariant("a property key entry is neither a string nor a symbol")),
        }
    }

    // === complexity rules ===

    /// Complex objects emit in two phases; everything else is a literal.
    fn is_complex_object(&self, shape: &ObjectShape) -> bool {
        if shape.proto.is_some() {
            return true;
        }
        shape.env.values().any(|slot| {
            slot.info.as_ref().is_some_and(|info| !info.is_simple())
                || slot.entry.is_some_and(|entry| self.contains_structure(entry))
        })
    }

    fn is_trivial_array(&self, shape: &ArrayShape) -> bool {
        if !shape.extras.is_empty() {
            return false;
        }
        if shape.elements.iter().any(Option::is_none) {
            return false;
        }
        !shape
            .elements
            .iter()
            .flatten()
            .any(|element| self.contains_structure(*element))
    }

    /// Whether an entry reaches an object, array, or regexp, looking
    /// through promise and output wrappers.
    fn contains_structure(&self, entry: EntryId) -> bool {
        match self.arena.get(entry) {
            EntryData::Object(_) | EntryData::Array(_) | EntryData::Regexp { .. } => true,
            EntryData::Promise(inner) | EntryData::Output(inner) => self.contains_structure(*inner),
            _ => false,
        }
    }
}
