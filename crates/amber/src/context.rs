//! Per-serialization mutable state and breadcrumb-based error rendering.

use ahash::AHashMap;

use crate::{
    entry::EntryId,
    error::{ErrorKind, SerializeError},
    value::{ObjId, SourceLocation, SymbolId},
};

/// Identity key for the entry cache. Primitives are never cached; only
/// reference-typed handles and symbols participate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheKey {
    Obj(ObjId),
    Sym(SymbolId),
}

impl CacheKey {
    /// Cache key of a value, if the value participates in identity caching.
    pub fn of(value: &crate::value::Value) -> Option<Self> {
        match value {
            crate::value::Value::Ref(id) => Some(Self::Obj(*id)),
            crate::value::Value::Symbol(id) => Some(Self::Sym(*id)),
            _ => None,
        }
    }
}

/// One breadcrumb on the path from the root callable to the value
/// currently being serialized.
#[derive(Debug, Clone)]
pub enum ContextFrame {
    Function {
        name: Option<String>,
        location: SourceLocation,
    },
    CapturedVariable(String),
    CapturedModule {
        name: String,
        deployment_only: bool,
    },
}

/// Mutable state for one top-level serialization. Created per call,
/// discarded when emission completes.
#[derive(Debug, Default)]
pub struct Context {
    /// Identity map from live value to its unique entry.
    pub cache: AHashMap<CacheKey, EntryId>,
    /// Breadcrumbs for error reporting.
    pub frames: Vec<ContextFrame>,
    /// Instance-side class members mapped to their base-class entry.
    pub instance_member_base: AHashMap<ObjId, EntryId>,
    /// Static-side class members mapped to their base-class entry.
    pub static_member_base: AHashMap<ObjId, EntryId>,
    /// Capture-free callables eligible for cross-site deduplication.
    pub simple_functions: Vec<EntryId>,
    /// Set when any captured deferred value was marked secret.
    pub contains_secrets: bool,
}

impl Context {
    /// Render a serialization failure as a multi-line trace walking the
    /// breadcrumbs from the outermost function down to the failing site,
    /// optionally followed by up to five lines of the offending source.
    pub fn error(&self, kind: ErrorKind, reason: &str, code: Option<&str>) -> SerializeError {
        let mut message = String::new();
        let root = self.frames.iter().find_map(|frame| match frame {
            ContextFrame::Function { name, location } => Some((name.clone(), location.clone())),
            _ => None,
        });
        match &root {
            Some((Some(name), location)) if location.is_known() => {
                message.push_str(&format!("Error serializing function '{name}': {location}\n\n"));
            }
            Some((Some(name), _)) => {
                message.push_str(&format!("Error serializing function '{name}'\n\n"));
            }
            _ => message.push_str("Error serializing function\n\n"),
        }

        let mut indent = String::new();
        let mut deployment_hint: Option<String> = None;
        for (i, frame) in self.frames.iter().enumerate() {
            let last = i + 1 == self.frames.len();
            match frame {
                ContextFrame::Function { name, location } => {
                    let label = name.as_deref().unwrap_or("<anonymous>");
                    message.push_str(&format!("{indent}function '{label}'"));
                    if location.is_known() {
                        message.push_str(&format!(": {location}"));
                    }
                    if last {
                        message.push_str(": which could not be serialized because\n");
                    } else {
                        message.push_str(": captured\n");
                    }
                }
                ContextFrame::CapturedVariable(name) => {
                    message.push_str(&format!("{indent}variable '{name}' which indirectly referenced\n"));
                }
                ContextFrame::CapturedModule { name, deployment_only } => {
                    message.push_str(&format!("{indent}module '{name}' which indirectly referenced\n"));
                    if *deployment_only {
                        deployment_hint = Some(format!(
                            "Module '{name}' is a 'deployment only' module. In general these cannot be captured inside a callback that runs elsewhere. Consider moving the 'require' of '{name}' into the function body instead."
                        ));
                    }
                }
            }
            indent.push_str("  ");
        }
        message.push_str(&format!("{indent}{reason}\n"));

        if let Some(code) = code {
            message.push_str("\nFunction code:\n");
            let mut lines = code.lines();
            for line in lines.by_ref().take(5) {
                message.push_str(&format!("  {line}\n"));
            }
            if lines.next().is_some() {
                message.push_str("  ...\n");
            }
        }
        if let Some(hint) = deployment_hint {
            message.push('\n');
            message.push_str(&hint);
            message.push('\n');
        }
        SerializeError::new(kind, message)
    }
}
