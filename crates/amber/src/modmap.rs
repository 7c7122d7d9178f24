//! Maps live values to stable module references and decides how captured
//! modules travel: by reference (a `require` in the emitted module) or by
//! value (walked like any other object).

use ahash::AHashMap;
use tracing::debug;

use crate::{
    inspect::Introspector,
    value::{ObjId, PropertyKey, Value},
};

/// How a captured module reaches the deserialization environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModuleCapture {
    /// Walk the exports object like a plain value. Local modules cannot be
    /// re-required at runtime, so their state ships inline.
    ByValue,
    /// Emit `require("<name>")` with the normalized name.
    ByReference(String),
}

/// A value recognized as a loaded module's exports.
#[derive(Debug, Clone)]
pub struct ModuleInfo {
    /// Normalized module name (builtin name, or `./`-prefixed path
    /// relative to the working directory).
    pub name: String,
    pub deployment_only: bool,
    pub capture: ModuleCapture,
}

/// Two-level module lookup: a lazily built identity map over the closed
/// set of built-in modules, plus a scan of the host's dynamic module
/// cache. Immutable once the builtin side has loaded.
#[derive(Debug, Default)]
pub struct ModuleMap {
    builtins: Option<AHashMap<ObjId, String>>,
}

impl ModuleMap {
    pub fn lookup<I: Introspector>(&mut self, insp: &I, value: &Value) -> Option<ModuleInfo> {
        let id = value.as_ref_id()?;
        let builtins = self.builtins.get_or_insert_with(|| {
            let mut map = AHashMap::new();
            for name in insp.built_in_module_names() {
                if let Ok(Value::Ref(exports)) = insp.require_module(&name) {
                    map.insert(exports, name);
                }
            }
            map
        });
        if let Some(name) = builtins.get(&id) {
            return Some(Self::classify(insp, id, name.clone()));
        }
        let cwd = insp.process_cwd();
        for entry in insp.module_cache() {
            if entry.exports.identical(value) {
                let name = relative_module_name(&cwd, &entry.path);
                return Some(Self::classify(insp, id, name));
            }
        }
        None
    }

    fn classify<I: Introspector>(insp: &I, exports: ObjId, name: String) -> ModuleInfo {
        let deployment_only = insp
            .own_property(exports, &PropertyKey::string("deploymentOnlyModule"))
            .is_truthy();
        let is_local = name.starts_with("./") && !name.contains("node_modules");
        let capture = if deployment_only || is_local {
            ModuleCapture::ByValue
        } else if let Some(idx) = name.rfind("node_modules/") {
            // deployed code resolves dependencies through its own tree
            ModuleCapture::ByReference(name[idx + "node_modules/".len()..].to_owned())
        } else {
            ModuleCapture::ByReference(name.clone())
        };
        debug!(module = %name, deployment_only, ?capture, "resolved captured module");
        ModuleInfo {
            name,
            deployment_only,
            capture,
        }
    }
}

/// Normalize an absolute module path against the working directory.
fn relative_module_name(cwd: &str, path: &str) -> String {
    let trimmed_cwd = cwd.trim_end_matches('/');
    if let Some(rest) = path.strip_prefix(trimmed_cwd) {
        let rest = rest.trim_start_matches('/');
        return format!("./{rest}");
    }
    path.to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_names() {
        assert_eq!(relative_module_name("/work/app", "/work/app/lib/util.js"), "./lib/util.js");
        assert_eq!(
            relative_module_name("/work/app", "/work/app/node_modules/dep/index.js"),
            "./node_modules/dep/index.js"
        );
        assert_eq!(relative_module_name("/work/app", "/elsewhere/x.js"), "/elsewhere/x.js");
    }
}
