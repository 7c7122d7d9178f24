//! The public serialization entry point.

use tracing::debug;

use crate::{
    emit::emit_module,
    error::{ErrorKind, SerializeError},
    inspect::Introspector,
    value::Value,
    walker::ClosureWalker,
};

/// Options for one serialization call.
pub struct SerializeOptions<'a> {
    /// Name of the module export holding the reconstructed callable.
    pub export_name: String,
    /// Emit `exports.<name> = <fn>();` with the root as a factory invoked at
    /// load time, after the captured environment exists.
    pub factory: bool,
    /// Allow captured secret deferred values into the output.
    pub allow_secrets: bool,
    /// Per-value capture predicate; returning false serializes the value
    /// as `undefined`.
    pub serialize: Option<&'a dyn Fn(&Value) -> bool>,
    /// Opaque resource label threaded into errors for the host's
    /// formatter.
    pub resource: Option<String>,
}

impl Default for SerializeOptions<'_> {
    fn default() -> Self {
        Self {
            export_name: "handler".to_owned(),
            factory: false,
            allow_secrets: false,
            serialize: None,
            resource: None,
        }
    }
}

/// The produced artifact: one self-contained module as text.
#[derive(Debug, Clone, serde::Serialize)]
pub struct SerializedModule {
    pub text: String,
    /// Whether any captured deferred value was marked secret.
    pub contains_secrets: bool,
}

/// Serialize a live callable and its transitively reachable graph into a
/// module that, when loaded, exports an equivalent callable.
pub fn serialize_closure<I: Introspector>(
    insp: &I,
    target: &Value,
    options: &SerializeOptions<'_>,
) -> Result<SerializedModule, SerializeError> {
    debug!(export_name = %options.export_name, "serializing closure");
    let mut walker = ClosureWalker::new(insp, options.serialize);
    let root = walker
        .serialize_root(target)
        .map_err(|e| e.with_resource(options.resource.clone()))?;
    let contains_secrets = walker.ctx.contains_secrets;
    if contains_secrets && !options.allow_secrets {
        return Err(SerializeError::new(
            ErrorKind::SecretLeak,
            "this function captured a secret value. Serializing it would embed the plaintext in the emitted module; opt in with 'allow_secrets' to proceed.",
        )
        .with_resource(options.resource.clone()));
    }
    let text = emit_module(&walker.arena, root, &options.export_name, options.factory)
        .map_err(|e| e.with_resource(options.resource.clone()))?;
    Ok(SerializedModule { text, contains_secrets })
}
