//! Deep closure serializer for a prototype-based scripting runtime.
//!
//! Given a live callable plus its enclosing lexical environment, observed
//! through the [`Introspector`] contract rather than a concrete VM, the
//! serializer produces a self-contained source-text module that, when
//! loaded in a fresh process, reconstructs an equivalent callable with the
//! same behavior and the same transitively reachable object graph.
//!
//! The pipeline: a callable's reported source is rewritten into a uniform
//! expression shape ([`normalize`]), its free variables and per-capture
//! property chains are computed ([`freevars`]), the live graph is walked
//! into a normalized intermediate form with identity-based deduplication
//! ([`walker`]), and that form is rendered back to text ([`emit`]).
//! [`mirror::Mirror`] is a synthetic host used by the test suite and by
//! embedders who build value graphs directly.
//!
//! ```
//! use amber::{serialize_closure, Mirror, SerializeOptions, Value};
//!
//! let mut host = Mirror::new();
//! let func = host.function("function () { return k; }");
//! host.bind(func, "k", Value::Number(42.0));
//! let module = serialize_closure(&host, &Value::Ref(func), &SerializeOptions::default()).unwrap();
//! assert!(module.text.contains("exports.handler"));
//! ```

pub mod context;
pub mod emit;
pub mod entry;
pub mod error;
pub mod freevars;
pub mod globals;
pub mod heap;
pub mod inspect;
pub mod mirror;
pub mod modmap;
pub mod normalize;
pub mod rewrite;
pub mod serialize;
pub mod syntax;
pub mod value;
pub mod walker;

pub use crate::{
    error::{ErrorKind, SerializeError},
    heap::OwnProperty,
    inspect::{DeferredInfo, Introspector, IntrospectError, ModuleCacheEntry, PropertyDescriptor, RefKind},
    mirror::{Mirror, BUILT_IN_MODULE_NAMES},
    serialize::{serialize_closure, SerializedModule, SerializeOptions},
    value::{ObjId, PropertyKey, SourceLocation, SymbolId, Value},
    walker::ClosureWalker,
};
