//! Pre-seeds the walker's cache with opaque expressions for intrinsics.
//!
//! Global constructors, their prototypes, the generator prototypes, and
//! the iterator symbol all exist in the deserialization environment, so
//! instead of walking them the cache maps each one to a source expression
//! that re-finds it there. `Object`, `Function`, `Array`, `Number`, and
//! `String` are seeded first so their direct names win over longer paths
//! discovered later in the walk.

use crate::{
    context::{CacheKey, Context},
    entry::{EntryArena, EntryData},
    inspect::Introspector,
    value::{PropertyKey, Value},
};

/// Deprecated aliases of the global object itself; never worth seeding.
const SKIPPED_GLOBALS: &[&str] = &["GLOBAL", "root"];

const PREFERRED_GLOBALS: &[&str] = &["Object", "Function", "Array", "Number", "String"];

pub fn seed_well_known<I: Introspector>(insp: &I, ctx: &mut Context, arena: &mut EntryArena) {
    let global = insp.global_object();
    let Some(global_id) = global.as_ref_id() else {
        return;
    };

    for name in PREFERRED_GLOBALS {
        seed_global_property(insp, ctx, arena, global_id, name);
    }

    // walk the global prototype chain so inherited names are covered too
    let mut current = global;
    while let Some(id) = current.as_ref_id() {
        for descriptor in insp.own_property_descriptors(id) {
            if let Some(name) = descriptor.key.as_str() {
                if SKIPPED_GLOBALS.contains(&name) {
                    continue;
                }
                seed_global_property(insp, ctx, arena, id, name);
            }
        }
        current = insp.prototype_of(id);
    }

    let generator_function_prototype = insp.generator_function_prototype();
    seed(
        ctx,
        arena,
        &generator_function_prototype,
        "Object.getPrototypeOf(function*(){})",
    );
    if let Some(id) = generator_function_prototype.as_ref_id() {
        let generator_prototype = insp.own_property(id, &PropertyKey::string("prototype"));
        seed(
            ctx,
            arena,
            &generator_prototype,
            "Object.getPrototypeOf(function*(){}).prototype",
        );
    }
    seed(ctx, arena, &insp.iterator_symbol(), "Symbol.iterator");
}

fn seed_global_property<I: Introspector>(
    insp: &I,
    ctx: &mut Context,
    arena: &mut EntryArena,
    holder: crate::value::ObjId,
    name: &str,
) {
    let value = insp.own_property(holder, &PropertyKey::string(name));
    seed(ctx, arena, &value, &format!("global.{name}"));
    if let Some(id) = value.as_ref_id() {
        let proto = insp.prototype_of(id);
        seed(ctx, arena, &proto, &format!("Object.getPrototypeOf(global.{name})"));
        let prototype_field = insp.own_property(id, &PropertyKey::string("prototype"));
        seed(ctx, arena, &prototype_field, &format!("global.{name}.prototype"));
    }
}

/// Install an `expr` entry for `value` unless it is already cached.
fn seed(ctx: &mut Context, arena: &mut EntryArena, value: &Value, expr: &str) {
    let Some(key) = CacheKey::of(value) else {
        return;
    };
    if ctx.cache.contains_key(&key) {
        return;
    }
    let entry = arena.alloc(EntryData::Expr(expr.to_owned()));
    ctx.cache.insert(key, entry);
}
