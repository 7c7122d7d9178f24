//! IR-level tests for the graph walker: identity caching, cycles, subset
//! capture, receiver escape, and the dispatch special cases.

use amber::{
    entry::{EntryArena, EntryData, EntryId, PropertyMap},
    inspect::Introspector,
    value::{PropertyKey, Value},
    ClosureWalker, Mirror,
};
use num_bigint::BigInt;
use pretty_assertions::assert_eq;

/// String keys of an env map, in insertion order.
fn key_names(arena: &EntryArena, env: &PropertyMap) -> Vec<String> {
    env.keys()
        .filter_map(|key| match arena.get(*key) {
            EntryData::Json(lit) => lit.as_str().map(str::to_owned),
            EntryData::Expr(expr) => Some(expr.clone()),
            _ => None,
        })
        .collect()
}

fn walk(host: &Mirror, func: amber::ObjId) -> (ClosureWalker<'_, Mirror>, EntryId) {
    let mut walker = ClosureWalker::new(host, None);
    let root = walker.serialize_root(&Value::Ref(func)).unwrap();
    (walker, root)
}

#[test]
fn shared_value_has_one_entry() {
    let mut host = Mirror::new();
    let shared = host.object();
    host.set(shared, "x", Value::Number(1.0));
    let func = host.function("function () { return a; }");
    host.bind(func, "a", Value::Ref(shared));
    let other = host.function("function () { return b; }");
    host.bind(other, "b", Value::Ref(shared));
    let outer = host.function("function () { return f() + g(); }");
    host.bind(outer, "f", Value::Ref(func));
    host.bind(outer, "g", Value::Ref(other));

    let (walker, root) = walk(&host, outer);
    let shape = walker.arena.function(root).unwrap();
    let f_entry = shape.captured["f"];
    let g_entry = shape.captured["g"];
    let a_entry = walker.arena.function(f_entry).unwrap().captured["a"];
    let b_entry = walker.arena.function(g_entry).unwrap().captured["b"];
    assert_eq!(a_entry, b_entry);
}

#[test]
fn cycle_terminates_and_points_back() {
    let mut host = Mirror::new();
    let obj = host.object();
    host.set(obj, "self", Value::Ref(obj));
    let func = host.function("function () { return loop; }");
    host.bind(func, "loop", Value::Ref(obj));

    let (walker, root) = walk(&host, func);
    let obj_entry = walker.arena.function(root).unwrap().captured["loop"];
    let EntryData::Object(shape) = walker.arena.get(obj_entry) else {
        panic!("expected object entry");
    };
    assert_eq!(key_names(&walker.arena, &shape.env), vec!["self"]);
    assert_eq!(shape.env.values().next().unwrap().entry, Some(obj_entry));
}

#[test]
fn subset_capture_takes_only_reached_properties() {
    let mut host = Mirror::new();
    let inner = host.object();
    host.set(inner, "b", Value::Number(1.0));
    let d = host.function("function () { return this.c; }");
    let obj = host.object();
    host.set(obj, "a", Value::Ref(inner));
    host.set(obj, "c", Value::Number(2.0));
    host.set(obj, "d", Value::Ref(d));
    let func = host.function("function () { return obj.a.b; }");
    host.bind(func, "obj", Value::Ref(obj));

    let (walker, root) = walk(&host, func);
    let obj_entry = walker.arena.function(root).unwrap().captured["obj"];
    let EntryData::Object(shape) = walker.arena.get(obj_entry) else {
        panic!("expected object entry");
    };
    assert_eq!(key_names(&walker.arena, &shape.env), vec!["a"]);
    let a_entry = shape.env.values().next().unwrap().entry.unwrap();
    let EntryData::Object(a_shape) = walker.arena.get(a_entry) else {
        panic!("expected nested object entry");
    };
    assert_eq!(key_names(&walker.arena, &a_shape.env), vec!["b"]);
}

#[test]
fn receiver_escape_materializes_everything() {
    let mut host = Mirror::new();
    let inner = host.object();
    host.set(inner, "b", Value::Number(1.0));
    let d = host.function("function () { return this.c; }");
    let obj = host.object();
    host.set(obj, "a", Value::Ref(inner));
    host.set(obj, "c", Value::Number(2.0));
    host.set(obj, "d", Value::Ref(d));
    let func = host.function("function () { return obj.d(); }");
    host.bind(func, "obj", Value::Ref(obj));

    let (walker, root) = walk(&host, func);
    let obj_entry = walker.arena.function(root).unwrap().captured["obj"];
    let EntryData::Object(shape) = walker.arena.get(obj_entry) else {
        panic!("expected object entry");
    };
    assert_eq!(key_names(&walker.arena, &shape.env), vec!["a", "c", "d"]);
}

#[test]
fn invoking_receiver_free_method_stays_subset() {
    let mut host = Mirror::new();
    let d = host.function("function () { return 3; }");
    let obj = host.object();
    host.set(obj, "c", Value::Number(2.0));
    host.set(obj, "d", Value::Ref(d));
    let func = host.function("function () { return obj.d(); }");
    host.bind(func, "obj", Value::Ref(obj));

    let (walker, root) = walk(&host, func);
    let obj_entry = walker.arena.function(root).unwrap().captured["obj"];
    let EntryData::Object(shape) = walker.arena.get(obj_entry) else {
        panic!("expected object entry");
    };
    assert_eq!(key_names(&walker.arena, &shape.env), vec!["d"]);
}

#[test]
fn simple_functions_deduplicate() {
    let mut host = Mirror::new();
    let x = host.function("function () { return 1; }");
    let y = host.function("function () { return 1; }");
    let func = host.function("function () { return x() + y(); }");
    host.bind(func, "x", Value::Ref(x));
    host.bind(func, "y", Value::Ref(y));

    let (walker, root) = walk(&host, func);
    let shape = walker.arena.function(root).unwrap();
    assert_eq!(shape.captured["x"], shape.captured["y"]);
}

#[test]
fn functions_with_different_code_stay_distinct() {
    let mut host = Mirror::new();
    let x = host.function("function () { return 1; }");
    let y = host.function("function () { return 2; }");
    let func = host.function("function () { return x() + y(); }");
    host.bind(func, "x", Value::Ref(x));
    host.bind(func, "y", Value::Ref(y));

    let (walker, root) = walk(&host, func);
    let shape = walker.arena.function(root).unwrap();
    assert_ne!(shape.captured["x"], shape.captured["y"]);
}

#[test]
fn promise_resolves_to_inner_entry() {
    let mut host = Mirror::new();
    let promise = host.promise(Value::String("hi".to_owned()));
    let func = host.function("function () { return p; }");
    host.bind(func, "p", Value::Ref(promise));

    let (walker, root) = walk(&host, func);
    let p_entry = walker.arena.function(root).unwrap().captured["p"];
    let EntryData::Promise(inner) = walker.arena.get(p_entry) else {
        panic!("expected promise entry");
    };
    let EntryData::Json(lit) = walker.arena.get(*inner) else {
        panic!("expected json entry");
    };
    assert_eq!(lit.as_str(), Some("hi"));
}

#[test]
fn sparse_array_preserves_holes() {
    let mut host = Mirror::new();
    let arr = host.array(6);
    host.array_set(arr, 0, Value::String("x".to_owned()));
    host.array_set(arr, 5, Value::String("y".to_owned()));
    let func = host.function("function () { return a; }");
    host.bind(func, "a", Value::Ref(arr));

    let (walker, root) = walk(&host, func);
    let a_entry = walker.arena.function(root).unwrap().captured["a"];
    let EntryData::Array(shape) = walker.arena.get(a_entry) else {
        panic!("expected array entry");
    };
    assert_eq!(shape.elements.len(), 6);
    let present: Vec<usize> = shape
        .elements
        .iter()
        .enumerate()
        .filter_map(|(i, e)| e.map(|_| i))
        .collect();
    assert_eq!(present, vec![0, 5]);
}

#[test]
fn arguments_like_flattens_to_dense_array() {
    let mut host = Mirror::new();
    let args = host.arguments_object(&[Value::Number(1.0), Value::Number(2.0)]);
    let func = host.function("function () { return saved; }");
    host.bind(func, "saved", Value::Ref(args));

    let (walker, root) = walk(&host, func);
    let entry = walker.arena.function(root).unwrap().captured["saved"];
    let EntryData::Array(shape) = walker.arena.get(entry) else {
        panic!("expected array entry");
    };
    assert_eq!(shape.elements.len(), 2);
    assert!(shape.elements.iter().all(Option::is_some));
}

#[test]
fn do_not_capture_function_becomes_throwing_stub() {
    let mut host = Mirror::new();
    let forbidden = host.function("function secretive() { return 1; }");
    host.mark_do_not_capture(forbidden);
    let func = host.function("function () { return nope(); }");
    host.bind(func, "nope", Value::Ref(forbidden));

    let (walker, root) = walk(&host, func);
    let stub = walker.arena.function(root).unwrap().captured["nope"];
    let code = &walker.arena.function(stub).unwrap().code;
    assert!(code.contains("throw new Error"));
    assert!(code.contains("secretive"));
}

#[test]
fn do_not_capture_object_serializes_as_undefined() {
    let mut host = Mirror::new();
    let obj = host.object();
    host.set(obj, "data", Value::Number(5.0));
    host.mark_do_not_capture(obj);
    let func = host.function("function () { return blocked; }");
    host.bind(func, "blocked", Value::Ref(obj));

    let (walker, root) = walk(&host, func);
    let entry = walker.arena.function(root).unwrap().captured["blocked"];
    assert!(matches!(
        walker.arena.get(entry),
        EntryData::Json(amber::entry::JsonLiteral::Undefined)
    ));
}

#[test]
fn bigint_becomes_suffixed_expression() {
    let mut host = Mirror::new();
    let func = host.function("function () { return big; }");
    host.bind(func, "big", Value::BigInt(BigInt::from(10)));

    let (walker, root) = walk(&host, func);
    let entry = walker.arena.function(root).unwrap().captured["big"];
    let EntryData::Expr(expr) = walker.arena.get(entry) else {
        panic!("expected expr entry");
    };
    assert_eq!(expr, "10n");
}

#[test]
fn intrinsic_capture_uses_seeded_expression() {
    let mut host = Mirror::new();
    let object_ctor = host.own_property(host.global(), &PropertyKey::string("Object"));
    let func = host.function("function () { return O; }");
    host.bind(func, "O", object_ctor);

    let (walker, root) = walk(&host, func);
    let entry = walker.arena.function(root).unwrap().captured["O"];
    let EntryData::Expr(expr) = walker.arena.get(entry) else {
        panic!("expected expr entry");
    };
    assert_eq!(expr, "global.Object");
}

#[test]
fn builtin_module_captured_by_reference() {
    let mut host = Mirror::new();
    let fs = host.builtin_exports("fs").unwrap();
    let func = host.function("function () { return files; }");
    host.bind(func, "files", Value::Ref(fs));

    let (walker, root) = walk(&host, func);
    let entry = walker.arena.function(root).unwrap().captured["files"];
    let EntryData::Module(name) = walker.arena.get(entry) else {
        panic!("expected module entry");
    };
    assert_eq!(name, "fs");
}

#[test]
fn dependency_module_strips_node_modules_prefix() {
    let mut host = Mirror::new();
    let exports = host.object();
    host.set(exports, "go", Value::Number(0.0));
    host.register_module("/work/app/node_modules/dep/index.js", Value::Ref(exports));
    let func = host.function("function () { return dep; }");
    host.bind(func, "dep", Value::Ref(exports));

    let (walker, root) = walk(&host, func);
    let entry = walker.arena.function(root).unwrap().captured["dep"];
    let EntryData::Module(name) = walker.arena.get(entry) else {
        panic!("expected module entry");
    };
    assert_eq!(name, "dep/index.js");
}

#[test]
fn local_module_captured_by_value() {
    let mut host = Mirror::new();
    let exports = host.object();
    host.set(exports, "limit", Value::Number(9.0));
    host.register_module("/work/app/lib/util.js", Value::Ref(exports));
    let func = host.function("function () { return util; }");
    host.bind(func, "util", Value::Ref(exports));

    let (walker, root) = walk(&host, func);
    let entry = walker.arena.function(root).unwrap().captured["util"];
    let EntryData::Object(shape) = walker.arena.get(entry) else {
        panic!("expected object entry (captured by value)");
    };
    assert_eq!(key_names(&walker.arena, &shape.env), vec!["limit"]);
}

#[test]
fn secret_deferred_sets_context_flag_and_splices_value() {
    let mut host = Mirror::new();
    let deferred = host.deferred(Value::String("hush".to_owned()), true);
    let func = host.function("function () { return sec.get(); }");
    host.bind(func, "sec", Value::Ref(deferred));

    let (walker, root) = walk(&host, func);
    assert!(walker.ctx.contains_secrets);
    let entry = walker.arena.function(root).unwrap().captured["sec"];
    let EntryData::Output(wrapper) = walker.arena.get(entry) else {
        panic!("expected output entry");
    };
    let EntryData::Object(shape) = walker.arena.get(*wrapper) else {
        panic!("expected wrapper object");
    };
    assert_eq!(key_names(&walker.arena, &shape.env), vec!["value"]);
    let spliced = shape.env.values().next().unwrap().entry.unwrap();
    let EntryData::Json(lit) = walker.arena.get(spliced) else {
        panic!("expected json value");
    };
    assert_eq!(lit.as_str(), Some("hush"));
}

#[test]
fn serialize_predicate_blanks_values() {
    let mut host = Mirror::new();
    let obj = host.object();
    host.set(obj, "x", Value::Number(1.0));
    let func = host.function("function () { return filtered; }");
    host.bind(func, "filtered", Value::Ref(obj));

    let blocked = Value::Ref(obj);
    let pred = move |value: &Value| !value.identical(&blocked);
    let mut walker = ClosureWalker::new(&host, Some(&pred));
    let root = walker.serialize_root(&Value::Ref(func)).unwrap();
    let entry = walker.arena.function(root).unwrap().captured["filtered"];
    assert!(matches!(
        walker.arena.get(entry),
        EntryData::Json(amber::entry::JsonLiteral::Undefined)
    ));
}

#[test]
fn optional_capture_skipped_when_absent() {
    let mut host = Mirror::new();
    let func = host.function("function () { return typeof maybe; }");
    let (walker, root) = walk(&host, func);
    assert!(walker.arena.function(root).unwrap().captured.is_empty());
}

#[test]
fn optional_capture_taken_when_present() {
    let mut host = Mirror::new();
    let func = host.function("function () { return typeof cfg === \"undefined\" ? 1 : cfg; }");
    host.bind(func, "cfg", Value::Number(5.0));
    let (walker, root) = walk(&host, func);
    let shape = walker.arena.function(root).unwrap();
    assert!(shape.captured.contains_key("cfg"));
}

#[test]
fn capture_order_is_first_insertion_order() {
    let mut host = Mirror::new();
    let func = host.function("function () { return b + a + b; }");
    host.bind(func, "a", Value::Number(1.0));
    host.bind(func, "b", Value::Number(2.0));
    let (walker, root) = walk(&host, func);
    let names: Vec<&String> = walker.arena.function(root).unwrap().captured.keys().collect();
    assert_eq!(names, vec!["b", "a"]);
}

#[test]
fn function_arity_is_preserved() {
    let mut host = Mirror::new();
    let func = host.function("function (a, b, c) { return a; }");
    let (walker, root) = walk(&host, func);
    assert_eq!(walker.arena.function(root).unwrap().param_count, 3);
}
