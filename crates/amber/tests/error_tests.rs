//! Error-path tests: every failure aborts the serialization and carries a
//! breadcrumb trace from the outermost function down to the failing site.

use amber::{value::SourceLocation, ErrorKind, Mirror, SerializeOptions, Value};

fn serialize_err(host: &Mirror, func: amber::ObjId) -> amber::SerializeError {
    amber::serialize_closure(host, &Value::Ref(func), &SerializeOptions::default()).unwrap_err()
}

#[test]
fn native_function_capture_fails_with_trace() {
    let mut host = Mirror::new();
    let native = host.function(&format!("function hidden() {{ {} }}", concat!("[native ", "code]")));
    let func = host.function_at(
        "function outer() { return lib(); }",
        SourceLocation {
            file: "app.js".to_owned(),
            line: 10,
            column: 3,
        },
    );
    host.bind(func, "lib", Value::Ref(native));

    let err = serialize_err(&host, func);
    assert_eq!(err.kind, ErrorKind::UnparseableFunction);
    assert!(err.hide_stack);
    assert!(err.message.contains("Error serializing function 'outer': app.js(10,3)"));
    assert!(err.message.contains("function 'outer'"));
    assert!(err.message.contains("variable 'lib' which indirectly referenced"));
    assert!(err.message.contains("which could not be serialized because"));
    assert!(err.message.contains("it was a native code function."));
    assert!(err.message.contains("Function code:"));
}

#[test]
fn missing_required_capture_fails() {
    let mut host = Mirror::new();
    let func = host.function("function () { return missing; }");
    let err = serialize_err(&host, func);
    assert_eq!(err.kind, ErrorKind::MissingCapture);
    assert!(err.message.contains("variable 'missing'"));
}

#[test]
fn arrow_capturing_this_reports_workaround() {
    let mut host = Mirror::new();
    let func = host.function("() => this.x");
    let err = serialize_err(&host, func);
    assert!(err
        .message
        .contains("Assign 'this' to another name outside function and capture that."));
}

#[test]
fn opaque_function_form_fails() {
    let mut host = Mirror::new();
    let opaque = host.function("[Function: bound send]");
    let func = host.function("function () { return f(); }");
    host.bind(func, "f", Value::Ref(opaque));
    let err = serialize_err(&host, func);
    assert_eq!(err.kind, ErrorKind::UnparseableFunction);
    assert!(err.message.contains("the function form was not understood."));
}

#[test]
fn secret_without_opt_in_is_rejected() {
    let mut host = Mirror::new();
    let deferred = host.deferred(Value::String("hush".to_owned()), true);
    let func = host.function("function () { return sec.get(); }");
    host.bind(func, "sec", Value::Ref(deferred));

    let err = serialize_err(&host, func);
    assert_eq!(err.kind, ErrorKind::SecretLeak);
    assert!(!err.message.contains("hush"));
}

#[test]
fn non_function_root_is_rejected() {
    let mut host = Mirror::new();
    let obj = host.object();
    let err = amber::serialize_closure(&host, &Value::Ref(obj), &SerializeOptions::default()).unwrap_err();
    assert_eq!(err.kind, ErrorKind::UnparseableFunction);
    assert!(err.message.contains("not a function"));
}

#[test]
fn deployment_only_module_failure_adds_hint() {
    let mut host = Mirror::new();
    let native = host.function(&format!("function internal() {{ {} }}", concat!("[native ", "code]")));
    let exports = host.object();
    host.set(exports, "internal", Value::Ref(native));
    host.mark_deployment_only(exports);
    host.register_module("/work/app/node_modules/cloud/index.js", Value::Ref(exports));

    let func = host.function("function () { return cloud.internal(); }");
    host.bind(func, "cloud", Value::Ref(exports));

    let err = serialize_err(&host, func);
    assert!(err.message.contains("module './node_modules/cloud/index.js'"));
    assert!(err.message.contains("'deployment only' module"));
    assert!(err.message.contains("Consider moving the 'require'"));
}

#[test]
fn resource_label_is_threaded_through() {
    let mut host = Mirror::new();
    let func = host.function("function () { return missing; }");
    let err = amber::serialize_closure(
        &host,
        &Value::Ref(func),
        &SerializeOptions {
            resource: Some("urn:stack::site::lambda".to_owned()),
            ..SerializeOptions::default()
        },
    )
    .unwrap_err();
    assert_eq!(err.resource.as_deref(), Some("urn:stack::site::lambda"));
}

#[test]
fn unknown_symbol_capture_fails() {
    let mut host = Mirror::new();
    let sym = host.symbol("mySymbol");
    let func = host.function("function () { return s; }");
    host.bind(func, "s", Value::Symbol(sym));
    let err = serialize_err(&host, func);
    assert!(err.message.contains("mySymbol"));
    assert!(err.message.contains("well-known symbols"));
}
