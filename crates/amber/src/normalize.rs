//! Rewrites a callable's reported source text into a uniform expression
//! form.
//!
//! Host runtimes report callables in many shapes: arrows, plain functions,
//! concise methods, accessors, generators, whole class bodies. Downstream
//! stages want exactly three shapes: an arrow expression, a named
//! `function` expression, or an unnamed `function` expression. The rules
//! here run in a fixed order; the first match wins.

use crate::syntax::{
    ast::{ClassMember, ExprKind, MethodKind, Pat},
    lexer::{is_identifier_text, is_reserved_word},
    parse_expression, SyntaxError,
};

/// The probe is assembled from pieces so that this function's own compiled
/// form never contains the needle it searches for.
const NATIVE_CODE_PROBE: &str = concat!("[native ", "code]");

/// A callable's source text reduced to expression form.
#[derive(Debug, Clone)]
pub struct NormalizedFunction {
    /// Name-stripped function expression; what gets emitted.
    pub expr_text: String,
    /// Same expression with its declaration name retained, when one exists.
    pub named_expr_text: Option<String>,
    /// The name, when it is a legal non-reserved identifier.
    pub declaration_name: Option<String>,
    pub is_arrow: bool,
    pub is_async: bool,
    /// Declared parameters before the first default or rest parameter,
    /// matching the host's arity rules.
    pub param_count: usize,
}

impl NormalizedFunction {
    /// Text handed to the free-variable analyzer: the named form when one
    /// exists, so a named function expression binds its own name.
    pub fn analysis_text(&self) -> &str {
        self.named_expr_text.as_deref().unwrap_or(&self.expr_text)
    }
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum NormalizeError {
    #[error("the function form was not understood.")]
    OpaqueForm,
    #[error("it was a native code function.")]
    NativeCode,
    #[error("the function's source could not be parsed: {0}")]
    Parse(SyntaxError),
}

fn arity(params: &[Pat]) -> usize {
    params
        .iter()
        .take_while(|p| !matches!(p, Pat::Assign { .. } | Pat::Rest(_)))
        .count()
}

/// `text` begins with the `function` keyword at a word boundary.
fn has_function_keyword(text: &str) -> bool {
    text.strip_prefix("function").is_some_and(|rest| {
        rest.chars()
            .next()
            .is_none_or(|c| !crate::syntax::lexer::is_identifier_continue(c))
    })
}

/// Normalize a callable's reported source text.
pub fn normalize_function_text(text: &str) -> Result<NormalizedFunction, NormalizeError> {
    let trimmed = text.trim();

    if trimmed.starts_with("[Function:") {
        return Err(NormalizeError::OpaqueForm);
    }
    if trimmed.contains(NATIVE_CODE_PROBE) {
        return Err(NormalizeError::NativeCode);
    }

    // arrows pass through untouched
    if let Ok(expr) = parse_expression(trimmed) {
        if let ExprKind::Arrow(arrow) = expr.kind {
            return Ok(NormalizedFunction {
                expr_text: trimmed.to_owned(),
                named_expr_text: None,
                declaration_name: None,
                is_arrow: true,
                is_async: arrow.is_async,
                param_count: arity(&arrow.params),
            });
        }
    }

    let mut working: String;
    if trimmed.starts_with("class ") || trimmed.starts_with("class{") {
        working = extract_constructor(trimmed)?;
    } else {
        working = trimmed.to_owned();
    }

    let mut is_async = false;
    if let Some(rest) = working.strip_prefix("async ") {
        is_async = true;
        working = rest.trim_start().to_owned();
    }

    if let Some(rest) = working.strip_prefix("function get ") {
        working = format!("function {rest}");
    } else if let Some(rest) = working.strip_prefix("function set ") {
        working = format!("function {rest}");
    } else if let Some(rest) = working.strip_prefix("get ") {
        working = rest.to_owned();
    } else if let Some(rest) = working.strip_prefix("set ") {
        working = rest.to_owned();
    }

    if !has_function_keyword(&working) {
        // concise method: `foo() {}`, `*foo() {}`, `[computed]() {}`
        working = format!("function {working}");
    }

    // computed property names cannot survive as declaration names
    let computed = strip_computed_name(&working);
    let (parse_input, had_computed_name) = match &computed {
        Some(stripped) => (stripped.as_str(), true),
        None => (working.as_str(), false),
    };

    let expr = parse_expression(parse_input).map_err(NormalizeError::Parse)?;
    let ExprKind::Function(func) = expr.kind else {
        return Err(NormalizeError::OpaqueForm);
    };

    let tail = &parse_input[func.params_span.start as usize..func.span.end as usize];
    let star = if func.is_generator { "*" } else { "" };
    let async_prefix = if is_async { "async " } else { "" };
    let expr_text = format!("{async_prefix}function{star} {tail}");

    let (named_expr_text, declaration_name) = if had_computed_name {
        (Some(format!("{async_prefix}function{star} __computed{tail}")), None)
    } else {
        match &func.name {
            Some(name) if is_identifier_text(name) && !is_reserved_word(name) => (
                Some(format!("{async_prefix}function{star} {name}{tail}")),
                Some(name.clone()),
            ),
            Some(name) => {
                let safe = name.replace("*/", "");
                (Some(format!("{async_prefix}function{star} /*{safe}*/{tail}")), None)
            }
            None => (None, None),
        }
    };

    Ok(NormalizedFunction {
        expr_text,
        named_expr_text,
        declaration_name,
        is_arrow: false,
        is_async,
        param_count: arity(&func.params),
    })
}

/// Pull the constructor out of a class body, synthesizing the default one
/// when absent: empty for base classes, a bare `super()` call for derived
/// classes.
fn extract_constructor(class_text: &str) -> Result<String, NormalizeError> {
    let expr = parse_expression(class_text).map_err(NormalizeError::Parse)?;
    let ExprKind::Class(class) = expr.kind else {
        return Err(NormalizeError::OpaqueForm);
    };
    for member in &class.members {
        if let ClassMember::Method { def, is_static: false, span } = member {
            if def.kind == MethodKind::Constructor {
                return Ok(span.text(class_text).to_owned());
            }
        }
    }
    if class.super_class.is_some() {
        Ok("constructor() { super(); }".to_owned())
    } else {
        Ok("constructor() { }".to_owned())
    }
}

/// If the function's name position holds a computed property name
/// (`function [expr](...)` after method promotion), drop the bracketed
/// part and report that it happened.
fn strip_computed_name(working: &str) -> Option<String> {
    let rest = working.strip_prefix("function")?.trim_start();
    let (star, rest) = match rest.strip_prefix('*') {
        Some(after_star) => ("*", after_star),
        None => ("", rest),
    };
    let after_ws = rest.trim_start();
    if !after_ws.starts_with('[') {
        return None;
    }
    let mut depth = 0usize;
    for (i, c) in after_ws.char_indices() {
        match c {
            '[' => depth += 1,
            ']' => {
                depth -= 1;
                if depth == 0 {
                    return Some(format!("function{star}{}", &after_ws[i + 1..]));
                }
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arrow_passes_through() {
        let n = normalize_function_text("(a, b) => a + b").unwrap();
        assert!(n.is_arrow);
        assert_eq!(n.expr_text, "(a, b) => a + b");
        assert_eq!(n.param_count, 2);
    }

    #[test]
    fn named_function_splits_forms() {
        let n = normalize_function_text("function fact(n) { return n <= 1 ? 1 : n * fact(n - 1); }").unwrap();
        assert_eq!(n.declaration_name.as_deref(), Some("fact"));
        assert_eq!(n.expr_text, "function (n) { return n <= 1 ? 1 : n * fact(n - 1); }");
        assert_eq!(
            n.named_expr_text.as_deref(),
            Some("function fact(n) { return n <= 1 ? 1 : n * fact(n - 1); }")
        );
    }

    #[test]
    fn concise_method_promoted() {
        let n = normalize_function_text("foo(a) { return a; }").unwrap();
        assert_eq!(n.expr_text, "function (a) { return a; }");
        assert_eq!(n.declaration_name.as_deref(), Some("foo"));
    }

    #[test]
    fn generator_method_keeps_star() {
        let n = normalize_function_text("*gen() { yield 1; }").unwrap();
        assert!(n.expr_text.starts_with("function* "));
        assert_eq!(n.declaration_name.as_deref(), Some("gen"));
    }

    #[test]
    fn accessor_keyword_removed() {
        let n = normalize_function_text("get x() { return 1; }").unwrap();
        assert_eq!(n.expr_text, "function () { return 1; }");
        assert_eq!(n.declaration_name.as_deref(), Some("x"));
    }

    #[test]
    fn async_prefix_preserved() {
        let n = normalize_function_text("async function f() { return 1; }").unwrap();
        assert!(n.is_async);
        assert_eq!(n.expr_text, "async function () { return 1; }");
    }

    #[test]
    fn class_without_constructor_synthesizes_one() {
        let n = normalize_function_text("class A { foo() { return 1; } }").unwrap();
        assert_eq!(n.expr_text, "function () { }");
        let derived = normalize_function_text("class B extends A { }").unwrap();
        assert_eq!(derived.expr_text, "function () { super(); }");
    }

    #[test]
    fn class_with_constructor_extracts_it() {
        let n = normalize_function_text("class B extends A { constructor(x) { super(x); } foo() {} }").unwrap();
        assert_eq!(n.expr_text, "function (x) { super(x); }");
        assert_eq!(n.declaration_name.as_deref(), Some("constructor"));
    }

    #[test]
    fn computed_name_synthesized() {
        let n = normalize_function_text("[Symbol.iterator]() { return this; }").unwrap();
        assert_eq!(n.expr_text, "function () { return this; }");
        assert_eq!(n.named_expr_text.as_deref(), Some("function __computed() { return this; }"));
        assert!(n.declaration_name.is_none());
    }

    #[test]
    fn opaque_and_native_forms_fail() {
        assert!(matches!(
            normalize_function_text("[Function: bound fn]"),
            Err(NormalizeError::OpaqueForm)
        ));
        let native = format!("function f() {{ {} }}", concat!("[native ", "code]"));
        assert!(matches!(normalize_function_text(&native), Err(NormalizeError::NativeCode)));
    }

    #[test]
    fn arity_stops_at_defaults_and_rest() {
        let n = normalize_function_text("function f(a, b = 1, ...c) {}").unwrap();
        assert_eq!(n.param_count, 1);
    }
}
