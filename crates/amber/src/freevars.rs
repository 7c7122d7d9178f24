//! Free-variable analysis over normalized function text.
//!
//! Walks the syntax tree with a scope stack, separating free identifiers
//! into required and optional (`typeof`-guarded) captures, and records the
//! property-access chain observed at each use site so the walker can
//! capture only the parts of an object a function actually touches. A
//! second pass decides whether the function uses its dynamic receiver.

use ahash::AHashSet;
use indexmap::IndexMap;
use smallvec::SmallVec;

use crate::syntax::{
    ast::{
        ArrowBody, ArrowExpr, CatchClause, ClassExpr, ClassMember, Expr, ExprKind, ForHead, ForInit, MemberProp,
        MethodDef, ObjectPatProp, ObjectProp, Pat, PropName, Stmt, StmtKind, UnaryOp, VarDecl, VarKind,
    },
    parse_expression, SyntaxError,
};

/// One step of a property-access chain: the accessed name, and whether the
/// access site invoked the result. Only a chain's final step may be
/// invoked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainStep {
    pub name: String,
    pub invoked: bool,
}

pub type PropertyChain = SmallVec<[ChainStep; 4]>;

/// Captured names with their observed access chains. An empty chain list
/// means "capture everything on the name".
pub type CaptureMap = IndexMap<String, Vec<PropertyChain>>;

#[derive(Debug, Default)]
pub struct FreeVariables {
    pub required: CaptureMap,
    pub optional: CaptureMap,
    pub uses_non_lexical_receiver: bool,
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum AnalyzeError {
    #[error("{0}")]
    Parse(SyntaxError),
    #[error("the text is not a function expression")]
    NotAFunction,
    #[error("arrow function captured 'this'. Assign 'this' to another name outside function and capture that.")]
    ArrowCapturedThis,
}

/// Runtime-only pseudo-globals that never need capturing.
fn is_pseudo_global(name: &str) -> bool {
    matches!(name, "__dirname" | "__filename" | "require")
}

/// Compiler-synthesized helpers that must be captured even though their
/// names look ambient.
fn is_compiler_helper(name: &str) -> bool {
    matches!(name, "__awaiter" | "__rest")
}

/// Analyze a normalized function expression.
pub fn analyze_function(text: &str, is_global: &dyn Fn(&str) -> bool) -> Result<FreeVariables, AnalyzeError> {
    let expr = parse_expression(text).map_err(AnalyzeError::Parse)?;
    let mut analyzer = Analyzer::default();
    let uses_non_lexical_receiver = match &expr.kind {
        ExprKind::Function(func) => {
            analyzer.enter_function(func.name.as_deref(), &func.params, &func.body, true);
            receiver_in_stmts(&func.body)
        }
        ExprKind::Arrow(arrow) => {
            analyzer.enter_arrow(arrow);
            false
        }
        _ => return Err(AnalyzeError::NotAFunction),
    };

    let mut result = FreeVariables {
        uses_non_lexical_receiver,
        ..FreeVariables::default()
    };
    for (name, set) in analyzer.required {
        if name != "this" && (is_global(&name) || is_pseudo_global(&name)) && !is_compiler_helper(&name) {
            continue;
        }
        result.required.insert(name, set.into_chains());
    }
    for (name, set) in analyzer.optional {
        if (is_global(&name) || is_pseudo_global(&name)) && !is_compiler_helper(&name) {
            continue;
        }
        if result.required.contains_key(&name) {
            continue;
        }
        result.optional.insert(name, set.into_chains());
    }
    if result.required.contains_key("this") {
        return Err(AnalyzeError::ArrowCapturedThis);
    }
    Ok(result)
}

/// Chains observed for one name. `whole` wins over any recorded chain.
#[derive(Debug, Default)]
struct ChainSet {
    whole: bool,
    chains: Vec<PropertyChain>,
}

impl ChainSet {
    fn into_chains(self) -> Vec<PropertyChain> {
        if self.whole {
            Vec::new()
        } else {
            self.chains
        }
    }
}

#[derive(Debug, Default)]
struct Analyzer {
    scopes: Vec<AHashSet<String>>,
    required: IndexMap<String, ChainSet>,
    optional: IndexMap<String, ChainSet>,
}

impl Analyzer {
    fn resolved(&self, name: &str) -> bool {
        self.scopes.iter().any(|scope| scope.contains(name))
    }

    fn record(&mut self, name: &str, chain: Option<PropertyChain>, optional: bool) {
        if self.resolved(name) {
            return;
        }
        let map = if optional { &mut self.optional } else { &mut self.required };
        let set = map.entry(name.to_owned()).or_default();
        match chain {
            None => set.whole = true,
            Some(chain) if chain.is_empty() => set.whole = true,
            Some(chain) => {
                if !set.chains.contains(&chain) {
                    set.chains.push(chain);
                }
            }
        }
    }

    fn push_scope(&mut self) {
        self.scopes.push(AHashSet::new());
    }

    fn pop_scope(&mut self) {
        self.scopes.pop();
    }

    fn bind(&mut self, name: &str) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.to_owned());
        }
    }

    fn bind_pat(&mut self, pat: &Pat) {
        let mut names = Vec::new();
        pat.bound_names(&mut names);
        for name in names {
            self.bind(&name);
        }
    }

    // --- scope construction ---

    fn enter_function(&mut self, self_name: Option<&str>, params: &[Pat], body: &[Stmt], non_arrow: bool) {
        self.push_scope();
        if non_arrow {
            self.bind("this");
            self.bind("arguments");
        }
        if let Some(name) = self_name {
            self.bind(name);
        }
        for pat in params {
            self.bind_pat(pat);
        }
        let mut hoisted = Vec::new();
        hoist_function_scope(body, &mut hoisted);
        for name in hoisted {
            self.bind(&name);
        }
        self.bind_block_scoped(body);
        for pat in params {
            self.visit_pat_defaults(pat);
        }
        for stmt in body {
            self.visit_stmt(stmt);
        }
        self.pop_scope();
    }

    fn enter_arrow(&mut self, arrow: &ArrowExpr) {
        self.push_scope();
        for pat in &arrow.params {
            self.bind_pat(pat);
        }
        match &arrow.body {
            ArrowBody::Expr(expr) => {
                for pat in &arrow.params {
                    self.visit_pat_defaults(pat);
                }
                self.visit_expr(expr);
            }
            ArrowBody::Block(stmts) => {
                let mut hoisted = Vec::new();
                hoist_function_scope(stmts, &mut hoisted);
                for name in hoisted {
                    self.bind(&name);
                }
                self.bind_block_scoped(stmts);
                for pat in &arrow.params {
                    self.visit_pat_defaults(pat);
                }
                for stmt in stmts {
                    self.visit_stmt(stmt);
                }
            }
        }
        self.pop_scope();
    }

    fn bind_block_scoped(&mut self, stmts: &[Stmt]) {
        for stmt in stmts {
            match &stmt.kind {
                StmtKind::VarDecl(decl) if decl.kind != VarKind::Var => {
                    for declarator in &decl.decls {
                        self.bind_pat(&declarator.pat);
                    }
                }
                StmtKind::ClassDecl(class) => {
                    if let Some(name) = &class.name {
                        self.bind(name);
                    }
                }
                StmtKind::FunctionDecl(func) => {
                    if let Some(name) = &func.name {
                        self.bind(name);
                    }
                }
                _ => {}
            }
        }
    }

    // --- statements ---

    fn visit_block(&mut self, stmts: &[Stmt]) {
        self.push_scope();
        self.bind_block_scoped(stmts);
        for stmt in stmts {
            self.visit_stmt(stmt);
        }
        self.pop_scope();
    }

    fn visit_stmt(&mut self, stmt: &Stmt) {
        match &stmt.kind {
            StmtKind::Expr(expr) | StmtKind::Throw(expr) => self.visit_expr(expr),
            StmtKind::VarDecl(decl) => self.visit_var_decl(decl),
            StmtKind::FunctionDecl(func) => {
                self.enter_function(func.name.as_deref(), &func.params, &func.body, true);
            }
            StmtKind::ClassDecl(class) => self.visit_class(class),
            StmtKind::Return(arg) => {
                if let Some(arg) = arg {
                    self.visit_expr(arg);
                }
            }
            StmtKind::If {
                test,
                consequent,
                alternate,
            } => {
                self.visit_expr(test);
                self.visit_stmt(consequent);
                if let Some(alt) = alternate {
                    self.visit_stmt(alt);
                }
            }
            StmtKind::Block(stmts) => self.visit_block(stmts),
            StmtKind::For { init, test, update, body } => {
                self.push_scope();
                match init {
                    Some(ForInit::Decl(decl)) => self.visit_var_decl(decl),
                    Some(ForInit::Expr(expr)) => self.visit_expr(expr),
                    None => {}
                }
                if let Some(test) = test {
                    self.visit_expr(test);
                }
                if let Some(update) = update {
                    self.visit_expr(update);
                }
                self.visit_stmt(body);
                self.pop_scope();
            }
            StmtKind::ForIn { left, right, body, .. } => {
                self.push_scope();
                match left {
                    ForHead::Decl(decl) => self.visit_var_decl(decl),
                    ForHead::Expr(expr) => self.visit_expr(expr),
                }
                self.visit_expr(right);
                self.visit_stmt(body);
                self.pop_scope();
            }
            StmtKind::While { test, body } => {
                self.visit_expr(test);
                self.visit_stmt(body);
            }
            StmtKind::DoWhile { body, test } => {
                self.visit_stmt(body);
                self.visit_expr(test);
            }
            StmtKind::Labeled { body, .. } => self.visit_stmt(body),
            StmtKind::Try { block, catch, finally } => {
                self.visit_block(block);
                if let Some(CatchClause { param, body }) = catch {
                    self.push_scope();
                    if let Some(pat) = param {
                        self.bind_pat(pat);
                    }
                    self.bind_block_scoped(body);
                    for stmt in body {
                        self.visit_stmt(stmt);
                    }
                    self.pop_scope();
                }
                if let Some(finally) = finally {
                    self.visit_block(finally);
                }
            }
            StmtKind::Switch { discriminant, cases } => {
                self.visit_expr(discriminant);
                self.push_scope();
                for case in cases {
                    self.bind_block_scoped(&case.body);
                }
                for case in cases {
                    if let Some(test) = &case.test {
                        self.visit_expr(test);
                    }
                    for stmt in &case.body {
                        self.visit_stmt(stmt);
                    }
                }
                self.pop_scope();
            }
            StmtKind::Break(_) | StmtKind::Continue(_) | StmtKind::Empty | StmtKind::Debugger => {}
        }
    }

    fn visit_var_decl(&mut self, decl: &VarDecl) {
        for declarator in &decl.decls {
            // var names are hoisted; let/const are bound at block entry
            self.visit_pat_defaults(&declarator.pat);
            if let Some(init) = &declarator.init {
                self.visit_expr(init);
            }
        }
    }

    fn visit_pat_defaults(&mut self, pat: &Pat) {
        match pat {
            Pat::Ident(_) => {}
            Pat::Array { elements } => {
                for pat in elements.iter().flatten() {
                    self.visit_pat_defaults(pat);
                }
            }
            Pat::Object { props, .. } => {
                for prop in props {
                    match prop {
                        ObjectPatProp::KeyValue { key, value } => {
                            if let PropName::Computed(expr) = key {
                                self.visit_expr(expr);
                            }
                            self.visit_pat_defaults(value);
                        }
                        ObjectPatProp::Shorthand { default, .. } => {
                            if let Some(default) = default {
                                self.visit_expr(default);
                            }
                        }
                    }
                }
            }
            Pat::Rest(pat) => self.visit_pat_defaults(pat),
            Pat::Assign { pat, default } => {
                self.visit_pat_defaults(pat);
                self.visit_expr(default);
            }
        }
    }

    fn visit_class(&mut self, class: &ClassExpr) {
        if let Some(superclass) = &class.super_class {
            self.visit_expr(superclass);
        }
        self.push_scope();
        if let Some(name) = &class.name {
            self.bind(name);
        }
        for member in &class.members {
            match member {
                ClassMember::Method { def, .. } => self.visit_method(def),
                ClassMember::Field { key, value, .. } => {
                    if let PropName::Computed(expr) = key {
                        self.visit_expr(expr);
                    }
                    if let Some(value) = value {
                        // field initializers see the instance receiver
                        self.push_scope();
                        self.bind("this");
                        self.visit_expr(value);
                        self.pop_scope();
                    }
                }
            }
        }
        self.pop_scope();
    }

    fn visit_method(&mut self, def: &MethodDef) {
        if let PropName::Computed(expr) = &def.key {
            self.visit_expr(expr);
        }
        self.enter_function(None, &def.func.params, &def.func.body, true);
    }

    // --- expressions ---

    fn visit_expr(&mut self, expr: &Expr) {
        match &expr.kind {
            ExprKind::Ident(name) => self.record(name, None, false),
            ExprKind::This => self.record("this", None, false),
            ExprKind::Super
            | ExprKind::Null
            | ExprKind::Bool(_)
            | ExprKind::Number(_)
            | ExprKind::BigInt(_)
            | ExprKind::Str(_)
            | ExprKind::Regex { .. } => {}
            ExprKind::Template { exprs, .. } => {
                for expr in exprs {
                    self.visit_expr(expr);
                }
            }
            ExprKind::TaggedTemplate { tag, exprs, .. } => {
                self.visit_expr(tag);
                for expr in exprs {
                    self.visit_expr(expr);
                }
            }
            ExprKind::Array(elements) => {
                for element in elements.iter().flatten() {
                    self.visit_expr(&element.expr);
                }
            }
            ExprKind::Object(props) => {
                for prop in props {
                    match prop {
                        ObjectProp::KeyValue { key, value } => {
                            if let PropName::Computed(expr) = key {
                                self.visit_expr(expr);
                            }
                            self.visit_expr(value);
                        }
                        ObjectProp::Shorthand { name, .. } => self.record(name, None, false),
                        ObjectProp::Method(def) => self.visit_method(def),
                        ObjectProp::Spread(expr) => self.visit_expr(expr),
                    }
                }
            }
            ExprKind::Function(func) => {
                self.enter_function(func.name.as_deref(), &func.params, &func.body, true);
            }
            ExprKind::Arrow(arrow) => self.enter_arrow(arrow),
            ExprKind::Class(class) => self.visit_class(class),
            ExprKind::Member { .. } => self.visit_possible_chain(expr),
            ExprKind::Call { callee, args, .. } => {
                if let Some(body) = awaiter_body(callee, args) {
                    // the compiled await helper: `__awaiter(this, a, b, fn)`;
                    // the leading `this` belongs to the helper protocol, not
                    // to the body.
                    self.record("__awaiter", None, false);
                    for arg in &args[1..3] {
                        self.visit_expr(arg);
                    }
                    self.visit_expr(body);
                    return;
                }
                self.visit_possible_chain(expr);
            }
            ExprKind::New { callee, args } => {
                self.visit_possible_chain(callee);
                for arg in args {
                    self.visit_expr(arg);
                }
            }
            ExprKind::Unary { op, operand } => {
                if *op == UnaryOp::TypeOf {
                    if let ExprKind::Ident(name) = &operand.kind {
                        self.record(name, None, true);
                        return;
                    }
                }
                self.visit_expr(operand);
            }
            ExprKind::Update { target, .. } => self.visit_expr(target),
            ExprKind::Binary { left, right, .. } | ExprKind::Logical { left, right, .. } => {
                self.visit_expr(left);
                self.visit_expr(right);
            }
            ExprKind::Conditional {
                test,
                consequent,
                alternate,
            } => {
                self.visit_expr(test);
                self.visit_expr(consequent);
                self.visit_expr(alternate);
            }
            ExprKind::Assign { target, value, .. } => {
                self.visit_expr(target);
                self.visit_expr(value);
            }
            ExprKind::Sequence(exprs) => {
                for expr in exprs {
                    self.visit_expr(expr);
                }
            }
            ExprKind::Paren(inner) | ExprKind::Await(inner) | ExprKind::Spread(inner) => self.visit_expr(inner),
            ExprKind::Yield { argument, .. } => {
                if let Some(argument) = argument {
                    self.visit_expr(argument);
                }
            }
        }
    }

    /// Member and call expressions rooted at a free identifier become
    /// property chains; anything else falls back to generic traversal.
    fn visit_possible_chain(&mut self, expr: &Expr) {
        let (is_call, target, args) = match &expr.kind {
            ExprKind::Call { callee, args, .. } => (true, callee.as_ref(), Some(args)),
            _ => (false, expr, None),
        };
        match decompose_chain(target) {
            Some((base, mut chain, computed_args)) => {
                if self.resolved(&base) {
                    // still a local use; only computed sub-expressions need a look
                } else if is_call {
                    if let Some(last) = chain.last_mut() {
                        last.invoked = true;
                        self.record(&base, Some(chain), false);
                    } else {
                        // direct invocation of the captured name
                        self.record(&base, None, false);
                    }
                } else if chain.is_empty() {
                    self.record(&base, None, false);
                } else {
                    self.record(&base, Some(chain), false);
                }
                for expr in computed_args {
                    self.visit_expr(expr);
                }
            }
            None => match &expr.kind {
                ExprKind::Call { callee, .. } => self.visit_expr(callee),
                ExprKind::Member { object, property, .. } => {
                    self.visit_expr(object);
                    if let MemberProp::Computed(index) = property {
                        self.visit_expr(index);
                    }
                }
                _ => unreachable!("visit_possible_chain on non-member/call"),
            },
        }
        if let Some(args) = args {
            for arg in args {
                self.visit_expr(arg);
            }
        }
    }
}

/// Decompose `base.a.b["c"]` into the base name and its chain. Fails (and
/// forces generic traversal) when the receiver is anything but a pure
/// dotted/string-indexed path off an identifier.
fn decompose_chain<'a>(expr: &'a Expr) -> Option<(String, PropertyChain, Vec<&'a Expr>)> {
    match &expr.kind {
        ExprKind::Ident(name) => Some((name.clone(), PropertyChain::new(), Vec::new())),
        ExprKind::Paren(inner) => decompose_chain(inner),
        ExprKind::Member { object, property, .. } => {
            let (base, mut chain, extra) = decompose_chain(object)?;
            match property {
                MemberProp::Dot(name) => {
                    chain.push(ChainStep {
                        name: name.clone(),
                        invoked: false,
                    });
                    Some((base, chain, extra))
                }
                MemberProp::Computed(index) => match &index.kind {
                    ExprKind::Str(name) => {
                        chain.push(ChainStep {
                            name: name.clone(),
                            invoked: false,
                        });
                        Some((base, chain, extra))
                    }
                    _ => None,
                },
            }
        }
        _ => None,
    }
}

/// Recognize the canonical compiled-await helper call shape and return its
/// body function.
fn awaiter_body<'a>(callee: &Expr, args: &'a [Expr]) -> Option<&'a Expr> {
    if !matches!(&callee.kind, ExprKind::Ident(name) if name == "__awaiter") {
        return None;
    }
    if args.len() != 4 {
        return None;
    }
    if !matches!(args[0].kind, ExprKind::This) {
        return None;
    }
    if matches!(args[3].kind, ExprKind::Function(_) | ExprKind::Arrow(_)) {
        Some(&args[3])
    } else {
        None
    }
}

/// Function-scope hoisting: `var` declarations and function declarations,
/// looking through blocks and control flow but not into nested functions.
fn hoist_function_scope(stmts: &[Stmt], out: &mut Vec<String>) {
    for stmt in stmts {
        match &stmt.kind {
            StmtKind::VarDecl(decl) if decl.kind == VarKind::Var => {
                for declarator in &decl.decls {
                    declarator.pat.bound_names(out);
                }
            }
            StmtKind::FunctionDecl(func) => {
                if let Some(name) = &func.name {
                    out.push(name.clone());
                }
            }
            StmtKind::Block(stmts) => hoist_function_scope(stmts, out),
            StmtKind::If {
                consequent, alternate, ..
            } => {
                hoist_function_scope(std::slice::from_ref(consequent), out);
                if let Some(alt) = alternate {
                    hoist_function_scope(std::slice::from_ref(alt), out);
                }
            }
            StmtKind::For { init, body, .. } => {
                if let Some(ForInit::Decl(decl)) = init {
                    if decl.kind == VarKind::Var {
                        for declarator in &decl.decls {
                            declarator.pat.bound_names(out);
                        }
                    }
                }
                hoist_function_scope(std::slice::from_ref(body), out);
            }
            StmtKind::ForIn { left, body, .. } => {
                if let ForHead::Decl(decl) = left {
                    if decl.kind == VarKind::Var {
                        for declarator in &decl.decls {
                            declarator.pat.bound_names(out);
                        }
                    }
                }
                hoist_function_scope(std::slice::from_ref(body), out);
            }
            StmtKind::While { body, .. } | StmtKind::DoWhile { body, .. } | StmtKind::Labeled { body, .. } => {
                hoist_function_scope(std::slice::from_ref(body), out);
            }
            StmtKind::Try { block, catch, finally } => {
                hoist_function_scope(block, out);
                if let Some(catch) = catch {
                    hoist_function_scope(&catch.body, out);
                }
                if let Some(finally) = finally {
                    hoist_function_scope(finally, out);
                }
            }
            StmtKind::Switch { cases, .. } => {
                for case in cases {
                    hoist_function_scope(&case.body, out);
                }
            }
            _ => {}
        }
    }
}

// === receiver analysis ===

/// Whether a non-arrow function body references `this` or `super` outside
/// nested non-arrow functions.
pub fn receiver_in_stmts(stmts: &[Stmt]) -> bool {
    stmts.iter().any(receiver_in_stmt)
}

fn receiver_in_stmt(stmt: &Stmt) -> bool {
    match &stmt.kind {
        StmtKind::Expr(expr) | StmtKind::Throw(expr) => receiver_in_expr(expr),
        StmtKind::VarDecl(decl) => decl
            .decls
            .iter()
            .any(|d| d.init.as_ref().is_some_and(|init| receiver_in_expr(init))),
        StmtKind::FunctionDecl(_) | StmtKind::ClassDecl(_) => false,
        StmtKind::Return(arg) => arg.as_ref().is_some_and(|a| receiver_in_expr(a)),
        StmtKind::If {
            test,
            consequent,
            alternate,
        } => {
            receiver_in_expr(test)
                || receiver_in_stmt(consequent)
                || alternate.as_ref().is_some_and(|a| receiver_in_stmt(a))
        }
        StmtKind::Block(stmts) => receiver_in_stmts(stmts),
        StmtKind::For { init, test, update, body } => {
            let init_uses = match init {
                Some(ForInit::Decl(decl)) => decl
                    .decls
                    .iter()
                    .any(|d| d.init.as_ref().is_some_and(|i| receiver_in_expr(i))),
                Some(ForInit::Expr(expr)) => receiver_in_expr(expr),
                None => false,
            };
            init_uses
                || test.as_ref().is_some_and(|e| receiver_in_expr(e))
                || update.as_ref().is_some_and(|e| receiver_in_expr(e))
                || receiver_in_stmt(body)
        }
        StmtKind::ForIn { left, right, body, .. } => {
            let left_uses = match left {
                ForHead::Decl(_) => false,
                ForHead::Expr(expr) => receiver_in_expr(expr),
            };
            left_uses || receiver_in_expr(right) || receiver_in_stmt(body)
        }
        StmtKind::While { test, body } => receiver_in_expr(test) || receiver_in_stmt(body),
        StmtKind::DoWhile { body, test } => receiver_in_stmt(body) || receiver_in_expr(test),
        StmtKind::Labeled { body, .. } => receiver_in_stmt(body),
        StmtKind::Try { block, catch, finally } => {
            receiver_in_stmts(block)
                || catch.as_ref().is_some_and(|c| receiver_in_stmts(&c.body))
                || finally.as_ref().is_some_and(|f| receiver_in_stmts(f))
        }
        StmtKind::Switch { discriminant, cases } => {
            receiver_in_expr(discriminant)
                || cases.iter().any(|case| {
                    case.test.as_ref().is_some_and(|t| receiver_in_expr(t)) || receiver_in_stmts(&case.body)
                })
        }
        StmtKind::Break(_) | StmtKind::Continue(_) | StmtKind::Empty | StmtKind::Debugger => false,
    }
}

fn receiver_in_expr(expr: &Expr) -> bool {
    match &expr.kind {
        ExprKind::This | ExprKind::Super => true,
        ExprKind::Ident(_)
        | ExprKind::Null
        | ExprKind::Bool(_)
        | ExprKind::Number(_)
        | ExprKind::BigInt(_)
        | ExprKind::Str(_)
        | ExprKind::Regex { .. } => false,
        ExprKind::Template { exprs, .. } => exprs.iter().any(receiver_in_expr),
        ExprKind::TaggedTemplate { tag, exprs, .. } => receiver_in_expr(tag) || exprs.iter().any(receiver_in_expr),
        ExprKind::Array(elements) => elements
            .iter()
            .flatten()
            .any(|element| receiver_in_expr(&element.expr)),
        ExprKind::Object(props) => props.iter().any(|prop| match prop {
            ObjectProp::KeyValue { key, value } => {
                matches!(key, PropName::Computed(expr) if receiver_in_expr(expr)) || receiver_in_expr(value)
            }
            ObjectProp::Shorthand { .. } => false,
            // method bodies bind their own receiver; computed keys do not
            ObjectProp::Method(def) => matches!(&def.key, PropName::Computed(expr) if receiver_in_expr(expr)),
            ObjectProp::Spread(expr) => receiver_in_expr(expr),
        }),
        // nested non-arrow functions shadow the receiver
        ExprKind::Function(_) => false,
        ExprKind::Arrow(arrow) => match &arrow.body {
            ArrowBody::Expr(expr) => receiver_in_expr(expr),
            ArrowBody::Block(stmts) => receiver_in_stmts(stmts),
        },
        ExprKind::Class(class) => class
            .super_class
            .as_ref()
            .is_some_and(|superclass| receiver_in_expr(superclass)),
        ExprKind::Member { object, property, .. } => {
            receiver_in_expr(object) || matches!(property, MemberProp::Computed(index) if receiver_in_expr(index))
        }
        ExprKind::Call { callee, args, .. } => {
            if let Some(body) = awaiter_body(callee, args) {
                // descend into the helper body as if it were an arrow
                let inner = match &body.kind {
                    ExprKind::Function(func) => receiver_in_stmts(&func.body),
                    ExprKind::Arrow(arrow) => match &arrow.body {
                        ArrowBody::Expr(expr) => receiver_in_expr(expr),
                        ArrowBody::Block(stmts) => receiver_in_stmts(stmts),
                    },
                    _ => false,
                };
                return inner || args[1..3].iter().any(receiver_in_expr);
            }
            receiver_in_expr(callee) || args.iter().any(receiver_in_expr)
        }
        ExprKind::New { callee, args } => receiver_in_expr(callee) || args.iter().any(receiver_in_expr),
        ExprKind::Unary { operand, .. } => receiver_in_expr(operand),
        ExprKind::Update { target, .. } => receiver_in_expr(target),
        ExprKind::Binary { left, right, .. } | ExprKind::Logical { left, right, .. } => {
            receiver_in_expr(left) || receiver_in_expr(right)
        }
        ExprKind::Conditional {
            test,
            consequent,
            alternate,
        } => receiver_in_expr(test) || receiver_in_expr(consequent) || receiver_in_expr(alternate),
        ExprKind::Assign { target, value, .. } => receiver_in_expr(target) || receiver_in_expr(value),
        ExprKind::Sequence(exprs) => exprs.iter().any(receiver_in_expr),
        ExprKind::Paren(inner) | ExprKind::Await(inner) | ExprKind::Spread(inner) => receiver_in_expr(inner),
        ExprKind::Yield { argument, .. } => argument.as_ref().is_some_and(|a| receiver_in_expr(a)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn analyze(text: &str) -> FreeVariables {
        analyze_function(text, &|name| matches!(name, "Math" | "JSON" | "console" | "Error" | "undefined")).unwrap()
    }

    fn chain(steps: &[(&str, bool)]) -> PropertyChain {
        steps
            .iter()
            .map(|(name, invoked)| ChainStep {
                name: (*name).to_owned(),
                invoked: *invoked,
            })
            .collect()
    }

    #[test]
    fn captures_free_variable() {
        let fv = analyze("function () { return k; }");
        assert_eq!(fv.required.get("k"), Some(&Vec::new()));
    }

    #[test]
    fn locals_are_not_captured() {
        let fv = analyze("function () { var a = 1; let b = 2; const c = 3; return a + b + c; }");
        assert!(fv.required.is_empty());
    }

    #[test]
    fn property_chain_recorded() {
        let fv = analyze("function () { return obj.a.b; }");
        assert_eq!(
            fv.required.get("obj"),
            Some(&vec![chain(&[("a", false), ("b", false)])])
        );
    }

    #[test]
    fn invoked_marks_last_step() {
        let fv = analyze("function () { return obj.d(); }");
        assert_eq!(fv.required.get("obj"), Some(&vec![chain(&[("d", true)])]));
    }

    #[test]
    fn bare_use_captures_whole() {
        let fv = analyze("function () { f(obj); return obj.a; }");
        assert_eq!(fv.required.get("obj"), Some(&Vec::new()));
        assert_eq!(fv.required.get("f"), Some(&Vec::new()));
    }

    #[test]
    fn typeof_is_optional() {
        let fv = analyze("function () { return typeof maybe; }");
        assert!(fv.required.is_empty());
        assert_eq!(fv.optional.get("maybe"), Some(&Vec::new()));
    }

    #[test]
    fn globals_are_filtered() {
        let fv = analyze("function () { console.log(Math.max(1, 2)); return missing; }");
        assert_eq!(fv.required.len(), 1);
        assert!(fv.required.contains_key("missing"));
    }

    #[test]
    fn var_hoisting_reaches_blocks() {
        let fv = analyze("function () { { var hidden = 1; } return hidden; }");
        assert!(fv.required.is_empty());
    }

    #[test]
    fn let_is_block_scoped() {
        let fv = analyze("function () { { let hidden = 1; } return hidden; }");
        assert!(fv.required.contains_key("hidden"));
    }

    #[test]
    fn named_function_expression_binds_own_name() {
        let fv = analyze("function fact(n) { return n <= 1 ? 1 : n * fact(n - 1); }");
        assert!(fv.required.is_empty());
    }

    #[test]
    fn receiver_flag() {
        assert!(analyze("function () { return this.x; }").uses_non_lexical_receiver);
        assert!(!analyze("function () { return 1; }").uses_non_lexical_receiver);
        // nested functions shadow the receiver
        assert!(!analyze("function () { return function () { return this.x; }; }").uses_non_lexical_receiver);
        // arrows do not
        assert!(analyze("function () { return () => this.x; }").uses_non_lexical_receiver);
    }

    #[test]
    fn arrow_capturing_this_is_an_error() {
        let err = analyze_function("() => this.x", &|_| false).unwrap_err();
        assert!(matches!(err, AnalyzeError::ArrowCapturedThis));
    }

    #[test]
    fn awaiter_helper_is_captured_but_not_this() {
        let fv = analyze("() => __awaiter(this, void 0, void 0, function* () { return k; })");
        assert!(fv.required.contains_key("__awaiter"));
        assert!(fv.required.contains_key("k"));
        assert!(!fv.required.contains_key("this"));
    }

    #[test]
    fn catch_parameter_is_bound() {
        let fv = analyze("function () { try { f(); } catch (e) { return e; } }");
        assert!(!fv.required.contains_key("e"));
    }

    #[test]
    fn mixed_chain_and_whole_use_means_whole() {
        let fv = analyze("function () { g(obj); return obj.a.b; }");
        assert_eq!(fv.required.get("obj"), Some(&Vec::new()));
    }
}
