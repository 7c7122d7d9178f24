//! Recursive-descent parser over the token vector.
//!
//! Covers the expression and statement grammar a captured callable can
//! realistically contain: functions, arrows, classes, destructuring
//! patterns, template and regex literals, optional chaining. The parser
//! reports the first diagnostic it hits and never recovers; normalization
//! treats any failure as an unparseable callable.

use super::{
    ast::{
        ArrayElement, ArrowBody, ArrowExpr, AssignOp, BinaryOp, CatchClause, ClassExpr, ClassMember, Expr, ExprKind,
        ForHead, ForInit, FunctionExpr, LogicalOp, MemberProp, MethodDef, MethodKind, ObjectPatProp, ObjectProp, Pat,
        PropName, Span, Stmt, StmtKind, SwitchCase, UnaryOp, VarDecl, VarDeclarator, VarKind,
    },
    lexer::{tokenize, Punct, Tok, Token},
    SyntaxError,
};

/// Maximum nesting depth for AST structures during parsing. Prevents stack
/// overflow from pathological inputs like `((((((x))))))`.
const MAX_NESTING_DEPTH: u32 = 200;

/// Parse `source` as a whole program (statement list).
pub fn parse_program(source: &str) -> Result<Vec<Stmt>, SyntaxError> {
    let mut parser = Parser::new(source)?;
    let mut stmts = Vec::new();
    while !parser.at_eof() {
        stmts.push(parser.parse_stmt()?);
    }
    Ok(stmts)
}

/// Parse `source` as a single expression spanning the whole input.
pub fn parse_expression(source: &str) -> Result<Expr, SyntaxError> {
    let mut parser = Parser::new(source)?;
    let expr = parser.parse_assign_expr(false)?;
    parser.eat_punct(Punct::Semi);
    if !parser.at_eof() {
        return Err(parser.err_here("unexpected trailing tokens after expression"));
    }
    Ok(expr)
}

struct Parser {
    tokens: Vec<Token>,
    idx: usize,
    depth: u32,
}

impl Parser {
    fn new(source: &str) -> Result<Self, SyntaxError> {
        Ok(Self {
            tokens: tokenize(source)?,
            idx: 0,
            depth: 0,
        })
    }

    fn enter(&mut self) -> Result<(), SyntaxError> {
        self.depth += 1;
        if self.depth > MAX_NESTING_DEPTH {
            return Err(self.err_here("nesting too deep"));
        }
        Ok(())
    }

    fn leave(&mut self) {
        self.depth -= 1;
    }

    fn tok(&self) -> &Token {
        &self.tokens[self.idx.min(self.tokens.len() - 1)]
    }

    fn tok_at(&self, n: usize) -> &Token {
        let i = (self.idx + n).min(self.tokens.len() - 1);
        &self.tokens[i]
    }

    fn at_eof(&self) -> bool {
        matches!(self.tok().kind, Tok::Eof)
    }

    fn bump(&mut self) -> Token {
        let tok = self.tok().clone();
        if self.idx < self.tokens.len() - 1 {
            self.idx += 1;
        }
        tok
    }

    fn start(&self) -> u32 {
        self.tok().span.start
    }

    fn prev_end(&self) -> u32 {
        if self.idx == 0 {
            0
        } else {
            self.tokens[self.idx - 1].span.end
        }
    }

    fn span_from(&self, start: u32) -> Span {
        Span::new(start, self.prev_end())
    }

    fn err_here(&self, message: impl Into<String>) -> SyntaxError {
        SyntaxError::new(message, self.tok().span.start)
    }

    fn at_punct(&self, p: Punct) -> bool {
        matches!(self.tok().kind, Tok::Punct(q) if q == p)
    }

    fn eat_punct(&mut self, p: Punct) -> bool {
        if self.at_punct(p) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn expect_punct(&mut self, p: Punct) -> Result<(), SyntaxError> {
        if self.eat_punct(p) {
            Ok(())
        } else {
            Err(self.err_here(format!("expected {p:?}")))
        }
    }

    fn at_word(&self, word: &str) -> bool {
        matches!(&self.tok().kind, Tok::Ident(w) if w == word)
    }

    fn word_at(&self, n: usize) -> Option<&str> {
        match &self.tok_at(n).kind {
            Tok::Ident(w) => Some(w),
            _ => None,
        }
    }

    fn eat_word(&mut self, word: &str) -> bool {
        if self.at_word(word) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn expect_ident(&mut self) -> Result<String, SyntaxError> {
        match &self.tok().kind {
            Tok::Ident(w) => {
                let w = w.clone();
                self.bump();
                Ok(w)
            }
            _ => Err(self.err_here("expected identifier")),
        }
    }

    /// Statement-terminator handling: an explicit `;`, or an implicit end at
    /// a newline, `}`, or EOF.
    fn finish_stmt(&mut self) -> Result<(), SyntaxError> {
        if self.eat_punct(Punct::Semi) {
            return Ok(());
        }
        if self.at_punct(Punct::RBrace) || self.at_eof() || self.tok().newline_before {
            return Ok(());
        }
        Err(self.err_here("expected ';'"))
    }

    // === Statements ===

    fn parse_stmt(&mut self) -> Result<Stmt, SyntaxError> {
        self.enter()?;
        let result = self.parse_stmt_inner();
        self.leave();
        result
    }

    fn parse_stmt_inner(&mut self) -> Result<Stmt, SyntaxError> {
        let start = self.start();
        if self.at_punct(Punct::LBrace) {
            let body = self.parse_block()?;
            return Ok(Stmt {
                span: self.span_from(start),
                kind: StmtKind::Block(body),
            });
        }
        if self.at_punct(Punct::Semi) {
            self.bump();
            return Ok(Stmt {
                span: self.span_from(start),
                kind: StmtKind::Empty,
            });
        }
        let word = match &self.tok().kind {
            Tok::Ident(w) => Some(w.clone()),
            _ => None,
        };
        if let Some(word) = word {
            match word.as_str() {
                "var" | "let" | "const" => {
                    let decl = self.parse_var_decl(false)?;
                    self.finish_stmt()?;
                    return Ok(Stmt {
                        span: self.span_from(start),
                        kind: StmtKind::VarDecl(decl),
                    });
                }
                "function" => {
                    self.bump();
                    let func = self.parse_function_rest(start, false)?;
                    return Ok(Stmt {
                        span: self.span_from(start),
                        kind: StmtKind::FunctionDecl(func),
                    });
                }
                "async" if self.word_at(1) == Some("function") && !self.tok_at(1).newline_before => {
                    self.bump();
                    self.bump();
                    let func = self.parse_function_rest(start, true)?;
                    return Ok(Stmt {
                        span: self.span_from(start),
                        kind: StmtKind::FunctionDecl(func),
                    });
                }
                "class" => {
                    let class = self.parse_class()?;
                    return Ok(Stmt {
                        span: self.span_from(start),
                        kind: StmtKind::ClassDecl(class),
                    });
                }
                "return" => {
                    self.bump();
                    let arg = if self.at_punct(Punct::Semi)
                        || self.at_punct(Punct::RBrace)
                        || self.at_eof()
                        || self.tok().newline_before
                    {
                        None
                    } else {
                        Some(self.parse_expr_with_commas()?)
                    };
                    self.finish_stmt()?;
                    return Ok(Stmt {
                        span: self.span_from(start),
                        kind: StmtKind::Return(arg),
                    });
                }
                "if" => return self.parse_if(start),
                "for" => return self.parse_for(start),
                "while" => {
                    self.bump();
                    self.expect_punct(Punct::LParen)?;
                    let test = self.parse_expr_with_commas()?;
                    self.expect_punct(Punct::RParen)?;
                    let body = Box::new(self.parse_stmt()?);
                    return Ok(Stmt {
                        span: self.span_from(start),
                        kind: StmtKind::While { test, body },
                    });
                }
                "do" => {
                    self.bump();
                    let body = Box::new(self.parse_stmt()?);
                    if !self.eat_word("while") {
                        return Err(self.err_here("expected 'while' after do body"));
                    }
                    self.expect_punct(Punct::LParen)?;
                    let test = self.parse_expr_with_commas()?;
                    self.expect_punct(Punct::RParen)?;
                    self.eat_punct(Punct::Semi);
                    return Ok(Stmt {
                        span: self.span_from(start),
                        kind: StmtKind::DoWhile { body, test },
                    });
                }
                "break" | "continue" => {
                    let is_break = word == "break";
                    self.bump();
                    let label = match &self.tok().kind {
                        Tok::Ident(w) if !self.tok().newline_before => {
                            let w = w.clone();
                            self.bump();
                            Some(w)
                        }
                        _ => None,
                    };
                    self.finish_stmt()?;
                    let kind = if is_break {
                        StmtKind::Break(label)
                    } else {
                        StmtKind::Continue(label)
                    };
                    return Ok(Stmt {
                        span: self.span_from(start),
                        kind,
                    });
                }
                "throw" => {
                    self.bump();
                    let arg = self.parse_expr_with_commas()?;
                    self.finish_stmt()?;
                    return Ok(Stmt {
                        span: self.span_from(start),
                        kind: StmtKind::Throw(arg),
                    });
                }
                "try" => return self.parse_try(start),
                "switch" => return self.parse_switch(start),
                "debugger" => {
                    self.bump();
                    self.finish_stmt()?;
                    return Ok(Stmt {
                        span: self.span_from(start),
                        kind: StmtKind::Debugger,
                    });
                }
                _ => {
                    // labeled statement
                    if matches!(self.tok_at(1).kind, Tok::Punct(Punct::Colon)) {
                        let label = self.expect_ident()?;
                        self.bump();
                        let body = Box::new(self.parse_stmt()?);
                        return Ok(Stmt {
                            span: self.span_from(start),
                            kind: StmtKind::Labeled { label, body },
                        });
                    }
                }
            }
        }
        let expr = self.parse_expr_with_commas()?;
        self.finish_stmt()?;
        Ok(Stmt {
            span: self.span_from(start),
            kind: StmtKind::Expr(expr),
        })
    }

    fn parse_block(&mut self) -> Result<Vec<Stmt>, SyntaxError> {
        self.expect_punct(Punct::LBrace)?;
        let mut stmts = Vec::new();
        while !self.at_punct(Punct::RBrace) {
            if self.at_eof() {
                return Err(self.err_here("unterminated block"));
            }
            stmts.push(self.parse_stmt()?);
        }
        self.bump();
        Ok(stmts)
    }

    fn parse_var_decl(&mut self, no_in: bool) -> Result<VarDecl, SyntaxError> {
        let kind = match self.expect_ident()?.as_str() {
            "var" => VarKind::Var,
            "let" => VarKind::Let,
            "const" => VarKind::Const,
            _ => return Err(self.err_here("expected var/let/const")),
        };
        let mut decls = Vec::new();
        loop {
            let pat = self.parse_binding_pat()?;
            let init = if self.eat_punct(Punct::Assign) {
                Some(self.parse_assign_expr(no_in)?)
            } else {
                None
            };
            decls.push(VarDeclarator { pat, init });
            if !self.eat_punct(Punct::Comma) {
                break;
            }
        }
        Ok(VarDecl { kind, decls })
    }

    fn parse_if(&mut self, start: u32) -> Result<Stmt, SyntaxError> {
        self.bump();
        self.expect_punct(Punct::LParen)?;
        let test = self.parse_expr_with_commas()?;
        self.expect_punct(Punct::RParen)?;
        let consequent = Box::new(self.parse_stmt()?);
        let alternate = if self.eat_word("else") {
            Some(Box::new(self.parse_stmt()?))
        } else {
            None
        };
        Ok(Stmt {
            span: self.span_from(start),
            kind: StmtKind::If {
                test,
                consequent,
                alternate,
            },
        })
    }

    fn parse_for(&mut self, start: u32) -> Result<Stmt, SyntaxError> {
        self.bump();
        self.expect_punct(Punct::LParen)?;
        if self.eat_punct(Punct::Semi) {
            return self.parse_classic_for_rest(start, None);
        }
        if self.at_word("var") || self.at_word("let") || self.at_word("const") {
            let decl = self.parse_var_decl(true)?;
            if self.at_word("of") || self.at_word("in") {
                let of = self.expect_ident()? == "of";
                let right = self.parse_assign_expr(false)?;
                self.expect_punct(Punct::RParen)?;
                let body = Box::new(self.parse_stmt()?);
                return Ok(Stmt {
                    span: self.span_from(start),
                    kind: StmtKind::ForIn {
                        left: ForHead::Decl(decl),
                        right,
                        body,
                        of,
                    },
                });
            }
            self.expect_punct(Punct::Semi)?;
            return self.parse_classic_for_rest(start, Some(ForInit::Decl(decl)));
        }
        let expr = self.parse_expr_with_commas_no_in()?;
        if self.at_word("of") || self.at_word("in") {
            let of = self.expect_ident()? == "of";
            let right = self.parse_assign_expr(false)?;
            self.expect_punct(Punct::RParen)?;
            let body = Box::new(self.parse_stmt()?);
            return Ok(Stmt {
                span: self.span_from(start),
                kind: StmtKind::ForIn {
                    left: ForHead::Expr(expr),
                    right,
                    body,
                    of,
                },
            });
        }
        self.expect_punct(Punct::Semi)?;
        self.parse_classic_for_rest(start, Some(ForInit::Expr(expr)))
    }

    fn parse_classic_for_rest(&mut self, start: u32, init: Option<ForInit>) -> Result<Stmt, SyntaxError> {
        let test = if self.at_punct(Punct::Semi) {
            None
        } else {
            Some(self.parse_expr_with_commas()?)
        };
        self.expect_punct(Punct::Semi)?;
        let update = if self.at_punct(Punct::RParen) {
            None
        } else {
            Some(self.parse_expr_with_commas()?)
        };
        self.expect_punct(Punct::RParen)?;
        let body = Box::new(self.parse_stmt()?);
        Ok(Stmt {
            span: self.span_from(start),
            kind: StmtKind::For { init, test, update, body },
        })
    }

    fn parse_try(&mut self, start: u32) -> Result<Stmt, SyntaxError> {
        self.bump();
        let block = self.parse_block()?;
        let catch = if self.eat_word("catch") {
            let param = if self.eat_punct(Punct::LParen) {
                let pat = self.parse_binding_pat()?;
                self.expect_punct(Punct::RParen)?;
                Some(pat)
            } else {
                None
            };
            let body = self.parse_block()?;
            Some(CatchClause { param, body })
        } else {
            None
        };
        let finally = if self.eat_word("finally") {
            Some(self.parse_block()?)
        } else {
            None
        };
        if catch.is_none() && finally.is_none() {
            return Err(self.err_here("expected 'catch' or 'finally' after try block"));
        }
        Ok(Stmt {
            span: self.span_from(start),
            kind: StmtKind::Try { block, catch, finally },
        })
    }

    fn parse_switch(&mut self, start: u32) -> Result<Stmt, SyntaxError> {
        self.bump();
        self.expect_punct(Punct::LParen)?;
        let discriminant = self.parse_expr_with_commas()?;
        self.expect_punct(Punct::RParen)?;
        self.expect_punct(Punct::LBrace)?;
        let mut cases = Vec::new();
        while !self.eat_punct(Punct::RBrace) {
            let test = if self.eat_word("case") {
                let test = self.parse_expr_with_commas()?;
                Some(test)
            } else if self.eat_word("default") {
                None
            } else {
                return Err(self.err_here("expected 'case' or 'default' in switch body"));
            };
            self.expect_punct(Punct::Colon)?;
            let mut body = Vec::new();
            while !self.at_punct(Punct::RBrace) && !self.at_word("case") && !self.at_word("default") {
                body.push(self.parse_stmt()?);
            }
            cases.push(SwitchCase { test, body });
        }
        Ok(Stmt {
            span: self.span_from(start),
            kind: StmtKind::Switch { discriminant, cases },
        })
    }

    // === Patterns ===

    fn parse_binding_pat(&mut self) -> Result<Pat, SyntaxError> {
        self.enter()?;
        let result = self.parse_binding_pat_inner();
        self.leave();
        result
    }

    fn parse_binding_pat_inner(&mut self) -> Result<Pat, SyntaxError> {
        if self.at_punct(Punct::LBracket) {
            self.bump();
            let mut elements = Vec::new();
            while !self.at_punct(Punct::RBracket) {
                if self.eat_punct(Punct::Comma) {
                    elements.push(None);
                    continue;
                }
                let pat = if self.eat_punct(Punct::DotDotDot) {
                    Pat::Rest(Box::new(self.parse_binding_pat()?))
                } else {
                    self.parse_pat_with_default()?
                };
                elements.push(Some(pat));
                if !self.at_punct(Punct::RBracket) {
                    self.expect_punct(Punct::Comma)?;
                }
            }
            self.bump();
            return Ok(Pat::Array { elements });
        }
        if self.at_punct(Punct::LBrace) {
            self.bump();
            let mut props = Vec::new();
            let mut rest = None;
            while !self.at_punct(Punct::RBrace) {
                if self.eat_punct(Punct::DotDotDot) {
                    rest = Some(self.expect_ident()?);
                } else {
                    let key = self.parse_prop_name()?;
                    if self.eat_punct(Punct::Colon) {
                        let value = self.parse_pat_with_default()?;
                        props.push(ObjectPatProp::KeyValue { key, value });
                    } else {
                        let name = match key {
                            PropName::Ident(name) => name,
                            _ => return Err(self.err_here("expected ':' after pattern key")),
                        };
                        let default = if self.eat_punct(Punct::Assign) {
                            Some(self.parse_assign_expr(false)?)
                        } else {
                            None
                        };
                        props.push(ObjectPatProp::Shorthand { name, default });
                    }
                }
                if !self.at_punct(Punct::RBrace) {
                    self.expect_punct(Punct::Comma)?;
                }
            }
            self.bump();
            return Ok(Pat::Object { props, rest });
        }
        let name = self.expect_ident()?;
        Ok(Pat::Ident(name))
    }

    fn parse_pat_with_default(&mut self) -> Result<Pat, SyntaxError> {
        let pat = self.parse_binding_pat()?;
        if self.eat_punct(Punct::Assign) {
            let default = self.parse_assign_expr(false)?;
            return Ok(Pat::Assign {
                pat: Box::new(pat),
                default: Box::new(default),
            });
        }
        Ok(pat)
    }

    // === Functions and classes ===

    fn parse_params(&mut self) -> Result<(Vec<Pat>, Span), SyntaxError> {
        let params_start = self.start();
        self.expect_punct(Punct::LParen)?;
        let mut params = Vec::new();
        while !self.at_punct(Punct::RParen) {
            let pat = if self.eat_punct(Punct::DotDotDot) {
                Pat::Rest(Box::new(self.parse_binding_pat()?))
            } else {
                self.parse_pat_with_default()?
            };
            params.push(pat);
            if !self.at_punct(Punct::RParen) {
                self.expect_punct(Punct::Comma)?;
            }
        }
        self.bump();
        Ok((params, self.span_from(params_start)))
    }

    /// Parse the remainder of a `function` form after the keyword (and any
    /// `async` prefix) has been consumed.
    fn parse_function_rest(&mut self, start: u32, is_async: bool) -> Result<FunctionExpr, SyntaxError> {
        let is_generator = self.eat_punct(Punct::Star);
        let name = match &self.tok().kind {
            Tok::Ident(w) => {
                let w = w.clone();
                self.bump();
                Some(w)
            }
            _ => None,
        };
        let (params, params_span) = self.parse_params()?;
        let body = self.parse_block()?;
        Ok(FunctionExpr {
            name,
            params,
            body,
            is_async,
            is_generator,
            span: self.span_from(start),
            params_span,
        })
    }

    fn parse_class(&mut self) -> Result<ClassExpr, SyntaxError> {
        let start = self.start();
        self.bump(); // class
        let name = match &self.tok().kind {
            Tok::Ident(w) if w != "extends" => {
                let w = w.clone();
                self.bump();
                Some(w)
            }
            _ => None,
        };
        let super_class = if self.eat_word("extends") {
            Some(Box::new(self.parse_unary()?))
        } else {
            None
        };
        self.expect_punct(Punct::LBrace)?;
        let mut members = Vec::new();
        while !self.at_punct(Punct::RBrace) {
            if self.at_eof() {
                return Err(self.err_here("unterminated class body"));
            }
            if self.eat_punct(Punct::Semi) {
                continue;
            }
            members.push(self.parse_class_member()?);
        }
        self.bump();
        Ok(ClassExpr {
            name,
            super_class,
            members,
            span: self.span_from(start),
        })
    }

    fn member_starts_key(&self, n: usize) -> bool {
        matches!(
            self.tok_at(n).kind,
            Tok::Ident(_) | Tok::Str(_) | Tok::Num(_) | Tok::Punct(Punct::LBracket)
        )
    }

    fn parse_class_member(&mut self) -> Result<ClassMember, SyntaxError> {
        let start = self.start();
        let mut is_static = false;
        if self.at_word("static") && self.member_starts_key(1) || self.at_word("static") && matches!(self.tok_at(1).kind, Tok::Punct(Punct::Star)) {
            self.bump();
            is_static = true;
        }
        let mut is_async = false;
        let mut kind = MethodKind::Method;
        if self.at_word("async")
            && !self.tok_at(1).newline_before
            && (self.member_starts_key(1) || matches!(self.tok_at(1).kind, Tok::Punct(Punct::Star)))
        {
            self.bump();
            is_async = true;
        }
        let is_generator = self.eat_punct(Punct::Star);
        if !is_async && !is_generator {
            if self.at_word("get") && self.member_starts_key(1) {
                self.bump();
                kind = MethodKind::Getter;
            } else if self.at_word("set") && self.member_starts_key(1) {
                self.bump();
                kind = MethodKind::Setter;
            }
        }
        let key = self.parse_prop_name()?;
        if self.at_punct(Punct::LParen) {
            if kind == MethodKind::Method && !is_static {
                if let PropName::Ident(name) = &key {
                    if name == "constructor" {
                        kind = MethodKind::Constructor;
                    }
                }
            }
            let fn_start = self.start();
            let (params, params_span) = self.parse_params()?;
            let body = self.parse_block()?;
            let func = FunctionExpr {
                name: None,
                params,
                body,
                is_async,
                is_generator,
                span: Span::new(fn_start, self.prev_end()),
                params_span,
            };
            return Ok(ClassMember::Method {
                def: MethodDef { key, kind, func },
                is_static,
                span: self.span_from(start),
            });
        }
        // class field
        let value = if self.eat_punct(Punct::Assign) {
            Some(self.parse_assign_expr(false)?)
        } else {
            None
        };
        self.finish_stmt()?;
        Ok(ClassMember::Field {
            key,
            is_static,
            value,
            span: self.span_from(start),
        })
    }

    fn parse_prop_name(&mut self) -> Result<PropName, SyntaxError> {
        match &self.tok().kind {
            Tok::Ident(w) => {
                let w = w.clone();
                self.bump();
                Ok(PropName::Ident(w))
            }
            Tok::Str(s) => {
                let s = s.clone();
                self.bump();
                Ok(PropName::Str(s))
            }
            Tok::Num(n) => {
                let n = *n;
                self.bump();
                Ok(PropName::Num(n))
            }
            Tok::Punct(Punct::LBracket) => {
                self.bump();
                let expr = self.parse_assign_expr(false)?;
                self.expect_punct(Punct::RBracket)?;
                Ok(PropName::Computed(Box::new(expr)))
            }
            _ => Err(self.err_here("expected property name")),
        }
    }

    // === Expressions ===

    fn parse_expr_with_commas(&mut self) -> Result<Expr, SyntaxError> {
        self.parse_sequence(false)
    }

    fn parse_expr_with_commas_no_in(&mut self) -> Result<Expr, SyntaxError> {
        self.parse_sequence(true)
    }

    fn parse_sequence(&mut self, no_in: bool) -> Result<Expr, SyntaxError> {
        let start = self.start();
        let first = self.parse_assign_expr(no_in)?;
        if !self.at_punct(Punct::Comma) {
            return Ok(first);
        }
        let mut exprs = vec![first];
        while self.eat_punct(Punct::Comma) {
            exprs.push(self.parse_assign_expr(no_in)?);
        }
        Ok(Expr {
            span: self.span_from(start),
            kind: ExprKind::Sequence(exprs),
        })
    }

    /// Scan from an opening `(` at the current position to its matching `)`
    /// and report whether `=>` follows. Used to commit to arrow parsing.
    fn paren_starts_arrow(&self, from: usize) -> bool {
        debug_assert!(matches!(self.tok_at(from).kind, Tok::Punct(Punct::LParen)));
        let mut depth = 0usize;
        let mut i = from;
        loop {
            match &self.tok_at(i).kind {
                Tok::Punct(Punct::LParen | Punct::LBracket | Punct::LBrace) => depth += 1,
                Tok::Punct(Punct::RParen | Punct::RBracket | Punct::RBrace) => {
                    depth -= 1;
                    if depth == 0 {
                        return matches!(self.tok_at(i + 1).kind, Tok::Punct(Punct::Arrow));
                    }
                }
                Tok::Eof => return false,
                _ => {}
            }
            i += 1;
        }
    }

    fn parse_assign_expr(&mut self, no_in: bool) -> Result<Expr, SyntaxError> {
        self.enter()?;
        let result = self.parse_assign_expr_inner(no_in);
        self.leave();
        result
    }

    fn parse_assign_expr_inner(&mut self, no_in: bool) -> Result<Expr, SyntaxError> {
        let start = self.start();
        // yield expression
        if self.at_word("yield") {
            self.bump();
            let delegate = self.eat_punct(Punct::Star);
            let argument = if self.at_punct(Punct::RParen)
                || self.at_punct(Punct::RBracket)
                || self.at_punct(Punct::RBrace)
                || self.at_punct(Punct::Semi)
                || self.at_punct(Punct::Comma)
                || self.at_punct(Punct::Colon)
                || self.at_eof()
                || self.tok().newline_before
            {
                None
            } else {
                Some(Box::new(self.parse_assign_expr(no_in)?))
            };
            return Ok(Expr {
                span: self.span_from(start),
                kind: ExprKind::Yield { argument, delegate },
            });
        }
        // arrow functions
        if let Some(arrow) = self.try_parse_arrow(no_in)? {
            return Ok(arrow);
        }
        let lhs = self.parse_conditional(no_in)?;
        let op = match self.tok().kind {
            Tok::Punct(Punct::Assign) => Some(AssignOp::Assign),
            Tok::Punct(Punct::PlusAssign) => Some(AssignOp::Add),
            Tok::Punct(Punct::MinusAssign) => Some(AssignOp::Sub),
            Tok::Punct(Punct::StarAssign) => Some(AssignOp::Mul),
            Tok::Punct(Punct::SlashAssign) => Some(AssignOp::Div),
            Tok::Punct(Punct::PercentAssign) => Some(AssignOp::Rem),
            Tok::Punct(Punct::StarStarAssign) => Some(AssignOp::Exp),
            Tok::Punct(Punct::ShlAssign) => Some(AssignOp::Shl),
            Tok::Punct(Punct::ShrAssign) => Some(AssignOp::Shr),
            Tok::Punct(Punct::UShrAssign) => Some(AssignOp::UShr),
            Tok::Punct(Punct::AmpAssign) => Some(AssignOp::BitAnd),
            Tok::Punct(Punct::PipeAssign) => Some(AssignOp::BitOr),
            Tok::Punct(Punct::CaretAssign) => Some(AssignOp::BitXor),
            Tok::Punct(Punct::AndAssign) => Some(AssignOp::And),
            Tok::Punct(Punct::OrAssign) => Some(AssignOp::Or),
            Tok::Punct(Punct::NullishAssign) => Some(AssignOp::Nullish),
            _ => None,
        };
        if let Some(op) = op {
            self.bump();
            let value = self.parse_assign_expr(no_in)?;
            return Ok(Expr {
                span: self.span_from(start),
                kind: ExprKind::Assign {
                    op,
                    target: Box::new(lhs),
                    value: Box::new(value),
                },
            });
        }
        Ok(lhs)
    }

    fn try_parse_arrow(&mut self, no_in: bool) -> Result<Option<Expr>, SyntaxError> {
        let start = self.start();
        let mut is_async = false;
        let mut offset = 0usize;
        if self.at_word("async")
            && !self.tok_at(1).newline_before
            && (matches!(self.tok_at(1).kind, Tok::Punct(Punct::LParen)) || matches!(&self.tok_at(1).kind, Tok::Ident(w) if w != "function"))
        {
            is_async = true;
            offset = 1;
        }
        match &self.tok_at(offset).kind {
            Tok::Ident(_) if matches!(self.tok_at(offset + 1).kind, Tok::Punct(Punct::Arrow)) => {
                if is_async {
                    self.bump();
                }
                let name = self.expect_ident()?;
                self.bump(); // =>
                let body = self.parse_arrow_body(no_in)?;
                Ok(Some(Expr {
                    span: self.span_from(start),
                    kind: ExprKind::Arrow(Box::new(ArrowExpr {
                        params: vec![Pat::Ident(name)],
                        body,
                        is_async,
                        span: self.span_from(start),
                    })),
                }))
            }
            Tok::Punct(Punct::LParen) if self.paren_starts_arrow(offset) => {
                if is_async {
                    self.bump();
                }
                let (params, _) = self.parse_params()?;
                self.expect_punct(Punct::Arrow)?;
                let body = self.parse_arrow_body(no_in)?;
                Ok(Some(Expr {
                    span: self.span_from(start),
                    kind: ExprKind::Arrow(Box::new(ArrowExpr {
                        params,
                        body,
                        is_async,
                        span: self.span_from(start),
                    })),
                }))
            }
            _ => Ok(None),
        }
    }

    fn parse_arrow_body(&mut self, no_in: bool) -> Result<ArrowBody, SyntaxError> {
        if self.at_punct(Punct::LBrace) {
            Ok(ArrowBody::Block(self.parse_block()?))
        } else {
            Ok(ArrowBody::Expr(Box::new(self.parse_assign_expr(no_in)?)))
        }
    }

    fn parse_conditional(&mut self, no_in: bool) -> Result<Expr, SyntaxError> {
        let start = self.start();
        let test = self.parse_binary(0, no_in)?;
        if !self.eat_punct(Punct::Question) {
            return Ok(test);
        }
        let consequent = self.parse_assign_expr(false)?;
        self.expect_punct(Punct::Colon)?;
        let alternate = self.parse_assign_expr(no_in)?;
        Ok(Expr {
            span: self.span_from(start),
            kind: ExprKind::Conditional {
                test: Box::new(test),
                consequent: Box::new(consequent),
                alternate: Box::new(alternate),
            },
        })
    }

    /// Binary operator precedence, or None if the current token is not a
    /// binary operator in this context.
    fn binary_prec(&self, no_in: bool) -> Option<(u8, BinOpKind)> {
        use BinOpKind::{Bin, Log};
        let prec = match &self.tok().kind {
            Tok::Punct(Punct::Nullish) => (1, Log(LogicalOp::Nullish)),
            Tok::Punct(Punct::OrOr) => (2, Log(LogicalOp::Or)),
            Tok::Punct(Punct::AndAnd) => (3, Log(LogicalOp::And)),
            Tok::Punct(Punct::Pipe) => (4, Bin(BinaryOp::BitOr)),
            Tok::Punct(Punct::Caret) => (5, Bin(BinaryOp::BitXor)),
            Tok::Punct(Punct::Amp) => (6, Bin(BinaryOp::BitAnd)),
            Tok::Punct(Punct::EqEq) => (7, Bin(BinaryOp::Eq)),
            Tok::Punct(Punct::NotEq) => (7, Bin(BinaryOp::NotEq)),
            Tok::Punct(Punct::EqEqEq) => (7, Bin(BinaryOp::StrictEq)),
            Tok::Punct(Punct::NotEqEq) => (7, Bin(BinaryOp::StrictNotEq)),
            Tok::Punct(Punct::Lt) => (8, Bin(BinaryOp::Lt)),
            Tok::Punct(Punct::LtEq) => (8, Bin(BinaryOp::LtEq)),
            Tok::Punct(Punct::Gt) => (8, Bin(BinaryOp::Gt)),
            Tok::Punct(Punct::GtEq) => (8, Bin(BinaryOp::GtEq)),
            Tok::Ident(w) if w == "instanceof" => (8, Bin(BinaryOp::InstanceOf)),
            Tok::Ident(w) if w == "in" => {
                if no_in {
                    return None;
                }
                (8, Bin(BinaryOp::In))
            }
            Tok::Punct(Punct::Shl) => (9, Bin(BinaryOp::Shl)),
            Tok::Punct(Punct::Shr) => (9, Bin(BinaryOp::Shr)),
            Tok::Punct(Punct::UShr) => (9, Bin(BinaryOp::UShr)),
            Tok::Punct(Punct::Plus) => (10, Bin(BinaryOp::Add)),
            Tok::Punct(Punct::Minus) => (10, Bin(BinaryOp::Sub)),
            Tok::Punct(Punct::Star) => (11, Bin(BinaryOp::Mul)),
            Tok::Punct(Punct::Slash) => (11, Bin(BinaryOp::Div)),
            Tok::Punct(Punct::Percent) => (11, Bin(BinaryOp::Rem)),
            Tok::Punct(Punct::StarStar) => (12, Bin(BinaryOp::Exp)),
            _ => return None,
        };
        Some(prec)
    }

    fn parse_binary(&mut self, min_prec: u8, no_in: bool) -> Result<Expr, SyntaxError> {
        let start = self.start();
        let mut left = self.parse_unary()?;
        while let Some((prec, op)) = self.binary_prec(no_in) {
            if prec < min_prec {
                break;
            }
            self.bump();
            // `**` is right-associative; everything else is left-associative.
            let next_min = if matches!(op, BinOpKind::Bin(BinaryOp::Exp)) {
                prec
            } else {
                prec + 1
            };
            let right = self.parse_binary(next_min, no_in)?;
            let kind = match op {
                BinOpKind::Bin(op) => ExprKind::Binary {
                    op,
                    left: Box::new(left),
                    right: Box::new(right),
                },
                BinOpKind::Log(op) => ExprKind::Logical {
                    op,
                    left: Box::new(left),
                    right: Box::new(right),
                },
            };
            left = Expr {
                span: self.span_from(start),
                kind,
            };
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expr, SyntaxError> {
        self.enter()?;
        let result = self.parse_unary_inner();
        self.leave();
        result
    }

    fn parse_unary_inner(&mut self) -> Result<Expr, SyntaxError> {
        let start = self.start();
        let unary = match &self.tok().kind {
            Tok::Ident(w) => match w.as_str() {
                "typeof" => Some(UnaryOp::TypeOf),
                "void" => Some(UnaryOp::Void),
                "delete" => Some(UnaryOp::Delete),
                "await" => {
                    self.bump();
                    let operand = self.parse_unary()?;
                    return Ok(Expr {
                        span: self.span_from(start),
                        kind: ExprKind::Await(Box::new(operand)),
                    });
                }
                _ => None,
            },
            Tok::Punct(Punct::Bang) => Some(UnaryOp::Not),
            Tok::Punct(Punct::Tilde) => Some(UnaryOp::BitNot),
            Tok::Punct(Punct::Plus) => Some(UnaryOp::Plus),
            Tok::Punct(Punct::Minus) => Some(UnaryOp::Minus),
            _ => None,
        };
        if let Some(op) = unary {
            self.bump();
            let operand = self.parse_unary()?;
            return Ok(Expr {
                span: self.span_from(start),
                kind: ExprKind::Unary {
                    op,
                    operand: Box::new(operand),
                },
            });
        }
        if self.at_punct(Punct::PlusPlus) || self.at_punct(Punct::MinusMinus) {
            let increment = self.at_punct(Punct::PlusPlus);
            self.bump();
            let target = self.parse_unary()?;
            return Ok(Expr {
                span: self.span_from(start),
                kind: ExprKind::Update {
                    prefix: true,
                    increment,
                    target: Box::new(target),
                },
            });
        }
        let expr = self.parse_call_chain()?;
        if (self.at_punct(Punct::PlusPlus) || self.at_punct(Punct::MinusMinus)) && !self.tok().newline_before {
            let increment = self.at_punct(Punct::PlusPlus);
            self.bump();
            return Ok(Expr {
                span: self.span_from(start),
                kind: ExprKind::Update {
                    prefix: false,
                    increment,
                    target: Box::new(expr),
                },
            });
        }
        Ok(expr)
    }

    fn parse_args(&mut self) -> Result<Vec<Expr>, SyntaxError> {
        self.expect_punct(Punct::LParen)?;
        let mut args = Vec::new();
        while !self.at_punct(Punct::RParen) {
            let start = self.start();
            let arg = if self.eat_punct(Punct::DotDotDot) {
                let inner = self.parse_assign_expr(false)?;
                Expr {
                    span: self.span_from(start),
                    kind: ExprKind::Spread(Box::new(inner)),
                }
            } else {
                self.parse_assign_expr(false)?
            };
            args.push(arg);
            if !self.at_punct(Punct::RParen) {
                self.expect_punct(Punct::Comma)?;
            }
        }
        self.bump();
        Ok(args)
    }

    fn parse_call_chain(&mut self) -> Result<Expr, SyntaxError> {
        let start = self.start();
        let mut expr = if self.at_word("new") {
            self.parse_new()?
        } else {
            self.parse_primary()?
        };
        loop {
            if self.eat_punct(Punct::Dot) {
                let name = self.expect_ident()?;
                expr = Expr {
                    span: self.span_from(start),
                    kind: ExprKind::Member {
                        object: Box::new(expr),
                        property: MemberProp::Dot(name),
                        optional: false,
                    },
                };
            } else if self.eat_punct(Punct::QuestionDot) {
                if self.at_punct(Punct::LParen) {
                    let args = self.parse_args()?;
                    expr = Expr {
                        span: self.span_from(start),
                        kind: ExprKind::Call {
                            callee: Box::new(expr),
                            args,
                            optional: true,
                        },
                    };
                } else if self.eat_punct(Punct::LBracket) {
                    let index = self.parse_expr_with_commas()?;
                    self.expect_punct(Punct::RBracket)?;
                    expr = Expr {
                        span: self.span_from(start),
                        kind: ExprKind::Member {
                            object: Box::new(expr),
                            property: MemberProp::Computed(Box::new(index)),
                            optional: true,
                        },
                    };
                } else {
                    let name = self.expect_ident()?;
                    expr = Expr {
                        span: self.span_from(start),
                        kind: ExprKind::Member {
                            object: Box::new(expr),
                            property: MemberProp::Dot(name),
                            optional: true,
                        },
                    };
                }
            } else if self.eat_punct(Punct::LBracket) {
                let index = self.parse_expr_with_commas()?;
                self.expect_punct(Punct::RBracket)?;
                expr = Expr {
                    span: self.span_from(start),
                    kind: ExprKind::Member {
                        object: Box::new(expr),
                        property: MemberProp::Computed(Box::new(index)),
                        optional: false,
                    },
                };
            } else if self.at_punct(Punct::LParen) {
                let args = self.parse_args()?;
                expr = Expr {
                    span: self.span_from(start),
                    kind: ExprKind::Call {
                        callee: Box::new(expr),
                        args,
                        optional: false,
                    },
                };
            } else if matches!(self.tok().kind, Tok::TemplateFull(_) | Tok::TemplateHead(_)) {
                let (quasis, exprs) = self.parse_template_parts()?;
                expr = Expr {
                    span: self.span_from(start),
                    kind: ExprKind::TaggedTemplate {
                        tag: Box::new(expr),
                        quasis,
                        exprs,
                    },
                };
            } else {
                return Ok(expr);
            }
        }
    }

    fn parse_new(&mut self) -> Result<Expr, SyntaxError> {
        let start = self.start();
        self.bump(); // new
        if self.at_punct(Punct::Dot) {
            return Err(self.err_here("new.target is not supported"));
        }
        let mut callee = if self.at_word("new") {
            self.parse_new()?
        } else {
            self.parse_primary()?
        };
        // member accesses bind tighter than the `new` argument list
        loop {
            if self.eat_punct(Punct::Dot) {
                let name = self.expect_ident()?;
                callee = Expr {
                    span: self.span_from(start),
                    kind: ExprKind::Member {
                        object: Box::new(callee),
                        property: MemberProp::Dot(name),
                        optional: false,
                    },
                };
            } else if self.eat_punct(Punct::LBracket) {
                let index = self.parse_expr_with_commas()?;
                self.expect_punct(Punct::RBracket)?;
                callee = Expr {
                    span: self.span_from(start),
                    kind: ExprKind::Member {
                        object: Box::new(callee),
                        property: MemberProp::Computed(Box::new(index)),
                        optional: false,
                    },
                };
            } else {
                break;
            }
        }
        let args = if self.at_punct(Punct::LParen) {
            self.parse_args()?
        } else {
            Vec::new()
        };
        Ok(Expr {
            span: self.span_from(start),
            kind: ExprKind::New {
                callee: Box::new(callee),
                args,
            },
        })
    }

    fn parse_template_parts(&mut self) -> Result<(Vec<String>, Vec<Expr>), SyntaxError> {
        let mut quasis = Vec::new();
        let mut exprs = Vec::new();
        match self.bump().kind {
            Tok::TemplateFull(s) => {
                quasis.push(s);
                return Ok((quasis, exprs));
            }
            Tok::TemplateHead(s) => quasis.push(s),
            _ => return Err(self.err_here("expected template literal")),
        }
        loop {
            exprs.push(self.parse_expr_with_commas()?);
            match self.bump().kind {
                Tok::TemplateMiddle(s) => quasis.push(s),
                Tok::TemplateTail(s) => {
                    quasis.push(s);
                    return Ok((quasis, exprs));
                }
                _ => return Err(self.err_here("unterminated template literal")),
            }
        }
    }

    fn parse_primary(&mut self) -> Result<Expr, SyntaxError> {
        let start = self.start();
        match &self.tok().kind {
            Tok::Num(n) => {
                let n = *n;
                self.bump();
                Ok(Expr {
                    span: self.span_from(start),
                    kind: ExprKind::Number(n),
                })
            }
            Tok::BigInt(digits) => {
                let digits = digits.clone();
                self.bump();
                Ok(Expr {
                    span: self.span_from(start),
                    kind: ExprKind::BigInt(digits),
                })
            }
            Tok::Str(s) => {
                let s = s.clone();
                self.bump();
                Ok(Expr {
                    span: self.span_from(start),
                    kind: ExprKind::Str(s),
                })
            }
            Tok::Regex { source, flags } => {
                let kind = ExprKind::Regex {
                    source: source.clone(),
                    flags: flags.clone(),
                };
                self.bump();
                Ok(Expr {
                    span: self.span_from(start),
                    kind,
                })
            }
            Tok::TemplateFull(_) | Tok::TemplateHead(_) => {
                let (quasis, exprs) = self.parse_template_parts()?;
                Ok(Expr {
                    span: self.span_from(start),
                    kind: ExprKind::Template { quasis, exprs },
                })
            }
            Tok::Punct(Punct::LParen) => {
                self.bump();
                let inner = self.parse_expr_with_commas()?;
                self.expect_punct(Punct::RParen)?;
                Ok(Expr {
                    span: self.span_from(start),
                    kind: ExprKind::Paren(Box::new(inner)),
                })
            }
            Tok::Punct(Punct::LBracket) => self.parse_array_literal(start),
            Tok::Punct(Punct::LBrace) => self.parse_object_literal(start),
            Tok::Ident(word) => {
                let word = word.clone();
                match word.as_str() {
                    "this" => {
                        self.bump();
                        Ok(Expr {
                            span: self.span_from(start),
                            kind: ExprKind::This,
                        })
                    }
                    "super" => {
                        self.bump();
                        Ok(Expr {
                            span: self.span_from(start),
                            kind: ExprKind::Super,
                        })
                    }
                    "null" => {
                        self.bump();
                        Ok(Expr {
                            span: self.span_from(start),
                            kind: ExprKind::Null,
                        })
                    }
                    "true" | "false" => {
                        self.bump();
                        Ok(Expr {
                            span: self.span_from(start),
                            kind: ExprKind::Bool(word == "true"),
                        })
                    }
                    "function" => {
                        self.bump();
                        let func = self.parse_function_rest(start, false)?;
                        Ok(Expr {
                            span: self.span_from(start),
                            kind: ExprKind::Function(Box::new(func)),
                        })
                    }
                    "async" if self.word_at(1) == Some("function") && !self.tok_at(1).newline_before => {
                        self.bump();
                        self.bump();
                        let func = self.parse_function_rest(start, true)?;
                        Ok(Expr {
                            span: self.span_from(start),
                            kind: ExprKind::Function(Box::new(func)),
                        })
                    }
                    "class" => {
                        let class = self.parse_class()?;
                        Ok(Expr {
                            span: self.span_from(start),
                            kind: ExprKind::Class(Box::new(class)),
                        })
                    }
                    _ => {
                        self.bump();
                        Ok(Expr {
                            span: self.span_from(start),
                            kind: ExprKind::Ident(word),
                        })
                    }
                }
            }
            Tok::Punct(p) => Err(self.err_here(format!("unexpected token {p:?}"))),
            Tok::Eof => Err(self.err_here("unexpected end of input")),
            Tok::TemplateMiddle(_) | Tok::TemplateTail(_) => Err(self.err_here("unexpected template fragment")),
        }
    }

    fn parse_array_literal(&mut self, start: u32) -> Result<Expr, SyntaxError> {
        self.bump(); // [
        let mut elements = Vec::new();
        while !self.at_punct(Punct::RBracket) {
            if self.eat_punct(Punct::Comma) {
                elements.push(None);
                continue;
            }
            let spread = self.eat_punct(Punct::DotDotDot);
            let expr = self.parse_assign_expr(false)?;
            elements.push(Some(ArrayElement { spread, expr }));
            if !self.at_punct(Punct::RBracket) {
                self.expect_punct(Punct::Comma)?;
            }
        }
        self.bump();
        Ok(Expr {
            span: self.span_from(start),
            kind: ExprKind::Array(elements),
        })
    }

    fn parse_object_literal(&mut self, start: u32) -> Result<Expr, SyntaxError> {
        self.bump(); // {
        let mut props = Vec::new();
        while !self.at_punct(Punct::RBrace) {
            if self.at_eof() {
                return Err(self.err_here("unterminated object literal"));
            }
            if self.eat_punct(Punct::DotDotDot) {
                let inner = self.parse_assign_expr(false)?;
                props.push(ObjectProp::Spread(inner));
            } else {
                props.push(self.parse_object_prop()?);
            }
            if !self.at_punct(Punct::RBrace) {
                self.expect_punct(Punct::Comma)?;
            }
        }
        self.bump();
        Ok(Expr {
            span: self.span_from(start),
            kind: ExprKind::Object(props),
        })
    }

    fn parse_object_prop(&mut self) -> Result<ObjectProp, SyntaxError> {
        // accessors
        if (self.at_word("get") || self.at_word("set")) && self.member_starts_key(1) {
            let kind = if self.at_word("get") {
                MethodKind::Getter
            } else {
                MethodKind::Setter
            };
            self.bump();
            let key = self.parse_prop_name()?;
            let fn_start = self.start();
            let (params, params_span) = self.parse_params()?;
            let body = self.parse_block()?;
            return Ok(ObjectProp::Method(MethodDef {
                key,
                kind,
                func: FunctionExpr {
                    name: None,
                    params,
                    body,
                    is_async: false,
                    is_generator: false,
                    span: Span::new(fn_start, self.prev_end()),
                    params_span,
                },
            }));
        }
        let mut is_async = false;
        if self.at_word("async")
            && !self.tok_at(1).newline_before
            && (self.member_starts_key(1) || matches!(self.tok_at(1).kind, Tok::Punct(Punct::Star)))
        {
            self.bump();
            is_async = true;
        }
        let is_generator = self.eat_punct(Punct::Star);
        let key_span_start = self.start();
        let key = self.parse_prop_name()?;
        if self.at_punct(Punct::LParen) {
            let fn_start = self.start();
            let (params, params_span) = self.parse_params()?;
            let body = self.parse_block()?;
            return Ok(ObjectProp::Method(MethodDef {
                key,
                kind: MethodKind::Method,
                func: FunctionExpr {
                    name: None,
                    params,
                    body,
                    is_async,
                    is_generator,
                    span: Span::new(fn_start, self.prev_end()),
                    params_span,
                },
            }));
        }
        if is_async || is_generator {
            return Err(self.err_here("expected method body"));
        }
        if self.eat_punct(Punct::Colon) {
            let value = self.parse_assign_expr(false)?;
            return Ok(ObjectProp::KeyValue { key, value });
        }
        let name = match key {
            PropName::Ident(name) => name,
            _ => return Err(self.err_here("expected ':' after property key")),
        };
        let span = Span::new(key_span_start, self.prev_end());
        if self.eat_punct(Punct::Assign) {
            // cover grammar: `{ a = 1 }` appears as a destructuring target;
            // keep both the reference and the default expression visible.
            let default = self.parse_assign_expr(false)?;
            return Ok(ObjectProp::KeyValue {
                key: PropName::Ident(name.clone()),
                value: Expr {
                    span,
                    kind: ExprKind::Assign {
                        op: AssignOp::Assign,
                        target: Box::new(Expr {
                            span,
                            kind: ExprKind::Ident(name),
                        }),
                        value: Box::new(default),
                    },
                },
            });
        }
        Ok(ObjectProp::Shorthand { name, span })
    }
}

#[derive(Clone, Copy)]
enum BinOpKind {
    Bin(BinaryOp),
    Log(LogicalOp),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_function_expression() {
        let expr = parse_expression("function fact(n) { return n <= 1 ? 1 : n * fact(n - 1); }").unwrap();
        let ExprKind::Function(func) = expr.kind else {
            panic!("expected function");
        };
        assert_eq!(func.name.as_deref(), Some("fact"));
        assert_eq!(func.params.len(), 1);
    }

    #[test]
    fn parses_arrow_with_parens() {
        let expr = parse_expression("(a, b = 2, ...rest) => a + b").unwrap();
        let ExprKind::Arrow(arrow) = expr.kind else {
            panic!("expected arrow");
        };
        assert_eq!(arrow.params.len(), 3);
    }

    #[test]
    fn parses_class_with_members() {
        let expr = parse_expression("class B extends A { constructor() { super(); } static create() { return new B(); } get x() { return 1; } }").unwrap();
        let ExprKind::Class(class) = expr.kind else {
            panic!("expected class");
        };
        assert_eq!(class.members.len(), 3);
        assert!(class.super_class.is_some());
    }

    #[test]
    fn parses_statements() {
        let stmts = parse_program(
            "var x = 1; for (let i = 0; i < 10; i++) { x += i; } for (const k of xs) f(k); try { g(); } catch (e) { h(e); }",
        )
        .unwrap();
        assert_eq!(stmts.len(), 4);
    }

    #[test]
    fn parses_destructuring() {
        let stmts = parse_program("const { a, b: { c } = {}, ...rest } = obj; let [x, , y = 2] = arr;").unwrap();
        assert_eq!(stmts.len(), 2);
    }

    #[test]
    fn reports_first_diagnostic() {
        let err = parse_expression("function (").unwrap_err();
        assert!(err.offset > 0);
    }

    #[test]
    fn optional_chaining_and_templates() {
        let expr = parse_expression("a?.b?.(c)?.[d] + `x${y}z`").unwrap();
        assert!(matches!(expr.kind, ExprKind::Binary { .. }));
    }
}
