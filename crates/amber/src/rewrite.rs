//! Rewrites `super` references into explicit `__super` accesses.
//!
//! Emitted functions are detached from their class bodies, so implicit
//! `super` dispatch has to become an ordinary reference to a synthesized
//! `__super` binding that the walker installs next to the other captures.
//! The rewrite splices the original token stream rather than re-printing
//! the tree, so the untouched parts of the body stay byte-identical.

use crate::syntax::lexer::{tokenize, Punct, Tok};

/// The reserved name bound to the base class in rewritten method bodies.
pub const SUPER_BINDING: &str = "__super";

/// Rewrite every `super(...)`, `super.x`, and `super[expr]` in `code`.
///
/// Instance members reach base methods through `__super.prototype`;
/// static members reach them directly on `__super`.
pub fn rewrite_super_references(code: &str, is_static: bool) -> String {
    let Ok(tokens) = tokenize(code) else {
        return code.to_owned();
    };
    let member_base = if is_static {
        "__super"
    } else {
        "__super.prototype"
    };

    let mut out = String::with_capacity(code.len());
    let mut copied = 0usize;
    let mut i = 0usize;
    while i < tokens.len() {
        let tok = &tokens[i];
        if matches!(&tok.kind, Tok::Ident(word) if word == "super") {
            match tokens.get(i + 1).map(|t| &t.kind) {
                Some(Tok::Punct(Punct::LParen)) => {
                    out.push_str(&code[copied..tok.span.start as usize]);
                    out.push_str("__super.call(this");
                    let args_follow = !matches!(tokens.get(i + 2).map(|t| &t.kind), Some(Tok::Punct(Punct::RParen)));
                    if args_follow {
                        out.push_str(", ");
                    }
                    copied = tokens[i + 1].span.end as usize;
                    i += 2;
                    continue;
                }
                Some(Tok::Punct(Punct::Dot | Punct::LBracket)) => {
                    out.push_str(&code[copied..tok.span.start as usize]);
                    out.push_str(member_base);
                    copied = tok.span.end as usize;
                    i += 1;
                    continue;
                }
                _ => {}
            }
        }
        i += 1;
    }
    out.push_str(&code[copied..]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rewrites_super_call() {
        assert_eq!(
            rewrite_super_references("function (x) { super(x); }", false),
            "function (x) { __super.call(this, x); }"
        );
        assert_eq!(
            rewrite_super_references("function () { super(); }", false),
            "function () { __super.call(this); }"
        );
    }

    #[test]
    fn rewrites_member_access() {
        assert_eq!(
            rewrite_super_references("function () { return super.foo() + 1; }", false),
            "function () { return __super.prototype.foo() + 1; }"
        );
        assert_eq!(
            rewrite_super_references("function () { return super.make(); }", true),
            "function () { return __super.make(); }"
        );
    }

    #[test]
    fn rewrites_element_access() {
        assert_eq!(
            rewrite_super_references("function (k) { return super[k]; }", false),
            "function (k) { return __super.prototype[k]; }"
        );
    }

    #[test]
    fn leaves_unrelated_text_alone() {
        let code = "function () { return 'super(duper)'; }";
        assert_eq!(rewrite_super_references(code, false), code);
    }
}
