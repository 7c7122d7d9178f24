//! Hand-written lexer producing a flat token vector.
//!
//! The whole input is tokenized up front; the parser then works over the
//! vector with cheap save/restore for the few places that need lookahead
//! (arrow-function parameter lists). Template literals are split into
//! head/middle/tail tokens with substitution tracking, and the usual
//! previous-token heuristic disambiguates regex literals from division.

use super::{ast::Span, SyntaxError};

#[derive(Debug, Clone, PartialEq)]
pub enum Tok {
    /// Identifier or keyword; the parser distinguishes by text.
    Ident(String),
    Num(f64),
    /// Digits of a bigint literal, normalized to decimal when radix-prefixed.
    BigInt(String),
    Str(String),
    /// `` `text` `` with no substitutions.
    TemplateFull(String),
    /// `` `text${ ``
    TemplateHead(String),
    /// `}text${`
    TemplateMiddle(String),
    /// `` }text` ``
    TemplateTail(String),
    Regex { source: String, flags: String },
    Punct(Punct),
    Eof,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Punct {
    LParen,
    RParen,
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    Semi,
    Comma,
    Dot,
    DotDotDot,
    Arrow,
    Question,
    QuestionDot,
    Colon,
    Assign,
    PlusAssign,
    MinusAssign,
    StarAssign,
    SlashAssign,
    PercentAssign,
    StarStarAssign,
    ShlAssign,
    ShrAssign,
    UShrAssign,
    AmpAssign,
    PipeAssign,
    CaretAssign,
    AndAssign,
    OrAssign,
    NullishAssign,
    Plus,
    Minus,
    Star,
    StarStar,
    Slash,
    Percent,
    PlusPlus,
    MinusMinus,
    EqEq,
    NotEq,
    EqEqEq,
    NotEqEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    Shl,
    Shr,
    UShr,
    Amp,
    Pipe,
    Caret,
    AndAnd,
    OrOr,
    Nullish,
    Bang,
    Tilde,
}

/// One lexed token with its span and statement-boundary hint.
#[derive(Debug, Clone)]
pub struct Token {
    pub kind: Tok,
    pub span: Span,
    /// A line terminator appeared between the previous token and this one.
    pub newline_before: bool,
}

/// Keywords after which a `/` starts a regex rather than division.
fn keyword_precedes_operand(word: &str) -> bool {
    matches!(
        word,
        "return"
            | "typeof"
            | "instanceof"
            | "in"
            | "of"
            | "new"
            | "delete"
            | "void"
            | "throw"
            | "case"
            | "do"
            | "else"
            | "yield"
            | "await"
    )
}

pub fn is_identifier_start(c: char) -> bool {
    c == '_' || c == '$' || c.is_alphabetic()
}

pub fn is_identifier_continue(c: char) -> bool {
    c == '_' || c == '$' || c.is_alphanumeric()
}

/// Whether `text` is a lexically valid identifier (reserved words included).
pub fn is_identifier_text(text: &str) -> bool {
    let mut chars = text.chars();
    match chars.next() {
        Some(c) if is_identifier_start(c) => chars.all(is_identifier_continue),
        _ => false,
    }
}

/// ECMAScript reserved words, which rule 12 of the normalizer must not use
/// as declaration names.
pub fn is_reserved_word(text: &str) -> bool {
    matches!(
        text,
        "break"
            | "case"
            | "catch"
            | "class"
            | "const"
            | "continue"
            | "debugger"
            | "default"
            | "delete"
            | "do"
            | "else"
            | "enum"
            | "export"
            | "extends"
            | "false"
            | "finally"
            | "for"
            | "function"
            | "if"
            | "import"
            | "in"
            | "instanceof"
            | "new"
            | "null"
            | "return"
            | "super"
            | "switch"
            | "this"
            | "throw"
            | "true"
            | "try"
            | "typeof"
            | "var"
            | "void"
            | "while"
            | "with"
            | "yield"
    )
}

struct Lexer<'s> {
    src: &'s str,
    bytes: &'s [u8],
    pos: usize,
    tokens: Vec<Token>,
    newline_pending: bool,
    /// Unmatched `{` counts for each open template substitution.
    template_stack: Vec<u32>,
}

/// Tokenize `source` completely. The trailing token is always `Eof`.
pub fn tokenize(source: &str) -> Result<Vec<Token>, SyntaxError> {
    let mut lexer = Lexer {
        src: source,
        bytes: source.as_bytes(),
        pos: 0,
        tokens: Vec::new(),
        newline_pending: false,
        template_stack: Vec::new(),
    };
    lexer.run()?;
    Ok(lexer.tokens)
}

impl<'s> Lexer<'s> {
    fn run(&mut self) -> Result<(), SyntaxError> {
        loop {
            self.skip_trivia()?;
            let start = self.pos;
            let Some(c) = self.peek_char() else {
                self.push(Tok::Eof, start);
                return Ok(());
            };
            match c {
                '"' | '\'' => {
                    let value = self.lex_string(c)?;
                    self.push(Tok::Str(value), start);
                }
                '`' => {
                    self.pos += 1;
                    self.lex_template_part(start, true)?;
                }
                '0'..='9' => self.lex_number(start)?,
                '.' => {
                    if self.bytes.get(self.pos + 1).is_some_and(u8::is_ascii_digit) {
                        self.lex_number(start)?;
                    } else if self.src[self.pos..].starts_with("...") {
                        self.pos += 3;
                        self.push(Tok::Punct(Punct::DotDotDot), start);
                    } else {
                        self.pos += 1;
                        self.push(Tok::Punct(Punct::Dot), start);
                    }
                }
                '/' if self.regex_allowed() => {
                    let (source, flags) = self.lex_regex()?;
                    self.push(Tok::Regex { source, flags }, start);
                }
                '}' if self.in_template_substitution() => {
                    self.pos += 1;
                    self.lex_template_part(start, false)?;
                }
                c if is_identifier_start(c) => {
                    while self.peek_char().is_some_and(is_identifier_continue) {
                        self.pos += self.peek_char().map_or(0, char::len_utf8);
                    }
                    let text = self.src[start..self.pos].to_owned();
                    self.push(Tok::Ident(text), start);
                }
                _ => self.lex_punct(start)?,
            }
        }
    }

    fn err(&self, at: usize, message: impl Into<String>) -> SyntaxError {
        SyntaxError::new(message, at as u32)
    }

    fn peek_char(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    fn push(&mut self, kind: Tok, start: usize) {
        self.tokens.push(Token {
            kind,
            span: Span::new(start as u32, self.pos as u32),
            newline_before: self.newline_pending,
        });
        self.newline_pending = false;
    }

    fn skip_trivia(&mut self) -> Result<(), SyntaxError> {
        loop {
            match self.peek_char() {
                Some(c) if c.is_whitespace() => {
                    if c == '\n' || c == '\r' || c == '\u{2028}' || c == '\u{2029}' {
                        self.newline_pending = true;
                    }
                    self.pos += c.len_utf8();
                }
                Some('/') if self.src[self.pos..].starts_with("//") => {
                    while let Some(c) = self.peek_char() {
                        if c == '\n' {
                            break;
                        }
                        self.pos += c.len_utf8();
                    }
                }
                Some('/') if self.src[self.pos..].starts_with("/*") => {
                    let start = self.pos;
                    self.pos += 2;
                    loop {
                        if self.pos >= self.src.len() {
                            return Err(self.err(start, "unterminated block comment"));
                        }
                        if self.src[self.pos..].starts_with("*/") {
                            self.pos += 2;
                            break;
                        }
                        let c = self.peek_char().unwrap_or('\0');
                        if c == '\n' {
                            self.newline_pending = true;
                        }
                        self.pos += c.len_utf8();
                    }
                }
                _ => return Ok(()),
            }
        }
    }

    fn regex_allowed(&self) -> bool {
        match self.tokens.last().map(|t| &t.kind) {
            None => true,
            Some(Tok::Ident(word)) => {
                if matches!(word.as_str(), "this" | "super" | "true" | "false" | "null") {
                    false
                } else {
                    keyword_precedes_operand(word)
                }
            }
            Some(Tok::Num(_) | Tok::BigInt(_) | Tok::Str(_) | Tok::Regex { .. }) => false,
            Some(Tok::TemplateFull(_) | Tok::TemplateTail(_)) => false,
            Some(Tok::Punct(p)) => !matches!(
                p,
                Punct::RParen | Punct::RBracket | Punct::PlusPlus | Punct::MinusMinus
            ),
            _ => true,
        }
    }

    fn in_template_substitution(&self) -> bool {
        self.template_stack.last().is_some_and(|depth| *depth == 0)
    }

    fn lex_string(&mut self, quote: char) -> Result<String, SyntaxError> {
        let start = self.pos;
        self.pos += 1;
        let mut value = String::new();
        loop {
            let Some(c) = self.peek_char() else {
                return Err(self.err(start, "unterminated string literal"));
            };
            self.pos += c.len_utf8();
            if c == quote {
                return Ok(value);
            }
            if c == '\n' {
                return Err(self.err(start, "unterminated string literal"));
            }
            if c == '\\' {
                if let Some(esc) = self.lex_escape(start)? {
                    value.push(esc);
                }
            } else {
                value.push(c);
            }
        }
    }

    /// Resolve one escape sequence after a consumed backslash. `None` means
    /// the escape produced no character (line continuation).
    fn lex_escape(&mut self, start: usize) -> Result<Option<char>, SyntaxError> {
        let Some(c) = self.peek_char() else {
            return Err(self.err(start, "unterminated escape sequence"));
        };
        self.pos += c.len_utf8();
        let resolved = match c {
            'n' => '\n',
            't' => '\t',
            'r' => '\r',
            'b' => '\u{8}',
            'f' => '\u{c}',
            'v' => '\u{b}',
            '0' => '\0',
            '\n' => return Ok(None),
            'x' => {
                let hex = self.take_hex(2, start)?;
                char::from_u32(hex).ok_or_else(|| self.err(start, "invalid \\x escape"))?
            }
            'u' => {
                if self.peek_char() == Some('{') {
                    self.pos += 1;
                    let close = self.src[self.pos..]
                        .find('}')
                        .ok_or_else(|| self.err(start, "unterminated \\u{} escape"))?;
                    let digits = &self.src[self.pos..self.pos + close];
                    let code = u32::from_str_radix(digits, 16)
                        .map_err(|_| self.err(start, "invalid \\u{} escape"))?;
                    self.pos += close + 1;
                    char::from_u32(code).ok_or_else(|| self.err(start, "invalid \\u{} escape"))?
                } else {
                    let hex = self.take_hex(4, start)?;
                    char::from_u32(hex).ok_or_else(|| self.err(start, "invalid \\u escape"))?
                }
            }
            other => other,
        };
        Ok(Some(resolved))
    }

    fn take_hex(&mut self, digits: usize, start: usize) -> Result<u32, SyntaxError> {
        let end = self.pos + digits;
        let slice = self
            .src
            .get(self.pos..end)
            .ok_or_else(|| self.err(start, "unterminated escape sequence"))?;
        let value = u32::from_str_radix(slice, 16).map_err(|_| self.err(start, "invalid hex escape"))?;
        self.pos = end;
        Ok(value)
    }

    /// Scan a template chunk starting just past a backtick (`opening`) or a
    /// substitution-closing `}`. Emits the appropriate template token.
    fn lex_template_part(&mut self, tok_start: usize, opening: bool) -> Result<(), SyntaxError> {
        let mut value = String::new();
        loop {
            let Some(c) = self.peek_char() else {
                return Err(self.err(tok_start, "unterminated template literal"));
            };
            if c == '`' {
                self.pos += 1;
                if opening {
                    self.push(Tok::TemplateFull(value), tok_start);
                } else {
                    self.template_stack.pop();
                    self.push(Tok::TemplateTail(value), tok_start);
                }
                return Ok(());
            }
            if c == '$' && self.src[self.pos..].starts_with("${") {
                self.pos += 2;
                if opening {
                    self.template_stack.push(0);
                    self.push(Tok::TemplateHead(value), tok_start);
                } else {
                    self.push(Tok::TemplateMiddle(value), tok_start);
                }
                return Ok(());
            }
            self.pos += c.len_utf8();
            if c == '\\' {
                if let Some(esc) = self.lex_escape(tok_start)? {
                    value.push(esc);
                }
            } else {
                value.push(c);
            }
        }
    }

    fn lex_number(&mut self, start: usize) -> Result<(), SyntaxError> {
        let rest = &self.src[start..];
        if rest.starts_with("0x") || rest.starts_with("0X") {
            return self.lex_radix_number(start, 16);
        }
        if rest.starts_with("0o") || rest.starts_with("0O") {
            return self.lex_radix_number(start, 8);
        }
        if rest.starts_with("0b") || rest.starts_with("0B") {
            return self.lex_radix_number(start, 2);
        }
        let mut seen_dot = false;
        let mut seen_exp = false;
        while let Some(c) = self.peek_char() {
            match c {
                '0'..='9' | '_' => self.pos += 1,
                '.' if !seen_dot && !seen_exp => {
                    seen_dot = true;
                    self.pos += 1;
                }
                'e' | 'E' if !seen_exp => {
                    seen_exp = true;
                    self.pos += 1;
                    if matches!(self.peek_char(), Some('+' | '-')) {
                        self.pos += 1;
                    }
                }
                'n' if !seen_dot && !seen_exp => {
                    let digits: String = self.src[start..self.pos].chars().filter(|c| *c != '_').collect();
                    self.pos += 1;
                    self.push(Tok::BigInt(digits), start);
                    return Ok(());
                }
                _ => break,
            }
        }
        let text: String = self.src[start..self.pos].chars().filter(|c| *c != '_').collect();
        let value: f64 = text
            .parse()
            .map_err(|_| self.err(start, format!("invalid number literal '{text}'")))?;
        self.push(Tok::Num(value), start);
        Ok(())
    }

    fn lex_radix_number(&mut self, start: usize, radix: u32) -> Result<(), SyntaxError> {
        self.pos += 2;
        let digits_start = self.pos;
        while self.peek_char().is_some_and(|c| c.is_digit(radix) || c == '_') {
            self.pos += 1;
        }
        let digits: String = self.src[digits_start..self.pos].chars().filter(|c| *c != '_').collect();
        if digits.is_empty() {
            return Err(self.err(start, "missing digits in number literal"));
        }
        if self.peek_char() == Some('n') {
            self.pos += 1;
            let value = u128::from_str_radix(&digits, radix)
                .map_err(|_| self.err(start, "bigint literal out of range"))?;
            self.push(Tok::BigInt(value.to_string()), start);
            return Ok(());
        }
        let value = u64::from_str_radix(&digits, radix)
            .map_err(|_| self.err(start, "number literal out of range"))?;
        self.push(Tok::Num(value as f64), start);
        Ok(())
    }

    fn lex_regex(&mut self) -> Result<(String, String), SyntaxError> {
        let start = self.pos;
        self.pos += 1;
        let source_start = self.pos;
        let mut in_class = false;
        loop {
            let Some(c) = self.peek_char() else {
                return Err(self.err(start, "unterminated regular expression"));
            };
            match c {
                '\\' => {
                    self.pos += 1;
                    let Some(escaped) = self.peek_char() else {
                        return Err(self.err(start, "unterminated regular expression"));
                    };
                    self.pos += escaped.len_utf8();
                    continue;
                }
                '[' => in_class = true,
                ']' => in_class = false,
                '/' if !in_class => break,
                '\n' => return Err(self.err(start, "unterminated regular expression")),
                _ => {}
            }
            self.pos += c.len_utf8();
        }
        let source = self.src[source_start..self.pos].to_owned();
        self.pos += 1;
        let flags_start = self.pos;
        while self.peek_char().is_some_and(is_identifier_continue) {
            self.pos += 1;
        }
        Ok((source, self.src[flags_start..self.pos].to_owned()))
    }

    fn lex_punct(&mut self, start: usize) -> Result<(), SyntaxError> {
        use Punct::*;
        let rest = &self.src[start..];
        let table: &[(&str, Punct)] = &[
            (">>>=", UShrAssign),
            ("===", EqEqEq),
            ("!==", NotEqEq),
            ("**=", StarStarAssign),
            ("<<=", ShlAssign),
            (">>=", ShrAssign),
            (">>>", UShr),
            ("&&=", AndAssign),
            ("||=", OrAssign),
            ("??=", NullishAssign),
            ("=>", Arrow),
            ("?.", QuestionDot),
            ("??", Nullish),
            ("==", EqEq),
            ("!=", NotEq),
            ("<=", LtEq),
            (">=", GtEq),
            ("<<", Shl),
            (">>", Shr),
            ("&&", AndAnd),
            ("||", OrOr),
            ("++", PlusPlus),
            ("--", MinusMinus),
            ("**", StarStar),
            ("+=", PlusAssign),
            ("-=", MinusAssign),
            ("*=", StarAssign),
            ("/=", SlashAssign),
            ("%=", PercentAssign),
            ("&=", AmpAssign),
            ("|=", PipeAssign),
            ("^=", CaretAssign),
            ("(", LParen),
            (")", RParen),
            ("{", LBrace),
            ("}", RBrace),
            ("[", LBracket),
            ("]", RBracket),
            (";", Semi),
            (",", Comma),
            ("?", Question),
            (":", Colon),
            ("=", Assign),
            ("+", Plus),
            ("-", Minus),
            ("*", Star),
            ("/", Slash),
            ("%", Percent),
            ("<", Lt),
            (">", Gt),
            ("&", Amp),
            ("|", Pipe),
            ("^", Caret),
            ("!", Bang),
            ("~", Tilde),
        ];
        for (text, punct) in table {
            if rest.starts_with(text) {
                if *punct == LBrace {
                    if let Some(depth) = self.template_stack.last_mut() {
                        *depth += 1;
                    }
                } else if *punct == RBrace {
                    if let Some(depth) = self.template_stack.last_mut() {
                        // depth 0 is handled by the template branch in run()
                        *depth = depth.saturating_sub(1);
                    }
                }
                self.pos += text.len();
                self.push(Tok::Punct(*punct), start);
                return Ok(());
            }
        }
        Err(self.err(start, format!("unexpected character '{}'", self.peek_char().unwrap_or('\0'))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<Tok> {
        tokenize(src).unwrap().into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn punctuation_longest_match() {
        assert_eq!(
            kinds("a >>>= b"),
            vec![
                Tok::Ident("a".into()),
                Tok::Punct(Punct::UShrAssign),
                Tok::Ident("b".into()),
                Tok::Eof
            ]
        );
    }

    #[test]
    fn regex_vs_division() {
        assert!(matches!(kinds("a / b")[1], Tok::Punct(Punct::Slash)));
        assert!(matches!(kinds("return /ab/g")[1], Tok::Regex { .. }));
        assert!(matches!(kinds("x = /a[/]b/")[2], Tok::Regex { .. }));
    }

    #[test]
    fn template_with_substitution() {
        let toks = kinds("`a${x}b`");
        assert_eq!(toks[0], Tok::TemplateHead("a".into()));
        assert_eq!(toks[1], Tok::Ident("x".into()));
        assert_eq!(toks[2], Tok::TemplateTail("b".into()));
    }

    #[test]
    fn nested_braces_inside_template() {
        let toks = kinds("`v=${ {a: 1}.a }!`");
        assert!(matches!(toks.last(), Some(Tok::Eof)));
        assert!(toks.iter().any(|t| matches!(t, Tok::TemplateTail(s) if s == "!")));
    }

    #[test]
    fn bigint_and_radix_literals() {
        assert_eq!(kinds("10n")[0], Tok::BigInt("10".into()));
        assert_eq!(kinds("0xffn")[0], Tok::BigInt("255".into()));
        assert_eq!(kinds("0b101")[0], Tok::Num(5.0));
    }

    #[test]
    fn newline_tracking() {
        let toks = tokenize("a\nb").unwrap();
        assert!(!toks[0].newline_before);
        assert!(toks[1].newline_before);
    }
}
