// Lexer for flow IR `.fir` source files.
//
// Tokenizes the textual form of the IR (see the parser for the grammar).
// Uses the `logos` crate for DFA-based lexing.
//
// Preconditions: input is valid UTF-8.
// Postconditions: returns all tokens with byte-offset spans, plus any lex errors.
// Failure modes: unrecognized characters produce `LexError`; lexing continues.
// Side effects: none.

use logos::Logos;
use std::fmt;

/// Byte-offset span in source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

/// A lexer error with location.
#[derive(Debug, Clone, PartialEq)]
pub struct LexError {
    pub span: Span,
    pub message: String,
}

/// Result of lexing: tokens plus any errors (non-fatal).
#[derive(Debug)]
pub struct LexResult {
    pub tokens: Vec<(Token, Span)>,
    pub errors: Vec<LexError>,
}

/// Flow IR token types.
///
/// Identifiers, variables (`$x`) and labels (`@l`) carry no value; use the
/// span to retrieve the text from the source. Whitespace, including
/// newlines, is insignificant.
#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\r\n]+|#[^\n]*")]
pub enum Token {
    // ── Module keywords ──
    #[token("main")]
    Main,
    #[token("processor")]
    Processor,
    #[token("graph")]
    Graph,
    #[token("namespace")]
    Namespace,
    #[token("input")]
    Input,
    #[token("output")]
    Output,
    #[token("stream")]
    Stream,
    #[token("event")]
    Event,
    #[token("value")]
    Value,
    #[token("node")]
    Node,
    #[token("connect")]
    Connect,
    #[token("delay")]
    Delay,

    // ── Function keywords ──
    #[token("fn")]
    Fn,
    #[token("run")]
    Run,
    #[token("init")]
    Init,
    #[token("sysinit")]
    SysInit,

    // ── Statement keywords ──
    #[token("call")]
    Call,
    #[token("read")]
    Read,
    #[token("write")]
    Write,
    #[token("advance")]
    Advance,
    #[token("br")]
    Br,
    #[token("br_if")]
    BrIf,
    #[token("ret")]
    Ret,
    #[token("true")]
    True,
    #[token("false")]
    False,

    // ── Symbols ──
    #[token("->")]
    Arrow,
    #[token("::")]
    PathSep,
    #[token(":")]
    Colon,
    #[token(".")]
    Dot,
    #[token("&")]
    Amp,
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token("<")]
    Lt,
    #[token(">")]
    Gt,
    #[token(",")]
    Comma,
    #[token("=")]
    Equals,

    // ── Literals ──
    //
    // Suffixed forms must be listed before the bare ones so the longer match
    // (number + suffix) wins over a bare number followed by an identifier.
    /// 64-bit integer literal (e.g. `5i64`).
    #[regex(r"-?[0-9]+i64", parse_int64)]
    Int64(i64),

    /// 32-bit float literal (e.g. `0.5f`).
    #[regex(r"-?[0-9]+\.[0-9]+([eE][+-]?[0-9]+)?f", parse_float32)]
    Float32(f32),

    /// 64-bit float literal (e.g. `0.5`, `1.0e3`).
    #[regex(r"-?[0-9]+\.[0-9]+([eE][+-]?[0-9]+)?", parse_float64)]
    Float64(f64),

    /// Integer literal. Also used for sizes and delays.
    #[regex(r"-?[0-9]+", parse_int)]
    Int(i64),

    // ── Names ──
    /// Variable: `$` followed by an identifier.
    #[regex(r"\$[a-zA-Z_][a-zA-Z0-9_]*")]
    Var,

    /// Block label: `@` followed by an identifier.
    #[regex(r"@[a-zA-Z_][a-zA-Z0-9_]*")]
    Label,

    // Placed after keywords; logos prioritises fixed `#[token]` matches
    // over regex for the same length, so `run` matches Run, not Ident.
    /// Identifier: `[a-zA-Z_][a-zA-Z0-9_]*`
    #[regex(r"[a-zA-Z_][a-zA-Z0-9_]*")]
    Ident,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Main => write!(f, "main"),
            Token::Processor => write!(f, "processor"),
            Token::Graph => write!(f, "graph"),
            Token::Namespace => write!(f, "namespace"),
            Token::Input => write!(f, "input"),
            Token::Output => write!(f, "output"),
            Token::Stream => write!(f, "stream"),
            Token::Event => write!(f, "event"),
            Token::Value => write!(f, "value"),
            Token::Node => write!(f, "node"),
            Token::Connect => write!(f, "connect"),
            Token::Delay => write!(f, "delay"),
            Token::Fn => write!(f, "fn"),
            Token::Run => write!(f, "run"),
            Token::Init => write!(f, "init"),
            Token::SysInit => write!(f, "sysinit"),
            Token::Call => write!(f, "call"),
            Token::Read => write!(f, "read"),
            Token::Write => write!(f, "write"),
            Token::Advance => write!(f, "advance"),
            Token::Br => write!(f, "br"),
            Token::BrIf => write!(f, "br_if"),
            Token::Ret => write!(f, "ret"),
            Token::True => write!(f, "true"),
            Token::False => write!(f, "false"),
            Token::Arrow => write!(f, "->"),
            Token::PathSep => write!(f, "::"),
            Token::Colon => write!(f, ":"),
            Token::Dot => write!(f, "."),
            Token::Amp => write!(f, "&"),
            Token::LParen => write!(f, "("),
            Token::RParen => write!(f, ")"),
            Token::LBrace => write!(f, "{{"),
            Token::RBrace => write!(f, "}}"),
            Token::LBracket => write!(f, "["),
            Token::RBracket => write!(f, "]"),
            Token::Lt => write!(f, "<"),
            Token::Gt => write!(f, ">"),
            Token::Comma => write!(f, ","),
            Token::Equals => write!(f, "="),
            Token::Int64(v) => write!(f, "{v}i64"),
            Token::Float32(v) => write!(f, "{v:?}f"),
            Token::Float64(v) => write!(f, "{v:?}"),
            Token::Int(v) => write!(f, "{v}"),
            Token::Var => write!(f, "<variable>"),
            Token::Label => write!(f, "<label>"),
            Token::Ident => write!(f, "<ident>"),
        }
    }
}

// ── Callbacks ──

fn parse_int(lex: &mut logos::Lexer<'_, Token>) -> Option<i64> {
    lex.slice().parse().ok()
}

fn parse_int64(lex: &mut logos::Lexer<'_, Token>) -> Option<i64> {
    lex.slice().strip_suffix("i64")?.parse().ok()
}

fn parse_float32(lex: &mut logos::Lexer<'_, Token>) -> Option<f32> {
    lex.slice().strip_suffix('f')?.parse().ok()
}

fn parse_float64(lex: &mut logos::Lexer<'_, Token>) -> Option<f64> {
    lex.slice().parse().ok()
}

// ── Public API ──

/// Lex a `.fir` source string into tokens.
///
/// Returns all successfully parsed tokens together with any errors for
/// unrecognised characters. Lexing is non-fatal: errors are collected and
/// the lexer continues past bad characters.
pub fn lex(source: &str) -> LexResult {
    let lexer = Token::lexer(source);
    let mut tokens = Vec::new();
    let mut errors = Vec::new();

    for (result, range) in lexer.spanned() {
        let span = Span {
            start: range.start,
            end: range.end,
        };
        match result {
            Ok(token) => tokens.push((token, span)),
            Err(()) => errors.push(LexError {
                span,
                message: format!("unexpected character: {:?}", &source[span.start..span.end]),
            }),
        }
    }

    LexResult { tokens, errors }
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    /// Helper: lex and assert no errors, return token list.
    fn lex_ok(source: &str) -> Vec<Token> {
        let result = lex(source);
        assert!(
            result.errors.is_empty(),
            "unexpected lex errors: {:?}",
            result.errors
        );
        result.tokens.into_iter().map(|(t, _)| t).collect()
    }

    #[test]
    fn module_keywords() {
        let tokens = lex_ok("main processor graph namespace input output stream event value");
        assert_eq!(
            tokens,
            vec![
                Token::Main,
                Token::Processor,
                Token::Graph,
                Token::Namespace,
                Token::Input,
                Token::Output,
                Token::Stream,
                Token::Event,
                Token::Value,
            ]
        );
    }

    #[test]
    fn keyword_vs_ident() {
        // `runner` is an identifier, not keyword `run` + `ner`
        let tokens = lex_ok("run runner br br_if");
        assert_eq!(tokens, vec![Token::Run, Token::Ident, Token::Br, Token::BrIf]);
    }

    #[test]
    fn symbols() {
        let tokens = lex_ok("-> :: : . & ( ) { } [ ] < > , =");
        assert_eq!(
            tokens,
            vec![
                Token::Arrow,
                Token::PathSep,
                Token::Colon,
                Token::Dot,
                Token::Amp,
                Token::LParen,
                Token::RParen,
                Token::LBrace,
                Token::RBrace,
                Token::LBracket,
                Token::RBracket,
                Token::Lt,
                Token::Gt,
                Token::Comma,
                Token::Equals,
            ]
        );
    }

    #[test]
    fn numeric_literals() {
        let tokens = lex_ok("3 -7 5i64 0.25 1.5f 2.0e3");
        assert_eq!(
            tokens,
            vec![
                Token::Int(3),
                Token::Int(-7),
                Token::Int64(5),
                Token::Float64(0.25),
                Token::Float32(1.5),
                Token::Float64(2000.0),
            ]
        );
    }

    #[test]
    fn arrow_is_not_negative_number() {
        let tokens = lex_ok("a.out -> b.in");
        assert_eq!(
            tokens,
            vec![
                Token::Ident,
                Token::Dot,
                Token::Ident,
                Token::Arrow,
                Token::Ident,
                Token::Dot,
                Token::Ident,
            ]
        );
    }

    #[test]
    fn variables_and_labels() {
        let result = lex("$x @loop");
        assert_eq!(result.tokens[0].0, Token::Var);
        assert_eq!(result.tokens[1].0, Token::Label);
        assert_eq!(result.tokens[1].1, Span { start: 3, end: 8 });
    }

    #[test]
    fn comments_and_newlines_skipped() {
        let tokens = lex_ok("advance # commit one frame\n\n  ret");
        assert_eq!(tokens, vec![Token::Advance, Token::Ret]);
    }

    #[test]
    fn unknown_character_reported() {
        let result = lex("advance ; ret");
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].span, Span { start: 8, end: 9 });
        assert_eq!(result.tokens.len(), 2);
    }
}
