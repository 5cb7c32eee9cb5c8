//! Lexer for the markup+script subset using logos.

use logos::Logos;
use std::ops::Range;

/// Token types for the JS/JSX subset the parser interprets structurally.
#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\n\r]+")]
#[logos(skip r"//[^\n]*")]
#[logos(skip r"/\*([^*]|\*[^/])*\*/")]
pub enum Token<'src> {
    // Keywords
    #[token("import")]
    Import,

    #[token("from")]
    From,

    #[token("export")]
    Export,

    #[token("var")]
    Var,

    #[token("let")]
    Let,

    #[token("const")]
    Const,

    #[token("function")]
    Function,

    #[token("return")]
    Return,

    #[token("as")]
    As,

    #[token("true")]
    True,

    #[token("false")]
    False,

    #[token("null")]
    Null,

    // Identifiers ($ is a valid identifier character in the script language)
    #[regex(r"[a-zA-Z_$][a-zA-Z0-9_$]*", |lex| lex.slice())]
    Ident(&'src str),

    // Literals; quotes stripped, escapes left for the parser to resolve
    #[regex(r#""([^"\\]|\\.)*""#, |lex| { let s = lex.slice(); &s[1..s.len()-1] })]
    Str(&'src str),

    #[regex(r"'([^'\\]|\\.)*'", |lex| { let s = lex.slice(); &s[1..s.len()-1] })]
    SingleStr(&'src str),

    #[regex(r"`([^`\\]|\\.)*`", |lex| { let s = lex.slice(); &s[1..s.len()-1] })]
    TemplateStr(&'src str),

    #[regex(r"[0-9]+(\.[0-9]+)?", |lex| lex.slice())]
    Number(&'src str),

    // Punctuation
    #[token("<")]
    LAngle,

    #[token(">")]
    RAngle,

    #[token("/")]
    Slash,

    #[token("{")]
    LBrace,

    #[token("}")]
    RBrace,

    #[token("(")]
    LParen,

    #[token(")")]
    RParen,

    #[token("[")]
    LBracket,

    #[token("]")]
    RBracket,

    #[token(",")]
    Comma,

    #[token(":")]
    Colon,

    #[token(";")]
    Semicolon,

    #[token("...")]
    DotDotDot,

    #[token(".")]
    Dot,

    #[token("=>")]
    Arrow,

    #[token("=")]
    Equals,

    #[token("+")]
    Plus,

    #[token("-")]
    Minus,

    #[token("*")]
    Star,

    #[token("%")]
    Percent,

    #[token("&")]
    Amp,

    #[token("|")]
    Pipe,

    #[token("!")]
    Bang,

    #[token("?")]
    Question,

    #[token("@")]
    At,

    // Anything the lexer cannot classify. The parser decides whether this
    // is a problem; inside slurped script regions it never is.
    #[regex(r".", priority = 0)]
    Unknown,
}

/// Tokenize source into `(token, byte range)` pairs.
///
/// Never fails: unrecognized characters become [`Token::Unknown`] so that
/// failure handling stays in the parser.
pub fn tokenize(source: &str) -> Vec<(Token<'_>, Range<usize>)> {
    let mut lexer = Token::lexer(source);
    let mut tokens = Vec::new();
    while let Some(result) = lexer.next() {
        let token = result.unwrap_or(Token::Unknown);
        tokens.push((token, lexer.span()));
    }
    tokens
}

/// Recover a `@jsx` pragma (factory function name) from the raw source.
///
/// Comments are skipped during tokenization, so the pragma is scanned for
/// directly before the token stream is built.
pub fn scan_jsx_factory_pragma(source: &str) -> Option<String> {
    let idx = source.find("@jsx")?;
    let rest = source[idx + 4..].trim_start();
    let name: String = rest
        .chars()
        .take_while(|c| c.is_alphanumeric() || *c == '_' || *c == '$' || *c == '.')
        .collect();
    if name.is_empty() {
        None
    } else {
        Some(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize_basic() {
        let tokens = tokenize("export var whatever = (props) => {}");
        assert_eq!(tokens[0].0, Token::Export);
        assert_eq!(tokens[1].0, Token::Var);
        assert_eq!(tokens[2].0, Token::Ident("whatever"));
        assert_eq!(tokens[3].0, Token::Equals);
        assert_eq!(tokens[4].0, Token::LParen);
        assert_eq!(tokens[5].0, Token::Ident("props"));
        assert_eq!(tokens[6].0, Token::RParen);
        assert_eq!(tokens[7].0, Token::Arrow);
    }

    #[test]
    fn test_tokenize_strings_strip_quotes() {
        let tokens = tokenize(r#"import React from "react";"#);
        assert!(tokens.iter().any(|(t, _)| *t == Token::Str("react")));
        let tokens = tokenize("'aaa'");
        assert_eq!(tokens[0].0, Token::SingleStr("aaa"));
    }

    #[test]
    fn test_tokenize_spread_vs_dot() {
        let tokens = tokenize("...rest a.b");
        assert_eq!(tokens[0].0, Token::DotDotDot);
        assert_eq!(tokens[3].0, Token::Dot);
    }

    #[test]
    fn test_tokenize_comments_skipped() {
        let tokens = tokenize("var x // trailing\n/* block */ = 5");
        let kinds: Vec<_> = tokens.iter().map(|(t, _)| t.clone()).collect();
        assert_eq!(
            kinds,
            vec![
                Token::Var,
                Token::Ident("x"),
                Token::Equals,
                Token::Number("5")
            ]
        );
    }

    #[test]
    fn test_tokenize_never_fails() {
        let tokens = tokenize("var x = #~#");
        assert!(tokens.iter().any(|(t, _)| *t == Token::Unknown));
    }

    #[test]
    fn test_scan_jsx_factory_pragma() {
        assert_eq!(
            scan_jsx_factory_pragma("/** @jsx jsx */\nvar x = 1"),
            Some("jsx".to_string())
        );
        assert_eq!(scan_jsx_factory_pragma("var x = 1"), None);
    }
}
