// Copyright (c) Ken Kocienda and other contributors.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! Go tokenizer.
//!
//! Comments are skipped. Semicolons are inserted the way the Go lexer does:
//! a newline (or a comment containing one, or the end of the file) after an
//! identifier, a literal, one of `break continue fallthrough return`, `++`,
//! `--`, or a closing delimiter terminates the statement.

use gorefactor_core::Span;
use memchr::{memchr, memmem};

use crate::error::ParseError;
use crate::token::{Token, TokenKind};

/// Operators and delimiters, longest first.
const OPERATORS: &[(&str, TokenKind)] = &[
    ("<<=", TokenKind::ShlAssign),
    (">>=", TokenKind::ShrAssign),
    ("&^=", TokenKind::AndNotAssign),
    ("...", TokenKind::Ellipsis),
    ("&&", TokenKind::LAnd),
    ("||", TokenKind::LOr),
    ("<-", TokenKind::Arrow),
    ("++", TokenKind::Inc),
    ("--", TokenKind::Dec),
    ("==", TokenKind::Eql),
    ("!=", TokenKind::Neq),
    ("<=", TokenKind::Leq),
    (">=", TokenKind::Geq),
    (":=", TokenKind::Define),
    ("+=", TokenKind::AddAssign),
    ("-=", TokenKind::SubAssign),
    ("*=", TokenKind::MulAssign),
    ("/=", TokenKind::QuoAssign),
    ("%=", TokenKind::RemAssign),
    ("&=", TokenKind::AndAssign),
    ("|=", TokenKind::OrAssign),
    ("^=", TokenKind::XorAssign),
    ("<<", TokenKind::Shl),
    (">>", TokenKind::Shr),
    ("&^", TokenKind::AndNot),
    ("+", TokenKind::Add),
    ("-", TokenKind::Sub),
    ("*", TokenKind::Mul),
    ("/", TokenKind::Quo),
    ("%", TokenKind::Rem),
    ("&", TokenKind::And),
    ("|", TokenKind::Or),
    ("^", TokenKind::Xor),
    ("<", TokenKind::Lss),
    (">", TokenKind::Gtr),
    ("=", TokenKind::Assign),
    ("!", TokenKind::Not),
    ("~", TokenKind::Tilde),
    ("(", TokenKind::LParen),
    ("[", TokenKind::LBrack),
    ("{", TokenKind::LBrace),
    (",", TokenKind::Comma),
    (".", TokenKind::Period),
    (")", TokenKind::RParen),
    ("]", TokenKind::RBrack),
    ("}", TokenKind::RBrace),
    (";", TokenKind::Semicolon),
    (":", TokenKind::Colon),
];

/// Tokenize a whole file. The last token is always `Eof`.
pub fn tokenize(source: &str) -> Result<Vec<Token>, ParseError> {
    let mut lexer = Lexer::new(source);
    let mut tokens = Vec::new();
    loop {
        let token = lexer.next_token()?;
        tokens.push(token);
        if token.kind == TokenKind::Eof {
            return Ok(tokens);
        }
    }
}

/// Incremental tokenizer over one source file.
pub struct Lexer<'a> {
    source: &'a str,
    bytes: &'a [u8],
    pos: usize,
    insert_semi: bool,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Lexer {
            source,
            bytes: source.as_bytes(),
            pos: 0,
            insert_semi: false,
        }
    }

    /// Produce the next token.
    pub fn next_token(&mut self) -> Result<Token, ParseError> {
        loop {
            while let Some(&b) = self.bytes.get(self.pos) {
                match b {
                    b' ' | b'\t' | b'\r' => self.pos += 1,
                    b'\n' => {
                        if self.insert_semi {
                            return Ok(self.implicit_semicolon(self.pos));
                        }
                        self.pos += 1;
                    }
                    _ => break,
                }
            }

            let start = self.pos;
            let Some(&b) = self.bytes.get(start) else {
                if self.insert_semi {
                    return Ok(self.implicit_semicolon(start));
                }
                return Ok(Token {
                    kind: TokenKind::Eof,
                    span: Span::new(start, start),
                });
            };

            if b == b'/' {
                match self.bytes.get(start + 1) {
                    Some(b'/') => {
                        if self.insert_semi {
                            return Ok(self.implicit_semicolon(start));
                        }
                        self.pos = memchr(b'\n', &self.bytes[start..])
                            .map(|i| start + i)
                            .unwrap_or(self.bytes.len());
                        continue;
                    }
                    Some(b'*') => {
                        let Some(close) = memmem::find(&self.bytes[start + 2..], b"*/") else {
                            return Err(ParseError::new("comment not terminated", start));
                        };
                        let end = start + 2 + close + 2;
                        let multiline = memchr(b'\n', &self.bytes[start..end]).is_some();
                        if multiline && self.insert_semi {
                            return Ok(self.implicit_semicolon(start));
                        }
                        self.pos = end;
                        continue;
                    }
                    _ => {}
                }
            }
            break;
        }

        let start = self.pos;
        let kind = self.scan(start)?;
        self.insert_semi = kind.ends_statement();
        Ok(Token {
            kind,
            span: Span::new(start, self.pos),
        })
    }

    fn implicit_semicolon(&mut self, at: usize) -> Token {
        self.insert_semi = false;
        Token {
            kind: TokenKind::Semicolon,
            span: Span::new(at, at),
        }
    }

    fn scan(&mut self, start: usize) -> Result<TokenKind, ParseError> {
        let b = self.bytes[start];
        let next = self.bytes.get(start + 1).copied();
        if b.is_ascii_digit() || (b == b'.' && next.is_some_and(|n| n.is_ascii_digit())) {
            return Ok(self.scan_number());
        }
        match b {
            b'"' => self.scan_quoted(b'"', TokenKind::String),
            b'\'' => self.scan_quoted(b'\'', TokenKind::Char),
            b'`' => {
                let Some(close) = memchr(b'`', &self.bytes[start + 1..]) else {
                    return Err(ParseError::new("raw string literal not terminated", start));
                };
                self.pos = start + 1 + close + 1;
                Ok(TokenKind::String)
            }
            _ if b.is_ascii() && !is_ident_byte(b) => self.scan_operator(start),
            _ => self.scan_identifier(start),
        }
    }

    fn scan_identifier(&mut self, start: usize) -> Result<TokenKind, ParseError> {
        let mut chars = self.source[start..].char_indices();
        match chars.next() {
            Some((_, c)) if c == '_' || c.is_alphabetic() => {}
            Some((_, c)) => {
                return Err(ParseError::new(
                    format!("invalid character {:?}", c),
                    start,
                ))
            }
            None => return Err(ParseError::new("unexpected end of input", start)),
        }
        let len = chars
            .find(|&(_, c)| !(c == '_' || c.is_alphanumeric()))
            .map(|(i, _)| i)
            .unwrap_or(self.source.len() - start);
        self.pos = start + len;
        Ok(TokenKind::keyword(&self.source[start..self.pos]).unwrap_or(TokenKind::Ident))
    }

    fn scan_number(&mut self) -> TokenKind {
        let bytes = self.bytes;
        let hex = bytes[self.pos] == b'0' && matches!(bytes.get(self.pos + 1), Some(b'x' | b'X'));
        let prefixed = bytes[self.pos] == b'0'
            && matches!(
                bytes.get(self.pos + 1),
                Some(b'x' | b'X' | b'b' | b'B' | b'o' | b'O')
            );
        if prefixed {
            self.pos += 2;
        }

        let mut kind = TokenKind::Int;
        while let Some(&c) = bytes.get(self.pos) {
            if c.is_ascii_alphanumeric() || c == b'_' {
                self.pos += 1;
                let exponent = if hex {
                    matches!(c, b'p' | b'P')
                } else {
                    matches!(c, b'e' | b'E')
                };
                if exponent {
                    kind = TokenKind::Float;
                    if matches!(bytes.get(self.pos), Some(b'+' | b'-')) {
                        self.pos += 1;
                    }
                } else if c == b'i' {
                    kind = TokenKind::Imag;
                }
            } else if c == b'.' && bytes.get(self.pos + 1) != Some(&b'.') {
                kind = TokenKind::Float;
                self.pos += 1;
            } else {
                break;
            }
        }
        kind
    }

    fn scan_quoted(&mut self, quote: u8, kind: TokenKind) -> Result<TokenKind, ParseError> {
        let start = self.pos;
        self.pos += 1;
        loop {
            match self.bytes.get(self.pos) {
                Some(&b) if b == quote => {
                    self.pos += 1;
                    return Ok(kind);
                }
                Some(b'\\') => {
                    self.pos += 1;
                    if let Some(c) = self.source[self.pos..].chars().next() {
                        self.pos += c.len_utf8();
                    }
                }
                Some(b'\n') | None => {
                    let what = if quote == b'"' { "string" } else { "rune" };
                    return Err(ParseError::new(
                        format!("{} literal not terminated", what),
                        start,
                    ));
                }
                Some(_) => self.pos += 1,
            }
        }
    }

    fn scan_operator(&mut self, start: usize) -> Result<TokenKind, ParseError> {
        let rest = &self.bytes[start..];
        for (text, kind) in OPERATORS {
            if rest.starts_with(text.as_bytes()) {
                self.pos = start + text.len();
                return Ok(*kind);
            }
        }
        Err(ParseError::new(
            format!("invalid character {:?}", rest[0] as char),
            start,
        ))
    }
}

fn is_ident_byte(b: u8) -> bool {
    b == b'_' || b.is_ascii_alphanumeric()
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        tokenize(source)
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    fn texts(source: &str) -> Vec<&str> {
        tokenize(source)
            .unwrap()
            .into_iter()
            .map(|t| t.text(source))
            .collect()
    }

    mod semicolon_tests {
        use super::*;

        #[test]
        fn newline_after_identifier_ends_statement() {
            assert_eq!(
                kinds("x := y\nz"),
                vec![
                    TokenKind::Ident,
                    TokenKind::Define,
                    TokenKind::Ident,
                    TokenKind::Semicolon,
                    TokenKind::Ident,
                    TokenKind::Semicolon,
                    TokenKind::Eof,
                ]
            );
        }

        #[test]
        fn newline_after_operator_does_not() {
            assert_eq!(
                kinds("a +\nb"),
                vec![
                    TokenKind::Ident,
                    TokenKind::Add,
                    TokenKind::Ident,
                    TokenKind::Semicolon,
                    TokenKind::Eof,
                ]
            );
        }

        #[test]
        fn implicit_semicolon_is_empty() {
            let tokens = tokenize("return\n").unwrap();
            assert!(tokens[1].is_implicit());
            assert_eq!(tokens[1].span, Span::new(6, 6));
        }

        #[test]
        fn line_comment_terminates_statement() {
            let source = "x++ // bump\ny";
            let tokens = tokenize(source).unwrap();
            assert_eq!(tokens[1].kind, TokenKind::Inc);
            assert_eq!(tokens[2].kind, TokenKind::Semicolon);
            assert_eq!(tokens[3].text(source), "y");
        }

        #[test]
        fn single_line_block_comment_is_transparent() {
            assert_eq!(texts("a /* c */ + b"), vec!["a", "+", "b", "", ""]);
        }
    }

    mod literal_tests {
        use super::*;

        #[test]
        fn numbers() {
            assert_eq!(
                kinds("1 0x1F 1.5 .5 1e10 0x1p-2 2i 1_000"),
                vec![
                    TokenKind::Int,
                    TokenKind::Int,
                    TokenKind::Float,
                    TokenKind::Float,
                    TokenKind::Float,
                    TokenKind::Float,
                    TokenKind::Imag,
                    TokenKind::Int,
                    TokenKind::Semicolon,
                    TokenKind::Eof,
                ]
            );
        }

        #[test]
        fn strings_and_runes() {
            let source = r#""a\"b" `raw
text` 'x' '\n'"#;
            assert_eq!(
                texts(source),
                vec![r#""a\"b""#, "`raw\ntext`", "'x'", r"'\n'", "", ""]
            );
        }

        #[test]
        fn unterminated_string_is_an_error() {
            let err = tokenize("\"abc\n").unwrap_err();
            assert_eq!(err.offset, 0);
            assert!(err.message.contains("not terminated"));
        }

        #[test]
        fn unicode_identifiers() {
            assert_eq!(texts("größe := 1"), vec!["größe", ":=", "1", "", ""]);
        }
    }

    #[test]
    fn operators_take_longest_match() {
        assert_eq!(
            texts("a &^= b <<= c ... <-ch"),
            vec!["a", "&^=", "b", "<<=", "c", "...", "<-", "ch", "", ""]
        );
    }

    #[test]
    fn keywords_are_recognized() {
        assert_eq!(
            kinds("func if else"),
            vec![
                TokenKind::Func,
                TokenKind::If,
                TokenKind::Else,
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn invalid_character_is_reported() {
        let err = tokenize("a @ b").unwrap_err();
        assert_eq!(err.offset, 2);
    }
}
