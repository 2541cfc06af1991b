// Allow unwrap in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]

//! Token model and tokenizer for patter scripts.
//!
//! patter is an English-like scripting language in the HyperTalk family.
//! This crate defines the token stream the parser consumes:
//!
//! - [`Token`] — one lexical element (string, number, or identifier) with
//!   its original and case-folded spelling and 1-based source line
//! - [`Keyword`] — the closed enumeration of built-in identifier subtypes,
//!   with [`Keyword::NoKeyword`] as the sentinel for user identifiers
//! - [`tokenize`] — a logos-based scanner that turns source text into
//!   tokens
//!
//! # Design
//!
//! The language is case-insensitive, so every identifier token carries
//! both its original spelling (`text`) and a lowercased form
//! (`normalized`) used for keyword matching and canonical variable
//! naming. Operators and newlines are identifier-kind tokens with a
//! keyword subtype; the parser dispatches on subtypes throughout.
//!
//! Multi-glyph operators (`<=`, `>=`, `<>`, `&&`) are deliberately not
//! fused here. The scanner emits single glyphs and the parser matches
//! operator pairs with two-token look-ahead, restoring the cursor when a
//! pair fails to match.

use logos::Logos;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Built-in identifier subtypes.
///
/// A closed, ordered enumeration terminated by the [`NoKeyword`]
/// sentinel. The order is fixed: operator and chunk tables are scanned
/// in subtype order and the sentinel doubles as "no system-defined
/// identifier" on user tokens.
///
/// [`NoKeyword`]: Keyword::NoKeyword
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u16)]
pub enum Keyword {
    Function,
    End,
    Plus,
    Minus,
    Star,
    Slash,
    Newline,
    LessThan,
    GreaterThan,
    On,
    Comma,
    OpenParen,
    CloseParen,
    Put,
    Into,
    After,
    Before,
    Return,
    The,
    Result,
    Repeat,
    While,
    For,
    Times,
    With,
    To,
    Equals,
    Ampersand,
    If,
    Then,
    Else,
    From,
    True,
    False,
    Empty,
    OpenSquare,
    CloseSquare,
    Colon,
    Period,
    Quote,
    Down,
    Until,
    Item,
    Of,
    /// The word `newline` (the constant, not the line break).
    NewlineWord,
    Add,
    Subtract,
    Multiply,
    Divide,
    By,
    Character,
    Char,
    Word,
    Line,
    Entry,
    Param,
    Parameter,
    ParamCount,
    Is,
    Not,
    Caret,
    Mod,
    Modulo,
    Delete,
    ItemDel,
    ItemDelim,
    ItemDelimiter,
    Number,
    Characters,
    Chars,
    Words,
    Lines,
    Items,
    AtSign,
    And,
    Or,
    Exit,
    Next,
    Each,
    /// The word `comma` (the constant, not the separator).
    CommaWord,
    /// The word `colon` (the constant, not the glyph).
    ColonWord,
    Cr,
    LineFeed,
    Null,
    Space,
    Tab,
    Pi,
    Get,
    Short,
    Abbr,
    Abbrev,
    Abbreviated,
    Long,
    Num,
    Set,
    Id,
    Handler,
    Message,
    Global,
    Private,
    Public,
    /// Two-token pseudo-operator `&&`; produced by operator fusion only.
    DoubleAmpersand,
    /// Two-token pseudo-operator `<>`; produced by operator fusion only.
    NotEqual,
    /// Two-token pseudo-operator `<=`; produced by operator fusion only.
    LessThanEqual,
    /// Two-token pseudo-operator `>=`; produced by operator fusion only.
    GreaterThanEqual,
    Thru,
    Through,
    In,
    Byte,
    Bytes,
    /// Sentinel: not a system-defined identifier. Must stay last.
    NoKeyword,
}

impl Keyword {
    /// Look up the keyword subtype for a case-folded identifier.
    ///
    /// Returns [`Keyword::NoKeyword`] for user identifiers.
    pub fn lookup(normalized: &str) -> Keyword {
        match normalized {
            "function" => Keyword::Function,
            "end" => Keyword::End,
            "on" => Keyword::On,
            "put" => Keyword::Put,
            "into" => Keyword::Into,
            "after" => Keyword::After,
            "before" => Keyword::Before,
            "return" => Keyword::Return,
            "the" => Keyword::The,
            "result" => Keyword::Result,
            "repeat" => Keyword::Repeat,
            "while" => Keyword::While,
            "for" => Keyword::For,
            "times" => Keyword::Times,
            "with" => Keyword::With,
            "to" => Keyword::To,
            "if" => Keyword::If,
            "then" => Keyword::Then,
            "else" => Keyword::Else,
            "from" => Keyword::From,
            "true" => Keyword::True,
            "false" => Keyword::False,
            "empty" => Keyword::Empty,
            "quote" => Keyword::Quote,
            "down" => Keyword::Down,
            "until" => Keyword::Until,
            "item" => Keyword::Item,
            "of" => Keyword::Of,
            "newline" => Keyword::NewlineWord,
            "add" => Keyword::Add,
            "subtract" => Keyword::Subtract,
            "multiply" => Keyword::Multiply,
            "divide" => Keyword::Divide,
            "by" => Keyword::By,
            "character" => Keyword::Character,
            "char" => Keyword::Char,
            "word" => Keyword::Word,
            "line" => Keyword::Line,
            "entry" => Keyword::Entry,
            "param" => Keyword::Param,
            "parameter" => Keyword::Parameter,
            "paramcount" => Keyword::ParamCount,
            "is" => Keyword::Is,
            "not" => Keyword::Not,
            "mod" => Keyword::Mod,
            "modulo" => Keyword::Modulo,
            "delete" => Keyword::Delete,
            "itemdel" => Keyword::ItemDel,
            "itemdelim" => Keyword::ItemDelim,
            "itemdelimiter" => Keyword::ItemDelimiter,
            "number" => Keyword::Number,
            "characters" => Keyword::Characters,
            "chars" => Keyword::Chars,
            "words" => Keyword::Words,
            "lines" => Keyword::Lines,
            "items" => Keyword::Items,
            "and" => Keyword::And,
            "or" => Keyword::Or,
            "exit" => Keyword::Exit,
            "next" => Keyword::Next,
            "each" => Keyword::Each,
            "comma" => Keyword::CommaWord,
            "colon" => Keyword::ColonWord,
            "cr" => Keyword::Cr,
            "linefeed" => Keyword::LineFeed,
            "null" => Keyword::Null,
            "space" => Keyword::Space,
            "tab" => Keyword::Tab,
            "pi" => Keyword::Pi,
            "get" => Keyword::Get,
            "short" => Keyword::Short,
            "abbr" => Keyword::Abbr,
            "abbrev" => Keyword::Abbrev,
            "abbreviated" => Keyword::Abbreviated,
            "long" => Keyword::Long,
            "num" => Keyword::Num,
            "set" => Keyword::Set,
            "id" => Keyword::Id,
            "handler" => Keyword::Handler,
            "message" => Keyword::Message,
            "global" => Keyword::Global,
            "private" => Keyword::Private,
            "public" => Keyword::Public,
            "thru" => Keyword::Thru,
            "through" => Keyword::Through,
            "in" => Keyword::In,
            "byte" => Keyword::Byte,
            "bytes" => Keyword::Bytes,
            _ => Keyword::NoKeyword,
        }
    }
}

/// Lexical category of a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TokenKind {
    /// Quoted string literal.
    String,
    /// Integer literal. Floats are assembled by the parser from an
    /// integer / period / integer sequence.
    Number,
    /// Identifier, keyword, operator glyph, or newline.
    Identifier,
}

/// One lexical element of a patter script.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Token {
    /// Lexical category.
    pub kind: TokenKind,
    /// Keyword subtype; `Keyword::NoKeyword` for user identifiers,
    /// numbers, and strings.
    pub keyword: Keyword,
    /// Original spelling, case preserved.
    pub text: String,
    /// Case-folded spelling, used for keyword matching and canonical
    /// variable naming.
    pub normalized: String,
    /// Integer payload when `kind == Number`.
    pub number: i64,
    /// Decoded payload when `kind == String`.
    pub string: String,
    /// 1-based source line.
    pub line: u32,
}

impl Token {
    /// Identifier token; keyword subtype resolved from the folded text.
    pub fn identifier(text: &str, line: u32) -> Token {
        let normalized = text.to_lowercase();
        let keyword = Keyword::lookup(&normalized);
        Token {
            kind: TokenKind::Identifier,
            keyword,
            text: text.to_string(),
            normalized,
            number: 0,
            string: String::new(),
            line,
        }
    }

    /// Operator glyph token. Glyphs are identifier-kind tokens with a
    /// fixed keyword subtype.
    pub fn glyph(keyword: Keyword, text: &str, line: u32) -> Token {
        Token {
            kind: TokenKind::Identifier,
            keyword,
            text: text.to_string(),
            normalized: text.to_string(),
            number: 0,
            string: String::new(),
            line,
        }
    }

    /// Integer literal token.
    pub fn number(value: i64, text: &str, line: u32) -> Token {
        Token {
            kind: TokenKind::Number,
            keyword: Keyword::NoKeyword,
            text: text.to_string(),
            normalized: text.to_string(),
            number: value,
            string: String::new(),
            line,
        }
    }

    /// String literal token. `value` is the decoded payload without the
    /// surrounding quotes.
    pub fn string(value: &str, line: u32) -> Token {
        Token {
            kind: TokenKind::String,
            keyword: Keyword::NoKeyword,
            text: format!("\"{value}\""),
            normalized: String::new(),
            number: 0,
            string: value.to_string(),
            line,
        }
    }

    /// Statement-terminating newline token.
    pub fn newline(line: u32) -> Token {
        Token {
            kind: TokenKind::Identifier,
            keyword: Keyword::Newline,
            text: "\n".to_string(),
            normalized: "\n".to_string(),
            number: 0,
            string: String::new(),
            line,
        }
    }

    /// True if this token is an identifier with the given subtype.
    pub fn is_keyword(&self, keyword: Keyword) -> bool {
        self.kind == TokenKind::Identifier && self.keyword == keyword
    }

    /// Short human-readable description for diagnostics.
    pub fn description(&self) -> String {
        match self.kind {
            TokenKind::String => format!("string \"{}\"", self.string),
            TokenKind::Number => format!("number {}", self.number),
            TokenKind::Identifier if self.keyword == Keyword::Newline => {
                "end of line".to_string()
            }
            TokenKind::Identifier => format!("identifier \"{}\"", self.text),
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.description())
    }
}

/// Tokenizer error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LexError {
    #[error("{line}: error: Unterminated string literal.")]
    UnterminatedString { line: u32 },
    #[error("{line}: error: Unexpected character '{found}'.")]
    UnexpectedCharacter { found: char, line: u32 },
    #[error("{line}: error: Number literal out of range.")]
    NumberOutOfRange { line: u32 },
}

/// Raw lexemes. Identifiers are classified into [`Keyword`] subtypes in
/// a second step so the scanner stays case-insensitive without a regex
/// per keyword.
#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
#[logos(skip r"[ \t]+")]
#[logos(skip r"--[^\n]*")]
enum RawLexeme {
    #[regex(r"[0-9]+")]
    Number,
    #[regex(r#""[^"\n]*""#)]
    Str,
    #[regex(r"[A-Za-z_][A-Za-z0-9_]*")]
    Ident,
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,
    #[token("^")]
    Caret,
    #[token("=")]
    Equals,
    #[token("<")]
    LessThan,
    #[token(">")]
    GreaterThan,
    #[token("&")]
    Ampersand,
    #[token(",")]
    Comma,
    #[token(":")]
    Colon,
    #[token(".")]
    Period,
    #[token("(")]
    OpenParen,
    #[token(")")]
    CloseParen,
    #[token("[")]
    OpenSquare,
    #[token("]")]
    CloseSquare,
    #[token("@")]
    AtSign,
    #[token("\r\n")]
    #[token("\n")]
    #[token("\r")]
    Newline,
}

fn glyph_keyword(lexeme: RawLexeme) -> Keyword {
    match lexeme {
        RawLexeme::Plus => Keyword::Plus,
        RawLexeme::Minus => Keyword::Minus,
        RawLexeme::Star => Keyword::Star,
        RawLexeme::Slash => Keyword::Slash,
        RawLexeme::Caret => Keyword::Caret,
        RawLexeme::Equals => Keyword::Equals,
        RawLexeme::LessThan => Keyword::LessThan,
        RawLexeme::GreaterThan => Keyword::GreaterThan,
        RawLexeme::Ampersand => Keyword::Ampersand,
        RawLexeme::Comma => Keyword::Comma,
        RawLexeme::Colon => Keyword::Colon,
        RawLexeme::Period => Keyword::Period,
        RawLexeme::OpenParen => Keyword::OpenParen,
        RawLexeme::CloseParen => Keyword::CloseParen,
        RawLexeme::OpenSquare => Keyword::OpenSquare,
        RawLexeme::CloseSquare => Keyword::CloseSquare,
        RawLexeme::AtSign => Keyword::AtSign,
        _ => Keyword::NoKeyword,
    }
}

/// Tokenize a patter script.
///
/// Spaces, tabs, and `--` comments are skipped. Newlines become tokens:
/// they terminate statements and the parser coalesces runs of them
/// explicitly. A trailing newline token is appended if the source does
/// not end with one, so the last statement of a script always has a
/// terminator.
pub fn tokenize(source: &str) -> Result<Vec<Token>, LexError> {
    let mut tokens = Vec::new();
    let mut line: u32 = 1;
    let mut lexer = RawLexeme::lexer(source);

    while let Some(lexeme) = lexer.next() {
        let slice = lexer.slice();
        match lexeme {
            Ok(RawLexeme::Newline) => {
                tokens.push(Token::newline(line));
                line += 1;
            }
            Ok(RawLexeme::Number) => {
                let value = slice
                    .parse::<i64>()
                    .map_err(|_| LexError::NumberOutOfRange { line })?;
                tokens.push(Token::number(value, slice, line));
            }
            Ok(RawLexeme::Str) => {
                tokens.push(Token::string(&slice[1..slice.len() - 1], line));
            }
            Ok(RawLexeme::Ident) => tokens.push(Token::identifier(slice, line)),
            Ok(glyph) => tokens.push(Token::glyph(glyph_keyword(glyph), slice, line)),
            Err(()) => {
                return Err(if slice.starts_with('"') {
                    LexError::UnterminatedString { line }
                } else {
                    LexError::UnexpectedCharacter {
                        found: slice.chars().next().unwrap_or('\0'),
                        line,
                    }
                });
            }
        }
    }

    if !matches!(tokens.last(), Some(t) if t.keyword == Keyword::Newline) {
        tokens.push(Token::newline(line));
    }

    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keywords_fold_case() {
        let tokens = tokenize("PUT Repeat eNd").unwrap();
        assert_eq!(tokens[0].keyword, Keyword::Put);
        assert_eq!(tokens[1].keyword, Keyword::Repeat);
        assert_eq!(tokens[2].keyword, Keyword::End);
        assert_eq!(tokens[0].text, "PUT");
        assert_eq!(tokens[0].normalized, "put");
    }

    #[test]
    fn user_identifiers_get_the_sentinel() {
        let tokens = tokenize("greet Who").unwrap();
        assert_eq!(tokens[0].keyword, Keyword::NoKeyword);
        assert_eq!(tokens[1].keyword, Keyword::NoKeyword);
        assert_eq!(tokens[1].normalized, "who");
    }

    #[test]
    fn numbers_and_strings() {
        let tokens = tokenize("put \"hi there\" into x\nput 42 into y").unwrap();
        assert_eq!(tokens[1].kind, TokenKind::String);
        assert_eq!(tokens[1].string, "hi there");
        let num = tokens.iter().find(|t| t.kind == TokenKind::Number).unwrap();
        assert_eq!(num.number, 42);
    }

    #[test]
    fn newlines_carry_line_numbers() {
        let tokens = tokenize("a\nb\nc").unwrap();
        let c = tokens.iter().find(|t| t.normalized == "c").unwrap();
        assert_eq!(c.line, 3);
    }

    #[test]
    fn comments_are_skipped() {
        let tokens = tokenize("put x -- trailing words\nend").unwrap();
        assert!(!tokens.iter().any(|t| t.text.contains("trailing")));
        // The newline after the comment survives.
        assert!(tokens[2].is_keyword(Keyword::Newline));
    }

    #[test]
    fn operator_glyphs_are_identifier_tokens() {
        let tokens = tokenize("a <= b").unwrap();
        // The scanner emits `<` and `=` separately; the parser fuses them.
        assert!(tokens[1].is_keyword(Keyword::LessThan));
        assert!(tokens[2].is_keyword(Keyword::Equals));
        assert_eq!(tokens[1].kind, TokenKind::Identifier);
    }

    #[test]
    fn trailing_newline_is_guaranteed() {
        let tokens = tokenize("put x into y").unwrap();
        assert!(tokens.last().unwrap().is_keyword(Keyword::Newline));
    }

    #[test]
    fn unterminated_string_errors() {
        let err = tokenize("put \"oops\ninto x").unwrap_err();
        assert_eq!(err, LexError::UnterminatedString { line: 1 });
    }

    #[test]
    fn unexpected_character_errors() {
        let err = tokenize("put 1 ; 2").unwrap_err();
        assert!(matches!(err, LexError::UnexpectedCharacter { found: ';', line: 1 }));
    }

    #[test]
    fn descriptions_are_recognizable() {
        let tokens = tokenize("put 7 \"hey\"").unwrap();
        assert_eq!(tokens[0].description(), "identifier \"put\"");
        assert_eq!(tokens[1].description(), "number 7");
        assert_eq!(tokens[2].description(), "string \"hey\"");
        assert_eq!(tokens[3].description(), "end of line");
    }
}
