//! Process-wide lookup tables.
//!
//! All tables are `const` and therefore immutable by construction:
//! concurrent parses over distinct arenas share them freely. Entries
//! are scanned in order, which matters for the operator table: the
//! two-token rows for a glyph must precede its single-token row so that
//! `<=`, `<>`, `>=`, `is not`, and `&&` are tried first.

use patter_ast::ChunkType;
use patter_lexer::Keyword;

/// One row of the binary operator table.
pub struct OperatorEntry {
    /// First (or only) token of the operator.
    pub token: Keyword,
    /// Second token for two-token operators.
    pub second: Option<Keyword>,
    /// Higher binds tighter.
    pub precedence: u16,
    /// Intrinsic symbol the operator lowers to.
    pub symbol: &'static str,
}

pub const OPERATORS: &[OperatorEntry] = &[
    OperatorEntry { token: Keyword::And, second: None, precedence: 100, symbol: "vcy_op_and" },
    OperatorEntry { token: Keyword::Or, second: None, precedence: 100, symbol: "vcy_op_or" },
    OperatorEntry { token: Keyword::LessThan, second: Some(Keyword::GreaterThan), precedence: 200, symbol: "vcy_cmp_ne" },
    OperatorEntry { token: Keyword::LessThan, second: Some(Keyword::Equals), precedence: 200, symbol: "vcy_cmp_le" },
    OperatorEntry { token: Keyword::LessThan, second: None, precedence: 200, symbol: "vcy_cmp_lt" },
    OperatorEntry { token: Keyword::GreaterThan, second: Some(Keyword::Equals), precedence: 200, symbol: "vcy_cmp_ge" },
    OperatorEntry { token: Keyword::GreaterThan, second: None, precedence: 200, symbol: "vcy_cmp_gt" },
    OperatorEntry { token: Keyword::Equals, second: None, precedence: 200, symbol: "vcy_cmp" },
    OperatorEntry { token: Keyword::Is, second: Some(Keyword::Not), precedence: 200, symbol: "vcy_cmp_ne" },
    OperatorEntry { token: Keyword::Is, second: None, precedence: 200, symbol: "vcy_cmp" },
    OperatorEntry { token: Keyword::Ampersand, second: Some(Keyword::Ampersand), precedence: 300, symbol: "vcy_cat_space" },
    OperatorEntry { token: Keyword::Ampersand, second: None, precedence: 300, symbol: "vcy_cat" },
    OperatorEntry { token: Keyword::Plus, second: None, precedence: 500, symbol: "vcy_add" },
    OperatorEntry { token: Keyword::Minus, second: None, precedence: 500, symbol: "vcy_sub" },
    OperatorEntry { token: Keyword::Star, second: None, precedence: 1000, symbol: "vcy_mul" },
    OperatorEntry { token: Keyword::Slash, second: None, precedence: 1000, symbol: "vcy_div" },
    OperatorEntry { token: Keyword::Mod, second: None, precedence: 1000, symbol: "vcy_mod" },
    OperatorEntry { token: Keyword::Modulo, second: None, precedence: 1000, symbol: "vcy_mod" },
    OperatorEntry { token: Keyword::Caret, second: None, precedence: 1100, symbol: "vcy_pow" },
];

/// Unary operators, handled at term level; they bind tighter than any
/// binary operator.
pub const UNARY_OPERATORS: &[(Keyword, &str)] = &[
    (Keyword::Not, "vcy_not"),
    (Keyword::Minus, "vcy_neg"),
];

/// Intrinsic symbol for a unary operator keyword.
pub fn unary_operator_for(keyword: Keyword) -> Option<&'static str> {
    UNARY_OPERATORS
        .iter()
        .find(|(k, _)| *k == keyword)
        .map(|(_, symbol)| *symbol)
}

/// One row of the chunk-type table.
pub struct ChunkTypeEntry {
    pub singular: Keyword,
    pub plural: Keyword,
    pub chunk: ChunkType,
}

pub const CHUNK_TYPES: &[ChunkTypeEntry] = &[
    ChunkTypeEntry { singular: Keyword::Char, plural: Keyword::Chars, chunk: ChunkType::Character },
    ChunkTypeEntry { singular: Keyword::Character, plural: Keyword::Characters, chunk: ChunkType::Character },
    ChunkTypeEntry { singular: Keyword::Line, plural: Keyword::Lines, chunk: ChunkType::Line },
    ChunkTypeEntry { singular: Keyword::Item, plural: Keyword::Items, chunk: ChunkType::Item },
    ChunkTypeEntry { singular: Keyword::Word, plural: Keyword::Words, chunk: ChunkType::Word },
];

/// Chunk type for a chunk noun, singular or plural.
pub fn chunk_type_for(keyword: Keyword) -> Option<ChunkType> {
    CHUNK_TYPES
        .iter()
        .find(|entry| entry.singular == keyword || entry.plural == keyword)
        .map(|entry| entry.chunk)
}

/// Value of a keyword literal.
pub enum ConstantValue {
    Bool(bool),
    Str(&'static str),
    Float(f64),
}

pub const CONSTANTS: &[(Keyword, ConstantValue)] = &[
    (Keyword::True, ConstantValue::Bool(true)),
    (Keyword::False, ConstantValue::Bool(false)),
    (Keyword::Empty, ConstantValue::Str("")),
    (Keyword::CommaWord, ConstantValue::Str(",")),
    (Keyword::ColonWord, ConstantValue::Str(":")),
    (Keyword::Cr, ConstantValue::Str("\r")),
    (Keyword::LineFeed, ConstantValue::Str("\n")),
    (Keyword::Null, ConstantValue::Str("\0")),
    (Keyword::Quote, ConstantValue::Str("\"")),
    (Keyword::Return, ConstantValue::Str("\r")),
    (Keyword::NewlineWord, ConstantValue::Str("\n")),
    (Keyword::Space, ConstantValue::Str(" ")),
    (Keyword::Tab, ConstantValue::Str("\t")),
    (Keyword::Pi, ConstantValue::Float(std::f64::consts::PI)),
];

/// Literal value for a constant keyword.
pub fn constant_for(keyword: Keyword) -> Option<&'static ConstantValue> {
    CONSTANTS
        .iter()
        .find(|(k, _)| *k == keyword)
        .map(|(_, value)| value)
}

/// Engine-known global properties reachable through `set` and container
/// position. All `itemDelimiter` spellings share one global.
pub const GLOBAL_PROPERTIES: &[(Keyword, &str)] = &[
    (Keyword::ItemDel, "gItemDel"),
    (Keyword::ItemDelim, "gItemDel"),
    (Keyword::ItemDelimiter, "gItemDel"),
];

/// Shared global variable name for a property keyword.
pub fn global_property_for(keyword: Keyword) -> Option<&'static str> {
    GLOBAL_PROPERTIES
        .iter()
        .find(|(k, _)| *k == keyword)
        .map(|(_, name)| *name)
}
