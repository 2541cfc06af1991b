// Allow unwrap in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]

//! Recursive descent parser for patter scripts.
//!
//! The parser consumes the token stream produced by `patter-lexer` and
//! builds a [`ParseTree`] owned by `patter-ast`. The language is in the
//! HyperTalk family: statements are English-like lines (`put X into Y`,
//! `repeat with i from 1 to n`), handlers are bracketed by
//! `function`/`on`/`to` … `end <name>`, and expressions mix symbolic and
//! word operators with multi-word forms matched by look-ahead.
//!
//! ## Architecture
//!
//! - `stream`: token cursor with look-ahead, retreat, and expectation
//!   helpers
//! - `error`: structured parse errors and collected diagnostics
//! - `tables`: `const` operator / chunk / constant / property tables
//! - `stmt`: keyword-dispatched statement and handler parsers
//! - `expr`: two-stack operator-precedence engine and term parser
//!
//! ## Entry points
//!
//! [`Parser::parse`] parses a whole script of handler definitions.
//! [`Parser::parse_command_or_expression`] wraps loose statement lines
//! in an implicit command handler named `:run`, which templates can use
//! as a main entry point.
//!
//! A parse error aborts the compilation unit. Unknown top-level
//! constructs only produce warnings: they are skipped to the end of the
//! line and recorded on the parser.

mod error;
mod expr;
mod stmt;
mod stream;
pub mod tables;

pub use error::{Message, ParseError, ParseErrorKind, Severity};
pub use stream::TokenStream;

use patter_ast::{NodeId, ParseTree};
use patter_lexer::{Keyword, Token};

/// Name and flavor of the first handler in a compilation unit.
///
/// Recorded once and never overwritten; templates use it as the unit's
/// entry point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FirstHandler {
    pub name: String,
    pub is_function: bool,
}

/// Statement context: the handler whose locals are in scope and the
/// block statements are appended to.
#[derive(Debug, Clone, Copy)]
pub(crate) struct BlockCtx {
    pub function: NodeId,
    pub block: NodeId,
}

/// Parser state for one compilation unit.
#[derive(Debug, Default)]
pub struct Parser {
    file: String,
    first_handler: Option<FirstHandler>,
    messages: Vec<Message>,
}

impl Parser {
    pub fn new() -> Parser {
        Parser::default()
    }

    /// First handler parsed by this parser, if any.
    pub fn first_handler(&self) -> Option<&FirstHandler> {
        self.first_handler.as_ref()
    }

    /// Warnings and non-fatal messages collected so far.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Parse a tokenized script into `tree`.
    ///
    /// Top-level constructs are handler definitions (`function`, `on`,
    /// `to`); blank lines are skipped and anything else is warned about
    /// and skipped to end of line.
    pub fn parse(
        &mut self,
        file: &str,
        tokens: &[Token],
        tree: &mut ParseTree,
    ) -> Result<(), ParseError> {
        self.file = file.to_string();
        let mut stream = TokenStream::new(tokens, file);
        while !stream.at_end() {
            self.parse_top_level_construct(&mut stream, tree)?;
        }
        Ok(())
    }

    /// Parse loose statement lines as the body of an implicit command
    /// handler named `:run`.
    pub fn parse_command_or_expression(
        &mut self,
        file: &str,
        tokens: &[Token],
        tree: &mut ParseTree,
    ) -> Result<(), ParseError> {
        self.file = file.to_string();
        let mut stream = TokenStream::new(tokens, file);
        let handler = self.begin_handler(":run", true, stream.line(), tree);
        let ctx = BlockCtx {
            function: handler,
            block: handler,
        };
        loop {
            stream.skip_newlines();
            if stream.at_end() {
                break;
            }
            self.parse_one_line(":run", &mut stream, tree, ctx, false)?;
        }
        Ok(())
    }

    fn parse_top_level_construct(
        &mut self,
        stream: &mut TokenStream<'_>,
        tree: &mut ParseTree,
    ) -> Result<(), ParseError> {
        if stream.is_keyword(Keyword::Newline) {
            return stream.advance();
        }
        if stream.is_keyword(Keyword::Function) {
            stream.advance()?;
            return self.parse_function_definition(false, stream, tree);
        }
        if stream.is_keyword(Keyword::On) || stream.is_keyword(Keyword::To) {
            stream.advance()?;
            return self.parse_function_definition(true, stream, tree);
        }

        // Unknown construct: warn and skip to end of line.
        let line = stream.line();
        let mut skipped = format!("Skipping {}", stream.description_of_current());
        stream.advance()?;
        while !stream.at_end() && !stream.is_keyword(Keyword::Newline) {
            skipped.push(' ');
            skipped.push_str(&stream.description_of_current());
            stream.advance()?;
        }
        skipped.push('.');
        tracing::warn!("{}:{}: warning: {}", self.file, line, skipped);
        self.messages.push(Message {
            severity: Severity::Warning,
            file: self.file.clone(),
            line,
            message: skipped,
        });
        Ok(())
    }
}
