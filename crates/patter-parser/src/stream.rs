//! Token stream cursor for the hand-written parser.

use crate::error::{ParseError, ParseErrorKind};
use patter_lexer::{Keyword, Token};

/// Random-access, bidirectionally advanceable cursor over a finite
/// token sequence.
///
/// The cursor never skips tokens silently; newline coalescing at
/// statement boundaries is done explicitly via [`skip_newlines`].
/// Advancing past the end of the stream is a fatal parse error reported
/// with the last known line number.
///
/// [`skip_newlines`]: TokenStream::skip_newlines
pub struct TokenStream<'a> {
    tokens: &'a [Token],
    pos: usize,
    file: &'a str,
}

impl<'a> TokenStream<'a> {
    pub fn new(tokens: &'a [Token], file: &'a str) -> TokenStream<'a> {
        TokenStream {
            tokens,
            pos: 0,
            file,
        }
    }

    pub fn at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    /// Current token without consuming it; `None` at end of stream.
    pub fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    /// Current token, or the end-of-stream error.
    pub fn current(&self) -> Result<&Token, ParseError> {
        self.tokens
            .get(self.pos)
            .ok_or_else(|| self.end_of_stream())
    }

    /// Move to the next token. Moving past the end is fatal.
    pub fn advance(&mut self) -> Result<(), ParseError> {
        if self.pos < self.tokens.len() {
            self.pos += 1;
            Ok(())
        } else {
            Err(self.end_of_stream())
        }
    }

    /// Move back one token. Used to restore the cursor after a failed
    /// multi-token match.
    pub fn retreat(&mut self) {
        if self.pos > 0 {
            self.pos -= 1;
        }
    }

    /// Cursor position, for [`rewind_to`].
    ///
    /// [`rewind_to`]: TokenStream::rewind_to
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Restore a previously saved cursor position.
    pub fn rewind_to(&mut self, position: usize) {
        self.pos = position.min(self.tokens.len());
    }

    /// True if the current token is an identifier with the given
    /// subtype. False at end of stream.
    pub fn is_keyword(&self, keyword: Keyword) -> bool {
        matches!(self.peek(), Some(t) if t.is_keyword(keyword))
    }

    /// Consume the expected keyword or fail with an [`ExpectedKeyword`]
    /// error naming `what` (e.g. `"\"to\""`).
    ///
    /// [`ExpectedKeyword`]: ParseErrorKind::ExpectedKeyword
    pub fn expect_keyword(&mut self, keyword: Keyword, what: &str) -> Result<(), ParseError> {
        if self.is_keyword(keyword) {
            self.advance()
        } else {
            Err(self.error(
                ParseErrorKind::ExpectedKeyword,
                format!(
                    "Expected {what} here, found {}.",
                    self.description_of_current()
                ),
            ))
        }
    }

    /// Absorb a run of newline tokens.
    pub fn skip_newlines(&mut self) {
        while self.is_keyword(Keyword::Newline) {
            self.pos += 1;
        }
    }

    /// Line of the current token, or of the last token at end of
    /// stream.
    pub fn line(&self) -> u32 {
        match self.peek() {
            Some(token) => token.line,
            None => self.tokens.last().map(|t| t.line).unwrap_or(1),
        }
    }

    pub fn file(&self) -> &str {
        self.file
    }

    /// Description of the current token for diagnostics.
    pub fn description_of_current(&self) -> String {
        match self.peek() {
            Some(token) => token.description(),
            None => "end of script".to_string(),
        }
    }

    /// Build a parse error at the current position.
    pub fn error(&self, kind: ParseErrorKind, message: impl Into<String>) -> ParseError {
        ParseError {
            kind,
            file: self.file.to_string(),
            line: self.line(),
            message: message.into(),
            found: self.peek().map(|t| t.description()),
        }
    }

    fn end_of_stream(&self) -> ParseError {
        ParseError {
            kind: ParseErrorKind::UnterminatedConstruct,
            file: self.file.to_string(),
            line: self.line(),
            message: "Unexpected end of script.".to_string(),
            found: None,
        }
    }
}
