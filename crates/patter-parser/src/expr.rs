//! Expression parsing.
//!
//! A precedence engine over two stacks, operands and operators. Each
//! new binary operator is compared against the stack top: while the top
//! operator binds at least as tightly, it collapses (the two topmost
//! operands fold into a call that becomes the left operand of what
//! follows), and then the new operand is shifted. The remaining stack
//! collapses right to left at end of input. This groups
//! `a op1 b op2 c` as `(a op1 b) op2 c` exactly when `op1` binds at
//! least as tightly as `op2`.
//!
//! Multi-token operators (`<=`, `>=`, `<>`, `is not`, `&&`) are matched
//! with two-token look-ahead; a failed second-token match restores the
//! cursor. Unary `not` and `-` are handled at term level and bind
//! tighter than any binary operator.

use crate::error::ParseErrorKind;
use crate::tables::{chunk_type_for, constant_for, unary_operator_for, ConstantValue, OPERATORS};
use crate::{BlockCtx, ParseError, Parser, TokenStream};
use patter_ast::{ChunkType, NodeId, NodeKind, ParseTree};
use patter_lexer::{Keyword, TokenKind};

impl Parser {
    /// Parse a full expression.
    pub(crate) fn parse_expression(
        &mut self,
        stream: &mut TokenStream<'_>,
        tree: &mut ParseTree,
        ctx: BlockCtx,
    ) -> Result<NodeId, ParseError> {
        let mut terms = vec![self.parse_term(stream, tree, ctx)?];
        let mut operators: Vec<(u16, &'static str)> = Vec::new();

        while let Some((precedence, symbol)) = parse_operator(stream)? {
            while matches!(operators.last(), Some((top, _)) if *top >= precedence) {
                collapse_once(tree, &mut terms, &mut operators);
            }
            terms.push(self.parse_term(stream, tree, ctx)?);
            operators.push((precedence, symbol));
        }

        while !operators.is_empty() {
            collapse_once(tree, &mut terms, &mut operators);
        }
        Ok(terms.pop().expect("BUG: empty term stack"))
    }

    /// Parse a single term.
    pub(crate) fn parse_term(
        &mut self,
        stream: &mut TokenStream<'_>,
        tree: &mut ParseTree,
        ctx: BlockCtx,
    ) -> Result<NodeId, ParseError> {
        let token = stream.current()?;
        match token.kind {
            TokenKind::String => {
                let node = tree.add(token.line, NodeKind::StringValue(token.string.clone()));
                stream.advance()?;
                Ok(node)
            }
            // An integer; an integer / period / integer sequence makes a
            // float, otherwise the period is put back for someone else.
            TokenKind::Number => {
                let line = token.line;
                let whole = token.number;
                let whole_text = token.text.clone();
                stream.advance()?;
                if stream.is_keyword(Keyword::Period) {
                    stream.advance()?;
                    let fraction = stream
                        .peek()
                        .filter(|t| t.kind == TokenKind::Number)
                        .map(|t| t.text.clone());
                    if let Some(fraction) = fraction {
                        stream.advance()?;
                        let value: f64 = format!("{whole_text}.{fraction}")
                            .parse()
                            .expect("BUG: digit sequence failed to parse as float");
                        return Ok(tree.add(line, NodeKind::FloatValue(value)));
                    }
                    stream.retreat();
                }
                Ok(tree.add(line, NodeKind::IntValue(whole)))
            }
            TokenKind::Identifier => self.parse_identifier_term(stream, tree, ctx),
        }
    }

    fn parse_identifier_term(
        &mut self,
        stream: &mut TokenStream<'_>,
        tree: &mut ParseTree,
        ctx: BlockCtx,
    ) -> Result<NodeId, ParseError> {
        let token = stream.current()?;
        let keyword = token.keyword;
        let line = token.line;
        match keyword {
            // User identifier: call with brackets, variable without.
            Keyword::NoKeyword => {
                let name = token.normalized.clone();
                stream.advance()?;
                if stream.is_keyword(Keyword::OpenParen) {
                    stream.advance()?;
                    let args = self.parse_param_list(Keyword::CloseParen, stream, tree, ctx)?;
                    stream.advance()?; // closing bracket
                    Ok(tree.add(
                        line,
                        NodeKind::FunctionCall {
                            name,
                            is_command: false,
                            args,
                        },
                    ))
                } else {
                    stream.retreat();
                    self.parse_container(true, stream, tree, ctx)
                }
            }
            Keyword::OpenParen => {
                stream.advance()?;
                let inner = self.parse_expression(stream, tree, ctx)?;
                if !stream.is_keyword(Keyword::CloseParen) {
                    return Err(stream.error(
                        ParseErrorKind::ExpectedKeyword,
                        format!(
                            "Expected closing bracket here, found {}.",
                            stream.description_of_current()
                        ),
                    ));
                }
                stream.advance()?;
                Ok(inner)
            }
            Keyword::Entry => self.parse_array_item(stream, tree, ctx),
            Keyword::Id => self.parse_handler_id(stream, tree),
            Keyword::Number | Keyword::Num => self.parse_chunk_count(stream, tree, ctx),
            Keyword::The => self.parse_the_term(stream, tree, ctx),
            Keyword::ParamCount => {
                stream.advance()?;
                let mut had_brackets = false;
                if stream.is_keyword(Keyword::OpenParen) {
                    stream.advance()?;
                    if stream.is_keyword(Keyword::CloseParen) {
                        stream.advance()?;
                        had_brackets = true;
                    }
                }
                if !had_brackets {
                    return Err(stream.error(
                        ParseErrorKind::ExpectedKeyword,
                        format!(
                            "Expected \"(\" and \")\" after function name, found {}.",
                            stream.description_of_current()
                        ),
                    ));
                }
                Ok(self.param_count_call(line, tree, ctx))
            }
            Keyword::Param => {
                stream.advance()?;
                if !stream.is_keyword(Keyword::OpenParen) {
                    return Err(stream.error(
                        ParseErrorKind::ExpectedKeyword,
                        format!(
                            "Expected \"(\" after function name, found {}.",
                            stream.description_of_current()
                        ),
                    ));
                }
                stream.advance()?;
                let index = self.parse_expression(stream, tree, ctx)?;
                if !stream.is_keyword(Keyword::CloseParen) {
                    return Err(stream.error(
                        ParseErrorKind::ExpectedKeyword,
                        format!(
                            "Expected \")\" after parameter number, found {}.",
                            stream.description_of_current()
                        ),
                    ));
                }
                stream.advance()?;
                Ok(self.param_get_call(index, line, tree, ctx))
            }
            Keyword::Parameter => {
                stream.advance()?;
                let index = self.parse_expression(stream, tree, ctx)?;
                Ok(self.param_get_call(index, line, tree, ctx))
            }
            Keyword::Result
            | Keyword::ItemDel
            | Keyword::ItemDelim
            | Keyword::ItemDelimiter => self.parse_container(true, stream, tree, ctx),
            Keyword::End => Err(stream.error(
                ParseErrorKind::MalformedExpression,
                format!(
                    "Expected a term here, found {}.",
                    stream.description_of_current()
                ),
            )),
            _ => {
                if let Some(chunk) = chunk_type_for(keyword) {
                    return self.parse_chunk_expression(chunk, true, stream, tree, ctx);
                }
                if let Some(value) = constant_for(keyword) {
                    let node = match value {
                        ConstantValue::Bool(value) => NodeKind::BoolValue(*value),
                        ConstantValue::Str(value) => NodeKind::StringValue(value.to_string()),
                        ConstantValue::Float(value) => NodeKind::FloatValue(*value),
                    };
                    stream.advance()?;
                    return Ok(tree.add(line, node));
                }
                if let Some(symbol) = unary_operator_for(keyword) {
                    stream.advance()?;
                    let operand = self.parse_term(stream, tree, ctx)?;
                    return Ok(tree.add(
                        line,
                        NodeKind::FunctionCall {
                            name: symbol.to_string(),
                            is_command: false,
                            args: vec![operand],
                        },
                    ));
                }
                Err(stream.error(
                    ParseErrorKind::MalformedExpression,
                    format!(
                        "Expected a term here, found {}.",
                        stream.description_of_current()
                    ),
                ))
            }
        }
    }

    /// A chunk expression: `<chunkType> START [to END] of TARGET`, with
    /// the cursor on the chunk noun.
    ///
    /// Without a range clause the end offset aliases the start node.
    /// The target is a term, not a full expression, so chained chunks
    /// (`item 1 of char 2 to 4 of x`) nest correctly. A chunk nested as
    /// another chunk's target is constant: only the outermost chunk
    /// needs the in-place source/destination slots.
    pub(crate) fn parse_chunk_expression(
        &mut self,
        chunk: ChunkType,
        mutable: bool,
        stream: &mut TokenStream<'_>,
        tree: &mut ParseTree,
        ctx: BlockCtx,
    ) -> Result<NodeId, ParseError> {
        stream.advance()?; // the chunk noun
        let start = self.parse_expression(stream, tree, ctx)?;
        let line = stream.line();

        let mut end = start;
        let mut had_range = false;
        if stream.is_keyword(Keyword::To)
            || stream.is_keyword(Keyword::Through)
            || stream.is_keyword(Keyword::Thru)
        {
            stream.advance()?;
            end = self.parse_expression(stream, tree, ctx)?;
            had_range = true;
        }

        if !stream.is_keyword(Keyword::Of) {
            let message = if had_range {
                format!(
                    "Expected \"of\" here, found {}.",
                    stream.description_of_current()
                )
            } else {
                format!(
                    "Expected \"to\" or \"of\" here, found {}.",
                    stream.description_of_current()
                )
            };
            return Err(stream.error(ParseErrorKind::ExpectedKeyword, message));
        }
        stream.advance()?;

        let nested = stream.peek().and_then(|t| chunk_type_for(t.keyword));
        let target = match nested {
            Some(inner) => self.parse_chunk_expression(inner, false, stream, tree, ctx)?,
            None => self.parse_term(stream, tree, ctx)?,
        };
        Ok(tree.add(
            line,
            NodeKind::ChunkRef {
                chunk,
                start,
                end,
                target,
                mutable,
            },
        ))
    }

    /// `entry INDEX of CONTAINER`.
    fn parse_array_item(
        &mut self,
        stream: &mut TokenStream<'_>,
        tree: &mut ParseTree,
        ctx: BlockCtx,
    ) -> Result<NodeId, ParseError> {
        stream.advance()?; // entry
        let index = self.parse_expression(stream, tree, ctx)?;
        stream.expect_keyword(Keyword::Of, "\"of\"")?;
        let line = stream.line();
        let target = self.parse_container(true, stream, tree, ctx)?;
        Ok(tree.add(
            line,
            NodeKind::FunctionCall {
                name: "GetItemOfListWithKey".to_string(),
                is_command: true,
                args: vec![target, index],
            },
        ))
    }

    /// `id of [function|message] handler NAME` captures the handler's
    /// address, prefixed `fun_` or `hdl_`.
    fn parse_handler_id(
        &mut self,
        stream: &mut TokenStream<'_>,
        tree: &mut ParseTree,
    ) -> Result<NodeId, ParseError> {
        stream.advance()?; // id
        stream.expect_keyword(Keyword::Of, "\"of\"")?;

        let prefix = if stream.is_keyword(Keyword::Function) {
            stream.advance()?;
            if stream.is_keyword(Keyword::Handler) {
                stream.advance()?;
            }
            "fun_"
        } else if stream.is_keyword(Keyword::Message) {
            stream.advance()?;
            if !stream.is_keyword(Keyword::Handler) {
                return Err(stream.error(
                    ParseErrorKind::ExpectedKeyword,
                    format!(
                        "Expected \"function handler\" or \"message handler\" here, found {}.",
                        stream.description_of_current()
                    ),
                ));
            }
            stream.advance()?;
            "hdl_"
        } else {
            if !stream.is_keyword(Keyword::Handler) {
                return Err(stream.error(
                    ParseErrorKind::ExpectedKeyword,
                    format!(
                        "Expected \"function handler\" or \"message handler\" here, found {}.",
                        stream.description_of_current()
                    ),
                ));
            }
            stream.advance()?;
            "hdl_"
        };

        let token = stream.current()?;
        let captured = format!("{prefix}{}", token.normalized);
        let line = token.line;
        stream.advance()?;

        let name_node = tree.add(line, NodeKind::StringValue(captured));
        Ok(tree.add(
            line,
            NodeKind::FunctionCall {
                name: "vcy_fcn_addr".to_string(),
                is_command: false,
                args: vec![name_node],
            },
        ))
    }

    /// `number of <chunkType> of TERM`.
    fn parse_chunk_count(
        &mut self,
        stream: &mut TokenStream<'_>,
        tree: &mut ParseTree,
        ctx: BlockCtx,
    ) -> Result<NodeId, ParseError> {
        stream.advance()?; // number
        stream.expect_keyword(Keyword::Of, "\"of\"")?;

        let token = stream.current()?;
        let Some(chunk) = chunk_type_for(token.keyword) else {
            return Err(stream.error(
                ParseErrorKind::ExpectedKeyword,
                format!(
                    "Expected a chunk type like \"character\", \"item\", \"word\" or \"line\" here, found {}.",
                    token.description()
                ),
            ));
        };
        let line = token.line;
        stream.advance()?;
        stream.expect_keyword(Keyword::Of, "\"of\"")?;

        let kind_tag = tree.add(line, NodeKind::IntValue(chunk.tag()));
        let value = self.parse_term(stream, tree, ctx)?;
        Ok(tree.add(
            line,
            NodeKind::FunctionCall {
                name: "vcy_chunk_count".to_string(),
                is_command: false,
                args: vec![kind_tag, value],
            },
        ))
    }

    /// Terms introduced by `the`: `the paramCount`, the qualified call
    /// forms `the long|short|abbr|abbrev|abbreviated <name>`, or a
    /// container reference.
    fn parse_the_term(
        &mut self,
        stream: &mut TokenStream<'_>,
        tree: &mut ParseTree,
        ctx: BlockCtx,
    ) -> Result<NodeId, ParseError> {
        stream.advance()?; // the
        if stream.is_keyword(Keyword::ParamCount) {
            let line = stream.line();
            stream.advance()?;
            return Ok(self.param_count_call(line, tree, ctx));
        }
        if stream.is_keyword(Keyword::Number) || stream.is_keyword(Keyword::Num) {
            return self.parse_chunk_count(stream, tree, ctx);
        }

        let qualifier = stream.peek().and_then(|t| match t.keyword {
            Keyword::Long
            | Keyword::Short
            | Keyword::Abbr
            | Keyword::Abbrev
            | Keyword::Abbreviated => Some((t.normalized.clone(), t.line)),
            _ => None,
        });
        if let Some((qualifier, line)) = qualifier {
            // `the long date` compiles to fun_date(list(1, "long")).
            let temp = tree.new_temp_name();
            self.create_variable(tree, ctx, &temp, &temp, false, false);
            let temp_ref = tree.add(
                line,
                NodeKind::LocalVariableRef {
                    name: temp.clone(),
                    display: temp,
                },
            );
            let one = tree.add(line, NodeKind::IntValue(1));
            let qualifier_node = tree.add(line, NodeKind::StringValue(qualifier));
            let make_list = tree.add(
                line,
                NodeKind::FunctionCall {
                    name: "vcy_list_assign_items".to_string(),
                    is_command: true,
                    args: vec![temp_ref, one, qualifier_node],
                },
            );
            stream.advance()?; // the qualifier

            let token = stream.current()?;
            if token.kind != TokenKind::Identifier {
                return Err(stream.error(
                    ParseErrorKind::LexicalRelay,
                    format!("Expected function name here, found {}.", token.description()),
                ));
            }
            let name = format!("fun_{}", token.normalized);
            let call_line = token.line;
            stream.advance()?;
            return Ok(tree.add(
                call_line,
                NodeKind::FunctionCall {
                    name,
                    is_command: false,
                    args: vec![make_list],
                },
            ));
        }

        // Plain container; put `the` back so the container parser sees
        // it too.
        stream.retreat();
        self.parse_container(true, stream, tree, ctx)
    }

    fn param_count_call(&self, line: u32, tree: &mut ParseTree, ctx: BlockCtx) -> NodeId {
        let params = self.local_ref(tree, ctx, "paramList", "paramList", line);
        tree.add(
            line,
            NodeKind::FunctionCall {
                name: "vcy_list_count".to_string(),
                is_command: false,
                args: vec![params],
            },
        )
    }

    fn param_get_call(
        &self,
        index: NodeId,
        line: u32,
        tree: &mut ParseTree,
        ctx: BlockCtx,
    ) -> NodeId {
        let params = self.local_ref(tree, ctx, "paramList", "paramList", line);
        tree.add(
            line,
            NodeKind::FunctionCall {
                name: "vcy_list_get".to_string(),
                is_command: false,
                args: vec![params, index],
            },
        )
    }
}

/// Try to read a binary operator at the cursor. Two-token rows are
/// matched first; a failed second-token match restores the cursor and
/// scanning continues with the next table row.
fn parse_operator(
    stream: &mut TokenStream<'_>,
) -> Result<Option<(u16, &'static str)>, ParseError> {
    let Some(token) = stream.peek() else {
        return Ok(None);
    };
    if token.kind != TokenKind::Identifier {
        return Ok(None);
    }
    for entry in OPERATORS {
        if !stream.is_keyword(entry.token) {
            continue;
        }
        stream.advance()?;
        match entry.second {
            None => return Ok(Some((entry.precedence, entry.symbol))),
            Some(second) => {
                if stream.is_keyword(second) {
                    stream.advance()?;
                    return Ok(Some((entry.precedence, entry.symbol)));
                }
                stream.retreat();
            }
        }
    }
    Ok(None)
}

/// Fold one step of the operand/operator stacks: the topmost operator
/// combines the two topmost operands into a call that is pushed back as
/// a single operand.
fn collapse_once(
    tree: &mut ParseTree,
    terms: &mut Vec<NodeId>,
    operators: &mut Vec<(u16, &'static str)>,
) {
    let (_, symbol) = operators
        .pop()
        .expect("BUG: operator stack drained before term stack");
    let right = terms.pop().expect("BUG: empty term stack");
    let left = terms.pop().expect("BUG: empty term stack");
    let line = tree.node(left).line;
    let call = tree.add(
        line,
        NodeKind::FunctionCall {
            name: symbol.to_string(),
            is_command: false,
            args: vec![left, right],
        },
    );
    terms.push(call);
}
