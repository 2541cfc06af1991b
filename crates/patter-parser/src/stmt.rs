//! Handler definitions and statement parsing.
//!
//! One statement per line. Dispatch is on the leading token: a user
//! identifier is a handler call, everything else is a fixed command
//! keyword. Sub-constructs (`repeat`, `if`) swallow their own closing
//! keywords; every other statement must end at a newline, and runs of
//! newlines are absorbed.

use crate::error::ParseErrorKind;
use crate::tables::{chunk_type_for, global_property_for};
use crate::{BlockCtx, FirstHandler, ParseError, Parser, TokenStream};
use patter_ast::{
    CodeBlockNode, FunctionDefinition, NodeId, NodeKind, ParseTree, VariableEntry, VariantType,
};
use patter_lexer::{Keyword, TokenKind};

impl Parser {
    /// Create a handler node, register it as a root, and record
    /// first-handler metadata. The built-in `theResult` local is always
    /// declared, defaulting to the empty string.
    pub(crate) fn begin_handler(
        &mut self,
        name: &str,
        is_command: bool,
        line: u32,
        tree: &mut ParseTree,
    ) -> NodeId {
        if self.first_handler.is_none() {
            self.first_handler = Some(FirstHandler {
                name: name.to_string(),
                is_function: !is_command,
            });
        }
        let handler = tree.add(
            line,
            NodeKind::FunctionDefinition(FunctionDefinition::new(name, is_command)),
        );
        tree.add_root(handler);
        let mut result_entry = VariableEntry::new("the result");
        result_entry.type_hint = VariantType::EmptyString;
        tree.add_local(handler, "theResult", result_entry);
        handler
    }

    /// `function <name> <params>…` / `on <name> <params>…` /
    /// `to <name> <params>…` with the introducing keyword already
    /// consumed.
    pub(crate) fn parse_function_definition(
        &mut self,
        is_command: bool,
        stream: &mut TokenStream<'_>,
        tree: &mut ParseTree,
    ) -> Result<(), ParseError> {
        let name_token = stream.current()?;
        if name_token.kind != TokenKind::Identifier {
            return Err(stream.error(
                ParseErrorKind::LexicalRelay,
                format!(
                    "Expected handler name here, found {}.",
                    name_token.description()
                ),
            ));
        }
        let handler_name = name_token.normalized.clone();
        let line = name_token.line;
        stream.advance()?;

        let handler = self.begin_handler(&handler_name, is_command, line, tree);
        let ctx = BlockCtx {
            function: handler,
            block: handler,
        };
        tracing::debug!(handler = %handler_name, line, "parsing handler definition");

        // Parameters: comma-separated identifiers up to the newline.
        // Each becomes a flagged local plus a GetParam command binding
        // the positional argument.
        let mut param_index: i64 = 0;
        while !stream.is_keyword(Keyword::Newline) {
            let token = stream.current()?;
            if token.kind != TokenKind::Identifier {
                return Err(stream.error(
                    ParseErrorKind::LexicalRelay,
                    format!("Expected parameter name here, found {}.", token.description()),
                ));
            }
            let display = token.text.clone();
            let canonical = format!("var_{}", token.normalized);
            let param_line = token.line;

            let dest = tree.add(
                param_line,
                NodeKind::LocalVariableRef {
                    name: canonical.clone(),
                    display: display.clone(),
                },
            );
            let index = tree.add(param_line, NodeKind::IntValue(param_index));
            let bind = tree.add(param_line, NodeKind::GetParam { dest, index });
            tree.append_statement(handler, bind);
            param_index += 1;

            let mut entry = VariableEntry::new(&display);
            entry.type_hint = VariantType::EmptyString;
            entry.is_parameter = true;
            tree.add_local(handler, &canonical, entry);
            if let NodeKind::FunctionDefinition(def) = &mut tree.node_mut(handler).kind {
                def.params.push(display);
            }

            stream.advance()?;
            if !stream.is_keyword(Keyword::Comma) {
                if stream.is_keyword(Keyword::Newline) {
                    break;
                }
                return Err(stream.error(
                    ParseErrorKind::ExpectedKeyword,
                    format!(
                        "Expected comma or end of line here, found {}.",
                        stream.description_of_current()
                    ),
                ));
            }
            stream.advance()?;
        }
        stream.skip_newlines();

        self.parse_function_body(&handler_name, stream, tree, ctx)
    }

    /// Statements up to the matching `end <name>`.
    fn parse_function_body(
        &mut self,
        handler_name: &str,
        stream: &mut TokenStream<'_>,
        tree: &mut ParseTree,
        ctx: BlockCtx,
    ) -> Result<(), ParseError> {
        // Sub-constructs swallow their own `end xxx`, so reaching `end`
        // here means ours (or an unbalanced one, caught below).
        while !stream.is_keyword(Keyword::End) {
            self.parse_one_line(handler_name, stream, tree, ctx, false)?;
        }
        stream.advance()?;
        let token = stream.current()?;
        if token.normalized != handler_name {
            return Err(stream.error(
                ParseErrorKind::UnterminatedConstruct,
                format!(
                    "Expected \"end {handler_name}\" here, found {}.",
                    token.description()
                ),
            ));
        }
        stream.advance()
    }

    /// One statement, dispatched on its leading token.
    pub(crate) fn parse_one_line(
        &mut self,
        handler_name: &str,
        stream: &mut TokenStream<'_>,
        tree: &mut ParseTree,
        ctx: BlockCtx,
        dont_swallow_newline: bool,
    ) -> Result<(), ParseError> {
        stream.skip_newlines();

        let token = stream.current()?;
        if token.kind != TokenKind::Identifier {
            return Err(stream.error(
                ParseErrorKind::LexicalRelay,
                format!("Expected command name here, found {}.", token.description()),
            ));
        }
        match token.keyword {
            Keyword::NoKeyword => self.parse_handler_call(stream, tree, ctx)?,
            Keyword::Put => self.parse_put_statement(stream, tree, ctx)?,
            Keyword::Get => self.parse_get_statement(stream, tree, ctx)?,
            Keyword::Set => self.parse_set_statement(stream, tree, ctx)?,
            Keyword::Delete => self.parse_delete_statement(stream, tree, ctx)?,
            Keyword::Return => self.parse_return_statement(stream, tree, ctx)?,
            Keyword::Exit => self.parse_exit_statement(handler_name, stream, tree, ctx)?,
            Keyword::Next => self.parse_next_statement(stream, tree, ctx)?,
            Keyword::Repeat => self.parse_repeat_statement(handler_name, stream, tree, ctx)?,
            Keyword::If => self.parse_if_statement(handler_name, stream, tree, ctx)?,
            Keyword::Add => self.parse_add_statement(stream, tree, ctx)?,
            Keyword::Subtract => self.parse_subtract_statement(stream, tree, ctx)?,
            Keyword::Multiply => self.parse_multiply_statement(stream, tree, ctx)?,
            Keyword::Divide => self.parse_divide_statement(stream, tree, ctx)?,
            Keyword::Global => {
                return Err(stream.error(
                    ParseErrorKind::UnsupportedConstruct,
                    "Public globals are not supported yet; declare a \"private global\".",
                ));
            }
            Keyword::Private => {
                stream.advance()?;
                if !stream.is_keyword(Keyword::Global) {
                    return Err(stream.error(
                        ParseErrorKind::ExpectedKeyword,
                        format!(
                            "Expected \"global\" after \"private\", found {}.",
                            stream.description_of_current()
                        ),
                    ));
                }
                self.parse_global_statement(stream, tree, ctx)?;
            }
            Keyword::Public => {
                stream.advance()?;
                if !stream.is_keyword(Keyword::Global) {
                    return Err(stream.error(
                        ParseErrorKind::ExpectedKeyword,
                        format!(
                            "Expected \"global\" after \"public\", found {}.",
                            stream.description_of_current()
                        ),
                    ));
                }
                self.parse_global_statement(stream, tree, ctx)?;
            }
            _ => {
                return Err(stream.error(
                    ParseErrorKind::ExpectedKeyword,
                    format!(
                        "Expected command name or \"end {handler_name}\", found {}.",
                        stream.description_of_current()
                    ),
                ));
            }
        }

        // End this line.
        if !dont_swallow_newline && !stream.at_end() {
            if !stream.is_keyword(Keyword::Newline) {
                return Err(stream.error(
                    ParseErrorKind::ExpectedKeyword,
                    format!(
                        "Expected end of line, found {}.",
                        stream.description_of_current()
                    ),
                ));
            }
            stream.skip_newlines();
        }
        Ok(())
    }

    /// Handler call statement: the result lands in `theResult`.
    fn parse_handler_call(
        &mut self,
        stream: &mut TokenStream<'_>,
        tree: &mut ParseTree,
        ctx: BlockCtx,
    ) -> Result<(), ParseError> {
        let token = stream.current()?;
        let name = token.normalized.clone();
        let line = token.line;
        stream.advance()?;

        let args = self.parse_param_list(Keyword::Newline, stream, tree, ctx)?;
        let call = tree.add(
            line,
            NodeKind::FunctionCall {
                name,
                is_command: true,
                args,
            },
        );
        let result = self.local_ref(tree, ctx, "theResult", "the result", line);
        let assign = tree.add(
            line,
            NodeKind::Assign {
                dest: result,
                value: call,
            },
        );
        tree.append_statement(ctx.block, assign);
        Ok(())
    }

    /// `put EXPR [into|after|before CONTAINER]`.
    fn parse_put_statement(
        &mut self,
        stream: &mut TokenStream<'_>,
        tree: &mut ParseTree,
        ctx: BlockCtx,
    ) -> Result<(), ParseError> {
        let line = stream.line();
        stream.advance()?;
        let what = self.parse_expression(stream, tree, ctx)?;

        let symbol = if stream.is_keyword(Keyword::Into) {
            "Put"
        } else if stream.is_keyword(Keyword::After) {
            "Append"
        } else if stream.is_keyword(Keyword::Before) {
            "Prepend"
        } else {
            // Bare `put` prints.
            let print = tree.add(line, NodeKind::Print { value: what });
            tree.append_statement(ctx.block, print);
            return Ok(());
        };
        stream.advance()?;
        let dest = self.parse_container(false, stream, tree, ctx)?;
        let command = tree.add(
            line,
            NodeKind::Command {
                symbol: symbol.to_string(),
                args: vec![what, dest],
            },
        );
        tree.append_statement(ctx.block, command);
        Ok(())
    }

    /// `get EXPR` desugars to `put EXPR into it`.
    fn parse_get_statement(
        &mut self,
        stream: &mut TokenStream<'_>,
        tree: &mut ParseTree,
        ctx: BlockCtx,
    ) -> Result<(), ParseError> {
        let line = stream.line();
        stream.advance()?;
        let what = self.parse_expression(stream, tree, ctx)?;
        let it = self.local_ref(tree, ctx, "var_it", "it", line);
        let command = tree.add(
            line,
            NodeKind::Command {
                symbol: "Put".to_string(),
                args: vec![what, it],
            },
        );
        tree.append_statement(ctx.block, command);
        Ok(())
    }

    /// `set PROPERTY to EXPR`, compiled to a `Put` into the property's
    /// shared global. The `of`-qualified object form is reserved.
    fn parse_set_statement(
        &mut self,
        stream: &mut TokenStream<'_>,
        tree: &mut ParseTree,
        ctx: BlockCtx,
    ) -> Result<(), ParseError> {
        let line = stream.line();
        stream.advance()?;

        let token = stream.current()?;
        if token.kind != TokenKind::Identifier {
            return Err(stream.error(
                ParseErrorKind::LexicalRelay,
                format!("Expected property name here, found {}.", token.description()),
            ));
        }
        let property_name = token.text.clone();
        let property_keyword = token.keyword;
        stream.advance()?;

        let token = stream.current()?;
        if token.kind != TokenKind::Identifier {
            return Err(stream.error(
                ParseErrorKind::LexicalRelay,
                format!(
                    "Expected \"of\" or \"to\" here, found {}.",
                    token.description()
                ),
            ));
        }
        if token.keyword == Keyword::Of {
            return Err(stream.error(
                ParseErrorKind::UnsupportedConstruct,
                "Object properties are not implemented yet; only global properties can be set.",
            ));
        }

        let Some(global_name) = global_property_for(property_keyword) else {
            return Err(stream.error(
                ParseErrorKind::UnknownProperty,
                format!("Unknown global property \"{property_name}\"."),
            ));
        };
        self.create_variable(tree, ctx, global_name, "itemDelimiter", false, true);
        let property = tree.add(
            line,
            NodeKind::LocalVariableRef {
                name: global_name.to_string(),
                display: "itemDelimiter".to_string(),
            },
        );

        if !stream.is_keyword(Keyword::To) {
            return Err(stream.error(
                ParseErrorKind::ExpectedKeyword,
                format!(
                    "Expected \"to\" here, found {}.",
                    stream.description_of_current()
                ),
            ));
        }
        stream.advance()?;

        let what = self.parse_expression(stream, tree, ctx)?;
        let command = tree.add(
            line,
            NodeKind::Command {
                symbol: "Put".to_string(),
                args: vec![what, property],
            },
        );
        tree.append_statement(ctx.block, command);
        Ok(())
    }

    /// `delete CONTAINER`.
    fn parse_delete_statement(
        &mut self,
        stream: &mut TokenStream<'_>,
        tree: &mut ParseTree,
        ctx: BlockCtx,
    ) -> Result<(), ParseError> {
        let line = stream.line();
        stream.advance()?;
        let container = self.parse_container(false, stream, tree, ctx)?;
        let call = tree.add(
            line,
            NodeKind::FunctionCall {
                name: "Delete".to_string(),
                is_command: true,
                args: vec![container],
            },
        );
        tree.append_statement(ctx.block, call);
        Ok(())
    }

    /// `return EXPR`.
    fn parse_return_statement(
        &mut self,
        stream: &mut TokenStream<'_>,
        tree: &mut ParseTree,
        ctx: BlockCtx,
    ) -> Result<(), ParseError> {
        let line = stream.line();
        stream.advance()?;
        let what = self.parse_expression(stream, tree, ctx)?;
        let command = tree.add(
            line,
            NodeKind::Command {
                symbol: "return".to_string(),
                args: vec![what],
            },
        );
        tree.append_statement(ctx.block, command);
        Ok(())
    }

    /// `exit repeat` or `exit <currentHandler>` (which returns empty).
    fn parse_exit_statement(
        &mut self,
        handler_name: &str,
        stream: &mut TokenStream<'_>,
        tree: &mut ParseTree,
        ctx: BlockCtx,
    ) -> Result<(), ParseError> {
        stream.advance()?;
        if stream.is_keyword(Keyword::Repeat) {
            let line = stream.line();
            let command = tree.add(
                line,
                NodeKind::Command {
                    symbol: "ExitRepeat".to_string(),
                    args: Vec::new(),
                },
            );
            tree.append_statement(ctx.block, command);
            return stream.advance();
        }
        let token = stream.current()?;
        if token.normalized == handler_name {
            let line = token.line;
            let empty = tree.add(line, NodeKind::StringValue(String::new()));
            let command = tree.add(
                line,
                NodeKind::Command {
                    symbol: "return".to_string(),
                    args: vec![empty],
                },
            );
            tree.append_statement(ctx.block, command);
            return stream.advance();
        }
        Err(stream.error(
            ParseErrorKind::ExpectedKeyword,
            format!(
                "Expected \"exit repeat\" or \"exit {handler_name}\", found {}.",
                token.description()
            ),
        ))
    }

    /// `next repeat`.
    fn parse_next_statement(
        &mut self,
        stream: &mut TokenStream<'_>,
        tree: &mut ParseTree,
        ctx: BlockCtx,
    ) -> Result<(), ParseError> {
        stream.advance()?;
        if !stream.is_keyword(Keyword::Repeat) {
            return Err(stream.error(
                ParseErrorKind::ExpectedKeyword,
                format!(
                    "Expected \"next repeat\", found {}.",
                    stream.description_of_current()
                ),
            ));
        }
        let line = stream.line();
        let command = tree.add(
            line,
            NodeKind::Command {
                symbol: "NextRepeat".to_string(),
                args: Vec::new(),
            },
        );
        tree.append_statement(ctx.block, command);
        stream.advance()
    }

    /// `add EXPR to CONTAINER`.
    fn parse_add_statement(
        &mut self,
        stream: &mut TokenStream<'_>,
        tree: &mut ParseTree,
        ctx: BlockCtx,
    ) -> Result<(), ParseError> {
        let line = stream.line();
        stream.advance()?;
        let what = self.parse_expression(stream, tree, ctx)?;
        stream.expect_keyword(Keyword::To, "\"to\"")?;
        let dest = self.parse_container(false, stream, tree, ctx)?;
        let command = tree.add(
            line,
            NodeKind::Command {
                symbol: "AddTo".to_string(),
                args: vec![what, dest],
            },
        );
        tree.append_statement(ctx.block, command);
        Ok(())
    }

    /// `subtract EXPR from CONTAINER`.
    fn parse_subtract_statement(
        &mut self,
        stream: &mut TokenStream<'_>,
        tree: &mut ParseTree,
        ctx: BlockCtx,
    ) -> Result<(), ParseError> {
        let line = stream.line();
        stream.advance()?;
        let what = self.parse_expression(stream, tree, ctx)?;
        stream.expect_keyword(Keyword::From, "\"from\"")?;
        let dest = self.parse_container(false, stream, tree, ctx)?;
        let command = tree.add(
            line,
            NodeKind::Command {
                symbol: "SubtractFrom".to_string(),
                args: vec![what, dest],
            },
        );
        tree.append_statement(ctx.block, command);
        Ok(())
    }

    /// `multiply CONTAINER with EXPR`.
    fn parse_multiply_statement(
        &mut self,
        stream: &mut TokenStream<'_>,
        tree: &mut ParseTree,
        ctx: BlockCtx,
    ) -> Result<(), ParseError> {
        let line = stream.line();
        stream.advance()?;
        let dest = self.parse_container(false, stream, tree, ctx)?;
        stream.expect_keyword(Keyword::With, "\"with\"")?;
        let what = self.parse_expression(stream, tree, ctx)?;
        let command = tree.add(
            line,
            NodeKind::Command {
                symbol: "MultiplyWith".to_string(),
                args: vec![dest, what],
            },
        );
        tree.append_statement(ctx.block, command);
        Ok(())
    }

    /// `divide CONTAINER by EXPR`.
    fn parse_divide_statement(
        &mut self,
        stream: &mut TokenStream<'_>,
        tree: &mut ParseTree,
        ctx: BlockCtx,
    ) -> Result<(), ParseError> {
        let line = stream.line();
        stream.advance()?;
        let dest = self.parse_container(false, stream, tree, ctx)?;
        stream.expect_keyword(Keyword::By, "\"by\"")?;
        let what = self.parse_expression(stream, tree, ctx)?;
        let command = tree.add(
            line,
            NodeKind::Command {
                symbol: "DivideBy".to_string(),
                args: vec![dest, what],
            },
        );
        tree.append_statement(ctx.block, command);
        Ok(())
    }

    /// `private global <name>` / `public global <name>`, cursor on
    /// `global`. Declares the name in the handler's locals flagged as a
    /// global import.
    fn parse_global_statement(
        &mut self,
        stream: &mut TokenStream<'_>,
        tree: &mut ParseTree,
        ctx: BlockCtx,
    ) -> Result<(), ParseError> {
        stream.advance()?;
        let token = stream.current()?;
        if token.kind != TokenKind::Identifier {
            return Err(stream.error(
                ParseErrorKind::LexicalRelay,
                format!("Expected global name here, found {}.", token.description()),
            ));
        }
        let canonical = format!("var_{}", token.normalized);
        let mut entry = VariableEntry::new(&token.text);
        entry.is_global = true;
        tree.add_local(ctx.block, &canonical, entry);
        stream.advance()
    }

    /// The four `repeat` shapes, selected by the token after `repeat`.
    fn parse_repeat_statement(
        &mut self,
        handler_name: &str,
        stream: &mut TokenStream<'_>,
        tree: &mut ParseTree,
        ctx: BlockCtx,
    ) -> Result<(), ParseError> {
        let condition_line = stream.line();
        stream.advance()?;

        if stream.is_keyword(Keyword::While) || stream.is_keyword(Keyword::Until) {
            return self.parse_repeat_while(handler_name, condition_line, stream, tree, ctx);
        }
        if stream.is_keyword(Keyword::With) {
            return self.parse_repeat_with(handler_name, condition_line, stream, tree, ctx);
        }
        if stream.is_keyword(Keyword::For) {
            stream.advance()?;
            if stream.is_keyword(Keyword::Each) {
                stream.advance()?;
                return self.parse_repeat_for_each(handler_name, stream, tree, ctx);
            }
            // `repeat for N times` continues like a plain count.
        }
        self.parse_repeat_times(handler_name, condition_line, stream, tree, ctx)
    }

    /// `repeat while EXPR` / `repeat until EXPR`.
    fn parse_repeat_while(
        &mut self,
        handler_name: &str,
        condition_line: u32,
        stream: &mut TokenStream<'_>,
        tree: &mut ParseTree,
        ctx: BlockCtx,
    ) -> Result<(), ParseError> {
        let negate = stream.is_keyword(Keyword::Until);
        stream.advance()?;

        let raw = self.parse_expression(stream, tree, ctx)?;
        let mut condition = tree.add(
            condition_line,
            NodeKind::FunctionCall {
                name: "GetAsBool".to_string(),
                is_command: false,
                args: vec![raw],
            },
        );
        if negate {
            condition = tree.add(
                condition_line,
                NodeKind::FunctionCall {
                    name: "vcy_not".to_string(),
                    is_command: false,
                    args: vec![condition],
                },
            );
        }

        let body = self.new_code_block(condition_line, tree, ctx);
        let while_loop = tree.add(condition_line, NodeKind::WhileLoop { condition, body });
        tree.append_statement(ctx.block, while_loop);

        let body_ctx = BlockCtx {
            function: ctx.function,
            block: body,
        };
        while !stream.is_keyword(Keyword::End) {
            self.parse_one_line(handler_name, stream, tree, body_ctx, false)?;
        }
        self.expect_end_repeat(stream)
    }

    /// `repeat with i [from|=] S [down] to E`.
    ///
    /// Lowered to a fresh integer temporary: `temp = GetAsInt(S)`, loop
    /// while `temp <= GetAsInt(E)` (`>=` when counting down), bind
    /// `i = temp` at the top of the body and step `temp += 1` (`-= 1`)
    /// at the bottom.
    fn parse_repeat_with(
        &mut self,
        handler_name: &str,
        condition_line: u32,
        stream: &mut TokenStream<'_>,
        tree: &mut ParseTree,
        ctx: BlockCtx,
    ) -> Result<(), ParseError> {
        stream.advance()?;

        let token = stream.current()?;
        if token.kind != TokenKind::Identifier {
            return Err(stream.error(
                ParseErrorKind::LexicalRelay,
                format!(
                    "Expected loop counter variable here, found {}.",
                    token.description()
                ),
            ));
        }
        let counter_display = token.text.clone();
        let counter = format!("var_{}", token.normalized);
        self.create_variable(tree, ctx, &counter, &counter_display, false, false);
        stream.advance()?;

        if !stream.is_keyword(Keyword::From) && !stream.is_keyword(Keyword::Equals) {
            return Err(stream.error(
                ParseErrorKind::ExpectedKeyword,
                format!(
                    "Expected \"from\" or \"=\" here, found {}.",
                    stream.description_of_current()
                ),
            ));
        }
        stream.advance()?;
        let start = self.parse_expression(stream, tree, ctx)?;

        let (increment_op, compare_op) = if stream.is_keyword(Keyword::Down) {
            stream.advance()?;
            ("-=", ">=")
        } else {
            ("+=", "<=")
        };
        stream.expect_keyword(Keyword::To, "\"to\"")?;
        let end = self.parse_expression(stream, tree, ctx)?;

        let temp = tree.new_temp_name();
        let mut temp_entry = VariableEntry::new(&temp);
        temp_entry.type_hint = VariantType::Int;
        tree.add_local(ctx.block, &temp, temp_entry);

        // temp = GetAsInt(start)
        let temp_ref = self.local_ref(tree, ctx, &temp, &temp, condition_line);
        let start_int = tree.add(
            condition_line,
            NodeKind::FunctionCall {
                name: "GetAsInt".to_string(),
                is_command: false,
                args: vec![start],
            },
        );
        let init = tree.add(
            condition_line,
            NodeKind::Assign {
                dest: temp_ref,
                value: start_int,
            },
        );
        tree.append_statement(ctx.block, init);

        // while temp <= GetAsInt(end)
        let cond_temp = self.local_ref(tree, ctx, &temp, &temp, condition_line);
        let end_int = tree.add(
            condition_line,
            NodeKind::FunctionCall {
                name: "GetAsInt".to_string(),
                is_command: false,
                args: vec![end],
            },
        );
        let condition = tree.add(
            condition_line,
            NodeKind::FunctionCall {
                name: compare_op.to_string(),
                is_command: false,
                args: vec![cond_temp, end_int],
            },
        );
        let body = self.new_code_block(condition_line, tree, ctx);
        let while_loop = tree.add(condition_line, NodeKind::WhileLoop { condition, body });
        let body_ctx = BlockCtx {
            function: ctx.function,
            block: body,
        };

        // i = temp
        let counter_ref = self.local_ref(tree, ctx, &counter, &counter_display, condition_line);
        let temp_value = self.local_ref(tree, ctx, &temp, &temp, condition_line);
        let bind = tree.add(
            condition_line,
            NodeKind::Assign {
                dest: counter_ref,
                value: temp_value,
            },
        );
        tree.append_statement(body, bind);

        while !stream.is_keyword(Keyword::End) {
            self.parse_one_line(handler_name, stream, tree, body_ctx, false)?;
        }

        // temp += 1
        let step_line = stream.line();
        let step_ref = self.local_ref(tree, ctx, &temp, &temp, step_line);
        let one = tree.add(step_line, NodeKind::IntValue(1));
        let step = tree.add(
            step_line,
            NodeKind::Command {
                symbol: increment_op.to_string(),
                args: vec![step_ref, one],
            },
        );
        tree.append_statement(body, step);

        tree.append_statement(ctx.block, while_loop);
        self.expect_end_repeat(stream)
    }

    /// `repeat [for] N [times]`.
    fn parse_repeat_times(
        &mut self,
        handler_name: &str,
        condition_line: u32,
        stream: &mut TokenStream<'_>,
        tree: &mut ParseTree,
        ctx: BlockCtx,
    ) -> Result<(), ParseError> {
        let count = self.parse_expression(stream, tree, ctx)?;
        if stream.is_keyword(Keyword::Times) {
            stream.advance()?;
        }

        let temp = tree.new_temp_name();

        // temp = 0
        let temp_ref = self.local_ref(tree, ctx, &temp, &temp, condition_line);
        let zero = tree.add(condition_line, NodeKind::IntValue(0));
        let init = tree.add(
            condition_line,
            NodeKind::Assign {
                dest: temp_ref,
                value: zero,
            },
        );
        tree.append_statement(ctx.block, init);

        // while temp < GetAsInt(count)
        let cond_temp = self.local_ref(tree, ctx, &temp, &temp, condition_line);
        let count_int = tree.add(
            condition_line,
            NodeKind::FunctionCall {
                name: "GetAsInt".to_string(),
                is_command: false,
                args: vec![count],
            },
        );
        let condition = tree.add(
            condition_line,
            NodeKind::FunctionCall {
                name: "<".to_string(),
                is_command: false,
                args: vec![cond_temp, count_int],
            },
        );
        let body = self.new_code_block(condition_line, tree, ctx);
        let while_loop = tree.add(condition_line, NodeKind::WhileLoop { condition, body });
        let body_ctx = BlockCtx {
            function: ctx.function,
            block: body,
        };

        while !stream.is_keyword(Keyword::End) {
            self.parse_one_line(handler_name, stream, tree, body_ctx, false)?;
        }

        // temp += 1
        let step_line = stream.line();
        let step_ref = self.local_ref(tree, ctx, &temp, &temp, step_line);
        let one = tree.add(step_line, NodeKind::IntValue(1));
        let step = tree.add(
            step_line,
            NodeKind::Command {
                symbol: "+=".to_string(),
                args: vec![step_ref, one],
            },
        );
        tree.append_statement(body, step);

        tree.append_statement(ctx.block, while_loop);
        self.expect_end_repeat(stream)
    }

    /// `repeat for each <chunkType> v of EXPR`, cursor on the chunk
    /// type.
    ///
    /// Lowered through three temporaries: `GetChunkArray(list, EXPR,
    /// kind)`, a counter iterated from 0 to `GetNumListItems(list)`,
    /// and `v = GetConstElementAtIndex(list, counter)` at the top of
    /// each turn.
    fn parse_repeat_for_each(
        &mut self,
        handler_name: &str,
        stream: &mut TokenStream<'_>,
        tree: &mut ParseTree,
        ctx: BlockCtx,
    ) -> Result<(), ParseError> {
        let token = stream.current()?;
        let Some(chunk) = chunk_type_for(token.keyword) else {
            return Err(stream.error(
                ParseErrorKind::ExpectedKeyword,
                format!(
                    "Expected chunk type identifier here, found {}.",
                    token.description()
                ),
            ));
        };
        stream.advance()?;

        let token = stream.current()?;
        if token.kind != TokenKind::Identifier {
            return Err(stream.error(
                ParseErrorKind::LexicalRelay,
                format!(
                    "Expected loop counter variable here, found {}.",
                    token.description()
                ),
            ));
        }
        let element_display = token.text.clone();
        let element = format!("var_{}", token.normalized);
        self.create_variable(tree, ctx, &element, &element_display, false, false);
        stream.advance()?;

        stream.expect_keyword(Keyword::Of, "\"of\"")?;
        let line = stream.line();
        let source = self.parse_expression(stream, tree, ctx)?;

        let temp_list = tree.new_temp_name();
        let temp_counter = tree.new_temp_name();
        let temp_max = tree.new_temp_name();

        // GetChunkArray(list, source, kind)
        let list_ref = self.local_ref(tree, ctx, &temp_list, &temp_list, line);
        let kind_tag = tree.add(line, NodeKind::IntValue(chunk.tag()));
        let collect = tree.add(
            line,
            NodeKind::Command {
                symbol: "GetChunkArray".to_string(),
                args: vec![list_ref, source, kind_tag],
            },
        );
        tree.append_statement(ctx.block, collect);

        // counter = 0
        let counter_ref = self.local_ref(tree, ctx, &temp_counter, &temp_counter, line);
        let zero = tree.add(line, NodeKind::IntValue(0));
        let init_counter = tree.add(
            line,
            NodeKind::Assign {
                dest: counter_ref,
                value: zero,
            },
        );
        tree.append_statement(ctx.block, init_counter);

        // max = GetNumListItems(list)
        let list_arg = self.local_ref(tree, ctx, &temp_list, &temp_list, line);
        let count_call = tree.add(
            line,
            NodeKind::FunctionCall {
                name: "GetNumListItems".to_string(),
                is_command: false,
                args: vec![list_arg],
            },
        );
        let max_ref = self.local_ref(tree, ctx, &temp_max, &temp_max, line);
        let init_max = tree.add(
            line,
            NodeKind::Assign {
                dest: max_ref,
                value: count_call,
            },
        );
        tree.append_statement(ctx.block, init_max);

        // while counter < max
        let cond_counter = self.local_ref(tree, ctx, &temp_counter, &temp_counter, line);
        let cond_max = self.local_ref(tree, ctx, &temp_max, &temp_max, line);
        let condition = tree.add(
            line,
            NodeKind::FunctionCall {
                name: "<".to_string(),
                is_command: false,
                args: vec![cond_counter, cond_max],
            },
        );
        let body = self.new_code_block(line, tree, ctx);
        let while_loop = tree.add(line, NodeKind::WhileLoop { condition, body });
        tree.append_statement(ctx.block, while_loop);
        let body_ctx = BlockCtx {
            function: ctx.function,
            block: body,
        };

        // v = GetConstElementAtIndex(list, counter)
        let element_list = self.local_ref(tree, ctx, &temp_list, &temp_list, line);
        let element_index = self.local_ref(tree, ctx, &temp_counter, &temp_counter, line);
        let fetch = tree.add(
            line,
            NodeKind::FunctionCall {
                name: "GetConstElementAtIndex".to_string(),
                is_command: false,
                args: vec![element_list, element_index],
            },
        );
        let element_ref = self.local_ref(tree, ctx, &element, &element_display, line);
        let bind = tree.add(
            line,
            NodeKind::Assign {
                dest: element_ref,
                value: fetch,
            },
        );
        tree.append_statement(body, bind);

        while !stream.is_keyword(Keyword::End) {
            self.parse_one_line(handler_name, stream, tree, body_ctx, false)?;
        }

        // counter += 1
        let step_line = stream.line();
        let step_ref = self.local_ref(tree, ctx, &temp_counter, &temp_counter, step_line);
        let one = tree.add(step_line, NodeKind::IntValue(1));
        let step = tree.add(
            step_line,
            NodeKind::Command {
                symbol: "+=".to_string(),
                args: vec![step_ref, one],
            },
        );
        tree.append_statement(body, step);

        self.expect_end_repeat(stream)
    }

    /// `if EXPR then …`, inline or multi-line, with an optional inline
    /// or multi-line `else`.
    fn parse_if_statement(
        &mut self,
        handler_name: &str,
        stream: &mut TokenStream<'_>,
        tree: &mut ParseTree,
        ctx: BlockCtx,
    ) -> Result<(), ParseError> {
        let condition_line = stream.line();
        stream.advance()?;
        let condition = self.parse_expression(stream, tree, ctx)?;

        stream.skip_newlines();
        stream.expect_keyword(Keyword::Then, "\"then\"")?;

        let then_block = self.new_code_block(condition_line, tree, ctx);
        let if_node = tree.add(
            condition_line,
            NodeKind::If {
                condition,
                then_block,
                else_block: None,
            },
        );
        let then_ctx = BlockCtx {
            function: ctx.function,
            block: then_block,
        };

        let mut need_end_if = true;
        if stream.is_keyword(Keyword::Newline) {
            stream.advance()?;
            while !stream.is_keyword(Keyword::End) && !stream.is_keyword(Keyword::Else) {
                self.parse_one_line(handler_name, stream, tree, then_ctx, false)?;
            }
        } else {
            // Inline then: exactly one statement, no `end if` to come.
            self.parse_one_line(handler_name, stream, tree, then_ctx, true)?;
            need_end_if = false;
        }

        // Look past line breaks for an `else`, restoring the cursor if
        // the statement simply ends here.
        let checkpoint = stream.position();
        stream.skip_newlines();
        let mut had_else = false;
        if stream.is_keyword(Keyword::Else) {
            had_else = true;
            let else_line = stream.line();
            stream.advance()?;
            let else_block = self.new_code_block(else_line, tree, ctx);
            if let NodeKind::If { else_block: slot, .. } = &mut tree.node_mut(if_node).kind {
                *slot = Some(else_block);
            }
            let else_ctx = BlockCtx {
                function: ctx.function,
                block: else_block,
            };
            if stream.is_keyword(Keyword::Newline) {
                stream.advance()?;
                while !stream.is_keyword(Keyword::End) {
                    self.parse_one_line(handler_name, stream, tree, else_ctx, false)?;
                }
                need_end_if = true;
            } else {
                self.parse_one_line(handler_name, stream, tree, else_ctx, true)?;
                need_end_if = false;
            }
        }

        if need_end_if {
            stream.advance()?; // the `end` that stopped the body loop
            if !stream.is_keyword(Keyword::If) {
                return Err(stream.error(
                    ParseErrorKind::UnterminatedConstruct,
                    format!(
                        "Expected \"end if\" here, found {}.",
                        stream.description_of_current()
                    ),
                ));
            }
            stream.advance()?;
        } else if !had_else {
            stream.rewind_to(checkpoint);
        }

        tree.append_statement(ctx.block, if_node);
        Ok(())
    }

    /// Comma-separated argument expressions up to (not including) the
    /// terminator.
    pub(crate) fn parse_param_list(
        &mut self,
        end_on: Keyword,
        stream: &mut TokenStream<'_>,
        tree: &mut ParseTree,
        ctx: BlockCtx,
    ) -> Result<Vec<NodeId>, ParseError> {
        let mut args = Vec::new();
        while !stream.is_keyword(end_on) {
            args.push(self.parse_expression(stream, tree, ctx)?);
            if !stream.is_keyword(Keyword::Comma) {
                if stream.is_keyword(end_on) {
                    break;
                }
                return Err(stream.error(
                    ParseErrorKind::ExpectedKeyword,
                    format!(
                        "Expected comma here, found {}.",
                        stream.description_of_current()
                    ),
                ));
            }
            stream.advance()?;
        }
        Ok(args)
    }

    /// A container: a mutable chunk expression, `the result`, an
    /// `itemDelimiter` spelling, or a plain variable.
    pub(crate) fn parse_container(
        &mut self,
        init_with_name: bool,
        stream: &mut TokenStream<'_>,
        tree: &mut ParseTree,
        ctx: BlockCtx,
    ) -> Result<NodeId, ParseError> {
        if let Some(token) = stream.peek() {
            if let Some(chunk) = chunk_type_for(token.keyword) {
                return self.parse_chunk_expression(chunk, true, stream, tree, ctx);
            }
        }
        if stream.is_keyword(Keyword::The) {
            stream.advance()?;
        }

        let token = stream.current()?;
        if token.kind != TokenKind::Identifier {
            return Err(stream.error(
                ParseErrorKind::LexicalRelay,
                format!("Expected a container here, found {}.", token.description()),
            ));
        }
        let line = token.line;
        let (canonical, display, is_global) = match token.keyword {
            Keyword::Result => ("theResult".to_string(), token.text.clone(), false),
            Keyword::ItemDel | Keyword::ItemDelim | Keyword::ItemDelimiter => {
                ("gItemDel".to_string(), "itemDelimiter".to_string(), true)
            }
            _ => (
                format!("var_{}", token.normalized),
                token.text.clone(),
                false,
            ),
        };
        self.create_variable(tree, ctx, &canonical, &display, init_with_name, is_global);
        stream.advance()?;
        Ok(tree.add(
            line,
            NodeKind::LocalVariableRef {
                name: canonical,
                display,
            },
        ))
    }

    /// Declare a variable on first reference; redeclaration is a no-op.
    pub(crate) fn create_variable(
        &self,
        tree: &mut ParseTree,
        ctx: BlockCtx,
        canonical: &str,
        display: &str,
        init_with_name: bool,
        is_global: bool,
    ) {
        let mut entry = VariableEntry::new(display);
        entry.init_with_name = init_with_name;
        entry.is_global = is_global;
        if is_global {
            tree.globals_mut()
                .entry(canonical.to_string())
                .or_insert(entry);
        } else {
            tree.add_local(ctx.block, canonical, entry);
        }
    }

    /// Declare-and-reference: the usual way statements mention a local.
    pub(crate) fn local_ref(
        &self,
        tree: &mut ParseTree,
        ctx: BlockCtx,
        canonical: &str,
        display: &str,
        line: u32,
    ) -> NodeId {
        self.create_variable(tree, ctx, canonical, display, false, false);
        tree.add(
            line,
            NodeKind::LocalVariableRef {
                name: canonical.to_string(),
                display: display.to_string(),
            },
        )
    }

    fn new_code_block(&self, line: u32, tree: &mut ParseTree, ctx: BlockCtx) -> NodeId {
        tree.add(
            line,
            NodeKind::CodeBlock(CodeBlockNode {
                statements: Vec::new(),
                function: ctx.function,
            }),
        )
    }

    fn expect_end_repeat(&self, stream: &mut TokenStream<'_>) -> Result<(), ParseError> {
        stream.advance()?; // the `end` that stopped the body loop
        if !stream.is_keyword(Keyword::Repeat) {
            return Err(stream.error(
                ParseErrorKind::UnterminatedConstruct,
                format!(
                    "Expected \"end repeat\" here, found {}.",
                    stream.description_of_current()
                ),
            ));
        }
        stream.advance()
    }
}
