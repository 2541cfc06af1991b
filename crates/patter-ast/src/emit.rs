//! Code-emission contract between the parse tree and the code generator.
//!
//! Emission is stack-oriented: a node pushes its arguments left to
//! right, then emits the operation identified by its symbol. Handlers
//! bracket their statements with `begin_handler`/`end_handler` and
//! declare their locals first; loops and conditionals are lowered with
//! forward jumps that the generator patches once the target offset is
//! known.

use crate::arena::{NodeId, ParseTree};
use crate::node::{NodeKind, VariableEntry};
use serde::{Deserialize, Serialize};

/// Opcode in the downstream instruction set. The front-end never
/// interprets these; they address engine properties registered by the
/// host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InstructionId(pub u16);

/// Handle for a forward jump awaiting its target offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JumpPatch(pub usize);

/// The code block nodes emit into.
///
/// Implemented by the bytecode generator; tests use a recording double.
pub trait CodeBlock {
    fn begin_handler(&mut self, name: &str, is_command: bool, line: u32);
    fn end_handler(&mut self);
    /// Declare a local before the handler's statements are emitted.
    fn add_local(&mut self, canonical: &str, entry: &VariableEntry);

    fn push_int(&mut self, value: i64, line: u32);
    fn push_float(&mut self, value: f64, line: u32);
    fn push_bool(&mut self, value: bool, line: u32);
    fn push_string(&mut self, value: &str, line: u32);
    fn push_local(&mut self, canonical: &str, line: u32);

    /// Operation identified by symbol, consuming `arg_count` stack
    /// entries. `is_command` distinguishes statement intrinsics from
    /// value-producing calls.
    fn call(&mut self, symbol: &str, arg_count: usize, is_command: bool, line: u32);
    /// Operation identified by opcode (engine properties).
    fn operation(&mut self, op: InstructionId, arg_count: usize, line: u32);

    /// Offset the next instruction will land on.
    fn next_offset(&self) -> usize;
    /// Conditional forward jump; target patched later.
    fn jump_if_false(&mut self, line: u32) -> JumpPatch;
    /// Unconditional forward jump; target patched later.
    fn jump(&mut self, line: u32) -> JumpPatch;
    /// Unconditional backward jump to a known offset.
    fn jump_back(&mut self, target: usize, line: u32);
    fn patch_jump(&mut self, patch: JumpPatch, target: usize);
}

impl ParseTree {
    /// Emit every top-level handler, in parse order.
    pub fn emit_all(&self, sink: &mut dyn CodeBlock) {
        for &root in self.roots() {
            self.emit_node(root, sink);
        }
    }

    /// Emit one node.
    pub fn emit_node(&self, id: NodeId, sink: &mut dyn CodeBlock) {
        let node = self.node(id);
        let line = node.line;
        match &node.kind {
            NodeKind::IntValue(value) => sink.push_int(*value, line),
            NodeKind::FloatValue(value) => sink.push_float(*value, line),
            NodeKind::BoolValue(value) => sink.push_bool(*value, line),
            NodeKind::StringValue(value) => sink.push_string(value, line),
            NodeKind::LocalVariableRef { name, .. } => sink.push_local(name, line),
            NodeKind::GlobalPropertyRef { getter, args, .. } => {
                for &arg in args {
                    self.emit_node(arg, sink);
                }
                sink.operation(*getter, args.len(), line);
            }
            NodeKind::ChunkRef {
                chunk,
                start,
                end,
                target,
                mutable,
            } => {
                sink.push_int(chunk.tag(), line);
                self.emit_node(*start, sink);
                self.emit_node(*end, sink);
                self.emit_node(*target, sink);
                if *mutable {
                    // The target appears twice: one slot reads, one writes.
                    self.emit_node(*target, sink);
                    sink.call("MakeChunk", 5, true, line);
                } else {
                    sink.call("MakeChunkConst", 4, true, line);
                }
            }
            NodeKind::FunctionCall {
                name,
                is_command,
                args,
            } => {
                for &arg in args {
                    self.emit_node(arg, sink);
                }
                sink.call(name, args.len(), *is_command, line);
            }
            NodeKind::Command { symbol, args } => {
                for &arg in args {
                    self.emit_node(arg, sink);
                }
                sink.call(symbol, args.len(), true, line);
            }
            NodeKind::Assign { dest, value } => {
                self.emit_node(*dest, sink);
                self.emit_node(*value, sink);
                sink.call("=", 2, true, line);
            }
            NodeKind::PushValue { value } => {
                self.emit_node(*value, sink);
                sink.call("PushValue", 1, true, line);
            }
            NodeKind::GetParam { dest, index } => {
                self.emit_node(*dest, sink);
                self.emit_node(*index, sink);
                sink.call("GetParam", 2, true, line);
            }
            NodeKind::Print { value } => {
                self.emit_node(*value, sink);
                sink.call("Print", 1, true, line);
            }
            NodeKind::CodeBlock(block) => {
                for &statement in &block.statements {
                    self.emit_node(statement, sink);
                }
            }
            NodeKind::FunctionDefinition(def) => {
                sink.begin_handler(&def.name, def.is_command, line);
                for (canonical, entry) in &def.locals {
                    sink.add_local(canonical, entry);
                }
                for &statement in &def.statements {
                    self.emit_node(statement, sink);
                }
                sink.end_handler();
            }
            NodeKind::WhileLoop { condition, body } => {
                let top = sink.next_offset();
                self.emit_node(*condition, sink);
                let exit = sink.jump_if_false(line);
                self.emit_node(*body, sink);
                sink.jump_back(top, line);
                let after = sink.next_offset();
                sink.patch_jump(exit, after);
            }
            NodeKind::If {
                condition,
                then_block,
                else_block,
            } => {
                self.emit_node(*condition, sink);
                let to_else = sink.jump_if_false(line);
                self.emit_node(*then_block, sink);
                match else_block {
                    Some(else_block) => {
                        let to_end = sink.jump(line);
                        let else_start = sink.next_offset();
                        sink.patch_jump(to_else, else_start);
                        self.emit_node(*else_block, sink);
                        let after = sink.next_offset();
                        sink.patch_jump(to_end, after);
                    }
                    None => {
                        let after = sink.next_offset();
                        sink.patch_jump(to_else, after);
                    }
                }
            }
        }
    }

    /// Emit the setter form of a global property: its arguments, then
    /// the new value, then the setter opcode.
    ///
    /// # Panics
    ///
    /// Panics if `property` is not a `GlobalPropertyRef`.
    pub fn emit_setter(&self, property: NodeId, value: NodeId, sink: &mut dyn CodeBlock) {
        let node = self.node(property);
        match &node.kind {
            NodeKind::GlobalPropertyRef { setter, args, .. } => {
                for &arg in args {
                    self.emit_node(arg, sink);
                }
                self.emit_node(value, sink);
                sink.operation(*setter, args.len() + 1, node.line);
            }
            other => panic!("BUG: emit_setter on {other:?}"),
        }
    }
}
