//! Stable textual rendering of the parse tree.
//!
//! Two spaces per indent level; nodes are labeled by kind and composite
//! nodes bracket their children with `{` / `}` on their own lines. Used
//! by tests and diagnostics only; nothing downstream parses this.

use crate::arena::{NodeId, ParseTree};
use crate::node::NodeKind;
use std::fmt::Write;

impl ParseTree {
    /// Render every top-level handler, in parse order.
    pub fn debug_print(&self) -> String {
        let mut out = String::new();
        for &root in self.roots() {
            self.debug_print_node(root, &mut out, 0);
        }
        out
    }

    /// Render one node at the given indent level.
    pub fn debug_print_node(&self, id: NodeId, out: &mut String, indent: usize) {
        let pad = "  ".repeat(indent);
        match &self.node(id).kind {
            NodeKind::IntValue(value) => {
                let _ = writeln!(out, "{pad}int( {value} )");
            }
            NodeKind::FloatValue(value) => {
                let _ = writeln!(out, "{pad}float( {value} )");
            }
            NodeKind::BoolValue(value) => {
                let _ = writeln!(out, "{pad}bool( {value} )");
            }
            NodeKind::StringValue(value) => {
                let _ = writeln!(out, "{pad}string( \"{value}\" )");
            }
            NodeKind::LocalVariableRef { name, display } => {
                let _ = writeln!(out, "{pad}localvar( {name}, \"{display}\" )");
            }
            NodeKind::GlobalPropertyRef { getter, args, .. } => {
                let _ = writeln!(out, "{pad}Global Property #{}", getter.0);
                self.print_children(args, out, indent, &pad);
            }
            NodeKind::ChunkRef {
                chunk,
                start,
                end,
                target,
                mutable,
            } => {
                if *mutable {
                    let _ = writeln!(out, "{pad}Chunk( {chunk}, mutable )");
                } else {
                    let _ = writeln!(out, "{pad}Chunk( {chunk} )");
                }
                self.print_children(&[*start, *end, *target], out, indent, &pad);
            }
            NodeKind::FunctionCall { name, args, .. } => {
                let _ = writeln!(out, "{pad}Function Call \"{name}\"");
                self.print_children(args, out, indent, &pad);
            }
            NodeKind::Command { symbol, args } => {
                let _ = writeln!(out, "{pad}Command \"{symbol}\"");
                self.print_children(args, out, indent, &pad);
            }
            NodeKind::Assign { dest, value } => {
                let _ = writeln!(out, "{pad}Command \"=\"");
                self.print_children(&[*dest, *value], out, indent, &pad);
            }
            NodeKind::PushValue { value } => {
                let _ = writeln!(out, "{pad}Command \"PushValue\"");
                self.print_children(&[*value], out, indent, &pad);
            }
            NodeKind::GetParam { dest, index } => {
                let _ = writeln!(out, "{pad}Command \"GetParam\"");
                self.print_children(&[*dest, *index], out, indent, &pad);
            }
            NodeKind::Print { value } => {
                let _ = writeln!(out, "{pad}Command \"Print\"");
                self.print_children(&[*value], out, indent, &pad);
            }
            NodeKind::CodeBlock(block) => {
                let _ = writeln!(out, "{pad}Code Block");
                self.print_children(&block.statements, out, indent, &pad);
            }
            NodeKind::FunctionDefinition(def) => {
                let flavor = if def.is_command { "command" } else { "function" };
                let _ = writeln!(out, "{pad}Handler \"{}\" ({flavor})", def.name);
                self.print_children(&def.statements, out, indent, &pad);
            }
            NodeKind::WhileLoop { condition, body } => {
                let _ = writeln!(out, "{pad}While Loop");
                self.print_children(&[*condition, *body], out, indent, &pad);
            }
            NodeKind::If {
                condition,
                then_block,
                else_block,
            } => {
                let _ = writeln!(out, "{pad}If");
                let _ = writeln!(out, "{pad}{{");
                self.debug_print_node(*condition, out, indent + 1);
                self.debug_print_node(*then_block, out, indent + 1);
                if let Some(else_block) = else_block {
                    let _ = writeln!(out, "{pad}  Else");
                    self.debug_print_node(*else_block, out, indent + 1);
                }
                let _ = writeln!(out, "{pad}}}");
            }
        }
    }

    fn print_children(&self, children: &[NodeId], out: &mut String, indent: usize, pad: &str) {
        let _ = writeln!(out, "{pad}{{");
        for &child in children {
            self.debug_print_node(child, out, indent + 1);
        }
        let _ = writeln!(out, "{pad}}}");
    }
}
