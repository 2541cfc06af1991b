//! Local constant folding over the parse tree.
//!
//! Simplification walks each node's children first, then folds the node
//! itself when it is trivially reducible: integer arithmetic, numeric
//! negation, boolean negation, and string concatenation over literal
//! operands. Everything else is a structural no-op.

use crate::arena::{NodeId, ParseTree};
use crate::node::NodeKind;

impl ParseTree {
    /// Simplify every top-level handler, in parse order.
    pub fn simplify_all(&mut self) {
        let roots = self.roots().to_vec();
        for root in roots {
            self.simplify_node(root);
        }
    }

    /// Simplify one node and its children.
    pub fn simplify_node(&mut self, id: NodeId) {
        for child in self.child_ids(id) {
            self.simplify_node(child);
        }
        if let Some(folded) = self.fold(id) {
            self.node_mut(id).kind = folded;
        }
    }

    fn child_ids(&self, id: NodeId) -> Vec<NodeId> {
        match &self.node(id).kind {
            NodeKind::IntValue(_)
            | NodeKind::FloatValue(_)
            | NodeKind::BoolValue(_)
            | NodeKind::StringValue(_)
            | NodeKind::LocalVariableRef { .. } => Vec::new(),
            NodeKind::GlobalPropertyRef { args, .. }
            | NodeKind::FunctionCall { args, .. }
            | NodeKind::Command { args, .. } => args.clone(),
            NodeKind::ChunkRef {
                start,
                end,
                target,
                ..
            } => {
                let mut children = vec![*start];
                if end != start {
                    children.push(*end);
                }
                children.push(*target);
                children
            }
            NodeKind::Assign { dest, value } => vec![*dest, *value],
            NodeKind::PushValue { value } | NodeKind::Print { value } => vec![*value],
            NodeKind::GetParam { dest, index } => vec![*dest, *index],
            NodeKind::CodeBlock(block) => block.statements.clone(),
            NodeKind::FunctionDefinition(def) => def.statements.clone(),
            NodeKind::WhileLoop { condition, body } => vec![*condition, *body],
            NodeKind::If {
                condition,
                then_block,
                else_block,
            } => {
                let mut children = vec![*condition, *then_block];
                children.extend(else_block);
                children
            }
        }
    }

    fn fold(&self, id: NodeId) -> Option<NodeKind> {
        let NodeKind::FunctionCall { name, args, .. } = &self.node(id).kind else {
            return None;
        };
        match (name.as_str(), args.as_slice()) {
            ("vcy_add", [a, b]) => {
                Some(NodeKind::IntValue(self.int_of(*a)?.wrapping_add(self.int_of(*b)?)))
            }
            ("vcy_sub", [a, b]) => {
                Some(NodeKind::IntValue(self.int_of(*a)?.wrapping_sub(self.int_of(*b)?)))
            }
            ("vcy_mul", [a, b]) => {
                Some(NodeKind::IntValue(self.int_of(*a)?.wrapping_mul(self.int_of(*b)?)))
            }
            ("vcy_neg", [a]) => match self.node(*a).kind {
                NodeKind::IntValue(value) => Some(NodeKind::IntValue(value.wrapping_neg())),
                NodeKind::FloatValue(value) => Some(NodeKind::FloatValue(-value)),
                _ => None,
            },
            ("vcy_not", [a]) => match self.node(*a).kind {
                NodeKind::BoolValue(value) => Some(NodeKind::BoolValue(!value)),
                _ => None,
            },
            ("vcy_cat", [a, b]) => {
                let mut joined = self.string_of(*a)?.to_string();
                joined.push_str(self.string_of(*b)?);
                Some(NodeKind::StringValue(joined))
            }
            ("vcy_cat_space", [a, b]) => {
                let mut joined = self.string_of(*a)?.to_string();
                joined.push(' ');
                joined.push_str(self.string_of(*b)?);
                Some(NodeKind::StringValue(joined))
            }
            _ => None,
        }
    }

    fn int_of(&self, id: NodeId) -> Option<i64> {
        match self.node(id).kind {
            NodeKind::IntValue(value) => Some(value),
            _ => None,
        }
    }

    fn string_of(&self, id: NodeId) -> Option<&str> {
        match &self.node(id).kind {
            NodeKind::StringValue(value) => Some(value),
            _ => None,
        }
    }
}
