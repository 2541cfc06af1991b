// Allow unwrap in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]

//! Parse-tree arena and AST node family for the patter front-end.
//!
//! The parser produces a [`ParseTree`]: an arena that owns every node
//! created during a parse and hands out [`NodeId`] index handles. Nodes
//! never own each other; all cross-node references are ids, and
//! destroying the arena releases everything, including orphans that
//! were never linked into a parent when a parse error unwound.
//!
//! Node subfamilies:
//!
//! - *values* — literals, variable references, chunk references
//! - *commands* — statements (`Put`, `AddTo`, `return`, `=`, …)
//! - *code blocks* — handler bodies, loop bodies, conditional arms
//! - *composite expressions* — function calls and lowered operators
//!
//! Every node supports three operations, dispatched by `match` over
//! [`NodeKind`]: debug-print, simplify (local constant folding), and
//! emit against the [`CodeBlock`] trait the downstream code generator
//! implements.

pub mod arena;
mod debug;
pub mod emit;
pub mod node;
mod simplify;

pub use arena::{NodeId, ParseTree, ParseTreeObserver};
pub use emit::{CodeBlock, InstructionId, JumpPatch};
pub use node::{
    ChunkType, CodeBlockNode, FunctionDefinition, Node, NodeKind, VariableEntry, VariantType,
};
