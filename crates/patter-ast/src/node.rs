//! AST node variants and symbol-table entries.

use crate::arena::NodeId;
use crate::emit::InstructionId;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Declared type hint on a variable entry.
///
/// The front-end does no type checking; hints only record what the
/// parser knows at declaration time (loop counter temporaries are
/// integers, `theResult` defaults to the empty string).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VariantType {
    Unset,
    EmptyString,
    Int,
}

/// One entry in a locals or globals table, keyed by canonical name.
///
/// Canonical names are prefixed: `var_` for user variables, `fun_` /
/// `hdl_` for handler pointers, and the literal names `theResult` and
/// `gItemDel` for implicit variables. A variable exists after its first
/// reference; redeclaring it is a no-op.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableEntry {
    /// User-visible spelling, case preserved.
    pub display_name: String,
    /// Declared type hint.
    pub type_hint: VariantType,
    /// True for handler parameters.
    pub is_parameter: bool,
    /// True if the variable starts out holding its own name, the way an
    /// unquoted literal behaves before first assignment.
    pub init_with_name: bool,
    /// True for globals imported into a handler.
    pub is_global: bool,
}

impl VariableEntry {
    pub fn new(display_name: &str) -> VariableEntry {
        VariableEntry {
            display_name: display_name.to_string(),
            type_hint: VariantType::Unset,
            is_parameter: false,
            init_with_name: false,
            is_global: false,
        }
    }
}

/// Chunk kinds addressable by chunk expressions.
///
/// The discriminants are the integer tags passed to the runtime's
/// `MakeChunk` / `MakeChunkConst` / `GetChunkArray` / `vcy_chunk_count`
/// intrinsics. `byte`/`bytes` exist in the keyword enumeration but are
/// not emitted by this front-end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum ChunkType {
    Character = 1,
    Item = 2,
    Line = 3,
    Word = 4,
}

impl ChunkType {
    /// Integer tag for the runtime intrinsics.
    pub fn tag(self) -> i64 {
        self as i64
    }
}

impl fmt::Display for ChunkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChunkType::Character => f.write_str("character"),
            ChunkType::Item => f.write_str("item"),
            ChunkType::Line => f.write_str("line"),
            ChunkType::Word => f.write_str("word"),
        }
    }
}

/// Body of a loop or conditional arm.
///
/// Code blocks hold statements but no locals of their own: variable
/// resolution goes through the enclosing handler, so `function` links
/// back to the owning [`NodeKind::FunctionDefinition`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodeBlockNode {
    pub statements: Vec<NodeId>,
    pub function: NodeId,
}

/// A top-level handler: either a function (returns a value) or a
/// message/command handler (invoked by name).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionDefinition {
    /// Case-folded handler name.
    pub name: String,
    /// True for `on`/`to` message handlers, false for `function`.
    pub is_command: bool,
    /// Parameter spellings in declaration order.
    pub params: Vec<String>,
    /// Locals, parameters, and imported globals, keyed by canonical name.
    pub locals: IndexMap<String, VariableEntry>,
    pub statements: Vec<NodeId>,
}

impl FunctionDefinition {
    pub fn new(name: &str, is_command: bool) -> FunctionDefinition {
        FunctionDefinition {
            name: name.to_string(),
            is_command,
            params: Vec::new(),
            locals: IndexMap::new(),
            statements: Vec::new(),
        }
    }
}

/// One AST node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// 1-based source line.
    pub line: u32,
    pub kind: NodeKind,
}

impl Node {
    pub fn new(line: u32, kind: NodeKind) -> Node {
        Node { line, kind }
    }
}

/// The closed node family.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum NodeKind {
    IntValue(i64),
    FloatValue(f64),
    BoolValue(bool),
    StringValue(String),
    /// l-/r-value reference to a local, parameter, or implicit variable.
    LocalVariableRef {
        /// Canonical name (`var_x`, `theResult`, `gItemDel`, `temp3`).
        name: String,
        /// User-visible spelling.
        display: String,
    },
    /// Readable/writable engine property, addressed by a getter/setter
    /// opcode pair.
    GlobalPropertyRef {
        getter: InstructionId,
        setter: InstructionId,
        args: Vec<NodeId>,
    },
    /// Addressable substring of a container. When the source had no
    /// `to`/`through`/`thru` clause, `end` is the same node as `start`.
    ChunkRef {
        chunk: ChunkType,
        start: NodeId,
        end: NodeId,
        target: NodeId,
        mutable: bool,
    },
    /// User handler call, lowered operator, or built-in intrinsic.
    FunctionCall {
        name: String,
        is_command: bool,
        args: Vec<NodeId>,
    },
    /// Generic statement identified by its symbol (`Put`, `AddTo`,
    /// `return`, `ExitRepeat`, `+=`, …).
    Command { symbol: String, args: Vec<NodeId> },
    /// Specialized `=` command.
    Assign { dest: NodeId, value: NodeId },
    /// Evaluate for side effect.
    PushValue { value: NodeId },
    /// Copy positional argument `index` into the local `dest`.
    GetParam { dest: NodeId, index: NodeId },
    /// `put` without a destination.
    Print { value: NodeId },
    CodeBlock(CodeBlockNode),
    FunctionDefinition(FunctionDefinition),
    /// Pre-test loop.
    WhileLoop { condition: NodeId, body: NodeId },
    /// Two-way branch; both arms are code blocks.
    If {
        condition: NodeId,
        then_block: NodeId,
        else_block: Option<NodeId>,
    },
}

impl NodeKind {
    /// True if this node can appear on the left of `put … into` or be
    /// mutated by `add`/`subtract`/`multiply`/`divide`/`delete`.
    pub fn is_container(&self) -> bool {
        matches!(
            self,
            NodeKind::LocalVariableRef { .. }
                | NodeKind::GlobalPropertyRef { .. }
                | NodeKind::ChunkRef { mutable: true, .. }
        )
    }
}
