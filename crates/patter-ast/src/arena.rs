//! The parse-tree arena.

use crate::node::{Node, NodeKind, VariableEntry};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Opaque handle to a node in a [`ParseTree`].
///
/// Ids are creation indices; they are only meaningful against the arena
/// that produced them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeId(u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Progress observer, notified synchronously after every node is added.
///
/// The observer receives the new node by reference and may not mutate
/// the arena. `count` equals the number of nodes in the arena after the
/// addition.
pub trait ParseTreeObserver {
    fn node_added(&mut self, id: NodeId, node: &Node, count: usize);
}

/// Owner of every AST node produced by one parse.
///
/// Nodes are added in creation order and dropped together with the
/// arena. Top-level handlers are additionally registered as roots;
/// [`simplify_all`], [`emit_all`], and the debug printer walk roots in
/// that order, which is parse order.
///
/// The arena also holds the compilation unit's globals table and the
/// counter behind [`new_temp_name`]: temporary names have the shape
/// `temp<N>` with a per-arena strictly increasing `N`, and cannot
/// collide with user variables because those are `var_`-prefixed.
///
/// [`simplify_all`]: ParseTree::simplify_all
/// [`emit_all`]: ParseTree::emit_all
/// [`new_temp_name`]: ParseTree::new_temp_name
#[derive(Default)]
pub struct ParseTree {
    nodes: Vec<Node>,
    roots: Vec<NodeId>,
    globals: IndexMap<String, VariableEntry>,
    temp_counter: u32,
    observer: Option<Box<dyn ParseTreeObserver>>,
}

impl ParseTree {
    pub fn new() -> ParseTree {
        ParseTree::default()
    }

    pub fn with_observer(observer: Box<dyn ParseTreeObserver>) -> ParseTree {
        ParseTree {
            observer: Some(observer),
            ..ParseTree::default()
        }
    }

    /// Take ownership of a node, assign its creation index, and notify
    /// the observer.
    pub fn add_node(&mut self, node: Node) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(node);
        let count = self.nodes.len();
        if let Some(observer) = self.observer.as_mut() {
            observer.node_added(id, &self.nodes[id.index()], count);
        }
        id
    }

    /// Convenience constructor: build and add a node in one step.
    pub fn add(&mut self, line: u32, kind: NodeKind) -> NodeId {
        self.add_node(Node::new(line, kind))
    }

    /// Register a top-level handler.
    pub fn add_root(&mut self, id: NodeId) {
        self.roots.push(id);
    }

    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.index()]
    }

    /// Number of nodes owned by the arena.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, id: NodeId) -> bool {
        id.index() < self.nodes.len()
    }

    /// All node ids, in creation order.
    pub fn ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        (0..self.nodes.len() as u32).map(NodeId)
    }

    /// Globals table of the compilation unit, keyed by canonical name.
    pub fn globals(&self) -> &IndexMap<String, VariableEntry> {
        &self.globals
    }

    pub fn globals_mut(&mut self) -> &mut IndexMap<String, VariableEntry> {
        &mut self.globals
    }

    /// Fresh temporary variable name, unique within this arena.
    pub fn new_temp_name(&mut self) -> String {
        let name = format!("temp{}", self.temp_counter);
        self.temp_counter += 1;
        name
    }

    /// Handler that owns the locals visible inside `block`.
    ///
    /// `block` is either a handler itself or a code block carrying a
    /// back-link to its handler.
    ///
    /// # Panics
    ///
    /// Panics if `block` is neither; statements only ever live in those
    /// two shapes.
    pub fn owning_function(&self, block: NodeId) -> NodeId {
        match &self.node(block).kind {
            NodeKind::FunctionDefinition(_) => block,
            NodeKind::CodeBlock(code_block) => code_block.function,
            other => panic!("BUG: owning_function on {other:?}"),
        }
    }

    /// Declare a local in the handler enclosing `block`. Redeclaration
    /// is a no-op: the first declaration wins.
    pub fn add_local(&mut self, block: NodeId, canonical: &str, entry: VariableEntry) {
        let function = self.owning_function(block);
        match &mut self.node_mut(function).kind {
            NodeKind::FunctionDefinition(def) => {
                def.locals.entry(canonical.to_string()).or_insert(entry);
            }
            _ => unreachable!("owning_function returned a non-handler"),
        }
    }

    /// Append a statement to a handler body or code block.
    ///
    /// # Panics
    ///
    /// Panics if `block` is not a statement container.
    pub fn append_statement(&mut self, block: NodeId, statement: NodeId) {
        match &mut self.node_mut(block).kind {
            NodeKind::FunctionDefinition(def) => def.statements.push(statement),
            NodeKind::CodeBlock(code_block) => code_block.statements.push(statement),
            other => panic!("BUG: append_statement on {other:?}"),
        }
    }
}
