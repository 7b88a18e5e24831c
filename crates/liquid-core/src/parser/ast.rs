//! LiquidCode AST — arena of block nodes produced by the parser
//!
//! Nodes live in one `Vec` and refer to their children by `NodeId`, so
//! every node has exactly one owner and traversal never chases pointers.
//! Node ids follow source (pre-order) order: a parent always has a lower
//! id than its children.
//!
//! The AST keeps what was written; resolving type codes, signals and
//! layers is the builder's job.

use serde::Serialize;

use super::scanner::Span;
use crate::schema::{
    Binding, Color, ColumnSpan, Fidelity, Flex, SignalEmit, Streaming, ValidationRule,
};

/// Index of a node in `Ast::nodes`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct NodeId(pub usize);

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AstNode {
    /// Type code as written (or implied by an index or sugar)
    pub type_code: String,
    pub type_index: Option<u8>,
    pub binding: Option<Binding>,
    pub label: Option<String>,
    pub modifiers: Vec<Modifier>,
    pub children: Vec<NodeId>,
    pub span: Span,
}

impl AstNode {
    pub fn new(type_code: impl Into<String>, type_index: Option<u8>, span: Span) -> Self {
        AstNode {
            type_code: type_code.into(),
            type_index,
            binding: None,
            label: None,
            modifiers: Vec::new(),
            children: Vec::new(),
            span,
        }
    }
}

/// One modifier, in source order
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "modifier", content = "value", rename_all = "kebab-case")]
pub enum Modifier {
    Color(Color),
    Size(String),
    Fidelity(Fidelity),
    Priority(u8),
    Action(String),
    Flex(Flex),
    Span(ColumnSpan),
    Stream(Streaming),
    Validate(ValidationRule),
    Emit(SignalEmit),
    Receive(String),
    Both(String),
    OpenLayer(u32),
    CloseLayer,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SignalDecl {
    pub name: String,
    pub span: Span,
}

/// `/N block` at statement level
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LayerDef {
    pub id: u32,
    pub root: NodeId,
    pub span: Span,
}

/// Parsed program
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Ast {
    pub nodes: Vec<AstNode>,
    pub signals: Vec<SignalDecl>,
    pub layers: Vec<LayerDef>,
    /// Top-level blocks outside any layer definition
    pub main_blocks: Vec<NodeId>,
}

impl Ast {
    pub fn node(&self, id: NodeId) -> &AstNode {
        &self.nodes[id.0]
    }

    pub fn children(&self, id: NodeId) -> impl Iterator<Item = &AstNode> {
        self.node(id).children.iter().map(|c| self.node(*c))
    }

    pub(crate) fn push(&mut self, node: AstNode) -> NodeId {
        self.nodes.push(node);
        NodeId(self.nodes.len() - 1)
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> &mut AstNode {
        &mut self.nodes[id.0]
    }

    /// Nesting depth of the subtree rooted at `id` (a leaf is 1)
    pub fn depth(&self, id: NodeId) -> usize {
        let mut deepest = 0;
        let mut stack = vec![(id, 1)];
        while let Some((current, depth)) = stack.pop() {
            deepest = deepest.max(depth);
            for child in &self.node(current).children {
                stack.push((*child, depth + 1));
            }
        }
        deepest
    }
}
