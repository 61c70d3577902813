//! Arena parse tree
//!
//! Nodes live in a flat `Vec` and refer to each other by `NodeId`. Parents
//! are recorded when a node is attached as a parameter, so a node can be
//! rewritten in place without re-deriving a path from the root.

use alloy_primitives::U256;
use serde::{Deserialize, Serialize};

use crate::error::CompileError;
use crate::lexer::Span;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Notation {
    Prefix,
    Infix,
    Postfix,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValueKind {
    Literal(U256),
    MaxUint256,
    Arg(u8),
    Placeholder,
    /// Extra output `index` (1-based past the first) of a multi-output op.
    Output { of: NodeId, index: usize },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValueNode {
    pub kind: ValueKind,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpNode {
    /// Canonical table name.
    pub name: String,
    pub opcode: u8,
    /// `None` until resolved, and stays `None` on a poisoned node.
    pub operand: Option<u8>,
    /// Number of values the op pushes.
    pub output: usize,
    pub params: Vec<NodeId>,
    pub span: Span,
    pub paren_span: Option<Span>,
    pub notation: Notation,
    /// Leading literal params folded into the operand.
    pub consumed: usize,
    pub error: Option<CompileError>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorNode {
    pub error: CompileError,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeKind {
    Value(ValueNode),
    Op(OpNode),
    Error(ErrorNode),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub parent: Option<NodeId>,
    pub kind: NodeKind,
}

impl Node {
    pub fn span(&self) -> Span {
        match &self.kind {
            NodeKind::Value(v) => v.span,
            NodeKind::Op(op) => match op.paren_span {
                Some(paren) => op.span.merge(paren),
                None => op.span,
            },
            NodeKind::Error(e) => e.span,
        }
    }

    /// The error carried by this node itself, ignoring descendants.
    pub fn error(&self) -> Option<&CompileError> {
        match &self.kind {
            NodeKind::Op(op) => op.error.as_ref(),
            NodeKind::Error(e) => Some(&e.error),
            NodeKind::Value(_) => None,
        }
    }

    pub fn as_op(&self) -> Option<&OpNode> {
        match &self.kind {
            NodeKind::Op(op) => Some(op),
            _ => None,
        }
    }

    pub fn as_value(&self) -> Option<&ValueKind> {
        match &self.kind {
            NodeKind::Value(v) => Some(&v.kind),
            _ => None,
        }
    }

    /// Stack values this node leaves behind.
    pub fn outputs(&self) -> usize {
        match &self.kind {
            NodeKind::Value(ValueNode {
                kind: ValueKind::Output { .. },
                ..
            }) => 0,
            NodeKind::Value(_) | NodeKind::Error(_) => 1,
            NodeKind::Op(op) => op.output,
        }
    }
}

/// Parsed text: every node in an arena plus the top-level expressions of
/// each source.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseTree {
    pub(crate) nodes: Vec<Node>,
    pub(crate) sources: Vec<Vec<NodeId>>,
    pub(crate) constant_opcode: Option<u8>,
    pub(crate) stack_opcode: Option<u8>,
}

impl ParseTree {
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.index())
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn sources(&self) -> &[Vec<NodeId>] {
        &self.sources
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        match &self.node(id).kind {
            NodeKind::Op(op) => &op.params,
            _ => &[],
        }
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).parent
    }

    /// Every error in the arena with the span it applies to.
    ///
    /// Nodes discarded by a failed expression are included, so a tree with
    /// no reported errors is always buildable.
    pub fn errors(&self) -> Vec<(&CompileError, Span)> {
        self.nodes
            .iter()
            .filter_map(|node| node.error().map(|e| (e, node.span())))
            .collect()
    }

    pub fn is_buildable(&self) -> bool {
        self.nodes.iter().all(|node| node.error().is_none())
    }

    pub(crate) fn push(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Node { parent: None, kind });
        id
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.index()]
    }

    pub(crate) fn poison(&mut self, id: NodeId, error: CompileError) {
        let node = self.node_mut(id);
        match &mut node.kind {
            NodeKind::Op(op) => {
                op.operand = None;
                if op.error.is_none() {
                    op.error = Some(error);
                }
            }
            NodeKind::Value(v) => {
                let span = v.span;
                node.kind = NodeKind::Error(ErrorNode { error, span });
            }
            NodeKind::Error(_) => {}
        }
    }

    /// Literal value of a node, if it is a plain literal.
    pub fn literal(&self, id: NodeId) -> Option<U256> {
        match self.node(id).as_value() {
            Some(ValueKind::Literal(value)) => Some(*value),
            _ => None,
        }
    }
}
