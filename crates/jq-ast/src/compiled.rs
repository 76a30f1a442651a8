//! The immutable, shareable result of a successful compile.

use std::sync::Arc;

use jq_error::ParseError;

use crate::arena::{Arena, NodeId};
use crate::node::Node;

/// A compiled query: the AST root, the arena that owns every node, the
/// original source text (used as the cache key and for diagnostics), and
/// any non-fatal errors collected by a recovery-mode parse.
///
/// Immutable after construction and safe to share across threads and
/// concurrent evaluations — nothing in here is mutated post-compile.
#[derive(Debug)]
pub struct CompiledExpr {
    pub source: Arc<str>,
    root: NodeId,
    arena: Arena,
    pub recovery_errors: Vec<ParseError>,
}

impl CompiledExpr {
    pub fn new(source: impl Into<Arc<str>>, arena: Arena, root: NodeId) -> Self {
        CompiledExpr { source: source.into(), root, arena, recovery_errors: Vec::new() }
    }

    pub fn with_recovery_errors(mut self, errors: Vec<ParseError>) -> Self {
        self.recovery_errors = errors;
        self
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn node(&self, id: NodeId) -> &Node {
        self.arena.get(id)
    }

    pub fn node_count(&self) -> usize {
        self.arena.len()
    }
}
