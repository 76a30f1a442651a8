//! Bump-pointer node arena.
//!
//! Nodes are allocated in fixed-size chunks (64 nodes each) and never freed
//! individually; the whole arena is dropped at once when its owning
//! [`crate::CompiledExpr`] is dropped. Children are referenced by
//! [`NodeId`] (an index), not by pointer, so the arena never needs to pin
//! memory — growing the chunk list cannot invalidate an already-issued
//! `NodeId`.

use crate::node::Node;

const CHUNK_SIZE: usize = 64;

/// An index into an [`Arena`]. Stable for the lifetime of the arena: unlike
/// a raw pointer, it survives the arena growing new chunks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(u32);

impl NodeId {
    fn index(self) -> usize {
        self.0 as usize
    }
}

/// Owns every AST node produced while compiling one expression.
#[derive(Debug, Default)]
pub struct Arena {
    chunks: Vec<Vec<Node>>,
}

impl Arena {
    pub fn new() -> Self {
        Arena { chunks: Vec::new() }
    }

    /// Allocate `node`, returning the id to reference it by.
    pub fn alloc(&mut self, node: Node) -> NodeId {
        let last_has_room = self.chunks.last().is_some_and(|c| c.len() < CHUNK_SIZE);
        if !last_has_room {
            self.chunks.push(Vec::with_capacity(CHUNK_SIZE));
        }
        let Some(chunk) = self.chunks.last_mut() else {
            unreachable!("a chunk was just pushed when the last one lacked room")
        };
        let global_index = (self.chunks.len() - 1) * CHUNK_SIZE + chunk.len();
        chunk.push(node);
        NodeId(global_index as u32)
    }

    pub fn get(&self, id: NodeId) -> &Node {
        let idx = id.index();
        &self.chunks[idx / CHUNK_SIZE][idx % CHUNK_SIZE]
    }

    /// Mutable access to an already-allocated node. Used by the parser to
    /// patch a just-built `Lambda` node's `self_name` once it discovers the
    /// lambda was the right-hand side of a `:=` bind (the binding name is
    /// only known after the lambda itself has already been parsed).
    pub fn get_mut(&mut self, id: NodeId) -> &mut Node {
        let idx = id.index();
        &mut self.chunks[idx / CHUNK_SIZE][idx % CHUNK_SIZE]
    }

    pub fn len(&self) -> usize {
        self.chunks.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::NodeKind;

    #[test]
    fn alloc_across_chunk_boundary_preserves_ids() {
        let mut arena = Arena::new();
        let mut ids = Vec::new();
        for i in 0..200 {
            ids.push(arena.alloc(Node::new(NodeKind::NumberLiteral(i as f64), 0)));
        }
        for (i, id) in ids.into_iter().enumerate() {
            match arena.get(id).kind {
                NodeKind::NumberLiteral(n) => assert_eq!(n, i as f64),
                _ => panic!("wrong kind"),
            }
        }
    }
}
