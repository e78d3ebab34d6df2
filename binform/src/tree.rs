//! The node arena.
//!
//! Every field in a schema becomes a slot in a flat `Vec`, addressed by
//! [`NodeId`] (a plain index, `Copy`). A child's parent link is just another
//! `NodeId` stored alongside it — never an owning handle — so there is no
//! reference cycle to break: dropping the `Document` drops the `Vec` and
//! every node in it at once. This is the realization of §9's design note
//! ("use an index or weak-handle pattern rather than a counted reference
//! that would create a cycle").

use crate::array::ArrayState;
use crate::choice::ChoiceState;
use crate::leaves::{RestState, SkipState, WrapperState};
use crate::params::SanitizedParameters;
use crate::primitive::PrimitiveState;
use crate::struct_::StructState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub(crate) usize);

pub enum NodeKind {
    Primitive(PrimitiveState),
    Struct(StructState),
    Array(ArrayState),
    Choice(ChoiceState),
    Skip(SkipState),
    Rest(RestState),
    Wrapper(WrapperState),
}

pub(crate) struct NodeSlot {
    pub parent: Option<NodeId>,
    pub params: SanitizedParameters,
    pub kind: NodeKind,
    /// `false` right after `clear()`, `true` after `assign`/`read`.
    pub mutated: bool,
}

/// Owns a whole schema instance: every node reachable from its `root`.
pub struct Document {
    pub(crate) slots: Vec<NodeSlot>,
    pub(crate) root: Option<NodeId>,
}

impl Document {
    pub fn new() -> Self {
        Document { slots: Vec::new(), root: None }
    }

    pub fn root(&self) -> NodeId {
        self.root.expect("Document has no root node")
    }

    pub fn set_root(&mut self, id: NodeId) {
        self.root = Some(id);
    }

    pub fn alloc(&mut self, parent: Option<NodeId>, params: SanitizedParameters, kind: NodeKind) -> NodeId {
        let id = NodeId(self.slots.len());
        self.slots.push(NodeSlot { parent, params, kind, mutated: false });
        id
    }

    pub fn parent_of(&self, id: NodeId) -> Option<NodeId> {
        self.slots[id.0].parent
    }

    pub fn params(&self, id: NodeId) -> &SanitizedParameters {
        &self.slots[id.0].params
    }

    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.slots[id.0].kind
    }

    pub fn kind_mut(&mut self, id: NodeId) -> &mut NodeKind {
        &mut self.slots[id.0].kind
    }

    pub fn is_mutated(&self, id: NodeId) -> bool {
        self.slots[id.0].mutated
    }

    pub fn set_mutated(&mut self, id: NodeId, v: bool) {
        self.slots[id.0].mutated = v;
    }

    /// Depth of `id` in the tree; the root is depth 0. Only used by
    /// `inspect()`'s indentation.
    pub fn depth(&self, mut id: NodeId) -> usize {
        let mut depth = 0;
        while let Some(p) = self.parent_of(id) {
            id = p;
            depth += 1;
        }
        depth
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::leaves::RestState;

    #[test]
    fn depth_counts_ancestors_to_the_root() {
        let mut doc = Document::new();
        let root = doc.alloc(None, SanitizedParameters::new(), NodeKind::Rest(RestState::default()));
        let child = doc.alloc(Some(root), SanitizedParameters::new(), NodeKind::Rest(RestState::default()));
        let grandchild = doc.alloc(Some(child), SanitizedParameters::new(), NodeKind::Rest(RestState::default()));
        assert_eq!(doc.depth(root), 0);
        assert_eq!(doc.depth(child), 1);
        assert_eq!(doc.depth(grandchild), 2);
    }

    #[test]
    fn mutated_flag_starts_false_and_is_toggled_explicitly() {
        let mut doc = Document::new();
        let id = doc.alloc(None, SanitizedParameters::new(), NodeKind::Rest(RestState::default()));
        assert!(!doc.is_mutated(id));
        doc.set_mutated(id, true);
        assert!(doc.is_mutated(id));
    }
}
