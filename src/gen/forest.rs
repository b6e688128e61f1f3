//! # Arena-backed decay forest
//!
//! Generator particles after merging are stored in a [`DecayForest`]: a flat arena of
//! [`DecayNode`]s addressed by [`NodeId`], where every node owns an ordered child list and
//! points to at most one parent.
//!
//! ## Invariants
//!
//! - A node appears in the child list of its parent exactly once, and in no other child list.
//! - No node is its own ancestor.
//! - Nodes without a parent are roots; several roots are allowed.
//!
//! Custody resolution moves children between parents while the forest is being grown, so
//! re-parenting is a first-class operation ([`DecayForest::reparent`]): it detaches the node from
//! its current parent's child list and attaches it to the new one, refusing moves that would
//! close a cycle.
//!
//! ## Flattening
//!
//! [`DecayForest::flatten`] walks the forest depth-first in pre-order (roots by increasing id,
//! children in list order). Every node is emitted after its parent, and the parent's output
//! position is recorded with it.
use nalgebra::Vector3;
use smallvec::SmallVec;

use crate::constants::{PdgId, PDG_PI0, STATUS_DECAYED, STATUS_FINAL_STATE};
use crate::gen::kinematics::P4;
use crate::gen::particle::{PackedGenParticle, PrunedGenParticle, StatusFlags};
use crate::ntuplizer_errors::NtuplizerError;

/// Index of a node in a [`DecayForest`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(&self) -> usize {
        self.0
    }
}

/// Input record a node was built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeOrigin {
    /// Position in the pruned collection.
    Pruned(usize),
    /// Position in the packed collection.
    Packed(usize),
    /// Synthetic parent inserted for the orphan photon at this packed position.
    SyntheticFor(usize),
}

/// One generator particle after merging.
#[derive(Debug, Clone, PartialEq)]
pub struct DecayNode {
    pub pdg_id: PdgId,
    pub status: i32,
    pub charge: i8,
    pub p4: P4,
    pub vertex: Vector3<f64>,
    pub flags: StatusFlags,
    pub origin: NodeOrigin,
    parent: Option<NodeId>,
    children: SmallVec<[NodeId; 4]>,
}

impl DecayNode {
    pub fn new(pdg_id: PdgId, status: i32, p4: P4, origin: NodeOrigin) -> Self {
        DecayNode {
            pdg_id,
            status,
            charge: 0,
            p4,
            vertex: Vector3::zeros(),
            flags: StatusFlags::empty(),
            origin,
            parent: None,
            children: SmallVec::new(),
        }
    }

    pub fn from_pruned(index: usize, particle: &PrunedGenParticle) -> Self {
        DecayNode {
            charge: particle.charge,
            vertex: particle.vertex,
            flags: particle.flags,
            ..DecayNode::new(
                particle.pdg_id,
                particle.status,
                particle.p4,
                NodeOrigin::Pruned(index),
            )
        }
    }

    /// Packed particles are final state; their vertex is taken from the mother when known.
    pub fn from_packed(index: usize, particle: &PackedGenParticle) -> Self {
        DecayNode {
            charge: particle.charge,
            flags: particle.flags,
            ..DecayNode::new(
                particle.pdg_id,
                STATUS_FINAL_STATE,
                particle.p4,
                NodeOrigin::Packed(index),
            )
        }
    }

    /// Neutral decayed pion standing in for the missing hadron parent of the orphan photon at
    /// packed position `photon_index`.
    pub fn synthetic_pi0(photon_index: usize, p4: P4, vertex: Vector3<f64>) -> Self {
        DecayNode {
            vertex,
            flags: StatusFlags::IS_FIRST_COPY | StatusFlags::IS_LAST_COPY,
            ..DecayNode::new(
                PDG_PI0,
                STATUS_DECAYED,
                p4,
                NodeOrigin::SyntheticFor(photon_index),
            )
        }
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    pub fn is_synthetic(&self) -> bool {
        matches!(self.origin, NodeOrigin::SyntheticFor(_))
    }
}

/// Arena of [`DecayNode`]s forming a rooted forest.
#[derive(Debug, Clone, Default)]
pub struct DecayForest {
    nodes: Vec<DecayNode>,
}

/// Pre-order layout of a [`DecayForest`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Flattened {
    /// Nodes in output order.
    pub order: Vec<NodeId>,
    /// Output position of the parent of the node at each output position.
    pub parents: Vec<Option<usize>>,
    positions: Vec<Option<usize>>,
}

impl Flattened {
    /// Output position of a node.
    pub fn position_of(&self, id: NodeId) -> Option<usize> {
        self.positions.get(id.0).copied().flatten()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

impl DecayForest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        DecayForest {
            nodes: Vec::with_capacity(capacity),
        }
    }

    /// Add a detached node and return its id.
    pub fn push(&mut self, mut node: DecayNode) -> NodeId {
        node.parent = None;
        node.children.clear();
        self.nodes.push(node);
        NodeId(self.nodes.len() - 1)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.nodes.capacity()
    }

    /// Panics if `id` does not belong to this forest.
    pub fn node(&self, id: NodeId) -> &DecayNode {
        &self.nodes[id.0]
    }

    pub fn get(&self, id: NodeId) -> Option<&DecayNode> {
        self.nodes.get(id.0)
    }

    /// Mutable access to the particle data of a node. Links are only changed through
    /// [`attach`](DecayForest::attach), [`detach`](DecayForest::detach) and
    /// [`reparent`](DecayForest::reparent).
    pub fn node_mut(&mut self, id: NodeId) -> &mut DecayNode {
        &mut self.nodes[id.0]
    }

    pub fn ids(&self) -> impl Iterator<Item = NodeId> {
        (0..self.nodes.len()).map(NodeId)
    }

    pub fn id_at(&self, index: usize) -> Option<NodeId> {
        (index < self.nodes.len()).then_some(NodeId(index))
    }

    pub fn nodes(&self) -> &[DecayNode] {
        &self.nodes
    }

    pub fn roots(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.ids().filter(|id| self.nodes[id.0].parent.is_none())
    }

    /// `true` if `ancestor` is `node` itself or lies on its parent chain.
    pub fn is_ancestor_or_self(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = Some(node);
        // the chain of a well-formed forest is never longer than the arena
        for _ in 0..=self.nodes.len() {
            match current {
                Some(id) if id == ancestor => return true,
                Some(id) => current = self.nodes[id.0].parent,
                None => return false,
            }
        }
        false
    }

    /// Give an unowned node to `parent`.
    ///
    /// Errors
    /// ----------
    /// * [`NtuplizerError::InvariantViolation`] if `child` already has a parent or if the link
    ///   would make `child` its own ancestor.
    pub fn attach(&mut self, child: NodeId, parent: NodeId) -> Result<(), NtuplizerError> {
        if let Some(owner) = self.nodes[child.0].parent {
            return Err(NtuplizerError::InvariantViolation(format!(
                "node {} is already owned by node {}",
                child.0, owner.0
            )));
        }
        if self.is_ancestor_or_self(child, parent) {
            return Err(NtuplizerError::InvariantViolation(format!(
                "attaching node {} under node {} would create a cycle",
                child.0, parent.0
            )));
        }

        self.nodes[child.0].parent = Some(parent);
        self.nodes[parent.0].children.push(child);
        Ok(())
    }

    /// Remove a node from its parent's child list. Returns the former parent.
    pub fn detach(&mut self, child: NodeId) -> Option<NodeId> {
        let parent = self.nodes[child.0].parent.take()?;
        self.nodes[parent.0].children.retain(|c| *c != child);
        Some(parent)
    }

    /// Move a node under a new parent.
    ///
    /// The move is checked before anything is changed: on error the forest is untouched.
    ///
    /// Return
    /// ----------
    /// * The former parent, if any.
    pub fn reparent(
        &mut self,
        child: NodeId,
        new_parent: NodeId,
    ) -> Result<Option<NodeId>, NtuplizerError> {
        if self.is_ancestor_or_self(child, new_parent) {
            return Err(NtuplizerError::InvariantViolation(format!(
                "moving node {} under node {} would create a cycle",
                child.0, new_parent.0
            )));
        }

        let former = self.detach(child);
        self.attach(child, new_parent)?;
        Ok(former)
    }

    /// Verify the forest invariants.
    pub fn check_invariants(&self) -> Result<(), NtuplizerError> {
        for id in self.ids() {
            let node = &self.nodes[id.0];

            if let Some(parent) = node.parent {
                let owned = self.nodes[parent.0]
                    .children
                    .iter()
                    .filter(|c| **c == id)
                    .count();
                if owned != 1 {
                    return Err(NtuplizerError::InvariantViolation(format!(
                        "node {} appears {owned} times in the children of its parent {}",
                        id.0, parent.0
                    )));
                }
                if parent == id || self.is_ancestor_or_self(id, parent) {
                    return Err(NtuplizerError::InvariantViolation(format!(
                        "node {} is its own ancestor",
                        id.0
                    )));
                }
            }

            if let Some(stray) = node
                .children
                .iter()
                .find(|c| self.nodes[c.0].parent != Some(id))
            {
                return Err(NtuplizerError::InvariantViolation(format!(
                    "node {} lists node {} as child but is not its parent",
                    id.0, stray.0
                )));
            }
        }
        Ok(())
    }

    /// Lay the forest out in pre-order.
    ///
    /// Errors
    /// ----------
    /// * [`NtuplizerError::InvariantViolation`] if a node is reached twice, if a node is reached
    ///   before its parent was emitted, or if some nodes are unreachable from the roots.
    pub fn flatten(&self) -> Result<Flattened, NtuplizerError> {
        let n = self.nodes.len();
        let mut order = Vec::with_capacity(n);
        let mut parents = Vec::with_capacity(n);
        let mut positions: Vec<Option<usize>> = vec![None; n];

        let mut stack: Vec<NodeId> = Vec::new();
        for root in self.roots() {
            stack.push(root);

            while let Some(id) = stack.pop() {
                if positions[id.0].is_some() {
                    return Err(NtuplizerError::InvariantViolation(format!(
                        "node {} reached twice while flattening",
                        id.0
                    )));
                }

                let parent_position = match self.nodes[id.0].parent {
                    None => None,
                    Some(parent) => Some(positions[parent.0].ok_or_else(|| {
                        NtuplizerError::InvariantViolation(format!(
                            "parent {} of node {} was not emitted before it",
                            parent.0, id.0
                        ))
                    })?),
                };

                positions[id.0] = Some(order.len());
                order.push(id);
                parents.push(parent_position);

                stack.extend(self.nodes[id.0].children.iter().rev().copied());
            }
        }

        if order.len() != n {
            return Err(NtuplizerError::InvariantViolation(format!(
                "{} nodes are unreachable from the forest roots",
                n - order.len()
            )));
        }

        Ok(Flattened {
            order,
            parents,
            positions,
        })
    }
}
