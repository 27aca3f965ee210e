//! The block graph: a decomposition of a control-flow graph into
//! independently analyzable fragments.
//!
//! Blocks are immutable once the graph is built. Per-block properties
//! that the analysis consults repeatedly (accessed variables, the local
//! entry-side summary) are precomputed at construction time and
//! attached to the block.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use thiserror::Error;

use blocksum_formula::DetachedCondition;

/// Identifier of a control-flow location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Location(pub u32);

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "L{}", self.0)
    }
}

/// Identifier of a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BlockId(pub u32);

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "B{}", self.0)
    }
}

/// A contiguous fragment of the control-flow graph, analyzed as one
/// unit.
#[derive(Debug, Clone)]
pub struct Block {
    pub id: BlockId,
    /// Distinguished entry location; backward exploration of the block
    /// classifies states that arrive here.
    pub entry: Location,
    /// Blocks whose exit edges lead into this block.
    pub predecessors: Vec<BlockId>,
    /// Blocks this block's exit edges lead into.
    pub successors: Vec<BlockId>,
    /// Whether the entry location heads a loop. Loop-head states are
    /// retained across continuations to guarantee convergence.
    pub entry_is_loop_head: bool,
    /// Variables the block reads or writes, precomputed at graph
    /// construction time.
    pub accessed_variables: BTreeSet<String>,
    /// Entry-side summary of the block's own behavior, if one was
    /// precomputed.
    pub local_summary: Option<DetachedCondition>,
}

impl Block {
    /// Blocks without predecessors sit at the program-entry side of the
    /// graph; extracted conditions are handed to the solver there.
    pub fn is_root(&self) -> bool {
        self.predecessors.is_empty()
    }

    /// Blocks without successors form the error-side frontier where
    /// backward analysis is seeded.
    pub fn is_seed(&self) -> bool {
        self.successors.is_empty()
    }
}

/// Errors raised while assembling a block graph.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    #[error("edge references unknown block {0}")]
    UnknownBlock(BlockId),
}

/// The immutable graph of blocks for one verification run.
#[derive(Debug, Clone, Default)]
pub struct BlockGraph {
    blocks: BTreeMap<BlockId, Block>,
}

impl BlockGraph {
    pub fn block(&self, id: BlockId) -> Option<&Block> {
        self.blocks.get(&id)
    }

    pub fn blocks(&self) -> impl Iterator<Item = &Block> {
        self.blocks.values()
    }

    /// Blocks where the initial seed requests go: the error-side
    /// frontier of the backward analysis.
    pub fn seed_blocks(&self) -> Vec<BlockId> {
        self.blocks
            .values()
            .filter(|b| b.is_seed())
            .map(|b| b.id)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }
}

/// Builder for [`BlockGraph`]. Predecessor and successor lists are
/// derived from the edge set at build time.
#[derive(Debug, Default)]
pub struct BlockGraphBuilder {
    blocks: BTreeMap<BlockId, Block>,
    edges: Vec<(BlockId, BlockId)>,
}

impl BlockGraphBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a block with the given id and entry location.
    pub fn block(mut self, id: u32, entry: u32) -> Self {
        let id = BlockId(id);
        self.blocks.entry(id).or_insert(Block {
            id,
            entry: Location(entry),
            predecessors: Vec::new(),
            successors: Vec::new(),
            entry_is_loop_head: false,
            accessed_variables: BTreeSet::new(),
            local_summary: None,
        });
        self
    }

    /// Add a forward control-flow edge from `from` to `to`.
    pub fn edge(mut self, from: u32, to: u32) -> Self {
        self.edges.push((BlockId(from), BlockId(to)));
        self
    }

    /// Mark a block's entry location as a loop head.
    pub fn loop_head(mut self, id: u32) -> Self {
        if let Some(block) = self.blocks.get_mut(&BlockId(id)) {
            block.entry_is_loop_head = true;
        }
        self
    }

    /// Attach the precomputed accessed-variables set of a block.
    pub fn accessed_variables<I, S>(mut self, id: u32, variables: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        if let Some(block) = self.blocks.get_mut(&BlockId(id)) {
            block.accessed_variables = variables.into_iter().map(Into::into).collect();
        }
        self
    }

    /// Attach a precomputed entry-side summary to a block.
    pub fn local_summary(mut self, id: u32, summary: DetachedCondition) -> Self {
        if let Some(block) = self.blocks.get_mut(&BlockId(id)) {
            block.local_summary = Some(summary);
        }
        self
    }

    pub fn build(mut self) -> Result<BlockGraph, GraphError> {
        for (from, to) in &self.edges {
            if !self.blocks.contains_key(from) {
                return Err(GraphError::UnknownBlock(*from));
            }
            if !self.blocks.contains_key(to) {
                return Err(GraphError::UnknownBlock(*to));
            }
        }
        for (from, to) in self.edges.drain(..) {
            if let Some(block) = self.blocks.get_mut(&from) {
                if !block.successors.contains(&to) {
                    block.successors.push(to);
                }
            }
            if let Some(block) = self.blocks.get_mut(&to) {
                if !block.predecessors.contains(&from) {
                    block.predecessors.push(from);
                }
            }
        }
        Ok(BlockGraph {
            blocks: self.blocks,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_derives_edges() {
        let graph = BlockGraphBuilder::new()
            .block(0, 0)
            .block(1, 10)
            .edge(0, 1)
            .build()
            .unwrap();
        let a = graph.block(BlockId(0)).unwrap();
        let b = graph.block(BlockId(1)).unwrap();
        assert_eq!(a.successors, vec![BlockId(1)]);
        assert!(a.predecessors.is_empty());
        assert_eq!(b.predecessors, vec![BlockId(0)]);
        assert!(a.is_root());
        assert!(b.is_seed());
    }

    #[test]
    fn test_seed_blocks_are_the_successor_less_frontier() {
        let graph = BlockGraphBuilder::new()
            .block(0, 0)
            .block(1, 10)
            .block(2, 20)
            .edge(0, 1)
            .edge(0, 2)
            .build()
            .unwrap();
        assert_eq!(graph.seed_blocks(), vec![BlockId(1), BlockId(2)]);
    }

    #[test]
    fn test_unknown_edge_target_is_rejected() {
        let err = BlockGraphBuilder::new()
            .block(0, 0)
            .edge(0, 7)
            .build()
            .unwrap_err();
        assert_eq!(err, GraphError::UnknownBlock(BlockId(7)));
    }

    #[test]
    fn test_block_properties_attach() {
        let graph = BlockGraphBuilder::new()
            .block(0, 0)
            .loop_head(0)
            .accessed_variables(0, ["x", "y"])
            .local_summary(0, DetachedCondition::trivial())
            .build()
            .unwrap();
        let block = graph.block(BlockId(0)).unwrap();
        assert!(block.entry_is_loop_head);
        assert_eq!(block.accessed_variables.len(), 2);
        assert!(block.local_summary.is_some());
    }

    #[test]
    fn test_duplicate_edges_collapse() {
        let graph = BlockGraphBuilder::new()
            .block(0, 0)
            .block(1, 10)
            .edge(0, 1)
            .edge(0, 1)
            .build()
            .unwrap();
        assert_eq!(graph.block(BlockId(0)).unwrap().successors.len(), 1);
    }
}
