//! CFG navigation helpers over deserialized bridge data.
//!
//! Provides a traversable view of a function's block graph plus the
//! dominator tree the nil-check walk ascends.

use crate::ir::{BasicBlock, EdgeKind, Function, Instruction};
use std::collections::HashMap;

/// A traversable view of a function's CFG.
pub struct Cfg<'a> {
    func: &'a Function,
    successors: HashMap<u32, Vec<(u32, EdgeKind)>>,
    predecessors: HashMap<u32, Vec<(u32, EdgeKind)>>,
    block_map: HashMap<u32, &'a BasicBlock>,
}

impl<'a> Cfg<'a> {
    /// Build traversal indices from a deserialized function.
    pub fn from_function(func: &'a Function) -> Self {
        let mut successors: HashMap<u32, Vec<(u32, EdgeKind)>> = HashMap::new();
        let mut predecessors: HashMap<u32, Vec<(u32, EdgeKind)>> = HashMap::new();
        let mut block_map = HashMap::new();

        for block in &func.blocks {
            block_map.insert(block.id, block);
            successors.entry(block.id).or_default();
            predecessors.entry(block.id).or_default();
        }

        for edge in &func.cfg_edges {
            successors
                .entry(edge.from_block)
                .or_default()
                .push((edge.to_block, edge.kind.clone()));
            predecessors
                .entry(edge.to_block)
                .or_default()
                .push((edge.from_block, edge.kind.clone()));
        }

        Self {
            func,
            successors,
            predecessors,
            block_map,
        }
    }

    /// Entry block (always block 0 in the bridge's SSA).
    pub fn entry_block(&self) -> Option<&'a BasicBlock> {
        self.block_map.get(&0).copied()
    }

    /// Get block by ID.
    pub fn block(&self, id: u32) -> Option<&'a BasicBlock> {
        self.block_map.get(&id).copied()
    }

    /// Successors of a block, in edge order.
    pub fn successors(&self, block_id: u32) -> &[(u32, EdgeKind)] {
        self.successors
            .get(&block_id)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    /// Predecessors of a block, in edge order.
    pub fn predecessors(&self, block_id: u32) -> &[(u32, EdgeKind)] {
        self.predecessors
            .get(&block_id)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    /// All blocks in declaration order.
    pub fn blocks(&self) -> impl Iterator<Item = &'a BasicBlock> {
        self.func.blocks.iter()
    }

    /// Number of blocks.
    pub fn block_count(&self) -> usize {
        self.func.blocks.len()
    }

    /// The (true, false) successor pair of a block ending in `If`.
    ///
    /// Returns `None` for blocks without both conditional edges.
    pub fn cond_successors(&self, block_id: u32) -> Option<(u32, u32)> {
        let mut on_true = None;
        let mut on_false = None;
        for (succ, kind) in self.successors(block_id) {
            match kind {
                EdgeKind::CondTrue => on_true = Some(*succ),
                EdgeKind::CondFalse => on_false = Some(*succ),
                _ => {}
            }
        }
        Some((on_true?, on_false?))
    }

    /// The terminator of a block, if the block is non-empty.
    pub fn terminator(&self, block_id: u32) -> Option<&'a Instruction> {
        self.block(block_id).and_then(|b| b.instructions.last())
    }

    /// Reverse post-order over reachable blocks.
    pub fn reverse_postorder(&self) -> Vec<u32> {
        let mut visited = std::collections::HashSet::new();
        let mut postorder = Vec::new();

        if let Some(entry) = self.entry_block() {
            self.dfs_postorder(entry.id, &mut visited, &mut postorder);
        }

        postorder.reverse();
        postorder
    }

    fn dfs_postorder(
        &self,
        block_id: u32,
        visited: &mut std::collections::HashSet<u32>,
        postorder: &mut Vec<u32>,
    ) {
        if !visited.insert(block_id) {
            return;
        }
        for (succ_id, _) in self.successors(block_id).to_vec() {
            self.dfs_postorder(succ_id, visited, postorder);
        }
        postorder.push(block_id);
    }
}

/// Immediate-dominator tree for one function's CFG.
///
/// Dominators are stored as block indices, not block references, so the
/// tree can outlive any particular traversal of the CFG.
pub struct DomTree {
    idoms: HashMap<u32, u32>,
    entry: Option<u32>,
}

impl DomTree {
    /// Compute immediate dominators with the iterative RPO algorithm.
    ///
    /// Unreachable blocks get no dominator and report `None`.
    pub fn compute(cfg: &Cfg<'_>) -> Self {
        let Some(entry) = cfg.entry_block().map(|b| b.id) else {
            return Self {
                idoms: HashMap::new(),
                entry: None,
            };
        };

        let rpo = cfg.reverse_postorder();
        let order: HashMap<u32, usize> = rpo.iter().enumerate().map(|(i, &b)| (b, i)).collect();

        let mut idoms: HashMap<u32, u32> = HashMap::new();
        idoms.insert(entry, entry);

        let mut changed = true;
        while changed {
            changed = false;
            for &b in rpo.iter().skip(1) {
                let mut new_idom: Option<u32> = None;
                for (p, _) in cfg.predecessors(b) {
                    if !idoms.contains_key(p) {
                        continue;
                    }
                    new_idom = Some(match new_idom {
                        None => *p,
                        Some(cur) => Self::intersect(*p, cur, &idoms, &order),
                    });
                }
                if let Some(ni) = new_idom {
                    if idoms.get(&b) != Some(&ni) {
                        idoms.insert(b, ni);
                        changed = true;
                    }
                }
            }
        }

        Self {
            idoms,
            entry: Some(entry),
        }
    }

    /// Build a tree from idom pairs supplied by the SSA producer.
    /// The entry block must be absent from the map.
    pub fn from_idoms(idoms: HashMap<u32, u32>) -> Self {
        Self { idoms, entry: None }
    }

    /// Immediate dominator of `block`; `None` for the entry block and
    /// for blocks the tree does not cover.
    pub fn idom(&self, block: u32) -> Option<u32> {
        if self.entry == Some(block) {
            return None;
        }
        self.idoms.get(&block).copied()
    }

    fn intersect(
        mut a: u32,
        mut b: u32,
        idoms: &HashMap<u32, u32>,
        order: &HashMap<u32, usize>,
    ) -> u32 {
        while a != b {
            while order[&a] > order[&b] {
                a = idoms[&a];
            }
            while order[&b] > order[&a] {
                b = idoms[&b];
            }
        }
        a
    }
}
