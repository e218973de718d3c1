//! Dead-code elimination: constant branches, unreachable blocks, unused
//! pure definitions.
//!
//! Calls, stores and prints always survive. Unreachable blocks are
//! emptied in place (block ids are indices, so blocks are never removed
//! from the list) and unlinked from every predecessor list and phi.

use std::collections::{HashMap, HashSet};

use crate::mir::{
    BlockId, InstKind, MirFunction, MirModule, MirValue, TempId, TermKind,
};

/// Runs the pass over every function; returns whether anything changed.
pub fn eliminate_dead_code(module: &mut MirModule) -> bool {
    let mut changed = false;
    for function in &mut module.functions {
        loop {
            let mut round = false;
            round |= simplify_branches(function);
            round |= clear_unreachable(function);
            round |= drop_unused_definitions(function);
            changed |= round;
            if !round {
                break;
            }
        }
    }
    changed
}

/// Rewrites `CondJump` on a constant condition into a plain `Jump` and
/// unlinks the untaken edge.
fn simplify_branches(function: &mut MirFunction) -> bool {
    let mut rewrites: Vec<(BlockId, BlockId, Option<BlockId>)> = Vec::new();
    for block in &function.blocks {
        let Some(terminator) = &block.terminator else {
            continue;
        };
        if let TermKind::CondJump {
            cond: MirValue::Const(constant),
            then_block,
            else_block,
        } = &terminator.kind
        {
            let (taken, not_taken) = if constant.truthiness() {
                (*then_block, *else_block)
            } else {
                (*else_block, *then_block)
            };
            let dropped = (taken != not_taken).then_some(not_taken);
            rewrites.push((block.id, taken, dropped));
        }
    }

    let changed = !rewrites.is_empty();
    for (source, taken, dropped) in rewrites {
        if let Some(terminator) = &mut function.block_mut(source).terminator {
            terminator.kind = TermKind::Jump(taken);
        }
        if let Some(dropped) = dropped {
            unlink_edge(function, source, dropped);
        }
    }
    changed
}

/// Empties blocks unreachable from the entry and unlinks their edges.
fn clear_unreachable(function: &mut MirFunction) -> bool {
    let reachable: HashSet<BlockId> = function.reverse_postorder().into_iter().collect();
    let mut changed = false;
    let ids: Vec<BlockId> = function.blocks.iter().map(|block| block.id).collect();
    for id in ids {
        if reachable.contains(&id) {
            // Prune phi inputs and predecessor entries pointing at
            // unreachable blocks.
            let block = function.block_mut(id);
            let before = block.predecessors.len();
            block.predecessors.retain(|pred| reachable.contains(pred));
            changed |= block.predecessors.len() != before;
            for instruction in &mut block.instructions {
                if let InstKind::Phi { incoming, .. } = &mut instruction.kind {
                    let before = incoming.len();
                    incoming.retain(|(pred, _)| reachable.contains(pred));
                    changed |= incoming.len() != before;
                }
            }
            continue;
        }

        let successors = function.block(id).successors();
        for successor in successors {
            unlink_edge(function, id, successor);
        }
        let block = function.block_mut(id);
        if !block.instructions.is_empty() || !block.predecessors.is_empty() {
            changed = true;
        }
        block.instructions.clear();
        block.predecessors.clear();
        if let Some(terminator) = &mut block.terminator {
            if !matches!(terminator.kind, TermKind::Return(None)) {
                terminator.kind = TermKind::Return(None);
                changed = true;
            }
        }
    }
    changed
}

/// Removes pure instructions whose results are never read.
fn drop_unused_definitions(function: &mut MirFunction) -> bool {
    let mut changed = false;
    loop {
        let mut uses: HashMap<TempId, usize> = HashMap::new();
        for block in &function.blocks {
            for instruction in &block.instructions {
                instruction.kind.for_each_use(|value| {
                    if let MirValue::Temp(temp) = value {
                        *uses.entry(*temp).or_default() += 1;
                    }
                });
            }
            if let Some(terminator) = &block.terminator {
                terminator.kind.for_each_use(|value| {
                    if let MirValue::Temp(temp) = value {
                        *uses.entry(*temp).or_default() += 1;
                    }
                });
            }
        }

        let mut round = false;
        for block in &mut function.blocks {
            let before = block.instructions.len();
            block.instructions.retain(|instruction| {
                let removable = instruction.kind.is_pure()
                    && instruction
                        .kind
                        .dest()
                        .map(|dest| uses.get(&dest).copied().unwrap_or(0) == 0)
                        .unwrap_or(false);
                !removable
            });
            round |= block.instructions.len() != before;
        }
        changed |= round;
        if !round {
            return changed;
        }
    }
}

/// Removes the `source → target` edge from predecessor lists and phis.
fn unlink_edge(function: &mut MirFunction, source: BlockId, target: BlockId) {
    let block = function.block_mut(target);
    block.predecessors.retain(|pred| *pred != source);
    for instruction in &mut block.instructions {
        if let InstKind::Phi { incoming, .. } = &mut instruction.kind {
            incoming.retain(|(pred, _)| *pred != source);
        }
    }
}
