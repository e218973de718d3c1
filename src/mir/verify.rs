//! MIR structural verifier.
//!
//! Checks the SSA and CFG invariants every lowered module must satisfy:
//! one terminator per block, one definition per temp, phi inputs matching
//! predecessors, and every use dominated by its definition. Verification
//! failures indicate a compiler bug, not bad user input.

use std::collections::{HashMap, HashSet};

use thiserror::Error;

use crate::mir::ids::{BlockId, TempId};
use crate::mir::instruction::InstKind;
use crate::mir::module::{MirFunction, MirModule};
use crate::mir::value::MirValue;

/// Invariant violations found by [`verify_module`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VerifyError {
    /// A block is missing its terminator.
    #[error("function `{function}`: block bb{block} has no terminator")]
    MissingTerminator {
        /// Offending function.
        function: String,
        /// Offending block.
        block: u32,
    },
    /// A temp has more than one defining instruction.
    #[error("function `{function}`: %t{temp} has more than one definition")]
    MultipleDefinitions {
        /// Offending function.
        function: String,
        /// Offending temp.
        temp: u32,
    },
    /// A temp is used where its definition does not dominate.
    #[error("function `{function}`: use of %t{temp} in bb{block} is not dominated by its definition")]
    UseNotDominated {
        /// Offending function.
        function: String,
        /// Offending temp.
        temp: u32,
        /// Block containing the use.
        block: u32,
    },
    /// A temp is used but never defined.
    #[error("function `{function}`: %t{temp} is used but never defined")]
    UndefinedTemp {
        /// Offending function.
        function: String,
        /// Offending temp.
        temp: u32,
    },
    /// A phi's incoming blocks do not match the block's predecessors.
    #[error("function `{function}`: phi in bb{block} does not match its predecessors")]
    PhiPredecessorMismatch {
        /// Offending function.
        function: String,
        /// Block containing the phi.
        block: u32,
    },
    /// A block's recorded predecessors do not match the edges.
    #[error("function `{function}`: predecessor list of bb{block} does not match the CFG edges")]
    PredecessorMismatch {
        /// Offending function.
        function: String,
        /// Offending block.
        block: u32,
    },
}

/// Verifies every function of a module.
pub fn verify_module(module: &MirModule) -> Result<(), VerifyError> {
    for function in &module.functions {
        verify_function(function)?;
    }
    Ok(())
}

fn verify_function(function: &MirFunction) -> Result<(), VerifyError> {
    let name = function.name.clone();

    // Exactly one terminator per block.
    for block in &function.blocks {
        if block.terminator.is_none() {
            return Err(VerifyError::MissingTerminator {
                function: name,
                block: block.id.value(),
            });
        }
    }

    // Recorded predecessor lists match the actual edges.
    let mut edges: HashMap<BlockId, HashSet<BlockId>> = HashMap::new();
    for block in &function.blocks {
        for successor in block.successors() {
            edges.entry(successor).or_default().insert(block.id);
        }
    }
    for block in &function.blocks {
        let recorded: HashSet<BlockId> = block.predecessors.iter().copied().collect();
        let actual = edges.remove(&block.id).unwrap_or_default();
        if recorded != actual {
            return Err(VerifyError::PredecessorMismatch {
                function: name,
                block: block.id.value(),
            });
        }
    }

    // Exactly one definition per temp.
    let mut defs: HashMap<TempId, (BlockId, usize)> = HashMap::new();
    for block in &function.blocks {
        for (index, instruction) in block.instructions.iter().enumerate() {
            if let Some(dest) = instruction.kind.dest() {
                if defs.insert(dest, (block.id, index)).is_some() {
                    return Err(VerifyError::MultipleDefinitions {
                        function: name,
                        temp: dest.value(),
                    });
                }
            }
        }
    }

    // Phi inputs match predecessors.
    for block in &function.blocks {
        let predecessors: HashSet<BlockId> = block.predecessors.iter().copied().collect();
        for instruction in &block.instructions {
            if let InstKind::Phi { incoming, .. } = &instruction.kind {
                let inputs: HashSet<BlockId> =
                    incoming.iter().map(|(pred, _)| *pred).collect();
                if inputs != predecessors {
                    return Err(VerifyError::PhiPredecessorMismatch {
                        function: name,
                        block: block.id.value(),
                    });
                }
            }
        }
    }

    // Dominance over the reachable subgraph.
    let order = function.reverse_postorder();
    let reachable: HashSet<BlockId> = order.iter().copied().collect();
    let dominators = compute_dominators(function, &order);

    let dominates = |a: BlockId, b: BlockId| -> bool {
        dominators
            .get(&b)
            .map(|set| set.contains(&a))
            .unwrap_or(false)
    };

    for &block_id in &order {
        let block = function.block(block_id);
        for (index, instruction) in block.instructions.iter().enumerate() {
            if let InstKind::Phi { incoming, .. } = &instruction.kind {
                for (pred, value) in incoming {
                    check_phi_operand(&defs, &reachable, &dominates, *pred, value, &name)?;
                }
                continue;
            }
            let mut failure = None;
            instruction.kind.for_each_use(|value| {
                if failure.is_some() {
                    return;
                }
                failure = check_use(&defs, &dominates, block_id, Some(index), value, &name);
            });
            if let Some(error) = failure {
                return Err(error);
            }
        }
        if let Some(terminator) = &block.terminator {
            let mut failure = None;
            terminator.kind.for_each_use(|value| {
                if failure.is_some() {
                    return;
                }
                failure = check_use(&defs, &dominates, block_id, None, value, &name);
            });
            if let Some(error) = failure {
                return Err(error);
            }
        }
    }

    Ok(())
}

fn check_use(
    defs: &HashMap<TempId, (BlockId, usize)>,
    dominates: &dyn Fn(BlockId, BlockId) -> bool,
    block: BlockId,
    index: Option<usize>,
    value: &MirValue,
    function: &str,
) -> Option<VerifyError> {
    let MirValue::Temp(temp) = value else {
        return None;
    };
    let Some((def_block, def_index)) = defs.get(temp) else {
        return Some(VerifyError::UndefinedTemp {
            function: function.to_string(),
            temp: temp.value(),
        });
    };
    let ok = if *def_block == block {
        match index {
            Some(use_index) => *def_index < use_index,
            // Terminators come after every instruction of the block.
            None => true,
        }
    } else {
        dominates(*def_block, block)
    };
    if ok {
        None
    } else {
        Some(VerifyError::UseNotDominated {
            function: function.to_string(),
            temp: temp.value(),
            block: block.value(),
        })
    }
}

fn check_phi_operand(
    defs: &HashMap<TempId, (BlockId, usize)>,
    reachable: &HashSet<BlockId>,
    dominates: &dyn Fn(BlockId, BlockId) -> bool,
    pred: BlockId,
    value: &MirValue,
    name: &str,
) -> Result<(), VerifyError> {
    let MirValue::Temp(temp) = value else {
        return Ok(());
    };
    let Some((def_block, _)) = defs.get(temp) else {
        return Err(VerifyError::UndefinedTemp {
            function: name.to_string(),
            temp: temp.value(),
        });
    };
    // An incoming value must be available at the end of its predecessor.
    if !reachable.contains(&pred) {
        return Ok(());
    }
    if *def_block == pred || dominates(*def_block, pred) {
        return Ok(());
    }
    Err(VerifyError::UseNotDominated {
        function: name.to_string(),
        temp: temp.value(),
        block: pred.value(),
    })
}

/// Iterative dominator sets over the reachable blocks.
fn compute_dominators(
    function: &MirFunction,
    order: &[BlockId],
) -> HashMap<BlockId, HashSet<BlockId>> {
    let reachable: HashSet<BlockId> = order.iter().copied().collect();
    let all: HashSet<BlockId> = reachable.clone();
    let mut dominators: HashMap<BlockId, HashSet<BlockId>> = HashMap::new();
    for &block in order {
        if block == function.entry {
            let mut set = HashSet::new();
            set.insert(block);
            dominators.insert(block, set);
        } else {
            dominators.insert(block, all.clone());
        }
    }

    let mut changed = true;
    while changed {
        changed = false;
        for &block in order {
            if block == function.entry {
                continue;
            }
            let mut intersection: Option<HashSet<BlockId>> = None;
            for pred in &function.block(block).predecessors {
                if !reachable.contains(pred) {
                    continue;
                }
                let pred_doms = &dominators[pred];
                intersection = Some(match intersection {
                    None => pred_doms.clone(),
                    Some(current) => current.intersection(pred_doms).copied().collect(),
                });
            }
            let mut next = intersection.unwrap_or_default();
            next.insert(block);
            if next != dominators[&block] {
                dominators.insert(block, next);
                changed = true;
            }
        }
    }
    dominators
}
