//! Basic blocks: label + ordered instructions + single terminator.

use crate::mir::ids::BlockId;
use crate::mir::instruction::{InstKind, MirInstruction, Terminator};

/// One basic block of the CFG.
///
/// Instructions and the terminator are stored separately, so appending an
/// instruction always lands before control transfer. The predecessor list
/// is maintained by [`crate::mir::MirFunction::set_terminator`].
#[derive(Debug, Clone, PartialEq)]
pub struct BasicBlock {
    /// Stable block id (index into the function's block list).
    pub id: BlockId,
    /// Human-readable label for dumps and diagnostics.
    pub label: String,
    /// Ordered non-terminator instructions.
    pub instructions: Vec<MirInstruction>,
    /// The single control-flow terminator, once set.
    pub terminator: Option<Terminator>,
    /// Predecessor blocks in edge-creation order.
    pub predecessors: Vec<BlockId>,
}

impl BasicBlock {
    /// Creates an empty, unterminated block.
    pub fn new(id: BlockId, label: impl Into<String>) -> Self {
        Self {
            id,
            label: label.into(),
            instructions: Vec::new(),
            terminator: None,
            predecessors: Vec::new(),
        }
    }

    /// Appends an instruction (before the terminator position).
    pub fn push(&mut self, instruction: MirInstruction) {
        self.instructions.push(instruction);
    }

    /// Inserts a phi after any existing leading phis.
    pub fn insert_phi(&mut self, instruction: MirInstruction) {
        let at = self
            .instructions
            .iter()
            .position(|existing| !matches!(existing.kind, InstKind::Phi { .. }))
            .unwrap_or(self.instructions.len());
        self.instructions.insert(at, instruction);
    }

    /// Returns `true` once the terminator has been set.
    pub fn is_terminated(&self) -> bool {
        self.terminator.is_some()
    }

    /// Returns the successor blocks, empty when unterminated.
    pub fn successors(&self) -> Vec<BlockId> {
        self.terminator
            .as_ref()
            .map(|terminator| terminator.kind.successors())
            .unwrap_or_default()
    }
}
