//! MIR functions and the module container.

use crate::mir::block::BasicBlock;
use crate::mir::ids::{BlockId, FuncId, LocalId, TempId};
use crate::mir::instruction::Terminator;
use crate::mir::types::MirType;

/// One named local slot.
#[derive(Debug, Clone, PartialEq)]
pub struct LocalInfo {
    /// Source-level name.
    pub name: String,
    /// Static type when known.
    pub ty: Option<MirType>,
}

/// A function in SSA form over a CFG of basic blocks.
#[derive(Debug, Clone, PartialEq)]
pub struct MirFunction {
    /// Function name (`main` for the implicit top level).
    pub name: String,
    /// `true` for `Interaction` definitions.
    pub public: bool,
    /// Parameter locals in declaration order (a prefix of `locals`).
    pub params: Vec<LocalId>,
    /// All named locals.
    pub locals: Vec<LocalInfo>,
    /// Basic blocks indexed by [`BlockId`].
    pub blocks: Vec<BasicBlock>,
    /// The entry block.
    pub entry: BlockId,
    /// 1-based source line of the definition.
    pub line: u32,
    /// 1-based source column of the definition.
    pub column: u32,
    next_temp: u32,
}

impl MirFunction {
    /// Creates a function with an empty entry block.
    pub fn new(name: impl Into<String>, public: bool, line: u32, column: u32) -> Self {
        let mut function = Self {
            name: name.into(),
            public,
            params: Vec::new(),
            locals: Vec::new(),
            blocks: Vec::new(),
            entry: BlockId::new(0),
            line,
            column,
            next_temp: 0,
        };
        function.entry = function.new_block("entry");
        function
    }

    /// Creates a new block with a `prefix_<id>` label.
    pub fn new_block(&mut self, prefix: &str) -> BlockId {
        let id = BlockId::new(self.blocks.len() as u32);
        let label = if self.blocks.is_empty() {
            prefix.to_string()
        } else {
            format!("{prefix}_{}", id.value())
        };
        self.blocks.push(BasicBlock::new(id, label));
        id
    }

    /// Returns a block by id.
    ///
    /// Block ids are only minted by [`Self::new_block`], so the index is
    /// always in range.
    pub fn block(&self, id: BlockId) -> &BasicBlock {
        &self.blocks[id.value() as usize]
    }

    /// Returns a block mutably by id.
    pub fn block_mut(&mut self, id: BlockId) -> &mut BasicBlock {
        &mut self.blocks[id.value() as usize]
    }

    /// Allocates a fresh SSA temp.
    pub fn new_temp(&mut self) -> TempId {
        let temp = TempId::new(self.next_temp);
        self.next_temp += 1;
        temp
    }

    /// Adds a named local and returns its id.
    pub fn add_local(&mut self, name: impl Into<String>, ty: Option<MirType>) -> LocalId {
        let id = LocalId::new(self.locals.len() as u32);
        self.locals.push(LocalInfo {
            name: name.into(),
            ty,
        });
        id
    }

    /// Looks a local up by name.
    pub fn local_by_name(&self, name: &str) -> Option<LocalId> {
        self.locals
            .iter()
            .position(|local| local.name == name)
            .map(|index| LocalId::new(index as u32))
    }

    /// Terminates `block` and records the new edges on the successors.
    ///
    /// Re-terminating a block is a lowering bug; the first terminator wins.
    pub fn set_terminator(&mut self, block: BlockId, terminator: Terminator) {
        if self.block(block).is_terminated() {
            return;
        }
        let successors = terminator.kind.successors();
        self.block_mut(block).terminator = Some(terminator);
        for successor in successors {
            let predecessors = &mut self.block_mut(successor).predecessors;
            if !predecessors.contains(&block) {
                predecessors.push(block);
            }
        }
    }

    /// Reverse-postorder of the blocks reachable from the entry.
    pub fn reverse_postorder(&self) -> Vec<BlockId> {
        let mut visited = vec![false; self.blocks.len()];
        let mut postorder = Vec::new();
        let mut stack = vec![(self.entry, 0usize)];
        visited[self.entry.value() as usize] = true;
        while let Some((block, next_child)) = stack.pop() {
            let successors = self.block(block).successors();
            if next_child < successors.len() {
                stack.push((block, next_child + 1));
                let child = successors[next_child];
                if !visited[child.value() as usize] {
                    visited[child.value() as usize] = true;
                    stack.push((child, 0));
                }
            } else {
                postorder.push(block);
            }
        }
        postorder.reverse();
        postorder
    }
}

/// A compiled MIR module: every function plus the implicit `main`.
#[derive(Debug, Clone, PartialEq)]
pub struct MirModule {
    /// Functions; `main` first, then definitions in source order.
    pub functions: Vec<MirFunction>,
    /// The implicit top-level function.
    pub main: FuncId,
}

impl MirModule {
    /// Returns a function by id.
    pub fn function(&self, id: FuncId) -> &MirFunction {
        &self.functions[id.value() as usize]
    }

    /// Returns the implicit `main` function.
    pub fn main_function(&self) -> &MirFunction {
        self.function(self.main)
    }
}
