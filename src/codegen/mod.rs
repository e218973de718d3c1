//! MIR → bytecode generation.
//!
//! Per function: blocks are laid out in reverse postorder, named locals
//! get fixed slots (parameters first, matching the call convention), SSA
//! temps are slot-allocated by linear scan over their live ranges (phi
//! destinations get pinned slots, written from each predecessor before
//! its jump), instructions are emitted symbolically, the peephole pass
//! rewrites the symbolic stream, and forward jumps are patched once byte
//! offsets are final.

mod peephole;

use std::collections::HashMap;

use thiserror::Error;

use crate::bytecode::{
    BytecodeModule, Chunk, GlobalSymbol, Opcode, OperandKind, PoolConstant,
};
use crate::hir::{BinaryOp, CompareOp, UnaryOp};
use crate::mir::{
    BlockId, Callee, Constant, FuncId, InstKind, LocalId, MirFunction, MirModule, MirValue,
    TempId, TermKind,
};
use crate::opt::OptLevel;

/// Hard per-frame slot budget (the VM's register file size).
pub const MAX_SLOTS: usize = 256;

/// Code generation failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodegenError {
    /// The constant pool outgrew its u16 index space.
    #[error("constant pool exceeds {0} entries")]
    TooManyConstants(usize),
    /// More function chunks than the format can index.
    #[error("module has more functions than the format supports")]
    TooManyFunctions,
    /// A function declares more parameters than a `u8` arity can carry.
    #[error("function `{0}` has too many parameters")]
    TooManyParams(String),
    /// A call site has more arguments than a `u8` operand can carry.
    #[error("function `{0}` contains a call with too many arguments")]
    TooManyArguments(String),
    /// A function needs more than the per-frame slot budget.
    #[error("function `{function}` needs {needed} slots (budget {MAX_SLOTS})")]
    SlotBudgetExceeded {
        /// Offending function.
        function: String,
        /// Slots the function would need.
        needed: usize,
    },
    /// A jump offset does not fit the signed 16-bit encoding.
    #[error("function `{0}` contains a jump that exceeds the 16-bit range")]
    JumpOutOfRange(String),
    /// A phi had an incoming edge from a conditional branch.
    ///
    /// Lowering routes every phi input through an unconditional jump;
    /// hitting this means the MIR violated that contract.
    #[error("function `{0}`: phi input arrives over a conditional edge")]
    UnexpectedPhiEdge(String),
}

/// Generates a bytecode module from optimised MIR.
pub fn generate(
    module: &MirModule,
    level: OptLevel,
    name: &str,
) -> Result<BytecodeModule, CodegenError> {
    let mut builder = ModuleBuilder::new(name);

    // Reserve chunk slots and symbol-table entries first so call sites can
    // reference functions in any definition order.
    let mut chunk_index = 0u16;
    for (index, function) in module.functions.iter().enumerate() {
        if index == module.main.value() as usize {
            continue;
        }
        if builder.module.functions.len() >= u16::MAX as usize {
            return Err(CodegenError::TooManyFunctions);
        }
        builder.module.functions.push(Chunk::default());
        let constant = builder.add_constant(PoolConstant::Function(chunk_index))?;
        let name_index = builder.module.strings.intern(&function.name);
        builder.module.globals.push(GlobalSymbol {
            name: name_index,
            constant,
        });
        chunk_index += 1;
    }

    let mut chunk_cursor = 0usize;
    for (index, function) in module.functions.iter().enumerate() {
        let chunk = FunctionCodegen::new(function, module, &mut builder, level).generate()?;
        if index == module.main.value() as usize {
            builder.module.main = chunk;
        } else {
            builder.module.functions[chunk_cursor] = chunk;
            chunk_cursor += 1;
        }
    }

    Ok(builder.module)
}

// ---------------------------------------------------------------------------
// Module-level pools
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum ConstKey {
    Empty,
    Int(i64),
    Float(u64),
    Str(u32),
    Function(u16),
}

struct ModuleBuilder {
    module: BytecodeModule,
    const_index: HashMap<ConstKey, u16>,
}

impl ModuleBuilder {
    fn new(name: &str) -> Self {
        Self {
            module: BytecodeModule::new(name),
            const_index: HashMap::new(),
        }
    }

    fn add_constant(&mut self, constant: PoolConstant) -> Result<u16, CodegenError> {
        let key = match &constant {
            PoolConstant::Empty => ConstKey::Empty,
            PoolConstant::Int(value) => ConstKey::Int(*value),
            PoolConstant::Float(value) => ConstKey::Float(value.to_bits()),
            PoolConstant::Str(index) => ConstKey::Str(*index),
            PoolConstant::Function(index) => ConstKey::Function(*index),
        };
        if let Some(&existing) = self.const_index.get(&key) {
            return Ok(existing);
        }
        let index = self.module.constants.len();
        if index >= u16::MAX as usize {
            return Err(CodegenError::TooManyConstants(u16::MAX as usize));
        }
        self.module.constants.push(constant);
        self.const_index.insert(key, index as u16);
        Ok(index as u16)
    }

    fn string_constant(&mut self, text: &str) -> Result<u16, CodegenError> {
        let string = self.module.strings.intern(text);
        self.add_constant(PoolConstant::Str(string))
    }
}

// ---------------------------------------------------------------------------
// Symbolic instruction stream
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum AsmOperand {
    None,
    U8(u8),
    U16(u16),
    Target(BlockId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct AsmInst {
    pub(crate) op: Opcode,
    pub(crate) operand: AsmOperand,
    pub(crate) line: u32,
    pub(crate) column: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum AsmItem {
    Label(BlockId),
    Inst(AsmInst),
}

// ---------------------------------------------------------------------------
// Per-function generation
// ---------------------------------------------------------------------------

struct FunctionCodegen<'a> {
    function: &'a MirFunction,
    mir: &'a MirModule,
    builder: &'a mut ModuleBuilder,
    level: OptLevel,
    layout: Vec<BlockId>,
    temp_slots: HashMap<TempId, u16>,
    slot_count: usize,
    items: Vec<AsmItem>,
}

impl<'a> FunctionCodegen<'a> {
    fn new(
        function: &'a MirFunction,
        mir: &'a MirModule,
        builder: &'a mut ModuleBuilder,
        level: OptLevel,
    ) -> Self {
        let layout = function.reverse_postorder();
        Self {
            function,
            mir,
            builder,
            level,
            layout,
            temp_slots: HashMap::new(),
            slot_count: 0,
            items: Vec::new(),
        }
    }

    fn generate(mut self) -> Result<Chunk, CodegenError> {
        self.allocate_slots()?;
        for index in 0..self.layout.len() {
            let block_id = self.layout[index];
            self.items.push(AsmItem::Label(block_id));
            self.emit_block(block_id)?;
        }
        if self.level.peephole() {
            peephole::run(&mut self.items, &self.builder.module);
        }
        self.assemble()
    }

    // -- Slot allocation --

    /// Named locals keep fixed slots; temps share the rest via linear
    /// scan over their live ranges. Phi destinations are written from
    /// multiple predecessors, so their slots are pinned for the whole
    /// function.
    fn allocate_slots(&mut self) -> Result<(), CodegenError> {
        let named = self.function.locals.len();
        let mut defs: HashMap<TempId, usize> = HashMap::new();
        let mut last_use: HashMap<TempId, usize> = HashMap::new();
        let mut pinned: Vec<TempId> = Vec::new();

        let mut position = 0usize;
        let mut block_end: HashMap<BlockId, usize> = HashMap::new();
        for &block_id in &self.layout {
            let block = self.function.block(block_id);
            for instruction in &block.instructions {
                if let Some(dest) = instruction.kind.dest() {
                    defs.entry(dest).or_insert(position);
                }
                instruction.kind.for_each_use(|value| {
                    if let MirValue::Temp(temp) = value {
                        last_use.insert(*temp, position);
                    }
                });
                if let InstKind::Phi { dest, .. } = &instruction.kind {
                    pinned.push(*dest);
                }
                position += 1;
            }
            // Terminator position: condition/return operands and phi moves
            // into successors live until here.
            if let Some(terminator) = &block.terminator {
                terminator.kind.for_each_use(|value| {
                    if let MirValue::Temp(temp) = value {
                        last_use.insert(*temp, position);
                    }
                });
            }
            block_end.insert(block_id, position);
            position += 1;
        }

        // Phi inputs are read at the end of their predecessor.
        for &block_id in &self.layout {
            let block = self.function.block(block_id);
            for instruction in &block.instructions {
                if let InstKind::Phi { incoming, .. } = &instruction.kind {
                    for (pred, value) in incoming {
                        if let (MirValue::Temp(temp), Some(&end)) =
                            (value, block_end.get(pred))
                        {
                            let entry = last_use.entry(*temp).or_insert(end);
                            *entry = (*entry).max(end);
                        }
                    }
                }
            }
        }

        let mut temps: Vec<(usize, TempId)> =
            defs.iter().map(|(temp, &def)| (def, *temp)).collect();
        temps.sort_unstable();

        let pinned_set: std::collections::HashSet<TempId> = pinned.into_iter().collect();
        let mut free: Vec<u16> = Vec::new();
        let mut active: Vec<(usize, u16)> = Vec::new();
        let mut next_slot = named;

        for (def, temp) in temps {
            active.retain(|&(end, slot)| {
                if end < def {
                    free.push(slot);
                    false
                } else {
                    true
                }
            });
            // Phi destinations are written at predecessor terminators,
            // which precede the phi's own position, so a pooled slot could
            // still be carrying a live value there. They always take a
            // fresh slot.
            let pooled = if pinned_set.contains(&temp) {
                None
            } else {
                free.pop()
            };
            let slot = match pooled {
                Some(slot) => slot,
                None => {
                    let slot = next_slot;
                    next_slot += 1;
                    if next_slot > MAX_SLOTS {
                        return Err(CodegenError::SlotBudgetExceeded {
                            function: self.function.name.clone(),
                            needed: next_slot,
                        });
                    }
                    slot as u16
                }
            };
            self.temp_slots.insert(temp, slot);
            if !pinned_set.contains(&temp) {
                let end = last_use.get(&temp).copied().unwrap_or(def);
                active.push((end, slot));
            }
        }

        if next_slot > MAX_SLOTS {
            return Err(CodegenError::SlotBudgetExceeded {
                function: self.function.name.clone(),
                needed: next_slot,
            });
        }
        self.slot_count = next_slot;
        Ok(())
    }

    fn temp_slot(&self, temp: TempId) -> u16 {
        // Every temp that survives to codegen was assigned in
        // `allocate_slots`; a miss is a compiler bug surfaced by tests.
        self.temp_slots.get(&temp).copied().unwrap_or(0)
    }

    fn local_slot(&self, local: LocalId) -> u16 {
        local.value() as u16
    }

    // -- Emission --

    fn push_inst(&mut self, op: Opcode, operand: AsmOperand, line: u32, column: u32) {
        self.items.push(AsmItem::Inst(AsmInst {
            op,
            operand,
            line,
            column,
        }));
    }

    fn load_value(
        &mut self,
        value: &MirValue,
        line: u32,
        column: u32,
    ) -> Result<(), CodegenError> {
        match value {
            MirValue::Const(constant) => self.load_constant(constant, line, column),
            MirValue::Local(local) => {
                let slot = self.local_slot(*local);
                self.push_inst(Opcode::LoadLocal, AsmOperand::U16(slot), line, column);
                Ok(())
            }
            MirValue::Temp(temp) => {
                let slot = self.temp_slot(*temp);
                self.push_inst(Opcode::LoadLocal, AsmOperand::U16(slot), line, column);
                Ok(())
            }
        }
    }

    fn load_constant(
        &mut self,
        constant: &Constant,
        line: u32,
        column: u32,
    ) -> Result<(), CodegenError> {
        match constant {
            Constant::Empty => {
                self.push_inst(Opcode::LoadEmpty, AsmOperand::None, line, column);
            }
            Constant::Bool(true) => {
                self.push_inst(Opcode::LoadTrue, AsmOperand::None, line, column);
            }
            Constant::Bool(false) => {
                self.push_inst(Opcode::LoadFalse, AsmOperand::None, line, column);
            }
            Constant::Int(value) => {
                let index = self.builder.add_constant(PoolConstant::Int(*value))?;
                self.push_inst(Opcode::LoadConst, AsmOperand::U16(index), line, column);
            }
            Constant::Float(value) => {
                let index = self.builder.add_constant(PoolConstant::Float(*value))?;
                self.push_inst(Opcode::LoadConst, AsmOperand::U16(index), line, column);
            }
            Constant::Str(text) => {
                let index = self.builder.string_constant(text)?;
                self.push_inst(Opcode::LoadConst, AsmOperand::U16(index), line, column);
            }
            Constant::Url(text) => {
                let index = self.builder.string_constant(text)?;
                self.push_inst(Opcode::LoadUrl, AsmOperand::U16(index), line, column);
            }
        }
        Ok(())
    }

    fn store_temp(&mut self, temp: TempId, line: u32, column: u32) {
        let slot = self.temp_slot(temp);
        self.push_inst(Opcode::StoreLocal, AsmOperand::U16(slot), line, column);
    }

    fn emit_block(&mut self, block_id: BlockId) -> Result<(), CodegenError> {
        // Cloned so the builder can intern constants while we walk.
        let block = self.function.block(block_id).clone();
        for instruction in &block.instructions {
            let line = instruction.line;
            let column = instruction.column;
            match &instruction.kind {
                InstKind::LoadConst { dest, value } => {
                    self.load_constant(value, line, column)?;
                    self.store_temp(*dest, line, column);
                }
                InstKind::LoadVar { dest, var } => {
                    let slot = self.local_slot(*var);
                    self.push_inst(Opcode::LoadLocal, AsmOperand::U16(slot), line, column);
                    self.store_temp(*dest, line, column);
                }
                InstKind::StoreVar { var, value } => {
                    self.load_value(value, line, column)?;
                    let slot = self.local_slot(*var);
                    self.push_inst(Opcode::StoreLocal, AsmOperand::U16(slot), line, column);
                }
                InstKind::UnaryOp { dest, op, operand } => {
                    self.load_value(operand, line, column)?;
                    let opcode = match op {
                        UnaryOp::Neg => Opcode::Neg,
                        UnaryOp::Not => Opcode::Not,
                    };
                    self.push_inst(opcode, AsmOperand::None, line, column);
                    self.store_temp(*dest, line, column);
                }
                InstKind::BinaryOp {
                    dest,
                    op,
                    left,
                    right,
                } => {
                    self.load_value(left, line, column)?;
                    self.load_value(right, line, column)?;
                    let opcode = match op {
                        BinaryOp::Add => Opcode::Add,
                        BinaryOp::Sub => Opcode::Sub,
                        BinaryOp::Mul => Opcode::Mul,
                        BinaryOp::Div => Opcode::Div,
                        BinaryOp::Mod => Opcode::Mod,
                        BinaryOp::Pow => Opcode::Pow,
                    };
                    self.push_inst(opcode, AsmOperand::None, line, column);
                    self.store_temp(*dest, line, column);
                }
                InstKind::Compare {
                    dest,
                    op,
                    left,
                    right,
                } => {
                    self.load_value(left, line, column)?;
                    self.load_value(right, line, column)?;
                    let opcode = match op {
                        CompareOp::Eq => Opcode::Eq,
                        CompareOp::NotEq => Opcode::NotEq,
                        CompareOp::StrictEq => Opcode::StrictEq,
                        CompareOp::StrictNotEq => Opcode::StrictNeq,
                        CompareOp::Lt => Opcode::Lt,
                        CompareOp::Gt => Opcode::Gt,
                        CompareOp::Lte => Opcode::Lte,
                        CompareOp::Gte => Opcode::Gte,
                    };
                    self.push_inst(opcode, AsmOperand::None, line, column);
                    self.store_temp(*dest, line, column);
                }
                InstKind::Call { dest, callee, args } => {
                    match callee {
                        Callee::Function(func) => {
                            let index = self.chunk_index(*func);
                            self.push_inst(
                                Opcode::LoadFunction,
                                AsmOperand::U16(index),
                                line,
                                column,
                            );
                        }
                        Callee::Named(name) => {
                            let index = self.builder.string_constant(name)?;
                            self.push_inst(
                                Opcode::LoadGlobal,
                                AsmOperand::U16(index),
                                line,
                                column,
                            );
                        }
                    }
                    for arg in args {
                        self.load_value(arg, line, column)?;
                    }
                    let nargs = u8::try_from(args.len()).map_err(|_| {
                        CodegenError::TooManyArguments(self.function.name.clone())
                    })?;
                    self.push_inst(Opcode::Call, AsmOperand::U8(nargs), line, column);
                    match dest {
                        Some(dest) => self.store_temp(*dest, line, column),
                        None => self.push_inst(Opcode::Pop, AsmOperand::None, line, column),
                    }
                }
                InstKind::Print { value } => {
                    self.load_value(value, line, column)?;
                    self.push_inst(Opcode::Print, AsmOperand::None, line, column);
                }
                InstKind::Phi { .. } => {}
            }
        }

        let Some(terminator) = &block.terminator else {
            return Ok(());
        };
        let line = terminator.line;
        let column = terminator.column;
        match &terminator.kind {
            TermKind::Jump(target) => {
                self.emit_phi_moves(block_id, *target, line, column)?;
                self.push_inst(Opcode::Jump, AsmOperand::Target(*target), line, column);
            }
            TermKind::CondJump {
                cond,
                then_block,
                else_block,
            } => {
                if self.phi_moves_needed(block_id, *then_block)
                    || self.phi_moves_needed(block_id, *else_block)
                {
                    return Err(CodegenError::UnexpectedPhiEdge(self.function.name.clone()));
                }
                self.load_value(cond, line, column)?;
                self.push_inst(
                    Opcode::JumpIfFalse,
                    AsmOperand::Target(*else_block),
                    line,
                    column,
                );
                self.push_inst(Opcode::Jump, AsmOperand::Target(*then_block), line, column);
            }
            TermKind::Return(value) => {
                match value {
                    Some(value) => self.load_value(value, line, column)?,
                    None => self.push_inst(Opcode::LoadEmpty, AsmOperand::None, line, column),
                }
                self.push_inst(Opcode::Return, AsmOperand::None, line, column);
            }
        }
        Ok(())
    }

    /// Bytecode chunk index for a MIR function id (`main` has no chunk).
    fn chunk_index(&self, func: FuncId) -> u16 {
        let raw = func.value();
        let main = self.mir.main.value();
        if raw > main {
            (raw - 1) as u16
        } else {
            raw as u16
        }
    }

    fn phi_moves_needed(&self, pred: BlockId, target: BlockId) -> bool {
        self.function
            .block(target)
            .instructions
            .iter()
            .any(|instruction| match &instruction.kind {
                InstKind::Phi { incoming, .. } => {
                    incoming.iter().any(|(block, _)| *block == pred)
                }
                _ => false,
            })
    }

    /// Writes each phi destination of `target` from this predecessor.
    fn emit_phi_moves(
        &mut self,
        pred: BlockId,
        target: BlockId,
        line: u32,
        column: u32,
    ) -> Result<(), CodegenError> {
        let moves: Vec<(TempId, MirValue)> = self
            .function
            .block(target)
            .instructions
            .iter()
            .filter_map(|instruction| match &instruction.kind {
                InstKind::Phi { dest, incoming } => incoming
                    .iter()
                    .find(|(block, _)| *block == pred)
                    .map(|(_, value)| (*dest, value.clone())),
                _ => None,
            })
            .collect();
        for (dest, value) in moves {
            self.load_value(&value, line, column)?;
            self.store_temp(dest, line, column);
        }
        Ok(())
    }

    // -- Assembly --

    fn assemble(self) -> Result<Chunk, CodegenError> {
        let mut chunk = Chunk {
            arity: u8::try_from(self.function.params.len())
                .map_err(|_| CodegenError::TooManyParams(self.function.name.clone()))?,
            locals: self.slot_count as u16,
            code: Vec::new(),
            line_info: Vec::new(),
        };

        let mut offsets: HashMap<BlockId, usize> = HashMap::new();
        let mut fixups: Vec<(usize, BlockId)> = Vec::new();

        for item in &self.items {
            match item {
                AsmItem::Label(block) => {
                    offsets.insert(*block, chunk.code.len());
                }
                AsmItem::Inst(inst) => {
                    let start = chunk.code.len();
                    chunk.code.push(inst.op as u8);
                    match inst.operand {
                        AsmOperand::None => {}
                        AsmOperand::U8(value) => chunk.code.push(value),
                        AsmOperand::U16(value) => {
                            chunk.code.extend_from_slice(&value.to_le_bytes());
                        }
                        AsmOperand::Target(block) => {
                            fixups.push((chunk.code.len(), block));
                            chunk.code.extend_from_slice(&0i16.to_le_bytes());
                        }
                    }
                    debug_assert_eq!(
                        chunk.code.len() - start,
                        1 + operand_width(inst.op.operand())
                    );
                    chunk.push_line_info(chunk.code.len() - start, inst.line, inst.column);
                }
            }
        }

        for (at, target) in fixups {
            let Some(&target_offset) = offsets.get(&target) else {
                // Jumps only ever target laid-out blocks.
                return Err(CodegenError::JumpOutOfRange(self.function.name.clone()));
            };
            let next_pc = at + 2;
            let rel = target_offset as i64 - next_pc as i64;
            let rel = i16::try_from(rel)
                .map_err(|_| CodegenError::JumpOutOfRange(self.function.name.clone()))?;
            chunk.code[at..at + 2].copy_from_slice(&rel.to_le_bytes());
        }

        Ok(chunk)
    }
}

const fn operand_width(kind: OperandKind) -> usize {
    kind.width()
}
