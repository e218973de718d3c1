//! The fetch-decode-execute loop.

use std::collections::HashMap;

use crate::bytecode::{BytecodeModule, Opcode, OperandKind, PoolConstant};
use crate::hir::{BinaryOp, CompareOp, UnaryOp};
use crate::vm::builtins;
use crate::vm::error::VmError;
use crate::vm::frame::{ChunkRef, Frame};
use crate::vm::ops;
use crate::vm::value::Value;

/// Default maximum call-frame depth.
pub const DEFAULT_MAX_FRAMES: usize = 1024;

/// Environment variable overriding the frame-depth limit.
pub const STACK_LIMIT_ENV: &str = "MD_VM_STACK";

/// Execution limits and knobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VmOptions {
    /// Maximum call-frame depth before `StackOverflow`.
    pub max_frames: usize,
    /// Optional instruction budget.
    pub step_limit: Option<u64>,
}

impl Default for VmOptions {
    fn default() -> Self {
        Self {
            max_frames: DEFAULT_MAX_FRAMES,
            step_limit: None,
        }
    }
}

impl VmOptions {
    /// Builds options from the environment (`MD_VM_STACK`).
    pub fn from_env() -> Self {
        let mut options = Self::default();
        if let Ok(raw) = std::env::var(STACK_LIMIT_ENV) {
            if let Ok(limit) = raw.trim().parse::<usize>() {
                if limit > 0 {
                    options.max_frames = limit;
                }
            }
        }
        options
    }
}

/// Where `print`/`say` lines go.
#[derive(Debug)]
pub enum OutputSink {
    /// Write each line to stdout.
    Stdout,
    /// Collect lines for inspection (tests, oracle runs).
    Capture(Vec<String>),
}

impl OutputSink {
    fn write_line(&mut self, line: &str) {
        match self {
            Self::Stdout => println!("{line}"),
            Self::Capture(lines) => lines.push(line.to_string()),
        }
    }

    /// Captured lines; empty in stdout mode.
    pub fn captured(&self) -> &[String] {
        match self {
            Self::Stdout => &[],
            Self::Capture(lines) => lines,
        }
    }
}

enum Flow {
    Continue,
    Finished(Value),
}

#[derive(Debug, Clone, Copy)]
enum Operand {
    None,
    U8(u8),
    U16(u16),
    I16(i16),
}

/// The virtual machine: executes one loaded module per run.
///
/// The module stays read-only during execution; all mutation happens in
/// the VM's own frames, stacks, and globals map.
pub struct Vm {
    module: BytecodeModule,
    options: VmOptions,
    globals: HashMap<String, Value>,
    frames: Vec<Frame>,
    output: OutputSink,
    function_names: Vec<String>,
    steps: u64,
}

impl Vm {
    /// Creates a VM writing output to stdout.
    pub fn new(module: BytecodeModule) -> Self {
        Self::with_options(module, VmOptions::default())
    }

    /// Creates a VM with explicit options.
    pub fn with_options(module: BytecodeModule, options: VmOptions) -> Self {
        Self {
            module,
            options,
            globals: HashMap::new(),
            frames: Vec::new(),
            output: OutputSink::Stdout,
            function_names: Vec::new(),
            steps: 0,
        }
    }

    /// Switches the output sink to capture mode.
    pub fn capture_output(&mut self) {
        self.output = OutputSink::Capture(Vec::new());
    }

    /// Lines captured so far (empty in stdout mode).
    pub fn captured_output(&self) -> &[String] {
        self.output.captured()
    }

    /// Returns the loaded module.
    pub fn module(&self) -> &BytecodeModule {
        &self.module
    }

    /// Executes the module's main chunk and returns the final value.
    pub fn run(&mut self) -> Result<Value, VmError> {
        self.frames.clear();
        self.globals.clear();
        self.steps = 0;
        self.install_globals()?;
        self.frames
            .push(Frame::new(ChunkRef::Main, self.module.main.locals));
        self.dispatch()
    }

    fn install_globals(&mut self) -> Result<(), VmError> {
        for (id, spec) in builtins::BUILTINS.iter().enumerate() {
            self.globals
                .insert(spec.name.to_string(), Value::Builtin(id as u8));
        }
        self.function_names = vec![String::from("?"); self.module.functions.len()];
        for symbol in &self.module.globals {
            let name = self
                .module
                .strings
                .get(symbol.name)
                .ok_or_else(|| VmError::invalid_module("global name does not resolve"))?
                .to_string();
            let constant = self
                .module
                .constants
                .get(symbol.constant as usize)
                .ok_or_else(|| VmError::invalid_constant(symbol.constant))?;
            let value = match constant {
                PoolConstant::Function(index) => {
                    if let Some(slot) = self.function_names.get_mut(*index as usize) {
                        *slot = name.clone();
                    }
                    Value::Function(*index)
                }
                other => self.pool_value(other)?,
            };
            self.globals.insert(name, value);
        }
        Ok(())
    }

    fn chunk(&self, chunk: ChunkRef) -> Result<&crate::bytecode::Chunk, VmError> {
        match chunk {
            ChunkRef::Main => Ok(&self.module.main),
            ChunkRef::Function(index) => self
                .module
                .functions
                .get(index as usize)
                .ok_or_else(|| VmError::invalid_function(index)),
        }
    }

    fn dispatch(&mut self) -> Result<Value, VmError> {
        loop {
            if let Some(limit) = self.options.step_limit {
                if self.steps >= limit {
                    return Err(self.contextualise(VmError::step_limit_exceeded(limit), None));
                }
            }
            self.steps += 1;

            let (chunk_ref, pc) = {
                let frame = self
                    .frames
                    .last()
                    .ok_or_else(|| VmError::internal("no active frame"))?;
                (frame.chunk(), frame.pc())
            };

            let at_end = {
                let chunk = self.chunk(chunk_ref)?;
                pc >= chunk.code.len()
            };
            if at_end {
                // Running off the end behaves like a return of the stack
                // top (or empty).
                match self.implicit_return() {
                    Some(value) => return Ok(value),
                    None => continue,
                }
            }

            let (opcode, operand, next_pc) = {
                let chunk = self.chunk(chunk_ref)?;
                let byte = chunk.code[pc];
                let opcode = Opcode::from_u8(byte).ok_or_else(|| {
                    self.contextualise(
                        VmError::invalid_instruction(format!("unknown opcode {byte:#04x}")),
                        Some((chunk_ref, pc)),
                    )
                })?;
                let (operand, width) = match opcode.operand() {
                    OperandKind::None => (Operand::None, 0),
                    OperandKind::U8 => {
                        let value = *chunk.code.get(pc + 1).ok_or_else(|| {
                            VmError::invalid_instruction("truncated operand")
                        })?;
                        (Operand::U8(value), 1)
                    }
                    OperandKind::U16 | OperandKind::I16 => {
                        let low = *chunk.code.get(pc + 1).ok_or_else(|| {
                            VmError::invalid_instruction("truncated operand")
                        })?;
                        let high = *chunk.code.get(pc + 2).ok_or_else(|| {
                            VmError::invalid_instruction("truncated operand")
                        })?;
                        let raw = u16::from_le_bytes([low, high]);
                        if opcode.operand() == OperandKind::I16 {
                            (Operand::I16(raw as i16), 2)
                        } else {
                            (Operand::U16(raw), 2)
                        }
                    }
                };
                (opcode, operand, pc + 1 + width)
            };

            if let Some(frame) = self.frames.last_mut() {
                frame.set_pc(next_pc);
            }

            match self.execute(opcode, operand, next_pc) {
                Ok(Flow::Continue) => {}
                Ok(Flow::Finished(value)) => return Ok(value),
                Err(error) => return Err(self.contextualise(error, Some((chunk_ref, pc)))),
            }
        }
    }

    fn execute(&mut self, opcode: Opcode, operand: Operand, next_pc: usize) -> Result<Flow, VmError> {
        match opcode {
            Opcode::LoadConst => {
                let index = expect_u16(operand)?;
                let value = self.constant_value(index)?;
                self.frame_mut()?.push(value);
            }
            Opcode::LoadUrl => {
                let index = expect_u16(operand)?;
                let constant = self
                    .module
                    .constants
                    .get(index as usize)
                    .ok_or_else(|| VmError::invalid_constant(index))?;
                let PoolConstant::Str(string) = constant else {
                    return Err(VmError::invalid_constant(index));
                };
                let text = self
                    .module
                    .strings
                    .get(*string)
                    .ok_or_else(|| VmError::invalid_constant(index))?;
                let value = Value::Url(std::rc::Rc::from(text));
                self.frame_mut()?.push(value);
            }
            Opcode::LoadLocal => {
                let slot = expect_u16(operand)?;
                let value = self.frame()?.slot_get(slot)?.clone();
                self.frame_mut()?.push(value);
            }
            Opcode::StoreLocal => {
                let slot = expect_u16(operand)?;
                let value = self.frame_mut()?.pop()?;
                self.frame_mut()?.slot_set(slot, value)?;
            }
            Opcode::LoadGlobal => {
                let index = expect_u16(operand)?;
                let name = self.pool_string(index)?;
                let value = self
                    .globals
                    .get(&name)
                    .cloned()
                    .ok_or_else(|| VmError::unknown_name(name.as_str()))?;
                self.frame_mut()?.push(value);
            }
            Opcode::StoreGlobal => {
                let index = expect_u16(operand)?;
                let name = self.pool_string(index)?;
                let value = self.frame_mut()?.pop()?;
                self.globals.insert(name, value);
            }
            Opcode::LoadTrue => self.frame_mut()?.push(Value::Bool(true)),
            Opcode::LoadFalse => self.frame_mut()?.push(Value::Bool(false)),
            Opcode::LoadEmpty => self.frame_mut()?.push(Value::Empty),
            Opcode::Pop => {
                self.frame_mut()?.pop()?;
            }
            Opcode::Dup => self.frame_mut()?.dup()?,
            Opcode::Swap => self.frame_mut()?.swap()?,
            Opcode::Add => self.binary(BinaryOp::Add)?,
            Opcode::Sub => self.binary(BinaryOp::Sub)?,
            Opcode::Mul => self.binary(BinaryOp::Mul)?,
            Opcode::Div => self.binary(BinaryOp::Div)?,
            Opcode::Mod => self.binary(BinaryOp::Mod)?,
            Opcode::Pow => self.binary(BinaryOp::Pow)?,
            Opcode::Neg => self.unary(UnaryOp::Neg)?,
            Opcode::Not => self.unary(UnaryOp::Not)?,
            Opcode::Eq => self.comparison(CompareOp::Eq)?,
            Opcode::NotEq => self.comparison(CompareOp::NotEq)?,
            Opcode::StrictEq => self.comparison(CompareOp::StrictEq)?,
            Opcode::StrictNeq => self.comparison(CompareOp::StrictNotEq)?,
            Opcode::Lt => self.comparison(CompareOp::Lt)?,
            Opcode::Gt => self.comparison(CompareOp::Gt)?,
            Opcode::Lte => self.comparison(CompareOp::Lte)?,
            Opcode::Gte => self.comparison(CompareOp::Gte)?,
            Opcode::And => {
                let frame = self.frame_mut()?;
                let right = frame.pop()?;
                let left = frame.pop()?;
                frame.push(ops::logical_and(left, right));
            }
            Opcode::Or => {
                let frame = self.frame_mut()?;
                let right = frame.pop()?;
                let left = frame.pop()?;
                frame.push(ops::logical_or(left, right));
            }
            Opcode::Jump => {
                let offset = expect_i16(operand)?;
                self.jump(next_pc, offset)?;
            }
            Opcode::JumpIfFalse => {
                let offset = expect_i16(operand)?;
                let condition = self.frame_mut()?.pop()?;
                if !condition.is_truthy() {
                    self.jump(next_pc, offset)?;
                }
            }
            Opcode::Call => {
                let nargs = expect_u8(operand)?;
                self.call(nargs)?;
            }
            Opcode::Return => {
                let value = self.frame_mut()?.pop_or_empty();
                self.frames.pop();
                match self.frames.last_mut() {
                    Some(caller) => caller.push(value),
                    None => return Ok(Flow::Finished(value)),
                }
            }
            Opcode::LoadFunction => {
                let index = expect_u16(operand)?;
                if index as usize >= self.module.functions.len() {
                    return Err(VmError::invalid_function(index));
                }
                self.frame_mut()?.push(Value::Function(index));
            }
            Opcode::Print => {
                let value = self.frame_mut()?.pop()?;
                self.output.write_line(&value.to_display_string());
            }
            Opcode::Halt => {
                let value = self.frame_mut()?.pop_or_empty();
                return Ok(Flow::Finished(value));
            }
            Opcode::Nop => {}
        }
        Ok(Flow::Continue)
    }

    fn call(&mut self, nargs: u8) -> Result<(), VmError> {
        let mut args = Vec::with_capacity(nargs as usize);
        {
            let frame = self.frame_mut()?;
            for _ in 0..nargs {
                args.push(frame.pop()?);
            }
        }
        args.reverse();
        let callee = self.frame_mut()?.pop()?;

        match callee {
            Value::Function(index) => {
                let chunk = self.chunk(ChunkRef::Function(index))?;
                let arity = chunk.arity;
                let locals = chunk.locals;
                if arity != nargs {
                    let name = self
                        .function_names
                        .get(index as usize)
                        .map(String::as_str)
                        .unwrap_or("?");
                    return Err(VmError::wrong_arity(name, arity, nargs));
                }
                if self.frames.len() >= self.options.max_frames {
                    return Err(VmError::stack_overflow(
                        self.frames.len(),
                        self.options.max_frames,
                    ));
                }
                let mut frame = Frame::new(ChunkRef::Function(index), locals);
                for (slot, value) in args.into_iter().enumerate() {
                    frame.slot_set(slot as u16, value)?;
                }
                self.frames.push(frame);
                Ok(())
            }
            Value::Builtin(id) => {
                let result = {
                    let output = &mut self.output;
                    builtins::invoke(id, &args, &mut |line| output.write_line(line))?
                };
                self.frame_mut()?.push(result);
                Ok(())
            }
            other => Err(VmError::not_callable(other.type_name())),
        }
    }

    fn implicit_return(&mut self) -> Option<Value> {
        let value = self
            .frames
            .last_mut()
            .map(Frame::pop_or_empty)
            .unwrap_or(Value::Empty);
        self.frames.pop();
        match self.frames.last_mut() {
            Some(caller) => {
                caller.push(value);
                None
            }
            None => Some(value),
        }
    }

    fn jump(&mut self, next_pc: usize, offset: i16) -> Result<(), VmError> {
        let target = next_pc as i64 + i64::from(offset);
        let limit = {
            let chunk = self.chunk(self.frame()?.chunk())?;
            chunk.code.len() as i64
        };
        if target < 0 || target > limit {
            return Err(VmError::invalid_instruction(format!(
                "jump target {target} out of range"
            )));
        }
        self.frame_mut()?.set_pc(target as usize);
        Ok(())
    }

    fn binary(&mut self, op: BinaryOp) -> Result<(), VmError> {
        let frame = self.frame_mut()?;
        let right = frame.pop()?;
        let left = frame.pop()?;
        let result = ops::binary(op, &left, &right)?;
        self.frame_mut()?.push(result);
        Ok(())
    }

    fn unary(&mut self, op: UnaryOp) -> Result<(), VmError> {
        let operand = self.frame_mut()?.pop()?;
        let result = ops::unary(op, &operand)?;
        self.frame_mut()?.push(result);
        Ok(())
    }

    fn comparison(&mut self, op: CompareOp) -> Result<(), VmError> {
        let frame = self.frame_mut()?;
        let right = frame.pop()?;
        let left = frame.pop()?;
        let result = ops::compare(op, &left, &right)?;
        self.frame_mut()?.push(result);
        Ok(())
    }

    fn frame(&self) -> Result<&Frame, VmError> {
        self.frames
            .last()
            .ok_or_else(|| VmError::internal("no active frame"))
    }

    fn frame_mut(&mut self) -> Result<&mut Frame, VmError> {
        self.frames
            .last_mut()
            .ok_or_else(|| VmError::internal("no active frame"))
    }

    fn constant_value(&self, index: u16) -> Result<Value, VmError> {
        let constant = self
            .module
            .constants
            .get(index as usize)
            .ok_or_else(|| VmError::invalid_constant(index))?;
        self.pool_value(constant)
    }

    fn pool_value(&self, constant: &PoolConstant) -> Result<Value, VmError> {
        match constant {
            PoolConstant::Empty => Ok(Value::Empty),
            PoolConstant::Int(value) => Ok(Value::Int(*value)),
            PoolConstant::Float(value) => Ok(Value::Float(*value)),
            PoolConstant::Str(string) => {
                let text = self
                    .module
                    .strings
                    .get(*string)
                    .ok_or_else(|| VmError::invalid_module("string reference does not resolve"))?;
                Ok(Value::Str(std::rc::Rc::from(text)))
            }
            PoolConstant::Function(index) => Ok(Value::Function(*index)),
        }
    }

    fn pool_string(&self, index: u16) -> Result<String, VmError> {
        let constant = self
            .module
            .constants
            .get(index as usize)
            .ok_or_else(|| VmError::invalid_constant(index))?;
        let PoolConstant::Str(string) = constant else {
            return Err(VmError::invalid_constant(index));
        };
        self.module
            .strings
            .get(*string)
            .map(str::to_string)
            .ok_or_else(|| VmError::invalid_module("string reference does not resolve"))
    }

    /// Attaches source position and call chain to an escaping error.
    fn contextualise(&self, error: VmError, at: Option<(ChunkRef, usize)>) -> VmError {
        let mut error = error;
        if let Some((chunk_ref, pc)) = at {
            if let Ok(chunk) = self.chunk(chunk_ref) {
                if let Some((line, column)) = chunk.position_at(pc) {
                    error = error.with_position(line, column);
                }
            }
        }
        let chain: Vec<String> = self
            .frames
            .iter()
            .map(|frame| match frame.chunk() {
                ChunkRef::Main => "main".to_string(),
                ChunkRef::Function(index) => self
                    .function_names
                    .get(index as usize)
                    .cloned()
                    .unwrap_or_else(|| format!("fn#{index}")),
            })
            .collect();
        error.with_call_chain(chain)
    }
}

fn expect_u8(operand: Operand) -> Result<u8, VmError> {
    match operand {
        Operand::U8(value) => Ok(value),
        _ => Err(VmError::internal("operand width mismatch")),
    }
}

fn expect_u16(operand: Operand) -> Result<u16, VmError> {
    match operand {
        Operand::U16(value) => Ok(value),
        _ => Err(VmError::internal("operand width mismatch")),
    }
}

fn expect_i16(operand: Operand) -> Result<i16, VmError> {
    match operand {
        Operand::I16(value) => Ok(value),
        _ => Err(VmError::internal("operand width mismatch")),
    }
}
