//! Human-readable module dumps for the `disasm` / `-d` surfaces.

use std::fmt::Write as _;

use crate::bytecode::chunk::Chunk;
use crate::bytecode::module::{BytecodeModule, PoolConstant};
use crate::bytecode::opcode::{Opcode, OperandKind};

/// Renders a whole module: header, pools, symbols, then every chunk.
pub fn disassemble_module(module: &BytecodeModule) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "module {:?}", module.name);
    let _ = writeln!(
        out,
        "  flags {:#06x}  type {}  strings {}  constants {}  globals {}  functions {}",
        module.flags,
        module.module_type,
        module.strings.len(),
        module.constants.len(),
        module.globals.len(),
        module.functions.len()
    );

    for (index, constant) in module.constants.iter().enumerate() {
        let rendered = match constant {
            PoolConstant::Empty => "empty".to_string(),
            PoolConstant::Int(value) => value.to_string(),
            PoolConstant::Float(value) => format!("{value:?}"),
            PoolConstant::Str(string) => match module.strings.get(*string) {
                Some(text) => format!("{text:?}"),
                None => format!("str#{string}?"),
            },
            PoolConstant::Function(function) => format!("<fn {function}>"),
        };
        let _ = writeln!(out, "  const {index:>4}: {rendered}");
    }
    for symbol in &module.globals {
        let name = module.strings.get(symbol.name).unwrap_or("?");
        let _ = writeln!(out, "  global {name} -> const {}", symbol.constant);
    }

    let _ = writeln!(out, "chunk main:");
    disassemble_chunk(&module.main, module, &mut out);
    for (index, chunk) in module.functions.iter().enumerate() {
        let _ = writeln!(out, "chunk fn {index}:");
        disassemble_chunk(chunk, module, &mut out);
    }
    out
}

fn disassemble_chunk(chunk: &Chunk, module: &BytecodeModule, out: &mut String) {
    let _ = writeln!(out, "  arity {}  locals {}", chunk.arity, chunk.locals);
    let mut pc = 0usize;
    while pc < chunk.code.len() {
        let byte = chunk.code[pc];
        let Some(opcode) = Opcode::from_u8(byte) else {
            let _ = writeln!(out, "  {pc:>6}  ??? {byte:#04x}");
            pc += 1;
            continue;
        };
        let position = chunk
            .position_at(pc)
            .map(|(line, column)| format!("{line}:{column}"))
            .unwrap_or_default();
        match opcode.operand() {
            OperandKind::None => {
                let _ = writeln!(out, "  {pc:>6}  {:<14} {position:>8}", opcode.mnemonic());
                pc += 1;
            }
            OperandKind::U8 => {
                let operand = chunk.code.get(pc + 1).copied().unwrap_or(0);
                let _ = writeln!(
                    out,
                    "  {pc:>6}  {:<14} {operand:<6} {position:>8}",
                    opcode.mnemonic()
                );
                pc += 2;
            }
            OperandKind::U16 => {
                let operand = read_u16(&chunk.code, pc + 1);
                let annotation = annotate(opcode, operand, module);
                let _ = writeln!(
                    out,
                    "  {pc:>6}  {:<14} {operand:<6} {annotation} {position:>8}",
                    opcode.mnemonic()
                );
                pc += 3;
            }
            OperandKind::I16 => {
                let operand = read_u16(&chunk.code, pc + 1) as i16;
                let target = pc as i64 + 3 + operand as i64;
                let _ = writeln!(
                    out,
                    "  {pc:>6}  {:<14} {operand:<+6} -> {target} {position:>8}",
                    opcode.mnemonic()
                );
                pc += 3;
            }
        }
    }
}

fn annotate(opcode: Opcode, operand: u16, module: &BytecodeModule) -> String {
    match opcode {
        Opcode::LoadConst | Opcode::LoadUrl | Opcode::LoadGlobal | Opcode::StoreGlobal => {
            match module.constants.get(operand as usize) {
                Some(PoolConstant::Str(string)) => module
                    .strings
                    .get(*string)
                    .map(|text| format!("({text:?})"))
                    .unwrap_or_default(),
                Some(PoolConstant::Int(value)) => format!("({value})"),
                Some(PoolConstant::Float(value)) => format!("({value:?})"),
                Some(PoolConstant::Empty) => "(empty)".to_string(),
                Some(PoolConstant::Function(function)) => format!("(<fn {function}>)"),
                None => String::new(),
            }
        }
        _ => String::new(),
    }
}

fn read_u16(code: &[u8], at: usize) -> u16 {
    let low = code.get(at).copied().unwrap_or(0);
    let high = code.get(at + 1).copied().unwrap_or(0);
    u16::from_le_bytes([low, high])
}
