//! HIR → MIR lowering.
//!
//! Each function is lowered independently. Variables get block-local
//! definitions during lowering; reads walk the predecessor chain and
//! materialise phis at joins, so every temp has exactly one definition and
//! every block ends in exactly one terminator. Undefined reads are
//! reported as semantic diagnostics and produce the empty constant so the
//! later passes stay well-formed.

mod expr;

use std::collections::HashMap;

use crate::diag::{Diagnostic, DiagnosticCategory, Diagnostics};
use crate::hir::{HirProgram, HirStmt, HirStmtKind, TypeHint};
use crate::mir::ids::{BlockId, FuncId, LocalId};
use crate::mir::instruction::{InstKind, MirInstruction, TermKind, Terminator};
use crate::mir::module::{MirFunction, MirModule};
use crate::mir::types::MirType;
use crate::mir::value::{Constant, MirValue};

/// Known function signature used for call resolution.
pub(crate) struct Signature {
    pub(crate) id: FuncId,
    pub(crate) params: Vec<String>,
}

/// Lowers a desugared program into a MIR module.
///
/// The top level becomes the implicit `main` function, returning the value
/// of its last expression statement (or the empty value).
pub fn lower_program(hir: &HirProgram, diagnostics: &mut Diagnostics) -> MirModule {
    let mut signatures: HashMap<String, Signature> = HashMap::new();
    for (index, function) in hir.functions.iter().enumerate() {
        if signatures.contains_key(&function.name) {
            diagnostics.push(Diagnostic::error(
                DiagnosticCategory::Semantic,
                format!("method `{}` is defined more than once", function.name),
                function.line,
                function.column,
            ));
            continue;
        }
        signatures.insert(
            function.name.clone(),
            Signature {
                id: FuncId::new(index as u32 + 1),
                params: function.params.clone(),
            },
        );
    }

    let mut functions = vec![lower_main(hir, &signatures, diagnostics)];
    for function in &hir.functions {
        let mut mir_fn = MirFunction::new(
            function.name.as_str(),
            function.public,
            function.line,
            function.column,
        );
        for param in &function.params {
            let local = mir_fn.add_local(param.as_str(), None);
            mir_fn.params.push(local);
        }
        let mut lowerer = FunctionLowerer::new(mir_fn, &signatures, diagnostics);
        lowerer.seed_params();
        for statement in &function.body {
            lowerer.ensure_open_block();
            lowerer.lower_statement(statement);
        }
        functions.push(lowerer.finish(None));
    }

    MirModule {
        functions,
        main: FuncId::new(0),
    }
}

fn lower_main(
    hir: &HirProgram,
    signatures: &HashMap<String, Signature>,
    diagnostics: &mut Diagnostics,
) -> MirFunction {
    let function = MirFunction::new("main", true, 1, 1);
    let mut lowerer = FunctionLowerer::new(function, signatures, diagnostics);
    let mut last_value: Option<MirValue> = None;
    for statement in &hir.statements {
        lowerer.ensure_open_block();
        if let HirStmtKind::Expr { value } = &statement.kind {
            last_value = Some(lowerer.lower_expr(value));
        } else {
            lowerer.lower_statement(statement);
        }
    }
    lowerer.finish(last_value)
}

/// Per-function lowering state.
pub(super) struct FunctionLowerer<'a> {
    pub(super) func: MirFunction,
    pub(super) current: BlockId,
    defs: HashMap<(BlockId, LocalId), MirValue>,
    pub(super) signatures: &'a HashMap<String, Signature>,
    diagnostics: &'a mut Diagnostics,
}

impl<'a> FunctionLowerer<'a> {
    fn new(
        func: MirFunction,
        signatures: &'a HashMap<String, Signature>,
        diagnostics: &'a mut Diagnostics,
    ) -> Self {
        let current = func.entry;
        Self {
            func,
            current,
            defs: HashMap::new(),
            signatures,
            diagnostics,
        }
    }

    /// Loads every parameter into a temp at the entry so later reads see a
    /// definition regardless of which block they occur in.
    fn seed_params(&mut self) {
        let entry = self.func.entry;
        let line = self.func.line;
        let column = self.func.column;
        for local in self.func.params.clone() {
            let dest = self.func.new_temp();
            self.func
                .block_mut(entry)
                .push(MirInstruction::new(InstKind::LoadVar { dest, var: local }, line, column));
            self.defs.insert((entry, local), MirValue::Temp(dest));
        }
    }

    /// Starts a fresh (unreachable) block when the current one is closed,
    /// so statements after a `Return` still lower cleanly.
    pub(super) fn ensure_open_block(&mut self) {
        if self.func.block(self.current).is_terminated() {
            self.current = self.func.new_block("dead");
        }
    }

    pub(super) fn emit(&mut self, kind: InstKind, line: u32, column: u32) {
        let block = self.current;
        self.func
            .block_mut(block)
            .push(MirInstruction::new(kind, line, column));
    }

    pub(super) fn terminate(&mut self, kind: TermKind, line: u32, column: u32) {
        self.func
            .set_terminator(self.current, Terminator::new(kind, line, column));
    }

    pub(super) fn semantic_error(&mut self, message: impl Into<String>, line: u32, column: u32) {
        self.diagnostics.push(Diagnostic::error(
            DiagnosticCategory::Semantic,
            message,
            line,
            column,
        ));
    }

    fn get_or_create_local(&mut self, name: &str, hint: TypeHint) -> LocalId {
        match self.func.local_by_name(name) {
            Some(local) => local,
            None => self.func.add_local(name, MirType::from_hint(hint)),
        }
    }

    pub(super) fn write_var(&mut self, local: LocalId, value: MirValue) {
        self.defs.insert((self.current, local), value);
    }

    /// Reads a variable at the current point, materialising phis at joins.
    pub(super) fn read_var(&mut self, name: &str, line: u32, column: u32) -> MirValue {
        let Some(local) = self.func.local_by_name(name) else {
            self.semantic_error(format!("undefined variable `{name}`"), line, column);
            return MirValue::Const(Constant::Empty);
        };
        let block = self.current;
        match self.read_var_path(local, block, line, column) {
            Some(value) => value,
            None => {
                self.semantic_error(format!("undefined variable `{name}`"), line, column);
                MirValue::Const(Constant::Empty)
            }
        }
    }

    fn read_var_path(
        &mut self,
        local: LocalId,
        block: BlockId,
        line: u32,
        column: u32,
    ) -> Option<MirValue> {
        if let Some(value) = self.defs.get(&(block, local)) {
            return Some(value.clone());
        }
        let predecessors = self.func.block(block).predecessors.clone();
        if predecessors.is_empty() {
            if block != self.func.entry {
                // Unreachable continuation block: any read yields empty.
                let value = MirValue::Const(Constant::Empty);
                self.defs.insert((block, local), value.clone());
                return Some(value);
            }
            return None;
        }
        if predecessors.len() == 1 {
            let value = self.read_var_path(local, predecessors[0], line, column)?;
            self.defs.insert((block, local), value.clone());
            return Some(value);
        }

        let mut incoming = Vec::with_capacity(predecessors.len());
        let mut defined_anywhere = false;
        for pred in &predecessors {
            let value = self.read_var_path(local, *pred, line, column);
            defined_anywhere |= value.is_some();
            incoming.push((*pred, value));
        }
        if !defined_anywhere {
            return None;
        }
        // A variable written on only some paths reads as empty on the rest.
        let incoming: Vec<(BlockId, MirValue)> = incoming
            .into_iter()
            .map(|(pred, value)| (pred, value.unwrap_or(MirValue::Const(Constant::Empty))))
            .collect();

        let first = incoming[0].1.clone();
        if incoming.iter().all(|(_, value)| *value == first) {
            self.defs.insert((block, local), first.clone());
            return Some(first);
        }

        let dest = self.func.new_temp();
        self.func.block_mut(block).insert_phi(MirInstruction::new(
            InstKind::Phi { dest, incoming },
            line,
            column,
        ));
        let value = MirValue::Temp(dest);
        self.defs.insert((block, local), value.clone());
        Some(value)
    }

    pub(super) fn lower_statement(&mut self, statement: &HirStmt) {
        let line = statement.line;
        let column = statement.column;
        match &statement.kind {
            HirStmtKind::Set { name, value } => {
                let lowered = self.lower_expr(value);
                let local = self.get_or_create_local(name, value.hint);
                self.emit(
                    InstKind::StoreVar {
                        var: local,
                        value: lowered.clone(),
                    },
                    line,
                    column,
                );
                self.write_var(local, lowered);
            }
            HirStmtKind::Return { value } => {
                let lowered = value.as_ref().map(|value| self.lower_expr(value));
                self.terminate(TermKind::Return(lowered), line, column);
            }
            HirStmtKind::Say { value } => {
                let lowered = self.lower_expr(value);
                self.emit(InstKind::Print { value: lowered }, line, column);
            }
            HirStmtKind::CallStmt { callee, arguments } => {
                let (callee, args) = self.lower_call_parts(callee, arguments, line, column);
                self.emit(
                    InstKind::Call {
                        dest: None,
                        callee,
                        args,
                    },
                    line,
                    column,
                );
            }
            HirStmtKind::If {
                condition,
                consequence,
                alternative,
            } => {
                let cond = self.lower_expr(condition);
                let then_block = self.func.new_block("then");
                let else_block = self.func.new_block("else");
                let join_block = self.func.new_block("join");
                self.terminate(
                    TermKind::CondJump {
                        cond,
                        then_block,
                        else_block,
                    },
                    line,
                    column,
                );

                self.current = then_block;
                for statement in consequence {
                    self.ensure_open_block();
                    self.lower_statement(statement);
                }
                self.terminate(TermKind::Jump(join_block), line, column);

                self.current = else_block;
                for statement in alternative {
                    self.ensure_open_block();
                    self.lower_statement(statement);
                }
                self.terminate(TermKind::Jump(join_block), line, column);

                self.current = join_block;
            }
            HirStmtKind::Expr { value } => {
                let _ = self.lower_expr(value);
            }
            HirStmtKind::Nop => {}
        }
    }

    /// Closes the function: the open block returns `value`, and any block
    /// left without a terminator returns empty.
    pub(super) fn finish(mut self, value: Option<MirValue>) -> MirFunction {
        let line = self.func.line;
        let column = self.func.column;
        self.terminate(TermKind::Return(value), line, column);
        for block in &mut self.func.blocks {
            if block.terminator.is_none() {
                block.terminator = Some(Terminator::new(TermKind::Return(None), line, column));
            }
        }
        self.func
    }
}
