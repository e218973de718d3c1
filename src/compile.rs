//! Pipeline front door: frontmatter handling, compile, and run.

use thiserror::Error;

use crate::bytecode::{disassemble_module, BytecodeModule};
use crate::codegen::{self, CodegenError};
use crate::diag::{Diagnostic, Diagnostics, Severity};
use crate::hir;
use crate::mir::{self, VerifyError};
use crate::opt::{self, OptLevel};
use crate::parser::Parser;
use crate::vm::{Value, Vm, VmError, VmOptions};

/// Compiler options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileOptions {
    /// Optimisation effort.
    pub opt_level: OptLevel,
    /// Name stored in the compiled module.
    pub module_name: String,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            opt_level: OptLevel::Basic,
            module_name: "main".to_string(),
        }
    }
}

impl CompileOptions {
    /// Options with a specific optimisation level.
    pub fn with_opt_level(opt_level: OptLevel) -> Self {
        Self {
            opt_level,
            ..Self::default()
        }
    }
}

/// Result of compiling one source file.
#[derive(Debug)]
pub struct CompileOutput {
    /// The compiled module.
    pub module: BytecodeModule,
    /// Diagnostics in source order (lexical, syntactic, semantic).
    pub diagnostics: Vec<Diagnostic>,
    /// Whether the frontmatter carried `executable: true`.
    pub executable: bool,
}

impl CompileOutput {
    /// Returns `true` when any diagnostic has error severity.
    ///
    /// The module is still runnable (recovered statements are no-ops);
    /// strict callers refuse to execute when this is set.
    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|diagnostic| diagnostic.severity == Severity::Error)
    }
}

/// Hard compilation failures (invariant or capacity violations, not user
/// syntax errors — those are diagnostics).
#[derive(Debug, Error)]
pub enum CompileError {
    /// Code generation hit a format or capacity limit.
    #[error(transparent)]
    Codegen(#[from] CodegenError),
    /// The lowered MIR violated an SSA/CFG invariant.
    #[error(transparent)]
    Verify(#[from] VerifyError),
}

/// Compile-or-run failures for the embedding surface.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Compilation failed.
    #[error(transparent)]
    Compile(#[from] CompileError),
    /// Execution raised a runtime error.
    #[error("runtime error: {0}")]
    Runtime(#[from] VmError),
}

/// Strips a YAML frontmatter fence, preserving line numbers.
///
/// Frontmatter lines are replaced with blank lines so every token after
/// it keeps its original position. Only the `executable: true` marker is
/// interpreted; everything else in the fence is ignored.
pub fn strip_frontmatter(source: &str) -> (String, bool) {
    let mut lines = source.lines();
    if lines.next().map(str::trim) != Some("---") {
        return (source.to_string(), false);
    }

    let mut executable = false;
    let mut consumed = 1usize;
    let mut closed = false;
    for line in lines {
        consumed += 1;
        let trimmed = line.trim();
        if trimmed == "---" {
            closed = true;
            break;
        }
        if let Some(value) = trimmed.strip_prefix("executable:") {
            executable = value.trim().eq_ignore_ascii_case("true");
        }
    }
    if !closed {
        return (source.to_string(), false);
    }

    let mut body = String::with_capacity(source.len());
    for (index, line) in source.lines().enumerate() {
        if index >= consumed {
            body.push_str(line);
        }
        body.push('\n');
    }
    (body, executable)
}

/// Compiles source text through the full pipeline:
/// lex → parse → HIR → MIR → verify → optimise → verify → codegen.
pub fn compile_source(
    source: &str,
    options: &CompileOptions,
) -> Result<CompileOutput, CompileError> {
    let (body, executable) = strip_frontmatter(source);

    let mut parser = Parser::from_source(&body);
    let program = parser.parse_program();

    let mut diagnostics = Diagnostics::new();
    diagnostics.extend(parser.finish());

    let hir = hir::build_program(&program);
    let mut mir = mir::lower_program(&hir, &mut diagnostics);
    mir::verify::verify_module(&mir)?;
    opt::optimize(&mut mir, options.opt_level);
    mir::verify::verify_module(&mir)?;

    let module = codegen::generate(&mir, options.opt_level, &options.module_name)?;

    let mut diagnostics = diagnostics.into_vec();
    diagnostics.sort_by_key(|diagnostic| (diagnostic.line, diagnostic.column));

    Ok(CompileOutput {
        module,
        diagnostics,
        executable,
    })
}

/// Output of a full compile-and-run.
#[derive(Debug)]
pub struct RunOutput {
    /// The VM's final value.
    pub value: Value,
    /// Captured `print`/`say` lines in emission order.
    pub printed: Vec<String>,
    /// Compile-time diagnostics.
    pub diagnostics: Vec<Diagnostic>,
}

/// Compiles and executes source text, capturing output.
pub fn run_source(
    source: &str,
    options: &CompileOptions,
    vm_options: VmOptions,
) -> Result<RunOutput, PipelineError> {
    let output = compile_source(source, options)?;
    let diagnostics = output.diagnostics;
    let mut vm = Vm::with_options(output.module, vm_options);
    vm.capture_output();
    let value = vm.run()?;
    Ok(RunOutput {
        value,
        printed: vm.captured_output().to_vec(),
        diagnostics,
    })
}

/// Renders a compiled module for the `disasm` / `-d` interop surface.
pub fn disassemble(module: &BytecodeModule) -> String {
    disassemble_module(module)
}
