//! MIR optimisation passes and the opt-level driver.
//!
//! Every pass preserves SSA shape and observable behaviour: the final
//! value and the sequence of `print`/`say` lines are identical at every
//! level. Bytecode-level peephole rewriting runs inside codegen and is
//! keyed off the same level.

mod const_fold;
mod dce;

pub use const_fold::constant_fold;
pub use dce::eliminate_dead_code;

use crate::mir::MirModule;

/// Optimisation effort.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum OptLevel {
    /// No rewriting at all.
    None,
    /// Constant folding plus bytecode peephole.
    #[default]
    Basic,
    /// `Basic` plus dead-code elimination and branch simplification,
    /// iterated to a fixpoint.
    Aggressive,
}

impl OptLevel {
    /// Maps the CLI `--opt-level 0|1|2|3` values.
    pub fn from_cli(level: u8) -> Self {
        match level {
            0 => Self::None,
            1 => Self::Basic,
            _ => Self::Aggressive,
        }
    }

    /// Whether bytecode peephole rewriting applies at this level.
    pub fn peephole(self) -> bool {
        self != Self::None
    }
}

/// Runs the configured passes over a module, in place.
pub fn optimize(module: &mut MirModule, level: OptLevel) {
    match level {
        OptLevel::None => {}
        OptLevel::Basic => {
            constant_fold(module);
        }
        OptLevel::Aggressive => loop {
            let folded = constant_fold(module);
            let cleaned = eliminate_dead_code(module);
            if !folded && !cleaned {
                break;
            }
        },
    }
}
