//! Mid-level IR: SSA values and instructions over a control-flow graph.

mod block;
mod ids;
mod instruction;
mod lower;
mod module;
mod types;
mod value;
pub mod verify;

pub use block::BasicBlock;
pub use ids::{BlockId, FuncId, LocalId, TempId};
pub use instruction::{Callee, InstKind, MirInstruction, TermKind, Terminator};
pub use lower::lower_program;
pub use module::{LocalInfo, MirFunction, MirModule};
pub use types::MirType;
pub use value::{Constant, MirValue};
pub use verify::{verify_module, VerifyError};
