//! Serialisable bytecode modules: opcodes, chunks, pools, binary format.

mod chunk;
mod disasm;
pub mod encode;
mod module;
mod opcode;

pub use chunk::{Chunk, LineRun};
pub use disasm::disassemble_module;
pub use encode::{decode_module, encode_module, EncodeError, FLAG_LITTLE_ENDIAN, FORMAT_VERSION, MAGIC};
pub use module::{BytecodeModule, GlobalSymbol, PoolConstant, StringTable};
pub use opcode::{Opcode, OperandKind};
