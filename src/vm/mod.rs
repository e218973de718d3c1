//! The bytecode virtual machine: values, frames, builtins, dispatch.

pub mod builtins;
mod error;
mod frame;
mod machine;
pub mod ops;
mod value;

pub use error::{VmError, VmErrorKind};
pub use frame::{ChunkRef, Frame};
pub use machine::{OutputSink, Vm, VmOptions, DEFAULT_MAX_FRAMES, STACK_LIMIT_ENV};
pub use value::Value;
