//! Bytecode virtual machine for the mufi scripting language.
//!
//! Source text is compiled by [`compiler::compile`] into a [`Chunk`] and run
//! by a [`Vm`]. The VM owns its operand stack, global variables and string
//! heap; program output and diagnostics go to injectable writers.

pub mod chunk;
pub mod compiler;
pub mod config;
pub mod debug;
pub mod error;
pub mod object;
pub mod table;
pub mod value;
pub mod vm;

pub use chunk::{Chunk, OpCode};
pub use compiler::{compile, CompileDiagnostic, CompileFailure};
pub use config::VmConfig;
pub use error::{CorruptBytecode, VmError};
pub use object::{Heap, ObjRef};
pub use value::Value;
pub use vm::{InterpretResult, Vm};
