use std::io;

/// Fatal runtime errors. The `Display` text is the exact diagnostic line
/// written to the error stream.
#[derive(thiserror::Error, Debug)]
pub enum VmError {
    #[error("Undefined variable '{name}'.")]
    UndefinedVariable { name: String },

    #[error("Operands must be either both integer or both double numbers.")]
    OperandTypeMismatch,

    #[error("Operand must be a number (int/double).")]
    NegateNonNumber,

    #[error("Division by zero.")]
    DivisionByZero,

    #[error("Stack overflow (limit={limit}).")]
    StackOverflow { limit: usize },

    #[error("Corrupt bytecode: {0}")]
    CorruptBytecode(#[from] CorruptBytecode),

    #[error("Failed to write program output: {0}")]
    Output(#[source] io::Error),
}

/// Malformed instruction streams, which a compiled unit never contains.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CorruptBytecode {
    #[error("invalid opcode 0x{opcode:02X} at offset {offset}")]
    InvalidOpcode { opcode: u8, offset: usize },

    #[error("unexpected end of code at offset {offset}")]
    UnexpectedEnd { offset: usize },

    #[error("constant index {index} out of range (pool size {len})")]
    ConstantOutOfRange { index: usize, len: usize },

    #[error("constant {index} is not a string")]
    ExpectedString { index: usize },

    #[error("stack underflow")]
    StackUnderflow,
}
