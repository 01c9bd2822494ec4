//! The bytecode interpreter.
//!
//! A [`Vm`] owns its operand stack, global table and heap. Each call to
//! [`Vm::interpret`] compiles a program, runs it to completion and drops the
//! chunk; globals and interned strings persist across calls on the same VM.

mod stack;

use std::io::{self, Write};

pub use stack::Stack;

use crate::chunk::{Chunk, OpCode};
use crate::compiler;
use crate::config::VmConfig;
use crate::debug;
use crate::error::{CorruptBytecode, VmError};
use crate::object::{Heap, ObjRef};
use crate::table::Table;
use crate::value::{values_equal, Value};

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum InterpretResult {
    Ok,
    CompileError,
    RuntimeError,
}

#[derive(Debug, Clone, Copy)]
enum ArithOp {
    Add,
    Subtract,
    Multiply,
    Divide,
}

#[derive(Debug, Clone, Copy)]
enum CompareOp {
    Greater,
    Less,
}

pub struct Vm<W: Write = io::Stdout, E: Write = io::Stderr> {
    config: VmConfig,
    chunk: Chunk,
    ip: usize,
    stack: Stack,
    globals: Table,
    heap: Heap,
    out: W,
    err: E,
}

impl Vm {
    /// A VM printing to stdout/stderr.
    pub fn new(config: VmConfig) -> Self {
        Self::with_output(config, io::stdout(), io::stderr())
    }
}

impl<W: Write, E: Write> Vm<W, E> {
    pub fn with_output(config: VmConfig, out: W, err: E) -> Self {
        Self {
            stack: Stack::new(config.stack_max),
            config,
            chunk: Chunk::new(),
            ip: 0,
            globals: Table::new(),
            heap: Heap::new(),
            out,
            err,
        }
    }

    /// Compile and run `source`.
    pub fn interpret(&mut self, source: &str) -> InterpretResult {
        let chunk = match compiler::compile(source, &mut self.heap) {
            Ok(chunk) => chunk,
            Err(failure) => {
                log::debug!("{}", failure);
                for diag in &failure.diagnostics {
                    self.write_diagnostic(&diag.to_string());
                }
                return InterpretResult::CompileError;
            }
        };
        self.interpret_chunk(chunk)
    }

    /// Run an already compiled chunk. The chunk is dropped when the run ends.
    pub fn interpret_chunk(&mut self, chunk: Chunk) -> InterpretResult {
        self.chunk = chunk;
        self.ip = 0;

        log::debug!("running chunk: {} bytes", self.chunk.len());
        let result = match self.run() {
            Ok(()) => {
                log::debug!("run finished, {} globals defined", self.globals.len());
                InterpretResult::Ok
            }
            Err(e) => {
                self.runtime_error(&e);
                InterpretResult::RuntimeError
            }
        };

        self.chunk = Chunk::new();
        self.ip = 0;
        result
    }

    pub fn heap(&self) -> &Heap {
        &self.heap
    }

    /// Needed to intern names and string constants when building chunks by hand.
    pub fn heap_mut(&mut self) -> &mut Heap {
        &mut self.heap
    }

    pub fn globals(&self) -> &Table {
        &self.globals
    }

    /// Look up a global by name without interning it.
    pub fn global(&self, name: &str) -> Option<Value> {
        let r = self.heap.lookup(name.as_bytes())?;
        self.globals.get(r)
    }

    pub fn stack(&self) -> &Stack {
        &self.stack
    }

    pub fn config(&self) -> &VmConfig {
        &self.config
    }

    pub fn output(&self) -> &W {
        &self.out
    }

    pub fn error_output(&self) -> &E {
        &self.err
    }

    // -------------------------
    // Diagnostics
    // -------------------------

    fn runtime_error(&mut self, e: &VmError) {
        let line = self.chunk.line_at(self.ip.saturating_sub(1));
        log::debug!("runtime error at line {}: {}", line, e);

        self.write_diagnostic(&format!("{}\n[line {}] in script", e, line));
        self.stack.reset();
    }

    fn write_diagnostic(&mut self, text: &str) {
        if let Err(e) = writeln!(self.err, "{}", text) {
            log::warn!("failed to write diagnostic: {}", e);
        }
    }

    // -------------------------
    // Operand readers
    // -------------------------

    fn read_byte(&mut self) -> Result<u8, CorruptBytecode> {
        let b = self
            .chunk
            .code()
            .get(self.ip)
            .copied()
            .ok_or(CorruptBytecode::UnexpectedEnd { offset: self.ip })?;
        self.ip += 1;
        Ok(b)
    }

    fn read_constant(&mut self) -> Result<Value, CorruptBytecode> {
        let index = self.read_byte()? as usize;
        self.chunk
            .constant(index)
            .ok_or(CorruptBytecode::ConstantOutOfRange {
                index,
                len: self.chunk.constants().len(),
            })
    }

    fn read_string(&mut self) -> Result<ObjRef, CorruptBytecode> {
        let index = self.chunk.code().get(self.ip).copied().unwrap_or(0) as usize;
        match self.read_constant()? {
            Value::Obj(r) if self.heap.is_string(r) => Ok(r),
            _ => Err(CorruptBytecode::ExpectedString { index }),
        }
    }

    fn name_of(&self, r: ObjRef) -> String {
        self.heap
            .string(r)
            .map(|s| s.as_str_lossy().into_owned())
            .unwrap_or_default()
    }

    fn is_string(&self, v: Value) -> bool {
        matches!(v, Value::Obj(r) if self.heap.is_string(r))
    }

    // -------------------------
    // Dispatch loop
    // -------------------------

    fn run(&mut self) -> Result<(), VmError> {
        loop {
            if self.config.trace_execution {
                self.trace_instruction();
            }

            let offset = self.ip;
            let byte = self.read_byte()?;
            let op = OpCode::try_from(byte)
                .map_err(|opcode| CorruptBytecode::InvalidOpcode { opcode, offset })?;

            match op {
                OpCode::Constant => {
                    let v = self.read_constant()?;
                    self.stack.push(v)?;
                }
                OpCode::Nil => self.stack.push(Value::Nil)?,
                OpCode::True => self.stack.push(Value::Bool(true))?,
                OpCode::False => self.stack.push(Value::Bool(false))?,
                OpCode::Pop => {
                    self.stack.pop()?;
                }

                OpCode::GetGlobal => {
                    let name = self.read_string()?;
                    let Some(v) = self.globals.get(name) else {
                        return Err(VmError::UndefinedVariable {
                            name: self.name_of(name),
                        });
                    };
                    self.stack.push(v)?;
                }

                OpCode::DefineGlobal => {
                    let name = self.read_string()?;
                    let v = self.stack.peek(0)?;
                    self.globals.define(name, v);
                    self.stack.pop()?;
                }

                OpCode::SetGlobal => {
                    let name = self.read_string()?;
                    let v = self.stack.peek(0)?;
                    if self.globals.set(name, v) {
                        // Assignment never creates a binding.
                        self.globals.delete(name);
                        return Err(VmError::UndefinedVariable {
                            name: self.name_of(name),
                        });
                    }
                }

                OpCode::Equal => {
                    let b = self.stack.pop()?;
                    let a = self.stack.pop()?;
                    self.stack.push(Value::Bool(values_equal(a, b)))?;
                }

                OpCode::Greater => self.compare(CompareOp::Greater)?,
                OpCode::Less => self.compare(CompareOp::Less)?,

                OpCode::Add => {
                    if self.is_string(self.stack.peek(0)?) && self.is_string(self.stack.peek(1)?) {
                        self.concatenate()?;
                    } else {
                        self.arith(ArithOp::Add)?;
                    }
                }
                OpCode::Subtract => self.arith(ArithOp::Subtract)?,
                OpCode::Multiply => self.arith(ArithOp::Multiply)?,
                OpCode::Divide => self.arith(ArithOp::Divide)?,

                OpCode::Not => {
                    let v = self.stack.pop()?;
                    self.stack.push(Value::Bool(v.is_falsey()))?;
                }

                OpCode::Negate => {
                    let negated = match self.stack.peek(0)? {
                        Value::Int(i) => Value::Int(i.wrapping_neg()),
                        Value::Double(x) => Value::Double(-x),
                        _ => return Err(VmError::NegateNonNumber),
                    };
                    self.stack.pop()?;
                    self.stack.push(negated)?;
                }

                OpCode::Print => {
                    let v = self.stack.pop()?;
                    writeln!(self.out, "{}", v.display(&self.heap)).map_err(VmError::Output)?;
                }

                OpCode::Return => {
                    self.out.flush().map_err(VmError::Output)?;
                    return Ok(());
                }
            }
        }
    }

    fn arith(&mut self, op: ArithOp) -> Result<(), VmError> {
        let out = match (self.stack.peek(1)?, self.stack.peek(0)?) {
            (Value::Int(a), Value::Int(b)) => Value::Int(match op {
                ArithOp::Add => a.wrapping_add(b),
                ArithOp::Subtract => a.wrapping_sub(b),
                ArithOp::Multiply => a.wrapping_mul(b),
                ArithOp::Divide => {
                    if b == 0 {
                        return Err(VmError::DivisionByZero);
                    }
                    a.wrapping_div(b)
                }
            }),
            (Value::Double(a), Value::Double(b)) => Value::Double(match op {
                ArithOp::Add => a + b,
                ArithOp::Subtract => a - b,
                ArithOp::Multiply => a * b,
                ArithOp::Divide => a / b,
            }),
            _ => return Err(VmError::OperandTypeMismatch),
        };
        self.stack.pop()?;
        self.stack.pop()?;
        self.stack.push(out)
    }

    fn compare(&mut self, op: CompareOp) -> Result<(), VmError> {
        let out = match (self.stack.peek(1)?, self.stack.peek(0)?) {
            (Value::Int(a), Value::Int(b)) => match op {
                CompareOp::Greater => a > b,
                CompareOp::Less => a < b,
            },
            (Value::Double(a), Value::Double(b)) => match op {
                CompareOp::Greater => a > b,
                CompareOp::Less => a < b,
            },
            _ => return Err(VmError::OperandTypeMismatch),
        };
        self.stack.pop()?;
        self.stack.pop()?;
        self.stack.push(Value::Bool(out))
    }

    fn concatenate(&mut self) -> Result<(), VmError> {
        let b = self.stack.pop()?;
        let a = self.stack.pop()?;
        let (Some(a), Some(b)) = (
            a.as_obj().and_then(|r| self.heap.string(r)),
            b.as_obj().and_then(|r| self.heap.string(r)),
        ) else {
            return Err(VmError::OperandTypeMismatch);
        };

        let mut buf = Heap::allocate_buffer(a.len() + b.len());
        buf.extend_from_slice(a.as_bytes());
        buf.extend_from_slice(b.as_bytes());

        let r = self.heap.take_string(buf);
        self.stack.push(Value::Obj(r))
    }

    fn trace_instruction(&self) {
        if !log::log_enabled!(log::Level::Trace) {
            return;
        }
        let mut slots = String::new();
        for v in self.stack.as_slice() {
            slots.push_str(&format!("[ {} ]", v.display(&self.heap)));
        }
        log::trace!("          {}", slots);
        if self.ip < self.chunk.len() {
            let (text, _) = debug::disassemble_instruction(&self.chunk, &self.heap, self.ip);
            log::trace!("{}", text);
        }
    }
}

impl<W: Write, E: Write> Drop for Vm<W, E> {
    fn drop(&mut self) {
        self.globals.clear();
        self.heap.free_objects();
    }
}
