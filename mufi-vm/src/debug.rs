//! Human-readable listings of compiled chunks.

use std::fmt::Write;

use crate::chunk::{Chunk, OpCode};
use crate::object::Heap;

pub fn disassemble_chunk(chunk: &Chunk, heap: &Heap, name: &str) -> String {
    let mut out = format!("== {} ==\n", name);
    let mut offset = 0;
    while offset < chunk.len() {
        let (line, next) = disassemble_instruction(chunk, heap, offset);
        out.push_str(&line);
        out.push('\n');
        offset = next;
    }
    out
}

/// Disassemble the instruction at `offset`; returns the text and the offset of
/// the next instruction.
pub fn disassemble_instruction(chunk: &Chunk, heap: &Heap, offset: usize) -> (String, usize) {
    let mut s = format!("{:04} ", offset);
    if offset > 0 && chunk.line_at(offset) == chunk.line_at(offset - 1) {
        s.push_str("   | ");
    } else {
        let _ = write!(s, "{:4} ", chunk.line_at(offset));
    }

    let byte = chunk.code()[offset];
    let Ok(op) = OpCode::try_from(byte) else {
        let _ = write!(s, "<unknown 0x{:02X}>", byte);
        return (s, offset + 1);
    };

    if op.operand_len() == 0 {
        s.push_str(op.mnemonic());
        return (s, offset + 1);
    }

    match chunk.code().get(offset + 1) {
        Some(&idx) => {
            let _ = write!(s, "{:<16} {:4} ", op.mnemonic(), idx);
            match chunk.constant(idx as usize) {
                Some(v) => {
                    let _ = write!(s, "'{}'", v.display(heap));
                }
                None => s.push_str("<bad constant>"),
            }
        }
        None => {
            let _ = write!(s, "{:<16} <truncated>", op.mnemonic());
        }
    }
    (s, offset + 1 + op.operand_len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;
    use pretty_assertions::assert_eq;

    #[test]
    fn listing_format() {
        let mut heap = Heap::new();
        let mut chunk = Chunk::new();
        let name = heap.intern(b"answer");
        let c = chunk.add_constant(Value::Int(42));
        let n = chunk.add_constant(Value::Obj(name));

        chunk.write_op(OpCode::Constant, 1);
        chunk.write(c as u8, 1);
        chunk.write_op(OpCode::DefineGlobal, 1);
        chunk.write(n as u8, 1);
        chunk.write_op(OpCode::Return, 2);

        let expected = "\
== test ==
0000    1 CONSTANT            0 '42'
0002    | DEFINE_GLOBAL       1 'answer'
0004    2 RETURN
";
        assert_eq!(disassemble_chunk(&chunk, &heap, "test"), expected);
    }

    #[test]
    fn unknown_and_truncated_bytes() {
        let heap = Heap::new();
        let mut chunk = Chunk::new();
        chunk.write(0xEE, 1);
        chunk.write_op(OpCode::Constant, 1);

        let (first, next) = disassemble_instruction(&chunk, &heap, 0);
        assert_eq!(first, "0000    1 <unknown 0xEE>");
        let (second, _) = disassemble_instruction(&chunk, &heap, next);
        assert_eq!(second, "0001    | CONSTANT         <truncated>");
    }
}
