use crate::error::{CorruptBytecode, VmError};
use crate::value::Value;

/// Bounded operand stack.
#[derive(Debug)]
pub struct Stack {
    values: Vec<Value>,
    limit: usize,
}

impl Stack {
    pub fn new(limit: usize) -> Self {
        Self {
            values: Vec::with_capacity(limit),
            limit,
        }
    }

    pub fn push(&mut self, v: Value) -> Result<(), VmError> {
        if self.values.len() >= self.limit {
            return Err(VmError::StackOverflow { limit: self.limit });
        }
        self.values.push(v);
        Ok(())
    }

    pub fn pop(&mut self) -> Result<Value, VmError> {
        self.values
            .pop()
            .ok_or(VmError::CorruptBytecode(CorruptBytecode::StackUnderflow))
    }

    /// Look `distance` slots below the top without removing anything.
    pub fn peek(&self, distance: usize) -> Result<Value, VmError> {
        let len = self.values.len();
        if distance >= len {
            return Err(CorruptBytecode::StackUnderflow.into());
        }
        Ok(self.values[len - 1 - distance])
    }

    pub fn reset(&mut self) {
        self.values.clear();
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Bottom to top.
    pub fn as_slice(&self) -> &[Value] {
        &self.values
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn lifo_with_peek_by_depth() {
        let mut stack = Stack::new(4);
        stack.push(Value::Int(1)).unwrap();
        stack.push(Value::Int(2)).unwrap();
        stack.push(Value::Int(3)).unwrap();

        assert_eq!(stack.peek(0).unwrap(), Value::Int(3));
        assert_eq!(stack.peek(2).unwrap(), Value::Int(1));
        assert!(stack.peek(3).is_err());

        assert_eq!(stack.pop().unwrap(), Value::Int(3));
        assert_eq!(stack.len(), 2);
    }

    #[test]
    fn overflow_and_underflow_are_errors() {
        let mut stack = Stack::new(1);
        stack.push(Value::Nil).unwrap();
        assert!(matches!(
            stack.push(Value::Nil),
            Err(VmError::StackOverflow { limit: 1 })
        ));

        stack.reset();
        assert!(stack.is_empty());
        assert!(matches!(
            stack.pop(),
            Err(VmError::CorruptBytecode(CorruptBytecode::StackUnderflow))
        ));
    }
}
