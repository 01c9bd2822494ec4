use std::fmt;

use crate::object::{Heap, ObjRef};

/// A VM value.
///
/// Values are plain data and are copied when pushed/popped. Heap objects are
/// referenced through an [`ObjRef`] handle owned by the [`Heap`].
#[derive(Copy, Clone, Debug, Default)]
pub enum Value {
    #[default]
    Nil,
    Bool(bool),
    Int(i32),
    Double(f64),
    Obj(ObjRef),
}

impl Value {
    /// `nil` and `false` are falsey; everything else, including `0`, `0.0`
    /// and the empty string, is truthy.
    #[inline]
    pub fn is_falsey(&self) -> bool {
        matches!(self, Value::Nil | Value::Bool(false))
    }

    #[inline]
    pub fn as_obj(&self) -> Option<ObjRef> {
        match self {
            Value::Obj(r) => Some(*r),
            _ => None,
        }
    }

    /// Render the value the way `print` does. Strings need the heap.
    pub fn display<'h>(&self, heap: &'h Heap) -> ValueDisplay<'h> {
        ValueDisplay { value: *self, heap }
    }
}

/// Tag-aware equality. Objects compare by identity, which is content equality
/// for strings because they are interned.
pub fn values_equal(a: Value, b: Value) -> bool {
    match (a, b) {
        (Value::Nil, Value::Nil) => true,
        (Value::Bool(x), Value::Bool(y)) => x == y,
        (Value::Int(x), Value::Int(y)) => x == y,
        (Value::Double(x), Value::Double(y)) => x == y,
        (Value::Obj(x), Value::Obj(y)) => x == y,
        _ => false,
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        values_equal(*self, *other)
    }
}

pub struct ValueDisplay<'h> {
    value: Value,
    heap: &'h Heap,
}

impl fmt::Display for ValueDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.value {
            Value::Nil => write!(f, "nil"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(v) => write!(f, "{}", v),
            Value::Double(v) => f.write_str(&format_double(v)),
            Value::Obj(r) => match self.heap.string(r) {
                Some(s) => write!(f, "{}", s.as_str_lossy()),
                None => write!(f, "<dangling obj {}>", r.index()),
            },
        }
    }
}

/// Format a double like C's `%g`: six significant digits, trailing zeros
/// trimmed, exponent form when the decimal exponent is below -4 or at least 6.
pub fn format_double(v: f64) -> String {
    if v.is_nan() {
        return "nan".to_string();
    }
    if v.is_infinite() {
        return if v > 0.0 { "inf" } else { "-inf" }.to_string();
    }
    if v == 0.0 {
        return if v.is_sign_negative() { "-0" } else { "0" }.to_string();
    }

    const PRECISION: i32 = 6;

    // Round first so the exponent reflects the printed mantissa (e.g. 999999.5 -> 1e+06).
    let sci = format!("{:.*e}", (PRECISION - 1) as usize, v);
    let (mantissa, exp) = match sci.split_once('e') {
        Some((m, e)) => (m, e.parse::<i32>().unwrap_or(0)),
        None => (sci.as_str(), 0),
    };

    if exp < -4 || exp >= PRECISION {
        let sign = if exp < 0 { '-' } else { '+' };
        format!("{}e{}{:02}", trim_fraction(mantissa), sign, exp.abs())
    } else {
        let decimals = (PRECISION - 1 - exp).max(0) as usize;
        trim_fraction(&format!("{:.*}", decimals, v)).to_string()
    }
}

fn trim_fraction(s: &str) -> &str {
    if !s.contains('.') {
        return s;
    }
    s.trim_end_matches('0').trim_end_matches('.')
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn falsey_values() {
        assert!(Value::Nil.is_falsey());
        assert!(Value::Bool(false).is_falsey());

        assert!(!Value::Bool(true).is_falsey());
        assert!(!Value::Int(0).is_falsey());
        assert!(!Value::Double(0.0).is_falsey());

        let mut heap = Heap::new();
        let empty = heap.intern(b"");
        assert!(!Value::Obj(empty).is_falsey());
    }

    #[test]
    fn equality_is_tag_strict() {
        let zeroes = [
            Value::Nil,
            Value::Bool(false),
            Value::Int(0),
            Value::Double(0.0),
        ];
        for (i, a) in zeroes.iter().enumerate() {
            for (j, b) in zeroes.iter().enumerate() {
                assert_eq!(values_equal(*a, *b), i == j, "{:?} vs {:?}", a, b);
            }
        }
    }

    #[test]
    fn equality_is_reflexive_and_symmetric() {
        let mut heap = Heap::new();
        let s = Value::Obj(heap.intern(b"abc"));
        let t = Value::Obj(heap.intern(b"abd"));
        let samples = [
            Value::Nil,
            Value::Bool(true),
            Value::Int(-7),
            Value::Double(2.5),
            s,
            t,
        ];
        for a in samples {
            assert!(values_equal(a, a));
            for b in samples {
                assert_eq!(values_equal(a, b), values_equal(b, a));
            }
        }
        assert!(!values_equal(s, t));
    }

    #[test]
    fn interned_strings_compare_by_identity() {
        let mut heap = Heap::new();
        let a = Value::Obj(heap.intern(b"hello"));
        let b = Value::Obj(heap.intern(b"hello"));
        assert!(values_equal(a, b));
    }

    #[test]
    fn double_formatting_matches_percent_g() {
        assert_eq!(format_double(3.0), "3");
        assert_eq!(format_double(1.5), "1.5");
        assert_eq!(format_double(-0.25), "-0.25");
        assert_eq!(format_double(0.1 + 0.2), "0.3");
        assert_eq!(format_double(123456.0), "123456");
        assert_eq!(format_double(1234567.0), "1.23457e+06");
        assert_eq!(format_double(0.0001), "0.0001");
        assert_eq!(format_double(0.00001), "1e-05");
        assert_eq!(format_double(f64::INFINITY), "inf");
        assert_eq!(format_double(f64::NAN), "nan");
    }

    #[test]
    fn display_renders_each_tag() {
        let mut heap = Heap::new();
        let s = Value::Obj(heap.intern(b"text"));
        assert_eq!(Value::Nil.display(&heap).to_string(), "nil");
        assert_eq!(Value::Bool(true).display(&heap).to_string(), "true");
        assert_eq!(Value::Int(-12).display(&heap).to_string(), "-12");
        assert_eq!(Value::Double(2.5).display(&heap).to_string(), "2.5");
        assert_eq!(s.display(&heap).to_string(), "text");
    }
}
