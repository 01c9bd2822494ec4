//! Heap objects and the string intern table.
//!
//! Objects live in an arena owned by [`Heap`] and are addressed by [`ObjRef`]
//! handles. Nothing is reclaimed while a VM is running; the whole arena is
//! released by [`Heap::free_objects`] or when the heap is dropped.

use std::borrow::Cow;
use std::collections::HashMap;

/// Handle to an object in a [`Heap`]. Copying the handle never copies the object.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct ObjRef(u32);

impl ObjRef {
    #[inline]
    pub fn index(self) -> u32 {
        self.0
    }
}

#[derive(Debug)]
pub enum Obj {
    String(ObjString),
}

/// An immutable byte string with its hash computed once at allocation.
#[derive(Debug)]
pub struct ObjString {
    chars: Box<[u8]>,
    hash: u32,
}

impl ObjString {
    fn new(chars: Box<[u8]>) -> Self {
        let hash = hash_bytes(&chars);
        Self { chars, hash }
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.chars
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.chars.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }

    #[inline]
    pub fn hash(&self) -> u32 {
        self.hash
    }

    pub fn as_str_lossy(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.chars)
    }
}

/// FNV-1a, 32 bit.
pub fn hash_bytes(bytes: &[u8]) -> u32 {
    let mut hash: u32 = 2166136261;
    for &b in bytes {
        hash ^= b as u32;
        hash = hash.wrapping_mul(16777619);
    }
    hash
}

#[derive(Debug, Default)]
pub struct Heap {
    objects: Vec<Obj>,
    /// Intern table: string hash -> every live string with that hash.
    strings: HashMap<u32, Vec<ObjRef>>,
    bytes_allocated: usize,
}

impl Heap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the interned string with these contents, allocating it if needed.
    pub fn intern(&mut self, bytes: &[u8]) -> ObjRef {
        let hash = hash_bytes(bytes);
        if let Some(r) = self.find_string(bytes, hash) {
            return r;
        }
        self.register_string(bytes.into())
    }

    /// Raw storage for building a string in place (used by concatenation).
    pub fn allocate_buffer(len: usize) -> Vec<u8> {
        Vec::with_capacity(len)
    }

    /// Intern an owned buffer. If an equal string already exists the buffer is
    /// dropped and the existing object is returned.
    pub fn take_string(&mut self, buf: Vec<u8>) -> ObjRef {
        let hash = hash_bytes(&buf);
        if let Some(r) = self.find_string(&buf, hash) {
            return r;
        }
        self.register_string(buf.into_boxed_slice())
    }

    /// Find an already interned string without allocating.
    pub fn lookup(&self, bytes: &[u8]) -> Option<ObjRef> {
        self.find_string(bytes, hash_bytes(bytes))
    }

    fn find_string(&self, bytes: &[u8], hash: u32) -> Option<ObjRef> {
        self.strings
            .get(&hash)?
            .iter()
            .copied()
            .find(|r| self.string(*r).is_some_and(|s| s.as_bytes() == bytes))
    }

    fn register_string(&mut self, chars: Box<[u8]>) -> ObjRef {
        let s = ObjString::new(chars);
        let hash = s.hash();
        self.bytes_allocated += s.len();

        let r = ObjRef(self.objects.len() as u32);
        self.objects.push(Obj::String(s));
        self.strings.entry(hash).or_default().push(r);
        r
    }

    pub fn get(&self, r: ObjRef) -> Option<&Obj> {
        self.objects.get(r.0 as usize)
    }

    pub fn string(&self, r: ObjRef) -> Option<&ObjString> {
        match self.get(r)? {
            Obj::String(s) => Some(s),
        }
    }

    #[inline]
    pub fn is_string(&self, r: ObjRef) -> bool {
        matches!(self.get(r), Some(Obj::String(_)))
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn bytes_allocated(&self) -> usize {
        self.bytes_allocated
    }

    /// Release every object. All outstanding handles become dangling.
    pub fn free_objects(&mut self) {
        if !self.objects.is_empty() {
            log::debug!(
                "freeing {} heap objects ({} bytes of string data)",
                self.objects.len(),
                self.bytes_allocated
            );
        }
        self.strings.clear();
        self.objects.clear();
        self.bytes_allocated = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn intern_dedupes_by_content() {
        let mut heap = Heap::new();
        let a = heap.intern(b"global");
        let b = heap.intern(b"global");
        let c = heap.intern(b"other");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(heap.len(), 2);
    }

    #[test]
    fn take_string_reuses_existing_object() {
        let mut heap = Heap::new();
        let existing = heap.intern(b"ab");

        let mut buf = Heap::allocate_buffer(2);
        buf.extend_from_slice(b"a");
        buf.extend_from_slice(b"b");
        let taken = heap.take_string(buf);

        assert_eq!(existing, taken);
        assert_eq!(heap.len(), 1);
    }

    #[test]
    fn string_caches_length_and_hash() {
        let mut heap = Heap::new();
        let r = heap.intern(b"mufi");
        let s = heap.string(r).unwrap();
        assert_eq!(s.len(), 4);
        assert_eq!(s.hash(), hash_bytes(b"mufi"));
        assert_eq!(s.as_str_lossy(), "mufi");
    }

    #[test]
    fn fnv1a_reference_values() {
        assert_eq!(hash_bytes(b""), 0x811c9dc5);
        assert_eq!(hash_bytes(b"a"), 0xe40c292c);
    }

    #[test]
    fn free_objects_empties_the_arena() {
        let mut heap = Heap::new();
        heap.intern(b"x");
        heap.intern(b"yz");
        assert_eq!(heap.bytes_allocated(), 3);

        heap.free_objects();
        assert!(heap.is_empty());
        assert_eq!(heap.bytes_allocated(), 0);

        // The intern table was cleared too, so this is a fresh allocation.
        let again = heap.intern(b"x");
        assert_eq!(again.index(), 0);
    }
}
