//! Append-only string storage with stable, cheap-to-copy handles.
//!
//! The DCF parser interns every field key, dependency name, and free-form
//! value it sees so the [`crate::Repository`] that ends up owning the parsed
//! packages doesn't need to copy those strings again. Handles are indices
//! into the interner's backing buffer rather than raw pointers/slices, so
//! they stay valid across the interner's own reallocations and are `Copy`.

use std::collections::HashMap;

/// A handle to a string owned by an [`Interner`]. Two handles compare equal
/// only if they were produced by the same interner and refer to the same
/// storage slot; comparing the underlying bytes (via [`Interner::resolve`])
/// is what actually matters for correctness, not handle identity.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct InternedStr(pub(crate) u32);

#[derive(Debug, Default)]
pub struct Interner {
    // Single growable arena; spans index into it. Stability only needs to
    // hold for the `u32` index, not for any address into `buf`, so a plain
    // `String` (which may reallocate on growth) is fine here.
    buf: String,
    spans: Vec<(u32, u32)>,
    dedup: HashMap<Box<str>, InternedStr>,
}

impl Interner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserves room for roughly `n` more bytes of string data.
    pub fn ensure_capacity(&mut self, n: usize) {
        self.buf.reserve(n);
    }

    /// Interns `s`, returning a handle. Equal strings interned more than
    /// once may (but need not) share the same handle.
    pub fn append(&mut self, s: &str) -> InternedStr {
        if let Some(existing) = self.dedup.get(s) {
            return *existing;
        }
        let start = self.buf.len() as u32;
        self.buf.push_str(s);
        let end = self.buf.len() as u32;
        let handle = InternedStr(self.spans.len() as u32);
        self.spans.push((start, end));
        self.dedup.insert(s.into(), handle);
        handle
    }

    /// Resolves a handle previously returned by this interner (or by an
    /// interner it later absorbed via [`Self::claim_other`]) to its text.
    pub fn resolve(&self, handle: InternedStr) -> &str {
        let (start, end) = self.spans[handle.0 as usize];
        &self.buf[start as usize..end as usize]
    }

    /// Absorbs all strings owned by `other` into `self`, deduplicating
    /// against strings already present. `other` is left empty. Returns a
    /// translation table: `table[i]` is the handle in `self` that now
    /// stands in for what used to be handle `i` in `other` — callers
    /// holding AST nodes built against `other` must re-map their handles
    /// through this table before storing them against `self`.
    pub fn claim_other(&mut self, other: &mut Interner) -> Vec<InternedStr> {
        self.ensure_capacity(other.buf.len());
        let table: Vec<InternedStr> = (0..other.spans.len())
            .map(|i| {
                let (start, end) = other.spans[i];
                let text = &other.buf[start as usize..end as usize];
                self.append(text)
            })
            .collect();

        other.buf.clear();
        other.spans.clear();
        other.dedup.clear();
        table
    }

    pub fn len(&self) -> usize {
        self.spans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_dedups_equal_strings() {
        let mut i = Interner::new();
        let a = i.append("dplyr");
        let b = i.append("dplyr");
        assert_eq!(i.resolve(a), "dplyr");
        assert_eq!(i.resolve(a), i.resolve(b));
    }

    #[test]
    fn distinct_strings_resolve_independently() {
        let mut i = Interner::new();
        let a = i.append("dplyr");
        let b = i.append("tidyr");
        assert_eq!(i.resolve(a), "dplyr");
        assert_eq!(i.resolve(b), "tidyr");
    }

    #[test]
    fn claim_other_merges_and_empties_source() {
        let mut a = Interner::new();
        let a_dplyr = a.append("dplyr");

        let mut b = Interner::new();
        let b_tidyr = b.append("tidyr");
        let b_dplyr = b.append("dplyr");

        let table = a.claim_other(&mut b);
        assert!(b.is_empty());

        assert_eq!(a.resolve(table[0]), "tidyr");
        assert_eq!(a.resolve(table[1]), "dplyr");
        // the pre-existing handle in `a` still resolves correctly
        assert_eq!(a.resolve(a_dplyr), "dplyr");
        // and the merged-in duplicate now points at the same slot
        assert_eq!(a.resolve(table[1]), a.resolve(a_dplyr));
        let _ = b_tidyr;
        let _ = b_dplyr;
    }
}
