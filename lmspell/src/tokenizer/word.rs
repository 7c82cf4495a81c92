use std::hash::{Hash, Hasher};

use smol_str::SmolStr;

use super::case_handling::lower_case;

/// A word located inside a source buffer by byte offset and length.
///
/// Views borrow the buffer they were cut from and cannot outlive it.
/// Equality is by source identity: two views over textually identical
/// words at different positions, or in different buffers, are not equal.
#[derive(Debug, Clone, Copy)]
pub struct WordView<'t> {
    source: &'t str,
    offset: usize,
    len: usize,
}

impl<'t> WordView<'t> {
    #[inline(always)]
    pub(crate) fn new(source: &'t str, offset: usize, len: usize) -> WordView<'t> {
        debug_assert!(source.is_char_boundary(offset) && source.is_char_boundary(offset + len));
        WordView {
            source,
            offset,
            len,
        }
    }

    /// The original, unfolded text of the word.
    #[inline(always)]
    pub fn text(&self) -> &'t str {
        &self.source[self.offset..self.offset + self.len]
    }

    #[inline(always)]
    pub fn offset(&self) -> usize {
        self.offset
    }

    #[inline(always)]
    pub fn end(&self) -> usize {
        self.offset + self.len
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The case-folded form used for vocabulary lookups.
    #[inline(always)]
    pub fn to_lowercase(&self) -> SmolStr {
        lower_case(self.text())
    }
}

impl PartialEq for WordView<'_> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.source.as_ptr(), other.source.as_ptr())
            && self.source.len() == other.source.len()
            && self.offset == other.offset
            && self.len == other.len
    }
}

impl Eq for WordView<'_> {}

impl Hash for WordView<'_> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        (self.source.as_ptr() as usize).hash(state);
        self.offset.hash(state);
        self.len.hash(state);
    }
}
