//! Walking sibling elements and reading common primitive values.

use compact_str::CompactString;

use super::header::{read_tlv, TlvHeader, UniversalTag};
use super::oid::Oid;
use crate::cursor::Cursor;
use crate::error::{DecodeError, DecodeResult};

/// Nesting limits for recursive walks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    /// Deepest constructed element a walk will descend into.
    pub max_depth: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self { max_depth: 16 }
    }
}

/// Iterator over consecutive elements in a content region.
///
/// Yields each element once and stops after the first error.
#[derive(Debug, Clone)]
pub struct TlvIter<'a> {
    cursor: Cursor<'a>,
    failed: bool,
}

impl<'a> TlvIter<'a> {
    pub fn new(content: &'a [u8]) -> Self {
        Self {
            cursor: Cursor::new(content),
            failed: false,
        }
    }

    /// Iterate over the children of a constructed element.
    pub fn children(parent: &TlvHeader<'a>) -> Self {
        Self::new(parent.value)
    }

    /// Next element, required to be present and to carry the given universal tag.
    pub fn expect(&mut self, tag: UniversalTag) -> DecodeResult<TlvHeader<'a>> {
        match self.next() {
            Some(Ok(h)) if h.is_universal(tag) => Ok(h),
            Some(Ok(h)) => Err(DecodeError::malformed(
                "tag",
                format!("expected {}, found {h}", tag.name()),
            )),
            Some(Err(e)) => Err(e),
            None => Err(DecodeError::malformed(
                "tag",
                format!("expected {}, found end of content", tag.name()),
            )),
        }
    }

    /// Consume the next element only if it is the context tag `[n]`.
    pub fn next_if_context(&mut self, n: u32) -> DecodeResult<Option<TlvHeader<'a>>> {
        let mut probe = self.cursor;
        if probe.is_empty() {
            return Ok(None);
        }
        let h = read_tlv(&mut probe)?;
        if h.is_context(n) {
            self.cursor = probe;
            Ok(Some(h))
        } else {
            Ok(None)
        }
    }

    pub fn is_empty(&self) -> bool {
        self.cursor.is_empty()
    }
}

impl<'a> Iterator for TlvIter<'a> {
    type Item = DecodeResult<TlvHeader<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.cursor.is_empty() {
            return None;
        }
        let item = read_tlv(&mut self.cursor);
        self.failed = item.is_err();
        Some(item)
    }
}

/// Count every element reachable from `content`, descending into constructed
/// elements up to `limits.max_depth`.
pub fn count_elements(content: &[u8], limits: Limits) -> DecodeResult<usize> {
    fn walk(content: &[u8], depth: usize, limits: Limits) -> DecodeResult<usize> {
        if depth > limits.max_depth {
            return Err(DecodeError::malformed("depth", "nesting exceeds limit"));
        }
        let mut total = 0;
        for h in TlvIter::new(content) {
            let h = h?;
            total += 1;
            if h.is_constructed() {
                total += walk(h.value, depth + 1, limits)?;
            }
        }
        Ok(total)
    }
    walk(content, 0, limits)
}

/// Value of a non-negative INTEGER that fits in 64 bits.
pub fn integer_u64(h: &TlvHeader<'_>) -> DecodeResult<u64> {
    if !h.is_universal(UniversalTag::Integer) {
        return Err(DecodeError::malformed("integer", format!("found {h}")));
    }
    let bytes = match h.value {
        [] => return Err(DecodeError::malformed("integer", "empty content")),
        [0, rest @ ..] => rest,
        [b, ..] if b & 0x80 != 0 => {
            return Err(DecodeError::malformed("integer", "negative value"));
        }
        all => all,
    };
    Cursor::new(bytes).read_fixed_int_n(bytes.len())
}

/// Decode a character string element into an owned string.
///
/// BMPString is UTF-16BE; other string types are taken as UTF-8 with lossy
/// replacement.
pub fn string(h: &TlvHeader<'_>) -> DecodeResult<CompactString> {
    match h.universal() {
        Some(UniversalTag::BmpString) => {
            if h.value.len() % 2 != 0 {
                return Err(DecodeError::malformed("string", "odd BMPString length"));
            }
            let units = h
                .value
                .chunks_exact(2)
                .map(|pair| u16::from_be_bytes([pair[0], pair[1]]));
            Ok(char::decode_utf16(units)
                .map(|c| c.unwrap_or(char::REPLACEMENT_CHARACTER))
                .collect())
        }
        Some(tag) if tag.is_string() => Ok(CompactString::from(String::from_utf8_lossy(h.value))),
        _ => Err(DecodeError::malformed("string", format!("found {h}"))),
    }
}

/// Decode an OBJECT IDENTIFIER element.
pub fn oid(h: &TlvHeader<'_>) -> DecodeResult<Oid> {
    if !h.is_universal(UniversalTag::ObjectIdentifier) {
        return Err(DecodeError::malformed("oid", format!("found {h}")));
    }
    Oid::from_content(h.value)
}
