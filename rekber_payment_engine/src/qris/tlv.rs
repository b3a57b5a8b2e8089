//! A minimal cursor over the EMVCo tag-length-value layout used by QRIS payloads.
//!
//! Each field is a 2-character tag, a 2-digit length, and `length` characters of value. The cursor only walks the
//! top level; nested templates (tags 26-51 and 62) are returned as opaque values.

/// One top-level field in a QRIS payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TlvField<'a> {
    pub tag: &'a str,
    pub value: &'a str,
}

pub struct TlvCursor<'a> {
    payload: &'a str,
    pos: usize,
}

impl<'a> TlvCursor<'a> {
    pub fn new(payload: &'a str) -> Self {
        Self { payload, pos: 0 }
    }
}

impl<'a> Iterator for TlvCursor<'a> {
    type Item = TlvField<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let tag = self.payload.get(self.pos..self.pos + 2)?;
        let len_digits = self.payload.get(self.pos + 2..self.pos + 4)?;
        let len = len_digits.parse::<usize>().ok()?;
        let value = self.payload.get(self.pos + 4..self.pos + 4 + len)?;
        self.pos += 4 + len;
        Some(TlvField { tag, value })
    }
}

/// Returns the value of the first top-level field with the given tag. Stops silently at the first malformed field,
/// so a corrupt tail cannot cause a panic or an out-of-bounds slice.
pub fn top_level_value<'a>(payload: &'a str, tag: &str) -> Option<&'a str> {
    TlvCursor::new(payload).find(|f| f.tag == tag).map(|f| f.value)
}
