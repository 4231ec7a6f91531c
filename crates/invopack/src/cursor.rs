use crate::types::Error;
use crate::types::Result;

/// A read position over a borrowed byte buffer.
///
/// One cursor is threaded through a whole decode call tree. A read that cannot be
/// satisfied fails with `Error::Pending` and leaves the position untouched.
#[derive(Debug, Clone)]
pub struct Cursor<'a> {
    slice: &'a [u8],
    pos: usize,
    base_offset: u64,
}

impl<'a> Cursor<'a> {
    pub fn new(slice: &'a [u8]) -> Self {
        Self {
            slice,
            pos: 0,
            base_offset: 0,
        }
    }

    /// Cursor over a window of a longer stream; `base_offset` is the stream position of
    /// `slice[0]`.
    pub fn with_context(slice: &'a [u8], start_pos: usize, base_offset: u64) -> Self {
        Self {
            slice,
            pos: start_pos,
            base_offset,
        }
    }

    pub fn pos(&self) -> usize {
        self.pos
    }

    pub fn absolute_pos(&self) -> u64 {
        self.base_offset + self.pos as u64
    }

    pub fn remaining(&self) -> usize {
        self.slice.len().saturating_sub(self.pos)
    }

    pub fn set_pos(&mut self, pos: usize) -> Result<()> {
        if pos > self.slice.len() {
            return Err(Error::Malformed(format!(
                "position {} is past the end of a {} byte buffer",
                pos,
                self.slice.len()
            )));
        }
        self.pos = pos;
        Ok(())
    }

    #[inline]
    pub(crate) fn need(&self, n: usize) -> Result<()> {
        if self.pos + n > self.slice.len() {
            Err(Error::Pending(self.pos + n - self.slice.len()))
        } else {
            Ok(())
        }
    }

    pub(crate) fn read_byte(&mut self) -> Result<u8> {
        self.need(1)?;
        let byte = self.slice[self.pos];
        self.pos += 1;
        Ok(byte)
    }

    pub(crate) fn read_bytes(&mut self, len: usize) -> Result<&'a [u8]> {
        self.need(len)?;
        let slice = &self.slice[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    pub(crate) fn read_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let bytes = self.read_bytes(N)?;
        let mut out = [0u8; N];
        out.copy_from_slice(bytes);
        Ok(out)
    }

    /// The bytes read since position `start`.
    pub(crate) fn span_from(&self, start: usize) -> &'a [u8] {
        &self.slice[start.min(self.pos)..self.pos]
    }

    pub fn as_slice(&self) -> &'a [u8] {
        &self.slice[self.pos..]
    }
}

/// Bytes received from a stream but not yet decoded.
///
/// The owner appends with `extend`, decodes from `cursor()`, reports how much a
/// successful decode consumed with `mark_consumed`, and reclaims memory with `compact`.
#[derive(Debug, Default)]
pub struct StreamBuffer {
    pub data: Vec<u8>,
    pub base_offset: u64,
    pub valid_start: usize,
}

impl StreamBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(cap: usize) -> Self {
        Self {
            data: Vec::with_capacity(cap),
            base_offset: 0,
            valid_start: 0,
        }
    }

    pub fn extend(&mut self, bytes: &[u8]) {
        self.data.extend_from_slice(bytes);
    }

    /// A cursor at the first undecoded byte.
    pub fn cursor(&self) -> Cursor<'_> {
        Cursor::with_context(
            &self.data[self.valid_start..],
            0,
            self.base_offset + self.valid_start as u64,
        )
    }

    pub fn mark_consumed(&mut self, bytes_from_valid_start: usize) {
        self.valid_start = (self.valid_start + bytes_from_valid_start).min(self.data.len());
    }

    /// Drop consumed bytes; returns how many were freed.
    pub fn compact(&mut self) -> usize {
        let freed = self.valid_start;
        if freed > 0 {
            self.data.drain(..self.valid_start);
            self.base_offset += freed as u64;
            self.valid_start = 0;
        }
        freed
    }

    pub fn len(&self) -> usize {
        self.data.len() - self.valid_start
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
