use crate::cursor::Cursor;
use crate::macros::decode_fixed;
use crate::macros::for_each_fixed_scalar;
use crate::types::ClassId;
use crate::types::Error;
use crate::types::Result;

/// Reads primitives in wire layout from a shared cursor.
///
/// Every read checks the remaining length first. A read that fails with
/// `Error::Pending` leaves the cursor where it was.
#[derive(Debug, Clone)]
pub struct Decoder<'a> {
    cursor: Cursor<'a>,
}

impl<'a> Decoder<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self {
            cursor: Cursor::new(buf),
        }
    }

    pub fn with_cursor(cursor: Cursor<'a>) -> Self {
        Self { cursor }
    }

    pub fn cursor(&self) -> &Cursor<'a> {
        &self.cursor
    }

    pub fn pos(&self) -> usize {
        self.cursor.pos()
    }

    pub fn remaining(&self) -> usize {
        self.cursor.remaining()
    }

    for_each_fixed_scalar!(decode_fixed);

    #[inline]
    pub fn u8(&mut self) -> Result<u8> {
        self.cursor.read_byte()
    }

    /// Any non-zero byte reads as `true`.
    #[inline]
    pub fn bool(&mut self) -> Result<bool> {
        Ok(self.cursor.read_byte()? != 0)
    }

    pub fn f64(&mut self) -> Result<f64> {
        self.cursor.need(8)?;
        let low = self.u32()? as u64;
        let high = self.u32()? as u64;
        Ok(f64::from_bits((high << 32) | low))
    }

    pub fn char(&mut self) -> Result<char> {
        let unit = self.u16()?;
        char::from_u32(unit as u32)
            .ok_or_else(|| Error::Malformed(format!("unpaired surrogate {:#06x} in char field", unit)))
    }

    /// Reads a length-prefixed UTF-8 string. On `Pending` the cursor is rewound to
    /// the length prefix so the whole string is retried.
    pub fn str(&mut self) -> Result<&'a str> {
        let start = self.cursor.pos();
        let len = self.count()?;
        let bytes = match self.cursor.read_bytes(len) {
            Ok(bytes) => bytes,
            Err(e) => {
                self.cursor.set_pos(start)?;
                return Err(e);
            }
        };
        std::str::from_utf8(bytes).map_err(|e| Error::Malformed(format!("string is not UTF-8: {}", e)))
    }

    /// Reads a signed 32-bit element count. Negative counts are malformed.
    pub fn count(&mut self) -> Result<usize> {
        let n = self.i32()?;
        usize::try_from(n).map_err(|_| Error::Malformed(format!("negative length {}", n)))
    }

    pub fn class_id(&mut self) -> Result<ClassId> {
        Ok(ClassId(self.i32()?))
    }
}
