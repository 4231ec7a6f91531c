use crate::macros::encode_fixed;
use crate::macros::for_each_fixed_scalar;
use crate::types::ClassId;
use crate::types::Error;
use crate::types::Result;

/// A growable buffer that primitives are appended to in wire layout.
///
/// Fixed-width writes cannot fail. Strings, chars and counts are checked against
/// what the wire can express.
#[derive(Debug, Default)]
pub struct Encoder {
    buf: Vec<u8>,
}

impl Encoder {
    pub fn new() -> Self {
        Self { buf: Vec::new() }
    }

    pub fn with_capacity(cap: usize) -> Self {
        Self {
            buf: Vec::with_capacity(cap),
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Drops everything written after `len`.
    pub(crate) fn truncate(&mut self, len: usize) {
        self.buf.truncate(len);
    }

    for_each_fixed_scalar!(encode_fixed);

    #[inline]
    pub fn u8(&mut self, v: u8) -> &mut Self {
        self.buf.push(v);
        self
    }

    #[inline]
    pub fn bool(&mut self, v: bool) -> &mut Self {
        self.buf.push(v as u8);
        self
    }

    /// Writes the low word then the high word of the bit pattern, each in wire order.
    pub fn f64(&mut self, v: f64) -> &mut Self {
        let bits = v.to_bits();
        self.u32(bits as u32);
        self.u32((bits >> 32) as u32)
    }

    /// Writes one UTF-16 code unit. Characters outside the Basic Multilingual Plane
    /// need two units and are rejected.
    pub fn char(&mut self, v: char) -> Result<&mut Self> {
        let unit = u16::try_from(v as u32).map_err(|_| {
            Error::mismatch("char in the Basic Multilingual Plane", format!("{:?}", v))
        })?;
        Ok(self.u16(unit))
    }

    /// Writes a 4-byte byte-length prefix and the UTF-8 bytes.
    pub fn str(&mut self, v: &str) -> Result<&mut Self> {
        self.count(v.len())?;
        self.buf.extend_from_slice(v.as_bytes());
        Ok(self)
    }

    /// Writes an element or pair count as a signed 32-bit prefix.
    pub fn count(&mut self, len: usize) -> Result<&mut Self> {
        let len = i32::try_from(len).map_err(|_| Error::BlobTooLarge(len))?;
        Ok(self.i32(len))
    }

    pub fn class_id(&mut self, id: ClassId) -> &mut Self {
        self.i32(id.0)
    }
}
