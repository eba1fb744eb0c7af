//! Little-endian cursor helpers shared by every packet body.
//!
//! Fixed-size character fields are zero-padded byte arrays of a declared capacity. They are not
//! length-prefixed and a string that fills the whole field carries no terminator.

use crate::DecodeError;

/// Copies `s` into a zero-padded field of `cap` bytes.
///
/// Strings longer than `cap` are cut at the last UTF-8 boundary that fits.
pub fn encode_fixed_str(s: &str, cap: usize) -> Vec<u8> {
    let mut len = s.len().min(cap);
    while len > 0 && !s.is_char_boundary(len) {
        len -= 1;
    }
    let mut out = vec![0u8; cap];
    out[..len].copy_from_slice(&s.as_bytes()[..len]);
    out
}

/// Reads a zero-padded field back into a string, stopping at the first NUL.
///
/// Invalid UTF-8 is replaced rather than rejected: these fields carry host-provided names
/// (device models, OS releases) that are not guaranteed to be UTF-8.
pub fn decode_fixed_str(field: &[u8]) -> String {
    let end = field.iter().position(|&b| b == 0).unwrap_or(field.len());
    String::from_utf8_lossy(&field[..end]).into_owned()
}

#[derive(Debug, Default)]
pub(crate) struct Writer {
    buf: Vec<u8>,
}

impl Writer {
    pub(crate) fn with_capacity(cap: usize) -> Self {
        Self {
            buf: Vec::with_capacity(cap),
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.buf.len()
    }

    pub(crate) fn into_inner(self) -> Vec<u8> {
        self.buf
    }

    pub(crate) fn u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    pub(crate) fn i8(&mut self, v: i8) {
        self.buf.push(v as u8);
    }

    pub(crate) fn bool(&mut self, v: bool) {
        self.buf.push(u8::from(v));
    }

    pub(crate) fn u16(&mut self, v: u16) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub(crate) fn u32(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub(crate) fn i32(&mut self, v: i32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub(crate) fn u64(&mut self, v: u64) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub(crate) fn bytes(&mut self, b: &[u8]) {
        self.buf.extend_from_slice(b);
    }

    pub(crate) fn zeros(&mut self, n: usize) {
        self.buf.resize(self.buf.len() + n, 0);
    }

    /// Writes `b` into a `cap`-byte field, truncating or zero-padding as needed.
    pub(crate) fn fixed_bytes(&mut self, b: &[u8], cap: usize) {
        let len = b.len().min(cap);
        self.buf.extend_from_slice(&b[..len]);
        self.zeros(cap - len);
    }

    pub(crate) fn fixed_str(&mut self, s: &str, cap: usize) {
        self.buf.extend_from_slice(&encode_fixed_str(s, cap));
    }
}

#[derive(Debug)]
pub(crate) struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
    context: &'static str,
}

impl<'a> Reader<'a> {
    pub(crate) fn new(buf: &'a [u8], context: &'static str) -> Self {
        Self {
            buf,
            pos: 0,
            context,
        }
    }

    pub(crate) fn position(&self) -> usize {
        self.pos
    }

    pub(crate) fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    pub(crate) fn take(&mut self, n: usize) -> Result<&'a [u8], DecodeError> {
        if n > self.remaining() {
            return Err(DecodeError::Truncated {
                context: self.context,
                needed: n,
                remaining: self.remaining(),
            });
        }
        let out = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(out)
    }

    pub(crate) fn array<const N: usize>(&mut self) -> Result<[u8; N], DecodeError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    pub(crate) fn rest(&mut self) -> &'a [u8] {
        let out = &self.buf[self.pos..];
        self.pos = self.buf.len();
        out
    }

    pub(crate) fn skip(&mut self, n: usize) -> Result<(), DecodeError> {
        self.take(n).map(|_| ())
    }

    pub(crate) fn u8(&mut self) -> Result<u8, DecodeError> {
        Ok(self.array::<1>()?[0])
    }

    pub(crate) fn i8(&mut self) -> Result<i8, DecodeError> {
        Ok(self.u8()? as i8)
    }

    pub(crate) fn bool(&mut self) -> Result<bool, DecodeError> {
        Ok(self.u8()? != 0)
    }

    pub(crate) fn u16(&mut self) -> Result<u16, DecodeError> {
        Ok(u16::from_le_bytes(self.array()?))
    }

    pub(crate) fn u32(&mut self) -> Result<u32, DecodeError> {
        Ok(u32::from_le_bytes(self.array()?))
    }

    pub(crate) fn i32(&mut self) -> Result<i32, DecodeError> {
        Ok(i32::from_le_bytes(self.array()?))
    }

    pub(crate) fn u64(&mut self) -> Result<u64, DecodeError> {
        Ok(u64::from_le_bytes(self.array()?))
    }

    pub(crate) fn fixed_str(&mut self, cap: usize) -> Result<String, DecodeError> {
        Ok(decode_fixed_str(self.take(cap)?))
    }

    /// Reads a tail whose length was declared by an earlier `u32` field.
    pub(crate) fn tail(&mut self, declared: u32) -> Result<Vec<u8>, DecodeError> {
        Ok(self.take(declared as usize)?.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_str_pads_with_zeros() {
        let field = encode_fixed_str("abc", 8);
        assert_eq!(field, b"abc\0\0\0\0\0");
        assert_eq!(decode_fixed_str(&field), "abc");
    }

    #[test]
    fn fixed_str_fills_whole_field_without_terminator() {
        let field = encode_fixed_str("abcdefgh", 4);
        assert_eq!(field, b"abcd");
        assert_eq!(decode_fixed_str(&field), "abcd");
    }

    #[test]
    fn fixed_str_truncates_on_char_boundary() {
        // 'é' is two bytes; only one byte of room remains after "ab".
        let field = encode_fixed_str("abé", 3);
        assert_eq!(field, b"ab\0");
    }

    #[test]
    fn reader_reports_truncation() {
        let mut r = Reader::new(&[1, 2, 3], "test");
        assert_eq!(r.u16().unwrap(), 0x0201);
        let err = r.u32().unwrap_err();
        assert_eq!(
            err,
            DecodeError::Truncated {
                context: "test",
                needed: 4,
                remaining: 1
            }
        );
    }
}
