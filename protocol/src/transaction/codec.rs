//! Big-endian wire primitives.
//!
//! Writing goes through `bytes::BufMut`; reading goes through a cursor over
//! `bytes::Buf` that checks `remaining()` before every fixed-width read, so a
//! short buffer is a [`ParseError::Truncated`] and never a panic.

use bytes::{Buf, BufMut};

use super::{Amount, ParseError};
use crate::account::Address;
use crate::config::{
    ADDRESS_LENGTH, AMOUNT_LENGTH, LENGTH_PREFIX_LENGTH, PUBLIC_KEY_LENGTH, SIGNATURE_LENGTH,
};
use crate::crypto::{PublicKey, Signature};

pub(crate) fn put_string<B: BufMut>(buf: &mut B, text: &str) {
    buf.put_u32(text.len() as u32);
    buf.put_slice(text.as_bytes());
}

pub(crate) fn put_bytes<B: BufMut>(buf: &mut B, data: &[u8]) {
    buf.put_u32(data.len() as u32);
    buf.put_slice(data);
}

pub(crate) fn put_amount<B: BufMut>(buf: &mut B, amount: Amount) {
    buf.put_i64(amount.units());
}

pub(crate) fn string_length(text: &str) -> usize {
    LENGTH_PREFIX_LENGTH + text.len()
}

/// Cursor over an input buffer.
pub(crate) struct Reader<'a> {
    buf: &'a [u8],
}

impl<'a> Reader<'a> {
    pub(crate) fn new(buf: &'a [u8]) -> Self {
        Self { buf }
    }

    pub(crate) fn remaining(&self) -> usize {
        self.buf.remaining()
    }

    fn need(&self, len: usize, field: &'static str) -> Result<(), ParseError> {
        if self.buf.remaining() < len {
            return Err(ParseError::Truncated {
                field,
                needed: len,
                available: self.buf.remaining(),
            });
        }
        Ok(())
    }

    pub(crate) fn u8(&mut self, field: &'static str) -> Result<u8, ParseError> {
        self.need(1, field)?;
        Ok(self.buf.get_u8())
    }

    pub(crate) fn u32(&mut self, field: &'static str) -> Result<u32, ParseError> {
        self.need(4, field)?;
        Ok(self.buf.get_u32())
    }

    pub(crate) fn u64(&mut self, field: &'static str) -> Result<u64, ParseError> {
        self.need(8, field)?;
        Ok(self.buf.get_u64())
    }

    pub(crate) fn i64(&mut self, field: &'static str) -> Result<i64, ParseError> {
        self.need(8, field)?;
        Ok(self.buf.get_i64())
    }

    pub(crate) fn amount(&mut self, field: &'static str) -> Result<Amount, ParseError> {
        self.need(AMOUNT_LENGTH, field)?;
        Ok(Amount::from_units(self.buf.get_i64()))
    }

    pub(crate) fn fixed(
        &mut self,
        len: usize,
        field: &'static str,
    ) -> Result<&'a [u8], ParseError> {
        self.need(len, field)?;
        let (head, tail) = self.buf.split_at(len);
        self.buf = tail;
        Ok(head)
    }

    pub(crate) fn signature(&mut self, field: &'static str) -> Result<Signature, ParseError> {
        let bytes = self.fixed(SIGNATURE_LENGTH, field)?;
        Signature::try_from_slice(bytes).map_err(|_| ParseError::Malformed(field))
    }

    pub(crate) fn public_key(&mut self, field: &'static str) -> Result<PublicKey, ParseError> {
        let bytes = self.fixed(PUBLIC_KEY_LENGTH, field)?;
        PublicKey::try_from_slice(bytes).map_err(|_| ParseError::Malformed(field))
    }

    pub(crate) fn address(&mut self, field: &'static str) -> Result<Address, ParseError> {
        let bytes = self.fixed(ADDRESS_LENGTH, field)?;
        Address::try_from_slice(bytes).map_err(|_| ParseError::Malformed(field))
    }

    /// Length-prefixed raw bytes.
    pub(crate) fn bytes(&mut self, field: &'static str) -> Result<&'a [u8], ParseError> {
        let len = self.u32(field)? as usize;
        self.fixed(len, field)
    }

    /// Length-prefixed UTF-8.
    pub(crate) fn string(&mut self, field: &'static str) -> Result<String, ParseError> {
        let bytes = self.bytes(field)?;
        std::str::from_utf8(bytes)
            .map(str::to_owned)
            .map_err(|_| ParseError::InvalidUtf8(field))
    }

    /// Fail unless the whole buffer was consumed.
    pub(crate) fn finish(self) -> Result<(), ParseError> {
        if self.buf.has_remaining() {
            return Err(ParseError::TrailingBytes(self.buf.remaining()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_roundtrip_and_length() {
        let mut buf = Vec::new();
        put_string(&mut buf, "tëst");
        assert_eq!(buf.len(), string_length("tëst"));
        let mut reader = Reader::new(&buf);
        assert_eq!(reader.string("name").unwrap(), "tëst");
        reader.finish().unwrap();
    }

    #[test]
    fn truncated_reads_fail() {
        let mut reader = Reader::new(&[0, 0, 0]);
        assert!(matches!(
            reader.u32("type"),
            Err(ParseError::Truncated { field: "type", needed: 4, available: 3 })
        ));
    }

    #[test]
    fn oversized_length_prefix_fails() {
        let mut buf = Vec::new();
        buf.put_u32(1000);
        buf.put_slice(b"short");
        let mut reader = Reader::new(&buf);
        assert!(matches!(
            reader.string("value"),
            Err(ParseError::Truncated { field: "value", .. })
        ));
    }

    #[test]
    fn invalid_utf8_rejected() {
        let mut buf = Vec::new();
        put_bytes(&mut buf, &[0xFF, 0xFE]);
        let mut reader = Reader::new(&buf);
        assert_eq!(reader.string("name"), Err(ParseError::InvalidUtf8("name")));
    }

    #[test]
    fn trailing_bytes_rejected() {
        let reader = Reader::new(&[1, 2]);
        assert_eq!(reader.finish(), Err(ParseError::TrailingBytes(2)));
    }
}
