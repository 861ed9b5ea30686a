use crate::CodecError;
use alloy_primitives::U256;

/// Maximum encoded length, in bytes, of a DER integer component: a 32-byte
/// secp256k1 scalar plus one optional leading `0x00` sign byte. Each
/// length is bounds-checked against this before any allocation.
const MAX_INTEGER_LEN: usize = 33;

/// Parses a DER-encoded ECDSA signature (`30 LEN 02 rLEN r 02 sLEN s`) into
/// its `(r, s)` components, left-padded to 32 bytes each.
///
/// 1. First byte must be `0x30`. A length byte with its high bit set carries
///    up to two further big-endian length bytes; more than that is rejected.
///    Any bytes left over after `header + length` is a protocol error.
/// 2. Each integer (tag `0x02`) is bounds-checked to at most 33 bytes, has
///    its optional leading sign byte stripped, and is left-padded to 32.
pub fn parse_der(der: &[u8]) -> Result<(U256, U256), CodecError> {
    let mut cursor = Cursor::new(der);

    if cursor.take_byte()? != 0x30 {
        return Err(CodecError::MalformedDer("expected SEQUENCE tag 0x30".into()));
    }
    let seq_len = cursor.take_length()?;
    let remaining_before_body = cursor.remaining();
    if seq_len != remaining_before_body {
        return Err(CodecError::MalformedDer(format!(
            "sequence length {seq_len} does not match remaining {remaining_before_body} bytes"
        )));
    }

    let r = parse_der_integer(&mut cursor)?;
    let s = parse_der_integer(&mut cursor)?;

    if cursor.remaining() != 0 {
        return Err(CodecError::MalformedDer("trailing bytes after DER signature".into()));
    }

    Ok((bytes_to_u256(&r), bytes_to_u256(&s)))
}

fn parse_der_integer(cursor: &mut Cursor<'_>) -> Result<[u8; 32], CodecError> {
    if cursor.take_byte()? != 0x02 {
        return Err(CodecError::MalformedDer("expected INTEGER tag 0x02".into()));
    }
    let len = cursor.take_length()?;
    if len == 0 || len > MAX_INTEGER_LEN {
        return Err(CodecError::MalformedDer(format!(
            "integer length {len} out of bounds (0, {MAX_INTEGER_LEN}]"
        )));
    }
    let raw = cursor.take_slice(len)?;

    let trimmed = if raw.len() == MAX_INTEGER_LEN {
        if raw[0] != 0x00 {
            return Err(CodecError::MalformedDer(
                "33-byte integer must begin with a 0x00 sign byte".into(),
            ));
        }
        &raw[1..]
    } else {
        raw
    };

    if trimmed.len() > 32 {
        return Err(CodecError::MalformedDer("integer exceeds 32 bytes after sign-byte strip".into()));
    }

    let mut padded = [0u8; 32];
    padded[32 - trimmed.len()..].copy_from_slice(trimmed);
    Ok(padded)
}

fn bytes_to_u256(bytes: &[u8; 32]) -> U256 {
    U256::from_be_bytes(*bytes)
}

struct Cursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    fn take_byte(&mut self) -> Result<u8, CodecError> {
        let byte = *self.data.get(self.pos).ok_or(CodecError::UnexpectedEof)?;
        self.pos += 1;
        Ok(byte)
    }

    fn take_slice(&mut self, len: usize) -> Result<&'a [u8], CodecError> {
        let end = self.pos.checked_add(len).ok_or(CodecError::UnexpectedEof)?;
        let slice = self.data.get(self.pos..end).ok_or(CodecError::UnexpectedEof)?;
        self.pos = end;
        Ok(slice)
    }

    /// Reads a DER length: short form if the high bit is clear, else up to
    /// two further big-endian bytes (rejecting more).
    fn take_length(&mut self) -> Result<usize, CodecError> {
        let first = self.take_byte()?;
        if first & 0x80 == 0 {
            return Ok(first as usize);
        }
        let num_bytes = (first & 0x7f) as usize;
        if num_bytes == 0 || num_bytes > 2 {
            return Err(CodecError::MalformedDer(format!(
                "long-form length uses {num_bytes} bytes, maximum 2 accepted"
            )));
        }
        let bytes = self.take_slice(num_bytes)?;
        let mut value: usize = 0;
        for b in bytes {
            value = (value << 8) | (*b as usize);
        }
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn der_encode(r: &[u8], s: &[u8]) -> Vec<u8> {
        let mut body = Vec::new();
        for component in [r, s] {
            body.push(0x02);
            body.push(component.len() as u8);
            body.extend_from_slice(component);
        }
        let mut out = vec![0x30, body.len() as u8];
        out.extend_from_slice(&body);
        out
    }

    #[test]
    fn parses_well_formed_der() {
        let r = [0x01; 32];
        let s = [0x02; 32];
        let der = der_encode(&r, &s);
        let (parsed_r, parsed_s) = parse_der(&der).unwrap();
        assert_eq!(parsed_r, U256::from_be_bytes(r));
        assert_eq!(parsed_s, U256::from_be_bytes(s));
    }

    #[test]
    fn strips_sign_byte_and_left_pads() {
        let mut r = vec![0x00];
        r.extend_from_slice(&[0xff; 32]);
        let s = vec![0x05];
        let der = der_encode(&r, &s);
        let (parsed_r, parsed_s) = parse_der(&der).unwrap();
        assert_eq!(parsed_r, U256::from_be_bytes([0xff; 32]));
        let mut expected_s = [0u8; 32];
        expected_s[31] = 0x05;
        assert_eq!(parsed_s, U256::from_be_bytes(expected_s));
    }

    #[test]
    fn rejects_trailing_bytes() {
        let der = der_encode(&[0x01; 32], &[0x02; 32]);
        let mut with_trailer = der.clone();
        with_trailer.push(0xff);
        // Correct the outer SEQUENCE length byte would still not match len,
        // so adding a trailing byte without adjusting length must fail.
        assert!(parse_der(&with_trailer).is_err());
    }

    #[test]
    fn rejects_oversize_integer() {
        let oversized = vec![0xff; 34];
        let der = der_encode(&oversized, &[0x01; 32]);
        assert!(parse_der(&der).is_err());
    }
}
