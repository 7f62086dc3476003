//! Typed view of the MCU command protocol.
//!
//! `command` names the request/acknowledgment codes, `codec` translates
//! payloads on the host side and `device` is the mirror image (what the MCU
//! firmware decodes and encodes).

use crate::error::ProtocolError;

pub mod codec;
pub mod command;
pub mod device;

/// Bounds-checked big-endian field access into a frame payload.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Fields<'a> {
    payload: &'a [u8],
}

impl<'a> Fields<'a> {
    pub(crate) fn new(payload: &'a [u8]) -> Self {
        Self { payload }
    }

    pub(crate) fn bytes(
        &self,
        field: &'static str,
        offset: usize,
        len: usize,
    ) -> Result<&'a [u8], ProtocolError> {
        offset
            .checked_add(len)
            .and_then(|end| self.payload.get(offset..end))
            .ok_or(ProtocolError::Truncated {
                field,
                offset,
                len: self.payload.len(),
            })
    }

    fn array<const N: usize>(
        &self,
        field: &'static str,
        offset: usize,
    ) -> Result<[u8; N], ProtocolError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.bytes(field, offset, N)?);
        Ok(out)
    }

    pub(crate) fn u8(&self, field: &'static str, offset: usize) -> Result<u8, ProtocolError> {
        Ok(self.array::<1>(field, offset)?[0])
    }

    pub(crate) fn i8(&self, field: &'static str, offset: usize) -> Result<i8, ProtocolError> {
        Ok(self.u8(field, offset)? as i8)
    }

    pub(crate) fn u16(&self, field: &'static str, offset: usize) -> Result<u16, ProtocolError> {
        Ok(u16::from_be_bytes(self.array(field, offset)?))
    }

    pub(crate) fn i16(&self, field: &'static str, offset: usize) -> Result<i16, ProtocolError> {
        Ok(i16::from_be_bytes(self.array(field, offset)?))
    }

    pub(crate) fn u32(&self, field: &'static str, offset: usize) -> Result<u32, ProtocolError> {
        Ok(u32::from_be_bytes(self.array(field, offset)?))
    }

    pub(crate) fn i32(&self, field: &'static str, offset: usize) -> Result<i32, ProtocolError> {
        Ok(i32::from_be_bytes(self.array(field, offset)?))
    }

    pub(crate) fn flag(&self, field: &'static str, offset: usize) -> Result<bool, ProtocolError> {
        Ok(self.u8(field, offset)? != 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fields_are_big_endian() {
        let f = Fields::new(&[0x12, 0x34, 0x56, 0x78, 0xFF, 0xFE]);
        assert_eq!(f.u32("x", 0).unwrap(), 0x1234_5678);
        assert_eq!(f.u16("x", 1).unwrap(), 0x3456);
        assert_eq!(f.i16("x", 4).unwrap(), -2);
        assert_eq!(f.i8("x", 5).unwrap(), -2);
    }

    #[test]
    fn out_of_bounds_field_is_truncated() {
        let f = Fields::new(&[0x00, 0x01]);
        assert!(matches!(
            f.u32("timestamp", 0),
            Err(ProtocolError::Truncated {
                field: "timestamp",
                offset: 0,
                len: 2
            })
        ));
        assert!(f.bytes("payload", usize::MAX, 2).is_err());
    }
}
