use std::mem::size_of;

use bytes::{Buf, BufMut, Bytes};

use crate::error::DecodeError;
use crate::util::safe_converter::{PrecheckedCast, SafeCast};

macro_rules! get_checked_impl {
    ($checked_getter: ident, $ty:ty, $getter: ident) => {
        fn $checked_getter(&mut self) -> Result<$ty, DecodeError> {
            self.ensure_remaining(size_of::<$ty>())?;
            Ok(self.$getter())
        }
    }
}

/// Bounds-checked big-endian readers: a short buffer is a [DecodeError::Truncated], never a panic.
pub trait BufExt: Buf {
    fn ensure_remaining(&self, needed: usize) -> Result<(), DecodeError> {
        if self.remaining() < needed {
            return Err(DecodeError::Truncated {
                needed,
                remaining: self.remaining(),
            });
        }
        Ok(())
    }

    get_checked_impl!(checked_get_u8, u8, get_u8);
    get_checked_impl!(checked_get_u32, u32, get_u32);
    get_checked_impl!(checked_get_u64, u64, get_u64);

    fn checked_get_bytes(&mut self, len: usize) -> Result<Bytes, DecodeError> {
        self.ensure_remaining(len)?;
        Ok(self.copy_to_bytes(len))
    }

    /// u32 length followed by that many bytes
    fn checked_get_len_prefixed(&mut self) -> Result<Bytes, DecodeError> {
        let len: usize = self.checked_get_u32()?.safe_cast();
        self.checked_get_bytes(len)
    }
}

pub trait BufMutExt: BufMut {
    fn put_len_prefixed(&mut self, data: &[u8]) {
        self.put_u32(data.len().prechecked_cast());
        self.put_slice(data);
    }
}

impl <T: Buf> BufExt for T {
}

impl <T: BufMut> BufMutExt for T {
}

#[cfg(test)]
mod tests {
    use bytes::BytesMut;
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case::empty(b"", 4, 0)]
    #[case::one_short(b"\0\0\0", 4, 3)]
    fn test_checked_get_u32_truncated(#[case] mut buf: &[u8], #[case] needed: usize, #[case] remaining: usize) {
        assert_eq!(buf.checked_get_u32(), Err(DecodeError::Truncated { needed, remaining }));
    }

    #[test]
    fn test_checked_getters_are_big_endian() {
        let mut buf: &[u8] = b"\x01\x02\x03\x04\x05\0\0\0\0\0\0\x01\x02";
        assert_eq!(buf.checked_get_u8().unwrap(), 1);
        assert_eq!(buf.checked_get_u32().unwrap(), 0x02030405);
        assert_eq!(buf.checked_get_u64().unwrap(), 0x0102);
        assert!(buf.is_empty());
    }

    #[rstest]
    #[case::empty(b"")]
    #[case::short(b"abc")]
    #[case::longer(b"Request17")]
    fn test_len_prefixed(#[case] data: &[u8]) {
        let mut buf = BytesMut::new();
        buf.put_len_prefixed(data);
        buf.put_u8(99);
        assert_eq!(buf.len(), 4 + data.len() + 1);

        let mut b: &[u8] = &buf;
        assert_eq!(b.checked_get_len_prefixed().unwrap().as_ref(), data);
        assert_eq!(b, &[99]);
    }

    #[test]
    fn test_len_prefixed_with_short_payload() {
        let mut buf: &[u8] = b"\0\0\0\x05abc";
        assert_eq!(buf.checked_get_len_prefixed(), Err(DecodeError::Truncated { needed: 5, remaining: 3 }));
    }
}
