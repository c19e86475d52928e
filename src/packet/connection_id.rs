use std::fmt::{Debug, Display, Formatter};

use bytes::{Buf, BufMut};

use crate::error::DecodeError;
use crate::util::buf_ext::BufExt;
use crate::util::random::Random;

/// Opaque 8 byte connection identifier, chosen at random by each peer when a connection starts.
///
/// It is displayed as 16 hex characters.
#[derive(Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct ConnectionId(pub u64);

impl Debug for ConnectionId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "Cid({:016x})", self.0)
    }
}

impl Display for ConnectionId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

impl ConnectionId {
    pub const LEN: u8 = 8;

    pub fn random<R: Random>() -> ConnectionId {
        ConnectionId(R::next_u64())
    }

    pub fn from_bytes(bytes: [u8; 8]) -> ConnectionId {
        ConnectionId(u64::from_be_bytes(bytes))
    }

    pub fn to_bytes(&self) -> [u8; 8] {
        self.0.to_be_bytes()
    }

    /// Connection ids are length prefixed on the wire: a single length byte (0 for 'absent', 8
    ///  otherwise) followed by the id's bytes.
    pub fn ser_optional(id: Option<ConnectionId>, buf: &mut impl BufMut) {
        match id {
            None => buf.put_u8(0),
            Some(id) => {
                buf.put_u8(Self::LEN);
                buf.put_slice(&id.to_bytes());
            }
        }
    }

    pub fn ser(&self, buf: &mut impl BufMut) {
        Self::ser_optional(Some(*self), buf);
    }

    pub fn deser_optional(buf: &mut impl Buf) -> Result<Option<ConnectionId>, DecodeError> {
        match buf.checked_get_u8()? {
            0 => Ok(None),
            Self::LEN => Ok(Some(ConnectionId(buf.checked_get_u64()?))),
            n => Err(DecodeError::InvalidConnectionIdLength(n)),
        }
    }

    pub fn deser(buf: &mut impl Buf) -> Result<ConnectionId, DecodeError> {
        Self::deser_optional(buf)?
            .ok_or(DecodeError::MissingConnectionId)
    }
}
