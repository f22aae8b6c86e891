use std::fmt;

use crate::ProtoError;

/// A player's UUID as the game server assigns it.
///
/// The textual form is 32 lowercase hex digits without separators; it doubles as the
/// per-player file stem in storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PlayerId(pub u128);

impl PlayerId {
    pub const LEN: usize = 16;

    pub fn to_be_bytes(self) -> [u8; 16] {
        self.0.to_be_bytes()
    }

    pub fn from_be_bytes(b: [u8; 16]) -> Self {
        Self(u128::from_be_bytes(b))
    }

    /// Read the id from the first 16 bytes of `p`.
    pub(crate) fn read_prefix(p: &[u8]) -> Result<Self, ProtoError> {
        if p.len() < Self::LEN {
            return Err(ProtoError::Truncated {
                need: Self::LEN,
                got: p.len(),
            });
        }
        let mut b = [0u8; 16];
        b.copy_from_slice(&p[..Self::LEN]);
        Ok(Self::from_be_bytes(b))
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:032x}", self.0)
    }
}
