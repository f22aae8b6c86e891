use bytes::Buf;
use bytes::BufMut;
use bytes::Bytes;
use bytes::BytesMut;

use crate::ProtoError;
use crate::packet::build_packet;

/// Client-bound "fly ship" request id in the host protocol.
pub const PKT_FLY_SHIP: u8 = 41;

pub const PAYLOAD_LEN: usize = 5 * 4;

/// Destination for a ship warp.
///
/// Encoding (big-endian `i32` each, in this order):
/// - x, y, z: sector coordinates
/// - planet: orbit index around the star
/// - satellite: moon index around the planet (0 for the planet itself)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlyShip {
    pub x: i32,
    pub y: i32,
    pub z: i32,
    pub planet: i32,
    pub satellite: i32,
}

impl FlyShip {
    pub fn write_payload(&self, out: &mut impl BufMut) {
        out.put_i32(self.x);
        out.put_i32(self.y);
        out.put_i32(self.z);
        out.put_i32(self.planet);
        out.put_i32(self.satellite);
    }

    /// The full packet, framing included, ready to write to the player's client.
    pub fn to_packet(&self) -> Bytes {
        let mut payload = BytesMut::with_capacity(PAYLOAD_LEN);
        self.write_payload(&mut payload);
        build_packet(PKT_FLY_SHIP, &payload)
    }
}

pub fn parse_payload(mut p: Bytes) -> Result<FlyShip, ProtoError> {
    if p.len() != PAYLOAD_LEN {
        return Err(ProtoError::PayloadLen {
            id: PKT_FLY_SHIP,
            want: PAYLOAD_LEN,
            got: p.len(),
        });
    }
    Ok(FlyShip {
        x: p.get_i32(),
        y: p.get_i32(),
        z: p.get_i32(),
        planet: p.get_i32(),
        satellite: p.get_i32(),
    })
}
