//! Broker <-> command shard messages.
//!
//! The broker owns the game client connections; it forwards chat commands to the shard
//! and relays the shard's responses back to the player, either as chat or as raw game
//! packets written to the player's client.

use bytes::BufMut;
use bytes::Bytes;
use bytes::BytesMut;

use crate::ProtoError;
use crate::packet::Packet;
use crate::player::PlayerId;

pub const REQ_COMMAND: u8 = 0x01;

pub const RESP_CHAT: u8 = 0x81;
pub const RESP_PACKET: u8 = 0x82;
pub const RESP_ERR: u8 = 0x83;
pub const RESP_DONE: u8 = 0x84;

pub const FLAG_ON_SHIP: u8 = 0x01;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShardReq {
    /// Run one chat command for a player.
    ///
    /// Encoding:
    /// - type: `REQ_COMMAND` (packet id)
    /// - player id: 16 bytes (u128 big-endian)
    /// - level: 1 byte (permission tier ordinal, guest = 0)
    /// - flags: 1 byte
    ///   - bit0: on_ship
    /// - planet_len: u8
    /// - planet: planet_len bytes (utf-8 location key, empty when on ship)
    /// - line: remaining bytes (utf-8, command word first)
    Command {
        player: PlayerId,
        level: u8,
        on_ship: bool,
        planet: Bytes,
        line: Bytes,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShardResp {
    Chat { player: PlayerId, line: Bytes },
    /// A game packet, framing included, for the player's client.
    Packet { player: PlayerId, packet: Bytes },
    Err { player: PlayerId, msg: Bytes },
    /// Ends the response to one request.
    Done { player: PlayerId },
}

impl ShardReq {
    pub fn encode(&self) -> Result<(u8, Bytes), ProtoError> {
        match self {
            ShardReq::Command {
                player,
                level,
                on_ship,
                planet,
                line,
            } => {
                let planet_len: u8 = planet
                    .len()
                    .try_into()
                    .map_err(|_| ProtoError::BadField("planet key longer than 255 bytes"))?;
                let mut out = BytesMut::with_capacity(16 + 3 + planet.len() + line.len());
                out.put_slice(&player.to_be_bytes());
                out.put_u8(*level);
                out.put_u8(if *on_ship { FLAG_ON_SHIP } else { 0 });
                out.put_u8(planet_len);
                out.put_slice(planet);
                out.put_slice(line);
                Ok((REQ_COMMAND, out.freeze()))
            }
        }
    }
}

impl ShardResp {
    pub fn player(&self) -> PlayerId {
        match self {
            ShardResp::Chat { player, .. }
            | ShardResp::Packet { player, .. }
            | ShardResp::Err { player, .. }
            | ShardResp::Done { player } => *player,
        }
    }

    /// Packet id plus the body that follows the 16-byte player id.
    pub fn parts(&self) -> (u8, [u8; 16], &[u8]) {
        let pid = self.player().to_be_bytes();
        match self {
            ShardResp::Chat { line, .. } => (RESP_CHAT, pid, &line[..]),
            ShardResp::Packet { packet, .. } => (RESP_PACKET, pid, &packet[..]),
            ShardResp::Err { msg, .. } => (RESP_ERR, pid, &msg[..]),
            ShardResp::Done { .. } => (RESP_DONE, pid, &[][..]),
        }
    }
}

pub fn parse_req(pkt: Packet) -> Result<ShardReq, ProtoError> {
    let p = pkt.payload;
    match pkt.id {
        REQ_COMMAND => {
            let player = PlayerId::read_prefix(&p)?;
            let mut i = PlayerId::LEN;
            if p.len() < i + 3 {
                return Err(ProtoError::Truncated {
                    need: i + 3,
                    got: p.len(),
                });
            }
            let level = p[i];
            let flags = p[i + 1];
            let planet_len = p[i + 2] as usize;
            i += 3;
            if p.len() < i + planet_len {
                return Err(ProtoError::Truncated {
                    need: i + planet_len,
                    got: p.len(),
                });
            }
            let planet = p.slice(i..i + planet_len);
            i += planet_len;
            Ok(ShardReq::Command {
                player,
                level,
                on_ship: (flags & FLAG_ON_SHIP) != 0,
                planet,
                line: p.slice(i..),
            })
        }
        t => Err(ProtoError::UnknownType(t)),
    }
}

pub fn parse_resp(pkt: Packet) -> Result<ShardResp, ProtoError> {
    let p = pkt.payload;
    let player = PlayerId::read_prefix(&p)?;
    let body = p.slice(PlayerId::LEN..);

    match pkt.id {
        RESP_CHAT => Ok(ShardResp::Chat { player, line: body }),
        RESP_PACKET => Ok(ShardResp::Packet {
            player,
            packet: body,
        }),
        RESP_ERR => Ok(ShardResp::Err { player, msg: body }),
        RESP_DONE => {
            if !body.is_empty() {
                return Err(ProtoError::BadField("done must carry only the player id"));
            }
            Ok(ShardResp::Done { player })
        }
        t => Err(ProtoError::UnknownType(t)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn packet(id: u8, payload: Bytes) -> Packet {
        Packet { id, payload }
    }

    #[test]
    fn command_request_survives_encoding() {
        let req = ShardReq::Command {
            player: PlayerId(42),
            level: 1,
            on_ship: false,
            planet: Bytes::from_static(b"10:20:30:1:2"),
            line: Bytes::from_static(b"bookmark_add Home Base"),
        };
        let (id, payload) = req.encode().unwrap();
        assert_eq!(id, REQ_COMMAND);
        assert_eq!(parse_req(packet(id, payload)).unwrap(), req);
    }

    #[test]
    fn command_request_rejects_truncated_planet() {
        let mut p = BytesMut::new();
        p.put_slice(&PlayerId(1).to_be_bytes());
        p.put_u8(0);
        p.put_u8(FLAG_ON_SHIP);
        p.put_u8(12);
        p.put_slice(b"10:20");
        assert!(matches!(
            parse_req(packet(REQ_COMMAND, p.freeze())),
            Err(ProtoError::Truncated { .. })
        ));
    }

    #[test]
    fn unknown_request_type_is_an_error() {
        let p = Bytes::copy_from_slice(&PlayerId(1).to_be_bytes());
        assert!(matches!(
            parse_req(packet(0x7f, p)),
            Err(ProtoError::UnknownType(0x7f))
        ));
    }

    #[test]
    fn response_parts_parse_back() {
        let resp = ShardResp::Chat {
            player: PlayerId(7),
            line: Bytes::from_static(b"hi"),
        };
        let (id, pid, body) = resp.parts();
        let mut p = BytesMut::new();
        p.put_slice(&pid);
        p.put_slice(body);
        assert_eq!(parse_resp(packet(id, p.freeze())).unwrap(), resp);

        let done = ShardResp::Done {
            player: PlayerId(7),
        };
        let (id, pid, _) = done.parts();
        assert_eq!(
            parse_resp(packet(id, Bytes::copy_from_slice(&pid))).unwrap(),
            done
        );
    }
}
