//! What the bookmark commands need from the server hosting them.

use bytes::Bytes;
use starproto::player::PlayerId;
use starproto::shard::ShardResp;

use crate::location::LocationKey;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerLocation {
    /// Aboard the player's own ship, in orbit or in transit.
    Ship,
    /// Standing on a planet or moon.
    Planet(LocationKey),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlayerContext {
    pub player: PlayerId,
    pub location: PlayerLocation,
}

impl PlayerContext {
    pub fn on_ship(&self) -> bool {
        matches!(self.location, PlayerLocation::Ship)
    }
}

pub trait ChatNotifier {
    fn send(&mut self, player: PlayerId, text: &str);
}

pub trait Transport {
    /// Write a complete game packet to the player's client connection.
    fn write_bytes(&mut self, player: PlayerId, bytes: Bytes) -> anyhow::Result<()>;
}

/// Everything a command can emit to the player.
pub trait Host: ChatNotifier + Transport {}

impl<T: ChatNotifier + Transport + ?Sized> Host for T {}

/// Collects everything a command says or sends, in order, as broker responses.
#[derive(Debug, Default)]
pub struct Outbox {
    pub out: Vec<ShardResp>,
}

impl Outbox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn chat_lines(&self) -> Vec<String> {
        self.out
            .iter()
            .filter_map(|r| match r {
                ShardResp::Chat { line, .. } => Some(String::from_utf8_lossy(line).into_owned()),
                _ => None,
            })
            .collect()
    }

    pub fn packets(&self) -> Vec<Bytes> {
        self.out
            .iter()
            .filter_map(|r| match r {
                ShardResp::Packet { packet, .. } => Some(packet.clone()),
                _ => None,
            })
            .collect()
    }
}

impl ChatNotifier for Outbox {
    fn send(&mut self, player: PlayerId, text: &str) {
        self.out.push(ShardResp::Chat {
            player,
            line: Bytes::copy_from_slice(text.as_bytes()),
        });
    }
}

impl Transport for Outbox {
    fn write_bytes(&mut self, player: PlayerId, bytes: Bytes) -> anyhow::Result<()> {
        self.out.push(ShardResp::Packet {
            player,
            packet: bytes,
        });
        Ok(())
    }
}
