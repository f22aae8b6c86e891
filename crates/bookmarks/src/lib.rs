//! `bookmarks`: per-player planet bookmarks and the `/goto` warp.
//!
//! - `location`: location keys (`x:y:z:planet:satellite`) and their fly-ship packet,
//! - `store`: one JSON file of `[location, name]` pairs per player,
//! - `commands`: `bookmark_add`, `bookmark_del`, `goto`,
//! - `dispatch`: permission gate and command routing,
//! - `host`: what the hosting server provides (player context, chat, client transport).

pub mod commands;
pub mod config;
pub mod dispatch;
pub mod host;
pub mod location;
pub mod store;
