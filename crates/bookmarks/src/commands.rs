//! `bookmark_add`, `bookmark_del` and `goto`.
//!
//! Every call reloads the player's file, so nothing is cached between commands. User
//! mistakes come back as `Ok` with a chat reply; `Err` means the command itself broke
//! (storage, a corrupt stored key, the transport).

use anyhow::Context;
use tracing::info;

use crate::host::{Host, PlayerContext, PlayerLocation};
use crate::location::LocationKey;
use crate::store::{BookmarkStore, Bookmarks, Conflict};

const YELLOW: &str = "^yellow;";
const GREEN: &str = "^green;";
const GRAY: &str = "^gray;";

const ADD_USAGE: &str = "Bookmarks a planet for fast warp routes.\nSyntax: /bookmark_add (name)";
const DEL_USAGE: &str = "Removes a planet from your bookmarks.\nSyntax: /bookmark_del (name)";
const GOTO_USAGE: &str = "Warps your ship to a previously bookmarked planet.\n\
Syntax: /goto [name] *omit name for a list of bookmarks";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Added { name: String },
    Removed { name: String },
    Warped { name: String, to: LocationKey },
    /// No name given; the player got usage and their bookmark names.
    Listed,
    Rejected(Rejection),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    NotOnPlanet,
    NotOnShip,
    LocationTaken { existing: String },
    NameTaken,
    NotFound,
}

pub struct Commands {
    store: BookmarkStore,
}

impl Commands {
    pub fn new(store: BookmarkStore) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &BookmarkStore {
        &self.store
    }

    pub fn add(
        &self,
        ctx: &PlayerContext,
        raw_name: &str,
        host: &mut dyn Host,
    ) -> anyhow::Result<Outcome> {
        let mut bookmarks = self.store.load(ctx.player)?;

        let PlayerLocation::Planet(here) = ctx.location else {
            host.send(ctx.player, "You need to be on a planet!");
            return Ok(Outcome::Rejected(Rejection::NotOnPlanet));
        };

        let name = raw_name.trim();
        if name.is_empty() {
            send_list(host, ctx, ADD_USAGE, &bookmarks, true);
            return Ok(Outcome::Listed);
        }

        match bookmarks.insert(here.to_string(), name.to_string()) {
            Ok(()) => {}
            Err(Conflict::Location { existing }) => {
                host.send(
                    ctx.player,
                    &format!("The planet you're on is already bookmarked: {YELLOW}{existing}"),
                );
                return Ok(Outcome::Rejected(Rejection::LocationTaken { existing }));
            }
            Err(Conflict::Name) => {
                host.send(ctx.player, "Bookmark with that name already exists!");
                return Ok(Outcome::Rejected(Rejection::NameTaken));
            }
            Err(Conflict::BlankName) => {
                send_list(host, ctx, ADD_USAGE, &bookmarks, true);
                return Ok(Outcome::Listed);
            }
        }

        self.store.save(ctx.player, &bookmarks)?;
        info!(player = %ctx.player, name = %name, location = %here, "bookmark added");
        host.send(
            ctx.player,
            &format!("Bookmark {YELLOW}{name}{GREEN} added."),
        );
        Ok(Outcome::Added {
            name: name.to_string(),
        })
    }

    pub fn remove(
        &self,
        ctx: &PlayerContext,
        raw_name: &str,
        host: &mut dyn Host,
    ) -> anyhow::Result<Outcome> {
        let mut bookmarks = self.store.load(ctx.player)?;

        let name = raw_name.trim();
        if name.is_empty() {
            send_list(host, ctx, DEL_USAGE, &bookmarks, true);
            return Ok(Outcome::Listed);
        }

        if bookmarks.remove(name).is_none() {
            host.send(
                ctx.player,
                &format!("There is no bookmark named: {YELLOW}{name}"),
            );
            return Ok(Outcome::Rejected(Rejection::NotFound));
        }

        self.store.save(ctx.player, &bookmarks)?;
        info!(player = %ctx.player, name = %name, "bookmark removed");
        host.send(
            ctx.player,
            &format!("Bookmark {YELLOW}{name}{GREEN} removed."),
        );
        Ok(Outcome::Removed {
            name: name.to_string(),
        })
    }

    /// Empty name lists bookmarks (from anywhere); a name warps, and only from the ship.
    pub fn goto(
        &self,
        ctx: &PlayerContext,
        raw_name: &str,
        host: &mut dyn Host,
    ) -> anyhow::Result<Outcome> {
        let bookmarks = self.store.load(ctx.player)?;

        let name = raw_name.trim();
        if name.is_empty() {
            send_list(host, ctx, GOTO_USAGE, &bookmarks, false);
            return Ok(Outcome::Listed);
        }

        if !ctx.on_ship() {
            host.send(ctx.player, "You need to be on a ship!");
            return Ok(Outcome::Rejected(Rejection::NotOnShip));
        }

        let Some(b) = bookmarks.by_name(name) else {
            host.send(
                ctx.player,
                &format!("There is no bookmark named: {YELLOW}{name}"),
            );
            return Ok(Outcome::Rejected(Rejection::NotFound));
        };

        // Keys are validated on the way in; a bad one here means the file was tampered with.
        let to = b
            .location
            .parse::<LocationKey>()
            .with_context(|| format!("stored bookmark {name:?} has a bad location key"))?;
        host
            .write_bytes(ctx.player, to.fly_ship().to_packet())
            .context("failed to send fly ship packet")?;

        info!(player = %ctx.player, name = %name, location = %to, "warping to bookmark");
        host.send(
            ctx.player,
            &format!("Warp drive engaged! Warping to {YELLOW}{name}{GREEN}."),
        );
        Ok(Outcome::Warped {
            name: name.to_string(),
            to,
        })
    }
}

fn render_names(bookmarks: &Bookmarks) -> String {
    let sep = format!("{GREEN},{YELLOW} ");
    let names = bookmarks.names().collect::<Vec<_>>().join(sep.as_str());
    if names.is_empty() {
        format!("{GRAY}(none){GREEN}")
    } else {
        names
    }
}

fn send_list(
    host: &mut dyn Host,
    ctx: &PlayerContext,
    usage: &str,
    bookmarks: &Bookmarks,
    ask_for_name: bool,
) {
    host.send(ctx.player, usage);
    let prompt = if ask_for_name {
        "Please, provide a valid bookmark name!\n"
    } else {
        ""
    };
    host.send(
        ctx.player,
        &format!("{prompt}Bookmarks: {YELLOW}{}", render_names(bookmarks)),
    );
}
