use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};
use starproto::player::PlayerId;
use tracing::{error, warn};

use crate::config::{BookmarksConfig, CorruptPolicy};

/// A named location. Stored on disk as the pair `[location, name]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "(String, String)", into = "(String, String)")]
pub struct Bookmark {
    /// Location key; opaque here, see `LocationKey`.
    pub location: String,
    pub name: String,
}

impl From<(String, String)> for Bookmark {
    fn from((location, name): (String, String)) -> Self {
        Self { location, name }
    }
}

impl From<Bookmark> for (String, String) {
    fn from(b: Bookmark) -> Self {
        (b.location, b.name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Conflict {
    BlankName,
    /// The location is already bookmarked under `existing`.
    Location { existing: String },
    Name,
}

/// One player's bookmarks in insertion order.
///
/// Locations are unique, names are unique and never blank.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Bookmarks {
    entries: Vec<Bookmark>,
}

impl Bookmarks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from raw entries. The first of any conflicting entries is kept; the rest come
    /// back alongside the conflict that rejected them.
    pub fn from_entries(raw: Vec<Bookmark>) -> (Self, Vec<(Bookmark, Conflict)>) {
        let mut out = Self::new();
        let mut rejected = Vec::new();
        for b in raw {
            if let Err(c) = out.insert(b.location.clone(), b.name.clone()) {
                rejected.push((b, c));
            }
        }
        (out, rejected)
    }

    pub fn as_slice(&self) -> &[Bookmark] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|b| b.name.as_str())
    }

    pub fn by_name(&self, name: &str) -> Option<&Bookmark> {
        self.entries.iter().find(|b| b.name == name)
    }

    pub fn by_location(&self, location: &str) -> Option<&Bookmark> {
        self.entries.iter().find(|b| b.location == location)
    }

    pub fn insert(&mut self, location: String, name: String) -> Result<(), Conflict> {
        let name = name.trim();
        if name.is_empty() {
            return Err(Conflict::BlankName);
        }
        if let Some(b) = self.by_location(&location) {
            return Err(Conflict::Location {
                existing: b.name.clone(),
            });
        }
        if self.by_name(name).is_some() {
            return Err(Conflict::Name);
        }
        self.entries.push(Bookmark {
            location,
            name: name.to_string(),
        });
        Ok(())
    }

    pub fn remove(&mut self, name: &str) -> Option<Bookmark> {
        let i = self.entries.iter().position(|b| b.name == name)?;
        Some(self.entries.remove(i))
    }
}

/// Per-player bookmark files under one directory.
///
/// No locking: a load-mutate-save cycle assumes it is the only writer for that player.
#[derive(Debug, Clone)]
pub struct BookmarkStore {
    dir: PathBuf,
    on_corrupt: CorruptPolicy,
}

impl BookmarkStore {
    pub fn new(cfg: &BookmarksConfig) -> Self {
        Self {
            dir: cfg.dir.clone(),
            on_corrupt: cfg.on_corrupt,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, player: PlayerId) -> PathBuf {
        self.dir.join(format!("{player}.json"))
    }

    pub fn ensure_dir(&self) -> anyhow::Result<()> {
        match std::fs::create_dir_all(&self.dir) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists && self.dir.is_dir() => Ok(()),
            Err(e) => {
                Err(e).with_context(|| format!("failed to create bookmarks dir {:?}", self.dir))
            }
        }
    }

    pub fn load(&self, player: PlayerId) -> anyhow::Result<Bookmarks> {
        let path = self.path_for(player);
        let s = match std::fs::read_to_string(&path) {
            Ok(s) => s,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Bookmarks::new()),
            Err(e) => return self.recover(&path, e.into()),
        };

        let raw = match serde_json::from_str::<Vec<Bookmark>>(&s) {
            Ok(raw) => raw,
            Err(e) => return self.recover(&path, e.into()),
        };

        let (bookmarks, rejected) = Bookmarks::from_entries(raw);
        if rejected.is_empty() {
            return Ok(bookmarks);
        }
        match self.on_corrupt {
            CorruptPolicy::Empty => {
                for (b, c) in &rejected {
                    warn!(path = %path.display(), location = %b.location, name = %b.name, conflict = ?c, "dropping stored bookmark");
                }
                Ok(bookmarks)
            }
            CorruptPolicy::Fail => Err(anyhow::anyhow!(
                "bookmarks file {:?} has {} conflicting entries (first: {:?} {:?})",
                path,
                rejected.len(),
                rejected[0].0.name,
                rejected[0].1
            )),
        }
    }

    fn recover(&self, path: &Path, err: anyhow::Error) -> anyhow::Result<Bookmarks> {
        match self.on_corrupt {
            CorruptPolicy::Empty => {
                warn!(path = %path.display(), err = %err, "unreadable bookmarks file; treating as empty");
                Ok(Bookmarks::new())
            }
            CorruptPolicy::Fail => {
                Err(err.context(format!("failed to load bookmarks file {:?}", path)))
            }
        }
    }

    pub fn save(&self, player: PlayerId, bookmarks: &Bookmarks) -> anyhow::Result<()> {
        let path = self.path_for(player);
        let res = write_replace(&path, bookmarks);
        if let Err(e) = &res {
            error!(player = %player, path = %path.display(), err = %format!("{e:#}"), "couldn't save bookmarks");
        }
        res
    }
}

fn write_replace(path: &Path, bookmarks: &Bookmarks) -> anyhow::Result<()> {
    let s = serde_json::to_string(bookmarks.as_slice())?;
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, s).with_context(|| format!("failed to write {:?}", tmp))?;
    std::fs::rename(&tmp, path).with_context(|| format!("failed to replace {:?}", path))?;
    Ok(())
}
