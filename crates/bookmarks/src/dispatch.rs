use crate::commands::{Commands, Outcome};
use crate::host::{Host, PlayerContext};

/// Permission tiers, lowest first.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum UserLevel {
    Guest,
    Registered,
    Moderator,
    Admin,
    Owner,
}

impl UserLevel {
    pub const ALL: &'static [UserLevel] = &[
        UserLevel::Guest,
        UserLevel::Registered,
        UserLevel::Moderator,
        UserLevel::Admin,
        UserLevel::Owner,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            UserLevel::Guest => "guest",
            UserLevel::Registered => "registered",
            UserLevel::Moderator => "moderator",
            UserLevel::Admin => "admin",
            UserLevel::Owner => "owner",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "guest" => Some(UserLevel::Guest),
            "registered" | "member" => Some(UserLevel::Registered),
            "moderator" | "mod" => Some(UserLevel::Moderator),
            "admin" => Some(UserLevel::Admin),
            "owner" => Some(UserLevel::Owner),
            _ => None,
        }
    }

    /// Wire ordinal as carried in broker requests; unknown values are `None`.
    pub fn from_wire(b: u8) -> Option<Self> {
        Self::ALL.get(b as usize).copied()
    }

    pub fn to_wire(self) -> u8 {
        self as u8
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command {
    BookmarkAdd,
    BookmarkDel,
    Goto,
}

impl Command {
    pub const ALL: &'static [Command] = &[Command::BookmarkAdd, Command::BookmarkDel, Command::Goto];

    pub fn name(self) -> &'static str {
        match self {
            Command::BookmarkAdd => "bookmark_add",
            Command::BookmarkDel => "bookmark_del",
            Command::Goto => "goto",
        }
    }

    pub fn min_level(self) -> UserLevel {
        match self {
            Command::BookmarkAdd | Command::BookmarkDel | Command::Goto => UserLevel::Guest,
        }
    }

    pub fn parse(word: &str) -> Option<Self> {
        let w = word.strip_prefix('/').unwrap_or(word);
        Self::ALL.iter().copied().find(|c| c.name() == w)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatched {
    Unknown,
    Denied { need: UserLevel },
    Ran(Outcome),
}

/// Split a chat line into the command word and its argument tokens re-joined by single
/// spaces. `None` for a blank line.
pub fn split_command(line: &str) -> Option<(&str, String)> {
    let mut toks = line.split_whitespace();
    let word = toks.next()?;
    Some((word, toks.collect::<Vec<_>>().join(" ")))
}

/// Permission gate plus command routing.
///
/// `floor` raises every command's minimum tier; it never lowers one.
pub struct Dispatcher {
    commands: Commands,
    floor: UserLevel,
}

impl Dispatcher {
    pub fn new(commands: Commands) -> Self {
        Self {
            commands,
            floor: UserLevel::Guest,
        }
    }

    pub fn floor(mut self, level: UserLevel) -> Self {
        self.floor = level;
        self
    }

    pub fn commands(&self) -> &Commands {
        &self.commands
    }

    pub fn required_level(&self, cmd: Command) -> UserLevel {
        cmd.min_level().max(self.floor)
    }

    pub fn dispatch(
        &self,
        ctx: &PlayerContext,
        level: UserLevel,
        line: &str,
        host: &mut dyn Host,
    ) -> anyhow::Result<Dispatched> {
        let Some((word, arg)) = split_command(line) else {
            return Ok(Dispatched::Unknown);
        };
        let Some(cmd) = Command::parse(word) else {
            return Ok(Dispatched::Unknown);
        };

        let need = self.required_level(cmd);
        if level < need {
            host.send(ctx.player, "You are not authorized to do this.");
            return Ok(Dispatched::Denied { need });
        }

        let out = match cmd {
            Command::BookmarkAdd => self.commands.add(ctx, &arg, host)?,
            Command::BookmarkDel => self.commands.remove(ctx, &arg, host)?,
            Command::Goto => self.commands.goto(ctx, &arg, host)?,
        };
        Ok(Dispatched::Ran(out))
    }
}
