use std::path::PathBuf;

/// What `load` does with a bookmark file that exists but cannot be parsed or holds
/// conflicting entries.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CorruptPolicy {
    /// Log and treat the player as having no bookmarks. The next save overwrites the file.
    #[default]
    Empty,
    /// Fail the command and leave the file alone for an operator to look at.
    Fail,
}

impl CorruptPolicy {
    pub fn as_str(self) -> &'static str {
        match self {
            CorruptPolicy::Empty => "empty",
            CorruptPolicy::Fail => "fail",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "empty" | "default-empty" => Some(CorruptPolicy::Empty),
            "fail" | "error" => Some(CorruptPolicy::Fail),
            _ => None,
        }
    }
}

#[derive(Clone, Debug)]
pub struct BookmarksConfig {
    /// One `<player>.json` per player lives here.
    pub dir: PathBuf,
    pub on_corrupt: CorruptPolicy,
}

impl Default for BookmarksConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("config/bookmarks"),
            on_corrupt: CorruptPolicy::Empty,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::CorruptPolicy;

    #[test]
    fn policy_parse_accepts_aliases() {
        assert_eq!(CorruptPolicy::parse(" EMPTY "), Some(CorruptPolicy::Empty));
        assert_eq!(CorruptPolicy::parse("error"), Some(CorruptPolicy::Fail));
        assert_eq!(CorruptPolicy::parse("maybe"), None);
        for p in [CorruptPolicy::Empty, CorruptPolicy::Fail] {
            assert_eq!(CorruptPolicy::parse(p.as_str()), Some(p));
        }
    }
}
