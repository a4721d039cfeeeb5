use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(pub i64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

id_newtype!(UserId);
id_newtype!(EventId);
id_newtype!(ItemId);
id_newtype!(PostId);

/// Which column of a debate a comment belongs to.
///
/// On the wire this is the `onRight` flag: `true` selects the "against" column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Side {
    #[default]
    For,
    Against,
}

impl Side {
    pub fn from_on_right(on_right: bool) -> Self {
        if on_right {
            Side::Against
        } else {
            Side::For
        }
    }

    pub fn on_right(self) -> bool {
        matches!(self, Side::Against)
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::For => f.write_str("For"),
            Side::Against => f.write_str("Against"),
        }
    }
}

impl FromStr for Side {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("for") {
            Ok(Side::For)
        } else if s.eq_ignore_ascii_case("against") {
            Ok(Side::Against)
        } else {
            Err(format!("unknown side '{s}', expected 'for' or 'against'"))
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Vote {
    Up,
    Down,
}

impl FromStr for Vote {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "up" | "upvote" => Ok(Vote::Up),
            "down" | "downvote" => Ok(Vote::Down),
            _ => Err(format!("unknown vote '{s}', expected 'up' or 'down'")),
        }
    }
}
