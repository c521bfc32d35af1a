use crate::error::{Error, ErrorKind};
use derive_more::Display;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Kind of list entry, spelled the way the API spells it in request paths.
#[derive(Clone, Copy, Debug, Display, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryType {
    #[display("anime")]
    Anime,
    #[display("manga")]
    Manga,
}
impl EntryType {
    pub const ALL: [Self; 2] = [Self::Anime, Self::Manga];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Anime => "anime",
            Self::Manga => "manga",
        }
    }
}
impl FromStr for EntryType {
    type Err = Error;

    /// Case-sensitive: `"Anime"` is rejected just like the API would.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "anime" => Ok(Self::Anime),
            "manga" => Ok(Self::Manga),
            other => exn::bail!(ErrorKind::InvalidEntryType(other.to_string())),
        }
    }
}

/// A single anime or manga, identified by its MyAnimeList ID.
#[derive(Clone, Copy, Debug, Display, Eq, Hash, PartialEq)]
#[display("{kind}/{id}")]
pub struct EntryRef {
    pub id: u64,
    pub kind: EntryType,
}
impl EntryRef {
    pub fn new(id: u64, kind: EntryType) -> Self {
        Self { id, kind }
    }

    pub fn anime(id: u64) -> Self {
        Self::new(id, EntryType::Anime)
    }

    pub fn manga(id: u64) -> Self {
        Self::new(id, EntryType::Manga)
    }
}
