//! Collaborator input files listing the entries to keep up to date.

use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use malmeta_metadata::{EntryRef, EntryType};
use serde::Deserialize;
use std::path::Path;

/// One line of the JSON-lines history file. Lines carry more fields than
/// these; they are ignored.
///
/// The type is kept as a string so a single bad line fails only its own
/// entry, when it is fetched.
#[derive(Debug, Deserialize, PartialEq)]
pub struct HistoryEntry {
    pub entry_id: u64,
    pub e_type: String,
}

/// Entries that exist on MyAnimeList but haven't been approved by its
/// moderators yet.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Unapproved {
    anime: Vec<u64>,
    manga: Vec<u64>,
}

/// Read every entry of a JSON-lines history file, in file order. Blank lines
/// are skipped.
pub fn read_history(path: &Path) -> Result<Vec<HistoryEntry>> {
    let contents = std::fs::read_to_string(path).or_raise(|| ErrorKind::Input(path.to_path_buf()))?;
    contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| serde_json::from_str(line).or_raise(|| ErrorKind::Input(path.to_path_buf())))
        .collect()
}

/// Read the unapproved anime IDs, then the unapproved manga IDs.
pub fn read_unapproved(path: &Path) -> Result<Vec<EntryRef>> {
    let contents = std::fs::read_to_string(path).or_raise(|| ErrorKind::Input(path.to_path_buf()))?;
    let unapproved: Unapproved = serde_json::from_str(&contents).or_raise(|| ErrorKind::Input(path.to_path_buf()))?;
    let anime = unapproved.anime.into_iter().map(|id| EntryRef::new(id, EntryType::Anime));
    let manga = unapproved.manga.into_iter().map(|id| EntryRef::new(id, EntryType::Manga));
    Ok(anime.chain(manga).collect())
}
