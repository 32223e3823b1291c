//! Output file names shared by the compositor and the scene serializer.
//!
//! Both passes derive names from the same inputs, so the `FaceURL` written
//! into the scene always points at the sheet the compositor produced.
//!
//! | File | Pattern |
//! |---|---|
//! | Sheet page | `{type}_{page}_{count}_{columns}x{rows}.png` |
//! | Backside | `backside_{type}_{hash}.png` |
//! | Scene | `decks.json` |
//!
//! `{type}` is the deck type name passed through [`clean_title`]; `{page}` is
//! the 1-based page index within the deck type; `{hash}` is the first three
//! bytes of the SHA-256 of the backside reference, in hex.

use crate::collector::DeckType;
use crate::grid::GridSize;
use sha2::{Digest, Sha256};

pub const SCENE_FILE: &str = "decks.json";

/// Make a deck type name safe for use in a file name.
///
/// Slashes and spaces become underscores (`" / "` collapses to one); `!`,
/// `'` and `.` are dropped.
///
/// ```
/// # use deck_sheets::naming::clean_title;
/// assert_eq!(clean_title("Heroes / Villains"), "Heroes_Villains");
/// assert_eq!(clean_title("Don't Panic!"), "Dont_Panic");
/// ```
pub fn clean_title(name: &str) -> String {
    name.replace(" / ", "_")
        .replace(['/', ' '], "_")
        .replace(['!', '\'', '.'], "")
}

pub fn sheet_file_name(type_name: &str, page: usize, count: usize, grid: GridSize) -> String {
    format!("{}_{}_{}_{}.png", clean_title(type_name), page, count, grid)
}

pub fn backside_file_name(deck_type: &DeckType) -> String {
    let digest = Sha256::digest(deck_type.backside.as_bytes());
    let hash: String = digest[..3].iter().map(|b| format!("{b:02x}")).collect();
    format!("backside_{}_{}.png", clean_title(&deck_type.name), hash)
}
