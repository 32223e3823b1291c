//! Read-only access to the card database.
//!
//! The card database is a hierarchy `game → collection → deck → card`, where
//! every deck has a backside image and every card has a face image. The
//! generator only ever reads from it, through the [`Catalog`] trait, so the
//! storage behind it is interchangeable. The production implementation is
//! [`DirCatalog`], which reads a directory tree; tests use an in-memory one.
//!
//! ## Error taxonomy
//!
//! Missing entities are reported as the *not-found* variants of
//! [`CatalogError`], each naming the full reference that failed. Unreadable
//! files and malformed metadata are reported as `Io` / `Json`; metadata that
//! parses but is inconsistent (duplicate card ids, file references escaping the
//! catalog) has its own variants. Decoding the
//! image bytes is not the catalog's job; see [`crate::imaging`].

mod dir;

pub use dir::DirCatalog;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Game not found: {0}")]
    GameNotFound(String),
    #[error("Collection not found: {game}/{collection}")]
    CollectionNotFound { game: String, collection: String },
    #[error("Deck not found: {game}/{collection}/{deck}")]
    DeckNotFound {
        game: String,
        collection: String,
        deck: String,
    },
    #[error("Card not found: {0}")]
    CardNotFound(CardRef),
    #[error("Image not found: {0}")]
    ImageNotFound(PathBuf),
    #[error("Duplicate card id {id} in {path}")]
    DuplicateCard { path: PathBuf, id: u64 },
    #[error("Invalid file reference {reference:?} in {path}: must be a relative path without '..'")]
    InvalidReference { path: PathBuf, reference: String },
    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Malformed metadata in {path}: {source}")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// Locator for a single card. Carries no image data.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CardRef {
    pub game_id: String,
    pub collection_id: String,
    pub deck_id: String,
    pub card_id: u64,
}

impl fmt::Display for CardRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}#{}",
            self.game_id, self.collection_id, self.deck_id, self.card_id
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameInfo {
    pub id: String,
    pub name: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionInfo {
    pub id: String,
    pub name: String,
}

/// A deck inside a collection.
///
/// `type_name` and `backside` together identify the visual deck type; decks
/// from different collections that agree on both are packed together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeckInfo {
    pub id: String,
    pub type_name: String,
    /// Reference to the backside image (URL or catalog-relative path).
    pub backside: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardInfo {
    pub id: u64,
    pub name: String,
    pub description: String,
    /// Script variables, kept sorted by key.
    pub variables: BTreeMap<String, String>,
}

/// Raw image bytes as stored in the catalog.
#[derive(Debug, Clone)]
pub struct ImageData {
    pub bytes: Vec<u8>,
    /// Format sniffed from the bytes; `None` when unrecognized.
    pub format: Option<image::ImageFormat>,
}

impl ImageData {
    pub fn new(bytes: Vec<u8>) -> Self {
        let format = image::guess_format(&bytes).ok();
        Self { bytes, format }
    }
}

/// Read interface over the card database.
///
/// Listing order is the catalog's native order; the generator preserves it
/// when filling pages. Implementations must be `Sync` because pages are
/// composited on a thread pool.
pub trait Catalog: Sync {
    /// Look up a game.
    fn game(&self, game_id: &str) -> Result<GameInfo, CatalogError>;

    fn list_collections(&self, game_id: &str) -> Result<Vec<CollectionInfo>, CatalogError>;

    fn list_decks(&self, game_id: &str, collection_id: &str)
    -> Result<Vec<DeckInfo>, CatalogError>;

    fn list_cards(
        &self,
        game_id: &str,
        collection_id: &str,
        deck_id: &str,
    ) -> Result<Vec<CardInfo>, CatalogError>;

    /// Metadata of a single card (name, description, script variables).
    fn card(&self, card: &CardRef) -> Result<CardInfo, CatalogError>;

    /// Face image of a card.
    fn card_image(&self, card: &CardRef) -> Result<ImageData, CatalogError>;

    /// Backside image of a deck.
    fn deck_backside_image(
        &self,
        game_id: &str,
        collection_id: &str,
        deck_id: &str,
    ) -> Result<ImageData, CatalogError>;

    /// Directory the catalog is stored in, when it lives on disk.
    fn root_dir(&self) -> Option<&Path> {
        None
    }
}
