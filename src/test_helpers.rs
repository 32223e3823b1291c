//! Shared test utilities for the deck-sheets test suite.
//!
//! Provides an in-memory [`Catalog`], synthetic image bytes, a writer for the
//! on-disk catalog layout, and a [`Progress`] sink that records what it saw.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let catalog = MemoryCatalog::new("demo")
//!     .with_card_size(4, 6)
//!     .deck("base", "monsters", "Monster", "backs/monster.png", &[1, 2, 3]);
//!
//! let progress = RecordingProgress::default();
//! // ... run a stage against `catalog` and `progress` ...
//! assert_eq!(progress.percentages().last(), Some(&100.0));
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use image::{ImageFormat, Rgba, RgbaImage};

use crate::catalog::{
    CardInfo, CardRef, Catalog, CatalogError, CollectionInfo, DeckInfo, GameInfo, ImageData,
};
use crate::progress::{Progress, ProgressEvent};

// =========================================================================
// Synthetic images
// =========================================================================

/// Encode a solid-color opaque PNG.
pub fn png_bytes(width: u32, height: u32, rgb: [u8; 3]) -> Vec<u8> {
    let img = RgbaImage::from_pixel(width, height, Rgba([rgb[0], rgb[1], rgb[2], 255]));
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, ImageFormat::Png).unwrap();
    buf.into_inner()
}

/// Distinct, stable fill color for a card id.
pub fn card_color(card_id: u64) -> [u8; 3] {
    [
        (card_id * 40 % 256) as u8,
        (card_id * 90 % 256) as u8,
        200,
    ]
}

/// Gray used for generated backside images.
pub const BACKSIDE_GRAY: [u8; 3] = [200, 200, 200];

// =========================================================================
// On-disk catalog fixtures
// =========================================================================

/// Write one deck directory: `deck.json`, `cards.json` and a `card-{id}.png`
/// per card, filled with [`card_color`].
pub fn write_dir_catalog_deck(
    dir: &Path,
    type_name: &str,
    backside: &str,
    cards: &[(u64, &str)],
    size: (u32, u32),
) {
    fs::create_dir_all(dir).unwrap();
    let deck = serde_json::json!({ "type": type_name, "backside": backside });
    fs::write(dir.join("deck.json"), deck.to_string()).unwrap();

    let entries: Vec<serde_json::Value> = cards
        .iter()
        .map(|(id, name)| {
            serde_json::json!({
                "id": id,
                "name": name,
                "image": format!("card-{id}.png"),
            })
        })
        .collect();
    fs::write(
        dir.join("cards.json"),
        serde_json::Value::Array(entries).to_string(),
    )
    .unwrap();

    for (id, _) in cards {
        fs::write(
            dir.join(format!("card-{id}.png")),
            png_bytes(size.0, size.1, card_color(*id)),
        )
        .unwrap();
    }
}

// =========================================================================
// MemoryCatalog
// =========================================================================

struct MemoryCard {
    info: CardInfo,
    image: Option<Vec<u8>>,
}

struct MemoryDeck {
    info: DeckInfo,
    backside_image: Vec<u8>,
    cards: Vec<MemoryCard>,
}

struct MemoryCollection {
    id: String,
    decks: Vec<MemoryDeck>,
}

/// In-memory catalog for one game, built with chained calls.
///
/// Collections and decks keep insertion order. Card images are generated at
/// the card size in effect when [`MemoryCatalog::deck`] is called.
pub struct MemoryCatalog {
    game: GameInfo,
    card_size: (u32, u32),
    collections: Vec<MemoryCollection>,
}

impl MemoryCatalog {
    pub fn new(game_id: &str) -> Self {
        Self {
            game: GameInfo {
                id: game_id.to_string(),
                name: game_id.to_string(),
                description: String::new(),
            },
            card_size: (4, 6),
            collections: Vec::new(),
        }
    }

    pub fn with_game_name(mut self, name: &str) -> Self {
        self.game.name = name.to_string();
        self
    }

    pub fn with_card_size(mut self, width: u32, height: u32) -> Self {
        self.card_size = (width, height);
        self
    }

    /// Add a deck to `collection` (created on first use). Cards are named
    /// `"Card {id}"`.
    pub fn deck(
        mut self,
        collection: &str,
        deck_id: &str,
        type_name: &str,
        backside: &str,
        card_ids: &[u64],
    ) -> Self {
        let (w, h) = self.card_size;
        let deck = MemoryDeck {
            info: DeckInfo {
                id: deck_id.to_string(),
                type_name: type_name.to_string(),
                backside: backside.to_string(),
            },
            backside_image: png_bytes(w, h, BACKSIDE_GRAY),
            cards: card_ids
                .iter()
                .map(|&id| MemoryCard {
                    info: CardInfo {
                        id,
                        name: format!("Card {id}"),
                        description: String::new(),
                        variables: BTreeMap::new(),
                    },
                    image: Some(png_bytes(w, h, card_color(id))),
                })
                .collect(),
        };

        match self.collections.iter_mut().find(|c| c.id == collection) {
            Some(existing) => existing.decks.push(deck),
            None => self.collections.push(MemoryCollection {
                id: collection.to_string(),
                decks: vec![deck],
            }),
        }
        self
    }

    pub fn with_variables(mut self, deck_id: &str, card_id: u64, vars: &[(&str, &str)]) -> Self {
        let card = self.card_mut(deck_id, card_id);
        for (k, v) in vars {
            card.info.variables.insert(k.to_string(), v.to_string());
        }
        self
    }

    pub fn with_description(mut self, deck_id: &str, card_id: u64, text: &str) -> Self {
        self.card_mut(deck_id, card_id).info.description = text.to_string();
        self
    }

    pub fn with_card_image(mut self, deck_id: &str, card_id: u64, bytes: Vec<u8>) -> Self {
        self.card_mut(deck_id, card_id).image = Some(bytes);
        self
    }

    pub fn remove_card_image(mut self, deck_id: &str, card_id: u64) -> Self {
        self.card_mut(deck_id, card_id).image = None;
        self
    }

    pub fn with_backside_image(mut self, deck_id: &str, bytes: Vec<u8>) -> Self {
        self.deck_mut(deck_id).backside_image = bytes;
        self
    }

    fn deck_mut(&mut self, deck_id: &str) -> &mut MemoryDeck {
        self.collections
            .iter_mut()
            .flat_map(|c| c.decks.iter_mut())
            .find(|d| d.info.id == deck_id)
            .unwrap_or_else(|| panic!("deck '{deck_id}' not in memory catalog"))
    }

    fn card_mut(&mut self, deck_id: &str, card_id: u64) -> &mut MemoryCard {
        self.deck_mut(deck_id)
            .cards
            .iter_mut()
            .find(|c| c.info.id == card_id)
            .unwrap_or_else(|| panic!("card {card_id} not in deck '{deck_id}'"))
    }

    fn find_collection(
        &self,
        game_id: &str,
        collection_id: &str,
    ) -> Result<&MemoryCollection, CatalogError> {
        self.game(game_id)?;
        self.collections
            .iter()
            .find(|c| c.id == collection_id)
            .ok_or_else(|| CatalogError::CollectionNotFound {
                game: game_id.to_string(),
                collection: collection_id.to_string(),
            })
    }

    fn find_deck(
        &self,
        game_id: &str,
        collection_id: &str,
        deck_id: &str,
    ) -> Result<&MemoryDeck, CatalogError> {
        self.find_collection(game_id, collection_id)?
            .decks
            .iter()
            .find(|d| d.info.id == deck_id)
            .ok_or_else(|| CatalogError::DeckNotFound {
                game: game_id.to_string(),
                collection: collection_id.to_string(),
                deck: deck_id.to_string(),
            })
    }

    fn find_card(&self, card: &CardRef) -> Result<&MemoryCard, CatalogError> {
        self.find_deck(&card.game_id, &card.collection_id, &card.deck_id)?
            .cards
            .iter()
            .find(|c| c.info.id == card.card_id)
            .ok_or_else(|| CatalogError::CardNotFound(card.clone()))
    }
}

impl Catalog for MemoryCatalog {
    fn game(&self, game_id: &str) -> Result<GameInfo, CatalogError> {
        if game_id != self.game.id {
            return Err(CatalogError::GameNotFound(game_id.to_string()));
        }
        Ok(self.game.clone())
    }

    fn list_collections(&self, game_id: &str) -> Result<Vec<CollectionInfo>, CatalogError> {
        self.game(game_id)?;
        Ok(self
            .collections
            .iter()
            .map(|c| CollectionInfo {
                id: c.id.clone(),
                name: c.id.clone(),
            })
            .collect())
    }

    fn list_decks(
        &self,
        game_id: &str,
        collection_id: &str,
    ) -> Result<Vec<DeckInfo>, CatalogError> {
        let collection = self.find_collection(game_id, collection_id)?;
        Ok(collection.decks.iter().map(|d| d.info.clone()).collect())
    }

    fn list_cards(
        &self,
        game_id: &str,
        collection_id: &str,
        deck_id: &str,
    ) -> Result<Vec<CardInfo>, CatalogError> {
        let deck = self.find_deck(game_id, collection_id, deck_id)?;
        Ok(deck.cards.iter().map(|c| c.info.clone()).collect())
    }

    fn card(&self, card: &CardRef) -> Result<CardInfo, CatalogError> {
        Ok(self.find_card(card)?.info.clone())
    }

    fn card_image(&self, card: &CardRef) -> Result<ImageData, CatalogError> {
        match &self.find_card(card)?.image {
            Some(bytes) => Ok(ImageData::new(bytes.clone())),
            None => Err(CatalogError::ImageNotFound(PathBuf::from(card.to_string()))),
        }
    }

    fn deck_backside_image(
        &self,
        game_id: &str,
        collection_id: &str,
        deck_id: &str,
    ) -> Result<ImageData, CatalogError> {
        let deck = self.find_deck(game_id, collection_id, deck_id)?;
        Ok(ImageData::new(deck.backside_image.clone()))
    }
}

// =========================================================================
// RecordingProgress
// =========================================================================

/// Progress sink that keeps every event for later assertions.
#[derive(Default)]
pub struct RecordingProgress {
    events: Mutex<Vec<ProgressEvent>>,
}

impl RecordingProgress {
    pub fn events(&self) -> Vec<ProgressEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn percentages(&self) -> Vec<f32> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                ProgressEvent::Progress(p) => Some(p),
                _ => None,
            })
            .collect()
    }

    pub fn messages(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                ProgressEvent::Message(m) => Some(m),
                _ => None,
            })
            .collect()
    }

    pub fn types(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                ProgressEvent::Type(t) => Some(t),
                _ => None,
            })
            .collect()
    }

    fn push(&self, event: ProgressEvent) {
        self.events.lock().unwrap().push(event);
    }
}

impl Progress for RecordingProgress {
    fn set_type(&self, value: &str) {
        self.push(ProgressEvent::Type(value.to_string()));
    }

    fn set_message(&self, value: &str) {
        self.push(ProgressEvent::Message(value.to_string()));
    }

    fn set_progress(&self, value: f32) {
        self.push(ProgressEvent::Progress(value));
    }
}
