//! Deck collection and pagination.
//!
//! Walks the catalog for one game and groups its cards into deck types. A
//! deck type is identified by its visual type name plus its backside
//! reference, so decks from different collections that look the same end up
//! on the same sheets. Each deck type's cards are split into pages of at most
//! `max_cards` cards, filled in catalog order.
//!
//! ```text
//! DeckArray
//! ├── (Hero, backs/hero.png)       → [page 1: 12 cards]
//! └── (Monster, backs/monster.png) → [page 1: 69 cards, page 2: 4 cards]
//! ```
//!
//! Deck types are kept in a `BTreeMap`, so iteration order (and therefore the
//! order of sheets and scene objects) is the same on every run.

use crate::catalog::{CardRef, Catalog, CatalogError};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::debug;

/// Deduplication key of a deck: type name plus backside reference.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct DeckType {
    pub name: String,
    pub backside: String,
}

impl DeckType {
    pub fn new(name: impl Into<String>, backside: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            backside: backside.into(),
        }
    }
}

/// Cards of one deck type that share a sheet image.
pub type Page = Vec<CardRef>;

/// All deck types of a generation run, each split into pages.
///
/// Built once by [`collect_decks`] and read-only afterwards.
#[derive(Debug, Clone)]
pub struct DeckArray {
    decks: BTreeMap<DeckType, Vec<Page>>,
    max_cards: usize,
    total_cards: usize,
}

impl DeckArray {
    /// Create an empty array whose pages hold at most `max_cards` cards.
    ///
    /// # Panics
    ///
    /// Panics if `max_cards` is zero.
    pub fn new(max_cards: usize) -> Self {
        assert!(max_cards > 0, "max_cards must be positive");
        Self {
            decks: BTreeMap::new(),
            max_cards,
            total_cards: 0,
        }
    }

    /// Register a deck type (idempotent) and return a handle for adding cards.
    ///
    /// Selecting the same `(name, backside)` twice hands out the same page
    /// list, which is what merges decks across collections.
    pub fn select_deck(&mut self, deck_type: DeckType) -> DeckCards<'_> {
        let pages = self.decks.entry(deck_type).or_default();
        DeckCards {
            pages,
            total_cards: &mut self.total_cards,
            max_cards: self.max_cards,
        }
    }

    /// Deck types with their pages, in deterministic order.
    pub fn iter(&self) -> impl Iterator<Item = (&DeckType, &[Page])> {
        self.decks.iter().map(|(t, pages)| (t, pages.as_slice()))
    }

    /// `(deck type, 1-based page index, page)` for every page, in order.
    pub fn pages(&self) -> impl Iterator<Item = (&DeckType, usize, &Page)> {
        self.iter()
            .flat_map(|(t, pages)| pages.iter().enumerate().map(move |(i, p)| (t, i + 1, p)))
    }

    pub fn pages_of(&self, deck_type: &DeckType) -> Option<&[Page]> {
        self.decks.get(deck_type).map(Vec::as_slice)
    }

    pub fn deck_type_count(&self) -> usize {
        self.decks.len()
    }

    pub fn page_count(&self) -> usize {
        self.decks.values().map(Vec::len).sum()
    }

    /// Number of cards added across all deck types.
    pub fn total_cards(&self) -> usize {
        self.total_cards
    }

    pub fn is_empty(&self) -> bool {
        self.total_cards == 0
    }
}

/// Handle to one deck type's pages, returned by [`DeckArray::select_deck`].
pub struct DeckCards<'a> {
    pages: &'a mut Vec<Page>,
    total_cards: &'a mut usize,
    max_cards: usize,
}

impl DeckCards<'_> {
    /// Append a card to the last page, starting a new page when it is full.
    pub fn add_card(&mut self, card: CardRef) {
        match self.pages.last_mut() {
            Some(page) if page.len() < self.max_cards => page.push(card),
            _ => self.pages.push(vec![card]),
        }
        *self.total_cards += 1;
    }
}

/// Walk every collection and deck of `game_id` and paginate its cards.
///
/// Deck types that end up without cards are not registered, so every page in
/// the result holds at least one card.
#[tracing::instrument(skip(catalog))]
pub fn collect_decks(
    catalog: &impl Catalog,
    game_id: &str,
    max_cards: usize,
) -> Result<DeckArray, CatalogError> {
    let game = catalog.game(game_id)?;
    let mut deck_array = DeckArray::new(max_cards);

    for collection in catalog.list_collections(&game.id)? {
        for deck in catalog.list_decks(&game.id, &collection.id)? {
            let cards = catalog.list_cards(&game.id, &collection.id, &deck.id)?;
            debug!(
                collection = %collection.id,
                deck = %deck.id,
                cards = cards.len(),
                "collected deck"
            );
            if cards.is_empty() {
                continue;
            }
            let mut slot = deck_array.select_deck(DeckType::new(deck.type_name, deck.backside));
            for card in cards {
                slot.add_card(CardRef {
                    game_id: game.id.clone(),
                    collection_id: collection.id.clone(),
                    deck_id: deck.id.clone(),
                    card_id: card.id,
                });
            }
        }
    }

    Ok(deck_array)
}
