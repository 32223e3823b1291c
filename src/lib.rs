//! # Deck Sheets
//!
//! Packs the card images of a game into sheet images and writes a scene
//! descriptor for a tabletop simulator that slices those sheets back into
//! cards. The catalog is the data source: games hold collections, collections
//! hold decks, decks hold cards with an image each.
//!
//! # Architecture: Collect Once, Render Twice
//!
//! ```text
//! 1. Collect   catalog   →  DeckArray      (deck types → pages of card refs)
//! 2. Compose   DeckArray →  *.png          (one sheet per page, in parallel)
//! 3. Scene     DeckArray →  decks.json     (bag / deck / card objects)
//! ```
//!
//! Both render passes read the same [`collector::DeckArray`] and derive file
//! names and grids from the same functions ([`naming`], [`grid`]), so every
//! `FaceURL` in the scene resolves to a sheet the compositor wrote and every
//! `CardID` points at the cell that holds the card.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`catalog`] | Read-only card catalog trait and the directory-backed reader |
//! | [`collector`] | Groups decks by (type, backside) and splits them into pages |
//! | [`grid`] | Smallest grid within bounds for a page |
//! | [`imaging`] | Decode, fit, darken and place card images on a sheet canvas |
//! | [`compose`] | Renders every page of a `DeckArray` to a PNG sheet |
//! | [`scene`] | Builds and writes the scene descriptor |
//! | [`naming`] | Sheet, backside and scene file names |
//! | [`generate`] | Runs collect, compose and scene into an atomically replaced results directory |
//! | [`config`] | `config.toml` loading, merging and validation |
//! | [`progress`] | Stage, message and percentage reporting |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Pages Are Global in the Scene
//!
//! A card's id is `page * 100 + index`. Pages are numbered across the whole
//! run, not per deck type, so ids never collide when several deck types end
//! up in one scene. Sheet file names keep the per-deck-type page index.
//!
//! ## Deterministic Output
//!
//! Deck types live in a `BTreeMap`, card variables are sorted, GUIDs come from
//! a counter. Two runs over the same catalog produce byte-identical scenes.

pub mod catalog;
pub mod collector;
pub mod compose;
pub mod config;
pub mod generate;
pub mod grid;
pub mod imaging;
pub mod naming;
pub mod output;
pub mod progress;
pub mod scene;

#[cfg(test)]
pub(crate) mod test_helpers;
