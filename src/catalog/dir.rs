//! Directory-backed catalog reader.
//!
//! ## Layout
//!
//! ```text
//! catalog/
//! ├── config.toml                    # Generator config (optional)
//! └── demo/                          # Game (directory name = game id)
//!     ├── game.json                  # {"name": "Demo", "description": "..."} (optional)
//!     ├── backs/
//!     │   └── monster.png            # Backside images, referenced from deck.json
//!     └── base/                      # Collection
//!         ├── collection.json        # {"name": "Base set"} (optional)
//!         └── monsters/              # Deck
//!             ├── deck.json          # {"type": "Monster", "backside": "backs/monster.png"}
//!             ├── cards.json         # [{"id": 1, "name": "Goblin", "image": "goblin.png", ...}]
//!             └── goblin.png
//! ```
//!
//! Collections and decks are listed in directory-name order; cards keep the
//! order of `cards.json`. Backside references are paths relative to the game
//! directory, so two decks pointing at the same file share a deck type.
//! Card images are relative to their deck directory. Both must stay inside
//! that directory: absolute paths and `..` are rejected.
//!
//! `cards.json` is parsed once per deck and kept for the lifetime of the
//! reader. Card ids must be unique within a deck.

use super::{
    CardInfo, CardRef, Catalog, CatalogError, CollectionInfo, DeckInfo, GameInfo, ImageData,
};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::sync::{Arc, Mutex};
use walkdir::WalkDir;

const GAME_FILE: &str = "game.json";
const COLLECTION_FILE: &str = "collection.json";
const DECK_FILE: &str = "deck.json";
const CARDS_FILE: &str = "cards.json";

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct GameFile {
    name: Option<String>,
    description: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CollectionFile {
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DeckFile {
    /// Visual deck type; defaults to the deck directory name.
    #[serde(rename = "type", default)]
    type_name: Option<String>,
    backside: String,
}

#[derive(Debug, Clone, Deserialize)]
struct CardEntry {
    id: u64,
    #[serde(default)]
    name: String,
    #[serde(default)]
    description: String,
    image: String,
    #[serde(default)]
    variables: BTreeMap<String, String>,
}

impl CardEntry {
    fn info(&self) -> CardInfo {
        CardInfo {
            id: self.id,
            name: self.name.clone(),
            description: self.description.clone(),
            variables: self.variables.clone(),
        }
    }
}

/// Catalog reading the directory tree described in the [module docs](self).
#[derive(Debug)]
pub struct DirCatalog {
    root: PathBuf,
    /// Parsed `cards.json` per deck directory.
    cards: Mutex<HashMap<PathBuf, Arc<Vec<CardEntry>>>>,
}

impl DirCatalog {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            cards: Mutex::new(HashMap::new()),
        }
    }

    fn game_dir(&self, game_id: &str) -> Result<PathBuf, CatalogError> {
        let dir = self.root.join(game_id);
        if !is_valid_id(game_id) || !dir.is_dir() {
            return Err(CatalogError::GameNotFound(game_id.to_string()));
        }
        Ok(dir)
    }

    fn collection_dir(&self, game_id: &str, collection_id: &str) -> Result<PathBuf, CatalogError> {
        let dir = self.game_dir(game_id)?.join(collection_id);
        if !is_valid_id(collection_id) || !dir.is_dir() {
            return Err(CatalogError::CollectionNotFound {
                game: game_id.to_string(),
                collection: collection_id.to_string(),
            });
        }
        Ok(dir)
    }

    fn deck_dir(
        &self,
        game_id: &str,
        collection_id: &str,
        deck_id: &str,
    ) -> Result<PathBuf, CatalogError> {
        let dir = self.collection_dir(game_id, collection_id)?.join(deck_id);
        if !is_valid_id(deck_id) || !dir.join(DECK_FILE).is_file() {
            return Err(CatalogError::DeckNotFound {
                game: game_id.to_string(),
                collection: collection_id.to_string(),
                deck: deck_id.to_string(),
            });
        }
        Ok(dir)
    }

    /// Entries of `deck_dir/cards.json`, parsed and validated on first use.
    fn deck_cards(&self, deck_dir: &Path) -> Result<Arc<Vec<CardEntry>>, CatalogError> {
        let mut cache = self
            .cards
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(entries) = cache.get(deck_dir) {
            return Ok(Arc::clone(entries));
        }

        let path = deck_dir.join(CARDS_FILE);
        let entries: Vec<CardEntry> = read_optional_json(&path)?;
        let mut seen = HashSet::new();
        for entry in &entries {
            if !seen.insert(entry.id) {
                return Err(CatalogError::DuplicateCard {
                    path,
                    id: entry.id,
                });
            }
            check_reference(&entry.image, &path)?;
        }

        let entries = Arc::new(entries);
        cache.insert(deck_dir.to_path_buf(), Arc::clone(&entries));
        Ok(entries)
    }

    fn find_card(&self, card: &CardRef) -> Result<(PathBuf, CardEntry), CatalogError> {
        let deck_dir = self.deck_dir(&card.game_id, &card.collection_id, &card.deck_id)?;
        let entry = self
            .deck_cards(&deck_dir)?
            .iter()
            .find(|e| e.id == card.card_id)
            .cloned()
            .ok_or_else(|| CatalogError::CardNotFound(card.clone()))?;
        Ok((deck_dir, entry))
    }
}

impl Catalog for DirCatalog {
    fn game(&self, game_id: &str) -> Result<GameInfo, CatalogError> {
        let dir = self.game_dir(game_id)?;
        let file: GameFile = read_optional_json(&dir.join(GAME_FILE))?;
        Ok(GameInfo {
            id: game_id.to_string(),
            name: file.name.unwrap_or_else(|| game_id.to_string()),
            description: file.description,
        })
    }

    fn list_collections(&self, game_id: &str) -> Result<Vec<CollectionInfo>, CatalogError> {
        let game_dir = self.game_dir(game_id)?;
        let mut collections = Vec::new();
        for id in subdirectories(&game_dir)? {
            let dir = game_dir.join(&id);
            // Collections are directories holding at least one deck; this
            // skips asset folders such as `backs/`.
            if subdirectories(&dir)?
                .iter()
                .all(|deck| !dir.join(deck).join(DECK_FILE).is_file())
            {
                continue;
            }
            let file: CollectionFile = read_optional_json(&dir.join(COLLECTION_FILE))?;
            collections.push(CollectionInfo {
                name: file.name.unwrap_or_else(|| id.clone()),
                id,
            });
        }
        Ok(collections)
    }

    fn list_decks(
        &self,
        game_id: &str,
        collection_id: &str,
    ) -> Result<Vec<DeckInfo>, CatalogError> {
        let collection_dir = self.collection_dir(game_id, collection_id)?;
        let mut decks = Vec::new();
        for id in subdirectories(&collection_dir)? {
            let deck_file = collection_dir.join(&id).join(DECK_FILE);
            if !deck_file.is_file() {
                continue;
            }
            let file: DeckFile = read_json(&deck_file)?;
            decks.push(DeckInfo {
                type_name: file.type_name.unwrap_or_else(|| id.clone()),
                backside: file.backside,
                id,
            });
        }
        Ok(decks)
    }

    fn list_cards(
        &self,
        game_id: &str,
        collection_id: &str,
        deck_id: &str,
    ) -> Result<Vec<CardInfo>, CatalogError> {
        let deck_dir = self.deck_dir(game_id, collection_id, deck_id)?;
        Ok(self
            .deck_cards(&deck_dir)?
            .iter()
            .map(CardEntry::info)
            .collect())
    }

    fn card(&self, card: &CardRef) -> Result<CardInfo, CatalogError> {
        let (_, entry) = self.find_card(card)?;
        Ok(entry.info())
    }

    fn card_image(&self, card: &CardRef) -> Result<ImageData, CatalogError> {
        let (deck_dir, entry) = self.find_card(card)?;
        read_image(&deck_dir.join(&entry.image))
    }

    fn deck_backside_image(
        &self,
        game_id: &str,
        collection_id: &str,
        deck_id: &str,
    ) -> Result<ImageData, CatalogError> {
        let deck_dir = self.deck_dir(game_id, collection_id, deck_id)?;
        let deck_file = deck_dir.join(DECK_FILE);
        let file: DeckFile = read_json(&deck_file)?;
        check_reference(&file.backside, &deck_file)?;
        read_image(&self.game_dir(game_id)?.join(&file.backside))
    }

    fn root_dir(&self) -> Option<&Path> {
        Some(&self.root)
    }
}

/// Ids are single path components; anything else can never name an entry.
fn is_valid_id(id: &str) -> bool {
    !id.is_empty() && id != "." && id != ".." && !id.contains(['/', '\\'])
}

/// File references are relative paths made of plain components only.
fn check_reference(reference: &str, declared_in: &Path) -> Result<(), CatalogError> {
    let path = Path::new(reference);
    let plain = !reference.is_empty()
        && path
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
    if plain {
        Ok(())
    } else {
        Err(CatalogError::InvalidReference {
            path: declared_in.to_path_buf(),
            reference: reference.to_string(),
        })
    }
}

/// Non-hidden subdirectory names of `path`, sorted by name.
fn subdirectories(path: &Path) -> Result<Vec<String>, CatalogError> {
    let mut names = Vec::new();
    for entry in WalkDir::new(path)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry.map_err(|e| CatalogError::Io {
            path: path.to_path_buf(),
            source: e.into(),
        })?;
        if !entry.file_type().is_dir() {
            continue;
        }
        match entry.file_name().to_str() {
            Some(name) if !name.starts_with('.') => names.push(name.to_string()),
            _ => {}
        }
    }
    Ok(names)
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, CatalogError> {
    let content = fs::read_to_string(path).map_err(|source| CatalogError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&content).map_err(|source| CatalogError::Json {
        path: path.to_path_buf(),
        source,
    })
}

/// Like [`read_json`], but a missing file yields the default value.
fn read_optional_json<T: DeserializeOwned + Default>(path: &Path) -> Result<T, CatalogError> {
    if !path.exists() {
        return Ok(T::default());
    }
    read_json(path)
}

fn read_image(path: &Path) -> Result<ImageData, CatalogError> {
    if !path.is_file() {
        return Err(CatalogError::ImageNotFound(path.to_path_buf()));
    }
    let bytes = fs::read(path).map_err(|source| CatalogError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(ImageData::new(bytes))
}
