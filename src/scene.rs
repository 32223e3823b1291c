//! Scene descriptor for the tabletop simulator.
//!
//! Walks the same [`DeckArray`] as the compositor and builds the object graph
//! written to `decks.json`:
//!
//! ```text
//! ObjectStates
//! └── Bag (Nickname = game name)
//!     ├── Deck (Nickname = deck type, Description = collection)
//!     │   ├── CustomDeck { page → FaceURL, BackURL, NumWidth, NumHeight }
//!     │   ├── DeckIDs [100, 101, ...]
//!     │   └── ContainedObjects [Card, Card, ...]
//!     └── Card   (a deck with a single card is emitted as the bare card)
//! ```
//!
//! ## Identifiers
//!
//! Pages are numbered from 1 across the whole run, continuing from one deck
//! type to the next. A card's `CardID` is `page * 100 + index_on_page`, which
//! is why a page may hold at most [`MAX_CARDS_PER_PAGE`] cards. `CustomDeck`
//! maps the same page number to the sheet's descriptor.
//!
//! Sheet and backside file names are recomputed with [`crate::naming`] and
//! [`solve_grid`], so they match what the compositor wrote without either
//! pass depending on the other.

use crate::catalog::{CardRef, Catalog, CatalogError};
use crate::collector::DeckArray;
use crate::config::GeneratorConfig;
use crate::grid::{GridBounds, solve_grid};
use crate::naming::{SCENE_FILE, backside_file_name, sheet_file_name};
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// `CardID = page * CARD_ID_STRIDE + index`.
pub const CARD_ID_STRIDE: u32 = 100;

/// Largest page size for which card ids stay unique.
pub const MAX_CARDS_PER_PAGE: usize = CARD_ID_STRIDE as usize - 1;

#[derive(Error, Debug)]
pub enum SceneError {
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error(
        "Page {page} of deck type {deck_type} holds {cards} cards, at most {MAX_CARDS_PER_PAGE} fit the card id scheme"
    )]
    PageTooLarge {
        deck_type: String,
        page: usize,
        cards: usize,
    },
    #[error("Failed to serialize scene: {0}")]
    Json(#[from] serde_json::Error),
    #[error("IO error writing {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

// =============================================================================
// Scene graph types
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Transform {
    pub pos_x: f64,
    pub pos_y: f64,
    pub pos_z: f64,
    pub scale_x: f64,
    pub scale_y: f64,
    pub scale_z: f64,
}

impl Transform {
    pub fn scaled(scale: [f64; 3]) -> Self {
        Self {
            pos_x: 0.0,
            pos_y: 0.0,
            pos_z: 0.0,
            scale_x: scale[0],
            scale_y: scale[1],
            scale_z: scale[2],
        }
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::scaled([1.0, 1.0, 1.0])
    }
}

/// Visual descriptor of one sheet page, shared by every card drawn from it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct DeckDescription {
    #[serde(rename = "FaceURL")]
    pub face_url: String,
    #[serde(rename = "BackURL")]
    pub back_url: String,
    pub num_width: u32,
    pub num_height: u32,
    pub back_is_hidden: bool,
    pub unique_back: bool,
    #[serde(rename = "Type")]
    pub deck_type: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct CardObject {
    #[serde(rename = "GUID")]
    pub guid: String,
    pub nickname: String,
    pub description: String,
    #[serde(rename = "CardID")]
    pub card_id: u32,
    pub lua_script: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transform: Option<Transform>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub custom_deck: BTreeMap<u32, DeckDescription>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct DeckObject {
    pub transform: Transform,
    pub nickname: String,
    pub description: String,
    #[serde(rename = "DeckIDs")]
    pub deck_ids: Vec<u32>,
    pub custom_deck: BTreeMap<u32, DeckDescription>,
    #[serde(serialize_with = "serialize_cards")]
    pub contained_objects: Vec<CardObject>,
}

impl DeckObject {
    pub fn new(nickname: &str, description: &str, transform: Transform) -> Self {
        Self {
            transform,
            nickname: nickname.to_string(),
            description: description.to_string(),
            deck_ids: Vec::new(),
            custom_deck: BTreeMap::new(),
            contained_objects: Vec::new(),
        }
    }

    /// Append a card and record its id in `DeckIDs`.
    pub fn add_card(&mut self, card: CardObject) {
        self.deck_ids.push(card.card_id);
        self.contained_objects.push(card);
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct BagObject {
    pub transform: Transform,
    pub nickname: String,
    pub description: String,
    pub contained_objects: Vec<SceneObject>,
}

/// Any object in the scene, tagged by its `Name` field.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "Name")]
pub enum SceneObject {
    Bag(BagObject),
    Deck(DeckObject),
    Card(CardObject),
}

/// Root of `decks.json`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SceneFile {
    #[serde(rename = "ObjectStates")]
    pub object_states: Vec<SceneObject>,
}

/// Deck contents are always cards; serialize them with their `"Name": "Card"` tag.
fn serialize_cards<S: Serializer>(cards: &[CardObject], serializer: S) -> Result<S::Ok, S::Error> {
    #[derive(Serialize)]
    #[serde(tag = "Name")]
    enum Tagged<'a> {
        Card(&'a CardObject),
    }
    serializer.collect_seq(cards.iter().map(Tagged::Card))
}

// =============================================================================
// Building
// =============================================================================

#[derive(Debug, Clone)]
pub struct SceneOptions {
    pub grid: GridBounds,
    /// Prepended to sheet and backside file names to form `FaceURL`/`BackURL`.
    pub url_prefix: String,
    pub scale: [f64; 3],
}

impl SceneOptions {
    /// Options from config. `url_prefix` is used as configured; callers
    /// substitute the results directory URL when it is empty.
    pub fn from_config(config: &GeneratorConfig) -> Self {
        Self {
            grid: config.grid,
            url_prefix: config.scene.url_prefix.clone(),
            scale: config.scene.scale,
        }
    }
}

/// `file://` URL of a directory, with a trailing slash.
pub fn file_url_prefix(dir: &Path) -> String {
    let mut url = format!("file://{}", dir.display()).replace('\\', "/");
    if !url.ends_with('/') {
        url.push('/');
    }
    url
}

/// Script text of a card: one `key="value"` line per variable, sorted by key.
pub fn lua_script(variables: &BTreeMap<String, String>) -> String {
    variables
        .iter()
        .map(|(key, value)| format!("{key}={}", lua_quote(value)))
        .collect::<Vec<_>>()
        .join("\n")
}

fn lua_quote(value: &str) -> String {
    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('"');
    for c in value.chars() {
        match c {
            '"' => quoted.push_str("\\\""),
            '\\' => quoted.push_str("\\\\"),
            '\n' => quoted.push_str("\\n"),
            '\r' => quoted.push_str("\\r"),
            '\t' => quoted.push_str("\\t"),
            c => quoted.push(c),
        }
    }
    quoted.push('"');
    quoted
}

/// Deck object being filled for one collection of one deck type.
struct OpenDeck {
    collection_id: String,
    deck: DeckObject,
}

/// Move a finished deck into the bag. One card goes in bare, none is dropped.
fn flush(open: Option<OpenDeck>, bag: &mut BagObject) {
    let Some(OpenDeck { mut deck, .. }) = open else {
        return;
    };
    match deck.contained_objects.len() {
        0 => {}
        1 => {
            if let Some(card) = deck.contained_objects.pop() {
                bag.contained_objects.push(SceneObject::Card(card));
            }
        }
        _ => bag.contained_objects.push(SceneObject::Deck(deck)),
    }
}

/// Build the scene graph for `game_id`.
///
/// A new deck object starts whenever the deck type or the card's collection
/// changes, so each deck object holds cards of one collection.
#[tracing::instrument(skip(catalog, decks, options))]
pub fn build_scene(
    catalog: &impl Catalog,
    game_id: &str,
    decks: &DeckArray,
    options: &SceneOptions,
) -> Result<SceneFile, SceneError> {
    let game = catalog.game(game_id)?;
    let transform = Transform::scaled(options.scale);
    let mut bag = BagObject {
        transform: transform.clone(),
        nickname: game.name,
        description: game.description,
        contained_objects: Vec::new(),
    };

    let mut global_page: u32 = 0;
    let mut guid: u32 = 0;

    for (deck_type, pages) in decks.iter() {
        let back_url = format!("{}{}", options.url_prefix, backside_file_name(deck_type));
        let mut open: Option<OpenDeck> = None;

        for (index, page) in pages.iter().enumerate() {
            let page_number = index + 1;
            if page.len() > MAX_CARDS_PER_PAGE {
                return Err(SceneError::PageTooLarge {
                    deck_type: deck_type.name.clone(),
                    page: page_number,
                    cards: page.len(),
                });
            }
            global_page += 1;

            let grid = solve_grid(page.len() as u32 + 1, &options.grid);
            let description = DeckDescription {
                face_url: format!(
                    "{}{}",
                    options.url_prefix,
                    sheet_file_name(&deck_type.name, page_number, page.len(), grid)
                ),
                back_url: back_url.clone(),
                num_width: grid.columns,
                num_height: grid.rows,
                back_is_hidden: true,
                unique_back: false,
                deck_type: 0,
            };

            for (position, card_ref) in page.iter().enumerate() {
                let current = match open.take() {
                    Some(o) if o.collection_id == card_ref.collection_id => open.insert(o),
                    previous => {
                        flush(previous, &mut bag);
                        open.insert(OpenDeck {
                            collection_id: card_ref.collection_id.clone(),
                            deck: DeckObject::new(
                                &deck_type.name,
                                &card_ref.collection_id,
                                transform.clone(),
                            ),
                        })
                    }
                };
                current
                    .deck
                    .custom_deck
                    .entry(global_page)
                    .or_insert_with(|| description.clone());

                let card = card_object(
                    catalog,
                    card_ref,
                    global_page * CARD_ID_STRIDE + position as u32,
                    format!("{guid:06x}"),
                    (global_page, &description),
                    &transform,
                )?;
                guid += 1;
                current.deck.add_card(card);
            }
        }
        flush(open, &mut bag);
        debug!(deck_type = %deck_type.name, pages = pages.len(), "serialized deck type");
    }

    Ok(SceneFile {
        object_states: vec![SceneObject::Bag(bag)],
    })
}

fn card_object(
    catalog: &impl Catalog,
    card_ref: &CardRef,
    card_id: u32,
    guid: String,
    (page, description): (u32, &DeckDescription),
    transform: &Transform,
) -> Result<CardObject, SceneError> {
    let info = catalog.card(card_ref)?;
    Ok(CardObject {
        guid,
        nickname: info.name,
        description: info.description,
        card_id,
        lua_script: lua_script(&info.variables),
        transform: Some(transform.clone()),
        custom_deck: BTreeMap::from([(page, description.clone())]),
    })
}

/// Write the scene as pretty-printed JSON to `dir/decks.json`.
pub fn write_scene(scene: &SceneFile, dir: &Path) -> Result<PathBuf, SceneError> {
    let path = dir.join(SCENE_FILE);
    let json = serde_json::to_string_pretty(scene)?;
    fs::write(&path, json).map_err(|source| SceneError::Io {
        path: path.clone(),
        source,
    })?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::{DeckType, collect_decks};
    use crate::test_helpers::MemoryCatalog;
    use serde_json::{Value, json};

    fn options() -> SceneOptions {
        SceneOptions {
            grid: GridBounds::default(),
            url_prefix: String::new(),
            scale: [1.0, 1.0, 1.0],
        }
    }

    fn scene_of(catalog: &MemoryCatalog, max_cards: usize) -> SceneFile {
        let decks = collect_decks(catalog, "demo", max_cards).unwrap();
        build_scene(catalog, "demo", &decks, &options()).unwrap()
    }

    fn bag(scene: &SceneFile) -> &BagObject {
        match &scene.object_states[..] {
            [SceneObject::Bag(bag)] => bag,
            other => panic!("expected a single bag, got {other:?}"),
        }
    }

    fn all_card_ids(scene: &SceneFile) -> Vec<u32> {
        let mut ids = Vec::new();
        for object in &bag(scene).contained_objects {
            match object {
                SceneObject::Card(card) => ids.push(card.card_id),
                SceneObject::Deck(deck) => ids.extend(&deck.deck_ids),
                SceneObject::Bag(_) => panic!("nested bag"),
            }
        }
        ids
    }

    // =========================================================================
    // Structure
    // =========================================================================

    #[test]
    fn three_cards_make_one_deck() {
        let catalog = MemoryCatalog::new("demo")
            .with_game_name("Dungeon Crawl")
            .deck("base", "monsters", "Monster", "back-m", &[1, 2, 3]);
        let scene = scene_of(&catalog, 69);
        let bag = bag(&scene);
        assert_eq!(bag.nickname, "Dungeon Crawl");
        assert_eq!(bag.contained_objects.len(), 1);

        let SceneObject::Deck(deck) = &bag.contained_objects[0] else {
            panic!("expected deck");
        };
        assert_eq!(deck.nickname, "Monster");
        assert_eq!(deck.description, "base");
        assert_eq!(deck.deck_ids, vec![100, 101, 102]);
        assert_eq!(deck.custom_deck.keys().copied().collect::<Vec<_>>(), vec![1]);

        let page = &deck.custom_deck[&1];
        assert_eq!(page.face_url, "Monster_1_3_2x2.png");
        assert_eq!(
            page.back_url,
            backside_file_name(&DeckType::new("Monster", "back-m"))
        );
        assert_eq!((page.num_width, page.num_height), (2, 2));
    }

    #[test]
    fn single_card_deck_collapses_to_card() {
        let catalog =
            MemoryCatalog::new("demo").deck("base", "boss", "Boss", "back-b", &[7]);
        let scene = scene_of(&catalog, 69);
        let bag = bag(&scene);
        assert_eq!(bag.contained_objects.len(), 1);
        let SceneObject::Card(card) = &bag.contained_objects[0] else {
            panic!("single card must not be wrapped in a deck");
        };
        assert_eq!(card.nickname, "Card 7");
        assert_eq!(card.card_id, 100);
        assert!(card.custom_deck.contains_key(&1));
    }

    #[test]
    fn collection_change_starts_new_deck() {
        let catalog = MemoryCatalog::new("demo")
            .deck("base", "monsters", "Monster", "back-m", &[1, 2])
            .deck("expansion", "more", "Monster", "back-m", &[3, 4]);
        let scene = scene_of(&catalog, 69);
        let objects = &bag(&scene).contained_objects;
        assert_eq!(objects.len(), 2);

        let descriptions: Vec<&str> = objects
            .iter()
            .map(|o| match o {
                SceneObject::Deck(d) => d.description.as_str(),
                _ => panic!("expected decks"),
            })
            .collect();
        assert_eq!(descriptions, vec!["base", "expansion"]);
        // same page, so ids continue
        assert_eq!(all_card_ids(&scene), vec![100, 101, 102, 103]);
    }

    #[test]
    fn collection_remainder_of_one_collapses() {
        let catalog = MemoryCatalog::new("demo")
            .deck("base", "monsters", "Monster", "back-m", &[1, 2])
            .deck("expansion", "more", "Monster", "back-m", &[3]);
        let scene = scene_of(&catalog, 69);
        let objects = &bag(&scene).contained_objects;
        assert!(matches!(objects[0], SceneObject::Deck(_)));
        assert!(matches!(objects[1], SceneObject::Card(ref c) if c.card_id == 102));
    }

    #[test]
    fn page_break_inside_deck_adds_custom_deck_entry() {
        let catalog = MemoryCatalog::new("demo").deck(
            "base",
            "monsters",
            "Monster",
            "back-m",
            &[1, 2, 3, 4, 5],
        );
        let scene = scene_of(&catalog, 2);
        let SceneObject::Deck(deck) = &bag(&scene).contained_objects[0] else {
            panic!("expected deck");
        };
        assert_eq!(deck.deck_ids, vec![100, 101, 200, 201, 300]);
        assert_eq!(
            deck.custom_deck.keys().copied().collect::<Vec<_>>(),
            vec![1, 2, 3]
        );
        assert_eq!(deck.custom_deck[&3].face_url, "Monster_3_1_2x2.png");
    }

    // =========================================================================
    // Identifiers
    // =========================================================================

    #[test]
    fn page_numbers_continue_across_deck_types() {
        let catalog = MemoryCatalog::new("demo")
            .deck("base", "monsters", "Monster", "back-m", &[1, 2, 3])
            .deck("base", "heroes", "Hero", "back-h", &[4, 5, 6]);
        let scene = scene_of(&catalog, 2);
        // Hero sorts first: pages 1-2, Monster: pages 3-4
        assert_eq!(
            all_card_ids(&scene),
            vec![100, 101, 200, 300, 301, 400]
        );

        let monster_pages: Vec<String> = bag(&scene)
            .contained_objects
            .iter()
            .filter_map(|o| match o {
                SceneObject::Deck(d) if d.nickname == "Monster" => {
                    Some(d.custom_deck.values().map(|p| p.face_url.clone()).collect::<Vec<_>>())
                }
                _ => None,
            })
            .flatten()
            .collect();
        // file names keep the per-type page index
        assert_eq!(monster_pages, vec!["Monster_1_2_2x2.png", "Monster_2_1_2x2.png"]);
    }

    #[test]
    fn card_ids_unique_across_scene() {
        let mut catalog = MemoryCatalog::new("demo");
        for (i, name) in ["A", "B", "C"].iter().enumerate() {
            let ids: Vec<u64> = (0..150).map(|n| (i as u64) * 1000 + n).collect();
            catalog = catalog.deck("base", &format!("deck-{name}"), name, "back", &ids);
        }
        let scene = scene_of(&catalog, 69);
        let ids = all_card_ids(&scene);
        assert_eq!(ids.len(), 450);
        let unique: std::collections::HashSet<u32> = ids.iter().copied().collect();
        assert_eq!(unique.len(), 450);
    }

    #[test]
    fn guids_are_six_hex_digits_and_unique() {
        let catalog =
            MemoryCatalog::new("demo").deck("base", "monsters", "Monster", "back-m", &[1, 2, 3]);
        let scene = scene_of(&catalog, 69);
        let SceneObject::Deck(deck) = &bag(&scene).contained_objects[0] else {
            panic!("expected deck");
        };
        let guids: Vec<&str> = deck.contained_objects.iter().map(|c| c.guid.as_str()).collect();
        assert_eq!(guids, vec!["000000", "000001", "000002"]);
    }

    #[test]
    fn oversized_page_is_rejected() {
        let ids: Vec<u64> = (0..100).collect();
        let catalog = MemoryCatalog::new("demo").deck("base", "big", "Big", "back", &ids);
        let decks = collect_decks(&catalog, "demo", 100).unwrap();
        let err = build_scene(&catalog, "demo", &decks, &options()).unwrap_err();
        assert!(matches!(err, SceneError::PageTooLarge { cards: 100, .. }));
    }

    // =========================================================================
    // Script text and URLs
    // =========================================================================

    #[test]
    fn lua_script_is_sorted_and_quoted() {
        let vars = BTreeMap::from([
            ("power".to_string(), "3".to_string()),
            ("name".to_string(), "Big \"Bad\" Wolf".to_string()),
        ]);
        assert_eq!(lua_script(&vars), "name=\"Big \\\"Bad\\\" Wolf\"\npower=\"3\"");
        assert_eq!(lua_script(&BTreeMap::new()), "");
    }

    #[test]
    fn card_carries_variables_and_description() {
        let catalog = MemoryCatalog::new("demo")
            .deck("base", "boss", "Boss", "back-b", &[7])
            .with_variables("boss", 7, &[("hp", "10"), ("atk", "4")])
            .with_description("boss", 7, "Final boss");
        let scene = scene_of(&catalog, 69);
        let SceneObject::Card(card) = &bag(&scene).contained_objects[0] else {
            panic!("expected card");
        };
        assert_eq!(card.lua_script, "atk=\"4\"\nhp=\"10\"");
        assert_eq!(card.description, "Final boss");
    }

    #[test]
    fn url_prefix_is_prepended() {
        let catalog =
            MemoryCatalog::new("demo").deck("base", "monsters", "Monster", "back-m", &[1, 2]);
        let decks = collect_decks(&catalog, "demo", 69).unwrap();
        let opts = SceneOptions {
            url_prefix: "https://cdn.example.com/".into(),
            ..options()
        };
        let scene = build_scene(&catalog, "demo", &decks, &opts).unwrap();
        let SceneObject::Deck(deck) = &bag(&scene).contained_objects[0] else {
            panic!("expected deck");
        };
        assert_eq!(
            deck.custom_deck[&1].face_url,
            "https://cdn.example.com/Monster_1_2_2x2.png"
        );
        assert!(deck.custom_deck[&1].back_url.starts_with("https://cdn.example.com/backside_Monster_"));
    }

    #[test]
    fn file_url_prefix_ends_with_slash() {
        assert_eq!(file_url_prefix(Path::new("/tmp/results")), "file:///tmp/results/");
        assert_eq!(file_url_prefix(Path::new("/tmp/results/")), "file:///tmp/results/");
    }

    // =========================================================================
    // JSON shape
    // =========================================================================

    #[test]
    fn json_uses_target_field_names() {
        let catalog =
            MemoryCatalog::new("demo").deck("base", "monsters", "Monster", "back-m", &[1, 2]);
        let scene = scene_of(&catalog, 69);
        let value: Value = serde_json::to_value(&scene).unwrap();

        let bag = &value["ObjectStates"][0];
        assert_eq!(bag["Name"], "Bag");
        assert_eq!(bag["Transform"]["scaleX"], json!(1.0));

        let deck = &bag["ContainedObjects"][0];
        assert_eq!(deck["Name"], "Deck");
        assert_eq!(deck["DeckIDs"], json!([100, 101]));
        assert_eq!(deck["CustomDeck"]["1"]["FaceURL"], "Monster_1_2_2x2.png");
        assert_eq!(deck["CustomDeck"]["1"]["NumWidth"], 2);
        assert_eq!(deck["CustomDeck"]["1"]["BackIsHidden"], true);
        assert_eq!(deck["CustomDeck"]["1"]["Type"], 0);

        let card = &deck["ContainedObjects"][1];
        assert_eq!(card["Name"], "Card");
        assert_eq!(card["CardID"], 101);
        assert_eq!(card["GUID"], "000001");
        assert_eq!(card["Nickname"], "Card 2");
        assert!(card["CustomDeck"]["1"].is_object());
        assert!(card["Transform"].is_object());
    }

    #[test]
    fn write_scene_creates_decks_json() {
        let catalog =
            MemoryCatalog::new("demo").deck("base", "monsters", "Monster", "back-m", &[1, 2]);
        let scene = scene_of(&catalog, 69);
        let tmp = tempfile::TempDir::new().unwrap();
        let path = write_scene(&scene, tmp.path()).unwrap();
        assert_eq!(path, tmp.path().join("decks.json"));

        let parsed: Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(parsed["ObjectStates"][0]["ContainedObjects"][0]["DeckIDs"][0], 100);
    }

    #[test]
    fn unknown_game_fails() {
        let catalog = MemoryCatalog::new("demo");
        let decks = DeckArray::new(69);
        let err = build_scene(&catalog, "nope", &decks, &options()).unwrap_err();
        assert!(matches!(err, SceneError::Catalog(CatalogError::GameNotFound(_))));
    }
}
