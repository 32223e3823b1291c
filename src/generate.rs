//! Generation pipeline.
//!
//! Runs the two passes over one [`DeckArray`] and publishes the results:
//!
//! ```text
//! collect_decks ──► DeckArray ──┬──► compose_sheets ──► *.png
//!                               └──► build_scene    ──► decks.json
//! ```
//!
//! ## Output Structure
//!
//! ```text
//! results/
//! ├── decks.json                      # Scene descriptor
//! ├── backside_Monster_3fa2c1.png     # One per deck type
//! ├── Monster_1_69_10x7.png           # One per page
//! └── Monster_2_4_3x2.png
//! ```
//!
//! ## Atomic Output
//!
//! Both passes write into a sibling staging directory `<results>.partial`.
//! Only when both succeed is the previous results directory replaced by it;
//! on failure the staging directory is removed and the old results stay as
//! they were.
//!
//! The results directory is resolved to an absolute, lexically normalized
//! path first. It is refused when it contains the working directory or the
//! catalog, or when it already exists with content but no `decks.json`.
//!
//! ## Unique File Names
//!
//! Sheet names carry only the cleaned type name, so two deck types can map
//! to the same file (same name with different backsides, or names such as
//! `A B` and `A_B`). [`check`] rejects such a catalog before anything is
//! drawn.

use crate::catalog::{Catalog, CatalogError, GameInfo};
use crate::collector::{DeckArray, DeckType, collect_decks};
use crate::compose::{ComposeError, ComposeOptions, SheetRecord, compose_sheets};
use crate::config::GeneratorConfig;
use crate::grid::{GridBounds, GridSize, solve_grid};
use crate::naming::{SCENE_FILE, backside_file_name, sheet_file_name};
use crate::progress::Progress;
use crate::scene::{SceneError, SceneOptions, build_scene, file_url_prefix, write_scene};
use std::collections::HashMap;
use std::ffi::OsString;
use std::fs;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

#[derive(Error, Debug)]
pub enum GenerateError {
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error(transparent)]
    Compose(#[from] ComposeError),
    #[error(transparent)]
    Scene(#[from] SceneError),
    #[error("Deck types {first} and {second} would both write {file_name}")]
    FileNameCollision {
        file_name: String,
        first: String,
        second: String,
    },
    #[error("Refusing to use {path} as results directory: {reason}")]
    UnsafeResultsDir { path: PathBuf, reason: &'static str },
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl GenerateError {
    fn io(path: &Path) -> impl FnOnce(std::io::Error) -> Self + '_ {
        move |source| GenerateError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Summary of a finished run.
#[derive(Debug, Clone)]
pub struct GenerateReport {
    pub game: GameInfo,
    pub results_dir: PathBuf,
    pub deck_types: usize,
    pub cards: usize,
    pub sheets: Vec<SheetRecord>,
    pub scene_file: PathBuf,
}

/// One sheet as it will be laid out, without touching any image.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedSheet {
    pub deck_type: DeckType,
    pub page: usize,
    pub cards: usize,
    pub grid: GridSize,
    pub file_name: String,
}

/// Lay out every page of `decks`: grid and file name per page.
pub fn plan_sheets(decks: &DeckArray, bounds: &GridBounds) -> Vec<PlannedSheet> {
    decks
        .pages()
        .map(|(deck_type, page, cards)| {
            let grid = solve_grid(cards.len() as u32 + 1, bounds);
            PlannedSheet {
                deck_type: deck_type.clone(),
                page,
                cards: cards.len(),
                grid,
                file_name: sheet_file_name(&deck_type.name, page, cards.len(), grid),
            }
        })
        .collect()
}

/// Collect the decks of `game_id` without producing any output.
///
/// Fails when two deck types would write the same sheet or backside file.
#[tracing::instrument(skip(catalog, config))]
pub fn check(
    catalog: &impl Catalog,
    game_id: &str,
    config: &GeneratorConfig,
) -> Result<(GameInfo, DeckArray), GenerateError> {
    let game = catalog.game(game_id)?;
    let decks = collect_decks(catalog, game_id, config.pages.max_cards)?;
    ensure_unique_file_names(&decks, &plan_sheets(&decks, &config.grid))?;
    Ok((game, decks))
}

fn ensure_unique_file_names(
    decks: &DeckArray,
    plan: &[PlannedSheet],
) -> Result<(), GenerateError> {
    let backsides = decks
        .iter()
        .map(|(deck_type, _)| (backside_file_name(deck_type), deck_type));
    let sheets = plan
        .iter()
        .map(|sheet| (sheet.file_name.clone(), &sheet.deck_type));

    let mut owners: HashMap<String, &DeckType> = HashMap::new();
    for (file_name, deck_type) in backsides.chain(sheets) {
        match owners.insert(file_name.clone(), deck_type) {
            Some(owner) if owner != deck_type => {
                return Err(GenerateError::FileNameCollision {
                    file_name,
                    first: describe(owner),
                    second: describe(deck_type),
                });
            }
            _ => {}
        }
    }
    Ok(())
}

fn describe(deck_type: &DeckType) -> String {
    format!("{:?} (backside {:?})", deck_type.name, deck_type.backside)
}

/// Generate sheets and the scene descriptor for `game_id` into `results_dir`.
#[tracing::instrument(skip(catalog, config, progress), fields(results = %results_dir.display()))]
pub fn generate(
    catalog: &impl Catalog,
    game_id: &str,
    results_dir: &Path,
    config: &GeneratorConfig,
    progress: &dyn Progress,
) -> Result<GenerateReport, GenerateError> {
    let results_dir = &resolve_results_dir(results_dir, catalog.root_dir())?;
    progress.set_message("Reading a list of cards from the catalog...");
    let (game, decks) = check(catalog, game_id, config)?;
    info!(
        deck_types = decks.deck_type_count(),
        pages = decks.page_count(),
        cards = decks.total_cards(),
        "collected decks"
    );

    let staging = staging_dir(results_dir);
    if staging.exists() {
        warn!(dir = %staging.display(), "removing leftover staging directory");
        fs::remove_dir_all(&staging).map_err(GenerateError::io(&staging))?;
    }
    fs::create_dir_all(&staging).map_err(GenerateError::io(&staging))?;

    let mut scene_options = SceneOptions::from_config(config);
    if scene_options.url_prefix.is_empty() {
        scene_options.url_prefix = file_url_prefix(results_dir);
    }

    let written = write_outputs(
        catalog,
        game_id,
        &decks,
        &staging,
        config,
        &scene_options,
        progress,
    );
    let sheets = match written {
        Ok(sheets) => sheets,
        Err(e) => {
            if let Err(cleanup) = fs::remove_dir_all(&staging) {
                warn!(dir = %staging.display(), error = %cleanup, "could not remove staging directory");
            }
            return Err(e);
        }
    };

    commit(&staging, results_dir)?;
    progress.set_message("Generation complete");
    info!(sheets = sheets.len(), "results published");

    Ok(GenerateReport {
        game,
        results_dir: results_dir.to_path_buf(),
        deck_types: decks.deck_type_count(),
        cards: decks.total_cards(),
        sheets,
        scene_file: results_dir.join(SCENE_FILE),
    })
}

fn write_outputs(
    catalog: &impl Catalog,
    game_id: &str,
    decks: &DeckArray,
    dir: &Path,
    config: &GeneratorConfig,
    scene_options: &SceneOptions,
    progress: &dyn Progress,
) -> Result<Vec<SheetRecord>, GenerateError> {
    let sheets = compose_sheets(
        catalog,
        decks,
        dir,
        &ComposeOptions::from_config(config),
        progress,
    )?;
    progress.set_message("All image pages were successfully generated!");

    progress.set_type("Scene generation");
    let scene = build_scene(catalog, game_id, decks, scene_options)?;
    write_scene(&scene, dir)?;
    Ok(sheets)
}

/// Absolute, normalized form of `results_dir`, checked to be safe to replace.
fn resolve_results_dir(
    results_dir: &Path,
    catalog_root: Option<&Path>,
) -> Result<PathBuf, GenerateError> {
    let path = normalize(results_dir)?;
    let refuse = |reason: &'static str| GenerateError::UnsafeResultsDir {
        path: path.clone(),
        reason,
    };

    if path.file_name().is_none() {
        return Err(refuse("it has no directory name"));
    }
    let cwd = std::env::current_dir().map_err(GenerateError::io(results_dir))?;
    if normalize(&cwd)?.starts_with(&path) {
        return Err(refuse("it contains the working directory"));
    }
    let catalog_root = catalog_root.map(normalize).transpose()?;
    if catalog_root.is_some_and(|root| root.starts_with(&path)) {
        return Err(refuse("it contains the catalog"));
    }
    if path.exists() && !is_replaceable(&path)? {
        return Err(refuse("it is not empty and holds no decks.json"));
    }
    Ok(path)
}

/// Absolute path with `.` and `..` resolved lexically.
fn normalize(path: &Path) -> Result<PathBuf, GenerateError> {
    let absolute = std::path::absolute(path).map_err(GenerateError::io(path))?;
    let mut normalized = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other),
        }
    }
    Ok(normalized)
}

/// An empty directory, or the results of an earlier run.
fn is_replaceable(dir: &Path) -> Result<bool, GenerateError> {
    if !dir.is_dir() {
        return Ok(false);
    }
    if dir.join(SCENE_FILE).is_file() {
        return Ok(true);
    }
    let mut entries = fs::read_dir(dir).map_err(GenerateError::io(dir))?;
    Ok(entries.next().is_none())
}

/// `<results>.partial`, next to the results directory.
fn staging_dir(results_dir: &Path) -> PathBuf {
    let mut name = results_dir
        .file_name()
        .map(OsString::from)
        .unwrap_or_else(|| OsString::from("results"));
    name.push(".partial");
    results_dir.with_file_name(name)
}

/// Replace `results_dir` with the fully written `staging` directory.
fn commit(staging: &Path, results_dir: &Path) -> Result<(), GenerateError> {
    if results_dir.exists() {
        fs::remove_dir_all(results_dir).map_err(GenerateError::io(results_dir))?;
    }
    fs::rename(staging, results_dir).map_err(GenerateError::io(results_dir))
}
