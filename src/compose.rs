//! Sheet compositing.
//!
//! Turns every page of a [`DeckArray`] into one PNG sheet:
//!
//! 1. The first card's image fixes the cell size for the page.
//! 2. The grid is solved for `cards + 1` cells.
//! 3. Cards are drawn row-major from the top-left.
//! 4. The deck type's backside, fitted to the cell and darkened, fills the
//!    bottom-right cell.
//! 5. The sheet is written as `{type}_{page}_{count}_{columns}x{rows}.png`.
//!
//! Each deck type additionally gets its backside written once, un-darkened,
//! as `backside_{type}_{hash}.png`; the scene's `BackURL` points at it.
//!
//! ## Parallel Processing
//!
//! Pages are independent and composited on the rayon pool. Results are
//! collected in page order, and the first error aborts the run.

use crate::catalog::{CardRef, Catalog, CatalogError};
use crate::collector::{DeckArray, DeckType, Page};
use crate::config::GeneratorConfig;
use crate::grid::{GridBounds, GridSize, solve_grid};
use crate::imaging::{
    Brightness, Dimensions, ImagingError, Sheet, adjust_brightness, decode, dimensions_of, fit_to,
    identify, save_png,
};
use crate::naming::{backside_file_name, sheet_file_name};
use crate::progress::{Progress, ProgressCounter};
use image::DynamicImage;
use rayon::prelude::*;
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum ComposeError {
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error(transparent)]
    Imaging(#[from] ImagingError),
    #[error("Deck type {deck_type} has an empty page {page}")]
    EmptyPage { deck_type: String, page: usize },
}

/// Compositing settings, usually taken from [`GeneratorConfig`].
#[derive(Debug, Clone)]
pub struct ComposeOptions {
    pub grid: GridBounds,
    pub brightness: Brightness,
    pub resize_mismatched: bool,
}

impl ComposeOptions {
    pub fn from_config(config: &GeneratorConfig) -> Self {
        Self {
            grid: config.grid,
            brightness: Brightness::new(config.backside.brightness),
            resize_mismatched: config.sheet.resize_mismatched,
        }
    }
}

impl Default for ComposeOptions {
    fn default() -> Self {
        Self::from_config(&GeneratorConfig::default())
    }
}

/// A sheet written by [`compose_sheets`].
#[derive(Debug, Clone, PartialEq)]
pub struct SheetRecord {
    pub deck_type: DeckType,
    /// 1-based page index within the deck type.
    pub page: usize,
    pub cards: usize,
    pub grid: GridSize,
    pub card_size: Dimensions,
    pub file_name: String,
    pub backside_file: String,
}

/// Backside of one deck type, decoded once and shared by all its pages.
struct Backside {
    image: DynamicImage,
    file_name: String,
}

struct PageJob<'a> {
    deck_type: &'a DeckType,
    page: usize,
    cards: &'a Page,
}

/// Composite every page of `decks` into `output_dir`.
///
/// Returns one record per page, in the iteration order of `decks`.
#[tracing::instrument(skip_all, fields(pages = decks.page_count(), dir = %output_dir.display()))]
pub fn compose_sheets(
    catalog: &impl Catalog,
    decks: &DeckArray,
    output_dir: &Path,
    options: &ComposeOptions,
    progress: &dyn Progress,
) -> Result<Vec<SheetRecord>, ComposeError> {
    progress.set_type("Image generation");

    let mut backsides = BTreeMap::new();
    for (deck_type, pages) in decks.iter() {
        let first = first_card(deck_type, 1, pages.first())?;
        backsides.insert(deck_type, write_backside(catalog, deck_type, first, output_dir)?);
    }

    let jobs: Vec<PageJob> = decks
        .pages()
        .map(|(deck_type, page, cards)| PageJob {
            deck_type,
            page,
            cards,
        })
        .collect();
    let counter = ProgressCounter::new(decks.total_cards());

    let records = jobs
        .par_iter()
        .map(|job| {
            // Every deck type got a backside above.
            let backside = &backsides[job.deck_type];
            compose_page(catalog, job, backside, output_dir, options, &counter, progress)
        })
        .collect::<Result<Vec<_>, _>>()?;

    info!(sheets = records.len(), "composited sheets");
    Ok(records)
}

fn first_card<'a>(
    deck_type: &DeckType,
    page: usize,
    cards: Option<&'a Page>,
) -> Result<&'a CardRef, ComposeError> {
    cards
        .and_then(|c| c.first())
        .ok_or_else(|| ComposeError::EmptyPage {
            deck_type: deck_type.name.clone(),
            page,
        })
}

fn load_card(catalog: &impl Catalog, card: &CardRef) -> Result<DynamicImage, ComposeError> {
    let data = catalog.card_image(card)?;
    Ok(decode(&data.bytes, &card.to_string())?)
}

/// Decode the deck type's backside and write it at the size of its first card.
fn write_backside(
    catalog: &impl Catalog,
    deck_type: &DeckType,
    first: &CardRef,
    output_dir: &Path,
) -> Result<Backside, ComposeError> {
    let data = catalog.deck_backside_image(&first.game_id, &first.collection_id, &first.deck_id)?;
    let image = decode(&data.bytes, &deck_type.backside)?;

    let card = catalog.card_image(first)?;
    let card_size = identify(&card.bytes, &first.to_string())?;

    let file_name = backside_file_name(deck_type);
    save_png(&fit_to(&image, card_size).to_rgba8(), &output_dir.join(&file_name))?;
    debug!(file = %file_name, "wrote backside");
    Ok(Backside { image, file_name })
}

fn compose_page(
    catalog: &impl Catalog,
    job: &PageJob,
    backside: &Backside,
    output_dir: &Path,
    options: &ComposeOptions,
    counter: &ProgressCounter,
    progress: &dyn Progress,
) -> Result<SheetRecord, ComposeError> {
    let first = first_card(job.deck_type, job.page, Some(job.cards))?;
    let first_image = load_card(catalog, first)?;
    let card_size = dimensions_of(&first_image);
    let grid = solve_grid(job.cards.len() as u32 + 1, &options.grid);
    let mut sheet = Sheet::new(card_size, grid)?;

    sheet.draw_card(0, &first_image, &first.to_string())?;
    counter.advance(progress);
    for (index, card) in job.cards.iter().enumerate().skip(1) {
        let mut image = load_card(catalog, card)?;
        if options.resize_mismatched && dimensions_of(&image) != card_size {
            debug!(card = %card, from = %dimensions_of(&image), to = %card_size, "resizing card");
            image = fit_to(&image, card_size);
        }
        sheet.draw_card(index as u32, &image, &card.to_string())?;
        counter.advance(progress);
    }

    let tile = adjust_brightness(&fit_to(&backside.image, card_size), options.brightness);
    sheet.draw_backside(&tile);

    let file_name = sheet_file_name(&job.deck_type.name, job.page, job.cards.len(), grid);
    sheet.save(&output_dir.join(&file_name))?;
    progress.set_message(&format!("Wrote {file_name}"));
    debug!(file = %file_name, %grid, "wrote sheet");

    Ok(SheetRecord {
        deck_type: job.deck_type.clone(),
        page: job.page,
        cards: job.cards.len(),
        grid,
        card_size,
        file_name,
        backside_file: backside.file_name.clone(),
    })
}
