//! CLI output formatting.
//!
//! # Information-First Display
//!
//! Every entity (deck type, sheet) leads with its positional index and name;
//! file names and sizes follow as indented context lines. The same deck type
//! looks the same in `check` and `generate` output.
//!
//! # Output Format
//!
//! ## Check
//!
//! ```text
//! Dungeon Crawl (dungeon)
//!     Description: A cooperative dungeon crawler
//!
//! Deck types
//! 001 Monster (72 cards, 2 pages)
//!     Backside: backs/monster.png
//!     001 Monster_1_69_10x7.png (69 cards)
//!     002 Monster_2_3_2x2.png (3 cards)
//!
//! 1 deck type, 2 pages, 72 cards
//! ```
//!
//! ## Generate
//!
//! ```text
//! Dungeon Crawl → results/
//! 001 Monster
//!     Backside: backside_Monster_3fa2c1.png
//!     001 Monster_1_69_10x7.png (69 cards, 300x420 px)
//!     002 Monster_2_3_2x2.png (3 cards, 300x420 px)
//! Scene → results/decks.json
//!
//! Generated 1 deck type, 2 pages, 72 cards
//! ```
//!
//! ## Progress
//!
//! Stage changes print as a bare header line, status messages and
//! percentages are indented below it.
//!
//! # Architecture
//!
//! Each output has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure.

use crate::catalog::GameInfo;
use crate::collector::{DeckArray, DeckType};
use crate::generate::{GenerateReport, PlannedSheet};
use crate::progress::ProgressEvent;

// ============================================================================
// Shared display helpers
// ============================================================================

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// `1 card`, `2 cards`.
fn plural(n: usize, noun: &str) -> String {
    if n == 1 {
        format!("{} {}", n, noun)
    } else {
        format!("{} {}s", n, noun)
    }
}

/// Truncate text to `max` characters, appending `...` if truncated.
fn truncate_desc(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

fn game_header(game: &GameInfo) -> String {
    if game.name.is_empty() || game.name == game.id {
        game.id.clone()
    } else {
        format!("{} ({})", game.name, game.id)
    }
}

fn totals(deck_types: usize, pages: usize, cards: usize) -> String {
    format!(
        "{}, {}, {}",
        plural(deck_types, "deck type"),
        plural(pages, "page"),
        plural(cards, "card")
    )
}

// ============================================================================
// Progress events
// ============================================================================

/// Format a single progress event as display lines.
pub fn format_progress_event(event: &ProgressEvent) -> Vec<String> {
    match event {
        ProgressEvent::Type(stage) => vec![stage.clone()],
        ProgressEvent::Message(message) => vec![format!("{}{}", indent(1), message)],
        ProgressEvent::Progress(percent) => {
            vec![format!("{}{:>3.0}%", indent(1), percent.clamp(0.0, 100.0))]
        }
    }
}

// ============================================================================
// Check output
// ============================================================================

/// Format the deck inventory of a game and the sheets it would produce.
pub fn format_check_output(
    game: &GameInfo,
    decks: &DeckArray,
    plan: &[PlannedSheet],
) -> Vec<String> {
    let mut lines = vec![game_header(game)];
    if !game.description.is_empty() {
        lines.push(format!(
            "{}Description: {}",
            indent(1),
            truncate_desc(&game.description, 60)
        ));
    }
    lines.push(String::new());

    if decks.is_empty() {
        lines.push("No cards found".to_string());
        return lines;
    }

    lines.push("Deck types".to_string());
    for (i, (deck_type, pages)) in decks.iter().enumerate() {
        let cards: usize = pages.iter().map(Vec::len).sum();
        lines.push(format!(
            "{} {} ({}, {})",
            format_index(i + 1),
            deck_type.name,
            plural(cards, "card"),
            plural(pages.len(), "page")
        ));
        lines.push(format!("{}Backside: {}", indent(1), deck_type.backside));
        for sheet in plan.iter().filter(|s| &s.deck_type == deck_type) {
            lines.push(format!(
                "{}{} {} ({})",
                indent(1),
                format_index(sheet.page),
                sheet.file_name,
                plural(sheet.cards, "card")
            ));
        }
    }

    lines.push(String::new());
    lines.push(totals(
        decks.deck_type_count(),
        decks.page_count(),
        decks.total_cards(),
    ));
    lines
}

/// Print check output to stdout.
pub fn print_check_output(game: &GameInfo, decks: &DeckArray, plan: &[PlannedSheet]) {
    for line in format_check_output(game, decks, plan) {
        println!("{}", line);
    }
}

// ============================================================================
// Generate output
// ============================================================================

/// Format the files written by a finished generation run.
pub fn format_generate_report(report: &GenerateReport) -> Vec<String> {
    let mut lines = vec![format!(
        "{} \u{2192} {}/",
        game_header(&report.game),
        report.results_dir.display()
    )];

    let mut position = 0;
    let mut current: Option<&DeckType> = None;
    for sheet in &report.sheets {
        if current != Some(&sheet.deck_type) {
            position += 1;
            current = Some(&sheet.deck_type);
            lines.push(format!("{} {}", format_index(position), sheet.deck_type.name));
            lines.push(format!("{}Backside: {}", indent(1), sheet.backside_file));
        }
        lines.push(format!(
            "{}{} {} ({}, {} px)",
            indent(1),
            format_index(sheet.page),
            sheet.file_name,
            plural(sheet.cards, "card"),
            sheet.card_size
        ));
    }

    lines.push(format!("Scene \u{2192} {}", report.scene_file.display()));
    lines.push(String::new());
    lines.push(format!(
        "Generated {}",
        totals(report.deck_types, report.sheets.len(), report.cards)
    ));
    lines
}

/// Print generate output to stdout.
pub fn print_generate_report(report: &GenerateReport) {
    for line in format_generate_report(report) {
        println!("{}", line);
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::CardRef;
    use crate::compose::SheetRecord;
    use crate::generate::plan_sheets;
    use crate::grid::{GridBounds, GridSize};
    use crate::imaging::Dimensions;
    use std::path::PathBuf;

    fn game() -> GameInfo {
        GameInfo {
            id: "dungeon".into(),
            name: "Dungeon Crawl".into(),
            description: "A cooperative dungeon crawler".into(),
        }
    }

    fn card(id: u64) -> CardRef {
        CardRef {
            game_id: "dungeon".into(),
            collection_id: "base".into(),
            deck_id: "monsters".into(),
            card_id: id,
        }
    }

    fn decks(max_cards: usize, count: u64) -> DeckArray {
        let mut decks = DeckArray::new(max_cards);
        let mut monsters = decks.select_deck(DeckType::new("Monster", "backs/monster.png"));
        for id in 1..=count {
            monsters.add_card(card(id));
        }
        decks
    }

    // =========================================================================
    // Helper tests
    // =========================================================================

    #[test]
    fn format_index_pads() {
        assert_eq!(format_index(1), "001");
        assert_eq!(format_index(42), "042");
        assert_eq!(format_index(100), "100");
    }

    #[test]
    fn plural_forms() {
        assert_eq!(plural(1, "card"), "1 card");
        assert_eq!(plural(0, "card"), "0 cards");
        assert_eq!(plural(3, "deck type"), "3 deck types");
    }

    #[test]
    fn truncate_desc_short() {
        assert_eq!(truncate_desc("Short text", 40), "Short text");
    }

    #[test]
    fn truncate_desc_long() {
        let text = "a".repeat(50);
        assert_eq!(truncate_desc(&text, 40), format!("{}...", "a".repeat(40)));
    }

    #[test]
    fn truncate_desc_respects_char_boundaries() {
        assert_eq!(truncate_desc("ééééé", 2), "éé...");
    }

    #[test]
    fn game_header_omits_duplicate_id() {
        let mut g = game();
        assert_eq!(game_header(&g), "Dungeon Crawl (dungeon)");
        g.name = "dungeon".into();
        assert_eq!(game_header(&g), "dungeon");
    }

    // =========================================================================
    // Progress
    // =========================================================================

    #[test]
    fn stage_is_unindented() {
        let lines = format_progress_event(&ProgressEvent::Type("Image generation".into()));
        assert_eq!(lines, vec!["Image generation"]);
    }

    #[test]
    fn message_is_indented() {
        let lines = format_progress_event(&ProgressEvent::Message("Wrote a.png".into()));
        assert_eq!(lines, vec!["    Wrote a.png"]);
    }

    #[test]
    fn percentage_is_rounded_and_clamped() {
        assert_eq!(
            format_progress_event(&ProgressEvent::Progress(33.4)),
            vec!["     33%"]
        );
        assert_eq!(
            format_progress_event(&ProgressEvent::Progress(120.0)),
            vec!["    100%"]
        );
    }

    // =========================================================================
    // Check
    // =========================================================================

    #[test]
    fn check_lists_deck_types_and_sheets() {
        let decks = decks(3, 4);
        let plan = plan_sheets(&decks, &GridBounds::default());
        let lines = format_check_output(&game(), &decks, &plan);

        assert_eq!(lines[0], "Dungeon Crawl (dungeon)");
        assert_eq!(lines[1], "    Description: A cooperative dungeon crawler");
        assert!(lines.contains(&"001 Monster (4 cards, 2 pages)".to_string()));
        assert!(lines.contains(&"    Backside: backs/monster.png".to_string()));
        assert!(lines.contains(&"    001 Monster_1_3_2x2.png (3 cards)".to_string()));
        assert!(lines.contains(&"    002 Monster_2_1_2x2.png (1 card)".to_string()));
        assert_eq!(lines.last().unwrap(), "1 deck type, 2 pages, 4 cards");
    }

    #[test]
    fn check_without_cards() {
        let decks = DeckArray::new(69);
        let lines = format_check_output(&game(), &decks, &[]);
        assert_eq!(lines.last().unwrap(), "No cards found");
    }

    // =========================================================================
    // Generate
    // =========================================================================

    fn sheet(deck_type: &DeckType, page: usize, cards: usize) -> SheetRecord {
        SheetRecord {
            deck_type: deck_type.clone(),
            page,
            cards,
            grid: GridSize {
                columns: 2,
                rows: 2,
            },
            card_size: Dimensions::new(300, 420),
            file_name: format!("{}_{}_{}_2x2.png", deck_type.name, page, cards),
            backside_file: format!("backside_{}_abcdef.png", deck_type.name),
        }
    }

    #[test]
    fn report_groups_sheets_by_deck_type() {
        let hero = DeckType::new("Hero", "h.png");
        let monster = DeckType::new("Monster", "m.png");
        let report = GenerateReport {
            game: game(),
            results_dir: PathBuf::from("results"),
            deck_types: 2,
            cards: 6,
            sheets: vec![sheet(&hero, 1, 2), sheet(&monster, 1, 3), sheet(&monster, 2, 1)],
            scene_file: PathBuf::from("results/decks.json"),
        };
        let lines = format_generate_report(&report);

        assert_eq!(lines[0], "Dungeon Crawl (dungeon) \u{2192} results/");
        assert_eq!(lines[1], "001 Hero");
        assert_eq!(lines[2], "    Backside: backside_Hero_abcdef.png");
        assert_eq!(lines[3], "    001 Hero_1_2_2x2.png (2 cards, 300x420 px)");
        assert_eq!(lines[4], "002 Monster");
        assert_eq!(lines[7], "    002 Monster_2_1_2x2.png (1 card, 300x420 px)");
        assert_eq!(lines[8], "Scene \u{2192} results/decks.json");
        assert_eq!(lines.last().unwrap(), "Generated 2 deck types, 3 pages, 6 cards");
    }
}
