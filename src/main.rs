use clap::{Parser, Subcommand};
use deck_sheets::catalog::DirCatalog;
use deck_sheets::progress::{ChannelProgress, ProgressEvent};
use deck_sheets::{config, generate, output};
use std::path::PathBuf;
use std::sync::mpsc::Receiver;
use tracing_subscriber::EnvFilter;

fn version_string() -> &'static str {
    let on_tag = env!("ON_RELEASE_TAG");
    if on_tag == "true" {
        env!("CARGO_PKG_VERSION")
    } else {
        let hash = env!("GIT_HASH");
        if hash.is_empty() {
            "dev@unknown"
        } else {
            // Leaked once at startup
            Box::leak(format!("dev@{hash}").into_boxed_str())
        }
    }
}

#[derive(Parser)]
#[command(name = "deck-sheets")]
#[command(about = "Card sheet and tabletop scene generator")]
#[command(long_about = "\
Card sheet and tabletop scene generator

Reads the cards of one game from a catalog directory, packs them into sheet
images (one grid per page, bottom-right cell holds the darkened backside) and
writes a scene descriptor that references those sheets.

Catalog structure:

  catalog/
  ├── config.toml                  # Generator config (optional)
  └── dungeon/                     # Game
      ├── game.json                # { \"name\", \"description\" }
      └── base/                    # Collection
          ├── collection.json      # { \"name\" }
          └── monsters/            # Deck
              ├── deck.json        # { \"type\", \"backside\" }
              ├── cards.json       # [{ \"id\", \"name\", \"image\", ... }]
              ├── back.png
              └── card-1.png

Output:

  results/
  ├── decks.json                   # Scene descriptor
  ├── backside_Monster_3fa2c1.png  # One per deck type
  └── Monster_1_69_10x7.png        # {type}_{page}_{count}_{grid}.png

Run 'deck-sheets gen-config' to generate a documented config.toml.")]
#[command(version = version_string())]
struct Cli {
    /// Catalog directory
    #[arg(long, default_value = "catalog", global = true)]
    catalog: PathBuf,

    /// Results directory (replaced on success)
    #[arg(long, default_value = "results", global = true)]
    output: PathBuf,

    /// Log pipeline diagnostics to stderr
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Generate card sheets and the scene descriptor for a game
    Generate {
        /// Game id (directory name in the catalog)
        #[arg(long)]
        game: String,
    },
    /// Collect the decks of a game and print the sheet plan without drawing
    Check {
        /// Game id (directory name in the catalog)
        #[arg(long)]
        game: String,
    },
    /// Print a stock config.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Command::Generate { game } => {
            let config = config::load_config(&cli.catalog)?;
            init_thread_pool(&config.processing);
            let catalog = DirCatalog::new(&cli.catalog);

            let (tx, rx) = std::sync::mpsc::channel();
            let printer = std::thread::spawn(move || print_progress(rx));
            let progress = ChannelProgress::new(tx);
            let result = generate::generate(&catalog, &game, &cli.output, &config, &progress);
            drop(progress);
            printer.join().map_err(|_| "progress printer panicked")?;

            output::print_generate_report(&result?);
        }
        Command::Check { game } => {
            let config = config::load_config(&cli.catalog)?;
            let catalog = DirCatalog::new(&cli.catalog);
            println!("==> Checking {} in {}", game, cli.catalog.display());
            let (info, decks) = generate::check(&catalog, &game, &config)?;
            let plan = generate::plan_sheets(&decks, &config.grid);
            output::print_check_output(&info, &decks, &plan);
            println!("==> Catalog is valid");
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// Install the fmt subscriber on stderr. `RUST_LOG` overrides the default level.
fn init_tracing(verbose: bool) {
    let default = if verbose { "deck_sheets=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Initialize the rayon thread pool based on processing config.
///
/// Capped at the number of available CPU cores.
fn init_thread_pool(processing: &config::ProcessingConfig) {
    let threads = config::effective_threads(processing);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}

/// Drain progress events until every sender is gone.
///
/// Percentages are printed in steps of ten so large runs stay readable.
fn print_progress(rx: Receiver<ProgressEvent>) {
    let mut last_step = None;
    for event in rx {
        if let ProgressEvent::Progress(percent) = event {
            let step = (percent / 10.0).floor() as i32;
            if last_step == Some(step) {
                continue;
            }
            last_step = Some(step);
        }
        for line in output::format_progress_event(&event) {
            println!("{}", line);
        }
    }
}
