use clap::{Parser, Subcommand};
use flashcards_srs::config::Config;
use flashcards_srs::export::json::{export_items_to_path, import_items};
use flashcards_srs::models::{CardKind, Flashcard, SourceType, owner_key};
use flashcards_srs::{ItemStore, LearningSession, ReviewItem, StoreError, StoreResult, logging};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "flashcards", about = "Spaced-repetition flashcards (SM-2)", version)]
struct Cli {
    /// Learner whose cards are used (defaults to FLASHCARDS_OWNER)
    #[arg(long, global = true)]
    owner: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Add a new card, due immediately
    Add {
        #[arg(long)]
        front: String,

        #[arg(long)]
        back: String,

        /// basic, cloze or code
        #[arg(long, default_value = "basic")]
        kind: CardKind,

        #[arg(long, default_value = "javascript")]
        language: String,

        /// manual, chat or dojo
        #[arg(long, default_value = "manual")]
        source: SourceType,

        /// Tag to attach (repeatable)
        #[arg(long = "tag")]
        tags: Vec<String>,
    },

    /// List cards due on the study date, oldest first
    Due {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Record one review of a card
    Review {
        id: i64,

        /// Recall quality 0-5; other values are clamped
        #[arg(allow_negative_numbers = true)]
        quality: i64,

        /// Output the new schedule as JSON
        #[arg(long)]
        json: bool,
    },

    /// Review all due cards interactively, repeating failed ones
    Learn,

    /// Show card counts per status
    Stats,

    /// Move the study date one day forward
    AdvanceDay,

    /// Write all cards with their schedules to a JSON file
    Export { path: PathBuf },

    /// Load cards from a JSON file written by `export`
    Import { path: PathBuf },

    /// Delete a card
    Delete { id: i64 },
}

fn main() -> ExitCode {
    let _ = dotenvy::dotenv();
    let config = Config::from_env();
    logging::init_tracing(&config.log_level);

    let cli = Cli::parse();
    let owner = cli.owner.clone().unwrap_or_else(|| config.owner_id.clone());

    match run(cli.command, &config, owner_key(&owner)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(error = %err, "command failed");
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(command: Commands, config: &Config, owner: &str) -> StoreResult<()> {
    let store = Arc::new(ItemStore::open(&config.db_path)?);
    let today = store.current_date()?;

    // Commands that change the collection never trigger the sample deck
    let changes_items = matches!(
        command,
        Commands::Add { .. } | Commands::Import { .. } | Commands::Delete { .. }
    );
    if !changes_items && seed_if_fresh(&store, owner)? {
        println!("Sample data created!");
    }

    match command {
        Commands::Add {
            front,
            back,
            kind,
            language,
            source,
            tags,
        } => {
            let card = Flashcard {
                front,
                back,
                kind,
                language,
                tags,
                source,
            };
            let item = store.create_item(owner, card, today)?;
            println!("Card {} created.", item.id);
        }

        Commands::Due { json } => {
            let due = store.due_items(owner, today)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&due)?);
            } else {
                println!("{} cards due on {}", due.len(), today.format("%Y-%m-%d"));
                for item in &due {
                    print_item(item);
                }
            }
        }

        Commands::Review { id, quality, json } => {
            let item = store.get_item(id)?;
            if item.owner_id != owner {
                return Err(StoreError::NotFound(id));
            }
            let updated = store.review_item(id, quality, today)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&updated.schedule())?);
            } else {
                println!(
                    "Card {}: next review {} (interval {} days, ease {:.2}, streak {})",
                    updated.id,
                    updated.next_review_at.format("%Y-%m-%d"),
                    updated.interval,
                    updated.ease_factor,
                    updated.repetitions
                );
            }
        }

        Commands::Learn => learn(Arc::clone(&store), owner)?,

        Commands::Stats => {
            let summary = store.status_summary(owner, today)?;
            println!("Study date: {}", today.format("%Y-%m-%d"));
            println!("  total     {}", summary.total);
            println!("  new       {}", summary.new);
            println!("  learning  {}", summary.learning);
            println!("  review    {}", summary.review);
            println!("  mastered  {}", summary.mastered);
            println!("  due now   {}", summary.due);
        }

        Commands::AdvanceDay => {
            let date = store.advance_day()?;
            println!("Study date is now {}", date.format("%Y-%m-%d"));
        }

        Commands::Export { path } => {
            let count = export_items_to_path(&store, owner, &path)?;
            println!("Exported {count} cards to '{}'", path.display());
        }

        Commands::Import { path } => {
            let imported = import_items(&store, owner, &path)?;
            println!("Imported {} cards from '{}'", imported.len(), path.display());
        }

        Commands::Delete { id } => {
            if store.get_item(id)?.owner_id != owner {
                return Err(StoreError::NotFound(id));
            }
            store.delete_item(id)?;
            println!("Card {id} deleted.");
        }
    }

    Ok(())
}

const SAMPLE_CARDS: [(&str, &str); 3] = [
    ("cześć", "hello"),
    ("dziękuję", "thank you"),
    ("proszę", "please"),
];

/// Adds the sample deck the first time an owner with no cards uses the
/// store. Returns whether anything was added.
fn seed_if_fresh(store: &ItemStore, owner: &str) -> StoreResult<bool> {
    if !store.claim_once(&format!("sample_cards_seeded:{owner}"))? {
        return Ok(false);
    }
    if store.item_count(owner)? > 0 {
        return Ok(false);
    }

    let today = store.current_date()?;
    for (front, back) in SAMPLE_CARDS {
        let card = Flashcard::new(front, back).with_tags(["polish"]);
        store.create_item(owner, card, today)?;
    }
    info!(owner_id = owner, count = SAMPLE_CARDS.len(), "seeded sample cards");
    Ok(true)
}

fn print_item(item: &ReviewItem) {
    println!(
        "  [{}] {} ({}, due {})",
        item.id,
        item.content.front,
        item.status().as_str(),
        item.next_review_at.format("%Y-%m-%d")
    );
}

fn learn(store: Arc<ItemStore>, owner: &str) -> StoreResult<()> {
    let today = store.current_date()?;
    let mut session = LearningSession::new_from_due_items(store, owner, today)?;
    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();

    while !session.is_completed() {
        let Some(card) = session.current_card() else {
            break;
        };
        let (front, back) = (card.item.content.front.clone(), card.item.content.back.clone());

        println!("{}", session.phase_message());
        println!("Q: {front}");
        prompt("(press enter to show the answer) ")?;
        if lines.next().transpose()?.is_none() {
            return Ok(());
        }
        if !session.show_answer {
            session.toggle_answer();
        }
        println!("A: {back}");

        prompt("Grade 0-5: ")?;
        let Some(line) = lines.next().transpose()? else {
            return Ok(());
        };
        let Ok(quality) = line.trim().parse::<i64>() else {
            println!("Please enter a number from 0 to 5.");
            continue;
        };

        if let Some(updated) = session.grade_current_card(quality, today)? {
            println!("Next review on {}", updated.next_review_at.format("%Y-%m-%d"));
        }
        session.next_card();
    }

    println!("Session finished.");
    Ok(())
}

fn prompt(text: &str) -> io::Result<()> {
    print!("{text}");
    io::stdout().flush()
}
