use std::path::PathBuf;
use std::time::Instant;

use anyhow::Result;
use clap::{Parser, Subcommand};
use serde_json::json;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use booklist_core::{
    AppConfig, Book, BookId, BookPatch, BooklistError, ExitCode, JsonFileStorage, NewBook,
    Rating, RecordStore,
};

// ─── CLI Definition ─────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(
    name = "booklist",
    about = "Keep track of the books you read, with ratings and notes",
    version,
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output in JSON format (for scripts).
    /// Also enabled by setting BOOKLIST_JSON=1.
    #[arg(long, global = true)]
    json: bool,

    /// Use this data file instead of the configured one.
    #[arg(long, global = true)]
    data_file: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// List all books, oldest first.
    List,

    /// Add a book.
    Add {
        #[arg(long)]
        title: String,
        #[arg(long)]
        author: String,
        /// Whole number from 1 to 5.
        #[arg(long)]
        rating: Option<String>,
        #[arg(long)]
        note: Option<String>,
    },

    /// Change fields of a book. Fields not given stay as they are.
    Update {
        id: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        author: Option<String>,
        #[arg(long, conflicts_with = "clear_rating")]
        rating: Option<String>,
        /// Remove the rating.
        #[arg(long)]
        clear_rating: bool,
        #[arg(long)]
        note: Option<String>,
    },

    /// Delete a book.
    Delete { id: String },

    /// Show the average rating.
    Stats,

    /// Run the HTTP server.
    Serve {
        #[arg(long)]
        host: Option<String>,
        #[arg(long)]
        port: Option<u16>,
    },
}

// ─── Main ────────────────────────────────────────────────────────────────────

fn main() {
    let cli = Cli::parse();
    let json_output = cli.json || std::env::var("BOOKLIST_JSON").as_deref() == Ok("1");

    let code = match run(cli, json_output) {
        Ok(()) => ExitCode::Success,
        Err(err) => {
            let core = err.downcast_ref::<BooklistError>();
            if json_output {
                let kind = core.map_or("error", |e| e.kind().as_str());
                println!(
                    "{}",
                    json!({"status": "error", "error": kind, "message": err.to_string()})
                );
            } else {
                eprintln!("Error: {err:#}");
            }
            core.map_or(ExitCode::GeneralError, BooklistError::exit_code)
        }
    };
    std::process::exit(code as i32);
}

fn run(cli: Cli, json_output: bool) -> Result<()> {
    let start = Instant::now();

    let mut config = AppConfig::load()?;
    config.apply_env()?;
    if let Some(path) = cli.data_file {
        config.storage.data_file = path.to_string_lossy().to_string();
    }

    let serving = matches!(cli.command, Commands::Serve { .. });
    init_tracing(if serving { &config.log.filter } else { "warn" });

    let store = RecordStore::new(JsonFileStorage::new(config.data_file()));

    match cli.command {
        Commands::List => {
            let books = store.list()?;
            let avg = booklist_core::average_rating(&books);

            if json_output {
                print_json(&json!({
                    "status": "ok",
                    "data": { "items": books, "total": books.len(), "average_rating": avg },
                    "meta": { "duration_ms": start.elapsed().as_millis() }
                }))?;
            } else if books.is_empty() {
                println!("No books yet. Use `booklist add` to add one.");
            } else {
                for book in &books {
                    print_book_line(book);
                }
                println!();
                println!("Average rating: {avg}");
            }
        }

        Commands::Add { title, author, rating, note } => {
            let mut input = NewBook::new(title, author);
            if let Some(r) = rating {
                input = input.with_rating(r);
            }
            if let Some(n) = note {
                input = input.with_note(n);
            }

            let book = store.add(input)?;
            if json_output {
                print_ok(&book, start)?;
            } else {
                println!("Added: {} ({})", book.title, book.id);
            }
        }

        Commands::Update { id, title, author, rating, clear_rating, note } => {
            let patch = BookPatch {
                title,
                author,
                rating: if clear_rating {
                    Some(None)
                } else {
                    rating.map(|r| Some(r.into()))
                },
                note,
            };

            let book = store.update(&BookId::from(id), patch)?;
            if json_output {
                print_ok(&book, start)?;
            } else {
                println!("Updated: {}", book.title);
            }
        }

        Commands::Delete { id } => {
            let book = store.remove(&BookId::from(id))?;
            if json_output {
                print_json(&json!({
                    "status": "ok",
                    "data": { "deleted": book.id },
                    "meta": { "duration_ms": start.elapsed().as_millis() }
                }))?;
            } else {
                println!("Deleted: {} ({})", book.title, book.id);
            }
        }

        Commands::Stats => {
            let avg = store.average_rating()?;
            if json_output {
                print_ok(&avg, start)?;
            } else {
                let stars = avg.rounded_stars().map(star_bar).unwrap_or_default();
                println!("Average rating: {avg} {stars}");
            }
        }

        Commands::Serve { host, port } => {
            if let Some(h) = host {
                config.server.host = h;
            }
            if let Some(p) = port {
                config.server.port = p;
            }

            let shared = booklist_server::open_store(&config);
            tokio::runtime::Runtime::new()?.block_on(booklist_server::serve(&config, shared))?;
        }
    }

    Ok(())
}

// ─── Helpers ─────────────────────────────────────────────────────────────────

fn init_tracing(default_filter: &str) {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn print_json(val: &serde_json::Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(val)?);
    Ok(())
}

fn print_ok(data: &impl serde::Serialize, start: Instant) -> Result<()> {
    print_json(&json!({
        "status": "ok",
        "data": data,
        "meta": { "duration_ms": start.elapsed().as_millis() }
    }))
}

fn print_book_line(book: &Book) {
    let stars = book.rating.map(Rating::get).map(star_bar).unwrap_or_else(|| "-".to_string());
    println!(
        "{id}  {title:<32}  {author:<24}  {stars}",
        id = book.id,
        title = book.title,
        author = book.author,
    );
    if !book.note.is_empty() {
        println!("    {}", book.note);
    }
}

fn star_bar(filled: u8) -> String {
    let filled = usize::from(filled.min(Rating::MAX));
    let empty = usize::from(Rating::MAX) - filled;
    format!("{}{}", "★".repeat(filled), "☆".repeat(empty))
}
