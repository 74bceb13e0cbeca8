use chrono::Utc;
use clap::{Parser, Subcommand};
use lecture_chat_core::{
    clean_slide_text, ingest_deck, ingest_folder_best_effort, summarize_session_slide, ChatReply,
    ChatRequest, ChatRouter, HttpGenerator, PptxExtractor, SessionStore, SqliteSessionStore,
    SummaryOptions,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "lecture-chat", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// SQLite database file holding durable session records
    #[arg(long, default_value = "lecture_chat.db")]
    db: PathBuf,

    /// Text-generation endpoint
    #[arg(long, default_value = "http://localhost:8080/generate")]
    generate_url: String,

    /// Bearer token for the generation endpoint
    #[arg(long, env = "LECTURE_CHAT_GENERATE_KEY")]
    generate_api_key: Option<String>,

    /// Owner reference recorded on newly created sessions
    #[arg(long)]
    owner: Option<String>,
}

#[derive(Subcommand)]
enum Command {
    /// Ingest a deck (or a folder of decks) and create chat sessions.
    Ingest {
        /// A .pptx file, or a folder searched recursively.
        #[arg(long)]
        path: PathBuf,
        /// Print each deck's generated running summary.
        #[arg(long, default_value_t = false)]
        show_summary: bool,
    },
    /// Send one chat message to an existing session.
    Chat {
        /// Session id returned by a previous ingestion.
        #[arg(long)]
        session: Option<String>,
        #[arg(long)]
        message: String,
        /// Upload a new deck as part of this turn.
        #[arg(long)]
        deck: Option<PathBuf>,
    },
    /// Re-summarize one slide of an existing session.
    Summarize {
        #[arg(long)]
        session: String,
        #[arg(long)]
        page: u32,
    },
    /// Show a session's state: summary, slides, and chat history.
    Inspect {
        #[arg(long)]
        session: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let app_version = env!("CARGO_PKG_VERSION");

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(fmt::layer())
        .init();

    let cli = Cli::parse();

    let durable = SqliteSessionStore::open(&cli.db)
        .map_err(|error| anyhow::anyhow!(error.to_string()))?;
    let store = Arc::new(SessionStore::new(durable));
    let generator = HttpGenerator::new(&cli.generate_url, cli.generate_api_key.clone());
    let options = SummaryOptions::default();

    info!(
        version = app_version,
        started_at = %Utc::now().to_rfc3339(),
        "lecture-chat boot"
    );

    match cli.command {
        Command::Ingest { path, show_summary } => {
            if path.is_dir() {
                let report = ingest_folder_best_effort(
                    &PptxExtractor,
                    &generator,
                    store.as_ref(),
                    &path,
                    &options,
                    cli.owner.clone(),
                )
                .await
                .map_err(|error| anyhow::anyhow!(error.to_string()))?;

                if !report.skipped_files.is_empty() {
                    warn!(
                        "skipped_files={} for folder={}",
                        report.skipped_files.len(),
                        path.display()
                    );
                    for skipped in &report.skipped_files {
                        warn!(path = %skipped.path.display(), reason = %skipped.reason, "skipped deck");
                    }
                }

                for deck in &report.decks {
                    println!(
                        "session={} slides={}",
                        deck.session_id,
                        deck.slides.len()
                    );
                    if show_summary {
                        println!("{}\n", deck.summary);
                    }
                }
                println!(
                    "{} deck(s) ingested at {}",
                    report.decks.len(),
                    Utc::now().to_rfc3339()
                );
            } else {
                let deck = ingest_deck(
                    &PptxExtractor,
                    &generator,
                    store.as_ref(),
                    &path,
                    &options,
                    cli.owner.clone(),
                )
                .await
                .map_err(|error| anyhow::anyhow!(error.to_string()))?;

                println!("session={} slides={}", deck.session_id, deck.slides.len());
                for slide in &deck.slides {
                    println!("  [{}] {}", slide.page, slide.title);
                }
                if show_summary {
                    println!("\n{}", deck.summary);
                }
            }
        }
        Command::Chat {
            session,
            message,
            deck,
        } => {
            let router = ChatRouter::new(PptxExtractor, generator, store);
            let request = ChatRequest {
                message,
                session_id: session,
                deck,
                owner: cli.owner.clone(),
            };

            let reply = router
                .chat(&request)
                .await
                .map_err(|error| anyhow::anyhow!(error.to_string()))?;

            match reply {
                ChatReply::Answer {
                    response,
                    session_id,
                } => {
                    println!("session={session_id}");
                    println!("{response}");
                }
                ChatReply::Error { error } => {
                    println!("error: {error}");
                }
            }
        }
        Command::Summarize { session, page } => {
            let bullets = summarize_session_slide(&generator, store.as_ref(), &session, page, &options)
                .await
                .map_err(|error| anyhow::anyhow!(error.to_string()))?;

            match bullets {
                Some(bullets) => {
                    println!("slide {page}:");
                    for bullet in bullets {
                        println!("  - {bullet}");
                    }
                }
                None => println!("no such session or slide"),
            }
        }
        Command::Inspect { session } => {
            let Some(handle) = store
                .get(&session)
                .await
                .map_err(|error| anyhow::anyhow!(error.to_string()))?
            else {
                println!("session not found");
                return Ok(());
            };

            let session = handle.lock().await;
            let preview: String = session.raw_text.chars().take(1_000).collect();
            println!("raw_text_preview:\n{preview}");
            println!("\nsummary:\n{}", session.running_summary);
            println!("\nslides={}", session.slides.len());
            for slide in &session.slides {
                println!("  [{}] {} ({} bullets)", slide.page, slide.title, slide.bullets.len());
                let body = clean_slide_text(&slide.text);
                if !body.is_empty() {
                    for line in body.lines() {
                        println!("      {line}");
                    }
                }
            }
            println!("\nchat_history={}", session.chat_history.len());
            for turn in &session.chat_history {
                println!("  user: {}", turn.user_message);
                println!("  ai:   {}", turn.ai_response);
            }
        }
    }

    Ok(())
}
