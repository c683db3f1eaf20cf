//! ZenSpace command-line front end.
//!
//! # Responsibility
//! - Parse arguments and resolve configuration (environment, then flags).
//! - Drive the core entry store and augmentation service.
//! - Own the interactive delete confirmation.

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use log::info;
use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::sync::Mutex;
use zenspace_core::db::open_db;
use zenspace_core::repo::entry_slot::EntrySlot;
use zenspace_core::{
    entry_cards, init_logging, AnswerOutcome, AppConfig, AugmentOutcome, AugmentService,
    AugmentationClient, Confirmation, DocumentStats, EntryId, EntryPatch, EntryStore, EntryType,
    GeminiProvider, LoadState, MarkupRenderer, PlainTextRenderer, SqliteSlotRepository, TagSet,
};

type Store = EntryStore<SqliteSlotRepository>;

#[derive(Debug, Parser)]
#[command(name = "zenspace", about = "Personal blog and note space", version)]
struct Cli {
    /// SQLite database file (overrides ZENSPACE_DB_PATH).
    #[arg(long, global = true)]
    db: Option<PathBuf>,
    /// Durable slot key (overrides ZENSPACE_SLOT_KEY).
    #[arg(long, global = true)]
    slot_key: Option<String>,
    /// Log level (overrides ZENSPACE_LOG_LEVEL).
    #[arg(long, global = true)]
    log_level: Option<String>,
    /// Absolute log directory; logging is off without one.
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List entries, most recently updated first.
    List {
        #[arg(long, short, default_value = "")]
        query: String,
    },
    /// Create an entry.
    New {
        kind: KindArg,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        content: Option<String>,
        #[arg(long = "tag")]
        tags: Vec<String>,
    },
    /// Print one entry.
    Show {
        id: String,
        /// Render content as plain text with statistics.
        #[arg(long)]
        preview: bool,
    },
    /// Change fields of an entry.
    Edit {
        id: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        content: Option<String>,
        #[arg(long = "add-tag")]
        add_tags: Vec<String>,
        #[arg(long = "remove-tag")]
        remove_tags: Vec<String>,
    },
    /// Delete an entry.
    Delete {
        id: String,
        /// Skip the confirmation prompt.
        #[arg(long)]
        yes: bool,
    },
    /// Suggest a title and tags with AI and merge them.
    Inspire { id: String },
    /// Summarize an entry with AI.
    Summarize { id: String },
    /// Ask a question about your entries.
    Ask {
        question: String,
        /// Only use entries matching this search.
        #[arg(long, short, default_value = "")]
        query: String,
    },
    /// Print the core version.
    Version,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum KindArg {
    Blog,
    Note,
}

impl From<KindArg> for EntryType {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Blog => EntryType::Blog,
            KindArg::Note => EntryType::Note,
        }
    }
}

/// Asks on stdin; anything but `y`/`yes` is a refusal.
struct StdinConfirmation;

impl Confirmation for StdinConfirmation {
    fn confirm(&self, prompt: &str) -> bool {
        print!("{prompt} [y/N] ");
        if std::io::stdout().flush().is_err() {
            return false;
        }
        let mut answer = String::new();
        if std::io::stdin().lock().read_line(&mut answer).is_err() {
            return false;
        }
        matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = resolve_config(&cli)?;

    if let Some(dir) = &config.log_dir {
        init_logging(&config.log_level, dir).map_err(|err| anyhow!(err))?;
    }

    if let Command::Version = cli.command {
        println!("zenspace {}", zenspace_core::core_version());
        return Ok(());
    }

    let store = open_store(&config)?;
    run(cli.command, store, &config).await
}

fn resolve_config(cli: &Cli) -> Result<AppConfig> {
    let mut config = AppConfig::from_env().context("invalid environment configuration")?;
    if let Some(db) = &cli.db {
        config.db_path = db.clone();
    }
    if let Some(key) = &cli.slot_key {
        config.slot_key = key.clone();
    }
    if let Some(level) = &cli.log_level {
        config.log_level = level.clone();
    }
    if let Some(dir) = &cli.log_dir {
        config.log_dir = Some(dir.clone());
    }
    Ok(config)
}

fn open_store(config: &AppConfig) -> Result<Store> {
    let conn = open_db(&config.db_path)
        .with_context(|| format!("cannot open database `{}`", config.db_path.display()))?;
    let repo = SqliteSlotRepository::try_new(conn)?;
    let store = EntryStore::open(EntrySlot::new(repo, config.slot_key.as_str()))?;
    match store.load_state() {
        LoadState::Loaded => {}
        LoadState::Seeded => eprintln!("Created a new space with a welcome entry."),
        LoadState::Recovered { reason } => eprintln!(
            "Stored entries were unreadable ({reason}); a backup was kept and a fresh space started."
        ),
    }
    Ok(store)
}

fn augment_service(config: &AppConfig) -> Result<AugmentService<GeminiProvider>> {
    let provider = GeminiProvider::new(
        config.ai.endpoint.as_str(),
        config.ai.api_key.clone(),
        config.ai.timeout,
    )?;
    if !provider.has_api_key() {
        bail!("no API key configured; set GEMINI_API_KEY");
    }
    Ok(AugmentService::new(AugmentationClient::new(
        provider,
        config.ai.model.as_str(),
    )))
}

async fn run(command: Command, mut store: Store, config: &AppConfig) -> Result<()> {
    match command {
        Command::List { query } => {
            let cards = entry_cards(store.entries(), &query);
            if cards.is_empty() {
                println!("No entries found.");
            }
            for card in cards {
                let mut tags = card
                    .tags
                    .iter()
                    .map(|tag| format!("#{tag}"))
                    .collect::<Vec<_>>()
                    .join(" ");
                if card.more_tags > 0 {
                    tags.push_str(&format!(" +{}", card.more_tags));
                }
                println!("{}  [{}] {}  {}", card.id, card.kind, card.title, tags);
                if !card.snippet.is_empty() {
                    println!("    {}", card.snippet);
                }
                if let Some(image) = &card.image {
                    println!("    [image: {image}]");
                }
            }
        }
        Command::New {
            kind,
            title,
            content,
            tags,
        } => {
            let entry = store.create(kind.into())?;
            let patch = EntryPatch {
                title,
                content,
                kind: None,
                tags: (!tags.is_empty()).then(|| tags.iter().collect::<TagSet>()),
            };
            if !patch.is_empty() {
                store.update(&entry.id, patch)?;
            }
            println!("{}", entry.id);
        }
        Command::Show { id, preview } => {
            let id = parse_id(&id)?;
            let entry = store
                .get(&id)
                .ok_or_else(|| anyhow!("no entry with id `{id}`"))?;
            println!("{} [{}]", entry.display_title(), entry.kind);
            if !entry.tags.is_empty() {
                let tags = entry.tags.iter().collect::<Vec<_>>().join(", ");
                println!("Tags: {tags}");
            }
            println!();
            if preview {
                println!("{}", PlainTextRenderer.render(&entry.content));
                let stats = DocumentStats::of(entry);
                println!();
                println!(
                    "created {} | updated {} | {} words",
                    stats.created_at, stats.updated_at, stats.word_count
                );
            } else {
                println!("{}", entry.content);
            }
        }
        Command::Edit {
            id,
            title,
            content,
            add_tags,
            remove_tags,
        } => {
            let id = parse_id(&id)?;
            let current = store
                .get(&id)
                .ok_or_else(|| anyhow!("no entry with id `{id}`"))?;
            let tags = if add_tags.is_empty() && remove_tags.is_empty() {
                None
            } else {
                let mut tags = current.tags.clone();
                tags.union(&add_tags);
                for tag in &remove_tags {
                    tags.remove(tag.trim());
                }
                Some(tags)
            };
            let patch = EntryPatch {
                title,
                content,
                kind: None,
                tags,
            };
            if patch.is_empty() {
                bail!("nothing to change");
            }
            store.select(&id);
            store.update(&id, patch)?;
            info!("event=cli_edit module=cli status=ok");
            println!("Updated {id}");
        }
        Command::Delete { id, yes } => {
            let id = parse_id(&id)?;
            let deleted = if yes {
                store.delete(&id)?
            } else {
                if store.get(&id).is_none() {
                    bail!("no entry with id `{id}`");
                }
                store.delete_confirmed(&id, &StdinConfirmation)?
            };
            if deleted {
                println!("Deleted {id}");
            } else if yes {
                bail!("no entry with id `{id}`");
            } else {
                println!("Kept {id}");
            }
        }
        Command::Inspire { id } => {
            let id = parse_id(&id)?;
            let service = augment_service(config)?;
            let store = Mutex::new(store);
            let outcome = service.inspire(&store, &id).await;
            report_outcome(&outcome, "Title and tags updated.")?;
            let store = store.into_inner().map_err(|_| anyhow!("entry store poisoned"))?;
            if let Some(entry) = store.get(&id) {
                let tags = entry.tags.iter().collect::<Vec<_>>().join(", ");
                println!("{}  [{}]", entry.display_title(), tags);
            }
        }
        Command::Summarize { id } => {
            let id = parse_id(&id)?;
            let service = augment_service(config)?;
            let store = Mutex::new(store);
            let outcome = service.summarize(&store, &id).await;
            report_outcome(&outcome, "Summary:")?;
            if let Some(summary) = service.summary(&id) {
                println!("{summary}");
            }
        }
        Command::Ask { question, query } => {
            let service = augment_service(config)?;
            let store = Mutex::new(store);
            match service.ask(&store, &question, &query).await {
                AnswerOutcome::Answered(answer) => println!("{answer}"),
                AnswerOutcome::Skipped => bail!("question is empty"),
                AnswerOutcome::Failed(message) => bail!("{message}"),
            }
        }
        Command::Version => println!("zenspace {}", zenspace_core::core_version()),
    }
    Ok(())
}

fn report_outcome(outcome: &AugmentOutcome, applied: &str) -> Result<()> {
    match outcome {
        AugmentOutcome::Applied => {
            println!("{applied}");
            Ok(())
        }
        AugmentOutcome::Skipped => bail!("entry not found or has no content"),
        AugmentOutcome::Busy => bail!("an augmentation is already running for this entry"),
        AugmentOutcome::Discarded => bail!("entry was deleted before the result arrived"),
        AugmentOutcome::Failed(message) => bail!("{message}"),
    }
}

fn parse_id(raw: &str) -> Result<EntryId> {
    EntryId::parse(raw.trim()).map_err(|err| anyhow!("{err}"))
}
