//! Command-line front end for the tanka collection.
//!
//! ```bash
//! tanka import poems.csv          # native or legacy CSV
//! tanka export --output out.csv   # native CSV
//! tanka list --tag haru --status published
//! tanka add --text "$(cat poem.txt)" --tags spring,sea
//! tanka series create "春の連作" --plan 10
//! tanka deck <series-id> <entry-id>...
//! ```

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use log::info;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tanka_core::db::open_db;
use tanka_core::{
    default_log_level, init_logging, CollectionService, EntryDraft, EntryQuery, EntryStatus,
    SqliteBlobStore,
};

#[derive(Parser)]
#[command(name = "tanka", version, about = "Manage a personal tanka collection")]
struct Cli {
    /// SQLite database holding the collection blobs
    #[arg(long, env = "TANKA_DB", default_value = "tanka.sqlite3", global = true)]
    db: PathBuf,

    /// Absolute directory for rolling log files (logging is off when unset)
    #[arg(long, env = "TANKA_LOG_DIR", global = true)]
    log_dir: Option<PathBuf>,

    /// Log level: trace|debug|info|warn|error
    #[arg(long, env = "TANKA_LOG_LEVEL", global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Import a CSV file (native, legacy entry or legacy series schema)
    Import {
        input: PathBuf,
    },

    /// Export all entries as native CSV
    Export {
        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// List entries, newest first
    List {
        #[arg(short, long)]
        keyword: Option<String>,
        #[arg(short, long)]
        tag: Option<String>,
        #[arg(short, long)]
        category: Option<String>,
        /// unpublished|published
        #[arg(short, long)]
        status: Option<String>,
    },

    /// Add a new entry, or edit one with --edit
    Add {
        /// Poem text, one line per row
        #[arg(long)]
        text: String,
        /// Comma-separated tags
        #[arg(long, default_value = "")]
        tags: String,
        #[arg(long, default_value = "")]
        category: String,
        /// Series id to file the entry under
        #[arg(long, default_value = "")]
        series: String,
        #[arg(long, default_value = "")]
        memo: String,
        /// Id of an existing entry to edit instead of creating one
        #[arg(long)]
        edit: Option<String>,
    },

    /// Mark an entry published or unpublished
    Status {
        entry_id: String,
        /// unpublished|published
        status: String,
    },

    /// List series or create one
    Series {
        #[command(subcommand)]
        action: Option<SeriesAction>,
    },

    /// Replace the member list of a series
    Deck {
        series_id: String,
        entry_ids: Vec<String>,
    },
}

impl Commands {
    fn name(&self) -> &'static str {
        match self {
            Self::Import { .. } => "import",
            Self::Export { .. } => "export",
            Self::List { .. } => "list",
            Self::Add { .. } => "add",
            Self::Status { .. } => "status",
            Self::Series { action: None } => "series",
            Self::Series { action: Some(_) } => "series_create",
            Self::Deck { .. } => "deck",
        }
    }
}

#[derive(Subcommand)]
enum SeriesAction {
    /// Create an empty series
    Create {
        name: String,
        /// Planned number of entries (0 = no target)
        #[arg(long, default_value = "0")]
        plan: u32,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Some(log_dir) = cli.log_dir.as_deref() {
        let level = cli.log_level.as_deref().unwrap_or(default_log_level());
        init_logging(level, &log_dir.to_string_lossy())
            .map_err(anyhow::Error::msg)
            .context("failed to initialize logging")?;
    }

    let started_at = Instant::now();
    let command = cli.command.name();

    let mut conn = open_db(&cli.db)
        .with_context(|| format!("failed to open database {}", cli.db.display()))?;
    let mut service = CollectionService::load(SqliteBlobStore::new(&mut conn))
        .context("failed to load collection")?;

    match cli.command {
        Commands::Import { input } => {
            let text = read_text(&input)?;
            let report = service.import_csv(&text).context("import failed")?;
            println!(
                "format={} imported={} duplicates={} blank_rows={} rejected={} series_created={}",
                report.format,
                report.imported,
                report.duplicates,
                report.blank_rows,
                report.rejected,
                report.series_created
            );
        }

        Commands::Export { output } => {
            let text = service.export_csv().context("export failed")?;
            match output {
                Some(path) => fs::write(&path, text)
                    .with_context(|| format!("failed to write {}", path.display()))?,
                None => println!("{text}"),
            }
        }

        Commands::List {
            keyword,
            tag,
            category,
            status,
        } => {
            let query = EntryQuery {
                keyword,
                tag,
                category,
                status: status.as_deref().map(parse_status).transpose()?,
            };
            for entry in service.query(&query) {
                let series_name = service
                    .store()
                    .series_by_id(&entry.series_id)
                    .map(|series| series.name.as_str())
                    .unwrap_or("");
                println!(
                    "{}\t{}\t{}\t{}\t{}\t{}\t{}",
                    entry.id,
                    entry.date,
                    entry.title(),
                    entry.tags.join(", "),
                    entry.category,
                    series_name,
                    entry.status
                );
            }
        }

        Commands::Add {
            text,
            tags,
            category,
            series,
            memo,
            edit,
        } => {
            let draft = EntryDraft {
                text,
                tags,
                category,
                series_id: series,
                memo,
            };
            let entry = service
                .submit_entry(draft, edit.as_deref())
                .context("failed to save entry")?;
            println!("{}", entry.id);
        }

        Commands::Status { entry_id, status } => {
            let entry = service
                .set_status(&entry_id, parse_status(&status)?)
                .context("failed to update status")?;
            println!("{}\t{}", entry.id, entry.status);
        }

        Commands::Series { action } => match action {
            Some(SeriesAction::Create { name, plan }) => {
                let series = service
                    .create_series(&name, plan)
                    .context("failed to create series")?;
                println!("{}", series.id);
            }
            None => {
                for series in service.store().series() {
                    println!(
                        "{}\t{}\t{}",
                        series.id,
                        series.name,
                        series.progress().label()
                    );
                }
            }
        },

        Commands::Deck {
            series_id,
            entry_ids,
        } => {
            let change = service
                .save_deck(&series_id, &entry_ids)
                .context("failed to save deck")?;
            println!(
                "added={} removed={} unknown={}",
                change.added.len(),
                change.removed.len(),
                change.unknown.len()
            );
            for id in &change.unknown {
                eprintln!("warning: no entry with id {id}");
            }
        }
    }

    info!(
        "event=cli_command module=cli status=ok command={} duration_ms={}",
        command,
        started_at.elapsed().as_millis()
    );
    Ok(())
}

fn read_text(path: &Path) -> Result<String> {
    let bytes = fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    String::from_utf8(bytes).with_context(|| format!("{} is not UTF-8 text", path.display()))
}

fn parse_status(value: &str) -> Result<EntryStatus> {
    match EntryStatus::parse(value) {
        Some(status) => Ok(status),
        None => bail!("unknown status `{value}`; expected unpublished|published"),
    }
}
