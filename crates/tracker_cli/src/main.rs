//! Command-line driver for the practice-sheet tracker.
//!
//! # Responsibility
//! - Open the SQLite snapshot, seeding it on first run.
//! - Map each subcommand to one `SheetApi` call and print its JSON envelope.
//!
//! Exit status is non-zero when the envelope reports `success: false`.

use clap::{Parser, Subcommand};
use log::info;
use serde::Serialize;
use std::error::Error;
use std::path::PathBuf;
use std::process::ExitCode;
use tracker_core::seed::read_dataset;
use tracker_core::{
    init_logging, load_initial_sheet, open_db, ApiResponse, QuestionDraft, QuestionPatch,
    ReorderBody, ReplaceMode, Sheet, SheetApi, SheetMutation, SheetService,
    SqliteSheetRepository, TitleBody, TrackerConfig,
};

#[derive(Parser, Debug)]
#[command(name = "tracker")]
#[command(about = "Ordered Topic -> Sub-topic -> Question practice sheet")]
#[command(version)]
struct Cli {
    /// Snapshot database file.
    #[arg(long, env = "TRACKER_DB_PATH")]
    db: Option<PathBuf>,

    /// Dataset used to seed an empty database.
    #[arg(long, env = "SHEET_JSON_PATH")]
    dataset: Option<PathBuf>,

    /// Sheet to operate on.
    #[arg(long, env = "TRACKER_SHEET_SLUG")]
    slug: Option<String>,

    /// Enables file logging under this absolute directory.
    #[arg(long, env = "TRACKER_LOG_DIR")]
    log_dir: Option<PathBuf>,

    #[arg(long, env = "TRACKER_LOG_LEVEL")]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the whole sheet.
    Show,
    /// Print question counts per topic, difficulty and status.
    Stats,
    AddTopic {
        title: String,
    },
    RenameTopic {
        topic_id: String,
        title: String,
    },
    DeleteTopic {
        topic_id: String,
    },
    MoveTopic {
        topic_id: String,
        to: usize,
    },
    AddSubtopic {
        topic_id: String,
        title: String,
    },
    RenameSubtopic {
        topic_id: String,
        subtopic_id: String,
        title: String,
    },
    DeleteSubtopic {
        topic_id: String,
        subtopic_id: String,
    },
    MoveSubtopic {
        topic_id: String,
        subtopic_id: String,
        to: usize,
    },
    AddQuestion {
        topic_id: String,
        subtopic_id: String,
        title: String,
        #[arg(long)]
        link: Option<String>,
        #[arg(long)]
        difficulty: Option<String>,
        #[arg(long)]
        status: Option<String>,
    },
    /// Partial update; pass `--link ""` to clear the link.
    UpdateQuestion {
        topic_id: String,
        subtopic_id: String,
        question_id: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        link: Option<String>,
        #[arg(long)]
        difficulty: Option<String>,
        #[arg(long)]
        status: Option<String>,
    },
    /// Advance Not Started -> In Progress -> Solved -> Not Started.
    CycleStatus {
        topic_id: String,
        subtopic_id: String,
        question_id: String,
    },
    DeleteQuestion {
        topic_id: String,
        subtopic_id: String,
        question_id: String,
    },
    MoveQuestion {
        topic_id: String,
        subtopic_id: String,
        question_id: String,
        to: usize,
    },
    /// Commit a reshuffled topic tree read from a JSON file (`{"topics": [...]}`).
    Reorder {
        path: PathBuf,
        #[arg(long)]
        strict: bool,
    },
    /// Apply one tagged mutation, e.g. `{"op":"add_topic","title":"Graphs"}`.
    Apply {
        json: String,
    },
    /// Replace the sheet with an exported Sheet JSON file.
    Import {
        path: PathBuf,
        /// Validate ids, orders and slug before replacing.
        #[arg(long)]
        strict: bool,
    },
    /// Replace the sheet with one built from a flat question dataset.
    ImportDataset {
        path: PathBuf,
    },
    /// Print the sheet, and write it to `--output` when given.
    Export {
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

impl Cli {
    fn resolve(&self, mut config: TrackerConfig) -> TrackerConfig {
        if let Some(db) = &self.db {
            config.db_path = db.clone();
        }
        if let Some(dataset) = &self.dataset {
            config.dataset_path = Some(dataset.clone());
        }
        if let Some(slug) = &self.slug {
            config.sheet_slug = slug.clone();
        }
        if let Some(log_dir) = &self.log_dir {
            config.log_dir = Some(log_dir.clone());
        }
        if let Some(level) = &self.log_level {
            config.log_level = level.clone();
        }
        config
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let config = cli.resolve(TrackerConfig::from_env());

    if let Some(log_dir) = &config.log_dir {
        if let Err(err) = init_logging(&config.log_level, log_dir) {
            eprintln!("tracker: logging disabled: {err}");
        }
    }

    match run(cli.command, &config) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(err) => {
            eprintln!("tracker: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(command: Command, config: &TrackerConfig) -> Result<bool, Box<dyn Error>> {
    let conn = open_db(&config.db_path)?;
    let repo = SqliteSheetRepository::try_new(&conn)?;
    let slug = config.sheet_slug.as_str();
    let service = SheetService::open(repo, slug, || {
        let mut sheet = load_initial_sheet(config.dataset_path.as_deref());
        // Seeds are stored under the requested slug so the next run finds them.
        if sheet.slug != slug {
            info!(
                "event=seed_slug module=cli status=ok from={} to={slug}",
                sheet.slug
            );
            sheet.slug = slug.to_string();
        }
        sheet
    })?;
    let api = SheetApi::new(service);

    let (body, success) = match command {
        Command::Show => render(api.fetch_sheet(slug))?,
        Command::Stats => render(api.stats(slug))?,
        Command::AddTopic { title } => render(api.add_topic(TitleBody::new(title)))?,
        Command::RenameTopic { topic_id, title } => {
            render(api.rename_topic(&topic_id, TitleBody::new(title)))?
        }
        Command::DeleteTopic { topic_id } => render(api.delete_topic(&topic_id))?,
        Command::MoveTopic { topic_id, to } => render(api.move_topic(&topic_id, to))?,
        Command::AddSubtopic { topic_id, title } => {
            render(api.add_subtopic(&topic_id, TitleBody::new(title)))?
        }
        Command::RenameSubtopic {
            topic_id,
            subtopic_id,
            title,
        } => render(api.rename_subtopic(&topic_id, &subtopic_id, TitleBody::new(title)))?,
        Command::DeleteSubtopic {
            topic_id,
            subtopic_id,
        } => render(api.delete_subtopic(&topic_id, &subtopic_id))?,
        Command::MoveSubtopic {
            topic_id,
            subtopic_id,
            to,
        } => render(api.move_subtopic(&topic_id, &subtopic_id, to))?,
        Command::AddQuestion {
            topic_id,
            subtopic_id,
            title,
            link,
            difficulty,
            status,
        } => {
            let draft = QuestionDraft {
                title,
                link,
                difficulty,
                status,
            };
            render(api.add_question(&topic_id, &subtopic_id, draft))?
        }
        Command::UpdateQuestion {
            topic_id,
            subtopic_id,
            question_id,
            title,
            link,
            difficulty,
            status,
        } => {
            let patch = QuestionPatch {
                title,
                link,
                difficulty,
                status,
            };
            render(api.update_question(&topic_id, &subtopic_id, &question_id, patch))?
        }
        Command::CycleStatus {
            topic_id,
            subtopic_id,
            question_id,
        } => render(api.cycle_question_status(&topic_id, &subtopic_id, &question_id))?,
        Command::DeleteQuestion {
            topic_id,
            subtopic_id,
            question_id,
        } => render(api.delete_question(&topic_id, &subtopic_id, &question_id))?,
        Command::MoveQuestion {
            topic_id,
            subtopic_id,
            question_id,
            to,
        } => render(api.move_question(&topic_id, &subtopic_id, &question_id, to))?,
        Command::Reorder { path, strict } => {
            let mut body: ReorderBody = serde_json::from_str(&std::fs::read_to_string(path)?)?;
            if strict {
                body.mode = ReplaceMode::Strict;
            }
            render(api.reorder(body))?
        }
        Command::Apply { json } => {
            let mutation: SheetMutation = serde_json::from_str(&json)?;
            render(api.dispatch(mutation))?
        }
        Command::Import { path, strict } => {
            let sheet: Sheet = serde_json::from_str(&std::fs::read_to_string(path)?)?;
            let mode = if strict {
                ReplaceMode::Strict
            } else {
                ReplaceMode::Trusting
            };
            render(api.replace_sheet_with(sheet, mode))?
        }
        Command::ImportDataset { path } => {
            let mut sheet = read_dataset(&path)?;
            sheet.slug = slug.to_string();
            render(api.replace_sheet(sheet))?
        }
        Command::Export { output } => {
            let response = api.fetch_sheet(slug);
            if let (Some(path), Some(sheet)) = (output, &response.data) {
                std::fs::write(path, serde_json::to_string_pretty(sheet)?)?;
            }
            render(response)?
        }
    };

    println!("{body}");
    Ok(success)
}

fn render<T: Serialize>(response: ApiResponse<T>) -> Result<(String, bool), serde_json::Error> {
    Ok((serde_json::to_string_pretty(&response)?, response.success))
}
