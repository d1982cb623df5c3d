//! Taskboard CLI - kanban boards with weekly reports.

mod render;

use std::path::PathBuf;
use anyhow::{anyhow, bail, Context, Result};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::EnvFilter;
use taskboard_core::{
    BoardId, CardId, ChecklistId, ChecklistItemId, ListId, Period, ReportId, ReportPatch,
    UserId,
};
use taskboard_report::ReportService;
use taskboard_storage::{JsonStorage, SqliteStorage, Storage};
use taskboard_work::BoardManager;

#[derive(Parser)]
#[command(name = "taskboard")]
#[command(about = "Kanban boards with weekly work reports", long_about = None)]
struct Cli {
    /// Directory of the JSON store
    #[arg(long, env = "TASKBOARD_DIR", default_value = ".taskboard", global = true)]
    dir: PathBuf,

    /// SQLite database file; overrides --dir when set
    #[arg(long, env = "TASKBOARD_DB", global = true)]
    db: Option<PathBuf>,

    /// Acting user ID
    #[arg(long, env = "TASKBOARD_USER", global = true)]
    user: Option<UserId>,

    /// Debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage user profiles
    #[command(subcommand)]
    User(UserCommand),
    /// Manage boards
    #[command(subcommand)]
    Board(BoardCommand),
    /// Manage lists
    #[command(subcommand)]
    List(ListCommand),
    /// Manage cards
    #[command(subcommand)]
    Card(CardCommand),
    /// Manage checklists
    #[command(subcommand)]
    Checklist(ChecklistCommand),
    /// Comment on cards
    #[command(subcommand)]
    Comment(CommentCommand),
    /// Log hours against a card
    Log {
        card: CardId,
        hours: f64,
        /// Day the work was done (defaults to today)
        #[arg(long)]
        date: Option<NaiveDate>,
        #[arg(long, default_value = "")]
        description: String,
    },
    /// Weekly reports
    #[command(subcommand)]
    Report(ReportCommand),
    /// Completed cards of a board
    Completed {
        board: BoardId,
        /// week, month or all
        #[arg(long, default_value = "week")]
        period: Period,
        /// Reference day (defaults to today)
        #[arg(long)]
        date: Option<NaiveDate>,
    },
}

#[derive(Subcommand)]
enum UserCommand {
    /// Register a user
    Add {
        name: String,
        #[arg(long)]
        email: Option<String>,
    },
}

#[derive(Subcommand)]
enum BoardCommand {
    /// Create a board with the default lists
    Add { title: String },
    /// List boards
    List,
    /// Show a board with its lists and cards
    Show { id: BoardId },
}

#[derive(Subcommand)]
enum ListCommand {
    /// Append a list to a board
    Add { board: BoardId, title: String },
}

#[derive(Subcommand)]
enum CardCommand {
    /// Add a card to a list
    Add {
        list: ListId,
        title: String,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long)]
        due: Option<NaiveDate>,
    },
    /// Mark a card completed
    Complete { id: CardId },
    /// Clear a card's completion
    Reopen { id: CardId },
    /// Move a card to another list of the same board
    Move { id: CardId, list: ListId },
}

#[derive(Subcommand)]
enum ChecklistCommand {
    /// Add a checklist to a card
    Add { card: CardId, title: String },
    /// Append an item to a checklist
    Item { checklist: ChecklistId, content: String },
    /// Check (or uncheck) an item
    Check {
        checklist: ChecklistId,
        item: ChecklistItemId,
        /// Hours spent on the item
        #[arg(long)]
        hours: Option<f64>,
        #[arg(long)]
        uncheck: bool,
        #[arg(long)]
        date: Option<NaiveDate>,
    },
}

#[derive(Subcommand)]
enum CommentCommand {
    /// Comment on a card
    Add { card: CardId, content: String },
}

#[derive(Subcommand)]
enum ReportCommand {
    /// Open this week's report, creating or refreshing it as needed
    Open(WeekArgs),
    /// Create the report for a week
    Create(WeekArgs),
    /// Re-collect a draft report
    Refresh { id: ReportId },
    /// Show a report
    Show { id: ReportId },
    /// Replace a draft's notes
    Notes { id: ReportId, text: String },
    /// Edit the input for one in-progress card
    Edit(EditArgs),
    /// Submit a draft
    Submit { id: ReportId },
    /// Reports of a board
    List { board: BoardId },
}

#[derive(Args)]
struct WeekArgs {
    board: BoardId,
    /// Any day of the week (defaults to today)
    #[arg(long)]
    date: Option<NaiveDate>,
}

#[derive(Args)]
struct EditArgs {
    id: ReportId,
    card: CardId,
    #[arg(long)]
    status: Option<String>,
    #[arg(long)]
    progress: Option<u32>,
    #[arg(long)]
    description: Option<String>,
    #[arg(long)]
    issues: Option<String>,
    #[arg(long)]
    expected: Option<NaiveDate>,
    #[arg(long)]
    hours: Option<f64>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli.db.clone() {
        Some(path) => {
            debug!("Using SQLite database {}", path.display());
            let storage = SqliteStorage::new_from_path(&path)
                .await
                .with_context(|| format!("opening database {}", path.display()))?;
            run(cli, storage).await
        }
        None => {
            debug!("Using JSON store {}", cli.dir.display());
            let storage = JsonStorage::new(&cli.dir)
                .await
                .with_context(|| format!("opening store {}", cli.dir.display()))?;
            run(cli, storage).await
        }
    }
}

async fn run<S: Storage>(cli: Cli, storage: S) -> Result<()> {
    let actor = cli.user;
    let today = chrono::Local::now().date_naive();

    match cli.command {
        Commands::User(UserCommand::Add { name, email }) => {
            let profile = BoardManager::new(storage).add_profile(&name, email).await?;
            println!("Added user: {} - {}", profile.id, profile.display_name);
            println!("Export TASKBOARD_USER={} to act as this user", profile.id);
        }
        Commands::Board(command) => {
            let mut manager = BoardManager::new(storage);
            match command {
                BoardCommand::Add { title } => {
                    let board = manager.create_board(require(actor)?, &title).await?;
                    println!("Added board: {} - {}", board.id, board.title);
                }
                BoardCommand::List => {
                    let boards = manager.storage().list_boards().await?;
                    println!("Boards ({})", boards.len());
                    for board in boards {
                        println!("  {} | {}", board.id, board.title);
                    }
                }
                BoardCommand::Show { id } => render::board(&manager.board_overview(id).await?),
            }
        }
        Commands::List(ListCommand::Add { board, title }) => {
            let list = BoardManager::new(storage).add_list(board, &title).await?;
            println!("Added list: {} - {}", list.id, list.title);
        }
        Commands::Card(command) => {
            let mut manager = BoardManager::new(storage);
            match command {
                CardCommand::Add { list, title, description, due } => {
                    let card = manager
                        .add_card(list, require(actor)?, &title, &description, due)
                        .await?;
                    println!("Added card: {} - {}", card.id, card.title);
                }
                CardCommand::Complete { id } => {
                    let card = manager.complete_card(id, require(actor)?).await?;
                    println!("Completed: {}", card.title);
                }
                CardCommand::Reopen { id } => {
                    let card = manager.reopen_card(id).await?;
                    println!("Reopened: {}", card.title);
                }
                CardCommand::Move { id, list } => {
                    let card = manager.move_card(id, list).await?;
                    println!("Moved: {} -> {}", card.title, card.list_id);
                }
            }
        }
        Commands::Checklist(command) => {
            let mut manager = BoardManager::new(storage);
            match command {
                ChecklistCommand::Add { card, title } => {
                    let checklist = manager.add_checklist(card, &title).await?;
                    println!("Added checklist: {} - {}", checklist.id, checklist.title);
                }
                ChecklistCommand::Item { checklist, content } => {
                    let item = manager.add_checklist_item(checklist, &content).await?;
                    println!("Added item: {} - {}", item.id, item.content);
                }
                ChecklistCommand::Check { checklist, item, hours, uncheck, date } => {
                    let checklist = manager
                        .set_item_checked(
                            checklist,
                            item,
                            !uncheck,
                            require(actor)?,
                            hours,
                            date.unwrap_or(today),
                        )
                        .await?;
                    println!(
                        "{}: {}/{} ({}%)",
                        checklist.title,
                        checklist.checked_count(),
                        checklist.items.len(),
                        checklist.progress()
                    );
                }
            }
        }
        Commands::Comment(CommentCommand::Add { card, content }) => {
            let comment = BoardManager::new(storage)
                .add_comment(card, require(actor)?, &content)
                .await?;
            println!("Added comment: {}", comment.id);
        }
        Commands::Log { card, hours, date, description } => {
            let log = BoardManager::new(storage)
                .log_time(card, require(actor)?, hours, date.unwrap_or(today), &description)
                .await?;
            println!("Logged {:.1}h on {}", log.hours, log.logged_date);
        }
        Commands::Report(command) => {
            let mut service = ReportService::new(storage);
            match command {
                ReportCommand::Open(week) => {
                    let report = service.open(actor, week.board, week.date.unwrap_or(today)).await?;
                    render::report(&report);
                }
                ReportCommand::Create(week) => {
                    let report = service.create(actor, week.board, week.date.unwrap_or(today)).await?;
                    render::report(&report);
                }
                ReportCommand::Refresh { id } => render::report(&service.refresh(actor, id).await?),
                ReportCommand::Show { id } => render::report(&service.get(actor, id).await?),
                ReportCommand::Notes { id, text } => {
                    let patch = ReportPatch {
                        notes: Some(text),
                        ..Default::default()
                    };
                    service.update(actor, id, patch).await?;
                    println!("Notes saved");
                }
                ReportCommand::Edit(edit) => {
                    let patch = edit_patch(&service, actor, &edit).await?;
                    let report = service.update(actor, edit.id, patch).await?;
                    println!("Saved. Total hours: {:.1}", report.total_hours);
                }
                ReportCommand::Submit { id } => {
                    let report = service.submit(actor, id).await?;
                    println!("Submitted report {} ({:.1}h)", report.id, report.total_hours);
                }
                ReportCommand::List { board } => {
                    let reports = service.list(actor, board).await?;
                    println!("Reports ({})", reports.len());
                    for report in reports {
                        println!(
                            "  {} | {} ~ {} | {} | {:.1}h",
                            report.id,
                            report.week_start_date,
                            report.week_end_date,
                            report.status,
                            report.total_hours
                        );
                    }
                }
            }
        }
        Commands::Completed { board, period, date } => {
            let service = ReportService::new(storage);
            let cards = service
                .completed_cards(actor, board, period, date.unwrap_or(today))
                .await?;
            println!("Completed cards, {} ({})", period, cards.len());
            for card in &cards {
                render::completed_card(card);
            }
        }
    }

    Ok(())
}

fn require(actor: Option<UserId>) -> Result<UserId> {
    actor.ok_or_else(|| anyhow!("no acting user; pass --user or set TASKBOARD_USER"))
}

/// Apply the edit to the stored in-progress entry of one card.
async fn edit_patch<S: Storage>(
    service: &ReportService<S>,
    actor: Option<UserId>,
    edit: &EditArgs,
) -> Result<ReportPatch> {
    let mut cards = service.get(actor, edit.id).await?.in_progress_cards;
    let Some(card) = cards.iter_mut().find(|c| c.card_id == edit.card) else {
        bail!("card {} is not in progress in report {}", edit.card, edit.id);
    };

    let input = &mut card.user_input;
    if let Some(status) = &edit.status {
        input.status = status.clone();
    }
    if let Some(progress) = edit.progress {
        if progress > 100 {
            bail!("progress must be between 0 and 100");
        }
        input.progress = Some(progress);
    }
    if let Some(description) = &edit.description {
        input.description = description.clone();
    }
    if let Some(issues) = &edit.issues {
        input.issues = issues.clone();
    }
    if let Some(expected) = edit.expected {
        input.expected_completion_date = Some(expected);
    }
    if let Some(hours) = edit.hours {
        if !hours.is_finite() || hours < 0.0 {
            bail!("hours must be a non-negative number");
        }
        input.hours_spent = hours;
    }

    Ok(ReportPatch {
        in_progress_cards: Some(cards),
        ..Default::default()
    })
}
