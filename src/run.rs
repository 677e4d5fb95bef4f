mod cli;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::config::Config;
use crate::db::Database;
use crate::review::{Resolution, Selection};

#[derive(Parser, Debug)]
#[command(
    name = "finsort",
    version,
    about = "Local transaction categorization with rules, heuristics and an LLM classifier"
)]
pub(crate) struct Cli {
    /// Print results as JSON instead of a human summary
    #[arg(long, global = true)]
    json: bool,

    /// Database file (overrides FINSORT_DB)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create any missing default categories
    Setup,

    /// Replace all transactions with a small demo dataset
    Seed,

    /// Add one transaction by hand
    Add {
        /// Posting date, YYYY-MM-DD (default: today)
        #[arg(long)]
        date: Option<String>,

        /// Signed amount, e.g. -12.34 for an expense
        #[arg(long, allow_hyphen_values = true)]
        amount: String,

        #[arg(long)]
        merchant: Option<String>,

        #[arg(long)]
        description: Option<String>,

        #[arg(long)]
        category_id: Option<i64>,
    },

    /// Import a CSV of date,amount,merchant,description rows
    Import { file: PathBuf },

    /// List and edit transactions
    Transactions {
        #[command(subcommand)]
        command: TransactionsCommand,
    },

    /// List categories
    Categories,

    /// Regex rule matcher
    Rules {
        #[command(subcommand)]
        command: RunCommand,
    },

    /// LLM-backed classifier
    Ai {
        #[command(subcommand)]
        command: AiCommand,
    },

    /// Suggestion review queue
    Review {
        #[command(subcommand)]
        command: ReviewCommand,
    },
}

#[derive(Subcommand, Debug)]
enum TransactionsCommand {
    /// Most recent first
    List {
        #[arg(long)]
        uncategorized: bool,

        #[arg(long, default_value_t = 50)]
        limit: u32,
    },

    /// Set a transaction's category; omit the category to clear it
    SetCategory {
        id: i64,
        category_id: Option<i64>,
    },

    Delete { id: i64 },

    /// Count uncategorized transactions
    Uncategorized,
}

#[derive(Subcommand, Debug)]
enum RunCommand {
    /// Show what would be assigned without writing anything
    Preview,
    /// Assign categories to uncategorized transactions
    Apply,
}

#[derive(Subcommand, Debug)]
enum AiCommand {
    /// Show which classifier mode is configured
    Mode,
    /// Classify a small batch without writing anything
    Preview,
    /// Classify a batch and assign the results
    Apply,
}

#[derive(Subcommand, Debug)]
enum ReviewCommand {
    /// Propose a category for every uncategorized transaction
    Populate,
    /// List pending suggestions
    Pending,
    /// Accept pending suggestions and write their categories
    Accept(Target),
    /// Reject pending suggestions
    Reject(Target),
}

#[derive(clap::Args, Debug)]
struct Target {
    /// Transaction ids
    #[arg(required_unless_present = "all", conflicts_with = "all")]
    ids: Vec<i64>,

    /// Every pending suggestion
    #[arg(long)]
    all: bool,
}

pub(crate) fn execute(args: Cli, config: &Config) -> Result<()> {
    let out = cli::Output { json: args.json };

    // Answered from configuration alone, no database needed
    if let Command::Ai {
        command: AiCommand::Mode,
    } = &args.command
    {
        return cli::ai_mode(&out, config);
    }

    let db_path = config.resolve_db_path(args.db)?;
    let mut db = Database::open(&db_path)
        .with_context(|| format!("Failed to open database {}", db_path.display()))?;
    tracing::debug!(path = %db_path.display(), "opened database");

    match args.command {
        Command::Setup => cli::setup(&out, &mut db),
        Command::Seed => cli::seed(&out, &mut db),
        Command::Add {
            date,
            amount,
            merchant,
            description,
            category_id,
        } => {
            let input = crate::ledger::NewTransaction {
                date,
                amount,
                merchant,
                description,
                category_id,
            };
            cli::add(&out, &db, &input)
        }
        Command::Import { file } => cli::import(&out, &mut db, &file),
        Command::Transactions { command } => match command {
            TransactionsCommand::List {
                uncategorized,
                limit,
            } => cli::list_transactions(&out, &db, limit, uncategorized),
            TransactionsCommand::SetCategory { id, category_id } => {
                cli::set_category(&out, &db, id, category_id)
            }
            TransactionsCommand::Delete { id } => cli::delete(&out, &db, id),
            TransactionsCommand::Uncategorized => cli::uncategorized_count(&out, &db),
        },
        Command::Categories => cli::categories(&out, &db),
        Command::Rules { command } => match command {
            RunCommand::Preview => cli::rules_preview(&out, &db),
            RunCommand::Apply => cli::rules_apply(&out, &mut db),
        },
        Command::Ai { command } => match command {
            AiCommand::Mode => cli::ai_mode(&out, config),
            AiCommand::Preview => cli::ai_preview(&out, &db, config),
            AiCommand::Apply => cli::ai_apply(&out, &mut db, config),
        },
        Command::Review { command } => match command {
            ReviewCommand::Populate => cli::review_populate(&out, &mut db),
            ReviewCommand::Pending => cli::review_pending(&out, &db),
            ReviewCommand::Accept(target) => {
                cli::review_resolve(&out, &mut db, target.into(), Resolution::Accepted)
            }
            ReviewCommand::Reject(target) => {
                cli::review_resolve(&out, &mut db, target.into(), Resolution::Rejected)
            }
        },
    }
}

impl From<Target> for Selection {
    fn from(target: Target) -> Self {
        if target.all {
            Self::All
        } else {
            Self::Transactions(target.ids)
        }
    }
}
