use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tallybook::app::{self, ExpenseFields};
use tallybook::config::{default_config_path, ResolvedConfig};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const LONG_VERSION: &str = concat!(env!("CARGO_PKG_VERSION"), " (", env!("GIT_COMMIT_HASH"), ")");

#[derive(Parser)]
#[command(name = "tallybook")]
#[command(about = "Budget and spending reports")]
#[command(version, long_version = LONG_VERSION)]
struct Cli {
    /// Path to config file (defaults to ./tallybook.toml, then the XDG data dir)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// User to act on (defaults to `default_user` from the config file)
    #[arg(short, long, global = true)]
    user: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show current configuration
    Config,

    #[command(flatten)]
    Data(DataCommand),
}

/// Commands that read or write one user's data.
#[derive(Subcommand)]
enum DataCommand {
    /// Monthly dashboard: totals, per-category lines and trend
    Snapshot {
        /// Month as YYYY-MM (defaults to the current month)
        #[arg(long)]
        period: Option<String>,
    },

    /// Report over a custom date range with daily and weekly series
    Report {
        /// First day, YYYY-MM-DD
        #[arg(long)]
        start: String,

        /// Last day (inclusive), YYYY-MM-DD
        #[arg(long)]
        end: String,

        /// Restrict totals and series to one category
        #[arg(long)]
        category: Option<String>,
    },

    /// Compare a month's spending with the month before
    Trend {
        /// Month as YYYY-MM (defaults to the current month)
        #[arg(long)]
        period: Option<String>,
    },

    /// Record and correct ledger entries
    #[command(subcommand)]
    Expense(ExpenseCommand),

    /// Manage monthly budgets
    #[command(subcommand)]
    Budget(BudgetCommand),
}

#[derive(Args)]
struct ExpenseArgs {
    /// Day the money was spent, YYYY-MM-DD (defaults to today on add)
    #[arg(long)]
    date: Option<String>,

    /// Amount spent (non-negative)
    #[arg(long)]
    amount: Option<String>,

    #[arg(long)]
    category: Option<String>,

    /// Free-form note; pass an empty string to clear it
    #[arg(long)]
    note: Option<String>,

    /// Receipt reference; pass an empty string to clear it
    #[arg(long)]
    receipt: Option<String>,
}

impl From<ExpenseArgs> for ExpenseFields {
    fn from(args: ExpenseArgs) -> Self {
        Self {
            date: args.date,
            amount: args.amount,
            category: args.category,
            note: args.note,
            receipt_ref: args.receipt,
        }
    }
}

#[derive(Subcommand)]
enum ExpenseCommand {
    /// Record a new expense (requires --amount and --category)
    Add(ExpenseArgs),

    /// Change fields of an existing expense
    Edit {
        id: String,
        #[command(flatten)]
        fields: ExpenseArgs,
    },

    /// Delete an expense
    Remove { id: String },
}

#[derive(Subcommand)]
enum BudgetCommand {
    /// Set a month's total and replace its category allocations
    Set {
        /// Month as YYYY-MM
        #[arg(long)]
        period: String,

        /// Overall amount budgeted for the month
        #[arg(long)]
        total: String,

        /// Category allocation as NAME=AMOUNT (repeatable)
        #[arg(long = "category", value_name = "NAME=AMOUNT")]
        categories: Vec<String>,
    },
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let config_path = cli.config.unwrap_or_else(default_config_path);
    let config = ResolvedConfig::load_or_default(&config_path)?;

    let command = match cli.command {
        Command::Config => return print_json(&app::config_output(&config)),
        Command::Data(command) => command,
    };

    let user = app::resolve_user(&config, cli.user.as_deref())?;
    let (storage, engine) = app::open(&config);

    match command {
        DataCommand::Snapshot { period } => {
            print_json(&app::monthly_snapshot(&engine, &config, &user, period.as_deref()).await?)
        }
        DataCommand::Report {
            start,
            end,
            category,
        } => print_json(
            &app::range_report(&engine, &config, &user, &start, &end, category.as_deref())
                .await?,
        ),
        DataCommand::Trend { period } => {
            print_json(&app::trend_comparison(&engine, &config, &user, period.as_deref()).await?)
        }
        DataCommand::Expense(ExpenseCommand::Add(fields)) => {
            print_json(&app::add_expense(storage.as_ref(), &config, &user, fields.into()).await?)
        }
        DataCommand::Expense(ExpenseCommand::Edit { id, fields }) => print_json(
            &app::edit_expense(storage.as_ref(), &config, &user, &id, fields.into()).await?,
        ),
        DataCommand::Expense(ExpenseCommand::Remove { id }) => {
            print_json(&app::remove_expense(storage.as_ref(), &user, &id).await?)
        }
        DataCommand::Budget(BudgetCommand::Set {
            period,
            total,
            categories,
        }) => print_json(
            &app::set_budget(storage.as_ref(), &config, &user, &period, &total, &categories)
                .await?,
        ),
    }
}
