//! These structs provide the CLI interface for the gym-expenses CLI.

use crate::model::{Amount, CurrencyCode};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use std::convert::Infallible;
use std::fmt::{Display, Formatter};
use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::error;
use tracing_subscriber::filter::LevelFilter;

/// gym-expenses: track the expenses of a gym in more than one currency.
///
/// Expenses are filed under categories and recorded in the currency they were paid in. Reports
/// convert every amount into a single target currency using the exchange rates you have stored,
/// falling back to the approximate rates in config.json when a pair has never been recorded.
#[derive(Debug, Parser, Clone)]
pub struct Args {
    #[clap(flatten)]
    common: Common,

    #[command(subcommand)]
    command: Command,
}

impl Args {
    pub fn new(common: Common, command: Command) -> Self {
        Self { common, command }
    }

    pub fn common(&self) -> &Common {
        &self.common
    }

    pub fn command(&self) -> &Command {
        &self.command
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Create the data directory, config.json and the database.
    ///
    /// This is the first command you should run. By default the data lives in
    /// $HOME/gym-expenses; pass --home or set GYM_EXPENSES_HOME to put it somewhere else.
    Init(InitArgs),
    /// Store, look up and apply exchange rates.
    Rate(RateArgs),
    /// Create, list, change and remove expense categories.
    Category(CategoryArgs),
    /// Record expenses and report on them.
    Expense(ExpenseArgs),
}

/// Arguments common to all subcommands.
#[derive(Debug, Parser, Clone)]
pub struct Common {
    /// The logging verbosity. One of, from least to most verbose:
    /// off, error, warn, info, debug, trace
    ///
    /// This can be overridden by RUST_LOG.
    #[arg(long, default_value_t = LevelFilter::INFO)]
    log_level: LevelFilter,

    /// The directory where data and configuration is held. Defaults to ~/gym-expenses
    #[arg(long, env = "GYM_EXPENSES_HOME", default_value_t = default_home())]
    home: DisplayPath,

    /// Print the structured result of the command to stdout as JSON.
    #[arg(long)]
    json: bool,
}

impl Common {
    pub fn new(log_level: LevelFilter, home: PathBuf, json: bool) -> Self {
        Self {
            log_level,
            home: home.into(),
            json,
        }
    }

    pub fn log_level(&self) -> LevelFilter {
        self.log_level
    }

    pub fn home(&self) -> &DisplayPath {
        &self.home
    }

    pub fn json(&self) -> bool {
        self.json
    }
}

/// (Not shown): Args for the `gym-expenses init` command.
#[derive(Debug, Parser, Clone)]
pub struct InitArgs {
    /// The currency expenses are recorded in when none is given, e.g. UYU.
    #[arg(long)]
    pub base_currency: Option<CurrencyCode>,
}

// =============================================================================================
// rate
// =============================================================================================

#[derive(Debug, Parser, Clone)]
pub struct RateArgs {
    #[command(subcommand)]
    command: RateSubcommand,
}

impl RateArgs {
    pub fn command(&self) -> &RateSubcommand {
        &self.command
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum RateSubcommand {
    /// Store the rate for a currency pair on a date, replacing any rate already stored for that
    /// pair and date.
    Set(RateSetArgs),
    /// Show the most recent rate for a pair, using the inverse of the opposite pair if needed.
    Latest(RateLatestArgs),
    /// Convert an amount from one currency to another.
    Convert(RateConvertArgs),
    /// List every rate stored for a date.
    On(RatesOnArgs),
}

#[derive(Debug, Parser, Clone)]
pub struct RateSetArgs {
    /// The source currency, e.g. USD
    pub from: CurrencyCode,
    /// The target currency, e.g. UYU
    pub to: CurrencyCode,
    /// How many units of TO one unit of FROM buys. Must be greater than zero.
    pub rate: Decimal,
    /// The day the rate applies to (YYYY-MM-DD). Defaults to today.
    #[arg(long)]
    pub date: Option<NaiveDate>,
}

#[derive(Debug, Parser, Clone)]
pub struct RateLatestArgs {
    pub from: CurrencyCode,
    pub to: CurrencyCode,
}

#[derive(Debug, Parser, Clone)]
pub struct RateConvertArgs {
    /// The amount to convert, e.g. 1,250.50
    #[arg(allow_hyphen_values = true)]
    pub amount: Amount,
    pub from: CurrencyCode,
    pub to: CurrencyCode,
}

#[derive(Debug, Parser, Clone)]
pub struct RatesOnArgs {
    /// The day to list (YYYY-MM-DD).
    pub date: NaiveDate,
}

// =============================================================================================
// category
// =============================================================================================

#[derive(Debug, Parser, Clone)]
pub struct CategoryArgs {
    #[command(subcommand)]
    command: CategorySubcommand,
}

impl CategoryArgs {
    pub fn command(&self) -> &CategorySubcommand {
        &self.command
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum CategorySubcommand {
    /// Create a category. Names must be unique.
    Insert(InsertCategoryArgs),
    /// List all categories with the number of expenses in each.
    List,
    /// Show one category.
    Get(IdArgs),
    /// Change the name or description of a category.
    Update(UpdateCategoryArgs),
    /// Remove a category. Fails while any expense is filed under it.
    Delete(IdArgs),
}

#[derive(Debug, Parser, Clone)]
pub struct InsertCategoryArgs {
    pub name: String,
    #[arg(long)]
    pub description: Option<String>,
}

#[derive(Debug, Parser, Clone)]
pub struct UpdateCategoryArgs {
    pub id: String,
    #[arg(long)]
    pub name: Option<String>,
    #[arg(long)]
    pub description: Option<String>,
}

/// (Not shown): Args for commands that address a single record.
#[derive(Debug, Parser, Clone)]
pub struct IdArgs {
    pub id: String,
}

// =============================================================================================
// expense
// =============================================================================================

#[derive(Debug, Parser, Clone)]
pub struct ExpenseArgs {
    #[command(subcommand)]
    command: ExpenseSubcommand,
}

impl ExpenseArgs {
    pub fn command(&self) -> &ExpenseSubcommand {
        &self.command
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum ExpenseSubcommand {
    /// Record an expense.
    Insert(InsertExpenseArgs),
    /// Show one expense.
    Get(IdArgs),
    /// Change fields of an expense. Fields that are not given are left as they are.
    Update(UpdateExpenseArgs),
    /// Remove an expense.
    Delete(IdArgs),
    /// List expenses, newest first, converted into the target currency.
    List(ListExpensesArgs),
    /// Total the matching expenses in the target currency, broken down by category.
    Total(TotalExpensesArgs),
}

#[derive(Debug, Parser, Clone)]
pub struct InsertExpenseArgs {
    /// The amount paid, e.g. 1,250.50
    #[arg(long, allow_hyphen_values = true)]
    pub amount: Amount,
    #[arg(long)]
    pub category_id: String,
    /// The day the expense was paid (YYYY-MM-DD).
    #[arg(long)]
    pub date: NaiveDate,
    #[arg(long)]
    pub description: Option<String>,
    /// The currency the expense was paid in. Defaults to the base currency in config.json.
    #[arg(long)]
    pub currency: Option<CurrencyCode>,
}

#[derive(Debug, Parser, Clone)]
pub struct UpdateExpenseArgs {
    pub id: String,
    #[arg(long, allow_hyphen_values = true)]
    pub amount: Option<Amount>,
    #[arg(long)]
    pub category_id: Option<String>,
    #[arg(long)]
    pub date: Option<NaiveDate>,
    #[arg(long)]
    pub description: Option<String>,
    #[arg(long)]
    pub currency: Option<CurrencyCode>,
}

/// (Not shown): Filters shared by `expense list` and `expense total`.
#[derive(Debug, Parser, Clone, Default)]
pub struct ExpenseFilterArgs {
    #[arg(long)]
    pub category_id: Option<String>,
    /// Only expenses on or after this day (YYYY-MM-DD).
    #[arg(long)]
    pub start_date: Option<NaiveDate>,
    /// Only expenses on or before this day (YYYY-MM-DD).
    #[arg(long)]
    pub end_date: Option<NaiveDate>,
    /// The currency to report in. Defaults to default_target_currency in config.json.
    #[arg(long)]
    pub target_currency: Option<CurrencyCode>,
}

#[derive(Debug, Parser, Clone, Default)]
pub struct ListExpensesArgs {
    /// The page to show, starting at 1.
    #[arg(long)]
    pub page: Option<u32>,
    /// Rows per page. Defaults to page_size in config.json.
    #[arg(long)]
    pub limit: Option<u32>,
    #[clap(flatten)]
    pub filter: ExpenseFilterArgs,
}

#[derive(Debug, Parser, Clone, Default)]
pub struct TotalExpensesArgs {
    #[clap(flatten)]
    pub filter: ExpenseFilterArgs,
}

fn default_home() -> DisplayPath {
    DisplayPath(match dirs::home_dir() {
        Some(home) => home.join("gym-expenses"),
        None => {
            error!(
                "There was an error when trying to get your home directory. You can get around \
                this by providing --home or GYM_EXPENSES_HOME instead of relying on the default \
                home directory. If you continue using the program right now, you may have \
                problems!",
            );
            PathBuf::from("gym-expenses")
        }
    })
}

#[derive(Debug, Default, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct DisplayPath(PathBuf);

impl From<PathBuf> for DisplayPath {
    fn from(value: PathBuf) -> Self {
        DisplayPath(value)
    }
}

impl Deref for DisplayPath {
    type Target = Path;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRef<Path> for DisplayPath {
    fn as_ref(&self) -> &Path {
        &self.0
    }
}

impl Display for DisplayPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.to_string_lossy())
    }
}

impl FromStr for DisplayPath {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(PathBuf::from(s)))
    }
}

impl DisplayPath {
    pub fn path(&self) -> &Path {
        &self.0
    }
}
