use clap::Parser;
use gym_expenses::args::{Args, CategorySubcommand, Command, ExpenseSubcommand, RateSubcommand};
use gym_expenses::commands::{self, Out};
use gym_expenses::{Config, Result};
use serde::Serialize;
use std::fmt::Debug;
use tracing::{debug, error, trace};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> std::process::ExitCode {
    let args = Args::parse();
    let log_level = args.common().log_level();
    init_logger(log_level);
    debug!("Log level set to {}", log_level.to_string().to_lowercase());

    match main_inner(args).await {
        Ok(_) => std::process::ExitCode::SUCCESS,
        Err(e) => {
            error!("Exiting with error: {e:#}");
            std::process::ExitCode::FAILURE
        }
    }
}

pub async fn main_inner(args: Args) -> Result<()> {
    trace!("{args:?}");
    let home = args.common().home().path();
    let json = args.common().json();

    match args.command() {
        Command::Init(init_args) => emit(commands::init(home, init_args.clone()).await?, json),

        Command::Rate(rate_args) => {
            let config = Config::load(home).await?;
            match rate_args.command() {
                RateSubcommand::Set(a) => emit(commands::rate_set(config, a.clone()).await?, json),
                RateSubcommand::Latest(a) => {
                    emit(commands::rate_latest(config, a.clone()).await?, json)
                }
                RateSubcommand::Convert(a) => {
                    emit(commands::rate_convert(config, a.clone()).await?, json)
                }
                RateSubcommand::On(a) => emit(commands::rates_on(config, a.clone()).await?, json),
            }
        }

        Command::Category(category_args) => {
            let config = Config::load(home).await?;
            match category_args.command() {
                CategorySubcommand::Insert(a) => {
                    emit(commands::insert_category(config, a.clone()).await?, json)
                }
                CategorySubcommand::List => emit(commands::list_categories(config).await?, json),
                CategorySubcommand::Get(a) => {
                    emit(commands::get_category(config, a.clone()).await?, json)
                }
                CategorySubcommand::Update(a) => {
                    emit(commands::update_category(config, a.clone()).await?, json)
                }
                CategorySubcommand::Delete(a) => {
                    emit(commands::delete_category(config, a.clone()).await?, json)
                }
            }
        }

        Command::Expense(expense_args) => {
            let config = Config::load(home).await?;
            match expense_args.command() {
                ExpenseSubcommand::Insert(a) => {
                    emit(commands::insert_expense(config, a.clone()).await?, json)
                }
                ExpenseSubcommand::Get(a) => {
                    emit(commands::get_expense(config, a.clone()).await?, json)
                }
                ExpenseSubcommand::Update(a) => {
                    emit(commands::update_expense(config, a.clone()).await?, json)
                }
                ExpenseSubcommand::Delete(a) => {
                    emit(commands::delete_expense(config, a.clone()).await?, json)
                }
                ExpenseSubcommand::List(a) => {
                    emit(commands::list_expenses(config, a.clone()).await?, json)
                }
                ExpenseSubcommand::Total(a) => {
                    emit(commands::expense_total(config, a.clone()).await?, json)
                }
            }
        }
    }
}

fn emit<T>(out: Out<T>, json: bool) -> Result<()>
where
    T: Serialize + Clone + Debug,
{
    if json {
        out.print_json()
    } else {
        out.print();
        Ok(())
    }
}

/// Initializes the tracing subscriber.
pub fn init_logger(level: LevelFilter) {
    let filter = match std::env::var("RUST_LOG").ok() {
        Some(_) => {
            // RUST_LOG exists; use it.
            EnvFilter::from_default_env()
        }
        None => {
            // RUST_LOG does not exist; use default log level for this crate only. The library and
            // the binary share the `gym_expenses` target.
            EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), level))
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
