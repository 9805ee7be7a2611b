use crate::args::InitArgs;
use crate::commands::Out;
use crate::error::{ErrorType, IntoResult};
use crate::{Config, Result};
use anyhow::Context;
use std::path::Path;

/// Creates the data directory along with:
/// - an initial `config.json` holding the base currency and default settings
/// - an empty SQLite database at the current schema version
///
/// # Arguments
/// - `home` - The directory that will be the root of data directory, e.g. `$HOME/gym-expenses`
/// - `args` - `base_currency` defaults to `UYU`
///
/// # Errors
/// - Returns an error if the directory is already initialized or any file operations fail.
pub async fn init(home: &Path, args: InitArgs) -> Result<Out<String>> {
    let config = Config::create(home, args.base_currency)
        .await
        .context("Unable to create the data directory and configs")
        .pub_result(ErrorType::Config)?;
    let message = format!(
        "Created {} with base currency {}",
        config.root().display(),
        config.base_currency()
    );
    Ok(Out::new(message, config.root().display().to_string()))
}
