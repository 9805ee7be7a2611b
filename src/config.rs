//! Configuration file handling.
//!
//! The configuration file is stored at `$GYM_EXPENSES_HOME/config.json`. It holds the base
//! currency that expenses without a currency are recorded in, the default target currency for
//! reports, the default page size and the fallback exchange rate table.

use crate::db::Db;
use crate::fx::{Converter, FallbackRates};
use crate::model::CurrencyCode;
use crate::{utils, Result};
use anyhow::{bail, ensure, Context};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

const APP_NAME: &str = "gym-expenses";
const CONFIG_VERSION: u8 = 1;
const BASE_CURRENCY: &str = "UYU";
const PAGE_SIZE: u32 = 10;
const CONFIG_JSON: &str = "config.json";
const EXPENSES_SQLITE: &str = "gym-expenses.sqlite";

/// The `Config` object represents the configuration of the app. You instantiate it by providing
/// the path to `$GYM_EXPENSES_HOME` and from there it loads `$GYM_EXPENSES_HOME/config.json` and
/// opens the SQLite database next to it.
#[derive(Debug, Clone)]
pub struct Config {
    root: PathBuf,
    config_path: PathBuf,
    config_file: ConfigFile,
    db: Db,
    sqlite_path: PathBuf,
}

impl Config {
    /// Creates the data directory along with an initial `config.json` and an empty database.
    ///
    /// # Arguments
    /// - `dir` - The directory that will be the root of data directory, e.g. `$HOME/gym-expenses`
    /// - `base_currency` - The currency expenses are recorded in when none is given. Defaults to
    ///   `UYU`. New configs use it as the default report currency too.
    ///
    /// # Errors
    /// - Returns an error if the directory already holds a config or a database, or if any file
    ///   operations fail.
    pub async fn create(
        dir: impl Into<PathBuf>,
        base_currency: Option<CurrencyCode>,
    ) -> Result<Self> {
        let maybe_relative = dir.into();
        utils::make_dir(&maybe_relative)
            .await
            .context("Unable to create the home directory")?;
        let root = utils::canonicalize(&maybe_relative).await?;

        let config_path = root.join(CONFIG_JSON);
        if config_path.exists() {
            bail!("A config file already exists at '{}'", config_path.display());
        }

        let base_currency = base_currency.unwrap_or_else(|| CurrencyCode::new(BASE_CURRENCY));
        ensure!(!base_currency.is_empty(), "The base currency cannot be empty");

        let db_path = root.join(EXPENSES_SQLITE);
        let db = Db::init(&db_path)
            .await
            .context("Unable to create SQLite DB")?;

        let config_file = ConfigFile {
            default_target_currency: base_currency.clone(),
            base_currency,
            ..ConfigFile::default()
        };
        config_file.save(&config_path).await?;

        Ok(Self {
            root,
            config_path,
            config_file,
            db,
            sqlite_path: db_path,
        })
    }

    /// This will
    /// - validate that the home directory exists and that the config file exists
    /// - load and validate the config file
    /// - open the database, migrating it if needed
    pub async fn load(home: impl Into<PathBuf>) -> Result<Self> {
        let maybe_relative = home.into();
        let root = utils::canonicalize(&maybe_relative)
            .await
            .context("The home directory is missing, run 'gym-expenses init' first")?;
        let _ = utils::read_dir(&root).await?;

        let config_path = root.join(CONFIG_JSON);
        if !config_path.is_file() {
            bail!("The config file is missing '{}'", config_path.display())
        }
        let config_file = ConfigFile::load(&config_path).await?;

        let db_path = root.join(EXPENSES_SQLITE);
        let db = Db::load(&db_path)
            .await
            .context("Unable to load SQLite DB")?;

        Ok(Self {
            root,
            config_path,
            config_file,
            db,
            sqlite_path: db_path,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub(crate) fn db(&self) -> &Db {
        &self.db
    }

    pub fn sqlite_path(&self) -> &Path {
        &self.sqlite_path
    }

    pub fn base_currency(&self) -> &CurrencyCode {
        &self.config_file.base_currency
    }

    pub fn default_target_currency(&self) -> &CurrencyCode {
        &self.config_file.default_target_currency
    }

    pub fn page_size(&self) -> u32 {
        self.config_file.page_size
    }

    pub fn fallback_rates(&self) -> &FallbackRates {
        &self.config_file.fallback_rates
    }

    /// A converter backed by the stored rates and the configured fallback table.
    pub fn converter(&self) -> Converter {
        Converter::new(
            Arc::new(self.db.clone()),
            self.config_file.fallback_rates.clone(),
        )
    }
}

/// Represents the serialization and deserialization format of the configuration file.
///
/// Example configuration:
/// ```json
/// {
///   "app_name": "gym-expenses",
///   "config_version": 1,
///   "base_currency": "UYU",
///   "default_target_currency": "USD",
///   "page_size": 10,
///   "fallback_rates": { "USD": { "UYU": "42.5" } }
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
struct ConfigFile {
    /// Application name, should always be "gym-expenses"
    app_name: String,

    /// Configuration file version
    config_version: u8,

    base_currency: CurrencyCode,

    /// Used by `expense list` and `expense total` when no target currency is given
    default_target_currency: CurrencyCode,

    #[serde(default = "default_page_size")]
    page_size: u32,

    /// Missing in older files means the built-in table
    #[serde(default)]
    fallback_rates: FallbackRates,
}

fn default_page_size() -> u32 {
    PAGE_SIZE
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            app_name: APP_NAME.to_string(),
            config_version: CONFIG_VERSION,
            base_currency: CurrencyCode::new(BASE_CURRENCY),
            default_target_currency: CurrencyCode::new(BASE_CURRENCY),
            page_size: PAGE_SIZE,
            fallback_rates: FallbackRates::default(),
        }
    }
}

impl ConfigFile {
    /// Loads and validates a ConfigFile from the specified path.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed, or if its values are invalid
    async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = utils::read(path).await?;
        let config: ConfigFile = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file at {}", path.display()))?;
        config
            .validate()
            .with_context(|| format!("Invalid config file at {}", path.display()))?;
        Ok(config)
    }

    async fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let data = serde_json::to_string_pretty(self).context("Unable to serialize config")?;
        utils::write(path, data)
            .await
            .context("Unable to write config file")
    }

    fn validate(&self) -> Result<()> {
        ensure!(
            self.app_name == APP_NAME,
            "Invalid app_name in config file: expected '{}', got '{}'",
            APP_NAME,
            self.app_name
        );
        ensure!(!self.base_currency.is_empty(), "base_currency is empty");
        ensure!(
            !self.default_target_currency.is_empty(),
            "default_target_currency is empty"
        );
        ensure!(self.page_size > 0, "page_size must be at least 1");
        self.fallback_rates.validate()
    }
}
