//! This module is responsible for reading, writing and managing the SQLite database.

mod migrations;

use crate::fx::RateStore;
use crate::model::{
    Category, CategoryUpdate, CurrencyCode, ExchangeRate, Expense, ExpenseFilter, ExpenseUpdate,
    NewExpense,
};
use crate::utils::{format_date, generate_id, now, parse_date, parse_timestamp};
use crate::Result;
use anyhow::{bail, Context};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use std::path::Path;
use std::str::FromStr;
use tracing::debug;

const EXPENSE_SELECT: &str = "SELECT e.id, e.amount, e.description, e.date, e.currency, \
    e.category_id, c.name AS category_name, e.created_at, e.updated_at \
    FROM expenses e JOIN categories c ON c.id = e.category_id";

const CATEGORY_SELECT: &str = "SELECT c.id, c.name, c.description, c.created_at, c.updated_at, \
    (SELECT COUNT(*) FROM expenses e WHERE e.category_id = c.id) AS expense_count \
    FROM categories c";

const RATE_SELECT: &str = "SELECT from_currency, to_currency, rate, date FROM exchange_rates";

/// A page of results: 1-based `page` of `limit` rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Page {
    pub(crate) page: u32,
    pub(crate) limit: u32,
}

impl Page {
    fn offset(&self) -> i64 {
        i64::from(self.page.saturating_sub(1)) * i64::from(self.limit)
    }
}

#[derive(Debug, Clone)]
pub(crate) struct Db {
    pool: SqlitePool,
}

impl Db {
    /// - Validates that there is a SQLite file at `path`
    /// - Creates a connection pool
    /// - Updates the database schema with migrations if it is out-of-date
    pub(crate) async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            bail!("The database file is missing '{}'", path.display());
        }
        let pool = connect(path, false).await?;
        let version = migrations::schema_version(&pool).await?;
        migrations::run(&pool, version, migrations::CURRENT_VERSION).await?;
        Ok(Self { pool })
    }

    /// - Validates that no file currently exists at `path`
    /// - Creates a new SQLite file at `path`
    /// - Initializes the database schema
    pub(crate) async fn init(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            bail!("A database already exists at '{}'", path.display());
        }
        let pool = connect(path, true).await?;
        migrations::bootstrap(&pool).await?;
        migrations::run(&pool, 0, migrations::CURRENT_VERSION).await?;
        debug!("Created database at {}", path.display());
        Ok(Self { pool })
    }

    // =========================================================================================
    // Exchange rates
    // =========================================================================================

    /// Inserts a rate or replaces the one stored for the same pair and date.
    pub(crate) async fn upsert_rate(&self, rate: &ExchangeRate) -> Result<ExchangeRate> {
        let timestamp = now();
        sqlx::query(
            "INSERT INTO exchange_rates \
             (from_currency, to_currency, rate, date, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?) \
             ON CONFLICT (from_currency, to_currency, date) \
             DO UPDATE SET rate = excluded.rate, updated_at = excluded.updated_at",
        )
        .bind(rate.from_currency().as_str())
        .bind(rate.to_currency().as_str())
        .bind(rate.rate().to_string())
        .bind(format_date(rate.date()))
        .bind(&timestamp)
        .bind(&timestamp)
        .execute(&self.pool)
        .await
        .with_context(|| {
            format!(
                "Failed to save the {}->{} rate",
                rate.from_currency(),
                rate.to_currency()
            )
        })?;
        Ok(rate.clone())
    }

    /// The most recent stored rate for exactly `from -> to`.
    pub(crate) async fn latest_rate(
        &self,
        from: &CurrencyCode,
        to: &CurrencyCode,
    ) -> Result<Option<ExchangeRate>> {
        let sql = format!(
            "{RATE_SELECT} WHERE from_currency = ? AND to_currency = ? ORDER BY date DESC LIMIT 1"
        );
        let row: Option<RateRow> = sqlx::query_as(&sql)
            .bind(from.as_str())
            .bind(to.as_str())
            .fetch_optional(&self.pool)
            .await
            .with_context(|| format!("Failed to query the {from}->{to} rate"))?;
        row.map(RateRow::into_model).transpose()
    }

    /// Every rate stored for `date`.
    pub(crate) async fn rates_on(&self, date: NaiveDate) -> Result<Vec<ExchangeRate>> {
        let sql = format!("{RATE_SELECT} WHERE date = ? ORDER BY from_currency, to_currency");
        let rows: Vec<RateRow> = sqlx::query_as(&sql)
            .bind(format_date(date))
            .fetch_all(&self.pool)
            .await
            .with_context(|| format!("Failed to query rates for {date}"))?;
        rows.into_iter().map(RateRow::into_model).collect()
    }

    // =========================================================================================
    // Categories
    // =========================================================================================

    pub(crate) async fn insert_category(
        &self,
        name: &str,
        description: Option<&str>,
    ) -> Result<Category> {
        let id = generate_id();
        let timestamp = now();
        sqlx::query(
            "INSERT INTO categories (id, name, description, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(name)
        .bind(description)
        .bind(&timestamp)
        .bind(&timestamp)
        .execute(&self.pool)
        .await
        .with_context(|| format!("Failed to insert category '{name}'"))?;
        self.get_category(&id)
            .await?
            .with_context(|| format!("Category '{id}' not found after insert"))
    }

    pub(crate) async fn get_category(&self, id: &str) -> Result<Option<Category>> {
        let sql = format!("{CATEGORY_SELECT} WHERE c.id = ?");
        let row: Option<CategoryRow> = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .with_context(|| format!("Failed to query category '{id}'"))?;
        row.map(CategoryRow::into_model).transpose()
    }

    pub(crate) async fn list_categories(&self) -> Result<Vec<Category>> {
        let sql = format!("{CATEGORY_SELECT} ORDER BY c.name");
        let rows: Vec<CategoryRow> = sqlx::query_as(&sql)
            .fetch_all(&self.pool)
            .await
            .context("Failed to query categories")?;
        rows.into_iter().map(CategoryRow::into_model).collect()
    }

    pub(crate) async fn update_category(
        &self,
        id: &str,
        update: &CategoryUpdate,
    ) -> Result<Category> {
        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new("UPDATE categories SET updated_at = ");
        qb.push_bind(now());
        if let Some(name) = &update.name {
            qb.push(", name = ").push_bind(name.clone());
        }
        if let Some(description) = &update.description {
            qb.push(", description = ").push_bind(description.clone());
        }
        qb.push(" WHERE id = ").push_bind(id.to_string());
        let result = qb
            .build()
            .execute(&self.pool)
            .await
            .with_context(|| format!("Failed to update category '{id}'"))?;
        if result.rows_affected() == 0 {
            bail!("Category '{id}' not found");
        }
        self.get_category(id)
            .await?
            .with_context(|| format!("Category '{id}' not found after update"))
    }

    /// Deletes a category. Fails if any expense still references it.
    pub(crate) async fn delete_category(&self, id: &str) -> Result<Category> {
        let category = self
            .get_category(id)
            .await?
            .with_context(|| format!("Category '{id}' not found"))?;
        if category.expense_count > 0 {
            bail!(
                "Category '{}' still has {} expense(s) and cannot be deleted",
                category.name,
                category.expense_count
            );
        }
        sqlx::query("DELETE FROM categories WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .with_context(|| format!("Failed to delete category '{id}'"))?;
        Ok(category)
    }

    // =========================================================================================
    // Expenses
    // =========================================================================================

    pub(crate) async fn insert_expense(&self, expense: &NewExpense) -> Result<Expense> {
        let id = generate_id();
        let timestamp = now();
        sqlx::query(
            "INSERT INTO expenses \
             (id, amount, description, date, currency, category_id, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(expense.amount.to_string())
        .bind(&expense.description)
        .bind(format_date(expense.date))
        .bind(expense.currency.as_str())
        .bind(&expense.category_id)
        .bind(&timestamp)
        .bind(&timestamp)
        .execute(&self.pool)
        .await
        .context("Failed to insert expense")?;
        self.get_expense(&id)
            .await?
            .with_context(|| format!("Expense '{id}' not found after insert"))
    }

    pub(crate) async fn get_expense(&self, id: &str) -> Result<Option<Expense>> {
        let sql = format!("{EXPENSE_SELECT} WHERE e.id = ?");
        let row: Option<ExpenseRow> = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .with_context(|| format!("Failed to query expense '{id}'"))?;
        row.map(ExpenseRow::into_model).transpose()
    }

    pub(crate) async fn update_expense(&self, id: &str, update: &ExpenseUpdate) -> Result<Expense> {
        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new("UPDATE expenses SET updated_at = ");
        qb.push_bind(now());
        if let Some(amount) = update.amount {
            qb.push(", amount = ").push_bind(amount.to_string());
        }
        if let Some(description) = &update.description {
            qb.push(", description = ").push_bind(description.clone());
        }
        if let Some(date) = update.date {
            qb.push(", date = ").push_bind(format_date(date));
        }
        if let Some(currency) = &update.currency {
            qb.push(", currency = ").push_bind(currency.to_string());
        }
        if let Some(category_id) = &update.category_id {
            qb.push(", category_id = ").push_bind(category_id.clone());
        }
        qb.push(" WHERE id = ").push_bind(id.to_string());
        let result = qb
            .build()
            .execute(&self.pool)
            .await
            .with_context(|| format!("Failed to update expense '{id}'"))?;
        if result.rows_affected() == 0 {
            bail!("Expense '{id}' not found");
        }
        self.get_expense(id)
            .await?
            .with_context(|| format!("Expense '{id}' not found after update"))
    }

    /// Deletes an expense and returns what was deleted.
    pub(crate) async fn delete_expense(&self, id: &str) -> Result<Expense> {
        let expense = self
            .get_expense(id)
            .await?
            .with_context(|| format!("Expense '{id}' not found"))?;
        sqlx::query("DELETE FROM expenses WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .with_context(|| format!("Failed to delete expense '{id}'"))?;
        Ok(expense)
    }

    /// Expenses matching `filter`, newest first. All of them when `page` is `None`.
    pub(crate) async fn list_expenses(
        &self,
        filter: &ExpenseFilter,
        page: Option<Page>,
    ) -> Result<Vec<Expense>> {
        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(EXPENSE_SELECT);
        push_filter(&mut qb, filter);
        qb.push(" ORDER BY e.date DESC, e.created_at DESC");
        if let Some(page) = page {
            qb.push(" LIMIT ")
                .push_bind(i64::from(page.limit))
                .push(" OFFSET ")
                .push_bind(page.offset());
        }
        let rows = qb
            .build_query_as::<ExpenseRow>()
            .fetch_all(&self.pool)
            .await
            .context("Failed to query expenses")?;
        rows.into_iter().map(ExpenseRow::into_model).collect()
    }

    pub(crate) async fn count_expenses(&self, filter: &ExpenseFilter) -> Result<u64> {
        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(
            "SELECT COUNT(*) FROM expenses e JOIN categories c ON c.id = e.category_id",
        );
        push_filter(&mut qb, filter);
        let (count,) = qb
            .build_query_as::<(i64,)>()
            .fetch_one(&self.pool)
            .await
            .context("Failed to count expenses")?;
        Ok(u64::try_from(count).unwrap_or_default())
    }
}

#[async_trait::async_trait]
impl RateStore for Db {
    async fn find_rate(
        &self,
        from: &CurrencyCode,
        to: &CurrencyCode,
    ) -> Result<Option<ExchangeRate>> {
        self.latest_rate(from, to).await
    }

    async fn upsert_rate(&self, rate: &ExchangeRate) -> Result<ExchangeRate> {
        Db::upsert_rate(self, rate).await
    }
}

async fn connect(path: &Path, create: bool) -> Result<SqlitePool> {
    let options = SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(create)
        .foreign_keys(true);
    SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await
        .with_context(|| format!("Unable to open SQLite database at {}", path.display()))
}

fn push_filter(qb: &mut QueryBuilder<Sqlite>, filter: &ExpenseFilter) {
    qb.push(" WHERE 1 = 1");
    if let Some(category_id) = &filter.category_id {
        qb.push(" AND e.category_id = ").push_bind(category_id.clone());
    }
    if let Some(start) = filter.start_date {
        qb.push(" AND e.date >= ").push_bind(format_date(start));
    }
    if let Some(end) = filter.end_date {
        qb.push(" AND e.date <= ").push_bind(format_date(end));
    }
}

fn parse_decimal(s: &str) -> Result<Decimal> {
    Decimal::from_str(s).with_context(|| format!("Invalid decimal '{s}' in database"))
}

#[derive(sqlx::FromRow)]
struct RateRow {
    from_currency: String,
    to_currency: String,
    rate: String,
    date: String,
}

impl RateRow {
    fn into_model(self) -> Result<ExchangeRate> {
        Ok(ExchangeRate::from_parts(
            CurrencyCode::new(self.from_currency),
            CurrencyCode::new(self.to_currency),
            parse_decimal(&self.rate)?,
            parse_date(&self.date)?,
        ))
    }
}

#[derive(sqlx::FromRow)]
struct CategoryRow {
    id: String,
    name: String,
    description: Option<String>,
    created_at: String,
    updated_at: String,
    expense_count: i64,
}

impl CategoryRow {
    fn into_model(self) -> Result<Category> {
        Ok(Category {
            id: self.id,
            name: self.name,
            description: self.description,
            expense_count: u64::try_from(self.expense_count).unwrap_or_default(),
            created_at: parse_timestamp(&self.created_at)?,
            updated_at: parse_timestamp(&self.updated_at)?,
        })
    }
}

#[derive(sqlx::FromRow)]
struct ExpenseRow {
    id: String,
    amount: String,
    description: String,
    date: String,
    currency: String,
    category_id: String,
    category_name: String,
    created_at: String,
    updated_at: String,
}

impl ExpenseRow {
    fn into_model(self) -> Result<Expense> {
        Ok(Expense {
            amount: parse_decimal(&self.amount)
                .with_context(|| format!("Bad amount for expense '{}'", self.id))?,
            date: parse_date(&self.date)?,
            currency: CurrencyCode::new(self.currency),
            created_at: parse_timestamp(&self.created_at)?,
            updated_at: parse_timestamp(&self.updated_at)?,
            id: self.id,
            description: self.description,
            category_id: self.category_id,
            category_name: self.category_name,
        })
    }
}
