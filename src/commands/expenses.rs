//! Expense command handlers, including the converted listing and the totals report.

use crate::args::{
    ExpenseFilterArgs, IdArgs, InsertExpenseArgs, ListExpensesArgs, TotalExpensesArgs,
    UpdateExpenseArgs,
};
use crate::commands::Out;
use crate::db::Page;
use crate::error::{ErrorType, IntoResult};
use crate::fx::{CategoryReport, Degradation, MonetaryRecord};
use crate::model::{Amount, CurrencyCode, Expense, ExpenseFilter, ExpenseUpdate, NewExpense};
use crate::{Config, Result};
use anyhow::{anyhow, ensure};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::debug;

/// An expense as listed: the stored row plus its amount in the target currency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConvertedExpense {
    #[serde(flatten)]
    pub expense: Expense,
    pub original_amount: Decimal,
    pub original_currency: CurrencyCode,
    pub converted_amount: Decimal,
}

/// Paging information for `expense list`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageMeta {
    /// The number of expenses matching the filters, across all pages.
    pub total: u64,
    pub page: u32,
    pub limit: u32,
    pub total_pages: u64,
    /// The sum of this page's converted amounts.
    pub total_amount: Decimal,
    pub target_currency: CurrencyCode,
}

/// One page of `expense list`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExpensePage {
    pub data: Vec<ConvertedExpense>,
    pub meta: PageMeta,
    /// Currency pairs converted without a stored rate.
    pub degraded: Vec<Degradation>,
}

/// Records a new expense. The currency defaults to the configured base currency.
///
/// # Errors
///
/// - Returns a request error if the amount is negative or the category does not exist.
/// - Returns a database error if a database operation fails.
pub async fn insert_expense(config: Config, args: InsertExpenseArgs) -> Result<Out<Expense>> {
    validate_amount(args.amount).pub_result(ErrorType::Request)?;
    let category_id = args.category_id.trim().to_string();
    require_category(&config, &category_id).await?;

    let currency = args
        .currency
        .filter(|c| !c.is_empty())
        .unwrap_or_else(|| config.base_currency().clone());
    let new_expense = NewExpense {
        amount: args.amount.value(),
        description: args.description.unwrap_or_default(),
        date: args.date,
        currency,
        category_id,
    };
    let expense = config
        .db()
        .insert_expense(&new_expense)
        .await
        .pub_result(ErrorType::Database)?;

    let message = format!(
        "Inserted expense {}: {} {} in {}",
        expense.id,
        Amount::new(expense.amount),
        expense.currency,
        expense.category_name
    );
    Ok(Out::new(message, expense))
}

pub async fn get_expense(config: Config, args: IdArgs) -> Result<Out<Expense>> {
    let expense = config
        .db()
        .get_expense(&args.id)
        .await
        .pub_result(ErrorType::Database)?
        .ok_or_else(|| anyhow!("Expense '{}' not found", args.id))
        .pub_result(ErrorType::Request)?;
    let message = format!(
        "Expense {} on {}: {} {}",
        expense.id,
        expense.date,
        Amount::new(expense.amount),
        expense.currency
    );
    Ok(Out::new(message, expense))
}

/// Changes the given fields of an expense and leaves the rest as they are.
///
/// # Errors
///
/// - Returns a request error if nothing would change, the amount is negative, or the expense or
///   new category does not exist.
/// - Returns a database error if a database operation fails.
pub async fn update_expense(config: Config, args: UpdateExpenseArgs) -> Result<Out<Expense>> {
    let update = ExpenseUpdate {
        amount: args.amount.map(|a| a.value()),
        description: args.description,
        date: args.date,
        currency: args.currency.filter(|c| !c.is_empty()),
        category_id: args.category_id.map(|c| c.trim().to_string()),
    };
    if update.is_empty() {
        return Err(anyhow!("Nothing to update")).pub_result(ErrorType::Request);
    }
    if let Some(amount) = args.amount {
        validate_amount(amount).pub_result(ErrorType::Request)?;
    }
    require_expense(&config, &args.id).await?;
    if let Some(category_id) = &update.category_id {
        require_category(&config, category_id).await?;
    }

    let expense = config
        .db()
        .update_expense(&args.id, &update)
        .await
        .pub_result(ErrorType::Database)?;
    Ok(Out::new(format!("Updated expense {}", expense.id), expense))
}

pub async fn delete_expense(config: Config, args: IdArgs) -> Result<Out<Expense>> {
    require_expense(&config, &args.id).await?;
    let expense = config
        .db()
        .delete_expense(&args.id)
        .await
        .pub_result(ErrorType::Database)?;
    Ok(Out::new(format!("Deleted expense {}", expense.id), expense))
}

/// Lists one page of expenses, newest first, each converted into the target currency.
///
/// `page` starts at 1 and `limit` defaults to `page_size` from `config.json`. The meta carries the
/// number of matching expenses across all pages and the converted total of this page.
pub async fn list_expenses(config: Config, args: ListExpensesArgs) -> Result<Out<ExpensePage>> {
    let page = Page {
        page: args.page.unwrap_or(1),
        limit: args.limit.unwrap_or_else(|| config.page_size()),
    };
    validate_page(page).pub_result(ErrorType::Request)?;
    let (filter, target) = resolve_filter(&config, args.filter).pub_result(ErrorType::Request)?;

    let total = config
        .db()
        .count_expenses(&filter)
        .await
        .pub_result(ErrorType::Database)?;
    let expenses = config
        .db()
        .list_expenses(&filter, Some(page))
        .await
        .pub_result(ErrorType::Database)?;

    let records = to_records(&config, &expenses);
    let batch = config.converter().convert_records(&records, &target).await;
    let data = expenses
        .into_iter()
        .zip(batch.results)
        .map(|(expense, result)| ConvertedExpense {
            original_amount: result.original_amount,
            original_currency: result.original_currency,
            converted_amount: result.converted_amount,
            expense,
        })
        .collect::<Vec<_>>();

    let meta = PageMeta {
        total,
        page: page.page,
        limit: page.limit,
        total_pages: total.div_ceil(u64::from(page.limit)),
        total_amount: batch.total,
        target_currency: target,
    };
    debug!("Listed {} of {} expenses", data.len(), meta.total);
    let message = format!(
        "Page {} of {}: {} of {} expenses, {} {}",
        meta.page,
        meta.total_pages,
        data.len(),
        meta.total,
        Amount::new(meta.total_amount),
        meta.target_currency
    );
    Ok(Out::new(
        message,
        ExpensePage {
            data,
            meta,
            degraded: batch.degraded,
        },
    ))
}

/// Totals every matching expense in the target currency, overall and per category.
pub async fn expense_total(config: Config, args: TotalExpensesArgs) -> Result<Out<CategoryReport>> {
    let (filter, target) = resolve_filter(&config, args.filter).pub_result(ErrorType::Request)?;
    let expenses = config
        .db()
        .list_expenses(&filter, None)
        .await
        .pub_result(ErrorType::Database)?;
    let records = to_records(&config, &expenses);
    let report = config
        .converter()
        .aggregate_by_category(&records, &target)
        .await;

    let message = format!(
        "Total of {} expenses in {} categories: {} {}",
        records.len(),
        report.by_category.len(),
        Amount::new(report.total),
        report.target_currency
    );
    Ok(Out::new(message, report))
}

fn validate_amount(amount: Amount) -> Result<()> {
    ensure!(
        amount.value() >= Decimal::ZERO,
        "Expense amount cannot be negative, got {amount}"
    );
    Ok(())
}

fn validate_page(page: Page) -> Result<()> {
    ensure!(page.page >= 1, "Pages start at 1, got {}", page.page);
    ensure!(page.limit >= 1, "The page limit must be at least 1");
    Ok(())
}

async fn require_expense(config: &Config, id: &str) -> Result<()> {
    config
        .db()
        .get_expense(id)
        .await
        .pub_result(ErrorType::Database)?
        .ok_or_else(|| anyhow!("Expense '{id}' not found"))
        .pub_result(ErrorType::Request)?;
    Ok(())
}

async fn require_category(config: &Config, category_id: &str) -> Result<()> {
    config
        .db()
        .get_category(category_id)
        .await
        .pub_result(ErrorType::Database)?
        .ok_or_else(|| anyhow!("Category '{category_id}' not found"))
        .pub_result(ErrorType::Request)?;
    Ok(())
}

fn resolve_filter(
    config: &Config,
    args: ExpenseFilterArgs,
) -> Result<(ExpenseFilter, CurrencyCode)> {
    if let (Some(start), Some(end)) = (args.start_date, args.end_date) {
        ensure!(start <= end, "start date {start} is after end date {end}");
    }
    let target = args
        .target_currency
        .filter(|c| !c.is_empty())
        .unwrap_or_else(|| config.default_target_currency().clone());
    let filter = ExpenseFilter {
        category_id: args.category_id,
        start_date: args.start_date,
        end_date: args.end_date,
    };
    Ok((filter, target))
}

fn to_records(config: &Config, expenses: &[Expense]) -> Vec<MonetaryRecord> {
    expenses
        .iter()
        .map(|e| e.to_record(config.base_currency()))
        .collect()
}
