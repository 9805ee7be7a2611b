//! Types that represent the core data model, such as `Expense`, `Category` and `ExchangeRate`.
mod amount;
mod category;
mod currency;
mod exchange_rate;
mod expense;

pub use amount::{Amount, AmountError};
pub use category::{Category, CategoryUpdate};
pub use currency::CurrencyCode;
pub use exchange_rate::ExchangeRate;
pub use expense::{Expense, ExpenseFilter, ExpenseUpdate, NewExpense};
