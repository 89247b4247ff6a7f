#![warn(clippy::all)]

#[macro_use]
extern crate error_chain;

mod account_names;
mod budget_formatter;
mod cli;
mod collector;
mod consolidator;
mod constants;
mod exchange_rates;
mod exchange_rates_client;
mod reconciler;
mod types;
mod utilities;
mod ynab_client;

pub mod errors {
    use crate::types::CurrencyCode;

    error_chain! {
        errors {
            BudgetNotFound(budget_id: String) {
                description("budget not found")
                display("Budget not found in YNAB: {}", budget_id)
            }
            MissingAdjustmentCategory(budget_id: String) {
                description("budget has no category for adjustments")
                display(
                    "Budget's first category group has no category to assign adjustments to: {}",
                    budget_id
                )
            }
            MissingExchangeRate(from: CurrencyCode, to: CurrencyCode) {
                description("exchange rate not available")
                display("No exchange rate available from {} to {}", from, to)
            }
            Service(message: String) {
                description("YNAB service error")
                display("{}", message)
            }
        }
    }
}

pub use cli::run;
