use log::debug;
use std::collections::HashMap;

use crate::account_names::*;
use crate::budget_formatter::*;
use crate::consolidator::*;
use crate::errors::*;
use crate::types::*;

/// Expected destination balances, keyed by normalized account name.
pub type ExpectedBalances = HashMap<NormalizedAccountName, ConvertedBalance>;

/// Builds the expected balance of every open account in the source budgets,
/// converted to the destination currency.  Budgets are processed in the given
/// order, and a later account with the same normalized name replaces an
/// earlier one.
pub fn collect_expected_balances(
    context: &ConsolidationContext,
    source_budget_ids: &[YnabBudgetId],
    destination_currency: CurrencyCode,
    destination_formatter: &BudgetFormatter,
) -> Result<ExpectedBalances> {
    let mut expected_balances = ExpectedBalances::new();
    for budget_id in source_budget_ids {
        let budget = context.find_budget(budget_id)?;
        let settings = context.budget_service.get_budget_settings(budget_id)?;
        let currency = CurrencyCode::from_str(&settings.currency_format.iso_code)
            .chain_err(|| ErrorKind::Service(format!("Invalid currency for budget: {}", budget.name)))?;
        let budget_formatter = BudgetFormatter::new(&settings);
        let prefix = budget_prefix(&budget.name);
        println!("Getting accounts for {} ({})...", budget.name, currency);
        let accounts = context.budget_service.get_accounts(budget_id)?;
        debug!("Accounts received from YNAB: {:#?}", &accounts);
        for account in accounts.iter().filter(|account| !account.closed && !account.deleted) {
            let name = source_account_name(&prefix, &account.name);
            let original_amount = account.balance;
            let converted_amount =
                context
                    .exchange_rates
                    .convert(original_amount, currency, destination_currency)?;
            println!(
                "  {}: {} = {}",
                name,
                budget_formatter.format_milliunits_with_code(original_amount),
                destination_formatter.format_milliunits(converted_amount)
            );
            if let Some(replaced) = expected_balances.insert(
                name.clone(),
                ConvertedBalance::new(converted_amount, original_amount, currency),
            ) {
                debug!("Replaced expected balance for {}: {:?}", name, replaced);
            }
        }
    }
    Ok(expected_balances)
}
