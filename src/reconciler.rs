use chrono::NaiveDate;
use log::debug;
use std::collections::HashSet;

use crate::account_names::*;
use crate::collector::*;
use crate::constants::*;
use crate::consolidator::*;
use crate::errors::*;
use crate::types::*;

/// A transaction that brings a destination account to its expected balance.
#[derive(Clone, Debug, PartialEq)]
pub struct AdjustmentTransaction {
    pub account_id: YnabAccountId,
    pub account_name: String,
    pub date: NaiveDate,
    pub amount: Milliunits,
    pub memo: String,
    pub category_id: YnabCategoryId,
    pub cleared: bool,
    pub approved: bool,
}

#[derive(Debug, Default)]
pub struct Reconciliation {
    pub adjustments: Vec<AdjustmentTransaction>,
    /// Destination accounts with no counterpart in any source budget.
    pub unmatched_destination_accounts: Vec<String>,
    /// Source accounts with no counterpart in the destination budget.
    pub missing_in_destination: Vec<NormalizedAccountName>,
}

/// Compares the destination budget's accounts against the expected balances.
/// Nothing is posted here.
pub fn reconcile(
    context: &ConsolidationContext,
    destination_budget_id: &YnabBudgetId,
    expected_balances: &ExpectedBalances,
) -> Result<Reconciliation> {
    let category_groups = context
        .budget_service
        .get_category_groups(destination_budget_id)?;
    let category_id = adjustment_category_id(destination_budget_id, &category_groups)?;
    debug!("Adjustment category ID: {}", category_id);
    println!("Getting accounts for destination budget...");
    let accounts = context
        .budget_service
        .get_accounts(destination_budget_id)?;
    debug!("Destination accounts received from YNAB: {:#?}", &accounts);
    Ok(reconcile_accounts(
        &accounts,
        expected_balances,
        &category_id,
        context.today_date,
    ))
}

/// The first category of the first category group.
pub fn adjustment_category_id(
    budget_id: &YnabBudgetId,
    category_groups: &[CategoryGroup],
) -> Result<YnabCategoryId> {
    category_groups
        .first()
        .and_then(|group| group.category_ids.first())
        .cloned()
        .chain_err(|| ErrorKind::MissingAdjustmentCategory(budget_id.to_string()))
}

// Closed destination accounts are matched like open ones; only deleted
// destination accounts are skipped.
pub fn reconcile_accounts(
    accounts: &[Account],
    expected_balances: &ExpectedBalances,
    category_id: &YnabCategoryId,
    date: NaiveDate,
) -> Reconciliation {
    let mut reconciliation = Reconciliation::default();
    let mut matched = HashSet::new();
    for account in accounts {
        if account.deleted {
            debug!("Skipping deleted destination account: {}", account.name);
            continue;
        }
        let name = destination_account_name(&account.name);
        let expected = match expected_balances.get(&name) {
            Some(expected) => expected,
            None => {
                debug!("No source account for destination account: {}", account.name);
                reconciliation
                    .unmatched_destination_accounts
                    .push(account.name.clone());
                continue;
            }
        };
        matched.insert(name);
        let current_balance = account.balance;
        if current_balance == expected.converted_amount {
            continue;
        }
        reconciliation.adjustments.push(AdjustmentTransaction {
            account_id: account.id.clone(),
            account_name: account.name.clone(),
            date,
            amount: expected.converted_amount - current_balance,
            memo: format_adjustment_memo(expected),
            category_id: category_id.clone(),
            cleared: true,
            approved: true,
        });
    }
    reconciliation.missing_in_destination = expected_balances
        .keys()
        .filter(|name| !matched.contains(*name))
        .cloned()
        .collect();
    reconciliation.missing_in_destination.sort();
    reconciliation
}
