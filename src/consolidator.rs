use chrono::NaiveDate;
use log::debug;

use crate::budget_formatter::*;
use crate::collector::*;
use crate::errors::*;
use crate::exchange_rates::*;
use crate::reconciler::*;
use crate::types::*;
use crate::ynab_client::*;

/// Everything a consolidation run shares, built once at startup.
pub struct ConsolidationContext<'a> {
    pub budget_service: &'a dyn BudgetService,
    pub exchange_rates: &'a ExchangeRateTable,
    pub budgets: Vec<Budget>,
    pub today_date: NaiveDate,
    pub dry_run: bool,
}

#[derive(Debug)]
pub struct ConsolidationSummary {
    pub reconciliation: Reconciliation,
    pub posted_count: usize,
}

impl<'a> ConsolidationContext<'a> {
    pub fn load(
        budget_service: &'a dyn BudgetService,
        exchange_rates: &'a ExchangeRateTable,
        today_date: NaiveDate,
        dry_run: bool,
    ) -> Result<ConsolidationContext<'a>> {
        println!("Loading budgets from YNAB...");
        let budgets = budget_service.get_budgets()?;
        debug!("Budgets received from YNAB: {:#?}", &budgets);
        Ok(ConsolidationContext {
            budget_service,
            exchange_rates,
            budgets,
            today_date,
            dry_run,
        })
    }

    pub fn find_budget(&self, budget_id: &YnabBudgetId) -> Result<&Budget> {
        self.budgets
            .iter()
            .find(|budget| &budget.id == budget_id)
            .chain_err(|| ErrorKind::BudgetNotFound(budget_id.to_string()))
    }
}

pub struct Consolidator<'a> {
    context: &'a ConsolidationContext<'a>,
    destination_budget_id: &'a YnabBudgetId,
    destination_formatter: BudgetFormatter<'a>,
}

impl<'a> Consolidator<'a> {
    pub fn run(
        context: &'a ConsolidationContext<'a>,
        source_budget_ids: &[YnabBudgetId],
        destination_budget_id: &'a YnabBudgetId,
    ) -> Result<ConsolidationSummary> {
        let destination_budget = context.find_budget(destination_budget_id)?;
        let destination_settings = context
            .budget_service
            .get_budget_settings(destination_budget_id)?;
        let destination_currency =
            CurrencyCode::from_str(&destination_settings.currency_format.iso_code).chain_err(|| {
                ErrorKind::Service(format!(
                    "Invalid currency for budget: {}",
                    destination_budget.name
                ))
            })?;
        println!(
            "Consolidating into {} ({}) using exchange rates from {}",
            destination_budget.name,
            destination_currency,
            context.exchange_rates.reference_date()
        );
        let consolidator = Consolidator {
            context,
            destination_budget_id,
            destination_formatter: BudgetFormatter::new(&destination_settings),
        };
        let expected_balances = collect_expected_balances(
            context,
            source_budget_ids,
            destination_currency,
            &consolidator.destination_formatter,
        )?;
        let reconciliation = reconcile(context, destination_budget_id, &expected_balances)?;
        let posted_count = consolidator.post_adjustments(&reconciliation.adjustments)?;
        consolidator.print_summary(&reconciliation, posted_count);
        Ok(ConsolidationSummary {
            reconciliation,
            posted_count,
        })
    }

    // Posted one at a time in destination account order.  A failure stops the
    // run; adjustments already posted stay posted.
    fn post_adjustments(&self, adjustments: &[AdjustmentTransaction]) -> Result<usize> {
        let mut posted_count = 0;
        for adjustment in adjustments {
            self.print_adjustment(adjustment);
            if self.context.dry_run {
                continue;
            }
            self.context
                .budget_service
                .create_transaction(self.destination_budget_id, adjustment)?;
            posted_count += 1;
        }
        Ok(posted_count)
    }

    fn print_adjustment(&self, adjustment: &AdjustmentTransaction) {
        println!("  Updating {}:", adjustment.account_name);
        println!(
            "        Date: {}",
            self.destination_formatter.format_date(adjustment.date)
        );
        println!("        Memo: {}", adjustment.memo);
        println!(
            "      Amount: {}",
            self.destination_formatter.format_milliunits(adjustment.amount)
        );
    }

    fn print_summary(&self, reconciliation: &Reconciliation, posted_count: usize) {
        if reconciliation.adjustments.is_empty() {
            println!("All destination balances already match; nothing to do!");
        } else if self.context.dry_run {
            println!(
                "\nNOTE: {} adjustment(s) were not actually saved (dry run).",
                reconciliation.adjustments.len()
            );
        } else {
            println!("Saved {} adjustment(s).", posted_count);
        }
        if !reconciliation.unmatched_destination_accounts.is_empty() {
            println!("\nDestination accounts with no matching source account:");
            for name in &reconciliation.unmatched_destination_accounts {
                println!("  {}", name);
            }
        }
        if !reconciliation.missing_in_destination.is_empty() {
            println!("\nSource accounts missing in destination budget (create them manually):");
            for name in &reconciliation.missing_in_destination {
                println!("  {}", name);
            }
        }
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use crate::budget_formatter::tests::*;
    use crate::exchange_rates::tests::*;
    use std::cell::RefCell;
    use std::collections::HashMap;
    use ynab_api::models::BudgetSettings;

    pub struct FakeBudgetService {
        budgets: Vec<(Budget, &'static str)>,
        accounts: HashMap<String, Vec<Account>>,
        category_groups: HashMap<String, Vec<CategoryGroup>>,
        fail_after_created: Option<usize>,
        pub created: RefCell<Vec<(YnabBudgetId, AdjustmentTransaction)>>,
    }

    pub fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2019, 10, 5).unwrap()
    }

    fn budget(id: &str, name: &str, iso_code: &'static str) -> (Budget, &'static str) {
        (
            Budget {
                id: YnabBudgetId(id.to_string()),
                name: name.to_string(),
            },
            iso_code,
        )
    }

    fn account(id: &str, name: &str, balance: i64, closed: bool) -> Account {
        Account {
            id: YnabAccountId(id.to_string()),
            name: name.to_string(),
            closed,
            deleted: false,
            balance: Milliunits::from_scaled_i64(balance),
        }
    }

    fn deleted_account(id: &str, name: &str, balance: i64) -> Account {
        Account {
            deleted: true,
            ..account(id, name, balance, false)
        }
    }

    fn category_group(category_ids: &[&str]) -> CategoryGroup {
        CategoryGroup {
            name: "Internal Master Category".to_string(),
            category_ids: category_ids
                .iter()
                .map(|id| YnabCategoryId(id.to_string()))
                .collect(),
        }
    }

    impl FakeBudgetService {
        /// Source budgets "bank-a" (EUR), "savings" (USD), "british-airways"
        /// (GBP) and "swiss" (CHF, no exchange rate), and destination budget
        /// "dest" (USD).
        pub fn standard() -> FakeBudgetService {
            let mut accounts = HashMap::new();
            accounts.insert(
                "bank-a".to_string(),
                vec![
                    account("a1", "Checking", 150_000, false),
                    account("a2", "BA Savings", 20_000, false),
                    account("a3", "Old Account", 5_000, true),
                    deleted_account("a4", "Gone", 7_000),
                ],
            );
            accounts.insert(
                "savings".to_string(),
                vec![
                    account("s1", "Empty", 0, false),
                    account("s2", "Emergency Fund", 300_000, false),
                ],
            );
            accounts.insert(
                "british-airways".to_string(),
                vec![account("b1", "Checking", 88_000, false)],
            );
            accounts.insert(
                "swiss".to_string(),
                vec![account("w1", "Konto", 1_000, false)],
            );
            accounts.insert(
                "dest".to_string(),
                vec![
                    account("d1", "BA Checking", 100_000, false),
                    account("d2", "BA Savings", 22_000, false),
                    account("d3", "Cash", 5_000, false),
                    account("d4", "Savings Emergency Fund", 250_000, false),
                    deleted_account("d5", "BA Gone", 1_000),
                ],
            );
            accounts.insert("no-categories".to_string(), vec![]);
            let mut category_groups = HashMap::new();
            category_groups.insert("dest".to_string(), vec![category_group(&["inflow"])]);
            category_groups.insert("no-categories".to_string(), vec![category_group(&[])]);
            FakeBudgetService {
                budgets: vec![
                    budget("bank-a", "Bank A", "EUR"),
                    budget("savings", "Savings", "USD"),
                    budget("british-airways", "British Airways", "GBP"),
                    budget("swiss", "Swiss", "CHF"),
                    budget("dest", "Consolidated", "USD"),
                    budget("no-categories", "No Categories", "USD"),
                ],
                accounts,
                category_groups,
                fail_after_created: None,
                created: RefCell::new(vec![]),
            }
        }

        pub fn failing_after(created_count: usize) -> FakeBudgetService {
            FakeBudgetService {
                fail_after_created: Some(created_count),
                ..FakeBudgetService::standard()
            }
        }

        /// Applies created transactions to the account balances, as YNAB would.
        fn apply_created(&mut self) {
            for (budget_id, adjustment) in self.created.borrow_mut().drain(..) {
                if let Some(accounts) = self.accounts.get_mut(&budget_id.0) {
                    for account in accounts.iter_mut() {
                        if account.id == adjustment.account_id {
                            account.balance = account.balance + adjustment.amount;
                        }
                    }
                }
            }
        }
    }

    impl BudgetService for FakeBudgetService {
        fn get_budgets(&self) -> Result<Vec<Budget>> {
            Ok(self.budgets.iter().map(|(budget, _)| budget.clone()).collect())
        }

        fn get_budget_settings(&self, budget_id: &YnabBudgetId) -> Result<BudgetSettings> {
            self.budgets
                .iter()
                .find(|(budget, _)| &budget.id == budget_id)
                .map(|(_, iso_code)| budget_settings(iso_code))
                .chain_err(|| ErrorKind::Service("Failed to load budget settings from YNAB".to_string()))
        }

        fn get_accounts(&self, budget_id: &YnabBudgetId) -> Result<Vec<Account>> {
            self.accounts
                .get(&budget_id.0)
                .cloned()
                .chain_err(|| ErrorKind::Service("Failed to load accounts from YNAB".to_string()))
        }

        fn get_category_groups(&self, budget_id: &YnabBudgetId) -> Result<Vec<CategoryGroup>> {
            Ok(self
                .category_groups
                .get(&budget_id.0)
                .cloned()
                .unwrap_or_default())
        }

        fn create_transaction(
            &self,
            budget_id: &YnabBudgetId,
            adjustment: &AdjustmentTransaction,
        ) -> Result<()> {
            let mut created = self.created.borrow_mut();
            if Some(created.len()) == self.fail_after_created {
                bail!(ErrorKind::Service(
                    "Failed to save new transaction to YNAB: 429 too_many_requests".to_string()
                ));
            }
            created.push((budget_id.clone(), adjustment.clone()));
            Ok(())
        }
    }

    fn ids(ids: &[&str]) -> Vec<YnabBudgetId> {
        ids.iter().map(|id| YnabBudgetId(id.to_string())).collect()
    }

    fn run(service: &FakeBudgetService, sources: &[&str], dry_run: bool) -> Result<ConsolidationSummary> {
        let exchange_rates = euro_table();
        let context = ConsolidationContext::load(service, &exchange_rates, today(), dry_run)?;
        let destination = YnabBudgetId("dest".to_string());
        Consolidator::run(&context, &ids(sources), &destination)
    }

    #[test]
    fn test_run_posts_adjustments() {
        let service = FakeBudgetService::standard();
        let summary = run(&service, &["bank-a", "savings"], false).unwrap();
        assert_eq!(summary.posted_count, 2);
        let created = service.created.borrow();
        let amounts: Vec<(&str, i64)> = created
            .iter()
            .map(|(budget_id, adjustment)| {
                assert_eq!(budget_id.0, "dest");
                (adjustment.account_id.0.as_str(), adjustment.amount.to_scaled_i64())
            })
            .collect();
        assert_eq!(amounts, vec![("d1", 65_000), ("d4", 50_000)]);
        assert_eq!(created[0].1.date, today());
        assert_eq!(created[0].1.category_id, YnabCategoryId("inflow".to_string()));
        assert_eq!(created[0].1.memo, "150.000 EUR @ 1.1");
        assert!(created[0].1.cleared);
        assert!(created[0].1.approved);
    }

    #[test]
    fn test_run_reports_unmatched_accounts() {
        let service = FakeBudgetService::standard();
        let summary = run(&service, &["bank-a", "savings"], false).unwrap();
        assert_eq!(
            summary.reconciliation.unmatched_destination_accounts,
            vec!["Cash".to_string()]
        );
        assert_eq!(
            summary.reconciliation.missing_in_destination,
            vec![NormalizedAccountName::new("savings empty")]
        );
    }

    #[test]
    fn test_run_ignores_deleted_accounts() {
        let service = FakeBudgetService::standard();
        let summary = run(&service, &["bank-a"], false).unwrap();
        assert!(!summary
            .reconciliation
            .missing_in_destination
            .contains(&NormalizedAccountName::new("ba gone")));
        assert!(!summary
            .reconciliation
            .unmatched_destination_accounts
            .contains(&"BA Gone".to_string()));
        assert!(service
            .created
            .borrow()
            .iter()
            .all(|(_, adjustment)| adjustment.account_id.0 != "d5"));
    }

    #[test]
    fn test_second_run_has_no_adjustments() {
        let mut service = FakeBudgetService::standard();
        run(&service, &["bank-a", "savings"], false).unwrap();
        service.apply_created();
        let summary = run(&service, &["bank-a", "savings"], false).unwrap();
        assert!(summary.reconciliation.adjustments.is_empty());
        assert_eq!(summary.posted_count, 0);
        assert!(service.created.borrow().is_empty());
    }

    #[test]
    fn test_dry_run_posts_nothing() {
        let service = FakeBudgetService::standard();
        let summary = run(&service, &["bank-a", "savings"], true).unwrap();
        assert_eq!(summary.reconciliation.adjustments.len(), 2);
        assert_eq!(summary.posted_count, 0);
        assert!(service.created.borrow().is_empty());
    }

    #[test]
    fn test_unknown_destination_budget() {
        let service = FakeBudgetService::standard();
        let exchange_rates = euro_table();
        let context = ConsolidationContext::load(&service, &exchange_rates, today(), false).unwrap();
        let err = Consolidator::run(
            &context,
            &ids(&["bank-a"]),
            &YnabBudgetId("missing".to_string()),
        )
        .unwrap_err();
        match err.kind() {
            ErrorKind::BudgetNotFound(budget_id) => assert_eq!(budget_id, "missing"),
            kind => panic!("Unexpected error: {:?}", kind),
        }
        assert!(service.created.borrow().is_empty());
    }

    #[test]
    fn test_destination_without_category() {
        let service = FakeBudgetService::standard();
        let exchange_rates = euro_table();
        let context = ConsolidationContext::load(&service, &exchange_rates, today(), false).unwrap();
        let err = Consolidator::run(
            &context,
            &ids(&["bank-a"]),
            &YnabBudgetId("no-categories".to_string()),
        )
        .unwrap_err();
        match err.kind() {
            ErrorKind::MissingAdjustmentCategory(budget_id) => {
                assert_eq!(budget_id, "no-categories")
            }
            kind => panic!("Unexpected error: {:?}", kind),
        }
        assert!(service.created.borrow().is_empty());
    }

    #[test]
    fn test_missing_exchange_rate_posts_nothing() {
        let service = FakeBudgetService::standard();
        let err = run(&service, &["bank-a", "swiss"], false).unwrap_err();
        match err.kind() {
            ErrorKind::MissingExchangeRate(..) => {}
            kind => panic!("Unexpected error: {:?}", kind),
        }
        assert!(service.created.borrow().is_empty());
    }

    #[test]
    fn test_service_error_keeps_posted_adjustments() {
        let service = FakeBudgetService::failing_after(1);
        let err = run(&service, &["bank-a", "savings"], false).unwrap_err();
        match err.kind() {
            ErrorKind::Service(_) => {}
            kind => panic!("Unexpected error: {:?}", kind),
        }
        let created = service.created.borrow();
        assert_eq!(created.len(), 1);
        assert_eq!(created[0].1.account_id.0, "d1");
    }
}
