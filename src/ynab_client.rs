use log::debug;
use std::fmt;
use ynab_api::apis::client::APIClient;
use ynab_api::apis::configuration::{ApiKey, Configuration};
use ynab_api::models;

use crate::errors::*;
use crate::reconciler::*;
use crate::types::*;
use crate::utilities::*;

/// The budgeting service operations used by consolidation.
pub trait BudgetService {
    fn get_budgets(&self) -> Result<Vec<Budget>>;

    fn get_budget_settings(&self, budget_id: &YnabBudgetId) -> Result<models::BudgetSettings>;

    fn get_accounts(&self, budget_id: &YnabBudgetId) -> Result<Vec<Account>>;

    fn get_category_groups(&self, budget_id: &YnabBudgetId) -> Result<Vec<CategoryGroup>>;

    fn create_transaction(
        &self,
        budget_id: &YnabBudgetId,
        adjustment: &AdjustmentTransaction,
    ) -> Result<()>;
}

pub struct YnabClient {
    client: APIClient,
}

// 'ynab_api::apis::Error' doesn't implement fmt::Display which makes it
// incompatible with error_chain, so we wrap it.
#[derive(Debug)]
struct YnabApiError(ynab_api::apis::Error);

impl YnabClient {
    pub fn new(api_key: String) -> YnabClient {
        let mut configuration = Configuration::new();
        configuration.api_key = Some(ApiKey {
            prefix: Some("Bearer".to_string()),
            key: api_key,
        });
        YnabClient {
            client: APIClient::new(configuration),
        }
    }
}

impl BudgetService for YnabClient {
    fn get_budgets(&self) -> Result<Vec<Budget>> {
        Ok(self
            .client
            .budgets_api()
            .get_budgets()
            .map_err(YnabApiError)
            .chain_err(|| service_error("Failed to load budgets from YNAB"))?
            .data
            .budgets
            .into_iter()
            .map(|budget| Budget {
                id: YnabBudgetId(budget.id),
                name: budget.name,
            })
            .collect())
    }

    fn get_budget_settings(&self, budget_id: &YnabBudgetId) -> Result<models::BudgetSettings> {
        Ok(self
            .client
            .budgets_api()
            .get_budget_settings_by_id(&budget_id.0)
            .map_err(YnabApiError)
            .chain_err(|| service_error("Failed to load budget settings from YNAB"))?
            .data
            .settings)
    }

    fn get_accounts(&self, budget_id: &YnabBudgetId) -> Result<Vec<Account>> {
        Ok(self
            .client
            .accounts_api()
            .get_accounts(&budget_id.0, None)
            .map_err(YnabApiError)
            .chain_err(|| service_error("Failed to load accounts from YNAB"))?
            .data
            .accounts
            .into_iter()
            .map(|account| Account {
                id: YnabAccountId(account.id),
                name: account.name,
                closed: account.closed,
                deleted: account.deleted,
                balance: Milliunits::from_scaled_i64(account.balance),
            })
            .collect())
    }

    fn get_category_groups(&self, budget_id: &YnabBudgetId) -> Result<Vec<CategoryGroup>> {
        Ok(self
            .client
            .categories_api()
            .get_categories(&budget_id.0, None)
            .map_err(YnabApiError)
            .chain_err(|| service_error("Failed to load categories from YNAB"))?
            .data
            .category_groups
            .into_iter()
            .map(|group| CategoryGroup {
                name: group.name,
                category_ids: group
                    .categories
                    .into_iter()
                    .map(|category| YnabCategoryId(category.id))
                    .collect(),
            })
            .collect())
    }

    fn create_transaction(
        &self,
        budget_id: &YnabBudgetId,
        adjustment: &AdjustmentTransaction,
    ) -> Result<()> {
        let wrapper = models::SaveTransactionsWrapper {
            transaction: Some(save_transaction(adjustment)),
            transactions: None,
        };
        let response = self
            .client
            .transactions_api()
            .create_transaction(&budget_id.0, wrapper)
            .map_err(YnabApiError)
            .chain_err(|| service_error("Failed to save new transaction to YNAB"))?;
        debug!("Response from YNAB after saving adjustment: {:#?}", response.data);
        Ok(())
    }
}

fn save_transaction(adjustment: &AdjustmentTransaction) -> models::SaveTransaction {
    use ynab_api::models::save_transaction::Cleared;
    models::SaveTransaction {
        account_id: adjustment.account_id.to_string(),
        date: format_iso_date(adjustment.date),
        amount: adjustment.amount.to_scaled_i64(),
        payee_id: None,
        payee_name: None,
        category_id: Some(adjustment.category_id.to_string()),
        memo: Some(adjustment.memo.clone()),
        cleared: Some(if adjustment.cleared {
            Cleared::Cleared
        } else {
            Cleared::Uncleared
        }),
        approved: Some(adjustment.approved),
        flag_color: None,
        import_id: None,
    }
}

fn service_error(description: &str) -> ErrorKind {
    ErrorKind::Service(description.to_string())
}

impl fmt::Display for YnabApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            ynab_api::apis::Error::Io(_) => write!(f, "YNAB API I/O error"),
            ynab_api::apis::Error::Reqwest(_) => write!(f, "YNAB API request error"),
            ynab_api::apis::Error::Serde(_) => write!(f, "YNAB API parse error"),
        }
    }
}

impl std::error::Error for YnabApiError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match &self.0 {
            ynab_api::apis::Error::Io(err) => Some(err),
            ynab_api::apis::Error::Reqwest(err) => Some(err),
            ynab_api::apis::Error::Serde(err) => Some(err),
        }
    }
}
