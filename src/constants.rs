use crate::types::*;

pub const DEFAULT_EXCHANGE_RATES_URL: &str =
    "https://www.ecb.europa.eu/stats/eurofxref/eurofxref-daily.xml";
pub const EXCHANGE_RATES_BASE_CURRENCY: &str = "EUR";

pub const SOURCE_BUDGET_ID_ARG: &str = "source-budget-id";
pub const SOURCE_BUDGET_IDS_ENV: &str = "YNAB_SOURCE_BUDGET_IDS";
pub const DESTINATION_BUDGET_ID_ARG: &str = "destination-budget-id";
pub const DESTINATION_BUDGET_ID_ENV: &str = "YNAB_DESTINATION_BUDGET_ID";
pub const YNAB_ACCESS_TOKEN_ARG: &str = "ynab-access-token";
pub const YNAB_ACCESS_TOKEN_ENV: &str = "YNAB_ACCESS_TOKEN";
pub const EXCHANGE_RATES_URL_ARG: &str = "exchange-rates-url";
pub const EXCHANGE_RATES_URL_ENV: &str = "CONSOLIDATE_EXCHANGE_RATES_URL";
pub const DRY_RUN_ARG: &str = "dry-run";

const MEMO_RATE_DECIMAL_PLACES: u32 = 3;

pub fn format_adjustment_memo(balance: &ConvertedBalance) -> String {
    format!(
        "{} {} @ {}",
        balance.original_amount.to_decimal(),
        balance.currency,
        balance
            .effective_rate
            .to_decimal()
            .round_dp(MEMO_RATE_DECIMAL_PLACES)
            .normalize()
    )
}
