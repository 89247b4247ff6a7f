use std::env;
use std::ffi::OsStr;

use crate::consolidator::*;
use crate::constants::*;
use crate::errors::*;
use crate::exchange_rates_client::*;
use crate::types::*;
use crate::ynab_client::*;

pub fn run() -> Result<()> {
    initialize();
    run_clap_matches(get_clap_matches())
}

fn initialize() {
    openssl_probe::init_ssl_cert_env_vars();
    dotenv::dotenv().ok();
    env_logger::init();

    default_env(EXCHANGE_RATES_URL_ENV, DEFAULT_EXCHANGE_RATES_URL);
}

fn get_clap_matches() -> clap::ArgMatches<'static> {
    clap::App::new(clap::crate_name!())
        .version(option_env!("CI_BUILD_VERSION").unwrap_or(clap::crate_version!()))
        .author(clap::crate_authors!())
        .about(clap::crate_description!())
        .arg(
            clap::Arg::with_name(SOURCE_BUDGET_ID_ARG)
                .env(SOURCE_BUDGET_IDS_ENV)
                .long(SOURCE_BUDGET_ID_ARG)
                .short("s")
                .value_name("ID")
                .help("YNAB budget to consolidate balances from (may be given more than once; later budgets win on account name clashes)")
                .takes_value(true)
                .multiple(true)
                .number_of_values(1)
                .use_delimiter(true)
                .required(true),
        )
        .arg(
            clap::Arg::with_name(DESTINATION_BUDGET_ID_ARG)
                .env(DESTINATION_BUDGET_ID_ENV)
                .long(DESTINATION_BUDGET_ID_ARG)
                .short("d")
                .value_name("ID")
                .help("YNAB budget whose account balances will be adjusted")
                .takes_value(true)
                .required(true),
        )
        .arg(
            clap::Arg::with_name(YNAB_ACCESS_TOKEN_ARG)
                .env(YNAB_ACCESS_TOKEN_ENV)
                .long(YNAB_ACCESS_TOKEN_ARG)
                .value_name("KEY")
                .help("YNAB personal access token")
                .takes_value(true)
                .hide_env_values(true)
                .required(true),
        )
        .arg(
            clap::Arg::with_name(EXCHANGE_RATES_URL_ARG)
                .env(EXCHANGE_RATES_URL_ENV)
                .long(EXCHANGE_RATES_URL_ARG)
                .value_name("URL")
                .help("Reference exchange rates document (ECB daily euro reference rates format)")
                .takes_value(true),
        )
        .arg(
            clap::Arg::with_name(DRY_RUN_ARG)
                .long(DRY_RUN_ARG)
                .short("n")
                .help("Show the adjustments without saving them to YNAB"),
        )
        .get_matches()
}

fn run_clap_matches(matches: clap::ArgMatches) -> Result<()> {
    let dry_run = matches.is_present(DRY_RUN_ARG);
    let source_budget_ids: Vec<YnabBudgetId> = matches
        .values_of(SOURCE_BUDGET_ID_ARG)
        .expect("CLAP matches should have SOURCE_BUDGET_ID_ARG")
        .map(|budget_id| YnabBudgetId(budget_id.to_string()))
        .collect();
    let destination_budget_id = YnabBudgetId(
        matches
            .value_of(DESTINATION_BUDGET_ID_ARG)
            .expect("CLAP matches should have DESTINATION_BUDGET_ID_ARG")
            .to_string(),
    );
    let ynab_client = YnabClient::new(
        matches
            .value_of(YNAB_ACCESS_TOKEN_ARG)
            .expect("CLAP matches should have YNAB_ACCESS_TOKEN_ARG")
            .to_string(),
    );
    let exchange_rates = ExchangeRatesClient::new(
        matches
            .value_of(EXCHANGE_RATES_URL_ARG)
            .expect("CLAP matches should have EXCHANGE_RATES_URL_ARG"),
    )
    .get_latest_exchange_rates()
    .chain_err(|| "Failed to get reference exchange rates")?;
    let today_date = chrono::Local::now().naive_local().date();
    let context = ConsolidationContext::load(&ynab_client, &exchange_rates, today_date, dry_run)?;
    let summary = Consolidator::run(&context, &source_budget_ids, &destination_budget_id)?;
    println!(
        "Done! {} of {} adjustment(s) saved; {} source account(s) missing in destination.",
        summary.posted_count,
        summary.reconciliation.adjustments.len(),
        summary.reconciliation.missing_in_destination.len()
    );
    Ok(())
}

fn default_env<V: AsRef<OsStr>>(var_name: &str, default_value: V) {
    if let Err(env::VarError::NotPresent) = env::var(var_name) {
        env::set_var(var_name, default_value);
    }
}
