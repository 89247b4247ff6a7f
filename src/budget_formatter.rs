use chrono::NaiveDate;
use rust_decimal::{Decimal, RoundingStrategy};
use std::cell::RefCell;

use ynab_api::models::{BudgetSettings, CurrencyFormat};

use crate::types::*;

/// Formats amounts and dates the way a budget's settings display them.
#[derive(Debug)]
pub struct BudgetFormatter<'a> {
    settings: &'a BudgetSettings,
    chrono_date_format: RefCell<Option<String>>,
}

impl<'a> BudgetFormatter<'a> {
    pub fn new(settings: &BudgetSettings) -> BudgetFormatter {
        BudgetFormatter {
            settings,
            chrono_date_format: RefCell::new(None),
        }
    }

    fn currency_format(&self) -> &CurrencyFormat {
        &self.settings.currency_format
    }

    pub fn format_milliunits_with_code(&self, amount: Milliunits) -> String {
        self.format_milliunits_custom(&self.currency_format().iso_code, " ", true, false, amount)
    }

    pub fn format_milliunits(&self, amount: Milliunits) -> String {
        self.format_milliunits_custom(
            &self.currency_format().currency_symbol,
            "",
            false,
            true,
            amount,
        )
    }

    pub fn format_date(&self, date: NaiveDate) -> String {
        let mut fmt_opt = self.chrono_date_format.borrow_mut();
        let fmt = fmt_opt.get_or_insert_with(|| {
            self.settings
                .date_format
                .format
                .replace("YYYY", "%Y")
                .replace("MM", "%m")
                .replace("DD", "%d")
        });
        date.format(fmt).to_string()
    }

    fn format_milliunits_custom(
        &self,
        currency_symbol: &str,
        currency_symbol_spacer: &str,
        force_display_symbol: bool,
        minus_before_symbol_first: bool,
        amount: Milliunits,
    ) -> String {
        let amount = amount.to_decimal();
        let decimal_digits = self.currency_format().decimal_digits.max(0) as usize;
        let raw_formatted = format!(
            "{:.*}",
            decimal_digits,
            amount
                .abs()
                .round_dp_with_strategy(decimal_digits as u32, RoundingStrategy::RoundHalfUp)
        );
        let mut split_around_decimal = raw_formatted.splitn(2, '.');
        let before_decimal = self.add_group_separators(split_around_decimal.next().unwrap_or(""));
        let number = match split_around_decimal.next() {
            Some(after_decimal) => format!(
                "{}{}{}",
                before_decimal, self.currency_format().decimal_separator, after_decimal
            ),
            None => before_decimal,
        };
        let is_negative = amount < Decimal::zero();
        let number = if !minus_before_symbol_first && is_negative {
            format!("-{}", number)
        } else {
            number
        };
        let with_symbol = if self.currency_format().display_symbol || force_display_symbol {
            if self.currency_format().symbol_first {
                format!("{}{}{}", currency_symbol, currency_symbol_spacer, number)
            } else {
                format!("{}{}{}", number, currency_symbol_spacer, currency_symbol)
            }
        } else {
            number
        };
        if minus_before_symbol_first && is_negative {
            format!("-{}", with_symbol)
        } else {
            with_symbol
        }
    }

    fn add_group_separators(&self, before_decimal: &str) -> String {
        before_decimal
            .chars()
            .rev()
            .collect::<Vec<char>>()
            .chunks(3)
            .map(|chunk| chunk.iter().collect())
            .collect::<Vec<String>>()
            .join(&self.currency_format().group_separator)
            .chars()
            .rev()
            .collect()
    }
}
