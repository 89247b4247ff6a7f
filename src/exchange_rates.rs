use chrono::NaiveDate;
use std::collections::HashMap;

use crate::errors::*;
use crate::types::*;

/// Reference rates published for a single date, quoted as units of each
/// currency per one unit of the base currency.
#[derive(Debug)]
pub struct ExchangeRateTable {
    reference_date: NaiveDate,
    base_currency: CurrencyCode,
    base_rates: HashMap<CurrencyCode, ExchangeRate>,
}

impl ExchangeRateTable {
    pub fn new(
        reference_date: NaiveDate,
        base_currency: CurrencyCode,
        base_rates: HashMap<CurrencyCode, ExchangeRate>,
    ) -> ExchangeRateTable {
        ExchangeRateTable {
            reference_date,
            base_currency,
            base_rates,
        }
    }

    pub fn reference_date(&self) -> NaiveDate {
        self.reference_date
    }

    pub fn get_exchange_rate(
        &self,
        from_currency: CurrencyCode,
        to_currency: CurrencyCode,
    ) -> Result<ExchangeRate> {
        if from_currency == to_currency {
            return Ok(ExchangeRate::one());
        }
        let missing = || ErrorKind::MissingExchangeRate(from_currency, to_currency);
        let from_rate = self.base_rate(from_currency).ok_or_else(missing)?;
        let to_rate = self.base_rate(to_currency).ok_or_else(missing)?;
        if from_rate.to_decimal().is_zero() {
            bail!(missing());
        }
        Ok(ExchangeRate::cross(from_rate, to_rate))
    }

    /// Converts an amount between currencies at this table's rates.
    pub fn convert(
        &self,
        amount: Milliunits,
        from_currency: CurrencyCode,
        to_currency: CurrencyCode,
    ) -> Result<Milliunits> {
        Ok(amount.convert_currency(self.get_exchange_rate(from_currency, to_currency)?))
    }

    fn base_rate(&self, currency: CurrencyCode) -> Option<ExchangeRate> {
        if currency == self.base_currency {
            Some(ExchangeRate::one())
        } else {
            self.base_rates.get(&currency).copied()
        }
    }
}
