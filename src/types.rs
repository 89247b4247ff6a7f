use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use std::borrow::Cow;
use std::fmt;
use std::ops;

use crate::errors::*;

pub use rust_decimal::prelude::Zero;

#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct CurrencyCode([u8; 3]);

/// Amount in YNAB's milliunits (1/1000 of the currency's nominal unit).
#[derive(Clone, Copy, Debug, Eq, Ord, PartialEq, PartialOrd)]
pub struct Milliunits(Decimal);

#[derive(Clone, Copy, Debug, PartialEq, PartialOrd)]
pub struct ExchangeRate(Decimal);

#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct YnabBudgetId(pub String);

#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct YnabAccountId(pub String);

#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct YnabCategoryId(pub String);

/// Lower-cased, budget-prefixed account name used to match source accounts
/// to destination accounts.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct NormalizedAccountName(String);

/// A budget as listed by YNAB; its settings are loaded separately.
#[derive(Clone, Debug, PartialEq)]
pub struct Budget {
    pub id: YnabBudgetId,
    pub name: String,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Account {
    pub id: YnabAccountId,
    pub name: String,
    pub closed: bool,
    pub deleted: bool,
    pub balance: Milliunits,
}

#[derive(Clone, Debug, PartialEq)]
pub struct CategoryGroup {
    pub name: String,
    pub category_ids: Vec<YnabCategoryId>,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ConvertedBalance {
    pub converted_amount: Milliunits,
    pub original_amount: Milliunits,
    pub currency: CurrencyCode,
    pub effective_rate: ExchangeRate,
}

impl CurrencyCode {
    pub fn from_str(code: &str) -> Result<CurrencyCode> {
        match code.as_bytes() {
            [a, b, c] if code.chars().all(|ch| ch.is_ascii_alphabetic()) => Ok(CurrencyCode([
                a.to_ascii_uppercase(),
                b.to_ascii_uppercase(),
                c.to_ascii_uppercase(),
            ])),
            _ => bail!("Invalid currency code: {}", code),
        }
    }

    pub fn to_str(&self) -> Cow<str> {
        // Safe to use 'from_utf8_lossy', since only ASCII letters are accepted.
        String::from_utf8_lossy(&self.0)
    }
}

impl fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_str())
    }
}

impl Milliunits {
    const SCALE: u32 = 3;

    pub fn from_scaled_i64(value: i64) -> Milliunits {
        Milliunits(Decimal::new(value, Self::SCALE))
    }

    pub fn to_scaled_i64(self) -> i64 {
        assert!(
            self.0.scale() == Self::SCALE,
            "Milliunits Decimal scale should be {}, but is {}",
            Self::SCALE,
            self.0.scale()
        );
        let mut result = self.0;
        result
            .set_scale(0)
            .expect("Milliunits Decimal scale should be settable to 0");
        result
            .to_i64()
            .expect("Milliunits Decimal should be convertible to i64")
    }

    fn from_decimal(value: Decimal) -> Milliunits {
        let mut result =
            value.round_dp_with_strategy(Self::SCALE, RoundingStrategy::RoundHalfUp);
        let scale_difference = Self::SCALE - result.scale();
        if scale_difference > 0 {
            result = result * Decimal::new(10i64.pow(scale_difference), 0);
            result
                .set_scale(Self::SCALE)
                .unwrap_or_else(|_| panic!("Milliunits scale should be settable to {}", Self::SCALE));
        }
        Milliunits(result)
    }

    pub fn to_decimal(self) -> Decimal {
        self.0
    }

    /// Converts to another currency, rounding half away from zero to the
    /// nearest milliunit.
    pub fn convert_currency(self, exchange_rate: ExchangeRate) -> Milliunits {
        Milliunits::from_decimal(self.0 * exchange_rate.0)
    }

    /// The rate that maps `original` onto `self`, or zero if `original` is zero.
    pub fn rate_from(self, original: Milliunits) -> ExchangeRate {
        if original.is_zero() {
            ExchangeRate(Decimal::zero())
        } else {
            ExchangeRate(self.0 / original.0)
        }
    }
}

impl ops::Add for Milliunits {
    type Output = Milliunits;
    fn add(self, other: Milliunits) -> Milliunits {
        let result = Milliunits(self.0 + other.0);
        assert_eq!(result.0.scale(), Self::SCALE);
        result
    }
}

impl ops::Sub for Milliunits {
    type Output = Milliunits;
    fn sub(self, other: Milliunits) -> Milliunits {
        let result = Milliunits(self.0 - other.0);
        assert_eq!(result.0.scale(), Self::SCALE);
        result
    }
}

impl Zero for Milliunits {
    fn zero() -> Milliunits {
        Milliunits::from_scaled_i64(0)
    }

    fn is_zero(&self) -> bool {
        self.0.is_zero()
    }
}

impl ExchangeRate {
    pub fn one() -> ExchangeRate {
        ExchangeRate(Decimal::new(1, 0))
    }

    pub fn from_decimal(rate: Decimal) -> ExchangeRate {
        ExchangeRate(rate)
    }

    pub fn to_decimal(self) -> Decimal {
        self.0
    }

    /// Cross rate between two rates quoted against the same base currency.
    pub fn cross(base_to_from: ExchangeRate, base_to_to: ExchangeRate) -> ExchangeRate {
        ExchangeRate(base_to_to.0 / base_to_from.0)
    }
}

impl fmt::Display for YnabBudgetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for YnabAccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for YnabCategoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl NormalizedAccountName {
    pub fn new(name: &str) -> NormalizedAccountName {
        NormalizedAccountName(name.to_lowercase())
    }
}

impl fmt::Display for NormalizedAccountName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl ConvertedBalance {
    pub fn new(
        converted_amount: Milliunits,
        original_amount: Milliunits,
        currency: CurrencyCode,
    ) -> ConvertedBalance {
        ConvertedBalance {
            converted_amount,
            original_amount,
            currency,
            effective_rate: converted_amount.rate_from(original_amount),
        }
    }
}
