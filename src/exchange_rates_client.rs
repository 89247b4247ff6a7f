use chrono::NaiveDate;
use log::debug;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::str::FromStr;

use crate::constants::*;
use crate::errors::*;
use crate::exchange_rates::*;
use crate::types::*;
use crate::utilities::*;

const CUBE_ELEMENT: &[u8] = b"Cube";

/// Fetches the published reference rate table (ECB daily euro foreign
/// exchange reference rates format).
#[derive(Debug)]
pub struct ExchangeRatesClient<'a> {
    url: &'a str,
}

impl<'a> ExchangeRatesClient<'a> {
    pub fn new(url: &'a str) -> ExchangeRatesClient {
        ExchangeRatesClient { url }
    }

    pub fn get_latest_exchange_rates(&self) -> Result<ExchangeRateTable> {
        println!("Getting latest reference exchange rates...");
        debug!("Reference exchange rates URL: {}", self.url);
        let mut response = reqwest::get(self.url)
            .chain_err(|| "Failed to get response")?
            .error_for_status()
            .chain_err(|| "Error response")?;
        let body = response.text().chain_err(|| "Failed to read response")?;
        let table = parse_reference_rates(&body)
            .chain_err(|| format!("Failed to parse reference exchange rates from {}", self.url))?;
        debug!("Reference exchange rates: {:#?}", table);
        Ok(table)
    }
}

/// Reads the first dated `<Cube time="...">` element and the rates nested in
/// it.  Later dates (as in the historical rate documents) are ignored.
pub fn parse_reference_rates(document: &str) -> Result<ExchangeRateTable> {
    let mut reader = Reader::from_str(document);
    reader.config_mut().trim_text(true);
    let mut reference_date: Option<NaiveDate> = None;
    let mut base_rates = HashMap::new();
    // Depth of open <Cube> elements inside the dated one; zero when outside.
    let mut dated_depth = 0usize;
    loop {
        match reader
            .read_event()
            .chain_err(|| "Invalid exchange rates document")?
        {
            Event::Start(ref element) if element.name().as_ref() == CUBE_ELEMENT => {
                if dated_depth > 0 {
                    dated_depth += 1;
                    insert_cube_rate(element, &mut base_rates)?;
                } else if let Some(date) = cube_attribute(element, b"time")? {
                    if reference_date.is_some() {
                        break;
                    }
                    reference_date = Some(parse_iso_date(&date)?);
                    dated_depth = 1;
                }
            }
            Event::Empty(ref element) if element.name().as_ref() == CUBE_ELEMENT => {
                if dated_depth > 0 {
                    insert_cube_rate(element, &mut base_rates)?;
                } else if let Some(date) = cube_attribute(element, b"time")? {
                    if reference_date.is_some() {
                        break;
                    }
                    reference_date = Some(parse_iso_date(&date)?);
                }
            }
            Event::End(ref element) if element.name().as_ref() == CUBE_ELEMENT => {
                if dated_depth > 0 {
                    dated_depth -= 1;
                    if dated_depth == 0 {
                        break;
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }
    let reference_date = reference_date.chain_err(|| "Reference date missing from exchange rates")?;
    ensure!(
        !base_rates.is_empty(),
        "No exchange rates found in reference exchange rates"
    );
    Ok(ExchangeRateTable::new(
        reference_date,
        CurrencyCode::from_str(EXCHANGE_RATES_BASE_CURRENCY)?,
        base_rates,
    ))
}

fn insert_cube_rate(
    element: &BytesStart,
    base_rates: &mut HashMap<CurrencyCode, ExchangeRate>,
) -> Result<()> {
    if let (Some(currency), Some(rate)) = (
        cube_attribute(element, b"currency")?,
        cube_attribute(element, b"rate")?,
    ) {
        let currency = CurrencyCode::from_str(&currency)?;
        let rate = Decimal::from_str(&rate)
            .chain_err(|| format!("Invalid exchange rate for {}: {}", currency, rate))?;
        base_rates.insert(currency, ExchangeRate::from_decimal(rate));
    }
    Ok(())
}

fn cube_attribute(element: &BytesStart, name: &[u8]) -> Result<Option<String>> {
    for attribute in element.attributes() {
        let attribute = attribute.chain_err(|| "Invalid attribute in exchange rates document")?;
        if attribute.key.as_ref() == name {
            return Ok(Some(String::from_utf8_lossy(&attribute.value).trim().to_string()));
        }
    }
    Ok(None)
}
