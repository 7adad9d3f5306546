use regex::Regex;
use rust_decimal::Decimal;
use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::OnceLock;

use crate::config::ExtractorConfig;
use crate::models::to_money;
use crate::utils::error::ExtractionError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedProduct {
    pub title: String,
    pub price: Decimal,
}

/// Pulls title and price out of a product page by fixed element markers.
#[derive(Debug, Clone)]
pub struct PriceExtractor {
    title_selector: (String, Selector),
    price_selectors: Vec<(String, Selector)>,
}

fn amount_regex() -> &'static Regex {
    static AMOUNT: OnceLock<Regex> = OnceLock::new();
    // Digits with optional thousands separators, then exactly two decimals
    AMOUNT.get_or_init(|| Regex::new(r"^[0-9][0-9,]*\.[0-9]{2}$").expect("amount pattern is valid"))
}

fn compile(selector: &str) -> Result<(String, Selector), ExtractionError> {
    Selector::parse(selector)
        .map(|parsed| (selector.to_string(), parsed))
        .map_err(|e| ExtractionError::InvalidSelector {
            selector: selector.to_string(),
            message: format!("{:?}", e),
        })
}

fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

impl PriceExtractor {
    pub fn new(config: &ExtractorConfig) -> Result<Self, ExtractionError> {
        let title_selector = compile(&config.title_selector)?;
        let price_selectors = config
            .price_selectors
            .iter()
            .map(|s| compile(s))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            title_selector,
            price_selectors,
        })
    }

    pub fn extract(&self, html: &str) -> Result<ExtractedProduct, ExtractionError> {
        let document = Html::parse_document(html);

        let (title_marker, title_selector) = &self.title_selector;
        let title = document
            .select(title_selector)
            .next()
            .map(element_text)
            .ok_or_else(|| ExtractionError::TitleMissing {
                selector: title_marker.clone(),
            })?;
        if title.is_empty() {
            return Err(ExtractionError::TitleEmpty);
        }

        let raw_price = self
            .price_selectors
            .iter()
            .find_map(|(_, selector)| {
                // Blank placeholders fall through to the next selector
                document
                    .select(selector)
                    .map(element_text)
                    .find(|text| !text.is_empty())
            })
            .ok_or_else(|| ExtractionError::PriceMissing {
                selectors: self
                    .price_selectors
                    .iter()
                    .map(|(marker, _)| marker.as_str())
                    .collect::<Vec<_>>()
                    .join(", "),
            })?;

        let price = parse_price(&raw_price)?;
        Ok(ExtractedProduct { title, price })
    }
}

impl Default for PriceExtractor {
    fn default() -> Self {
        Self::new(&ExtractorConfig::default()).expect("default selectors are valid")
    }
}

/// Parse price text such as `$1,234.56 (List Price)` into `1234.56`.
///
/// The first character is the currency symbol. The amount runs from the
/// character after it through two digits past the first decimal point.
pub fn parse_price(raw: &str) -> Result<Decimal, ExtractionError> {
    let text = raw.trim();

    let mut chars = text.char_indices();
    let amount_start = match chars.next() {
        Some((_, symbol)) if !symbol.is_ascii_digit() && !symbol.is_whitespace() => {
            chars.next().map(|(idx, _)| idx).unwrap_or(text.len())
        }
        _ => {
            return Err(ExtractionError::MissingCurrencySymbol {
                text: text.to_string(),
            });
        }
    };

    let amount_text = &text[amount_start..];
    let dot = amount_text.find('.').ok_or_else(|| ExtractionError::NoDecimalPoint {
        text: text.to_string(),
    })?;

    // '.' and ASCII digits are single bytes, so byte offsets are safe here
    let end = dot + 3;
    let amount = amount_text
        .get(..end)
        .filter(|candidate| amount_regex().is_match(candidate))
        .ok_or_else(|| ExtractionError::MalformedPrice {
            text: text.to_string(),
        })?;

    let digits = amount.replace(',', "");
    let price = Decimal::from_str(&digits).map_err(|_| ExtractionError::MalformedPrice {
        text: text.to_string(),
    })?;

    Ok(to_money(price))
}
