//! HTML price extraction
//!
//! Turns the source page into a `MarketSnapshot`. Two independent scans run
//! over the document:
//! - table rows (`label | buy | sell | change`) for gold instruments
//! - ticker elements for the currency rate, which only publish one side

use chrono::Utc;
use gold_core::{CoinSubtype, InstrumentKind, Karat, MarketSnapshot, PriceQuote, SnapshotSource};
use rust_decimal::Decimal;
use scraper::{ElementRef, Html, Selector};
use tracing::debug;

use crate::numeric::{self, ChangeFields, ParsedField};

/// Variant behaviour of the extractor
#[derive(Debug, Clone)]
pub struct ExtractorConfig {
    /// Scan ticker elements for the currency rate
    pub parse_currency_ticker: bool,
    /// Lower-case keyword that marks the currency inside a ticker
    pub currency_keyword: String,
    /// Estimated buy/sell spread for ticker quotes (`buy = sell - spread`)
    pub ticker_spread: Decimal,
    /// Parse full, commemorative and bracelet rows
    pub extended_instruments: bool,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            parse_currency_ticker: true,
            currency_keyword: "dolar".to_string(),
            ticker_spread: Decimal::new(1, 2),
            extended_instruments: true,
        }
    }
}

/// Substring rule mapping a lower-cased row label to an instrument
struct LabelRule {
    needle: &'static str,
    kind: InstrumentKind,
}

const LABEL_RULES: &[LabelRule] = &[
    LabelRule { needle: "gram has altın", kind: InstrumentKind::GramPureGold },
    LabelRule { needle: "has altın", kind: InstrumentKind::GramPureGold },
    LabelRule { needle: "gram altın", kind: InstrumentKind::GramGold },
    LabelRule { needle: "ons altın", kind: InstrumentKind::OunceGold },
    LabelRule { needle: "çeyrek altın", kind: InstrumentKind::QuarterGold },
    LabelRule { needle: "yarım altın", kind: InstrumentKind::HalfGold },
    LabelRule { needle: "tam altın", kind: InstrumentKind::FullGold },
    LabelRule {
        needle: "cumhuriyet altın",
        kind: InstrumentKind::Commemorative(CoinSubtype::Cumhuriyet),
    },
    LabelRule { needle: "ata altın", kind: InstrumentKind::Commemorative(CoinSubtype::Ata) },
    LabelRule { needle: "ikibuçuk", kind: InstrumentKind::Commemorative(CoinSubtype::Ikibucuk) },
    LabelRule { needle: "2,5", kind: InstrumentKind::Commemorative(CoinSubtype::Ikibucuk) },
    LabelRule { needle: "beşli", kind: InstrumentKind::Commemorative(CoinSubtype::Besli) },
    LabelRule { needle: "5 li", kind: InstrumentKind::Commemorative(CoinSubtype::Besli) },
    LabelRule { needle: "14 ayar", kind: InstrumentKind::Bracelet(Karat::K14) },
    LabelRule { needle: "14ayar", kind: InstrumentKind::Bracelet(Karat::K14) },
    LabelRule { needle: "18 ayar", kind: InstrumentKind::Bracelet(Karat::K18) },
    LabelRule { needle: "18ayar", kind: InstrumentKind::Bracelet(Karat::K18) },
    LabelRule { needle: "22 ayar", kind: InstrumentKind::Bracelet(Karat::K22) },
    LabelRule { needle: "22ayar", kind: InstrumentKind::Bracelet(Karat::K22) },
];

/// Parsed numeric fields of one price row, before zero-collapse
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowFields {
    pub buy: ParsedField,
    pub sell: ParsedField,
    pub change: ParsedField,
    pub change_percent: ParsedField,
}

impl RowFields {
    /// Parse `buy`, `sell` and the optional change column
    pub fn parse(buy: &str, sell: &str, change: Option<&str>) -> Self {
        let buy = numeric::parse_price_cell(buy);
        let sell = numeric::parse_price_cell(sell);
        let ChangeFields { percent, amount } = change
            .map(|text| numeric::parse_change_text(text, sell))
            .unwrap_or(ChangeFields::ABSENT);

        Self {
            buy,
            sell,
            change: amount,
            change_percent: percent,
        }
    }

    pub fn into_quote(self, kind: InstrumentKind) -> PriceQuote {
        PriceQuote {
            kind,
            buy: self.buy.or_zero(),
            sell: self.sell.or_zero(),
            change: self.change.or_zero(),
            change_percent: self.change_percent.or_zero(),
        }
    }
}

const ROW_SELECTOR: &str = r#"table tr, .table tr, [class*="table"] tr"#;
const TICKER_SELECTOR: &str = r#".ticker, .header-ticker, [class*="ticker"]"#;

/// Parses raw HTML into a normalized `MarketSnapshot`
pub struct HtmlPriceExtractor {
    config: ExtractorConfig,
}

impl HtmlPriceExtractor {
    pub fn new(config: ExtractorConfig) -> Self {
        Self { config }
    }

    /// Extract every recognised quote from `html`.
    ///
    /// Never fails: unmatched rows are skipped and unparseable cells read as
    /// zero, so a malformed page yields an all-zero snapshot.
    pub fn extract(&self, html: &str) -> MarketSnapshot {
        let document = Html::parse_document(html);
        let mut snapshot = MarketSnapshot::empty(Utc::now(), SnapshotSource::Live);

        let mut matched = 0usize;
        if let (Some(rows), Some(cells), Some(links)) = (
            Selector::parse(ROW_SELECTOR).ok(),
            Selector::parse("td").ok(),
            Selector::parse("a").ok(),
        ) {
            for row in document.select(&rows) {
                if let Some(quote) = self.parse_row(row, &cells, &links) {
                    debug!(
                        "Found: {} -> {}% ({})",
                        quote.kind, quote.change_percent, quote.change
                    );
                    snapshot.set(quote);
                    matched += 1;
                }
            }
        }

        if self.config.parse_currency_ticker {
            if let Some(quote) = self.parse_currency_ticker(&document) {
                debug!("Parsed {}: sell={} buy={}", quote.kind, quote.sell, quote.buy);
                snapshot.set(quote);
            }
        }

        debug!("Extracted {} price rows", matched);
        snapshot
    }

    /// Map a lower-cased label to an instrument. The longest matching rule
    /// wins, so "gram has altın" beats "has altın" and "gram altın".
    pub fn match_label(&self, label: &str) -> Option<InstrumentKind> {
        LABEL_RULES
            .iter()
            .filter(|rule| self.config.extended_instruments || !rule.kind.is_extended())
            .filter(|rule| label.contains(rule.needle))
            .fold(None::<&LabelRule>, |best, rule| match best {
                Some(b) if b.needle.chars().count() >= rule.needle.chars().count() => Some(b),
                _ => Some(rule),
            })
            .map(|rule| rule.kind)
    }

    fn parse_row(
        &self,
        row: ElementRef<'_>,
        cell_selector: &Selector,
        link_selector: &Selector,
    ) -> Option<PriceQuote> {
        let cells: Vec<String> = row.select(cell_selector).map(element_text).collect();
        if cells.len() < 3 {
            return None;
        }

        let link_text: String = row
            .select(link_selector)
            .map(element_text)
            .collect::<Vec<_>>()
            .join(" ");
        let label = if link_text.trim().is_empty() {
            normalize_label(&cells[0])
        } else {
            normalize_label(&link_text)
        };
        if label.is_empty() {
            return None;
        }

        let kind = self.match_label(&label)?;
        let fields = RowFields::parse(&cells[1], &cells[2], cells.get(3).map(String::as_str));
        Some(fields.into_quote(kind))
    }

    fn parse_currency_ticker(&self, document: &Html) -> Option<PriceQuote> {
        let keyword = self.config.currency_keyword.to_lowercase();
        let ticker_selector = Selector::parse(TICKER_SELECTOR).ok()?;

        for ticker in document.select(&ticker_selector) {
            let text = ticker.text().collect::<Vec<_>>().join(" ").to_lowercase();
            let Some(pos) = text.find(&keyword) else {
                continue;
            };

            let tail = &text[pos + keyword.len()..];
            let sell = numeric::first_price_token(tail);
            let Some(price) = sell.value() else {
                continue;
            };

            let change = numeric::parse_change_text(tail, sell);
            let buy = (price - self.config.ticker_spread).max(Decimal::ZERO);

            return Some(PriceQuote {
                kind: InstrumentKind::UsdTry,
                buy,
                sell: price,
                change: change.amount.or_zero(),
                change_percent: change.percent.or_zero(),
            });
        }

        None
    }
}

impl Default for HtmlPriceExtractor {
    fn default() -> Self {
        Self::new(ExtractorConfig::default())
    }
}

/// Lower-case a label. Dotted capital İ lowercases to `i` + U+0307, which
/// would defeat the substring rules, so the combining dot is dropped.
fn normalize_label(raw: &str) -> String {
    raw.trim().to_lowercase().replace('\u{307}', "")
}

fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}
