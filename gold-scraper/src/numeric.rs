//! Number parsing for Turkish-formatted price text
//!
//! The source page writes `4.563,13` for 4563.13. Cells that cannot be read
//! are tagged `Absent` here and only collapse to zero when a `PriceQuote`
//! is built.

use std::str::FromStr;

use regex::Regex;
use rust_decimal::Decimal;

/// Result of parsing a single numeric field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParsedField {
    Parsed(Decimal),
    Absent,
}

impl ParsedField {
    pub fn from_option(value: Option<Decimal>) -> Self {
        value.map_or(ParsedField::Absent, ParsedField::Parsed)
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, ParsedField::Absent)
    }

    pub fn value(&self) -> Option<Decimal> {
        match self {
            ParsedField::Parsed(v) => Some(*v),
            ParsedField::Absent => None,
        }
    }

    /// Collapse to the public zero sentinel
    pub fn or_zero(&self) -> Decimal {
        self.value().unwrap_or(Decimal::ZERO)
    }
}

/// Change figures parsed from a text blob such as `%-0,08 (-3,65)`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChangeFields {
    pub percent: ParsedField,
    pub amount: ParsedField,
}

impl ChangeFields {
    pub const ABSENT: ChangeFields = ChangeFields {
        percent: ParsedField::Absent,
        amount: ParsedField::Absent,
    };
}

const PERCENT_PATTERN: &str = r"([+-])?\s*%\s*([+-]?\d[\d.,]*)";
const AMOUNT_PATTERN: &str = r"\(\s*([+-]?\d[\d.,]*)\s*\)";
const NUMBER_PATTERN: &str = r"[+-]?\d[\d.,]*";

/// Parse a price cell.
///
/// Every character except digits and the comma decimal separator is
/// stripped, then the comma becomes a decimal point.
pub fn parse_price_cell(text: &str) -> ParsedField {
    let kept: String = text
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == ',')
        .collect();

    if kept.is_empty() {
        return ParsedField::Absent;
    }

    let canonical = kept.replace(',', ".");
    ParsedField::from_option(Decimal::from_str(&canonical).ok())
}

/// Parse a signed number token such as `-0,08`, `+1.234,5` or `0.0041`.
///
/// When a comma is present, points are thousands separators. Otherwise a
/// single point is a decimal point and repeated points are separators.
pub fn parse_signed_token(token: &str) -> ParsedField {
    let token = token.trim().trim_end_matches(['.', ',']);
    let negative = token.starts_with('-');

    let canonical: String = if token.contains(',') {
        token
            .chars()
            .filter(|c| c.is_ascii_digit() || *c == ',')
            .collect::<String>()
            .replace(',', ".")
    } else if token.matches('.').count() > 1 {
        token.chars().filter(|c| c.is_ascii_digit()).collect()
    } else {
        token
            .chars()
            .filter(|c| c.is_ascii_digit() || *c == '.')
            .collect()
    };

    match Decimal::from_str(&canonical) {
        Ok(value) if negative => ParsedField::Parsed(-value),
        Ok(value) => ParsedField::Parsed(value),
        Err(_) => ParsedField::Absent,
    }
}

/// Parse the change column / ticker tail.
///
/// Two independent tokens may appear together: a signed percentage
/// (`%0,08`, `%-0,08`, `-%0,08`) and a signed amount in parentheses
/// (`(3,65)`). A bare leading number is read as the percentage when no `%`
/// token exists. A missing amount is derived as `sell * percent / 100`.
pub fn parse_change_text(text: &str, sell: ParsedField) -> ChangeFields {
    let text = text.trim();
    if text.is_empty() {
        return ChangeFields::ABSENT;
    }

    let (Ok(percent_re), Ok(amount_re), Ok(number_re)) = (
        Regex::new(PERCENT_PATTERN),
        Regex::new(AMOUNT_PATTERN),
        Regex::new(NUMBER_PATTERN),
    ) else {
        return ChangeFields::ABSENT;
    };

    let percent = match percent_re.captures(text) {
        Some(caps) => {
            let value = parse_signed_token(&caps[2]);
            match (caps.get(1).map(|m| m.as_str()), value) {
                (Some("-"), ParsedField::Parsed(v)) if v.is_sign_positive() => {
                    ParsedField::Parsed(-v)
                }
                _ => value,
            }
        }
        None => {
            let outside_parens = amount_re.replace_all(text, " ");
            number_re
                .find(&outside_parens)
                .map_or(ParsedField::Absent, |m| parse_signed_token(m.as_str()))
        }
    };

    let amount = match amount_re.captures(text) {
        Some(caps) => parse_signed_token(&caps[1]),
        None => match (percent, sell) {
            (ParsedField::Parsed(pct), ParsedField::Parsed(sell)) => {
                ParsedField::Parsed(sell * pct / Decimal::ONE_HUNDRED)
            }
            _ => ParsedField::Absent,
        },
    };

    ChangeFields { percent, amount }
}

/// First price-like token in a ticker tail, skipping percentage and
/// parenthesised amounts.
pub fn first_price_token(text: &str) -> ParsedField {
    let Ok(number_re) = Regex::new(NUMBER_PATTERN) else {
        return ParsedField::Absent;
    };

    for m in number_re.find_iter(text) {
        let preceding = text[..m.start()].trim_end().chars().last();
        if matches!(preceding, Some('%') | Some('(')) {
            continue;
        }
        let token = m.as_str().trim_start_matches(['+', '-']);
        let parsed = parse_price_cell(token);
        if !parsed.is_absent() {
            return parsed;
        }
    }
    ParsedField::Absent
}
