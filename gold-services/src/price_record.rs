//! Flat persisted shape of a market snapshot
//!
//! One field per instrument per metric (`gram_gold_buy`, `gram_gold_sell`,
//! `gram_gold_change`, `gram_gold_change_percent`, ...). Fields missing from
//! an older record read back as zero.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use gold_core::{InstrumentKind, MarketSnapshot, PriceQuote, SnapshotSource};
use rust_decimal::Decimal;

/// Per-quote metrics stored as separate fields
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metric {
    Buy,
    Sell,
    Change,
    ChangePercent,
}

impl Metric {
    pub const ALL: [Metric; 4] = [Metric::Buy, Metric::Sell, Metric::Change, Metric::ChangePercent];

    pub fn suffix(&self) -> &'static str {
        match self {
            Metric::Buy => "buy",
            Metric::Sell => "sell",
            Metric::Change => "change",
            Metric::ChangePercent => "change_percent",
        }
    }

    fn read(&self, quote: &PriceQuote) -> Decimal {
        match self {
            Metric::Buy => quote.buy,
            Metric::Sell => quote.sell,
            Metric::Change => quote.change,
            Metric::ChangePercent => quote.change_percent,
        }
    }
}

/// Field name for one instrument metric
pub fn field_name(kind: InstrumentKind, metric: Metric) -> String {
    format!("{}_{}", kind.key(), metric.suffix())
}

/// Every field known to this build, in a stable order
pub fn all_field_names() -> Vec<String> {
    InstrumentKind::ALL
        .iter()
        .flat_map(|kind| Metric::ALL.iter().map(move |metric| field_name(*kind, *metric)))
        .collect()
}

/// Flat record suitable for tabular persistence
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriceRecord {
    pub captured_at: DateTime<Utc>,
    pub source: SnapshotSource,
    pub fields: BTreeMap<String, Decimal>,
}

impl PriceRecord {
    /// Field value, zero when the record predates the field
    pub fn field(&self, name: &str) -> Decimal {
        self.fields.get(name).copied().unwrap_or(Decimal::ZERO)
    }
}

/// Converts between `MarketSnapshot` and `PriceRecord`
pub struct PriceRecordCodec;

impl PriceRecordCodec {
    pub fn to_record(snapshot: &MarketSnapshot) -> PriceRecord {
        let fields = InstrumentKind::ALL
            .iter()
            .flat_map(|kind| {
                let quote = snapshot.quote(*kind);
                Metric::ALL
                    .iter()
                    .map(move |metric| (field_name(*kind, *metric), metric.read(&quote)))
            })
            .collect();

        PriceRecord {
            captured_at: snapshot.captured_at,
            source: snapshot.source,
            fields,
        }
    }

    pub fn from_record(record: &PriceRecord) -> MarketSnapshot {
        let mut snapshot = MarketSnapshot::empty(record.captured_at, record.source);

        for kind in InstrumentKind::ALL {
            snapshot.set(PriceQuote {
                kind,
                buy: record.field(&field_name(kind, Metric::Buy)),
                sell: record.field(&field_name(kind, Metric::Sell)),
                change: record.field(&field_name(kind, Metric::Change)),
                change_percent: record.field(&field_name(kind, Metric::ChangePercent)),
            });
        }

        snapshot
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gold_core::{CoinSubtype, Karat};
    use rust_decimal_macros::dec;

    fn quote(kind: InstrumentKind, buy: Decimal, sell: Decimal) -> PriceQuote {
        PriceQuote {
            kind,
            buy,
            sell,
            change: sell - buy,
            change_percent: dec!(0.27),
        }
    }

    fn populated_snapshot() -> MarketSnapshot {
        let mut snapshot = MarketSnapshot::empty(Utc::now(), SnapshotSource::Live);
        snapshot.set(quote(InstrumentKind::GramGold, dec!(4550.10), dec!(4563.13)));
        snapshot.set(quote(InstrumentKind::GramPureGold, dec!(4700), dec!(4710.5)));
        snapshot.set(quote(
            InstrumentKind::Commemorative(CoinSubtype::Ata),
            dec!(30100),
            dec!(30400),
        ));
        snapshot.set(quote(InstrumentKind::Bracelet(Karat::K22), dec!(4100.25), dec!(4180.75)));
        snapshot.set(PriceQuote {
            kind: InstrumentKind::UsdTry,
            buy: dec!(41.1357),
            sell: dec!(41.1457),
            change: dec!(0.0041),
            change_percent: dec!(-0.01),
        });
        snapshot
    }

    #[test]
    fn test_round_trip_is_lossless() {
        let snapshot = populated_snapshot();
        let record = PriceRecordCodec::to_record(&snapshot);

        assert_eq!(record.fields.len(), InstrumentKind::ALL.len() * 4);
        assert_eq!(PriceRecordCodec::from_record(&record), snapshot);
    }

    #[test]
    fn test_round_trip_empty_snapshot() {
        let snapshot = MarketSnapshot::empty(Utc::now(), SnapshotSource::Default);
        let record = PriceRecordCodec::to_record(&snapshot);
        assert_eq!(PriceRecordCodec::from_record(&record), snapshot);
    }

    #[test]
    fn test_field_names() {
        assert_eq!(field_name(InstrumentKind::GramGold, Metric::Sell), "gram_gold_sell");
        assert_eq!(
            field_name(InstrumentKind::UsdTry, Metric::ChangePercent),
            "usd_try_change_percent"
        );
        assert_eq!(all_field_names().len(), 56);
    }

    #[test]
    fn test_old_record_defaults_new_fields_to_zero() {
        let mut fields = BTreeMap::new();
        fields.insert("gram_gold_buy".to_string(), dec!(4550.10));
        fields.insert("gram_gold_sell".to_string(), dec!(4563.13));
        fields.insert("retired_field".to_string(), dec!(1));

        let record = PriceRecord {
            captured_at: Utc::now(),
            source: SnapshotSource::Live,
            fields,
        };
        let snapshot = PriceRecordCodec::from_record(&record);

        assert_eq!(snapshot.primary().sell, dec!(4563.13));
        assert!(snapshot.quote(InstrumentKind::Bracelet(Karat::K14)).is_zero());
        assert!(snapshot.quote(InstrumentKind::UsdTry).is_zero());
        assert_eq!(snapshot.quotes.len(), InstrumentKind::ALL.len());
    }
}
