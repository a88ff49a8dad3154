//! Price data structures for gold and currency quotes

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::GoldError;

/// Commemorative coin subtype
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CoinSubtype {
    /// Cumhuriyet (Republic) coin
    Cumhuriyet,
    /// Ata coin
    Ata,
    /// 2.5 coin
    Ikibucuk,
    /// 5 coin
    Besli,
}

/// Bracelet purity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Karat {
    K14,
    K18,
    K22,
}

/// A tradable unit quoted on the source page
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum InstrumentKind {
    /// Gram gold (the primary instrument)
    GramGold,
    /// Gram pure ("has") gold
    GramPureGold,
    /// Troy ounce gold
    OunceGold,
    QuarterGold,
    HalfGold,
    FullGold,
    Commemorative(CoinSubtype),
    Bracelet(Karat),
    /// USD/TRY exchange rate
    UsdTry,
}

impl InstrumentKind {
    /// Every instrument kind known to this build, in display order
    pub const ALL: [InstrumentKind; 14] = [
        InstrumentKind::GramGold,
        InstrumentKind::GramPureGold,
        InstrumentKind::OunceGold,
        InstrumentKind::QuarterGold,
        InstrumentKind::HalfGold,
        InstrumentKind::FullGold,
        InstrumentKind::Commemorative(CoinSubtype::Cumhuriyet),
        InstrumentKind::Commemorative(CoinSubtype::Ata),
        InstrumentKind::Commemorative(CoinSubtype::Ikibucuk),
        InstrumentKind::Commemorative(CoinSubtype::Besli),
        InstrumentKind::Bracelet(Karat::K14),
        InstrumentKind::Bracelet(Karat::K18),
        InstrumentKind::Bracelet(Karat::K22),
        InstrumentKind::UsdTry,
    ];

    /// The instrument whose price decides whether a snapshot is servable
    pub const PRIMARY: InstrumentKind = InstrumentKind::GramGold;

    /// Stable machine key, also used as the persisted column prefix
    pub fn key(&self) -> &'static str {
        match self {
            InstrumentKind::GramGold => "gram_gold",
            InstrumentKind::GramPureGold => "gram_has_gold",
            InstrumentKind::OunceGold => "ons_gold",
            InstrumentKind::QuarterGold => "quarter_gold",
            InstrumentKind::HalfGold => "half_gold",
            InstrumentKind::FullGold => "full_gold",
            InstrumentKind::Commemorative(CoinSubtype::Cumhuriyet) => "cumhuriyet_gold",
            InstrumentKind::Commemorative(CoinSubtype::Ata) => "ata_gold",
            InstrumentKind::Commemorative(CoinSubtype::Ikibucuk) => "ikibucuk_gold",
            InstrumentKind::Commemorative(CoinSubtype::Besli) => "besli_gold",
            InstrumentKind::Bracelet(Karat::K14) => "bilezik_14",
            InstrumentKind::Bracelet(Karat::K18) => "bilezik_18",
            InstrumentKind::Bracelet(Karat::K22) => "bilezik_22",
            InstrumentKind::UsdTry => "usd_try",
        }
    }

    /// Human-readable name as shown on the source page
    pub fn display_name(&self) -> &'static str {
        match self {
            InstrumentKind::GramGold => "Gram Altın",
            InstrumentKind::GramPureGold => "Gram Has Altın",
            InstrumentKind::OunceGold => "Ons Altın",
            InstrumentKind::QuarterGold => "Çeyrek Altın",
            InstrumentKind::HalfGold => "Yarım Altın",
            InstrumentKind::FullGold => "Tam Altın",
            InstrumentKind::Commemorative(CoinSubtype::Cumhuriyet) => "Cumhuriyet Altını",
            InstrumentKind::Commemorative(CoinSubtype::Ata) => "Ata Altın",
            InstrumentKind::Commemorative(CoinSubtype::Ikibucuk) => "İkibuçuk Altın",
            InstrumentKind::Commemorative(CoinSubtype::Besli) => "Beşli Altın",
            InstrumentKind::Bracelet(Karat::K14) => "14 Ayar Bilezik",
            InstrumentKind::Bracelet(Karat::K18) => "18 Ayar Bilezik",
            InstrumentKind::Bracelet(Karat::K22) => "22 Ayar Bilezik",
            InstrumentKind::UsdTry => "USD/TRY",
        }
    }

    /// Instruments only parsed when the extended instrument set is enabled
    pub fn is_extended(&self) -> bool {
        matches!(
            self,
            InstrumentKind::FullGold
                | InstrumentKind::Commemorative(_)
                | InstrumentKind::Bracelet(_)
        )
    }

    pub fn is_currency(&self) -> bool {
        matches!(self, InstrumentKind::UsdTry)
    }
}

impl fmt::Display for InstrumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for InstrumentKind {
    type Err = GoldError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        InstrumentKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.key() == s)
            .ok_or_else(|| GoldError::parse(format!("Unknown instrument kind: {}", s)))
    }
}

impl Serialize for InstrumentKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.key())
    }
}

impl<'de> Deserialize<'de> for InstrumentKind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let key = String::deserialize(deserializer)?;
        key.parse().map_err(serde::de::Error::custom)
    }
}

/// One instrument's market snapshot
///
/// Zero in any field means "absent" at the parse boundary. `change` is kept as
/// published by the source even when it disagrees with `sell - buy`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceQuote {
    pub kind: InstrumentKind,
    pub buy: Decimal,
    pub sell: Decimal,
    pub change: Decimal,
    pub change_percent: Decimal,
}

impl PriceQuote {
    pub fn zero(kind: InstrumentKind) -> Self {
        Self {
            kind,
            buy: Decimal::ZERO,
            sell: Decimal::ZERO,
            change: Decimal::ZERO,
            change_percent: Decimal::ZERO,
        }
    }

    /// True when neither side carries a price
    pub fn is_zero(&self) -> bool {
        self.buy.is_zero() && self.sell.is_zero()
    }
}

/// Which origin produced a snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SnapshotSource {
    /// Freshly scraped from the source page
    Live,
    /// Read back from the persistent store
    PersistentCache,
    /// Served from the in-process memory tier
    MemoryCache,
    /// Stale memory entry served because the live scrape failed
    DegradedFallback,
    /// Application-level placeholder, no real data
    Default,
}

impl SnapshotSource {
    pub fn label(&self) -> &'static str {
        match self {
            SnapshotSource::Live => "live",
            SnapshotSource::PersistentCache => "persistent_cache",
            SnapshotSource::MemoryCache => "memory_cache",
            SnapshotSource::DegradedFallback => "degraded_fallback",
            SnapshotSource::Default => "default",
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, SnapshotSource::DegradedFallback | SnapshotSource::Default)
    }
}

impl fmt::Display for SnapshotSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for SnapshotSource {
    type Err = GoldError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "live" => Ok(SnapshotSource::Live),
            "persistent_cache" => Ok(SnapshotSource::PersistentCache),
            "memory_cache" => Ok(SnapshotSource::MemoryCache),
            "degraded_fallback" => Ok(SnapshotSource::DegradedFallback),
            "default" => Ok(SnapshotSource::Default),
            other => Err(GoldError::parse(format!("Unknown snapshot source: {}", other))),
        }
    }
}

/// A point-in-time bundle of quotes, one per instrument kind
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketSnapshot {
    pub quotes: BTreeMap<InstrumentKind, PriceQuote>,
    pub captured_at: DateTime<Utc>,
    pub source: SnapshotSource,
}

impl MarketSnapshot {
    /// A snapshot with every known instrument defaulted to a zero quote
    pub fn empty(captured_at: DateTime<Utc>, source: SnapshotSource) -> Self {
        let quotes = InstrumentKind::ALL
            .iter()
            .map(|kind| (*kind, PriceQuote::zero(*kind)))
            .collect();

        Self {
            quotes,
            captured_at,
            source,
        }
    }

    /// Quote for `kind`, zero when the instrument was never set
    pub fn quote(&self, kind: InstrumentKind) -> PriceQuote {
        self.quotes
            .get(&kind)
            .copied()
            .unwrap_or_else(|| PriceQuote::zero(kind))
    }

    pub fn set(&mut self, quote: PriceQuote) {
        self.quotes.insert(quote.kind, quote);
    }

    pub fn primary(&self) -> PriceQuote {
        self.quote(InstrumentKind::PRIMARY)
    }

    /// A snapshot whose primary price is all-zero is a parse failure,
    /// not a legitimate zero-price quote.
    pub fn is_valid(&self) -> bool {
        !self.primary().is_zero()
    }

    pub fn with_source(mut self, source: SnapshotSource) -> Self {
        self.source = source;
        self
    }
}
