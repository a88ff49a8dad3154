//! Built-in market headlines
//!
//! Served when no NewsAPI key is configured or the API yields nothing
//! relevant, so the analysis prompt always has some market context.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use gold_core::Headline;

use crate::error::NewsError;
use crate::source::HeadlineSource;

/// (title, description, source, hours ago)
const HEADLINES: [(&str, &str, &str, i64); 5] = [
    (
        "Altın fiyatları FED belirsizliği ile tüm zamanların rekorunu kırdı",
        "Fed politika açıklamalarının ardından yatırımcılar güvenli liman arayışında altına yöneldi. Gram altın 4.600 TL seviyesini test etti.",
        "Ekonomi Haberleri",
        2,
    ),
    (
        "Merkez bankaları altın rezervlerini artırıyor",
        "Küresel merkez bankaları bu çeyrekte rezerv çeşitlendirmesi kapsamında önemli altın alımları yaptı. TCMB da rezervlerini güçlendirdi.",
        "Reuters Türkiye",
        4,
    ),
    (
        "Jeopolitik gerilimler altın talebini destekliyor",
        "Küresel belirsizlikler ve jeopolitik riskler yatırımcıları enflasyon korunması için değerli metallere yönlendiriyor.",
        "Bloomberg HT",
        8,
    ),
    (
        "Türkiye'de altın yatırımı artan enflasyonla popüler",
        "Yüksek enflasyon ortamında Türk yatırımcılar değer koruma aracı olarak altına yöneliyor. Fiziksel altın satışları arttı.",
        "Hürriyet",
        12,
    ),
    (
        "Gram altın 4.500 TL direncini test ediyor",
        "Teknik analistlere göre gram altın fiyatları 4.500 TL seviyesindeki güçlü direnci test ediyor. Aşılması halinde 4.700 TL hedefleniyor.",
        "Investing.com Türkiye",
        16,
    ),
];

/// Static headline source
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticHeadlines;

impl StaticHeadlines {
    /// Built-in headlines timestamped relative to `now`
    pub fn headlines_at(now: DateTime<Utc>) -> Vec<Headline> {
        HEADLINES
            .iter()
            .map(|(title, description, source, hours_ago)| Headline {
                title: title.to_string(),
                description: description.to_string(),
                url: None,
                published_at: now - Duration::hours(*hours_ago),
                source_name: source.to_string(),
            })
            .collect()
    }
}

#[async_trait]
impl HeadlineSource for StaticHeadlines {
    async fn fetch_headlines(&self) -> Result<Vec<Headline>, NewsError> {
        Ok(Self::headlines_at(Utc::now()))
    }

    fn name(&self) -> &'static str {
        "static"
    }
}
