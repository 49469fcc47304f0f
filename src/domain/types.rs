//! Shared types for strata aggregation

use serde::{Deserialize, Deserializer, Serialize};
use std::str::FromStr;

/// One strata plan as returned by the StrataHub feature layer
///
/// Field names follow the upstream attribute names so records round-trip
/// unchanged through the JSON building view.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BuildingRecord {
    #[serde(rename = "planlabel", default, deserialize_with = "deserialize_text")]
    pub plan_label: Option<String>,
    #[serde(default, deserialize_with = "deserialize_text")]
    pub address: Option<String>,
    #[serde(default, deserialize_with = "deserialize_text")]
    pub suburb: Option<String>,
    #[serde(default, deserialize_with = "deserialize_text")]
    pub postcode: Option<String>,
    #[serde(default, deserialize_with = "deserialize_text")]
    pub lga: Option<String>,
    /// None when the upstream value is missing or not a non-negative integer
    #[serde(rename = "lottotal", default, deserialize_with = "deserialize_lot_total")]
    pub lot_total: Option<u64>,
}

impl BuildingRecord {
    /// Address, if present and not blank
    pub fn address(&self) -> Option<&str> {
        self.address.as_deref().filter(|a| !a.trim().is_empty())
    }

    /// Plan label, if present and not blank
    pub fn plan_label(&self) -> Option<&str> {
        self.plan_label.as_deref().filter(|p| !p.trim().is_empty())
    }
}

/// Accept strings, numbers or null for free-text attributes (postcode arrives as an int)
fn deserialize_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::{self, Visitor};

    struct TextVisitor;

    impl<'de> Visitor<'de> for TextVisitor {
        type Value = Option<String>;

        fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
            formatter.write_str("a string, number or null")
        }

        fn visit_str<E: de::Error>(self, value: &str) -> Result<Self::Value, E> {
            Ok(Some(value.to_string()))
        }

        fn visit_string<E: de::Error>(self, value: String) -> Result<Self::Value, E> {
            Ok(Some(value))
        }

        fn visit_u64<E: de::Error>(self, value: u64) -> Result<Self::Value, E> {
            Ok(Some(value.to_string()))
        }

        fn visit_i64<E: de::Error>(self, value: i64) -> Result<Self::Value, E> {
            Ok(Some(value.to_string()))
        }

        fn visit_f64<E: de::Error>(self, value: f64) -> Result<Self::Value, E> {
            if value.fract() == 0.0 && value.is_finite() {
                Ok(Some(format!("{value:.0}")))
            } else {
                Ok(Some(value.to_string()))
            }
        }

        fn visit_bool<E: de::Error>(self, value: bool) -> Result<Self::Value, E> {
            Ok(Some(value.to_string()))
        }

        fn visit_none<E: de::Error>(self) -> Result<Self::Value, E> {
            Ok(None)
        }

        fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
            Ok(None)
        }

        fn visit_some<D2: Deserializer<'de>>(self, d: D2) -> Result<Self::Value, D2::Error> {
            d.deserialize_any(TextVisitor)
        }
    }

    deserializer.deserialize_any(TextVisitor)
}

/// 2^64, the first float past `u64::MAX`
const U64_LIMIT: f64 = 18_446_744_073_709_551_616.0;

/// Lot totals come back as ints, but strings, floats and nulls have been seen.
/// Anything that is not a non-negative integer becomes None instead of failing
/// the whole page.
fn deserialize_lot_total<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::{self, IgnoredAny, MapAccess, SeqAccess, Visitor};

    struct LotTotalVisitor;

    impl<'de> Visitor<'de> for LotTotalVisitor {
        type Value = Option<u64>;

        fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
            formatter.write_str("a lot count")
        }

        fn visit_u64<E: de::Error>(self, value: u64) -> Result<Self::Value, E> {
            Ok(Some(value))
        }

        fn visit_i64<E: de::Error>(self, value: i64) -> Result<Self::Value, E> {
            Ok(u64::try_from(value).ok())
        }

        fn visit_f64<E: de::Error>(self, value: f64) -> Result<Self::Value, E> {
            if value.is_finite() && value >= 0.0 && value.fract() == 0.0 && value < U64_LIMIT {
                Ok(Some(value as u64))
            } else {
                Ok(None)
            }
        }

        fn visit_str<E: de::Error>(self, value: &str) -> Result<Self::Value, E> {
            Ok(parse_lot_total(value))
        }

        fn visit_bool<E: de::Error>(self, _value: bool) -> Result<Self::Value, E> {
            Ok(None)
        }

        fn visit_none<E: de::Error>(self) -> Result<Self::Value, E> {
            Ok(None)
        }

        fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
            Ok(None)
        }

        fn visit_some<D2: Deserializer<'de>>(self, d: D2) -> Result<Self::Value, D2::Error> {
            d.deserialize_any(LotTotalVisitor)
        }

        fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
            while seq.next_element::<IgnoredAny>()?.is_some() {}
            Ok(None)
        }

        fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
            while map.next_entry::<IgnoredAny, IgnoredAny>()?.is_some() {}
            Ok(None)
        }
    }

    deserializer.deserialize_any(LotTotalVisitor)
}

/// Parse a textual lot total ("12", " 7 ") into a count
pub fn parse_lot_total(value: &str) -> Option<u64> {
    let value = value.trim();
    let value = value.strip_prefix('+').unwrap_or(value);
    value.parse::<u64>().ok()
}

/// Street-level aggregate, one per canonical street name
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StreetAggregate {
    pub street_name: String,
    pub suburb: String,
    pub property_count: u64,
    pub total_lots_on_street: u64,
    pub cumulative_lots: u64,
}

/// One row of the building views
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BuildingRow {
    #[serde(flatten)]
    pub record: BuildingRecord,
    pub street_address_display: String,
    pub sum_of_lots_per_street: u64,
    pub cumulative_lots: u64,
}

/// Tabular view selector used by the export endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewType {
    Building,
    BuildingMinLots,
    Street,
    StreetMinLots,
}

impl ViewType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ViewType::Building => "building",
            ViewType::BuildingMinLots => "building_ge20_lots",
            ViewType::Street => "street",
            ViewType::StreetMinLots => "street_ge20_lots",
        }
    }
}

impl FromStr for ViewType {
    type Err = crate::infra::error::StrataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "building" => Ok(ViewType::Building),
            "building_ge20_lots" => Ok(ViewType::BuildingMinLots),
            "street" => Ok(ViewType::Street),
            "street_ge20_lots" => Ok(ViewType::StreetMinLots),
            other => Err(crate::infra::error::StrataError::InvalidView { view: other.to_string() }),
        }
    }
}

impl std::fmt::Display for ViewType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rows produced for one view
#[derive(Debug, Clone, PartialEq)]
pub enum ViewRows {
    Buildings(Vec<BuildingRow>),
    Streets(Vec<StreetAggregate>),
}

impl ViewRows {
    pub fn len(&self) -> usize {
        match self {
            ViewRows::Buildings(rows) => rows.len(),
            ViewRows::Streets(rows) => rows.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
