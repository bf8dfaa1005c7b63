use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Instance ids arrive as either JSON strings or numbers; both are kept as text.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct InstanceId(pub String);

impl InstanceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for InstanceId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl<'de> Deserialize<'de> for InstanceId {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        struct IdVisitor;

        impl<'de> Visitor<'de> for IdVisitor {
            type Value = InstanceId;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a string or integer instance id")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
                Ok(InstanceId(v.to_string()))
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
                Ok(InstanceId(v.to_string()))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
                Ok(InstanceId(v.to_string()))
            }
        }

        d.deserialize_any(IdVisitor)
    }
}

pub type InstrumentId = u64;

/// Numbers on the wire are sometimes quoted. Anything that does not read as a
/// number (null, bool, garbage text, missing) becomes `None`.
pub fn lenient_f64<'de, D: Deserializer<'de>>(d: D) -> Result<Option<f64>, D::Error> {
    let v = serde_json::Value::deserialize(d)?;
    Ok(match v {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    })
}

fn lenient_instrument_id<'de, D: Deserializer<'de>>(d: D) -> Result<InstrumentId, D::Error> {
    let v = serde_json::Value::deserialize(d)?;
    match &v {
        serde_json::Value::Number(n) => n.as_u64(),
        serde_json::Value::String(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    }
    .ok_or_else(|| de::Error::custom(format!("invalid instrument id: {v}")))
}

/// Like [`lenient_f64`] for fields that must carry a finite number.
fn lenient_finite_f64<'de, D: Deserializer<'de>>(d: D) -> Result<f64, D::Error> {
    lenient_f64(d)?
        .filter(|v| v.is_finite())
        .ok_or_else(|| de::Error::custom("expected a finite number or numeric string"))
}

/// One strike's combined premium inside an instance snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PremiumSample {
    #[serde(default)]
    pub name: String,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub combined_premium: Option<f64>,
}

impl PremiumSample {
    pub fn new(name: impl Into<String>, combined_premium: f64) -> Self {
        Self { name: name.into(), combined_premium: Some(combined_premium) }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpreadSample {
    #[serde(default)]
    pub name: String,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub spread_premium: Option<f64>,
}

/// Full set of samples for one instance at a point in time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstancePremiumSnapshot {
    pub id: InstanceId,
    #[serde(default)]
    pub combined_premium_array: Vec<PremiumSample>,
    #[serde(default)]
    pub spread_premium_array: Vec<SpreadSample>,
}

impl InstancePremiumSnapshot {
    pub fn new(id: impl Into<String>, samples: Vec<PremiumSample>) -> Self {
        Self {
            id: InstanceId::new(id),
            combined_premium_array: samples,
            spread_premium_array: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LowestPremiumResult {
    pub id: InstanceId,
    pub lowest_value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexPriceTick {
    #[serde(deserialize_with = "lenient_instrument_id")]
    pub id: InstrumentId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub segment: String,
    #[serde(deserialize_with = "lenient_finite_f64")]
    pub price: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MtmUpdate {
    pub id: InstanceId,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub mtm: Option<f64>,
}

// ---- REST resources --------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OptionType {
    #[serde(rename = "CE")]
    Call,
    #[serde(rename = "PE")]
    Put,
}

impl OptionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OptionType::Call => "CE",
            OptionType::Put => "PE",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Buy => "BUY",
            Side::Sell => "SELL",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TradeLeg {
    pub id: String,
    pub instance_id: InstanceId,
    pub strike: f64,
    pub option_type: OptionType,
    pub side: Side,
    pub quantity: u32,
    #[serde(default)]
    pub entry_price: f64,
    #[serde(default)]
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Instance {
    pub id: InstanceId,
    pub name: String,
    #[serde(default)]
    pub underlying: String,
    #[serde(default)]
    pub expiry: String,
    #[serde(default)]
    pub ltp_range: Option<(f64, f64)>,
    #[serde(default)]
    pub legs: Vec<TradeLeg>,
}

/// Body for creating or editing a leg.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TradeDraft {
    pub strike: f64,
    pub option_type: OptionType,
    pub side: Side,
    pub quantity: u32,
    pub entry_price: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderKind {
    Market,
    Limit,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderRequest {
    pub instance_id: InstanceId,
    pub trade_id: String,
    pub side: Side,
    pub quantity: u32,
    pub kind: OrderKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit_price: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderAck {
    pub order_id: String,
    #[serde(default)]
    pub status: String,
}
