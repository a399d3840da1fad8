//! Wire format of the real-time feed.

use crate::models::{MarketOverview, PerformancePoint, Stock};
use serde::{Deserialize, Serialize};

pub const INITIAL: &str = "initial";
pub const PRICE_UPDATE: &str = "price_update";

/// `{type, data, timestamp?}` as sent by the feed server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub data: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

/// Payload of an `initial` message; each part is replaced only when present.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InitialData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stocks: Option<Vec<Stock>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub performance: Option<Vec<PerformancePoint>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overview: Option<MarketOverview>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceUpdateData {
    pub stocks: Vec<Stock>,
}

/// Decoded feed message.
#[derive(Debug, Clone, PartialEq)]
pub enum FeedEvent {
    Initial(InitialData),
    PriceUpdate(Vec<Stock>),
    /// Well-formed envelope with a type this client does not handle.
    Unknown(String),
}

impl FeedEvent {
    pub fn parse(text: &str) -> serde_json::Result<Self> {
        let envelope: Envelope = serde_json::from_str(text)?;
        Ok(match envelope.kind.as_str() {
            INITIAL => FeedEvent::Initial(serde_json::from_value(envelope.data)?),
            PRICE_UPDATE => {
                let data: PriceUpdateData = serde_json::from_value(envelope.data)?;
                FeedEvent::PriceUpdate(data.stocks)
            }
            _ => FeedEvent::Unknown(envelope.kind),
        })
    }
}

/// Encode an envelope stamped with the current time.
pub fn encode<T: Serialize>(kind: &str, data: &T) -> serde_json::Result<String> {
    let envelope = Envelope {
        kind: kind.to_string(),
        data: serde_json::to_value(data)?,
        timestamp: Some(chrono::Utc::now().to_rfc3339()),
    };
    serde_json::to_string(&envelope)
}
