//! Boundary for streamed footprint volume.
//!
//! Wire messages are decoded into [`StreamMessage`] and validated into a
//! [`Batch`] before anything reaches the [`BinStore`]. Bad records are dropped
//! one by one; a message only fails as a whole when it is not JSON or has an
//! unknown `type`.

use chrono::{DateTime, NaiveDateTime};
use serde::Deserialize;
use serde_json::Value;

use crate::footprint::{BinStore, FootprintBin};

#[derive(thiserror::Error, Debug)]
pub enum StreamError {
    #[error("undecodable stream message: {0}")]
    Decode(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum StreamMessage {
    /// Full history, replaces the store.
    #[serde(rename = "INIT_DATA")]
    InitBatch {
        #[serde(default)]
        history: Vec<Value>,
    },
    /// Additive volume for the current bucket.
    #[serde(rename = "POWER_UPDATE")]
    IncrementalUpdate {
        #[serde(default)]
        candletime: Option<Value>,
        #[serde(default, alias = "current_price")]
        price: Option<Value>,
        #[serde(default)]
        vel: Option<Value>,
        #[serde(default)]
        updates: Vec<Value>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VolumeDelta {
    pub price: i64,
    pub buy: f32,
    pub sell: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Tick {
    /// bucket the deltas belong to, `None` if the message carried no usable time
    pub t: Option<u64>,
    pub last_price: Option<f64>,
    pub velocity: f64,
    pub deltas: Vec<VolumeDelta>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Batch {
    Init(Vec<FootprintBin>),
    Update(Tick),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Decoded {
    pub batch: Batch,
    /// records dropped during validation
    pub dropped: usize,
}

pub fn decode(text: &str) -> Result<Decoded, StreamError> {
    let message: StreamMessage = serde_json::from_str(text)?;
    Ok(validate(message))
}

pub fn validate(message: StreamMessage) -> Decoded {
    let mut dropped = 0;

    let batch = match message {
        StreamMessage::InitBatch { history } => {
            let mut bins = Vec::new();

            for candle in &history {
                let Some(t) = candle.get("candletime").and_then(parse_candletime) else {
                    dropped += 1;
                    continue;
                };
                let Some(levels) = candle.get("bins").and_then(Value::as_object) else {
                    dropped += 1;
                    continue;
                };

                for (price, volume) in levels {
                    let level = price.parse::<f64>().ok().and_then(price_level);
                    let buy = volume.get("buy").and_then(parse_volume);
                    let sell = volume.get("sell").and_then(parse_volume);

                    match (level, buy, sell) {
                        (Some(level), Some(buy), Some(sell)) => {
                            bins.push(FootprintBin::new(t, level, buy, sell));
                        }
                        _ => dropped += 1,
                    }
                }
            }

            Batch::Init(bins)
        }
        StreamMessage::IncrementalUpdate {
            candletime,
            price,
            vel,
            updates,
        } => {
            let mut deltas = Vec::with_capacity(updates.len());

            for update in &updates {
                let level = update.get("bin").and_then(parse_f64).and_then(price_level);
                let buy = update.get("buy").and_then(parse_volume);
                let sell = update.get("sell").and_then(parse_volume);

                match (level, buy, sell) {
                    (Some(price), Some(buy), Some(sell)) => {
                        deltas.push(VolumeDelta { price, buy, sell });
                    }
                    _ => dropped += 1,
                }
            }

            Batch::Update(Tick {
                t: candletime.as_ref().and_then(parse_candletime),
                last_price: price.as_ref().and_then(parse_f64),
                velocity: vel.as_ref().and_then(parse_f64).unwrap_or(0.0),
                deltas,
            })
        }
    };

    if dropped > 0 {
        log::warn!("dropped {dropped} malformed footprint record(s)");
    }

    Decoded { batch, dropped }
}

impl BinStore {
    /// Applies a validated batch. Returns whether the store changed.
    pub fn ingest(&mut self, batch: &Batch) -> bool {
        match batch {
            Batch::Init(bins) => {
                self.replace(bins.iter().copied());
                true
            }
            Batch::Update(tick) => {
                let Some(t) = tick.t else {
                    if !tick.deltas.is_empty() {
                        log::warn!(
                            "dropped {} volume update(s) without a bucket time",
                            tick.deltas.len()
                        );
                    }
                    return false;
                };

                for delta in &tick.deltas {
                    self.apply(t, delta.price, delta.buy, delta.sell);
                }
                !tick.deltas.is_empty()
            }
        }
    }
}

fn parse_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|v| v.is_finite())
}

fn parse_volume(value: &Value) -> Option<f32> {
    parse_f64(value)
        .filter(|v| *v >= 0.0)
        .map(|v| v as f32)
        .filter(|v| v.is_finite())
}

fn price_level(price: f64) -> Option<i64> {
    price.is_finite().then(|| price.floor() as i64)
}

/// Accepts RFC 3339, `YYYY-MM-DD HH:MM:SS` (UTC) or unix seconds.
pub fn parse_candletime(value: &Value) -> Option<u64> {
    let seconds = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => {
            let s = s.trim();
            if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
                dt.timestamp() as f64
            } else if let Some(dt) = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"]
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
            {
                dt.and_utc().timestamp() as f64
            } else {
                s.parse::<f64>().ok()?
            }
        }
        _ => return None,
    };

    (seconds.is_finite() && seconds >= 0.0).then(|| seconds.floor() as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_incremental_update() {
        let decoded = decode(
            r#"{
                "type": "POWER_UPDATE",
                "price": 2350.4,
                "vel": 1.5,
                "candletime": "2024-05-01 10:03:00",
                "updates": [
                    { "bin": 2350.7, "buy": 3, "sell": 1 },
                    { "bin": 2349.0, "buy": "2", "sell": 0 }
                ]
            }"#,
        )
        .unwrap();

        assert_eq!(decoded.dropped, 0);
        let Batch::Update(tick) = decoded.batch else {
            panic!("expected update");
        };
        assert_eq!(tick.t, Some(1_714_557_780));
        assert_eq!(tick.last_price, Some(2350.4));
        assert_eq!(tick.velocity, 1.5);
        assert_eq!(
            tick.deltas,
            vec![
                VolumeDelta {
                    price: 2350,
                    buy: 3.0,
                    sell: 1.0,
                },
                VolumeDelta {
                    price: 2349,
                    buy: 2.0,
                    sell: 0.0,
                },
            ]
        );
    }

    #[test]
    fn malformed_records_are_dropped_individually() {
        let decoded = decode(
            r#"{
                "type": "POWER_UPDATE",
                "candletime": 1714557780,
                "updates": [
                    { "bin": 10, "buy": 1, "sell": 1 },
                    { "bin": 11, "buy": -4, "sell": 1 },
                    { "bin": 12, "sell": 1 },
                    { "bin": "x", "buy": 1, "sell": 1 },
                    { "bin": 13, "buy": 1, "sell": 2 }
                ]
            }"#,
        )
        .unwrap();

        assert_eq!(decoded.dropped, 3);
        let Batch::Update(tick) = decoded.batch else {
            panic!("expected update");
        };
        assert_eq!(tick.deltas.len(), 2);
    }

    #[test]
    fn decodes_history() {
        let decoded = decode(
            r#"{
                "type": "INIT_DATA",
                "history": [
                    { "candletime": "2024-05-01T10:00:00Z", "bins": { "100.5": { "buy": 1, "sell": 2 } } },
                    { "candletime": "garbage", "bins": {} },
                    { "candletime": 1714557660, "bins": { "101": { "buy": 4, "sell": null } } }
                ]
            }"#,
        )
        .unwrap();

        assert_eq!(decoded.dropped, 2);
        assert_eq!(
            decoded.batch,
            Batch::Init(vec![FootprintBin::new(1_714_557_600, 100, 1.0, 2.0)])
        );
    }

    #[test]
    fn unknown_type_fails() {
        assert!(decode(r#"{ "type": "HEARTBEAT" }"#).is_err());
        assert!(decode("not json").is_err());
    }

    #[test]
    fn ingest_applies_batches() {
        let mut store = BinStore::default();

        let init = Batch::Init(vec![FootprintBin::new(60, 10, 1.0, 1.0)]);
        assert!(store.ingest(&init));

        let update = Batch::Update(Tick {
            t: Some(60),
            last_price: None,
            velocity: 0.0,
            deltas: vec![VolumeDelta {
                price: 10,
                buy: 2.0,
                sell: 0.5,
            }],
        });
        assert!(store.ingest(&update));
        assert_eq!(store.get(60, 10).unwrap().buy_volume, 3.0);

        let orphan = Batch::Update(Tick {
            t: None,
            last_price: None,
            velocity: 0.0,
            deltas: vec![VolumeDelta {
                price: 10,
                buy: 2.0,
                sell: 0.5,
            }],
        });
        assert!(!store.ingest(&orphan));
        assert_eq!(store.get(60, 10).unwrap().buy_volume, 3.0);
    }

    #[test]
    fn candletime_formats() {
        assert_eq!(parse_candletime(&json!(120.9)), Some(120));
        assert_eq!(parse_candletime(&json!("120")), Some(120));
        assert_eq!(parse_candletime(&json!("1970-01-01T00:02:00+00:00")), Some(120));
        assert_eq!(parse_candletime(&json!(-5)), None);
        assert_eq!(parse_candletime(&json!(null)), None);
    }
}
