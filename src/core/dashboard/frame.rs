//! Push-channel frame decoding and classification.
//!
//! A frame is one UTF-8 JSON text message. Keys are checked independently, so a
//! single frame may yield several events.

use serde_json::Value;

use super::reading::{LiveReadingPolicy, LiveSnapshot, RawReading, Reading, SensorStatus};
use crate::error::{DashError, Result};

const KEY_HISTORY: &str = "history";
const KEY_STATUS: &str = "status";

/// Typed events produced by the ingestion channel
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelEvent {
    /// Bulk history payload; replaces the store
    FullHistorySnapshot(Vec<Reading>),

    /// Latest live metric values
    LiveReading(LiveSnapshot),

    /// Complete sensor status map
    StatusUpdate(SensorStatus),
}

/// Decode one text frame into zero or more events.
///
/// Malformed JSON is a decode error; callers drop the frame and keep the channel open.
/// Valid JSON that matches no known key yields an empty list.
pub fn decode_frame(text: &str, policy: LiveReadingPolicy) -> Result<Vec<ChannelEvent>> {
    let value: Value = serde_json::from_str(text)
        .map_err(|e| DashError::decode(format!("malformed frame: {}", e)))?;

    let Value::Object(object) = value else {
        log::debug!("Ignoring non-object frame");
        return Ok(Vec::new());
    };

    let mut events = Vec::with_capacity(2);

    if let Some(Value::Array(items)) = object.get(KEY_HISTORY) {
        events.push(ChannelEvent::FullHistorySnapshot(decode_readings(items)));
    } else {
        let raw = RawReading::from_object(&object);
        if raw.has_any_metric() {
            match raw.live_metrics(policy) {
                Ok(live) => events.push(ChannelEvent::LiveReading(live)),
                Err(e) => log::debug!("Dropping live reading: {}", e),
            }
        }
    }

    match object.get(KEY_STATUS) {
        Some(Value::Object(status)) => {
            events.push(ChannelEvent::StatusUpdate(SensorStatus::from_wire(status)));
        }
        Some(Value::Null) | None => {}
        Some(other) => log::debug!("Ignoring non-object status payload: {}", other),
    }

    Ok(events)
}

/// Validate a batch of wire readings, dropping the invalid ones.
pub fn decode_readings(items: &[Value]) -> Vec<Reading> {
    let mut dropped = 0usize;

    let readings: Vec<Reading> = items
        .iter()
        .filter_map(|item| {
            match RawReading::from_value(item).and_then(|raw| raw.validate()) {
                Ok(reading) => Some(reading),
                Err(e) => {
                    dropped += 1;
                    log::debug!("Dropping historical reading: {}", e);
                    None
                }
            }
        })
        .collect();

    if dropped > 0 {
        log::debug!(
            "Accepted {} of {} historical readings ({} invalid)",
            readings.len(),
            items.len(),
            dropped
        );
    }

    readings
}
