// src/metric/wire.rs
//! JSON wire format of metric descriptors as produced by metric providers:
//!
//! ```json
//! { "title": "...", "description": "...", "chartType": "line",
//!   "data": [ { "name": "Jan", "BTC": 1000000, "ETH": 750000 } ] }
//! ```
//!
//! Line/Area `data` is an array of `{name, <series>: number...}`, Bar `data`
//! is an array of `{name, value}`, Image/Embed `data` is
//! `{sourceRef, externalLink?}`. Series keep the key order of the JSON object.

use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::warn;

use super::error::{MetricError, MetricResult};
use super::{AssetRef, BarPoint, MetricDescriptor, MetricKind, MetricSet, SeriesPayload, SeriesPoint};

const LABEL_FIELD: &str = "name";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireDescriptor {
    title: String,
    #[serde(default)]
    description: String,
    #[serde(alias = "kind")]
    chart_type: String,
    #[serde(default)]
    data: Value,
}

/// Decode one descriptor. Unknown `chartType` → `UnsupportedKind`.
pub fn decode_descriptor(raw: &Value) -> MetricResult<MetricDescriptor> {
    let (wire, kind) = decode_header(raw)?;
    let series = decode_payload(kind, &wire.data)?;
    Ok(MetricDescriptor::new(wire.title, wire.description, kind, series))
}

/// Decode a JSON array of descriptors.
///
/// A bad envelope (invalid JSON, missing title, unknown kind) fails the whole
/// set. A payload that does not fit its kind is kept as
/// [`SeriesPayload::Rejected`], so only that card shows an error.
pub fn decode_metric_set(json: &str) -> MetricResult<MetricSet> {
    let raw: Vec<Value> = serde_json::from_str(json)?;
    raw.iter()
        .map(|item| {
            let (wire, kind) = decode_header(item)?;
            let series = match decode_payload(kind, &wire.data) {
                Ok(series) => series,
                Err(MetricError::Malformed { key, reason, .. }) => {
                    warn!(target: "metric", title = %wire.title, %kind, %reason, "payload rejected");
                    SeriesPayload::Rejected { key, reason }
                }
                Err(other) => return Err(other),
            };
            Ok(MetricDescriptor::new(wire.title, wire.description, kind, series))
        })
        .collect()
}

fn decode_header(raw: &Value) -> MetricResult<(WireDescriptor, MetricKind)> {
    let wire = WireDescriptor::deserialize(raw)?;
    let kind: MetricKind = wire.chart_type.parse()?;
    Ok((wire, kind))
}

fn decode_payload(kind: MetricKind, data: &Value) -> MetricResult<SeriesPayload> {
    Ok(match kind {
        MetricKind::Line | MetricKind::Area => SeriesPayload::Series(decode_series(kind, data)?),
        MetricKind::Bar => SeriesPayload::Bars(decode_bars(data)?),
        MetricKind::Image | MetricKind::Embed => SeriesPayload::Asset(decode_asset(kind, data)?),
    })
}

fn rows<'a>(kind: MetricKind, data: &'a Value) -> MetricResult<Vec<&'a Map<String, Value>>> {
    let items = data
        .as_array()
        .ok_or_else(|| MetricError::malformed(kind, Some("data"), "expected an array of points"))?;
    items
        .iter()
        .enumerate()
        .map(|(i, item)| {
            item.as_object().ok_or_else(|| {
                MetricError::malformed(kind, Some("data"), format!("point #{i} is not an object"))
            })
        })
        .collect()
}

fn label_of(kind: MetricKind, row: &Map<String, Value>, index: usize) -> MetricResult<String> {
    match row.get(LABEL_FIELD) {
        Some(Value::String(s)) => Ok(s.clone()),
        Some(Value::Number(n)) => Ok(n.to_string()),
        _ => Err(MetricError::malformed(
            kind,
            Some(LABEL_FIELD),
            format!("point #{index} has no category label"),
        )),
    }
}

fn decode_series(kind: MetricKind, data: &Value) -> MetricResult<Vec<SeriesPoint>> {
    rows(kind, data)?
        .into_iter()
        .enumerate()
        .map(|(i, row)| {
            let label = label_of(kind, row, i)?;
            let values = row
                .iter()
                .filter(|(k, _)| k.as_str() != LABEL_FIELD)
                .map(|(k, v)| {
                    v.as_f64().map(|x| (k.clone(), x)).ok_or_else(|| {
                        MetricError::malformed(kind, Some(k.as_str()), format!("non-numeric value in point '{label}'"))
                    })
                })
                .collect::<MetricResult<Vec<_>>>()?;
            Ok(SeriesPoint { label, values })
        })
        .collect()
}

fn decode_bars(data: &Value) -> MetricResult<Vec<BarPoint>> {
    let kind = MetricKind::Bar;
    rows(kind, data)?
        .into_iter()
        .enumerate()
        .map(|(i, row)| {
            let label = label_of(kind, row, i)?;
            let value = row.get("value").and_then(Value::as_f64).ok_or_else(|| {
                MetricError::malformed(kind, Some("value"), format!("missing or non-numeric in bar '{label}'"))
            })?;
            Ok(BarPoint { label, value })
        })
        .collect()
}

fn decode_asset(kind: MetricKind, data: &Value) -> MetricResult<AssetRef> {
    AssetRef::deserialize(data).map_err(|e| MetricError::malformed(kind, Some("sourceRef"), e.to_string()))
}
