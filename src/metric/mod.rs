// src/metric/mod.rs
//! Metric descriptors: a kind tag plus a payload shaped for that kind.
//!
//! The payload shape is declared separately from the kind so a descriptor can
//! be checked before dispatch (see [`dispatch::render`]).

pub mod dispatch;
pub mod error;
pub mod wire;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub use dispatch::{render, render_wire, RenderPlan};
pub use error::MetricError;

/// Closed set of visualization kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricKind {
    Line,
    Bar,
    Area,
    Image,
    Embed,
}

impl MetricKind {
    pub const ALL: [MetricKind; 5] = [
        MetricKind::Line,
        MetricKind::Bar,
        MetricKind::Area,
        MetricKind::Image,
        MetricKind::Embed,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            MetricKind::Line => "line",
            MetricKind::Bar => "bar",
            MetricKind::Area => "area",
            MetricKind::Image => "image",
            MetricKind::Embed => "embed",
        }
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MetricKind {
    type Err = MetricError;

    /// Case-insensitive; anything outside the closed set is a defect at the source.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let t = s.trim();
        MetricKind::ALL
            .into_iter()
            .find(|k| k.as_str().eq_ignore_ascii_case(t))
            .ok_or_else(|| MetricError::UnsupportedKind(t.to_string()))
    }
}

/// One category on a multi-series chart.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesPoint {
    pub label: String,
    /// Series name → value, in the order the source supplied them.
    pub values: Vec<(String, f64)>,
}

impl SeriesPoint {
    pub fn new<S: Into<String>>(
        label: impl Into<String>,
        values: impl IntoIterator<Item = (S, f64)>,
    ) -> Self {
        Self {
            label: label.into(),
            values: values.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }

    pub fn value(&self, series: &str) -> Option<f64> {
        self.values
            .iter()
            .find(|(name, _)| name == series)
            .map(|(_, v)| *v)
    }
}

/// One bar on a categorical chart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BarPoint {
    pub label: String,
    pub value: f64,
}

impl BarPoint {
    pub fn new(label: impl Into<String>, value: f64) -> Self {
        Self {
            label: label.into(),
            value,
        }
    }
}

/// Opaque locator for Image/Embed kinds; never fetched by the core.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetRef {
    pub source_ref: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_link: Option<String>,
}

/// Payload shapes. Line/Area take `Series`, Bar takes `Bars`,
/// Image/Embed take `Asset`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "shape", content = "data", rename_all = "lowercase")]
pub enum SeriesPayload {
    Series(Vec<SeriesPoint>),
    Bars(Vec<BarPoint>),
    Asset(AssetRef),
    /// Wire payload that did not decode for its kind. Kept so the rest of the
    /// set still renders; dispatch reports it as malformed.
    Rejected {
        key: Option<String>,
        reason: String,
    },
}

impl SeriesPayload {
    pub fn shape_name(&self) -> &'static str {
        match self {
            SeriesPayload::Series(_) => "series",
            SeriesPayload::Bars(_) => "bars",
            SeriesPayload::Asset(_) => "asset",
            SeriesPayload::Rejected { .. } => "rejected",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricDescriptor {
    pub title: String,
    pub description: String,
    pub kind: MetricKind,
    pub series: SeriesPayload,
}

impl MetricDescriptor {
    pub fn new(
        title: impl Into<String>,
        description: impl Into<String>,
        kind: MetricKind,
        series: SeriesPayload,
    ) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            kind,
            series,
        }
    }

    pub fn line(title: impl Into<String>, description: impl Into<String>, points: Vec<SeriesPoint>) -> Self {
        Self::new(title, description, MetricKind::Line, SeriesPayload::Series(points))
    }

    pub fn area(title: impl Into<String>, description: impl Into<String>, points: Vec<SeriesPoint>) -> Self {
        Self::new(title, description, MetricKind::Area, SeriesPayload::Series(points))
    }

    pub fn bar(title: impl Into<String>, description: impl Into<String>, bars: Vec<BarPoint>) -> Self {
        Self::new(title, description, MetricKind::Bar, SeriesPayload::Bars(bars))
    }

    pub fn image(title: impl Into<String>, description: impl Into<String>, asset: AssetRef) -> Self {
        Self::new(title, description, MetricKind::Image, SeriesPayload::Asset(asset))
    }

    pub fn embed(title: impl Into<String>, description: impl Into<String>, asset: AssetRef) -> Self {
        Self::new(title, description, MetricKind::Embed, SeriesPayload::Asset(asset))
    }
}

/// The payload cached under the metrics key.
pub type MetricSet = Vec<MetricDescriptor>;
