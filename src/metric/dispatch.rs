// src/metric/dispatch.rs
//! Pure mapping from a metric descriptor to a render plan.
//!
//! Kind → plan:
//! - `line`  → multi-series timeseries
//! - `bar`   → categorical bar
//! - `area`  → stacked area
//! - `image` → static image with optional outbound link
//! - `embed` → external frame
//!
//! The payload is validated against its kind first; malformed data never
//! yields a partial plan.

use std::collections::HashSet;

use metrics::counter;
use serde::Serialize;

use super::error::{MetricError, MetricResult};
use super::wire;
use super::{AssetRef, BarPoint, MetricDescriptor, MetricKind, SeriesPayload, SeriesPoint};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesLine {
    pub name: String,
    pub values: Vec<f64>,
}

/// Categories on the x-axis, one value per category for each series.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesChart {
    pub categories: Vec<String>,
    pub series: Vec<SeriesLine>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BarChart {
    pub bars: Vec<BarPoint>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImagePlan {
    pub source_ref: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FramePlan {
    pub source_ref: String,
}

/// Instruction for the presentation layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "plan", rename_all = "snake_case")]
pub enum RenderPlan {
    Timeseries(SeriesChart),
    CategoricalBar(BarChart),
    StackedArea(SeriesChart),
    StaticImage(ImagePlan),
    ExternalFrame(FramePlan),
}

impl RenderPlan {
    pub fn kind(&self) -> MetricKind {
        match self {
            RenderPlan::Timeseries(_) => MetricKind::Line,
            RenderPlan::CategoricalBar(_) => MetricKind::Bar,
            RenderPlan::StackedArea(_) => MetricKind::Area,
            RenderPlan::StaticImage(_) => MetricKind::Image,
            RenderPlan::ExternalFrame(_) => MetricKind::Embed,
        }
    }
}

/// Validate `descriptor` and pick its render strategy.
pub fn render(descriptor: &MetricDescriptor) -> MetricResult<RenderPlan> {
    let kind = descriptor.kind;
    let plan = match (kind, &descriptor.series) {
        (MetricKind::Line, SeriesPayload::Series(points)) => {
            RenderPlan::Timeseries(series_chart(kind, points)?)
        }
        (MetricKind::Area, SeriesPayload::Series(points)) => {
            RenderPlan::StackedArea(series_chart(kind, points)?)
        }
        (MetricKind::Bar, SeriesPayload::Bars(bars)) => {
            RenderPlan::CategoricalBar(bar_chart(bars)?)
        }
        (MetricKind::Image, SeriesPayload::Asset(asset)) => {
            let source_ref = checked_source_ref(kind, asset)?;
            RenderPlan::StaticImage(ImagePlan {
                source_ref,
                link: asset
                    .external_link
                    .as_deref()
                    .map(str::trim)
                    .filter(|l| !l.is_empty())
                    .map(str::to_string),
            })
        }
        (MetricKind::Embed, SeriesPayload::Asset(asset)) => {
            RenderPlan::ExternalFrame(FramePlan {
                source_ref: checked_source_ref(kind, asset)?,
            })
        }
        (_, SeriesPayload::Rejected { key, reason }) => {
            return Err(MetricError::malformed(kind, key.as_deref(), reason.clone()))
        }
        (_, other) => {
            return Err(MetricError::malformed(
                kind,
                None,
                format!("expected {} payload, got {}", expected_shape(kind), other.shape_name()),
            ))
        }
    };
    Ok(plan)
}

/// Decode a raw wire descriptor and render it. Surfaces unknown kind tags as
/// [`MetricError::UnsupportedKind`].
pub fn render_wire(raw: &serde_json::Value) -> MetricResult<RenderPlan> {
    let descriptor = wire::decode_descriptor(raw)?;
    render(&descriptor)
}

/// Count a dispatcher failure; callers still render their own placeholder.
pub(crate) fn record_render_error(err: &MetricError) {
    counter!("metric_render_errors_total", "code" => err.code()).increment(1);
}

fn expected_shape(kind: MetricKind) -> &'static str {
    match kind {
        MetricKind::Line | MetricKind::Area => "series",
        MetricKind::Bar => "bars",
        MetricKind::Image | MetricKind::Embed => "asset",
    }
}

fn series_chart(kind: MetricKind, points: &[SeriesPoint]) -> MetricResult<SeriesChart> {
    let Some(first) = points.first() else {
        return Err(MetricError::malformed(kind, None, "no data points"));
    };
    if first.values.is_empty() {
        return Err(MetricError::malformed(
            kind,
            None,
            format!("point '{}' has no series values", first.label),
        ));
    }

    let names: Vec<&str> = first.values.iter().map(|(n, _)| n.as_str()).collect();
    let expected: HashSet<&str> = names.iter().copied().collect();

    for point in points {
        let mut seen = HashSet::with_capacity(point.values.len());
        for (name, value) in &point.values {
            if !seen.insert(name.as_str()) {
                return Err(MetricError::malformed(
                    kind,
                    Some(name.as_str()),
                    format!("duplicated in point '{}'", point.label),
                ));
            }
            if !expected.contains(name.as_str()) {
                return Err(MetricError::malformed(
                    kind,
                    Some(name.as_str()),
                    format!("present in point '{}' but not in '{}'", point.label, first.label),
                ));
            }
            if !value.is_finite() {
                return Err(MetricError::malformed(
                    kind,
                    Some(name.as_str()),
                    format!("non-finite value in point '{}'", point.label),
                ));
            }
        }
        if let Some(missing) = names.iter().find(|n| !seen.contains(**n)) {
            return Err(MetricError::malformed(
                kind,
                Some(*missing),
                format!("missing in point '{}'", point.label),
            ));
        }
    }

    let categories = points.iter().map(|p| p.label.clone()).collect();
    let series = names
        .iter()
        .map(|name| SeriesLine {
            name: (*name).to_string(),
            values: points
                .iter()
                .filter_map(|p| p.value(name))
                .collect(),
        })
        .collect();

    Ok(SeriesChart { categories, series })
}

fn bar_chart(bars: &[BarPoint]) -> MetricResult<BarChart> {
    if bars.is_empty() {
        return Err(MetricError::malformed(MetricKind::Bar, None, "no data points"));
    }
    if let Some(bad) = bars.iter().find(|b| !b.value.is_finite()) {
        return Err(MetricError::malformed(
            MetricKind::Bar,
            Some(bad.label.as_str()),
            "non-finite value",
        ));
    }
    Ok(BarChart {
        bars: bars.to_vec(),
    })
}

fn checked_source_ref(kind: MetricKind, asset: &AssetRef) -> MetricResult<String> {
    let source_ref = asset.source_ref.trim();
    if source_ref.is_empty() {
        return Err(MetricError::malformed(kind, Some("sourceRef"), "empty locator"));
    }
    Ok(source_ref.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pts() -> Vec<SeriesPoint> {
        vec![
            SeriesPoint::new("Jan", [("ETH", 20.0), ("BSC", 15.0)]),
            SeriesPoint::new("Feb", [("BSC", 16.0), ("ETH", 22.0)]),
        ]
    }

    #[test]
    fn series_order_follows_first_point() {
        let d = MetricDescriptor::area("TVL", "", pts());
        let RenderPlan::StackedArea(chart) = render(&d).unwrap() else {
            panic!("expected stacked area");
        };
        assert_eq!(chart.categories, vec!["Jan", "Feb"]);
        assert_eq!(chart.series[0].name, "ETH");
        assert_eq!(chart.series[0].values, vec![20.0, 22.0]);
        assert_eq!(chart.series[1].values, vec![15.0, 16.0]);
    }

    #[test]
    fn duplicate_series_key_is_malformed() {
        let d = MetricDescriptor::line(
            "x",
            "",
            vec![SeriesPoint::new("Jan", [("BTC", 1.0), ("BTC", 2.0)])],
        );
        match render(&d) {
            Err(MetricError::Malformed { key, .. }) => assert_eq!(key.as_deref(), Some("BTC")),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn non_finite_bar_is_malformed() {
        let d = MetricDescriptor::bar("x", "", vec![BarPoint::new("ETH", f64::NAN)]);
        assert!(matches!(render(&d), Err(MetricError::Malformed { kind: MetricKind::Bar, .. })));
    }

    #[test]
    fn blank_image_link_is_dropped() {
        let d = MetricDescriptor::image(
            "x",
            "",
            AssetRef {
                source_ref: " /img/a.png ".into(),
                external_link: Some("  ".into()),
            },
        );
        assert_eq!(
            render(&d).unwrap(),
            RenderPlan::StaticImage(ImagePlan {
                source_ref: "/img/a.png".into(),
                link: None
            })
        );
    }
}
