// src/compose.rs
//! Card composer: turns resource records into ordered section views.
//!
//! Sections, in order: partnerships news, raises news, metrics grid,
//! spotlight. A pending record renders a fixed-shape placeholder, a failed
//! one an error body; neither affects sibling sections. Metric cards are
//! dispatched one by one, so a malformed descriptor only replaces its own card.

use serde::Serialize;
use tracing::warn;

use crate::config::{SectionTitles, Spotlight};
use crate::metric::dispatch::record_render_error;
use crate::metric::{render, MetricDescriptor, MetricKind, MetricSet, RenderPlan};
use crate::news::{NewsFeed, NewsItem, NewsItemId};
use crate::resource::{ResourceKey, ResourceRecord, ResourceState};

/// Metrics placed side by side in the first grid row.
pub const PAIRED_METRICS: usize = 2;

const NEWS_SKELETON_HEIGHT_PX: u32 = 60;
const NEWS_SKELETON_BLOCKS: usize = 2;
const METRIC_SKELETON_HEIGHT_PX: u32 = 300;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Span {
    Half,
    Full,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SkeletonBlock {
    pub height_px: u32,
    pub span: Span,
}

/// Loading placeholder. Its shape depends only on the section, never on data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlaceholderShape {
    pub blocks: Vec<SkeletonBlock>,
}

impl PlaceholderShape {
    pub fn news() -> Self {
        Self {
            blocks: vec![
                SkeletonBlock {
                    height_px: NEWS_SKELETON_HEIGHT_PX,
                    span: Span::Full,
                };
                NEWS_SKELETON_BLOCKS
            ],
        }
    }

    pub fn metrics() -> Self {
        let half = SkeletonBlock {
            height_px: METRIC_SKELETON_HEIGHT_PX,
            span: Span::Half,
        };
        Self {
            blocks: vec![
                half,
                half,
                SkeletonBlock {
                    height_px: METRIC_SKELETON_HEIGHT_PX,
                    span: Span::Full,
                },
            ],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", content = "content", rename_all = "snake_case")]
pub enum SectionBody<C> {
    Placeholder(PlaceholderShape),
    Failed { message: String },
    /// Nothing to show; not an error.
    Empty,
    Ready(C),
}

impl<C> SectionBody<C> {
    pub fn is_placeholder(&self) -> bool {
        matches!(self, SectionBody::Placeholder(_))
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, SectionBody::Failed { .. })
    }

    pub fn ready(&self) -> Option<&C> {
        match self {
            SectionBody::Ready(c) => Some(c),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewsCardView {
    pub id: NewsItemId,
    pub title: String,
    pub link: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "visual", rename_all = "snake_case")]
pub enum CardVisual {
    Chart { plan: RenderPlan },
    Error { message: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricCardView {
    pub title: String,
    pub description: String,
    pub kind: MetricKind,
    #[serde(flatten)]
    pub visual: CardVisual,
}

impl MetricCardView {
    pub fn plan(&self) -> Option<&RenderPlan> {
        match &self.visual {
            CardVisual::Chart { plan } => Some(plan),
            CardVisual::Error { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "row", content = "cards", rename_all = "snake_case")]
pub enum MetricRow {
    /// Up to [`PAIRED_METRICS`] cards side by side.
    Paired(Vec<MetricCardView>),
    FullWidth(MetricCardView),
}

impl MetricRow {
    pub fn cards(&self) -> Vec<&MetricCardView> {
        match self {
            MetricRow::Paired(cards) => cards.iter().collect(),
            MetricRow::FullWidth(card) => vec![card],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SpotlightView {
    pub heading: String,
    pub name: String,
    pub image: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NewsGroup {
    Partnerships,
    Raises,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "section", rename_all = "snake_case")]
pub enum Section {
    News {
        group: NewsGroup,
        title: String,
        body: SectionBody<Vec<NewsCardView>>,
    },
    Metrics {
        title: String,
        body: SectionBody<Vec<MetricRow>>,
    },
    Spotlight {
        title: String,
        panel: SpotlightView,
    },
}

/// Compose all sections from the current records.
pub fn compose(
    news: &ResourceRecord<NewsFeed>,
    metrics: &ResourceRecord<MetricSet>,
    spotlight: &Spotlight,
    titles: &SectionTitles,
) -> Vec<Section> {
    vec![
        Section::News {
            group: NewsGroup::Partnerships,
            title: titles.partnerships.clone(),
            body: news_body(news, NewsGroup::Partnerships),
        },
        Section::News {
            group: NewsGroup::Raises,
            title: titles.raises.clone(),
            body: news_body(news, NewsGroup::Raises),
        },
        Section::Metrics {
            title: titles.metrics.clone(),
            body: metrics_body(metrics),
        },
        Section::Spotlight {
            title: titles.spotlight.clone(),
            panel: spotlight_view(spotlight, &titles.spotlight),
        },
    ]
}

pub fn news_body(record: &ResourceRecord<NewsFeed>, group: NewsGroup) -> SectionBody<Vec<NewsCardView>> {
    match record.state() {
        ResourceState::Idle | ResourceState::Loading(_) => SectionBody::Placeholder(PlaceholderShape::news()),
        ResourceState::Error(e) => SectionBody::Failed {
            message: e.message.clone(),
        },
        ResourceState::Success(feed) => {
            let items = match group {
                NewsGroup::Partnerships => &feed.partnerships,
                NewsGroup::Raises => &feed.raises,
            };
            SectionBody::Ready(items.iter().map(|it| news_card(record.key(), it)).collect())
        }
    }
}

pub fn metrics_body(record: &ResourceRecord<MetricSet>) -> SectionBody<Vec<MetricRow>> {
    match record.state() {
        ResourceState::Idle | ResourceState::Loading(_) => {
            SectionBody::Placeholder(PlaceholderShape::metrics())
        }
        ResourceState::Error(e) => SectionBody::Failed {
            message: e.message.clone(),
        },
        ResourceState::Success(set) if set.is_empty() => SectionBody::Empty,
        ResourceState::Success(set) => SectionBody::Ready(metric_rows(set)),
    }
}

/// First [`PAIRED_METRICS`] descriptors share a row, every later one gets its own.
pub fn metric_rows(set: &[MetricDescriptor]) -> Vec<MetricRow> {
    let split = set.len().min(PAIRED_METRICS);
    let (paired, rest) = set.split_at(split);

    let mut rows = Vec::with_capacity(1 + rest.len());
    if !paired.is_empty() {
        rows.push(MetricRow::Paired(paired.iter().map(metric_card).collect()));
    }
    rows.extend(rest.iter().map(|d| MetricRow::FullWidth(metric_card(d))));
    rows
}

pub fn metric_card(descriptor: &MetricDescriptor) -> MetricCardView {
    let visual = match render(descriptor) {
        Ok(plan) => CardVisual::Chart { plan },
        Err(e) => {
            warn!(target: "compose", title = %descriptor.title, kind = %descriptor.kind, error = %e, "metric not renderable");
            record_render_error(&e);
            CardVisual::Error {
                message: e.to_string(),
            }
        }
    };
    MetricCardView {
        title: descriptor.title.clone(),
        description: descriptor.description.clone(),
        kind: descriptor.kind,
        visual,
    }
}

fn news_card(source: &ResourceKey, item: &NewsItem) -> NewsCardView {
    NewsCardView {
        id: NewsItemId {
            source: source.clone(),
            item: item.id.clone(),
        },
        title: item.title.clone(),
        link: item.link.clone(),
        summary: item.summary().map(str::to_string),
    }
}

pub fn spotlight_view(spotlight: &Spotlight, prefix: &str) -> SpotlightView {
    SpotlightView {
        heading: format!("{prefix}: {}", spotlight.name),
        name: spotlight.name.clone(),
        image: spotlight.image.clone(),
        description: spotlight.description.clone(),
        link: spotlight.link.clone(),
    }
}
