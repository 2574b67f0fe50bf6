//! Card composer layout and failure isolation.
//!
//! Records are built by hand with `ResourceRecord::from_parts`, so the
//! composer is exercised without any cache or runtime.

use std::sync::Arc;

use crypto_insights_dashboard::compose::{
    metric_rows, CardVisual, MetricRow, NewsGroup, PlaceholderShape, Span,
};
use crypto_insights_dashboard::config::{SectionTitles, Spotlight};
use crypto_insights_dashboard::metric::{BarPoint, MetricSet, SeriesPoint};
use crypto_insights_dashboard::news::{NewsFeed, NewsItem};
use crypto_insights_dashboard::{
    compose, FetchFailure, MetricDescriptor, ResourceKey, ResourceRecord, ResourceState, Section,
    SectionBody,
};

fn bar(title: &str) -> MetricDescriptor {
    MetricDescriptor::bar(title, "", vec![BarPoint::new("ETH", 1.0)])
}

fn ok<T>(key: &str, v: T) -> ResourceRecord<T> {
    ResourceRecord::from_parts(key.into(), 1, ResourceState::Success(Arc::new(v)))
}

fn failed<T>(key: &str, msg: &str) -> ResourceRecord<T> {
    let key = ResourceKey::new(key);
    ResourceRecord::from_parts(key.clone(), 1, ResourceState::Error(FetchFailure::new(&key, msg)))
}

fn idle<T>(key: &str) -> ResourceRecord<T> {
    ResourceRecord::from_parts(key.into(), 0, ResourceState::Idle)
}

fn feed() -> NewsFeed {
    NewsFeed {
        partnerships: vec![
            NewsItem::new("1", "Binance Partners with Mastercard", "https://a.example"),
            NewsItem::new("2", "Coinbase and BlackRock", "https://b.example"),
        ],
        raises: vec![NewsItem::new("1", "Optimism Raises $150M", "https://c.example")],
    }
}

fn sections(news: &ResourceRecord<NewsFeed>, metrics: &ResourceRecord<MetricSet>) -> Vec<Section> {
    compose(news, metrics, &Spotlight::default(), &SectionTitles::default())
}

fn metrics_body(sections: &[Section]) -> &SectionBody<Vec<MetricRow>> {
    sections
        .iter()
        .find_map(|s| match s {
            Section::Metrics { body, .. } => Some(body),
            _ => None,
        })
        .expect("metrics section present")
}

fn titles(row: &MetricRow) -> Vec<&str> {
    row.cards().into_iter().map(|c| c.title.as_str()).collect()
}

#[test]
fn four_metrics_pair_the_first_two() {
    let rows = metric_rows(&[bar("A"), bar("B"), bar("C"), bar("D")]);
    assert_eq!(rows.len(), 3);
    assert!(matches!(rows[0], MetricRow::Paired(_)));
    assert_eq!(titles(&rows[0]), ["A", "B"]);
    assert!(matches!(rows[1], MetricRow::FullWidth(_)));
    assert_eq!(titles(&rows[1]), ["C"]);
    assert_eq!(titles(&rows[2]), ["D"]);
}

#[test]
fn single_metric_is_a_lone_paired_row() {
    let rows = metric_rows(&[bar("A")]);
    assert_eq!(rows.len(), 1);
    assert_eq!(titles(&rows[0]), ["A"]);
}

#[test]
fn empty_metric_set_is_empty_not_error() {
    let s = sections(&ok("industry-news", feed()), &ok("market-metrics", Vec::new()));
    assert_eq!(*metrics_body(&s), SectionBody::Empty);
}

#[test]
fn pending_records_show_fixed_placeholders() {
    let s = sections(&idle("industry-news"), &idle("market-metrics"));
    assert_eq!(s.len(), 4);

    for section in &s[..2] {
        let Section::News { body, .. } = section else {
            panic!("first two sections are news");
        };
        assert!(body.is_placeholder());
        assert_eq!(*body, SectionBody::Placeholder(PlaceholderShape::news()));
    }

    let SectionBody::Placeholder(shape) = metrics_body(&s) else {
        panic!("metrics should be a placeholder");
    };
    let spans: Vec<_> = shape.blocks.iter().map(|b| b.span).collect();
    assert_eq!(spans, [Span::Half, Span::Half, Span::Full]);
    assert!(shape.blocks.iter().all(|b| b.height_px == 300));
}

#[test]
fn news_failure_leaves_metrics_and_spotlight_intact() {
    let metrics = ok("market-metrics", vec![bar("A")]);
    let s = sections(&failed("industry-news", "timeout"), &metrics);

    let Section::News { body, .. } = &s[0] else {
        panic!("news first")
    };
    assert_eq!(
        *body,
        SectionBody::Failed {
            message: "timeout".into()
        }
    );
    assert!(metrics_body(&s).ready().is_some());
    assert!(matches!(s[3], Section::Spotlight { .. }));
}

#[test]
fn metrics_failure_leaves_news_intact() {
    let s = sections(&ok("industry-news", feed()), &failed("market-metrics", "HTTP 500"));
    assert!(metrics_body(&s).is_failed());
    let Section::News { group, body, .. } = &s[1] else {
        panic!("raises second")
    };
    assert_eq!(*group, NewsGroup::Raises);
    assert_eq!(body.ready().map(Vec::len), Some(1));
}

#[test]
fn malformed_card_is_isolated() {
    let broken = MetricDescriptor::line(
        "Broken",
        "",
        vec![
            SeriesPoint::new("Jan", [("BTC", 1.0)]),
            SeriesPoint::new("Feb", [("ETH", 2.0)]),
        ],
    );
    let s = sections(
        &ok("industry-news", feed()),
        &ok("market-metrics", vec![bar("A"), broken, bar("C")]),
    );
    let rows = metrics_body(&s).ready().expect("metrics ready");
    let cards: Vec<_> = rows.iter().flat_map(MetricRow::cards).collect();
    assert_eq!(cards.len(), 3);
    assert!(cards[0].plan().is_some());
    assert!(matches!(cards[1].visual, CardVisual::Error { .. }));
    assert!(cards[2].plan().is_some());
}

#[test]
fn spotlight_is_always_present() {
    for s in [
        sections(&idle("n"), &idle("m")),
        sections(&failed("n", "x"), &failed("m", "y")),
    ] {
        let Section::Spotlight { panel, .. } = &s[3] else {
            panic!("spotlight last");
        };
        assert_eq!(panel.heading, "Project Spotlight: Uniswap V3");
    }
}

#[test]
fn news_order_and_identity_follow_the_feed() {
    let s = sections(&ok("industry-news", feed()), &idle("market-metrics"));
    let Section::News { title, body, .. } = &s[0] else {
        panic!("partnerships first");
    };
    assert_eq!(title, "Brand Partnerships");
    let cards = body.ready().expect("ready");
    let got: Vec<_> = cards.iter().map(|c| c.title.as_str()).collect();
    assert_eq!(got, ["Binance Partners with Mastercard", "Coinbase and BlackRock"]);
    assert_eq!(cards[0].id.source, ResourceKey::new("industry-news"));
    assert_eq!(cards[0].id.item, "1");
}
