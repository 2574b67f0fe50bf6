// src/news.rs
//! Industry news payload: two ordered groups of items as delivered by the feed.

use once_cell::sync::OnceCell;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};

use crate::resource::ResourceKey;

const MAX_TEXT_CHARS: usize = 500;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewsItem {
    /// Opaque id, unique within the feed that produced it.
    #[serde(deserialize_with = "id_from_string_or_number")]
    pub id: String,
    pub title: String,
    pub link: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub short_description: Option<String>,
}

impl NewsItem {
    pub fn new(id: impl Into<String>, title: impl Into<String>, link: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            link: link.into(),
            description: None,
            short_description: None,
        }
    }

    /// Prefer the short blurb, fall back to the long one.
    pub fn summary(&self) -> Option<&str> {
        self.short_description
            .as_deref()
            .or(self.description.as_deref())
            .filter(|s| !s.is_empty())
    }

    fn normalized(mut self) -> Self {
        self.title = normalize_text(&self.title);
        self.link = self.link.trim().to_string();
        self.description = self.description.map(|d| normalize_text(&d)).filter(|d| !d.is_empty());
        self.short_description = self
            .short_description
            .map(|d| normalize_text(&d))
            .filter(|d| !d.is_empty());
        self
    }
}

/// Identity of a news item across feeds.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct NewsItemId {
    pub source: ResourceKey,
    pub item: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewsFeed {
    #[serde(default)]
    pub partnerships: Vec<NewsItem>,
    #[serde(default, rename = "vcRaises", alias = "raises")]
    pub raises: Vec<NewsItem>,
}

impl NewsFeed {
    /// Parse the feed JSON and normalize every text field. Order is kept as delivered.
    pub fn from_json(json: &str) -> anyhow::Result<Self> {
        let feed: NewsFeed = serde_json::from_str(json)?;
        Ok(feed.normalized())
    }

    pub fn normalized(self) -> Self {
        Self {
            partnerships: self.partnerships.into_iter().map(NewsItem::normalized).collect(),
            raises: self.raises.into_iter().map(NewsItem::normalized).collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.partnerships.is_empty() && self.raises.is_empty()
    }
}

fn id_from_string_or_number<'de, D>(d: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Str(String),
        Num(serde_json::Number),
    }
    Ok(match RawId::deserialize(d)? {
        RawId::Str(s) => s,
        RawId::Num(n) => n.to_string(),
    })
}

/// Normalize feed text: decode entities, strip tags, ASCII quotes, collapse whitespace.
pub fn normalize_text(s: &str) -> String {
    let mut out = html_escape::decode_html_entities(s).to_string();

    static RE_TAGS: OnceCell<Regex> = OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| Regex::new(r"(?is)</?[^>]+>").expect("static tag regex"));
    out = re_tags.replace_all(&out, "").to_string();

    // “ ” ‘ ’ « » → ASCII quotes
    out = out
        .replace(['\u{201C}', '\u{201D}', '\u{00AB}', '\u{00BB}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'");

    static RE_WS: OnceCell<Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| Regex::new(r"\s+").expect("static whitespace regex"));
    out = re_ws.replace_all(&out, " ").trim().to_string();

    if out.chars().count() > MAX_TEXT_CHARS {
        out = out.chars().take(MAX_TEXT_CHARS).collect();
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_text_decodes_and_collapses() {
        let s = "  <b>Binance</b>&nbsp;&nbsp;partners with “Mastercard”  ";
        assert_eq!(normalize_text(s), r#"Binance partners with "Mastercard""#);
    }

    #[test]
    fn feed_accepts_numeric_and_string_ids() {
        let json = r#"{
            "partnerships": [{ "id": 1, "title": "A", "link": "https://a.test" }],
            "vcRaises": [{ "id": "r-7", "title": "B", "link": " https://b.test ", "shortDescription": "" }]
        }"#;
        let feed = NewsFeed::from_json(json).unwrap();
        assert_eq!(feed.partnerships[0].id, "1");
        assert_eq!(feed.raises[0].id, "r-7");
        assert_eq!(feed.raises[0].link, "https://b.test");
        assert_eq!(feed.raises[0].short_description, None);
    }

    #[test]
    fn summary_prefers_short_description() {
        let mut item = NewsItem::new("1", "t", "l");
        item.description = Some("long".into());
        assert_eq!(item.summary(), Some("long"));
        item.short_description = Some("short".into());
        assert_eq!(item.summary(), Some("short"));
    }
}
