//! Feed published to WebSub hubs
//!
//! Hubs are told about a feed, not individual pages, so every ping request
//! gets a feed URL derived from its page list. The same list always yields the
//! same URL, and `GET /feed` renders that list back as an Atom document.

use atom_syndication::{Entry, Feed, Link};
use chrono::Utc;
use url::Url;

use crate::config::FeedConfig;
use crate::error::{Error, Result};

/// Separator between page URLs in the `urls` query parameter
const URL_SEPARATOR: char = ',';

/// Builds feed URLs and renders the Atom feed for a list of pages
#[derive(Clone, Debug)]
pub struct FeedPublisher {
    base_url: String,
    title: String,
}

impl FeedPublisher {
    /// Create a publisher rooted at `base_url`
    pub fn new(base_url: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            title: title.into(),
        }
    }

    /// Create a publisher from the feed configuration
    pub fn from_config(config: &FeedConfig) -> Self {
        Self::new(config.public_base_url.as_str(), config.title.as_str())
    }

    /// Stable feed URL for `urls`: `<base>/feed?urls=<encoded comma list>`
    pub fn feed_url(&self, urls: &[Url]) -> String {
        format!(
            "{}/feed?urls={}",
            self.base_url,
            urlencoding::encode(&join_urls(urls))
        )
    }

    /// Render an Atom 1.0 document with one entry per URL
    pub fn render(&self, urls: &[Url]) -> Result<String> {
        let now = Utc::now().fixed_offset();

        let entries: Vec<Entry> = urls
            .iter()
            .map(|url| {
                let mut link = Link::default();
                link.set_href(url.as_str());
                link.set_rel("alternate");

                let mut entry = Entry::default();
                entry.set_id(url.as_str());
                entry.set_title(url.as_str());
                entry.set_updated(now);
                entry.set_links(vec![link]);
                entry
            })
            .collect();

        let mut self_link = Link::default();
        self_link.set_href(self.feed_url(urls));
        self_link.set_rel("self");

        let mut feed = Feed::default();
        feed.set_id(self.feed_url(urls));
        feed.set_title(self.title.as_str());
        feed.set_updated(now);
        feed.set_links(vec![self_link]);
        feed.set_entries(entries);

        let bytes = feed
            .write_to(Vec::new())
            .map_err(|e| Error::Internal(format!("failed to render feed: {e}")))?;
        String::from_utf8(bytes).map_err(|e| Error::Internal(format!("feed is not UTF-8: {e}")))
    }
}

/// Join page URLs the way they appear in the decoded `urls` parameter
fn join_urls(urls: &[Url]) -> String {
    urls.iter()
        .map(Url::as_str)
        .collect::<Vec<_>>()
        .join(&URL_SEPARATOR.to_string())
}

/// Split a decoded `urls` query value back into raw page URLs
pub fn split_urls(raw: &str) -> Vec<String> {
    raw.split(URL_SEPARATOR)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
