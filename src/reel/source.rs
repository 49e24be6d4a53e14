//! Text items to narrate, fetched from Reddit's public listing endpoint.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::USER_AGENT;
use serde::Deserialize;

use crate::ui::prelude::{Level, emit};

const USER_AGENT_VALUE: &str = concat!("storyreel/", env!("CARGO_PKG_VERSION"));

/// One post to turn into a segment.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceItem {
    pub id: String,
    /// Subreddit the post came from
    pub source_label: String,
    pub title: String,
    pub body: Option<String>,
    pub score: i64,
    pub stickied: bool,
}

impl SourceItem {
    /// Title, then a blank line and the body when there is one.
    pub fn narration_text(&self) -> String {
        match self.body.as_deref().map(str::trim) {
            Some(body) if !body.is_empty() => format!("{}\n\n{}", self.title, body),
            _ => self.title.clone(),
        }
    }
}

#[async_trait]
pub trait ContentSource: Send + Sync {
    /// Items from `channels`, in order, at most `max_items` in total.
    async fn fetch(
        &self,
        channels: &[String],
        max_items: usize,
        min_score: i64,
    ) -> Result<Vec<SourceItem>>;
}

#[derive(Debug, Deserialize)]
struct Listing {
    data: ListingData,
}

#[derive(Debug, Deserialize)]
struct ListingData {
    children: Vec<Child>,
}

#[derive(Debug, Deserialize)]
struct Child {
    data: Post,
}

#[derive(Debug, Deserialize)]
struct Post {
    id: String,
    title: String,
    #[serde(default)]
    selftext: String,
    #[serde(default)]
    score: i64,
    #[serde(default)]
    stickied: bool,
}

impl Post {
    fn into_item(self, label: &str) -> SourceItem {
        let body = if self.selftext.trim().is_empty() {
            None
        } else {
            Some(self.selftext)
        };
        SourceItem {
            id: self.id,
            source_label: label.to_string(),
            title: self.title,
            body,
            score: self.score,
            stickied: self.stickied,
        }
    }
}

/// Keep qualifying posts of one listing, up to `remaining`.
fn select_posts(label: &str, listing: Listing, min_score: i64, remaining: usize) -> Vec<SourceItem> {
    listing
        .data
        .children
        .into_iter()
        .map(|child| child.data.into_item(label))
        .filter(|item| item.score >= min_score && !item.stickied)
        .take(remaining)
        .collect()
}

/// Top posts of the past week.
pub struct RedditSource {
    client: reqwest::Client,
    base_url: String,
}

impl RedditSource {
    pub fn new() -> Self {
        Self::with_base_url("https://www.reddit.com")
    }

    /// Point at another Reddit-compatible host, e.g. a mirror or a local server.
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn listing_url(&self, subreddit: &str, limit: usize) -> String {
        format!(
            "{}/r/{}/top.json?t=week&limit={}",
            self.base_url, subreddit, limit
        )
    }

    async fn fetch_listing(&self, subreddit: &str, limit: usize) -> Result<Listing> {
        let response = self
            .client
            .get(self.listing_url(subreddit, limit))
            .header(USER_AGENT, USER_AGENT_VALUE)
            .send()
            .await
            .with_context(|| format!("Failed to request r/{subreddit}"))?;

        if !response.status().is_success() {
            anyhow::bail!("Reddit returned {} for r/{}", response.status(), subreddit);
        }

        response
            .json::<Listing>()
            .await
            .with_context(|| format!("Failed to parse listing for r/{subreddit}"))
    }
}

impl Default for RedditSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ContentSource for RedditSource {
    async fn fetch(
        &self,
        channels: &[String],
        max_items: usize,
        min_score: i64,
    ) -> Result<Vec<SourceItem>> {
        let mut items = Vec::new();
        let limit = (max_items * 3).clamp(1, 100);

        for subreddit in channels {
            if items.len() >= max_items {
                break;
            }
            let listing = self.fetch_listing(subreddit, limit).await?;
            let picked = select_posts(subreddit, listing, min_score, max_items - items.len());
            emit(
                Level::Debug,
                "reel.source.listing",
                &format!("r/{}: {} qualifying posts", subreddit, picked.len()),
                None,
            );
            items.extend(picked);
        }

        Ok(items)
    }
}
