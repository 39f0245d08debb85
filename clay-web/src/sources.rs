//! Remote content shown on the front page: the blog feed and the Twitter
//! timeline. Both sit behind traits so tests can supply canned content.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use clay_common::dates::{now_naive, relative_timesince};
use clay_syncr::genericfeed::parse_feed;
use clay_syncr::http::Fetch;
use clay_syncr::{Result, SyncError};

/// Twitter REST endpoint used when none is configured
pub const TWITTER_API_URL: &str = "https://api.twitter.com/1.1";

/// Tweets shown on the front page
pub const MAX_TWEETS: usize = 12;

/// Timeline page requested from Twitter before filtering
const TIMELINE_COUNT: usize = 100;

const TWITTER_DATE_FORMAT: &str = "%a %b %d %H:%M:%S %z %Y";

/// One blog post as cached for the front page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlogEntry {
    pub title: String,
    pub link: String,
    pub summary: String,
    pub updated: Option<NaiveDateTime>,
}

#[async_trait]
pub trait BlogSource: Send + Sync {
    async fn entries(&self) -> Result<Vec<BlogEntry>>;
}

/// Blog entries from an RSS or Atom feed
pub struct FeedBlog<F: Fetch> {
    fetch: F,
    feed_url: String,
}

impl<F: Fetch> FeedBlog<F> {
    pub fn new(fetch: F, feed_url: &str) -> Self {
        Self {
            fetch,
            feed_url: feed_url.to_string(),
        }
    }
}

#[async_trait]
impl<F: Fetch> BlogSource for FeedBlog<F> {
    async fn entries(&self) -> Result<Vec<BlogEntry>> {
        let body = self.fetch.get_text(&self.feed_url).await?;
        let parsed = parse_feed(&body)?;
        debug!(url = %self.feed_url, entries = parsed.entries.len(), "Parsed blog feed");

        Ok(parsed
            .entries
            .into_iter()
            .map(|entry| BlogEntry {
                title: entry.title.unwrap_or_default(),
                link: entry.link.unwrap_or_default(),
                summary: entry.summary.or(entry.content).unwrap_or_default(),
                updated: entry.updated.or(entry.published),
            })
            .collect())
    }
}

/// A status from the user timeline
#[derive(Debug, Clone, Deserialize)]
pub struct Tweet {
    pub created_at: String,
    pub text: String,
    #[serde(default)]
    pub in_reply_to_status_id: Option<i64>,
    #[serde(default)]
    pub retweeted_status: Option<serde_json::Value>,
}

impl Tweet {
    pub fn created_at(&self) -> Result<NaiveDateTime> {
        DateTime::parse_from_str(&self.created_at, TWITTER_DATE_FORMAT)
            .map(|dt| dt.naive_utc())
            .map_err(|e| SyncError::Parse(format!("Bad tweet date {:?}: {}", self.created_at, e)))
    }

    fn is_reply_or_retweet(&self) -> bool {
        self.in_reply_to_status_id.is_some() || self.retweeted_status.is_some()
    }
}

/// A tweet as cached for the front page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShownTweet {
    pub relative_created_at: String,
    pub text: String,
}

#[async_trait]
pub trait TweetSource: Send + Sync {
    /// Most recent statuses, newest first
    async fn user_timeline(&self) -> Result<Vec<Tweet>>;
}

/// `statuses/user_timeline` over an authorized fetcher
pub struct TwitterTimeline<F: Fetch> {
    fetch: F,
    username: String,
    endpoint: String,
}

impl<F: Fetch> TwitterTimeline<F> {
    pub fn new(fetch: F, username: &str) -> Self {
        Self {
            fetch,
            username: username.to_string(),
            endpoint: TWITTER_API_URL.to_string(),
        }
    }

    pub fn with_endpoint(mut self, endpoint: &str) -> Self {
        self.endpoint = endpoint.trim_end_matches('/').to_string();
        self
    }
}

#[async_trait]
impl<F: Fetch> TweetSource for TwitterTimeline<F> {
    async fn user_timeline(&self) -> Result<Vec<Tweet>> {
        let url = format!(
            "{}/statuses/user_timeline.json?screen_name={}&exclude_replies=true&count={}&trim_user=true&include_rts=false",
            self.endpoint, self.username, TIMELINE_COUNT
        );
        let body = self.fetch.get_text(&url).await?;
        Ok(serde_json::from_str(&body)?)
    }
}

/// Up to `MAX_TWEETS` own statuses with their age relative to `now`
pub fn shown_tweets(tweets: &[Tweet], now: NaiveDateTime) -> Result<Vec<ShownTweet>> {
    tweets
        .iter()
        .filter(|t| !t.is_reply_or_retweet())
        .take(MAX_TWEETS)
        .map(|t| {
            Ok(ShownTweet {
                relative_created_at: format!("{} ago", relative_timesince(t.created_at()?, now)),
                text: t.text.clone(),
            })
        })
        .collect()
}

/// Fetch and shape the timeline, `[]` on any failure
pub async fn fetch_shown_tweets(source: &dyn TweetSource) -> Vec<ShownTweet> {
    match source.user_timeline().await {
        Ok(tweets) => shown_tweets(&tweets, now_naive()).unwrap_or_else(|e| {
            warn!(error = %e, "Unreadable timeline");
            Vec::new()
        }),
        Err(e) => {
            warn!(error = %e, "Twitter fetch failed");
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn tweet(created_at: &str, text: &str) -> Tweet {
        Tweet {
            created_at: created_at.to_string(),
            text: text.to_string(),
            in_reply_to_status_id: None,
            retweeted_status: None,
        }
    }

    #[test]
    fn test_tweet_date_to_utc() {
        let t = tweet("Wed Aug 27 13:08:45 +0200 2008", "hi");
        assert_eq!(t.created_at().unwrap().to_string(), "2008-08-27 11:08:45");
    }

    #[test]
    fn test_shown_tweets_limits_and_filters() {
        let now = NaiveDate::from_ymd_opt(2008, 8, 27).unwrap().and_hms_opt(16, 8, 45).unwrap();
        let mut tweets: Vec<Tweet> = (0..20)
            .map(|i| tweet("Wed Aug 27 13:08:45 +0000 2008", &format!("tweet {}", i)))
            .collect();
        tweets[0].in_reply_to_status_id = Some(1);
        tweets[1].retweeted_status = Some(serde_json::json!({}));

        let shown = shown_tweets(&tweets, now).unwrap();
        assert_eq!(shown.len(), MAX_TWEETS);
        assert_eq!(shown[0].text, "tweet 2");
        assert_eq!(shown[0].relative_created_at, "3 hours ago");
    }

    #[test]
    fn test_shown_tweets_rejects_bad_date() {
        let now = NaiveDate::from_ymd_opt(2008, 8, 27).unwrap().and_hms_opt(0, 0, 0).unwrap();
        assert!(shown_tweets(&[tweet("yesterday", "x")], now).is_err());
    }
}
