//! One-shot backfill of a single user's recent posts.

use std::time::Duration;

use common::Status;
use reqwest::Client;
use reqwest::header::AUTHORIZATION;
use sea_orm::DatabaseConnection;
use tracing::{info, warn};

use crate::consumer::{EventOutcome, handle_status};
use crate::error::Result;
use crate::media::MediaFetcher;
use crate::stream::{OAuthCredentials, StreamError, oauth};

pub const DEFAULT_TIMELINE_URL: &str = "https://api.twitter.com/1.1/statuses/user_timeline.json";

/// Posts requested per page; the upstream maximum.
const PAGE_SIZE: u32 = 200;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BackfillSummary {
    pub pages: usize,
    pub fetched: usize,
    pub stored: usize,
}

pub struct TimelineClient {
    client: Client,
    url: String,
    credentials: OAuthCredentials,
}

impl TimelineClient {
    pub fn new(url: impl Into<String>, credentials: OAuthCredentials) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(StreamError::from)?;
        Ok(Self {
            client,
            url: url.into(),
            credentials,
        })
    }

    /// One page of posts older than `max_id` (inclusive), newest first.
    pub async fn page(
        &self,
        user_id: u64,
        max_id: Option<u64>,
    ) -> std::result::Result<Vec<Status>, StreamError> {
        let mut query = vec![
            ("user_id", user_id.to_string()),
            ("count", PAGE_SIZE.to_string()),
            ("tweet_mode", "extended".to_string()),
        ];
        if let Some(max_id) = max_id {
            query.push(("max_id", max_id.to_string()));
        }

        let mut url = reqwest::Url::parse(&self.url)
            .map_err(|e| StreamError::Signing(format!("bad url: {e}")))?;
        url.query_pairs_mut()
            .extend_pairs(query.iter().map(|(k, v)| (*k, v.as_str())));

        let header = oauth::authorization_header(&self.credentials, "GET", url.as_str(), &[])?;
        let response = self
            .client
            .get(url)
            .header(AUTHORIZATION, header)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(StreamError::from_status(status.as_u16()));
        }
        Ok(response.json().await?)
    }
}

/// Page backwards through `user_id`'s timeline until an empty page, storing
/// every post through the regular persistence path.
pub async fn backfill(
    timeline: &TimelineClient,
    db: &DatabaseConnection,
    media: Option<&MediaFetcher>,
    user_id: u64,
) -> Result<BackfillSummary> {
    let mut summary = BackfillSummary::default();
    let mut max_id = None;

    loop {
        let page = timeline.page(user_id, max_id).await?;
        let Some(oldest) = page.iter().map(|s| s.id).min() else {
            break;
        };
        summary.pages += 1;
        summary.fetched += page.len();

        for status in &page {
            match handle_status(db, None, media, status).await {
                Ok(EventOutcome::Stored(_)) => summary.stored += 1,
                Ok(EventOutcome::Filtered) => {}
                Err(e) if e.is_connection_lost() => return Err(e.into()),
                Err(e) => warn!(tweet_id = status.id, error = %e, "Failed to store post"),
            }
        }

        info!(user_id, page = summary.pages, posts = page.len(), "Stored timeline page");
        match oldest.checked_sub(1) {
            Some(next) => max_id = Some(next),
            None => break,
        }
    }

    info!(
        user_id,
        fetched = summary.fetched,
        stored = summary.stored,
        "Timeline backfill complete"
    );
    Ok(summary)
}
