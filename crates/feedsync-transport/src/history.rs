//! History fetcher
//!
//! Pulls one page of older entries per call. Callers guarantee a single
//! outstanding request per feed (see `FeedModel::begin_fetch`); nothing
//! here retries.

use crate::config::HistoryConfig;
use crate::error::{FetchError, FetchResult};
use async_trait::async_trait;
use feedsync_core::{Page, PageCursor};
use tracing::debug;
use url::Url;

/// Source of history pages
#[async_trait]
pub trait HistorySource: Send + Sync {
    /// Fetch the page identified by `cursor`
    async fn fetch_page(&self, cursor: PageCursor) -> FetchResult<Page>;
}

/// `GET <url>?page=<cursor>` over HTTP
#[derive(Debug, Clone)]
pub struct HttpHistoryFetcher {
    client: reqwest::Client,
    url: Url,
}

impl HttpHistoryFetcher {
    /// Fetcher for the given history URL
    pub fn new(url: Url, config: &HistoryConfig) -> FetchResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self { client, url })
    }

    /// History URL without the page parameter
    pub fn url(&self) -> &Url {
        &self.url
    }

    fn page_url(&self, cursor: PageCursor) -> Url {
        let mut url = self.url.clone();
        url.query_pairs_mut()
            .append_pair("page", &cursor.page().to_string());
        url
    }
}

#[async_trait]
impl HistorySource for HttpHistoryFetcher {
    async fn fetch_page(&self, cursor: PageCursor) -> FetchResult<Page> {
        let url = self.page_url(cursor);
        debug!(url = %url, page = cursor.page(), "Fetching history page");

        let response = self
            .client
            .get(url.clone())
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let body = response.text().await?;
        let page = Page::from_json(&body)?;
        debug!(page = cursor.page(), entries = page.len(), has_more = page.has_more, "History page received");
        Ok(page)
    }
}
