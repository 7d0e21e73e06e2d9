//! Discourse category feed.
//!
//! Fetches the first page of a category listing and turns it into validated
//! [`Topic`] records, newest first.

pub mod models;

use reqwest::StatusCode;
use thiserror::Error;
use tracing::debug;

pub use models::{CategoryResponse, Topic};

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to {url} failed")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{url} returned status {status}")]
    Status { url: String, status: StatusCode },
    #[error("failed to decode category listing from {url}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("topic #{index} in listing has missing or invalid '{field}'")]
    MalformedTopic { index: usize, field: &'static str },
}

/// Reads the topic listing of one forum category.
#[derive(Clone)]
pub struct TopicFetcher {
    client: reqwest::Client,
    category_url: String,
}

impl TopicFetcher {
    #[must_use]
    pub fn new(client: reqwest::Client, category_url: impl Into<String>) -> Self {
        Self {
            client,
            category_url: category_url.into(),
        }
    }

    #[must_use]
    pub fn category_url(&self) -> &str {
        &self.category_url
    }

    /// Fetch every topic currently listed, ordered by descending ID.
    ///
    /// An empty listing is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails, the server answers with a
    /// non-success status, or any listed topic lacks `id`, `title` or `slug`.
    pub async fn fetch_topics(&self) -> Result<Vec<Topic>, FetchError> {
        let url = self.category_url.as_str();

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|source| FetchError::Request {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status,
            });
        }

        let body = response.bytes().await.map_err(|source| FetchError::Request {
            url: url.to_string(),
            source,
        })?;
        let listing: CategoryResponse =
            serde_json::from_slice(&body).map_err(|source| FetchError::Decode {
                url: url.to_string(),
                source,
            })?;

        let topics = parse_topics(&listing)?;
        debug!(url = %url, count = topics.len(), "Fetched category listing");

        Ok(topics)
    }
}

/// Validate every raw topic and sort newest first.
///
/// # Errors
///
/// Fails on the first malformed entry.
pub fn parse_topics(listing: &CategoryResponse) -> Result<Vec<Topic>, FetchError> {
    let mut topics = listing
        .topic_list
        .topics
        .iter()
        .enumerate()
        .map(|(index, value)| Topic::from_value(index, value))
        .collect::<Result<Vec<_>, _>>()?;

    topics.sort_by(|a, b| b.id.cmp(&a.id));
    Ok(topics)
}
