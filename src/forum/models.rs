use serde::Deserialize;
use serde_json::Value;

use super::FetchError;

/// Category listing returned by `/c/<slug>/<id>.json`.
#[derive(Debug, Default, Deserialize)]
pub struct CategoryResponse {
    #[serde(default)]
    pub topic_list: TopicList,
}

#[derive(Debug, Default, Deserialize)]
pub struct TopicList {
    /// Raw topic objects; validated into [`Topic`] one by one.
    #[serde(default)]
    pub topics: Vec<Value>,
}

/// One discussion thread in the watched category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topic {
    pub id: u64,
    pub title: String,
    pub slug: String,
}

impl Topic {
    /// Build a topic from a raw listing entry.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::MalformedTopic`] naming the first required field
    /// that is missing or has the wrong type.
    pub fn from_value(index: usize, value: &Value) -> Result<Self, FetchError> {
        let malformed = |field: &'static str| FetchError::MalformedTopic { index, field };

        let id = value
            .get("id")
            .and_then(Value::as_u64)
            .ok_or_else(|| malformed("id"))?;
        let title = value
            .get("title")
            .and_then(Value::as_str)
            .ok_or_else(|| malformed("title"))?;
        let slug = value
            .get("slug")
            .and_then(Value::as_str)
            .ok_or_else(|| malformed("slug"))?;

        Ok(Self {
            id,
            title: title.to_string(),
            slug: slug.to_string(),
        })
    }

    /// Public URL of this topic under the forum's base URL.
    #[must_use]
    pub fn url(&self, base_url: &str) -> String {
        format!(
            "{}/t/{}/{}",
            base_url.trim_end_matches('/'),
            self.slug,
            self.id
        )
    }
}
