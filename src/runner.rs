//! One invocation of the alert job.
//!
//! Fetch the category listing, compare it with the watermark, announce what is
//! new in ascending ID order and advance the watermark once at the end.

use std::time::Duration;

use tracing::{info, instrument};

use crate::config::Config;
use crate::constants::USER_AGENT;
use crate::error::Result;
use crate::forum::{Topic, TopicFetcher};
use crate::notify::{format_alert, AlertKind, Notifier, TelegramNotifier};
use crate::state::WatermarkStore;

/// Which path a run takes, chosen once per invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// Announce topics above the watermark and advance it.
    Normal,
    /// Announce only the newest topic as a preview; state is left alone.
    ForceLatest,
}

/// What a completed run did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// The category listing was empty.
    NoTopics,
    /// First run: the watermark was set without sending anything.
    Initialized { last_topic_id: u64 },
    /// Nothing newer than the watermark.
    UpToDate { last_topic_id: u64 },
    /// New topics were announced and the watermark advanced.
    Notified { sent: usize, last_topic_id: u64 },
    /// A preview of the newest topic was sent.
    Previewed { topic_id: u64 },
}

/// Topics strictly newer than `last_seen`, oldest first.
#[must_use]
pub fn topics_after(topics: &[Topic], last_seen: u64) -> Vec<&Topic> {
    let mut fresh: Vec<&Topic> = topics.iter().filter(|t| t.id > last_seen).collect();
    fresh.sort_by_key(|t| t.id);
    fresh
}

pub struct Runner<N> {
    fetcher: TopicFetcher,
    store: WatermarkStore,
    notifier: N,
    forum_name: String,
    base_url: String,
    mode: RunMode,
}

impl Runner<TelegramNotifier> {
    /// Wire up the fetcher, store and Telegram notifier from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let http = build_http_client(config.http_timeout)?;
        let notifier = TelegramNotifier::new(http.clone(), config);
        Ok(Self::new(config, http, notifier))
    }
}

impl<N: Notifier> Runner<N> {
    #[must_use]
    pub fn new(config: &Config, http: reqwest::Client, notifier: N) -> Self {
        let mode = if config.force_latest {
            RunMode::ForceLatest
        } else {
            RunMode::Normal
        };

        Self {
            fetcher: TopicFetcher::new(http, config.category_url.clone()),
            store: WatermarkStore::new(config.state_path.clone()),
            notifier,
            forum_name: config.forum_name.clone(),
            base_url: config.base_url.clone(),
            mode,
        }
    }

    /// Execute the run in the configured mode.
    ///
    /// # Errors
    ///
    /// Returns the first fetch, state, configuration or dispatch error. The
    /// watermark is left as of the last completed save.
    #[instrument(skip(self), fields(mode = ?self.mode))]
    pub async fn run(&self) -> Result<RunOutcome> {
        let topics = self.fetcher.fetch_topics().await?;
        info!(
            url = %self.fetcher.category_url(),
            count = topics.len(),
            "Fetched topics"
        );

        match self.mode {
            RunMode::ForceLatest => self.run_force_latest(&topics).await,
            RunMode::Normal => self.run_normal(&topics).await,
        }
    }

    async fn run_force_latest(&self, topics: &[Topic]) -> Result<RunOutcome> {
        let Some(latest) = topics.iter().max_by_key(|t| t.id) else {
            info!("No topics found (force latest)");
            return Ok(RunOutcome::NoTopics);
        };

        info!(topic_id = latest.id, "Sending test alert for latest topic");
        self.dispatch(AlertKind::Preview, latest).await?;

        Ok(RunOutcome::Previewed {
            topic_id: latest.id,
        })
    }

    async fn run_normal(&self, topics: &[Topic]) -> Result<RunOutcome> {
        let Some(max_id) = topics.iter().map(|t| t.id).max() else {
            info!("No topics found");
            return Ok(RunOutcome::NoTopics);
        };

        if !self.store.exists().await? {
            self.store.save(max_id).await?;
            info!(
                last_topic_id = max_id,
                "Initialized watermark, no alerts sent on first run"
            );
            return Ok(RunOutcome::Initialized {
                last_topic_id: max_id,
            });
        }

        let last_seen = self.store.load().await?;
        let fresh = topics_after(topics, last_seen);
        if fresh.is_empty() {
            info!(last_topic_id = last_seen, "No new topics");
            return Ok(RunOutcome::UpToDate {
                last_topic_id: last_seen,
            });
        }

        // The watermark is only persisted after the whole batch. A dispatch
        // failure mid-batch re-sends the earlier topics on the next run.
        let mut tracking = last_seen;
        for topic in &fresh {
            info!(topic_id = topic.id, title = %topic.title, "Sending alert for new topic");
            self.dispatch(AlertKind::NewTopic, topic).await?;
            tracking = topic.id;
        }

        self.store.save(tracking).await?;
        info!(
            sent = fresh.len(),
            last_topic_id = tracking,
            "Updated watermark"
        );

        Ok(RunOutcome::Notified {
            sent: fresh.len(),
            last_topic_id: tracking,
        })
    }

    async fn dispatch(&self, kind: AlertKind, topic: &Topic) -> Result<()> {
        let text = format_alert(kind, &self.forum_name, &self.base_url, topic);
        self.notifier.send(&text).await
    }
}

/// Shared HTTP client for the feed and the notification channel.
///
/// # Errors
///
/// Returns an error if the TLS backend cannot be initialized.
pub fn build_http_client(timeout: Duration) -> anyhow::Result<reqwest::Client> {
    let client = reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(USER_AGENT)
        .build()?;
    Ok(client)
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::notify::DispatchError;

    fn topic(id: u64) -> Topic {
        Topic {
            id,
            title: format!("Topic {id}"),
            slug: format!("topic-{id}"),
        }
    }

    fn ids(topics: &[&Topic]) -> Vec<u64> {
        topics.iter().map(|t| t.id).collect()
    }

    #[test]
    fn test_topics_after_orders_ascending() {
        let topics = vec![topic(9), topic(7), topic(8), topic(12), topic(3)];
        assert_eq!(ids(&topics_after(&topics, 7)), vec![8, 9, 12]);
    }

    #[test]
    fn test_topics_after_excludes_watermark() {
        let topics = vec![topic(10), topic(9)];
        assert!(topics_after(&topics, 10).is_empty());
        assert!(topics_after(&topics, 11).is_empty());
        assert_eq!(ids(&topics_after(&topics, 0)), vec![9, 10]);
    }

    #[test]
    fn test_topics_after_empty() {
        assert!(topics_after(&[], 0).is_empty());
    }

    /// Records every message; fails on the `fail_on`-th send (1-based).
    #[derive(Default)]
    struct RecordingNotifier {
        sent: Mutex<Vec<String>>,
        fail_on: Option<usize>,
    }

    #[async_trait]
    impl Notifier for RecordingNotifier {
        async fn send(&self, text: &str) -> Result<()> {
            let mut sent = self.sent.lock().unwrap();
            if self.fail_on == Some(sent.len() + 1) {
                return Err(DispatchError::Rejected {
                    status: reqwest::StatusCode::BAD_GATEWAY,
                    description: "channel unavailable".to_string(),
                }
                .into());
            }
            sent.push(text.to_string());
            Ok(())
        }
    }

    fn normal_runner(
        store_path: &std::path::Path,
        notifier: RecordingNotifier,
    ) -> Runner<RecordingNotifier> {
        let config = Config {
            state_path: store_path.to_path_buf(),
            ..Config::for_testing()
        };
        let http = build_http_client(config.http_timeout).unwrap();
        Runner::new(&config, http, notifier)
    }

    #[tokio::test]
    async fn test_run_normal_sends_in_ascending_order() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("state.json");
        let runner = normal_runner(&path, RecordingNotifier::default());
        runner.store.save(7).await.unwrap();

        let outcome = runner
            .run_normal(&[topic(9), topic(8), topic(7)])
            .await
            .unwrap();

        assert_eq!(
            outcome,
            RunOutcome::Notified {
                sent: 2,
                last_topic_id: 9
            }
        );
        let sent = runner.notifier.sent.lock().unwrap().clone();
        assert_eq!(sent.len(), 2);
        assert!(sent[0].contains("/t/topic-8/8"));
        assert!(sent[1].contains("/t/topic-9/9"));
        assert_eq!(runner.store.load().await.unwrap(), 9);
    }

    #[tokio::test]
    async fn test_run_normal_first_run_sends_nothing() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("state.json");
        let runner = normal_runner(&path, RecordingNotifier::default());

        let outcome = runner
            .run_normal(&[topic(5), topic(7), topic(3)])
            .await
            .unwrap();

        assert_eq!(outcome, RunOutcome::Initialized { last_topic_id: 7 });
        assert!(runner.notifier.sent.lock().unwrap().is_empty());
        assert_eq!(runner.store.load().await.unwrap(), 7);
    }

    #[tokio::test]
    async fn test_run_normal_failure_mid_batch_keeps_watermark() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("state.json");
        let notifier = RecordingNotifier {
            fail_on: Some(2),
            ..RecordingNotifier::default()
        };
        let runner = normal_runner(&path, notifier);
        runner.store.save(7).await.unwrap();

        let err = runner
            .run_normal(&[topic(10), topic(9), topic(8)])
            .await
            .unwrap_err();

        assert!(matches!(err, crate::Error::Dispatch(_)));
        assert_eq!(runner.notifier.sent.lock().unwrap().len(), 1);
        assert_eq!(runner.store.load().await.unwrap(), 7);
    }

    #[tokio::test]
    async fn test_run_force_latest_previews_newest() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("state.json");
        let runner = normal_runner(&path, RecordingNotifier::default());

        let outcome = runner
            .run_force_latest(&[topic(8), topic(9)])
            .await
            .unwrap();

        assert_eq!(outcome, RunOutcome::Previewed { topic_id: 9 });
        let sent = runner.notifier.sent.lock().unwrap().clone();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].starts_with("*[TEST]*"));
        assert!(!path.exists());
    }
}
