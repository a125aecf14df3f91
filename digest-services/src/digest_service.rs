//! Digest Service
//!
//! Runs one polling cycle end to end: load and prune the seen-set, fetch
//! every query, filter, assemble, deliver, and only then persist what was
//! delivered. A failed delivery leaves the seen-set untouched so the same
//! items are offered again on the next run.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, FixedOffset, Utc};
use futures::future::join_all;
use tracing::{debug, info, instrument, warn};

use digest_core::{Candidate, DigestError, SeenItem};
use digest_news::{FeedFetcher, LanguageDetector, NewsError, Notifier};

use crate::candidate_filter::{CandidateFilter, Decision, KeySets, Rejection};
use crate::config::{ConfigError, DigestConfig};
use crate::digest::{assemble, Digest, DigestFormatter, TELEGRAM_MESSAGE_LIMIT};
use crate::seen_store::{prune, SeenStore, SeenStoreError};

#[derive(Debug, thiserror::Error)]
pub enum DigestServiceError {
    #[error("Seen-set error: {0}")]
    Store(#[from] SeenStoreError),

    #[error("Delivery failed: {0}")]
    Notify(#[source] NewsError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl From<DigestServiceError> for DigestError {
    fn from(e: DigestServiceError) -> Self {
        match e {
            DigestServiceError::Store(inner) => inner.into(),
            DigestServiceError::Notify(inner) => DigestError::notify(inner.to_string()),
            DigestServiceError::Config(inner) => inner.into(),
        }
    }
}

/// What a single run did
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    /// Queries attempted
    pub queries: usize,
    /// Queries whose fetch failed and were skipped
    pub failed_queries: Vec<String>,
    /// Raw entries returned by the fetcher
    pub fetched: usize,
    /// Entries that passed the filter
    pub accepted: usize,
    /// Entries included in the delivered digest
    pub delivered: usize,
    /// Rejection counts by reason
    pub rejections: HashMap<Rejection, usize>,
    /// Seen-set size after saving
    pub seen_total: usize,
}

impl RunReport {
    pub fn rejected(&self) -> usize {
        self.rejections.values().sum()
    }
}

/// One-shot digest runner
pub struct DigestService {
    config: DigestConfig,
    store: SeenStore,
    filter: CandidateFilter,
    formatter: DigestFormatter,
    offset: FixedOffset,
    fetcher: Arc<dyn FeedFetcher>,
    notifier: Arc<dyn Notifier>,
}

impl DigestService {
    /// Create a new DigestService
    pub fn new(
        config: DigestConfig,
        fetcher: Arc<dyn FeedFetcher>,
        notifier: Arc<dyn Notifier>,
        language: Arc<dyn LanguageDetector>,
    ) -> Result<Self, DigestServiceError> {
        config.validate()?;
        let offset = config.display_offset().ok_or_else(|| ConfigError::InvalidValue {
            field: "DISPLAY_UTC_OFFSET_HOURS".to_string(),
            value: config.utc_offset_hours.to_string(),
        })?;

        info!(
            queries = config.queries.len(),
            window_hours = config.recency_hours,
            boundary = ?config.recency_boundary,
            keep_days = config.keep_days,
            max_items = config.max_items,
            seen_path = %config.seen_path.display(),
            "Initializing DigestService"
        );

        Ok(Self {
            store: SeenStore::new(&config.seen_path),
            filter: CandidateFilter::new(
                config.recency_window(),
                config.recency_boundary,
                language,
            ),
            formatter: DigestFormatter {
                title: config.digest_title.clone(),
                window_hours: config.recency_hours,
                offset,
                zone_label: config.zone_label.clone(),
                max_message_len: TELEGRAM_MESSAGE_LIMIT,
            },
            offset,
            fetcher,
            notifier,
            config,
        })
    }

    pub fn store(&self) -> &SeenStore {
        &self.store
    }

    /// Run one cycle as of `now`
    #[instrument(skip(self))]
    pub async fn run_once(&self, now: DateTime<Utc>) -> Result<RunReport, DigestServiceError> {
        let mut report = RunReport::default();

        let mut seen = prune(self.store.load()?, now, self.config.keep_days);
        let seen_keys = KeySets::from_seen(&seen);
        debug!(
            "Seen-set: {} items, {} url keys, {} title keys",
            seen.len(),
            seen_keys.url_count(),
            seen_keys.title_count()
        );

        let accepted = self.collect_candidates(now, &seen_keys, &mut report).await;
        report.accepted = accepted.len();

        let digest = assemble(accepted, self.config.max_items);
        let messages = self.formatter.format_messages(&digest);
        if messages.len() > 1 {
            debug!("Digest split into {} messages", messages.len());
        }

        for message in &messages {
            self.notifier
                .send(message)
                .await
                .map_err(DigestServiceError::Notify)?;
        }

        match &digest {
            Digest::Empty => info!("No new articles in the last {}h", self.config.recency_hours),
            Digest::Items(items) => {
                let delivered_at = now.with_timezone(&self.offset);
                seen.extend(items.iter().map(|c| SeenItem::from_candidate(c, delivered_at)));
                report.delivered = items.len();
            }
        }

        self.store.save(&seen)?;
        report.seen_total = seen.len();

        info!(
            fetched = report.fetched,
            accepted = report.accepted,
            delivered = report.delivered,
            rejected = report.rejected(),
            failed_queries = report.failed_queries.len(),
            seen_total = report.seen_total,
            "Run complete"
        );
        Ok(report)
    }

    /// Fetch all queries concurrently, then filter in query order
    async fn collect_candidates(
        &self,
        now: DateTime<Utc>,
        seen_keys: &KeySets,
        report: &mut RunReport,
    ) -> Vec<Candidate> {
        let queries: Vec<&str> = self
            .config
            .queries
            .iter()
            .map(|q| q.as_str())
            .filter(|q| !q.trim().is_empty())
            .collect();
        report.queries = queries.len();

        let results = join_all(queries.iter().map(|query| async move {
            (*query, self.fetcher.fetch(query).await)
        }))
        .await;

        let mut batch = KeySets::new();
        let mut accepted = Vec::new();

        for (query, result) in results {
            let entries = match result {
                Ok(entries) => entries,
                Err(e) => {
                    warn!("Failed to fetch query '{}': {}", query, e);
                    report.failed_queries.push(query.to_string());
                    continue;
                }
            };
            report.fetched += entries.len();

            for entry in &entries {
                match self.filter.evaluate(entry, now, seen_keys, &mut batch) {
                    Decision::Accept(candidate) => accepted.push(candidate),
                    Decision::Reject(reason) => {
                        debug!("Skipping '{}': {}", entry.title, reason);
                        *report.rejections.entry(reason).or_insert(0) += 1;
                    }
                }
            }
        }

        accepted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::{Duration, TimeZone};
    use digest_core::FeedEntry;
    use digest_news::HangulDetector;
    use std::sync::Mutex;
    use tempfile::TempDir;

    struct StaticFetcher {
        entries: HashMap<String, Result<Vec<FeedEntry>, String>>,
    }

    #[async_trait]
    impl FeedFetcher for StaticFetcher {
        async fn fetch(&self, query: &str) -> Result<Vec<FeedEntry>, NewsError> {
            match self.entries.get(query) {
                Some(Ok(entries)) => Ok(entries.clone()),
                Some(Err(msg)) => Err(NewsError::Transport(msg.clone())),
                None => Ok(Vec::new()),
            }
        }
    }

    #[derive(Default)]
    struct RecordingNotifier {
        fail: bool,
        sent: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl Notifier for RecordingNotifier {
        async fn send(&self, text: &str) -> Result<(), NewsError> {
            if self.fail {
                return Err(NewsError::ApiError {
                    status: 502,
                    message: "bad gateway".to_string(),
                });
            }
            self.sent.lock().unwrap().push(text.to_string());
            Ok(())
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 4, 12, 0, 0).unwrap()
    }

    fn entry(query: &str, title: &str, link: &str, hours_ago: i64) -> FeedEntry {
        FeedEntry {
            query: query.to_string(),
            title: title.to_string(),
            link: link.to_string(),
            summary: String::new(),
            published: Some((now() - Duration::hours(hours_ago)).to_rfc3339()),
            updated: None,
        }
    }

    fn service(
        dir: &TempDir,
        entries: HashMap<String, Result<Vec<FeedEntry>, String>>,
        notifier: Arc<RecordingNotifier>,
        max_items: usize,
    ) -> DigestService {
        let config = DigestConfig {
            seen_path: dir.path().join("seen.json"),
            max_items,
            queries: vec!["a".to_string(), "b".to_string(), "c".to_string()],
            ..DigestConfig::default()
        };
        DigestService::new(
            config,
            Arc::new(StaticFetcher { entries }),
            notifier,
            Arc::new(HangulDetector::new()),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_failed_query_does_not_stop_others() {
        let dir = TempDir::new().unwrap();
        let notifier = Arc::new(RecordingNotifier::default());
        let entries = HashMap::from([
            ("a".to_string(), Err("connection reset".to_string())),
            ("b".to_string(), Ok(vec![entry("b", "Nexpowder story", "https://x/1", 1)])),
        ]);

        let report = service(&dir, entries, notifier.clone(), 20)
            .run_once(now())
            .await
            .unwrap();

        assert_eq!(report.queries, 3);
        assert_eq!(report.failed_queries, vec!["a".to_string()]);
        assert_eq!(report.delivered, 1);
        assert_eq!(notifier.sent.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_cross_query_duplicates_counted_once() {
        let dir = TempDir::new().unwrap();
        let notifier = Arc::new(RecordingNotifier::default());
        let entries = HashMap::from([
            ("a".to_string(), Ok(vec![entry("a", "Story [Reuters]", "https://x/1", 2)])),
            ("b".to_string(), Ok(vec![entry("b", "Story (AP)", "https://y/2", 1)])),
            ("c".to_string(), Ok(vec![entry("c", "Other", "https://x/1#frag", 1)])),
        ]);

        let report = service(&dir, entries, notifier, 20).run_once(now()).await.unwrap();

        assert_eq!(report.fetched, 3);
        assert_eq!(report.accepted, 1);
        assert_eq!(report.rejections.get(&Rejection::DuplicateTitleInBatch), Some(&1));
        assert_eq!(report.rejections.get(&Rejection::DuplicateUrlInBatch), Some(&1));
    }

    #[tokio::test]
    async fn test_truncated_items_are_not_persisted() {
        let dir = TempDir::new().unwrap();
        let notifier = Arc::new(RecordingNotifier::default());
        let entries = HashMap::from([(
            "a".to_string(),
            Ok(vec![
                entry("a", "Three", "https://x/3", 3),
                entry("a", "One", "https://x/1", 1),
                entry("a", "Two", "https://x/2", 2),
            ]),
        )]);

        let svc = service(&dir, entries, notifier.clone(), 2);
        let report = svc.run_once(now()).await.unwrap();

        assert_eq!(report.accepted, 3);
        assert_eq!(report.delivered, 2);
        let urls: Vec<String> = svc.store().load().unwrap().into_iter().map(|r| r.url).collect();
        assert_eq!(urls, vec!["https://x/1".to_string(), "https://x/2".to_string()]);

        let sent = notifier.sent.lock().unwrap();
        assert!(sent[0].contains("1) One"));
        assert!(sent[0].contains("2) Two"));
        assert!(!sent[0].contains("Three"));
    }

    #[tokio::test]
    async fn test_long_digest_sent_in_parts() {
        let dir = TempDir::new().unwrap();
        let notifier = Arc::new(RecordingNotifier::default());
        let long_path = "x".repeat(400);
        let items: Vec<FeedEntry> = (0..20)
            .map(|i| {
                let link = format!("https://news.google.com/rss/articles/{i}{long_path}");
                entry("a", &format!("Story number {i}"), &link, 1)
            })
            .collect();
        let entries = HashMap::from([("a".to_string(), Ok(items))]);

        let svc = service(&dir, entries, notifier.clone(), 20);
        let report = svc.run_once(now()).await.unwrap();

        assert_eq!(report.delivered, 20);
        assert_eq!(svc.store().load().unwrap().len(), 20);

        let sent = notifier.sent.lock().unwrap();
        assert!(sent.len() > 1);
        assert!(sent.iter().all(|m| m.encode_utf16().count() <= TELEGRAM_MESSAGE_LIMIT));
        assert!(sent[0].starts_with("🗞️ *"));
    }

    #[tokio::test]
    async fn test_failed_delivery_persists_nothing() {
        let dir = TempDir::new().unwrap();
        let notifier = Arc::new(RecordingNotifier {
            fail: true,
            ..RecordingNotifier::default()
        });
        let entries = HashMap::from([(
            "a".to_string(),
            Ok(vec![entry("a", "Story", "https://x/1", 1)]),
        )]);

        let svc = service(&dir, entries, notifier, 20);
        let err = svc.run_once(now()).await.unwrap_err();

        assert!(matches!(err, DigestServiceError::Notify(_)));
        assert!(DigestError::from(err).is_transient());
        assert!(!svc.store().path().exists());
    }

    #[tokio::test]
    async fn test_corrupt_state_aborts_before_delivery() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("seen.json"), "not json").unwrap();
        let notifier = Arc::new(RecordingNotifier::default());

        let err = service(&dir, HashMap::new(), notifier.clone(), 20)
            .run_once(now())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            DigestServiceError::Store(SeenStoreError::CorruptState { .. })
        ));
        assert!(notifier.sent.lock().unwrap().is_empty());
        assert_eq!(
            std::fs::read_to_string(dir.path().join("seen.json")).unwrap(),
            "not json"
        );
    }

    #[tokio::test]
    async fn test_empty_run_sends_notice_and_prunes() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("seen.json"),
            r#"{"items": [
                {"ts": "2024-12-01T00:00:00+09:00", "url_key": "old", "title_key": "",
                 "url": "https://old", "title": "Old"},
                {"ts": "2025-03-01T00:00:00+09:00", "url_key": "new", "title_key": "",
                 "url": "https://new", "title": "New"}
            ]}"#,
        )
        .unwrap();
        let notifier = Arc::new(RecordingNotifier::default());

        let svc = service(&dir, HashMap::new(), notifier.clone(), 20);
        let report = svc.run_once(now()).await.unwrap();

        assert_eq!(report.delivered, 0);
        assert_eq!(report.seen_total, 1);
        assert!(notifier.sent.lock().unwrap()[0].contains("새 해외 뉴스가 없습니다"));
        let urls: Vec<String> = svc.store().load().unwrap().into_iter().map(|r| r.url).collect();
        assert_eq!(urls, vec!["https://new".to_string()]);
    }
}
