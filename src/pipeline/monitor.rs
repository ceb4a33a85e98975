// src/pipeline/monitor.rs

//! The poll loop.
//!
//! One cycle loads the previous snapshot, builds a new one, reports the
//! differences and persists the new snapshot. [`Monitor::run`] repeats
//! cycles forever. A failing cycle, whether it returned an error or
//! panicked, is logged and reported by mail, and the loop goes on with
//! the next cycle after the usual poll interval.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::path::PathBuf;
use std::sync::Arc;

use futures::FutureExt;

use crate::error::Result;
use crate::models::{Config, DiffReport};
use crate::pipeline::diff::DiffEngine;
use crate::pipeline::report::render;
use crate::pipeline::snapshot::{BuildSettings, Sleeper, SnapshotBuilder, TokioSleeper};
use crate::services::{HttpPageFetcher, ListingExtractor, MailNotifier, Notifier};
use crate::storage::{LocalStorage, SnapshotStorage};
use crate::utils::logging;

/// What one successful cycle did.
#[derive(Debug, Clone)]
pub struct CycleOutcome {
    /// Items in the new snapshot
    pub item_count: usize,
    /// The comparison against the previous snapshot
    pub diff: DiffReport,
    /// Rendered report, empty when nothing changed
    pub report: String,
    /// Where the report was kept, if it was written
    pub report_file: Option<PathBuf>,
}

/// Drives fetch, diff, notify and persist cycles.
pub struct Monitor {
    config: Arc<Config>,
    builder: SnapshotBuilder,
    engine: DiffEngine,
    storage: Arc<dyn SnapshotStorage>,
    notifier: Arc<dyn Notifier>,
    sleeper: Arc<dyn Sleeper>,
}

impl Monitor {
    pub fn new(
        config: Arc<Config>,
        builder: SnapshotBuilder,
        storage: Arc<dyn SnapshotStorage>,
        notifier: Arc<dyn Notifier>,
        sleeper: Arc<dyn Sleeper>,
    ) -> Self {
        Self {
            config,
            builder,
            engine: DiffEngine::new(),
            storage,
            notifier,
            sleeper,
        }
    }

    /// Wire the production collaborators from configuration.
    ///
    /// Creates the report and archive directories.
    pub async fn from_config(config: Arc<Config>) -> Result<Self> {
        let storage = LocalStorage::from_config(&config.paths);
        storage.prepare().await?;

        let sleeper: Arc<dyn Sleeper> = Arc::new(TokioSleeper);
        let builder = SnapshotBuilder::new(
            Arc::new(HttpPageFetcher::new(&config.source)?),
            Arc::new(ListingExtractor::new(&config.source.base_url)?),
            Arc::clone(&sleeper),
            BuildSettings::from(config.as_ref()),
        );
        let notifier = MailNotifier::new(config.mail.clone(), storage.logs_dir());

        Ok(Self::new(
            config,
            builder,
            Arc::new(storage),
            Arc::new(notifier),
            sleeper,
        ))
    }

    /// Run a single cycle. Errors are returned, not reported.
    pub async fn run_cycle(&self) -> Result<CycleOutcome> {
        let previous = self.storage.load_snapshot().await?;
        let current = self.builder.build().await?;

        let diff = self.engine.diff(&previous, &current);
        let report = render(&diff.events);
        let mut report_file = None;

        if diff.has_changes {
            log::debug!("【has update】, sending email...");
            let mail = &self.config.mail;
            if let Err(e) = self
                .notifier
                .send(&mail.recipient, &mail.change_subject, &report)
                .await
            {
                log::error!("top250 has update but send mail failed: {}", e);
            }

            match self.storage.write_report(&report).await {
                Ok(path) => report_file = Some(path),
                Err(e) => log::error!("write log failed: {}\ncontent: {}", e, report),
            }
        } else {
            log::debug!("no update.");
        }

        let written = self.storage.save_snapshot(&current).await?;

        logging::summary(
            "Cycle complete",
            &[
                ("items", written.item_count.to_string()),
                ("moved", diff.moved_count().to_string()),
                ("removed", diff.removed_count().to_string()),
                ("added", diff.added_count().to_string()),
                ("snapshot", written.snapshot_location.display().to_string()),
            ],
        );

        Ok(CycleOutcome {
            item_count: current.len(),
            diff,
            report,
            report_file,
        })
    }

    /// Run cycles until `max_cycles` is reached, or forever when `None`.
    ///
    /// `Some(0)` runs nothing. Returns the number of cycles that failed.
    pub async fn run(&self, max_cycles: Option<usize>) -> usize {
        let mut completed = 0usize;
        let mut failures = 0usize;

        while max_cycles.is_none_or(|max| completed < max) {
            if completed > 0 {
                self.sleeper
                    .sleep(self.config.schedule.poll_interval())
                    .await;
            }
            if self.run_guarded().await.is_none() {
                failures += 1;
            }
            completed += 1;
        }
        failures
    }

    /// Run one cycle inside the recovery boundary.
    ///
    /// Errors and panics are logged and mailed; `None` marks a failed cycle.
    pub async fn run_guarded(&self) -> Option<CycleOutcome> {
        let message = match AssertUnwindSafe(self.run_cycle()).catch_unwind().await {
            Ok(Ok(outcome)) => return Some(outcome),
            Ok(Err(e)) => e.to_string(),
            Err(payload) => panic_message(payload),
        };

        log::error!("{}", message);
        let mail = &self.config.mail;
        if let Err(e) = self
            .notifier
            .send(&mail.recipient, &mail.failure_subject, &message)
            .await
        {
            log::error!("failure notification failed: {}", e);
        }
        None
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "请检查服务器".to_string()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;
    use tempfile::TempDir;

    use super::*;
    use crate::error::AppError;
    use crate::models::{Item, Snapshot};
    use crate::pipeline::snapshot::stubs::{
        CountingExtractor, RecordingSleeper, ScriptedFetcher, item,
    };
    use crate::services::{ItemExtractor, PageFetcher};
    use crate::storage::WriteMetadata;

    #[derive(Default)]
    struct RecordingNotifier {
        sent: Mutex<Vec<(String, String, String)>>,
    }

    impl RecordingNotifier {
        fn sent(&self) -> Vec<(String, String, String)> {
            self.sent.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Notifier for RecordingNotifier {
        async fn send(&self, recipient: &str, subject: &str, body: &str) -> Result<()> {
            self.sent.lock().unwrap().push((
                recipient.to_string(),
                subject.to_string(),
                body.to_string(),
            ));
            Ok(())
        }
    }

    struct PanickingFetcher;

    /// Local storage whose writes can be made to fail.
    struct FlakyStorage {
        inner: LocalStorage,
        fail_save: bool,
        fail_report: bool,
    }

    #[async_trait]
    impl SnapshotStorage for FlakyStorage {
        async fn load_snapshot(&self) -> Result<Snapshot> {
            self.inner.load_snapshot().await
        }

        async fn save_snapshot(&self, snapshot: &Snapshot) -> Result<WriteMetadata> {
            if self.fail_save {
                return Err(AppError::Io(std::io::Error::other("disk full")));
            }
            self.inner.save_snapshot(snapshot).await
        }

        async fn write_report(&self, content: &str) -> Result<PathBuf> {
            if self.fail_report {
                return Err(AppError::Io(std::io::Error::other("read-only logs")));
            }
            self.inner.write_report(content).await
        }
    }

    struct RejectingNotifier;

    #[async_trait]
    impl Notifier for RejectingNotifier {
        async fn send(&self, _recipient: &str, _subject: &str, _body: &str) -> Result<()> {
            Err(AppError::mail("relay refused"))
        }
    }

    fn monitor_with(storage: Arc<dyn SnapshotStorage>, notifier: Arc<dyn Notifier>) -> Monitor {
        let config = Arc::new(config());
        let sleeper = Arc::new(RecordingSleeper::default());
        let builder = SnapshotBuilder::new(
            Arc::new(ScriptedFetcher::new(5, 0)),
            Arc::new(CountingExtractor),
            sleeper.clone(),
            BuildSettings::from(config.as_ref()),
        );
        Monitor::new(config, builder, storage, notifier, sleeper)
    }

    /// Previous list with id-0 and id-1 swapped, so the next cycle reports changes.
    fn swapped_previous() -> Vec<Item> {
        let mut previous = vec![item(1), item(0)];
        previous.extend((2..10).map(item));
        previous
    }

    #[async_trait]
    impl PageFetcher for PanickingFetcher {
        async fn fetch(&self, _offset: usize) -> Result<String> {
            panic!("selector returned nothing");
        }
    }

    struct Harness {
        _tmp: TempDir,
        storage: Arc<LocalStorage>,
        notifier: Arc<RecordingNotifier>,
        sleeper: Arc<RecordingSleeper>,
        monitor: Monitor,
    }

    fn config() -> Config {
        let mut config = Config::default();
        config.source.page_size = 5;
        config.source.target_count = 10;
        config.mail.recipient = "me@example.com".to_string();
        config
    }

    fn harness(fetcher: Arc<dyn PageFetcher>, extractor: Arc<dyn ItemExtractor>) -> Harness {
        let tmp = TempDir::new().unwrap();
        let config = Arc::new(config());
        let storage = Arc::new(LocalStorage::new(tmp.path()));
        let notifier = Arc::new(RecordingNotifier::default());
        let sleeper = Arc::new(RecordingSleeper::default());
        let builder = SnapshotBuilder::new(
            fetcher,
            extractor,
            sleeper.clone(),
            BuildSettings::from(config.as_ref()),
        );
        let monitor = Monitor::new(
            config,
            builder,
            storage.clone(),
            notifier.clone(),
            sleeper.clone(),
        );
        Harness {
            _tmp: tmp,
            storage,
            notifier,
            sleeper,
            monitor,
        }
    }

    async fn seed(storage: &LocalStorage, items: Vec<Item>) {
        storage.save_snapshot(&Snapshot::new(items)).await.unwrap();
    }

    #[tokio::test]
    async fn test_first_cycle_persists_without_report() {
        let h = harness(
            Arc::new(ScriptedFetcher::new(5, 0)),
            Arc::new(CountingExtractor),
        );

        let outcome = h.monitor.run_cycle().await.unwrap();
        assert_eq!(outcome.item_count, 10);
        assert!(!outcome.diff.has_changes);
        assert!(outcome.report.is_empty());
        assert!(outcome.report_file.is_none());
        assert!(h.notifier.sent().is_empty());

        let stored = h.storage.load_snapshot().await.unwrap();
        assert_eq!(stored.len(), 10);
    }

    #[tokio::test]
    async fn test_changes_are_mailed_and_logged() {
        let h = harness(
            Arc::new(ScriptedFetcher::new(5, 0)),
            Arc::new(CountingExtractor),
        );
        // Previous list: id-1 and id-0 swapped, id-99 where id-2 now is.
        let mut previous: Vec<Item> = vec![item(1), item(0), item(99)];
        previous.extend((3..10).map(item));
        seed(&h.storage, previous).await;

        let outcome = h.monitor.run_cycle().await.unwrap();
        assert!(outcome.diff.has_changes);
        assert_eq!(outcome.diff.moved_count(), 2);
        assert_eq!(outcome.diff.removed_count(), 1);
        assert_eq!(outcome.diff.added_count(), 1);

        let sent = h.notifier.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, "me@example.com");
        assert_eq!(sent[0].1, "豆瓣电影Top250监测到变化");
        assert_eq!(sent[0].2, outcome.report);
        assert!(outcome.report.starts_with("【排位变动】Title 1：第 1 名 --> 第 2 名"));

        let report_file = outcome.report_file.unwrap();
        assert_eq!(std::fs::read_to_string(report_file).unwrap(), outcome.report);
    }

    #[tokio::test]
    async fn test_run_continues_after_failed_cycle() {
        let fetcher = Arc::new(ScriptedFetcher {
            page_size: 5,
            fail_at: Some(5),
            ..ScriptedFetcher::default()
        });
        let h = harness(fetcher, Arc::new(CountingExtractor));

        let failures = h.monitor.run(Some(2)).await;
        assert_eq!(failures, 2);

        let sent = h.notifier.sent();
        assert_eq!(sent.len(), 2);
        assert!(sent.iter().all(|(_, subject, _)| subject == "豆瓣电影Top250监测程序异常"));
        assert!(sent[0].2.contains("connection reset"));

        // One poll wait between the two cycles, none after the last one.
        assert_eq!(h.sleeper.recorded(), vec![Duration::from_secs(24 * 60 * 60)]);
        assert!(h.storage.load_snapshot().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_panic_is_caught_and_reported() {
        let h = harness(Arc::new(PanickingFetcher), Arc::new(CountingExtractor));

        assert!(h.monitor.run_guarded().await.is_none());
        let sent = h.notifier.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].2, "selector returned nothing");
    }

    #[tokio::test]
    async fn test_retry_waits_precede_poll_wait() {
        let h = harness(
            Arc::new(ScriptedFetcher::new(5, 2)),
            Arc::new(CountingExtractor),
        );

        let failures = h.monitor.run(Some(1)).await;
        assert_eq!(failures, 0);
        assert_eq!(
            h.sleeper.recorded(),
            vec![Duration::from_secs(8 * 60 * 60); 2]
        );
    }

    #[tokio::test]
    async fn test_zero_cycles_runs_nothing() {
        let fetcher = Arc::new(ScriptedFetcher::new(5, 0));
        let h = harness(fetcher.clone(), Arc::new(CountingExtractor));

        assert_eq!(h.monitor.run(Some(0)).await, 0);
        assert_eq!(fetcher.calls.load(std::sync::atomic::Ordering::SeqCst), 0);
        assert!(h.sleeper.recorded().is_empty());
        assert!(h.notifier.sent().is_empty());
    }

    #[tokio::test]
    async fn test_save_failure_fails_the_cycle() {
        let tmp = TempDir::new().unwrap();
        let storage = Arc::new(FlakyStorage {
            inner: LocalStorage::new(tmp.path()),
            fail_save: true,
            fail_report: false,
        });
        let notifier = Arc::new(RecordingNotifier::default());
        let monitor = monitor_with(storage.clone(), notifier.clone());

        let err = monitor.run_cycle().await.unwrap_err();
        assert!(err.to_string().contains("disk full"));
        assert!(storage.inner.load_snapshot().await.unwrap().is_empty());

        assert!(monitor.run_guarded().await.is_none());
        let sent = notifier.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].1, "豆瓣电影Top250监测程序异常");
        assert!(sent[0].2.contains("disk full"));
    }

    #[tokio::test]
    async fn test_report_write_failure_does_not_abort() {
        let tmp = TempDir::new().unwrap();
        let storage = Arc::new(FlakyStorage {
            inner: LocalStorage::new(tmp.path()),
            fail_save: false,
            fail_report: true,
        });
        seed(&storage.inner, swapped_previous()).await;
        let notifier = Arc::new(RecordingNotifier::default());
        let monitor = monitor_with(storage.clone(), notifier.clone());

        let outcome = monitor.run_cycle().await.unwrap();
        assert!(outcome.diff.has_changes);
        assert!(outcome.report_file.is_none());
        assert_eq!(notifier.sent().len(), 1);

        let stored = storage.inner.load_snapshot().await.unwrap();
        assert_eq!(stored.items()[0].identity, "id-0");
    }

    #[tokio::test]
    async fn test_notifier_error_does_not_abort() {
        let tmp = TempDir::new().unwrap();
        let storage = Arc::new(LocalStorage::new(tmp.path()));
        seed(&storage, swapped_previous()).await;
        let monitor = monitor_with(storage.clone(), Arc::new(RejectingNotifier));

        let outcome = monitor.run_cycle().await.unwrap();
        assert!(outcome.diff.has_changes);
        assert_eq!(outcome.diff.moved_count(), 2);
        assert!(outcome.report_file.is_some());

        let stored = storage.load_snapshot().await.unwrap();
        assert_eq!(stored.items()[0].identity, "id-0");
    }
}
