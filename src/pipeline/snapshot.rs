// src/pipeline/snapshot.rs

//! Paginated snapshot acquisition.
//!
//! The builder walks the list page by page and only hands back a snapshot
//! holding at least the target number of items. A pass that comes back
//! short (the site throttles scrapers by serving empty or partial pages)
//! is thrown away; the builder waits a fixed interval and starts over
//! from the first page, with no cap on the number of passes.
//!
//! Fetch and parse errors are not retried here. They end the build and
//! are handled by the caller's recovery boundary.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{Config, Item, Snapshot};
use crate::services::{ItemExtractor, PageFetcher};

/// Source of waits, replaceable in tests.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Sleeps on the tokio timer.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Pagination settings of one build.
#[derive(Debug, Clone, Copy)]
pub struct BuildSettings {
    pub page_size: usize,
    pub target_count: usize,
    pub retry_interval: Duration,
}

impl From<&Config> for BuildSettings {
    fn from(config: &Config) -> Self {
        Self {
            page_size: config.source.page_size,
            target_count: config.source.target_count,
            retry_interval: config.schedule.retry_interval(),
        }
    }
}

/// Where a build currently stands.
enum BuildState {
    /// Fetching the page at `offset`; `items` holds everything found so far in this pass.
    Paging { offset: usize, items: Vec<Item> },
    /// A full pass ended with `extracted` items, short of the target.
    Retrying { extracted: usize },
    /// A pass reached the target.
    Complete(Snapshot),
}

/// Builds complete snapshots from paginated list pages.
pub struct SnapshotBuilder {
    fetcher: Arc<dyn PageFetcher>,
    extractor: Arc<dyn ItemExtractor>,
    sleeper: Arc<dyn Sleeper>,
    settings: BuildSettings,
}

impl SnapshotBuilder {
    pub fn new(
        fetcher: Arc<dyn PageFetcher>,
        extractor: Arc<dyn ItemExtractor>,
        sleeper: Arc<dyn Sleeper>,
        settings: BuildSettings,
    ) -> Self {
        Self {
            fetcher,
            extractor,
            sleeper,
            settings,
        }
    }

    /// Build a snapshot holding at least `target_count` items.
    ///
    /// Pages are fetched one after the other. An over-long result is
    /// returned as is.
    pub async fn build(&self) -> Result<Snapshot> {
        log::debug!("refreshing top250...");
        let BuildSettings {
            page_size,
            target_count,
            retry_interval,
        } = self.settings;
        // A zero step would never reach the target offset.
        let step = page_size.max(1);

        let mut pass = 1usize;
        let mut last_body_len = 0usize;
        let mut state = BuildState::Paging {
            offset: 0,
            items: Vec::with_capacity(target_count),
        };

        loop {
            state = match state {
                BuildState::Paging { offset, mut items } => {
                    let html = self.fetcher.fetch(offset).await?;
                    last_body_len = html.len();
                    let page = self.extractor.extract(&html)?;
                    log::debug!(
                        "pass {}: offset {} yielded {} items",
                        pass,
                        offset,
                        page.len()
                    );
                    items.extend(page);

                    let next = offset + step;
                    if next < target_count {
                        BuildState::Paging {
                            offset: next,
                            items,
                        }
                    } else {
                        let snapshot = Snapshot::new(items);
                        if snapshot.is_complete(target_count) {
                            BuildState::Complete(snapshot)
                        } else {
                            BuildState::Retrying {
                                extracted: snapshot.len(),
                            }
                        }
                    }
                }
                BuildState::Retrying { extracted } => {
                    log::error!("refresh failed. extract `{}` items", extracted);
                    log::debug!("last page body was {} bytes", last_body_len);
                    self.sleeper.sleep(retry_interval).await;
                    pass += 1;
                    BuildState::Paging {
                        offset: 0,
                        items: Vec::with_capacity(target_count),
                    }
                }
                BuildState::Complete(snapshot) => {
                    log::debug!(
                        "refresh top250 finished: {} items after {} pass(es)",
                        snapshot.len(),
                        pass
                    );
                    return Ok(snapshot);
                }
            };
        }
    }
}
