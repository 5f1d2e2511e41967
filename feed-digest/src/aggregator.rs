use crate::duration::VideoInfoLookup;
use crate::fetcher::{FetchJob, Fetcher};
use crate::ranker;
use crate::traits::{DurationLookup, NoopDurationLookup};
use crate::types::{DigestConfig, Group, Item, RankedGroup, Result};
use chrono::{DateTime, FixedOffset, Utc};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

/// Buckets collected in one run, plus how the fetchers fared.
#[derive(Debug, Default)]
pub struct AggregateReport {
    /// Unordered items per group name. Every requested group has an entry.
    pub buckets: HashMap<String, Vec<Item>>,
    pub completed: usize,
    pub failed: usize,
}

impl AggregateReport {
    pub fn total_items(&self) -> usize {
        self.buckets.values().map(Vec::len).sum()
    }
}

/// Runs one fetcher per target and gathers their items by group.
pub struct Aggregator {
    fetcher: Arc<Fetcher>,
    lookup: Arc<dyn DurationLookup>,
    config: DigestConfig,
}

impl Aggregator {
    pub fn new(fetcher: Fetcher, config: DigestConfig) -> Result<Self> {
        config.validate()?;

        let lookup: Arc<dyn DurationLookup> = if config.enrich {
            Arc::new(VideoInfoLookup::new(fetcher.client(), config.lookup_url.clone())?)
        } else {
            Arc::new(NoopDurationLookup)
        };

        Ok(Self {
            fetcher: Arc::new(fetcher),
            lookup,
            config,
        })
    }

    pub fn with_lookup(mut self, lookup: Arc<dyn DurationLookup>) -> Self {
        self.lookup = lookup;
        self
    }

    pub fn config(&self) -> &DigestConfig {
        &self.config
    }

    /// Fetch, bucket and rank every group against a cutoff computed from now.
    pub async fn run(&self, groups: &[Group]) -> BTreeMap<String, RankedGroup> {
        let cutoff = self.config.cutoff(Utc::now());
        let report = self.collect(groups, cutoff).await;

        info!(
            "Collected {} items from {} targets ({} failed)",
            report.total_items(),
            report.completed,
            report.failed
        );

        ranker::rank_groups(groups, report.buckets)
    }

    /// Fan out one task per target and fan their items back in.
    ///
    /// Returns only after every task has finished and every item it sent has
    /// been bucketed. Target failures are logged and counted, never returned.
    pub async fn collect(&self, groups: &[Group], cutoff: DateTime<FixedOffset>) -> AggregateReport {
        let (tx, mut rx) = mpsc::unbounded_channel::<Item>();
        let limiter = self
            .config
            .max_concurrency
            .map(|permits| Arc::new(Semaphore::new(permits)));
        let mut tasks = JoinSet::new();

        let mut report = AggregateReport::default();
        for group in groups {
            report.buckets.entry(group.name.clone()).or_default();

            for target in &group.targets {
                let job = FetchJob {
                    group: group.name.clone(),
                    target: target.clone(),
                    cutoff,
                    max_entries: self.config.max_entries,
                    enrich: self.config.enrich,
                };
                let fetcher = Arc::clone(&self.fetcher);
                let lookup = Arc::clone(&self.lookup);
                let limiter = limiter.clone();
                let tx = tx.clone();

                tasks.spawn(async move {
                    let _permit = match limiter {
                        Some(semaphore) => semaphore.acquire_owned().await.ok(),
                        None => None,
                    };

                    match fetcher.run(&job, lookup.as_ref(), &tx).await {
                        Ok(_) => true,
                        Err(e) => {
                            warn!(
                                feed = %job.target.name,
                                url = %job.target.url,
                                "Skipping target: {}",
                                e
                            );
                            false
                        }
                    }
                });
            }
        }

        // Only the tasks hold senders now, so the channel closes once the last one returns.
        drop(tx);

        debug!("Spawned {} fetchers", tasks.len());

        loop {
            tokio::select! {
                biased;
                Some(item) = rx.recv() => bucket(&mut report.buckets, item),
                joined = tasks.join_next() => match joined {
                    Some(Ok(succeeded)) => {
                        report.completed += 1;
                        if !succeeded {
                            report.failed += 1;
                        }
                    }
                    Some(Err(e)) => {
                        error!("Fetcher task aborted: {}", e);
                        report.completed += 1;
                        report.failed += 1;
                    }
                    None => break,
                },
            }
        }

        // Every task has returned; drain whatever they sent after our last receive.
        while let Some(item) = rx.recv().await {
            bucket(&mut report.buckets, item);
        }

        report
    }
}

fn bucket(buckets: &mut HashMap<String, Vec<Item>>, item: Item) {
    buckets.entry(item.group.clone()).or_default().push(item);
}
