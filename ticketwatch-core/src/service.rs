//! Polling cycle that drives every registered source through filter, dedup, and notify.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info, warn};

use crate::cache::{PartitionKey, diff};
use crate::filter::{self, AllowList};
use crate::model::{JourneyPlan, JourneyType, Query, SourceId};
use crate::notifier::Notifier;
use crate::plugin::{SourcePlugin, SourceRegistry};
use crate::ports::{CacheError, CacheStore};

#[derive(Debug, Clone)]
/// Resolved settings the monitor runs with.
pub struct MonitorConfig {
    /// Directions to search, each with its travel date.
    pub journeys: Vec<JourneyPlan>,
    /// Operators whose tickets are reported.
    pub allowed_companies: AllowList,
    /// Pause between the end of one cycle and the start of the next.
    pub interval: Duration,
}

#[derive(thiserror::Error, Debug)]
/// Failures that end one source's run for the current cycle.
pub enum CycleError {
    /// New baseline could not be persisted.
    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),
    /// The source's run panicked or was cancelled.
    #[error("Source run aborted: {0}")]
    Aborted(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// What happened for one direction of one source.
pub struct JourneyReport {
    /// Direction searched.
    pub journey_type: JourneyType,
    /// Routes queried.
    pub queries: usize,
    /// Queries that failed and counted as empty.
    pub failed_queries: usize,
    /// Tickets returned by the upstream.
    pub fetched: usize,
    /// Tickets left after the allow-list.
    pub matched: usize,
    /// Tickets not seen in the previous cycle.
    pub fresh: usize,
    /// Whether a push was delivered.
    pub notified: bool,
    /// Whether the baseline was overwritten.
    pub saved: bool,
}

impl JourneyReport {
    fn new(journey_type: JourneyType, queries: usize) -> Self {
        Self {
            journey_type,
            queries,
            failed_queries: 0,
            fetched: 0,
            matched: 0,
            fresh: 0,
            notified: false,
            saved: false,
        }
    }
}

#[derive(Debug)]
/// Result of one source's run within a cycle.
pub struct SourceOutcome {
    /// Source that ran.
    pub source: SourceId,
    /// Per-direction reports, or the error that stopped the run.
    pub result: Result<Vec<JourneyReport>, CycleError>,
}

#[derive(Debug, Default)]
/// Summary of one complete cycle.
pub struct CycleReport {
    /// One entry per registered source, in run order.
    pub sources: Vec<SourceOutcome>,
}

impl CycleReport {
    /// Number of sources whose run ended with an error.
    #[must_use]
    pub fn failed_sources(&self) -> usize {
        self.sources
            .iter()
            .filter(|outcome| outcome.result.is_err())
            .count()
    }

    /// Total number of newly reported tickets.
    #[must_use]
    pub fn fresh_tickets(&self) -> usize {
        self.sources
            .iter()
            .filter_map(|outcome| outcome.result.as_ref().ok())
            .flatten()
            .map(|report| report.fresh)
            .sum()
    }
}

/// Public entry point running the poll/filter/dedup/notify cycle.
pub struct Monitor {
    registry: Arc<SourceRegistry>,
    cache: Arc<dyn CacheStore>,
    notifier: Arc<Notifier>,
    config: Arc<MonitorConfig>,
}

impl Monitor {
    /// Create a monitor over the registered sources.
    #[must_use]
    pub fn new(
        registry: Arc<SourceRegistry>,
        cache: Arc<dyn CacheStore>,
        notifier: Arc<Notifier>,
        config: MonitorConfig,
    ) -> Self {
        if config.allowed_companies.is_empty() {
            warn!("operator allow-list is empty, no coach will ever be reported");
        }
        Self {
            registry,
            cache,
            notifier,
            config: Arc::new(config),
        }
    }

    /// Run every source once, one after another.
    ///
    /// Each source runs as its own task so an error or panic stays inside that source.
    pub async fn run_cycle(&self) -> CycleReport {
        info!(sources = self.registry.len(), "starting check cycle");

        let mut report = CycleReport::default();
        for plugin in self.registry.iter() {
            let source = plugin.meta.id.clone();
            let run = SourceRun {
                plugin: plugin.clone(),
                cache: Arc::clone(&self.cache),
                notifier: Arc::clone(&self.notifier),
                config: Arc::clone(&self.config),
            };

            let result = match tokio::spawn(run.execute()).await {
                Ok(result) => result,
                Err(join_err) => Err(CycleError::Aborted(join_err.to_string())),
            };
            if let Err(err) = &result {
                error!(source = %source, error = %err, "source run failed");
            }
            report.sources.push(SourceOutcome { source, result });
        }

        info!(
            fresh = report.fresh_tickets(),
            failed_sources = report.failed_sources(),
            "check cycle completed"
        );
        report
    }

    /// Repeat cycles until `shutdown` resolves.
    ///
    /// `shutdown` is only observed between cycles; a running cycle always completes.
    pub async fn run<F>(&self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        let mut shutdown = std::pin::pin!(shutdown);
        loop {
            self.run_cycle().await;

            info!(
                interval_secs = self.config.interval.as_secs(),
                "sleeping until next check"
            );
            tokio::select! {
                biased;
                () = &mut shutdown => {
                    info!("stop requested, monitor exiting");
                    break;
                }
                () = tokio::time::sleep(self.config.interval) => {}
            }
        }
    }
}

/// Everything one source's task needs, owned so it can be spawned.
struct SourceRun {
    plugin: SourcePlugin,
    cache: Arc<dyn CacheStore>,
    notifier: Arc<Notifier>,
    config: Arc<MonitorConfig>,
}

impl SourceRun {
    async fn execute(self) -> Result<Vec<JourneyReport>, CycleError> {
        let _guard = self.cache.lock(&self.plugin.meta.id).await;

        let mut reports = Vec::with_capacity(self.config.journeys.len());
        for journey in &self.config.journeys {
            reports.push(self.run_journey(journey).await?);
        }
        Ok(reports)
    }

    async fn run_journey(&self, journey: &JourneyPlan) -> Result<JourneyReport, CycleError> {
        let meta = &self.plugin.meta;
        let key = PartitionKey::new(meta.id.clone(), journey.journey_type);
        let previously_seen = self.cache.load(&key).await;
        let routes = self.plugin.routes.routes(journey.journey_type);
        let mut report = JourneyReport::new(journey.journey_type, routes.len());

        info!(
            source = %meta.id,
            journey = %journey.journey_type,
            date = %journey.travel_date,
            routes = routes.len(),
            "checking tickets"
        );

        let mut tickets = Vec::new();
        for route in routes {
            let query = Query {
                travel_date: journey.travel_date,
                route: route.clone(),
                journey_type: journey.journey_type,
            };
            debug!(source = %meta.id, route = %route, "checking route");

            match self.plugin.port.search(&query).await {
                Ok(found) => tickets.extend(found),
                Err(err) => {
                    report.failed_queries += 1;
                    error!(
                        source = %meta.id,
                        journey = %journey.journey_type,
                        date = %journey.travel_date,
                        route = %route,
                        error = %err,
                        "ticket search failed"
                    );
                }
            }
        }
        report.fetched = tickets.len();

        // a direction with no successful search has observed nothing, so the old baseline stands
        if report.queries > 0 && report.failed_queries == report.queries {
            warn!(
                source = %meta.id,
                journey = %journey.journey_type,
                "every search failed, keeping previous baseline"
            );
            return Ok(report);
        }

        let matched = filter::apply(&tickets, &self.config.allowed_companies);
        report.matched = matched.len();

        let fresh = diff(&matched, &previously_seen);
        report.fresh = fresh.len();

        if fresh.is_empty() {
            debug!(source = %meta.id, journey = %journey.journey_type, "no new buses since last check");
        } else {
            info!(
                source = %meta.id,
                journey = %journey.journey_type,
                count = fresh.len(),
                "found new buses to notify about"
            );
            match self.notifier.notify(meta, &fresh).await {
                Ok(()) => report.notified = true,
                Err(err) => error!(
                    source = %meta.id,
                    journey = %journey.journey_type,
                    error = %err,
                    "failed to send notification"
                ),
            }
        }

        self.cache.save(&key, &matched).await?;
        report.saved = true;
        Ok(report)
    }
}
