//! # Audit Driver
//!
//! Seeds once, sequentially, then probes every GET endpoint through a pool of
//! `concurrency` workers. Workers pull the next endpoint index from a shared
//! counter, so at most `concurrency` requests are in flight.
//!
//! Each probe is isolated: a panic inside one probe is caught and becomes
//! that endpoint's `error`. Results land in one slot per endpoint and are
//! sorted by path after all workers finish.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use futures::FutureExt;
use tokio::task::JoinSet;

use fieldaudit_schema::{ApiSpec, Endpoint};

use crate::config::AuditConfig;
use crate::error::ClientError;
use crate::http::ApiClient;
use crate::probe::{probe, EndpointResult};
use crate::report::AuditReport;
use crate::seeds::{seed, Seeds};

/// Runs audits against one API.
#[derive(Debug, Clone)]
pub struct AuditDriver {
    config: AuditConfig,
    client: ApiClient,
}

impl AuditDriver {
    /// Build a driver and its HTTP client.
    pub fn new(config: AuditConfig) -> Result<Self, ClientError> {
        let client = ApiClient::new(&config)?;
        Ok(Self { config, client })
    }

    /// Seed, probe every endpoint, and assemble the report.
    pub async fn run(&self, spec: Arc<ApiSpec>) -> AuditReport {
        tracing::info!(base = %self.client.base(), "seeding parameters");
        let seeds = Arc::new(seed(&self.client).await);
        tracing::info!(harvested = seeds.harvested(), "seeding done");

        let endpoints = spec.endpoints();
        let results = self.probe_all(Arc::clone(&spec), endpoints, Arc::clone(&seeds)).await;

        AuditReport {
            base: self.client.base().to_string(),
            spec: spec.source().to_string(),
            timestamp: chrono::Utc::now().timestamp(),
            seeds: Seeds::clone(&seeds),
            endpoints: results,
        }
    }

    /// Probe `endpoints` with bounded concurrency against fixed seeds.
    ///
    /// The returned results are sorted by path; endpoints sharing a path keep
    /// their document order.
    pub async fn probe_all(
        &self,
        spec: Arc<ApiSpec>,
        endpoints: Vec<Endpoint>,
        seeds: Arc<Seeds>,
    ) -> Vec<EndpointResult> {
        let workers = self.config.concurrency.max(1).min(endpoints.len().max(1));
        let client = self.client.clone();
        let open = Arc::new(self.config.open_prefixes.clone());
        let probe_one = move |endpoint: Endpoint| {
            let client = client.clone();
            let spec = Arc::clone(&spec);
            let seeds = Arc::clone(&seeds);
            let open = Arc::clone(&open);
            async move { probe(&client, &spec, &endpoint, &seeds, &open).await }
        };
        run_pool(endpoints, workers, probe_one).await
    }
}

/// Run `probe_one` over `endpoints` on `workers` tasks.
///
/// A panic inside one probe becomes that endpoint's `error`; an endpoint
/// whose worker died reports "probe did not complete".
async fn run_pool<F, Fut>(endpoints: Vec<Endpoint>, workers: usize, probe_one: F) -> Vec<EndpointResult>
where
    F: Fn(Endpoint) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = EndpointResult> + Send + 'static,
{
    let total = endpoints.len();
    tracing::info!(endpoints = total, workers, "probing endpoints");

    let endpoints = Arc::new(endpoints);
    let next = Arc::new(AtomicUsize::new(0));
    let probe_one = Arc::new(probe_one);

    let mut pool = JoinSet::new();
    for _ in 0..workers {
        let endpoints = Arc::clone(&endpoints);
        let next = Arc::clone(&next);
        let probe_one = Arc::clone(&probe_one);

        pool.spawn(async move {
            let mut done = Vec::new();
            loop {
                let index = next.fetch_add(1, Ordering::Relaxed);
                let Some(endpoint) = endpoints.get(index) else {
                    break;
                };
                let outcome = AssertUnwindSafe(async { probe_one(endpoint.clone()).await })
                    .catch_unwind()
                    .await;
                let result = match outcome {
                    Ok(result) => result,
                    Err(panic) => {
                        let message = panic_message(panic.as_ref());
                        tracing::warn!(endpoint = %endpoint.path, "probe panicked: {message}");
                        EndpointResult::failed(endpoint, None, format!("probe panicked: {message}"))
                    }
                };
                done.push((index, result));
            }
            done
        });
    }

    let mut slots: Vec<Option<EndpointResult>> = vec![None; total];
    while let Some(joined) = pool.join_next().await {
        match joined {
            Ok(done) => {
                for (index, result) in done {
                    slots[index] = Some(result);
                }
            }
            Err(e) => tracing::error!("audit worker terminated: {e}"),
        }
    }

    let mut results: Vec<EndpointResult> = slots
        .into_iter()
        .zip(endpoints.iter())
        .map(|(slot, endpoint)| {
            slot.unwrap_or_else(|| EndpointResult::failed(endpoint, None, "probe did not complete"))
        })
        .collect();
    results.sort_by(|a, b| a.path.cmp(&b.path));

    let skipped = results.iter().filter(|r| r.is_skipped()).count();
    let failed = results.iter().filter(|r| r.error.is_some()).count();
    tracing::info!(endpoints = total, skipped, failed, "probing done");
    results
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
