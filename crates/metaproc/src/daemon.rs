//! Orchestrator loop and process lifecycle.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use metaproc_fetch::{Downloader, Fetcher, Gateways, HttpClient, ReqwestClient, RetryPolicy};
use metaproc_pool::{JobError, JobHandle, WorkerPool};
use metaproc_store::{Contract, ItemToken, PlaceToken, Store};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::cursor::WatermarkCursor;
use crate::pipeline::{EntityRef, MetadataProcessor, Outcome};

/// Keeps the worker pool's backlog topped up from the three cursors.
pub struct Orchestrator<C: HttpClient + 'static> {
    processor: Arc<MetadataProcessor<C>>,
    pool: WorkerPool<Outcome>,
    items: WatermarkCursor<ItemToken>,
    places: WatermarkCursor<PlaceToken>,
    contracts: WatermarkCursor<Contract>,
    pending: Vec<(EntityRef, JobHandle<Outcome>)>,
    config: Arc<Config>,
}

impl<C: HttpClient + 'static> Orchestrator<C> {
    pub fn new(processor: MetadataProcessor<C>, config: Arc<Config>) -> Self {
        let store = processor.store().clone();
        Self {
            processor: Arc::new(processor),
            pool: WorkerPool::new(config.processing_workers),
            items: WatermarkCursor::new(store.clone()),
            places: WatermarkCursor::new(store.clone()),
            contracts: WatermarkCursor::new(store),
            pending: Vec::new(),
            config,
        }
    }

    fn submit(&mut self, entity: EntityRef) {
        let processor = Arc::clone(&self.processor);
        let job = entity.clone();
        let handle = self.pool.submit(async move { processor.process(job).await });
        self.pending.push((entity, handle));
    }

    /// Reports every job that has resolved since the last call and returns
    /// how many there were. A job that panicked marks its entity `Failed`.
    pub fn reap(&mut self) -> usize {
        let mut reaped = 0;
        let mut i = 0;
        while i < self.pending.len() {
            match self.pending[i].1.try_result() {
                Some(result) => {
                    let (entity, _) = self.pending.swap_remove(i);
                    report(&self.processor, &entity, result);
                    reaped += 1;
                }
                None => i += 1,
            }
        }
        reaped
    }

    /// Submits one item, one place and one contract per round until the
    /// backlog is full or all three cursors are exhausted. Returns `true`
    /// when the cursors were reset because a pass completed.
    pub fn fill_backlog(&mut self) -> bool {
        let limit = self.config.backlog_limit();
        while self.pool.backlog() < limit {
            let mut submitted = false;

            match self.items.next() {
                Ok(Some(item)) => {
                    self.submit(EntityRef::Item(item.transient_id));
                    submitted = true;
                }
                Ok(None) => {}
                Err(e) => {
                    error!(error = %e, "item cursor failed");
                    return false;
                }
            }
            match self.places.next() {
                Ok(Some(place)) => {
                    self.submit(EntityRef::Place(place.transient_id));
                    submitted = true;
                }
                Ok(None) => {}
                Err(e) => {
                    error!(error = %e, "place cursor failed");
                    return false;
                }
            }
            match self.contracts.next() {
                Ok(Some(contract)) => {
                    self.submit(EntityRef::Contract(contract.address));
                    submitted = true;
                }
                Ok(None) => {}
                Err(e) => {
                    error!(error = %e, "contract cursor failed");
                    return false;
                }
            }

            if !submitted {
                if self.pool.outstanding() == 0 {
                    self.items.reset();
                    self.places.reset();
                    self.contracts.reset();
                    return true;
                }
                break;
            }
        }
        false
    }

    /// Runs until `shutdown` fires, then cancels in-flight work and drains
    /// the pool.
    pub async fn run(mut self, shutdown: CancellationToken) {
        info!(workers = self.pool.size(), "processing started");
        loop {
            self.reap();
            if self.fill_backlog() {
                debug!("pass complete, cursors reset");
            }
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = tokio::time::sleep(self.config.poll_interval()) => {}
            }
        }

        info!(outstanding = self.pool.outstanding(), "shutdown requested, draining workers");
        self.pool.cancel_all();
        self.pool.join().await;
        for (entity, handle) in self.pending {
            report(&self.processor, &entity, handle.await);
        }
    }
}

fn report<C: HttpClient>(processor: &MetadataProcessor<C>, entity: &EntityRef, result: Result<Outcome, JobError>) {
    match result {
        Ok(outcome) => debug!(%entity, ?outcome, "pipeline finished"),
        Err(JobError::Cancelled) => debug!(%entity, "pipeline cancelled"),
        Err(JobError::Panicked(message)) => {
            error!(%entity, panic = %message, "pipeline panicked");
            processor.mark_failed(entity);
        }
        Err(e) => warn!(%entity, error = %e, "pipeline ended without an outcome"),
    }
}

/// Sleeps for `duration` unless shutdown comes first. Returns `false` on
/// shutdown.
async fn wait(duration: Duration, shutdown: &CancellationToken) -> bool {
    tokio::select! {
        _ = shutdown.cancelled() => false,
        _ = tokio::time::sleep(duration) => true,
    }
}

/// Opens the store, retrying every `store_retry_seconds` until it opens or
/// shutdown is requested.
pub async fn wait_for_store(config: &Config, shutdown: &CancellationToken) -> Option<Store> {
    loop {
        match Store::open(&config.store_path) {
            Ok(store) => {
                info!(path = %config.store_path.display(), "store opened");
                return Some(store);
            }
            Err(e) => {
                warn!(
                    path = %config.store_path.display(),
                    error = %e,
                    "store unavailable, retrying in {}s",
                    config.store_retry_seconds
                );
                if !wait(config.store_retry(), shutdown).await {
                    return None;
                }
            }
        }
    }
}

pub fn build_processor<C: HttpClient>(client: C, store: Store, config: Arc<Config>) -> anyhow::Result<MetadataProcessor<C>> {
    let gateways = Gateways::new(config.ipfs_gateways.clone(), config.ipfs_fallback_gateway.clone())
        .context("invalid gateway configuration")?;
    let downloader = Downloader::new(
        Arc::new(Fetcher::new(client)),
        gateways,
        RetryPolicy::with_attempts(config.download_retries),
    );
    Ok(MetadataProcessor::new(store, Arc::new(downloader), config))
}

/// Full process lifecycle: startup wait, store connection, processing
/// until `shutdown`, then drain and flush.
pub async fn run(config: Arc<Config>, shutdown: CancellationToken) -> anyhow::Result<()> {
    info!(seconds = config.startup_wait_seconds, "waiting before startup");
    if !wait(config.startup_wait(), &shutdown).await {
        info!("shutdown requested");
        return Ok(());
    }
    let Some(store) = wait_for_store(&config, &shutdown).await else {
        info!("shutdown requested");
        return Ok(());
    };

    let client = ReqwestClient::new(config.http_timeout(), config.http_max_connections)
        .context("failed to create HTTP client")?;
    let processor = build_processor(client, store.clone(), Arc::clone(&config))?;

    Orchestrator::new(processor, config).run(shutdown).await;

    store.flush().context("failed to flush store")?;
    info!("shutdown complete");
    Ok(())
}
