use super::{strip_jsonp, AssetFetcher, FetchRequest, LoadError};
use crate::{nodes::parse_fragment, nodes::Node, scene::ProcessId};
use crossbeam::channel::{self, Receiver, Sender};
use log::*;
use std::{
    sync::Arc,
    thread::{self, JoinHandle},
    time::{Duration, Instant},
};
use vista_utils::PoolHandle;

/// A fetch submitted to the worker pool.
#[derive(Debug, Clone)]
pub struct FetchJob {
    /// Scene graph node that requested the asset.
    pub node: PoolHandle,
    pub process: ProcessId,
    /// Zero for the first try, incremented on every retry.
    pub attempt: u32,
    pub request: FetchRequest,
}

/// Outcome of a [`FetchJob`].
#[derive(Debug)]
pub struct FetchCompletion {
    pub job: FetchJob,
    pub result: Result<Vec<Node>, LoadError>,
}

/// Pool of fetch worker threads.
///
/// Threads are spawned on the first submitted job, so scenes without any `load` nodes never
/// start any. Results are queued until the owning scene collects them with
/// [`AssetLoader::drain`].
pub struct AssetLoader {
    fetcher: Arc<dyn AssetFetcher>,
    worker_count: usize,
    jobs: Option<Sender<FetchJob>>,
    completion_tx: Sender<FetchCompletion>,
    completion_rx: Receiver<FetchCompletion>,
    /// Completions received while waiting, not yet drained.
    received: Vec<FetchCompletion>,
    workers: Vec<JoinHandle<()>>,
    in_flight: usize,
    shut_down: bool,
}

impl AssetLoader {
    pub fn new(fetcher: Arc<dyn AssetFetcher>, worker_count: usize) -> Self {
        let (completion_tx, completion_rx) = channel::unbounded();
        Self {
            fetcher,
            worker_count: worker_count.max(1),
            jobs: None,
            completion_tx,
            completion_rx,
            received: vec![],
            workers: vec![],
            in_flight: 0,
            shut_down: false,
        }
    }

    /// Amount of submitted jobs without a drained completion.
    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    /// Queues a fetch. Never blocks on the fetch itself.
    pub fn submit(&mut self, job: FetchJob) -> Result<(), LoadError> {
        if self.shut_down {
            return Err(LoadError::Disconnected);
        }

        if self.jobs.is_none() {
            self.spawn_workers()?;
        }
        let Some(jobs) = &self.jobs else {
            return Err(LoadError::Disconnected);
        };

        trace!("Queueing fetch of `{}` (attempt {})", job.request.uri, job.attempt + 1);
        jobs.send(job).map_err(|_| LoadError::Disconnected)?;
        self.in_flight += 1;
        Ok(())
    }

    fn spawn_workers(&mut self) -> Result<(), LoadError> {
        let (job_tx, job_rx) = channel::unbounded::<FetchJob>();

        for index in 0..self.worker_count {
            let fetcher = self.fetcher.clone();
            let jobs = job_rx.clone();
            let completions = self.completion_tx.clone();

            let handle = thread::Builder::new()
                .name(format!("Asset fetcher #{index}"))
                .spawn(move || fetch_worker(fetcher.as_ref(), jobs, completions))
                .map_err(LoadError::Spawn)?;
            self.workers.push(handle);
        }

        trace!("Started {} asset fetch workers", self.worker_count);
        self.jobs = Some(job_tx);
        Ok(())
    }

    /// Takes all completions that arrived so far.
    pub fn drain(&mut self) -> Vec<FetchCompletion> {
        let mut completions = std::mem::take(&mut self.received);
        completions.extend(self.completion_rx.try_iter());
        self.in_flight = self.in_flight.saturating_sub(completions.len());
        completions
    }

    /// Blocks until at least one completion is ready to be drained, or the timeout passes.
    /// Returns whether a completion is ready. Returns immediately if nothing is in flight.
    pub fn wait(&mut self, timeout: Duration) -> bool {
        if !self.received.is_empty() {
            return true;
        }
        if self.in_flight == 0 {
            return false;
        }

        // Timeouts too long to represent as a deadline wait forever
        let completion = match Instant::now().checked_add(timeout) {
            Some(deadline) => self.completion_rx.recv_deadline(deadline).ok(),
            None => self.completion_rx.recv().ok(),
        };
        match completion {
            Some(completion) => {
                self.received.push(completion);
                true
            }
            None => false,
        }
    }

    /// Abandons all queued and running fetches. Workers exit after finishing their current
    /// fetch, and their results are dropped. The loader can't be used afterwards.
    pub fn shutdown(&mut self) {
        if self.shut_down {
            return;
        }
        self.shut_down = true;

        // Closing the job channel ends the worker loops. Queued jobs are dropped with the
        // receivers, and the threads are detached instead of joined.
        self.jobs = None;
        self.received.clear();
        self.completion_rx.try_iter().for_each(drop);
        self.in_flight = 0;
        trace!("Detaching {} asset fetch workers", self.workers.len());
        self.workers.clear();
    }
}

impl Drop for AssetLoader {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn fetch_worker(
    fetcher: &dyn AssetFetcher,
    jobs: Receiver<FetchJob>,
    completions: Sender<FetchCompletion>,
) {
    while let Ok(job) = jobs.recv() {
        debug!("Fetching `{}` from `{}`", job.request.uri, job.request.url);
        let result = fetch_fragment(fetcher, &job.request);
        if let Err(e) = &result {
            debug!("Fetch failed: {e}");
        }

        if completions.send(FetchCompletion { job, result }).is_err() {
            break;
        }
    }
}

/// Fetches and parses a single fragment.
pub fn fetch_fragment(
    fetcher: &dyn AssetFetcher,
    request: &FetchRequest,
) -> Result<Vec<Node>, LoadError> {
    let payload = fetcher.fetch(request).map_err(|e| LoadError::Fetch {
        uri: request.uri.clone(),
        message: format!("{e:#}"),
    })?;

    let json = strip_jsonp(&payload).map_err(|source| LoadError::Jsonp {
        uri: request.uri.clone(),
        source,
    })?;

    parse_fragment(json).map_err(|source| LoadError::Parse {
        uri: request.uri.clone(),
        source,
    })
}
