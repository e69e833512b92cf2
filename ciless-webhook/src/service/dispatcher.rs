//! Keyed worker pool
//!
//! Accepted events are queued and processed off the request path. Each
//! worker owns a bounded queue, and every event is routed by its template
//! identity, so events for the same repository and ref are handled one at
//! a time and in arrival order while unrelated events run in parallel.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use ciless_core::domain::event::PullRequestEvent;
use ciless_core::template::TemplateBuilder;
use thiserror::Error;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

use crate::service::pipeline::Pipeline;

/// One accepted delivery waiting to be processed
#[derive(Debug, Clone)]
pub struct Job {
    /// GitHub delivery id, or a generated one when the header was absent
    pub delivery: String,
    pub event: PullRequestEvent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DispatchError {
    #[error("worker queue is full")]
    QueueFull,

    #[error("worker pool has shut down")]
    Closed,
}

/// Handle for submitting jobs to the pool
#[derive(Clone)]
pub struct Dispatcher {
    queues: Arc<[mpsc::Sender<Job>]>,
    builder: TemplateBuilder,
}

/// Running workers; join after every [`Dispatcher`] clone is dropped
pub struct WorkerPool {
    handles: Vec<JoinHandle<()>>,
}

impl Dispatcher {
    /// Spawn `workers` workers, each with a queue of `queue_depth` jobs
    pub fn start(
        pipeline: Arc<Pipeline>,
        workers: usize,
        queue_depth: usize,
    ) -> (Dispatcher, WorkerPool) {
        let workers = workers.max(1);
        let mut queues = Vec::with_capacity(workers);
        let mut handles = Vec::with_capacity(workers);

        for index in 0..workers {
            let (tx, rx) = mpsc::channel(queue_depth.max(1));
            queues.push(tx);
            handles.push(tokio::spawn(run_worker(index, rx, pipeline.clone())));
        }

        let dispatcher = Dispatcher {
            queues: queues.into(),
            builder: pipeline.builder().clone(),
        };

        (dispatcher, WorkerPool { handles })
    }

    /// Queue a job without waiting
    ///
    /// Fails with [`DispatchError::QueueFull`] when the job's worker is
    /// saturated; the caller decides whether to shed the load.
    pub fn submit(&self, job: Job) -> Result<(), DispatchError> {
        let index = self.route(&job.event);

        self.queues[index].try_send(job).map_err(|e| match e {
            TrySendError::Full(_) => DispatchError::QueueFull,
            TrySendError::Closed(_) => DispatchError::Closed,
        })
    }

    pub fn workers(&self) -> usize {
        self.queues.len()
    }

    fn route(&self, event: &PullRequestEvent) -> usize {
        let identity = self.builder.identity(&event.repo_slug, &event.head_ref);
        let mut hasher = DefaultHasher::new();
        identity.hash(&mut hasher);

        (hasher.finish() % self.queues.len() as u64) as usize
    }
}

async fn run_worker(index: usize, mut queue: mpsc::Receiver<Job>, pipeline: Arc<Pipeline>) {
    debug!(worker = index, "Worker started");

    while let Some(job) = queue.recv().await {
        let pipeline = pipeline.clone();
        let delivery = job.delivery.clone();

        // A panicking job must not take the rest of the queue with it
        let task = tokio::spawn(async move { pipeline.process(&job).await });
        if let Err(e) = task.await {
            error!(worker = index, delivery, "Job task failed: {}", e);
        }
    }

    debug!(worker = index, "Worker queue closed, exiting");
}

impl WorkerPool {
    /// Wait for every worker to drain its queue
    pub async fn join(self) {
        for handle in self.handles {
            if let Err(e) = handle.await {
                warn!("Worker exited abnormally: {}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::{
        ConfigSource, InMemoryTemplateRepository, RepositoryError, StaticConfigSource,
    };
    use crate::service::fetcher::{ConfigFetcher, FetchPolicy};
    use crate::service::reconciler::{DEFAULT_MAX_UPDATE_ATTEMPTS, Reconciler};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::sync::{Notify, Semaphore};

    const CONFIG: &str = "steps:\n  - name: build\n    image: alpine\n    args: [make]\n";

    fn job(delivery: &str, slug: &str, git_ref: &str) -> Job {
        let (owner, name) = slug.split_once('/').unwrap();
        Job {
            delivery: delivery.to_string(),
            event: PullRequestEvent {
                action: "synchronize".to_string(),
                repo_owner: owner.to_string(),
                repo_name: name.to_string(),
                repo_slug: slug.to_string(),
                head_ref: git_ref.to_string(),
                head_sha: "deadbeef".to_string(),
            },
        }
    }

    fn pipeline(
        source: Arc<dyn ConfigSource>,
        templates: Arc<InMemoryTemplateRepository>,
    ) -> Arc<Pipeline> {
        Arc::new(Pipeline::new(
            ConfigFetcher::new(source, FetchPolicy::default()),
            TemplateBuilder::default(),
            Reconciler::new(
                templates,
                Duration::from_secs(10),
                DEFAULT_MAX_UPDATE_ATTEMPTS,
            ),
        ))
    }

    #[tokio::test]
    async fn test_same_key_processed_in_order() {
        let source = Arc::new(StaticConfigSource::new().with_config("octo", "app", "main", CONFIG));
        let templates = Arc::new(InMemoryTemplateRepository::default());
        let (dispatcher, pool) = Dispatcher::start(pipeline(source, templates.clone()), 4, 16);

        for i in 0..5 {
            dispatcher
                .submit(job(&format!("d-{i}"), "octo/app", "main"))
                .unwrap();
        }
        drop(dispatcher);
        pool.join().await;

        // Serialized per key: exactly one create, never a lost race
        assert_eq!(templates.create_calls(), 1);
        assert_eq!(templates.update_calls(), 4);
        assert_eq!(templates.get_calls(), 5);
        assert_eq!(templates.len(), 1);
    }

    #[tokio::test]
    async fn test_distinct_keys_all_processed() {
        let source = Arc::new(
            StaticConfigSource::new()
                .with_config("octo", "app", "main", CONFIG)
                .with_config("octo", "app", "dev", CONFIG)
                .with_config("octo", "lib", "main", CONFIG),
        );
        let templates = Arc::new(InMemoryTemplateRepository::default());
        let (dispatcher, pool) = Dispatcher::start(pipeline(source, templates.clone()), 2, 8);

        dispatcher.submit(job("a", "octo/app", "main")).unwrap();
        dispatcher.submit(job("b", "octo/app", "dev")).unwrap();
        dispatcher.submit(job("c", "octo/lib", "main")).unwrap();
        drop(dispatcher);
        pool.join().await;

        assert_eq!(templates.len(), 3);
        assert!(templates.stored("knative-ci-octo-lib-ref-main").is_some());
    }

    /// Blocks every read until released
    struct GatedSource {
        started: Notify,
        release: Semaphore,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl ConfigSource for GatedSource {
        async fn get_file_at_ref(
            &self,
            _owner: &str,
            _repo: &str,
            _path: &str,
            _git_ref: &str,
        ) -> std::result::Result<Vec<u8>, RepositoryError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.started.notify_one();
            if let Ok(permit) = self.release.acquire().await {
                permit.forget();
            }
            Err(RepositoryError::NotFound)
        }
    }

    #[tokio::test]
    async fn test_full_queue_rejects_submission() {
        let source = Arc::new(GatedSource {
            started: Notify::new(),
            release: Semaphore::new(0),
            calls: AtomicUsize::new(0),
        });
        let templates = Arc::new(InMemoryTemplateRepository::default());
        let (dispatcher, pool) =
            Dispatcher::start(pipeline(source.clone(), templates.clone()), 1, 1);

        dispatcher.submit(job("first", "octo/app", "main")).unwrap();
        // Worker holds the first job; the queue has room for exactly one more
        source.started.notified().await;
        dispatcher.submit(job("second", "octo/app", "main")).unwrap();
        assert_eq!(
            dispatcher.submit(job("third", "octo/app", "main")),
            Err(DispatchError::QueueFull)
        );

        source.release.add_permits(2);
        drop(dispatcher);
        pool.join().await;

        assert_eq!(source.calls.load(Ordering::SeqCst), 2);
        assert_eq!(templates.calls(), 0);
    }

    #[tokio::test]
    async fn test_closed_pool_rejects_submission() {
        let source = Arc::new(StaticConfigSource::new());
        let templates = Arc::new(InMemoryTemplateRepository::default());
        let (dispatcher, pool) = Dispatcher::start(pipeline(source, templates), 1, 1);

        for handle in &pool.handles {
            handle.abort();
        }
        pool.join().await;

        assert_eq!(
            dispatcher.submit(job("late", "octo/app", "main")),
            Err(DispatchError::Closed)
        );
    }

    #[tokio::test]
    async fn test_zero_workers_clamped() {
        let source = Arc::new(StaticConfigSource::new());
        let templates = Arc::new(InMemoryTemplateRepository::default());
        let (dispatcher, pool) = Dispatcher::start(pipeline(source, templates), 0, 0);

        assert_eq!(dispatcher.workers(), 1);
        dispatcher.submit(job("only", "octo/app", "main")).unwrap();
        drop(dispatcher);
        pool.join().await;
    }
}
