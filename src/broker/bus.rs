use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use futures_util::future::join_all;
use miette::Diagnostic;
use parking_lot::{Mutex, RwLock};
use rustc_hash::FxHashMap;
use thiserror::Error;
use tokio::sync::watch;
use tokio::task;
use tokio::time::timeout;

use super::handler::TopicHandler;
use super::message::BusMessage;

/// How long `stop` waits for each topic worker to drain before aborting it.
const DEFAULT_DRAIN_DEADLINE: Duration = Duration::from_secs(2);

/// Errors surfaced by broker operations.
#[derive(Debug, Error, Diagnostic)]
pub enum BrokerError {
    /// The per-topic queue is gone; publishing can no longer succeed.
    #[error("topic {topic} is closed")]
    #[diagnostic(code(shadowscope::broker::topic_closed))]
    TopicClosed { topic: String },
}

/// Abstract message broker the pipeline is wired against.
///
/// The local [`MemoryBroker`] satisfies this in-process; a production
/// deployment substitutes a durable external broker behind the same trait and
/// gains real backpressure and redelivery without touching the pipeline.
#[async_trait]
pub trait EventBroker: Send + Sync {
    async fn start(&self) -> Result<(), BrokerError>;
    async fn stop(&self) -> Result<(), BrokerError>;

    /// Publish a message to a topic. Non-blocking; the per-topic queue is
    /// unbounded in local mode, so publishers are never slowed by subscribers.
    async fn publish(&self, topic: &str, message: BusMessage) -> Result<(), BrokerError>;

    /// Register a handler invoked for every future publish to `topic`.
    async fn subscribe(
        &self,
        topic: &str,
        handler: Arc<dyn TopicHandler>,
    ) -> Result<(), BrokerError>;
}

/// In-process, topic-keyed pub/sub broker.
///
/// Each topic owns an unbounded flume queue and, while the broker is running,
/// one dispatch worker task. The worker pops messages in publish order and
/// invokes every subscriber sequentially, so per-topic per-subscriber ordering
/// matches publish order and each message is delivered at most once per
/// subscriber. A handler that returns an error is logged and skipped; there is
/// no redelivery and no persistence; a restart loses buffered messages.
///
/// ```text
/// publish("telemetry.traffic", msg)
///     │ enqueue (lossless, unbounded)
///     ▼
/// topic queue ──▶ dispatch worker ──▶ subscriber 1
///                                 └─▶ subscriber 2
/// ```
///
/// # Examples
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use shadowscope::broker::{BusMessage, EventBroker, MemoryBroker, TOPIC_TRAFFIC};
/// use shadowscope::flow::{FlowEvent, Protocol};
///
/// # async fn example(handler: Arc<dyn shadowscope::broker::TopicHandler>) -> Result<(), shadowscope::broker::BrokerError> {
/// let broker = MemoryBroker::new();
/// broker.subscribe(TOPIC_TRAFFIC, handler).await?;
/// broker.start().await?;
///
/// let event = FlowEvent::new("192.168.1.10", 40123, "1.2.3.4", 443, Protocol::Https);
/// broker.publish(TOPIC_TRAFFIC, BusMessage::flow(event)).await?;
///
/// broker.stop().await?;
/// # Ok(())
/// # }
/// ```
pub struct MemoryBroker {
    topics: Mutex<FxHashMap<String, TopicEntry>>,
    started: AtomicBool,
    drain_deadline: Duration,
}

impl Default for MemoryBroker {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryBroker {
    pub fn new() -> Self {
        Self::with_drain_deadline(DEFAULT_DRAIN_DEADLINE)
    }

    pub fn with_drain_deadline(drain_deadline: Duration) -> Self {
        Self {
            topics: Mutex::new(FxHashMap::default()),
            started: AtomicBool::new(false),
            drain_deadline,
        }
    }

    /// Number of messages currently buffered for a topic. Mostly useful in
    /// tests and diagnostics.
    pub fn backlog(&self, topic: &str) -> usize {
        self.topics
            .lock()
            .get(topic)
            .map_or(0, |entry| entry.rx.len())
    }

    fn with_topic<R>(&self, topic: &str, f: impl FnOnce(&mut TopicEntry) -> R) -> R {
        let mut topics = self.topics.lock();
        let entry = topics
            .entry(topic.to_string())
            .or_insert_with(|| TopicEntry::new(topic));
        if self.started.load(Ordering::SeqCst) {
            entry.spawn_worker();
        }
        f(entry)
    }
}

#[async_trait]
impl EventBroker for MemoryBroker {
    async fn start(&self) -> Result<(), BrokerError> {
        if self.started.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        let mut topics = self.topics.lock();
        for entry in topics.values_mut() {
            entry.spawn_worker();
        }
        tracing::info!(target: "shadowscope::broker", "memory broker started");
        Ok(())
    }

    async fn stop(&self) -> Result<(), BrokerError> {
        if !self.started.swap(false, Ordering::SeqCst) {
            return Ok(());
        }
        let workers: Vec<(String, TopicWorker)> = {
            let mut topics = self.topics.lock();
            topics
                .iter_mut()
                .filter_map(|(topic, entry)| {
                    entry.worker.take().map(|worker| (topic.clone(), worker))
                })
                .collect()
        };
        let deadline = self.drain_deadline;
        join_all(workers.into_iter().map(|(topic, worker)| async move {
            let _ = worker.shutdown.send(true);
            let abort = worker.handle.abort_handle();
            if timeout(deadline, worker.handle).await.is_err() {
                abort.abort();
                tracing::warn!(
                    target: "shadowscope::broker",
                    topic,
                    "drain deadline exceeded; aborting topic worker"
                );
            }
        }))
        .await;
        tracing::info!(target: "shadowscope::broker", "memory broker stopped");
        Ok(())
    }

    async fn publish(&self, topic: &str, message: BusMessage) -> Result<(), BrokerError> {
        self.with_topic(topic, |entry| {
            entry
                .tx
                .send(message)
                .map_err(|_| BrokerError::TopicClosed {
                    topic: topic.to_string(),
                })
        })
    }

    async fn subscribe(
        &self,
        topic: &str,
        handler: Arc<dyn TopicHandler>,
    ) -> Result<(), BrokerError> {
        self.with_topic(topic, |entry| {
            tracing::info!(
                target: "shadowscope::broker",
                topic,
                handler = %handler.name(),
                "subscribed handler"
            );
            entry.subscribers.write().push(handler);
        });
        Ok(())
    }
}

impl Drop for MemoryBroker {
    fn drop(&mut self) {
        if self.started.load(Ordering::SeqCst) {
            let mut topics = self.topics.lock();
            for entry in topics.values_mut() {
                entry.abort_worker();
            }
        }
    }
}

struct TopicEntry {
    topic: String,
    tx: flume::Sender<BusMessage>,
    rx: flume::Receiver<BusMessage>,
    subscribers: Arc<RwLock<Vec<Arc<dyn TopicHandler>>>>,
    worker: Option<TopicWorker>,
}

impl TopicEntry {
    fn new(topic: &str) -> Self {
        let (tx, rx) = flume::unbounded();
        Self {
            topic: topic.to_string(),
            tx,
            rx,
            subscribers: Arc::new(RwLock::new(Vec::new())),
            worker: None,
        }
    }

    fn spawn_worker(&mut self) {
        if self.worker.is_some() {
            return;
        }
        let topic = self.topic.clone();
        let rx = self.rx.clone();
        let subscribers = Arc::clone(&self.subscribers);
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        let handle = task::spawn(async move {
            loop {
                tokio::select! {
                    changed = shutdown_rx.changed() => {
                        if changed.is_err() || *shutdown_rx.borrow() {
                            // Drain what is already queued, then exit. The
                            // stop deadline bounds how long this may take.
                            while let Ok(message) = rx.try_recv() {
                                dispatch(&topic, &subscribers, message).await;
                            }
                            break;
                        }
                    }
                    message = rx.recv_async() => match message {
                        Ok(message) => dispatch(&topic, &subscribers, message).await,
                        Err(_) => break,
                    }
                }
            }
        });
        self.worker = Some(TopicWorker {
            shutdown: shutdown_tx,
            handle,
        });
    }

    fn abort_worker(&mut self) {
        if let Some(worker) = self.worker.take() {
            let _ = worker.shutdown.send(true);
            worker.handle.abort();
        }
    }
}

async fn dispatch(
    topic: &str,
    subscribers: &RwLock<Vec<Arc<dyn TopicHandler>>>,
    message: BusMessage,
) {
    // Snapshot under the lock, dispatch outside it: handlers await and the
    // subscriber list must stay open for concurrent subscribe calls.
    let handlers: Vec<Arc<dyn TopicHandler>> = subscribers.read().clone();
    for handler in handlers {
        if let Err(err) = handler.handle(message.clone()).await {
            tracing::warn!(
                target: "shadowscope::broker",
                topic,
                handler = %handler.name(),
                error = %err,
                "subscriber handler failed; message skipped"
            );
        }
    }
}

struct TopicWorker {
    shutdown: watch::Sender<bool>,
    handle: task::JoinHandle<()>,
}
