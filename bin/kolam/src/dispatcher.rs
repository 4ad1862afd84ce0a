use std::collections::HashMap;
use std::str::FromStr;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use log::{debug, error, info, warn};
use serde::de::{value, Error as _};
use tokio::sync::mpsc::error::TryRecvError;
use tokio::sync::{mpsc, oneshot};
use tokio_util::task::TaskTracker;
use transport::{PondId, SensorRecord};

use crate::{Error, Result, Store, StoredRecord};

/// Ordering guarantee between writes of consecutive messages.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum WriteOrder {
    /// Every write runs as soon as it is issued; completion order is unspecified.
    #[default]
    Unordered,
    /// At most one write in flight per pond, completed in arrival order.
    PerPond,
}

impl FromStr for WriteOrder {
    type Err = value::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "unordered" => Ok(Self::Unordered),
            "per_pond" => Ok(Self::PerPond),
            _ => Err(value::Error::custom(
                "supported write orders are unordered and per_pond",
            )),
        }
    }
}

/// Handle to the outcome of a single write. Dropping it does not cancel the write.
#[derive(Debug)]
pub struct WriteTicket {
    pond: PondId,
    outcome: oneshot::Receiver<Result<StoredRecord>>,
}

impl WriteTicket {
    pub fn pond(&self) -> &PondId {
        &self.pond
    }

    pub async fn outcome(self) -> Result<StoredRecord> {
        self.outcome.await.unwrap_or(Err(Error::WriteAbandoned))
    }
}

struct Job {
    record: SensorRecord,
    reply: oneshot::Sender<Result<StoredRecord>>,
}

impl Job {
    async fn run(self, store: &dyn Store, pond: &PondId) {
        let result = store.append(pond, &self.record).await;

        match &result {
            Ok(stored) => info!("stored sensor data for {pond} as {}", stored.document),
            Err(err) => error!("unable to store sensor data for {pond}: {err}"),
        }

        let _ = self.reply.send(result);
    }
}

type Queues = Arc<Mutex<HashMap<PondId, mpsc::UnboundedSender<Job>>>>;

pub struct Dispatcher {
    store: Arc<dyn Store>,
    order: WriteOrder,
    tracker: TaskTracker,
    queues: Queues,
}

impl Dispatcher {
    pub fn new(store: Arc<dyn Store>, order: WriteOrder) -> Self {
        Self {
            store,
            order,
            tracker: TaskTracker::new(),
            queues: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Issues the write of `record` without waiting for it. Must be called
    /// from within a tokio runtime.
    pub fn dispatch(&self, pond: PondId, record: SensorRecord) -> WriteTicket {
        let (reply, outcome) = oneshot::channel();
        let job = Job { record, reply };

        match self.order {
            WriteOrder::Unordered => {
                let store = self.store.clone();
                let pond = pond.clone();

                self.tracker
                    .spawn(async move { job.run(store.as_ref(), &pond).await });
            }
            WriteOrder::PerPond => self.enqueue(&pond, job),
        }

        WriteTicket { pond, outcome }
    }

    fn enqueue(&self, pond: &PondId, job: Job) {
        let mut queues = self.queues.lock().unwrap_or_else(PoisonError::into_inner);

        let queue = queues
            .entry(pond.clone())
            .or_insert_with(|| self.spawn_queue(pond.clone()));

        if queue.send(job).is_err() {
            warn!("write queue for {pond} is closed, dropping sensor data");
        }
    }

    /// Starts the worker of a new queue. The caller holds the `queues` lock
    /// until the first job is sent, so the worker never finds it empty.
    fn spawn_queue(&self, pond: PondId) -> mpsc::UnboundedSender<Job> {
        let (sender, mut receiver) = mpsc::unbounded_channel::<Job>();
        let store = self.store.clone();
        let queues = self.queues.clone();

        debug!("starting write queue for {pond}");

        self.tracker.spawn(async move {
            while let Some(job) = next_job(&queues, &pond, &mut receiver) {
                job.run(store.as_ref(), &pond).await;
            }

            debug!("write queue for {pond} finished");
        });

        sender
    }

    /// Waits up to `timeout` for issued writes to finish. Returns `false`
    /// when some of them were still running.
    pub async fn shutdown(&self, timeout: Duration) -> bool {
        self.queues
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        self.tracker.close();

        if !self.tracker.is_empty() {
            info!("waiting for pending writes to finish");
        }

        match tokio::time::timeout(timeout, self.tracker.wait()).await {
            Ok(()) => true,
            Err(_) => {
                warn!("{} write tasks still running after {timeout:?}", self.tracker.len());
                false
            }
        }
    }
}

/// Next job of the queue of `pond`. An idle queue is removed from `queues`
/// under the lock, so a concurrent `enqueue` starts a new one instead.
fn next_job(
    queues: &Mutex<HashMap<PondId, mpsc::UnboundedSender<Job>>>,
    pond: &PondId,
    receiver: &mut mpsc::UnboundedReceiver<Job>,
) -> Option<Job> {
    if let Ok(job) = receiver.try_recv() {
        return Some(job);
    }

    let mut queues = queues.lock().unwrap_or_else(PoisonError::into_inner);

    match receiver.try_recv() {
        Ok(job) => Some(job),
        Err(TryRecvError::Empty) => {
            queues.remove(pond);
            None
        }
        // already dropped from `queues` by shutdown
        Err(TryRecvError::Disconnected) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::Utc;
    use serde_json::json;
    use tokio::time::sleep;

    /// Store that takes `suhu` milliseconds to write and records completions.
    #[derive(Default)]
    struct SlowStore {
        completed: Mutex<Vec<(String, f64)>>,
    }

    #[async_trait]
    impl Store for SlowStore {
        async fn append(&self, pond: &PondId, record: &SensorRecord) -> Result<StoredRecord> {
            sleep(Duration::from_millis(record.temperature as u64)).await;

            self.completed
                .lock()
                .unwrap()
                .push((pond.to_string(), record.temperature));

            Ok(StoredRecord {
                document: format!("ponds/{pond}/sensor_data/{}", record.temperature),
                timestamp: Utc::now(),
            })
        }
    }

    fn pond(kolam: &str) -> PondId {
        PondId::from_kolam(Some(&json!(kolam))).unwrap()
    }

    fn record(temperature: f64) -> SensorRecord {
        SensorRecord {
            temperature,
            ..SensorRecord::default()
        }
    }

    fn completed(store: &SlowStore) -> Vec<(String, f64)> {
        store.completed.lock().unwrap().clone()
    }

    fn queue_count(dispatcher: &Dispatcher) -> usize {
        dispatcher.queues.lock().unwrap().len()
    }

    #[tokio::test(start_paused = true)]
    async fn test_unordered_writes_overlap() {
        let store = Arc::new(SlowStore::default());
        let dispatcher = Dispatcher::new(store.clone(), WriteOrder::Unordered);

        let slow = dispatcher.dispatch(pond("1"), record(30.0));
        let fast = dispatcher.dispatch(pond("1"), record(1.0));

        assert!(fast.outcome().await.is_ok());
        assert_eq!(completed(&store), vec![("pond_1".to_string(), 1.0)]);

        let stored = slow.outcome().await.unwrap();
        assert_eq!(stored.document, "ponds/pond_1/sensor_data/30");
    }

    #[tokio::test(start_paused = true)]
    async fn test_per_pond_writes_keep_arrival_order() {
        let store = Arc::new(SlowStore::default());
        let dispatcher = Dispatcher::new(store.clone(), WriteOrder::PerPond);

        let tickets = vec![
            dispatcher.dispatch(pond("1"), record(30.0)),
            dispatcher.dispatch(pond("1"), record(1.0)),
            dispatcher.dispatch(pond("2"), record(5.0)),
        ];

        assert_eq!(tickets[2].pond().to_string(), "pond_2");

        for ticket in tickets {
            ticket.outcome().await.unwrap();
        }

        assert_eq!(
            completed(&store),
            vec![
                ("pond_2".to_string(), 5.0),
                ("pond_1".to_string(), 30.0),
                ("pond_1".to_string(), 1.0),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_queues_are_retired() {
        let store = Arc::new(SlowStore::default());
        let dispatcher = Dispatcher::new(store.clone(), WriteOrder::PerPond);

        let tickets: Vec<_> = (0..100)
            .map(|n| dispatcher.dispatch(pond(&n.to_string()), record(5.0)))
            .collect();

        assert_eq!(queue_count(&dispatcher), 100);

        for ticket in tickets {
            ticket.outcome().await.unwrap();
        }

        while !dispatcher.tracker.is_empty() {
            tokio::task::yield_now().await;
        }

        assert_eq!(queue_count(&dispatcher), 0);
        assert_eq!(completed(&store).len(), 100);

        let ticket = dispatcher.dispatch(pond("7"), record(1.0));
        assert_eq!(queue_count(&dispatcher), 1);
        assert!(ticket.outcome().await.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_drains_pending_writes() {
        let store = Arc::new(SlowStore::default());
        let dispatcher = Dispatcher::new(store.clone(), WriteOrder::PerPond);

        dispatcher.dispatch(pond("1"), record(10.0));
        dispatcher.dispatch(pond("1"), record(20.0));
        dispatcher.dispatch(pond("3"), record(5.0));

        assert!(dispatcher.shutdown(Duration::from_secs(1)).await);
        assert_eq!(completed(&store).len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_gives_up_after_timeout() {
        let store = Arc::new(SlowStore::default());
        let dispatcher = Dispatcher::new(store.clone(), WriteOrder::Unordered);

        let ticket = dispatcher.dispatch(pond("1"), record(60_000.0));

        assert!(!dispatcher.shutdown(Duration::from_secs(1)).await);
        assert!(completed(&store).is_empty());

        assert!(ticket.outcome().await.is_ok());
    }

    #[test]
    fn test_write_order_from_str() {
        assert_eq!(WriteOrder::from_str("unordered").unwrap(), WriteOrder::Unordered);
        assert_eq!(WriteOrder::from_str("per_pond").unwrap(), WriteOrder::PerPond);
        assert!(WriteOrder::from_str("PerPond").is_err());
    }
}
