use crate::{error::QueryError, minecraft::StatusClient, types::ServerStatus};
use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc, Mutex, MutexGuard, PoisonError,
};
use tokio::{
    sync::watch,
    task::{AbortHandle, JoinHandle},
};

use log::{debug, error, info};

/// What the panel currently knows about the queried server.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum QueryState {
    /// Nothing submitted since the panel opened.
    #[default]
    Idle,
    Failed(QueryError),
    Ready(Arc<ServerStatus>),
}

/// Owns the input text and the single result slot of one panel.
///
/// Every `submit` takes a new generation; a completed fetch only lands in
/// the slot if no later `submit` or `close` happened in the meantime.
pub struct QueryController {
    client: Arc<StatusClient>,
    query: Mutex<String>,
    state: Arc<watch::Sender<QueryState>>,
    generation: Arc<AtomicU64>,
    in_flight: Mutex<Option<AbortHandle>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl QueryController {
    pub fn new(client: StatusClient) -> Self {
        let (state, _) = watch::channel(QueryState::Idle);
        QueryController {
            client: Arc::new(client),
            query: Mutex::new(String::new()),
            state: Arc::new(state),
            generation: Arc::new(AtomicU64::new(0)),
            in_flight: Mutex::new(None),
        }
    }

    pub fn set_query(&self, text: impl Into<String>) {
        let text = text.into();
        debug!("IP value: {:?}", text);
        *lock(&self.query) = text;
    }

    pub fn query(&self) -> String {
        lock(&self.query).clone()
    }

    pub fn state(&self) -> QueryState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<QueryState> {
        self.state.subscribe()
    }

    /// Fetches the status for the stored input. Must be called inside a
    /// tokio runtime. Any earlier submission still in flight is aborted.
    pub fn submit(&self) -> JoinHandle<()> {
        // Held until the handle is installed, so generations and in-flight
        // handles advance together across threads.
        let mut in_flight = lock(&self.in_flight);
        let query = self.query();
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        debug!("Submitted IP: {:?} (generation {})", query, generation);

        let client = self.client.clone();
        let state = self.state.clone();
        let latest = self.generation.clone();
        let handle = tokio::spawn(async move {
            let outcome = match client.fetch(&query).await {
                Ok(status) => {
                    info!(
                        "{} is {}",
                        query,
                        if status.is_online() { "up" } else { "down" }
                    );
                    QueryState::Ready(Arc::new(status))
                }
                Err(e) => {
                    error!("{}: status query failed: {}", query, e);
                    QueryState::Failed(e)
                }
            };
            if !apply(&state, &latest, generation, outcome) {
                debug!("{}: discarding superseded result", query);
            }
        });

        if let Some(previous) = in_flight.replace(handle.abort_handle()) {
            previous.abort();
        }
        handle
    }

    /// Panel dismissed: drop pending work and forget the last result.
    pub fn close(&self) {
        let mut in_flight = lock(&self.in_flight);
        self.generation.fetch_add(1, Ordering::SeqCst);
        if let Some(pending) = in_flight.take() {
            pending.abort();
        }
        lock(&self.query).clear();
        self.state.send_replace(QueryState::Idle);
    }
}

impl Drop for QueryController {
    fn drop(&mut self) {
        if let Some(in_flight) = lock(&self.in_flight).take() {
            in_flight.abort();
        }
    }
}

/// Stores `outcome` unless a newer generation was started. The check runs
/// under the channel's write lock, so it cannot interleave with another apply.
fn apply(
    state: &watch::Sender<QueryState>,
    latest: &AtomicU64,
    generation: u64,
    outcome: QueryState,
) -> bool {
    state.send_if_modified(|current| {
        if latest.load(Ordering::SeqCst) != generation {
            return false;
        }
        *current = outcome;
        true
    })
}
