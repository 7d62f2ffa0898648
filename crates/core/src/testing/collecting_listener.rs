//! Recording listener for manager tests.

use std::sync::Mutex;
use tokio::sync::Notify;

use crate::manager::SearchListener;
use crate::performer::{SearchResult, SearchToken};

/// One recorded listener callback.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Results(SearchToken, Vec<SearchResult>),
    Finished(SearchToken),
}

/// Listener that records every callback and can await completion of a
/// token.
pub struct CollectingListener {
    events: Mutex<Vec<Event>>,
    notify: Notify,
}

impl Default for CollectingListener {
    fn default() -> Self {
        Self::new()
    }
}

impl CollectingListener {
    pub fn new() -> Self {
        Self {
            events: Mutex::new(Vec::new()),
            notify: Notify::new(),
        }
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }

    /// All results recorded for a token, flattened across batches.
    pub fn results_for(&self, token: SearchToken) -> Vec<SearchResult> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::Results(t, batch) if t == token => Some(batch),
                _ => None,
            })
            .flatten()
            .collect()
    }

    pub fn finished_count(&self, token: SearchToken) -> usize {
        self.events()
            .iter()
            .filter(|e| matches!(e, Event::Finished(t) if *t == token))
            .count()
    }

    /// Wait until the token has finished at least once.
    pub async fn wait_finished(&self, token: SearchToken) {
        self.wait_finished_count(token, 1).await;
    }

    /// Wait until the token has finished at least `count` times.
    pub async fn wait_finished_count(&self, token: SearchToken, count: usize) {
        loop {
            // Register for wakeups before checking, so a completion
            // landing in between is not missed.
            let notified = self.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if self.finished_count(token) >= count {
                return;
            }
            notified.await;
        }
    }
}

impl SearchListener for CollectingListener {
    fn on_results(&self, token: SearchToken, results: &[SearchResult]) {
        self.events
            .lock()
            .unwrap()
            .push(Event::Results(token, results.to_vec()));
    }

    fn on_finished(&self, token: SearchToken) {
        self.events.lock().unwrap().push(Event::Finished(token));
        self.notify.notify_waiters();
    }
}
