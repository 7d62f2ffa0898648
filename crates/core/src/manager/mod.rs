//! Search dispatch and aggregation.
//!
//! The manager accepts a performer tagged with a caller-chosen token,
//! runs it on its own task, and republishes its result batches and the
//! final completion event to every registered listener.

use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, error};

use crate::performer::{ResultSink, SearchPerformer, SearchResult, SearchToken};

/// Receives the incremental output of every dispatched search.
///
/// For one token, every `on_results` call happens-before the single
/// `on_finished`; batches for different tokens interleave arbitrarily.
pub trait SearchListener: Send + Sync {
    /// One batch of results: a listing page's worth, or one crawl item.
    fn on_results(&self, token: SearchToken, results: &[SearchResult]);

    /// The performer for this token reached a terminal state. Called
    /// exactly once per dispatched token.
    fn on_finished(&self, token: SearchToken);
}

#[derive(Debug, Error)]
pub enum SearchManagerError {
    #[error("token {0} already has an active performer")]
    TokenInUse(SearchToken),
}

/// Top-level orchestrator for concurrent searches.
pub struct SearchManager {
    listeners: Arc<RwLock<Vec<Arc<dyn SearchListener>>>>,
    active: Arc<Mutex<HashMap<SearchToken, Arc<dyn SearchPerformer>>>>,
}

impl Default for SearchManager {
    fn default() -> Self {
        Self::new()
    }
}

impl SearchManager {
    pub fn new() -> Self {
        Self {
            listeners: Arc::new(RwLock::new(Vec::new())),
            active: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub async fn register_listener(&self, listener: Arc<dyn SearchListener>) {
        self.listeners.write().await.push(listener);
    }

    /// Begin executing a performer asynchronously under its token.
    ///
    /// Tokens run concurrently; a token still active from a previous
    /// `perform` is rejected.
    pub async fn perform(
        &self,
        performer: Arc<dyn SearchPerformer>,
    ) -> Result<(), SearchManagerError> {
        let token = performer.token();
        {
            let mut active = self.active.lock().await;
            if active.contains_key(&token) {
                return Err(SearchManagerError::TokenInUse(token));
            }
            active.insert(token, performer.clone());
        }

        debug!(token = token, keywords = %performer.keywords(), "Dispatching search");

        let listeners = self.listeners.clone();
        let active = self.active.clone();
        tokio::spawn(async move {
            let (sink, mut rx) = ResultSink::channel();

            let runner = {
                let performer = performer.clone();
                tokio::spawn(async move { performer.perform(&sink).await })
            };

            // The channel closes when the performer drops its sink, so
            // every batch is fanned out before completion is observed.
            while let Some(batch) = rx.recv().await {
                let snapshot: Vec<Arc<dyn SearchListener>> = listeners.read().await.clone();
                for listener in snapshot {
                    listener.on_results(token, &batch);
                }
            }

            match runner.await {
                Ok(Ok(())) => debug!(token = token, "Search finished"),
                Ok(Err(e)) => error!(token = token, error = %e, "Search failed"),
                Err(e) => error!(token = token, error = %e, "Search task panicked"),
            }

            active.lock().await.remove(&token);
            let snapshot: Vec<Arc<dyn SearchListener>> = listeners.read().await.clone();
            for listener in snapshot {
                listener.on_finished(token);
            }
        });

        Ok(())
    }

    /// Ask the performer for this token to stop. No-op for unknown or
    /// already-finished tokens.
    pub async fn stop(&self, token: SearchToken) {
        let performer = self.active.lock().await.get(&token).cloned();
        if let Some(performer) = performer {
            debug!(token = token, "Stopping search");
            performer.stop();
        }
    }

    /// Stop every active search.
    pub async fn stop_all(&self) {
        let performers: Vec<Arc<dyn SearchPerformer>> =
            self.active.lock().await.values().cloned().collect();
        for performer in performers {
            performer.stop();
        }
    }

    pub async fn active_tokens(&self) -> Vec<SearchToken> {
        self.active.lock().await.keys().copied().collect()
    }
}
