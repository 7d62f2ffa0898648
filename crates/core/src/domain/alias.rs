//! A single mirror alias and its health record.

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

/// Cached reachability of an alias. Updated by health probes and
/// offline marks, never by the domain-selection path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DomainAliasState {
    Online,
    Offline,
}

#[derive(Debug, Clone, Copy)]
struct AliasHealth {
    state: DomainAliasState,
    failed_attempts: u32,
    last_checked: Option<DateTime<Utc>>,
}

/// An alternate hostname for a source's default domain.
///
/// Identity is `(default_domain, name)`; the health fields are interior
/// state written only by the probe and offline-mark paths, so aliases can
/// be shared across list snapshots without losing their failure history.
#[derive(Debug)]
pub struct DomainAlias {
    default_domain: String,
    name: String,
    health: RwLock<AliasHealth>,
}

impl DomainAlias {
    /// Create a fresh alias, optimistically considered online until a
    /// probe or an offline mark says otherwise.
    pub fn new(default_domain: &str, name: &str) -> Self {
        Self {
            default_domain: default_domain.to_string(),
            name: name.to_string(),
            health: RwLock::new(AliasHealth {
                state: DomainAliasState::Online,
                failed_attempts: 0,
                last_checked: None,
            }),
        }
    }

    pub fn default_domain(&self) -> &str {
        &self.default_domain
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub async fn state(&self) -> DomainAliasState {
        self.health.read().await.state
    }

    pub async fn failed_attempts(&self) -> u32 {
        self.health.read().await.failed_attempts
    }

    pub async fn last_checked(&self) -> Option<DateTime<Utc>> {
        self.health.read().await.last_checked
    }

    /// Mark this alias offline and count the failure.
    pub async fn mark_offline(&self) {
        let mut health = self.health.write().await;
        health.state = DomainAliasState::Offline;
        health.failed_attempts += 1;
        health.last_checked = Some(Utc::now());
    }

    /// Apply the outcome of a health probe.
    ///
    /// A successful probe clears the failure history; a failed one counts
    /// against the alias until it is pruned.
    pub async fn record_probe(&self, online: bool) {
        let mut health = self.health.write().await;
        health.last_checked = Some(Utc::now());
        if online {
            health.state = DomainAliasState::Online;
            health.failed_attempts = 0;
        } else {
            health.state = DomainAliasState::Offline;
            health.failed_attempts += 1;
        }
    }

    /// Clear all health counters, giving the alias another chance.
    pub async fn reset(&self) {
        let mut health = self.health.write().await;
        health.state = DomainAliasState::Online;
        health.failed_attempts = 0;
        health.last_checked = None;
    }
}

impl PartialEq for DomainAlias {
    fn eq(&self, other: &Self) -> bool {
        self.default_domain == other.default_domain && self.name == other.name
    }
}

impl Eq for DomainAlias {}
